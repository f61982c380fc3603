// Copyright (c) 2022 Huawei Technologies Co.,Ltd. All rights reserved.
//
// sysMaster is licensed under Mulan PSL v2.
// You can use this software according to the terms and conditions of the Mulan
// PSL v2.
// You may obtain a copy of Mulan PSL v2 at:
//         http://license.coscl.org.cn/MulanPSL2
// THIS SOFTWARE IS PROVIDED ON AN "AS IS" BASIS, WITHOUT WARRANTIES OF ANY
// KIND, EITHER EXPRESS OR IMPLIED, INCLUDING BUT NOT LIMITED TO
// NON-INFRINGEMENT, MERCHANTABILITY OR FIT FOR A PARTICULAR PURPOSE.
// See the Mulan PSL v2 for more details.

//! Desired permission change of a file, as handed to chmod(1).
//!
//! A [`FileMode`] carries three bit sets: an absolute assignment (`reset`)
//! and the incremental `add` and `remove` changes. An absolute assignment
//! overrides any incremental change when rendered.

use bitflags::bitflags;

bitflags! {
    /// POSIX permission bits
    pub struct ModeBits: u32 {
        /// owner read, write, execute
        const S_IRWXU = 0o700;
        /// owner read
        const S_IRUSR = 0o400;
        /// owner write
        const S_IWUSR = 0o200;
        /// owner execute
        const S_IXUSR = 0o100;
        /// group read, write, execute
        const S_IRWXG = 0o070;
        /// group read
        const S_IRGRP = 0o040;
        /// group write
        const S_IWGRP = 0o020;
        /// group execute
        const S_IXGRP = 0o010;
        /// others read, write, execute
        const S_IRWXO = 0o007;
        /// others read
        const S_IROTH = 0o004;
        /// others write
        const S_IWOTH = 0o002;
        /// others execute
        const S_IXOTH = 0o001;
    }
}

/// A permission change: absolute `reset`, or incremental `add`/`remove`.
///
/// Equality and hashing work on the bit sets, so the order in which the
/// bits were collected never matters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FileMode {
    reset: ModeBits,
    add: ModeBits,
    remove: ModeBits,
}

impl Default for FileMode {
    fn default() -> Self {
        FileMode::new(ModeBits::empty(), ModeBits::empty(), ModeBits::empty())
    }
}

impl FileMode {
    /// rwxrwxrwx
    pub const SET_FULL: FileMode = FileMode::reset(ModeBits::from_bits_truncate(0o777));
    /// ---rw-r--
    pub const SET_GRP_RW_OTH_R: FileMode = FileMode::reset(ModeBits::from_bits_truncate(0o064));
    /// r--------
    pub const SET_USR_RO: FileMode = FileMode::reset(ModeBits::S_IRUSR);
    /// rw-------
    pub const SET_USR_RW: FileMode = FileMode::reset(ModeBits::from_bits_truncate(0o600));
    /// +r for everyone
    pub const ADD_READ_ALL: FileMode = FileMode::add(ModeBits::from_bits_truncate(0o444));
    /// +r for everyone
    pub const ADD_ALL_R: FileMode = FileMode::add(ModeBits::from_bits_truncate(0o444));
    /// +rw for the group
    pub const ADD_GRP_RW: FileMode = FileMode::add(ModeBits::from_bits_truncate(0o060));
    /// +rx for the group
    pub const ADD_GRP_RX: FileMode = FileMode::add(ModeBits::from_bits_truncate(0o050));
    /// +rx for the group and others
    pub const ADD_GRP_RX_OTH_RX: FileMode = FileMode::add(ModeBits::from_bits_truncate(0o055));

    /// no validation happens here, the facade rejects an empty mode
    pub const fn new(reset: ModeBits, add: ModeBits, remove: ModeBits) -> Self {
        FileMode { reset, add, remove }
    }

    /// absolute assignment
    pub const fn reset(bits: ModeBits) -> Self {
        FileMode::new(bits, ModeBits::empty(), ModeBits::empty())
    }

    /// bits to add
    pub const fn add(bits: ModeBits) -> Self {
        FileMode::new(ModeBits::empty(), bits, ModeBits::empty())
    }

    /// bits to remove
    pub const fn remove(bits: ModeBits) -> Self {
        FileMode::new(ModeBits::empty(), ModeBits::empty(), bits)
    }

    /// collect a mode from lists of bits, in any order
    pub fn from_lists(reset: &[ModeBits], add: &[ModeBits], remove: &[ModeBits]) -> Self {
        let union = |list: &[ModeBits]| list.iter().fold(ModeBits::empty(), |acc, b| acc | *b);
        FileMode::new(union(reset), union(add), union(remove))
    }

    /// whether any of the three sets carries a bit
    pub fn has_any(&self) -> bool {
        !(self.reset.is_empty() && self.add.is_empty() && self.remove.is_empty())
    }

    ///
    pub fn get_reset_mode(&self) -> Option<u32> {
        Self::octal(self.reset)
    }

    ///
    pub fn get_add_mode(&self) -> Option<u32> {
        Self::octal(self.add)
    }

    ///
    pub fn get_remove_mode(&self) -> Option<u32> {
        Self::octal(self.remove)
    }

    fn octal(bits: ModeBits) -> Option<u32> {
        if bits.is_empty() {
            None
        } else {
            Some(bits.bits())
        }
    }

    /// chmod(1) mode argument, e.g. `=777` or `+060,-002`
    pub fn to_shell_mode(&self) -> Option<String> {
        if let Some(reset) = self.get_reset_mode() {
            return Some(format!("={:03o}", reset));
        }

        let parts: Vec<String> = [('+', self.get_add_mode()), ('-', self.get_remove_mode())]
            .iter()
            .filter_map(|(op, mode)| mode.map(|m| format!("{}{:03o}", op, m)))
            .collect();

        if parts.is_empty() {
            None
        } else {
            Some(parts.join(","))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::hash_map::DefaultHasher;
    use std::hash::{Hash, Hasher};

    fn assert_modes(
        reset: Option<u32>,
        add: Option<u32>,
        remove: Option<u32>,
        actual: FileMode,
    ) {
        assert_eq!(
            reset.is_some() || add.is_some() || remove.is_some(),
            actual.has_any()
        );
        assert_eq!(reset, actual.get_reset_mode());
        assert_eq!(add, actual.get_add_mode());
        assert_eq!(remove, actual.get_remove_mode());
    }

    fn hash_of(mode: &FileMode) -> u64 {
        let mut hasher = DefaultHasher::new();
        mode.hash(&mut hasher);
        hasher.finish()
    }

    #[test]
    fn test_modes() {
        assert_modes(None, None, None, FileMode::default());
        assert_modes(None, None, None, FileMode::from_lists(&[], &[], &[]));
        assert_modes(
            Some(0o770),
            Some(0o4),
            Some(0o3),
            FileMode::from_lists(
                &[ModeBits::S_IRWXU, ModeBits::S_IRWXG],
                &[ModeBits::S_IROTH],
                &[ModeBits::S_IWOTH | ModeBits::S_IXOTH],
            ),
        );
        assert_modes(
            Some(0o777),
            None,
            None,
            FileMode::from_lists(
                &[ModeBits::S_IRWXU, ModeBits::S_IRWXG, ModeBits::S_IRWXO],
                &[],
                &[],
            ),
        );
        assert_modes(
            None,
            Some(0o777),
            None,
            FileMode::add(ModeBits::S_IRWXU | ModeBits::S_IRWXG | ModeBits::S_IRWXO),
        );
        assert_modes(
            None,
            None,
            Some(0o777),
            FileMode::remove(ModeBits::S_IRWXU | ModeBits::S_IRWXG | ModeBits::S_IRWXO),
        );
    }

    #[test]
    fn test_equality_ignores_order() {
        let a = FileMode::from_lists(&[], &[ModeBits::S_IRUSR, ModeBits::S_IWUSR], &[]);
        let b = FileMode::from_lists(&[], &[ModeBits::S_IWUSR, ModeBits::S_IRUSR], &[]);
        assert_eq!(a, b);
        assert_eq!(hash_of(&a), hash_of(&b));

        let c = FileMode::from_lists(&[ModeBits::S_IRUSR, ModeBits::S_IWUSR], &[], &[]);
        assert_ne!(a, c);
        assert_ne!(hash_of(&a), hash_of(&c));
    }

    #[test]
    fn test_shell_mode() {
        assert_eq!(FileMode::SET_FULL.to_shell_mode().unwrap(), "=777");
        assert_eq!(FileMode::SET_GRP_RW_OTH_R.to_shell_mode().unwrap(), "=064");
        assert_eq!(FileMode::SET_USR_RO.to_shell_mode().unwrap(), "=400");
        assert_eq!(FileMode::ADD_READ_ALL.to_shell_mode().unwrap(), "+444");
        assert_eq!(FileMode::ADD_GRP_RW.to_shell_mode().unwrap(), "+060");
        assert_eq!(
            FileMode::new(ModeBits::empty(), ModeBits::S_IRGRP, ModeBits::S_IWOTH)
                .to_shell_mode()
                .unwrap(),
            "+040,-002"
        );
        // absolute assignment wins over incremental bits
        assert_eq!(
            FileMode::new(ModeBits::S_IRWXU, ModeBits::S_IROTH, ModeBits::S_IWOTH)
                .to_shell_mode()
                .unwrap(),
            "=700"
        );
        assert_eq!(FileMode::default().to_shell_mode(), None);
    }
}
