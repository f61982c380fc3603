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

//! the utils of the file operation
//!
use crate::error::*;
use std::fs::{self, File, Permissions};
use std::io::{BufRead, BufReader, Write};
use std::os::unix::prelude::{FromRawFd, PermissionsExt};
use std::path::{Path, PathBuf};

/// read first line from a file, without the line break
pub fn read_first_line(path: &Path) -> Result<String> {
    let file = File::open(path).context(IoSnafu)?;
    let mut buffer = BufReader::new(file);
    let mut first_line = String::new();
    buffer.read_line(&mut first_line).context(IoSnafu)?;
    Ok(first_line.trim_end_matches(&['\r', '\n'][..]).to_string())
}

fn fill_secret(file: &mut File, content: &str) -> std::io::Result<()> {
    file.set_permissions(Permissions::from_mode(0o600))?;
    file.write_all(content.as_bytes())?;
    file.set_permissions(Permissions::from_mode(0o400))?;
    file.sync_all()
}

/// Write `content` to a fresh temporary file readable by its owner only.
///
/// The file is writable only while being filled and ends up 0400.
pub fn write_secret_temp(content: &str) -> Result<PathBuf> {
    let template = std::env::temp_dir().join("guestagent-XXXXXX");
    let (fd, path) = nix::unistd::mkstemp(template.as_path()).context(NixSnafu)?;

    // mkstemp hands over the only owner of fd
    let mut file = unsafe { File::from_raw_fd(fd) };
    if let Err(e) = fill_secret(&mut file, content) {
        let _ = fs::remove_file(&path);
        return Err(Error::Io { source: e });
    }
    Ok(path)
}
