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

//! the file operations of the guest
//!
//! Each operation validates its arguments, builds the argument vector of
//! the matching shell utility and hands it to an [`Executor`]. A failing
//! process is never retried, the caller decides whether to ignore it.

use crate::error::*;
use crate::exec::{ExecCommand, Executor, DEFAULT_TIMEOUT, ROOT_HELPER};
use crate::file_mode::FileMode;
use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Options shared by the file operations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileOptions {
    /// run through the root helper
    pub as_root: bool,
    /// `-R`, ignored by move and create_directory
    pub recursive: bool,
    /// `-f` (`-p` for create_directory); `None` takes the operation default
    pub force: Option<bool>,
    /// `-p`, copy only
    pub preserve: bool,
    ///
    pub timeout: Option<Duration>,
}

impl Default for FileOptions {
    fn default() -> Self {
        FileOptions {
            as_root: false,
            recursive: true,
            force: None,
            preserve: false,
            timeout: Some(DEFAULT_TIMEOUT),
        }
    }
}

impl FileOptions {
    /// default options, run as root
    pub fn root() -> Self {
        FileOptions::default().as_root(true)
    }

    ///
    pub fn as_root(mut self, as_root: bool) -> Self {
        self.as_root = as_root;
        self
    }

    ///
    pub fn recursive(mut self, recursive: bool) -> Self {
        self.recursive = recursive;
        self
    }

    ///
    pub fn force(mut self, force: bool) -> Self {
        self.force = Some(force);
        self
    }

    ///
    pub fn preserve(mut self, preserve: bool) -> Self {
        self.preserve = preserve;
        self
    }

    ///
    pub fn timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }
}

fn is_blank(s: &str) -> bool {
    s.trim().is_empty()
}

fn flags(options: &[(char, bool)]) -> Vec<String> {
    options
        .iter()
        .filter(|(_, on)| *on)
        .map(|(flag, _)| format!("-{}", flag))
        .collect()
}

fn execute_shell_cmd(
    exec: &dyn Executor,
    cmd: &str,
    options: &[(char, bool)],
    args: &[&str],
    opts: &FileOptions,
) -> Result<()> {
    let mut argv = vec![cmd.to_string()];
    argv.extend(flags(options));
    argv.extend(args.iter().map(|a| a.to_string()));

    let mut command = ExecCommand::new(argv).timeout(opts.timeout);
    if opts.as_root {
        command = command.as_root(ROOT_HELPER);
    }

    exec.execute(&command)?;
    Ok(())
}

/// Change the mode of `path`.
pub fn chmod(exec: &dyn Executor, path: &str, mode: &FileMode, opts: &FileOptions) -> Result<()> {
    if is_blank(path) {
        return unprocessable("Cannot change mode of a blank file.");
    }
    let shell_mode = match mode.to_shell_mode() {
        Some(m) => m,
        None => return unprocessable("No file mode specified."),
    };

    let options = [('f', opts.force.unwrap_or(false)), ('R', opts.recursive)];
    execute_shell_cmd(exec, "chmod", &options, &[&shell_mode, path], opts)
}

/// Remove `path`.
pub fn remove(exec: &dyn Executor, path: &str, opts: &FileOptions) -> Result<()> {
    if is_blank(path) {
        return unprocessable("Cannot remove a blank file.");
    }

    let options = [('f', opts.force.unwrap_or(false)), ('R', opts.recursive)];
    execute_shell_cmd(exec, "rm", &options, &[path], opts)
}

/// Move `source` to `destination`.
pub fn move_path(
    exec: &dyn Executor,
    source: &str,
    destination: &str,
    opts: &FileOptions,
) -> Result<()> {
    if is_blank(source) {
        return unprocessable("Missing source path.");
    }
    if is_blank(destination) {
        return unprocessable("Missing destination path.");
    }

    let options = [('f', opts.force.unwrap_or(false))];
    execute_shell_cmd(exec, "mv", &options, &[source, destination], opts)
}

/// Copy `source` to `destination`.
pub fn copy(exec: &dyn Executor, source: &str, destination: &str, opts: &FileOptions) -> Result<()> {
    if is_blank(source) {
        return unprocessable("Missing source path.");
    }
    if is_blank(destination) {
        return unprocessable("Missing destination path.");
    }

    let options = [
        ('f', opts.force.unwrap_or(false)),
        ('R', opts.recursive),
        ('p', opts.preserve),
    ];
    execute_shell_cmd(exec, "cp", &options, &[source, destination], opts)
}

/// Change the owner and/or the group of `path`; at least one must be given.
pub fn chown(
    exec: &dyn Executor,
    path: &str,
    owner: Option<&str>,
    group: Option<&str>,
    opts: &FileOptions,
) -> Result<()> {
    if is_blank(path) {
        return unprocessable("Cannot change ownership of a blank file.");
    }

    let owner = owner.filter(|o| !is_blank(o)).unwrap_or("");
    let group = group.filter(|g| !is_blank(g)).unwrap_or("");
    if owner.is_empty() && group.is_empty() {
        return unprocessable("Please specify owner or group, or both.");
    }

    let owner_group = format!("{}:{}", owner, group);
    let options = [('f', opts.force.unwrap_or(false)), ('R', opts.recursive)];
    execute_shell_cmd(exec, "chown", &options, &[&owner_group, path], opts)
}

/// Create `path`, then hand it to `user`/`group` when either is given.
///
/// `force` defaults to true here and maps to `mkdir -p`.
pub fn create_directory(
    exec: &dyn Executor,
    path: &str,
    user: Option<&str>,
    group: Option<&str>,
    opts: &FileOptions,
) -> Result<()> {
    if is_blank(path) {
        return unprocessable("Cannot create a blank directory.");
    }

    let options = [('p', opts.force.unwrap_or(true))];
    execute_shell_cmd(exec, "mkdir", &options, &[path], opts)?;

    let user = user.filter(|u| !is_blank(u));
    let group = group.filter(|g| !is_blank(g));
    if user.is_some() || group.is_some() {
        let chown_opts = FileOptions {
            force: None,
            ..opts.clone()
        };
        chown(exec, path, user, group, &chown_opts)?;
    }
    Ok(())
}

/// Linux distribution family of the guest
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OsFamily {
    ///
    Redhat,
    ///
    Suse,
    ///
    Debian,
}

impl OsFamily {
    ///
    pub fn as_str(&self) -> &'static str {
        match self {
            OsFamily::Redhat => "redhat",
            OsFamily::Suse => "suse",
            OsFamily::Debian => "debian",
        }
    }
}

impl fmt::Display for OsFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

const REDHAT_RELEASE: &str = "etc/redhat-release";
const SUSE_RELEASE: &str = "etc/SuSE-release";

/// detect the distribution family of this guest
pub fn get_os() -> OsFamily {
    get_os_in(Path::new("/"))
}

/// detect the distribution family of the tree mounted at `root`
pub fn get_os_in(root: &Path) -> OsFamily {
    if root.join(REDHAT_RELEASE).is_file() {
        OsFamily::Redhat
    } else if root.join(SUSE_RELEASE).is_file() {
        OsFamily::Suse
    } else {
        OsFamily::Debian
    }
}

/// the first candidate that is an existing regular file
pub fn file_discovery<P: AsRef<Path>>(candidates: &[P]) -> Option<PathBuf> {
    candidates
        .iter()
        .map(|c| c.as_ref())
        .find(|c| c.is_file())
        .map(Path::to_path_buf)
}
