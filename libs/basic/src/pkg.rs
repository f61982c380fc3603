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

//! package manager collaborators
//!
//! The packager is handed to whoever needs it; nothing here is global.

use crate::error::*;
use crate::exec::{ExecCommand, Executor, ROOT_HELPER};
use crate::operating_system::OsFamily;
use std::rc::Rc;
use std::time::Duration;

/// The package-manager contract of a datastore plugin.
pub trait PackageManager {
    /// true only if every package is installed
    fn is_installed(&self, packages: &[&str]) -> Result<bool>;

    /// install the packages, passing `options` to the package tool
    fn install(&self, packages: &[&str], options: &[&str], timeout: Duration) -> Result<()>;
}

/// pick the packager matching the distribution family
pub fn packager_for(os: OsFamily, exec: Rc<dyn Executor>) -> Rc<dyn PackageManager> {
    match os {
        OsFamily::Redhat => Rc::new(RedhatPackager::new(exec)),
        OsFamily::Suse | OsFamily::Debian => Rc::new(DebianPackager::new(exec)),
    }
}

/// run one query per package; a failing query means "not installed"
fn all_installed<F>(
    exec: &dyn Executor,
    packages: &[&str],
    query: F,
    installed: fn(&str) -> bool,
) -> Result<bool>
where
    F: Fn(&str) -> ExecCommand,
{
    for package in packages {
        match exec.execute(&query(package)) {
            Ok(out) if installed(&out.stdout) => continue,
            Ok(_) => return Ok(false),
            Err(e) if e.is_process_failure() => {
                log::debug!("Package {} is not installed: {}", package, e);
                return Ok(false);
            }
            Err(e) => return Err(e),
        }
    }
    Ok(true)
}

fn dpkg_installed(status: &str) -> bool {
    status.trim() == "install ok installed"
}

/// dpkg/apt based guests
pub struct DebianPackager {
    exec: Rc<dyn Executor>,
}

impl DebianPackager {
    ///
    pub fn new(exec: Rc<dyn Executor>) -> Self {
        DebianPackager { exec }
    }
}

impl PackageManager for DebianPackager {
    fn is_installed(&self, packages: &[&str]) -> Result<bool> {
        all_installed(
            self.exec.as_ref(),
            packages,
            |package| ExecCommand::new(["dpkg-query", "-W", "-f=${Status}", package]),
            dpkg_installed,
        )
    }

    fn install(&self, packages: &[&str], options: &[&str], timeout: Duration) -> Result<()> {
        let mut argv = vec![
            "env",
            "DEBIAN_FRONTEND=noninteractive",
            "apt-get",
            "-y",
            "--allow-unauthenticated",
        ];
        argv.extend_from_slice(options);
        argv.push("install");
        argv.extend_from_slice(packages);

        log::info!("Installing packages: {}", packages.join(" "));
        self.exec.execute(
            &ExecCommand::new(argv)
                .as_root(ROOT_HELPER)
                .timeout(Some(timeout)),
        )?;
        Ok(())
    }
}

/// rpm/yum based guests
pub struct RedhatPackager {
    exec: Rc<dyn Executor>,
}

impl RedhatPackager {
    ///
    pub fn new(exec: Rc<dyn Executor>) -> Self {
        RedhatPackager { exec }
    }
}

impl PackageManager for RedhatPackager {
    fn is_installed(&self, packages: &[&str]) -> Result<bool> {
        // rpm -q exits non-zero for a missing package
        all_installed(
            self.exec.as_ref(),
            packages,
            |package| ExecCommand::new(["rpm", "-q", package]),
            |_| true,
        )
    }

    fn install(&self, packages: &[&str], options: &[&str], timeout: Duration) -> Result<()> {
        let mut argv = vec!["yum", "--color=never", "-y"];
        argv.extend_from_slice(options);
        argv.push("install");
        argv.extend_from_slice(packages);

        log::info!("Installing packages: {}", packages.join(" "));
        self.exec.execute(
            &ExecCommand::new(argv)
                .as_root(ROOT_HELPER)
                .timeout(Some(timeout)),
        )?;
        Ok(())
    }
}
