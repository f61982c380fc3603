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

//! discover how a service is controlled on this guest
//!
//! Probing order per candidate: upstart job, sysvinit script, systemd
//! unit. The first hit wins.

use std::fmt;
use std::fs;
use std::path::Path;

/// the init system owning a service
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InitSystem {
    ///
    Upstart,
    ///
    Sysvinit,
    ///
    Systemd,
}

impl fmt::Display for InitSystem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            InitSystem::Upstart => "upstart",
            InitSystem::Sysvinit => "sysvinit",
            InitSystem::Systemd => "systemd",
        };
        f.write_str(s)
    }
}

/// Shell commands controlling one discovered service.
///
/// A sysvinit service on a guest without update-rc.d or chkconfig has no
/// enable/disable commands.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceCommands {
    ///
    pub service: String,
    ///
    pub init_system: InitSystem,
    ///
    pub cmd_start: String,
    ///
    pub cmd_stop: String,
    ///
    pub cmd_enable: Option<String>,
    ///
    pub cmd_disable: Option<String>,
}

/// find the first candidate known to any init system of this guest
pub fn service_discovery(candidates: &[&str]) -> Option<ServiceCommands> {
    service_discovery_in(Path::new("/"), candidates)
}

/// same as [`service_discovery`] for the tree mounted at `root`
pub fn service_discovery_in(root: &Path, candidates: &[&str]) -> Option<ServiceCommands> {
    for service in candidates {
        if let Some(cmds) = probe(root, service) {
            log::debug!("Discovered {} service '{}'.", cmds.init_system, service);
            return Some(cmds);
        }
    }
    None
}

fn probe(root: &Path, service: &str) -> Option<ServiceCommands> {
    if root.join(format!("etc/init/{}.conf", service)).is_file() {
        return Some(ServiceCommands {
            service: service.to_string(),
            init_system: InitSystem::Upstart,
            cmd_start: format!("sudo start {}", service),
            cmd_stop: format!("sudo stop {}", service),
            cmd_enable: Some(format!(
                "sudo sed -i '/^manual$/d' /etc/init/{}.override",
                service
            )),
            cmd_disable: Some(format!(
                "sudo sh -c 'echo manual >> /etc/init/{}.override'",
                service
            )),
        });
    }

    if root.join(format!("etc/init.d/{}", service)).is_file() {
        let (cmd_enable, cmd_disable) = if root.join("usr/sbin/update-rc.d").is_file() {
            (
                Some(format!(
                    "sudo update-rc.d {0} defaults; sudo update-rc.d {0} enable",
                    service
                )),
                Some(format!(
                    "sudo update-rc.d {0} defaults; sudo update-rc.d {0} disable",
                    service
                )),
            )
        } else if root.join("sbin/chkconfig").is_file() {
            (
                Some(format!("sudo chkconfig {} on", service)),
                Some(format!("sudo chkconfig {} off", service)),
            )
        } else {
            (None, None)
        };

        return Some(ServiceCommands {
            service: service.to_string(),
            init_system: InitSystem::Sysvinit,
            cmd_start: format!("sudo service {} start", service),
            cmd_stop: format!("sudo service {} stop", service),
            cmd_enable,
            cmd_disable,
        });
    }

    let unit_path = root.join(format!("lib/systemd/system/{}.service", service));
    if unit_path.is_file() {
        // "systemctl enable" refuses symlinked units, use the real unit name
        let unit_name = match fs::symlink_metadata(&unit_path) {
            Ok(meta) if meta.file_type().is_symlink() => fs::canonicalize(&unit_path)
                .ok()
                .and_then(|p| p.file_name().map(|n| n.to_string_lossy().to_string()))
                .unwrap_or_else(|| service.to_string()),
            _ => service.to_string(),
        };

        return Some(ServiceCommands {
            service: service.to_string(),
            init_system: InitSystem::Systemd,
            cmd_start: format!("sudo systemctl start {}", service),
            cmd_stop: format!("sudo systemctl stop {}", service),
            cmd_enable: Some(format!("sudo systemctl enable {}", unit_name)),
            cmd_disable: Some(format!("sudo systemctl disable {}", unit_name)),
        });
    }

    None
}
