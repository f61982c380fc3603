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

//! Install, configure, start and stop the Couchbase Server of the guest.
//!
//! The state of the server is never tracked here, every transition is
//! confirmed by polling the status collaborator.

use crate::config::CouchbaseOptions;
use crate::couchbase_root::CouchbaseRootAccess;
use crate::error::*;
use crate::system::{self, COUCHBASE_USER, INSTANCE_DATA_DIR, SERVICE_CANDIDATES};
use basic::exec::{ExecCommand, Executor};
use basic::operating_system::{chown, create_directory, remove, FileOptions};
use basic::pkg::PackageManager;
use basic::service_util::{service_discovery_in, ServiceCommands};
use guestagent::status::{DbStatus, ServiceStatus};
use std::path::{Path, PathBuf};
use std::rc::Rc;
use std::time::Duration;

/// Ends the install or restart of the status collaborator when dropped.
struct RestartGuard<'a> {
    status: &'a dyn DbStatus,
}

impl Drop for RestartGuard<'_> {
    fn drop(&mut self) {
        self.status.end_install_or_restart();
    }
}

/// Handles installation and configuration of couchbase on the guest.
pub struct CouchbaseApp {
    exec: Rc<dyn Executor>,
    status: Rc<dyn DbStatus>,
    packager: Rc<dyn PackageManager>,
    root: Rc<CouchbaseRootAccess>,
    ip_address: String,
    options: CouchbaseOptions,
    state_change_wait_time: Duration,
    service_root: PathBuf,
}

impl CouchbaseApp {
    ///
    pub fn new(
        exec: Rc<dyn Executor>,
        status: Rc<dyn DbStatus>,
        packager: Rc<dyn PackageManager>,
        root: Rc<CouchbaseRootAccess>,
        ip_address: &str,
        options: &CouchbaseOptions,
        state_change_wait_time: Duration,
    ) -> Self {
        CouchbaseApp {
            exec,
            status,
            packager,
            root,
            ip_address: ip_address.to_string(),
            options: options.clone(),
            state_change_wait_time,
            service_root: PathBuf::from("/"),
        }
    }

    /// look for the init system files below `root` instead of `/`
    pub fn with_service_root(mut self, root: &Path) -> Self {
        self.service_root = root.to_path_buf();
        self
    }

    fn execute_shell(&self, cmd: &str) -> basic::Result<()> {
        self.exec.execute(&ExecCommand::shell(cmd))?;
        Ok(())
    }

    fn discover_service(&self) -> Option<ServiceCommands> {
        service_discovery_in(&self.service_root, SERVICE_CANDIDATES)
    }

    /// Install couchbase if needed, do nothing if it is already installed.
    pub fn install_if_needed(&self, packages: &[&str]) -> Result<()> {
        log::info!("Preparing Guest as Couchbase Server.");
        if !self.packager.is_installed(packages)? {
            log::debug!("Installing Couchbase.");
            self.install_couchbase(packages)?;
        }
        Ok(())
    }

    fn install_couchbase(&self, packages: &[&str]) -> Result<()> {
        log::debug!(
            "Installing Couchbase Server. Creating {}",
            self.options.ConfDir
        );
        create_directory(
            self.exec.as_ref(),
            &self.options.ConfDir,
            None,
            None,
            &FileOptions::root(),
        )?;
        self.packager
            .install(packages, &[], self.options.install_timeout())?;
        self.start_db(false)?;
        log::debug!("Finished installing Couchbase Server.");
        Ok(())
    }

    /// Hand the data directory to couchbase and initialize the one node cluster.
    pub fn initial_setup(&self) -> Result<()> {
        match self.setup_node() {
            Err(Error::Util { source }) => {
                log::error!("Error performing initial Couchbase setup: {}", source);
                Err(Error::SetupFailed)
            }
            other => other,
        }
    }

    fn setup_node(&self) -> Result<()> {
        let mount_point = &self.options.MountPoint;
        log::info!("Couchbase Server change data dir path.");
        chown(
            self.exec.as_ref(),
            mount_point,
            Some(COUCHBASE_USER),
            Some(COUCHBASE_USER),
            &FileOptions::root(),
        )?;

        let pwd = self.root.get_password()?;
        self.execute_shell(&system::cmd_node_init(mount_point, &self.ip_address, &pwd))?;
        remove(
            self.exec.as_ref(),
            INSTANCE_DATA_DIR,
            &FileOptions::root().force(true),
        )?;

        log::debug!("Couchbase Server initialize cluster.");
        self.execute_shell(&system::cmd_cluster_init(&self.ip_address, &pwd))?;
        self.execute_shell(system::CMD_SET_SWAPPINESS)?;
        self.execute_shell(system::CMD_UPDATE_SYSCTL_CONF)?;
        log::info!("Couchbase Server initial setup finished.");
        Ok(())
    }

    /// finalize status updates for install or restart.
    pub fn complete_install_or_restart(&self) {
        self.status.end_install_or_restart();
    }

    fn enable_db_on_boot(&self) -> Result<()> {
        log::info!("Enabling Couchbase Server on boot.");
        let cmd = self
            .discover_service()
            .and_then(|s| s.cmd_enable)
            .ok_or_else(|| Error::CommandNotFound {
                what: "enable Couchbase Server on boot".to_string(),
            })?;
        self.execute_shell(&cmd)?;
        Ok(())
    }

    fn disable_db_on_boot(&self) -> Result<()> {
        log::debug!("Disabling Couchbase Server on boot.");
        let cmd = self
            .discover_service()
            .and_then(|s| s.cmd_disable)
            .ok_or_else(|| Error::CommandNotFound {
                what: "disable Couchbase Server on boot".to_string(),
            })?;
        self.execute_shell(&cmd)?;
        Ok(())
    }

    /// Stops Couchbase Server on the guest.
    pub fn stop_db(&self, update_db: bool, do_not_start_on_reboot: bool) -> Result<()> {
        log::debug!("Stopping Couchbase Server.");
        if do_not_start_on_reboot {
            self.disable_db_on_boot()?;
        }

        let service = self
            .discover_service()
            .ok_or_else(|| Error::CommandNotFound {
                what: "stop Couchbase Server".to_string(),
            })?;
        self.execute_shell(&service.cmd_stop)?;

        if !self.status.wait_for_real_status_to_change_to(
            ServiceStatus::Shutdown,
            self.state_change_wait_time,
            update_db,
        ) {
            log::error!("Could not stop Couchbase Server.");
            self.status.end_install_or_restart();
            return Err(Error::StopFailed);
        }
        Ok(())
    }

    /// Start the Couchbase Server.
    pub fn start_db(&self, update_db: bool) -> Result<()> {
        log::info!("Starting Couchbase Server.");

        self.enable_db_on_boot()?;
        let service = self
            .discover_service()
            .ok_or_else(|| Error::CommandNotFound {
                what: "start Couchbase Server".to_string(),
            })?;
        match self.execute_shell(&service.cmd_start) {
            Err(e) if e.is_process_failure() => {
                /* the wait below decides */
                log::debug!("Start command of Couchbase Server failed: {}", e);
            }
            other => other?,
        }

        if !self.status.wait_for_real_status_to_change_to(
            ServiceStatus::Running,
            self.state_change_wait_time,
            update_db,
        ) {
            log::error!("Start up of Couchbase Server failed.");
            if let Err(e) = self.execute_shell(system::CMD_KILL) {
                log::error!("Error killing Couchbase start command: {}", e);
            }
            self.status.end_install_or_restart();
            return Err(Error::StartFailed);
        }
        Ok(())
    }

    /// stop then start, the restart mode of the status always ends
    pub fn restart(&self) -> Result<()> {
        log::info!("Restarting Couchbase Server.");
        self.status.begin_restart();
        let _guard = RestartGuard {
            status: self.status.as_ref(),
        };
        self.stop_db(false, false)?;
        self.start_db(false)
    }

    ///
    pub fn enable_root(&self, root_password: Option<&str>) -> Result<serde_json::Value> {
        self.root.enable_root(root_password)
    }

    /// Start with a new configuration, refused while the server runs.
    pub fn start_db_with_conf_changes(&self, config_contents: &str) -> Result<()> {
        log::info!("Starting Couchbase with configuration changes.");
        log::info!("Configuration contents:\n {}.", config_contents);
        if self.status.is_running() {
            let status = self.status.status();
            log::error!(
                "Cannot start Couchbase with configuration changes. Couchbase state == {}.",
                status
            );
            return Err(Error::NotStopped { status });
        }
        self.write_config(config_contents);
        self.start_db(true)
    }

    ///
    pub fn reset_configuration(&self, config_contents: &str) {
        log::debug!("Resetting configuration.");
        self.write_config(config_contents);
    }

    /// Couchbase Server keeps no configuration file the agent manages.
    fn write_config(&self, config_contents: &str) {
        log::debug!(
            "Ignoring {} bytes of configuration contents.",
            config_contents.len()
        );
    }
}
