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

//! The operations the guest agent calls on a Couchbase guest.

use crate::config::CouchbaseOptions;
use crate::couchbase_app::CouchbaseApp;
use crate::couchbase_root::CouchbaseRootAccess;
use crate::couchbase_status::CouchbaseAppStatus;
use crate::error::*;
use basic::exec::{Executor, ProcessExecutor};
use basic::net_util::get_my_ipv4;
use basic::operating_system::get_os;
use basic::pkg::{packager_for, PackageManager};
use guestagent::config::AgentConfig;
use guestagent::status::{BaseDbStatus, DbStatus, ServiceStatus};
use std::path::Path;
use std::rc::Rc;

/// Couchbase datastore manager
pub struct Manager {
    app: CouchbaseApp,
    status: Rc<BaseDbStatus<CouchbaseAppStatus>>,
    root: Rc<CouchbaseRootAccess>,
}

impl Manager {
    /// manager of this guest, running real commands
    pub fn new(agent: &AgentConfig, options: &CouchbaseOptions) -> Self {
        let exec: Rc<dyn Executor> = Rc::new(ProcessExecutor::new());
        let os = get_os();
        log::debug!("Guest operating system family: {}.", os);
        let packager = packager_for(os, exec.clone());
        Manager::with_collaborators(exec, packager, &get_my_ipv4(), agent, options)
    }

    /// manager wired to the given collaborators
    pub fn with_collaborators(
        exec: Rc<dyn Executor>,
        packager: Rc<dyn PackageManager>,
        ip_address: &str,
        agent: &AgentConfig,
        options: &CouchbaseOptions,
    ) -> Self {
        let root = Rc::new(
            CouchbaseRootAccess::new(exec.clone(), Path::new(&options.ConfDir), ip_address)
                .with_password_length(agent.DefaultPasswordLength)
                .with_reset_timeout(options.password_reset_timeout()),
        );
        let status = Rc::new(BaseDbStatus::new(
            CouchbaseAppStatus::new(exec.clone(), root.clone(), ip_address),
            agent.status_poll_interval(),
        ));
        let app = CouchbaseApp::new(
            exec,
            status.clone(),
            packager,
            root.clone(),
            ip_address,
            options,
            agent.state_change_wait_time(),
        );
        Manager { app, status, root }
    }

    /// look for the init system files below `root` instead of `/`
    pub fn with_service_root(mut self, root: &Path) -> Self {
        self.app = self.app.with_service_root(root);
        self
    }

    /// Install and set up a fresh Couchbase Server.
    ///
    /// A given root password is stored before the cluster is initialized
    /// with it.
    pub fn prepare(&self, packages: &[&str], root_password: Option<&str>) -> Result<()> {
        self.status.begin_install();
        self.app.install_if_needed(packages)?;
        if let Some(password) = root_password {
            self.app.enable_root(Some(password))?;
        }
        self.app.initial_setup()?;
        self.app.complete_install_or_restart();
        log::info!("Completed setup of Couchbase database instance.");
        Ok(())
    }

    ///
    pub fn restart(&self) -> Result<()> {
        self.app.restart()
    }

    ///
    pub fn start_db_with_conf_changes(&self, config_contents: &str) -> Result<()> {
        self.app.start_db_with_conf_changes(config_contents)
    }

    ///
    pub fn stop_db(&self, do_not_start_on_reboot: bool) -> Result<()> {
        self.app.stop_db(false, do_not_start_on_reboot)
    }

    ///
    pub fn reset_configuration(&self, config_contents: &str) {
        self.app.reset_configuration(config_contents)
    }

    /// the root user in its control plane form
    pub fn enable_root(&self, root_password: Option<&str>) -> Result<serde_json::Value> {
        self.app.enable_root(root_password)
    }

    ///
    pub fn is_root_enabled(&self) -> bool {
        self.root.is_root_enabled()
    }

    /// refresh the stored status from the server
    pub fn update_status(&self) {
        self.status.update();
    }

    ///
    pub fn get_status(&self) -> ServiceStatus {
        self.status.status()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use basic::exec::mock::MockExecutor;
    use basic::pkg::DebianPackager;
    use std::fs;
    use tempfile::TempDir;

    const ACTIVE: &str = r#"{"clusterMembership":"active"}"#;

    fn manager(dir: &TempDir, exec: Rc<MockExecutor>) -> Manager {
        let agent = AgentConfig {
            StatusPollInterval: 0,
            StateChangeWaitTime: 1,
            ..Default::default()
        };
        let options = CouchbaseOptions {
            ConfDir: dir.path().join("conf").to_string_lossy().to_string(),
            ..Default::default()
        };
        let unit = dir
            .path()
            .join("lib/systemd/system/couchbase-server.service");
        fs::create_dir_all(unit.parent().unwrap()).unwrap();
        fs::write(unit, "").unwrap();

        let packager = Rc::new(DebianPackager::new(exec.clone()));
        Manager::with_collaborators(exec, packager, "10.0.0.2", &agent, &options)
            .with_service_root(dir.path())
    }

    #[test]
    fn test_prepare_installed() {
        let dir = TempDir::new().unwrap();
        let exec = Rc::new(MockExecutor::new());
        let manager = manager(&dir, exec.clone());

        exec.push_output("install ok installed", ""); /* dpkg-query */
        for _ in 0..6 {
            exec.push_output("", ""); /* chown, node-init, rm, cluster-init, sysctl x2 */
        }
        exec.push_output(ACTIVE, ""); /* server-info of the final status update */

        manager.prepare(&["couchbase-server"], None).unwrap();
        assert_eq!(manager.get_status(), ServiceStatus::Running);
        assert_eq!(exec.calls().len(), 8);
        assert!(!manager.is_root_enabled());
    }

    #[test]
    fn test_prepare_with_root_password() {
        let dir = TempDir::new().unwrap();
        let exec = Rc::new(MockExecutor::new());
        let manager = manager(&dir, exec.clone());

        exec.push_output("install ok installed", "");
        exec.push_output("", ""); /* mkdir conf dir */
        exec.push_failure(1); /* mv of the password file */

        let err = manager
            .prepare(&["couchbase-server"], Some("given"))
            .unwrap_err();
        assert!(matches!(err, Error::SavePassword { .. }));
        assert_eq!(manager.get_status(), ServiceStatus::Building);
    }

    #[test]
    fn test_update_status() {
        let dir = TempDir::new().unwrap();
        let exec = Rc::new(MockExecutor::new());
        let manager = manager(&dir, exec.clone());
        assert_eq!(manager.get_status(), ServiceStatus::New);

        exec.push_output(ACTIVE, "");
        manager.update_status();
        assert_eq!(manager.get_status(), ServiceStatus::Running);

        /* both the stored and the native password fail */
        exec.push_failure(1);
        exec.push_failure(1);
        manager.update_status();
        assert_eq!(manager.get_status(), ServiceStatus::Shutdown);
    }

    #[test]
    fn test_stop_and_restart() {
        let dir = TempDir::new().unwrap();
        let exec = Rc::new(MockExecutor::new());
        let manager = manager(&dir, exec.clone());

        exec.push_output("", ""); /* systemctl stop */
        exec.push_output("{\"clusterMembership\":\"inactiveFailed\"}", "");
        manager.stop_db(false).unwrap();

        exec.push_output("", ""); /* systemctl stop */
        exec.push_output("{\"clusterMembership\":\"inactiveFailed\"}", "");
        exec.push_output("", ""); /* systemctl enable */
        exec.push_output("", ""); /* systemctl start */
        exec.push_output(ACTIVE, "");
        exec.push_output(ACTIVE, ""); /* probe of end_install_or_restart */
        manager.restart().unwrap();
        assert_eq!(manager.get_status(), ServiceStatus::Running);
    }
}
