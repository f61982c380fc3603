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

//! real state of the Couchbase Server

use crate::couchbase_root::CouchbaseRootAccess;
use crate::error::*;
use crate::system;
use basic::exec::{ExecCommand, Executor};
use guestagent::status::{ActualStatus, ServiceStatus};
use serde::Deserialize;
use std::rc::Rc;

#[derive(Deserialize)]
struct ServerInfo {
    #[serde(rename = "clusterMembership")]
    cluster_membership: String,
}

/// Map the output of `couchbase-cli server-info` to a status.
///
/// Only an active cluster member reported without error text is running.
pub fn status_from_server_info(out: &str, err: &str) -> ServiceStatus {
    if !err.trim().is_empty() {
        return ServiceStatus::Shutdown;
    }
    match serde_json::from_str::<ServerInfo>(out) {
        Ok(info) if info.cluster_membership == "active" => ServiceStatus::Running,
        Ok(_) => ServiceStatus::Shutdown,
        Err(e) => {
            log::debug!("Unexpected server-info output: {}", e);
            ServiceStatus::Shutdown
        }
    }
}

/// Probes the server with the root credentials.
pub struct CouchbaseAppStatus {
    exec: Rc<dyn Executor>,
    root: Rc<CouchbaseRootAccess>,
    ip_address: String,
}

impl CouchbaseAppStatus {
    ///
    pub fn new(exec: Rc<dyn Executor>, root: Rc<CouchbaseRootAccess>, ip_address: &str) -> Self {
        CouchbaseAppStatus {
            exec,
            root,
            ip_address: ip_address.to_string(),
        }
    }

    fn get_status_from_couchbase(&self, pwd: &str) -> Result<ServiceStatus> {
        let cmd = ExecCommand::shell(&system::cmd_couchbase_status(&self.ip_address, pwd));
        let out = self.exec.execute(&cmd)?;
        Ok(status_from_server_info(&out.stdout, &out.stderr))
    }

    /// the root password recorded in the native config of the server
    fn password_from_config(&self) -> Result<String> {
        let cmd = ExecCommand::shell(system::CMD_GET_PASSWORD_FROM_CONFIG);
        let out = self.exec.execute(&cmd)?;
        Ok(out.stdout.trim().to_string())
    }
}

impl ActualStatus for CouchbaseAppStatus {
    fn get_actual_db_status(&self) -> ServiceStatus {
        let pwd = match self.root.get_password() {
            Ok(pwd) => Some(pwd),
            Err(e) => {
                log::error!("Error reading the stored Couchbase root password: {}", e);
                None
            }
        };

        if let Some(pwd) = &pwd {
            match self.get_status_from_couchbase(pwd) {
                Ok(status) => return status,
                /* continue with the native config */
                Err(e) => log::error!("Error getting the Couchbase status: {}", e),
            }
        }

        let config_pwd = match self.password_from_config() {
            Ok(config_pwd) => config_pwd,
            Err(e) => {
                log::error!(
                    "Error getting the root password from the native Couchbase config file: {}",
                    e
                );
                return ServiceStatus::Shutdown;
            }
        };

        if config_pwd.is_empty() || Some(&config_pwd) == pwd.as_ref() {
            log::debug!(
                "The root password from the native Couchbase config file is either empty \
                 or already matches the stored value."
            );
            return ServiceStatus::Shutdown;
        }

        let status = match self.get_status_from_couchbase(&config_pwd) {
            Ok(status) => status,
            Err(e) => {
                log::error!(
                    "Error getting Couchbase status using the password parsed from the \
                     native Couchbase config file: {}",
                    e
                );
                return ServiceStatus::Shutdown;
            }
        };

        log::debug!("Updating the stored value for the Couchbase root password.");
        if let Err(e) = self.root.write_password_to_file(&config_pwd) {
            log::error!("Failed to store the Couchbase root password: {}", e);
        }
        status
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use basic::exec::mock::MockExecutor;
    use tempfile::TempDir;

    const ACTIVE: &str = r#"{"clusterMembership":"active","status":"healthy"}"#;

    fn app_status(dir: &TempDir) -> (Rc<MockExecutor>, Rc<CouchbaseRootAccess>, CouchbaseAppStatus) {
        let exec = Rc::new(MockExecutor::new());
        let root = Rc::new(CouchbaseRootAccess::new(exec.clone(), dir.path(), "10.0.0.2"));
        let status = CouchbaseAppStatus::new(exec.clone(), root.clone(), "10.0.0.2");
        (exec, root, status)
    }

    #[test]
    fn test_status_from_server_info() {
        assert_eq!(status_from_server_info(ACTIVE, ""), ServiceStatus::Running);
        assert_eq!(
            status_from_server_info(r#"{"clusterMembership":"inactiveAdded"}"#, ""),
            ServiceStatus::Shutdown
        );
        assert_eq!(
            status_from_server_info(ACTIVE, "ERROR: unable to connect"),
            ServiceStatus::Shutdown
        );
        assert_eq!(
            status_from_server_info("not json", ""),
            ServiceStatus::Shutdown
        );
        assert_eq!(status_from_server_info("{}", ""), ServiceStatus::Shutdown);
    }

    #[test]
    fn test_running_with_stored_password() {
        let dir = TempDir::new().unwrap();
        let (exec, _, status) = app_status(&dir);
        exec.push_output(ACTIVE, "");

        assert_eq!(status.get_actual_db_status(), ServiceStatus::Running);
        let calls = exec.calls();
        assert_eq!(calls.len(), 1);
        assert!(calls[0].is_shell());
        assert_eq!(
            calls[0].argv()[0],
            system::cmd_couchbase_status("10.0.0.2", system::DEFAULT_PASSWORD)
        );
    }

    #[test]
    fn test_stale_password_heals() {
        let dir = TempDir::new().unwrap();
        let (exec, root, status) = app_status(&dir);
        exec.push_failure(1); /* server-info with the default password */
        exec.push_output("n3wpwd\n", ""); /* erl pipeline */
        exec.push_output(ACTIVE, ""); /* server-info with the parsed password */
        exec.push_output("", ""); /* mkdir */
        exec.push_output("", ""); /* mv */

        assert_eq!(status.get_actual_db_status(), ServiceStatus::Running);
        let argvs = exec.argvs();
        assert_eq!(argvs.len(), 5);
        assert_eq!(argvs[1][0], system::CMD_GET_PASSWORD_FROM_CONFIG);
        assert_eq!(argvs[2][0], system::cmd_couchbase_status("10.0.0.2", "n3wpwd"));
        assert_eq!(argvs[4][0], "mv");
        assert_eq!(argvs[4][2], root.pwd_file().to_string_lossy());
    }

    #[test]
    fn test_unreadable_stored_password_heals() {
        let dir = TempDir::new().unwrap();
        let (exec, root, status) = app_status(&dir);
        /* a directory in place of the password file fails every read */
        std::fs::create_dir(root.pwd_file()).unwrap();
        assert!(root.get_password().is_err());

        exec.push_output("n3wpwd\n", ""); /* erl pipeline */
        exec.push_output(ACTIVE, ""); /* server-info with the parsed password */
        exec.push_output("", ""); /* mkdir */
        exec.push_output("", ""); /* mv */

        assert_eq!(status.get_actual_db_status(), ServiceStatus::Running);
        let argvs = exec.argvs();
        assert_eq!(argvs.len(), 4);
        assert_eq!(argvs[0][0], system::CMD_GET_PASSWORD_FROM_CONFIG);
        assert_eq!(argvs[1][0], system::cmd_couchbase_status("10.0.0.2", "n3wpwd"));
        assert_eq!(argvs[3][0], "mv");
    }

    #[test]
    fn test_config_password_matches_stored() {
        let dir = TempDir::new().unwrap();
        let (exec, _, status) = app_status(&dir);
        exec.push_failure(1);
        exec.push_output("password\n", "");

        assert_eq!(status.get_actual_db_status(), ServiceStatus::Shutdown);
        assert_eq!(exec.calls().len(), 2);
    }

    #[test]
    fn test_native_config_unreadable() {
        let dir = TempDir::new().unwrap();
        let (exec, _, status) = app_status(&dir);
        exec.push_failure(1);
        exec.push_failure(2);

        assert_eq!(status.get_actual_db_status(), ServiceStatus::Shutdown);
    }

    #[test]
    fn test_parsed_password_rejected() {
        let dir = TempDir::new().unwrap();
        let (exec, root, status) = app_status(&dir);
        exec.push_failure(1);
        exec.push_output("other\n", "");
        exec.push_failure(1);

        assert_eq!(status.get_actual_db_status(), ServiceStatus::Shutdown);
        assert_eq!(exec.calls().len(), 3);
        assert!(!root.is_root_enabled());
    }
}
