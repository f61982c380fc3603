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

//! root account of the Couchbase Server
//!
//! The password file below the conf dir is the only store of the root
//! password. It is owner read-only.

use crate::error::*;
use crate::password_reset::{reset_password, ResetState};
use crate::system::{self, DEFAULT_PASSWORD, SECRET_KEY};
use basic::exec::Executor;
use basic::file_util::{read_first_line, write_secret_temp};
use basic::operating_system::{create_directory, move_path, FileOptions};
use basic::random::generate_random_password;
use guestagent::models::RootUser;
use std::fs;
use std::path::{Path, PathBuf};
use std::rc::Rc;
use std::time::Duration;

/// Manages the root password of the Couchbase Server.
pub struct CouchbaseRootAccess {
    exec: Rc<dyn Executor>,
    conf_dir: PathBuf,
    ip_address: String,
    password_length: usize,
    reset_timeout: Duration,
    reset_argv: Option<Vec<String>>,
}

impl CouchbaseRootAccess {
    ///
    pub fn new(exec: Rc<dyn Executor>, conf_dir: &Path, ip_address: &str) -> Self {
        CouchbaseRootAccess {
            exec,
            conf_dir: conf_dir.to_path_buf(),
            ip_address: ip_address.to_string(),
            password_length: 36,
            reset_timeout: Duration::from_secs(30),
            reset_argv: None,
        }
    }

    /// length of generated passwords
    pub fn with_password_length(mut self, length: usize) -> Self {
        self.password_length = length;
        self
    }

    /// how long to wait for each prompt of the reset tool
    pub fn with_reset_timeout(mut self, timeout: Duration) -> Self {
        self.reset_timeout = timeout;
        self
    }

    /// replace `cbreset_password` by another interactive command
    pub fn with_reset_command(mut self, argv: Vec<String>) -> Self {
        self.reset_argv = Some(argv);
        self
    }

    /// the password file
    pub fn pwd_file(&self) -> PathBuf {
        self.conf_dir.join(SECRET_KEY)
    }

    /// Enable the root account and return it in its control plane form.
    ///
    /// A given password is only stored, otherwise a generated one is set
    /// on the server first. An empty password counts as not given.
    pub fn enable_root(&self, root_password: Option<&str>) -> Result<serde_json::Value> {
        let user = match root_password.filter(|p| !p.is_empty()) {
            Some(password) => {
                self.write_password_to_file(password)?;
                RootUser::root(password)
            }
            None => {
                let user = RootUser::root(&generate_random_password(self.password_length));
                self.set_password(&user.password)?;
                user
            }
        };
        Ok(user.to_json()?)
    }

    /// Reset the server root password through the interactive tool.
    pub fn set_password(&self, root_password: &str) -> Result<()> {
        let argv = match &self.reset_argv {
            Some(argv) => argv.clone(),
            None => system::cmd_reset_pwd(&self.ip_address),
        };

        match reset_password(self.exec.as_ref(), &argv, root_password, self.reset_timeout)? {
            ResetState::Succeeded => log::info!("Couchbase root password was reset."),
            ResetState::TimedOut => {
                log::warn!("Password reset tool timed out, storing the password anyway.")
            }
            state => {
                return Err(Error::PasswordReset {
                    msg: format!("reset tool ended in state {:?}", state),
                })
            }
        }

        self.write_password_to_file(root_password)
    }

    /// Store `root_password` in the owner read-only password file.
    pub fn write_password_to_file(&self, root_password: &str) -> Result<()> {
        let conf_dir = self.conf_dir.to_string_lossy();
        create_directory(
            self.exec.as_ref(),
            &conf_dir,
            None,
            None,
            &FileOptions::root(),
        )
        .map_err(|e| save_password_error(&e))?;

        let temp = write_secret_temp(root_password).map_err(|e| save_password_error(&e))?;
        let moved = move_path(
            self.exec.as_ref(),
            &temp.to_string_lossy(),
            &self.pwd_file().to_string_lossy(),
            &FileOptions::root(),
        );
        if let Err(e) = moved {
            let _ = fs::remove_file(&temp);
            return Err(save_password_error(&e));
        }
        Ok(())
    }

    /// the stored password, or the default of a fresh install
    pub fn get_password(&self) -> Result<String> {
        let pwd_file = self.pwd_file();
        if !pwd_file.exists() {
            return Ok(DEFAULT_PASSWORD.to_string());
        }
        Ok(read_first_line(&pwd_file)?.trim().to_string())
    }

    /// whether a root password has been stored
    pub fn is_root_enabled(&self) -> bool {
        self.pwd_file().exists()
    }
}

fn save_password_error(e: &basic::error::Error) -> Error {
    let msg = format!("An error occurred in saving password. {}", e);
    log::error!("{}", msg);
    Error::SavePassword { msg }
}
