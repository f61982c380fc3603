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

//! the `[Couchbase]` section of the guest agent config file
#![allow(non_snake_case)]

use crate::error::*;
use confique::Config;
use guestagent::config::AGENT_CONFIG;
use std::path::Path;
use std::time::Duration;

///
#[derive(Config, Debug)]
pub struct CouchbaseConfig {
    ///
    #[config(nested)]
    pub Couchbase: CouchbaseOptions,
}

/// knobs of the couchbase plugin
#[derive(Config, Debug, Clone)]
pub struct CouchbaseOptions {
    /// data directory handed to node-init
    #[config(default = "/var/lib/couchbase")]
    pub MountPoint: String,
    /// holds the root password file
    #[config(default = "/etc/couchbase")]
    pub ConfDir: String,
    /// seconds
    #[config(default = 1200)]
    pub InstallTimeout: u64,
    /// seconds to wait for each prompt of the password reset tool
    #[config(default = 30)]
    pub PasswordResetTimeout: u64,
}

impl CouchbaseConfig {
    /// Load from `file`, or the default agent config file.
    pub fn load(file: Option<&Path>) -> Result<CouchbaseConfig> {
        let builder = CouchbaseConfig::builder().env();
        builder
            .file(file.unwrap_or_else(|| Path::new(AGENT_CONFIG)))
            .load()
            .context(ConfiqueSnafu)
    }
}

impl CouchbaseOptions {
    ///
    pub fn install_timeout(&self) -> Duration {
        Duration::from_secs(self.InstallTimeout)
    }

    ///
    pub fn password_reset_timeout(&self) -> Duration {
        Duration::from_secs(self.PasswordResetTimeout)
    }
}

impl Default for CouchbaseOptions {
    fn default() -> Self {
        Self {
            MountPoint: "/var/lib/couchbase".to_string(),
            ConfDir: "/etc/couchbase".to_string(),
            InstallTimeout: crate::system::TIME_OUT,
            PasswordResetTimeout: 30,
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use std::io::Write;
    use std::path::PathBuf;
    use tempfile::NamedTempFile;

    /* the file format is taken from the extension */
    fn toml_file() -> NamedTempFile {
        tempfile::Builder::new().suffix(".toml").tempfile().unwrap()
    }

    #[test]
    fn load() {
        let mut file = PathBuf::from(env!("CARGO_MANIFEST_DIR"));
        file.push("../../config/guestagent.toml");
        let config = CouchbaseConfig::load(Some(&file)).unwrap();
        assert_eq!(config.Couchbase.MountPoint, "/var/lib/couchbase");
        assert_eq!(config.Couchbase.install_timeout(), Duration::from_secs(1200));
    }

    #[test]
    fn load_overrides() {
        let mut file = toml_file();
        writeln!(
            file,
            "[Agent]\nStatusPollInterval = 1\n\n[Couchbase]\nConfDir = \"/tmp/cb\"\nPasswordResetTimeout = 5"
        )
        .unwrap();
        let config = CouchbaseConfig::load(Some(file.path())).unwrap();
        assert_eq!(config.Couchbase.ConfDir, "/tmp/cb");
        assert_eq!(
            config.Couchbase.password_reset_timeout(),
            Duration::from_secs(5)
        );
        assert_eq!(
            config.Couchbase.MountPoint,
            CouchbaseOptions::default().MountPoint
        );
    }
}
