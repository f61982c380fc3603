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

//! agent-wide configuration, the `[Agent]` section of the config file
#![allow(non_snake_case)]

use crate::error::*;
use confique::Config;
use std::path::Path;
use std::time::Duration;

/// default configuration file of the guest agent
pub const AGENT_CONFIG: &str = "/etc/guestagent/guestagent.toml";

///
#[derive(Config, Debug)]
pub struct GuestConfig {
    ///
    #[config(nested)]
    pub Agent: AgentConfig,
}

/// knobs shared by every datastore plugin
#[derive(Config, Debug)]
pub struct AgentConfig {
    /// seconds to wait for a start or stop to show in the status
    #[config(default = 600)]
    pub StateChangeWaitTime: u64,
    /// seconds between two status probes while waiting
    #[config(default = 3)]
    pub StatusPollInterval: u64,
    /// length of generated root passwords
    #[config(default = 36)]
    pub DefaultPasswordLength: usize,

    #[config(env = "GUESTAGENT_LOG_LEVEL")]
    #[config(default = "info")]
    pub LogLevel: String,
    #[config(default = "console")]
    pub LogTarget: String,
    #[config(default = "/var/log/guestagent/guestagent.log")]
    pub LogFile: String,
}

impl GuestConfig {
    /// Load from `file`, or the default file. A missing file leaves every
    /// value at its default.
    pub fn load(file: Option<&Path>) -> Result<GuestConfig> {
        let builder = GuestConfig::builder().env();
        builder
            .file(file.unwrap_or_else(|| Path::new(AGENT_CONFIG)))
            .load()
            .context(ConfiqueSnafu)
    }
}

impl AgentConfig {
    ///
    pub fn state_change_wait_time(&self) -> Duration {
        Duration::from_secs(self.StateChangeWaitTime)
    }

    ///
    pub fn status_poll_interval(&self) -> Duration {
        Duration::from_secs(self.StatusPollInterval)
    }

    /// log targets listed in `LogTarget`, comma or space separated
    pub fn log_targets(&self) -> Vec<&str> {
        self.LogTarget
            .split(|c: char| c == ',' || c.is_whitespace())
            .filter(|t| !t.is_empty())
            .collect()
    }
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            StateChangeWaitTime: 600,
            StatusPollInterval: 3,
            DefaultPasswordLength: 36,
            LogLevel: "info".to_string(),
            LogTarget: "console".to_string(),
            LogFile: "/var/log/guestagent/guestagent.log".to_string(),
        }
    }
}

impl Default for GuestConfig {
    fn default() -> Self {
        Self {
            Agent: AgentConfig::default(),
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
        file.push("config/guestagent.toml");
        let config = GuestConfig::load(Some(&file)).unwrap();
        assert_eq!(config.Agent.StateChangeWaitTime, 600);
        assert_eq!(config.Agent.DefaultPasswordLength, 36);
        assert_eq!(config.Agent.log_targets(), vec!["console"]);
    }

    #[test]
    fn load_overrides() {
        let mut file = toml_file();
        writeln!(
            file,
            "[Agent]\nStateChangeWaitTime = 30\nLogTarget = \"console,syslog\""
        )
        .unwrap();
        let config = GuestConfig::load(Some(file.path())).unwrap();
        assert_eq!(config.Agent.state_change_wait_time(), Duration::from_secs(30));
        assert_eq!(config.Agent.status_poll_interval(), Duration::from_secs(3));
        assert_eq!(config.Agent.log_targets(), vec!["console", "syslog"]);
    }

    #[test]
    fn load_missing_file() {
        let config = GuestConfig::load(Some(Path::new("/nonexistent/guestagent.toml"))).unwrap();
        assert_eq!(config.Agent.StatusPollInterval, 3);
        assert_eq!(config.Agent.LogFile, GuestConfig::default().Agent.LogFile);
    }

    #[test]
    fn load_malformed_file() {
        let mut file = toml_file();
        writeln!(file, "[Agent]\nStateChangeWaitTime = \"soon\"").unwrap();
        assert!(GuestConfig::load(Some(file.path())).is_err());
    }
}
