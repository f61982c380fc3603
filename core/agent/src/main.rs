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

//! guestagent: run one operation of the Couchbase datastore manager.
//!
//! Results are printed on stdout as json. A failed operation is logged
//! and the process exits with 1.

use clap::Parser;
use couchbase::config::CouchbaseConfig;
use couchbase::manager::Manager;
use guestagent::config::GuestConfig;
use serde_json::{json, Value};
use std::path::PathBuf;
use std::process::exit;

/// parse program arguments
#[derive(Parser, Debug)]
#[clap(author, version, about, long_about = None)]
struct Args {
    /// Configuration file
    #[clap(short, long, parse(from_os_str))]
    config: Option<PathBuf>,

    #[clap(subcommand)]
    subcmd: SubCmd,
}

#[derive(Parser, Debug, PartialEq)]
enum SubCmd {
    /// Install and set up Couchbase Server
    #[clap(display_order = 1)]
    Prepare {
        #[clap(required = true)]
        packages: Vec<String>,
        /// Store this root password before the cluster is initialized
        #[clap(long)]
        root_password: Option<String>,
    },

    /// Restart Couchbase Server
    #[clap(display_order = 2)]
    Restart {},

    /// Start a stopped Couchbase Server with new configuration contents
    #[clap(display_order = 3)]
    StartWithConf {
        #[clap(long, default_value = "")]
        config_contents: String,
    },

    /// Stop Couchbase Server
    #[clap(display_order = 4)]
    Stop {
        #[clap(long)]
        do_not_start_on_reboot: bool,
    },

    /// Reset the configuration contents
    #[clap(display_order = 5)]
    ResetConfiguration {
        #[clap(long, default_value = "")]
        config_contents: String,
    },

    /// Probe and print the service status
    #[clap(display_order = 6)]
    Status {},

    /// Enable the root user, generating a password unless one is given
    #[clap(display_order = 7)]
    EnableRoot {
        #[clap(long)]
        password: Option<String>,
    },

    /// Whether a root password has been stored
    #[clap(display_order = 8)]
    IsRootEnabled {},
}

fn run(manager: &Manager, subcmd: SubCmd) -> couchbase::Result<Value> {
    match subcmd {
        SubCmd::Prepare {
            packages,
            root_password,
        } => {
            let packages: Vec<&str> = packages.iter().map(String::as_str).collect();
            manager.prepare(&packages, root_password.as_deref())?;
            Ok(Value::Null)
        }
        SubCmd::Restart {} => {
            manager.restart()?;
            Ok(Value::Null)
        }
        SubCmd::StartWithConf { config_contents } => {
            manager.start_db_with_conf_changes(&config_contents)?;
            Ok(Value::Null)
        }
        SubCmd::Stop {
            do_not_start_on_reboot,
        } => {
            manager.stop_db(do_not_start_on_reboot)?;
            Ok(Value::Null)
        }
        SubCmd::ResetConfiguration { config_contents } => {
            manager.reset_configuration(&config_contents);
            Ok(Value::Null)
        }
        SubCmd::Status {} => {
            manager.update_status();
            let status = manager.get_status();
            Ok(json!({
                "status": status,
                "code": status.code(),
                "description": status.description(),
                "api_status": status.api_status(),
            }))
        }
        SubCmd::EnableRoot { password } => manager.enable_root(password.as_deref()),
        SubCmd::IsRootEnabled {} => Ok(Value::Bool(manager.is_root_enabled())),
    }
}

fn main() {
    let args = Args::parse();

    let config = match GuestConfig::load(args.config.as_deref()) {
        Ok(v) => v,
        Err(e) => {
            log::init_log_to_console("guestagent", log::Level::Info);
            log::error!("Failed to load the guest agent configuration: {}", e);
            exit(1);
        }
    };
    log::init_log(
        "guestagent",
        log::parse_level(&config.Agent.LogLevel),
        &config.Agent.log_targets(),
        &config.Agent.LogFile,
    );

    let couchbase_config = match CouchbaseConfig::load(args.config.as_deref()) {
        Ok(v) => v,
        Err(e) => {
            log::error!("Failed to load the couchbase configuration: {}", e);
            exit(1);
        }
    };

    let manager = Manager::new(&config.Agent, &couchbase_config.Couchbase);
    match run(&manager, args.subcmd) {
        Ok(Value::Null) => {}
        Ok(v) => println!("{}", v),
        Err(e) => {
            log::error!("{}", e);
            exit(1);
        }
    }
}
