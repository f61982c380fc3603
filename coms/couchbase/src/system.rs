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

//! paths and command lines of a Couchbase Server installation

/// service names the init system may know Couchbase Server by
pub const SERVICE_CANDIDATES: &[&str] = &["couchbase-server"];
/// account and group owning the data directory
pub const COUCHBASE_USER: &str = "couchbase";
/// stale instance data left over by the package install
pub const INSTANCE_DATA_DIR: &str = "/opt/couchbase/var/lib/couchbase/data";
/// name of the root password file below the conf dir
pub const SECRET_KEY: &str = "secret_key";
/// password of a fresh install
pub const DEFAULT_PASSWORD: &str = "password";
/// package install timeout, seconds
pub const TIME_OUT: u64 = 1200;
/// REST port of the node
pub const COUCHBASE_REST_PORT: u16 = 8091;

const COUCHBASE_BIN: &str = "/opt/couchbase/bin";

/// kill a lingering start of the server
pub const CMD_KILL: &str = "sudo pkill -u couchbase";
///
pub const CMD_SET_SWAPPINESS: &str = "sudo sysctl vm.swappiness=0";
///
pub const CMD_UPDATE_SYSCTL_CONF: &str =
    r#"echo "vm.swappiness = 0" | sudo tee -a /etc/sysctl.conf"#;
/// prints the root password stored in the native config of the server
pub const CMD_GET_PASSWORD_FROM_CONFIG: &str = concat!(
    r#"sudo /opt/couchbase/bin/erl -noinput -eval 'case file:read_file("#,
    r#""/opt/couchbase/var/lib/couchbase/config/config.dat") of {ok, B} -> "#,
    r#"io:format("~p~n", [binary_to_term(B)]) end.' -run init stop"#,
    r#" | grep '\[{"root",\[{password,' | awk -F\" '{print $4}'"#
);

fn node(ip: &str) -> String {
    format!("{}:{}", ip, COUCHBASE_REST_PORT)
}

fn quote(s: &str) -> String {
    shell_words::quote(s).into_owned()
}

/// initialize the node and move its data to `data_path`
pub fn cmd_node_init(data_path: &str, ip: &str, pwd: &str) -> String {
    format!(
        "sudo {}/couchbase-cli node-init -c {} --node-init-data-path={} -u root -p {}",
        COUCHBASE_BIN,
        node(ip),
        quote(data_path),
        quote(pwd)
    )
}

/// create the single node cluster owned by root
pub fn cmd_cluster_init(ip: &str, pwd: &str) -> String {
    format!(
        "sudo {}/couchbase-cli cluster-init -c {} --cluster-init-username=root \
         --cluster-init-password={} --cluster-init-port={}",
        COUCHBASE_BIN,
        node(ip),
        quote(pwd),
        COUCHBASE_REST_PORT
    )
}

/// server-info prints the node description as json
pub fn cmd_couchbase_status(ip: &str, pwd: &str) -> String {
    format!(
        "sudo {}/couchbase-cli server-info -c {} -u root -p {}",
        COUCHBASE_BIN,
        node(ip),
        quote(pwd)
    )
}

/// interactive root password reset
pub fn cmd_reset_pwd(ip: &str) -> Vec<String> {
    vec![
        "sudo".to_string(),
        format!("{}/cbreset_password", COUCHBASE_BIN),
        node(ip),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_templates() {
        assert_eq!(
            cmd_node_init("/var/lib/couchbase", "10.0.0.2", "pwd"),
            "sudo /opt/couchbase/bin/couchbase-cli node-init -c 10.0.0.2:8091 \
             --node-init-data-path=/var/lib/couchbase -u root -p pwd"
        );
        assert_eq!(
            cmd_cluster_init("10.0.0.2", "pwd"),
            "sudo /opt/couchbase/bin/couchbase-cli cluster-init -c 10.0.0.2:8091 \
             --cluster-init-username=root --cluster-init-password=pwd --cluster-init-port=8091"
        );
        assert_eq!(
            cmd_couchbase_status("10.0.0.2", "it's"),
            "sudo /opt/couchbase/bin/couchbase-cli server-info -c 10.0.0.2:8091 -u root -p 'it'\\''s'"
        );
        assert_eq!(
            cmd_reset_pwd("10.0.0.2"),
            vec!["sudo", "/opt/couchbase/bin/cbreset_password", "10.0.0.2:8091"]
        );
        assert!(CMD_GET_PASSWORD_FROM_CONFIG.ends_with("awk -F\\\" '{print $4}'"));
    }
}
