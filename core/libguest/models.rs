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

//! user models handed back to the control plane

use crate::error::*;
use serde::{Deserialize, Serialize};

/// name of the superuser account
pub const ROOT_USER_NAME: &str = "root";
/// host pattern matching any client
pub const ANY_HOST: &str = "%";

/// A database user as the control plane serializes it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DatastoreUser {
    #[serde(rename = "_name")]
    pub name: String,
    #[serde(rename = "_host")]
    pub host: String,
    #[serde(rename = "_password")]
    pub password: String,
    #[serde(rename = "_databases", default)]
    pub databases: Vec<String>,
}

impl DatastoreUser {
    /// the wire form of the control plane
    pub fn to_json(&self) -> Result<serde_json::Value> {
        serde_json::to_value(self).context(JsonSnafu)
    }
}

/// The superuser, reachable from any host.
pub type RootUser = DatastoreUser;

impl DatastoreUser {
    /// root account carrying `password`
    pub fn root(password: &str) -> RootUser {
        DatastoreUser {
            name: ROOT_USER_NAME.to_string(),
            host: ANY_HOST.to_string(),
            password: password.to_string(),
            databases: Vec::new(),
        }
    }
}
