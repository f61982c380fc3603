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

//! Couchbase datastore plugin of the guest agent.
//!
//! [`manager::Manager`] is the entry point: it wires the application,
//! the status probe and the root access manager to the OS facade of
//! `basic`.
pub mod config;
pub mod couchbase_app;
pub mod couchbase_root;
pub mod couchbase_status;
pub mod error;
pub use error::*;
pub mod manager;
pub mod password_reset;
pub mod system;
