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

//! guest-side utilities shared by the agent and the datastore plugins
pub mod error;
pub use error::*;
pub mod exec;
pub mod file_mode;
pub mod file_util;
pub mod io_util;
pub mod net_util;
pub mod operating_system;
pub mod pkg;
pub mod random;
pub mod service_util;

/// privilege escalation helper of guest commands
pub use exec::ROOT_HELPER;
