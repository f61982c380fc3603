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

//! network helpers

use std::net::{IpAddr, Ipv4Addr, UdpSocket};

/// the loopback fallback of [`get_my_ipv4`]
pub const LOOPBACK_IPV4: &str = "127.0.0.1";

/// IPv4 address of the interface routing to the outside world.
///
/// Connecting a UDP socket sends nothing, it only asks the kernel for a
/// route. Without a route the loopback address is returned.
pub fn get_my_ipv4() -> String {
    match route_source_ipv4("8.8.8.8:80") {
        Some(ip) => ip.to_string(),
        None => {
            log::warn!("No route to the outside world, using {}.", LOOPBACK_IPV4);
            LOOPBACK_IPV4.to_string()
        }
    }
}

fn route_source_ipv4(target: &str) -> Option<Ipv4Addr> {
    let socket = UdpSocket::bind((Ipv4Addr::UNSPECIFIED, 0)).ok()?;
    socket.connect(target).ok()?;
    match socket.local_addr().ok()?.ip() {
        IpAddr::V4(ip) if !ip.is_unspecified() => Some(ip),
        _ => None,
    }
}
