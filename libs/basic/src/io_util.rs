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

//!
use crate::error::*;
use nix::{
    libc,
    poll::{self, PollFd, PollFlags},
    sys::{signal::SigSet, time::TimeSpec},
};
use std::os::unix::prelude::RawFd;
use std::time::Duration;

/// Wait until `fd` has data to read (or hung up), at most `timeout`.
///
/// Returns false when the timeout elapsed first.
pub fn wait_readable(fd: RawFd, timeout: Duration) -> Result<bool> {
    let time_spec = TimeSpec::from_timespec(libc::timespec {
        tv_sec: timeout.as_secs() as libc::time_t,
        tv_nsec: timeout.subsec_nanos() as libc::c_long,
    });
    let mut fds = [PollFd::new(fd, PollFlags::POLLIN)];

    let ret = loop {
        match poll::ppoll(&mut fds, Some(time_spec), SigSet::empty()) {
            Err(nix::errno::Errno::EINTR) => continue,
            other => break other.context(NixSnafu)?,
        }
    };

    if ret == 0 {
        return Ok(false);
    }

    if let Some(revents) = fds[0].revents() {
        if revents.contains(PollFlags::POLLNVAL) {
            return Err(Error::Nix {
                source: nix::errno::Errno::EBADF,
            });
        }
    }

    Ok(true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use std::os::unix::io::AsRawFd;
    use std::os::unix::net::UnixStream;

    #[test]
    fn test_wait_readable() {
        let (mut tx, rx) = UnixStream::pair().unwrap();
        assert!(!wait_readable(rx.as_raw_fd(), Duration::from_millis(50)).unwrap());

        tx.write_all(b"password:").unwrap();
        assert!(wait_readable(rx.as_raw_fd(), Duration::from_millis(50)).unwrap());
    }

    #[test]
    fn test_wait_readable_hangup() {
        let (tx, rx) = UnixStream::pair().unwrap();
        drop(tx);
        assert!(wait_readable(rx.as_raw_fd(), Duration::from_millis(50)).unwrap());
    }
}
