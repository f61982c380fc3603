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

//! error definitions
use snafu::prelude::*;
#[allow(unused_imports)]
pub use snafu::ResultExt;
use std::time::Duration;

#[allow(missing_docs)]
#[derive(Debug, Snafu)]
#[snafu(visibility(pub))]
#[non_exhaustive]
pub enum Error {
    /// malformed or missing arguments, raised before any process is spawned
    #[snafu(display("{}", msg))]
    UnprocessableEntity { msg: String },

    #[snafu(display(
        "Unexpected error while running command.\nCommand: {}\nExit code: {}\nStdout: {:?}\nStderr: {:?}",
        cmd,
        exit_code,
        stdout,
        stderr
    ))]
    ProcessExecution {
        cmd: String,
        exit_code: i32,
        stdout: String,
        stderr: String,
    },

    #[snafu(display("Command '{}' timed out after {:?}.", cmd, timeout))]
    Timeout { cmd: String, timeout: Duration },

    #[snafu(display("Failed to spawn '{}': {}", cmd, source))]
    Spawn { cmd: String, source: std::io::Error },

    #[snafu(display("Io: {}", source))]
    Io { source: std::io::Error },

    #[snafu(display("Errno: {}", source))]
    Nix { source: nix::Error },

    #[snafu(display("Invalid: '{}'.", what))]
    Invalid { what: String },
}

impl Error {
    /// Whether the error came from running an external command.
    ///
    /// Call sites with a fallback path (status checks, password lookup)
    /// only swallow this class; validation errors always propagate.
    pub fn is_process_failure(&self) -> bool {
        matches!(
            self,
            Error::ProcessExecution { .. } | Error::Timeout { .. } | Error::Spawn { .. }
        )
    }

    /// The message of a validation error, if this is one.
    pub fn unprocessable_msg(&self) -> Option<&str> {
        match self {
            Error::UnprocessableEntity { msg } => Some(msg.as_str()),
            _ => None,
        }
    }
}

///
pub type Result<T, E = Error> = std::result::Result<T, E>;

/// build a validation error
pub(crate) fn unprocessable<T>(msg: &str) -> Result<T> {
    Err(Error::UnprocessableEntity {
        msg: msg.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_process_failure() {
        let err = Error::ProcessExecution {
            cmd: "false".to_string(),
            exit_code: 1,
            stdout: String::new(),
            stderr: String::new(),
        };
        assert!(err.is_process_failure());

        let err = Error::Timeout {
            cmd: "sleep 10".to_string(),
            timeout: Duration::from_secs(1),
        };
        assert!(err.is_process_failure());

        let err: Error = unprocessable::<()>("Missing source path.").unwrap_err();
        assert!(!err.is_process_failure());
        assert_eq!(err.unprocessable_msg(), Some("Missing source path."));
        assert_eq!(err.to_string(), "Missing source path.");
    }
}
