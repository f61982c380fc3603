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

//! Error define of the couchbase plugin.
//!
//! The synthesized variants replace the lower level error, which is logged
//! where it is caught.
use guestagent::status::ServiceStatus;
use snafu::prelude::*;
#[allow(unused_imports)]
pub use snafu::ResultExt;

/// couchbase Error
#[allow(missing_docs)]
#[derive(Debug, Snafu)]
#[snafu(visibility(pub))]
#[non_exhaustive]
pub enum Error {
    #[snafu(display("{}", source))]
    Util { source: basic::error::Error },

    #[snafu(display("{}", source))]
    Agent { source: guestagent::error::Error },

    #[snafu(display("Confique error: {}", source))]
    Confique { source: confique::Error },

    #[snafu(display("IoError(couchbase): {}", source))]
    Io { source: std::io::Error },

    #[snafu(display("Couchbase Server initial setup failed"))]
    SetupFailed,

    #[snafu(display("Command to {} not found.", what))]
    CommandNotFound { what: String },

    #[snafu(display("Could not start Couchbase Server"))]
    StartFailed,

    #[snafu(display("Could not stop Couchbase Server."))]
    StopFailed,

    #[snafu(display("Couchbase is not stopped."))]
    NotStopped { status: ServiceStatus },

    #[snafu(display("{}", msg))]
    SavePassword { msg: String },

    #[snafu(display("Couchbase root password reset failed: {}", msg))]
    PasswordReset { msg: String },
}

/// new Result
pub type Result<T, E = Error> = std::result::Result<T, E>;

impl From<basic::error::Error> for Error {
    fn from(source: basic::error::Error) -> Self {
        Error::Util { source }
    }
}

impl From<guestagent::error::Error> for Error {
    fn from(source: guestagent::error::Error) -> Self {
        Error::Agent { source }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display() {
        let err = Error::CommandNotFound {
            what: "enable Couchbase Server on boot".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "Command to enable Couchbase Server on boot not found."
        );
        let err = Error::NotStopped {
            status: ServiceStatus::Running,
        };
        assert_eq!(err.to_string(), "Couchbase is not stopped.");
    }
}
