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

//! Interactive root password reset.
//!
//! `cbreset_password` asks for the new password, asks for a confirmation
//! and reports success. The dialogue is a small state machine fed by the
//! combined stdout/stderr of the tool. The spawned child lives in a
//! [`ResetSession`], dropping the session always terminates it.

use crate::error::*;
use basic::exec::{ExecCommand, Executor, ROOT_HELPER};
use basic::io_util::wait_readable;
use nix::sys::signal::{self, Signal};
use nix::unistd::Pid;
use std::io::{Read, Write};
use std::os::unix::io::AsRawFd;
use std::process::{Child, ChildStdin, ChildStdout, Command, Stdio};
use std::time::{Duration, Instant};
use wait_timeout::ChildExt;

/// grace period between two termination attempts
const TERMINATE_DELAY: Duration = Duration::from_secs(1);

/// progress of the reset dialogue
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResetState {
    /// waiting for the new password prompt
    AwaitPasswordPrompt,
    /// password sent, waiting for the yes/no question
    AwaitConfirmation,
    /// confirmed, waiting for the success marker
    AwaitSuccess,
    ///
    Succeeded,
    /// the tool exited or its output could not be read
    Failed,
    /// a prompt did not show up in time
    TimedOut,
}

impl ResetState {
    /// text the tool prints when it is ready for the next step
    fn expected(&self) -> Option<&'static str> {
        match self {
            ResetState::AwaitPasswordPrompt => Some("password"),
            ResetState::AwaitConfirmation => Some("(yes/no)"),
            ResetState::AwaitSuccess => Some("successfully"),
            _ => None,
        }
    }

    fn next(&self) -> ResetState {
        match self {
            ResetState::AwaitPasswordPrompt => ResetState::AwaitConfirmation,
            ResetState::AwaitConfirmation => ResetState::AwaitSuccess,
            ResetState::AwaitSuccess => ResetState::Succeeded,
            other => *other,
        }
    }

    ///
    pub fn is_terminal(&self) -> bool {
        self.expected().is_none()
    }
}

enum Expect {
    Matched,
    Eof,
    Timeout,
}

/// A running reset tool. Dropping it terminates the child.
pub struct ResetSession<'a> {
    exec: &'a dyn Executor,
    child: Child,
    stdin: Option<ChildStdin>,
    stdout: ChildStdout,
    buffer: String,
}

impl<'a> ResetSession<'a> {
    /// Spawn `argv` with stderr folded into stdout.
    pub fn spawn(exec: &'a dyn Executor, argv: &[String]) -> Result<Self> {
        let mut child = Command::new("sh")
            .arg("-c")
            .arg("exec \"$@\" 2>&1")
            .arg("sh")
            .args(argv)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .spawn()
            .context(IoSnafu)?;

        let stdin = child.stdin.take();
        let stdout = match child.stdout.take() {
            Some(stdout) => stdout,
            None => {
                let _ = child.kill();
                let _ = child.wait();
                return Err(Error::PasswordReset {
                    msg: "no output pipe of the reset tool".to_string(),
                });
            }
        };

        log::debug!("Spawned password reset tool, pid {}.", child.id());
        Ok(ResetSession {
            exec,
            child,
            stdin,
            stdout,
            buffer: String::new(),
        })
    }

    ///
    pub fn pid(&self) -> u32 {
        self.child.id()
    }

    /// consume output until `pattern` shows up
    fn expect(&mut self, pattern: &str, timeout: Duration) -> Result<Expect> {
        let deadline = Instant::now() + timeout;
        let mut chunk = [0u8; 1024];

        loop {
            if let Some(pos) = self.buffer.find(pattern) {
                self.buffer.drain(..pos + pattern.len());
                return Ok(Expect::Matched);
            }

            let now = Instant::now();
            if now >= deadline {
                return Ok(Expect::Timeout);
            }
            if !wait_readable(self.stdout.as_raw_fd(), deadline - now)? {
                return Ok(Expect::Timeout);
            }

            let n = self.stdout.read(&mut chunk).context(IoSnafu)?;
            if n == 0 {
                return Ok(Expect::Eof);
            }
            self.buffer.push_str(&String::from_utf8_lossy(&chunk[..n]));
        }
    }

    fn send_line(&mut self, line: &str) -> Result<()> {
        match self.stdin.as_mut() {
            Some(stdin) => {
                stdin.write_all(line.as_bytes()).context(IoSnafu)?;
                stdin.write_all(b"\n").context(IoSnafu)?;
                stdin.flush().context(IoSnafu)
            }
            None => Err(Error::PasswordReset {
                msg: "input of the reset tool is closed".to_string(),
            }),
        }
    }

    /// Drive the dialogue to a terminal state, each prompt within `timeout`.
    pub fn run(&mut self, password: &str, timeout: Duration) -> ResetState {
        let mut state = ResetState::AwaitPasswordPrompt;

        while let Some(pattern) = state.expected() {
            state = match self.expect(pattern, timeout) {
                Ok(Expect::Matched) => {
                    let reply = match state {
                        ResetState::AwaitPasswordPrompt => Some(password),
                        ResetState::AwaitConfirmation => Some("yes"),
                        _ => None,
                    };
                    match reply.map(|r| self.send_line(r)) {
                        Some(Err(e)) => {
                            log::error!("Failed to answer the password reset tool: {}", e);
                            ResetState::Failed
                        }
                        _ => state.next(),
                    }
                }
                Ok(Expect::Eof) => {
                    log::error!(
                        "Password reset tool exited while waiting for '{}'.",
                        pattern
                    );
                    ResetState::Failed
                }
                Ok(Expect::Timeout) => {
                    log::warn!("Timed out waiting for '{}' from the reset tool.", pattern);
                    ResetState::TimedOut
                }
                Err(e) => {
                    log::error!("Failed to read from the password reset tool: {}", e);
                    ResetState::Failed
                }
            };
        }

        state
    }

    fn exited_within(&mut self, delay: Duration) -> bool {
        matches!(self.child.wait_timeout(delay), Ok(Some(_)))
    }

    fn terminate(&mut self) {
        self.stdin = None;
        if let Ok(Some(_)) = self.child.try_wait() {
            return;
        }

        let pid = self.child.id();
        if signal::kill(Pid::from_raw(pid as i32), Signal::SIGTERM).is_ok()
            && self.exited_within(TERMINATE_DELAY)
        {
            return;
        }
        if self.child.kill().is_ok() && self.exited_within(TERMINATE_DELAY) {
            return;
        }

        /* a child running through the root helper ignores our signals */
        log::warn!("Failed to terminate reset tool {}, killing it as root.", pid);
        let cmd = ExecCommand::new(["kill".to_string(), pid.to_string()]).as_root(ROOT_HELPER);
        if let Err(e) = self.exec.execute(&cmd) {
            log::error!("Failed to kill reset tool {}: {}", pid, e);
        }
        let _ = self.exited_within(TERMINATE_DELAY);
    }
}

impl<'a> Drop for ResetSession<'a> {
    fn drop(&mut self) {
        self.terminate();
    }
}

/// Run the reset tool `argv` and feed it `password`.
pub fn reset_password(
    exec: &dyn Executor,
    argv: &[String],
    password: &str,
    timeout: Duration,
) -> Result<ResetState> {
    let mut session = ResetSession::spawn(exec, argv)?;
    Ok(session.run(password, timeout))
}
