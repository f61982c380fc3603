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

//! exec functions
//!
//! Every guest command goes through one [`Executor`]: run an argument
//! vector (or a shell string), optionally through the root helper, bounded
//! by a timeout. A non-zero exit is an error; nothing is retried.

use crate::error::*;
use std::{
    fmt,
    io::{self, Read},
    process::{Command, Stdio},
    sync::mpsc,
    thread,
    time::{Duration, Instant},
};
use wait_timeout::ChildExt;

/// privilege escalation helper used for `as_root` commands
pub const ROOT_HELPER: &str = "sudo";

/// default timeout of a single command
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// how long output is still collected after the child exited
pub const OUTPUT_DRAIN_GRACE: Duration = Duration::from_secs(1);

/// One external command together with the way it must be run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecCommand {
    argv: Vec<String>,
    shell: bool,
    run_as_root: bool,
    root_helper: String,
    timeout: Option<Duration>,
}

impl ExecCommand {
    /// command from an argument vector
    pub fn new<I, S>(argv: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        ExecCommand {
            argv: argv.into_iter().map(Into::into).collect(),
            shell: false,
            run_as_root: false,
            root_helper: String::new(),
            timeout: Some(DEFAULT_TIMEOUT),
        }
    }

    /// command line interpreted by `sh -c`
    pub fn shell(cmd: &str) -> Self {
        ExecCommand {
            argv: vec![cmd.to_string()],
            shell: true,
            ..ExecCommand::new(Vec::<String>::new())
        }
    }

    /// run through `root_helper`
    pub fn as_root(mut self, root_helper: &str) -> Self {
        self.run_as_root = true;
        self.root_helper = root_helper.to_string();
        self
    }

    /// `None` waits for the command forever
    pub fn timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    ///
    pub fn argv(&self) -> &[String] {
        &self.argv
    }

    ///
    pub fn is_shell(&self) -> bool {
        self.shell
    }

    ///
    pub fn run_as_root(&self) -> bool {
        self.run_as_root
    }

    ///
    pub fn root_helper(&self) -> &str {
        &self.root_helper
    }

    ///
    pub fn get_timeout(&self) -> Option<Duration> {
        self.timeout
    }

    /// the full argument vector handed to the kernel
    pub fn to_argv(&self) -> Result<Vec<String>> {
        let mut full = Vec::new();
        if self.run_as_root && !self.root_helper.is_empty() {
            full = shell_words::split(&self.root_helper).map_err(|e| Error::Invalid {
                what: format!("root helper '{}': {}", self.root_helper, e),
            })?;
        }

        if self.shell {
            full.push("sh".to_string());
            full.push("-c".to_string());
        }
        full.extend(self.argv.iter().cloned());

        if full.is_empty() {
            return Err(Error::Invalid {
                what: "empty command".to_string(),
            });
        }
        Ok(full)
    }
}

impl fmt::Display for ExecCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.shell {
            return write!(f, "{}", self.argv.join(" "));
        }
        write!(f, "{}", shell_words::join(&self.argv))
    }
}

/// Captured output of a command that exited successfully.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExecOutput {
    ///
    pub stdout: String,
    ///
    pub stderr: String,
}

impl ExecOutput {
    ///
    pub fn new(stdout: &str, stderr: &str) -> Self {
        ExecOutput {
            stdout: stdout.to_string(),
            stderr: stderr.to_string(),
        }
    }
}

/// The process execution contract used by the facade and the datastore code.
pub trait Executor {
    /// run the command and wait for it; non-zero exit is an error
    fn execute(&self, cmd: &ExecCommand) -> Result<ExecOutput>;
}

/// Executor spawning real child processes.
#[derive(Debug, Default, Clone, Copy)]
pub struct ProcessExecutor;

impl ProcessExecutor {
    ///
    pub fn new() -> Self {
        ProcessExecutor
    }
}

impl Executor for ProcessExecutor {
    fn execute(&self, cmd: &ExecCommand) -> Result<ExecOutput> {
        let argv = cmd.to_argv()?;
        log::debug!("Executing command: {}", shell_words::join(&argv));

        let deadline = cmd.get_timeout().map(|t| Instant::now() + t);
        let mut child = Command::new(&argv[0])
            .args(&argv[1..])
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .context(SpawnSnafu {
                cmd: cmd.to_string(),
            })?;
        let pid = child.id();

        /* drain both pipes while the child runs, a full pipe would stall it */
        let (tx, rx) = mpsc::channel();
        if let Some(stdout) = child.stdout.take() {
            spawn_reader(stdout, Stream::Stdout, tx.clone());
        }
        if let Some(stderr) = child.stderr.take() {
            spawn_reader(stderr, Stream::Stderr, tx.clone());
        }
        drop(tx);

        let status = match cmd.get_timeout() {
            Some(timeout) => match child.wait_timeout(timeout).context(IoSnafu)? {
                Some(status) => status,
                None => {
                    if let Err(e) = child.kill() {
                        log::error!("Failed to kill child process {} '{}': {}", pid, cmd, e);
                    }
                    let _ = child.wait();
                    return Err(Error::Timeout {
                        cmd: cmd.to_string(),
                        timeout,
                    });
                }
            },
            None => child.wait().context(IoSnafu)?,
        };

        let output = collect_output(&rx, deadline, pid);

        // killed by a signal has no exit code
        let exit_code = status.code().unwrap_or(-1);
        if exit_code != 0 {
            return Err(Error::ProcessExecution {
                cmd: cmd.to_string(),
                exit_code,
                stdout: output.stdout,
                stderr: output.stderr,
            });
        }

        if !output.stderr.is_empty() {
            log::debug!("stderr from child process {} '{}': {}", pid, cmd, output.stderr);
        }
        Ok(output)
    }
}

#[derive(Debug, Clone, Copy)]
enum Stream {
    Stdout,
    Stderr,
}

/// `None` marks the end of a stream
type Chunk = (Stream, Option<Vec<u8>>);

fn spawn_reader<R>(mut pipe: R, stream: Stream, tx: mpsc::Sender<Chunk>)
where
    R: Read + Send + 'static,
{
    thread::spawn(move || {
        let mut buf = [0u8; 4096];
        loop {
            match pipe.read(&mut buf) {
                Ok(0) => break,
                Ok(n) => {
                    if tx.send((stream, Some(buf[..n].to_vec()))).is_err() {
                        return;
                    }
                }
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => {
                    log::debug!("Failed to read {:?} of child process: {}", stream, e);
                    break;
                }
            }
        }
        let _ = tx.send((stream, None));
    });
}

/// Gather what the readers produced once the child has exited.
///
/// A descendant may keep a pipe open after the child exits (a daemon
/// started by an init script). Such a pipe is abandoned after
/// [`OUTPUT_DRAIN_GRACE`], never later than the command deadline.
fn collect_output(rx: &mpsc::Receiver<Chunk>, deadline: Option<Instant>, pid: u32) -> ExecOutput {
    let mut limit = Instant::now() + OUTPUT_DRAIN_GRACE;
    if let Some(deadline) = deadline {
        limit = limit.min(deadline);
    }

    let mut stdout = Vec::new();
    let mut stderr = Vec::new();
    let mut open = 2;
    while open > 0 {
        let wait = limit.saturating_duration_since(Instant::now());
        match rx.recv_timeout(wait) {
            Ok((stream, Some(data))) => match stream {
                Stream::Stdout => stdout.extend_from_slice(&data),
                Stream::Stderr => stderr.extend_from_slice(&data),
            },
            Ok((_, None)) => open -= 1,
            Err(mpsc::RecvTimeoutError::Timeout) => {
                log::warn!(
                    "Output of child process {} is still held open, not waiting for it.",
                    pid
                );
                break;
            }
            Err(mpsc::RecvTimeoutError::Disconnected) => break,
        }
    }

    ExecOutput {
        stdout: String::from_utf8_lossy(&stdout).into_owned(),
        stderr: String::from_utf8_lossy(&stderr).into_owned(),
    }
}

#[cfg(any(test, feature = "mock"))]
pub mod mock {
    //! executors for unit tests
    use super::*;
    use std::cell::RefCell;
    use std::collections::VecDeque;

    /// Records every command and replays scripted results in order.
    /// Once the script runs dry every command succeeds with empty output.
    #[derive(Default)]
    pub struct MockExecutor {
        calls: RefCell<Vec<ExecCommand>>,
        replies: RefCell<VecDeque<Result<ExecOutput>>>,
    }

    impl MockExecutor {
        ///
        pub fn new() -> Self {
            MockExecutor::default()
        }

        /// queue a successful reply
        pub fn push_output(&self, stdout: &str, stderr: &str) {
            self.replies
                .borrow_mut()
                .push_back(Ok(ExecOutput::new(stdout, stderr)));
        }

        /// queue a non-zero exit
        pub fn push_failure(&self, exit_code: i32) {
            self.replies
                .borrow_mut()
                .push_back(Err(Error::ProcessExecution {
                    cmd: "mock".to_string(),
                    exit_code,
                    stdout: String::new(),
                    stderr: "mock failure".to_string(),
                }));
        }

        /// every command executed so far
        pub fn calls(&self) -> Vec<ExecCommand> {
            self.calls.borrow().clone()
        }

        /// argument vectors of every command executed so far
        pub fn argvs(&self) -> Vec<Vec<String>> {
            self.calls.borrow().iter().map(|c| c.argv().to_vec()).collect()
        }
    }

    impl Executor for MockExecutor {
        fn execute(&self, cmd: &ExecCommand) -> Result<ExecOutput> {
            self.calls.borrow_mut().push(cmd.clone());
            self.replies
                .borrow_mut()
                .pop_front()
                .unwrap_or_else(|| Ok(ExecOutput::default()))
        }
    }

    /// Runs commands for real but never through the root helper.
    #[derive(Default)]
    pub struct UnprivilegedExecutor {
        calls: RefCell<Vec<ExecCommand>>,
    }

    impl UnprivilegedExecutor {
        ///
        pub fn new() -> Self {
            UnprivilegedExecutor::default()
        }

        /// every command executed so far, as requested by the caller
        pub fn calls(&self) -> Vec<ExecCommand> {
            self.calls.borrow().clone()
        }
    }

    impl Executor for UnprivilegedExecutor {
        fn execute(&self, cmd: &ExecCommand) -> Result<ExecOutput> {
            self.calls.borrow_mut().push(cmd.clone());
            let mut plain = cmd.clone();
            plain.run_as_root = false;
            ProcessExecutor.execute(&plain)
        }
    }
}
