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
use log::{Level, Log};
use std::{
    fs::{self, File, OpenOptions},
    io::{Error, Write},
    os::unix::{
        net::UnixDatagram,
        prelude::{OpenOptionsExt, PermissionsExt},
    },
    path::{Path, PathBuf},
    sync::Mutex,
};

const SYSLOG_SOCKET: &str = "/dev/log";

fn write_msg_common(writer: &mut impl Write, name: &str, record: &log::Record) {
    let module = record.module_path().unwrap_or("unknown");
    let line = format!(
        "{} {} {} {} {}\n",
        chrono::Local::now().format("%Y-%m-%d %H:%M:%S"),
        name,
        module,
        record.level(),
        record.args()
    );

    /* One write per message, so concurrent writers never interleave a line */
    if let Err(e) = writer.write_all(line.as_bytes()) {
        eprintln!("Failed to log message: {}", e);
    }
}

/// Map a configuration string to a level, unknown strings mean `Info`.
pub fn parse_level(level: &str) -> Level {
    match level.trim().to_ascii_lowercase().as_str() {
        "error" => Level::Error,
        "warn" | "warning" => Level::Warn,
        "info" => Level::Info,
        "debug" => Level::Debug,
        "trace" => Level::Trace,
        _ => Level::Info,
    }
}

struct SysLogger {
    name: String,
    dgram: Mutex<UnixDatagram>,
}

impl SysLogger {
    fn new(name: &str) -> Result<Self, Error> {
        let sock = UnixDatagram::unbound()?;
        sock.connect(SYSLOG_SOCKET)?;
        Ok(Self {
            name: name.to_string(),
            dgram: Mutex::new(sock),
        })
    }
}

/* This is an extremely simple implementation, and only
 * supports the very basic log function. */
impl log::Log for SysLogger {
    fn enabled(&self, _metadata: &log::Metadata) -> bool {
        true
    }

    fn log(&self, record: &log::Record) {
        let msg = format!(
            "{}: {} {}",
            self.name,
            record.module_path().unwrap_or("unknown"),
            record.args()
        );

        let dgram = match self.dgram.lock() {
            Err(_) => return,
            Ok(v) => v,
        };
        if let Err(e) = dgram.send(msg.as_bytes()) {
            eprintln!("Failed to send message to syslogger: {}", e);
        }
    }

    fn flush(&self) {}
}

struct ConsoleLogger {
    name: String,
}

impl log::Log for ConsoleLogger {
    fn enabled(&self, _metadata: &log::Metadata) -> bool {
        true
    }

    fn log(&self, record: &log::Record) {
        let mut stdout = std::io::stdout();
        write_msg_common(&mut stdout, &self.name, record);
    }

    fn flush(&self) {
        let _ = std::io::stdout().flush();
    }
}

struct FileLogger {
    name: String,
    level: Level,
    file: Mutex<File>,
}

impl FileLogger {
    fn file_open(file_path: &Path, file_mode: u32) -> Result<File, Error> {
        if let Some(dir) = file_path.parent() {
            if !dir.as_os_str().is_empty() && !dir.exists() {
                fs::create_dir_all(dir)?;
                fs::set_permissions(dir, fs::Permissions::from_mode(0o700))?;
            }
        }

        OpenOptions::new()
            .write(true)
            .create(true)
            .append(true)
            .mode(file_mode)
            .open(file_path)
    }

    fn new(name: &str, level: Level, file_path: PathBuf) -> Result<Self, Error> {
        let file = Self::file_open(&file_path, 0o600)?;
        Ok(Self {
            name: name.to_string(),
            level,
            file: Mutex::new(file),
        })
    }
}

impl log::Log for FileLogger {
    fn enabled(&self, metadata: &log::Metadata) -> bool {
        metadata.level() <= self.level
    }

    fn log(&self, record: &log::Record) {
        if !self.enabled(record.metadata()) {
            return;
        }
        let mut file = match self.file.lock() {
            Err(_) => return,
            Ok(v) => v,
        };
        write_msg_common(&mut *file, &self.name, record);
    }

    fn flush(&self) {
        let mut file = match self.file.lock() {
            Err(_) => return,
            Ok(v) => v,
        };
        if let Err(e) = file.flush() {
            eprintln!("Failed to flush log file: {}", e);
        }
    }
}

/// Collect different kinds of loggers together.
///
/// Include: SysLogger, ConsoleLogger, FileLogger
struct CombinedLogger {
    loggers: Vec<Box<dyn Log>>,
}

impl Log for CombinedLogger {
    fn enabled(&self, _metadata: &log::Metadata) -> bool {
        true
    }

    fn log(&self, record: &log::Record) {
        for logger in &self.loggers {
            logger.log(record);
        }
    }

    fn flush(&self) {
        for logger in &self.loggers {
            logger.flush();
        }
    }
}

/// Initialize the global static logger instance.
/// Available log `targets` include `file`, `syslog`, `console`.
/// `file_path` only takes effect on the `file` target.
///
/// The logger can be installed once per process, later calls only
/// adjust the max level.
///
/// # Arguments
///
/// * `name` - The application name that initializes the logger, written into every message.
/// * `level` - Log message level.
/// * `targets` - A set of log targets.
/// * `file_path` - The log file path.
pub fn init_log(name: &str, level: Level, targets: &[&str], file_path: &str) {
    let mut loggers: Vec<Box<dyn Log>> = Vec::new();

    for target in targets {
        let logger: Box<dyn Log> = match *target {
            "console" => Box::new(ConsoleLogger {
                name: name.to_string(),
            }),
            "syslog" => match SysLogger::new(name) {
                Ok(logger) => Box::new(logger),
                Err(e) => {
                    eprintln!("{} failed to create syslogger: {:?}", name, e);
                    continue;
                }
            },
            "file" => match FileLogger::new(name, Level::Trace, PathBuf::from(file_path)) {
                Ok(logger) => Box::new(logger),
                Err(e) => {
                    eprintln!(
                        "{} failed to create '{}' file logger: {:?}",
                        name, file_path, e
                    );
                    continue;
                }
            },
            _ => {
                eprintln!("{}: log target '{}' is strange, ignoring.", name, target);
                continue;
            }
        };
        loggers.push(logger);
    }

    if loggers.is_empty() {
        eprintln!("{}: no available log targets.", name);
    }

    if log::set_boxed_logger(Box::new(CombinedLogger { loggers })).is_err() {
        log::debug!("{}: logger already installed, only adjusting the level.", name);
    }
    log::set_max_level(level.to_level_filter());
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn record_at<'a>(level: Level, args: std::fmt::Arguments<'a>) -> log::Record<'a> {
        log::Record::builder()
            .level(level)
            .module_path(Some("couchbase::couchbase_app"))
            .args(args)
            .build()
    }

    #[test]
    fn test_write_msg_common() {
        let mut buf: Vec<u8> = Vec::new();
        write_msg_common(
            &mut buf,
            "guestagent",
            &record_at(Level::Info, format_args!("Starting the database.")),
        );
        let line = String::from_utf8(buf).unwrap();

        /* "YYYY-MM-DD HH:MM:SS " is 20 bytes */
        assert!(line.len() > 20);
        assert_eq!(&line[4..5], "-");
        assert_eq!(&line[13..14], ":");
        assert!(line[20..]
            .starts_with("guestagent couchbase::couchbase_app INFO Starting the database."));
        assert!(line.ends_with('\n'));
    }

    #[test]
    fn test_parse_level() {
        assert_eq!(parse_level("debug"), Level::Debug);
        assert_eq!(parse_level(" WARN "), Level::Warn);
        assert_eq!(parse_level("warning"), Level::Warn);
        assert_eq!(parse_level("error"), Level::Error);
        assert_eq!(parse_level("trace"), Level::Trace);
        assert_eq!(parse_level("verbose"), Level::Info);
    }

    #[test]
    fn test_file_logger() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("sub/guestagent.log");
        let logger = FileLogger::new("guestagent", Level::Info, path.clone()).unwrap();

        logger.log(&record_at(Level::Info, format_args!("visible")));
        logger.log(&record_at(Level::Debug, format_args!("hidden")));
        logger.flush();

        let content = fs::read_to_string(&path).unwrap();
        assert!(content.contains("INFO visible"));
        assert!(!content.contains("hidden"));

        let mode = fs::metadata(&path).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o600);
    }
}
