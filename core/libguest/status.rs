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

//! service status of a datastore and the tracker following it
//!
//! The tracker caches the last status reported to the control plane. The
//! datastore plugin only knows how to probe the real state of its server,
//! see [`ActualStatus`].

use serde::{Deserialize, Serialize};
use std::cell::Cell;
use std::fmt;
use std::thread;
use std::time::{Duration, Instant};

/// status of a datastore service as seen by the control plane
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ServiceStatus {
    ///
    Running,
    ///
    Blocked,
    ///
    Paused,
    ///
    Shutdown,
    ///
    Crashed,
    ///
    Failed,
    ///
    Building,
    ///
    BuildPending,
    ///
    Unknown,
    ///
    New,
    ///
    Deleted,
    /// the guest agent itself did not answer in time
    FailedTimeoutGuestagent,
}

impl ServiceStatus {
    /// numeric code stored by the control plane
    pub fn code(&self) -> u32 {
        match self {
            ServiceStatus::Running => 0x01,
            ServiceStatus::Blocked => 0x02,
            ServiceStatus::Paused => 0x03,
            ServiceStatus::Shutdown => 0x04,
            ServiceStatus::Deleted => 0x05,
            ServiceStatus::Crashed => 0x06,
            ServiceStatus::Failed => 0x08,
            ServiceStatus::Building => 0x09,
            ServiceStatus::BuildPending => 0x0a,
            ServiceStatus::Unknown => 0x16,
            ServiceStatus::New => 0x17,
            ServiceStatus::FailedTimeoutGuestagent => 0x18,
        }
    }

    ///
    pub fn description(&self) -> &'static str {
        match self {
            ServiceStatus::Running => "running",
            ServiceStatus::Blocked => "blocked",
            ServiceStatus::Paused => "paused",
            ServiceStatus::Shutdown => "shutdown",
            ServiceStatus::Deleted => "deleted",
            ServiceStatus::Crashed => "crashed",
            ServiceStatus::Failed => "failed to spawn",
            ServiceStatus::Building => "building",
            ServiceStatus::BuildPending => "build pending",
            ServiceStatus::Unknown => "unknown",
            ServiceStatus::New => "new",
            ServiceStatus::FailedTimeoutGuestagent => "guestagent error",
        }
    }

    /// status string of the instance API
    pub fn api_status(&self) -> &'static str {
        match self {
            ServiceStatus::Running => "ACTIVE",
            ServiceStatus::Blocked => "BLOCKED",
            ServiceStatus::Paused | ServiceStatus::Shutdown | ServiceStatus::Crashed => {
                "SHUTDOWN"
            }
            ServiceStatus::Deleted => "DELETED",
            ServiceStatus::Failed => "FAILED",
            ServiceStatus::Building | ServiceStatus::BuildPending => "BUILD",
            ServiceStatus::Unknown | ServiceStatus::FailedTimeoutGuestagent => "ERROR",
            ServiceStatus::New => "NEW",
        }
    }
}

impl fmt::Display for ServiceStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.description())
    }
}

/// Probe of the real state of one datastore server.
pub trait ActualStatus {
    /// never fails, an unreachable server is reported as down
    fn get_actual_db_status(&self) -> ServiceStatus;
}

/// The status collaborator the datastore application drives.
pub trait DbStatus {
    /// last status stored for the control plane
    fn status(&self) -> ServiceStatus;

    ///
    fn is_running(&self) -> bool {
        self.status() == ServiceStatus::Running
    }

    /// an install is in progress, the stored status is BUILDING
    fn begin_install(&self);

    /// a restart is in progress, [`DbStatus::update`] is suspended
    fn begin_restart(&self);

    /// leave install/restart mode and store the real status
    fn end_install_or_restart(&self);

    /// store the real status unless an install or restart is running
    fn update(&self);

    /// Poll the real status until it equals `status` or `max_time` elapses.
    /// With `update_db` the reached status is stored.
    fn wait_for_real_status_to_change_to(
        &self,
        status: ServiceStatus,
        max_time: Duration,
        update_db: bool,
    ) -> bool;
}

/// Generic [`DbStatus`] on top of a datastore specific probe.
pub struct BaseDbStatus<A: ActualStatus> {
    actual: A,
    status: Cell<ServiceStatus>,
    restart_mode: Cell<bool>,
    poll_interval: Duration,
}

impl<A: ActualStatus> BaseDbStatus<A> {
    /// a fresh tracker starts as NEW
    pub fn new(actual: A, poll_interval: Duration) -> Self {
        BaseDbStatus {
            actual,
            status: Cell::new(ServiceStatus::New),
            restart_mode: Cell::new(false),
            poll_interval,
        }
    }

    ///
    pub fn actual(&self) -> &A {
        &self.actual
    }

    /// store `status` for the control plane
    pub fn set_status(&self, status: ServiceStatus) {
        if self.status.get() != status {
            log::debug!("Status changed: {} -> {}.", self.status.get(), status);
        }
        self.status.set(status);
    }

    ///
    pub fn is_installing(&self) -> bool {
        self.status.get() == ServiceStatus::Building
    }

    ///
    pub fn is_restarting(&self) -> bool {
        self.restart_mode.get()
    }
}

impl<A: ActualStatus> DbStatus for BaseDbStatus<A> {
    fn status(&self) -> ServiceStatus {
        self.status.get()
    }

    fn begin_install(&self) {
        self.set_status(ServiceStatus::Building);
    }

    fn begin_restart(&self) {
        self.restart_mode.set(true);
    }

    fn end_install_or_restart(&self) {
        log::debug!("Ending install or restart.");
        self.restart_mode.set(false);
        let real = self.actual.get_actual_db_status();
        log::debug!("Updating status to {}.", real);
        self.set_status(real);
    }

    fn update(&self) {
        if self.is_installing() || self.is_restarting() {
            log::debug!("Install or restart in progress, skipping status update.");
            return;
        }
        self.set_status(self.actual.get_actual_db_status());
    }

    fn wait_for_real_status_to_change_to(
        &self,
        status: ServiceStatus,
        max_time: Duration,
        update_db: bool,
    ) -> bool {
        let started = Instant::now();
        while started.elapsed() < max_time {
            thread::sleep(self.poll_interval);

            let actual = self.actual.get_actual_db_status();
            if actual == status {
                if update_db {
                    self.set_status(actual);
                }
                return true;
            }
            log::debug!(
                "Waiting for status to change to {} (currently {}), waited {:?}.",
                status,
                actual,
                started.elapsed()
            );
        }

        log::error!("Timeout while waiting for database status to change to {}.", status);
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::collections::VecDeque;

    /// replays a script, then repeats the last status
    struct Scripted {
        script: RefCell<VecDeque<ServiceStatus>>,
        last: Cell<ServiceStatus>,
        probes: Cell<usize>,
    }

    impl Scripted {
        fn new(script: &[ServiceStatus]) -> Self {
            Scripted {
                script: RefCell::new(script.iter().copied().collect()),
                last: Cell::new(ServiceStatus::Shutdown),
                probes: Cell::new(0),
            }
        }
    }

    impl ActualStatus for Scripted {
        fn get_actual_db_status(&self) -> ServiceStatus {
            self.probes.set(self.probes.get() + 1);
            if let Some(next) = self.script.borrow_mut().pop_front() {
                self.last.set(next);
            }
            self.last.get()
        }
    }

    fn tracker(script: &[ServiceStatus]) -> BaseDbStatus<Scripted> {
        BaseDbStatus::new(Scripted::new(script), Duration::from_millis(1))
    }

    #[test]
    fn test_wait_reaches_status() {
        let status = tracker(&[
            ServiceStatus::Shutdown,
            ServiceStatus::Shutdown,
            ServiceStatus::Running,
        ]);
        assert!(status.wait_for_real_status_to_change_to(
            ServiceStatus::Running,
            Duration::from_secs(1),
            true
        ));
        assert_eq!(status.actual().probes.get(), 3);
        assert!(status.is_running());
    }

    #[test]
    fn test_wait_without_update_db() {
        let status = tracker(&[ServiceStatus::Running]);
        assert!(status.wait_for_real_status_to_change_to(
            ServiceStatus::Running,
            Duration::from_secs(1),
            false
        ));
        assert_eq!(status.status(), ServiceStatus::New);
    }

    #[test]
    fn test_wait_times_out() {
        let status = tracker(&[ServiceStatus::Shutdown]);
        assert!(!status.wait_for_real_status_to_change_to(
            ServiceStatus::Running,
            Duration::from_millis(5),
            true
        ));
        /* at most one probe per elapsed poll interval */
        let probes = status.actual().probes.get();
        assert!((1..=5).contains(&probes));
        assert_eq!(status.status(), ServiceStatus::New);
    }

    #[test]
    fn test_update_suspended_while_restarting() {
        let status = tracker(&[ServiceStatus::Running]);
        status.begin_restart();
        status.update();
        assert_eq!(status.status(), ServiceStatus::New);
        assert_eq!(status.actual().probes.get(), 0);

        status.end_install_or_restart();
        assert!(!status.is_restarting());
        assert_eq!(status.status(), ServiceStatus::Running);
    }

    #[test]
    fn test_install_mode() {
        let status = tracker(&[ServiceStatus::Shutdown]);
        status.begin_install();
        assert!(status.is_installing());
        assert_eq!(status.status().api_status(), "BUILD");
        status.update();
        assert_eq!(status.status(), ServiceStatus::Building);

        status.end_install_or_restart();
        assert_eq!(status.status(), ServiceStatus::Shutdown);
        status.update();
        assert_eq!(status.actual().probes.get(), 2);
    }

    #[test]
    fn test_status_codes() {
        assert_eq!(ServiceStatus::Running.code(), 0x01);
        assert_eq!(ServiceStatus::Shutdown.api_status(), "SHUTDOWN");
        assert_eq!(ServiceStatus::Failed.to_string(), "failed to spawn");
        assert_eq!(
            serde_json::to_string(&ServiceStatus::BuildPending).unwrap(),
            "\"BUILD_PENDING\""
        );
        let back: ServiceStatus = serde_json::from_str("\"RUNNING\"").unwrap();
        assert_eq!(back, ServiceStatus::Running);
    }
}
