//! Application-launch monitor.
//!
//! Walks the launch schedule one record at a time. Each record waits until
//! the simulated clock reaches its start time, then an admission request
//! is sent to the global manager. The next record is only read after the
//! manager reports that the previous application is fully mapped.

use serde::Serialize;

use injector_core::config::start_tick;
use injector_core::StagedPacket;
use injector_repo::{app_request, LaunchEntry, LaunchRecord, RepositoryAccess};

use crate::view::View;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum MonitorState {
    IdleMonitor,
    Monitoring,
    WaitingTime,
    WaitingSendAppReq,
}

#[derive(Debug)]
pub struct Monitor {
    state: MonitorState,
    /// Advances once per tick in every state.
    current_time: u64,
    ticks_per_time_unit: u64,
    manager_address: u32,
    /// Schedule line of the next record; resolved on first use.
    cursor: Option<usize>,
    pending: Option<LaunchEntry>,
    first_run: bool,
    exhausted: bool,
    failing: bool,
}

impl Monitor {
    pub fn new(ticks_per_time_unit: u64, manager_address: u32) -> Self {
        Self {
            state: MonitorState::IdleMonitor,
            current_time: 0,
            ticks_per_time_unit,
            manager_address,
            cursor: None,
            pending: None,
            first_run: true,
            exhausted: false,
            failing: false,
        }
    }

    pub fn state(&self) -> MonitorState {
        self.state
    }

    pub fn current_time(&self) -> u64 {
        self.current_time
    }

    /// The launch waiting for its start time, if any.
    #[cfg(test)]
    pub(crate) fn pending(&self) -> Option<&LaunchEntry> {
        self.pending.as_ref()
    }

    /// The sentinel has been read; no further launches will happen.
    pub fn is_exhausted(&self) -> bool {
        self.exhausted
    }

    /// The last schedule read failed and will be retried.
    pub fn is_failing(&self) -> bool {
        self.failing
    }

    pub fn reset(&mut self) {
        self.state = MonitorState::IdleMonitor;
        self.current_time = 0;
        self.cursor = None;
        self.pending = None;
        self.first_run = true;
        self.exhausted = false;
        self.failing = false;
    }

    /// On staging a request, the launch entry moves into `admission` for
    /// the receiver to pick up when the manager acknowledges it.
    pub fn step<R: RepositoryAccess + ?Sized>(
        &mut self,
        view: &View,
        repo: &R,
        admission: &mut Option<LaunchEntry>,
    ) -> Option<StagedPacket> {
        let mut staged = None;

        match self.state {
            MonitorState::IdleMonitor => {
                if self.first_run || view.is_mapping_complete() {
                    self.first_run = false;
                    self.state = MonitorState::Monitoring;
                }
            }
            MonitorState::Monitoring => {
                if !self.exhausted {
                    self.read_next(repo);
                }
            }
            MonitorState::WaitingTime => {
                staged = self.try_request(view, admission);
            }
            MonitorState::WaitingSendAppReq => {
                if view.is_send_finished() {
                    self.state = MonitorState::IdleMonitor;
                }
            }
        }

        self.current_time += 1;
        staged
    }

    fn read_next<R: RepositoryAccess + ?Sized>(&mut self, repo: &R) {
        let result = match self.cursor {
            Some(line) => repo.read_launch(line),
            None => repo.first_launch_line().and_then(|line| {
                self.cursor = Some(line);
                repo.read_launch(line)
            }),
        };

        match result {
            Ok(LaunchRecord::Entry { entry, next_line }) => {
                tracing::debug!(
                    app = %entry.name,
                    start_time = entry.start_time,
                    cluster_id = entry.cluster_id,
                    task_count = entry.task_count,
                    "launch read"
                );
                self.cursor = Some(next_line);
                self.pending = Some(entry);
                self.failing = false;
                self.state = MonitorState::WaitingTime;
            }
            Ok(LaunchRecord::End) => {
                tracing::info!(time = self.current_time, "launch schedule exhausted");
                self.exhausted = true;
            }
            Err(e) => {
                if !self.failing {
                    tracing::error!(error = %e, "failed to read launch schedule");
                    self.failing = true;
                }
            }
        }
    }

    fn try_request(&mut self, view: &View, admission: &mut Option<LaunchEntry>) -> Option<StagedPacket> {
        let start = self
            .pending
            .as_ref()
            .map(|entry| start_tick(entry.start_time, self.ticks_per_time_unit))?;

        if !(view.is_receiver_idle() && view.is_bootloader_finished() && start <= self.current_time) {
            return None;
        }

        let entry = self.pending.take()?;
        let packet = app_request(self.manager_address, entry.cluster_id, entry.task_count);
        tracing::info!(
            app = %entry.name,
            time = self.current_time,
            cluster_id = entry.cluster_id,
            task_count = entry.task_count,
            "requesting application admission"
        );

        if let Some(stale) = admission.replace(entry) {
            tracing::warn!(app = %stale.name, "previous admission was never acknowledged");
        }
        self.state = MonitorState::WaitingSendAppReq;
        Some(packet)
    }
}
