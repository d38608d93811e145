//! JSON summary of a run.

use std::path::Path;

use anyhow::{Context, Result};
use serde::Serialize;

use injector_engine::{AppInjector, BootState, Link, MonitorState, ReceiveState, ReceivedPacket, SendState};
use injector_repo::RepositoryAccess;

#[derive(Debug, Serialize)]
pub struct RunReport {
    pub ticks: u64,
    pub current_time: u64,
    pub stop_reason: &'static str,
    pub bootloader: BootState,
    pub monitor: MonitorState,
    pub receiver: ReceiveState,
    pub sender: SendState,
    pub receiver_fault: Option<u32>,
    pub flits_received: u64,
    pub flits_pending: usize,
    pub credit_violations: u64,
    pub packets: Vec<ReceivedPacket>,
}

impl RunReport {
    pub fn collect<R: RepositoryAccess>(
        injector: &AppInjector<R>,
        link: &mut Link,
        stop_reason: &'static str,
    ) -> Self {
        Self {
            ticks: injector.ticks(),
            current_time: injector.current_time(),
            stop_reason,
            bootloader: injector.bootloader_state(),
            monitor: injector.monitor_state(),
            receiver: injector.receiver_state(),
            sender: injector.sender_state(),
            receiver_fault: injector.receiver_fault(),
            flits_received: link.source.delivered(),
            flits_pending: link.source.pending(),
            credit_violations: link.sink.violations(),
            packets: link.sink.take_packets(),
        }
    }

    /// Write to `path`, or stdout when none is configured.
    pub fn write(&self, path: Option<&Path>) -> Result<()> {
        match path {
            Some(path) => {
                let file = std::fs::File::create(path)
                    .with_context(|| format!("failed to create report {}", path.display()))?;
                serde_json::to_writer_pretty(file, self).context("failed to write report")?;
                tracing::info!(path = %path.display(), "report written");
            }
            None => {
                let stdout = std::io::stdout();
                serde_json::to_writer_pretty(stdout.lock(), self).context("failed to write report")?;
                println!();
            }
        }
        Ok(())
    }
}
