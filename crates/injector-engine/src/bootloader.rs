//! Bootloader. Pushes the management application's first task into the
//! platform once, right after reset.

use serde::Serialize;

use injector_core::config::BootConfig;
use injector_core::StagedPacket;
use injector_repo::{load_task_allocation, RepositoryAccess};

use crate::view::View;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum BootState {
    Initialize,
    WaitSendBoot,
    BootloaderFinished,
}

#[derive(Debug)]
pub struct Bootloader {
    state: BootState,
    boot: BootConfig,
    /// A load failure has been logged and not yet cleared by a success.
    failing: bool,
}

impl Bootloader {
    pub fn new(boot: BootConfig) -> Self {
        Self {
            state: BootState::Initialize,
            boot,
            failing: false,
        }
    }

    pub fn state(&self) -> BootState {
        self.state
    }

    pub fn is_failing(&self) -> bool {
        self.failing
    }

    pub fn reset(&mut self) {
        self.state = BootState::Initialize;
        self.failing = false;
    }

    pub fn step<R: RepositoryAccess + ?Sized>(&mut self, view: &View, repo: &R) -> Option<StagedPacket> {
        match self.state {
            BootState::Initialize => {
                let BootConfig {
                    task_id,
                    master_id,
                    target_pe,
                } = self.boot;
                match load_task_allocation(repo, task_id, master_id, target_pe) {
                    Ok(packet) => {
                        tracing::info!(task_id, target_pe, flits = packet.len(), "boot task staged");
                        self.failing = false;
                        self.state = BootState::WaitSendBoot;
                        return Some(packet);
                    }
                    Err(e) => {
                        if !self.failing {
                            tracing::error!(error = %e, task_id, "failed to load boot task, retrying");
                            self.failing = true;
                        }
                    }
                }
            }
            BootState::WaitSendBoot => {
                if view.is_send_finished() {
                    tracing::info!("bootloader finished");
                    self.state = BootState::BootloaderFinished;
                }
            }
            BootState::BootloaderFinished => {}
        }
        None
    }
}
