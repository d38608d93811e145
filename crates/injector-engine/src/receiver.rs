//! Packet receiver. Decodes inbound flits from the manager.
//!
//! Fields are picked out of the stream by a running flit counter rather
//! than by buffering whole packets. The counter starts at 2 on the payload
//! size flit and is bumped together with the remaining-payload count at
//! the end of every tick that moves a flit, so when header word `i` is on
//! the link the counter reads `i + 1`.
//!
//! Replies are built as soon as the last flit of a request arrives. While a
//! reply waits for the sender the receiver stops reading.

use serde::Serialize;

use injector_core::wire::{pe_xy, Service};
use injector_core::StagedPacket;
use injector_repo::{load_app_descriptor, load_task_allocation, LaunchEntry, RepositoryAccess};

use crate::view::View;

/// Counter positions of APP_REQ_ACK fields.
const ACK_APP_ID: u32 = 4;
const ACK_CLUSTER_ADDRESS: u32 = 5;

/// Counter positions of APP_ALLOCATION_REQUEST fields.
const ALLOC_TASK_ID: u32 = 4;
const ALLOC_MASTER_ID: u32 = 5;
const ALLOC_PE: u32 = 6;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ReceiveState {
    Header,
    PayloadSize,
    Service,
    ReceiveAppAck,
    ReceiveAllocationReq,
    /// Drains the remaining payload; leaves on the last flit, or at once if
    /// the service word ended the packet.
    ReceiveMappingComplete,
    WaitingSendNewApp,
    WaitingSendTaskAllocation,
}

#[derive(Debug)]
pub struct Receiver {
    state: ReceiveState,
    payload_size: u32,
    flit_counter: u32,
    ack_app_id: u32,
    cluster_address: u32,
    task_id: u32,
    master_id: u32,
    allocated_pe: u32,
    /// The service word was the last flit of its packet.
    ended_at_service: bool,
    /// Service code that stopped this receiver.
    fault: Option<u32>,
}

impl Receiver {
    pub fn new() -> Self {
        Self {
            state: ReceiveState::Header,
            payload_size: 0,
            flit_counter: 0,
            ack_app_id: 0,
            cluster_address: 0,
            task_id: 0,
            master_id: 0,
            allocated_pe: 0,
            ended_at_service: false,
            fault: None,
        }
    }

    pub fn state(&self) -> ReceiveState {
        self.state
    }

    pub fn fault(&self) -> Option<u32> {
        self.fault
    }

    pub fn reset(&mut self) {
        *self = Self::new();
    }

    /// `flit` is the word moved across the link this tick, if any.
    pub fn step<R: RepositoryAccess + ?Sized>(
        &mut self,
        view: &View,
        flit: Option<u32>,
        repo: &R,
        admission: &mut Option<LaunchEntry>,
    ) -> Option<StagedPacket> {
        let mut staged = None;

        match self.state {
            ReceiveState::Header => {
                if flit.is_some() {
                    self.state = ReceiveState::PayloadSize;
                }
            }
            ReceiveState::PayloadSize => {
                if let Some(word) = flit {
                    self.payload_size = word;
                    self.flit_counter = 2;
                    self.state = ReceiveState::Service;
                }
            }
            ReceiveState::Service => {
                if let Some(word) = flit {
                    self.dispatch(word);
                }
            }
            ReceiveState::ReceiveAppAck => {
                if let Some(word) = flit {
                    match self.flit_counter {
                        ACK_APP_ID => self.ack_app_id = word,
                        ACK_CLUSTER_ADDRESS => self.cluster_address = word,
                        _ => {}
                    }
                    if self.payload_size == 0 {
                        staged = self.reply_new_app(repo, admission);
                    }
                }
            }
            ReceiveState::ReceiveAllocationReq => {
                if let Some(word) = flit {
                    match self.flit_counter {
                        ALLOC_TASK_ID => self.task_id = word,
                        ALLOC_MASTER_ID => self.master_id = word,
                        ALLOC_PE => self.allocated_pe = word,
                        _ => {}
                    }
                    if self.payload_size == 0 {
                        staged = self.reply_task_allocation(repo);
                    }
                }
            }
            ReceiveState::ReceiveMappingComplete => {
                if self.payload_size == 0 && (flit.is_some() || self.ended_at_service) {
                    tracing::info!("manager reports application mapping complete");
                    self.state = ReceiveState::Header;
                }
            }
            ReceiveState::WaitingSendNewApp | ReceiveState::WaitingSendTaskAllocation => {
                if view.is_send_finished() {
                    self.state = ReceiveState::Header;
                }
            }
        }

        if flit.is_some() && self.payload_size != 0 {
            self.payload_size -= 1;
            self.flit_counter += 1;
        }

        staged
    }

    fn dispatch(&mut self, word: u32) {
        if let Some(code) = self.fault {
            tracing::trace!(word = %format_args!("{word:08x}"), code = %format_args!("{code:#x}"), "receiver stopped, flit discarded");
            return;
        }

        self.ended_at_service = self.payload_size == 0;
        self.state = match Service::try_from(word) {
            Ok(Service::AppRequestAck) => ReceiveState::ReceiveAppAck,
            Ok(Service::AppAllocationRequest) => ReceiveState::ReceiveAllocationReq,
            Ok(Service::AppMappingComplete) => ReceiveState::ReceiveMappingComplete,
            Ok(_) | Err(_) => {
                tracing::error!(service = %format_args!("{word:#010x}"), "unknown packet received, receiver stopped");
                self.fault = Some(word);
                return;
            }
        };
        tracing::debug!(state = ?self.state, payload = self.payload_size, "service decoded");
    }

    fn reply_new_app<R: RepositoryAccess + ?Sized>(
        &mut self,
        repo: &R,
        admission: &mut Option<LaunchEntry>,
    ) -> Option<StagedPacket> {
        let Some(launch) = admission.take() else {
            tracing::error!(app_id = self.ack_app_id, "admission ack without a pending request");
            self.state = ReceiveState::Header;
            return None;
        };

        tracing::info!(
            app = %launch.name,
            app_id = self.ack_app_id,
            cluster = %format_args!("{:#x}", self.cluster_address),
            "manager acknowledged application"
        );

        let app = launch.name.clone();
        match load_app_descriptor(repo, launch, self.ack_app_id, self.cluster_address) {
            Ok(packet) => {
                self.state = ReceiveState::WaitingSendNewApp;
                Some(packet)
            }
            Err(e) => {
                tracing::error!(error = %e, %app, "failed to load application descriptor");
                self.state = ReceiveState::Header;
                None
            }
        }
    }

    fn reply_task_allocation<R: RepositoryAccess + ?Sized>(&mut self, repo: &R) -> Option<StagedPacket> {
        let (x, y) = pe_xy(self.allocated_pe);
        match load_task_allocation(repo, self.task_id, self.master_id, self.allocated_pe) {
            Ok(packet) => {
                tracing::info!(
                    task_id = %format_args!("{:#06x}", self.task_id),
                    pe = %format_args!("{x}x{y}"),
                    "loading task"
                );
                self.state = ReceiveState::WaitingSendTaskAllocation;
                Some(packet)
            }
            Err(e) => {
                tracing::error!(
                    error = %e,
                    task_id = %format_args!("{:#06x}", self.task_id),
                    range = e.is_range_error(),
                    "failed to load task, request dropped"
                );
                self.state = ReceiveState::Header;
                None
            }
        }
    }
}

impl Default for Receiver {
    fn default() -> Self {
        Self::new()
    }
}
