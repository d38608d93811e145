//! Cross-machine signals.
//!
//! At the start of a tick the engine freezes every machine's state into a
//! `View`. Machines read each other only through it, so the order in which
//! they are evaluated within a tick never matters.

use serde::Serialize;

use crate::bootloader::BootState;
use crate::monitor::MonitorState;
use crate::receiver::ReceiveState;
use crate::sender::SendState;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct View {
    pub bootloader: BootState,
    pub monitor: MonitorState,
    pub receiver: ReceiveState,
    pub sender: SendState,
}

impl View {
    /// The sender released its packet this tick.
    pub fn is_send_finished(&self) -> bool {
        self.sender == SendState::SendFinished
    }

    pub fn is_bootloader_finished(&self) -> bool {
        self.bootloader == BootState::BootloaderFinished
    }

    /// The receiver is between packets and nothing is waiting on a reply.
    pub fn is_receiver_idle(&self) -> bool {
        self.receiver == ReceiveState::Header
    }

    pub fn is_mapping_complete(&self) -> bool {
        self.receiver == ReceiveState::ReceiveMappingComplete
    }

    /// Some producer has staged a packet and waits for the sender.
    pub fn transmit_requested(&self) -> bool {
        self.bootloader == BootState::WaitSendBoot
            || self.monitor == MonitorState::WaitingSendAppReq
            || matches!(
                self.receiver,
                ReceiveState::WaitingSendNewApp | ReceiveState::WaitingSendTaskAllocation
            )
    }

    /// Credit granted upstream. Withheld until the boot task has gone out
    /// and while any packet is in flight, so no second packet can be
    /// staged behind it.
    pub fn credit_out(&self) -> bool {
        self.is_bootloader_finished() && !self.transmit_requested()
    }
}
