//! Packet sender. Drains the staged packet onto the link, one flit per
//! tick, under credit flow control.
//!
//! The sender never decides what to send. It takes whatever packet is
//! staged once a producer asks for transmission, and it is the only place
//! a staged packet is dropped.

use serde::Serialize;

use injector_core::StagedPacket;

use crate::view::View;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum SendState {
    Idle,
    SendPacket,
    WaitingCredit,
    SendFinished,
}

#[derive(Debug)]
pub struct Sender {
    state: SendState,
    packet: Option<StagedPacket>,
    /// Next flit to transmit.
    index: usize,
    /// A request with nothing staged has been reported.
    null_reported: bool,
}

impl Sender {
    pub fn new() -> Self {
        Self {
            state: SendState::Idle,
            packet: None,
            index: 0,
            null_reported: false,
        }
    }

    pub fn state(&self) -> SendState {
        self.state
    }

    /// The sender currently owns a packet.
    pub fn is_holding(&self) -> bool {
        self.packet.is_some()
    }

    /// Flits of the current packet not yet transmitted.
    #[cfg(test)]
    pub(crate) fn remaining(&self) -> usize {
        self.packet
            .as_ref()
            .map_or(0, |p| p.len().saturating_sub(self.index))
    }

    pub fn reset(&mut self) {
        *self = Self::new();
    }

    /// Returns the flit driven onto the link this tick.
    pub fn step(
        &mut self,
        view: &View,
        credit_in: bool,
        staged: &mut Option<StagedPacket>,
    ) -> Option<u32> {
        match self.state {
            SendState::Idle => {
                if !view.transmit_requested() {
                    self.null_reported = false;
                } else if credit_in {
                    match staged.take() {
                        Some(packet) => {
                            tracing::debug!(
                                flits = packet.len(),
                                target = packet.header().target,
                                service = %format_args!("{:#x}", packet.header().service),
                                "transmission started"
                            );
                            self.packet = Some(packet);
                            self.index = 0;
                            self.null_reported = false;
                            self.state = SendState::SendPacket;
                        }
                        None => {
                            if !self.null_reported {
                                tracing::error!(requester = ?view, "transmission requested with no staged packet");
                                self.null_reported = true;
                            }
                        }
                    }
                }
                None
            }
            SendState::SendPacket => {
                if credit_in {
                    self.emit()
                } else {
                    tracing::trace!(index = self.index, "credit lost");
                    self.state = SendState::WaitingCredit;
                    None
                }
            }
            SendState::WaitingCredit => {
                if credit_in {
                    self.state = SendState::SendPacket;
                    self.emit()
                } else {
                    None
                }
            }
            SendState::SendFinished => {
                self.packet = None;
                self.index = 0;
                self.state = SendState::Idle;
                tracing::debug!("staged packet released");
                None
            }
        }
    }

    fn emit(&mut self) -> Option<u32> {
        let word = self
            .packet
            .as_ref()
            .and_then(|p| p.words().get(self.index).copied());

        match word {
            Some(word) => {
                tracing::trace!(index = self.index, word = %format_args!("{word:08x}"), "flit sent");
                self.index += 1;
                Some(word)
            }
            None => {
                self.state = SendState::SendFinished;
                None
            }
        }
    }
}

impl Default for Sender {
    fn default() -> Self {
        Self::new()
    }
}
