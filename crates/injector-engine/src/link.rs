//! Link endpoints around the injector.
//!
//! `FlitSource` plays the upstream router: it replays whole packets one
//! flit per tick, only while the injector grants credit. `FlitSink` plays
//! the downstream router: it grants or withholds credit and reassembles
//! what the injector sends. `Link` wires both to an injector for one tick.

use std::collections::VecDeque;

use serde::Serialize;

use injector_core::wire::ROUTING_WORDS;
use injector_repo::RepositoryAccess;

use crate::engine::AppInjector;

/// Signals driven into the injector for one tick.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LinkInput {
    /// Upstream has a valid flit on `data_in`.
    pub rx: bool,
    pub data_in: u32,
    /// Downstream can take one flit.
    pub credit_in: bool,
}

/// Signals the injector drives for one tick.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LinkOutput {
    /// `data_out` carries a valid flit.
    pub tx: bool,
    pub data_out: u32,
    /// The injector accepted, or would have accepted, an inbound flit.
    pub credit_out: bool,
}

impl LinkOutput {
    pub fn flit(&self) -> Option<u32> {
        self.tx.then_some(self.data_out)
    }
}

// ── Upstream ─────────────────────────────────────────────────────────────────

#[derive(Debug, Default)]
pub struct FlitSource {
    queue: VecDeque<u32>,
    delivered: u64,
}

impl FlitSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_packet(&mut self, words: impl IntoIterator<Item = u32>) {
        self.queue.extend(words);
    }

    /// Flit on the wire if credit is granted this tick.
    pub fn offer(&self, credit: bool) -> Option<u32> {
        if credit {
            self.queue.front().copied()
        } else {
            None
        }
    }

    /// The offered flit was taken.
    pub fn advance(&mut self) {
        if self.queue.pop_front().is_some() {
            self.delivered += 1;
        }
    }

    pub fn is_drained(&self) -> bool {
        self.queue.is_empty()
    }

    pub fn pending(&self) -> usize {
        self.queue.len()
    }

    pub fn delivered(&self) -> u64 {
        self.delivered
    }
}

// ── Downstream ───────────────────────────────────────────────────────────────

/// A packet as it arrived downstream.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReceivedPacket {
    /// Tick of the first flit.
    pub tick: u64,
    pub target: u32,
    pub service: u32,
    pub words: Vec<u32>,
}

#[derive(Debug, Default)]
pub struct FlitSink {
    withheld: u64,
    partial: Vec<u32>,
    started: u64,
    packets: Vec<ReceivedPacket>,
    /// Flits that arrived while credit was withheld.
    violations: u64,
}

impl FlitSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Refuse credit for the next `ticks` ticks.
    pub fn withhold_credit(&mut self, ticks: u64) {
        self.withheld = self.withheld.max(ticks);
    }

    pub fn credit(&self) -> bool {
        self.withheld == 0
    }

    /// Take this tick's output. `granted` is the credit offered for it.
    pub fn accept(&mut self, tick: u64, granted: bool, output: &LinkOutput) {
        if let Some(word) = output.flit() {
            if !granted {
                tracing::warn!(tick, word = %format_args!("{word:08x}"), "flit sent without credit");
                self.violations += 1;
            }
            if self.partial.is_empty() {
                self.started = tick;
            }
            self.partial.push(word);
            self.complete();
        }
        self.withheld = self.withheld.saturating_sub(1);
    }

    fn complete(&mut self) {
        let Some(&payload_size) = self.partial.get(1) else {
            return;
        };
        if self.partial.len() < payload_size as usize + ROUTING_WORDS {
            return;
        }

        let words = std::mem::take(&mut self.partial);
        let packet = ReceivedPacket {
            tick: self.started,
            target: words[0],
            service: words.get(2).copied().unwrap_or_default(),
            words,
        };
        tracing::debug!(
            tick = packet.tick,
            target = packet.target,
            service = %format_args!("{:#x}", packet.service),
            flits = packet.words.len(),
            "packet delivered"
        );
        self.packets.push(packet);
    }

    pub fn packets(&self) -> &[ReceivedPacket] {
        &self.packets
    }

    pub fn take_packets(&mut self) -> Vec<ReceivedPacket> {
        std::mem::take(&mut self.packets)
    }

    /// A packet has started but not all of its flits arrived.
    pub fn is_mid_packet(&self) -> bool {
        !self.partial.is_empty()
    }

    pub fn violations(&self) -> u64 {
        self.violations
    }
}

// ── Driver ───────────────────────────────────────────────────────────────────

#[derive(Debug, Default)]
pub struct Link {
    pub source: FlitSource,
    pub sink: FlitSink,
}

impl Link {
    pub fn new() -> Self {
        Self::default()
    }

    /// Run one tick of `injector` between the two endpoints.
    pub fn step<R: RepositoryAccess>(&mut self, injector: &mut AppInjector<R>) -> LinkOutput {
        let tick = injector.ticks();
        let offered = self.source.offer(injector.credit_out());
        let granted = self.sink.credit();

        let output = injector.tick(LinkInput {
            rx: offered.is_some(),
            data_in: offered.unwrap_or_default(),
            credit_in: granted,
        });

        if offered.is_some() && output.credit_out {
            self.source.advance();
        }
        self.sink.accept(tick, granted, &output);
        output
    }

    /// Nothing left to deliver in either direction.
    pub fn is_idle(&self) -> bool {
        self.source.is_drained() && !self.sink.is_mid_packet()
    }
}
