//! The application injector: four machines and one staged packet, advanced
//! together one tick at a time.
//!
//! Every tick runs in two phases. First each machine is evaluated against
//! a `View` frozen from the previous tick, with the sender draining the
//! slot as it stood at tick start. Then the packets the producers built
//! are staged. Evaluation order inside the first phase is irrelevant.

use injector_core::{InjectorConfig, StagedPacket};
use injector_repo::{LaunchEntry, RepositoryAccess};

use crate::bootloader::{BootState, Bootloader};
use crate::link::{LinkInput, LinkOutput};
use crate::monitor::{Monitor, MonitorState};
use crate::receiver::{ReceiveState, Receiver};
use crate::sender::{SendState, Sender};
use crate::view::View;

pub struct AppInjector<R> {
    repo: R,
    bootloader: Bootloader,
    monitor: Monitor,
    receiver: Receiver,
    sender: Sender,
    /// Built by a producer, not yet taken by the sender.
    staged: Option<StagedPacket>,
    /// Launch requested from the manager and not yet acknowledged.
    admission: Option<LaunchEntry>,
    ticks: u64,
}

impl<R: RepositoryAccess> AppInjector<R> {
    pub fn new(repo: R, config: &InjectorConfig) -> Self {
        Self {
            repo,
            bootloader: Bootloader::new(config.boot.clone()),
            monitor: Monitor::new(config.timing.ticks_per_time_unit, config.network.manager_address),
            receiver: Receiver::new(),
            sender: Sender::new(),
            staged: None,
            admission: None,
            ticks: 0,
        }
    }

    pub fn repository(&self) -> &R {
        &self.repo
    }

    /// Back to the power-on state. Any staged packet is dropped.
    pub fn reset(&mut self) {
        self.bootloader.reset();
        self.monitor.reset();
        self.receiver.reset();
        self.sender.reset();
        self.staged = None;
        self.admission = None;
        self.ticks = 0;
        tracing::debug!("injector reset");
    }

    pub fn view(&self) -> View {
        View {
            bootloader: self.bootloader.state(),
            monitor: self.monitor.state(),
            receiver: self.receiver.state(),
            sender: self.sender.state(),
        }
    }

    /// Credit offered upstream for the coming tick.
    pub fn credit_out(&self) -> bool {
        self.view().credit_out()
    }

    pub fn tick(&mut self, input: LinkInput) -> LinkOutput {
        let view = self.view();
        let credit_out = view.credit_out();
        let flit = (input.rx && credit_out).then_some(input.data_in);
        if let Some(word) = flit {
            tracing::trace!(tick = self.ticks, word = %format_args!("{word:08x}"), "flit received");
        }

        let data_out = self.sender.step(&view, input.credit_in, &mut self.staged);
        let boot = self.bootloader.step(&view, &self.repo);
        let request = self.monitor.step(&view, &self.repo, &mut self.admission);
        let reply = self.receiver.step(&view, flit, &self.repo, &mut self.admission);

        for packet in [boot, request, reply].into_iter().flatten() {
            self.stage(packet);
        }

        let next = self.view();
        if next != view {
            tracing::debug!(tick = self.ticks, from = ?view, to = ?next, "state change");
        }
        self.ticks += 1;

        LinkOutput {
            tx: data_out.is_some(),
            data_out: data_out.unwrap_or_default(),
            credit_out,
        }
    }

    fn stage(&mut self, packet: StagedPacket) {
        assert_eq!(
            self.outstanding_buffers(),
            0,
            "packet staged while another is outstanding"
        );
        tracing::trace!(
            tick = self.ticks,
            flits = packet.len(),
            dump = %hex_dump(packet.words()),
            "packet staged"
        );
        self.staged = Some(packet);
    }

    /// Packets built and not yet fully sent: the staged one plus the one
    /// the sender holds. Never more than one.
    pub fn outstanding_buffers(&self) -> usize {
        usize::from(self.staged.is_some()) + usize::from(self.sender.is_holding())
    }

    pub fn bootloader_state(&self) -> BootState {
        self.bootloader.state()
    }

    pub fn monitor_state(&self) -> MonitorState {
        self.monitor.state()
    }

    pub fn receiver_state(&self) -> ReceiveState {
        self.receiver.state()
    }

    pub fn sender_state(&self) -> SendState {
        self.sender.state()
    }

    /// Service code that stopped the receiver, if any.
    pub fn receiver_fault(&self) -> Option<u32> {
        self.receiver.fault()
    }

    /// Monitor clock in ticks.
    pub fn current_time(&self) -> u64 {
        self.monitor.current_time()
    }

    pub fn ticks(&self) -> u64 {
        self.ticks
    }

    /// No progress is possible without fixing the input: the receiver hit
    /// an unknown service, or the boot task or schedule cannot be read.
    pub fn is_stalled(&self) -> bool {
        self.receiver.fault().is_some() || self.bootloader.is_failing() || self.monitor.is_failing()
    }

    /// The schedule is exhausted and nothing is in flight or expected.
    pub fn is_quiescent(&self) -> bool {
        self.monitor.is_exhausted()
            && self.admission.is_none()
            && self.outstanding_buffers() == 0
            && self.view().is_bootloader_finished()
            && self.view().is_receiver_idle()
    }
}

/// Words as big-endian hex, matching the `{:08x}` flit traces.
fn hex_dump(words: &[u32]) -> String {
    let bytes: Vec<u8> = words.iter().flat_map(|w| w.to_be_bytes()).collect();
    hex::encode(bytes)
}
