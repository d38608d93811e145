//! Injector wire format: the packets exchanged with the global manager.
//!
//! A packet is a sequence of 32-bit flits. Every packet starts with the
//! fixed service header below, followed by a service-specific payload.
//! The header layout is shared with the kernels running on the processing
//! elements, so field positions must not move.
//!
//! `PacketHeader` is `#[repr(C)]` with zerocopy derives: it is copied into
//! and out of flit buffers without hand-written offset arithmetic.

use static_assertions::assert_eq_size;
use zerocopy::{AsBytes, FromBytes, FromZeroes};

// ── Service Header ───────────────────────────────────────────────────────────

/// Number of flits in the fixed service header.
pub const HEADER_WORDS: usize = 13;

/// Flits that precede the counted part of a packet (target + payload size).
pub const ROUTING_WORDS: usize = 2;

/// The fixed part of every packet.
///
/// Wire size: 13 flits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, AsBytes, FromBytes, FromZeroes)]
#[repr(C)]
pub struct PacketHeader {
    /// Destination address. Processing elements are addressed as `x << 8 | y`.
    pub target: u32,

    /// Flits after the first two: `total_words - 2`.
    pub payload_size: u32,

    /// Service code, see [`Service`].
    pub service: u32,

    /// Producer task. Carries the full task id (`app_id << 8 | task_id`)
    /// on task allocation, or the application id on inbound acks.
    pub producer_task: u32,

    /// Consumer task. Carries the master id on task allocation.
    pub consumer_task: u32,

    /// Unused by the injector, zero on send.
    pub reserved: [u32; 3],

    /// Service-level length: code size for task allocation, or the length
    /// of the service record that follows the header.
    pub msg_length: u32,

    /// Pads the header to its fixed size.
    pub filler: [u32; 4],
}

// Compile-time size guard. If this fails, the wire format has silently changed.
assert_eq_size!(PacketHeader, [u32; HEADER_WORDS]);

impl PacketHeader {
    /// Header addressed to `target` for `service`, all other fields zero.
    pub fn new(target: u32, service: Service) -> Self {
        Self {
            target,
            service: service.into(),
            ..Self::new_zeroed()
        }
    }

    /// Read the header from the front of a flit slice.
    pub fn decode(words: &[u32]) -> Result<Self, WireError> {
        Self::read_from_prefix(words.as_bytes()).ok_or(WireError::ShortPacket(words.len()))
    }
}

// ── Services ─────────────────────────────────────────────────────────────────

/// Service codes understood by the injector.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u32)]
pub enum Service {
    /// Injector → PE: task code image.
    TaskAllocation = 0x0000_0040,
    /// Injector → manager: admission request (carries the task count).
    NewAppRequest = 0x0000_0290,
    /// Manager → injector: admission granted (carries the cluster address).
    AppRequestAck = 0x0000_0300,
    /// Injector → cluster manager: application descriptor.
    NewApp = 0x0000_0150,
    /// Manager → injector: load one task at a given PE.
    AppAllocationRequest = 0x0000_0240,
    /// Inter-manager message, never handled by the injector.
    ServiceTaskMessage = 0x0000_0350,
    /// Manager → injector: the last application is fully mapped.
    AppMappingComplete = 0x0000_0440,
}

impl TryFrom<u32> for Service {
    type Error = WireError;

    fn try_from(value: u32) -> Result<Self, Self::Error> {
        match value {
            0x0000_0040 => Ok(Service::TaskAllocation),
            0x0000_0290 => Ok(Service::NewAppRequest),
            0x0000_0300 => Ok(Service::AppRequestAck),
            0x0000_0150 => Ok(Service::NewApp),
            0x0000_0240 => Ok(Service::AppAllocationRequest),
            0x0000_0350 => Ok(Service::ServiceTaskMessage),
            0x0000_0440 => Ok(Service::AppMappingComplete),
            other => Err(WireError::UnknownService(other)),
        }
    }
}

impl From<Service> for u32 {
    fn from(s: Service) -> u32 {
        s as u32
    }
}

// ── Staged Packet ────────────────────────────────────────────────────────────

/// A fully assembled outbound packet.
///
/// Move-only: a producer builds it, hands it over, and the sender drops it
/// after the last flit has left. Not `Clone`.
#[derive(Debug, PartialEq, Eq)]
pub struct StagedPacket {
    words: Vec<u32>,
}

impl StagedPacket {
    /// Assemble `header` followed by `payload`. `payload_size` is filled in.
    pub fn new(mut header: PacketHeader, payload: &[u32]) -> Self {
        let total = HEADER_WORDS + payload.len();
        header.payload_size = (total - ROUTING_WORDS) as u32;

        let mut words = vec![0u32; total];
        words[..HEADER_WORDS]
            .as_bytes_mut()
            .copy_from_slice(header.as_bytes());
        words[HEADER_WORDS..].copy_from_slice(payload);
        Self { words }
    }

    /// Wrap raw flits, checking the header and the length invariant.
    pub fn from_words(words: Vec<u32>) -> Result<Self, WireError> {
        let header = PacketHeader::decode(&words)?;
        let declared = header.payload_size as usize + ROUTING_WORDS;
        if declared != words.len() {
            return Err(WireError::LengthMismatch {
                declared,
                actual: words.len(),
            });
        }
        Ok(Self { words })
    }

    pub fn header(&self) -> PacketHeader {
        // Construction guarantees at least HEADER_WORDS flits.
        PacketHeader::read_from_prefix(self.words.as_bytes()).unwrap_or_else(PacketHeader::new_zeroed)
    }

    pub fn service(&self) -> Result<Service, WireError> {
        Service::try_from(self.words[2])
    }

    /// All flits in transmission order.
    pub fn words(&self) -> &[u32] {
        &self.words
    }

    /// Flits after the fixed header.
    pub fn payload(&self) -> &[u32] {
        &self.words[HEADER_WORDS..]
    }

    pub fn len(&self) -> usize {
        self.words.len()
    }

    pub fn is_empty(&self) -> bool {
        self.words.is_empty()
    }

    pub fn into_words(self) -> Vec<u32> {
        self.words
    }
}

// ── Constants ────────────────────────────────────────────────────────────────

/// Address of the PE running the global manager.
pub const MANAGER_PE_ADDR: u32 = 0;

/// Task id of the global mapper inside the management application.
pub const GLOBAL_MAPPER_TASK: u32 = 0;

/// Lines per task descriptor in an application repository.
pub const TASK_DESCRIPTOR_SIZE: usize = 6;

/// Service record length of a NEW_APP_REQ: code, cluster, task count.
pub const APP_REQUEST_RECORD: usize = 3;

/// Split a full task id into `(app_id, task_id)`.
pub fn split_task_id(full_task_id: u32) -> (u32, u32) {
    (full_task_id >> 8, full_task_id & 0xFF)
}

/// Split a PE address into its mesh coordinates `(x, y)`.
pub fn pe_xy(addr: u32) -> (u32, u32) {
    (addr >> 8, addr & 0xFF)
}

// ── Errors ───────────────────────────────────────────────────────────────────

/// Errors that can arise when interpreting wire-format data.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum WireError {
    #[error("unknown service code: 0x{0:08x}")]
    UnknownService(u32),

    #[error("packet of {0} flits is shorter than the service header")]
    ShortPacket(usize),

    #[error("header declares {declared} flits, packet has {actual}")]
    LengthMismatch { declared: usize, actual: usize },
}

// ── Tests ────────────────────────────────────────────────────────────────────
