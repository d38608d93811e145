//! injector-core — wire format, configuration, and the management call
//! contract. All other injector crates depend on this one.

pub mod config;
pub mod management;
pub mod wire;

pub use config::InjectorConfig;
pub use wire::{PacketHeader, Service, StagedPacket, WireError};
