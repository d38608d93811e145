//! injector-engine — the injector's state machines and tick loop.
//!
//! `AppInjector` owns a bootloader, a launch monitor, a packet receiver and
//! a packet sender that share a single outbound packet slot. The `link`
//! module provides the upstream and downstream endpoints used to drive it.

pub mod bootloader;
pub mod engine;
pub mod link;
pub mod monitor;
pub mod receiver;
pub mod sender;
pub mod view;


pub use bootloader::BootState;
pub use engine::AppInjector;
pub use link::{FlitSink, FlitSource, Link, LinkInput, LinkOutput, ReceivedPacket};
pub use monitor::MonitorState;
pub use receiver::ReceiveState;
pub use sender::SendState;
pub use view::View;
