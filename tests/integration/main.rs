//! Injector integration test harness.
//!
//! Every test builds a small platform on disk (launch schedule plus one
//! repository per application) in its own scratch directory, then drives
//! an `AppInjector` over it through the link endpoints.
//!
//!   cargo test --test integration

mod infra;

mod allocation;
mod boot;
mod failures;
mod round_trip;

pub use infra::*;
