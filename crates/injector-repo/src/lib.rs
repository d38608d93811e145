//! injector-repo — descriptor repository parser.
//!
//! Reads the global launch schedule and the per-application repositories,
//! and builds the packets the injector sends from them.

pub mod descriptor;
pub mod field;
mod lines;
pub mod loader;
pub mod repository;
pub mod schedule;


pub use descriptor::{ApplicationImage, TaskDescriptor, TaskImage};
pub use loader::{app_request, load_app_descriptor, load_task_allocation};
pub use repository::{AppLocation, FileRepository, RepoError, RepositoryAccess};
pub use schedule::{LaunchEntry, LaunchRecord};
