//! Application layer: the orchestrator and everything around it.
//!
//! # Components
//! - **BookingService**: commit gate (validate, reserve, persist, dispatch)
//! - **Orchestrator**: runs each appointment's task set in the background
//! - **StatusStore**: authoritative task state, with retention
//! - **Diagnostics**: read-only queries over the store
//! - **RetentionSweeper**: periodic eviction of idle task sets
//! - **OrchestratorBuilder**: wiring with start-up validation

pub mod booking;
pub mod builder;
pub mod dependency;
pub mod diagnostics;
pub mod orchestrator;
pub mod registry;
pub mod retry;
pub mod status_store;
pub mod sweeper;
mod worker;

pub use self::booking::BookingService;
pub use self::builder::{BuildError, OrchestratorBuilder};
pub use self::dependency::{GraphError, TaskGraph};
pub use self::diagnostics::{Diagnostics, TaskStatus, TaskStatusReport};
pub use self::orchestrator::{DispatchError, Orchestrator, OrchestratorSettings};
pub use self::registry::{RegistryError, TaskRegistry};
pub use self::retry::RetryPolicy;
pub use self::status_store::{StatusStore, StoreError, StoreSummary, TaskUpdate};
pub use self::sweeper::RetentionSweeper;
