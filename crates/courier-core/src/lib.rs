//! courier-core
//!
//! Post-booking side effects for a scheduling service. A booking is
//! confirmed as soon as it is persisted; calendar events, the meeting link
//! and the confirmation email run afterwards as a best-effort task set whose
//! progress can be inspected but never blocks the booking.
//!
//! # Modules
//! - **domain**: appointments, task kinds, states, outcomes, errors
//! - **ports**: collaborator traits (availability, persistence, calendar, composer, mailer)
//! - **tasks**: the `BackgroundTask` contract and the four post-booking tasks
//! - **app**: commit gate, orchestrator, status store, diagnostics
//! - **impls**: in-memory collaborators
//! - **config**: TOML configuration

pub mod app;
pub mod config;
pub mod domain;
pub mod impls;
pub mod ports;
pub mod tasks;
