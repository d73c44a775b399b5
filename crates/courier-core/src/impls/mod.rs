//! In-process implementations of the ports, for local runs and tests.
//!
//! Real integrations (calendar API, LLM, SMTP, database) live outside this
//! crate and implement the same traits.

pub mod appointments;
pub mod availability;
pub mod calendar;
pub mod messaging;

pub use self::appointments::InMemoryAppointments;
pub use self::availability::InMemoryAvailability;
pub use self::calendar::{DerivedMeetingLinks, SimulatedCalendar};
pub use self::messaging::{LogMailer, SentMail, TemplateComposer};
