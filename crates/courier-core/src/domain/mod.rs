//! Domain model: appointments, task kinds, task states, outcomes and errors.

pub mod appointment;
pub mod errors;
pub mod ids;
pub mod outcome;
pub mod record;
pub mod state;
pub mod task_kind;

pub use appointment::{AccountRef, Appointment, BookingRequest, ConfirmationStatus};
pub use errors::{BookingError, ErrorKind, TaskError};
pub use ids::{AppointmentId, Id, IdMarker, ParseIdError};
pub use outcome::TaskOutcome;
pub use record::{TaskRecord, TaskSet, TransitionError};
pub use state::TaskState;
pub use task_kind::TaskKind;
