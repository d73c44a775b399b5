//! Ports: the external collaborators the core talks to.
//!
//! Each trait is the seam for swapping a real integration (calendar API, LLM,
//! SMTP, database) for the in-memory implementations in `impls`.

pub mod availability;
pub mod calendar;
pub mod clock;
pub mod composer;
pub mod id_generator;
pub mod mailer;
pub mod persistence;

pub use self::availability::{AvailabilityError, AvailabilityStore};
pub use self::calendar::{CalendarService, MeetingLinkProvider};
pub use self::clock::{Clock, FixedClock, SystemClock};
pub use self::composer::AiComposer;
pub use self::id_generator::{IdGenerator, UlidGenerator};
pub use self::mailer::MailSender;
pub use self::persistence::{PersistenceError, PersistenceStore};
