//! Commit gate: validate, reserve, persist, respond. Background work is
//! handed to the orchestrator after the appointment is durable and is never
//! awaited here.
//!
//! Both collaborator calls on this path (the availability reservation and
//! the persistence write) run under the per-call timeout, so a stalled
//! backend turns into a `persistence_error` response instead of a hung
//! request.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use tracing::{error, info, warn};

use super::orchestrator::Orchestrator;
use crate::domain::{AccountRef, Appointment, BookingError, BookingRequest, ConfirmationStatus};
use crate::ports::{AvailabilityError, AvailabilityStore, Clock, IdGenerator, PersistenceStore};

const DEFAULT_TITLE: &str = "Appointment";
const MAX_TIMEZONE_LEN: usize = 64;

pub struct BookingService {
    availability: Arc<dyn AvailabilityStore>,
    persistence: Arc<dyn PersistenceStore>,
    orchestrator: Arc<Orchestrator>,
    ids: Arc<dyn IdGenerator>,
    clock: Arc<dyn Clock>,
    call_timeout: Duration,
}

impl BookingService {
    pub fn new(
        availability: Arc<dyn AvailabilityStore>,
        persistence: Arc<dyn PersistenceStore>,
        orchestrator: Arc<Orchestrator>,
        ids: Arc<dyn IdGenerator>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let call_timeout = orchestrator.call_timeout();
        Self {
            availability,
            persistence,
            orchestrator,
            ids,
            clock,
            call_timeout,
        }
    }

    /// Override the timeout applied to the reservation and persistence
    /// calls. Defaults to the orchestrator's per-call timeout.
    pub fn with_call_timeout(mut self, call_timeout: Duration) -> Self {
        self.call_timeout = call_timeout;
        self
    }

    pub fn orchestrator(&self) -> &Arc<Orchestrator> {
        &self.orchestrator
    }

    /// Book an appointment.
    ///
    /// On `Ok` the appointment is persisted and confirmed, and exactly one
    /// task set has been handed to the orchestrator. On `Err` nothing was
    /// persisted and nothing was dispatched.
    pub async fn commit(&self, request: BookingRequest) -> Result<Appointment, BookingError> {
        let appointment = self.validate(request)?;
        let seller = &appointment.seller_id;

        let reserved = self
            .bounded(
                "availability check",
                self.availability
                    .check_and_reserve(seller, appointment.start, appointment.end),
            )
            .await?;
        reserved.map_err(|err| match err {
            AvailabilityError::Conflict => BookingError::Conflict {
                seller: seller.to_string(),
                start: appointment.start,
                end: appointment.end,
            },
            AvailabilityError::Unavailable(reason) => BookingError::Persistence(reason),
        })?;

        let saved = match self
            .bounded("appointment write", self.persistence.save_appointment(&appointment))
            .await
        {
            Ok(Ok(())) => Ok(()),
            Ok(Err(err)) => Err(BookingError::Persistence(err.to_string())),
            Err(err) => Err(err),
        };
        if let Err(err) = saved {
            error!(appointment_id = %appointment.id, error = %err, "failed to persist appointment");
            let release = self
                .availability
                .release(seller, appointment.start, appointment.end);
            if self.bounded("reservation release", release).await.is_err() {
                warn!(appointment_id = %appointment.id, "reservation release timed out");
            }
            return Err(err);
        }
        info!(appointment_id = %appointment.id, seller = %seller, "appointment committed");

        // the booking is confirmed at this point whatever dispatch says
        if let Err(err) = self.orchestrator.dispatch(Arc::new(appointment.clone())) {
            warn!(appointment_id = %appointment.id, error = %err, "background tasks not dispatched");
        }

        Ok(appointment)
    }

    async fn bounded<T>(
        &self,
        what: &str,
        fut: impl Future<Output = T>,
    ) -> Result<T, BookingError> {
        tokio::time::timeout(self.call_timeout, fut)
            .await
            .map_err(|_| {
                BookingError::Persistence(format!(
                    "{what} did not answer within {}ms",
                    self.call_timeout.as_millis()
                ))
            })
    }

    fn validate(&self, request: BookingRequest) -> Result<Appointment, BookingError> {
        let seller_id = required("sellerId", &request.seller_id)?;
        let buyer_id = required("buyerId", &request.buyer_id)?;

        let timezone = required("timezone", &request.timezone)?;
        if timezone.len() > MAX_TIMEZONE_LEN || timezone.chars().any(char::is_whitespace) {
            return Err(BookingError::validation(
                "timezone",
                "must be an IANA zone name such as Europe/Berlin",
            ));
        }

        if request.end <= request.start {
            return Err(BookingError::validation("end", "must be after start"));
        }

        let title = match request.title.trim() {
            "" => DEFAULT_TITLE.to_string(),
            t => t.to_string(),
        };

        Ok(Appointment {
            id: self.ids.appointment_id(),
            seller_id: AccountRef::new(seller_id),
            buyer_id: AccountRef::new(buyer_id),
            title,
            start: request.start,
            end: request.end,
            timezone: timezone.to_string(),
            status: ConfirmationStatus::Confirmed,
            meeting_link: None,
            created_at: self.clock.now(),
        })
    }
}

fn required<'a>(field: &'static str, value: &'a str) -> Result<&'a str, BookingError> {
    match value.trim() {
        "" => Err(BookingError::validation(field, "is required")),
        v => Ok(v),
    }
}
