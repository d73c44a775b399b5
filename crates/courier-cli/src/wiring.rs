//! Builds the booking stack from configuration, using the in-memory
//! collaborators.

use std::sync::Arc;

use courier_core::app::{
    BookingService, BuildError, Diagnostics, Orchestrator, OrchestratorBuilder, StatusStore,
};
use courier_core::config::CourierConfig;
use courier_core::impls::{
    DerivedMeetingLinks, InMemoryAppointments, InMemoryAvailability, LogMailer, SimulatedCalendar,
    TemplateComposer,
};
use courier_core::ports::{SystemClock, UlidGenerator};
use courier_core::tasks::{CalendarTask, EmailTask, MeetingLinkTask};

/// Shared by every HTTP handler.
#[derive(Clone)]
pub struct AppState {
    pub booking: Arc<BookingService>,
    pub diagnostics: Diagnostics,
}

pub struct Services {
    pub state: AppState,
    pub orchestrator: Arc<Orchestrator>,
    pub store: Arc<StatusStore>,
}

pub fn build(config: &CourierConfig) -> Result<Services, BuildError> {
    let clock = Arc::new(SystemClock);
    let store = Arc::new(StatusStore::new(config.status.retention(), clock.clone()));

    let appointments = Arc::new(InMemoryAppointments::new());
    let calendar = Arc::new(SimulatedCalendar::new());
    let mailer = Arc::new(LogMailer::new());

    let orchestrator = OrchestratorBuilder::new(store.clone())
        .settings(config.orchestrator.settings())
        .register(Arc::new(CalendarTask::seller(calendar.clone())))?
        .register(Arc::new(CalendarTask::buyer(calendar)))?
        .register(Arc::new(MeetingLinkTask::new(
            Arc::new(DerivedMeetingLinks::default()),
            appointments.clone(),
        )))?
        .register(Arc::new(EmailTask::new(
            Arc::new(TemplateComposer::new()),
            mailer,
        )))?
        .build()?;
    let orchestrator = Arc::new(orchestrator);

    let booking = Arc::new(BookingService::new(
        Arc::new(InMemoryAvailability::new()),
        appointments,
        orchestrator.clone(),
        Arc::new(UlidGenerator::new(SystemClock)),
        clock,
    ));

    Ok(Services {
        state: AppState {
            booking,
            diagnostics: orchestrator.diagnostics(),
        },
        orchestrator,
        store,
    })
}
