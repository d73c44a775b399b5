//! Instrumented collaborators and a fully wired booking stack.

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Duration as ChronoDuration, TimeZone, Utc};

use courier_core::app::{
    BookingService, Diagnostics, OrchestratorBuilder, OrchestratorSettings, StatusStore,
    TaskStatusReport,
};
use courier_core::domain::{AccountRef, Appointment, AppointmentId, BookingRequest, TaskError};
use courier_core::impls::{InMemoryAppointments, InMemoryAvailability};
use courier_core::ports::{
    AiComposer, CalendarService, MailSender, MeetingLinkProvider, SystemClock, UlidGenerator,
};
use courier_core::tasks::{CalendarTask, EmailTask, MeetingLinkTask};

/// Ordered log of collaborator calls, shared by every fake.
#[derive(Clone, Default)]
pub struct CallLog(Arc<Mutex<Vec<String>>>);

impl CallLog {
    pub fn push(&self, entry: impl Into<String>) {
        self.0.lock().unwrap().push(entry.into());
    }

    pub fn entries(&self) -> Vec<String> {
        self.0.lock().unwrap().clone()
    }

    pub fn position(&self, entry: &str) -> Option<usize> {
        self.entries().iter().position(|e| e == entry)
    }
}

pub struct FakeCalendar {
    log: CallLog,
    latency: HashMap<String, Duration>,
    failures: HashMap<String, TaskError>,
}

#[async_trait]
impl CalendarService for FakeCalendar {
    async fn create_event(
        &self,
        account: &AccountRef,
        _appointment: &Appointment,
    ) -> Result<String, TaskError> {
        let account = account.as_str();
        self.log.push(format!("calendar:start:{account}"));
        if let Some(latency) = self.latency.get(account) {
            tokio::time::sleep(*latency).await;
        }
        let result = match self.failures.get(account) {
            Some(err) => Err(err.clone()),
            None => Ok(format!("evt-{account}")),
        };
        self.log.push(format!("calendar:end:{account}"));
        result
    }
}

pub struct FakeLinks {
    log: CallLog,
}

#[async_trait]
impl MeetingLinkProvider for FakeLinks {
    async fn link_for_event(
        &self,
        _account: &AccountRef,
        event_id: &str,
    ) -> Result<String, TaskError> {
        self.log.push(format!("link:{event_id}"));
        Ok(format!("https://meet.test/{event_id}"))
    }
}

pub struct FakeComposer {
    log: CallLog,
    latency: Duration,
    fail: bool,
}

#[async_trait]
impl AiComposer for FakeComposer {
    async fn compose(
        &self,
        appointment: &Appointment,
        meeting_link: Option<&str>,
    ) -> Result<String, TaskError> {
        self.log.push("compose");
        tokio::time::sleep(self.latency).await;
        if self.fail {
            return Err(TaskError::generation("model returned nothing"));
        }
        Ok(format!(
            "AI draft for {} ({})",
            appointment.title,
            meeting_link.unwrap_or("no link")
        ))
    }
}

#[derive(Clone, Debug)]
pub struct Mail {
    pub recipient: String,
    pub subject: String,
    pub body: String,
}

#[derive(Clone, Default)]
pub struct FakeMailer {
    log: CallLog,
    pub sent: Arc<Mutex<Vec<Mail>>>,
}

#[async_trait]
impl MailSender for FakeMailer {
    async fn send(&self, recipient: &AccountRef, subject: &str, body: &str) -> Result<(), TaskError> {
        self.log.push("mail");
        self.sent.lock().unwrap().push(Mail {
            recipient: recipient.to_string(),
            subject: subject.to_string(),
            body: body.to_string(),
        });
        Ok(())
    }
}

pub const SELLER: &str = "seller@test";
pub const BUYER: &str = "buyer@test";

/// Knobs for one test scenario.
pub struct Scenario {
    pub seller_latency: Duration,
    pub buyer_latency: Duration,
    pub seller_failure: Option<TaskError>,
    pub buyer_failure: Option<TaskError>,
    pub composer_latency: Duration,
    pub composer_fails: bool,
    pub retention: Duration,
    pub settings: OrchestratorSettings,
}

impl Default for Scenario {
    fn default() -> Self {
        Self {
            seller_latency: Duration::ZERO,
            buyer_latency: Duration::ZERO,
            seller_failure: None,
            buyer_failure: None,
            composer_latency: Duration::ZERO,
            composer_fails: false,
            retention: Duration::from_secs(3600),
            settings: OrchestratorSettings::default(),
        }
    }
}

pub struct Harness {
    pub service: BookingService,
    pub diagnostics: Diagnostics,
    pub store: Arc<StatusStore>,
    pub appointments: Arc<InMemoryAppointments>,
    pub mailer: FakeMailer,
    pub log: CallLog,
}

impl Harness {
    pub fn new(scenario: Scenario) -> Self {
        let log = CallLog::default();

        let mut latency = HashMap::new();
        latency.insert(SELLER.to_string(), scenario.seller_latency);
        latency.insert(BUYER.to_string(), scenario.buyer_latency);
        let mut failures = HashMap::new();
        if let Some(err) = scenario.seller_failure {
            failures.insert(SELLER.to_string(), err);
        }
        if let Some(err) = scenario.buyer_failure {
            failures.insert(BUYER.to_string(), err);
        }
        let calendar = Arc::new(FakeCalendar {
            log: log.clone(),
            latency,
            failures,
        });

        let appointments = Arc::new(InMemoryAppointments::new());
        let mailer = FakeMailer {
            log: log.clone(),
            ..Default::default()
        };
        let composer = Arc::new(FakeComposer {
            log: log.clone(),
            latency: scenario.composer_latency,
            fail: scenario.composer_fails,
        });

        let store = Arc::new(StatusStore::new(scenario.retention, Arc::new(SystemClock)));
        let orchestrator = OrchestratorBuilder::new(store.clone())
            .settings(scenario.settings)
            .register(Arc::new(CalendarTask::seller(calendar.clone())))
            .unwrap()
            .register(Arc::new(CalendarTask::buyer(calendar)))
            .unwrap()
            .register(Arc::new(MeetingLinkTask::new(
                Arc::new(FakeLinks { log: log.clone() }),
                appointments.clone(),
            )))
            .unwrap()
            .register(Arc::new(EmailTask::new(composer, Arc::new(mailer.clone()))))
            .unwrap()
            .build()
            .unwrap();
        let orchestrator = Arc::new(orchestrator);

        let service = BookingService::new(
            Arc::new(InMemoryAvailability::new()),
            appointments.clone(),
            orchestrator.clone(),
            Arc::new(UlidGenerator::new(SystemClock)),
            Arc::new(SystemClock),
        );

        Self {
            diagnostics: orchestrator.diagnostics(),
            service,
            store,
            appointments,
            mailer,
            log,
        }
    }

    /// Poll diagnostics until every task of the appointment is terminal.
    pub async fn wait_finished(&self, id: AppointmentId) -> TaskStatusReport {
        let wait = async {
            loop {
                if let Some(report) = self.diagnostics.get_task_statuses(id) {
                    if report.finished {
                        return report;
                    }
                }
                tokio::time::sleep(Duration::from_millis(5)).await;
            }
        };
        tokio::time::timeout(Duration::from_secs(30), wait)
            .await
            .expect("task set did not finish")
    }
}

pub fn start() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2030, 1, 15, 15, 0, 0).unwrap()
}

pub fn request() -> BookingRequest {
    request_at(start())
}

pub fn request_at(start: DateTime<Utc>) -> BookingRequest {
    BookingRequest {
        seller_id: SELLER.to_string(),
        buyer_id: BUYER.to_string(),
        title: "Kitchen remodel consult".to_string(),
        start,
        end: start + ChronoDuration::minutes(60),
        timezone: "America/Chicago".to_string(),
    }
}
