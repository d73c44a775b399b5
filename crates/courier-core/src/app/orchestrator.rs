//! Orchestrator: owns every in-flight task set of this process.
//!
//! `dispatch` registers the task set and spawns its supervisor, then returns.
//! Nothing about task execution is ever reported back to the caller; results
//! are only observable through the status store.

use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use super::dependency::TaskGraph;
use super::diagnostics::Diagnostics;
use super::registry::TaskRegistry;
use super::retry::RetryPolicy;
use super::status_store::{StatusStore, StoreError};
use super::worker::run_task_set;
use crate::domain::{Appointment, AppointmentId, TaskKind};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DispatchError {
    #[error("appointment {0} was already dispatched")]
    AlreadyDispatched(AppointmentId),

    #[error("orchestrator is shutting down")]
    ShuttingDown,

    #[error(transparent)]
    Store(StoreError),
}

/// Execution limits applied to every task set.
#[derive(Debug, Clone, PartialEq)]
pub struct OrchestratorSettings {
    /// Upper bound for a single collaborator call.
    pub call_timeout: Duration,
    /// Overall deadline for one task set, counted from admission.
    pub background_budget: Duration,
    /// Task sets allowed to execute at the same time. Others wait Pending.
    pub max_in_flight: usize,
    pub retry: RetryPolicy,
}

impl Default for OrchestratorSettings {
    fn default() -> Self {
        Self {
            call_timeout: Duration::from_secs(10),
            background_budget: Duration::from_secs(60),
            max_in_flight: 64,
            retry: RetryPolicy::default(),
        }
    }
}

/// State shared by every supervisor and task future.
pub(crate) struct Shared {
    pub(crate) store: Arc<StatusStore>,
    pub(crate) registry: TaskRegistry,
    pub(crate) graph: TaskGraph,
    /// Topological order of `graph`, resolved once at build time.
    pub(crate) order: Vec<TaskKind>,
    pub(crate) retry: RetryPolicy,
    pub(crate) call_timeout: Duration,
    pub(crate) budget: Duration,
    pub(crate) admission: Arc<Semaphore>,
    pub(crate) cancel: CancellationToken,
}

struct Running {
    accepting: bool,
    sets: JoinSet<()>,
}

pub struct Orchestrator {
    shared: Arc<Shared>,
    running: Mutex<Running>,
}

impl Orchestrator {
    pub(crate) fn new(
        store: Arc<StatusStore>,
        registry: TaskRegistry,
        graph: TaskGraph,
        order: Vec<TaskKind>,
        settings: OrchestratorSettings,
    ) -> Self {
        let shared = Shared {
            store,
            registry,
            graph,
            order,
            retry: settings.retry,
            call_timeout: settings.call_timeout,
            budget: settings.background_budget,
            admission: Arc::new(Semaphore::new(settings.max_in_flight.max(1))),
            cancel: CancellationToken::new(),
        };
        Self {
            shared: Arc::new(shared),
            running: Mutex::new(Running {
                accepting: true,
                sets: JoinSet::new(),
            }),
        }
    }

    pub fn store(&self) -> &Arc<StatusStore> {
        &self.shared.store
    }

    pub fn diagnostics(&self) -> Diagnostics {
        Diagnostics::new(self.shared.store.clone())
    }

    /// Upper bound for a single collaborator call.
    pub fn call_timeout(&self) -> Duration {
        self.shared.call_timeout
    }

    /// Task kinds in the order their futures are spawned.
    pub fn execution_order(&self) -> &[TaskKind] {
        &self.shared.order
    }

    /// Register the task set for `appointment` and start it in the
    /// background. Never waits on any task.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn dispatch(&self, appointment: Arc<Appointment>) -> Result<(), DispatchError> {
        let id = appointment.id;
        let mut running = self.running.lock().unwrap_or_else(PoisonError::into_inner);
        if !running.accepting {
            return Err(DispatchError::ShuttingDown);
        }

        self.shared.store.register(id).map_err(|err| match err {
            StoreError::AlreadyRegistered(id) => DispatchError::AlreadyDispatched(id),
            other => DispatchError::Store(other),
        })?;

        // reap finished supervisors so the set does not grow without bound
        while let Some(joined) = running.sets.try_join_next() {
            if let Err(err) = joined {
                warn!(error = %err, "task set supervisor ended abnormally");
            }
        }
        running
            .sets
            .spawn(run_task_set(self.shared.clone(), appointment));

        info!(appointment_id = %id, in_flight = running.sets.len(), "task set dispatched");
        Ok(())
    }

    /// Supervisors that have not finished yet.
    pub fn in_flight(&self) -> usize {
        let mut running = self.running.lock().unwrap_or_else(PoisonError::into_inner);
        while running.sets.try_join_next().is_some() {}
        running.sets.len()
    }

    /// Stop accepting dispatches and wait up to `grace` for in-flight task
    /// sets. Whatever is still running afterwards is cancelled; its
    /// unfinished tasks end as `Failed(Cancelled)`.
    ///
    /// Returns the number of task sets that had to be cancelled.
    pub async fn shutdown(&self, grace: Duration) -> usize {
        let mut sets = {
            let mut running = self.running.lock().unwrap_or_else(PoisonError::into_inner);
            running.accepting = false;
            std::mem::take(&mut running.sets)
        };
        info!(in_flight = sets.len(), grace_ms = grace.as_millis() as u64, "orchestrator shutting down");

        let drained = tokio::time::timeout(grace, async {
            while sets.join_next().await.is_some() {}
        })
        .await;
        if drained.is_ok() {
            return 0;
        }

        let cancelled = sets.len();
        warn!(cancelled, "grace period elapsed; cancelling remaining task sets");
        self.shared.cancel.cancel();
        while sets.join_next().await.is_some() {}
        cancelled
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::builder::OrchestratorBuilder;
    use crate::app::registry::test_support::Noop;
    use crate::domain::{ErrorKind, TaskOutcome, TaskState};
    use crate::ports::SystemClock;
    use crate::tasks::test_support::appointment;
    use crate::tasks::{BackgroundTask, TaskContext};
    use async_trait::async_trait;
    use std::sync::OnceLock;

    /// Sleeps, then succeeds.
    struct Slow(TaskKind, Duration);

    #[async_trait]
    impl BackgroundTask for Slow {
        fn kind(&self) -> TaskKind {
            self.0
        }

        async fn execute(&self, _ctx: &TaskContext) -> TaskOutcome {
            tokio::time::sleep(self.1).await;
            TaskOutcome::success("late")
        }
    }

    struct Boom(TaskKind);

    #[async_trait]
    impl BackgroundTask for Boom {
        fn kind(&self) -> TaskKind {
            self.0
        }

        async fn execute(&self, _ctx: &TaskContext) -> TaskOutcome {
            panic!("collaborator client bug");
        }
    }

    fn orchestrator(
        replace: Option<Arc<dyn BackgroundTask>>,
        settings: OrchestratorSettings,
    ) -> Orchestrator {
        orchestrator_with(replace.into_iter().collect(), settings)
    }

    /// Registers `tasks` and fills every other kind with a `Noop`.
    fn orchestrator_with(
        tasks: Vec<Arc<dyn BackgroundTask>>,
        settings: OrchestratorSettings,
    ) -> Orchestrator {
        let store = Arc::new(StatusStore::new(
            Duration::from_secs(3600),
            Arc::new(SystemClock),
        ));
        let mut builder = OrchestratorBuilder::new(store).settings(settings);
        let replaced: Vec<TaskKind> = tasks.iter().map(|t| t.kind()).collect();
        for task in tasks {
            builder = builder.register(task).unwrap();
        }
        for kind in TaskKind::ALL {
            if !replaced.contains(&kind) {
                builder = builder.register(Arc::new(Noop(kind))).unwrap();
            }
        }
        builder.build().unwrap()
    }

    /// Records the stored state of its dependencies at the moment it starts.
    struct Observer {
        kind: TaskKind,
        store: OnceLock<Arc<StatusStore>>,
        seen: Mutex<Vec<(TaskKind, Option<TaskState>)>>,
    }

    #[async_trait]
    impl BackgroundTask for Observer {
        fn kind(&self) -> TaskKind {
            self.kind
        }

        async fn execute(&self, ctx: &TaskContext) -> TaskOutcome {
            let set = self.store.get().and_then(|s| s.get(ctx.appointment().id));
            let mut seen = self.seen.lock().unwrap();
            for dep in [TaskKind::SellerCalendar, TaskKind::BuyerCalendar] {
                let state = set.as_ref().and_then(|set| set.get(dep)).map(|r| r.state);
                seen.push((dep, state));
            }
            TaskOutcome::success("observed")
        }
    }

    async fn settle(orchestrator: &Orchestrator) {
        while orchestrator.in_flight() > 0 {
            tokio::time::sleep(Duration::from_millis(1)).await;
        }
    }

    #[tokio::test]
    async fn runs_every_task_to_success() {
        let orchestrator = orchestrator(None, OrchestratorSettings::default());
        let apt = appointment();

        orchestrator.dispatch(apt.clone()).unwrap();
        settle(&orchestrator).await;

        let report = orchestrator.diagnostics().get_task_statuses(apt.id).unwrap();
        assert!(report.finished);
        assert!(!report.degraded);
        assert!(
            report
                .tasks
                .values()
                .all(|t| t.status == TaskState::Succeeded && t.attempts == 1)
        );
    }

    #[tokio::test]
    async fn second_dispatch_is_rejected() {
        let orchestrator = orchestrator(None, OrchestratorSettings::default());
        let apt = appointment();

        orchestrator.dispatch(apt.clone()).unwrap();
        assert_eq!(
            orchestrator.dispatch(apt.clone()),
            Err(DispatchError::AlreadyDispatched(apt.id))
        );
    }

    #[tokio::test(start_paused = true)]
    async fn budget_expiry_fails_unfinished_tasks_as_timeout() {
        let settings = OrchestratorSettings {
            background_budget: Duration::from_secs(5),
            call_timeout: Duration::from_secs(30),
            ..Default::default()
        };
        let orchestrator = orchestrator(
            Some(Arc::new(Slow(TaskKind::BuyerCalendar, Duration::from_secs(20)))),
            settings,
        );
        let apt = appointment();

        orchestrator.dispatch(apt.clone()).unwrap();
        settle(&orchestrator).await;

        let report = orchestrator.diagnostics().get_task_statuses(apt.id).unwrap();
        assert_eq!(report.status_of(TaskKind::SellerCalendar), Some(TaskState::Succeeded));
        for kind in [TaskKind::BuyerCalendar, TaskKind::MeetingLink, TaskKind::Email] {
            assert_eq!(report.tasks[&kind].status, TaskState::Failed);
            assert_eq!(report.tasks[&kind].error_kind, Some(ErrorKind::Timeout));
        }
    }

    #[tokio::test]
    async fn panic_is_contained_and_dependents_still_run() {
        let orchestrator = orchestrator(
            Some(Arc::new(Boom(TaskKind::SellerCalendar))),
            OrchestratorSettings::default(),
        );
        let apt = appointment();

        orchestrator.dispatch(apt.clone()).unwrap();
        settle(&orchestrator).await;

        let report = orchestrator.diagnostics().get_task_statuses(apt.id).unwrap();
        let seller = &report.tasks[&TaskKind::SellerCalendar];
        assert_eq!(seller.status, TaskState::Failed);
        assert_eq!(seller.error_kind, Some(ErrorKind::Panicked));
        assert_eq!(report.status_of(TaskKind::BuyerCalendar), Some(TaskState::Succeeded));
        assert_eq!(report.status_of(TaskKind::MeetingLink), Some(TaskState::Succeeded));
        assert_eq!(report.status_of(TaskKind::Email), Some(TaskState::Succeeded));
    }

    #[tokio::test(start_paused = true)]
    async fn panicked_dependency_is_terminal_before_dependents_start() {
        let observer = Arc::new(Observer {
            kind: TaskKind::MeetingLink,
            store: OnceLock::new(),
            seen: Mutex::new(Vec::new()),
        });
        let orchestrator = orchestrator_with(
            vec![
                Arc::new(Slow(TaskKind::SellerCalendar, Duration::from_millis(50)))
                    as Arc<dyn BackgroundTask>,
                Arc::new(Boom(TaskKind::BuyerCalendar)),
                observer.clone(),
            ],
            OrchestratorSettings::default(),
        );
        let _ = observer.store.set(orchestrator.store().clone());
        let apt = appointment();

        orchestrator.dispatch(apt.clone()).unwrap();
        settle(&orchestrator).await;

        let seen = observer.seen.lock().unwrap().clone();
        assert_eq!(
            seen,
            vec![
                (TaskKind::SellerCalendar, Some(TaskState::Succeeded)),
                (TaskKind::BuyerCalendar, Some(TaskState::Failed)),
            ]
        );
        let report = orchestrator.diagnostics().get_task_statuses(apt.id).unwrap();
        let buyer = &report.tasks[&TaskKind::BuyerCalendar];
        assert_eq!(buyer.error_kind, Some(ErrorKind::Panicked));
        assert!(buyer.detail.as_deref().unwrap().contains("collaborator client bug"));
    }

    #[tokio::test(start_paused = true)]
    async fn shutdown_cancels_after_grace() {
        let orchestrator = orchestrator(
            Some(Arc::new(Slow(TaskKind::Email, Duration::from_secs(30)))),
            OrchestratorSettings {
                call_timeout: Duration::from_secs(60),
                background_budget: Duration::from_secs(120),
                ..Default::default()
            },
        );
        let apt = appointment();
        orchestrator.dispatch(apt.clone()).unwrap();

        let cancelled = orchestrator.shutdown(Duration::from_secs(1)).await;

        assert_eq!(cancelled, 1);
        let report = orchestrator.diagnostics().get_task_statuses(apt.id).unwrap();
        assert_eq!(report.tasks[&TaskKind::Email].error_kind, Some(ErrorKind::Cancelled));
        assert_eq!(report.status_of(TaskKind::MeetingLink), Some(TaskState::Succeeded));
        assert_eq!(
            orchestrator.dispatch(appointment()),
            Err(DispatchError::ShuttingDown)
        );
    }

    #[tokio::test]
    async fn shutdown_waits_for_quick_sets() {
        let orchestrator = orchestrator(None, OrchestratorSettings::default());
        let apt = appointment();
        orchestrator.dispatch(apt.clone()).unwrap();

        assert_eq!(orchestrator.shutdown(Duration::from_secs(5)).await, 0);
        assert!(orchestrator.diagnostics().get_task_statuses(apt.id).unwrap().finished);
    }

    #[tokio::test(start_paused = true)]
    async fn admission_limit_keeps_extra_sets_pending() {
        let orchestrator = orchestrator(
            Some(Arc::new(Slow(TaskKind::SellerCalendar, Duration::from_secs(2)))),
            OrchestratorSettings {
                max_in_flight: 1,
                ..Default::default()
            },
        );
        let first = appointment();
        let second = appointment();
        orchestrator.dispatch(first.clone()).unwrap();
        orchestrator.dispatch(second.clone()).unwrap();

        tokio::time::sleep(Duration::from_secs(1)).await;
        let waiting = orchestrator.diagnostics().get_task_statuses(second.id).unwrap();
        assert!(waiting.tasks.values().all(|t| t.status == TaskState::Pending));

        settle(&orchestrator).await;
        assert!(orchestrator.diagnostics().get_task_statuses(second.id).unwrap().finished);
    }
}
