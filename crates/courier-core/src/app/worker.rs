//! Execution of one task set.
//!
//! Flow per appointment:
//! 1. wait for an admission permit (or cancellation)
//! 2. spawn one future per task; each waits on its dependencies' outcome
//!    channels, runs, writes its terminal state, then publishes its outcome
//! 3. supervise the handles against the background budget and cancellation;
//!    anything still unfinished when either fires is aborted and failed
//!
//! Dependents are released only after the upstream terminal write, so the
//! store never shows a downstream task running before its dependencies ended.
//! That includes a panicking task: the panic is caught inside the task future
//! and recorded as `Failed(Panicked)` before the outcome is published. The
//! join-error path in the supervisor is only a backstop.

use std::any::Any;
use std::collections::{BTreeMap, HashMap};
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use futures::FutureExt;

use tokio::sync::watch;
use tokio::task::{JoinError, JoinHandle};
use tokio::time::{Instant, sleep_until};
use tracing::{Instrument, debug, info, info_span, warn};

use super::orchestrator::Shared;
use super::retry::RetryPolicy;
use super::status_store::TaskUpdate;
use crate::domain::{Appointment, AppointmentId, ErrorKind, TaskError, TaskKind, TaskOutcome};
use crate::tasks::{BackgroundTask, TaskContext};

type OutcomeTx = watch::Sender<Option<TaskOutcome>>;
type OutcomeRx = watch::Receiver<Option<TaskOutcome>>;

pub(crate) async fn run_task_set(shared: Arc<Shared>, appointment: Arc<Appointment>) {
    let id = appointment.id;

    let permit = tokio::select! {
        permit = shared.admission.clone().acquire_owned() => permit.ok(),
        _ = shared.cancel.cancelled() => None,
    };
    let Some(_permit) = permit else {
        let err = TaskError::new(ErrorKind::Cancelled, "orchestrator shut down before the task set started");
        let failed = shared.store.fail_unfinished(id, &err);
        warn!(appointment_id = %id, failed = failed.len(), "task set cancelled before admission");
        return;
    };
    let deadline = Instant::now() + shared.budget;

    let mut senders: HashMap<TaskKind, OutcomeTx> = HashMap::new();
    let mut receivers: HashMap<TaskKind, OutcomeRx> = HashMap::new();
    for &kind in &shared.order {
        let (tx, rx) = watch::channel(None);
        senders.insert(kind, tx);
        receivers.insert(kind, rx);
    }

    let mut handles: Vec<(TaskKind, JoinHandle<()>)> = Vec::with_capacity(shared.order.len());
    for &kind in &shared.order {
        let (Some(task), Some(done)) = (shared.registry.get(kind), senders.remove(&kind)) else {
            continue;
        };
        let upstream: Vec<(TaskKind, OutcomeRx)> = shared
            .graph
            .dependencies_of(kind)
            .into_iter()
            .filter_map(|dep| receivers.get(&dep).map(|rx| (dep, rx.clone())))
            .collect();

        let span = info_span!("task", appointment_id = %id, task = %kind);
        let fut = run_one(shared.clone(), task, appointment.clone(), upstream, done);
        handles.push((kind, tokio::spawn(fut.instrument(span))));
    }
    drop(receivers);

    let mut interrupted: Option<TaskError> = None;
    let mut pending = handles.into_iter();
    for (kind, mut handle) in pending.by_ref() {
        tokio::select! {
            joined = &mut handle => {
                if let Err(err) = joined {
                    record_join_error(&shared, id, kind, err);
                }
                continue;
            }
            _ = sleep_until(deadline) => {
                interrupted = Some(TaskError::timeout(format!(
                    "background budget of {}ms exceeded",
                    shared.budget.as_millis()
                )));
            }
            _ = shared.cancel.cancelled() => {
                interrupted = Some(TaskError::new(
                    ErrorKind::Cancelled,
                    "orchestrator shut down before the task finished",
                ));
            }
        }
        handle.abort();
        let _ = handle.await;
        break;
    }

    if let Some(err) = interrupted {
        for (_, handle) in pending {
            handle.abort();
            // wait so no late write races the sweep below
            let _ = handle.await;
        }
        let failed = shared.store.fail_unfinished(id, &err);
        warn!(appointment_id = %id, error_kind = %err.kind, ?failed, "task set interrupted");
        return;
    }

    let degraded = shared.store.get(id).is_some_and(|set| set.is_degraded());
    info!(appointment_id = %id, degraded, "task set finished");
}

fn record_join_error(shared: &Shared, id: AppointmentId, kind: TaskKind, err: JoinError) {
    if !err.is_panic() {
        return;
    }
    warn!(appointment_id = %id, task = %kind, "task panicked");
    let outcome = TaskOutcome::failure(TaskError::new(
        ErrorKind::Panicked,
        format!("{kind} panicked while running"),
    ));
    if let Err(err) = shared
        .store
        .update(id, kind, TaskUpdate::Finished { outcome, attempts: 1 })
    {
        warn!(appointment_id = %id, task = %kind, error = %err, "could not record panic");
    }
}

async fn run_one(
    shared: Arc<Shared>,
    task: Arc<dyn BackgroundTask>,
    appointment: Arc<Appointment>,
    upstream: Vec<(TaskKind, OutcomeRx)>,
    done: OutcomeTx,
) {
    let id = appointment.id;
    let kind = task.kind();

    let mut resolved = BTreeMap::new();
    for (dep, mut rx) in upstream {
        let seen = rx
            .wait_for(Option::is_some)
            .await
            .ok()
            .and_then(|v| (*v).clone());
        // a closed channel with no value means the upstream task never finished normally
        let outcome = seen.unwrap_or_else(|| {
            TaskOutcome::failure(TaskError::new(
                ErrorKind::Panicked,
                format!("{dep} stopped without an outcome"),
            ))
        });
        resolved.insert(dep, outcome);
    }

    if let Err(err) = shared.store.update(id, kind, TaskUpdate::Running) {
        warn!(error = %err, "could not mark task running");
    }

    let ctx = TaskContext::new(appointment, resolved, shared.call_timeout);
    let run = AssertUnwindSafe(execute_with_retry(task.as_ref(), &ctx, &shared.retry));
    let (outcome, attempts) = match run.catch_unwind().await {
        Ok(done) => done,
        Err(payload) => {
            let reason = panic_message(payload.as_ref());
            let err = TaskError::new(ErrorKind::Panicked, format!("{kind} panicked: {reason}"));
            (TaskOutcome::failure(err), 1)
        }
    };

    match outcome.error() {
        None => debug!(attempts, detail = ?outcome.detail(), "task succeeded"),
        Some(err) => warn!(attempts, error_kind = %err.kind, error = %err.message, "task failed"),
    }

    let update = TaskUpdate::Finished {
        outcome: outcome.clone(),
        attempts,
    };
    if let Err(err) = shared.store.update(id, kind, update) {
        warn!(error = %err, "terminal write rejected");
    }
    done.send_replace(Some(outcome));
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    if let Some(msg) = payload.downcast_ref::<&'static str>() {
        msg
    } else if let Some(msg) = payload.downcast_ref::<String>() {
        msg
    } else {
        "unknown panic payload"
    }
}

/// Run a task until it succeeds, fails with a non-retryable kind, or runs
/// out of attempts. Returns the last outcome and the number of executions.
pub(crate) async fn execute_with_retry(
    task: &dyn BackgroundTask,
    ctx: &TaskContext,
    policy: &RetryPolicy,
) -> (TaskOutcome, u32) {
    let mut attempts = 0;
    loop {
        attempts += 1;
        let outcome = task.execute(ctx).await;
        match outcome.error_kind() {
            Some(kind) if policy.should_retry(attempts, kind) => {
                let delay = policy.next_delay(attempts);
                debug!(attempts, error_kind = %kind, delay_ms = delay.as_millis() as u64, "retrying task");
                tokio::time::sleep(delay).await;
            }
            _ => return (outcome, attempts),
        }
    }
}
