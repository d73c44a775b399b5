//! OrchestratorBuilder: wiring plus start-up validation.
//!
//! `build()` fails fast when a task in the dependency graph has no
//! implementation or when the graph cannot be ordered, so a misconfigured
//! process never accepts a booking.

use std::sync::Arc;

use super::dependency::{GraphError, TaskGraph};
use super::orchestrator::{Orchestrator, OrchestratorSettings};
use super::registry::{RegistryError, TaskRegistry};
use super::status_store::StatusStore;
use crate::domain::TaskKind;
use crate::tasks::BackgroundTask;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum BuildError {
    #[error("missing task implementations: {0:?}")]
    MissingTasks(Vec<TaskKind>),

    #[error(transparent)]
    Graph(#[from] GraphError),

    #[error(transparent)]
    Registry(#[from] RegistryError),
}

/// ```ignore
/// let orchestrator = OrchestratorBuilder::new(store)
///     .settings(settings)
///     .register(Arc::new(CalendarTask::seller(calendar.clone())))?
///     .register(Arc::new(CalendarTask::buyer(calendar)))?
///     .register(Arc::new(MeetingLinkTask::new(links, appointments)))?
///     .register(Arc::new(EmailTask::new(composer, mailer)))?
///     .build()?;
/// ```
pub struct OrchestratorBuilder {
    store: Arc<StatusStore>,
    registry: TaskRegistry,
    graph: TaskGraph,
    settings: OrchestratorSettings,
}

impl OrchestratorBuilder {
    pub fn new(store: Arc<StatusStore>) -> Self {
        Self {
            store,
            registry: TaskRegistry::new(),
            graph: TaskGraph::declared(),
            settings: OrchestratorSettings::default(),
        }
    }

    pub fn settings(mut self, settings: OrchestratorSettings) -> Self {
        self.settings = settings;
        self
    }

    /// Replace the declared dependency graph.
    pub fn with_graph(mut self, graph: TaskGraph) -> Self {
        self.graph = graph;
        self
    }

    pub fn register(mut self, task: Arc<dyn BackgroundTask>) -> Result<Self, RegistryError> {
        self.registry.register(task)?;
        Ok(self)
    }

    pub fn build(self) -> Result<Orchestrator, BuildError> {
        let order = self.graph.execution_order()?;

        let missing: Vec<TaskKind> = order
            .iter()
            .copied()
            .filter(|&kind| self.registry.get(kind).is_none())
            .collect();
        if !missing.is_empty() {
            return Err(BuildError::MissingTasks(missing));
        }

        Ok(Orchestrator::new(
            self.store,
            self.registry,
            self.graph,
            order,
            self.settings,
        ))
    }
}
