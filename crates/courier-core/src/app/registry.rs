//! TaskRegistry: one `BackgroundTask` implementation per `TaskKind`.
//!
//! Built during wiring (mutable), read by the orchestrator afterwards
//! (immutable behind an `Arc`), so lookups take no lock.

use std::collections::HashMap;
use std::sync::Arc;

use crate::domain::TaskKind;
use crate::tasks::BackgroundTask;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RegistryError {
    #[error("a task for '{0}' is already registered")]
    AlreadyRegistered(TaskKind),
}

#[derive(Default)]
pub struct TaskRegistry {
    tasks: HashMap<TaskKind, Arc<dyn BackgroundTask>>,
}

impl TaskRegistry {
    pub fn new() -> Self {
        Self {
            tasks: HashMap::new(),
        }
    }

    pub fn register(&mut self, task: Arc<dyn BackgroundTask>) -> Result<(), RegistryError> {
        let kind = task.kind();
        if self.tasks.contains_key(&kind) {
            return Err(RegistryError::AlreadyRegistered(kind));
        }
        self.tasks.insert(kind, task);
        Ok(())
    }

    pub fn get(&self, kind: TaskKind) -> Option<Arc<dyn BackgroundTask>> {
        self.tasks.get(&kind).cloned()
    }
}


#[cfg(test)]
mod tests {
    use super::test_support::Noop;
    use super::*;

    #[test]
    fn register_and_get() {
        let mut registry = TaskRegistry::new();
        registry.register(Arc::new(Noop(TaskKind::Email))).unwrap();

        assert!(registry.get(TaskKind::Email).is_some());
        assert!(registry.get(TaskKind::MeetingLink).is_none());
    }

    #[test]
    fn double_registration_is_rejected() {
        let mut registry = TaskRegistry::new();
        registry.register(Arc::new(Noop(TaskKind::Email))).unwrap();

        let result = registry.register(Arc::new(Noop(TaskKind::Email)));
        assert_eq!(result, Err(RegistryError::AlreadyRegistered(TaskKind::Email)));
        assert!(registry.get(TaskKind::Email).is_some());
    }
}
