//! Task state machine.

use serde::{Deserialize, Serialize};

/// Lifecycle of one background task.
///
/// Transitions:
/// - Pending -> Running -> Succeeded | Failed
/// - Pending -> Failed (budget exceeded or shutdown before the task started)
///
/// Each transition happens at most once; terminal states are final.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskState {
    Pending,
    Running,
    Succeeded,
    Failed,
}

impl TaskState {
    pub fn is_terminal(self) -> bool {
        matches!(self, TaskState::Succeeded | TaskState::Failed)
    }

    pub fn can_transition_to(self, next: TaskState) -> bool {
        match (self, next) {
            (TaskState::Pending, TaskState::Running) => true,
            (TaskState::Pending | TaskState::Running, TaskState::Succeeded | TaskState::Failed) => {
                true
            }
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(TaskState::Pending, TaskState::Running, true)]
    #[case(TaskState::Running, TaskState::Succeeded, true)]
    #[case(TaskState::Running, TaskState::Failed, true)]
    #[case(TaskState::Pending, TaskState::Failed, true)]
    #[case(TaskState::Running, TaskState::Running, false)]
    #[case(TaskState::Running, TaskState::Pending, false)]
    #[case(TaskState::Succeeded, TaskState::Failed, false)]
    #[case(TaskState::Failed, TaskState::Succeeded, false)]
    #[case(TaskState::Succeeded, TaskState::Running, false)]
    fn transitions(#[case] from: TaskState, #[case] to: TaskState, #[case] allowed: bool) {
        assert_eq!(from.can_transition_to(to), allowed);
    }

    #[test]
    fn only_success_and_failure_are_terminal() {
        assert!(!TaskState::Pending.is_terminal());
        assert!(!TaskState::Running.is_terminal());
        assert!(TaskState::Succeeded.is_terminal());
        assert!(TaskState::Failed.is_terminal());
    }
}
