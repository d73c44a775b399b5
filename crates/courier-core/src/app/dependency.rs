//! Static dependency graph over task kinds.
//!
//! - Forward edges: task -> tasks it waits for
//! - Reverse edges: task -> tasks waiting for it
//! - Invariant: edges and reverse_edges are kept in sync
//!
//! The orchestrator resolves the graph once at construction, so ordering is
//! a data structure rather than a property of how futures happen to be chained.

use std::collections::{BTreeSet, HashMap, VecDeque};

use crate::domain::TaskKind;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum GraphError {
    #[error("dependency cycle among tasks: {0:?}")]
    Cycle(Vec<TaskKind>),

    #[error("{task} depends on {missing}, which is not part of the graph")]
    UnknownDependency { task: TaskKind, missing: TaskKind },
}

#[derive(Debug, Clone, Default)]
pub struct TaskGraph {
    nodes: BTreeSet<TaskKind>,
    edges: HashMap<TaskKind, BTreeSet<TaskKind>>,
    reverse_edges: HashMap<TaskKind, BTreeSet<TaskKind>>,
}

impl TaskGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// The graph declared by `TaskKind::dependencies`.
    pub fn declared() -> Self {
        let mut graph = Self::new();
        for kind in TaskKind::ALL {
            graph.add_task(kind);
            for &dep in kind.dependencies() {
                graph.add_dependency(kind, dep);
            }
        }
        graph
    }

    pub fn add_task(&mut self, task: TaskKind) {
        self.nodes.insert(task);
    }

    /// `task` waits for `depends_on`.
    pub fn add_dependency(&mut self, task: TaskKind, depends_on: TaskKind) {
        self.edges.entry(task).or_default().insert(depends_on);
        self.reverse_edges
            .entry(depends_on)
            .or_default()
            .insert(task);
    }

    pub fn dependencies_of(&self, task: TaskKind) -> Vec<TaskKind> {
        self.edges
            .get(&task)
            .map(|deps| deps.iter().copied().collect())
            .unwrap_or_default()
    }

    pub fn dependents_of(&self, task: TaskKind) -> Vec<TaskKind> {
        self.reverse_edges
            .get(&task)
            .map(|waiting| waiting.iter().copied().collect())
            .unwrap_or_default()
    }

    /// Topological order (Kahn). Ties resolve in `TaskKind` order so the
    /// result is deterministic.
    pub fn execution_order(&self) -> Result<Vec<TaskKind>, GraphError> {
        for (&task, deps) in &self.edges {
            if let Some(&missing) = deps.iter().find(|d| !self.nodes.contains(d)) {
                return Err(GraphError::UnknownDependency { task, missing });
            }
        }

        let mut in_degree: HashMap<TaskKind, usize> = self
            .nodes
            .iter()
            .map(|&n| (n, self.edges.get(&n).map_or(0, BTreeSet::len)))
            .collect();

        let mut ready: VecDeque<TaskKind> = self
            .nodes
            .iter()
            .copied()
            .filter(|n| in_degree[n] == 0)
            .collect();

        let mut order = Vec::with_capacity(self.nodes.len());
        while let Some(task) = ready.pop_front() {
            order.push(task);
            for waiting in self.dependents_of(task) {
                if let Some(d) = in_degree.get_mut(&waiting) {
                    *d -= 1;
                    if *d == 0 {
                        ready.push_back(waiting);
                    }
                }
            }
        }

        if order.len() < self.nodes.len() {
            let stuck = self
                .nodes
                .iter()
                .copied()
                .filter(|n| !order.contains(n))
                .collect();
            return Err(GraphError::Cycle(stuck));
        }
        Ok(order)
    }
}
