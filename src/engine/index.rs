use std::{
    collections::HashMap,
    sync::{Mutex, MutexGuard, PoisonError, RwLock},
};

use crate::{
    validator::{Issue, Rule},
    workflow::{Graph, StepId, TransitionId, WorkflowId},
};

/// Owner lookup for step and transition ids. Ids are unique across all
/// workflows, so a bare id is enough to find the workflow to edit.
#[derive(Debug, Default)]
pub(crate) struct IdIndex {
    steps: RwLock<HashMap<StepId, WorkflowId>>,
    transitions: RwLock<HashMap<TransitionId, WorkflowId>>,
    claims: Mutex<()>,
}

impl IdIndex {
    pub fn step_owner(
        &self,
        id: &str,
    ) -> Option<WorkflowId> {
        self.steps.read().unwrap_or_else(PoisonError::into_inner).get(id).cloned()
    }

    pub fn transition_owner(
        &self,
        id: &str,
    ) -> Option<WorkflowId> {
        self.transitions.read().unwrap_or_else(PoisonError::into_inner).get(id).cloned()
    }

    /// Serializes id claims across workflows. A commit holds the guard from
    /// its [`foreign_ids`](Self::foreign_ids) check until its [`sync`](Self::sync).
    pub fn claim(&self) -> MutexGuard<'_, ()> {
        self.claims.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Ids in `graph` already owned by a different workflow.
    pub fn foreign_ids(
        &self,
        wid: &str,
        graph: &Graph,
    ) -> Vec<Issue> {
        let steps = self.steps.read().unwrap_or_else(PoisonError::into_inner);
        let transitions = self.transitions.read().unwrap_or_else(PoisonError::into_inner);

        let nodes = graph.nodes.iter().filter_map(|n| {
            steps.get(&n.id).filter(|owner| owner.as_str() != wid).map(|owner| {
                Issue::new(Rule::DuplicateId, format!("step id {} belongs to workflow {owner}", n.id)).with_field("id").with_subject(&n.id)
            })
        });
        let edges = graph.edges.iter().filter_map(|e| {
            transitions.get(&e.id).filter(|owner| owner.as_str() != wid).map(|owner| {
                Issue::new(Rule::DuplicateId, format!("transition id {} belongs to workflow {owner}", e.id)).with_field("id").with_subject(&e.id)
            })
        });
        nodes.chain(edges).collect()
    }

    /// Moves the workflow's entries from `old` to `new`.
    pub fn sync(
        &self,
        wid: &str,
        old: &Graph,
        new: &Graph,
    ) {
        let mut steps = self.steps.write().unwrap_or_else(PoisonError::into_inner);
        for n in old.nodes.iter() {
            steps.remove(&n.id);
        }
        for n in new.nodes.iter() {
            steps.insert(n.id.clone(), wid.to_string());
        }
        drop(steps);

        let mut transitions = self.transitions.write().unwrap_or_else(PoisonError::into_inner);
        for e in old.edges.iter() {
            transitions.remove(&e.id);
        }
        for e in new.edges.iter() {
            transitions.insert(e.id.clone(), wid.to_string());
        }
    }

    pub fn purge(
        &self,
        wid: &str,
    ) {
        self.steps.write().unwrap_or_else(PoisonError::into_inner).retain(|_, owner| owner != wid);
        self.transitions.write().unwrap_or_else(PoisonError::into_inner).retain(|_, owner| owner != wid);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::workflow::{NewStep, NewTransition};

    fn graph(
        wid: &str,
        step: &str,
        edge: &str,
    ) -> Graph {
        let s = NewStep::new("A", "Agent").start().into_step(step.into(), wid.into());
        let e = NewTransition::new("Go").from(step).into_transition(edge.into(), wid.into());
        Graph::new(vec![s], vec![e])
    }

    #[test]
    fn test_sync_and_lookup() {
        let index = IdIndex::default();
        let g1 = graph("w1", "a", "ax");
        index.sync("w1", &Graph::default(), &g1);
        assert_eq!(index.step_owner("a").as_deref(), Some("w1"));
        assert_eq!(index.transition_owner("ax").as_deref(), Some("w1"));

        let g2 = graph("w1", "b", "bx");
        index.sync("w1", &g1, &g2);
        assert_eq!(index.step_owner("a"), None);
        assert_eq!(index.step_owner("b").as_deref(), Some("w1"));
    }

    #[test]
    fn test_foreign_ids() {
        let index = IdIndex::default();
        index.sync("w1", &Graph::default(), &graph("w1", "a", "ax"));

        assert!(index.foreign_ids("w1", &graph("w1", "a", "ax")).is_empty());
        let issues = index.foreign_ids("w2", &graph("w2", "a", "ay"));
        assert_eq!(issues.len(), 1);
        assert_eq!(issues[0].rule, Rule::DuplicateId);
        assert_eq!(issues[0].subject.as_deref(), Some("a"));
    }

    #[test]
    fn test_purge() {
        let index = IdIndex::default();
        index.sync("w1", &Graph::default(), &graph("w1", "a", "ax"));
        index.sync("w2", &Graph::default(), &graph("w2", "b", "bx"));
        index.purge("w1");
        assert_eq!(index.step_owner("a"), None);
        assert_eq!(index.step_owner("b").as_deref(), Some("w2"));
    }
}
