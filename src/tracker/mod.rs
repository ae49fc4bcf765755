//! Progress tracking over a committed workflow graph.
//!
//! The tracker wraps one graph version in a petgraph `DiGraph` with two
//! sentinel nodes: the implicit start (source of `from_step = None`
//! transitions) and the implicit end (target of `to_step = None`). Steps are
//! states, transitions are labelled edges. Cycles are allowed; the tracker only
//! answers what a ticket can do from where it stands.
//!
//! All queries are pure: the tracker reads a [`TicketInstance`] and returns
//! computed transitions for the caller to apply.

mod instance;

use std::{
    collections::{HashMap, HashSet},
    sync::Arc,
};

use petgraph::{
    Direction,
    graph::{DiGraph, NodeIndex},
    visit::Bfs,
};
use serde::{Deserialize, Serialize};

use crate::{
    Result, TickflowError,
    error::Entity,
    validator::{Issue, Rule},
    workflow::{Action, Graph, Step, StepId, Transition, TransitionId},
};

pub use instance::{TicketInstance, Visit};

#[derive(Debug, Clone, PartialEq, Eq)]
enum Slot {
    Start,
    Step(StepId),
    End,
}

/// An action a ticket can take from its current step.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct ValidAction {
    pub transition_id: TransitionId,
    pub action: Action,
    /// Target step, `None` when the transition completes the workflow.
    pub to_step: Option<StepId>,
    /// Taking this action closes the workflow.
    pub completes_workflow: bool,
    /// The target step is flagged `is_end`.
    pub reaches_end_step: bool,
}

/// Where taking a transition leads.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "snake_case", tag = "kind", content = "step_id")]
pub enum Next {
    Step(StepId),
    Completed,
}

/// Whether a ticket has acted on a step, only arrived at it, or never been there.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, strum::AsRefStr)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum StepActivity {
    Acted,
    Visited,
    Unvisited,
}

/// A ticket's position in the graph.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct Progress {
    pub current: StepId,
    /// The current step is an end step or has nowhere to go.
    pub terminal: bool,
    pub valid_actions: Vec<ValidAction>,
}

pub struct Tracker {
    graph: Arc<Graph>,
    dag: DiGraph<Slot, TransitionId>,
    index: HashMap<StepId, NodeIndex>,
    end: NodeIndex,
}

impl Tracker {
    pub fn new(graph: Arc<Graph>) -> Self {
        let mut dag = DiGraph::new();
        let start = dag.add_node(Slot::Start);
        let end = dag.add_node(Slot::End);

        let mut index = HashMap::new();
        for step in graph.nodes.iter() {
            let idx = dag.add_node(Slot::Step(step.id.clone()));
            index.insert(step.id.clone(), idx);
        }

        for edge in graph.edges.iter() {
            let from = match &edge.from_step {
                Some(id) => index.get(id).copied(),
                None => Some(start),
            };
            let to = match &edge.to_step {
                Some(id) => index.get(id).copied(),
                None => Some(end),
            };
            // committed graphs never dangle; skip rather than guess
            if let (Some(from), Some(to)) = (from, to) {
                dag.add_edge(from, to, edge.id.clone());
            }
        }

        Self {
            graph,
            dag,
            index,
            end,
        }
    }

    pub fn graph(&self) -> &Graph {
        &self.graph
    }

    fn step_index(
        &self,
        step_id: &str,
    ) -> Result<NodeIndex> {
        self.index.get(step_id).copied().ok_or_else(|| TickflowError::not_found(Entity::Step, step_id))
    }

    fn to_action(
        &self,
        edge: &Transition,
    ) -> ValidAction {
        let reaches_end_step = edge.to_step.as_deref().and_then(|id| self.graph.node(id)).is_some_and(|s| s.is_end);
        ValidAction {
            transition_id: edge.id.clone(),
            action: edge.action.clone(),
            to_step: edge.to_step.clone(),
            completes_workflow: edge.completes_workflow(),
            reaches_end_step,
        }
    }

    /// The step new tickets begin at.
    pub fn entry_step(&self) -> Option<&Step> {
        self.graph.start_step()
    }

    /// Transitions leaving the implicit start sentinel.
    pub fn entry_actions(&self) -> Vec<ValidAction> {
        self.graph.edges.iter().filter(|e| e.from_step.is_none()).map(|e| self.to_action(e)).collect()
    }

    /// Outgoing actions of a step, in the order the transitions were defined.
    pub fn valid_actions(
        &self,
        step_id: &str,
    ) -> Result<Vec<ValidAction>> {
        self.step_index(step_id)?;
        Ok(self.graph.edges.iter().filter(|e| e.from_step.as_deref() == Some(step_id)).map(|e| self.to_action(e)).collect())
    }

    /// A step is terminal when flagged `is_end` or when nothing leaves it.
    pub fn is_terminal(
        &self,
        step_id: &str,
    ) -> Result<bool> {
        let idx = self.step_index(step_id)?;
        let is_end = self.graph.node(step_id).is_some_and(|s| s.is_end);
        Ok(is_end || self.dag.neighbors_directed(idx, Direction::Outgoing).next().is_none())
    }

    /// Resolves where taking `transition_id` from `step_id` leads.
    pub fn follow(
        &self,
        step_id: &str,
        transition_id: &str,
    ) -> Result<Next> {
        self.step_index(step_id)?;
        let edge = self.graph.edge(transition_id).ok_or_else(|| TickflowError::not_found(Entity::Transition, transition_id))?;
        if edge.from_step.as_deref() != Some(step_id) {
            return Err(TickflowError::invalid(
                Issue::new(Rule::DanglingEdge, format!("transition {transition_id} does not leave step {step_id}")).with_field("from_step").with_subject(transition_id),
            ));
        }
        Ok(match &edge.to_step {
            Some(to) => Next::Step(to.clone()),
            None => Next::Completed,
        })
    }

    /// Steps reachable from `step_id` along one or more transitions, in node
    /// order. The step itself is included only when a cycle leads back to it.
    pub fn reachable_from(
        &self,
        step_id: &str,
    ) -> Result<Vec<StepId>> {
        let origin = self.step_index(step_id)?;
        let seen = self.reach(origin);
        let cyclic = self.dag.neighbors_directed(origin, Direction::Incoming).any(|p| seen.contains(&p));

        Ok(self
            .graph
            .nodes
            .iter()
            .filter(|s| {
                let idx = self.index[&s.id];
                if idx == origin { cyclic } else { seen.contains(&idx) }
            })
            .map(|s| s.id.clone())
            .collect())
    }

    /// Whether a ticket at `step_id` can still close the workflow, either via
    /// an end transition or by reaching an end step.
    pub fn can_complete(
        &self,
        step_id: &str,
    ) -> Result<bool> {
        let origin = self.step_index(step_id)?;
        let seen = self.reach(origin);
        Ok(seen.contains(&self.end)
            || self.graph.nodes.iter().any(|s| s.is_end && seen.contains(&self.index[&s.id])))
    }

    fn reach(
        &self,
        origin: NodeIndex,
    ) -> HashSet<NodeIndex> {
        let mut seen = HashSet::new();
        let mut bfs = Bfs::new(&self.dag, origin);
        while let Some(idx) = bfs.next(&self.dag) {
            seen.insert(idx);
        }
        seen
    }

    /// Acted/visited status of a single step for a ticket.
    pub fn is_acted(
        &self,
        instance: &TicketInstance,
        step_id: &str,
    ) -> bool {
        instance.visit_history.iter().any(|v| v.step_id == step_id && v.transition_id.is_some())
    }

    /// Acted/visited/unvisited status for every step, in node order.
    pub fn step_activity(
        &self,
        instance: &TicketInstance,
    ) -> Vec<(StepId, StepActivity)> {
        let mut visited = HashSet::new();
        let mut acted = HashSet::new();
        for visit in instance.visit_history.iter() {
            visited.insert(visit.step_id.as_str());
            if visit.transition_id.is_some() {
                acted.insert(visit.step_id.as_str());
            }
        }

        self.graph
            .nodes
            .iter()
            .map(|s| {
                let activity = if acted.contains(s.id.as_str()) {
                    StepActivity::Acted
                } else if visited.contains(s.id.as_str()) || s.id == instance.current_step_id {
                    StepActivity::Visited
                } else {
                    StepActivity::Unvisited
                };
                (s.id.clone(), activity)
            })
            .collect()
    }

    /// Current position of a ticket: its step, whether it is terminal, and what it can do next.
    pub fn progress(
        &self,
        instance: &TicketInstance,
    ) -> Result<Progress> {
        let current = instance.current_step_id.clone();
        Ok(Progress {
            terminal: self.is_terminal(&current)?,
            valid_actions: self.valid_actions(&current)?,
            current,
        })
    }
}
