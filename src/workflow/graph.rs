//! The node/edge content of one workflow version.

use serde::{Deserialize, Serialize};

use crate::{
    Result, TickflowError,
    error::Entity,
    utils,
    workflow::{Step, StepId, Transition, TransitionId, WorkflowId},
};

/// Full node and edge set of a workflow at one point in time.
///
/// Order is preserved: nodes and edges keep the order they were added in,
/// which is also the order the progress tracker reports actions in.
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
pub struct Graph {
    pub nodes: Vec<Step>,
    pub edges: Vec<Transition>,
}

impl Graph {
    pub fn new(
        nodes: Vec<Step>,
        edges: Vec<Transition>,
    ) -> Self {
        Self {
            nodes,
            edges,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty() && self.edges.is_empty()
    }

    pub fn node(
        &self,
        id: &str,
    ) -> Option<&Step> {
        self.nodes.iter().find(|n| n.id == id)
    }

    pub fn edge(
        &self,
        id: &str,
    ) -> Option<&Transition> {
        self.edges.iter().find(|e| e.id == id)
    }

    pub(crate) fn node_mut(
        &mut self,
        id: &str,
    ) -> Result<&mut Step> {
        self.nodes.iter_mut().find(|n| n.id == id).ok_or_else(|| TickflowError::not_found(Entity::Step, id))
    }

    pub(crate) fn edge_mut(
        &mut self,
        id: &str,
    ) -> Result<&mut Transition> {
        self.edges.iter_mut().find(|e| e.id == id).ok_or_else(|| TickflowError::not_found(Entity::Transition, id))
    }

    /// Steps flagged `is_start`.
    pub fn start_steps(&self) -> impl Iterator<Item = &Step> {
        self.nodes.iter().filter(|n| n.is_start)
    }

    /// The single start step, if exactly one exists.
    pub fn start_step(&self) -> Option<&Step> {
        let mut starts = self.start_steps();
        match (starts.next(), starts.next()) {
            (Some(step), None) => Some(step),
            _ => None,
        }
    }

    /// Removes a step and cascades to every transition referencing it.
    /// Returns the removed step and transitions.
    pub(crate) fn remove_node(
        &mut self,
        id: &str,
    ) -> Result<(Step, Vec<Transition>)> {
        let pos = self.nodes.iter().position(|n| n.id == id).ok_or_else(|| TickflowError::not_found(Entity::Step, id))?;
        let step = self.nodes.remove(pos);

        let (removed, kept): (Vec<_>, Vec<_>) = std::mem::take(&mut self.edges).into_iter().partition(|e| e.touches(id));
        self.edges = kept;

        Ok((step, removed))
    }

    pub(crate) fn remove_edge(
        &mut self,
        id: &str,
    ) -> Result<Transition> {
        let pos = self.edges.iter().position(|e| e.id == id).ok_or_else(|| TickflowError::not_found(Entity::Transition, id))?;
        Ok(self.edges.remove(pos))
    }

    /// Forces ownership of every node and edge onto the workflow.
    pub(crate) fn adopt(
        &mut self,
        workflow_id: &str,
    ) {
        self.nodes.iter_mut().for_each(|n| n.workflow_id = workflow_id.to_string());
        self.edges.iter_mut().for_each(|e| e.workflow_id = workflow_id.to_string());
    }

    /// Applies a bulk update: removals first, then node upserts, then edge upserts.
    pub(crate) fn apply_update(
        &mut self,
        workflow_id: &WorkflowId,
        update: GraphUpdate,
    ) -> Result<()> {
        match update.mode {
            UpdateMode::Replace => {
                self.nodes.clear();
                self.edges.clear();
            }
            UpdateMode::Merge => {
                for id in update.remove_edges.iter() {
                    self.remove_edge(id)?;
                }
                for id in update.remove_nodes.iter() {
                    self.remove_node(id)?;
                }
            }
        }

        for mut node in update.nodes {
            if node.id.is_empty() {
                node.id = utils::longid();
            }
            node.workflow_id = workflow_id.clone();
            match self.nodes.iter_mut().find(|n| n.id == node.id) {
                Some(existing) => *existing = node,
                None => self.nodes.push(node),
            }
        }

        for mut edge in update.edges {
            if edge.id.is_empty() {
                edge.id = utils::longid();
            }
            edge.workflow_id = workflow_id.clone();
            match self.edges.iter_mut().find(|e| e.id == edge.id) {
                Some(existing) => *existing = edge,
                None => self.edges.push(edge),
            }
        }

        Ok(())
    }
}

/// How a `GraphUpdate` combines with the current graph.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, Default, PartialEq, Eq, strum::AsRefStr, strum::EnumString)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum UpdateMode {
    /// Upsert the listed nodes/edges and keep everything else.
    #[default]
    Merge,
    /// The listed nodes/edges become the whole graph.
    Replace,
}

/// A full or partial node/edge set committed as one version.
///
/// Nodes and edges with an empty id are created with a fresh id; otherwise an
/// existing item with the same id is replaced.
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
pub struct GraphUpdate {
    #[serde(default)]
    pub mode: UpdateMode,
    #[serde(default)]
    pub nodes: Vec<Step>,
    #[serde(default)]
    pub edges: Vec<Transition>,
    #[serde(default)]
    pub remove_nodes: Vec<StepId>,
    #[serde(default)]
    pub remove_edges: Vec<TransitionId>,
}

impl GraphUpdate {
    pub fn merge() -> Self {
        Self::default()
    }

    pub fn replace(
        nodes: Vec<Step>,
        edges: Vec<Transition>,
    ) -> Self {
        Self {
            mode: UpdateMode::Replace,
            nodes,
            edges,
            ..Default::default()
        }
    }

    pub fn upsert_node(
        mut self,
        node: Step,
    ) -> Self {
        self.nodes.push(node);
        self
    }

    pub fn upsert_edge(
        mut self,
        edge: Transition,
    ) -> Self {
        self.edges.push(edge);
        self
    }

    pub fn remove_node(
        mut self,
        id: impl Into<StepId>,
    ) -> Self {
        self.remove_nodes.push(id.into());
        self
    }

    pub fn remove_edge(
        mut self,
        id: impl Into<TransitionId>,
    ) -> Self {
        self.remove_edges.push(id.into());
        self
    }
}
