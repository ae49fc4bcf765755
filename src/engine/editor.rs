use crate::{
    Result, TickflowError,
    error::Entity,
    history::SnapshotMeta,
    utils,
    workflow::{Graph, GraphUpdate, NewStep, NewTransition, Step, StepPatch, Transition, TransitionPatch, VersionId, WorkflowId},
};

use super::Engine;

/// A structural edit session on one workflow.
///
/// An editor remembers the version it was opened at. Each commit must be
/// based on that version and advances it on success, so two editors opened on
/// the same version cannot both commit: the second gets a `Conflict` and has
/// to reopen.
pub struct Editor<'a> {
    engine: &'a Engine,
    workflow_id: WorkflowId,
    base: VersionId,
    actor: Option<String>,
}

impl<'a> Editor<'a> {
    pub(crate) fn new(
        engine: &'a Engine,
        workflow_id: WorkflowId,
        base: VersionId,
    ) -> Self {
        Self {
            engine,
            workflow_id,
            base,
            actor: None,
        }
    }

    /// Records `actor` on every version this editor commits.
    pub fn with_actor(
        mut self,
        actor: impl Into<String>,
    ) -> Self {
        self.actor = Some(actor.into());
        self
    }

    pub fn workflow_id(&self) -> &str {
        &self.workflow_id
    }

    /// The version the next commit is checked against.
    pub fn base(&self) -> VersionId {
        self.base
    }

    fn commit<T>(
        &mut self,
        operation: &str,
        mutate: impl FnOnce(&mut Graph) -> Result<T>,
    ) -> Result<(VersionId, T)> {
        let meta = SnapshotMeta::new(operation).actor(self.actor.clone());
        self.commit_with(meta, mutate)
    }

    fn commit_with<T>(
        &mut self,
        meta: SnapshotMeta,
        mutate: impl FnOnce(&mut Graph) -> Result<T>,
    ) -> Result<(VersionId, T)> {
        let (version, out) = self.engine.commit(&self.workflow_id, self.base, meta, mutate)?;
        self.base = version;
        Ok((version, out))
    }

    pub fn create_step(
        &mut self,
        new: NewStep,
    ) -> Result<Step> {
        let wid = self.workflow_id.clone();
        let (_, step) = self.commit("create_step", |graph| {
            let step = new.into_step(utils::longid(), wid);
            graph.nodes.push(step.clone());
            Ok(step)
        })?;
        Ok(step)
    }

    pub fn update_step(
        &mut self,
        step_id: &str,
        patch: StepPatch,
    ) -> Result<Step> {
        let (_, step) = self.commit("update_step", |graph| {
            let step = graph.node_mut(step_id)?;
            patch.apply(step);
            Ok(step.clone())
        })?;
        Ok(step)
    }

    /// Deletes a step and returns the transitions removed with it.
    ///
    /// When the step is the start step, `replacement_start` must name the step
    /// that becomes the start in the same commit. It is ignored otherwise.
    pub fn delete_step(
        &mut self,
        step_id: &str,
        replacement_start: Option<&str>,
    ) -> Result<Vec<Transition>> {
        let (_, removed) = self.commit("delete_step", |graph| {
            let step = graph.node(step_id).ok_or_else(|| TickflowError::not_found(Entity::Step, step_id))?;
            if step.is_start {
                let replacement = match replacement_start {
                    Some(id) if id != step_id => id,
                    Some(_) => return Err(TickflowError::Conflict(format!("step {step_id} cannot replace itself as start step"))),
                    None => return Err(TickflowError::Conflict(format!("step {step_id} is the start step, name a replacement before deleting it"))),
                };
                graph.node_mut(replacement)?.is_start = true;
            }
            let (_, removed) = graph.remove_node(step_id)?;
            Ok(removed)
        })?;
        Ok(removed)
    }

    pub fn create_transition(
        &mut self,
        new: NewTransition,
    ) -> Result<Transition> {
        let wid = self.workflow_id.clone();
        let (_, transition) = self.commit("create_transition", |graph| {
            let transition = new.into_transition(utils::longid(), wid);
            graph.edges.push(transition.clone());
            Ok(transition)
        })?;
        Ok(transition)
    }

    pub fn update_transition(
        &mut self,
        transition_id: &str,
        patch: TransitionPatch,
    ) -> Result<Transition> {
        let (_, transition) = self.commit("update_transition", |graph| {
            let transition = graph.edge_mut(transition_id)?;
            patch.apply(transition);
            Ok(transition.clone())
        })?;
        Ok(transition)
    }

    pub fn delete_transition(
        &mut self,
        transition_id: &str,
    ) -> Result<Transition> {
        let (_, transition) = self.commit("delete_transition", |graph| graph.remove_edge(transition_id))?;
        Ok(transition)
    }

    /// Commits a bulk update as one version.
    pub fn apply(
        &mut self,
        update: GraphUpdate,
    ) -> Result<VersionId> {
        self.apply_as(update, "apply_graph")
    }

    pub(crate) fn apply_as(
        &mut self,
        update: GraphUpdate,
        operation: &str,
    ) -> Result<VersionId> {
        let wid = self.workflow_id.clone();
        let (version, _) = self.commit(operation, |graph| graph.apply_update(&wid, update))?;
        Ok(version)
    }

    /// Commits the content of `version` as a new version. The old content is
    /// validated against the current roles first.
    pub fn rollback(
        &mut self,
        version: VersionId,
    ) -> Result<VersionId> {
        self.engine.slot(&self.workflow_id)?;
        let target = self.engine.history.get_version(&self.workflow_id, version)?;
        let meta = SnapshotMeta::new("rollback").actor(self.actor.clone()).rolled_back_from(version);
        let (committed, _) = self.commit_with(meta, |graph| {
            *graph = target;
            Ok(())
        })?;
        Ok(committed)
    }
}
