//! The workflow graph engine - the main entry point for Tickflow.
//!
//! The engine owns the graph store, runs the validator before every commit,
//! records each committed graph in the version history and builds progress
//! trackers over committed versions.
//!
//! Each workflow has a single writer. A structural edit is one critical
//! section: compare the caller's base version, apply to a copy, validate the
//! whole graph, write the snapshot, swap the head. Readers clone the `Arc` of
//! the committed head and never observe a partial commit.

mod editor;
mod head;
mod index;

use std::{
    collections::HashMap,
    sync::{Arc, PoisonError, RwLock},
};

use chrono::{DateTime, Utc};
use tokio::sync::broadcast;
use tracing::{debug, trace, warn};

use crate::{
    Config, GraphModel, Result, ShareLock, StoreType, TickflowError,
    common::BroadcastQueue,
    error::Entity,
    events::FlowEvent,
    history::{History, SnapshotMeta, VersionSummary},
    roles::{RoleRegistry, RoleSet, StaticRoleRegistry},
    store::{DbCollection, DbStore, MemStore, Store, data, query::Query},
    tracker::{Progress, TicketInstance, Tracker, ValidAction},
    utils,
    validator::{self, Issue, Limits, Rule, ValidationReport},
    workflow::{
        Graph, GraphUpdate, MAX_SLA_DAYS, NewStep, NewTransition, NewWorkflow, SlaPolicy, Step, StepPatch, Transition, TransitionPatch, VersionId, Workflow,
        WorkflowFilter, WorkflowId, WorkflowPatch, WorkflowStatus,
    },
};

pub use editor::Editor;
pub use head::GraphView;
use head::{Head, Slot};
use index::IdIndex;

/// The workflow graph engine.
///
/// # Example
///
/// ```rust,ignore
/// let engine = EngineBuilder::new().role_registry(registry).build()?;
///
/// let workflow = engine.create_workflow(NewWorkflow::new("IT request"))?;
/// let mut editor = engine.edit(&workflow.id)?;
/// let intake = editor.create_step(NewStep::new("Intake", "agent").start())?;
/// let approve = editor.create_step(NewStep::new("Approve", "approver").end())?;
/// editor.create_transition(NewTransition::new("Approve").from(&intake.id).to(&approve.id))?;
///
/// let actions = engine.valid_actions(&workflow.id, &intake.id)?;
/// ```
pub struct Engine {
    store: Arc<Store>,
    workflows: Arc<dyn DbCollection<Item = data::Workflow>>,
    history: History,
    registry: Arc<dyn RoleRegistry>,
    limits: Limits,
    slots: ShareLock<HashMap<WorkflowId, Arc<Slot>>>,
    index: IdIndex,
    events: Arc<BroadcastQueue<FlowEvent>>,
}

impl Engine {
    /// Creates an engine with a fresh store built from `config`.
    pub fn new_with_config(config: Config) -> Result<Self> {
        Self::new(&config, Arc::new(StaticRoleRegistry::default()), None)
    }

    /// Creates an engine. When `store` is given it must already be
    /// initialised; workflow heads are then loaded lazily from its history.
    pub(crate) fn new(
        config: &Config,
        registry: Arc<dyn RoleRegistry>,
        store: Option<Arc<Store>>,
    ) -> Result<Self> {
        let shared = store.is_some();
        let store = match store {
            Some(store) => store,
            None => {
                let store = Store::new();
                let db: Box<dyn DbStore> = match config.store.store_type {
                    StoreType::Mem => Box::new(MemStore::new()),
                };
                db.init(&store);
                Arc::new(store)
            }
        };

        let workflows = store.workflows()?;
        let history = History::new(store.versions()?);

        let engine = Self {
            store,
            workflows,
            history,
            registry,
            limits: Limits::from(&config.validation),
            slots: Arc::new(RwLock::new(HashMap::new())),
            index: IdIndex::default(),
            events: BroadcastQueue::new(config.store.event_capacity),
        };

        if shared {
            // load every known head so step and transition ids resolve
            for workflow in engine.workflows.query(&Query::new())? {
                engine.slot(&workflow.id)?;
            }
        }
        Ok(engine)
    }

    /// The store backing this engine. Another engine built over the same
    /// store sees the same workflows and history.
    pub fn store(&self) -> Arc<Store> {
        self.store.clone()
    }

    /// Subscribes to change events. Only events sent after this call are received.
    pub fn subscribe(&self) -> broadcast::Receiver<FlowEvent> {
        self.events.subscribe()
    }

    /// Drops any cached role list so the next validation sees fresh roles.
    pub fn refresh_roles(&self) {
        self.registry.refresh();
    }

    fn emit(
        &self,
        event: FlowEvent,
    ) {
        self.events.send(event);
    }

    // ---- workflows ----

    pub fn create_workflow(
        &self,
        new: NewWorkflow,
    ) -> Result<Workflow> {
        trace!("engine::create_workflow({})", new.name);
        self.check_metadata(&new.name, new.description.as_deref(), &new.sla)?;

        let now = utils::time::from_millis(utils::time::time_millis());
        let workflow = Workflow {
            id: utils::longid(),
            name: new.name,
            description: new.description,
            status: WorkflowStatus::Draft,
            category: new.category,
            sub_category: new.sub_category,
            sla: new.sla,
            created_at: now,
            updated_at: now,
        };
        if !self.workflows.create(&data::Workflow::from(&workflow))? {
            return Err(TickflowError::Conflict(format!("workflow {} already exists", workflow.id)));
        }

        let mut slots = self.slots.write().unwrap_or_else(PoisonError::into_inner);
        slots.insert(workflow.id.clone(), Arc::new(Slot::new(Head::default())));
        drop(slots);

        self.emit(FlowEvent::WorkflowCreated {
            workflow_id: workflow.id.clone(),
        });
        Ok(workflow)
    }

    pub fn get_workflow(
        &self,
        wid: &str,
    ) -> Result<Workflow> {
        let data = self.workflows.find(wid)?.ok_or_else(|| TickflowError::not_found(Entity::Workflow, wid))?;
        Workflow::try_from(data)
    }

    /// Workflows matching `filter`, oldest first.
    pub fn list_workflows(
        &self,
        filter: &WorkflowFilter,
    ) -> Result<Vec<Workflow>> {
        let mut query = Query::new();
        if let Some(status) = filter.status {
            query = query.eq("status", status.as_ref());
        }
        if let Some(category) = &filter.category {
            query = query.eq("category", category.as_str());
        }
        let rows = self.workflows.query(&query.order("create_time", false).order("id", false))?;
        rows.into_iter().map(Workflow::try_from).collect()
    }

    /// Updates workflow metadata. A workflow can only be activated once it
    /// has a committed graph.
    pub fn update_workflow(
        &self,
        wid: &str,
        patch: WorkflowPatch,
    ) -> Result<Workflow> {
        trace!("engine::update_workflow({wid})");
        // the workflow record is also rewritten by commits, under the same lock
        let slot = self.slot(wid)?;
        let _guard = slot.lock();
        if slot.is_retired() {
            return Err(TickflowError::not_found(Entity::Workflow, wid));
        }

        let mut workflow = self.get_workflow(wid)?;
        patch.apply(&mut workflow);
        self.check_metadata(&workflow.name, workflow.description.as_deref(), &workflow.sla)?;

        if patch.status == Some(WorkflowStatus::Active) && slot.load().version == 0 {
            warn!(workflow = wid, "activation rejected, no committed version");
            return Err(TickflowError::invalid(
                Issue::new(Rule::NoStartNode, format!("workflow {wid} has no committed graph")).with_field("status").with_subject(wid),
            ));
        }

        workflow.updated_at = utils::time::from_millis(utils::time::time_millis());
        if !self.workflows.update(&data::Workflow::from(&workflow))? {
            return Err(TickflowError::not_found(Entity::Workflow, wid));
        }

        self.emit(FlowEvent::WorkflowUpdated {
            workflow_id: wid.to_string(),
        });
        Ok(workflow)
    }

    /// Deletes a workflow with its graph, history and id index entries.
    pub fn delete_workflow(
        &self,
        wid: &str,
    ) -> Result<()> {
        trace!("engine::delete_workflow({wid})");
        let slot = self.slot(wid)?;
        let _guard = slot.lock();
        if slot.is_retired() {
            return Err(TickflowError::not_found(Entity::Workflow, wid));
        }

        // slot() only inserts while the record exists, checked under the same lock
        let mut slots = self.slots.write().unwrap_or_else(PoisonError::into_inner);
        self.workflows.delete(wid)?;
        slot.retire();
        slots.remove(wid);
        drop(slots);

        self.index.purge(wid);
        let purged = self.history.purge(wid)?;
        debug!(workflow = wid, versions = purged, "workflow deleted");

        self.emit(FlowEvent::WorkflowDeleted {
            workflow_id: wid.to_string(),
        });
        Ok(())
    }

    fn check_metadata(
        &self,
        name: &str,
        description: Option<&str>,
        sla: &SlaPolicy,
    ) -> Result<()> {
        let mut issues: Vec<Issue> = [self.limits.check_name("name", name), self.limits.check_text("description", description)].into_iter().flatten().collect();
        issues.extend(sla.out_of_range().into_iter().map(|priority| {
            Issue::new(Rule::FieldLength, format!("{} SLA is longer than {MAX_SLA_DAYS} days", priority.as_ref())).with_field(format!("sla.{}", priority.as_ref()))
        }));
        if !issues.is_empty() {
            return Err(TickflowError::Validation(issues));
        }
        Ok(())
    }

    /// Bumps `update_time`. Callers hold the workflow's slot lock.
    fn touch(
        &self,
        wid: &str,
    ) {
        let touched = self.workflows.find(wid).and_then(|found| match found {
            Some(mut data) => {
                data.update_time = utils::time::time_millis();
                self.workflows.update(&data)
            }
            None => Ok(false),
        });
        if let Err(err) = touched {
            warn!(workflow = wid, error = %err, "failed to touch workflow");
        }
    }

    // ---- graph reads ----

    /// The slot of a workflow, loading its head from history when this
    /// engine has not seen it yet.
    fn slot(
        &self,
        wid: &str,
    ) -> Result<Arc<Slot>> {
        if let Some(slot) = self.slots.read().unwrap_or_else(PoisonError::into_inner).get(wid) {
            return Ok(slot.clone());
        }
        if !self.workflows.exists(wid)? {
            return Err(TickflowError::not_found(Entity::Workflow, wid));
        }

        let head = match self.history.latest(wid)? {
            Some(version) => Head::new(version, self.history.get_version(wid, version)?),
            None => Head::default(),
        };
        trace!("engine::slot({wid}) hydrated at version {}", head.version);

        let mut slots = self.slots.write().unwrap_or_else(PoisonError::into_inner);
        if let Some(slot) = slots.get(wid) {
            return Ok(slot.clone());
        }
        // a delete may have finished since the first check
        if !self.workflows.exists(wid)? {
            return Err(TickflowError::not_found(Entity::Workflow, wid));
        }
        self.index.sync(wid, &Graph::default(), &head.graph);
        let slot = Arc::new(Slot::new(head));
        slots.insert(wid.to_string(), slot.clone());
        Ok(slot)
    }

    fn head(
        &self,
        wid: &str,
    ) -> Result<Arc<Head>> {
        Ok(self.slot(wid)?.load())
    }

    /// The workflow with the nodes and edges of its latest version.
    pub fn fetch_graph(
        &self,
        wid: &str,
    ) -> Result<GraphView> {
        let head = self.head(wid)?;
        let workflow = self.get_workflow(wid)?;
        Ok(GraphView {
            workflow,
            version: head.version,
            nodes: head.graph.nodes.clone(),
            edges: head.graph.edges.clone(),
        })
    }

    /// Latest committed version number, 0 for a workflow never edited.
    pub fn current_version(
        &self,
        wid: &str,
    ) -> Result<VersionId> {
        Ok(self.head(wid)?.version)
    }

    fn step_owner(
        &self,
        step_id: &str,
    ) -> Result<WorkflowId> {
        self.index.step_owner(step_id).ok_or_else(|| TickflowError::not_found(Entity::Step, step_id))
    }

    fn transition_owner(
        &self,
        transition_id: &str,
    ) -> Result<WorkflowId> {
        self.index.transition_owner(transition_id).ok_or_else(|| TickflowError::not_found(Entity::Transition, transition_id))
    }

    pub fn get_step(
        &self,
        step_id: &str,
    ) -> Result<Step> {
        let wid = self.step_owner(step_id)?;
        self.head(&wid)?.graph.node(step_id).cloned().ok_or_else(|| TickflowError::not_found(Entity::Step, step_id))
    }

    pub fn get_transition(
        &self,
        transition_id: &str,
    ) -> Result<Transition> {
        let wid = self.transition_owner(transition_id)?;
        self.head(&wid)?.graph.edge(transition_id).cloned().ok_or_else(|| TickflowError::not_found(Entity::Transition, transition_id))
    }

    // ---- validation ----

    fn roles(&self) -> RoleSet {
        RoleSet::resolve(self.registry.as_ref())
    }

    /// Validates a node/edge set against the current roles without storing anything.
    pub fn probe(
        &self,
        nodes: &[Step],
        edges: &[Transition],
    ) -> ValidationReport {
        validator::validate(nodes, edges, &self.roles(), &self.limits)
    }

    /// Re-validates the latest version of a workflow against the current
    /// roles, e.g. after a role was retired.
    pub fn revalidate(
        &self,
        wid: &str,
    ) -> Result<ValidationReport> {
        let head = self.head(wid)?;
        Ok(self.probe(&head.graph.nodes, &head.graph.edges))
    }

    // ---- structural edits ----

    /// Opens an editor whose edits are checked against the current version.
    pub fn edit(
        &self,
        wid: &str,
    ) -> Result<Editor<'_>> {
        let version = self.current_version(wid)?;
        Ok(Editor::new(self, wid.to_string(), version))
    }

    fn edit_from(
        &self,
        wid: WorkflowId,
        base: VersionId,
    ) -> Editor<'_> {
        Editor::new(self, wid, base)
    }

    /// Runs one commit. `base` is the version the caller's edit was prepared
    /// against and must still be the latest one.
    pub(crate) fn commit<T>(
        &self,
        wid: &str,
        base: VersionId,
        meta: SnapshotMeta,
        mutate: impl FnOnce(&mut Graph) -> Result<T>,
    ) -> Result<(VersionId, T)> {
        trace!("engine::commit({wid}, {})", meta.operation);
        let slot = self.slot(wid)?;
        let guard = slot.lock();
        if slot.is_retired() {
            return Err(TickflowError::not_found(Entity::Workflow, wid));
        }

        let head = slot.load();
        if base != head.version {
            warn!(workflow = wid, base, current = head.version, "stale edit rejected");
            return Err(TickflowError::Conflict(format!("workflow {wid} is at version {}, edit was based on version {base}", head.version)));
        }

        let mut graph = (*head.graph).clone();
        let out = mutate(&mut graph)?;
        graph.adopt(wid);

        let report = validator::validate(&graph.nodes, &graph.edges, &self.roles(), &self.limits);
        let mut errors = report.errors;
        // held until the new ids are in the index
        let claim = self.index.claim();
        errors.extend(self.index.foreign_ids(wid, &graph));
        if !errors.is_empty() {
            warn!(workflow = wid, operation = %meta.operation, errors = errors.len(), "commit rejected");
            return Err(TickflowError::Validation(errors));
        }

        let operation = meta.operation.clone();
        let rolled_back_from = meta.rolled_back_from;
        let version = head.version + 1;
        if let Err(err) = self.history.record(wid, version, &graph, meta) {
            if err.is_conflict() {
                // another engine on the same store committed first, reload from history
                self.index.purge(wid);
                self.slots.write().unwrap_or_else(PoisonError::into_inner).remove(wid);
                if let Err(reload) = self.slot(wid) {
                    warn!(workflow = wid, error = %reload, "failed to reload workflow head");
                }
            }
            return Err(err);
        }

        self.index.sync(wid, &head.graph, &graph);
        drop(claim);
        slot.store(Head::new(version, graph));
        self.touch(wid);
        drop(guard);
        debug!(workflow = wid, version, operation = %operation, "committed");

        self.emit(match rolled_back_from {
            Some(target) => FlowEvent::RolledBack {
                workflow_id: wid.to_string(),
                target,
                version,
            },
            None => FlowEvent::VersionCommitted {
                workflow_id: wid.to_string(),
                version,
                operation,
            },
        });
        Ok((version, out))
    }

    /// Adds a step. Every structural mutation takes the version the caller
    /// last read as `base` and fails with `Conflict` once the workflow has
    /// moved past it.
    pub fn create_step(
        &self,
        wid: &str,
        base: VersionId,
        new: NewStep,
    ) -> Result<Step> {
        self.edit_from(wid.to_string(), base).create_step(new)
    }

    pub fn update_step(
        &self,
        step_id: &str,
        base: VersionId,
        patch: StepPatch,
    ) -> Result<Step> {
        self.edit_from(self.step_owner(step_id)?, base).update_step(step_id, patch)
    }

    /// Deletes a step and every transition touching it. Deleting the start
    /// step requires naming the step that takes over as start.
    pub fn delete_step(
        &self,
        step_id: &str,
        base: VersionId,
        replacement_start: Option<&str>,
    ) -> Result<Vec<Transition>> {
        self.edit_from(self.step_owner(step_id)?, base).delete_step(step_id, replacement_start)
    }

    pub fn create_transition(
        &self,
        wid: &str,
        base: VersionId,
        new: NewTransition,
    ) -> Result<Transition> {
        self.edit_from(wid.to_string(), base).create_transition(new)
    }

    pub fn update_transition(
        &self,
        transition_id: &str,
        base: VersionId,
        patch: TransitionPatch,
    ) -> Result<Transition> {
        self.edit_from(self.transition_owner(transition_id)?, base).update_transition(transition_id, patch)
    }

    pub fn delete_transition(
        &self,
        transition_id: &str,
        base: VersionId,
    ) -> Result<Transition> {
        self.edit_from(self.transition_owner(transition_id)?, base).delete_transition(transition_id)
    }

    /// Commits a bulk node/edge update as one version.
    pub fn apply_graph(
        &self,
        wid: &str,
        base: VersionId,
        update: GraphUpdate,
    ) -> Result<VersionId> {
        self.edit_from(wid.to_string(), base).apply(update)
    }

    // ---- history ----

    pub fn list_versions(
        &self,
        wid: &str,
    ) -> Result<Vec<VersionSummary>> {
        self.slot(wid)?;
        self.history.list_versions(wid)
    }

    pub fn get_version(
        &self,
        wid: &str,
        version: VersionId,
    ) -> Result<Graph> {
        self.slot(wid)?;
        self.history.get_version(wid, version)
    }

    /// Commits the content of `target` as a new version on top of `base`.
    pub fn rollback(
        &self,
        wid: &str,
        base: VersionId,
        target: VersionId,
    ) -> Result<VersionId> {
        self.edit_from(wid.to_string(), base).rollback(target)
    }

    // ---- progress ----

    /// A tracker over the latest version.
    pub fn tracker(
        &self,
        wid: &str,
    ) -> Result<Tracker> {
        Ok(Tracker::new(self.head(wid)?.graph.clone()))
    }

    /// A tracker over a historical version, for tickets pinned to it.
    pub fn tracker_at(
        &self,
        wid: &str,
        version: VersionId,
    ) -> Result<Tracker> {
        let head = self.head(wid)?;
        if head.version == version {
            return Ok(Tracker::new(head.graph.clone()));
        }
        Ok(Tracker::new(Arc::new(self.history.get_version(wid, version)?)))
    }

    pub fn valid_actions(
        &self,
        wid: &str,
        step_id: &str,
    ) -> Result<Vec<ValidAction>> {
        self.tracker(wid)?.valid_actions(step_id)
    }

    pub fn progress(
        &self,
        instance: &TicketInstance,
    ) -> Result<Progress> {
        self.tracker(&instance.workflow_id)?.progress(instance)
    }

    /// When the ticket is due under its workflow's SLA. `None` if the ticket
    /// has no open time or its priority has no target.
    pub fn sla_deadline(
        &self,
        instance: &TicketInstance,
    ) -> Result<Option<DateTime<Utc>>> {
        let workflow = self.get_workflow(&instance.workflow_id)?;
        Ok(instance.opened_at.and_then(|opened| workflow.sla.deadline(instance.priority, opened)))
    }

    // ---- import / export ----

    /// Creates a workflow from an exported model. Every id is reissued, so a
    /// model can be imported any number of times.
    pub fn import(
        &self,
        model: &GraphModel,
    ) -> Result<GraphView> {
        trace!("engine::import({})", model.name);
        let workflow = self.create_workflow(model.to_new_workflow())?;
        let graph = model.reissue_ids();

        let update = GraphUpdate::replace(graph.nodes, graph.edges);
        if let Err(err) = self.edit_from(workflow.id.clone(), 0).apply_as(update, "import") {
            if let Err(cleanup) = self.delete_workflow(&workflow.id) {
                warn!(workflow = %workflow.id, error = %cleanup, "failed to drop partially imported workflow");
            }
            return Err(err);
        }
        self.fetch_graph(&workflow.id)
    }

    pub fn export(
        &self,
        wid: &str,
    ) -> Result<GraphModel> {
        Ok(GraphModel::from(self.fetch_graph(wid)?))
    }
}
