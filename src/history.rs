//! Version history: immutable snapshots of a workflow graph.
//!
//! Every committed structural edit appends a snapshot. History is never
//! rewritten; rolling back appends a copy of an older snapshot.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::trace;

use crate::{
    Result, TickflowError,
    error::Entity,
    store::{DbCollection, data, query::Query},
    utils,
    workflow::{Graph, VersionId},
};

/// Describes why a snapshot was taken.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SnapshotMeta {
    /// Operation that produced the snapshot, e.g. `create_step` or `rollback`.
    pub operation: String,
    pub actor: Option<String>,
    pub rolled_back_from: Option<VersionId>,
}

impl SnapshotMeta {
    pub fn new(operation: impl Into<String>) -> Self {
        Self {
            operation: operation.into(),
            ..Default::default()
        }
    }

    pub fn actor(
        mut self,
        actor: Option<String>,
    ) -> Self {
        self.actor = actor;
        self
    }

    pub fn rolled_back_from(
        mut self,
        version: VersionId,
    ) -> Self {
        self.rolled_back_from = Some(version);
        self
    }
}

/// One row of `list_versions`.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct VersionSummary {
    pub version: VersionId,
    pub operation: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub actor: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rolled_back_from: Option<VersionId>,
    pub node_count: usize,
    pub edge_count: usize,
    pub created_at: DateTime<Utc>,
}

impl From<&data::Version> for VersionSummary {
    fn from(v: &data::Version) -> Self {
        Self {
            version: v.version,
            operation: v.operation.clone(),
            actor: v.actor.clone(),
            rolled_back_from: v.rolled_back_from,
            node_count: v.node_count,
            edge_count: v.edge_count,
            created_at: utils::time::from_millis(v.create_time),
        }
    }
}

/// Snapshot storage over the `versions` collection.
#[derive(Clone)]
pub struct History {
    versions: Arc<dyn DbCollection<Item = data::Version>>,
}

impl History {
    pub fn new(versions: Arc<dyn DbCollection<Item = data::Version>>) -> Self {
        Self {
            versions,
        }
    }

    /// Appends a snapshot as the next version of the workflow.
    pub fn snapshot(
        &self,
        wid: &str,
        graph: &Graph,
        meta: SnapshotMeta,
    ) -> Result<VersionId> {
        let next = self.latest(wid)?.unwrap_or(0) + 1;
        self.record(wid, next, graph, meta)?;
        Ok(next)
    }

    /// Writes a snapshot under an explicit version number. Fails with a
    /// conflict if that version already exists.
    pub(crate) fn record(
        &self,
        wid: &str,
        version: VersionId,
        graph: &Graph,
        meta: SnapshotMeta,
    ) -> Result<()> {
        trace!("history::record({wid}, {version}, {})", meta.operation);
        let data = data::Version {
            id: data::Version::record_id(wid, version),
            wid: wid.to_string(),
            version,
            operation: meta.operation,
            actor: meta.actor,
            rolled_back_from: meta.rolled_back_from,
            node_count: graph.nodes.len(),
            edge_count: graph.edges.len(),
            data: serde_json::to_string(graph)?,
            create_time: utils::time::time_millis(),
        };
        if !self.versions.create(&data)? {
            return Err(TickflowError::Conflict(format!("version {version} of workflow {wid} already exists")));
        }
        Ok(())
    }

    /// Highest recorded version, if any.
    pub fn latest(
        &self,
        wid: &str,
    ) -> Result<Option<VersionId>> {
        let rows = self.versions.query(&Query::new().eq("wid", wid).order("version", true).limit(1))?;
        Ok(rows.first().map(|v| v.version))
    }

    /// Every version of the workflow, oldest first.
    pub fn list_versions(
        &self,
        wid: &str,
    ) -> Result<Vec<VersionSummary>> {
        let rows = self.versions.query(&Query::new().eq("wid", wid).order("version", false))?;
        Ok(rows.iter().map(VersionSummary::from).collect())
    }

    /// The node/edge content recorded for a version.
    pub fn get_version(
        &self,
        wid: &str,
        version: VersionId,
    ) -> Result<Graph> {
        let id = data::Version::record_id(wid, version);
        let row = self.versions.find(&id)?.ok_or_else(|| TickflowError::not_found(Entity::Version, format!("{wid}@{version}")))?;
        let graph = serde_json::from_str::<Graph>(&row.data)?;
        Ok(graph)
    }

    /// Drops every snapshot of a workflow.
    pub(crate) fn purge(
        &self,
        wid: &str,
    ) -> Result<usize> {
        self.versions.delete_by(&Query::new().eq("wid", wid))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        store::{DbStore, MemStore, Store},
        workflow::{NewStep, NewTransition},
    };

    fn history() -> History {
        let store = Store::new();
        MemStore::new().init(&store);
        History::new(store.versions().unwrap())
    }

    fn graph() -> Graph {
        let a = NewStep::new("Intake", "Agent").start().position(12.5, -40.25).instruction("check attachments").into_step("a".into(), "w".into());
        let b = NewStep::new("Approve", "Approver").end().position(300.0, 0.1).into_step("b".into(), "w".into());
        let ab = NewTransition::new("Approve").from("a").to("b").description("manager sign-off").into_transition("ab".into(), "w".into());
        let close = NewTransition::new("Reject").from("a").into_transition("ax".into(), "w".into());
        Graph::new(vec![a, b], vec![ab, close])
    }

    #[test]
    fn test_snapshot_round_trip() {
        let history = history();
        let g = graph();
        let v = history.snapshot("w", &g, SnapshotMeta::new("import")).unwrap();

        assert_eq!(v, 1);
        assert_eq!(history.get_version("w", v).unwrap(), g);
    }

    #[test]
    fn test_versions_increase_per_workflow() {
        let history = history();
        let g = graph();
        assert_eq!(history.snapshot("w", &g, SnapshotMeta::new("a")).unwrap(), 1);
        assert_eq!(history.snapshot("w", &g, SnapshotMeta::new("b")).unwrap(), 2);
        assert_eq!(history.snapshot("other", &g, SnapshotMeta::new("a")).unwrap(), 1);
        assert_eq!(history.latest("w").unwrap(), Some(2));

        let list = history.list_versions("w").unwrap();
        assert_eq!(list.iter().map(|s| s.version).collect::<Vec<_>>(), vec![1, 2]);
        assert_eq!(list[1].operation, "b");
        assert_eq!(list[0].node_count, 2);
        assert_eq!(list[0].edge_count, 2);
    }

    #[test]
    fn test_record_rejects_existing_version() {
        let history = history();
        let g = graph();
        history.record("w", 1, &g, SnapshotMeta::new("a")).unwrap();
        let err = history.record("w", 1, &g, SnapshotMeta::new("b")).unwrap_err();
        assert!(err.is_conflict());
    }

    #[test]
    fn test_missing_version() {
        let history = history();
        let err = history.get_version("w", 3).unwrap_err();
        assert_eq!(err, TickflowError::not_found(Entity::Version, "w@3"));
    }

    #[test]
    fn test_summary_carries_meta() {
        let history = history();
        let g = graph();
        history.snapshot("w", &g, SnapshotMeta::new("create_step").actor(Some("dana".into()))).unwrap();
        history.snapshot("w", &g, SnapshotMeta::new("rollback").rolled_back_from(1)).unwrap();

        let list = history.list_versions("w").unwrap();
        assert_eq!(list[0].actor.as_deref(), Some("dana"));
        assert_eq!(list[1].rolled_back_from, Some(1));
    }

    #[test]
    fn test_purge() {
        let history = history();
        let g = graph();
        history.snapshot("w", &g, SnapshotMeta::new("a")).unwrap();
        history.snapshot("w", &g, SnapshotMeta::new("b")).unwrap();
        assert_eq!(history.purge("w").unwrap(), 2);
        assert!(history.list_versions("w").unwrap().is_empty());
    }
}
