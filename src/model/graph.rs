use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::{
    Result, TickflowError,
    engine::GraphView,
    utils,
    workflow::{Graph, NewWorkflow, SlaPolicy, Step, Transition, VersionId},
};

/// Portable JSON form of a whole workflow: metadata plus one graph version.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct GraphModel {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sub_category: Option<String>,
    #[serde(default)]
    pub sla: SlaPolicy,
    /// version the model was exported from, informational only
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<VersionId>,
    #[serde(default)]
    pub nodes: Vec<Step>,
    #[serde(default)]
    pub edges: Vec<Transition>,
}

impl GraphModel {
    pub fn from_json(s: &str) -> Result<Self> {
        serde_json::from_str::<GraphModel>(s).map_err(|e| TickflowError::Convert(format!("invalid graph model: {e}")))
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub(crate) fn to_new_workflow(&self) -> NewWorkflow {
        NewWorkflow {
            name: self.name.clone(),
            description: self.description.clone(),
            category: self.category.clone(),
            sub_category: self.sub_category.clone(),
            sla: self.sla,
        }
    }

    /// The graph with fresh ids for every node and edge. Edge endpoints
    /// follow their nodes; endpoints naming no node are kept so validation
    /// can report them.
    pub(crate) fn reissue_ids(&self) -> Graph {
        let ids: HashMap<&str, String> = self.nodes.iter().map(|n| (n.id.as_str(), utils::longid())).collect();
        let remap = |id: &Option<String>| id.as_ref().map(|id| ids.get(id.as_str()).cloned().unwrap_or_else(|| id.clone()));

        let nodes = self
            .nodes
            .iter()
            .map(|n| Step {
                id: ids.get(n.id.as_str()).cloned().unwrap_or_else(utils::longid),
                ..n.clone()
            })
            .collect();
        let edges = self
            .edges
            .iter()
            .map(|e| Transition {
                id: utils::longid(),
                from_step: remap(&e.from_step),
                to_step: remap(&e.to_step),
                ..e.clone()
            })
            .collect();
        Graph::new(nodes, edges)
    }
}

impl From<GraphView> for GraphModel {
    fn from(view: GraphView) -> Self {
        Self {
            name: view.workflow.name,
            description: view.workflow.description,
            category: view.workflow.category,
            sub_category: view.workflow.sub_category,
            sla: view.workflow.sla,
            version: Some(view.version),
            nodes: view.nodes,
            edges: view.edges,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MODEL: &str = r#"{
        "name": "Laptop request",
        "category": "IT",
        "sla": { "high": { "days": 0, "hours": 4, "minutes": 0 } },
        "nodes": [
            { "id": "a", "name": "Intake", "role": "agent", "is_start": true, "position": { "x": 10.5, "y": 20.0 } },
            { "id": "b", "name": "Approve", "role": "approver", "is_end": true }
        ],
        "edges": [
            { "id": "ab", "from_step": "a", "to_step": "b", "action": { "name": "Approve" } },
            { "id": "bx", "from_step": "b", "action": { "name": "Reject", "description": "closes the ticket" } }
        ]
    }"#;

    #[test]
    fn test_from_json() {
        let model = GraphModel::from_json(MODEL).unwrap();
        assert_eq!(model.name, "Laptop request");
        assert_eq!(model.category.as_deref(), Some("IT"));
        assert_eq!(model.sla.high.hours, 4);
        assert_eq!(model.nodes.len(), 2);
        assert!(model.nodes[0].is_start);
        assert_eq!(model.edges[1].to_step, None);
    }

    #[test]
    fn test_invalid_json() {
        let err = GraphModel::from_json("{ \"nodes\": 3 }").unwrap_err();
        assert!(matches!(err, TickflowError::Convert(_)));
    }

    #[test]
    fn test_reissue_ids_keeps_structure() {
        let model = GraphModel::from_json(MODEL).unwrap();
        let graph = model.reissue_ids();

        let a = &graph.nodes[0];
        let b = &graph.nodes[1];
        assert_ne!(a.id, "a");
        assert_ne!(b.id, "b");
        assert_eq!(graph.edges[0].from_step.as_ref(), Some(&a.id));
        assert_eq!(graph.edges[0].to_step.as_ref(), Some(&b.id));
        assert_eq!(graph.edges[1].from_step.as_ref(), Some(&b.id));
        assert_eq!(graph.edges[1].to_step, None);
        assert_ne!(graph.edges[0].id, "ab");
        assert_eq!(a.position, model.nodes[0].position);
    }

    #[test]
    fn test_unknown_endpoint_is_kept() {
        let mut model = GraphModel::from_json(MODEL).unwrap();
        model.edges[0].to_step = Some("ghost".into());
        let graph = model.reissue_ids();
        assert_eq!(graph.edges[0].to_step.as_deref(), Some("ghost"));
    }

    #[test]
    fn test_to_json_round_trip() {
        let model = GraphModel::from_json(MODEL).unwrap();
        let json = model.to_json().unwrap();
        assert_eq!(GraphModel::from_json(&json).unwrap(), model);
    }
}
