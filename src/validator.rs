//! Graph validation.
//!
//! [`validate`] is a pure function over a node/edge set and the roles known at
//! the time of the call. The graph store runs it before every commit; API
//! consumers can also call it directly to ask "would this graph be valid".
//!
//! Errors are reported in rule precedence order:
//!
//! 1. field length (names non-empty and bounded, descriptions bounded)
//! 2. unknown role
//! 3. exactly one start node
//! 4. duplicate ids, then edge endpoints present in the node set
//! 5. no self-loops
//!
//! Isolated non-start nodes are reported as warnings only.

use std::{collections::HashSet, fmt};

use serde::{Deserialize, Serialize};

use crate::{
    config::ValidationConfig,
    roles::RoleSet,
    workflow::{Position, Step, Transition},
};

/// The rule an issue was raised by.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, strum::AsRefStr, strum::Display)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum Rule {
    FieldLength,
    UnknownRole,
    NoStartNode,
    MultipleStartNodes,
    DuplicateId,
    DanglingEdge,
    SelfLoop,
    Unreachable,
}

/// A single validation finding.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct Issue {
    pub rule: Rule,
    /// Offending field, e.g. `name` or `to_step`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub field: Option<String>,
    /// Id of the offending node or edge.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subject: Option<String>,
    pub message: String,
}

impl Issue {
    pub fn new(
        rule: Rule,
        message: impl Into<String>,
    ) -> Self {
        Self {
            rule,
            field: None,
            subject: None,
            message: message.into(),
        }
    }

    pub fn with_field(
        mut self,
        field: impl Into<String>,
    ) -> Self {
        self.field = Some(field.into());
        self
    }

    pub fn with_subject(
        mut self,
        subject: impl Into<String>,
    ) -> Self {
        self.subject = Some(subject.into());
        self
    }
}

impl fmt::Display for Issue {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        write!(f, "[{}] {}", self.rule, self.message)
    }
}

/// Outcome of validating a graph.
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq, Eq)]
pub struct ValidationReport {
    pub is_valid: bool,
    pub errors: Vec<Issue>,
    pub warnings: Vec<Issue>,
}

impl ValidationReport {
    fn new(
        errors: Vec<Issue>,
        warnings: Vec<Issue>,
    ) -> Self {
        Self {
            is_valid: errors.is_empty(),
            errors,
            warnings,
        }
    }

    /// Whether any error was raised by `rule`.
    pub fn has_error(
        &self,
        rule: Rule,
    ) -> bool {
        self.errors.iter().any(|i| i.rule == rule)
    }
}

/// Length limits applied by rule 1.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Limits {
    pub max_name_len: usize,
    pub max_description_len: usize,
}

impl Default for Limits {
    fn default() -> Self {
        Self {
            max_name_len: 64,
            max_description_len: 256,
        }
    }
}

impl From<&ValidationConfig> for Limits {
    fn from(config: &ValidationConfig) -> Self {
        Self {
            max_name_len: config.max_name_len,
            max_description_len: config.max_description_len,
        }
    }
}

impl Limits {
    /// Checks a required name field.
    pub fn check_name(
        &self,
        field: &str,
        value: &str,
    ) -> Option<Issue> {
        if value.trim().is_empty() {
            return Some(Issue::new(Rule::FieldLength, format!("{field} must not be empty")).with_field(field));
        }
        let len = value.chars().count();
        (len > self.max_name_len)
            .then(|| Issue::new(Rule::FieldLength, format!("{field} is {len} characters, at most {} allowed", self.max_name_len)).with_field(field))
    }

    /// Checks an optional free-text field.
    pub fn check_text(
        &self,
        field: &str,
        value: Option<&str>,
    ) -> Option<Issue> {
        let len = value.map(|v| v.chars().count()).unwrap_or(0);
        (len > self.max_description_len)
            .then(|| Issue::new(Rule::FieldLength, format!("{field} is {len} characters, at most {} allowed", self.max_description_len)).with_field(field))
    }
}

/// Positions are stored as JSON numbers, which have no NaN or infinity.
fn check_position(node: &Step) -> Option<Issue> {
    let Position { x, y } = node.position;
    (!x.is_finite() || !y.is_finite()).then(|| Issue::new(Rule::FieldLength, format!("position ({x}, {y}) is not a finite coordinate")).with_field("position"))
}

/// Validates a full node/edge set. Deterministic and side-effect free.
pub fn validate(
    nodes: &[Step],
    edges: &[Transition],
    known_roles: &RoleSet,
    limits: &Limits,
) -> ValidationReport {
    let mut errors = Vec::new();

    // rule 1
    for node in nodes {
        let checks = [
            limits.check_name("name", &node.name),
            limits.check_text("description", node.description.as_deref()),
            limits.check_text("instruction", node.instruction.as_deref()),
            check_position(node),
        ];
        errors.extend(checks.into_iter().flatten().map(|i| i.with_subject(&node.id)));
    }
    for edge in edges {
        let checks = [
            limits.check_name("action.name", &edge.action.name),
            limits.check_text("action.description", edge.action.description.as_deref()),
        ];
        errors.extend(checks.into_iter().flatten().map(|i| i.with_subject(&edge.id)));
    }

    // rule 2
    for node in nodes {
        if node.role.trim().is_empty() {
            errors.push(Issue::new(Rule::UnknownRole, format!("step {} has no role", node.id)).with_field("role").with_subject(&node.id));
        } else if !known_roles.contains(&node.role) {
            errors.push(Issue::new(Rule::UnknownRole, format!("role {} is unknown", node.role)).with_field("role").with_subject(&node.id));
        }
    }

    // rule 3
    let starts: Vec<&Step> = nodes.iter().filter(|n| n.is_start).collect();
    match starts.len() {
        0 => errors.push(Issue::new(Rule::NoStartNode, "no start node").with_field("is_start")),
        1 => {}
        n => {
            let ids = starts.iter().map(|s| s.id.as_str()).collect::<Vec<_>>().join(", ");
            errors.push(Issue::new(Rule::MultipleStartNodes, format!("multiple start nodes ({n}): {ids}")).with_field("is_start"));
        }
    }

    // rule 4
    let mut node_ids = HashSet::new();
    for node in nodes {
        if !node_ids.insert(node.id.as_str()) {
            errors.push(Issue::new(Rule::DuplicateId, format!("step id {} is used more than once", node.id)).with_field("id").with_subject(&node.id));
        }
    }
    let mut edge_ids = HashSet::new();
    for edge in edges {
        if !edge_ids.insert(edge.id.as_str()) {
            errors.push(Issue::new(Rule::DuplicateId, format!("transition id {} is used more than once", edge.id)).with_field("id").with_subject(&edge.id));
        }
    }
    for edge in edges {
        if edge.from_step.is_none() && edge.to_step.is_none() {
            errors.push(Issue::new(Rule::DanglingEdge, format!("transition {} connects no step", edge.id)).with_subject(&edge.id));
            continue;
        }
        for (field, endpoint) in [("from_step", &edge.from_step), ("to_step", &edge.to_step)] {
            let Some(id) = endpoint else {
                continue;
            };
            if !node_ids.contains(id.as_str()) {
                errors.push(
                    Issue::new(Rule::DanglingEdge, format!("transition {} references step {id} outside the workflow", edge.id))
                        .with_field(field)
                        .with_subject(&edge.id),
                );
            }
        }
    }

    // rule 5
    for edge in edges {
        if let (Some(from), Some(to)) = (&edge.from_step, &edge.to_step) {
            if from != to {
                continue;
            }
            errors.push(Issue::new(Rule::SelfLoop, format!("transition {} loops on step {from}", edge.id)).with_field("to_step").with_subject(&edge.id));
        }
    }

    // rule 6, warnings only
    let connected: HashSet<&str> = edges.iter().flat_map(|e| [e.from_step.as_deref(), e.to_step.as_deref()]).flatten().collect();
    let warnings = nodes
        .iter()
        .filter(|n| !n.is_start && !connected.contains(n.id.as_str()))
        .map(|n| Issue::new(Rule::Unreachable, format!("step {} is unreachable", n.id)).with_subject(&n.id))
        .collect();

    ValidationReport::new(errors, warnings)
}
