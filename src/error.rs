//! Error types for Tickflow.
//!
//! All errors are represented by the `TickflowError` enum. The three kinds a
//! caller is expected to handle are `Validation` (user-correctable graph or
//! field problems), `NotFound` and `Conflict` (stale edit, or removing the
//! only start step). Mutations that fail never leave a partial commit behind.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::validator::Issue;

/// Kinds of entity that can be looked up by id.
#[derive(Deserialize, Serialize, Debug, Clone, Copy, PartialEq, Eq, strum::AsRefStr, strum::Display)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum Entity {
    Workflow,
    Step,
    Transition,
    Version,
}

/// Unified error type for all Tickflow operations.
#[derive(Deserialize, Serialize, Error, Debug, Clone, PartialEq)]
pub enum TickflowError {
    /// One or more graph invariants or field rules were violated.
    #[error("validation failed: {}", join_issues(.0))]
    Validation(Vec<Issue>),

    /// A referenced workflow, step, transition or version does not exist.
    #[error("{entity} {id} not found")]
    NotFound {
        entity: Entity,
        id: String,
    },

    /// Concurrent edit detected, or a required start step would be removed.
    #[error("{0}")]
    Conflict(String),

    /// Configuration parsing errors.
    #[error("{0}")]
    Config(String),

    /// Data conversion errors (JSON, TOML).
    #[error("{0}")]
    Convert(String),

    /// Storage backend errors.
    #[error("{0}")]
    Store(String),

    /// Role registry lookups.
    #[error("{0}")]
    Registry(String),
}

fn join_issues(issues: &[Issue]) -> String {
    issues.iter().map(|i| i.to_string()).collect::<Vec<_>>().join("; ")
}

impl TickflowError {
    pub(crate) fn not_found(
        entity: Entity,
        id: impl Into<String>,
    ) -> Self {
        TickflowError::NotFound {
            entity,
            id: id.into(),
        }
    }

    pub(crate) fn invalid(issue: Issue) -> Self {
        TickflowError::Validation(vec![issue])
    }

    /// The validation issues carried by this error, empty for other kinds.
    pub fn issues(&self) -> &[Issue] {
        match self {
            TickflowError::Validation(issues) => issues,
            _ => &[],
        }
    }

    pub fn is_conflict(&self) -> bool {
        matches!(self, TickflowError::Conflict(_))
    }
}

/// Structured error payload handed to collaborators.
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq, Eq)]
pub struct ErrorPayload {
    pub error: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub field: Option<String>,
}

impl From<&TickflowError> for ErrorPayload {
    fn from(err: &TickflowError) -> Self {
        match err {
            TickflowError::Validation(issues) => {
                let first = issues.first();
                ErrorPayload {
                    error: err.to_string(),
                    field: first.and_then(|i| i.field.clone()),
                }
            }
            _ => ErrorPayload {
                error: err.to_string(),
                field: None,
            },
        }
    }
}

impl From<TickflowError> for String {
    fn from(val: TickflowError) -> Self {
        val.to_string()
    }
}

impl From<std::io::Error> for TickflowError {
    fn from(error: std::io::Error) -> Self {
        TickflowError::Config(error.to_string())
    }
}

impl From<serde_json::Error> for TickflowError {
    fn from(error: serde_json::Error) -> Self {
        TickflowError::Convert(error.to_string())
    }
}

impl From<toml::de::Error> for TickflowError {
    fn from(error: toml::de::Error) -> Self {
        TickflowError::Config(error.to_string())
    }
}
