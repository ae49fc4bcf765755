//! # Tickflow
//!
//! Tickflow is the workflow-graph engine behind a ticketing system. It stores
//! each workflow as a versioned directed graph of steps (nodes) connected by
//! action-labelled transitions (edges), and answers which actions a ticket can
//! take from the step it is on.
//!
//! ## Core Features
//!
//! - **Graph Store**: step and transition CRUD with atomic, validated commits
//! - **Validator**: a pure structural check (single start, no dangling edges, no self-loops, known roles)
//! - **Progress Tracker**: valid actions and acted/visited status for a ticket
//! - **Version History**: every commit is an immutable snapshot; rollback appends a copy
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use tickflow::{EngineBuilder, NewStep, NewTransition, NewWorkflow};
//!
//! let engine = EngineBuilder::new().role_registry(registry).build()?;
//! let workflow = engine.create_workflow(NewWorkflow::new("Access request"))?;
//!
//! let mut editor = engine.edit(&workflow.id)?.with_actor("dana");
//! let a = editor.create_step(NewStep::new("Submit", "requester").start())?;
//! let b = editor.create_step(NewStep::new("Approve", "manager").end())?;
//! editor.create_transition(NewTransition::new("Approve").from(&a.id).to(&b.id))?;
//!
//! let actions = engine.valid_actions(&workflow.id, &a.id)?;
//! ```

mod builder;
mod common;
mod config;
mod engine;
mod error;
mod events;
mod history;
mod model;
mod roles;
mod store;
mod tracker;
mod utils;
mod validator;
mod workflow;

use std::sync::{Arc, RwLock};

pub use builder::EngineBuilder;
pub use config::{Config, RoleConfig, StoreConfig, StoreType, ValidationConfig};
pub use engine::{Editor, Engine, GraphView};
pub use error::{Entity, ErrorPayload, TickflowError};
pub use events::FlowEvent;
pub use history::{History, SnapshotMeta, VersionSummary};
pub use model::GraphModel;
pub use roles::{CachedRoleRegistry, Role, RoleRegistry, RoleSet, StaticRoleRegistry};
pub use store::{DbCollection, DbCollectionIden, DbStore, MemStore, Store, StoreIden, data, query::Query};
pub use tracker::{Next, Progress, StepActivity, TicketInstance, Tracker, ValidAction, Visit};
pub use validator::{Issue, Limits, Rule, ValidationReport, validate};
pub use workflow::*;

/// Result type alias for Tickflow operations.
pub type Result<T> = std::result::Result<T, TickflowError>;

/// Thread-safe shared lock wrapper using Arc<RwLock<T>>.
pub(crate) type ShareLock<T> = Arc<RwLock<T>>;
