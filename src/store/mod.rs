//! Storage layer for workflow metadata and version snapshots.
//!
//! Collections are registered on a [`Store`] by a backend implementing
//! [`DbStore`]. The only backend shipped is the in-memory `MemStore`.

pub mod data;
mod db;
pub mod query;
mod store;

use strum::{AsRefStr, EnumIter};

use crate::Result;

use query::Query;

pub use db::MemStore;
pub use store::Store;

/// Identifiers for the storage collections.
#[derive(Debug, Clone, AsRefStr, PartialEq, Hash, Eq, EnumIter)]
pub enum StoreIden {
    /// Workflow metadata.
    #[strum(serialize = "workflows")]
    Workflows,
    /// Committed graph versions.
    #[strum(serialize = "versions")]
    Versions,
}

/// Trait for types that can identify their storage collection.
pub trait DbCollectionIden {
    /// Returns the collection identifier for this type.
    fn iden() -> StoreIden;
}

/// Trait for database collection operations.
pub trait DbCollection: Send + Sync {
    /// The type of items stored in this collection.
    type Item;

    /// Checks if a record with the given ID exists.
    fn exists(
        &self,
        id: &str,
    ) -> Result<bool>;

    /// Finds a record by ID.
    fn find(
        &self,
        id: &str,
    ) -> Result<Option<Self::Item>>;

    /// Queries records with filtering, ordering and paging.
    fn query(
        &self,
        query: &Query,
    ) -> Result<Vec<Self::Item>>;

    /// Creates a new record. Returns false if the id is taken.
    fn create(
        &self,
        data: &Self::Item,
    ) -> Result<bool>;

    /// Updates an existing record. Returns false if it does not exist.
    fn update(
        &self,
        data: &Self::Item,
    ) -> Result<bool>;

    /// Deletes a record by ID.
    fn delete(
        &self,
        id: &str,
    ) -> Result<bool>;

    /// Deletes every record matching the query's filters, returning how many were removed.
    fn delete_by(
        &self,
        query: &Query,
    ) -> Result<usize>;
}

/// Trait for database store initialization.
pub trait DbStore {
    /// Initializes the database and registers collections with the store.
    fn init(
        &self,
        s: &Store,
    );
}
