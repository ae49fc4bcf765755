use serde::{Deserialize, Serialize};

use crate::store::{DbCollectionIden, StoreIden};

/// Stored version snapshot. `data` holds the serialized graph.
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
pub struct Version {
    pub id: String,
    pub wid: String,
    pub version: u64,
    pub operation: String,
    pub actor: Option<String>,
    pub rolled_back_from: Option<u64>,
    pub node_count: usize,
    pub edge_count: usize,
    pub data: String,
    pub create_time: i64,
}

impl Version {
    /// Record id of a workflow version; zero padded so ids sort by version.
    pub fn record_id(
        wid: &str,
        version: u64,
    ) -> String {
        format!("{wid}/{version:012}")
    }
}

impl DbCollectionIden for Version {
    fn iden() -> StoreIden {
        StoreIden::Versions
    }
}
