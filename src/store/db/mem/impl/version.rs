use std::collections::HashMap;

use serde_json::{Value as JsonValue, json};

use crate::{
    Result,
    store::{data::Version, db::mem::DbDocument},
};

impl DbDocument for Version {
    fn id(&self) -> &str {
        &self.id
    }

    fn doc(&self) -> Result<HashMap<String, JsonValue>> {
        let mut map = HashMap::new();
        map.insert("id".to_string(), json!(self.id.clone()));
        map.insert("wid".to_string(), json!(self.wid.clone()));
        map.insert("version".to_string(), json!(self.version));
        map.insert("operation".to_string(), json!(self.operation.clone()));
        map.insert("create_time".to_string(), json!(self.create_time));
        Ok(map)
    }
}
