use std::{
    any::Any,
    collections::HashMap,
    convert::AsRef,
    sync::{Arc, PoisonError, RwLock},
};

use tracing::trace;

use crate::{Result, ShareLock, TickflowError};

use super::{DbCollection, DbCollectionIden, StoreIden, data::*};

#[derive(Clone)]
pub struct DynDbSetRef<T>(Arc<dyn DbCollection<Item = T>>);

/// Registry of typed collections, filled in by a `DbStore` backend.
pub struct Store {
    collections: ShareLock<HashMap<StoreIden, Arc<dyn Any + Send + Sync + 'static>>>,
}

impl Default for Store {
    fn default() -> Self {
        Self::new()
    }
}

impl Store {
    pub fn new() -> Self {
        Self {
            collections: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    pub fn collection<DATA>(&self) -> Result<Arc<dyn DbCollection<Item = DATA>>>
    where
        DATA: DbCollectionIden + Send + Sync + 'static,
    {
        let collections = self.collections.read().unwrap_or_else(PoisonError::into_inner);
        let missing = || TickflowError::Store(format!("fail to get collection: {}", DATA::iden().as_ref()));

        let collection = collections.get(&DATA::iden()).ok_or_else(missing)?;
        collection.downcast_ref::<DynDbSetRef<DATA>>().map(|v| v.0.clone()).ok_or_else(missing)
    }

    pub fn register<DATA>(
        &self,
        collection: Arc<dyn DbCollection<Item = DATA> + Send + Sync + 'static>,
    ) where
        DATA: DbCollectionIden + 'static,
    {
        trace!("store::register({})", DATA::iden().as_ref());
        let mut collections = self.collections.write().unwrap_or_else(PoisonError::into_inner);
        collections.insert(DATA::iden(), Arc::new(DynDbSetRef::<DATA>(collection)));
    }

    pub fn workflows(&self) -> Result<Arc<dyn DbCollection<Item = Workflow>>> {
        self.collection()
    }

    pub fn versions(&self) -> Result<Arc<dyn DbCollection<Item = Version>>> {
        self.collection()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{DbStore, MemStore};

    #[test]
    fn test_unregistered_collection() {
        let store = Store::new();
        let err = store.workflows().err().unwrap();
        assert_eq!(err, TickflowError::Store("fail to get collection: workflows".into()));
    }

    #[test]
    fn test_mem_store_registers_all() {
        let store = Store::new();
        MemStore::new().init(&store);
        assert!(store.workflows().is_ok());
        assert!(store.versions().is_ok());
    }
}
