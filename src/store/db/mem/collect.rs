use std::{
    collections::BTreeMap,
    sync::{PoisonError, RwLock},
};

use tracing::trace;

use crate::{
    Result,
    store::{DbCollection, query::Query, query::compare_values},
};

use super::DbDocument;

/// One in-memory collection, keyed and iterated by record id.
#[derive(Debug)]
pub struct Collect<T> {
    name: String,
    items: RwLock<BTreeMap<String, T>>,
}

impl<T> Collect<T> {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            items: RwLock::new(BTreeMap::new()),
        }
    }
}

impl<T: DbDocument> Collect<T> {
    fn matches(
        item: &T,
        query: &Query,
    ) -> Result<bool> {
        if query.filters().is_empty() {
            return Ok(true);
        }
        let doc = item.doc()?;
        Ok(query.filters().iter().all(|(field, value)| doc.get(field) == Some(value)))
    }
}

impl<T> DbCollection for Collect<T>
where
    T: DbDocument + Clone + Send + Sync,
{
    type Item = T;

    fn exists(
        &self,
        id: &str,
    ) -> Result<bool> {
        let items = self.items.read().unwrap_or_else(PoisonError::into_inner);
        Ok(items.contains_key(id))
    }

    fn find(
        &self,
        id: &str,
    ) -> Result<Option<Self::Item>> {
        let items = self.items.read().unwrap_or_else(PoisonError::into_inner);
        Ok(items.get(id).cloned())
    }

    fn query(
        &self,
        query: &Query,
    ) -> Result<Vec<Self::Item>> {
        trace!("{}::query({:?})", self.name, query);
        let items = self.items.read().unwrap_or_else(PoisonError::into_inner);

        let mut rows = Vec::new();
        for item in items.values() {
            if Self::matches(item, query)? {
                rows.push((item.doc()?, item.clone()));
            }
        }
        drop(items);

        if !query.order_by().is_empty() {
            rows.sort_by(|(a, _), (b, _)| {
                query
                    .order_by()
                    .iter()
                    .map(|(field, rev)| {
                        let ord = compare_values(a.get(field), b.get(field));
                        if *rev { ord.reverse() } else { ord }
                    })
                    .find(|ord| ord.is_ne())
                    .unwrap_or(std::cmp::Ordering::Equal)
            });
        }

        let limit = query.get_limit().unwrap_or(usize::MAX);
        Ok(rows.into_iter().skip(query.get_offset()).take(limit).map(|(_, item)| item).collect())
    }

    fn create(
        &self,
        data: &Self::Item,
    ) -> Result<bool> {
        let mut items = self.items.write().unwrap_or_else(PoisonError::into_inner);
        if items.contains_key(data.id()) {
            return Ok(false);
        }
        items.insert(data.id().to_string(), data.clone());
        Ok(true)
    }

    fn update(
        &self,
        data: &Self::Item,
    ) -> Result<bool> {
        let mut items = self.items.write().unwrap_or_else(PoisonError::into_inner);
        match items.get_mut(data.id()) {
            Some(item) => {
                *item = data.clone();
                Ok(true)
            }
            None => Ok(false),
        }
    }

    fn delete(
        &self,
        id: &str,
    ) -> Result<bool> {
        let mut items = self.items.write().unwrap_or_else(PoisonError::into_inner);
        Ok(items.remove(id).is_some())
    }

    fn delete_by(
        &self,
        query: &Query,
    ) -> Result<usize> {
        let mut items = self.items.write().unwrap_or_else(PoisonError::into_inner);
        let mut doomed = Vec::new();
        for (id, item) in items.iter() {
            if Self::matches(item, query)? {
                doomed.push(id.clone());
            }
        }
        for id in doomed.iter() {
            items.remove(id);
        }
        Ok(doomed.len())
    }
}
