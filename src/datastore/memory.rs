//! In-process datastore backed by a `BTreeMap`, used for local development
//! and by the router tests.

use anyhow::Result;
use async_trait::async_trait;
use std::collections::BTreeMap;
use std::num::NonZeroUsize;
use std::ops::Bound;
use tokio::sync::RwLock;
use uuid::Uuid;

use super::{CatEntity, Datastore, Page};
use crate::keys::{CatKey, PageCursor};
use crate::models::CatRecord;

#[derive(Debug, Default)]
pub struct MemoryDatastore {
    cats: RwLock<BTreeMap<Uuid, CatRecord>>,
}

impl MemoryDatastore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl Datastore for MemoryDatastore {
    async fn put_multi(&self, records: Vec<CatRecord>) -> Result<Vec<CatKey>> {
        let mut cats = self.cats.write().await;
        let keys = records
            .into_iter()
            .map(|record| {
                let key = CatKey::generate();
                cats.insert(key.uuid(), record);
                key
            })
            .collect();
        Ok(keys)
    }

    async fn fetch_page(&self, limit: NonZeroUsize, start: Option<&PageCursor>) -> Result<Page> {
        let cats = self.cats.read().await;
        let lower = match start {
            Some(cursor) => Bound::Excluded(cursor.last_key().uuid()),
            None => Bound::Unbounded,
        };

        let rows = cats
            .range((lower, Bound::Unbounded))
            .take(limit.get().saturating_add(1))
            .map(|(id, record)| CatEntity {
                key: CatKey::from_uuid(*id),
                record: record.clone(),
            })
            .collect();

        Ok(Page::from_overfetch(rows, limit))
    }

    async fn get(&self, key: &CatKey) -> Result<Option<CatRecord>> {
        Ok(self.cats.read().await.get(&key.uuid()).cloned())
    }

    async fn delete(&self, key: &CatKey) -> Result<()> {
        self.cats.write().await.remove(&key.uuid());
        Ok(())
    }

    async fn health_check(&self) -> Result<()> {
        Ok(())
    }
}
