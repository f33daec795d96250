//! Translation between API cats and stored records, and the only place
//! that talks to the datastore.

use std::num::NonZeroUsize;
use std::sync::Arc;
use thiserror::Error;

use crate::datastore::{CatEntity, Datastore};
use crate::keys::{CatKey, DecodeError, PageCursor};
use crate::models::{Cat, CatRecord};

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("invalid cat id: {0}")]
    InvalidKey(#[source] DecodeError),
    #[error("invalid cursor: {0}")]
    InvalidCursor(#[source] DecodeError),
    #[error(transparent)]
    Backend(#[from] anyhow::Error),
}

/// Storage adapter over a shared datastore handle
#[derive(Clone)]
pub struct CatStorage {
    datastore: Arc<dyn Datastore>,
}

/// Drops any client-supplied id; the datastore always assigns a fresh key
fn cat_to_record(cat: Cat) -> CatRecord {
    CatRecord {
        name: cat.name,
        date_of_birth: cat.date_of_birth,
        weight: cat.weight,
        species: cat.species,
    }
}

fn record_to_cat(key: &CatKey, record: CatRecord) -> Cat {
    Cat {
        name: record.name,
        date_of_birth: record.date_of_birth,
        weight: record.weight,
        species: record.species,
        id: key.to_urlsafe(),
    }
}

impl CatStorage {
    pub fn new(datastore: Arc<dyn Datastore>) -> Self {
        Self { datastore }
    }

    /// Store a batch of cats with a single bulk insert
    pub async fn store_cats(&self, cats: Vec<Cat>) -> Result<(), StorageError> {
        if cats.is_empty() {
            tracing::info!("No cats to store");
            return Ok(());
        }

        tracing::info!("Storing {} cats", cats.len());
        let records = cats.into_iter().map(cat_to_record).collect();
        let keys = self.datastore.put_multi(records).await?;
        tracing::debug!("Stored cats under {} new keys", keys.len());
        Ok(())
    }

    /// Fetch one page of cats.
    ///
    /// Returns the cats and the cursor for the next page, which is empty
    /// once the listing is exhausted. A missing or empty `cursor` starts
    /// from the beginning.
    pub async fn retrieve_cats(
        &self,
        limit: NonZeroUsize,
        cursor: Option<&str>,
    ) -> Result<(Vec<Cat>, String), StorageError> {
        let start = match cursor.filter(|c| !c.is_empty()) {
            Some(encoded) => {
                Some(PageCursor::from_urlsafe(encoded).map_err(StorageError::InvalidCursor)?)
            }
            None => None,
        };

        tracing::info!(
            "Retrieving up to {} cats ({})",
            limit,
            if start.is_some() { "resuming from cursor" } else { "from the start" }
        );

        let page = self.datastore.fetch_page(limit, start.as_ref()).await?;
        let cats = page
            .entities
            .into_iter()
            .map(|CatEntity { key, record }| record_to_cat(&key, record))
            .collect();
        let next = page
            .next_cursor
            .map(|cursor| cursor.to_urlsafe())
            .unwrap_or_default();

        Ok((cats, next))
    }

    /// Point lookup; `Ok(None)` when the id is well formed but unused
    pub async fn retrieve_cat_by_id(&self, id: &str) -> Result<Option<Cat>, StorageError> {
        let key = CatKey::from_urlsafe(id).map_err(StorageError::InvalidKey)?;

        tracing::info!("Retrieving cat {}", id);
        match self.datastore.get(&key).await? {
            Some(record) => Ok(Some(record_to_cat(&key, record))),
            None => {
                tracing::warn!("Cat {} not found", id);
                Ok(None)
            }
        }
    }

    pub async fn delete_cat(&self, id: &str) -> Result<(), StorageError> {
        let key = CatKey::from_urlsafe(id).map_err(StorageError::InvalidKey)?;

        tracing::info!("Deleting cat {}", id);
        self.datastore.delete(&key).await?;
        Ok(())
    }

    pub async fn health_check(&self) -> anyhow::Result<()> {
        self.datastore.health_check().await
    }
}
