//! Capability interface over the document store holding cat records.
//!
//! Every call is its own unit of work: backends acquire whatever session or
//! lock they need for the duration of the call and release it before
//! returning. Nothing is held across calls.

pub mod memory;
pub mod spanner;

use anyhow::Result;
use async_trait::async_trait;
use std::num::NonZeroUsize;

use crate::keys::{CatKey, PageCursor};
use crate::models::CatRecord;

pub use memory::MemoryDatastore;
pub use spanner::SpannerDatastore;

/// A stored record together with the key the store assigned to it
#[derive(Debug, Clone, PartialEq)]
pub struct CatEntity {
    pub key: CatKey,
    pub record: CatRecord,
}

/// One page of a key-ordered scan
#[derive(Debug, Clone, Default)]
pub struct Page {
    pub entities: Vec<CatEntity>,
    /// Present only when at least one more record follows this page
    pub next_cursor: Option<PageCursor>,
}

impl Page {
    /// Build a page from up to `limit + 1` rows read in key order
    pub(crate) fn from_overfetch(mut entities: Vec<CatEntity>, limit: NonZeroUsize) -> Self {
        let limit = limit.get();
        let has_more = entities.len() > limit;
        entities.truncate(limit);
        let next_cursor = if has_more {
            entities.last().map(|entity| PageCursor::after(&entity.key))
        } else {
            None
        };

        Self {
            entities,
            next_cursor,
        }
    }
}

#[async_trait]
pub trait Datastore: Send + Sync {
    /// Insert all records in one call, assigning each a fresh key
    async fn put_multi(&self, records: Vec<CatRecord>) -> Result<Vec<CatKey>>;

    /// Return at most `limit` records in key order, starting after `start`
    async fn fetch_page(&self, limit: NonZeroUsize, start: Option<&PageCursor>) -> Result<Page>;

    /// Point lookup; `Ok(None)` when nothing is stored under `key`
    async fn get(&self, key: &CatKey) -> Result<Option<CatRecord>>;

    /// Remove the record under `key`; absent keys are not an error
    async fn delete(&self, key: &CatKey) -> Result<()>;

    async fn health_check(&self) -> Result<()>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Species;
    use chrono::NaiveDate;

    fn limit(n: usize) -> NonZeroUsize {
        NonZeroUsize::new(n).unwrap()
    }

    fn entity() -> CatEntity {
        CatEntity {
            key: CatKey::generate(),
            record: CatRecord {
                name: "Tom".to_string(),
                date_of_birth: NaiveDate::from_ymd_opt(2020, 1, 1).unwrap(),
                weight: 4.2,
                species: Species::British,
            },
        }
    }

    #[test]
    fn test_page_with_extra_row_has_cursor() {
        let rows = vec![entity(), entity(), entity()];
        let second_key = rows[1].key;

        let page = Page::from_overfetch(rows, limit(2));

        assert_eq!(page.entities.len(), 2);
        assert_eq!(page.next_cursor, Some(PageCursor::after(&second_key)));
    }

    #[test]
    fn test_exact_page_has_no_cursor() {
        let page = Page::from_overfetch(vec![entity(), entity()], limit(2));
        assert_eq!(page.entities.len(), 2);
        assert!(page.next_cursor.is_none());

        let empty = Page::from_overfetch(Vec::new(), limit(5));
        assert!(empty.entities.is_empty());
        assert!(empty.next_cursor.is_none());
    }
}
