//! The Data Service seam.
//!
//! The dispatch engine never talks to a concrete database; it goes through
//! [`DataStore`] and [`StoreSession`]. Each worker opens its own session at
//! construction so one worker's in-flight call cannot block another's, and
//! releases it when the worker drains and exits.

mod memory;

pub use memory::{Dataset, MemoryStore};

use async_trait::async_trait;
use thiserror::Error;

use crate::model::{Answer, Comment, Question, QuestionJoin, RecordId};

#[derive(Debug, Error)]
pub enum StoreError {
    /// Failed to reach or open the backing store. At startup this is fatal.
    #[error("store connection failed: {0}")]
    Connect(String),

    /// A lookup failed for reasons other than "not found".
    #[error("query failed: {0}")]
    Query(String),

    /// The fixture dataset is malformed.
    #[error("dataset error: {0}")]
    Dataset(String),
}

/// A page selector: `skip = count * page`, `limit = count`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Page {
    pub count: u32,
    pub page: u32,
}

impl Page {
    pub fn new(count: u32, page: u32) -> Self {
        Self { count, page }
    }

    pub fn skip(&self) -> usize {
        self.count as usize * self.page as usize
    }

    pub fn limit(&self) -> usize {
        self.count as usize
    }

    /// Apply this page to an already-sorted result set.
    pub fn slice<T: Clone>(&self, items: &[T]) -> Vec<T> {
        items
            .iter()
            .skip(self.skip())
            .take(self.limit())
            .cloned()
            .collect()
    }
}

/// Factory for per-worker sessions.
#[async_trait]
pub trait DataStore: Send + Sync {
    async fn open_session(&self) -> Result<Box<dyn StoreSession>, StoreError>;
}

/// One worker's exclusive connection to the backing data service.
///
/// Single-record lookups return `Ok(None)` when the record legitimately
/// does not exist. Paged queries return `Ok(None)` when the *parent* record
/// is unknown, which is distinct from an existing record with an empty
/// page (`Ok(Some(vec![]))`).
#[async_trait]
pub trait StoreSession: Send + Sync {
    async fn question(&self, id: &RecordId) -> Result<Option<Question>, StoreError>;

    async fn question_joins(
        &self,
        id: &RecordId,
        page: Page,
    ) -> Result<Option<Vec<QuestionJoin>>, StoreError>;

    async fn question_latest_comments(
        &self,
        id: &RecordId,
        page: Page,
    ) -> Result<Option<Vec<Comment>>, StoreError>;

    async fn answer(&self, id: &RecordId) -> Result<Option<Answer>, StoreError>;

    /// Answers to a question, best ranking first.
    async fn question_top_answers(
        &self,
        id: &RecordId,
        page: Page,
    ) -> Result<Option<Vec<Answer>>, StoreError>;

    /// Answers to a question, most recently revised first.
    async fn question_latest_answers(
        &self,
        id: &RecordId,
        page: Page,
    ) -> Result<Option<Vec<Answer>>, StoreError>;
}
