//! In-memory Data Service backed by a JSON fixture dataset.
//!
//! Plays the role of the backing database for local runs and tests. A real
//! store is a drop-in [`DataStore`] impl; nothing in the dispatch engine
//! knows the difference.

use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::model::{Answer, Comment, Question, QuestionJoin, RecordId};

use super::{DataStore, Page, StoreError, StoreSession};

/// The raw dataset as loaded from JSON: records plus the per-question join
/// and comment lists, keyed by question id.
#[derive(Debug, Default, Clone, Serialize, Deserialize)]
pub struct Dataset {
    #[serde(default)]
    pub questions: Vec<Question>,
    #[serde(default)]
    pub answers: Vec<Answer>,
    #[serde(default)]
    pub joins: HashMap<String, Vec<QuestionJoin>>,
    #[serde(default)]
    pub comments: HashMap<String, Vec<Comment>>,
}

/// Indexed view of the dataset, shared by all sessions.
///
/// Comments are pre-sorted newest first; answers per question are re-sorted
/// per query since top/latest want different orders.
#[derive(Debug, Default)]
struct Indexed {
    questions: HashMap<RecordId, Question>,
    answers: HashMap<RecordId, Answer>,
    joins: HashMap<RecordId, Vec<QuestionJoin>>,
    comments: HashMap<RecordId, Vec<Comment>>,
    answers_by_question: HashMap<RecordId, Vec<Answer>>,
}

#[derive(Debug)]
pub struct MemoryStore {
    inner: Arc<Indexed>,
}

impl MemoryStore {
    /// Index a dataset. Fails if a join/comment key is not a record id.
    pub fn new(dataset: Dataset) -> Result<Self, StoreError> {
        let mut indexed = Indexed::default();

        for question in dataset.questions {
            indexed.questions.insert(question.id.clone(), question);
        }
        for answer in dataset.answers {
            indexed
                .answers_by_question
                .entry(answer.qid.clone())
                .or_default()
                .push(answer.clone());
            indexed.answers.insert(answer.id.clone(), answer);
        }
        for (key, joins) in dataset.joins {
            indexed.joins.insert(parse_key(&key)?, joins);
        }
        for (key, mut comments) in dataset.comments {
            comments.sort_by_key(|c| std::cmp::Reverse(c.ts));
            indexed.comments.insert(parse_key(&key)?, comments);
        }

        Ok(Self {
            inner: Arc::new(indexed),
        })
    }

    /// Load a dataset from a JSON file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path)
            .map_err(|e| StoreError::Connect(format!("{}: {e}", path.display())))?;
        let dataset: Dataset = serde_json::from_str(&raw)
            .map_err(|e| StoreError::Dataset(format!("{}: {e}", path.display())))?;
        Self::new(dataset)
    }

    /// A store with no data; every lookup comes back not-found.
    pub fn empty() -> Self {
        Self {
            inner: Arc::new(Indexed::default()),
        }
    }
}

fn parse_key(key: &str) -> Result<RecordId, StoreError> {
    key.parse()
        .map_err(|_| StoreError::Dataset(format!("'{key}' is not a valid record id key")))
}

#[async_trait]
impl DataStore for MemoryStore {
    async fn open_session(&self) -> Result<Box<dyn StoreSession>, StoreError> {
        Ok(Box::new(MemorySession {
            data: Arc::clone(&self.inner),
        }))
    }
}

struct MemorySession {
    data: Arc<Indexed>,
}

impl MemorySession {
    fn has_question(&self, id: &RecordId) -> bool {
        self.data.questions.contains_key(id)
    }

    fn question_answers(&self, id: &RecordId) -> Vec<Answer> {
        self.data
            .answers_by_question
            .get(id)
            .cloned()
            .unwrap_or_default()
    }
}

#[async_trait]
impl StoreSession for MemorySession {
    async fn question(&self, id: &RecordId) -> Result<Option<Question>, StoreError> {
        Ok(self.data.questions.get(id).cloned())
    }

    async fn question_joins(
        &self,
        id: &RecordId,
        page: Page,
    ) -> Result<Option<Vec<QuestionJoin>>, StoreError> {
        if !self.has_question(id) {
            return Ok(None);
        }
        let joins = self.data.joins.get(id).map(Vec::as_slice).unwrap_or(&[]);
        Ok(Some(page.slice(joins)))
    }

    async fn question_latest_comments(
        &self,
        id: &RecordId,
        page: Page,
    ) -> Result<Option<Vec<Comment>>, StoreError> {
        if !self.has_question(id) {
            return Ok(None);
        }
        let comments = self.data.comments.get(id).map(Vec::as_slice).unwrap_or(&[]);
        Ok(Some(page.slice(comments)))
    }

    async fn answer(&self, id: &RecordId) -> Result<Option<Answer>, StoreError> {
        Ok(self.data.answers.get(id).cloned())
    }

    async fn question_top_answers(
        &self,
        id: &RecordId,
        page: Page,
    ) -> Result<Option<Vec<Answer>>, StoreError> {
        if !self.has_question(id) {
            return Ok(None);
        }
        let mut answers = self.question_answers(id);
        answers.sort_by_key(|a| std::cmp::Reverse(a.ranking));
        Ok(Some(page.slice(&answers)))
    }

    async fn question_latest_answers(
        &self,
        id: &RecordId,
        page: Page,
    ) -> Result<Option<Vec<Answer>>, StoreError> {
        if !self.has_question(id) {
            return Ok(None);
        }
        let mut answers = self.question_answers(id);
        answers.sort_by_key(|a| std::cmp::Reverse(a.lts));
        Ok(Some(page.slice(&answers)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Coordinates, Location};

    fn rid(n: u8) -> RecordId {
        format!("{:024x}", u128::from(n)).parse().unwrap()
    }

    fn question(n: u8) -> Question {
        Question {
            id: rid(n),
            ts: 1_000 + i64::from(n),
            loc: Location {
                crd: Coordinates { lat: 0.0, lon: 0.0 },
                path: vec![],
            },
            title: format!("q{n}"),
            content: String::new(),
            joins: 0,
        }
    }

    fn answer(n: u8, qid: u8, ranking: i64, lts: i64) -> Answer {
        Answer {
            id: rid(n),
            lts,
            fts: lts - 10,
            qid: rid(qid),
            fuid: rid(200),
            luid: rid(200),
            fudisp: "u".into(),
            ludisp: "u".into(),
            anon: false,
            locs: vec![],
            content: format!("a{n}"),
            ranking,
            thanks: 0,
            thumbups: 0,
            thumbdowns: 0,
        }
    }

    fn store() -> MemoryStore {
        let mut dataset = Dataset {
            questions: vec![question(1)],
            answers: vec![
                answer(10, 1, 5, 100),
                answer(11, 1, 9, 50),
                answer(12, 1, 1, 200),
            ],
            ..Dataset::default()
        };
        dataset.joins.insert(
            rid(1).to_string(),
            (0..7)
                .map(|i| QuestionJoin {
                    uid: rid(100 + i),
                    udisp: format!("user{i}"),
                })
                .collect(),
        );
        dataset.comments.insert(
            rid(1).to_string(),
            vec![
                Comment {
                    id: rid(20),
                    uid: rid(100),
                    udisp: "user0".into(),
                    ts: 10,
                    content: "old".into(),
                },
                Comment {
                    id: rid(21),
                    uid: rid(101),
                    udisp: "user1".into(),
                    ts: 99,
                    content: "new".into(),
                },
            ],
        );
        MemoryStore::new(dataset).unwrap()
    }

    #[tokio::test]
    async fn question_lookup() {
        let session = store().open_session().await.unwrap();
        let found = session.question(&rid(1)).await.unwrap().unwrap();
        assert_eq!(found.title, "q1");
        assert!(session.question(&rid(2)).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn joins_are_paged() {
        let session = store().open_session().await.unwrap();
        let page0 = session
            .question_joins(&rid(1), Page::new(5, 0))
            .await
            .unwrap()
            .unwrap();
        let page1 = session
            .question_joins(&rid(1), Page::new(5, 1))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(page0.len(), 5);
        assert_eq!(page1.len(), 2);
        assert_eq!(page1[0].udisp, "user5");
    }

    #[tokio::test]
    async fn paged_queries_distinguish_missing_parent_from_empty_page() {
        let session = store().open_session().await.unwrap();
        assert!(session
            .question_joins(&rid(2), Page::new(5, 0))
            .await
            .unwrap()
            .is_none());
        // Page far past the end of an existing question: empty, not missing.
        let far = session
            .question_joins(&rid(1), Page::new(5, 9))
            .await
            .unwrap()
            .unwrap();
        assert!(far.is_empty());
    }

    #[tokio::test]
    async fn comments_come_newest_first() {
        let session = store().open_session().await.unwrap();
        let comments = session
            .question_latest_comments(&rid(1), Page::new(10, 0))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(comments[0].content, "new");
        assert_eq!(comments[1].content, "old");
    }

    #[tokio::test]
    async fn top_answers_order_by_ranking() {
        let session = store().open_session().await.unwrap();
        let answers = session
            .question_top_answers(&rid(1), Page::new(10, 0))
            .await
            .unwrap()
            .unwrap();
        let rankings: Vec<i64> = answers.iter().map(|a| a.ranking).collect();
        assert_eq!(rankings, vec![9, 5, 1]);
    }

    #[tokio::test]
    async fn latest_answers_order_by_revision_time() {
        let session = store().open_session().await.unwrap();
        let answers = session
            .question_latest_answers(&rid(1), Page::new(10, 0))
            .await
            .unwrap()
            .unwrap();
        let times: Vec<i64> = answers.iter().map(|a| a.lts).collect();
        assert_eq!(times, vec![200, 100, 50]);
    }

    #[test]
    fn bad_join_key_is_a_dataset_error() {
        let mut dataset = Dataset::default();
        dataset.joins.insert("not-an-id".into(), vec![]);
        let err = MemoryStore::new(dataset).unwrap_err();
        assert!(matches!(err, StoreError::Dataset(_)));
    }

    #[test]
    fn from_file_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("dataset.json");
        let dataset = Dataset {
            questions: vec![question(1)],
            ..Dataset::default()
        };
        std::fs::write(&path, serde_json::to_vec(&dataset).unwrap()).unwrap();

        let store = MemoryStore::from_file(&path).unwrap();
        assert!(store.inner.questions.contains_key(&rid(1)));
    }

    #[test]
    fn missing_file_is_a_connect_error() {
        let err = MemoryStore::from_file("/nonexistent/dataset.json").unwrap_err();
        assert!(matches!(err, StoreError::Connect(_)));
    }
}
