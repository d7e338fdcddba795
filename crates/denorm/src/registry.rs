//! Task registry and the built-in query tasks.
//!
//! Dispatch is a name → handler map rather than a match statement: adding a
//! task means registering another [`TaskHandler`], not growing a branch in
//! the worker loop. The registry is built at startup and read-only after.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use serde::Serialize;
use thiserror::Error;

use crate::params::{self, ParamError};
use crate::store::{Page, StoreError, StoreSession};

/// Why a task failed. The `Display` text becomes the failure payload sent
/// back to the client.
#[derive(Debug, Error)]
pub enum TaskError {
    #[error("unknown task: {0}")]
    UnknownTask(String),

    #[error(transparent)]
    BadRequest(#[from] ParamError),

    #[error("{0}")]
    Store(#[from] StoreError),

    #[error("failed to encode result: {0}")]
    Encode(#[from] serde_json::Error),
}

/// `Ok(Some(payload))` on success, `Ok(None)` when the task succeeded but
/// found nothing.
pub type TaskOutcome = Result<Option<Vec<u8>>, TaskError>;

/// One query task: validates its parameters and runs against the worker's
/// store session.
#[async_trait]
pub trait TaskHandler: Send + Sync {
    fn name(&self) -> &'static str;

    async fn execute(&self, session: &dyn StoreSession, params: &[String]) -> TaskOutcome;
}

/// Maps task names to handlers.
#[derive(Default)]
pub struct TaskRegistry {
    handlers: HashMap<&'static str, Arc<dyn TaskHandler>>,
}

impl TaskRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// A registry with every built-in query task.
    pub fn builtin() -> Self {
        let mut registry = Self::new();
        registry.register(Arc::new(QuestionTask));
        registry.register(Arc::new(QuestionJoinsTask));
        registry.register(Arc::new(QuestionLatestCommentsTask));
        registry.register(Arc::new(AnswerTask));
        registry.register(Arc::new(QuestionTopAnswersTask));
        registry.register(Arc::new(QuestionLatestAnswersTask));
        registry.register(Arc::new(PingTask));
        registry
    }

    pub fn register(&mut self, handler: Arc<dyn TaskHandler>) {
        self.handlers.insert(handler.name(), handler);
    }

    pub fn lookup(&self, name: &str) -> Option<Arc<dyn TaskHandler>> {
        self.handlers.get(name).cloned()
    }

    /// Registered task names, sorted, for startup logging.
    pub fn task_names(&self) -> Vec<&'static str> {
        let mut names: Vec<_> = self.handlers.keys().copied().collect();
        names.sort_unstable();
        names
    }
}

fn encode<T: Serialize>(value: &T) -> Result<Vec<u8>, TaskError> {
    Ok(serde_json::to_vec(value)?)
}

fn paged<T: Serialize>(found: Option<Vec<T>>) -> TaskOutcome {
    match found {
        Some(items) => Ok(Some(encode(&items)?)),
        None => Ok(None),
    }
}

struct QuestionTask;

#[async_trait]
impl TaskHandler for QuestionTask {
    fn name(&self) -> &'static str {
        "question"
    }

    async fn execute(&self, session: &dyn StoreSession, params: &[String]) -> TaskOutcome {
        let id = params::parse_id(params)?;
        match session.question(&id).await? {
            Some(question) => Ok(Some(encode(&question)?)),
            None => Ok(None),
        }
    }
}

struct QuestionJoinsTask;

#[async_trait]
impl TaskHandler for QuestionJoinsTask {
    fn name(&self) -> &'static str {
        "questionJoins"
    }

    async fn execute(&self, session: &dyn StoreSession, params: &[String]) -> TaskOutcome {
        let (id, count, page) = params::parse_id_count_page(params)?;
        paged(session.question_joins(&id, Page::new(count, page)).await?)
    }
}

struct QuestionLatestCommentsTask;

#[async_trait]
impl TaskHandler for QuestionLatestCommentsTask {
    fn name(&self) -> &'static str {
        "questionLatestComments"
    }

    async fn execute(&self, session: &dyn StoreSession, params: &[String]) -> TaskOutcome {
        let (id, count, page) = params::parse_id_count_page(params)?;
        paged(
            session
                .question_latest_comments(&id, Page::new(count, page))
                .await?,
        )
    }
}

struct AnswerTask;

#[async_trait]
impl TaskHandler for AnswerTask {
    fn name(&self) -> &'static str {
        "answer"
    }

    async fn execute(&self, session: &dyn StoreSession, params: &[String]) -> TaskOutcome {
        let id = params::parse_id(params)?;
        match session.answer(&id).await? {
            Some(answer) => Ok(Some(encode(&answer)?)),
            None => Ok(None),
        }
    }
}

struct QuestionTopAnswersTask;

#[async_trait]
impl TaskHandler for QuestionTopAnswersTask {
    fn name(&self) -> &'static str {
        "questionTopAnswers"
    }

    async fn execute(&self, session: &dyn StoreSession, params: &[String]) -> TaskOutcome {
        let (id, count, page) = params::parse_id_count_page(params)?;
        paged(
            session
                .question_top_answers(&id, Page::new(count, page))
                .await?,
        )
    }
}

struct QuestionLatestAnswersTask;

#[async_trait]
impl TaskHandler for QuestionLatestAnswersTask {
    fn name(&self) -> &'static str {
        "questionLatestAnswers"
    }

    async fn execute(&self, session: &dyn StoreSession, params: &[String]) -> TaskOutcome {
        let (id, count, page) = params::parse_id_count_page(params)?;
        paged(
            session
                .question_latest_answers(&id, Page::new(count, page))
                .await?,
        )
    }
}

/// Liveness probe; never touches the store.
struct PingTask;

#[async_trait]
impl TaskHandler for PingTask {
    fn name(&self) -> &'static str {
        "ping"
    }

    async fn execute(&self, _session: &dyn StoreSession, params: &[String]) -> TaskOutcome {
        if !params.is_empty() {
            return Err(ParamError::Arity {
                expected: 0,
                got: params.len(),
            }
            .into());
        }
        Ok(Some(b"pong".to_vec()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Coordinates, Location, Question, QuestionJoin};
    use crate::store::{DataStore, Dataset, MemoryStore};

    const QID: &str = "53fb63a4472dcb6b32e99260";

    fn strings(parts: &[&str]) -> Vec<String> {
        parts.iter().map(|s| s.to_string()).collect()
    }

    async fn session() -> Box<dyn StoreSession> {
        let mut dataset = Dataset {
            questions: vec![Question {
                id: QID.parse().unwrap(),
                ts: 1408812900,
                loc: Location {
                    crd: Coordinates { lat: 1.0, lon: 2.0 },
                    path: vec![],
                },
                title: "title".into(),
                content: "content".into(),
                joins: 2,
            }],
            ..Dataset::default()
        };
        dataset.joins.insert(
            QID.into(),
            vec![
                QuestionJoin {
                    uid: "000000000000000000000001".parse().unwrap(),
                    udisp: "alice".into(),
                },
                QuestionJoin {
                    uid: "000000000000000000000002".parse().unwrap(),
                    udisp: "bob".into(),
                },
            ],
        );
        MemoryStore::new(dataset).unwrap().open_session().await.unwrap()
    }

    #[test]
    fn builtin_registers_all_tasks() {
        let registry = TaskRegistry::builtin();
        assert_eq!(
            registry.task_names(),
            vec![
                "answer",
                "ping",
                "question",
                "questionJoins",
                "questionLatestAnswers",
                "questionLatestComments",
                "questionTopAnswers",
            ]
        );
        assert!(registry.lookup("nope").is_none());
    }

    #[tokio::test]
    async fn question_returns_serialized_record() {
        let session = session().await;
        let handler = TaskRegistry::builtin().lookup("question").unwrap();
        let payload = handler
            .execute(session.as_ref(), &strings(&[QID]))
            .await
            .unwrap()
            .unwrap();
        let value: serde_json::Value = serde_json::from_slice(&payload).unwrap();
        assert_eq!(value["id"], QID);
        assert_eq!(value["title"], "title");
    }

    #[tokio::test]
    async fn question_not_found_is_none() {
        let session = session().await;
        let handler = TaskRegistry::builtin().lookup("question").unwrap();
        let outcome = handler
            .execute(session.as_ref(), &strings(&["000000000000000000000099"]))
            .await
            .unwrap();
        assert!(outcome.is_none());
    }

    #[tokio::test]
    async fn question_joins_pages() {
        let session = session().await;
        let handler = TaskRegistry::builtin().lookup("questionJoins").unwrap();
        let payload = handler
            .execute(session.as_ref(), &strings(&[QID, "1", "1"]))
            .await
            .unwrap()
            .unwrap();
        let joins: Vec<QuestionJoin> = serde_json::from_slice(&payload).unwrap();
        assert_eq!(joins.len(), 1);
        assert_eq!(joins[0].udisp, "bob");
    }

    #[tokio::test]
    async fn bad_count_names_the_argument() {
        let session = session().await;
        let handler = TaskRegistry::builtin().lookup("questionJoins").unwrap();
        let err = handler
            .execute(session.as_ref(), &strings(&[QID, "abc", "1"]))
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "second argument is not an integer");
    }

    #[tokio::test]
    async fn ping_is_literal_pong() {
        let session = session().await;
        let handler = TaskRegistry::builtin().lookup("ping").unwrap();
        let payload = handler
            .execute(session.as_ref(), &[])
            .await
            .unwrap()
            .unwrap();
        assert_eq!(payload, b"pong");
    }

    #[tokio::test]
    async fn ping_rejects_parameters() {
        let session = session().await;
        let handler = TaskRegistry::builtin().lookup("ping").unwrap();
        let err = handler
            .execute(session.as_ref(), &strings(&["extra"]))
            .await
            .unwrap_err();
        assert!(err.to_string().contains("expecting 0 parameters"));
    }
}
