//! Denormalized Q&A records served by the query tasks.
//!
//! Field names mirror the backing data set (`ts`, `uid`, `udisp`, ...), so
//! payloads serialize to the exact JSON shape clients already consume.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// A 24-character hex record identifier.
///
/// The original data set used BSON ObjectIds; the core treats ids as opaque
/// beyond this shape check.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RecordId(String);

/// The string does not look like a record id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("not a valid record id")]
pub struct InvalidRecordId;

impl RecordId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::str::FromStr for RecordId {
    type Err = InvalidRecordId;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.len() == 24 && s.bytes().all(|b| b.is_ascii_hexdigit()) {
            Ok(Self(s.to_string()))
        } else {
            Err(InvalidRecordId)
        }
    }
}

impl std::fmt::Display for RecordId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Coordinates {
    pub lat: f32,
    pub lon: f32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Location {
    pub crd: Coordinates,
    pub path: Vec<String>,
}

/// A question denormalized to its latest revision.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Question {
    pub id: RecordId,
    pub ts: i64,
    pub loc: Location,
    pub title: String,
    pub content: String,
    pub joins: i64,
}

/// A user who joined a question.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuestionJoin {
    pub uid: RecordId,
    pub udisp: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Comment {
    pub id: RecordId,
    pub uid: RecordId,
    pub udisp: String,
    pub ts: i64,
    pub content: String,
}

/// An answer denormalized to its latest revision. `fts`/`fuid` describe the
/// first revision, `lts`/`luid` the latest one.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Answer {
    pub id: RecordId,
    pub lts: i64,
    pub fts: i64,
    pub qid: RecordId,
    pub fuid: RecordId,
    pub luid: RecordId,
    pub fudisp: String,
    pub ludisp: String,
    pub anon: bool,
    pub locs: Vec<Location>,
    pub content: String,
    pub ranking: i64,
    pub thanks: i64,
    pub thumbups: i64,
    pub thumbdowns: i64,
}
