//! Positional parameter parsing for task handlers.
//!
//! Errors name the offending argument so the client can tell which part of
//! the request to fix.

use thiserror::Error;

use crate::model::RecordId;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParamError {
    #[error("expecting {expected} parameters, got {got}")]
    Arity { expected: usize, got: usize },

    #[error("{position} argument is not a valid record id")]
    InvalidId { position: &'static str },

    #[error("{position} argument is not an integer")]
    NotAnInteger { position: &'static str },
}

/// Parse `[id]`.
pub fn parse_id(params: &[String]) -> Result<RecordId, ParamError> {
    let [id] = params else {
        return Err(ParamError::Arity {
            expected: 1,
            got: params.len(),
        });
    };
    id.parse().map_err(|_| ParamError::InvalidId { position: "first" })
}

/// Parse `[id, count, page]` for paged queries.
///
/// `count` and `page` must be non-negative integers; negative values fail
/// the same way non-numeric ones do.
pub fn parse_id_count_page(params: &[String]) -> Result<(RecordId, u32, u32), ParamError> {
    let [id, count, page] = params else {
        return Err(ParamError::Arity {
            expected: 3,
            got: params.len(),
        });
    };
    let id = id
        .parse()
        .map_err(|_| ParamError::InvalidId { position: "first" })?;
    let count = count
        .parse::<u32>()
        .map_err(|_| ParamError::NotAnInteger { position: "second" })?;
    let page = page
        .parse::<u32>()
        .map_err(|_| ParamError::NotAnInteger { position: "third" })?;
    Ok((id, count, page))
}
