//! # Kagami Core
//!
//! Wikibase エンティティモデルとワイヤ JSON 処理
//! Data model shared by every kagami crate: entities, claims, snaks, the
//! closed datatype sum, predicate vocabulary and the target-side edit model.

pub mod edit;
pub mod json;
pub mod model;
pub mod vocab;

pub use edit::*;
pub use json::{entity_from_json, snak_from_json, statement_from_json};
pub use model::*;
pub use vocab::{classify, property_id, PredicateKind};

// Error types
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ModelError {
    #[error("malformed entity json: {0}")]
    Malformed(String),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
}
