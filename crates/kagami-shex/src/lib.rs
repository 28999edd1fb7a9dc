//! # Kagami ShEx
//!
//! シェイプ式スキーマの読み込みと走査
//! This crate holds the shape tree consumed by the subset extractor:
//! - shape tree model (Model)
//! - ShExJ loading (Loader)
//! - generic pre-order traversal (Walker)
//!
//! Compiling ShEx compact syntax is the job of an external collaborator;
//! the loader consumes its JSON output (ShExJ) and nothing else.

pub mod loader;
pub mod model;
pub mod walker;

// Re-exports
pub use loader::{parse_schema, parse_schema_str};
pub use model::{NodeConstraint, Shape, ShapeExpr, ShapeLabel, ShapeOr, ShapeSchema, TripleConstraint};
pub use walker::{walk, ShapeHandler};

// Error types
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ShexError {
    #[error("Parse error: {0}")]
    Parse(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Unsupported shape expression: {0}")]
    Unsupported(String),

    #[error("schema has no start shape")]
    MissingStart,

    #[error("schema has no shape named {0}")]
    UnknownShape(String),
}
