//! # Kagami CLI Library
//!
//! Wikibase レプリケーションのコマンドラインインターフェース
//! Command-line front end for schema-guided wikibase replication.

pub mod commands;

pub use commands::*;
