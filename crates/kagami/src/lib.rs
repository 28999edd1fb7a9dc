//! # 🪞 Kagami - Wikibase Subgraph Replication
//!
//! Kagami (鏡, "mirror") replicates a schema-selected subgraph of one
//! Wikibase-style knowledge base into another: a shape expression decides
//! which properties, qualifiers, references and linked entities are in
//! scope, and a cycle-aware recursive copier mirrors them onto the target
//! behind an idempotent identity mapping.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use kagami::prelude::*;
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let source = Arc::new(WikibaseClient::new(
//!         WikibaseConfig::new("https://www.wikidata.org")
//!             .with_sparql_endpoint("https://query.wikidata.org/sparql"),
//!     )?);
//!     let target = Arc::new(WikibaseClient::new(
//!         WikibaseConfig::new("https://wikibase.example")
//!             .with_credentials("bot", "secret"),
//!     )?);
//!
//!     let schema_text = source.fetch("https://example.org/schema.shexj").await?;
//!     let schema = parse_schema_str(&schema_text)?;
//!
//!     let mut replicator = Replicator::new(source, target, ReplicatorConfig::default());
//!     replicator.initialize().await?;
//!     let report = replicator
//!         .run(&schema, "SELECT ?item WHERE { ?item wdt:P31 wd:Q5 } LIMIT 10")
//!         .await?;
//!     println!("{} roots copied", report.copied());
//!     Ok(())
//! }
//! ```
//!
//! ## Architecture
//!
//! Kagami consists of several specialized crates:
//!
//! - **`kagami-core`**: entity/claim/snak data model and wire JSON handling
//! - **`kagami-shex`**: shape tree model, ShExJ loader and generic walker
//! - **`kagami-mapping`**: source-to-target identity cache
//! - **`kagami-client`**: MediaWiki Action API and SPARQL collaborators
//! - **`kagami-engine`**: subset extraction, replication, statement building
//! - **`kagami-cli`**: command-line interface

pub use kagami_client as client;
pub use kagami_core as core;
pub use kagami_engine as engine;
pub use kagami_mapping as mapping;
pub use kagami_shex as shex;

// Convenience re-exports for common types
pub use kagami_client::{SchemaSource, SourceRepository, TargetRepository, WikibaseClient, WikibaseConfig};
pub use kagami_core::{Entity, EntityId, EntityKind};
pub use kagami_engine::{ReplicationError, Replicator, ReplicatorConfig, RunReport};
pub use kagami_mapping::{Mapped, MappingCache};
pub use kagami_shex::{parse_schema, parse_schema_str, ShapeSchema};

// Commonly used external dependencies
pub use anyhow;
pub use serde;
pub use serde_json;
pub use tokio;

/// Prelude module for convenient imports
///
/// ```rust
/// use kagami::prelude::*;
/// ```
pub mod prelude {
    pub use crate::{
        parse_schema, parse_schema_str, Entity, EntityId, EntityKind, Mapped, MappingCache,
        ReplicationError, Replicator, ReplicatorConfig, RunReport, SchemaSource, ShapeSchema,
        SourceRepository, TargetRepository, WikibaseClient, WikibaseConfig,
    };
    pub use anyhow::Result;
    pub use serde::{Deserialize, Serialize};
    pub use serde_json::Value;
}

/// Current version of Kagami
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
