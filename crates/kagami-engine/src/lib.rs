//! # Kagami Engine
//!
//! スキーマ誘導型レプリケーションエンジン
//! The replication core: walks a shape schema to derive per-entity copy
//! subsets, recursively copies every linked property and entity through an
//! idempotent mapping cache, and translates source snaks into target
//! statements.
//!
//! - subset extraction (Subset)
//! - entity replication (Replicator)
//! - statement construction (Statement)

pub mod replicator;
pub mod statement;
pub mod subset;

// Re-exports
pub use kagami_mapping::{Mapped, MappingCache};
pub use replicator::{Replicator, ReplicatorConfig};
pub use subset::{collect_schema_properties, extract_subset, CopySubset, LinkedCopy, PropertyScope};

use chrono::{DateTime, Utc};
use kagami_core::EntityId;
use serde::Serialize;
use uuid::Uuid;

// Error types
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ReplicationError {
    #[error("Schema error: {0}")]
    Schema(#[from] kagami_shex::ShexError),

    #[error("Client error: {0}")]
    Client(#[from] kagami_client::ClientError),

    #[error("target write failed for {entity}: {source}")]
    TargetWrite {
        entity: EntityId,
        source: kagami_client::ClientError,
    },

    #[error("recursion depth limit {0} exceeded")]
    DepthExceeded(usize),

    #[error("Unknown error: {0}")]
    Unknown(String),
}

/// What happened to one root entity
#[derive(Debug, Clone, Serialize)]
pub struct RootOutcome {
    pub source: EntityId,
    pub result: RootResult,
}

#[derive(Debug, Clone, Serialize)]
pub enum RootResult {
    /// Copied (or already present); the target-side id
    Copied(EntityId),
    /// Permanently rejected by the target
    Invalid,
    /// Failed; the run continued with the next root
    Failed(String),
}

/// Report of one replication run: per root entity, either a target id or a
/// failure reason
#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub id: Uuid,
    pub started_at: DateTime<Utc>,
    pub outcomes: Vec<RootOutcome>,
}

impl RunReport {
    pub fn new() -> Self {
        Self {
            id: Uuid::new_v4(),
            started_at: Utc::now(),
            outcomes: Vec::new(),
        }
    }

    pub fn push(&mut self, outcome: RootOutcome) {
        self.outcomes.push(outcome);
    }

    /// Number of roots that ended with a target id
    pub fn copied(&self) -> usize {
        self.outcomes
            .iter()
            .filter(|outcome| matches!(outcome.result, RootResult::Copied(_)))
            .count()
    }

    /// Number of roots that failed
    pub fn failed(&self) -> usize {
        self.outcomes
            .iter()
            .filter(|outcome| matches!(outcome.result, RootResult::Failed(_)))
            .count()
    }
}

impl Default for RunReport {
    fn default() -> Self {
        Self::new()
    }
}
