//! # Kagami Client
//!
//! External collaborators of the replication engine:
//! - the source wikibase (entity reads, root enumeration via SPARQL)
//! - the target wikibase (entity writes, property search, mapping reload)
//! - the schema host (ShExJ document fetch)
//!
//! The engine only sees the traits; [`WikibaseClient`] and [`SparqlClient`]
//! are the reqwest-backed implementations.

pub mod api;
pub mod sparql;

pub use api::WikibaseClient;
pub use sparql::SparqlClient;

use async_trait::async_trait;
use kagami_core::{Entity, EntityEdit, EntityId};

/// Client operation result type
pub type ClientResult<T> = Result<T, ClientError>;

/// Client error types
#[derive(thiserror::Error, Debug)]
pub enum ClientError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("entity model error: {0}")]
    Model(#[from] kagami_core::ModelError),

    #[error("API error: {code} - {message}")]
    Api { code: String, message: String },

    #[error("authentication failed: {0}")]
    Auth(String),

    #[error("entity {0} not found on the source")]
    NotFound(EntityId),

    #[error("configuration error: {0}")]
    Config(String),
}

impl ClientError {
    /// Whether the target rejected a property because it does not know the
    /// datatype; the engine caches the source id as permanently invalid on
    /// this error instead of failing the entity.
    pub fn is_unrecognized_datatype(&self) -> bool {
        match self {
            ClientError::Api { code, message } => {
                code.contains("not-recognized-datatype")
                    || message.contains("not-recognized-datatype")
            }
            _ => false,
        }
    }
}

/// Wikibase connection configuration
#[derive(Debug, Clone)]
pub struct WikibaseConfig {
    /// Base URL of the wiki (e.g. `https://www.wikidata.org`)
    pub base_url: String,
    /// SPARQL endpoint, when the instance has one
    pub sparql_endpoint: Option<String>,
    /// Bot credentials for `action=login`
    pub username: Option<String>,
    pub password: Option<String>,
    /// HTTP Basic credentials for proxied private instances
    pub basic_auth: Option<(String, String)>,
    pub timeout_seconds: u64,
}

impl WikibaseConfig {
    pub fn new(base_url: &str) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            sparql_endpoint: None,
            username: None,
            password: None,
            basic_auth: None,
            timeout_seconds: 30,
        }
    }

    pub fn with_sparql_endpoint(mut self, endpoint: &str) -> Self {
        self.sparql_endpoint = Some(endpoint.to_string());
        self
    }

    pub fn with_credentials(mut self, username: &str, password: &str) -> Self {
        self.username = Some(username.to_string());
        self.password = Some(password.to_string());
        self
    }

    pub fn with_basic_auth(mut self, username: &str, password: &str) -> Self {
        self.basic_auth = Some((username.to_string(), password.to_string()));
        self
    }

    pub fn with_timeout(mut self, seconds: u64) -> Self {
        self.timeout_seconds = seconds;
        self
    }

    /// Action API endpoint of this wiki
    pub fn api_url(&self) -> String {
        format!("{}/w/api.php", self.base_url)
    }

    /// Canonical concept URI of an entity on this wiki
    pub fn entity_uri(&self, id: &EntityId) -> String {
        format!("{}/entity/{}", self.base_url, id)
    }
}

/// Read side: the wikibase entities are copied from
#[async_trait]
pub trait SourceRepository: Send + Sync {
    /// Fetch one entity with terms restricted to the given languages
    async fn fetch_entity(&self, id: &EntityId, languages: &[String]) -> ClientResult<Entity>;

    /// Run a SPARQL query and return the entity URIs it selects, in order
    async fn entity_uris(&self, query: &str) -> ClientResult<Vec<String>>;

    /// Canonical URI of a source entity, recorded as provenance on the target
    fn entity_uri(&self, id: &EntityId) -> String;
}

/// Write side: the wikibase entities are copied to
#[async_trait]
pub trait TargetRepository: Send + Sync {
    /// Create or update one entity; returns the target id
    async fn write_entity(&self, edit: &EntityEdit) -> ClientResult<EntityId>;

    /// Find a property by exact label match
    async fn search_property(&self, label: &str, language: &str)
        -> ClientResult<Option<EntityId>>;

    /// Load persisted provenance links: (target id, source entity URI) pairs
    async fn mapping_rows(
        &self,
        provenance_property: &EntityId,
    ) -> ClientResult<Vec<(EntityId, String)>>;
}

/// Where schema documents come from
#[async_trait]
pub trait SchemaSource: Send + Sync {
    /// Fetch the ShExJ text behind a schema URI
    async fn fetch(&self, uri: &str) -> ClientResult<String>;
}
