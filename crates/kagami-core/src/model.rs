//! Entity, claim and snak data models for wikibase replication

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

/// Identifier of an item ("Q42") or property ("P31") in a wikibase instance
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct EntityId(String);

impl EntityId {
    /// Create a new entity id
    pub fn new<S: Into<String>>(id: S) -> Self {
        EntityId(id.into())
    }

    /// Get the id as a string slice
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Check whether this id names a property
    pub fn is_property(&self) -> bool {
        self.0.starts_with('P')
    }

    /// Check whether this id names an item
    pub fn is_item(&self) -> bool {
        self.0.starts_with('Q')
    }

    /// The entity kind implied by the id prefix
    pub fn kind(&self) -> EntityKind {
        if self.is_property() {
            EntityKind::Property
        } else {
            EntityKind::Item
        }
    }

    /// Extract the trailing entity id from a canonical entity URI
    /// (e.g. `http://www.wikidata.org/entity/Q42` -> `Q42`)
    pub fn from_uri(uri: &str) -> Option<EntityId> {
        let tail = uri.trim_end_matches('/').rsplit(['/', '#']).next()?;
        let mut chars = tail.chars();
        match chars.next() {
            Some('Q') | Some('P') => {
                let rest = &tail[1..];
                if !rest.is_empty() && rest.chars().all(|c| c.is_ascii_digit()) {
                    Some(EntityId::new(tail))
                } else {
                    None
                }
            }
            _ => None,
        }
    }
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for EntityId {
    fn from(s: &str) -> Self {
        EntityId::new(s)
    }
}

impl From<String> for EntityId {
    fn from(s: String) -> Self {
        EntityId(s)
    }
}

impl AsRef<str> for EntityId {
    fn as_ref(&self) -> &str {
        self.as_str()
    }
}

/// Kind of a wikibase entity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntityKind {
    Item,
    Property,
}

impl EntityKind {
    /// Wire name as used by the Action API
    pub fn as_str(&self) -> &'static str {
        match self {
            EntityKind::Item => "item",
            EntityKind::Property => "property",
        }
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Snak kind: a concrete value, an explicit "no value" or an unknown value
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SnakKind {
    Value,
    NoValue,
    SomeValue,
}

/// Declared datatype of a snak
///
/// Closed sum so the statement builder dispatch is exhaustive; datatypes we
/// do not translate stay observable through `Other`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Datatype {
    WikibaseItem,
    WikibaseProperty,
    Time,
    MonolingualText,
    ExternalId,
    Str,
    Url,
    CommonsMedia,
    GeoShape,
    GlobeCoordinate,
    Quantity,
    Other(String),
}

impl Datatype {
    /// Parse a wire datatype name
    pub fn parse(s: &str) -> Datatype {
        match s {
            "wikibase-item" => Datatype::WikibaseItem,
            "wikibase-property" => Datatype::WikibaseProperty,
            "time" => Datatype::Time,
            "monolingualtext" => Datatype::MonolingualText,
            "external-id" => Datatype::ExternalId,
            "string" => Datatype::Str,
            "url" => Datatype::Url,
            "commonsMedia" => Datatype::CommonsMedia,
            "geo-shape" => Datatype::GeoShape,
            "globe-coordinate" => Datatype::GlobeCoordinate,
            "quantity" => Datatype::Quantity,
            other => Datatype::Other(other.to_string()),
        }
    }

    /// Wire datatype name
    pub fn as_str(&self) -> &str {
        match self {
            Datatype::WikibaseItem => "wikibase-item",
            Datatype::WikibaseProperty => "wikibase-property",
            Datatype::Time => "time",
            Datatype::MonolingualText => "monolingualtext",
            Datatype::ExternalId => "external-id",
            Datatype::Str => "string",
            Datatype::Url => "url",
            Datatype::CommonsMedia => "commonsMedia",
            Datatype::GeoShape => "geo-shape",
            Datatype::GlobeCoordinate => "globe-coordinate",
            Datatype::Quantity => "quantity",
            Datatype::Other(name) => name,
        }
    }
}

impl fmt::Display for Datatype {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Payload of a value snak
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum DataValue {
    /// Reference to another item or property
    Entity(EntityId),
    /// Point in time with precision and timezone offset
    Time {
        time: String,
        precision: u8,
        timezone: i32,
    },
    /// Text in a single named language
    Monolingual { text: String, language: String },
    /// Globe coordinate
    Coordinate {
        latitude: f64,
        longitude: f64,
        precision: Option<f64>,
    },
    /// Numeric amount; units are not converted
    Quantity { amount: String },
    /// Plain text payload (string, url, external-id, media name, geo shape)
    Text(String),
}

/// A single value assignment: datatype tag plus payload
///
/// `NoValue`/`SomeValue` snaks carry no usable payload and are never turned
/// into target statements.
#[derive(Debug, Clone, PartialEq)]
pub struct Snak {
    pub kind: SnakKind,
    pub datatype: Datatype,
    pub value: Option<DataValue>,
}

/// Snaks of one property, as they appear in qualifier and reference maps
#[derive(Debug, Clone, PartialEq)]
pub struct SnakGroup {
    pub property: EntityId,
    pub snaks: Vec<Snak>,
}

/// One reference group: a set of snaks keyed by property
#[derive(Debug, Clone, PartialEq)]
pub struct ReferenceGroup {
    pub snaks: Vec<SnakGroup>,
}

/// A statement: main snak plus qualifier snaks and reference groups
#[derive(Debug, Clone, PartialEq)]
pub struct Statement {
    pub mainsnak: Snak,
    pub qualifiers: Vec<SnakGroup>,
    pub references: Vec<ReferenceGroup>,
}

/// All statements asserted for one property
#[derive(Debug, Clone, PartialEq)]
pub struct Claim {
    pub property: EntityId,
    pub statements: Vec<Statement>,
}

/// A source entity as read from the wire
#[derive(Debug, Clone)]
pub struct Entity {
    pub id: EntityId,
    pub kind: EntityKind,
    /// Present for properties only
    pub datatype: Option<Datatype>,
    /// language -> label text
    pub labels: HashMap<String, String>,
    /// language -> description text
    pub descriptions: HashMap<String, String>,
    pub claims: Vec<Claim>,
}

impl Entity {
    /// Look up the claim for one property
    pub fn claim(&self, property: &EntityId) -> Option<&Claim> {
        self.claims.iter().find(|c| &c.property == property)
    }

    /// Label in the given language
    pub fn label(&self, language: &str) -> Option<&str> {
        self.labels.get(language).map(String::as_str)
    }

    /// Description in the given language
    pub fn description(&self, language: &str) -> Option<&str> {
        self.descriptions.get(language).map(String::as_str)
    }

    /// Entity ids appearing as main values of the given property
    pub fn main_entity_values(&self, property: &EntityId) -> Vec<EntityId> {
        self.claim(property)
            .map(|claim| {
                claim
                    .statements
                    .iter()
                    .filter_map(|st| match &st.mainsnak.value {
                        Some(DataValue::Entity(id)) => Some(id.clone()),
                        _ => None,
                    })
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Entity ids appearing as values of the given qualifier property,
    /// optionally restricted to the statements of one claim property
    pub fn qualifier_entity_values(
        &self,
        qualifier: &EntityId,
        under: Option<&EntityId>,
    ) -> Vec<EntityId> {
        let mut out = Vec::new();
        for claim in &self.claims {
            if let Some(parent) = under {
                if &claim.property != parent {
                    continue;
                }
            }
            for statement in &claim.statements {
                for group in &statement.qualifiers {
                    if &group.property != qualifier {
                        continue;
                    }
                    for snak in &group.snaks {
                        if let Some(DataValue::Entity(id)) = &snak.value {
                            out.push(id.clone());
                        }
                    }
                }
            }
        }
        out
    }
}
