//! Target-side edit model
//!
//! An [`EntityEdit`] is everything one `wbeditentity` call needs: terms,
//! statement batch, entity kind, property datatype and overwrite mode. The
//! engine builds edits; the client renders them onto the wire.

use crate::model::{Datatype, EntityId, EntityKind};
use serde_json::{json, Map, Value};
use std::collections::HashMap;

/// Calendar model attached to written time values
pub const CALENDAR_GREGORIAN: &str = "http://www.wikidata.org/entity/Q1985727";
/// Globe attached to written coordinate values
pub const GLOBE_EARTH: &str = "http://www.wikidata.org/entity/Q2";

/// A fully resolved statement value, ready to be written to the target
#[derive(Debug, Clone, PartialEq)]
pub enum TargetValue {
    Item(EntityId),
    Property(EntityId),
    Time {
        time: String,
        precision: u8,
        timezone: i32,
    },
    Monolingual {
        text: String,
        language: String,
    },
    ExternalId(String),
    Str(String),
    Url(String),
    CommonsMedia(String),
    GeoShape(String),
    Coordinate {
        latitude: f64,
        longitude: f64,
        precision: Option<f64>,
    },
    Quantity {
        amount: String,
    },
}

impl TargetValue {
    /// The datatype the target snak is written with
    pub fn datatype(&self) -> Datatype {
        match self {
            TargetValue::Item(_) => Datatype::WikibaseItem,
            TargetValue::Property(_) => Datatype::WikibaseProperty,
            TargetValue::Time { .. } => Datatype::Time,
            TargetValue::Monolingual { .. } => Datatype::MonolingualText,
            TargetValue::ExternalId(_) => Datatype::ExternalId,
            TargetValue::Str(_) => Datatype::Str,
            TargetValue::Url(_) => Datatype::Url,
            TargetValue::CommonsMedia(_) => Datatype::CommonsMedia,
            TargetValue::GeoShape(_) => Datatype::GeoShape,
            TargetValue::Coordinate { .. } => Datatype::GlobeCoordinate,
            TargetValue::Quantity { .. } => Datatype::Quantity,
        }
    }

    /// The `datavalue` object as `wbeditentity` expects it
    pub fn to_datavalue_json(&self) -> Value {
        match self {
            TargetValue::Item(id) => json!({
                "value": {"entity-type": "item", "id": id.as_str()},
                "type": "wikibase-entityid"
            }),
            TargetValue::Property(id) => json!({
                "value": {"entity-type": "property", "id": id.as_str()},
                "type": "wikibase-entityid"
            }),
            TargetValue::Time {
                time,
                precision,
                timezone,
            } => json!({
                "value": {
                    "time": time,
                    "timezone": timezone,
                    "before": 0,
                    "after": 0,
                    "precision": precision,
                    "calendarmodel": CALENDAR_GREGORIAN
                },
                "type": "time"
            }),
            TargetValue::Monolingual { text, language } => json!({
                "value": {"text": text, "language": language},
                "type": "monolingualtext"
            }),
            TargetValue::ExternalId(value)
            | TargetValue::Str(value)
            | TargetValue::Url(value)
            | TargetValue::CommonsMedia(value)
            | TargetValue::GeoShape(value) => json!({
                "value": value,
                "type": "string"
            }),
            TargetValue::Coordinate {
                latitude,
                longitude,
                precision,
            } => json!({
                "value": {
                    "latitude": latitude,
                    "longitude": longitude,
                    "precision": precision,
                    "globe": GLOBE_EARTH
                },
                "type": "globecoordinate"
            }),
            TargetValue::Quantity { amount } => json!({
                "value": {"amount": amount, "unit": "1"},
                "type": "quantity"
            }),
        }
    }

    fn to_snak_json(&self, property: &EntityId) -> Value {
        json!({
            "snaktype": "value",
            "property": property.as_str(),
            "datatype": self.datatype().as_str(),
            "datavalue": self.to_datavalue_json()
        })
    }
}

/// A resolved qualifier or reference snak
#[derive(Debug, Clone, PartialEq)]
pub struct TargetSnak {
    pub property: EntityId,
    pub value: TargetValue,
}

/// A resolved statement for the target entity
#[derive(Debug, Clone, PartialEq)]
pub struct TargetStatement {
    pub property: EntityId,
    pub value: TargetValue,
    pub qualifiers: Vec<TargetSnak>,
    /// Each inner vector is one reference group
    pub references: Vec<Vec<TargetSnak>>,
}

impl TargetStatement {
    pub fn new(property: EntityId, value: TargetValue) -> Self {
        Self {
            property,
            value,
            qualifiers: Vec::new(),
            references: Vec::new(),
        }
    }

    /// Render as one element of the `claims` array of `wbeditentity` data
    pub fn to_claim_json(&self) -> Value {
        let mut claim = Map::new();
        claim.insert(
            "mainsnak".to_string(),
            self.value.to_snak_json(&self.property),
        );
        claim.insert("type".to_string(), json!("statement"));
        claim.insert("rank".to_string(), json!("normal"));

        if !self.qualifiers.is_empty() {
            claim.insert("qualifiers".to_string(), group_snaks(&self.qualifiers));
        }
        if !self.references.is_empty() {
            let groups: Vec<Value> = self
                .references
                .iter()
                .map(|group| json!({ "snaks": group_snaks(group) }))
                .collect();
            claim.insert("references".to_string(), Value::Array(groups));
        }
        Value::Object(claim)
    }
}

/// Group snaks by property id, as the wire format keys them
fn group_snaks(snaks: &[TargetSnak]) -> Value {
    let mut grouped: Map<String, Value> = Map::new();
    for snak in snaks {
        let entry = grouped
            .entry(snak.property.as_str().to_string())
            .or_insert_with(|| Value::Array(Vec::new()));
        if let Value::Array(list) = entry {
            list.push(snak.value.to_snak_json(&snak.property));
        }
    }
    Value::Object(grouped)
}

/// A create-or-update request for one target entity
#[derive(Debug, Clone)]
pub struct EntityEdit {
    /// `None` creates a new entity
    pub id: Option<EntityId>,
    pub kind: EntityKind,
    /// Required when creating a property
    pub datatype: Option<Datatype>,
    pub labels: HashMap<String, String>,
    pub descriptions: HashMap<String, String>,
    pub statements: Vec<TargetStatement>,
    /// Replace existing statements instead of appending
    pub overwrite: bool,
}

impl EntityEdit {
    /// Edit that creates a new entity of the given kind
    pub fn create(kind: EntityKind) -> Self {
        Self {
            id: None,
            kind,
            datatype: None,
            labels: HashMap::new(),
            descriptions: HashMap::new(),
            statements: Vec::new(),
            overwrite: false,
        }
    }

    /// Edit that updates an existing target entity
    pub fn update(id: EntityId) -> Self {
        let kind = id.kind();
        Self {
            id: Some(id),
            kind,
            datatype: None,
            labels: HashMap::new(),
            descriptions: HashMap::new(),
            statements: Vec::new(),
            overwrite: false,
        }
    }

    pub fn with_datatype(mut self, datatype: Datatype) -> Self {
        self.datatype = Some(datatype);
        self
    }

    pub fn with_label(mut self, language: &str, text: &str) -> Self {
        self.labels.insert(language.to_string(), text.to_string());
        self
    }

    pub fn with_description(mut self, language: &str, text: &str) -> Self {
        self.descriptions
            .insert(language.to_string(), text.to_string());
        self
    }

    pub fn with_statements(mut self, statements: Vec<TargetStatement>) -> Self {
        self.statements = statements;
        self
    }

    pub fn with_overwrite(mut self, overwrite: bool) -> Self {
        self.overwrite = overwrite;
        self
    }

    /// Render the `data` JSON for `wbeditentity`
    pub fn to_data_json(&self) -> Value {
        let mut data = Map::new();
        if !self.labels.is_empty() {
            data.insert("labels".to_string(), term_json(&self.labels));
        }
        if !self.descriptions.is_empty() {
            data.insert("descriptions".to_string(), term_json(&self.descriptions));
        }
        if let Some(datatype) = &self.datatype {
            data.insert("datatype".to_string(), json!(datatype.as_str()));
        }
        if !self.statements.is_empty() {
            let claims: Vec<Value> = self
                .statements
                .iter()
                .map(TargetStatement::to_claim_json)
                .collect();
            data.insert("claims".to_string(), Value::Array(claims));
        }
        Value::Object(data)
    }
}

fn term_json(terms: &HashMap<String, String>) -> Value {
    let mut out = Map::new();
    for (language, text) in terms {
        out.insert(
            language.clone(),
            json!({"language": language, "value": text}),
        );
    }
    Value::Object(out)
}
