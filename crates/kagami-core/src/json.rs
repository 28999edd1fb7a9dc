//! Parsing of Action API entity JSON (`wbgetentities` response bodies)

use crate::model::{
    Claim, DataValue, Datatype, Entity, EntityId, EntityKind, ReferenceGroup, Snak, SnakGroup,
    SnakKind, Statement,
};
use crate::ModelError;
use serde_json::Value;
use std::collections::HashMap;

/// Parse one entity object as returned under `entities.<id>`
pub fn entity_from_json(doc: &Value) -> Result<Entity, ModelError> {
    let obj = doc
        .as_object()
        .ok_or_else(|| ModelError::Malformed("entity is not a JSON object".to_string()))?;

    let id = obj
        .get("id")
        .and_then(Value::as_str)
        .ok_or_else(|| ModelError::Malformed("entity without id".to_string()))?;
    let id = EntityId::new(id);

    let kind = match obj.get("type").and_then(Value::as_str) {
        Some("property") => EntityKind::Property,
        Some("item") | None => EntityKind::Item,
        Some(other) => {
            return Err(ModelError::Malformed(format!(
                "unknown entity type '{}'",
                other
            )))
        }
    };

    let datatype = obj
        .get("datatype")
        .and_then(Value::as_str)
        .map(Datatype::parse);

    let labels = term_map(obj.get("labels"));
    let descriptions = term_map(obj.get("descriptions"));

    let mut claims = Vec::new();
    if let Some(map) = obj.get("claims").and_then(Value::as_object) {
        for (property, statements) in map {
            let list = statements.as_array().ok_or_else(|| {
                ModelError::Malformed(format!("claim {} is not an array", property))
            })?;
            let mut parsed = Vec::with_capacity(list.len());
            for statement in list {
                parsed.push(statement_from_json(statement)?);
            }
            if !parsed.is_empty() {
                claims.push(Claim {
                    property: EntityId::new(property.clone()),
                    statements: parsed,
                });
            }
        }
    }

    Ok(Entity {
        id,
        kind,
        datatype,
        labels,
        descriptions,
        claims,
    })
}

/// `{lang: {"language": lang, "value": text}}` -> `{lang: text}`
fn term_map(value: Option<&Value>) -> HashMap<String, String> {
    let mut out = HashMap::new();
    if let Some(map) = value.and_then(Value::as_object) {
        for (language, term) in map {
            if let Some(text) = term.get("value").and_then(Value::as_str) {
                out.insert(language.clone(), text.to_string());
            }
        }
    }
    out
}

/// Parse one statement (mainsnak + qualifiers + references)
pub fn statement_from_json(value: &Value) -> Result<Statement, ModelError> {
    let mainsnak = value
        .get("mainsnak")
        .ok_or_else(|| ModelError::Malformed("statement without mainsnak".to_string()))?;
    let mainsnak = snak_from_json(mainsnak)?;

    let mut qualifiers = Vec::new();
    if let Some(map) = value.get("qualifiers").and_then(Value::as_object) {
        for (property, snaks) in map {
            qualifiers.push(SnakGroup {
                property: EntityId::new(property.clone()),
                snaks: snak_list(snaks)?,
            });
        }
    }

    let mut references = Vec::new();
    if let Some(groups) = value.get("references").and_then(Value::as_array) {
        for group in groups {
            let mut snaks = Vec::new();
            if let Some(map) = group.get("snaks").and_then(Value::as_object) {
                for (property, list) in map {
                    snaks.push(SnakGroup {
                        property: EntityId::new(property.clone()),
                        snaks: snak_list(list)?,
                    });
                }
            }
            references.push(ReferenceGroup { snaks });
        }
    }

    Ok(Statement {
        mainsnak,
        qualifiers,
        references,
    })
}

fn snak_list(value: &Value) -> Result<Vec<Snak>, ModelError> {
    let list = value
        .as_array()
        .ok_or_else(|| ModelError::Malformed("snak list is not an array".to_string()))?;
    list.iter().map(snak_from_json).collect()
}

/// Parse one snak
pub fn snak_from_json(value: &Value) -> Result<Snak, ModelError> {
    let kind = match value.get("snaktype").and_then(Value::as_str) {
        Some("value") | None => SnakKind::Value,
        Some("novalue") => SnakKind::NoValue,
        Some("somevalue") => SnakKind::SomeValue,
        Some(other) => {
            return Err(ModelError::Malformed(format!(
                "unknown snaktype '{}'",
                other
            )))
        }
    };

    let datatype = match (value.get("datatype").and_then(Value::as_str), kind) {
        (Some(name), _) => Datatype::parse(name),
        (None, SnakKind::Value) => {
            return Err(ModelError::Malformed(
                "value snak without datatype".to_string(),
            ))
        }
        (None, _) => Datatype::Str,
    };

    let payload = match kind {
        SnakKind::Value => datavalue_from_json(&datatype, value.get("datavalue")),
        // no usable payload by definition
        SnakKind::NoValue | SnakKind::SomeValue => None,
    };

    Ok(Snak {
        kind,
        datatype,
        value: payload,
    })
}

/// Parse the datavalue payload for the declared datatype.
///
/// A payload that does not match its declared datatype yields `None`; the
/// statement builder later drops the snak instead of failing the entity.
fn datavalue_from_json(datatype: &Datatype, value: Option<&Value>) -> Option<DataValue> {
    let inner = value?.get("value")?;
    match datatype {
        Datatype::WikibaseItem | Datatype::WikibaseProperty => inner
            .get("id")
            .and_then(Value::as_str)
            .map(|id| DataValue::Entity(EntityId::new(id))),
        Datatype::Time => {
            let time = inner.get("time")?.as_str()?.to_string();
            let precision = inner.get("precision")?.as_u64()? as u8;
            let timezone = inner.get("timezone")?.as_i64()? as i32;
            Some(DataValue::Time {
                time,
                precision,
                timezone,
            })
        }
        Datatype::MonolingualText => {
            let text = inner.get("text")?.as_str()?.to_string();
            let language = inner.get("language")?.as_str()?.to_string();
            Some(DataValue::Monolingual { text, language })
        }
        Datatype::GlobeCoordinate => {
            let latitude = inner.get("latitude")?.as_f64()?;
            let longitude = inner.get("longitude")?.as_f64()?;
            let precision = inner.get("precision").and_then(Value::as_f64);
            Some(DataValue::Coordinate {
                latitude,
                longitude,
                precision,
            })
        }
        Datatype::Quantity => {
            let amount = inner.get("amount")?.as_str()?.to_string();
            Some(DataValue::Quantity { amount })
        }
        Datatype::ExternalId
        | Datatype::Str
        | Datatype::Url
        | Datatype::CommonsMedia
        | Datatype::GeoShape => inner.as_str().map(|s| DataValue::Text(s.to_string())),
        Datatype::Other(_) => None,
    }
}
