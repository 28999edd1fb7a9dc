//! ShExJ schema loading

use crate::model::{NodeConstraint, Shape, ShapeExpr, ShapeOr, ShapeSchema, TripleConstraint};
use crate::ShexError;
use serde_json::Value;
use std::collections::HashMap;

/// Parse a ShExJ document from text
pub fn parse_schema_str(text: &str) -> Result<ShapeSchema, ShexError> {
    let doc: Value = serde_json::from_str(text)?;
    parse_schema(&doc)
}

/// Parse a ShExJ document
///
/// Accepts both the 2.1 layout (`shapes: [{type: "ShapeDecl", id, shapeExpr}]`)
/// and the older inline-id layout (`shapes: [{id, type: "Shape", ...}]`).
pub fn parse_schema(doc: &Value) -> Result<ShapeSchema, ShexError> {
    let obj = doc
        .as_object()
        .ok_or_else(|| ShexError::Parse("schema is not a JSON object".to_string()))?;

    let start = match obj.get("start") {
        None => None,
        Some(Value::String(label)) => Some(label.clone()),
        Some(_) => {
            return Err(ShexError::Parse(
                "start declaration is not a shape reference".to_string(),
            ))
        }
    };

    let mut shapes = HashMap::new();
    if let Some(list) = obj.get("shapes").and_then(Value::as_array) {
        for decl in list {
            let id = decl
                .get("id")
                .and_then(Value::as_str)
                .ok_or_else(|| ShexError::Parse("shape declaration without id".to_string()))?
                .to_string();
            let body = if decl.get("type").and_then(Value::as_str) == Some("ShapeDecl") {
                decl.get("shapeExpr").ok_or_else(|| {
                    ShexError::Parse("ShapeDecl without shapeExpr".to_string())
                })?
            } else {
                decl
            };
            shapes.insert(id, parse_shape_expr(body)?);
        }
    }

    Ok(ShapeSchema { start, shapes })
}

fn parse_shape_expr(value: &Value) -> Result<ShapeExpr, ShexError> {
    if let Some(label) = value.as_str() {
        return Ok(ShapeExpr::Ref(label.to_string()));
    }
    let obj = value.as_object().ok_or_else(|| {
        ShexError::Parse("shape expression is neither an object nor a reference".to_string())
    })?;
    match obj.get("type").and_then(Value::as_str) {
        Some("Shape") => {
            let expressions = match obj.get("expression") {
                Some(expression) => parse_triple_exprs(expression)?,
                None => Vec::new(),
            };
            Ok(ShapeExpr::Shape(Shape { expressions }))
        }
        // conjunction walks every branch, so it degrades to a container
        Some("ShapeAnd") => {
            let mut expressions = Vec::new();
            for branch in expr_list(obj)? {
                expressions.push(parse_shape_expr(branch)?);
            }
            Ok(ShapeExpr::Shape(Shape { expressions }))
        }
        Some("ShapeOr") => {
            let mut alternatives = Vec::new();
            for alternative in expr_list(obj)? {
                alternatives.push(parse_shape_expr(alternative)?);
            }
            Ok(ShapeExpr::Or(ShapeOr { alternatives }))
        }
        Some("NodeConstraint") => Ok(ShapeExpr::Node(parse_node_constraint(obj))),
        Some("TripleConstraint") => parse_triple_constraint(obj).map(ShapeExpr::Triple),
        Some(other) => Err(ShexError::Unsupported(other.to_string())),
        None => Err(ShexError::Parse(
            "shape expression without type".to_string(),
        )),
    }
}

fn expr_list<'a>(
    obj: &'a serde_json::Map<String, Value>,
) -> Result<impl Iterator<Item = &'a Value>, ShexError> {
    obj.get("shapeExprs")
        .and_then(Value::as_array)
        .map(|list| list.iter())
        .ok_or_else(|| ShexError::Parse("composite shape without shapeExprs".to_string()))
}

/// Flatten a triple expression into an ordered child list. `EachOf` and
/// `OneOf` groupings nest arbitrarily in ShExJ; the walker wants one flat
/// sequence per shape.
fn parse_triple_exprs(value: &Value) -> Result<Vec<ShapeExpr>, ShexError> {
    if let Some(label) = value.as_str() {
        return Err(ShexError::Unsupported(format!(
            "triple expression reference {}",
            label
        )));
    }
    let obj = value
        .as_object()
        .ok_or_else(|| ShexError::Parse("triple expression is not an object".to_string()))?;
    match obj.get("type").and_then(Value::as_str) {
        Some("EachOf") | Some("OneOf") => {
            let list = obj
                .get("expressions")
                .and_then(Value::as_array)
                .ok_or_else(|| {
                    ShexError::Parse("grouping expression without expressions".to_string())
                })?;
            let mut out = Vec::new();
            for expression in list {
                out.extend(parse_triple_exprs(expression)?);
            }
            Ok(out)
        }
        Some("TripleConstraint") => Ok(vec![ShapeExpr::Triple(parse_triple_constraint(obj)?)]),
        Some(other) => Err(ShexError::Unsupported(other.to_string())),
        None => Err(ShexError::Parse(
            "triple expression without type".to_string(),
        )),
    }
}

fn parse_triple_constraint(
    obj: &serde_json::Map<String, Value>,
) -> Result<TripleConstraint, ShexError> {
    let predicate = obj
        .get("predicate")
        .and_then(Value::as_str)
        .ok_or_else(|| ShexError::Parse("triple constraint without predicate".to_string()))?
        .to_string();
    let value = match obj.get("valueExpr") {
        Some(value) => Some(Box::new(parse_shape_expr(value)?)),
        None => None,
    };
    Ok(TripleConstraint { predicate, value })
}

fn parse_node_constraint(obj: &serde_json::Map<String, Value>) -> NodeConstraint {
    let mut values = Vec::new();
    if let Some(list) = obj.get("values").and_then(Value::as_array) {
        for value in list {
            if let Some(iri) = value.as_str() {
                values.push(iri.to_string());
            } else if let Some(iri) = value.get("value").and_then(Value::as_str) {
                values.push(iri.to_string());
            } else if let Some(stem) = value.get("stem").and_then(Value::as_str) {
                values.push(stem.to_string());
            }
        }
    }
    NodeConstraint { values }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_schema_with_start() {
        let doc = json!({
            "type": "Schema",
            "start": "http://example.org/#human",
            "shapes": [{
                "id": "http://example.org/#human",
                "type": "Shape",
                "expression": {
                    "type": "EachOf",
                    "expressions": [
                        {
                            "type": "TripleConstraint",
                            "predicate": "http://www.wikidata.org/prop/direct/P31"
                        },
                        {
                            "type": "TripleConstraint",
                            "predicate": "http://www.wikidata.org/prop/direct/P21",
                            "valueExpr": {
                                "type": "NodeConstraint",
                                "values": ["http://www.wikidata.org/entity/Q6581097"]
                            }
                        }
                    ]
                }
            }]
        });
        let schema = parse_schema(&doc).unwrap();
        assert_eq!(schema.start_label().unwrap(), "http://example.org/#human");
        assert_eq!(schema.shapes.len(), 1);

        let ShapeExpr::Shape(shape) = schema.shape("http://example.org/#human").unwrap() else {
            panic!("expected container shape");
        };
        assert_eq!(shape.expressions.len(), 2);
        let ShapeExpr::Triple(second) = &shape.expressions[1] else {
            panic!("expected triple constraint");
        };
        assert_eq!(second.predicate, "http://www.wikidata.org/prop/direct/P21");
        assert!(matches!(
            second.value.as_deref(),
            Some(ShapeExpr::Node(_))
        ));
    }

    #[test]
    fn test_parse_shape_decl_layout() {
        let doc = json!({
            "type": "Schema",
            "shapes": [{
                "type": "ShapeDecl",
                "id": "http://example.org/#S",
                "shapeExpr": {
                    "type": "Shape",
                    "expression": {
                        "type": "TripleConstraint",
                        "predicate": "http://www.wikidata.org/prop/direct/P31",
                        "valueExpr": "http://example.org/#T"
                    }
                }
            }]
        });
        let schema = parse_schema(&doc).unwrap();
        let ShapeExpr::Shape(shape) = schema.shape("http://example.org/#S").unwrap() else {
            panic!("expected container shape");
        };
        let ShapeExpr::Triple(constraint) = &shape.expressions[0] else {
            panic!("expected triple constraint");
        };
        assert_eq!(
            constraint.value.as_deref(),
            Some(&ShapeExpr::Ref("http://example.org/#T".to_string()))
        );
    }

    #[test]
    fn test_nested_groupings_are_flattened() {
        let doc = json!({
            "type": "Schema",
            "shapes": [{
                "id": "http://example.org/#S",
                "type": "Shape",
                "expression": {
                    "type": "EachOf",
                    "expressions": [
                        {
                            "type": "OneOf",
                            "expressions": [
                                {"type": "TripleConstraint", "predicate": "http://w/prop/direct/P1"},
                                {"type": "TripleConstraint", "predicate": "http://w/prop/direct/P2"}
                            ]
                        },
                        {"type": "TripleConstraint", "predicate": "http://w/prop/direct/P3"}
                    ]
                }
            }]
        });
        let schema = parse_schema(&doc).unwrap();
        let ShapeExpr::Shape(shape) = schema.shape("http://example.org/#S").unwrap() else {
            panic!("expected container shape");
        };
        assert_eq!(shape.expressions.len(), 3);
    }

    #[test]
    fn test_shape_or_alternatives() {
        let doc = json!({
            "type": "Schema",
            "shapes": [{
                "id": "http://example.org/#S",
                "type": "ShapeOr",
                "shapeExprs": [
                    "http://example.org/#A",
                    {"type": "NodeConstraint", "values": ["http://www.wikidata.org/entity/Q1"]}
                ]
            }]
        });
        let schema = parse_schema(&doc).unwrap();
        let ShapeExpr::Or(or) = schema.shape("http://example.org/#S").unwrap() else {
            panic!("expected disjunction");
        };
        assert_eq!(or.alternatives.len(), 2);
        assert_eq!(
            or.alternatives[0],
            ShapeExpr::Ref("http://example.org/#A".to_string())
        );
    }

    #[test]
    fn test_unsupported_node_kind_is_fatal() {
        let doc = json!({
            "type": "Schema",
            "shapes": [{
                "id": "http://example.org/#S",
                "type": "ShapeNot",
                "shapeExpr": {"type": "Shape"}
            }]
        });
        assert!(matches!(
            parse_schema(&doc),
            Err(ShexError::Unsupported(kind)) if kind == "ShapeNot"
        ));
    }

    #[test]
    fn test_missing_start_is_an_error() {
        let schema = parse_schema(&json!({"type": "Schema", "shapes": []})).unwrap();
        assert!(matches!(schema.start_label(), Err(ShexError::MissingStart)));
    }
}
