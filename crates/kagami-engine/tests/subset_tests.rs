//! Subset extractor tests: shape walks against in-memory entities

use kagami_core::{entity_from_json, EntityId};
use kagami_engine::{collect_schema_properties, extract_subset, LinkedCopy};
use kagami_shex::parse_schema;
use serde_json::json;

const WDT: &str = "http://www.wikidata.org/prop/direct/";
const P: &str = "http://www.wikidata.org/prop/";
const PS: &str = "http://www.wikidata.org/prop/statement/";
const PQ: &str = "http://www.wikidata.org/prop/qualifier/";
const PR: &str = "http://www.wikidata.org/prop/reference/";
const PROV: &str = "http://www.w3.org/ns/prov#";

fn id(s: &str) -> EntityId {
    EntityId::new(s)
}

fn item_statement(property: &str, target: &str) -> serde_json::Value {
    json!({
        "mainsnak": {
            "snaktype": "value",
            "property": property,
            "datatype": "wikibase-item",
            "datavalue": {"value": {"entity-type": "item", "id": target}, "type": "wikibase-entityid"}
        },
        "type": "statement"
    })
}

fn entity_with_claims(claims: serde_json::Value) -> kagami_core::Entity {
    entity_from_json(&json!({
        "id": "Q1",
        "type": "item",
        "labels": {"en": {"language": "en", "value": "thing"}},
        "descriptions": {},
        "claims": claims
    }))
    .unwrap()
}

#[test]
fn test_direct_predicates_without_value_expr_are_accept_all() {
    let schema = parse_schema(&json!({
        "type": "Schema",
        "start": "http://ex/#S",
        "shapes": [{
            "id": "http://ex/#S",
            "type": "Shape",
            "expression": {"type": "EachOf", "expressions": [
                {"type": "TripleConstraint", "predicate": format!("{WDT}P31")},
                {"type": "TripleConstraint", "predicate": format!("{WDT}P279")},
                {"type": "TripleConstraint", "predicate": "http://www.w3.org/2000/01/rdf-schema#label"}
            ]}
        }]
    }))
    .unwrap();
    let entity = entity_with_claims(json!({}));

    let subset = extract_subset(&schema, "http://ex/#S", &entity).unwrap();
    assert_eq!(subset.properties.len(), 2);
    assert!(subset.allows_property(&id("P31")));
    assert!(subset.allows_property(&id("P279")));
    assert!(!subset.allows_property(&id("P999")));
    // the label constraint contributes nothing
    assert!(subset.linked.is_empty());
    // accept-all scopes admit any qualifier and reference
    let scope = subset.scope(&id("P31")).unwrap();
    assert!(scope.allows_qualifier(&id("P585")));
    assert!(scope.allows_reference(&id("P248")));
}

#[test]
fn test_empty_shape_allows_everything() {
    let schema = parse_schema(&json!({
        "type": "Schema",
        "shapes": [{"id": "http://ex/#S", "type": "Shape"}]
    }))
    .unwrap();
    let entity = entity_with_claims(json!({}));
    let subset = extract_subset(&schema, "http://ex/#S", &entity).unwrap();
    assert!(subset.properties.is_empty());
    assert!(subset.allows_property(&id("P31")));
}

#[test]
fn test_unknown_shape_is_an_error() {
    let schema = parse_schema(&json!({"type": "Schema", "shapes": []})).unwrap();
    let entity = entity_with_claims(json!({}));
    assert!(extract_subset(&schema, "http://ex/#missing", &entity).is_err());
}

#[test]
fn test_statement_shape_scopes_qualifiers_and_references() {
    let schema = parse_schema(&json!({
        "type": "Schema",
        "start": "http://ex/#S",
        "shapes": [
            {
                "id": "http://ex/#S",
                "type": "Shape",
                "expression": {"type": "TripleConstraint", "predicate": format!("{P}P39"), "valueExpr": "http://ex/#stmt"}
            },
            {
                "id": "http://ex/#stmt",
                "type": "Shape",
                "expression": {"type": "EachOf", "expressions": [
                    {"type": "TripleConstraint", "predicate": format!("{PS}P39")},
                    {"type": "TripleConstraint", "predicate": format!("{PQ}P580")},
                    {"type": "TripleConstraint", "predicate": format!("{PROV}wasDerivedFrom"), "valueExpr": "http://ex/#ref"}
                ]}
            },
            {
                "id": "http://ex/#ref",
                "type": "Shape",
                "expression": {"type": "TripleConstraint", "predicate": format!("{PR}P248")}
            }
        ]
    }))
    .unwrap();
    let entity = entity_with_claims(json!({}));

    let subset = extract_subset(&schema, "http://ex/#S", &entity).unwrap();
    let scope = subset.scope(&id("P39")).unwrap();
    assert_eq!(scope.qualifiers, vec![id("P580")]);
    assert_eq!(scope.references, vec![id("P248")]);
    assert!(scope.allows_qualifier(&id("P580")));
    assert!(!scope.allows_qualifier(&id("P1234")));
    assert!(scope.allows_reference(&id("P248")));
    assert!(!scope.allows_reference(&id("P854")));
}

#[test]
fn test_disjunction_results_are_concatenated() {
    let schema = parse_schema(&json!({
        "type": "Schema",
        "shapes": [
            {
                "id": "http://ex/#S",
                "type": "Shape",
                "expression": {
                    "type": "TripleConstraint",
                    "predicate": format!("{P}P39"),
                    "valueExpr": {"type": "ShapeOr", "shapeExprs": ["http://ex/#A", "http://ex/#B"]}
                }
            },
            {
                "id": "http://ex/#A",
                "type": "Shape",
                "expression": {"type": "TripleConstraint", "predicate": format!("{PQ}P580")}
            },
            {
                "id": "http://ex/#B",
                "type": "Shape",
                "expression": {"type": "EachOf", "expressions": [
                    {"type": "TripleConstraint", "predicate": format!("{PQ}P580")},
                    {"type": "TripleConstraint", "predicate": format!("{PQ}P582")}
                ]}
            }
        ]
    }))
    .unwrap();
    let entity = entity_with_claims(json!({}));

    let subset = extract_subset(&schema, "http://ex/#S", &entity).unwrap();
    let scope = subset.scope(&id("P39")).unwrap();
    // duplicates survive the union; membership is a set test
    assert_eq!(scope.qualifiers, vec![id("P580"), id("P580"), id("P582")]);
    assert!(scope.allows_qualifier(&id("P582")));
    assert!(!scope.allows_qualifier(&id("P999")));
}

#[test]
fn test_direct_sub_shape_queues_linked_copies() {
    let schema = parse_schema(&json!({
        "type": "Schema",
        "shapes": [
            {
                "id": "http://ex/#S",
                "type": "Shape",
                "expression": {"type": "TripleConstraint", "predicate": format!("{WDT}P361"), "valueExpr": "http://ex/#T"}
            },
            {"id": "http://ex/#T", "type": "Shape"}
        ]
    }))
    .unwrap();
    let entity = entity_with_claims(json!({
        "P361": [item_statement("P361", "Q2"), item_statement("P361", "Q7")]
    }));

    let subset = extract_subset(&schema, "http://ex/#S", &entity).unwrap();
    assert!(subset.allows_property(&id("P361")));
    assert_eq!(
        subset.linked,
        vec![
            LinkedCopy {
                entity: id("Q2"),
                shape: "http://ex/#T".to_string()
            },
            LinkedCopy {
                entity: id("Q7"),
                shape: "http://ex/#T".to_string()
            }
        ]
    );
}

#[test]
fn test_reference_to_undefined_shape_degrades_to_accept_all() {
    let schema = parse_schema(&json!({
        "type": "Schema",
        "shapes": [{
            "id": "http://ex/#S",
            "type": "Shape",
            "expression": {"type": "TripleConstraint", "predicate": format!("{WDT}P31"), "valueExpr": "http://ex/#missing"}
        }]
    }))
    .unwrap();
    let entity = entity_with_claims(json!({
        "P31": [item_statement("P31", "Q5")]
    }));

    let subset = extract_subset(&schema, "http://ex/#S", &entity).unwrap();
    assert!(subset.allows_property(&id("P31")));
    assert!(subset.linked.is_empty());
}

#[test]
fn test_inline_node_constraint_is_accept_all() {
    let schema = parse_schema(&json!({
        "type": "Schema",
        "shapes": [{
            "id": "http://ex/#S",
            "type": "Shape",
            "expression": {
                "type": "TripleConstraint",
                "predicate": format!("{WDT}P21"),
                "valueExpr": {"type": "NodeConstraint", "values": ["http://www.wikidata.org/entity/Q6581097"]}
            }
        }]
    }))
    .unwrap();
    let entity = entity_with_claims(json!({}));

    let subset = extract_subset(&schema, "http://ex/#S", &entity).unwrap();
    assert!(subset.allows_property(&id("P21")));
    assert!(subset.linked.is_empty());
}

#[test]
fn test_statement_shape_cycle_terminates() {
    // two statement shapes referencing each other through p: constraints
    let schema = parse_schema(&json!({
        "type": "Schema",
        "shapes": [
            {
                "id": "http://ex/#A",
                "type": "Shape",
                "expression": {"type": "TripleConstraint", "predicate": format!("{P}P1"), "valueExpr": "http://ex/#B"}
            },
            {
                "id": "http://ex/#B",
                "type": "Shape",
                "expression": {"type": "TripleConstraint", "predicate": format!("{P}P2"), "valueExpr": "http://ex/#A"}
            }
        ]
    }))
    .unwrap();
    let entity = entity_with_claims(json!({}));

    let subset = extract_subset(&schema, "http://ex/#A", &entity).unwrap();
    assert!(subset.allows_property(&id("P1")));
}

#[test]
fn test_collect_schema_properties() {
    let schema = parse_schema(&json!({
        "type": "Schema",
        "shapes": [
            {
                "id": "http://ex/#S",
                "type": "Shape",
                "expression": {"type": "EachOf", "expressions": [
                    {"type": "TripleConstraint", "predicate": format!("{WDT}P31")},
                    {"type": "TripleConstraint", "predicate": format!("{P}P39"), "valueExpr": "http://ex/#stmt"},
                    {"type": "TripleConstraint", "predicate": "http://www.w3.org/2000/01/rdf-schema#label"}
                ]}
            },
            {
                "id": "http://ex/#stmt",
                "type": "Shape",
                "expression": {"type": "EachOf", "expressions": [
                    {"type": "TripleConstraint", "predicate": format!("{PQ}P580")},
                    {"type": "TripleConstraint", "predicate": format!("{WDT}P31")}
                ]}
            }
        ]
    }))
    .unwrap();

    let properties = collect_schema_properties(&schema);
    assert_eq!(properties, vec![id("P31"), id("P39"), id("P580")]);
}
