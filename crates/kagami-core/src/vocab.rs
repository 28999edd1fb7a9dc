//! Predicate vocabulary of wikibase RDF exports
//!
//! Shape schemas talk about entities through namespaced predicate URIs
//! (`wdt:`/`ps:` direct values, `p:` full statements, `pq:` qualifiers,
//! `pr:` references, `prov:` provenance). Classification of those URIs
//! decides how the subset extractor treats each triple constraint.

use crate::model::EntityId;

/// W3C provenance namespace (statement-level reference groups)
pub const PROV_NS: &str = "http://www.w3.org/ns/prov#";

const PROP_SEGMENT: &str = "/prop/";
const DIRECT_SEGMENT: &str = "direct/";
const STATEMENT_SEGMENT: &str = "statement/";
const QUALIFIER_SEGMENT: &str = "qualifier/";
const REFERENCE_SEGMENT: &str = "reference/";

/// How a shape predicate relates to entity claims
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PredicateKind {
    /// `wdt:` / `ps:` - plain claim value
    Direct,
    /// `p:` - claim with nested qualifiers and references
    FullStatement,
    /// `pq:` - statement qualifier
    Qualifier,
    /// `pr:` - reference snak
    Reference,
    /// `prov:` - statement-level reference group
    Provenance,
    /// Anything else (labels, descriptions, rdf:type, ...)
    Ignored,
}

/// Classify a predicate URI by its namespace
pub fn classify(predicate: &str) -> PredicateKind {
    if predicate.starts_with(PROV_NS) {
        return PredicateKind::Provenance;
    }
    let Some(pos) = predicate.find(PROP_SEGMENT) else {
        return PredicateKind::Ignored;
    };
    let rest = &predicate[pos + PROP_SEGMENT.len()..];
    let (kind, local) = if let Some(local) = rest.strip_prefix(DIRECT_SEGMENT) {
        (PredicateKind::Direct, local)
    } else if let Some(local) = rest.strip_prefix(STATEMENT_SEGMENT) {
        (PredicateKind::Direct, local)
    } else if let Some(local) = rest.strip_prefix(QUALIFIER_SEGMENT) {
        (PredicateKind::Qualifier, local)
    } else if let Some(local) = rest.strip_prefix(REFERENCE_SEGMENT) {
        (PredicateKind::Reference, local)
    } else {
        (PredicateKind::FullStatement, rest)
    };
    if is_property_id(local) {
        kind
    } else {
        PredicateKind::Ignored
    }
}

/// Extract the property id from a predicate URI, if it names one
pub fn property_id(predicate: &str) -> Option<EntityId> {
    let local = predicate.rsplit(['/', '#']).next()?;
    if is_property_id(local) {
        Some(EntityId::new(local))
    } else {
        None
    }
}

fn is_property_id(s: &str) -> bool {
    s.len() > 1 && s.starts_with('P') && s[1..].chars().all(|c| c.is_ascii_digit())
}
