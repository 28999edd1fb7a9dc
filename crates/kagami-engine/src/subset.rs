//! Schema-derived copy subsets
//!
//! [`extract_subset`] walks one shape and computes, for one entity, which
//! claim properties are in scope, which qualifiers and references survive
//! under each of them, and which linked entities must be replicated under
//! sub-shapes. The walk is pure; the engine drains the linked-copy queue in
//! discovery order before copying the walked entity.

use kagami_core::{classify, property_id, Entity, EntityId, PredicateKind};
use kagami_shex::{
    walk, NodeConstraint, Shape, ShapeExpr, ShapeHandler, ShapeLabel, ShapeOr, ShapeSchema,
    ShexError, TripleConstraint,
};
use std::collections::HashMap;
use tracing::debug;

/// Qualifier/reference scope of one claim property.
///
/// Empty lists allow everything. Merged lists are concatenated, not
/// deduplicated, so membership must be a set test.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PropertyScope {
    pub qualifiers: Vec<EntityId>,
    pub references: Vec<EntityId>,
}

impl PropertyScope {
    pub fn allows_qualifier(&self, property: &EntityId) -> bool {
        self.qualifiers.is_empty() || self.qualifiers.contains(property)
    }

    pub fn allows_reference(&self, property: &EntityId) -> bool {
        self.references.is_empty() || self.references.contains(property)
    }

    fn merge(&mut self, other: PropertyScope) {
        self.qualifiers.extend(other.qualifiers);
        self.references.extend(other.references);
    }
}

/// A linked entity discovered during the walk, to be replicated under the
/// named sub-shape before the walked entity itself is copied
#[derive(Debug, Clone, PartialEq)]
pub struct LinkedCopy {
    pub entity: EntityId,
    pub shape: ShapeLabel,
}

/// The copy subset of one (entity, shape) pair
#[derive(Debug, Clone, Default)]
pub struct CopySubset {
    pub properties: HashMap<EntityId, PropertyScope>,
    pub linked: Vec<LinkedCopy>,
}

impl CopySubset {
    /// An absent or empty subset always passes
    pub fn allows_property(&self, property: &EntityId) -> bool {
        self.properties.is_empty() || self.properties.contains_key(property)
    }

    pub fn scope(&self, property: &EntityId) -> Option<&PropertyScope> {
        self.properties.get(property)
    }
}

/// Compute the copy subset for `entity` under the shape named `shape`
pub fn extract_subset(
    schema: &ShapeSchema,
    shape: &str,
    entity: &Entity,
) -> Result<CopySubset, ShexError> {
    let expr = schema
        .shape(shape)
        .ok_or_else(|| ShexError::UnknownShape(shape.to_string()))?;
    let mut pass = ExtractorPass::entity(schema, entity);
    pass.trail.push(shape.to_string());
    walk(expr, &mut pass);
    Ok(CopySubset {
        properties: pass.properties,
        linked: pass.linked,
    })
}

/// Collect every property id mentioned by any predicate of any shape.
/// Fuels the bulk property sweep.
pub fn collect_schema_properties(schema: &ShapeSchema) -> Vec<EntityId> {
    struct Collector {
        properties: Vec<EntityId>,
    }
    impl ShapeHandler for Collector {
        fn on_triple(&mut self, constraint: &TripleConstraint) {
            if classify(&constraint.predicate) != PredicateKind::Ignored {
                if let Some(id) = property_id(&constraint.predicate) {
                    self.properties.push(id);
                }
            }
        }
    }
    let mut collector = Collector {
        properties: Vec::new(),
    };
    for expr in schema.shapes.values() {
        walk(expr, &mut collector);
    }
    collector.properties.sort();
    collector.properties.dedup();
    collector.properties
}

/// Where records of the current pass land
enum PassMode {
    /// Walking an entity shape: records are claim properties
    Entity,
    /// Walking a statement sub-shape of one claim property: records are
    /// qualifiers and references
    Statement { property: EntityId },
}

struct ExtractorPass<'a> {
    schema: &'a ShapeSchema,
    entity: &'a Entity,
    mode: PassMode,
    /// Entity-mode output
    properties: HashMap<EntityId, PropertyScope>,
    /// Statement-mode output
    scope: PropertyScope,
    linked: Vec<LinkedCopy>,
    /// Predicate context set by the innermost enclosing triple constraint
    current: Option<(PredicateKind, Option<EntityId>)>,
    /// Shape labels on the current walk chain; guards shape-ref cycles
    trail: Vec<ShapeLabel>,
}

impl<'a> ExtractorPass<'a> {
    fn entity(schema: &'a ShapeSchema, entity: &'a Entity) -> Self {
        Self {
            schema,
            entity,
            mode: PassMode::Entity,
            properties: HashMap::new(),
            scope: PropertyScope::default(),
            linked: Vec::new(),
            current: None,
            trail: Vec::new(),
        }
    }

    fn statement(
        schema: &'a ShapeSchema,
        entity: &'a Entity,
        property: EntityId,
        trail: Vec<ShapeLabel>,
    ) -> Self {
        Self {
            schema,
            entity,
            mode: PassMode::Statement { property },
            properties: HashMap::new(),
            scope: PropertyScope::default(),
            linked: Vec::new(),
            current: None,
            trail,
        }
    }

    /// Record an accept-all entry for a predicate in the current scope
    fn record(&mut self, kind: PredicateKind, property: Option<&EntityId>) {
        let Some(property) = property else { return };
        match (&self.mode, kind) {
            (PassMode::Entity, PredicateKind::Direct | PredicateKind::FullStatement) => {
                self.properties.entry(property.clone()).or_default();
            }
            (PassMode::Statement { .. }, PredicateKind::Qualifier) => {
                self.scope.qualifiers.push(property.clone());
            }
            (PassMode::Statement { .. }, PredicateKind::Reference) => {
                self.scope.references.push(property.clone());
            }
            // qualifier/reference constraints outside a statement shape and
            // direct constraints inside one add no subset entries of their
            // own; provenance never names a property
            _ => {}
        }
    }

    /// Descend into the sub-shape a triple constraint references
    fn enter_sub_shape(&mut self, kind: PredicateKind, property: Option<&EntityId>, label: &str) {
        let Some(expr) = self.schema.shape(label) else {
            // not defined as a shape in this schema: accept-all
            self.record(kind, property);
            return;
        };
        match kind {
            PredicateKind::Direct | PredicateKind::Qualifier => {
                // the predicate itself stays in scope; its entity values are
                // queued for replication under the sub-shape
                self.record(kind, property);
                let Some(property) = property else { return };
                let values = match (kind, &self.mode) {
                    (PredicateKind::Direct, _) => self.entity.main_entity_values(property),
                    (PredicateKind::Qualifier, PassMode::Statement { property: parent }) => {
                        self.entity.qualifier_entity_values(property, Some(parent))
                    }
                    (PredicateKind::Qualifier, PassMode::Entity) => {
                        self.entity.qualifier_entity_values(property, None)
                    }
                    _ => Vec::new(),
                };
                for value in values {
                    self.linked.push(LinkedCopy {
                        entity: value,
                        shape: label.to_string(),
                    });
                }
            }
            PredicateKind::FullStatement | PredicateKind::Provenance | PredicateKind::Reference => {
                // statement scopes re-enter the walk, so shape reference
                // cycles must stop here; entity-value cycles are the
                // engine's per-root guard's problem
                if self.trail.iter().any(|seen| seen == label) {
                    debug!(shape = label, "shape reference cycle; treating as accept-all");
                    self.record(kind, property);
                    return;
                }
                let mut trail = self.trail.clone();
                trail.push(label.to_string());
                match &self.mode {
                    PassMode::Entity => {
                        if kind != PredicateKind::FullStatement {
                            debug!(
                                predicate_kind = ?kind,
                                "statement-scoped constraint outside a statement shape"
                            );
                            return;
                        }
                        let Some(property) = property else { return };
                        let mut nested = ExtractorPass::statement(
                            self.schema,
                            self.entity,
                            property.clone(),
                            trail,
                        );
                        walk(expr, &mut nested);
                        self.linked.extend(nested.linked);
                        self.properties
                            .entry(property.clone())
                            .or_default()
                            .merge(nested.scope);
                    }
                    PassMode::Statement { property: parent } => {
                        if kind == PredicateKind::Reference {
                            // the reference property itself stays in scope
                            if let Some(property) = property {
                                self.scope.references.push(property.clone());
                            }
                        }
                        let parent = parent.clone();
                        let mut nested =
                            ExtractorPass::statement(self.schema, self.entity, parent, trail);
                        walk(expr, &mut nested);
                        self.linked.extend(nested.linked);
                        self.scope.merge(nested.scope);
                    }
                }
            }
            PredicateKind::Ignored => {}
        }
    }
}

impl ShapeHandler for ExtractorPass<'_> {
    fn on_shape(&mut self, _shape: &Shape) {
        // entering a container resets the predicate context
        self.current = None;
    }

    fn on_triple(&mut self, constraint: &TripleConstraint) {
        let kind = classify(&constraint.predicate);
        let property = property_id(&constraint.predicate);
        self.current = Some((kind, property.clone()));
        if kind == PredicateKind::Ignored {
            return;
        }
        match constraint.value.as_deref() {
            // no value expression: accept-all
            None => self.record(kind, property.as_ref()),
            Some(ShapeExpr::Ref(label)) => self.enter_sub_shape(kind, property.as_ref(), label),
            // the walker descends into inline expressions on its own; the
            // node and disjunction hooks pick them up with the predicate
            // context set
            Some(ShapeExpr::Node(_)) | Some(ShapeExpr::Or(_)) => {}
            // an inline shape is not a reference into this schema
            Some(_) => self.record(kind, property.as_ref()),
        }
    }

    fn on_node(&mut self, _constraint: &NodeConstraint) {
        // inline node constraint: accept-all for the current predicate
        if let Some((kind, property)) = self.current.clone() {
            self.record(kind, property.as_ref());
        }
    }

    fn on_or(&mut self, or: &ShapeOr) {
        match self.current.clone() {
            Some((kind, property)) => {
                if kind == PredicateKind::Ignored {
                    return;
                }
                // predicate-scoped disjunction: every alternative that
                // references a defined shape contributes once, results are
                // unioned by concatenation; literal node-constraint
                // alternatives reach the node hook through the walker and
                // degrade the predicate to accept-all
                for alternative in &or.alternatives {
                    if let ShapeExpr::Ref(label) = alternative {
                        self.enter_sub_shape(kind, property.as_ref(), label);
                    }
                }
            }
            None => {
                // shape-level disjunction: union every defined alternative
                for alternative in &or.alternatives {
                    if let ShapeExpr::Ref(label) = alternative {
                        if self.trail.contains(label) {
                            continue;
                        }
                        let Some(expr) = self.schema.shape(label) else {
                            continue;
                        };
                        self.trail.push(label.clone());
                        walk(expr, self);
                        self.trail.pop();
                    }
                }
            }
        }
    }
}
