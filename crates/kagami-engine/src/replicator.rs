//! Recursive entity replication
//!
//! The [`Replicator`] owns the collaborators and the mapping cache and
//! drives the copy of one root entity at a time: fetch, subset extraction,
//! linked-entity recursion, shell creation, provenance link, claim batch.
//! Recursion is explicit depth-first `BoxFuture` calls bounded by
//! configuration, never bare host-stack trust.

use crate::subset::{collect_schema_properties, extract_subset, CopySubset};
use crate::{ReplicationError, RootOutcome, RootResult, RunReport};
use futures::future::BoxFuture;
use kagami_client::{SourceRepository, TargetRepository};
use kagami_core::{
    Datatype, Entity, EntityEdit, EntityId, EntityKind, TargetSnak, TargetStatement, TargetValue,
};
use kagami_mapping::{Mapped, MappingCache};
use kagami_shex::ShapeSchema;
use std::collections::HashSet;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Replication engine configuration
#[derive(Debug, Clone)]
pub struct ReplicatorConfig {
    /// Languages whose terms and monolingual values are copied;
    /// "en" is always carried even when not requested
    pub languages: Vec<String>,
    /// Bound on recursive entity resolution
    pub max_depth: usize,
    /// Descriptions are truncated to this many characters
    pub max_description_len: usize,
    /// English label of the provenance property on the target
    pub provenance_label: String,
}

impl Default for ReplicatorConfig {
    fn default() -> Self {
        Self {
            languages: vec!["en".to_string()],
            max_depth: 32,
            max_description_len: 250,
            provenance_label: "source entity".to_string(),
        }
    }
}

impl ReplicatorConfig {
    pub fn with_languages(mut self, languages: &[&str]) -> Self {
        self.languages = languages.iter().map(|l| l.to_string()).collect();
        self
    }

    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }

    pub fn with_max_description_len(mut self, len: usize) -> Self {
        self.max_description_len = len;
        self
    }

    pub fn with_provenance_label(mut self, label: &str) -> Self {
        self.provenance_label = label.to_string();
        self
    }
}

/// The replication engine
pub struct Replicator {
    source: Arc<dyn SourceRepository>,
    target: Arc<dyn TargetRepository>,
    cache: MappingCache,
    config: ReplicatorConfig,
    languages: Vec<String>,
    provenance_property: Option<EntityId>,
}

impl Replicator {
    pub fn new(
        source: Arc<dyn SourceRepository>,
        target: Arc<dyn TargetRepository>,
        config: ReplicatorConfig,
    ) -> Self {
        let mut languages = config.languages.clone();
        if !languages.iter().any(|language| language == "en") {
            languages.push("en".to_string());
        }
        Self {
            source,
            target,
            cache: MappingCache::new(),
            config,
            languages,
            provenance_property: None,
        }
    }

    /// The active language set ("en" included)
    pub(crate) fn languages(&self) -> &[String] {
        &self.languages
    }

    /// Read access to the identity mapping
    pub fn cache(&self) -> &MappingCache {
        &self.cache
    }

    /// Find or create the provenance property on the target, then rebuild
    /// the mapping cache from provenance links persisted there.
    pub async fn initialize(&mut self) -> Result<(), ReplicationError> {
        let label = self.config.provenance_label.clone();
        let property = match self.target.search_property(&label, "en").await? {
            Some(id) => id,
            None => {
                let edit = EntityEdit::create(EntityKind::Property)
                    .with_datatype(Datatype::Url)
                    .with_label("en", &label)
                    .with_description("en", "canonical URI of the entity this one was copied from");
                let id = self.target.write_entity(&edit).await?;
                info!(%id, "created provenance property");
                id
            }
        };
        let rows = self.target.mapping_rows(&property).await?;
        let pairs = rows.into_iter().filter_map(|(target, source_uri)| {
            EntityId::from_uri(&source_uri).map(|source| (source, target))
        });
        let restored = self.cache.hydrate(pairs);
        info!(restored, provenance = %property, "mapping cache reloaded");
        self.provenance_property = Some(property);
        Ok(())
    }

    /// Replicate every root entity the query selects, under the schema's
    /// start shape. Schema errors abort the run; per-root failures are
    /// recorded and the run continues with the next root.
    pub async fn run(
        &mut self,
        schema: &ShapeSchema,
        roots_query: &str,
    ) -> Result<RunReport, ReplicationError> {
        let start = schema.start_label()?.to_string();
        let uris = self.source.entity_uris(roots_query).await?;
        info!(roots = uris.len(), "replication run started");
        let mut report = RunReport::new();
        for uri in uris {
            let Some(id) = EntityId::from_uri(&uri) else {
                warn!(%uri, "root result is not an entity URI");
                report.push(RootOutcome {
                    source: EntityId::new(uri),
                    result: RootResult::Failed("not an entity URI".to_string()),
                });
                continue;
            };
            let result = match self.copy_root(schema, &start, &id).await {
                Ok(Mapped::Target(target)) => {
                    info!(source = %id, target = %target, "root copied");
                    RootResult::Copied(target)
                }
                Ok(Mapped::Invalid) => RootResult::Invalid,
                Err(error @ ReplicationError::Schema(_)) => return Err(error),
                Err(error) => {
                    warn!(source = %id, %error, "root failed");
                    RootResult::Failed(error.to_string())
                }
            };
            report.push(RootOutcome { source: id, result });
        }
        info!(copied = report.copied(), failed = report.failed(), "replication run finished");
        Ok(report)
    }

    /// Copy one root entity under a shape. The recursion guard lives for
    /// exactly this call, so overlapping roots can never share it.
    pub async fn copy_root(
        &mut self,
        schema: &ShapeSchema,
        shape: &str,
        id: &EntityId,
    ) -> Result<Mapped, ReplicationError> {
        let mut guard = HashSet::new();
        match self.copy_node(schema, id, shape, &mut guard, 0).await? {
            Some(mapped) => Ok(mapped),
            // only in-flight entities are skipped, which cannot happen at
            // the root of a fresh guard
            None => Err(ReplicationError::Unknown(format!(
                "root copy of {} produced no result",
                id
            ))),
        }
    }

    /// Shallow-copy every property the schema mentions (bulk mode)
    pub async fn copy_properties(
        &mut self,
        schema: &ShapeSchema,
    ) -> Result<RunReport, ReplicationError> {
        let properties = collect_schema_properties(schema);
        info!(count = properties.len(), "copying schema properties");
        let mut report = RunReport::new();
        for property in properties {
            let result = match self.resolve_entity(&property, 0).await {
                Ok(Mapped::Target(target)) => RootResult::Copied(target),
                Ok(Mapped::Invalid) => RootResult::Invalid,
                Err(error) => {
                    warn!(%property, %error, "property copy failed");
                    RootResult::Failed(error.to_string())
                }
            };
            report.push(RootOutcome {
                source: property,
                result,
            });
        }
        Ok(report)
    }

    /// Fetch an entity, extract its subset under `shape`, replicate the
    /// linked entities the walk discovered, then copy the entity itself.
    /// Returns `None` when the entity is already in flight on this chain.
    fn copy_node<'a>(
        &'a mut self,
        schema: &'a ShapeSchema,
        id: &'a EntityId,
        shape: &'a str,
        guard: &'a mut HashSet<EntityId>,
        depth: usize,
    ) -> BoxFuture<'a, Result<Option<Mapped>, ReplicationError>> {
        Box::pin(async move {
            if depth > self.config.max_depth {
                return Err(ReplicationError::DepthExceeded(self.config.max_depth));
            }
            if !guard.insert(id.clone()) {
                debug!(%id, "already being copied on this chain; skipping");
                return Ok(None);
            }
            let entity = self.source.fetch_entity(id, &self.languages).await?;
            let subset = extract_subset(schema, shape, &entity)?;
            debug!(
                %id,
                shape,
                properties = subset.properties.len(),
                linked = subset.linked.len(),
                "subset extracted"
            );
            for link in &subset.linked {
                self.copy_node(schema, &link.entity, &link.shape, guard, depth + 1)
                    .await?;
            }
            let mapped = self
                .replicate(&entity, true, entity.kind, Some(&subset), depth)
                .await?;
            Ok(Some(mapped))
        })
    }

    /// Replicate one entity onto the target.
    ///
    /// Shallow copies stop at identity and provenance; deep copies also
    /// carry the claims the subset admits. A deep copy of an entity that is
    /// already mapped re-writes its statements (replace, not merge).
    pub(crate) fn replicate<'a>(
        &'a mut self,
        entity: &'a Entity,
        deep: bool,
        kind: EntityKind,
        subset: Option<&'a CopySubset>,
        depth: usize,
    ) -> BoxFuture<'a, Result<Mapped, ReplicationError>> {
        Box::pin(async move {
            // idempotence short-circuit: the cache is the single source of
            // truth for "already copied"
            if let Some(mapped) = self.cache.get(&entity.id).cloned() {
                match mapped {
                    Mapped::Invalid => return Ok(Mapped::Invalid),
                    Mapped::Target(target) => {
                        debug!(source = %entity.id, %target, "already mapped");
                        if deep {
                            self.copy_claims(entity, &target, subset, true, depth).await?;
                        }
                        return Ok(Mapped::Target(target));
                    }
                }
            }

            // entity shell: terms for every requested language the source has
            let mut edit = self.localized_edit(EntityEdit::create(kind), entity);
            if kind == EntityKind::Property {
                let Some(datatype) = entity.datatype.clone() else {
                    return Err(ReplicationError::Unknown(format!(
                        "property {} has no datatype",
                        entity.id
                    )));
                };
                edit = edit.with_datatype(datatype);
            }

            let target = match self.target.write_entity(&edit).await {
                Ok(id) => id,
                Err(error) if error.is_unrecognized_datatype() => {
                    warn!(source = %entity.id, %error, "datatype not recognized by the target; caching as invalid");
                    self.cache.mark_invalid(entity.id.clone());
                    return Ok(Mapped::Invalid);
                }
                Err(error) => {
                    return Err(ReplicationError::TargetWrite {
                        entity: entity.id.clone(),
                        source: error,
                    })
                }
            };
            debug!(source = %entity.id, %target, "shell written");

            // provenance link back to the source, then the mapping itself
            // before any claim is processed so self-references resolve to
            // the new id instead of re-entering creation
            let provenance = self.provenance_statement(&entity.id)?;
            let edit = EntityEdit::update(target.clone()).with_statements(vec![provenance]);
            self.target.write_entity(&edit).await.map_err(|error| {
                ReplicationError::TargetWrite {
                    entity: entity.id.clone(),
                    source: error,
                }
            })?;
            let target = self.cache.insert_target(entity.id.clone(), target);

            if !deep || entity.claims.is_empty() {
                return Ok(Mapped::Target(target));
            }

            self.copy_claims(entity, &target, subset, false, depth).await?;
            Ok(Mapped::Target(target))
        })
    }

    /// Cache-first shallow replication of a referenced item or property
    pub(crate) fn resolve_entity<'a>(
        &'a mut self,
        id: &'a EntityId,
        depth: usize,
    ) -> BoxFuture<'a, Result<Mapped, ReplicationError>> {
        Box::pin(async move {
            if let Some(mapped) = self.cache.get(id) {
                return Ok(mapped.clone());
            }
            if depth > self.config.max_depth {
                return Err(ReplicationError::DepthExceeded(self.config.max_depth));
            }
            let entity = self.source.fetch_entity(id, &self.languages).await?;
            self.replicate(&entity, false, entity.kind, None, depth).await
        })
    }

    /// Build and write the statement batch for one entity's claims,
    /// filtered by the copy subset. With `overwrite` the batch replaces the
    /// target's statements and therefore re-carries the provenance link.
    fn copy_claims<'a>(
        &'a mut self,
        entity: &'a Entity,
        target: &'a EntityId,
        subset: Option<&'a CopySubset>,
        overwrite: bool,
        depth: usize,
    ) -> BoxFuture<'a, Result<(), ReplicationError>> {
        Box::pin(async move {
            let mut statements: Vec<TargetStatement> = Vec::new();
            if overwrite {
                statements.push(self.provenance_statement(&entity.id)?);
            }

            for claim in &entity.claims {
                if !subset.map_or(true, |s| s.allows_property(&claim.property)) {
                    debug!(property = %claim.property, "property outside the copy subset");
                    continue;
                }
                // the property must exist on the target before statements
                // reference it
                let Mapped::Target(property_target) =
                    self.resolve_entity(&claim.property, depth + 1).await?
                else {
                    warn!(property = %claim.property, "skipping claim with invalid property");
                    continue;
                };
                let scope = subset.and_then(|s| s.scope(&claim.property));

                for statement in &claim.statements {
                    let mut qualifiers = Vec::new();
                    for group in &statement.qualifiers {
                        if !scope.map_or(true, |s| s.allows_qualifier(&group.property)) {
                            continue;
                        }
                        let Mapped::Target(qualifier_target) =
                            self.resolve_entity(&group.property, depth + 1).await?
                        else {
                            warn!(qualifier = %group.property, "skipping invalid qualifier property");
                            continue;
                        };
                        for snak in &group.snaks {
                            if let Some(value) = self.build_value(snak, depth + 1).await? {
                                qualifiers.push(TargetSnak {
                                    property: qualifier_target.clone(),
                                    value,
                                });
                            }
                        }
                    }

                    let mut references = Vec::new();
                    for reference in &statement.references {
                        let mut group_snaks = Vec::new();
                        for group in &reference.snaks {
                            if !scope.map_or(true, |s| s.allows_reference(&group.property)) {
                                continue;
                            }
                            let Mapped::Target(reference_target) =
                                self.resolve_entity(&group.property, depth + 1).await?
                            else {
                                warn!(reference = %group.property, "skipping invalid reference property");
                                continue;
                            };
                            for snak in &group.snaks {
                                if let Some(value) = self.build_value(snak, depth + 1).await? {
                                    group_snaks.push(TargetSnak {
                                        property: reference_target.clone(),
                                        value,
                                    });
                                }
                            }
                        }
                        if !group_snaks.is_empty() {
                            references.push(group_snaks);
                        }
                    }

                    if let Some(value) = self.build_value(&statement.mainsnak, depth + 1).await? {
                        statements.push(TargetStatement {
                            property: property_target.clone(),
                            value,
                            qualifiers,
                            references,
                        });
                    }
                }
            }

            if statements.is_empty() && !overwrite {
                return Ok(());
            }
            let mut edit = EntityEdit::update(target.clone())
                .with_statements(statements)
                .with_overwrite(overwrite);
            if overwrite {
                // replacing statements clears terms on the wire as well
                edit = self.localized_edit(edit, entity);
            }
            self.target.write_entity(&edit).await.map_err(|error| {
                ReplicationError::TargetWrite {
                    entity: entity.id.clone(),
                    source: error,
                }
            })?;
            Ok(())
        })
    }

    /// Copy labels and descriptions for every active language the source
    /// carries; descriptions are truncated to the target's accepted length
    fn localized_edit(&self, mut edit: EntityEdit, entity: &Entity) -> EntityEdit {
        for language in &self.languages {
            if let Some(label) = entity.label(language) {
                edit = edit.with_label(language, label);
            }
            if let Some(description) = entity.description(language) {
                let truncated = truncate(description, self.config.max_description_len);
                edit = edit.with_description(language, &truncated);
            }
        }
        edit
    }

    /// The statement linking a target entity back to its source URI
    fn provenance_statement(&self, source: &EntityId) -> Result<TargetStatement, ReplicationError> {
        let Some(property) = self.provenance_property.clone() else {
            return Err(ReplicationError::Unknown(
                "replicator not initialized: missing provenance property".to_string(),
            ));
        };
        let uri = self.source.entity_uri(source);
        Ok(TargetStatement::new(property, TargetValue::Url(uri)))
    }
}

/// Truncate to a maximum number of characters on a char boundary
fn truncate(text: &str, max: usize) -> String {
    text.chars().take(max).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truncate_on_char_boundary() {
        assert_eq!(truncate("héllo wörld", 5), "héllo");
        assert_eq!(truncate("short", 250), "short");
        assert_eq!(truncate("", 10), "");
    }

    #[test]
    fn test_config_defaults() {
        let config = ReplicatorConfig::default();
        assert_eq!(config.languages, vec!["en"]);
        assert_eq!(config.max_description_len, 250);
        assert!(config.max_depth > 0);
    }

    #[test]
    fn test_config_builder() {
        let config = ReplicatorConfig::default()
            .with_languages(&["nl", "fr"])
            .with_max_depth(8)
            .with_provenance_label("copied from");
        assert_eq!(config.languages, vec!["nl", "fr"]);
        assert_eq!(config.max_depth, 8);
        assert_eq!(config.provenance_label, "copied from");
    }
}
