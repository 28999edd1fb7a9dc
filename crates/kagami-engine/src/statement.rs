//! Statement construction: snak datatype dispatch
//!
//! Pure translation of one source snak into one target statement value,
//! except that entity-valued snaks resolve their referent through a shallow
//! replication first. The dispatch is exhaustive over [`Datatype`] so a new
//! datatype is a compile-time-checked change.

use crate::replicator::Replicator;
use crate::ReplicationError;
use futures::future::BoxFuture;
use kagami_core::{DataValue, Datatype, Snak, SnakKind, TargetValue};
use tracing::{debug, warn};

impl Replicator {
    /// Translate one source snak into a target statement value.
    ///
    /// `None` drops the snak: novalue/somevalue assignments, payloads that
    /// do not match their datatype, monolingual text in inactive languages,
    /// invalid referenced properties and unrecognized datatypes all degrade
    /// the copy instead of failing the entity.
    pub(crate) fn build_value<'a>(
        &'a mut self,
        snak: &'a Snak,
        depth: usize,
    ) -> BoxFuture<'a, Result<Option<TargetValue>, ReplicationError>> {
        Box::pin(async move {
            if snak.kind != SnakKind::Value {
                return Ok(None);
            }
            let value = match (&snak.datatype, &snak.value) {
                (Datatype::WikibaseItem, Some(DataValue::Entity(id))) => self
                    .resolve_entity(id, depth)
                    .await?
                    .target()
                    .map(|target| TargetValue::Item(target.clone())),
                (Datatype::WikibaseProperty, Some(DataValue::Entity(id))) => self
                    .resolve_entity(id, depth)
                    .await?
                    .target()
                    .map(|target| TargetValue::Property(target.clone())),
                (
                    Datatype::Time,
                    Some(DataValue::Time {
                        time,
                        precision,
                        timezone,
                    }),
                ) => Some(TargetValue::Time {
                    time: time.clone(),
                    precision: *precision,
                    timezone: *timezone,
                }),
                (Datatype::MonolingualText, Some(DataValue::Monolingual { text, language })) => {
                    if self.languages().iter().any(|active| active == language) {
                        Some(TargetValue::Monolingual {
                            text: text.clone(),
                            language: language.clone(),
                        })
                    } else {
                        debug!(%language, "dropping monolingual text in inactive language");
                        None
                    }
                }
                (Datatype::ExternalId, Some(DataValue::Text(text))) => {
                    Some(TargetValue::ExternalId(text.clone()))
                }
                (Datatype::Str, Some(DataValue::Text(text))) => {
                    Some(TargetValue::Str(text.clone()))
                }
                (Datatype::Url, Some(DataValue::Text(text))) => {
                    Some(TargetValue::Url(text.clone()))
                }
                (Datatype::CommonsMedia, Some(DataValue::Text(text))) => {
                    Some(TargetValue::CommonsMedia(text.clone()))
                }
                (Datatype::GeoShape, Some(DataValue::Text(text))) => {
                    Some(TargetValue::GeoShape(text.clone()))
                }
                (
                    Datatype::GlobeCoordinate,
                    Some(DataValue::Coordinate {
                        latitude,
                        longitude,
                        precision,
                    }),
                ) => Some(TargetValue::Coordinate {
                    latitude: *latitude,
                    longitude: *longitude,
                    precision: *precision,
                }),
                (Datatype::Quantity, Some(DataValue::Quantity { amount })) => {
                    Some(TargetValue::Quantity {
                        amount: amount.clone(),
                    })
                }
                (Datatype::Other(name), _) => {
                    warn!(datatype = %name, "unrecognized datatype; dropping statement");
                    None
                }
                (datatype, _) => {
                    debug!(datatype = %datatype, "snak payload does not match its datatype; dropping");
                    None
                }
            };
            Ok(value)
        })
    }
}
