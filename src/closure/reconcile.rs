use futures::future::join_all;
use std::collections::HashMap;
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::{
    config::ReconcileConfig,
    error::{ClosureError, Result},
    tracker::{ReconciledFragment, TrackedEntity, TrackerRepository},
};

/// Each lookup gets the first try plus one retry
pub const LOOKUP_ATTEMPTS: usize = 2;

const SLOW_RUN_THRESHOLD: usize = 1000;

/// Outcome of looking up one tracked entity after retries
#[derive(Debug)]
pub enum LookupOutcome {
    Ok(ReconciledFragment),
    Failed { id: String, cause: ClosureError },
}

impl LookupOutcome {
    /// Fragment usable for reconciliation: a success that carries enrollment data
    pub fn into_fragment(self) -> Option<ReconciledFragment> {
        match self {
            LookupOutcome::Ok(fragment) if fragment.enrollments.is_some() => Some(fragment),
            LookupOutcome::Ok(fragment) => {
                debug!(
                    "Lookup for {} returned no enrollments",
                    fragment.tracked_entity_instance
                );
                None
            }
            LookupOutcome::Failed { id, cause } => {
                warn!("Lookup for {} failed after {} attempts: {}", id, LOOKUP_ATTEMPTS, cause);
                None
            }
        }
    }
}

/// Look up one tracked entity, retrying once. Failures are recorded, never re-queued.
pub async fn lookup_with_retry<R>(repository: &R, id: &str) -> LookupOutcome
where
    R: TrackerRepository + ?Sized,
{
    let mut last_error = None;

    for attempt in 1..=LOOKUP_ATTEMPTS {
        match repository.lookup_one(id).await {
            Ok(fragment) => return LookupOutcome::Ok(fragment),
            Err(e) => {
                debug!("Lookup attempt {}/{} for {} failed: {}", attempt, LOOKUP_ATTEMPTS, id, e);
                last_error = Some(e);
            }
        }
    }

    LookupOutcome::Failed {
        id: id.to_string(),
        cause: last_error.unwrap_or_else(|| ClosureError::Lookup {
            id: id.to_string(),
            message: "no attempt made".to_string(),
        }),
    }
}

/// Corrects stale enrollment org units using per-entity authoritative lookups
pub struct Reconciler<'a, R: TrackerRepository + ?Sized> {
    repository: &'a R,
    batch_size: usize,
    batch_delay: Duration,
}

impl<'a, R: TrackerRepository + ?Sized> Reconciler<'a, R> {
    pub fn new(repository: &'a R, config: &ReconcileConfig) -> Self {
        Self {
            repository,
            batch_size: config.batch_size.max(1),
            batch_delay: Duration::from_millis(config.batch_delay_ms),
        }
    }

    /// Reconcile org units of every enrollment, or fail if any entity could not be looked up
    pub async fn reconcile(&self, entities: Vec<TrackedEntity>) -> Result<Vec<TrackedEntity>> {
        let ids: Vec<String> = entities.iter().map(|e| e.tracked_entity.clone()).collect();
        let fragments = self.lookup_all(&ids).await?;
        Ok(apply_org_units(entities, &fragments))
    }

    /// Look up all ids in sequential batches of concurrent lookups, all-or-nothing
    pub async fn lookup_all(&self, ids: &[String]) -> Result<Vec<ReconciledFragment>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        if ids.len() >= SLOW_RUN_THRESHOLD {
            info!("About to send {} lookup requests. This can take minutes.", ids.len());
        }

        let total_batches = ids.len().div_ceil(self.batch_size);
        let mut outcomes = Vec::with_capacity(ids.len());

        for (batch_num, chunk) in ids.chunks(self.batch_size).enumerate() {
            debug!("Reconciling batch {}/{} ({} ids)", batch_num + 1, total_batches, chunk.len());

            // join_all yields results in input order once every lookup has settled
            let batch = join_all(chunk.iter().map(|id| lookup_with_retry(self.repository, id))).await;
            outcomes.extend(batch);

            if !self.batch_delay.is_zero() && batch_num + 1 < total_batches {
                tokio::time::sleep(self.batch_delay).await;
            }
        }

        let requested = ids.len();
        let fragments: Vec<ReconciledFragment> = outcomes
            .into_iter()
            .filter_map(LookupOutcome::into_fragment)
            .collect();

        if fragments.len() < requested {
            return Err(ClosureError::ReconciliationIncomplete {
                requested,
                reconciled: fragments.len(),
            });
        }

        info!("Reconciled {} tracked entities", fragments.len());
        Ok(fragments)
    }
}

/// Replace each enrollment's org unit with the authoritative one, matched by entity and enrollment id.
/// Enrollments with no authoritative counterpart keep their value.
pub fn apply_org_units(
    entities: Vec<TrackedEntity>,
    fragments: &[ReconciledFragment],
) -> Vec<TrackedEntity> {
    let by_entity: HashMap<&str, &ReconciledFragment> = fragments
        .iter()
        .map(|f| (f.tracked_entity_instance.as_str(), f))
        .collect();

    entities
        .into_iter()
        .map(|mut entity| {
            let authoritative = by_entity
                .get(entity.tracked_entity.as_str())
                .and_then(|f| f.enrollments.as_deref())
                .unwrap_or(&[]);

            for enrollment in &mut entity.enrollments {
                if let Some(real) = authoritative.iter().find(|r| r.enrollment == enrollment.enrollment) {
                    if real.org_unit != enrollment.org_unit {
                        debug!(
                            "Enrollment {} org unit corrected {} -> {}",
                            enrollment.enrollment, enrollment.org_unit, real.org_unit
                        );
                        enrollment.org_unit = real.org_unit.clone();
                    }
                }
            }

            entity
        })
        .collect()
}
