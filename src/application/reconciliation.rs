use crate::application::locks::KeyedLocks;
use crate::domain::ports::{BatchStore, BatchStoreRef};
use crate::domain::provider::{ProviderStatusMap, ProviderUpdate};
use crate::domain::status::{BatchStatus, DetailStatus};
use crate::error::{PayoutError, Result};
use tracing::warn;

/// How an inbound provider update was absorbed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReconcileOutcome {
    /// A legitimate forward move was applied.
    Applied {
        detail_status: DetailStatus,
        /// Whether this update completed the batch.
        batch_finished: bool,
    },
    /// The update reported the status the detail already holds.
    Duplicate,
    /// The update would regress already-applied state (or targets a closed
    /// batch); reported as a warning, state untouched.
    Stale,
}

/// The sole writer of detail/batch status derived from provider-originated
/// information.
///
/// Safe under duplicate and out-of-order delivery: applying the same update
/// twice, or a stale one after a forward one, leaves state unchanged. Writes
/// to one batch are serialized on a per-batch lock; distinct batches
/// reconcile in parallel.
pub struct ReconciliationEngine {
    batches: BatchStoreRef,
    status_map: ProviderStatusMap,
    locks: KeyedLocks,
}

impl ReconciliationEngine {
    pub fn new(batches: BatchStoreRef, status_map: ProviderStatusMap) -> Self {
        Self {
            batches,
            status_map,
            locks: KeyedLocks::new(),
        }
    }

    /// Merges one normalized provider update into local state.
    ///
    /// The full read -> validate -> write -> recompute window runs under the
    /// owning batch's lock, and the mutated aggregate is stored in a single
    /// call, so the operation either commits whole or not at all.
    pub async fn apply_update(&self, update: ProviderUpdate) -> Result<ReconcileOutcome> {
        let out_batch_no = self.resolve_batch_no(&update).await?;

        let _guard = self.locks.acquire(&out_batch_no).await;

        let mut batch = self
            .batches
            .get(&out_batch_no)
            .await?
            .ok_or_else(|| PayoutError::NotFound(format!("batch {out_batch_no}")))?;

        if batch.status == BatchStatus::Closed {
            warn!(
                out_batch_no = %out_batch_no,
                status_code = %update.status_code,
                "provider update against a closed batch ignored"
            );
            return Ok(ReconcileOutcome::Stale);
        }

        let target_status = self.status_map.resolve(&update.status_code)?;

        let detail = match (&update.out_detail_no, &update.provider_detail_id) {
            (Some(no), _) => batch.detail_mut(no),
            (None, Some(id)) => batch.detail_mut_by_provider_id(id),
            (None, None) => {
                return Err(PayoutError::ValidationError(
                    "provider update carries no detail reference".to_string(),
                ));
            }
        };
        let Some(detail) = detail else {
            // Never dropped silently: an unknown detail may indicate a
            // replay or a consistency bug upstream.
            return Err(PayoutError::NotFound(format!(
                "no matching detail in batch {out_batch_no}"
            )));
        };

        if detail.status == target_status {
            return Ok(ReconcileOutcome::Duplicate);
        }

        let new_status = match detail.status.transition(target_status) {
            Ok(status) => status,
            Err(PayoutError::InvalidTransition { .. }) => {
                warn!(
                    out_batch_no = %out_batch_no,
                    out_detail_no = %detail.out_detail_no,
                    current = %detail.status,
                    reported = %target_status,
                    "stale provider update ignored"
                );
                return Ok(ReconcileOutcome::Stale);
            }
            Err(other) => return Err(other),
        };

        detail.status = new_status;
        if let Some(id) = &update.provider_detail_id {
            detail.record_provider_detail_id(id);
        }
        if let Some(id) = &update.provider_batch_id {
            batch.record_provider_batch_id(id);
        }
        let batch_finished = batch.recompute_finished();

        self.batches.store(batch).await?;

        Ok(ReconcileOutcome::Applied {
            detail_status: new_status,
            batch_finished,
        })
    }

    // The lock is keyed on out_batch_no, so updates addressed by provider
    // ids are first resolved to the owning batch.
    async fn resolve_batch_no(&self, update: &ProviderUpdate) -> Result<String> {
        if let Some(no) = &update.out_batch_no {
            return Ok(no.clone());
        }
        if let Some(id) = &update.provider_batch_id
            && let Some(batch) = self.batches.get_by_provider_batch_id(id).await?
        {
            return Ok(batch.out_batch_no);
        }
        if let Some(id) = &update.provider_detail_id
            && let Some(batch) = self.batches.get_by_provider_detail_id(id).await?
        {
            return Ok(batch.out_batch_no);
        }
        Err(PayoutError::NotFound(
            "provider update matches no known batch".to_string(),
        ))
    }
}
