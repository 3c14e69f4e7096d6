use crate::domain::status::{BatchStatus, DetailStatus};
use crate::error::{PayoutError, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// One individual transfer within a batch, targeting one recipient.
///
/// Details belong to exactly one [`TransferBatch`] and have no independent
/// lifecycle; the aggregate is their sole owner.
#[derive(Debug, Serialize, Deserialize, PartialEq, Clone)]
pub struct TransferDetail {
    /// Merchant-assigned detail number, unique within the batch.
    pub out_detail_no: String,
    /// Provider-assigned id, set once the provider accepts the detail.
    pub detail_id: Option<String>,
    /// Transfer amount in minor currency units. Always positive.
    pub amount: i64,
    /// Opaque recipient handle (e.g. a payee account token).
    pub recipient: String,
    pub remark: Option<String>,
    pub status: DetailStatus,
}

/// Input for one detail at batch creation time.
#[derive(Debug, Deserialize, PartialEq, Clone)]
pub struct DetailSpec {
    pub out_detail_no: String,
    pub amount: i64,
    pub recipient: String,
    #[serde(default)]
    pub remark: Option<String>,
}

/// A submitted group of transfers sharing one merchant-assigned reference.
///
/// `total_amount` and `total_num` are computed at creation and frozen; the
/// batch owns its details for its whole life.
#[derive(Debug, Serialize, Deserialize, PartialEq, Clone)]
pub struct TransferBatch {
    /// Merchant-assigned batch number, unique per merchant.
    pub out_batch_no: String,
    /// Provider-assigned id, set once the provider accepts the batch.
    pub batch_id: Option<String>,
    pub batch_name: String,
    pub remark: Option<String>,
    /// Sum of all owned detail amounts, in minor currency units.
    pub total_amount: i64,
    /// Count of owned details.
    pub total_num: u32,
    pub status: BatchStatus,
    pub details: Vec<TransferDetail>,
}

impl TransferBatch {
    /// Creates a new batch in `Processing` with all details in `Init`.
    ///
    /// Rejects empty detail lists, non-positive amounts, blank merchant
    /// numbers and duplicate `out_detail_no` values before any state exists.
    pub fn create(
        out_batch_no: impl Into<String>,
        batch_name: impl Into<String>,
        remark: Option<String>,
        specs: Vec<DetailSpec>,
    ) -> Result<Self> {
        let out_batch_no = out_batch_no.into();
        if out_batch_no.is_empty() {
            return Err(PayoutError::ValidationError(
                "out_batch_no must not be empty".to_string(),
            ));
        }
        if specs.is_empty() {
            return Err(PayoutError::ValidationError(format!(
                "batch {out_batch_no} has no details"
            )));
        }

        let mut seen = HashSet::with_capacity(specs.len());
        let mut total_amount: i64 = 0;
        let mut details = Vec::with_capacity(specs.len());

        for spec in specs {
            if spec.out_detail_no.is_empty() {
                return Err(PayoutError::ValidationError(format!(
                    "batch {out_batch_no}: out_detail_no must not be empty"
                )));
            }
            if spec.amount <= 0 {
                return Err(PayoutError::ValidationError(format!(
                    "detail {}: amount must be positive, got {}",
                    spec.out_detail_no, spec.amount
                )));
            }
            if !seen.insert(spec.out_detail_no.clone()) {
                return Err(PayoutError::ValidationError(format!(
                    "duplicate out_detail_no {} in batch {out_batch_no}",
                    spec.out_detail_no
                )));
            }
            total_amount += spec.amount;
            details.push(TransferDetail {
                out_detail_no: spec.out_detail_no,
                detail_id: None,
                amount: spec.amount,
                recipient: spec.recipient,
                remark: spec.remark,
                status: DetailStatus::Init,
            });
        }

        Ok(Self {
            out_batch_no,
            batch_id: None,
            batch_name: batch_name.into(),
            remark,
            total_amount,
            total_num: details.len() as u32,
            status: BatchStatus::Processing,
            details,
        })
    }

    /// Explicit administrative/provider closure. Never inferred from detail
    /// states.
    pub fn close(&mut self) -> Result<()> {
        self.status = self.status.transition(BatchStatus::Closed)?;
        Ok(())
    }

    /// Moves a `Processing` batch to `Finished` once every detail is
    /// terminal. Idempotent: already-Finished (or Closed) batches and
    /// batches with outstanding details are left alone.
    ///
    /// Returns whether the batch transitioned.
    pub fn recompute_finished(&mut self) -> bool {
        if self.status != BatchStatus::Processing {
            return false;
        }
        if !self.details.iter().all(|d| d.status.is_terminal()) {
            return false;
        }
        match self.status.transition(BatchStatus::Finished) {
            Ok(status) => {
                self.status = status;
                true
            }
            Err(_) => false,
        }
    }

    /// True once the batch is closed out (Finished or Closed).
    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }

    pub fn detail(&self, out_detail_no: &str) -> Option<&TransferDetail> {
        self.details.iter().find(|d| d.out_detail_no == out_detail_no)
    }

    pub fn detail_mut(&mut self, out_detail_no: &str) -> Option<&mut TransferDetail> {
        self.details
            .iter_mut()
            .find(|d| d.out_detail_no == out_detail_no)
    }

    pub fn detail_by_provider_id(&self, detail_id: &str) -> Option<&TransferDetail> {
        self.details
            .iter()
            .find(|d| d.detail_id.as_deref() == Some(detail_id))
    }

    pub fn detail_mut_by_provider_id(&mut self, detail_id: &str) -> Option<&mut TransferDetail> {
        self.details
            .iter_mut()
            .find(|d| d.detail_id.as_deref() == Some(detail_id))
    }

    /// Records the provider-assigned batch id. Assigned once; a present id
    /// is never overwritten.
    pub fn record_provider_batch_id(&mut self, batch_id: &str) {
        if self.batch_id.is_none() {
            self.batch_id = Some(batch_id.to_string());
        }
    }
}

impl TransferDetail {
    /// Records the provider-assigned detail id, keeping the first one seen.
    pub fn record_provider_detail_id(&mut self, detail_id: &str) {
        if self.detail_id.is_none() {
            self.detail_id = Some(detail_id.to_string());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn specs() -> Vec<DetailSpec> {
        vec![
            DetailSpec {
                out_detail_no: "D1".to_string(),
                amount: 1000,
                recipient: "openid-1".to_string(),
                remark: None,
            },
            DetailSpec {
                out_detail_no: "D2".to_string(),
                amount: 250,
                recipient: "openid-2".to_string(),
                remark: Some("lunch".to_string()),
            },
        ]
    }

    #[test]
    fn test_create_computes_totals() {
        let batch = TransferBatch::create("B1", "March payroll", None, specs()).unwrap();
        assert_eq!(batch.status, BatchStatus::Processing);
        assert_eq!(batch.total_amount, 1250);
        assert_eq!(batch.total_num, 2);
        assert!(batch.details.iter().all(|d| d.status == DetailStatus::Init));
        assert!(batch.batch_id.is_none());
    }

    #[test]
    fn test_create_rejects_empty_details() {
        let result = TransferBatch::create("B1", "empty", None, vec![]);
        assert!(matches!(result, Err(PayoutError::ValidationError(_))));
    }

    #[test]
    fn test_create_rejects_non_positive_amount() {
        let mut bad = specs();
        bad[1].amount = 0;
        let result = TransferBatch::create("B1", "bad amount", None, bad);
        assert!(matches!(result, Err(PayoutError::ValidationError(_))));

        let mut negative = specs();
        negative[0].amount = -5;
        let result = TransferBatch::create("B1", "negative", None, negative);
        assert!(matches!(result, Err(PayoutError::ValidationError(_))));
    }

    #[test]
    fn test_create_rejects_duplicate_detail_no() {
        let mut dup = specs();
        dup[1].out_detail_no = "D1".to_string();
        let result = TransferBatch::create("B1", "dup", None, dup);
        assert!(matches!(result, Err(PayoutError::ValidationError(_))));
    }

    #[test]
    fn test_close_only_once() {
        let mut batch = TransferBatch::create("B1", "payroll", None, specs()).unwrap();
        batch.close().unwrap();
        assert_eq!(batch.status, BatchStatus::Closed);
        assert!(matches!(
            batch.close(),
            Err(PayoutError::InvalidTransition { .. })
        ));
    }

    #[test]
    fn test_recompute_finished_requires_all_terminal() {
        let mut batch = TransferBatch::create("B1", "payroll", None, specs()).unwrap();
        batch.detail_mut("D1").unwrap().status = DetailStatus::Success;
        assert!(!batch.recompute_finished());
        assert_eq!(batch.status, BatchStatus::Processing);

        batch.detail_mut("D2").unwrap().status = DetailStatus::Fail;
        assert!(batch.recompute_finished());
        assert_eq!(batch.status, BatchStatus::Finished);

        // Idempotent once Finished.
        assert!(!batch.recompute_finished());
        assert_eq!(batch.status, BatchStatus::Finished);
    }

    #[test]
    fn test_recompute_never_touches_closed() {
        let mut batch = TransferBatch::create("B1", "payroll", None, specs()).unwrap();
        batch.detail_mut("D1").unwrap().status = DetailStatus::Success;
        batch.detail_mut("D2").unwrap().status = DetailStatus::Success;
        batch.close().unwrap();
        assert!(!batch.recompute_finished());
        assert_eq!(batch.status, BatchStatus::Closed);
    }

    #[test]
    fn test_provider_ids_assigned_once() {
        let mut batch = TransferBatch::create("B1", "payroll", None, specs()).unwrap();
        batch.record_provider_batch_id("wx-batch-1");
        batch.record_provider_batch_id("wx-batch-2");
        assert_eq!(batch.batch_id.as_deref(), Some("wx-batch-1"));

        let detail = batch.detail_mut("D1").unwrap();
        detail.record_provider_detail_id("wx-detail-1");
        detail.record_provider_detail_id("wx-detail-2");
        assert_eq!(detail.detail_id.as_deref(), Some("wx-detail-1"));

        assert!(batch.detail_by_provider_id("wx-detail-1").is_some());
        assert!(batch.detail_by_provider_id("wx-detail-9").is_none());
    }
}
