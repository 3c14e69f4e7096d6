use crate::domain::status::ReceiptStatus;
use crate::error::Result;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// What a receipt documents: a whole batch or a single detail.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ReceiptTarget {
    Batch {
        out_batch_no: String,
    },
    Detail {
        out_batch_no: String,
        out_detail_no: String,
    },
}

impl ReceiptTarget {
    pub fn out_batch_no(&self) -> &str {
        match self {
            Self::Batch { out_batch_no } | Self::Detail { out_batch_no, .. } => out_batch_no,
        }
    }
}

impl fmt::Display for ReceiptTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Batch { out_batch_no } => write!(f, "batch:{out_batch_no}"),
            Self::Detail {
                out_batch_no,
                out_detail_no,
            } => write!(f, "detail:{out_batch_no}/{out_detail_no}"),
        }
    }
}

/// File attributes reported by the provider alongside a generated receipt.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct FileMeta {
    pub file_name: Option<String>,
    pub file_size: Option<u64>,
}

/// Outcome of a generation attempt, as reported by the provider feed.
#[derive(Debug, Clone, PartialEq)]
pub enum GenerationOutcome {
    Available {
        download_url: String,
        hash_value: String,
        file_meta: FileMeta,
        expire_time: DateTime<Utc>,
    },
    Failed {
        reason: String,
    },
}

/// An electronic proof-of-transfer document.
///
/// Its lifecycle runs independently of the transfer it documents and may
/// reach `Expired` or `Failed` long after the underlying transfer is
/// terminal. A dead instance is never resurrected; re-application creates a
/// new record with a new `apply_no`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransferReceipt {
    /// Application tracking number, unique per application.
    pub apply_no: String,
    pub target: ReceiptTarget,
    /// Provider receipt-type vocabulary, opaque to the core.
    pub receipt_type: String,
    pub status: ReceiptStatus,
    /// Present only once the receipt is Available (and kept afterwards).
    pub download_url: Option<String>,
    /// Integrity hash of the generated file.
    pub hash_value: Option<String>,
    pub file_meta: Option<FileMeta>,
    pub applied_at: DateTime<Utc>,
    pub generated_at: Option<DateTime<Utc>>,
    pub expire_time: Option<DateTime<Utc>>,
    pub fail_reason: Option<String>,
    /// Raw provider response, stored untouched for audit.
    pub raw_response: Option<serde_json::Value>,
}

impl TransferReceipt {
    pub fn new(
        apply_no: impl Into<String>,
        target: ReceiptTarget,
        receipt_type: impl Into<String>,
        applied_at: DateTime<Utc>,
    ) -> Self {
        Self {
            apply_no: apply_no.into(),
            target,
            receipt_type: receipt_type.into(),
            status: ReceiptStatus::Generating,
            download_url: None,
            hash_value: None,
            file_meta: None,
            applied_at,
            generated_at: None,
            expire_time: None,
            fail_reason: None,
            raw_response: None,
        }
    }

    /// Applies a generation outcome: `Generating -> Available` or
    /// `Generating -> Failed`. Any other current status is rejected, which
    /// defends against duplicate result delivery.
    pub fn record_outcome(
        &mut self,
        outcome: GenerationOutcome,
        generated_at: DateTime<Utc>,
    ) -> Result<()> {
        match outcome {
            GenerationOutcome::Available {
                download_url,
                hash_value,
                file_meta,
                expire_time,
            } => {
                self.status = self.status.transition(ReceiptStatus::Available)?;
                self.download_url = Some(download_url);
                self.hash_value = Some(hash_value);
                self.file_meta = Some(file_meta);
                self.expire_time = Some(expire_time);
                self.generated_at = Some(generated_at);
            }
            GenerationOutcome::Failed { reason } => {
                self.status = self.status.transition(ReceiptStatus::Failed)?;
                self.fail_reason = Some(reason);
            }
        }
        Ok(())
    }

    /// `Available -> Downloaded`. Fails for anything not currently
    /// Available (still generating, expired, failed).
    pub fn mark_downloaded(&mut self) -> Result<()> {
        self.status = self.status.transition(ReceiptStatus::Downloaded)?;
        Ok(())
    }

    /// True when the recorded expiry has passed at `now`.
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        matches!(self.status, ReceiptStatus::Available | ReceiptStatus::Downloaded)
            && self.expire_time.is_some_and(|t| now >= t)
    }

    /// Moves an Available/Downloaded receipt whose expiry has passed to
    /// Expired. `now` is supplied by the caller; the receipt owns no clock.
    ///
    /// Returns whether the receipt transitioned; receipts not yet due (or
    /// not in an expirable status) are left alone.
    pub fn expire(&mut self, now: DateTime<Utc>) -> Result<bool> {
        if !self.is_expired_at(now) {
            return Ok(false);
        }
        self.status = self.status.transition(ReceiptStatus::Expired)?;
        Ok(true)
    }

    pub fn needs_reapply(&self) -> bool {
        self.status.needs_reapply()
    }
}
