use crate::error::{PayoutError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Lifecycle of a submitted transfer batch.
///
/// `Finished` means every owned detail reached a terminal status; `Closed` is
/// only ever the result of an explicit closure, never inferred from details.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BatchStatus {
    Processing,
    Finished,
    Closed,
}

/// Lifecycle of a single transfer within a batch.
///
/// Movement is strictly forward along
/// `Init -> WaitPay -> Processing -> {Success, Fail}`; the two terminal
/// statuses are absorbing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DetailStatus {
    Init,
    WaitPay,
    Processing,
    Success,
    Fail,
}

/// Lifecycle of an electronic receipt, independent of the transfer it
/// documents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ReceiptStatus {
    Generating,
    Available,
    Expired,
    Failed,
    Downloaded,
}

impl BatchStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Processing => "PROCESSING",
            Self::Finished => "FINISHED",
            Self::Closed => "CLOSED",
        }
    }

    /// Validates a batch status change. Every batch status write in the
    /// crate goes through here.
    pub fn transition(self, to: Self) -> Result<Self> {
        match (self, to) {
            (Self::Processing, Self::Finished)
            | (Self::Processing, Self::Closed)
            | (Self::Finished, Self::Closed) => Ok(to),
            _ => Err(invalid("batch", self, to)),
        }
    }

    /// True once the batch is closed out (Finished or Closed).
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Finished | Self::Closed)
    }
}

impl DetailStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Init => "INIT",
            Self::WaitPay => "WAIT_PAY",
            Self::Processing => "PROCESSING",
            Self::Success => "SUCCESS",
            Self::Fail => "FAIL",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Success | Self::Fail)
    }

    // Position along the forward chain. Both terminal statuses share the top
    // rank so neither can be reached from the other.
    fn rank(&self) -> u8 {
        match self {
            Self::Init => 0,
            Self::WaitPay => 1,
            Self::Processing => 2,
            Self::Success | Self::Fail => 3,
        }
    }

    /// Validates a detail status change.
    ///
    /// Forward skips (e.g. `Init -> Success`) are legal: a poll may observe
    /// the provider having crossed intermediate states between polls.
    /// Terminal statuses are absorbing, so any move out of them is rejected
    /// rather than ignored.
    pub fn transition(self, to: Self) -> Result<Self> {
        if !self.is_terminal() && self.rank() < to.rank() {
            Ok(to)
        } else {
            Err(invalid("detail", self, to))
        }
    }
}

impl ReceiptStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Generating => "GENERATING",
            Self::Available => "AVAILABLE",
            Self::Expired => "EXPIRED",
            Self::Failed => "FAILED",
            Self::Downloaded => "DOWNLOADED",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Expired | Self::Failed)
    }

    /// True when the receipt instance is dead and a fresh application is
    /// needed to obtain a usable document.
    pub fn needs_reapply(&self) -> bool {
        self.is_terminal()
    }

    /// Validates a receipt status change.
    pub fn transition(self, to: Self) -> Result<Self> {
        match (self, to) {
            (Self::Generating, Self::Available)
            | (Self::Generating, Self::Failed)
            | (Self::Available, Self::Downloaded)
            | (Self::Available, Self::Expired)
            | (Self::Downloaded, Self::Expired) => Ok(to),
            _ => Err(invalid("receipt", self, to)),
        }
    }
}

fn invalid(kind: &'static str, from: impl fmt::Display, to: impl fmt::Display) -> PayoutError {
    PayoutError::InvalidTransition {
        kind,
        from: from.to_string(),
        to: to.to_string(),
    }
}

impl fmt::Display for BatchStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl fmt::Display for DetailStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl fmt::Display for ReceiptStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
