//! Application layer containing the core business logic orchestration.
//!
//! `BatchService` owns batch creation and closure, `ReconciliationEngine`
//! merges provider-reported status into local state, and `ReceiptManager`
//! runs the independent receipt lifecycle. All three work against the
//! domain ports and serialize per-aggregate writes with `KeyedLocks`.

pub mod batches;
pub mod locks;
pub mod receipts;
pub mod reconciliation;
