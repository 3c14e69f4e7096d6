//! Domain model: statuses and their transition rules, the batch aggregate,
//! receipts, the normalized provider feed, and the persistence/clock ports.

pub mod batch;
pub mod ports;
pub mod provider;
pub mod receipt;
pub mod status;
