use crate::error::{PayoutError, Result};
use serde::Deserialize;
use std::io::Read;

#[derive(Debug, Deserialize, PartialEq, Clone, Copy)]
#[serde(rename_all = "lowercase")]
pub enum OpKind {
    /// One detail row of a batch under creation; consecutive `create` rows
    /// sharing an `out_batch_no` form one batch.
    Create,
    /// A provider status report for one detail.
    Update,
    /// Explicit administrative closure of a batch.
    Close,
}

/// One row of the replay input.
#[derive(Debug, Deserialize, PartialEq, Clone)]
pub struct OpRecord {
    pub op: OpKind,
    pub out_batch_no: String,
    #[serde(default)]
    pub batch_name: Option<String>,
    #[serde(default)]
    pub out_detail_no: Option<String>,
    #[serde(default)]
    pub amount: Option<i64>,
    #[serde(default)]
    pub recipient: Option<String>,
    #[serde(default)]
    pub remark: Option<String>,
    #[serde(default)]
    pub provider_code: Option<String>,
}

/// Reads replay operations from a CSV source.
///
/// This reader wraps `csv::Reader` and provides an iterator over
/// `Result<OpRecord>`. It handles whitespace trimming and flexible record
/// lengths automatically.
pub struct OpReader<R: Read> {
    reader: csv::Reader<R>,
}

impl<R: Read> OpReader<R> {
    /// Creates a new `OpReader` from any `Read` source (e.g., File, Stdin).
    pub fn new(source: R) -> Self {
        let reader = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .flexible(true)
            .from_reader(source);
        Self { reader }
    }

    /// Returns an iterator that lazily reads and deserializes operations,
    /// so large replay files stream without loading fully into memory.
    pub fn records(self) -> impl Iterator<Item = Result<OpRecord>> {
        self.reader
            .into_deserialize()
            .map(|result| result.map_err(PayoutError::from))
    }
}
