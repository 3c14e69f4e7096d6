use crate::domain::batch::TransferBatch;
use crate::domain::ports::{BatchStore, ReceiptStore};
use crate::domain::receipt::{ReceiptTarget, TransferReceipt};
use crate::domain::status::ReceiptStatus;
use crate::error::{PayoutError, Result};
use async_trait::async_trait;
use rocksdb::{ColumnFamilyDescriptor, DB, Options};
use std::path::Path;
use std::sync::Arc;

/// Column Family for batch aggregates (details embedded), keyed by
/// `out_batch_no`.
pub const CF_BATCHES: &str = "batches";
/// Column Family for receipts, keyed by `apply_no`.
pub const CF_RECEIPTS: &str = "receipts";
/// Column Family mapping provider batch ids to `out_batch_no`.
pub const CF_BATCH_INDEX: &str = "batch_index";
/// Column Family mapping provider detail ids to `out_batch_no`.
pub const CF_DETAIL_INDEX: &str = "detail_index";

/// A persistent store implementation using RocksDB.
///
/// Batches and receipts live in separate Column Families with serde_json
/// values; two index families resolve provider-assigned ids back to the
/// owning batch. Deleting a batch must also remove its receipts and index
/// entries; the replay tool never deletes, so only writes are implemented.
///
/// This struct is thread-safe (`Clone` shares the underlying `Arc<DB>`).
#[derive(Clone)]
pub struct RocksDbStore {
    db: Arc<DB>,
}

impl RocksDbStore {
    /// Opens or creates a RocksDB instance at the specified path, ensuring
    /// all required column families exist.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let mut opts = Options::default();
        opts.create_if_missing(true);
        opts.create_missing_column_families(true);

        let cfs = [CF_BATCHES, CF_RECEIPTS, CF_BATCH_INDEX, CF_DETAIL_INDEX]
            .into_iter()
            .map(|name| ColumnFamilyDescriptor::new(name, Options::default()))
            .collect::<Vec<_>>();

        let db = DB::open_cf_descriptors(&opts, path, cfs)
            .map_err(|e| PayoutError::InternalError(Box::new(e)))?;

        Ok(Self { db: Arc::new(db) })
    }

    fn cf(&self, name: &str) -> Result<&rocksdb::ColumnFamily> {
        self.db.cf_handle(name).ok_or_else(|| {
            PayoutError::InternalError(Box::new(std::io::Error::other(format!(
                "column family {name} not found"
            ))))
        })
    }

    fn put_json<T: serde::Serialize>(&self, cf_name: &str, key: &str, value: &T) -> Result<()> {
        let cf = self.cf(cf_name)?;
        let bytes = serde_json::to_vec(value)
            .map_err(|e| PayoutError::InternalError(Box::new(e)))?;
        self.db
            .put_cf(cf, key.as_bytes(), bytes)
            .map_err(|e| PayoutError::InternalError(Box::new(e)))
    }

    fn get_json<T: serde::de::DeserializeOwned>(
        &self,
        cf_name: &str,
        key: &str,
    ) -> Result<Option<T>> {
        let cf = self.cf(cf_name)?;
        let bytes = self
            .db
            .get_cf(cf, key.as_bytes())
            .map_err(|e| PayoutError::InternalError(Box::new(e)))?;
        match bytes {
            Some(bytes) => {
                let value = serde_json::from_slice(&bytes)
                    .map_err(|e| PayoutError::InternalError(Box::new(e)))?;
                Ok(Some(value))
            }
            None => Ok(None),
        }
    }

    fn get_indexed(&self, index_cf: &str, id: &str) -> Result<Option<TransferBatch>> {
        let cf = self.cf(index_cf)?;
        let key = self
            .db
            .get_cf(cf, id.as_bytes())
            .map_err(|e| PayoutError::InternalError(Box::new(e)))?;
        match key {
            Some(bytes) => {
                let out_batch_no = String::from_utf8(bytes)
                    .map_err(|e| PayoutError::InternalError(Box::new(e)))?;
                self.get_json(CF_BATCHES, &out_batch_no)
            }
            None => Ok(None),
        }
    }

    fn all_json<T: serde::de::DeserializeOwned>(&self, cf_name: &str) -> Result<Vec<T>> {
        let cf = self.cf(cf_name)?;
        let mut values = Vec::new();
        for item in self.db.iterator_cf(cf, rocksdb::IteratorMode::Start) {
            let (_key, value) = item.map_err(|e| PayoutError::InternalError(Box::new(e)))?;
            values.push(
                serde_json::from_slice(&value)
                    .map_err(|e| PayoutError::InternalError(Box::new(e)))?,
            );
        }
        Ok(values)
    }
}

#[async_trait]
impl BatchStore for RocksDbStore {
    async fn store(&self, batch: TransferBatch) -> Result<()> {
        if let Some(id) = &batch.batch_id {
            let cf = self.cf(CF_BATCH_INDEX)?;
            self.db
                .put_cf(cf, id.as_bytes(), batch.out_batch_no.as_bytes())
                .map_err(|e| PayoutError::InternalError(Box::new(e)))?;
        }
        for detail in &batch.details {
            if let Some(id) = &detail.detail_id {
                let cf = self.cf(CF_DETAIL_INDEX)?;
                self.db
                    .put_cf(cf, id.as_bytes(), batch.out_batch_no.as_bytes())
                    .map_err(|e| PayoutError::InternalError(Box::new(e)))?;
            }
        }
        self.put_json(CF_BATCHES, &batch.out_batch_no, &batch)
    }

    async fn get(&self, out_batch_no: &str) -> Result<Option<TransferBatch>> {
        self.get_json(CF_BATCHES, out_batch_no)
    }

    async fn get_by_provider_batch_id(&self, batch_id: &str) -> Result<Option<TransferBatch>> {
        self.get_indexed(CF_BATCH_INDEX, batch_id)
    }

    async fn get_by_provider_detail_id(&self, detail_id: &str) -> Result<Option<TransferBatch>> {
        self.get_indexed(CF_DETAIL_INDEX, detail_id)
    }

    async fn get_all(&self) -> Result<Vec<TransferBatch>> {
        self.all_json(CF_BATCHES)
    }
}

#[async_trait]
impl ReceiptStore for RocksDbStore {
    async fn store(&self, receipt: TransferReceipt) -> Result<()> {
        self.put_json(CF_RECEIPTS, &receipt.apply_no, &receipt)
    }

    async fn get(&self, apply_no: &str) -> Result<Option<TransferReceipt>> {
        self.get_json(CF_RECEIPTS, apply_no)
    }

    async fn find_in_flight(
        &self,
        target: &ReceiptTarget,
        receipt_type: &str,
    ) -> Result<Option<TransferReceipt>> {
        let receipts: Vec<TransferReceipt> = self.all_json(CF_RECEIPTS)?;
        Ok(receipts.into_iter().find(|r| {
            r.status == ReceiptStatus::Generating
                && r.target == *target
                && r.receipt_type == receipt_type
        }))
    }

    async fn get_all(&self) -> Result<Vec<TransferReceipt>> {
        self.all_json(CF_RECEIPTS)
    }
}
