use clap::Parser;
use miette::{IntoDiagnostic, Result};
use payouts::application::batches::{BatchService, CreateBatchRequest};
use payouts::application::reconciliation::ReconciliationEngine;
use payouts::domain::batch::DetailSpec;
use payouts::domain::ports::BatchStoreRef;
use payouts::domain::provider::{ProviderStatusMap, ProviderUpdate, StatusMapConfig};
use payouts::infrastructure::in_memory::InMemoryBatchStore;
use payouts::interfaces::csv::op_reader::{OpKind, OpReader, OpRecord};
use payouts::interfaces::csv::report_writer::ReportWriter;
use std::fs::File;
use std::io;
use std::path::PathBuf;
use std::sync::Arc;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Input operations CSV file (create/update/close rows)
    input: PathBuf,

    /// Path to persistent database (optional). If provided, uses RocksDB;
    /// requires the storage-rocksdb feature.
    #[arg(long)]
    db_path: Option<PathBuf>,

    /// JSON file overriding the provider status-code table
    #[arg(long)]
    status_map: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(io::stderr)
        .init();

    let cli = Cli::parse();

    let store: BatchStoreRef = match cli.db_path {
        Some(db_path) => open_persistent_store(db_path)?,
        None => Arc::new(InMemoryBatchStore::new()),
    };

    let status_map = match cli.status_map {
        Some(path) => {
            let file = File::open(path).into_diagnostic()?;
            let config: StatusMapConfig = serde_json::from_reader(file).into_diagnostic()?;
            ProviderStatusMap::from(config)
        }
        None => ProviderStatusMap::default(),
    };

    let service = BatchService::new(store.clone());
    let engine = ReconciliationEngine::new(store, status_map);

    // Replay the operation stream. Consecutive create rows for one
    // out_batch_no accumulate into a single batch submission.
    let file = File::open(cli.input).into_diagnostic()?;
    let mut pending: Option<CreateBatchRequest> = None;
    for record in OpReader::new(file).records() {
        let record = match record {
            Ok(record) => record,
            Err(e) => {
                eprintln!("Error reading operation: {}", e);
                continue;
            }
        };

        match record.op {
            OpKind::Create => match detail_spec(&record) {
                Ok(spec) => match &mut pending {
                    Some(request) if request.out_batch_no == record.out_batch_no => {
                        request.details.push(spec);
                    }
                    _ => {
                        submit_pending(&service, pending.take()).await;
                        pending = Some(CreateBatchRequest {
                            out_batch_no: record.out_batch_no.clone(),
                            batch_name: record.batch_name.clone().unwrap_or_default(),
                            remark: record.remark.clone(),
                            details: vec![spec],
                        });
                    }
                },
                Err(e) => eprintln!("Error reading operation: {}", e),
            },
            OpKind::Update => {
                submit_pending(&service, pending.take()).await;
                let update = ProviderUpdate {
                    out_batch_no: Some(record.out_batch_no.clone()),
                    out_detail_no: record.out_detail_no.clone(),
                    status_code: record.provider_code.clone().unwrap_or_default(),
                    ..Default::default()
                };
                if let Err(e) = engine.apply_update(update).await {
                    eprintln!("Error processing update: {}", e);
                }
            }
            OpKind::Close => {
                submit_pending(&service, pending.take()).await;
                if let Err(e) = service.close_batch(&record.out_batch_no).await {
                    eprintln!("Error closing batch: {}", e);
                }
            }
        }
    }
    submit_pending(&service, pending.take()).await;

    let batches = service.list_batches().await.into_diagnostic()?;

    let stdout = io::stdout();
    let mut writer = ReportWriter::new(stdout.lock());
    writer.write_batches(&batches).into_diagnostic()?;

    Ok(())
}

fn detail_spec(record: &OpRecord) -> payouts::error::Result<DetailSpec> {
    let missing = |field: &str| {
        payouts::error::PayoutError::ValidationError(format!(
            "create row for batch {} is missing {field}",
            record.out_batch_no
        ))
    };
    Ok(DetailSpec {
        out_detail_no: record.out_detail_no.clone().ok_or_else(|| missing("out_detail_no"))?,
        amount: record.amount.ok_or_else(|| missing("amount"))?,
        recipient: record.recipient.clone().ok_or_else(|| missing("recipient"))?,
        remark: None,
    })
}

async fn submit_pending(service: &BatchService, pending: Option<CreateBatchRequest>) {
    if let Some(request) = pending
        && let Err(e) = service.create_batch(request).await
    {
        eprintln!("Error creating batch: {}", e);
    }
}

#[cfg(feature = "storage-rocksdb")]
fn open_persistent_store(db_path: PathBuf) -> Result<BatchStoreRef> {
    let store = payouts::infrastructure::rocksdb::RocksDbStore::open(db_path).into_diagnostic()?;
    Ok(Arc::new(store))
}

#[cfg(not(feature = "storage-rocksdb"))]
fn open_persistent_store(_db_path: PathBuf) -> Result<BatchStoreRef> {
    Err(miette::miette!(
        "--db-path requires building with the storage-rocksdb feature"
    ))
}
