mod memory;
mod rest;

pub use memory::{ MemoryStore, SeedData };
pub use rest::RestStore;

use async_trait::async_trait;
use chrono::{ DateTime, Utc };
use log::info;
use std::error::Error;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

use crate::cli::Args;
use crate::models::inventory::{ HealthRecord, Medicine, MedicinePayload };

pub const MEDICINES_TABLE: &str = "medicines";
pub const HEALTH_RECORDS_TABLE: &str = "patient_health_records";
pub const ANALYSIS_TABLE: &str = "patient_analysis";

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("{table} request failed with status {status}: {message}")]
    Api {
        table: String,
        status: u16,
        message: String,
    },
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("{table} row '{id}' not found")]
    NotFound {
        table: String,
        id: String,
    },
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

#[async_trait]
pub trait MedicineStore: Send + Sync {
    /// All medicines, newest first.
    async fn list_medicines(&self) -> Result<Vec<Medicine>, StoreError>;

    async fn find_medicines_by_name(&self, name: &str) -> Result<Vec<Medicine>, StoreError>;

    async fn insert_medicine(&self, payload: &MedicinePayload) -> Result<Medicine, StoreError>;

    async fn update_medicine(
        &self,
        id: &str,
        payload: &MedicinePayload
    ) -> Result<Medicine, StoreError>;

    async fn set_stock_quantity(&self, id: &str, stock_quantity: i64) -> Result<(), StoreError>;

    async fn delete_medicine(&self, id: &str) -> Result<(), StoreError>;
}

#[async_trait]
pub trait HealthRecordStore: Send + Sync {
    /// Records with `start <= updated_at < end`.
    async fn records_updated_between(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>
    ) -> Result<Vec<HealthRecord>, StoreError>;

    /// Flips the record's `count` to 1.
    async fn mark_processed(&self, record_id: &str) -> Result<(), StoreError>;

    /// Distinct non-empty visit ids, in first-seen order.
    async fn visit_patient_ids(&self) -> Result<Vec<String>, StoreError>;
}

#[async_trait]
pub trait AnalysisStore: Send + Sync {
    async fn existing_analysis(&self, visit_patient_id: &str) -> Result<Option<String>, StoreError>;
}

#[derive(Clone)]
pub struct Stores {
    pub medicines: Arc<dyn MedicineStore>,
    pub records: Arc<dyn HealthRecordStore>,
    pub analyses: Arc<dyn AnalysisStore>,
}

impl Stores {
    fn from_backend<S>(backend: Arc<S>) -> Self
        where S: MedicineStore + HealthRecordStore + AnalysisStore + 'static
    {
        Self {
            medicines: backend.clone(),
            records: backend.clone(),
            analyses: backend,
        }
    }
}

pub fn create_stores(args: &Args) -> Result<Stores, Box<dyn Error + Send + Sync>> {
    match args.store_type.to_lowercase().as_str() {
        "rest" => {
            let store = RestStore::new(
                &args.database_url,
                &args.database_key,
                Duration::from_secs(args.http_timeout_secs)
            )?;
            Ok(Stores::from_backend(Arc::new(store)))
        }
        "memory" => {
            let store = match &args.store_seed_path {
                Some(path) => MemoryStore::from_seed_file(path)?,
                None => MemoryStore::default(),
            };
            Ok(Stores::from_backend(Arc::new(store)))
        }
        _ =>
            Err(
                Box::new(
                    std::io::Error::new(
                        std::io::ErrorKind::InvalidInput,
                        format!("Unsupported store type: {}", args.store_type)
                    )
                )
            ),
    }
}

pub fn initialize_stores(args: &Args) -> Result<Stores, Box<dyn Error + Send + Sync>> {
    match args.store_type.to_lowercase().as_str() {
        "memory" =>
            info!(
                "Clinic data will be kept in memory (seed: {})",
                args.store_seed_path.as_deref().unwrap_or("none")
            ),
        _ => info!("Clinic data will be read from: {} at {}", args.store_type, args.database_url),
    }
    create_stores(args)
}

pub(crate) fn distinct_visit_ids<I>(ids: I) -> Vec<String> where I: IntoIterator<Item = Option<String>> {
    let mut seen = Vec::new();
    for id in ids.into_iter().flatten() {
        if !id.is_empty() && !seen.contains(&id) {
            seen.push(id);
        }
    }
    seen
}
