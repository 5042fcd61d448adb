use async_trait::async_trait;
use chrono::{ DateTime, Utc };
use serde::Deserialize;
use std::collections::HashMap;
use std::fs;
use tokio::sync::Mutex;
use uuid::Uuid;

use super::{
    distinct_visit_ids,
    AnalysisStore,
    HealthRecordStore,
    MedicineStore,
    StoreError,
    HEALTH_RECORDS_TABLE,
    MEDICINES_TABLE,
};
use crate::models::de::parse_datetime;
use crate::models::inventory::{ HealthRecord, Medicine, MedicinePayload };

/// Contents of a memory store seed file.
#[derive(Debug, Default, Deserialize)]
pub struct SeedData {
    #[serde(default)]
    pub medicines: Vec<Medicine>,
    #[serde(default)]
    pub health_records: Vec<HealthRecord>,
    /// visit_patient_id -> stored analysis text
    #[serde(default)]
    pub analyses: HashMap<String, String>,
}

#[derive(Default)]
pub struct MemoryStore {
    data: Mutex<SeedData>,
}

impl MemoryStore {
    pub fn new(seed: SeedData) -> Self {
        Self { data: Mutex::new(seed) }
    }

    pub fn from_seed_file(path: &str) -> Result<Self, StoreError> {
        let text = fs::read_to_string(path)?;
        let seed: SeedData = serde_json::from_str(&text)?;
        Ok(Self::new(seed))
    }

    pub async fn medicine(&self, id: &str) -> Option<Medicine> {
        self.data.lock().await.medicines
            .iter()
            .find(|m| m.id == id)
            .cloned()
    }

    pub async fn record(&self, id: &str) -> Option<HealthRecord> {
        self.data.lock().await.health_records
            .iter()
            .find(|r| r.id == id)
            .cloned()
    }
}

fn not_found(table: &str, id: &str) -> StoreError {
    StoreError::NotFound { table: table.to_string(), id: id.to_string() }
}

fn apply_payload(medicine: &mut Medicine, payload: &MedicinePayload) {
    medicine.name = payload.name.clone();
    medicine.category = Some(payload.category.clone()).filter(|c| !c.is_empty());
    medicine.batch_number = payload.batch_number.clone();
    medicine.manufacturer = payload.manufacturer.clone();
    medicine.stock_quantity = payload.stock_quantity;
    medicine.unit_price = payload.unit_price;
    medicine.expiry_date = parse_datetime(&payload.expiry_date);
    medicine.purchase_date = payload.purchase_date.as_deref().and_then(parse_datetime);
    medicine.threshold_limit = payload.threshold_limit;
    medicine.description = Some(payload.description.clone()).filter(|d| !d.is_empty());
}

#[async_trait]
impl MedicineStore for MemoryStore {
    async fn list_medicines(&self) -> Result<Vec<Medicine>, StoreError> {
        let mut medicines = self.data.lock().await.medicines.clone();
        // Newest first; rows without a timestamp sink to the end.
        medicines.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(medicines)
    }

    async fn find_medicines_by_name(&self, name: &str) -> Result<Vec<Medicine>, StoreError> {
        Ok(
            self.data.lock().await.medicines
                .iter()
                .filter(|m| m.name == name)
                .cloned()
                .collect()
        )
    }

    async fn insert_medicine(&self, payload: &MedicinePayload) -> Result<Medicine, StoreError> {
        let mut medicine = Medicine {
            id: Uuid::new_v4().to_string(),
            name: String::new(),
            category: None,
            batch_number: String::new(),
            manufacturer: String::new(),
            stock_quantity: 0,
            unit_price: 0.0,
            expiry_date: None,
            purchase_date: None,
            threshold_limit: 0,
            description: None,
            created_at: Some(Utc::now()),
        };
        apply_payload(&mut medicine, payload);
        self.data.lock().await.medicines.push(medicine.clone());
        Ok(medicine)
    }

    async fn update_medicine(
        &self,
        id: &str,
        payload: &MedicinePayload
    ) -> Result<Medicine, StoreError> {
        let mut data = self.data.lock().await;
        let medicine = data.medicines
            .iter_mut()
            .find(|m| m.id == id)
            .ok_or_else(|| not_found(MEDICINES_TABLE, id))?;
        apply_payload(medicine, payload);
        Ok(medicine.clone())
    }

    async fn set_stock_quantity(&self, id: &str, stock_quantity: i64) -> Result<(), StoreError> {
        let mut data = self.data.lock().await;
        let medicine = data.medicines
            .iter_mut()
            .find(|m| m.id == id)
            .ok_or_else(|| not_found(MEDICINES_TABLE, id))?;
        medicine.stock_quantity = stock_quantity;
        Ok(())
    }

    async fn delete_medicine(&self, id: &str) -> Result<(), StoreError> {
        self.data.lock().await.medicines.retain(|m| m.id != id);
        Ok(())
    }
}

#[async_trait]
impl HealthRecordStore for MemoryStore {
    async fn records_updated_between(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>
    ) -> Result<Vec<HealthRecord>, StoreError> {
        Ok(
            self.data.lock().await.health_records
                .iter()
                .filter(|r| matches!(r.updated_at, Some(t) if t >= start && t < end))
                .cloned()
                .collect()
        )
    }

    async fn mark_processed(&self, record_id: &str) -> Result<(), StoreError> {
        let mut data = self.data.lock().await;
        let record = data.health_records
            .iter_mut()
            .find(|r| r.id == record_id)
            .ok_or_else(|| not_found(HEALTH_RECORDS_TABLE, record_id))?;
        record.count = Some(1);
        Ok(())
    }

    async fn visit_patient_ids(&self) -> Result<Vec<String>, StoreError> {
        let data = self.data.lock().await;
        Ok(distinct_visit_ids(data.health_records.iter().map(|r| r.visit_patient_id.clone())))
    }
}

#[async_trait]
impl AnalysisStore for MemoryStore {
    async fn existing_analysis(&self, visit_patient_id: &str) -> Result<Option<String>, StoreError> {
        Ok(self.data.lock().await.analyses.get(visit_patient_id).cloned())
    }
}
