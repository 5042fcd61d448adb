use chrono::{ DateTime, Days, NaiveDate, Utc };
use log::{ error, info, warn };
use std::sync::Arc;

use crate::models::inventory::HealthRecord;
use crate::store::{ HealthRecordStore, MedicineStore, StoreError };

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StockUpdate {
    pub medicine_id: String,
    pub medicine_name: String,
    pub from: i64,
    pub to: i64,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReconcileReport {
    pub records_seen: usize,
    pub records_processed: usize,
    pub records_skipped: usize,
    pub stock_updates: Vec<StockUpdate>,
    pub missing_medicines: Vec<String>,
    pub failures: usize,
}

/// `[00:00 of day, 00:00 of the next day)` in UTC.
pub fn day_window(day: NaiveDate) -> (DateTime<Utc>, DateTime<Utc>) {
    let start = day.and_hms_opt(0, 0, 0).unwrap_or_default().and_utc();
    let end = day
        .checked_add_days(Days::new(1))
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|d| d.and_utc())
        .unwrap_or(start);
    (start, end)
}

/// Applies same-day dispensations to medicine stock.
pub struct Reconciler {
    medicines: Arc<dyn MedicineStore>,
    records: Arc<dyn HealthRecordStore>,
}

impl Reconciler {
    pub fn new(medicines: Arc<dyn MedicineStore>, records: Arc<dyn HealthRecordStore>) -> Self {
        Self { medicines, records }
    }

    pub async fn reconcile(&self) -> Result<ReconcileReport, StoreError> {
        self.reconcile_day(Utc::now().date_naive()).await
    }

    /// Only a failure to list the day's records aborts the pass; every
    /// per-row failure is logged and counted.
    pub async fn reconcile_day(&self, day: NaiveDate) -> Result<ReconcileReport, StoreError> {
        let (start, end) = day_window(day);
        info!("Reconciling stock for {} ({} .. {})", day, start, end);

        let records = self.records.records_updated_between(start, end).await.map_err(|e| {
            error!("Error fetching health records: {}", e);
            e
        })?;

        let mut report = ReconcileReport { records_seen: records.len(), ..Default::default() };
        for record in &records {
            if !record.is_pending() {
                info!("Skipping record ID: {} because count is not 0", record.id);
                report.records_skipped += 1;
                continue;
            }
            self.apply_record(record, &mut report).await;
            match self.records.mark_processed(&record.id).await {
                Ok(()) => info!("Marked record ID: {} as processed", record.id),
                Err(e) => {
                    error!("Error updating count for record {}: {}", record.id, e);
                    report.failures += 1;
                }
            }
            report.records_processed += 1;
        }

        info!(
            "Reconcile finished: {} records, {} processed, {} skipped, {} stock updates, {} failures",
            report.records_seen,
            report.records_processed,
            report.records_skipped,
            report.stock_updates.len(),
            report.failures
        );
        Ok(report)
    }

    async fn apply_record(&self, record: &HealthRecord, report: &mut ReconcileReport) {
        for (name, quantity) in record.medication.iter().filter_map(|m| m.dispensed()) {
            info!("Processing medication: {}, Quantity: {}", name, quantity);

            let matches = match self.medicines.find_medicines_by_name(name).await {
                Ok(m) => m,
                Err(e) => {
                    error!("Error fetching medicine '{}': {}", name, e);
                    report.failures += 1;
                    continue;
                }
            };
            let Some(medicine) = matches.into_iter().next() else {
                warn!("Medicine not found: {}", name);
                report.missing_medicines.push(name.to_string());
                continue;
            };

            let new_stock = medicine.stock_quantity.saturating_sub(quantity).max(0);
            info!("Updating stock for {} from {} to {}", name, medicine.stock_quantity, new_stock);
            match self.medicines.set_stock_quantity(&medicine.id, new_stock).await {
                Ok(()) =>
                    report.stock_updates.push(StockUpdate {
                        medicine_id: medicine.id.clone(),
                        medicine_name: medicine.name.clone(),
                        from: medicine.stock_quantity,
                        to: new_stock,
                    }),
                Err(e) => {
                    error!("Error updating stock quantity for {}: {}", name, e);
                    report.failures += 1;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::inventory::{ Medicine, MedicinePayload };
    use crate::store::{ MemoryStore, SeedData };
    use async_trait::async_trait;
    use serde_json::json;

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 6, 1).unwrap()
    }

    fn seed(value: serde_json::Value) -> Arc<MemoryStore> {
        let seed: SeedData = serde_json::from_value(value).unwrap();
        Arc::new(MemoryStore::new(seed))
    }

    fn reconciler(store: &Arc<MemoryStore>) -> Reconciler {
        Reconciler::new(store.clone(), store.clone())
    }

    #[test]
    fn window_covers_the_whole_day() {
        let (start, end) = day_window(today());
        assert_eq!(start.to_rfc3339(), "2025-06-01T00:00:00+00:00");
        assert_eq!(end.to_rfc3339(), "2025-06-02T00:00:00+00:00");
    }

    #[tokio::test]
    async fn paracetamol_scenario_decrements_once_and_flags_low_stock() {
        let store = seed(json!({
            "medicines": [
                { "id": "m1", "name": "Paracetamol", "stock_quantity": 10, "threshold_limit": 5 }
            ],
            "health_records": [
                {
                    "id": "r1",
                    "medication": [{ "medicine_name": "Paracetamol", "quantity": 7 }],
                    "count": 0,
                    "updated_at": "2025-06-01T09:30:00+00:00"
                }
            ]
        }));

        let report = reconciler(&store).reconcile_day(today()).await.unwrap();
        assert_eq!(report.records_processed, 1);
        assert_eq!(
            report.stock_updates,
            vec![StockUpdate {
                medicine_id: "m1".into(),
                medicine_name: "Paracetamol".into(),
                from: 10,
                to: 3,
            }]
        );
        let medicine = store.medicine("m1").await.unwrap();
        assert_eq!(medicine.stock_quantity, 3);
        assert!(medicine.is_low_stock());
        assert_eq!(store.record("r1").await.unwrap().count, Some(1));

        let again = reconciler(&store).reconcile_day(today()).await.unwrap();
        assert_eq!(again.records_skipped, 1);
        assert!(again.stock_updates.is_empty());
        assert_eq!(store.medicine("m1").await.unwrap().stock_quantity, 3);
    }

    #[tokio::test]
    async fn stock_never_goes_negative_and_unknown_names_are_skipped() {
        let store = seed(json!({
            "medicines": [
                { "id": "m1", "name": "Amoxicillin", "stock_quantity": 2, "threshold_limit": 5 }
            ],
            "health_records": [
                {
                    "id": "r1",
                    "medication": [
                        { "medicine_name": "Unobtainium", "quantity": 1 },
                        { "medicine_name": "Amoxicillin", "quantity": 9 }
                    ],
                    "count": 0,
                    "updated_at": "2025-06-01T23:59:59.500+00:00"
                },
                {
                    "id": "r-yesterday",
                    "medication": [{ "medicine_name": "Amoxicillin", "quantity": 1 }],
                    "count": 0,
                    "updated_at": "2025-05-31T23:00:00+00:00"
                }
            ]
        }));

        let report = reconciler(&store).reconcile_day(today()).await.unwrap();
        assert_eq!(report.records_seen, 1);
        assert_eq!(report.missing_medicines, vec!["Unobtainium".to_string()]);
        assert_eq!(store.medicine("m1").await.unwrap().stock_quantity, 0);
        assert_eq!(store.record("r1").await.unwrap().count, Some(1));
        assert_eq!(store.record("r-yesterday").await.unwrap().count, Some(0));
    }

    /// Medicine store whose stock writes fail for one name.
    struct Flaky {
        inner: Arc<MemoryStore>,
        broken: &'static str,
    }

    #[async_trait]
    impl MedicineStore for Flaky {
        async fn list_medicines(&self) -> Result<Vec<Medicine>, StoreError> {
            self.inner.list_medicines().await
        }
        async fn find_medicines_by_name(&self, name: &str) -> Result<Vec<Medicine>, StoreError> {
            self.inner.find_medicines_by_name(name).await
        }
        async fn insert_medicine(&self, p: &MedicinePayload) -> Result<Medicine, StoreError> {
            self.inner.insert_medicine(p).await
        }
        async fn update_medicine(
            &self,
            id: &str,
            p: &MedicinePayload
        ) -> Result<Medicine, StoreError> {
            self.inner.update_medicine(id, p).await
        }
        async fn set_stock_quantity(&self, id: &str, qty: i64) -> Result<(), StoreError> {
            if id == self.broken {
                return Err(StoreError::Api {
                    table: "medicines".into(),
                    status: 503,
                    message: "unavailable".into(),
                });
            }
            self.inner.set_stock_quantity(id, qty).await
        }
        async fn delete_medicine(&self, id: &str) -> Result<(), StoreError> {
            self.inner.delete_medicine(id).await
        }
    }

    #[tokio::test]
    async fn row_failures_do_not_abort_the_pass() {
        let store = seed(json!({
            "medicines": [
                { "id": "m1", "name": "Cetirizine", "stock_quantity": 10, "threshold_limit": 2 },
                { "id": "m2", "name": "Metformin", "stock_quantity": 10, "threshold_limit": 2 }
            ],
            "health_records": [
                {
                    "id": "r1",
                    "medication": [
                        { "medicine_name": "Cetirizine", "quantity": 1 },
                        { "medicine_name": "Metformin", "quantity": 4 }
                    ],
                    "count": 0,
                    "updated_at": "2025-06-01T10:00:00Z"
                }
            ]
        }));
        let flaky = Arc::new(Flaky { inner: store.clone(), broken: "m1" });
        let report = Reconciler::new(flaky, store.clone()).reconcile_day(today()).await.unwrap();

        assert_eq!(report.failures, 1);
        assert_eq!(store.medicine("m1").await.unwrap().stock_quantity, 10);
        assert_eq!(store.medicine("m2").await.unwrap().stock_quantity, 6);
        assert_eq!(store.record("r1").await.unwrap().count, Some(1));
    }

    #[tokio::test]
    async fn records_without_a_count_are_left_alone() {
        let store = seed(json!({
            "medicines": [
                { "id": "m1", "name": "Paracetamol", "stock_quantity": 10, "threshold_limit": 5 }
            ],
            "health_records": [
                {
                    "id": "r-null",
                    "medication": [{ "medicine_name": "Paracetamol", "quantity": 7 }],
                    "count": null,
                    "updated_at": "2025-06-01T09:30:00+00:00"
                },
                {
                    "id": "r-missing",
                    "medication": [{ "medicine_name": "Paracetamol", "quantity": 2 }],
                    "updated_at": "2025-06-01T10:30:00+00:00"
                }
            ]
        }));

        let report = reconciler(&store).reconcile_day(today()).await.unwrap();
        assert_eq!(report.records_processed, 0);
        assert_eq!(report.records_skipped, 2);
        assert_eq!(store.medicine("m1").await.unwrap().stock_quantity, 10);
        assert_eq!(store.record("r-null").await.unwrap().count, None);
    }

    #[tokio::test]
    async fn extreme_quantities_do_not_abort_the_pass() {
        let store = seed(json!({
            "medicines": [
                { "id": "m1", "name": "Paracetamol", "stock_quantity": 10, "threshold_limit": 5 },
                { "id": "m2", "name": "Ibuprofen", "stock_quantity": 10, "threshold_limit": 5 }
            ],
            "health_records": [
                {
                    "id": "r1",
                    "medication": [
                        { "medicine_name": "Paracetamol", "quantity": "-1e30" },
                        { "medicine_name": "Ibuprofen", "quantity": "1e30" }
                    ],
                    "count": 0,
                    "updated_at": "2025-06-01T09:30:00+00:00"
                }
            ]
        }));

        let report = reconciler(&store).reconcile_day(today()).await.unwrap();
        assert_eq!(report.records_processed, 1);
        assert_eq!(store.medicine("m1").await.unwrap().stock_quantity, 10);
        assert_eq!(store.medicine("m2").await.unwrap().stock_quantity, 0);
        assert_eq!(store.record("r1").await.unwrap().count, Some(1));
    }
}
