use chrono::{ DateTime, Utc };
use serde::{ Serialize, Deserialize };

use super::de;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Medicine {
    #[serde(deserialize_with = "de::id")]
    pub id: String,
    #[serde(default, deserialize_with = "de::string")]
    pub name: String,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default, deserialize_with = "de::string")]
    pub batch_number: String,
    #[serde(default, deserialize_with = "de::string")]
    pub manufacturer: String,
    #[serde(default, deserialize_with = "de::int")]
    pub stock_quantity: i64,
    #[serde(default, deserialize_with = "de::float")]
    pub unit_price: f64,
    #[serde(default, deserialize_with = "de::opt_datetime")]
    pub expiry_date: Option<DateTime<Utc>>,
    #[serde(default, deserialize_with = "de::opt_datetime")]
    pub purchase_date: Option<DateTime<Utc>>,
    #[serde(default, deserialize_with = "de::int")]
    pub threshold_limit: i64,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default, deserialize_with = "de::opt_datetime")]
    pub created_at: Option<DateTime<Utc>>,
}

impl Medicine {
    pub fn is_low_stock(&self) -> bool {
        self.stock_quantity <= self.threshold_limit
    }
}

/// Column values written on insert/update. Dates are already normalized strings.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct MedicinePayload {
    pub name: String,
    pub category: String,
    pub batch_number: String,
    pub manufacturer: String,
    pub stock_quantity: i64,
    pub unit_price: f64,
    pub expiry_date: String,
    pub purchase_date: Option<String>,
    pub threshold_limit: i64,
    pub description: String,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct MedicationEntry {
    #[serde(default)]
    pub medicine_name: Option<String>,
    #[serde(default, deserialize_with = "de::opt_int")]
    pub quantity: Option<i64>,
}

impl MedicationEntry {
    /// Entries without a name or without a positive quantity carry no stock effect.
    pub fn dispensed(&self) -> Option<(&str, i64)> {
        let name = self.medicine_name.as_deref().filter(|n| !n.is_empty())?;
        match self.quantity {
            Some(q) if q > 0 => Some((name, q)),
            _ => None,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct HealthRecord {
    #[serde(deserialize_with = "de::id")]
    pub id: String,
    #[serde(default, deserialize_with = "de::opt_id")]
    pub visit_patient_id: Option<String>,
    #[serde(default, deserialize_with = "de::list_or_empty")]
    pub medication: Vec<MedicationEntry>,
    /// 0 until the record's stock effect has been applied; unset counts are never applied.
    #[serde(default, deserialize_with = "de::opt_int")]
    pub count: Option<i64>,
    #[serde(default, deserialize_with = "de::opt_datetime")]
    pub updated_at: Option<DateTime<Utc>>,
}

impl HealthRecord {
    pub fn is_pending(&self) -> bool {
        self.count == Some(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn record_tolerates_null_medication_and_string_quantities() {
        let rec: HealthRecord = serde_json::from_value(json!({
            "id": 42,
            "medication": null,
            "count": 0,
            "updated_at": "2025-06-01T08:00:00+00:00"
        })).unwrap();
        assert_eq!(rec.id, "42");
        assert!(rec.medication.is_empty());
        assert!(rec.is_pending());

        let rec: HealthRecord = serde_json::from_value(json!({
            "id": "r-1",
            "medication": [
                { "medicine_name": "Paracetamol", "quantity": "7" },
                { "medicine_name": "", "quantity": 2 },
                { "medicine_name": "Ibuprofen" }
            ],
            "count": 1
        })).unwrap();
        let dispensed: Vec<_> = rec.medication.iter().filter_map(|m| m.dispensed()).collect();
        assert_eq!(dispensed, vec![("Paracetamol", 7)]);
        assert!(!rec.is_pending());
    }

    #[test]
    fn low_stock_is_inclusive_of_threshold() {
        let mut med: Medicine = serde_json::from_value(json!({
            "id": "m1",
            "name": "Paracetamol",
            "batch_number": "B1",
            "manufacturer": "Acme",
            "stock_quantity": 5,
            "unit_price": "1.25",
            "expiry_date": "2026-01-01",
            "threshold_limit": 5
        })).unwrap();
        assert!(med.is_low_stock());
        med.stock_quantity = 6;
        assert!(!med.is_low_stock());
        assert_eq!(med.unit_price, 1.25);
    }

    #[test]
    fn null_count_is_not_pending() {
        let rec: HealthRecord = serde_json::from_value(json!({
            "id": "r-2",
            "visit_patient_id": 1042,
            "count": null
        })).unwrap();
        assert_eq!(rec.count, None);
        assert_eq!(rec.visit_patient_id.as_deref(), Some("1042"));
        assert!(!rec.is_pending());

        let rec: HealthRecord = serde_json::from_value(json!({ "id": "r-3" })).unwrap();
        assert!(!rec.is_pending());
    }

    #[test]
    fn negative_quantities_are_not_dispensed() {
        let entry: MedicationEntry = serde_json::from_value(json!({
            "medicine_name": "Paracetamol",
            "quantity": "-1e30"
        })).unwrap();
        assert_eq!(entry.quantity, Some(i64::MIN));
        assert_eq!(entry.dispensed(), None);
    }

    #[test]
    fn null_text_columns_read_as_empty() {
        let med: Medicine = serde_json::from_value(json!({
            "id": 7,
            "name": null,
            "batch_number": null,
            "manufacturer": null,
            "stock_quantity": 3
        })).unwrap();
        assert_eq!(med.name, "");
        assert_eq!(med.batch_number, "");
        assert_eq!(med.stock_quantity, 3);
    }
}
