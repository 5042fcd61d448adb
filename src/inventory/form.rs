use chrono::{ SecondsFormat, Utc };
use thiserror::Error;

use crate::models::de::parse_datetime;
use crate::models::inventory::{ Medicine, MedicinePayload };

pub const DEFAULT_THRESHOLD_LIMIT: i64 = 5;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum FormError {
    #[error("Missing required fields: {}", .0.join(", "))]
    MissingFields(Vec<&'static str>),
    #[error("Invalid number for {field}: '{value}'")]
    InvalidNumber {
        field: &'static str,
        value: String,
    },
    #[error("Invalid date for {field}: '{value}'")]
    InvalidDate {
        field: &'static str,
        value: String,
    },
}

/// Editable medicine fields, kept as entered.
#[derive(Clone, Debug, PartialEq)]
pub struct MedicineForm {
    pub name: String,
    pub category: String,
    pub batch_number: String,
    pub manufacturer: String,
    pub stock_quantity: String,
    pub unit_price: String,
    pub expiry_date: String,
    pub purchase_date: String,
    pub threshold_limit: String,
    pub description: String,
}

impl Default for MedicineForm {
    fn default() -> Self {
        Self {
            name: String::new(),
            category: String::new(),
            batch_number: String::new(),
            manufacturer: String::new(),
            stock_quantity: "0".to_string(),
            unit_price: "0".to_string(),
            expiry_date: String::new(),
            purchase_date: Utc::now().date_naive().format("%Y-%m-%d").to_string(),
            threshold_limit: DEFAULT_THRESHOLD_LIMIT.to_string(),
            description: String::new(),
        }
    }
}

fn day(value: &Option<chrono::DateTime<Utc>>) -> String {
    value.map(|d| d.format("%Y-%m-%d").to_string()).unwrap_or_default()
}

impl From<&Medicine> for MedicineForm {
    fn from(medicine: &Medicine) -> Self {
        Self {
            name: medicine.name.clone(),
            category: medicine.category.clone().unwrap_or_default(),
            batch_number: medicine.batch_number.clone(),
            manufacturer: medicine.manufacturer.clone(),
            stock_quantity: medicine.stock_quantity.to_string(),
            unit_price: medicine.unit_price.to_string(),
            expiry_date: day(&medicine.expiry_date),
            purchase_date: day(&medicine.purchase_date),
            threshold_limit: medicine.threshold_limit.to_string(),
            description: medicine.description.clone().unwrap_or_default(),
        }
    }
}

fn number<T: std::str::FromStr>(field: &'static str, raw: &str) -> Result<T, FormError> {
    let raw = raw.trim();
    // An emptied numeric input counts as zero.
    let raw = if raw.is_empty() { "0" } else { raw };
    raw.parse::<T>().map_err(|_| FormError::InvalidNumber { field, value: raw.to_string() })
}

/// RFC 3339 in UTC with millisecond precision, e.g. `2026-01-31T00:00:00.000Z`.
fn timestamp(field: &'static str, raw: &str) -> Result<String, FormError> {
    parse_datetime(raw)
        .map(|dt| dt.to_rfc3339_opts(SecondsFormat::Millis, true))
        .ok_or_else(|| FormError::InvalidDate { field, value: raw.to_string() })
}

impl MedicineForm {
    pub fn missing_fields(&self) -> Vec<&'static str> {
        [
            ("name", &self.name),
            ("batch_number", &self.batch_number),
            ("manufacturer", &self.manufacturer),
            ("expiry_date", &self.expiry_date),
        ]
            .into_iter()
            .filter(|(_, value)| value.trim().is_empty())
            .map(|(field, _)| field)
            .collect()
    }

    pub fn validate(&self) -> Result<MedicinePayload, FormError> {
        let missing = self.missing_fields();
        if !missing.is_empty() {
            return Err(FormError::MissingFields(missing));
        }

        let purchase_date = if self.purchase_date.trim().is_empty() {
            None
        } else {
            Some(timestamp("purchase_date", &self.purchase_date)?)
        };

        Ok(MedicinePayload {
            name: self.name.clone(),
            category: self.category.clone(),
            batch_number: self.batch_number.clone(),
            manufacturer: self.manufacturer.clone(),
            stock_quantity: number("stock_quantity", &self.stock_quantity)?,
            unit_price: number("unit_price", &self.unit_price)?,
            expiry_date: timestamp("expiry_date", &self.expiry_date)?,
            purchase_date,
            threshold_limit: number("threshold_limit", &self.threshold_limit)?,
            description: self.description.clone(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn filled() -> MedicineForm {
        MedicineForm {
            name: "Paracetamol".into(),
            batch_number: "B-100".into(),
            manufacturer: "Acme Pharma".into(),
            stock_quantity: "10".into(),
            unit_price: "2.5".into(),
            expiry_date: "2026-01-31".into(),
            purchase_date: "2025-06-01".into(),
            ..MedicineForm::default()
        }
    }

    #[test]
    fn reports_missing_fields_in_order() {
        let mut form = filled();
        form.manufacturer.clear();
        assert_eq!(form.validate().unwrap_err().to_string(), "Missing required fields: manufacturer");

        let form = MedicineForm::default();
        assert_eq!(
            form.validate().unwrap_err().to_string(),
            "Missing required fields: name, batch_number, manufacturer, expiry_date"
        );
    }

    #[test]
    fn coerces_numbers_and_normalizes_dates() {
        let payload = filled().validate().unwrap();
        assert_eq!(payload.stock_quantity, 10);
        assert_eq!(payload.unit_price, 2.5);
        assert_eq!(payload.threshold_limit, DEFAULT_THRESHOLD_LIMIT);
        assert_eq!(payload.expiry_date, "2026-01-31T00:00:00.000Z");
        assert_eq!(payload.purchase_date.as_deref(), Some("2025-06-01T00:00:00.000Z"));

        let mut form = filled();
        form.purchase_date.clear();
        assert_eq!(form.validate().unwrap().purchase_date, None);
    }

    #[test]
    fn rejects_garbage_numbers_and_dates() {
        let mut form = filled();
        form.stock_quantity = "ten".into();
        assert_eq!(
            form.validate().unwrap_err(),
            FormError::InvalidNumber { field: "stock_quantity", value: "ten".into() }
        );

        let mut form = filled();
        form.expiry_date = "31/01/2026".into();
        assert!(matches!(form.validate(), Err(FormError::InvalidDate { field: "expiry_date", .. })));
    }
}
