pub mod form;
pub mod sync;

pub use form::{ FormError, MedicineForm };
pub use sync::{ day_window, ReconcileReport, Reconciler, StockUpdate };

use log::{ error, info };
use std::sync::Arc;
use thiserror::Error;

use crate::models::inventory::Medicine;
use crate::store::{ HealthRecordStore, MedicineStore, StoreError };

pub const LOW_STOCK_MARKER: &str = "(Low Stock)";

#[derive(Debug, Error)]
pub enum SubmitError {
    #[error(transparent)]
    Invalid(#[from] FormError),
    #[error("Failed to create medicine: {0}")]
    Create(StoreError),
    #[error("Failed to update medicine: {0}")]
    Update(StoreError),
}

/// Asks the user before destructive actions.
pub trait Confirm {
    fn confirm(&self, prompt: &str) -> bool;
}

impl<F> Confirm for F where F: Fn(&str) -> bool {
    fn confirm(&self, prompt: &str) -> bool {
        self(prompt)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct MedicineRow<'a> {
    pub medicine: &'a Medicine,
    pub low_stock: bool,
}

impl MedicineRow<'_> {
    /// Stock cell text, e.g. `3 (Low Stock)`.
    pub fn stock_label(&self) -> String {
        if self.low_stock {
            format!("{} {}", self.medicine.stock_quantity, LOW_STOCK_MARKER)
        } else {
            self.medicine.stock_quantity.to_string()
        }
    }
}

/// Medicine management screen: list, form and edit target.
pub struct InventoryScreen {
    medicines: Arc<dyn MedicineStore>,
    reconciler: Reconciler,
    list: Vec<Medicine>,
    form: MedicineForm,
    show_form: bool,
    edit_target: Option<String>,
    error: Option<String>,
}

impl InventoryScreen {
    pub fn new(medicines: Arc<dyn MedicineStore>, records: Arc<dyn HealthRecordStore>) -> Self {
        Self {
            reconciler: Reconciler::new(medicines.clone(), records),
            medicines,
            list: Vec::new(),
            form: MedicineForm::default(),
            show_form: false,
            edit_target: None,
            error: None,
        }
    }

    pub fn medicines(&self) -> &[Medicine] {
        &self.list
    }

    pub fn rows(&self) -> Vec<MedicineRow<'_>> {
        self.list
            .iter()
            .map(|medicine| MedicineRow { medicine, low_stock: medicine.is_low_stock() })
            .collect()
    }

    pub fn form(&self) -> &MedicineForm {
        &self.form
    }

    pub fn form_mut(&mut self) -> &mut MedicineForm {
        &mut self.form
    }

    pub fn is_form_open(&self) -> bool {
        self.show_form
    }

    pub fn edit_target(&self) -> Option<&str> {
        self.edit_target.as_deref()
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    /// Loads the list, applies today's dispensations, and reloads.
    pub async fn mount(&mut self) -> Option<ReconcileReport> {
        self.refresh().await;
        let report = match self.reconciler.reconcile().await {
            Ok(report) => Some(report),
            Err(_) => {
                self.error = Some(
                    "Failed to fetch health records. Check console for details.".to_string()
                );
                None
            }
        };
        if report.as_ref().map_or(false, |r| !r.stock_updates.is_empty()) {
            self.refresh().await;
        }
        report
    }

    pub async fn refresh(&mut self) {
        match self.medicines.list_medicines().await {
            Ok(list) => {
                info!("Fetched {} medicines", list.len());
                self.list = list;
                self.error = None;
            }
            Err(e) => {
                error!("Fetch error: {}", e);
                self.error = Some("Failed to load medicines. Check console for details.".to_string());
            }
        }
    }

    /// Opens an empty form for a new medicine.
    pub fn open_new(&mut self) {
        self.edit_target = None;
        self.form = MedicineForm::default();
        self.show_form = true;
    }

    pub fn close_form(&mut self) {
        self.show_form = false;
        self.edit_target = None;
    }

    /// Fills the form from a listed medicine; false when the id is not listed.
    pub fn begin_edit(&mut self, id: &str) -> bool {
        match self.list.iter().find(|m| m.id == id) {
            Some(medicine) => {
                self.form = MedicineForm::from(medicine);
                self.edit_target = Some(id.to_string());
                self.show_form = true;
                true
            }
            None => {
                info!("Medicine not found for ID: {}", id);
                false
            }
        }
    }

    pub async fn submit(&mut self) -> Result<Medicine, SubmitError> {
        self.error = None;
        let result = self.save().await;
        match &result {
            Ok(_) => {
                self.refresh().await;
                self.show_form = false;
                self.edit_target = None;
                self.form = MedicineForm::default();
            }
            Err(e) => self.error = Some(e.to_string()),
        }
        result
    }

    async fn save(&self) -> Result<Medicine, SubmitError> {
        let payload = self.form.validate()?;
        match &self.edit_target {
            Some(id) => {
                info!("Updating medicine with ID: {}", id);
                self.medicines.update_medicine(id, &payload).await.map_err(|e| {
                    error!("Update error: {}", e);
                    SubmitError::Update(e)
                })
            }
            None => {
                info!("Creating new medicine: {}", payload.name);
                self.medicines.insert_medicine(&payload).await.map_err(|e| {
                    error!("Insert error: {}", e);
                    SubmitError::Create(e)
                })
            }
        }
    }

    /// Returns false when the user declined or the delete failed.
    pub async fn delete(&mut self, id: &str, confirm: &dyn Confirm) -> bool {
        if !confirm.confirm("Are you sure you want to delete this medicine?") {
            return false;
        }
        match self.medicines.delete_medicine(id).await {
            Ok(()) => {
                self.refresh().await;
                true
            }
            Err(e) => {
                error!("Error deleting medicine: {}", e);
                self.error = Some("Failed to delete medicine".to_string());
                false
            }
        }
    }
}
