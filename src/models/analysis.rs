use serde::{ Serialize, Deserialize };

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PatientAnalysis {
    #[serde(default)]
    pub initial_analysis: String,
    #[serde(default)]
    pub recommendations: String,
}
