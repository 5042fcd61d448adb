use log::{ error, info };
use reqwest::Client as HttpClient;
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

use crate::models::analysis::PatientAnalysis;
use crate::store::AnalysisStore;

#[derive(Debug, Error)]
pub enum AnalysisError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("Failed to generate analysis (status {0})")]
    Failed(u16),
}

pub struct PatientAnalysisService {
    http: HttpClient,
    api_url: String,
    store: Arc<dyn AnalysisStore>,
}

impl PatientAnalysisService {
    pub fn new(
        api_url: &str,
        store: Arc<dyn AnalysisStore>,
        timeout: Duration
    ) -> Result<Self, AnalysisError> {
        Ok(Self {
            http: HttpClient::builder().timeout(timeout).build()?,
            api_url: api_url.trim_end_matches('/').to_string(),
            store,
        })
    }

    /// Stored analysis text; lookup failures read as "none stored".
    pub async fn existing(&self, visit_patient_id: &str) -> Option<String> {
        match self.store.existing_analysis(visit_patient_id).await {
            Ok(found) => found,
            Err(e) => {
                error!("Error fetching existing analysis: {}", e);
                None
            }
        }
    }

    pub async fn generate(&self, visit_patient_id: &str) -> Result<PatientAnalysis, AnalysisError> {
        let url = format!("{}/analysis", self.api_url);
        info!("Requesting analysis for visit {} from {}", visit_patient_id, url);
        let resp = self.http
            .post(&url)
            .json(&json!({ "visit_patient_id": visit_patient_id }))
            .send().await
            .map_err(|e| {
                error!("Network error requesting {}: {}", url, e);
                e
            })?;
        let status = resp.status();
        if !status.is_success() {
            return Err(AnalysisError::Failed(status.as_u16()));
        }
        Ok(resp.json::<PatientAnalysis>().await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{ MemoryStore, SeedData };
    use mockito::Matcher;

    fn service(url: &str) -> PatientAnalysisService {
        let mut seed = SeedData::default();
        seed.analyses.insert("V1".into(), "Hypertension, stage 1".into());
        PatientAnalysisService::new(
            url,
            Arc::new(MemoryStore::new(seed)),
            Duration::from_secs(5)
        ).unwrap()
    }

    #[tokio::test]
    async fn existing_analysis_comes_from_the_store() {
        let svc = service("http://unused.invalid");
        assert_eq!(svc.existing("V1").await.as_deref(), Some("Hypertension, stage 1"));
        assert_eq!(svc.existing("V2").await, None);
    }

    #[tokio::test]
    async fn generate_posts_visit_id() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/analysis")
            .match_body(Matcher::Json(serde_json::json!({ "visit_patient_id": "V1" })))
            .with_status(200)
            .with_body(r#"{"initial_analysis":"BP elevated","recommendations":"Reduce salt"}"#)
            .create_async().await;

        let analysis = service(&server.url()).generate("V1").await.unwrap();
        assert_eq!(analysis.initial_analysis, "BP elevated");
        assert_eq!(analysis.recommendations, "Reduce salt");
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn not_found_is_a_failure() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/analysis")
            .with_status(404)
            .with_body(r#"{"error":"Analysis failed or no data found"}"#)
            .create_async().await;
        let err = service(&server.url()).generate("V9").await.unwrap_err();
        assert!(matches!(err, AnalysisError::Failed(404)));
    }
}
