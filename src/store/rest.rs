use async_trait::async_trait;
use chrono::{ DateTime, SecondsFormat, Utc };
use log::{ debug, error };
use reqwest::{ Client as HttpClient, Method, RequestBuilder };
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{ json, Value as JsonValue };
use std::time::Duration;

use super::{
    distinct_visit_ids,
    AnalysisStore,
    HealthRecordStore,
    MedicineStore,
    StoreError,
    ANALYSIS_TABLE,
    HEALTH_RECORDS_TABLE,
    MEDICINES_TABLE,
};
use crate::models::de;
use crate::models::inventory::{ HealthRecord, Medicine, MedicinePayload };

/// PostgREST client for the hosted Postgres backend.
#[derive(Debug, Clone)]
pub struct RestStore {
    http: HttpClient,
    base_url: String,
    api_key: String,
}

#[derive(Deserialize)]
struct VisitRow {
    #[serde(default, deserialize_with = "de::opt_id")]
    visit_patient_id: Option<String>,
}

#[derive(Deserialize)]
struct AnalysisRow {
    analysis: Option<JsonValue>,
}

fn eq(value: &str) -> String {
    format!("eq.{}", value)
}

fn timestamp(dt: DateTime<Utc>) -> String {
    dt.to_rfc3339_opts(SecondsFormat::Secs, false)
}

impl RestStore {
    pub fn new(base_url: &str, api_key: &str, timeout: Duration) -> Result<Self, StoreError> {
        let http = HttpClient::builder().timeout(timeout).build()?;
        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
        })
    }

    fn request(&self, method: Method, table: &str) -> RequestBuilder {
        let url = format!("{}/rest/v1/{}", self.base_url, table);
        self.http
            .request(method, url)
            .header("apikey", &self.api_key)
            .bearer_auth(&self.api_key)
    }

    async fn execute(&self, table: &str, req: RequestBuilder) -> Result<reqwest::Response, StoreError> {
        let resp = req.send().await?;
        let status = resp.status();
        if !status.is_success() {
            let message = resp.text().await.unwrap_or_default();
            error!("{} request failed ({}): {}", table, status, message);
            return Err(StoreError::Api {
                table: table.to_string(),
                status: status.as_u16(),
                message,
            });
        }
        Ok(resp)
    }

    async fn fetch<T: DeserializeOwned>(
        &self,
        table: &str,
        req: RequestBuilder
    ) -> Result<Vec<T>, StoreError> {
        let resp = self.execute(table, req).await?;
        let body = resp.text().await?;
        debug!("{} response: {}", table, body);
        Ok(serde_json::from_str(&body)?)
    }

    async fn returning_one(
        &self,
        id: &str,
        req: RequestBuilder
    ) -> Result<Medicine, StoreError> {
        let req = req.header("Prefer", "return=representation");
        let mut rows: Vec<Medicine> = self.fetch(MEDICINES_TABLE, req).await?;
        if rows.is_empty() {
            return Err(StoreError::NotFound {
                table: MEDICINES_TABLE.to_string(),
                id: id.to_string(),
            });
        }
        Ok(rows.remove(0))
    }
}

#[async_trait]
impl MedicineStore for RestStore {
    async fn list_medicines(&self) -> Result<Vec<Medicine>, StoreError> {
        let req = self
            .request(Method::GET, MEDICINES_TABLE)
            .query(&[
                ("select", "*"),
                ("order", "created_at.desc"),
            ]);
        self.fetch(MEDICINES_TABLE, req).await
    }

    async fn find_medicines_by_name(&self, name: &str) -> Result<Vec<Medicine>, StoreError> {
        let req = self
            .request(Method::GET, MEDICINES_TABLE)
            .query(&[
                ("select", "*".to_string()),
                ("name", eq(name)),
            ]);
        self.fetch(MEDICINES_TABLE, req).await
    }

    async fn insert_medicine(&self, payload: &MedicinePayload) -> Result<Medicine, StoreError> {
        let req = self.request(Method::POST, MEDICINES_TABLE).json(&[payload]);
        self.returning_one("new", req).await
    }

    async fn update_medicine(
        &self,
        id: &str,
        payload: &MedicinePayload
    ) -> Result<Medicine, StoreError> {
        let req = self
            .request(Method::PATCH, MEDICINES_TABLE)
            .query(&[("id", eq(id))])
            .json(payload);
        self.returning_one(id, req).await
    }

    async fn set_stock_quantity(&self, id: &str, stock_quantity: i64) -> Result<(), StoreError> {
        let req = self
            .request(Method::PATCH, MEDICINES_TABLE)
            .query(&[("id", eq(id))])
            .json(&json!({ "stock_quantity": stock_quantity }));
        self.execute(MEDICINES_TABLE, req).await?;
        Ok(())
    }

    async fn delete_medicine(&self, id: &str) -> Result<(), StoreError> {
        let req = self.request(Method::DELETE, MEDICINES_TABLE).query(&[("id", eq(id))]);
        self.execute(MEDICINES_TABLE, req).await?;
        Ok(())
    }
}

#[async_trait]
impl HealthRecordStore for RestStore {
    async fn records_updated_between(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>
    ) -> Result<Vec<HealthRecord>, StoreError> {
        let req = self
            .request(Method::GET, HEALTH_RECORDS_TABLE)
            .query(&[
                ("select", "*".to_string()),
                ("updated_at", format!("gte.{}", timestamp(start))),
                ("updated_at", format!("lt.{}", timestamp(end))),
            ]);
        self.fetch(HEALTH_RECORDS_TABLE, req).await
    }

    async fn mark_processed(&self, record_id: &str) -> Result<(), StoreError> {
        let req = self
            .request(Method::PATCH, HEALTH_RECORDS_TABLE)
            .query(&[("id", eq(record_id))])
            .json(&json!({ "count": 1 }));
        self.execute(HEALTH_RECORDS_TABLE, req).await?;
        Ok(())
    }

    async fn visit_patient_ids(&self) -> Result<Vec<String>, StoreError> {
        let req = self
            .request(Method::GET, HEALTH_RECORDS_TABLE)
            .query(&[("select", "visit_patient_id")]);
        let rows: Vec<VisitRow> = self.fetch(HEALTH_RECORDS_TABLE, req).await?;
        Ok(distinct_visit_ids(rows.into_iter().map(|r| r.visit_patient_id)))
    }
}

#[async_trait]
impl AnalysisStore for RestStore {
    async fn existing_analysis(&self, visit_patient_id: &str) -> Result<Option<String>, StoreError> {
        let req = self
            .request(Method::GET, ANALYSIS_TABLE)
            .query(&[
                ("select", "analysis".to_string()),
                ("visit_patient_id", eq(visit_patient_id)),
            ]);
        let rows: Vec<AnalysisRow> = self.fetch(ANALYSIS_TABLE, req).await?;
        // Mirrors a single-row read: zero or several matches mean "no analysis".
        if rows.len() != 1 {
            return Ok(None);
        }
        Ok(
            rows
                .into_iter()
                .next()
                .and_then(|r| r.analysis)
                .and_then(|v| match v {
                    JsonValue::Null => None,
                    JsonValue::String(s) => Some(s),
                    other => Some(other.to_string()),
                })
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use mockito::Matcher;

    fn store(url: &str) -> RestStore {
        RestStore::new(url, "anon-key", Duration::from_secs(5)).unwrap()
    }

    #[tokio::test]
    async fn finds_medicine_by_exact_name_with_auth_headers() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/rest/v1/medicines")
            .match_header("apikey", "anon-key")
            .match_header("authorization", "Bearer anon-key")
            .match_query(
                Matcher::AllOf(
                    vec![
                        Matcher::UrlEncoded("select".into(), "*".into()),
                        Matcher::UrlEncoded("name".into(), "eq.Paracetamol".into())
                    ]
                )
            )
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(
                r#"[{"id":"m1","name":"Paracetamol","stock_quantity":10,"threshold_limit":5}]"#
            )
            .create_async().await;

        let found = store(&server.url()).find_medicines_by_name("Paracetamol").await.unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].stock_quantity, 10);
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn day_window_is_sent_as_two_updated_at_filters() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/rest/v1/patient_health_records")
            .match_query(
                Matcher::AllOf(
                    vec![
                        Matcher::UrlEncoded(
                            "updated_at".into(),
                            "gte.2025-06-01T00:00:00+00:00".into()
                        ),
                        Matcher::UrlEncoded(
                            "updated_at".into(),
                            "lt.2025-06-02T00:00:00+00:00".into()
                        )
                    ]
                )
            )
            .with_status(200)
            .with_body(r#"[{"id":1,"medication":null,"count":0}]"#)
            .create_async().await;

        let start = Utc.with_ymd_and_hms(2025, 6, 1, 0, 0, 0).unwrap();
        let end = Utc.with_ymd_and_hms(2025, 6, 2, 0, 0, 0).unwrap();
        let records = store(&server.url()).records_updated_between(start, end).await.unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].id, "1");
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn api_errors_carry_status_and_body() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("PATCH", "/rest/v1/patient_health_records")
            .match_query(Matcher::UrlEncoded("id".into(), "eq.7".into()))
            .with_status(401)
            .with_body("invalid JWT")
            .create_async().await;

        let err = store(&server.url()).mark_processed("7").await.unwrap_err();
        match err {
            StoreError::Api { status, message, .. } => {
                assert_eq!(status, 401);
                assert_eq!(message, "invalid JWT");
            }
            other => panic!("unexpected error: {}", other),
        }
    }

    #[tokio::test]
    async fn update_with_no_matching_row_is_not_found() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("PATCH", "/rest/v1/medicines")
            .match_query(Matcher::UrlEncoded("id".into(), "eq.gone".into()))
            .match_header("prefer", "return=representation")
            .with_status(200)
            .with_body("[]")
            .create_async().await;

        let payload = MedicinePayload {
            name: "Amoxicillin".into(),
            category: String::new(),
            batch_number: "B2".into(),
            manufacturer: "Acme".into(),
            stock_quantity: 3,
            unit_price: 2.0,
            expiry_date: "2026-01-01T00:00:00.000Z".into(),
            purchase_date: None,
            threshold_limit: 5,
            description: String::new(),
        };
        let err = store(&server.url()).update_medicine("gone", &payload).await.unwrap_err();
        assert!(matches!(err, StoreError::NotFound { .. }));
    }

    #[tokio::test]
    async fn visit_ids_are_deduplicated() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/rest/v1/patient_health_records")
            .match_query(Matcher::UrlEncoded("select".into(), "visit_patient_id".into()))
            .with_status(200)
            .with_body(
                r#"[{"visit_patient_id":"V1"},{"visit_patient_id":null},{"visit_patient_id":"V2"},{"visit_patient_id":"V1"},{"visit_patient_id":""}]"#
            )
            .create_async().await;

        let ids = store(&server.url()).visit_patient_ids().await.unwrap();
        assert_eq!(ids, vec!["V1".to_string(), "V2".to_string()]);
    }

    #[tokio::test]
    async fn numeric_visit_ids_are_listed_as_text() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/rest/v1/patient_health_records")
            .match_query(Matcher::UrlEncoded("select".into(), "visit_patient_id".into()))
            .with_status(200)
            .with_body(r#"[{"visit_patient_id":17},{"visit_patient_id":"V2"},{"visit_patient_id":17}]"#)
            .create_async().await;

        let ids = store(&server.url()).visit_patient_ids().await.unwrap();
        assert_eq!(ids, vec!["17".to_string(), "V2".to_string()]);
    }

    #[tokio::test]
    async fn medicine_rows_with_null_text_still_list() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/rest/v1/medicines")
            .match_query(Matcher::AllOf(vec![
                Matcher::UrlEncoded("select".into(), "*".into()),
                Matcher::UrlEncoded("order".into(), "created_at.desc".into()),
            ]))
            .with_status(200)
            .with_body(
                r#"[{"id":1,"name":null,"stock_quantity":4},{"id":2,"name":"Cetirizine","manufacturer":null,"stock_quantity":"9"}]"#
            )
            .create_async().await;

        let list = store(&server.url()).list_medicines().await.unwrap();
        assert_eq!(list.len(), 2);
        assert_eq!(list[0].name, "");
        assert_eq!(list[1].name, "Cetirizine");
        assert_eq!(list[1].stock_quantity, 9);
    }
}
