use async_trait::async_trait;
use log::{ debug, error };
use reqwest::Client as HttpClient;
use serde::{ Deserialize, Serialize };
use std::time::Duration;

use super::{ TranslateError, TranslationService };

#[derive(Serialize)]
struct TranslateRequest<'a> {
    text: &'a str,
    from_lang: &'a str,
    to: &'a str,
}

#[derive(Deserialize)]
struct TranslateResponse {
    #[serde(default)]
    translated_text: Option<String>,
}

/// Translation endpoint published through RapidAPI.
#[derive(Debug, Clone)]
pub struct RapidApiTranslator {
    http: HttpClient,
    url: String,
    api_key: String,
    api_host: String,
}

impl RapidApiTranslator {
    pub fn new(
        url: &str,
        api_key: &str,
        api_host: &str,
        timeout: Duration
    ) -> Result<Self, TranslateError> {
        Ok(Self {
            http: HttpClient::builder().timeout(timeout).build()?,
            url: url.to_string(),
            api_key: api_key.to_string(),
            api_host: api_host.to_string(),
        })
    }
}

#[async_trait]
impl TranslationService for RapidApiTranslator {
    async fn translate(&self, text: &str, from_lang: &str, to: &str) -> Result<String, TranslateError> {
        let resp = self.http
            .post(&self.url)
            .header("X-RapidAPI-Key", &self.api_key)
            .header("X-RapidAPI-Host", &self.api_host)
            .json(&(TranslateRequest { text, from_lang, to }))
            .send().await?;
        let status = resp.status();
        if !status.is_success() {
            error!("Translation request failed with status {}", status);
            return Err(TranslateError::Status(status.as_u16()));
        }
        let body = resp.text().await?;
        debug!("Translation response: {}", body);
        let parsed: TranslateResponse = serde_json::from_str(&body)?;
        parsed.translated_text.filter(|t| !t.is_empty()).ok_or(TranslateError::UnexpectedFormat)
    }
}
