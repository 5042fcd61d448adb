use async_trait::async_trait;
use log::{ error, info };
use reqwest::Client as HttpClient;
use std::time::Duration;
use url::Url;

use super::{ Attachment, ObjectStorage, UploadError };

/// Storage API of the hosted database project.
#[derive(Debug, Clone)]
pub struct SupabaseStorage {
    http: HttpClient,
    base_url: Url,
    api_key: String,
    bucket: String,
}

impl SupabaseStorage {
    pub fn new(
        base_url: &str,
        api_key: &str,
        bucket: &str,
        timeout: Duration
    ) -> Result<Self, UploadError> {
        Ok(Self {
            http: HttpClient::builder().timeout(timeout).build()?,
            base_url: Url::parse(base_url)?,
            api_key: api_key.to_string(),
            bucket: bucket.to_string(),
        })
    }

    fn object_url(&self, public: bool, path: &str) -> Result<Url, UploadError> {
        let mut url = self.base_url.clone();
        {
            let mut segments = url
                .path_segments_mut()
                .map_err(|_| url::ParseError::RelativeUrlWithCannotBeABaseBase)?;
            segments.pop_if_empty().extend(["storage", "v1", "object"]);
            if public {
                segments.push("public");
            }
            segments.push(&self.bucket);
            segments.extend(path.split('/'));
        }
        Ok(url)
    }

    pub fn public_url(&self, path: &str) -> Result<String, UploadError> {
        Ok(self.object_url(true, path)?.to_string())
    }
}

#[async_trait]
impl ObjectStorage for SupabaseStorage {
    async fn upload(&self, path: &str, attachment: &Attachment) -> Result<String, UploadError> {
        let url = self.object_url(false, path)?;
        let resp = self.http
            .post(url)
            .header("apikey", &self.api_key)
            .bearer_auth(&self.api_key)
            .header("content-type", &attachment.mime_type)
            .header("cache-control", "3600")
            .header("x-upsert", "false")
            .body(attachment.bytes.clone())
            .send().await?;

        let status = resp.status();
        if !status.is_success() {
            let message = resp.text().await.unwrap_or_default();
            error!("Error uploading file '{}': {} {}", path, status, message);
            return Err(UploadError::Rejected { status: status.as_u16(), message });
        }

        info!("Uploaded attachment to {}/{}", self.bucket, path);
        self.public_url(path)
    }
}
