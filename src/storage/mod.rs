mod supabase;

pub use supabase::SupabaseStorage;

use async_trait::async_trait;
use chrono::Utc;
use std::path::Path;
use thiserror::Error;

pub const MAX_ATTACHMENT_BYTES: usize = 5 * 1024 * 1024;

#[derive(Debug, Error)]
pub enum UploadError {
    #[error("File size must be less than 5MB")]
    TooLarge {
        size: usize,
    },
    #[error("Only image files are allowed")]
    NotAnImage {
        mime_type: String,
    },
    #[error("Upload failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("Upload rejected with status {status}: {message}")]
    Rejected {
        status: u16,
        message: String,
    },
    #[error("Invalid storage URL: {0}")]
    Url(#[from] url::ParseError),
}

/// A file picked for sending with a chat message.
#[derive(Clone, Debug, PartialEq)]
pub struct Attachment {
    pub name: String,
    pub mime_type: String,
    pub bytes: Vec<u8>,
}

impl Attachment {
    pub fn new(name: impl Into<String>, mime_type: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self { name: name.into(), mime_type: mime_type.into(), bytes }
    }

    pub fn from_path(path: &Path) -> std::io::Result<Self> {
        let bytes = std::fs::read(path)?;
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        let mime_type = mime_guess::from_path(path).first_or_octet_stream().essence_str().to_string();
        Ok(Self { name, mime_type, bytes })
    }

    pub fn size(&self) -> usize {
        self.bytes.len()
    }

    /// Size and type checks; runs before any network call.
    pub fn validate(&self) -> Result<(), UploadError> {
        if self.size() > MAX_ATTACHMENT_BYTES {
            return Err(UploadError::TooLarge { size: self.size() });
        }
        if !self.mime_type.starts_with("image/") {
            return Err(UploadError::NotAnImage { mime_type: self.mime_type.clone() });
        }
        Ok(())
    }
}

/// `{session_id}/{millis}-{name without non-alphanumerics}.{ext}`.
///
/// The extension is whatever follows the last dot; a name without a dot uses
/// the whole name as its extension.
pub fn object_path(session_id: &str, file_name: &str, millis: i64) -> String {
    let ext = file_name.rsplit('.').next().unwrap_or(file_name);
    let sanitized: String = file_name
        .chars()
        .filter(|c| c.is_ascii_alphanumeric())
        .collect();
    format!("{}/{}-{}.{}", session_id, millis, sanitized, ext)
}

#[async_trait]
pub trait ObjectStorage: Send + Sync {
    /// Stores the bytes under `path` and returns the object's public URL.
    async fn upload(&self, path: &str, attachment: &Attachment) -> Result<String, UploadError>;
}

/// Validates, then uploads under a session-scoped path.
pub async fn upload_attachment(
    storage: &dyn ObjectStorage,
    session_id: &str,
    attachment: &Attachment
) -> Result<String, UploadError> {
    attachment.validate()?;
    let path = object_path(session_id, &attachment.name, Utc::now().timestamp_millis());
    storage.upload(&path, attachment).await
}
