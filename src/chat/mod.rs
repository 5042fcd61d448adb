pub mod controller;
pub mod http;
pub mod options;
pub mod socket;

use async_trait::async_trait;
use serde::{ Deserialize, Serialize };
use thiserror::Error;

use crate::models::chat::ConversationTurn;

pub use controller::{ ChatController, Composer, ComposerError, SendOutcome };
pub use http::HttpChatService;
pub use options::{ QuickOption, GENERAL_OPTION };

/// Body of `POST /doctor/chat-ai`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatRequest {
    pub question: String,
    pub option: String,
    pub imgurl: String,
    #[serde(rename = "conversationsNew")]
    pub conversations_new: Vec<ConversationTurn>,
    pub visit_patient_id: Option<String>,
    pub is_new_chat: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct ChatReply {
    #[serde(default)]
    pub response: Option<String>,
}

#[derive(Debug, Error)]
pub enum ChatServiceError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("Network response was not ok (status {0})")]
    Status(u16),
    #[error("Malformed response from server: {0}")]
    Malformed(#[from] serde_json::Error),
}

#[async_trait]
pub trait AiChatService: Send + Sync {
    async fn send(&self, request: &ChatRequest) -> Result<ChatReply, ChatServiceError>;
}
