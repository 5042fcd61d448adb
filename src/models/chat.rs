use chrono::{ DateTime, Utc };
use serde::{ Serialize, Deserialize };
use uuid::Uuid;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Sender {
    Doctor,
    Ai,
    System,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageType {
    Text,
    Image,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub id: String,
    pub sender: Sender,
    pub content: String,
    pub created_at: DateTime<Utc>,
    pub message_type: MessageType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file_url: Option<String>,
}

impl ChatMessage {
    fn build(sender: Sender, content: &str, message_type: MessageType, file_url: Option<String>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            sender,
            content: content.to_string(),
            created_at: Utc::now(),
            message_type,
            file_url,
        }
    }

    /// Doctor message; becomes an image message when a file URL is attached.
    pub fn doctor(content: &str, file_url: Option<String>) -> Self {
        let message_type = if file_url.is_some() { MessageType::Image } else { MessageType::Text };
        Self::build(Sender::Doctor, content, message_type, file_url)
    }

    pub fn ai(content: &str) -> Self {
        Self::build(Sender::Ai, content, MessageType::Text, None)
    }

    pub fn system(content: &str) -> Self {
        Self::build(Sender::System, content, MessageType::Text, None)
    }
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct ChatSession {
    pub id: String,
    pub messages: Vec<ChatMessage>,
}

impl ChatSession {
    pub fn new(id: impl Into<String>) -> Self {
        Self { id: id.into(), messages: Vec::new() }
    }
}

/// One entry of the history sent to the AI endpoint.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConversationTurn {
    pub role: String,
    pub content: String,
}

impl From<&ChatMessage> for ConversationTurn {
    fn from(msg: &ChatMessage) -> Self {
        let role = match msg.sender {
            Sender::Doctor => "user",
            _ => "assistant",
        };
        Self { role: role.to_string(), content: msg.content.clone() }
    }
}

pub fn to_conversation(messages: &[ChatMessage]) -> Vec<ConversationTurn> {
    messages.iter().map(ConversationTurn::from).collect()
}
