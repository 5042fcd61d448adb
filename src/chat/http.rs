use async_trait::async_trait;
use log::{ debug, error };
use reqwest::Client as HttpClient;
use std::time::Duration;

use super::{ AiChatService, ChatReply, ChatRequest, ChatServiceError };

#[derive(Debug, Clone)]
pub struct HttpChatService {
    http: HttpClient,
    base_url: String,
}

impl HttpChatService {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, ChatServiceError> {
        Ok(Self {
            http: HttpClient::builder().timeout(timeout).build()?,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }
}

#[async_trait]
impl AiChatService for HttpChatService {
    async fn send(&self, request: &ChatRequest) -> Result<ChatReply, ChatServiceError> {
        let url = format!("{}/doctor/chat-ai", self.base_url);
        debug!(
            "Sending to AI service: url={}, option={}, turns={}, new_chat={}",
            url,
            request.option,
            request.conversations_new.len(),
            request.is_new_chat
        );
        let resp = self.http.post(&url).json(request).send().await?;
        let status = resp.status();
        if !status.is_success() {
            error!("Error in AI chat service: status {}", status);
            return Err(ChatServiceError::Status(status.as_u16()));
        }
        let body = resp.text().await?;
        Ok(serde_json::from_str::<ChatReply>(&body)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::chat::ConversationTurn;
    use mockito::Matcher;
    use serde_json::json;

    fn request() -> ChatRequest {
        ChatRequest {
            question: "What are the symptoms? dengue".into(),
            option: "symptoms".into(),
            imgurl: String::new(),
            conversations_new: vec![ConversationTurn {
                role: "user".into(),
                content: "What are the symptoms? dengue".into(),
            }],
            visit_patient_id: None,
            is_new_chat: true,
        }
    }

    #[tokio::test]
    async fn posts_the_wire_payload() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/doctor/chat-ai")
            .match_header("content-type", "application/json")
            .match_body(
                Matcher::Json(
                    json!({
                    "question": "What are the symptoms? dengue",
                    "option": "symptoms",
                    "imgurl": "",
                    "conversationsNew": [{ "role": "user", "content": "What are the symptoms? dengue" }],
                    "visit_patient_id": null,
                    "is_new_chat": true
                })
                )
            )
            .with_status(200)
            .with_body(r#"{"response":"High fever, rash.","summary":"..."}"#)
            .create_async().await;

        let service = HttpChatService::new(&server.url(), Duration::from_secs(5)).unwrap();
        let reply = service.send(&request()).await.unwrap();
        assert_eq!(reply.response.as_deref(), Some("High fever, rash."));
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn server_errors_and_garbage_are_errors() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/doctor/chat-ai")
            .with_status(500)
            .with_body(r#"{"error":"boom"}"#)
            .create_async().await;
        let service = HttpChatService::new(&server.url(), Duration::from_secs(5)).unwrap();
        assert!(matches!(service.send(&request()).await, Err(ChatServiceError::Status(500))));

        let mut server = mockito::Server::new_async().await;
        server.mock("POST", "/doctor/chat-ai").with_status(200).with_body("<html>").create_async().await;
        let service = HttpChatService::new(&server.url(), Duration::from_secs(5)).unwrap();
        assert!(matches!(service.send(&request()).await, Err(ChatServiceError::Malformed(_))));
    }
}
