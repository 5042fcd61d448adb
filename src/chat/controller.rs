use log::{ debug, error, info, warn };
use std::sync::Arc;
use thiserror::Error;

use super::options::{ QuickOption, GENERAL_OPTION };
use super::{ AiChatService, ChatRequest };
use crate::models::chat::{ to_conversation, ChatMessage, ChatSession };
use crate::session::{ SessionAction, SessionHolder, SessionObserver };
use crate::storage::{ upload_attachment, Attachment, ObjectStorage, UploadError };
use crate::store::{ HealthRecordStore, StoreError };
use crate::translator::{ RecognizerConfig, SpeechRecognizer, SPEECH_LANG };

pub const AI_ERROR_MESSAGE: &str = "Error connecting to AI service. Please try again.";
const IMAGE_ONLY_QUESTION: &str = "Analyze this image";
pub const VOICE_UNSUPPORTED: &str = "Speech recognition not supported";

/// Unsent input of the chat surface.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Composer {
    pub text: String,
    pub attachment: Option<Attachment>,
    pub option: Option<QuickOption>,
    pub patient_id: String,
}

impl Composer {
    fn is_empty(&self) -> bool {
        self.text.trim().is_empty() && self.attachment.is_none()
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ComposerError {
    #[error("quick option '{0}' is selected; deselect it first")]
    OptionLocked(QuickOption),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SendOutcome {
    /// Nothing to send; no message appended, no network call made.
    Ignored,
    /// The assistant answered.
    Replied,
    /// A system error message was appended in place of an answer.
    Failed,
}

pub struct ChatController {
    session: SessionHolder,
    composer: Composer,
    is_new_chat: bool,
    voice: Option<Box<dyn SpeechRecognizer>>,
    recording: bool,
    voice_error: Option<String>,
    chat: Arc<dyn AiChatService>,
    storage: Arc<dyn ObjectStorage>,
    records: Arc<dyn HealthRecordStore>,
}

/// Empty or blank ids are sent as `null`.
fn normalize_patient_id(raw: &str) -> Option<String> {
    let trimmed = raw.trim();
    if trimmed.is_empty() { None } else { Some(trimmed.to_string()) }
}

impl ChatController {
    pub fn new(
        session: ChatSession,
        observer: Arc<dyn SessionObserver>,
        chat: Arc<dyn AiChatService>,
        storage: Arc<dyn ObjectStorage>,
        records: Arc<dyn HealthRecordStore>
    ) -> Self {
        Self {
            session: SessionHolder::new(session, observer),
            composer: Composer::default(),
            is_new_chat: true,
            voice: None,
            recording: false,
            voice_error: None,
            chat,
            storage,
            records,
        }
    }

    /// Enables dictation: one final `en-US` utterance per recording.
    pub fn with_recognizer(mut self, mut recognizer: Box<dyn SpeechRecognizer>) -> Self {
        recognizer.configure(&RecognizerConfig::single_utterance(SPEECH_LANG));
        self.voice = Some(recognizer);
        self
    }

    pub fn session_id(&self) -> &str {
        self.session.session_id()
    }

    pub fn messages(&self) -> &[ChatMessage] {
        self.session.messages()
    }

    pub fn composer(&self) -> &Composer {
        &self.composer
    }

    pub fn is_new_chat(&self) -> bool {
        self.is_new_chat
    }

    pub fn is_recording(&self) -> bool {
        self.recording
    }

    pub fn voice_error(&self) -> Option<&str> {
        self.voice_error.as_deref()
    }

    /// Makes `session_id` the active session, starting it from scratch.
    pub fn open_session(&mut self, session_id: &str) {
        info!("Opening chat session {}", session_id);
        self.session.dispatch(SessionAction::Reset { session_id: session_id.to_string() });
        self.composer = Composer::default();
        self.is_new_chat = true;
        if self.recording {
            self.toggle_voice();
        }
    }

    pub fn set_text(&mut self, text: &str) {
        self.composer.text = text.to_string();
    }

    pub fn append_transcript(&mut self, transcript: &str) {
        self.composer.text = format!("{} {}", self.composer.text, transcript);
    }

    /// The microphone button.
    pub fn toggle_voice(&mut self) {
        let Some(recognizer) = self.voice.as_mut() else {
            self.voice_error = Some(VOICE_UNSUPPORTED.to_string());
            return;
        };
        if self.recording {
            recognizer.stop();
            self.recording = false;
        } else {
            self.voice_error = None;
            recognizer.start();
            self.recording = true;
        }
    }

    pub fn on_voice_result(&mut self, transcript: &str) {
        debug!("Dictated: {}", transcript);
        self.append_transcript(transcript);
    }

    pub fn on_voice_error(&mut self, err: &str) {
        warn!("Speech recognition error: {}", err);
        self.voice_error = Some(format!("Error occurred in recognition: {}", err));
        self.recording = false;
    }

    pub fn attach(&mut self, attachment: Attachment) {
        self.composer.attachment = Some(attachment);
    }

    pub fn set_patient_id(&mut self, patient_id: &str) {
        self.composer.patient_id = patient_id.to_string();
    }

    /// Picking the selected option again clears it; picking another one is refused.
    pub fn toggle_option(&mut self, option: QuickOption) -> Result<(), ComposerError> {
        match self.composer.option {
            Some(current) if current == option => {
                self.composer.option = None;
                self.composer.text.clear();
            }
            Some(current) => {
                return Err(ComposerError::OptionLocked(current));
            }
            None => {
                self.composer.option = Some(option);
                self.composer.text = option.template().to_string();
            }
        }
        Ok(())
    }

    pub async fn patient_ids(&self) -> Result<Vec<String>, StoreError> {
        self.records.visit_patient_ids().await.map_err(|e| {
            error!("Error fetching patient ids: {}", e);
            e
        })
    }

    /// Sends the composer contents.
    ///
    /// Upload problems come back as errors and append nothing. Past the upload,
    /// exactly two messages are appended: the doctor's, then a reply or a
    /// system error. Text and attachment are cleared once the exchange ran,
    /// and kept for a retry when the upload was refused.
    pub async fn send(&mut self) -> Result<SendOutcome, UploadError> {
        if self.composer.is_empty() {
            return Ok(SendOutcome::Ignored);
        }

        let outcome = self.exchange().await?;
        self.composer.text.clear();
        self.composer.attachment = None;
        Ok(outcome)
    }

    async fn exchange(&mut self) -> Result<SendOutcome, UploadError> {
        let file_url = match &self.composer.attachment {
            Some(attachment) => {
                let url = upload_attachment(
                    self.storage.as_ref(),
                    self.session.session_id(),
                    attachment
                ).await.map_err(|e| {
                    error!("Error uploading file: {}", e);
                    e
                })?;
                Some(url)
            }
            None => None,
        };

        let message = ChatMessage::doctor(&self.composer.text, file_url.clone());
        let question = if message.content.is_empty() {
            IMAGE_ONLY_QUESTION.to_string()
        } else {
            message.content.clone()
        };
        self.session.dispatch(SessionAction::Append(message));

        let request = ChatRequest {
            question,
            option: self.composer.option
                .map(|o| o.tag())
                .unwrap_or(GENERAL_OPTION)
                .to_string(),
            imgurl: file_url.unwrap_or_default(),
            conversations_new: to_conversation(self.session.messages()),
            visit_patient_id: normalize_patient_id(&self.composer.patient_id),
            is_new_chat: self.is_new_chat,
        };
        debug!("AI request payload: {:?}", request);

        let reply = match self.chat.send(&request).await {
            Ok(reply) => {
                self.is_new_chat = false;
                match reply.response {
                    Some(text) if !text.is_empty() => Some(text),
                    _ => {
                        warn!("Invalid response format from server");
                        None
                    }
                }
            }
            Err(e) => {
                error!("Error in AI communication: {}", e);
                None
            }
        };

        match reply {
            Some(text) => {
                self.session.dispatch(SessionAction::Append(ChatMessage::ai(&text)));
                Ok(SendOutcome::Replied)
            }
            None => {
                self.session.dispatch(SessionAction::Append(ChatMessage::system(AI_ERROR_MESSAGE)));
                Ok(SendOutcome::Failed)
            }
        }
    }
}
