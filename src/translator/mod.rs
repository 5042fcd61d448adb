mod rapidapi;

pub use rapidapi::RapidApiTranslator;

use async_trait::async_trait;
use log::{ error, info };
use std::sync::Arc;
use thiserror::Error;

pub const TARGET_LANG: &str = "en";
pub const SPEECH_LANG: &str = "en-US";
pub const TRANSLATION_FAILED: &str = "Translation failed. Please try again.";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Language {
    pub code: &'static str,
    pub name: &'static str,
    pub api_code: &'static str,
}

pub static LANGUAGES: [Language; 2] = [
    Language { code: "hi-IN", name: "Hindi", api_code: "hi" },
    Language { code: "bn-IN", name: "Bengali", api_code: "bn" },
];

pub fn language(code: &str) -> Option<&'static Language> {
    LANGUAGES.iter().find(|l| l.code.eq_ignore_ascii_case(code))
}

#[derive(Debug, Error)]
pub enum TranslateError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("Translation request failed with status {0}")]
    Status(u16),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Translation response format unexpected")]
    UnexpectedFormat,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum WidgetError {
    #[error("Language cannot be changed while recording")]
    Busy,
    #[error("Unsupported language: {0}")]
    UnsupportedLanguage(String),
}

#[async_trait]
pub trait TranslationService: Send + Sync {
    async fn translate(&self, text: &str, from_lang: &str, to: &str) -> Result<String, TranslateError>;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecognizerConfig {
    pub lang: String,
    pub continuous: bool,
    pub interim_results: bool,
}

impl RecognizerConfig {
    /// One final utterance in `lang`.
    pub fn single_utterance(lang: &str) -> Self {
        Self { lang: lang.to_string(), continuous: false, interim_results: false }
    }
}

/// Platform speech recognizer. Results are fed back through
/// [`TranslatorWidget::on_result`] and [`TranslatorWidget::on_recognition_error`].
pub trait SpeechRecognizer: Send {
    fn configure(&mut self, config: &RecognizerConfig);
    fn start(&mut self);
    fn stop(&mut self);
}

pub trait SpeechSynthesizer: Send + Sync {
    fn speak(&self, text: &str, lang: &str);
}

pub struct TranslatorWidget<R: SpeechRecognizer> {
    recognizer: R,
    translator: Arc<dyn TranslationService>,
    synthesizer: Arc<dyn SpeechSynthesizer>,
    language: &'static Language,
    capturing: bool,
    translated_text: String,
    error: Option<String>,
}

impl<R: SpeechRecognizer> TranslatorWidget<R> {
    pub fn new(
        mut recognizer: R,
        translator: Arc<dyn TranslationService>,
        synthesizer: Arc<dyn SpeechSynthesizer>
    ) -> Self {
        let language = &LANGUAGES[0];
        recognizer.configure(&RecognizerConfig::single_utterance(language.code));
        Self {
            recognizer,
            translator,
            synthesizer,
            language,
            capturing: false,
            translated_text: String::new(),
            error: None,
        }
    }

    pub fn language(&self) -> &'static Language {
        self.language
    }

    pub fn is_capturing(&self) -> bool {
        self.capturing
    }

    pub fn translated_text(&self) -> &str {
        &self.translated_text
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn recognizer(&self) -> &R {
        &self.recognizer
    }

    /// Reconfigures the recognizer for the next capture; refused mid-capture.
    pub fn select_language(&mut self, code: &str) -> Result<(), WidgetError> {
        if self.capturing {
            return Err(WidgetError::Busy);
        }
        let language = language(code).ok_or_else(||
            WidgetError::UnsupportedLanguage(code.to_string())
        )?;
        self.language = language;
        self.recognizer.configure(&RecognizerConfig::single_utterance(language.code));
        info!("Translator language set to {}", language.name);
        Ok(())
    }

    pub fn start_capture(&mut self, language_code: &str) -> Result<(), WidgetError> {
        if self.capturing {
            return Err(WidgetError::Busy);
        }
        if language_code != self.language.code {
            self.select_language(language_code)?;
        }
        self.error = None;
        self.recognizer.start();
        self.capturing = true;
        Ok(())
    }

    pub fn stop_capture(&mut self) {
        if self.capturing {
            self.recognizer.stop();
            self.capturing = false;
        }
    }

    /// The record button.
    pub fn toggle(&mut self) {
        if self.capturing {
            self.stop_capture();
        } else {
            self.error = None;
            self.recognizer.start();
            self.capturing = true;
        }
    }

    pub async fn on_result(&mut self, transcript: &str) {
        info!("Transcribed text: {}", transcript);
        match self.translator.translate(transcript, self.language.api_code, TARGET_LANG).await {
            Ok(text) => {
                self.synthesizer.speak(&text, SPEECH_LANG);
                self.translated_text = text;
            }
            Err(e) => {
                error!("Translation error: {}", e);
                self.error = Some(TRANSLATION_FAILED.to_string());
            }
        }
    }

    pub fn on_recognition_error(&mut self, err: &str) {
        self.error = Some(format!("Error occurred in recognition: {}", err));
        self.capturing = false;
    }

    pub fn clear(&mut self) {
        self.translated_text.clear();
        self.error = None;
    }
}
