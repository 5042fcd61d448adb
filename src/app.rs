use log::info;
use std::error::Error;
use std::sync::Arc;
use std::time::Duration;

use crate::analysis::PatientAnalysisService;
use crate::chat::{ AiChatService, ChatController, HttpChatService };
use crate::cli::{ mask_secret, Args };
use crate::inventory::InventoryScreen;
use crate::models::chat::ChatSession;
use crate::session::SessionObserver;
use crate::storage::{ ObjectStorage, SupabaseStorage };
use crate::store::{ initialize_stores, Stores };
use crate::translator::{
    RapidApiTranslator,
    SpeechRecognizer,
    SpeechSynthesizer,
    TranslationService,
    TranslatorWidget,
};

/// Every outbound client, built once from the command line.
#[derive(Clone)]
pub struct ClinicAssistant {
    chat_service: Arc<dyn AiChatService>,
    storage: Arc<dyn ObjectStorage>,
    stores: Stores,
    translator: Arc<dyn TranslationService>,
    analysis: Arc<PatientAnalysisService>,
}

impl ClinicAssistant {
    fn initialize_chat_clients(
        args: &Args,
        timeout: Duration
    ) -> Result<(Arc<dyn AiChatService>, Arc<dyn ObjectStorage>), Box<dyn Error + Send + Sync>> {
        let chat_service = HttpChatService::new(&args.api_url, timeout)?;
        info!("AI chat client configured: BaseURL={}", args.api_url);

        let storage = SupabaseStorage::new(
            &args.database_url,
            &args.database_key,
            &args.attachment_bucket,
            timeout
        )?;
        info!(
            "Attachment storage configured: Bucket={}, Key={}",
            args.attachment_bucket,
            mask_secret(&args.database_key)
        );

        Ok((Arc::new(chat_service), Arc::new(storage)))
    }

    fn initialize_translator(
        args: &Args,
        timeout: Duration
    ) -> Result<Arc<dyn TranslationService>, Box<dyn Error + Send + Sync>> {
        let translator = RapidApiTranslator::new(
            &args.translate_url,
            &args.translate_api_key,
            &args.translate_api_host,
            timeout
        )?;
        info!(
            "Translation client configured: URL={}, Host={}, Key={}",
            args.translate_url,
            args.translate_api_host,
            mask_secret(&args.translate_api_key)
        );
        Ok(Arc::new(translator))
    }

    pub fn new(args: &Args) -> Result<Self, Box<dyn Error + Send + Sync>> {
        let timeout = Duration::from_secs(args.http_timeout_secs);
        let (chat_service, storage) = Self::initialize_chat_clients(args, timeout)?;
        let stores = initialize_stores(args)?;
        let translator = Self::initialize_translator(args, timeout)?;
        let analysis = PatientAnalysisService::new(
            &args.api_url,
            stores.analyses.clone(),
            timeout
        )?;

        Ok(Self {
            chat_service,
            storage,
            stores,
            translator,
            analysis: Arc::new(analysis),
        })
    }

    pub fn stores(&self) -> &Stores {
        &self.stores
    }

    pub fn analysis(&self) -> &PatientAnalysisService {
        &self.analysis
    }

    pub fn chat_controller(
        &self,
        session_id: &str,
        observer: Arc<dyn SessionObserver>
    ) -> ChatController {
        ChatController::new(
            ChatSession::new(session_id),
            observer,
            self.chat_service.clone(),
            self.storage.clone(),
            self.stores.records.clone()
        )
    }

    pub fn inventory_screen(&self) -> InventoryScreen {
        InventoryScreen::new(self.stores.medicines.clone(), self.stores.records.clone())
    }

    pub fn translator_widget<R: SpeechRecognizer>(
        &self,
        recognizer: R,
        synthesizer: Arc<dyn SpeechSynthesizer>
    ) -> TranslatorWidget<R> {
        TranslatorWidget::new(recognizer, self.translator.clone(), synthesizer)
    }
}
