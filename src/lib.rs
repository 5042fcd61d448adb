pub mod analysis;
pub mod app;
pub mod chat;
pub mod cli;
pub mod console;
pub mod inventory;
pub mod models;
pub mod session;
pub mod storage;
pub mod store;
pub mod translator;

use app::ClinicAssistant;
use cli::{ mask_secret, Args, Command };
use log::info;
use std::error::Error;

pub async fn run(args: Args) -> Result<(), Box<dyn Error + Send + Sync>> {
    info!("--- Core Configuration ---");
    info!("AI Backend URL: {}", args.api_url);
    info!("Session Socket Base: {}", args.ws_base_url.as_deref().unwrap_or("disabled"));
    info!("HTTP Timeout: {}s", args.http_timeout_secs);
    info!("Store Type: {}", args.store_type);
    info!("Database URL: {}", args.database_url);
    info!("Database Key: {}", mask_secret(&args.database_key));
    if let Some(path) = &args.store_seed_path {
        info!("Store Seed Path: {}", path);
    }
    info!("Attachment Bucket: {}", args.attachment_bucket);
    info!("Translate URL: {}", args.translate_url);
    info!("Translate API Key: {}", mask_secret(&args.translate_api_key));
    info!("-------------------------");

    let assistant = ClinicAssistant::new(&args)?;

    match args.command.clone() {
        Command::Chat { session_id } => console::chat(&args, &assistant, session_id).await,
        Command::Medicines { action } => console::medicines(&assistant, action).await,
        Command::Translate { language } => console::translate(&assistant, &language).await,
        Command::Analysis { visit_patient_id, generate } => {
            console::analysis(&assistant, &visit_patient_id, generate).await
        }
        Command::Patients => console::patients(&assistant).await,
    }
}
