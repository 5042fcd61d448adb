//! Terminal front-end for the assistant components.

use log::{ debug, info, warn };
use std::error::Error;
use std::io::Write;
use std::path::Path;
use std::sync::Arc;
use tokio::io::{ AsyncBufReadExt, BufReader };
use uuid::Uuid;

use crate::app::ClinicAssistant;
use crate::chat::socket::{ socket_url, SessionSocket };
use crate::chat::{ ChatController, QuickOption, SendOutcome };
use crate::cli::{ Args, MedicineFields };
use crate::inventory::{ Confirm, InventoryScreen, MedicineForm };
use crate::models::chat::{ ChatMessage, Sender };
use crate::session::SessionObserver;
use crate::storage::Attachment;
use crate::translator::{ RecognizerConfig, SpeechRecognizer, SpeechSynthesizer, LANGUAGES };

type CliResult = Result<(), Box<dyn Error + Send + Sync>>;

struct LoggingObserver;

impl SessionObserver for LoggingObserver {
    fn on_messages_updated(&self, session_id: &str, messages: &[ChatMessage]) {
        debug!("Session {} updated: {} messages", session_id, messages.len());
    }
}

/// Typed lines stand in for recognized speech.
#[derive(Default)]
struct TypedRecognizer {
    lang: String,
}

impl SpeechRecognizer for TypedRecognizer {
    fn configure(&mut self, config: &RecognizerConfig) {
        debug!("Recognizer configured: {:?}", config);
        self.lang = config.lang.clone();
    }

    fn start(&mut self) {
        debug!("🎙️ Listening ({})", self.lang);
    }

    fn stop(&mut self) {
        debug!("🎙️ Stopped listening");
    }
}

struct PrintSynthesizer;

impl SpeechSynthesizer for PrintSynthesizer {
    fn speak(&self, text: &str, lang: &str) {
        println!("🔊 ({}) {}", lang, text);
    }
}

struct StdinConfirm;

impl Confirm for StdinConfirm {
    fn confirm(&self, prompt: &str) -> bool {
        print!("{} [y/N] ", prompt);
        let _ = std::io::stdout().flush();
        let mut answer = String::new();
        if std::io::stdin().read_line(&mut answer).is_err() {
            return false;
        }
        matches!(answer.trim().to_lowercase().as_str(), "y" | "yes")
    }
}

fn prompt(label: &str) {
    print!("{}", label);
    let _ = std::io::stdout().flush();
}

fn print_message(msg: &ChatMessage) {
    let who = match msg.sender {
        Sender::Doctor => "doctor",
        Sender::Ai => "assistant",
        Sender::System => "system",
    };
    let time = msg.created_at.format("%H:%M:%S");
    match &msg.file_url {
        Some(url) => println!("[{}] {}: {} <{}>", time, who, msg.content, url),
        None => println!("[{}] {}: {}", time, who, msg.content),
    }
}

const CHAT_HELP: &str =
    "Commands: /option <symptoms|diagnosis|treatment|precautions|rare>, /attach <path>, \
/patient <visit id>, /patients, /voice <dictated words>, /new, /quit. Anything else is sent as a message.";

fn start_socket(args: &Args, session_id: &str) -> Option<SessionSocket> {
    let base = args.ws_base_url.as_deref()?;
    match socket_url(base, session_id) {
        Ok(url) => Some(SessionSocket::spawn(url)),
        Err(e) => {
            warn!("Invalid WS_BASE_URL '{}': {}", base, e);
            None
        }
    }
}

async fn send_and_print(ctrl: &mut ChatController) {
    let before = ctrl.messages().len();
    match ctrl.send().await {
        Ok(SendOutcome::Ignored) => {}
        Ok(_) => {
            for msg in &ctrl.messages()[before..] {
                print_message(msg);
            }
        }
        Err(e) => println!("⚠️ {}", e),
    }
}

pub async fn chat(args: &Args, assistant: &ClinicAssistant, session_id: Option<String>) -> CliResult {
    let session_id = session_id.unwrap_or_else(|| Uuid::new_v4().to_string());
    let mut ctrl = assistant
        .chat_controller(&session_id, Arc::new(LoggingObserver))
        .with_recognizer(Box::new(TypedRecognizer::default()));
    ctrl.open_session(&session_id);
    let mut socket = start_socket(args, &session_id);

    println!("Session {}. {}", session_id, CHAT_HELP);
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        prompt("> ");
        let Some(line) = lines.next_line().await? else {
            break;
        };
        let line = line.trim_end();
        let (command, rest) = match line.split_once(' ') {
            Some((c, r)) => (c, r.trim()),
            None => (line, ""),
        };
        match command {
            "/quit" | "/exit" => break,
            "/help" => println!("{}", CHAT_HELP),
            "/option" =>
                match rest.parse::<QuickOption>() {
                    Ok(option) =>
                        match ctrl.toggle_option(option) {
                            Ok(()) => println!("Composer: {}", ctrl.composer().text),
                            Err(e) => println!("⚠️ {}", e),
                        }
                    Err(e) => println!("⚠️ {}", e),
                }
            "/attach" =>
                match Attachment::from_path(Path::new(rest)) {
                    Ok(attachment) => {
                        println!("Attached {} ({} bytes)", attachment.name, attachment.size());
                        ctrl.attach(attachment);
                    }
                    Err(e) => println!("⚠️ Cannot read {}: {}", rest, e),
                }
            "/voice" => {
                ctrl.toggle_voice();
                if ctrl.is_recording() {
                    if rest.is_empty() {
                        ctrl.on_voice_error("no-speech");
                    } else {
                        ctrl.on_voice_result(rest);
                        ctrl.toggle_voice();
                    }
                }
                match ctrl.voice_error() {
                    Some(err) => println!("⚠️ {}", err),
                    None => println!("Composer: {}", ctrl.composer().text),
                }
            }
            "/patient" => {
                ctrl.set_patient_id(rest);
                println!("Patient visit id: {}", if rest.is_empty() { "(none)" } else { rest });
            }
            "/patients" =>
                match ctrl.patient_ids().await {
                    Ok(ids) => println!("{}", ids.join("\n")),
                    Err(e) => println!("⚠️ {}", e),
                }
            "/new" => {
                let id = Uuid::new_v4().to_string();
                if let Some(old) = socket.take() {
                    old.abort();
                }
                ctrl.open_session(&id);
                socket = start_socket(args, &id);
                println!("Session {}", id);
            }
            "/send" => send_and_print(&mut ctrl).await,
            _ => {
                // An option template or attachment may already be in the composer.
                if !line.is_empty() {
                    let text = if ctrl.composer().option.is_some() {
                        format!("{}{}", ctrl.composer().text, line)
                    } else {
                        line.to_string()
                    };
                    ctrl.set_text(&text);
                }
                send_and_print(&mut ctrl).await;
            }
        }
    }

    if let Some(socket) = socket {
        info!("Session socket state at exit: {:?}", socket.state());
        socket.abort();
    }
    Ok(())
}

fn print_inventory(screen: &InventoryScreen) {
    if let Some(err) = screen.error() {
        println!("⚠️ {}", err);
    }
    println!(
        "{:<38} {:<24} {:<12} {:<18} {:>16} {:>10} {:<10}",
        "ID",
        "NAME",
        "BATCH",
        "MANUFACTURER",
        "STOCK",
        "PRICE",
        "EXPIRY"
    );
    for row in screen.rows() {
        let m = row.medicine;
        println!(
            "{:<38} {:<24} {:<12} {:<18} {:>16} {:>10.2} {:<10}",
            m.id,
            m.name,
            m.batch_number,
            m.manufacturer,
            row.stock_label(),
            m.unit_price,
            m.expiry_date.map(|d| d.format("%Y-%m-%d").to_string()).unwrap_or_default()
        );
    }
}

fn apply_fields(form: &mut MedicineForm, fields: MedicineFields) {
    let MedicineFields {
        name,
        category,
        batch_number,
        manufacturer,
        stock_quantity,
        unit_price,
        expiry_date,
        purchase_date,
        threshold_limit,
        description,
    } = fields;
    let pairs = [
        (&mut form.name, name),
        (&mut form.category, category),
        (&mut form.batch_number, batch_number),
        (&mut form.manufacturer, manufacturer),
        (&mut form.stock_quantity, stock_quantity),
        (&mut form.unit_price, unit_price),
        (&mut form.expiry_date, expiry_date),
        (&mut form.purchase_date, purchase_date),
        (&mut form.threshold_limit, threshold_limit),
        (&mut form.description, description),
    ];
    for (slot, value) in pairs {
        if let Some(value) = value {
            *slot = value;
        }
    }
}

pub async fn medicines(assistant: &ClinicAssistant, action: crate::cli::MedicineAction) -> CliResult {
    use crate::cli::MedicineAction;

    let mut screen = assistant.inventory_screen();
    match action {
        MedicineAction::List => {
            screen.refresh().await;
            print_inventory(&screen);
        }
        MedicineAction::Reconcile => {
            if let Some(report) = screen.mount().await {
                for update in &report.stock_updates {
                    println!("{}: {} -> {}", update.medicine_name, update.from, update.to);
                }
                for name in &report.missing_medicines {
                    println!("Medicine not found: {}", name);
                }
                println!(
                    "{} records today, {} processed, {} already applied, {} failures",
                    report.records_seen,
                    report.records_processed,
                    report.records_skipped,
                    report.failures
                );
            }
            print_inventory(&screen);
        }
        MedicineAction::Add(fields) => {
            screen.open_new();
            apply_fields(screen.form_mut(), fields);
            let created = screen.submit().await?;
            println!("Created {} ({})", created.name, created.id);
        }
        MedicineAction::Edit { id, fields } => {
            screen.refresh().await;
            if !screen.begin_edit(&id) {
                return Err(format!("Medicine not found for ID: {}", id).into());
            }
            apply_fields(screen.form_mut(), fields);
            let updated = screen.submit().await?;
            println!("Updated {} ({})", updated.name, updated.id);
        }
        MedicineAction::Delete { id, yes } => {
            screen.refresh().await;
            let deleted = if yes {
                screen.delete(&id, &|_: &str| true).await
            } else {
                screen.delete(&id, &StdinConfirm).await
            };
            match (deleted, screen.error()) {
                (true, _) => println!("Deleted {}", id),
                (false, Some(err)) => return Err(err.to_string().into()),
                (false, None) => println!("Cancelled"),
            }
        }
    }
    Ok(())
}

pub async fn translate(assistant: &ClinicAssistant, language: &str) -> CliResult {
    let mut widget = assistant.translator_widget(
        TypedRecognizer::default(),
        Arc::new(PrintSynthesizer)
    );
    widget.select_language(language)?;
    let names: Vec<_> = LANGUAGES.iter()
        .map(|l| format!("{} ({})", l.code, l.name))
        .collect();
    println!(
        "Type what the patient said in {}. /lang <code> switches language [{}], /quit exits.",
        widget.language().name,
        names.join(", ")
    );

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        prompt(&format!("{}> ", widget.language().code));
        let Some(line) = lines.next_line().await? else {
            break;
        };
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        if line == "/quit" {
            break;
        }
        if let Some(code) = line.strip_prefix("/lang") {
            if let Err(e) = widget.select_language(code.trim()) {
                println!("⚠️ {}", e);
            }
            continue;
        }

        widget.clear();
        let code = widget.language().code;
        widget.start_capture(code)?;
        widget.on_result(line).await;
        widget.stop_capture();
        if let Some(err) = widget.error() {
            println!("⚠️ {}", err);
        } else {
            println!("{}", widget.translated_text());
        }
    }
    Ok(())
}

pub async fn analysis(assistant: &ClinicAssistant, visit_patient_id: &str, generate: bool) -> CliResult {
    if !generate {
        if let Some(existing) = assistant.analysis().existing(visit_patient_id).await {
            println!("{}", existing);
            return Ok(());
        }
        info!("No stored analysis for {}, generating one", visit_patient_id);
    }
    let result = assistant.analysis().generate(visit_patient_id).await?;
    println!("Initial analysis:\n{}\n\nRecommendations:\n{}", result.initial_analysis, result.recommendations);
    Ok(())
}

pub async fn patients(assistant: &ClinicAssistant) -> CliResult {
    for id in assistant.stores().records.visit_patient_ids().await? {
        println!("{}", id);
    }
    Ok(())
}
