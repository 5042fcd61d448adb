use clap::{ Args as ClapArgs, Parser, Subcommand };

#[derive(Parser, Debug, Clone)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    // --- AI Backend Args ---
    /// Base URL of the clinical AI backend (serves /doctor/chat-ai and /analysis)
    #[arg(long, env = "API_URL", default_value = "http://localhost:5000")]
    pub api_url: String,

    /// Base URL for the session socket (e.g., ws://localhost:5000). Monitoring is off when unset.
    #[arg(long, env = "WS_BASE_URL")]
    pub ws_base_url: Option<String>,

    /// Timeout in seconds applied to every outbound HTTP request.
    #[arg(long, env = "HTTP_TIMEOUT_SECS", default_value = "60")]
    pub http_timeout_secs: u64,

    // --- Database Args ---
    /// Clinic data store type (rest, memory)
    #[arg(long, env = "STORE_TYPE", default_value = "rest")]
    pub store_type: String,

    /// Hosted database project URL (REST and storage APIs live under it)
    #[arg(long, env = "DATABASE_URL", default_value = "http://localhost:54321")]
    pub database_url: String,

    /// API key sent as `apikey` and bearer token to the hosted database.
    #[arg(long, env = "DATABASE_KEY", default_value = "")]
    pub database_key: String,

    /// JSON file used to seed the memory store.
    #[arg(long, env = "STORE_SEED_PATH")]
    pub store_seed_path: Option<String>,

    /// Object storage bucket for chat image attachments.
    #[arg(long, env = "ATTACHMENT_BUCKET", default_value = "chat-attachments")]
    pub attachment_bucket: String,

    // --- Translation Args ---
    /// Translation endpoint URL
    #[arg(long, env = "TRANSLATE_URL", default_value = "https://google-api31.p.rapidapi.com/gtranslate")]
    pub translate_url: String,

    /// RapidAPI key for the translation endpoint
    #[arg(long, env = "TRANSLATE_API_KEY", default_value = "")]
    pub translate_api_key: String,

    /// RapidAPI host header for the translation endpoint
    #[arg(long, env = "TRANSLATE_API_HOST", default_value = "google-api31.p.rapidapi.com")]
    pub translate_api_host: String,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Interactive assistant chat
    Chat {
        /// Session id; a random one is generated when omitted.
        #[arg(long)]
        session_id: Option<String>,
    },
    /// Medicine inventory management
    Medicines {
        #[command(subcommand)]
        action: MedicineAction,
    },
    /// Speak (type) in Hindi or Bengali and hear the English translation
    Translate {
        /// Source language code (hi-IN, bn-IN)
        #[arg(long, default_value = "hi-IN")]
        language: String,
    },
    /// Show the stored analysis for a patient visit, or generate one
    Analysis {
        visit_patient_id: String,
        /// Ask the backend to generate a fresh analysis
        #[arg(long, default_value = "false")]
        generate: bool,
    },
    /// List known patient visit ids
    Patients,
}

#[derive(Subcommand, Debug, Clone)]
pub enum MedicineAction {
    /// List medicines, flagging low stock
    List,
    /// Add a medicine
    Add(MedicineFields),
    /// Edit a medicine; omitted fields keep their current value
    Edit {
        id: String,
        #[command(flatten)]
        fields: MedicineFields,
    },
    /// Delete a medicine
    Delete {
        id: String,
        /// Skip the confirmation prompt
        #[arg(long, short = 'y', default_value = "false")]
        yes: bool,
    },
    /// Apply today's dispensations to stock
    Reconcile,
}

#[derive(ClapArgs, Debug, Clone, Default)]
pub struct MedicineFields {
    #[arg(long)]
    pub name: Option<String>,
    #[arg(long)]
    pub category: Option<String>,
    #[arg(long)]
    pub batch_number: Option<String>,
    #[arg(long)]
    pub manufacturer: Option<String>,
    #[arg(long)]
    pub stock_quantity: Option<String>,
    #[arg(long)]
    pub unit_price: Option<String>,
    /// YYYY-MM-DD
    #[arg(long)]
    pub expiry_date: Option<String>,
    /// YYYY-MM-DD
    #[arg(long)]
    pub purchase_date: Option<String>,
    #[arg(long)]
    pub threshold_limit: Option<String>,
    #[arg(long)]
    pub description: Option<String>,
}

/// Keeps the first and last two characters of a secret for start-up logging.
pub fn mask_secret(secret: &str) -> String {
    let chars: Vec<char> = secret.chars().collect();
    if chars.is_empty() {
        return "(unset)".to_string();
    }
    if chars.len() <= 6 {
        return "*".repeat(chars.len());
    }
    let head: String = chars[..2].iter().collect();
    let tail: String = chars[chars.len() - 2..].iter().collect();
    format!("{}***{}", head, tail)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_medicine_edit_with_partial_fields() {
        let args = Args::try_parse_from([
            "clinic-assistant",
            "--store-type",
            "memory",
            "medicines",
            "edit",
            "m1",
            "--stock-quantity",
            "12",
        ]).unwrap();
        assert_eq!(args.store_type, "memory");
        match args.command {
            Command::Medicines { action: MedicineAction::Edit { id, fields } } => {
                assert_eq!(id, "m1");
                assert_eq!(fields.stock_quantity.as_deref(), Some("12"));
                assert!(fields.name.is_none());
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn masks_secrets() {
        assert_eq!(mask_secret(""), "(unset)");
        assert_eq!(mask_secret("abc"), "***");
        assert_eq!(mask_secret("75e3fe6846msh"), "75***sh");
    }
}
