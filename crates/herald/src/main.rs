//! Herald: timezone-aware one-shot message delivery bot.
//!
//! Main binary with subcommands:
//! - `run`: schedule and deliver the message to every stored contact
//! - `menu`: interactive contact and message management
//! - `import`: load contacts from a JSON file into the store

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use miette::Result;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod menu;
mod run;

/// Parse boolean from environment variable, accepting common truthy values.
/// Accepts "1", "true", "yes", "on" (case-insensitive) as true.
/// Accepts "0", "false", "no", "off", "" (case-insensitive) as false.
fn parse_bool_env(s: &str) -> Result<bool, String> {
    match s.to_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" | "" => Ok(false),
        _ => Err(format!(
            "invalid boolean value '{}', expected 1/true/yes/on or 0/false/no/off",
            s
        )),
    }
}

#[derive(Parser)]
#[command(name = "herald")]
#[command(about = "Timezone-aware one-shot message delivery bot", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Schedule the message for every contact and deliver on time
    Run {
        /// Message body to deliver (falls back to the stored custom message)
        #[arg(long, env = "HERALD_MESSAGE")]
        message: Option<String>,

        /// Target calendar date, YYYY-MM-DD
        #[arg(long, env = "HERALD_TARGET_DATE", default_value = "2026-01-01")]
        target_date: String,

        /// Target local time in each recipient's timezone, HH:MM
        #[arg(long, env = "HERALD_TARGET_TIME", default_value = "00:00")]
        target_time: String,

        /// Messaging gateway base URL
        #[arg(long, env = "HERALD_GATEWAY_URL", default_value = "http://localhost:3000")]
        gateway_url: String,

        /// Contact database path
        #[arg(long, env = "HERALD_DB_PATH", default_value = "./data/herald.db")]
        db_path: PathBuf,

        /// Legacy contacts JSON, migrated into the store when it is empty
        #[arg(long, env = "HERALD_CONTACTS_JSON", default_value = "./data/contacts.json")]
        contacts_json: PathBuf,

        /// Fire every job a fixed delay from now instead of at the target,
        /// so the pipeline can be validated without waiting for the date
        #[arg(long, env = "HERALD_TEST_MODE", value_parser = parse_bool_env, default_value = "false")]
        test_mode: bool,

        /// Delay in seconds used by test mode
        #[arg(long, env = "HERALD_TEST_DELAY_SECONDS", default_value = "30")]
        test_delay_seconds: u64,

        /// Open the interactive menu first to pick recipients
        #[arg(long, short = 'i')]
        interactive: bool,
    },

    /// Manage contacts and the message interactively
    Menu {
        /// Contact database path
        #[arg(long, env = "HERALD_DB_PATH", default_value = "./data/herald.db")]
        db_path: PathBuf,
    },

    /// Import contacts from a JSON file
    Import {
        /// Path to a `{ "contacts": [...] }` JSON file
        file: PathBuf,

        /// Contact database path
        #[arg(long, env = "HERALD_DB_PATH", default_value = "./data/herald.db")]
        db_path: PathBuf,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "herald=info".to_string()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Run {
            message,
            target_date,
            target_time,
            gateway_url,
            db_path,
            contacts_json,
            test_mode,
            test_delay_seconds,
            interactive,
        } => {
            run::run(run::RunConfig {
                message,
                target_date,
                target_time,
                gateway_url,
                db_path,
                contacts_json,
                test_mode,
                test_delay_seconds,
                interactive,
            })
            .await
        }

        Commands::Menu { db_path } => {
            let store = open_store(&db_path)?;
            menu::show_main_menu(&store).map(|_| ())
        }

        Commands::Import { file, db_path } => {
            let store = open_store(&db_path)?;
            let contacts = herald_store::load_contacts_file(&file)
                .map_err(|e| miette::miette!("{}", e))?;
            let imported = store
                .import_contacts(&contacts)
                .map_err(|e| miette::miette!("{}", e))?;
            println!(
                "Imported {} contact(s) ({} already present)",
                imported,
                contacts.contacts.len() - imported
            );
            Ok(())
        }
    }
}

/// Open the contact store, creating parent directories as needed.
fn open_store(db_path: &std::path::Path) -> Result<herald_store::ContactStore> {
    if let Some(parent) = db_path.parent()
        && !parent.as_os_str().is_empty()
    {
        std::fs::create_dir_all(parent).map_err(|e| miette::miette!("{}", e))?;
    }
    herald_store::ContactStore::open(db_path).map_err(|e| miette::miette!("{}", e))
}
