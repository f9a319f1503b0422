//! nomadic: run journal analyses from the command line
//!
//! Reads journal entries (or expenses) as a JSON array and prints the typed
//! result as JSON.

use std::io::{self, IsTerminal, Read};
use std::path::PathBuf;

use clap::{Parser, Subcommand};
use nomadic_llm::{AnalystBuilder, Expense, JournalAnalyst, JournalEntry, Secrets, Settings};
use serde::Serialize;

/// Nomadic journal analysis
#[derive(Parser)]
#[command(name = "nomadic")]
#[command(version)]
#[command(about = "LLM-backed analysis of travel journal entries and expenses")]
struct Args {
    /// Config file (default: ~/.nomadic/config.toml, then /etc/nomadic/config.toml)
    #[arg(short, long, env = "NOMADIC_CONFIG", global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Summarize journal entries
    Summarize {
        /// JSON array of entries (or omit to read from stdin)
        #[arg(short, long)]
        input: Option<PathBuf>,
    },

    /// Suggest reflective questions for the next entry
    Questions {
        #[arg(short, long)]
        input: Option<PathBuf>,
    },

    /// Extract mood, themes, people, places and activities
    Metadata {
        #[arg(short, long)]
        input: Option<PathBuf>,
    },

    /// Recommend places to visit next
    Places {
        #[arg(short, long)]
        input: Option<PathBuf>,
    },

    /// Analyze trip expenses
    Expenses {
        /// JSON array of expenses (or omit to read from stdin)
        #[arg(short, long)]
        input: Option<PathBuf>,
    },

    /// Show provider circuit state
    Health,

    /// List loaded prompt templates
    Templates,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialise tracing (default: warn for CLI; override with RUST_LOG).
    tracing_subscriber::fmt()
        .with_writer(io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .init();

    let args = Args::parse();

    let settings = Settings::load(args.config.as_deref())?;
    let secrets = Secrets::load()?;
    let analyst = AnalystBuilder::from_settings(&settings, &secrets)?.build()?;

    match args.command {
        Command::Summarize { input } => {
            let entries: Vec<JournalEntry> = read_input(input)?;
            let deadline = analyst.default_deadline();
            print_json(&analyst.summarize(&entries, &deadline).await?)?;
        }
        Command::Questions { input } => {
            let entries: Vec<JournalEntry> = read_input(input)?;
            let deadline = analyst.default_deadline();
            print_json(&analyst.reflective_prompts(&entries, &deadline).await?)?;
        }
        Command::Metadata { input } => {
            let entries: Vec<JournalEntry> = read_input(input)?;
            let deadline = analyst.default_deadline();
            print_json(&analyst.extract_metadata(&entries, &deadline).await?)?;
        }
        Command::Places { input } => {
            let entries: Vec<JournalEntry> = read_input(input)?;
            let deadline = analyst.default_deadline();
            print_json(&analyst.recommend_places(&entries, &deadline).await?)?;
        }
        Command::Expenses { input } => {
            let expenses: Vec<Expense> = read_input(input)?;
            let deadline = analyst.default_deadline();
            print_json(&analyst.analyze_expenses(&expenses, &deadline).await?)?;
        }
        Command::Health => print_json(&analyst.provider_health())?,
        Command::Templates => print_templates(&analyst),
    }

    Ok(())
}

fn print_templates(analyst: &JournalAnalyst) {
    let templates = analyst.templates();
    for name in templates.names() {
        if let Ok(template) = templates.get(name) {
            println!("{} v{} ({} placeholders)", name, template.version, template.placeholders().len());
        }
    }
}

fn print_json<T: Serialize>(value: &T) -> Result<(), Box<dyn std::error::Error>> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// Parse the JSON input from a file, or from stdin if no path was given.
fn read_input<T: serde::de::DeserializeOwned>(
    path: Option<PathBuf>,
) -> Result<T, Box<dyn std::error::Error>> {
    let content = match path {
        Some(path) => std::fs::read_to_string(&path)
            .map_err(|e| format!("failed to read {}: {e}", path.display()))?,
        None => {
            if io::stdin().is_terminal() {
                return Err("no input: pass --input <file.json> or pipe JSON on stdin".into());
            }
            let mut buf = String::new();
            io::stdin().read_to_string(&mut buf)?;
            buf
        }
    };
    Ok(serde_json::from_str(&content)?)
}
