use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use quickclip::session::parse_keywords;
use quickclip::{AppConfig, KeywordMatch, SessionId, SettingsStore, StoreOptions};
use serde_json::Value;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{warn, Level};

#[derive(Debug, Parser)]
#[command(
    name = "quickclip",
    version,
    about = "Manage QuickClip settings, sessions and build directories"
)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Application config file (extension optional)
    #[arg(long, global = true, default_value = "quickclip")]
    config: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Manage the app settings
    #[command(subcommand, alias = "config")]
    Settings(SettingsCommand),

    /// Manage the recorded video topics
    #[command(subcommand)]
    Topics(TopicsCommand),

    /// Manage session build directories
    #[command(subcommand)]
    Build(BuildCommand),

    /// Print a rendered video's metadata tags
    #[command(visible_alias = "info", alias = "metadata")]
    Inspect {
        /// Session id (defaults to the last session)
        #[arg(short, long)]
        session_id: Option<String>,
    },
}

#[derive(Debug, Subcommand)]
enum SettingsCommand {
    /// Print the config file contents
    #[command(alias = "display")]
    Show,

    /// Print the value for a key
    Get { key: String },

    /// Set a key to a string value
    Set {
        key: String,
        value: String,

        /// Store the value encrypted (requires ENCRYPTION_KEY)
        #[arg(short, long)]
        encrypt: bool,
    },

    /// Delete a key
    #[command(alias = "remove")]
    Delete { key: String },
}

#[derive(Debug, Subcommand)]
enum TopicsCommand {
    /// List recorded video topics
    List {
        /// Comma separated keywords to filter by
        #[arg(short = 'k', long)]
        filter_keywords: Option<String>,

        /// Require every keyword instead of any
        #[arg(long)]
        all: bool,
    },

    /// Delete a topic by its 0-based index
    #[command(alias = "remove")]
    Delete { index: usize },
}

#[derive(Debug, Subcommand)]
enum BuildCommand {
    /// List the files in a session's build directory
    #[command(alias = "ls")]
    List {
        #[arg(short, long)]
        session_id: Option<String>,
    },

    /// Delete a session's build directory, or a path inside it
    #[command(alias = "remove")]
    Delete {
        #[arg(short, long)]
        session_id: Option<String>,

        /// Path inside the build directory (e.g. pictures/0.jpeg)
        #[arg(long)]
        sub_path: Option<PathBuf>,
    },

    /// Empty a session's build directory, keeping its layout
    Clean {
        #[arg(short, long)]
        session_id: Option<String>,
    },

    /// List past sessions that have a rendered video
    Sessions {
        /// Only print session ids
        #[arg(long)]
        ids_only: bool,

        /// Only show the last session
        #[arg(long)]
        last_only: bool,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_max_level(if cli.verbose { Level::DEBUG } else { Level::WARN })
        .with_writer(std::io::stderr)
        .init();

    let cfg = AppConfig::load(&cli.config).context("Failed to load application config")?;
    let root = cfg.root_dir()?;

    let mut store = SettingsStore::open(&root, SessionId::Temporary, store_options(&cfg, cli.verbose))
        .with_context(|| format!("Failed to open settings store at {}", root.display()))?;

    let result = run(cli.command, &mut store, cli.verbose);
    store.close();
    result
}

fn store_options(cfg: &AppConfig, verbose: bool) -> StoreOptions {
    StoreOptions::default()
        .verbose(verbose)
        .probe(Arc::new(cfg.probe()))
}

fn run(command: Command, store: &mut SettingsStore, verbose: bool) -> Result<()> {
    match command {
        Command::Settings(cmd) => run_settings(cmd, store, verbose),
        Command::Topics(cmd) => run_topics(cmd, store),
        Command::Build(cmd) => run_build(cmd, store),
        Command::Inspect { session_id } => {
            let session_id = require_session(store, session_id, "inspect the video")?;
            let video_path = store
                .get_video_path(&session_id, false)?
                .context("No rendered video")?;
            let metadata = store.get_metadata(&video_path)?;
            println!("{}", serde_json::to_string_pretty(&metadata)?);
            Ok(())
        }
    }
}

fn run_settings(cmd: SettingsCommand, store: &mut SettingsStore, verbose: bool) -> Result<()> {
    match cmd {
        SettingsCommand::Show => {
            println!("Settings:\n");
            println!("{}", serde_json::to_string_pretty(store.config())?);
        }
        SettingsCommand::Get { key } => {
            let value = store.get(&key)?;
            println!("Value for key '{}': {}", key, display_value(value.as_ref()));
        }
        SettingsCommand::Set { key, value, encrypt } => {
            store.set(&key, value.as_str(), encrypt)?;
            if verbose {
                println!("Set key '{}' to value '{}'.", key, value);
            }
        }
        SettingsCommand::Delete { key } => {
            store.delete(&key);
            if verbose {
                println!("Deleted key '{}'.", key);
            }
        }
    }
    Ok(())
}

fn run_topics(cmd: TopicsCommand, store: &mut SettingsStore) -> Result<()> {
    match cmd {
        TopicsCommand::List { filter_keywords, all } => {
            let topics = store.past_topics()?;
            if topics.is_empty() {
                bail!("No video topics found.");
            }

            let keywords = filter_keywords.as_deref().map(parse_keywords).unwrap_or_default();
            let mode = if all { KeywordMatch::All } else { KeywordMatch::Any };
            for (index, title) in topics.filter(&keywords, mode) {
                println!("{}. {}", index + 1, title);
            }
        }
        TopicsCommand::Delete { index } => {
            let (_, title) = store.remove_topic(index)?;
            println!("Deleted video topic: {}", title);
        }
    }
    Ok(())
}

fn run_build(cmd: BuildCommand, store: &mut SettingsStore) -> Result<()> {
    match cmd {
        BuildCommand::List { session_id } => {
            let session_id = require_session(store, session_id, "list the build directory")?;
            let build_dir = store.build_dir_for_session(&session_id);
            for file in store.list_build_dir(&session_id)? {
                let relative = file.strip_prefix(&build_dir).unwrap_or(file.as_path());
                println!("{}", relative.display());
            }
        }
        BuildCommand::Delete {
            session_id,
            sub_path,
        } => {
            let session_id = require_session(store, session_id, "delete the build directory")?;
            if store.remove_build_path(&session_id, sub_path.as_deref())? {
                println!("Deleted video build directory.");
            } else {
                println!("Nothing to delete for session {}.", session_id);
            }
        }
        BuildCommand::Clean { session_id } => {
            let session_id = require_session(store, session_id, "clean the build directory")?;
            store.clean_build_dir_for(&session_id)?;
        }
        BuildCommand::Sessions { ids_only, last_only } => {
            let last_session = store.last_session_id()?;

            if ids_only && last_only {
                println!("Last Session:\n");
                println!("{}", last_session.as_deref().unwrap_or("None"));
                return Ok(());
            }

            let sessions: Vec<_> = store
                .get_sessions()?
                .into_iter()
                .filter_map(|lookup| match lookup {
                    Ok(record) => Some(record),
                    Err(e) => {
                        warn!("{}", e);
                        None
                    }
                })
                .filter(|record| !last_only || Some(&record.id) == last_session.as_ref())
                .collect();

            if last_only {
                println!("Last Session:\n");
            } else {
                println!("Total Sessions: {}\n", sessions.len());
            }

            for (index, record) in sessions.iter().enumerate() {
                if ids_only {
                    println!("{}. {}", index + 1, record.id);
                    continue;
                }

                println!("{}", record.id);
                println!("  Title:       {}", record.title);
                println!("  Owner:       {}", record.owner);
                println!("  Created:     {}", optional(record.date));
                println!("  Duration:    {}", optional(record.duration_secs));
                println!("  Description: {}", record.description);
                println!("  Hashtags:    {}", record.tags.join(","));
                println!("  Genre:       {}", optional(record.genre));
                println!("  Copyright:   {}", record.copyright);
                println!("  Credits:     {}", record.credits);
            }
        }
    }
    Ok(())
}

/// Session id from the flag or the last session; its build directory must exist
fn require_session(store: &SettingsStore, session_id: Option<String>, action: &str) -> Result<String> {
    let session_id = match session_id {
        Some(id) => Some(id),
        None => store.last_session_id()?,
    };

    match session_id {
        Some(id) if store.session_exists(&SessionId::from_arg(Some(&id))) => {
            println!("Session UID: {}", id);
            Ok(id)
        }
        _ => bail!("No session ID found. Please provide a session ID to {}.", action),
    }
}

fn display_value(value: Option<&Value>) -> String {
    match value {
        None | Some(Value::Null) => "None".to_string(),
        Some(Value::String(s)) => s.clone(),
        Some(other) => other.to_string(),
    }
}

fn optional<T: std::fmt::Display>(value: Option<T>) -> String {
    value.map_or_else(|| quickclip::session::UNKNOWN.to_string(), |v| v.to_string())
}
