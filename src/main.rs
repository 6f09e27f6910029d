use anyhow::{Context, Result};
use clap::Parser;
use portal::api::{ApiClient, Character};
use portal::app::{App, AppEvent};
use portal::config::Config;
use portal::feed::{FeedController, FetchOutcome, FetchSkipped};
use portal::keybindings::KeybindingRegistry;
use portal::theme::ThemeVariant;
use portal::ui;
use portal::util::{display_width, sanitize, truncate_to_width};
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tokio::sync::mpsc;

/// Get the config directory path (~/.config/portal/)
fn get_config_dir() -> Result<PathBuf> {
    let home = std::env::var("HOME").context("HOME environment variable not set")?;
    Ok(PathBuf::from(home).join(".config").join("portal"))
}

#[derive(Parser, Debug)]
#[command(
    name = "portal",
    about = "Terminal browser for the Rick and Morty character API"
)]
struct Args {
    /// Config file (default: ~/.config/portal/config.toml)
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Override the API base URL from the config file
    #[arg(long, value_name = "URL")]
    base_url: Option<String>,

    /// Fetch N pages, resolve episodes, print a table and exit
    #[arg(long, value_name = "N")]
    print: Option<u32>,

    /// Write logs to this file (default: stderr with --print,
    /// ~/.config/portal/portal.log otherwise)
    #[arg(long, value_name = "FILE")]
    log_file: Option<PathBuf>,
}

/// Log file used by the TUI when `--log-file` is not given.
const DEFAULT_LOG_FILE: &str = "portal.log";

#[derive(Debug, PartialEq, Eq)]
enum LogTarget {
    Stderr,
    File(PathBuf),
    Discard,
}

/// The TUI owns the terminal, so only headless mode may log to stderr.
fn log_target(args: &Args, config_dir: Option<&Path>) -> LogTarget {
    if let Some(path) = &args.log_file {
        return LogTarget::File(path.clone());
    }
    if args.print.is_some() {
        return LogTarget::Stderr;
    }
    match config_dir {
        Some(dir) => LogTarget::File(dir.join(DEFAULT_LOG_FILE)),
        None => LogTarget::Discard,
    }
}

fn init_tracing(target: LogTarget) -> Result<()> {
    let filter = tracing_subscriber::EnvFilter::from_default_env();
    match target {
        LogTarget::File(path) => {
            if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
                std::fs::create_dir_all(parent).with_context(|| {
                    format!("Failed to create log directory '{}'", parent.display())
                })?;
            }
            let file = std::fs::OpenOptions::new()
                .create(true)
                .append(true)
                .open(&path)
                .with_context(|| format!("Failed to open log file '{}'", path.display()))?;
            tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_ansi(false)
                .with_writer(Mutex::new(file))
                .init();
        }
        LogTarget::Stderr => {
            tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_writer(std::io::stderr)
                .init();
        }
        LogTarget::Discard => {
            tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_writer(std::io::sink)
                .init();
        }
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    let config_dir = get_config_dir().ok();
    init_tracing(log_target(&args, config_dir.as_deref()))?;

    let config_path = match (args.config, config_dir) {
        (Some(path), _) => path,
        (None, Some(dir)) => dir.join("config.toml"),
        (None, None) => get_config_dir()?.join("config.toml"),
    };
    let mut config = Config::load(&config_path)
        .with_context(|| format!("Failed to load config '{}'", config_path.display()))?;
    if let Some(base_url) = args.base_url {
        config.api_base_url = base_url;
    }

    let client =
        ApiClient::new(&config.client_settings()).context("Failed to create HTTP client")?;
    let mut controller = FeedController::new(client, config.controller_settings());

    if let Some(pages) = args.print {
        return print_characters(&mut controller, pages).await;
    }

    let mut keybindings = KeybindingRegistry::new();
    for warning in keybindings.apply_overrides(&config.keybindings) {
        tracing::warn!("{}", warning);
    }

    let mut app = App::new(controller, keybindings);
    app.prefetch_threshold = config.prefetch_threshold;
    match ThemeVariant::from_str_name(&config.theme) {
        Some(variant) => app.set_theme(variant),
        None => tracing::warn!(theme = %config.theme, "Unknown theme, using dark"),
    }

    // Create event channel for background tasks
    let (event_tx, event_rx) = mpsc::channel::<AppEvent>(32);

    ui::run(&mut app, event_tx, event_rx).await?;
    Ok(())
}

/// Headless mode: load up to `pages` pages (each followed by its
/// enrichment pass) and print one line per character.
async fn print_characters(controller: &mut FeedController, pages: u32) -> Result<()> {
    for _ in 0..pages {
        match controller.fetch_next_page().await {
            FetchOutcome::Appended { .. } => {}
            FetchOutcome::Skipped(FetchSkipped::EndOfData) => break,
            FetchOutcome::Skipped(skipped) => {
                tracing::debug!(?skipped, "Fetch skipped in print mode");
            }
            FetchOutcome::Failed(e) => {
                eprintln!(
                    "Warning: page {} failed to load: {}",
                    controller.state().cursor(),
                    e
                );
                break;
            }
        }
    }

    let characters = controller.state().characters();
    let name_width = characters
        .iter()
        .map(|c| display_width(&sanitize(&c.name)))
        .max()
        .unwrap_or(0)
        .min(32);

    for character in characters.iter() {
        println!("{}", format_row(character, name_width));
    }
    if controller.state().is_end_of_data() {
        eprintln!("{} characters (end of data)", characters.len());
    } else {
        eprintln!(
            "{} characters (next page {})",
            characters.len(),
            controller.state().cursor()
        );
    }
    Ok(())
}

fn format_row(character: &Character, name_width: usize) -> String {
    let name = sanitize(&character.name);
    let name = truncate_to_width(&name, name_width);
    let pad = name_width.saturating_sub(display_width(&name));
    format!(
        "{:>4}  {}{}  {:<8} {:<8} {}",
        character.id,
        name,
        " ".repeat(pad),
        sanitize(&character.status),
        sanitize(&character.gender),
        sanitize(&character.last_episode)
    )
}
