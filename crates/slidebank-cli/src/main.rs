//! SlideBank CLI - Watch, ingest and inspect presentation decks.

mod commands;

use clap::{Parser, Subcommand};
use colored::Colorize;
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// SlideBank - Presentation ingestion and slide library
#[derive(Parser)]
#[command(name = "slidebank")]
#[command(version)]
#[command(about = "Ingest presentation decks into a searchable slide library", long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize SlideBank (create config, database and storage directories)
    Init,

    /// Manage configuration
    #[command(subcommand)]
    Config(ConfigCommands),

    /// Show or toggle runtime feature flags
    #[command(subcommand)]
    Flag(FlagCommands),

    /// Watch the inbox directories and ingest new decks until Ctrl+C
    Watch,

    /// Ingest a single deck
    Process {
        /// Path to the deck
        path: PathBuf,

        /// Reprocess even if the content is already stored
        #[arg(short, long)]
        force: bool,
    },

    /// Clear the library and ingest every stored deck again
    ReprocessAll,

    /// Show library statistics and pending inbox files
    Status,

    /// List recently ingested decks
    Recent {
        /// Maximum number of decks to show
        #[arg(short, long, default_value = "10")]
        limit: i64,
    },

    /// Show details of a deck and its slides
    Show {
        /// Presentation ID (or unique prefix)
        id: String,
    },

    /// Print the extracted content of a deck without storing it
    Extract {
        /// Path to the deck
        file: PathBuf,

        /// Print JSON instead of a summary
        #[arg(long)]
        json: bool,
    },

    /// Replace the text of one shape on one slide
    SetText {
        /// Path to the deck
        file: PathBuf,

        /// Slide number (1-based)
        #[arg(long)]
        slide: u32,

        /// Shape index as listed by `extract` (0-based, every shape in document order)
        #[arg(long)]
        shape: usize,

        /// New text
        text: String,
    },

    /// Render slide thumbnails for a deck
    Thumbnails {
        /// Path to the deck
        file: PathBuf,

        /// Directory receiving slide-NNNN.png files
        out_dir: PathBuf,
    },
}

#[derive(Subcommand)]
enum ConfigCommands {
    /// Show current configuration and resolved storage directories
    Show,

    /// Point a storage area (stage, original, template, thumbnails, scratch) at a directory
    SetDir {
        /// Storage area
        area: String,

        /// Directory path
        dir: String,
    },
}

#[derive(Subcommand)]
enum FlagCommands {
    /// Show all feature flags
    Show,

    /// Set a feature flag (auto_process, ai_enabled)
    Set {
        /// Flag name
        name: String,

        /// true or false
        value: String,
    },
}

fn default_filter(verbose: bool, streaming: bool) -> &'static str {
    // The watch command echoes status messages itself.
    match (verbose, streaming) {
        (true, _) => "slidebank=debug,info",
        (false, true) => "warn,slidebank_ingest::status=error",
        (false, false) => "slidebank=info,warn",
    }
}

fn init_logging(verbose: bool, streaming: bool) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_filter(verbose, streaming)));

    tracing_subscriber::registry()
        .with(filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_writer(std::io::stderr),
        )
        .init();
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose, matches!(cli.command, Commands::Watch));

    let result = match cli.command {
        Commands::Init => commands::init::run(),
        Commands::Config(cmd) => match cmd {
            ConfigCommands::Show => commands::config::show(),
            ConfigCommands::SetDir { area, dir } => commands::config::set_dir(&area, &dir),
        },
        Commands::Flag(cmd) => match cmd {
            FlagCommands::Show => commands::flag::show(),
            FlagCommands::Set { name, value } => commands::flag::set(&name, &value),
        },
        Commands::Watch => commands::watch::run(),
        Commands::Process { path, force } => commands::process::run(&path, force),
        Commands::ReprocessAll => commands::process::reprocess_all(),
        Commands::Status => commands::status::run(),
        Commands::Recent { limit } => commands::recent::run(limit),
        Commands::Show { id } => commands::show::run(&id),
        Commands::Extract { file, json } => commands::extract::run(&file, json),
        Commands::SetText {
            file,
            slide,
            shape,
            text,
        } => commands::extract::set_text(&file, slide, shape, &text),
        Commands::Thumbnails { file, out_dir } => commands::thumbnails::run(&file, &out_dir),
    };

    if let Err(e) = result {
        eprintln!("{} {:#}", "Error:".red().bold(), e);
        std::process::exit(1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tracing_subscriber::filter::LevelFilter;
    use tracing_subscriber::{Layer, Registry};

    fn max_level(directives: &str) -> Option<LevelFilter> {
        let filter = EnvFilter::try_new(directives).unwrap();
        Layer::<Registry>::max_level_hint(&filter)
    }

    #[test]
    fn test_watch_keeps_warnings() {
        assert_eq!(max_level(default_filter(false, true)), Some(LevelFilter::WARN));
        assert_eq!(max_level(default_filter(true, true)), Some(LevelFilter::DEBUG));
    }

    #[test]
    fn test_cli_parses_set_text() {
        let cli = Cli::try_parse_from([
            "slidebank", "set-text", "deck.pptx", "--slide", "2", "--shape", "1", "New title",
        ])
        .unwrap();
        match cli.command {
            Commands::SetText { slide, shape, text, .. } => {
                assert_eq!((slide, shape, text.as_str()), (2, 1, "New title"));
            }
            _ => panic!("expected set-text"),
        }
    }
}
