use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "featuremap")]
#[command(
    version,
    about = "AI-driven feature map generator for codebases"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    #[arg(long, global = true)]
    verbose: bool,

    #[arg(long, short, global = true)]
    quiet: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Analyze a directory and write its feature map
    Map {
        #[arg(help = "Directory to analyze (default: current directory)")]
        path: Option<PathBuf>,
        #[arg(
            long = "exts",
            value_delimiter = ',',
            help = "Comma-separated extensions to include, e.g. .go,.ts"
        )]
        extensions: Vec<String>,
        #[arg(long, help = "Ignore the existing cache and start over")]
        clear_cache: bool,
        #[arg(long, conflicts_with = "no_prefilter", help = "Run AI pre-filtering (Stage 0)")]
        prefilter: bool,
        #[arg(long, help = "Skip AI pre-filtering without asking")]
        no_prefilter: bool,
        #[arg(long, short, help = "Output file (default: <folder>-features.md)")]
        output: Option<PathBuf>,
        #[arg(long, help = "Cache file (default: .extract-cache-<folder>.json)")]
        cache: Option<PathBuf>,
        #[arg(long, short = 'j', help = "Maximum concurrent service calls")]
        concurrency: Option<usize>,
        #[arg(long, help = "Model to use")]
        model: Option<String>,
    },

    /// Inspect or delete the resumable cache
    Cache {
        #[command(subcommand)]
        action: CacheAction,
    },

    /// Manage configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand)]
enum CacheAction {
    /// Summarize the cache for a directory
    Show {
        path: Option<PathBuf>,
        #[arg(long, help = "Cache file to read")]
        cache: Option<PathBuf>,
        #[arg(long, help = "Print as JSON")]
        json: bool,
    },
    /// Delete the cache for a directory
    Clear {
        path: Option<PathBuf>,
        #[arg(long, help = "Cache file to delete")]
        cache: Option<PathBuf>,
    },
}

#[derive(Subcommand)]
enum ConfigAction {
    /// Show current configuration (merged from all sources)
    Show {
        #[arg(long, help = "Print as JSON")]
        json: bool,
    },
    /// Show configuration file paths
    Path,
    /// Initialize configuration
    Init {
        #[arg(long, short, help = "Initialize global config")]
        global: bool,
        #[arg(long, help = "Overwrite existing config")]
        force: bool,
    },
}

/// Set up panic handler for graceful error reporting
fn setup_panic_handler() {
    let default_hook = std::panic::take_hook();

    std::panic::set_hook(Box::new(move |panic_info| {
        let message = if let Some(s) = panic_info.payload().downcast_ref::<&str>() {
            s.to_string()
        } else if let Some(s) = panic_info.payload().downcast_ref::<String>() {
            s.clone()
        } else {
            "Unknown panic".to_string()
        };

        eprintln!("\n\x1b[1;31m━━━ PANIC ━━━\x1b[0m");
        eprintln!("\x1b[31mfeaturemap encountered an unexpected error:\x1b[0m");
        eprintln!("  {}", message);

        if let Some(location) = panic_info.location() {
            eprintln!(
                "\x1b[90mLocation: {}:{}:{}\x1b[0m",
                location.file(),
                location.line(),
                location.column()
            );
        }
        eprintln!("\x1b[33mThe cache keeps every finished unit; rerun to resume.\x1b[0m");
        eprintln!();

        // Backtrace when RUST_BACKTRACE=1
        default_hook(panic_info);
    }));
}

fn main() -> ExitCode {
    setup_panic_handler();

    match run_cli() {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("\x1b[31mError:\x1b[0m {}", e);
            ExitCode::FAILURE
        }
    }
}

fn run_cli() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose {
        "debug"
    } else if cli.quiet {
        "error"
    } else {
        "info"
    };

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| filter.into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    match cli.command {
        Commands::Map {
            path,
            extensions,
            clear_cache,
            prefilter,
            no_prefilter,
            output,
            cache,
            concurrency,
            model,
        } => {
            use featuremap::cli::commands::map::{self, MapOptions};

            let prefilter = match (prefilter, no_prefilter) {
                (true, _) => Some(true),
                (_, true) => Some(false),
                _ => None,
            };

            map::run(MapOptions {
                path,
                extensions,
                clear_cache,
                prefilter,
                output,
                cache,
                concurrency,
                model,
            })?;
        }
        Commands::Cache { action } => match action {
            CacheAction::Show { path, cache, json } => {
                featuremap::cli::commands::cache::show(path, cache, json)?;
            }
            CacheAction::Clear { path, cache } => {
                featuremap::cli::commands::cache::clear(path, cache)?;
            }
        },
        Commands::Config { action } => match action {
            ConfigAction::Show { json } => {
                featuremap::cli::commands::config::show(json)?;
            }
            ConfigAction::Path => {
                featuremap::cli::commands::config::path()?;
            }
            ConfigAction::Init { global, force } => {
                featuremap::cli::commands::config::init(global, force)?;
            }
        },
    }

    Ok(())
}
