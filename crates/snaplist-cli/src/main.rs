#![forbid(unsafe_code)]

mod cmd;
mod output;

use clap::{Parser, Subcommand};
use output::OutputMode;
use snaplist_core::config::resolve_config;
use std::env;
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

#[derive(Parser, Debug)]
#[command(
    author,
    version,
    about = "snapls: page through snapshot repositories",
    long_about = None
)]
struct Cli {
    /// Enable verbose logging.
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Output format: pretty, text, or json.
    #[arg(long, global = true, value_enum)]
    format: Option<OutputMode>,

    /// Shorthand for `--format json`.
    #[arg(long, global = true, hide = true)]
    json: bool,

    /// Config file (default: <config_dir>/snaplist/config.toml).
    #[arg(long, global = true, value_name = "FILE")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

impl Cli {
    fn output_mode(&self) -> OutputMode {
        output::resolve_output_mode(self.format, self.json)
    }
}

#[derive(Subcommand, Debug)]
enum Commands {
    #[command(
        about = "List one page of snapshots",
        after_help = "EXAMPLES:\n    # Newest ten snapshots across all repositories\n    snapls list --fixture repos.json --order desc -n 10\n\n    # Continue from a previous page\n    snapls list --fixture repos.json --order desc -n 10 --after <TOKEN>"
    )]
    List(cmd::list::ListArgs),

    #[command(about = "Inspect pagination cursors")]
    Cursor(cmd::cursor::CursorArgs),
}

fn init_tracing(verbose: bool) {
    let filter = EnvFilter::try_from_env("SNAPLS_LOG").unwrap_or_else(|_| {
        EnvFilter::new(if verbose || env::var("DEBUG").is_ok() {
            "snaplist=debug,info"
        } else {
            "snaplist=info,warn"
        })
    });

    let format = env::var("SNAPLS_LOG_FORMAT").unwrap_or_else(|_| "compact".to_string());

    let registry = tracing_subscriber::registry().with(filter);

    match format.as_str() {
        "json" => {
            registry
                .with(fmt::layer().json().with_ansi(false).with_writer(std::io::stderr))
                .init();
        }
        _ => {
            registry
                .with(fmt::layer().compact().with_writer(std::io::stderr))
                .init();
        }
    }
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    if cli.verbose {
        info!("Verbose mode enabled");
    }

    let output = cli.output_mode();
    let config = resolve_config(cli.config.as_deref())
        .map_err(|err| output::config_failure(output, err))?;

    match cli.command {
        Commands::List(ref args) => cmd::list::run_list(args, &config.listing, output),
        Commands::Cursor(ref args) => cmd::cursor::run_cursor(args, output),
    }
}
