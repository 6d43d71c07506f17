//! vro CLI
//!
//! Renders a Markdown content tree to a static site, or serves it live.
//!
//! This is the binary entry point. The library functionality is in `lib.rs`.

use std::path::PathBuf;

use clap::Parser;
use color_eyre::eyre::{Result, WrapErr};
use vro::Config;

/// Command-line interface for vro.
#[derive(Parser)]
#[command(
    name = "vro",
    version,
    about = "Render a Markdown content tree to HTML, in batch or on request"
)]
struct Cli {
    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

/// Available CLI commands.
#[derive(clap::Subcommand)]
enum Commands {
    /// Render every file once into the output directory
    Build {
        /// Output directory (defaults to VRO_OUT)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Serve pages, rendering each request on demand
    Serve {
        /// Port to listen on (defaults to VRO_PORT)
        #[arg(short, long)]
        port: Option<u16>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;

    let cli = Cli::parse();
    vro::init_tracing(cli.verbose);

    let config = Config::from_env().wrap_err("Failed to load configuration")?;

    match cli.command {
        Commands::Build { output } => {
            vro::cmd::build::run(&config, output.as_deref())?;
        }
        Commands::Serve { port } => {
            vro::cmd::serve::run(&config, port).await?;
        }
    }

    Ok(())
}
