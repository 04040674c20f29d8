use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use colored::Colorize;
use indicatif::{ProgressBar, ProgressStyle};
use tracing::info;

use scanlens::config::Config;
use scanlens::output::terminal;
use scanlens::{Credentials, Scanner};

/// scanlens: identify objects in a photo via reverse image search.
///
/// Sends the image to Google Cloud Vision, SerpApi (Google Lens) or a
/// browser-scraped Google Lens page and prints a normalized result.
#[derive(Parser)]
#[command(name = "scanlens", version, about)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Identify an image
    Scan {
        /// Path to a JPEG or PNG image
        image: PathBuf,

        /// Backend: cloud_vision (default), serpapi or selenium
        #[arg(long)]
        method: Option<String>,

        /// Cloud Vision only, in the legacy tags/matching-pages shape
        #[arg(long, conflicts_with = "method")]
        legacy: bool,

        /// Print raw JSON instead of formatted output
        #[arg(long)]
        json: bool,
    },

    /// Recalibrate the scraped Lens title selector against a known image
    Calibrate {
        /// Image whose Lens results are known to contain the probe text
        image: PathBuf,

        /// Text expected in the result titles (e.g. "Charmander")
        #[arg(long)]
        probe: String,

        /// Show the browser window instead of running headless
        #[arg(long)]
        visible: bool,
    },

    /// Run the HTTP API server
    #[cfg(feature = "web")]
    Serve {
        /// Port to listen on
        #[arg(long, default_value = "5000")]
        port: u16,

        /// Address to bind
        #[arg(long, default_value = "0.0.0.0")]
        bind: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present (silently ignore if missing)
    let _ = dotenvy::dotenv();

    // Set up structured logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("scanlens=info")),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Scan {
            image,
            method,
            legacy,
            json,
        } => {
            let config = Config::load()?;
            if legacy {
                config.require_google()?;
            }
            let bytes = read_image(&image)?;
            let scanner = Scanner::from_config(&config)?;
            let credentials = Credentials::from_config(&config);

            let spinner = spinner("Analyzing image...");
            if legacy {
                let result = scanner.dispatch_legacy(&bytes, &credentials).await;
                spinner.finish_and_clear();
                let result = result?;
                if json {
                    println!("{}", serde_json::to_string_pretty(&result)?);
                } else {
                    terminal::display_legacy(&result);
                }
            } else {
                let result = scanner
                    .dispatch(&bytes, method.as_deref(), &credentials)
                    .await;
                spinner.finish_and_clear();
                let result = result?;
                if json {
                    println!("{}", serde_json::to_string_pretty(&result)?);
                } else {
                    terminal::display_result(&result);
                }
            }
        }

        Commands::Calibrate {
            image,
            probe,
            visible,
        } => {
            let mut config = Config::load()?;
            config.require_imgbb()?;
            config.calibration_probe = Some(probe.clone());
            config.headless = !visible;

            let bytes = read_image(&image)?;
            let scanner = Scanner::from_config(&config)?;
            let credentials = Credentials::from_config(&config);
            let before = scanner.selectors().current();

            info!(probe = %probe, selector = %before, "Calibrating Lens title selector");
            let spinner = spinner("Scraping Lens...");
            let result = scanner
                .dispatch(&bytes, Some("selenium"), &credentials)
                .await;
            spinner.finish_and_clear();
            let result = result?;

            let after = scanner.selectors().current();
            println!("\n{}", "=== Calibration ===".bold());
            if after == before {
                println!("  Selector: {} (unchanged)", after);
            } else {
                println!("  Selector: {} -> {}", before.dimmed(), after.green().bold());
            }
            println!("  Matches found: {}", result.visual_matches.len());
            if result.visual_matches.is_empty() {
                println!(
                    "  {}",
                    "No matches found. Set SCANLENS_DEBUG_DIR to save the page for inspection."
                        .yellow()
                );
            } else {
                println!("  Top matches:");
                for m in result.visual_matches.iter().take(3) {
                    println!("    - {}", m.title);
                }
                println!(
                    "\n{}",
                    format!("To keep this selector, set SCANLENS_TITLE_SELECTOR={after}").dimmed()
                );
            }
        }

        #[cfg(feature = "web")]
        Commands::Serve { port, bind } => {
            let config = Config::load()?;
            scanlens::web::run_server(config, port, &bind).await?;
        }
    }

    Ok(())
}

fn read_image(path: &Path) -> Result<Vec<u8>> {
    std::fs::read(path).with_context(|| format!("Failed to read image {}", path.display()))
}

fn spinner(message: &str) -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    pb.set_style(
        ProgressStyle::default_spinner()
            .template("  {spinner} {msg}")
            .expect("valid template"),
    );
    pb.set_message(message.to_string());
    pb.enable_steady_tick(Duration::from_millis(100));
    pb
}
