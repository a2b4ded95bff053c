//! FactLens - fact-check videos, posts, and articles from the terminal
//!
//! A CLI client for the FactLens analysis backend: submits a content
//! URL, follows the analysis with a step-by-step progress timeline
//! while polling the hosted record store, and renders the fact-check
//! report once it lands.
//!
//! Exit codes:
//!   0 - Report produced, or analysis still compiling (not an error)
//!   1 - Runtime error (connection, config, invalid arguments)
//!   2 - Backend reported the analysis failed

mod api;
mod cli;
mod config;
mod controller;
mod models;
mod report;

use anyhow::{Context, Result};
use api::{AnalysisBackend, HttpBackend, NoopBackend, SupabaseStore};
use cli::{Args, OutputFormat};
use config::Config;
use controller::{AnalysisController, AnalysisSession, ControllerConfig, SessionOutcome};
use indicatif::{ProgressBar, ProgressStyle};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tracing::{debug, error, info, warn};
use tracing_subscriber::FmtSubscriber;

#[tokio::main]
async fn main() -> Result<()> {
    // Pick up SUPABASE_URL / SUPABASE_ANON_KEY / FACTLENS_BACKEND_URL
    dotenvy::dotenv().ok();

    // Parse command-line arguments
    let args = Args::parse_args();

    // Validate arguments
    if let Err(e) = args.validate() {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }

    // Handle --init-config early (no logging needed)
    if args.init_config {
        return handle_init_config();
    }

    // Initialize logging
    init_logging(&args);

    info!("FactLens v{}", env!("CARGO_PKG_VERSION"));
    debug!("Arguments: {:?}", args);

    match run_analysis(args).await {
        Ok(exit_code) => {
            std::process::exit(exit_code);
        }
        Err(e) => {
            error!("Run failed: {}", e);
            eprintln!("\n❌ Error: {}", e);
            std::process::exit(1);
        }
    }
}

/// Handle --init-config: generate a default .factlens.toml.
fn handle_init_config() -> Result<()> {
    let path = std::path::Path::new(".factlens.toml");

    if path.exists() {
        eprintln!("⚠️  .factlens.toml already exists. Remove it first or edit it manually.");
        std::process::exit(1);
    }

    let content = Config::default_toml();
    std::fs::write(path, &content).context("Failed to write .factlens.toml")?;

    println!("✅ Created .factlens.toml with default settings.");
    println!("   Edit it to set your Supabase project URL and anon key.");
    Ok(())
}

/// Initialize logging based on verbosity settings.
fn init_logging(args: &Args) {
    let level = args.log_level();

    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .compact()
        .finish();

    tracing::subscriber::set_global_default(subscriber).expect("Failed to set tracing subscriber");
}

/// Run the complete fact-check workflow. Returns exit code (0 or 2).
async fn run_analysis(args: Args) -> Result<i32> {
    // Load configuration
    let mut config = load_config(&args)?;
    config.merge_with_args(&args);

    if config.store.supabase_url.is_empty() || config.store.supabase_key.is_empty() {
        anyhow::bail!(
            "Supabase credentials are not configured. Set SUPABASE_URL and \
             SUPABASE_ANON_KEY (or the [store] section of .factlens.toml)."
        );
    }

    let url = args.content_url().to_string();

    println!("🔍 Fact-checking: {}", url);
    if args.no_submit {
        println!("   Submission skipped (--no-submit), polling for existing results");
    } else {
        println!("   Backend: {}", config.backend.analyze_url);
    }
    println!("   Records: {} ({})", config.store.supabase_url, config.store.table);
    println!();

    // Wire up the backend and the record store
    let backend: Arc<dyn AnalysisBackend> = if args.no_submit {
        Arc::new(NoopBackend)
    } else {
        Arc::new(HttpBackend::new(
            config.backend.analyze_url.clone(),
            Duration::from_secs(config.backend.timeout_seconds),
        )?)
    };

    let store = Arc::new(SupabaseStore::new(
        config.store.supabase_url.clone(),
        config.store.supabase_key.clone(),
        config.store.table.clone(),
        Duration::from_secs(config.backend.timeout_seconds),
    )?);

    let controller_config = ControllerConfig {
        poll_interval: Duration::from_secs(config.poll.interval_secs),
        max_attempts: config.poll.max_attempts,
        ..ControllerConfig::default()
    };

    // Submit and follow the analysis
    let mut controller = AnalysisController::new(backend, store, controller_config);
    let running = controller.submit(&url).await?;

    let renderer = if args.quiet {
        None
    } else {
        Some(tokio::spawn(render_progress(running.session())))
    };

    let outcome = running.wait().await?;

    if let Some(renderer) = renderer {
        renderer.abort();
        let _ = renderer.await;
    }

    match outcome {
        SessionOutcome::Completed(report_data) => {
            report::render::print_summary(&report_data, &url);
            save_report(&args, &config, &report_data)?;
            Ok(0)
        }
        SessionOutcome::Failed(message) => {
            eprintln!("\n❌ Analysis failed: {}", message);
            eprintln!("   Submit the URL again to retry.");
            Ok(2)
        }
        SessionOutcome::StillProcessing => {
            println!("\n⏳ {}", report::render::still_processing_message());
            Ok(0)
        }
        SessionOutcome::Cancelled => {
            warn!("Session was cancelled before completion");
            Ok(1)
        }
    }
}

/// Mirror the session's step progress onto a terminal spinner until the
/// task is aborted.
async fn render_progress(session: Arc<Mutex<AnalysisSession>>) {
    let pb = ProgressBar::new_spinner();
    pb.set_style(
        ProgressStyle::default_spinner()
            .template("{spinner:.green} {msg}")
            .unwrap(),
    );
    pb.enable_steady_tick(Duration::from_millis(120));

    let mut printed_steps = 0usize;
    let mut printed_logs = 0usize;

    loop {
        {
            let session = session.lock().await;
            let total = session.steps.len();

            // Echo newly finished steps above the spinner.
            for step in session
                .steps
                .iter()
                .take(session.completed_count())
                .skip(printed_steps)
            {
                pb.println(format!("   ✅ {}", step.label));
            }
            printed_steps = session.completed_count();

            for entry in session.logs.iter().skip(printed_logs) {
                pb.println(format!(
                    "   💬 [{}] {}",
                    entry.at.format("%H:%M:%S"),
                    entry.message
                ));
            }
            printed_logs = session.logs.len();

            match session.active_step() {
                Some((index, step)) => {
                    let msg = match step.progress {
                        Some(pct) => {
                            format!("[{}/{}] {} ({}%)", index + 1, total, step.label, pct)
                        }
                        None => format!("[{}/{}] {}", index + 1, total, step.label),
                    };
                    pb.set_message(msg);
                }
                None if printed_steps == total => {
                    pb.set_message("Finalizing results...");
                }
                None => {}
            }
        }

        tokio::time::sleep(Duration::from_millis(250)).await;
    }
}

/// Write the report to the requested output file.
fn save_report(args: &Args, config: &Config, report_data: &models::ReportData) -> Result<()> {
    let path = args
        .output
        .clone()
        .unwrap_or_else(|| std::path::PathBuf::from(&config.output.path));

    let content = match args.format {
        OutputFormat::Json => report::render::generate_json_report(report_data)?,
        OutputFormat::Markdown => {
            report::render::generate_markdown_report(report_data, args.content_url())
        }
    };

    std::fs::write(&path, &content)
        .with_context(|| format!("Failed to write report to {}", path.display()))?;

    println!("\n💾 Report saved to: {}", path.display());
    Ok(())
}

/// Load configuration from file or use defaults.
fn load_config(args: &Args) -> Result<Config> {
    // Try explicit config path
    if let Some(ref config_path) = args.config {
        info!("Loading config from: {}", config_path.display());
        return Config::load(config_path);
    }

    // Try default location
    match Config::load_default() {
        Ok(Some(config)) => {
            info!("Loaded default config from .factlens.toml");
            Ok(config)
        }
        Ok(None) => {
            debug!("No config file found, using defaults");
            Ok(Config::default())
        }
        Err(e) => {
            warn!("Failed to load config: {}", e);
            Ok(Config::default())
        }
    }
}
