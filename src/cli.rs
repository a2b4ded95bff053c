//! Command-line interface argument parsing.
//!
//! This module handles all CLI argument parsing using clap,
//! including validation and default values.

use clap::Parser;
use std::path::PathBuf;

/// FactLens - fact-check videos, posts, and articles from the terminal
///
/// Submits a URL to the FactLens analysis backend, follows the analysis
/// progress, and renders the fact-check report once it lands.
///
/// Examples:
///   factlens https://www.youtube.com/watch?v=abc123
///   factlens https://www.instagram.com/reel/Cxyz/ --format json -o report.json
///   factlens https://example.com/article --no-submit
///   factlens --init-config
#[derive(Parser, Debug, Clone)]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Args {
    /// URL of the content to fact-check
    ///
    /// Supports short-form video (reels, shorts, TikTok), Instagram
    /// posts, YouTube videos, and any article/web page.
    /// Not required when using --init-config.
    #[arg(value_name = "URL", required_unless_present = "init_config")]
    pub url: Option<String>,

    /// Analysis backend endpoint
    ///
    /// Where the submission POST is sent. Defaults to the config file
    /// value or the built-in local endpoint.
    #[arg(long, value_name = "URL", env = "FACTLENS_BACKEND_URL")]
    pub backend_url: Option<String>,

    /// Supabase project URL holding the analysis records
    #[arg(long, value_name = "URL", env = "SUPABASE_URL")]
    pub supabase_url: Option<String>,

    /// Supabase anon key
    #[arg(long, value_name = "KEY", env = "SUPABASE_ANON_KEY", hide_env_values = true)]
    pub supabase_key: Option<String>,

    /// Analysis records table name
    #[arg(long, value_name = "TABLE")]
    pub table: Option<String>,

    /// Output file path for the report
    #[arg(short, long, value_name = "FILE")]
    pub output: Option<PathBuf>,

    /// Output format (markdown, json)
    #[arg(long, default_value = "markdown", value_name = "FORMAT")]
    pub format: OutputFormat,

    /// Seconds between record-store polls
    #[arg(long, value_name = "SECS")]
    pub poll_interval: Option<u64>,

    /// Maximum poll attempts before giving up quietly
    #[arg(long, value_name = "COUNT")]
    pub max_attempts: Option<u32>,

    /// Skip the submission POST and only poll for results
    ///
    /// Useful when the analysis was already triggered elsewhere, or to
    /// pick up a result after a previous run timed out.
    #[arg(long)]
    pub no_submit: bool,

    /// Path to configuration file
    ///
    /// If not specified, looks for .factlens.toml in the current directory
    #[arg(short, long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Enable verbose logging output
    #[arg(short, long)]
    pub verbose: bool,

    /// Run in quiet mode (minimal output)
    #[arg(short, long)]
    pub quiet: bool,

    /// Generate a default .factlens.toml configuration file
    #[arg(long)]
    pub init_config: bool,
}

/// Output format for the exported report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum OutputFormat {
    /// Markdown format (default)
    #[default]
    Markdown,
    /// JSON format
    Json,
}

impl Args {
    /// Parse command-line arguments.
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// Get the content URL, empty if not set (should be validated first).
    pub fn content_url(&self) -> &str {
        self.url.as_deref().unwrap_or("")
    }

    /// Validate the parsed arguments.
    pub fn validate(&self) -> Result<(), String> {
        // Skip validation for --init-config
        if self.init_config {
            return Ok(());
        }

        let url = self.url.as_deref().unwrap_or("").trim();
        if url.is_empty() {
            return Err("A content URL is required".to_string());
        }
        if !url.starts_with("http://") && !url.starts_with("https://") {
            return Err("Content URL must start with 'http://' or 'https://'".to_string());
        }

        if let Some(ref backend_url) = self.backend_url {
            if !backend_url.starts_with("http://") && !backend_url.starts_with("https://") {
                return Err("Backend URL must start with 'http://' or 'https://'".to_string());
            }
        }

        if let Some(ref supabase_url) = self.supabase_url {
            if !supabase_url.starts_with("http://") && !supabase_url.starts_with("https://") {
                return Err("Supabase URL must start with 'http://' or 'https://'".to_string());
            }
        }

        if let Some(interval) = self.poll_interval {
            if interval == 0 {
                return Err("Poll interval must be at least 1 second".to_string());
            }
        }

        if let Some(attempts) = self.max_attempts {
            if attempts == 0 {
                return Err("Max attempts must be at least 1".to_string());
            }
        }

        // Check for conflicting options
        if self.verbose && self.quiet {
            return Err("Cannot use both --verbose and --quiet".to_string());
        }

        Ok(())
    }

    /// Returns the log level based on verbosity settings.
    pub fn log_level(&self) -> tracing::Level {
        if self.quiet {
            tracing::Level::ERROR
        } else if self.verbose {
            tracing::Level::DEBUG
        } else {
            tracing::Level::INFO
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_args() -> Args {
        Args {
            url: Some("https://example.com/article".to_string()),
            backend_url: None,
            supabase_url: None,
            supabase_key: None,
            table: None,
            output: None,
            format: OutputFormat::Markdown,
            poll_interval: None,
            max_attempts: None,
            no_submit: false,
            config: None,
            verbose: false,
            quiet: false,
            init_config: false,
        }
    }

    #[test]
    fn test_validation_accepts_plain_https_url() {
        assert!(make_args().validate().is_ok());
    }

    #[test]
    fn test_validation_rejects_missing_scheme() {
        let mut args = make_args();
        args.url = Some("example.com/article".to_string());
        assert!(args.validate().is_err());
    }

    #[test]
    fn test_validation_rejects_zero_interval() {
        let mut args = make_args();
        args.poll_interval = Some(0);
        assert!(args.validate().is_err());
    }

    #[test]
    fn test_validation_conflicting_options() {
        let mut args = make_args();
        args.verbose = true;
        args.quiet = true;
        assert!(args.validate().is_err());
    }

    #[test]
    fn test_init_config_skips_validation() {
        let mut args = make_args();
        args.url = None;
        args.init_config = true;
        assert!(args.validate().is_ok());
    }

    #[test]
    fn test_log_level() {
        let mut args = make_args();
        assert_eq!(args.log_level(), tracing::Level::INFO);

        args.verbose = true;
        assert_eq!(args.log_level(), tracing::Level::DEBUG);

        args.verbose = false;
        args.quiet = true;
        assert_eq!(args.log_level(), tracing::Level::ERROR);
    }
}
