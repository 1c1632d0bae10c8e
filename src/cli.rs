//! Command-line interface definitions.
//!
//! API keys can be passed as flags or through the environment.

use crate::api::ModelSelector;
use clap::Parser;
use std::path::PathBuf;

/// Rewrite news articles into neutral insights views and store them.
///
/// # Examples
///
/// ```sh
/// # Process candidates with OpenAI (key from OPENAI_API_KEY)
/// unbiased_updates -i candidates.json
///
/// # Use Gemini and keep the per-article results
/// unbiased_updates -i candidates.json --model gemini -r results.json
///
/// # Serve the last week of stored articles as JSON
/// unbiased_updates --recent-days 7
/// ```
#[derive(Parser, Debug)]
#[command(author, version, about)]
pub struct Cli {
    /// Optional path to a config.yaml file
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// JSON array of article candidates to process
    #[arg(short = 'i', long, required_unless_present = "recent_days")]
    pub candidates: Option<PathBuf>,

    /// Model family used to write the insights view
    #[arg(long, value_enum, default_value_t = ModelSelector::OpenAi)]
    pub model: ModelSelector,

    /// OpenAI API key
    #[arg(long, env = "OPENAI_API_KEY", hide_env_values = true)]
    pub openai_api_key: Option<String>,

    /// Google Gemini API key
    #[arg(long, env = "GOOGLE_API_KEY", hide_env_values = true)]
    pub google_api_key: Option<String>,

    /// Write every processing result to this JSON file
    #[arg(short, long)]
    pub results_json: Option<PathBuf>,

    /// Print stored articles published in the last N days instead of processing
    #[arg(
        long,
        conflicts_with = "candidates",
        value_parser = clap::value_parser!(i64).range(0..=36500)
    )]
    pub recent_days: Option<i64>,
}
