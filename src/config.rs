//! YAML configuration.
//!
//! Every field has a default, so an empty file (or no file) is a valid
//! configuration. API keys are not read from here; they come from the CLI
//! or the environment.
//!
//! ```yaml
//! store_path: ./news_articles.json
//! batch_size: 100
//! max_workers: 5
//! delay_between_batches_secs: 2.0
//! openai:
//!   model: gpt-4o
//! source_headers:
//!   AJ:
//!     Accept-Language: en-US,en;q=0.5
//! ```

use crate::models::Source;
use crate::scheduler::BatchOptions;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use serde::Deserialize;
use std::collections::{BTreeMap, HashMap};
use std::error::Error;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{info, instrument};

const BROWSER_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/91.0.4472.124 Safari/537.36";

/// Endpoint and model name for one backend.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct BackendConfig {
    pub api_base: String,
    pub model: String,
}

fn default_openai() -> BackendConfig {
    BackendConfig {
        api_base: "https://api.openai.com/v1".to_string(),
        model: "gpt-4o".to_string(),
    }
}

fn default_gemini() -> BackendConfig {
    BackendConfig {
        api_base: "https://generativelanguage.googleapis.com/v1beta".to_string(),
        model: "gemini-2.5-flash".to_string(),
    }
}

fn default_headers() -> BTreeMap<String, String> {
    BTreeMap::from([
        ("User-Agent".to_string(), BROWSER_USER_AGENT.to_string()),
        (
            "Accept".to_string(),
            "text/html,application/xhtml+xml,application/xml;q=0.9,image/webp,*/*;q=0.8"
                .to_string(),
        ),
    ])
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// JSON file backing the article store.
    pub store_path: PathBuf,
    pub batch_size: usize,
    pub max_workers: usize,
    pub delay_between_batches_secs: f64,
    /// Timeout for each article page request.
    pub request_timeout_secs: u64,
    #[serde(default = "default_openai")]
    pub openai: BackendConfig,
    #[serde(default = "default_gemini")]
    pub gemini: BackendConfig,
    /// Request headers sent with every article fetch.
    pub headers: BTreeMap<String, String>,
    /// Per-source additions and overrides on top of `headers`.
    pub source_headers: HashMap<Source, BTreeMap<String, String>>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            store_path: PathBuf::from("./news_articles.json"),
            batch_size: 100,
            max_workers: 5,
            delay_between_batches_secs: 2.0,
            request_timeout_secs: 10,
            openai: default_openai(),
            gemini: default_gemini(),
            headers: default_headers(),
            source_headers: HashMap::new(),
        }
    }
}

impl AppConfig {
    /// Load from `path`, or fall back to defaults when no path is given.
    #[instrument(level = "info")]
    pub async fn load(path: Option<&Path>) -> Result<Self, Box<dyn Error>> {
        let Some(path) = path else {
            info!("No config file given; using defaults");
            return Ok(Self::default());
        };
        let raw = tokio::fs::read_to_string(path).await?;
        let config = Self::from_yaml(&raw)?;
        info!(path = %path.display(), "Loaded configuration");
        Ok(config)
    }

    pub fn from_yaml(raw: &str) -> Result<Self, serde_yaml::Error> {
        if raw.trim().is_empty() {
            return Ok(Self::default());
        }
        serde_yaml::from_str(raw)
    }

    pub fn batch_options(&self) -> BatchOptions {
        BatchOptions {
            batch_size: self.batch_size,
            max_workers: self.max_workers,
            delay_between_batches: Duration::from_secs_f64(self.delay_between_batches_secs.max(0.0)),
        }
    }

    /// Default headers merged with the overrides for `source`.
    pub fn headers_for(&self, source: Source) -> Result<HeaderMap, Box<dyn Error>> {
        let mut merged = self.headers.clone();
        if let Some(overrides) = self.source_headers.get(&source) {
            merged.extend(overrides.iter().map(|(k, v)| (k.clone(), v.clone())));
        }

        let mut headers = HeaderMap::new();
        for (name, value) in merged {
            headers.insert(
                HeaderName::from_bytes(name.as_bytes())?,
                HeaderValue::from_str(&value)?,
            );
        }
        Ok(headers)
    }
}
