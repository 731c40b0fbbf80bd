//! Loader configuration.
//!
//! Settings come from an optional TOML file (`--config`, default
//! `./config/moviate.toml`) and are then overridden by the environment:
//!
//! | Variable | Field |
//! |----------|-------|
//! | `OPENAI_API_KEY` | `weaviate.openai_api_key` |
//! | `WEAVIATE_URL` | `weaviate.url` |
//! | `WEAVIATE_API_KEY` | `weaviate.api_key` |
//!
//! A missing config file is not an error; every section has defaults that
//! reproduce the stock import of `./data/movie_data.csv` and
//! `./data/wiki_movie_plots_deduped.csv`.

use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

#[derive(Debug, Deserialize, Clone, Default)]
pub struct Config {
    #[serde(default)]
    pub data: DataConfig,
    #[serde(default)]
    pub collection: CollectionConfig,
    #[serde(default)]
    pub batch: BatchConfig,
    #[serde(default)]
    pub weaviate: WeaviateConfig,
}

/// Input datasets and the release-year cut-off.
#[derive(Debug, Deserialize, Clone)]
pub struct DataConfig {
    #[serde(default = "default_movies_csv")]
    pub movies_csv: PathBuf,
    #[serde(default = "default_plots_csv")]
    pub plots_csv: PathBuf,
    /// Rows are kept only when their year is strictly greater than this.
    #[serde(default = "default_min_year")]
    pub min_year: i32,
}

impl Default for DataConfig {
    fn default() -> Self {
        Self {
            movies_csv: default_movies_csv(),
            plots_csv: default_plots_csv(),
            min_year: default_min_year(),
        }
    }
}

fn default_movies_csv() -> PathBuf {
    PathBuf::from("./data/movie_data.csv")
}
fn default_plots_csv() -> PathBuf {
    PathBuf::from("./data/wiki_movie_plots_deduped.csv")
}
fn default_min_year() -> i32 {
    1970
}

/// Remote class definition and vectorizer settings.
#[derive(Debug, Deserialize, Clone)]
pub struct CollectionConfig {
    #[serde(default = "default_collection_name")]
    pub name: String,
    #[serde(default = "default_description")]
    pub description: String,
    #[serde(default = "default_vectorizer")]
    pub vectorizer: String,
    #[serde(default = "default_distance")]
    pub distance: String,
    #[serde(default = "default_model")]
    pub model: String,
    #[serde(default = "default_model_version")]
    pub model_version: String,
    #[serde(default = "default_model_type")]
    pub model_type: String,
}

impl Default for CollectionConfig {
    fn default() -> Self {
        Self {
            name: default_collection_name(),
            description: default_description(),
            vectorizer: default_vectorizer(),
            distance: default_distance(),
            model: default_model(),
            model_version: default_model_version(),
            model_type: default_model_type(),
        }
    }
}

fn default_collection_name() -> String {
    "Awesome_moviate_movies".to_string()
}
fn default_description() -> String {
    "A collection of movies since 1970.".to_string()
}
fn default_vectorizer() -> String {
    "text2vec-openai".to_string()
}
fn default_distance() -> String {
    "cosine".to_string()
}
fn default_model() -> String {
    "ada".to_string()
}
fn default_model_version() -> String {
    "002".to_string()
}
fn default_model_type() -> String {
    "text".to_string()
}

/// Batched-write client settings.
#[derive(Debug, Deserialize, Clone)]
pub struct BatchConfig {
    /// Initial number of objects per batch request.
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,
    /// Adapt the batch size to observed throughput after each flush.
    #[serde(default = "default_dynamic")]
    pub dynamic: bool,
    /// Target wall time of one batch request when `dynamic` is on.
    #[serde(default = "default_creation_time_secs")]
    pub creation_time_secs: f64,
    /// Upper bound for the dynamically recommended batch size.
    #[serde(default = "default_max_batch_size")]
    pub max_batch_size: usize,
    /// Retries for requests that time out or fail to connect.
    #[serde(default = "default_timeout_retries")]
    pub timeout_retries: u32,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            batch_size: default_batch_size(),
            dynamic: default_dynamic(),
            creation_time_secs: default_creation_time_secs(),
            max_batch_size: default_max_batch_size(),
            timeout_retries: default_timeout_retries(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

fn default_batch_size() -> usize {
    10
}
fn default_dynamic() -> bool {
    true
}
fn default_creation_time_secs() -> f64 {
    10.0
}
fn default_max_batch_size() -> usize {
    100
}
fn default_timeout_retries() -> u32 {
    3
}
fn default_timeout_secs() -> u64 {
    60
}

/// Endpoint and credentials. Normally supplied through the environment.
#[derive(Debug, Deserialize, Clone, Default)]
pub struct WeaviateConfig {
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub api_key: String,
    #[serde(default)]
    pub openai_api_key: String,
}

impl WeaviateConfig {
    /// Overlay credentials from environment lookups. Unset variables keep
    /// the file value.
    pub fn apply_env<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(v) = lookup("WEAVIATE_URL") {
            self.url = v;
        }
        if let Some(v) = lookup("WEAVIATE_API_KEY") {
            self.api_key = v;
        }
        if let Some(v) = lookup("OPENAI_API_KEY") {
            self.openai_api_key = v;
        }
    }
}

/// Load the config file (if present), apply environment overrides and
/// validate the result.
pub fn load_config(path: &Path) -> Result<Config> {
    let mut config = if path.exists() {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        toml::from_str::<Config>(&content).with_context(|| "Failed to parse config file")?
    } else {
        tracing::debug!(path = %path.display(), "config file not found, using defaults");
        Config::default()
    };

    config
        .weaviate
        .apply_env(|key| std::env::var(key).ok().filter(|v| !v.is_empty()));

    validate(&config)?;
    Ok(config)
}

pub fn validate(config: &Config) -> Result<()> {
    if config.batch.batch_size == 0 {
        anyhow::bail!("batch.batch_size must be > 0");
    }
    if config.batch.max_batch_size < config.batch.batch_size {
        anyhow::bail!("batch.max_batch_size must be >= batch.batch_size");
    }
    if config.batch.dynamic && config.batch.creation_time_secs <= 0.0 {
        anyhow::bail!("batch.creation_time_secs must be > 0 when batch.dynamic is on");
    }
    if config.batch.timeout_secs == 0 {
        anyhow::bail!("batch.timeout_secs must be > 0");
    }

    let name = &config.collection.name;
    match name.chars().next() {
        Some(c) if c.is_ascii_uppercase() => {}
        _ => anyhow::bail!(
            "collection.name must start with an uppercase letter, got '{}'",
            name
        ),
    }
    if !name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
        anyhow::bail!(
            "collection.name may only contain letters, digits and '_', got '{}'",
            name
        );
    }

    match config.collection.distance.as_str() {
        "cosine" | "dot" | "l2-squared" | "hamming" | "manhattan" => {}
        other => anyhow::bail!(
            "Unknown vector distance: '{}'. Must be cosine, dot, l2-squared, hamming, or manhattan.",
            other
        ),
    }

    Ok(())
}
