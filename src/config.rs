use anyhow::Result;
use serde::Deserialize;

use crate::query_schema::DEFAULT_TABLE_NAME;

#[derive(Debug, Deserialize, Clone)]
pub struct AppConfig {
    #[serde(default)]
    pub server:    ServerConfig,
    #[serde(default)]
    pub database:  DatabaseConfig,
    #[serde(default)]
    pub llm:       LlmConfig,
    #[serde(default)]
    pub export:    ExportConfig,
    #[serde(default = "default_locations")]
    pub locations: Vec<LocationEntry>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            server:    ServerConfig::default(),
            database:  DatabaseConfig::default(),
            llm:       LlmConfig::default(),
            export:    ExportConfig::default(),
            locations: default_locations(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct ServerConfig {
    pub bind: String,
}
impl Default for ServerConfig {
    fn default() -> Self { Self { bind: "127.0.0.1:5000".into() } }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct DatabaseConfig {
    /// SQLite file; bare names resolve under the local data dir
    pub path:  String,
    pub table: String,
}
impl Default for DatabaseConfig {
    fn default() -> Self {
        Self { path: "depot.db".into(), table: DEFAULT_TABLE_NAME.into() }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct LlmConfig {
    /// Prefer env OPENROUTER_API_KEY
    pub api_key:            Option<String>,
    /// Any OpenAI-compatible chat-completions endpoint
    pub base_url:           String,
    pub query_model:        String,
    pub summary_model:      String,
    pub max_tokens:         u32,
    pub temperature:        f32,
    /// Language the narrative must be written in
    pub narrative_language: String,
    pub timeout_secs:       u64,
}
impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            api_key:            None,
            base_url:           "https://openrouter.ai/api/v1".into(),
            query_model:        "meta-llama/llama-3.1-70b-instruct".into(),
            summary_model:      "meta-llama/llama-3.1-70b-instruct".into(),
            max_tokens:         800,
            temperature:        0.0,
            narrative_language: "Indonesian".into(),
            timeout_secs:       60,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct ExportConfig {
    /// Pivot tables kept for download; oldest session evicted first
    pub max_sessions: usize,
}
impl Default for ExportConfig {
    fn default() -> Self { Self { max_sessions: 64 } }
}

/// One canonical location and the spellings found in the LOKASI column.
#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct LocationEntry {
    pub key:     String,
    pub aliases: Vec<String>,
}

impl LocationEntry {
    pub fn new(key: &str, aliases: &[&str]) -> Self {
        Self { key: key.into(), aliases: aliases.iter().map(|a| a.to_string()).collect() }
    }
}

pub fn default_locations() -> Vec<LocationEntry> {
    vec![
        LocationEntry::new("JAKARTA", &["JAKARTA UTARA", "TANJUNG PRIOK"]),
        LocationEntry::new("SURABAYA", &["TANJUNG PERAK", "DEPO SURABAYA"]),
        LocationEntry::new("BAU", &["BAU-BAU", "MURHUM"]),
        LocationEntry::new("AMBON", &["AMBON", "YOS SUDARSO"]),
    ]
}

/// Load `depot-recap.toml` (or `path`) and `DEPOT_RECAP__*` env vars.
pub fn load_config(path: Option<&str>) -> Result<AppConfig> {
    let file = match path {
        Some(p) => config::File::with_name(p).required(true),
        None => config::File::with_name("depot-recap").required(false),
    };
    let cfg = config::Config::builder()
        .add_source(file)
        .add_source(config::Environment::with_prefix("DEPOT_RECAP").separator("__"))
        .build()?;
    let mut app: AppConfig = cfg.try_deserialize()?;

    // Convenience: the same variables the rest of our tooling reads
    if app.llm.api_key.is_none() {
        if let Ok(key) = std::env::var("OPENROUTER_API_KEY") {
            app.llm.api_key = Some(key);
        }
    }
    if let Ok(model) = std::env::var("LLM_MODEL") {
        if !model.is_empty() {
            app.llm.query_model = model.clone();
            app.llm.summary_model = model;
        }
    }

    Ok(app)
}
