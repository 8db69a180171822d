use std::fs;
use std::path::{Path, PathBuf};

use clap::{Parser, ValueEnum};
use umi_assist_core::{LlmClientConfig, PipelineConfig};

/// How the assistant talks to its user
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    #[default]
    Cli,
    Server,
}

/// Command-line flags; anything given here wins over TOML and env
#[derive(Debug, Clone, Default, Parser)]
#[command(name = "umi-assistant", about = "Assistant for composing UMI API requests")]
pub struct Args {
    /// API catalog document (markdown or .json)
    #[arg(long)]
    pub docs: Option<PathBuf>,

    /// RocksDB directory for conversation history
    #[arg(long)]
    pub db: Option<PathBuf>,

    /// Keep history in memory only
    #[arg(long)]
    pub in_memory: bool,

    /// Session id to resume (CLI mode)
    #[arg(long)]
    pub session: Option<String>,

    #[arg(long, value_enum)]
    pub mode: Option<Mode>,

    /// Listen address (server mode)
    #[arg(long)]
    pub addr: Option<String>,

    /// Directory of static web assets served under `/` (server mode)
    #[arg(long)]
    pub static_dir: Option<PathBuf>,

    /// First message to send before entering the prompt (CLI mode)
    #[arg(short, long)]
    pub query: Option<String>,

    /// TOML config file (default: $UMI_ASSISTANT_CONFIG or ./umi_assistant.toml)
    #[arg(long)]
    pub config: Option<PathBuf>,
}

/// High-level configuration for the assistant binary
#[derive(Clone, Debug, Default)]
pub struct AssistantConfig {
    pub mode: Mode,
    pub llm: LlmClientConfig,
    pub pipeline: PipelineConfig,
    pub server: ServerConfig,
    pub storage: StorageConfig,
}

#[derive(Clone, Debug)]
pub struct ServerConfig {
    pub addr: String,
    pub static_dir: Option<PathBuf>,
}

#[derive(Clone, Debug)]
pub struct StorageConfig {
    pub docs_path: PathBuf,
    /// `None` keeps history in memory
    pub db_path: Option<PathBuf>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            addr: std::env::var("UMI_ASSISTANT_ADDR")
                .ok()
                .filter(|s| !s.is_empty())
                .unwrap_or_else(|| "0.0.0.0:8080".to_string()),
            static_dir: std::env::var("UMI_STATIC_DIR")
                .ok()
                .filter(|s| !s.is_empty())
                .map(PathBuf::from),
        }
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            docs_path: std::env::var("UMI_DOCS_PATH")
                .ok()
                .filter(|s| !s.is_empty())
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from("docs/apis.md")),
            db_path: Some(
                std::env::var("UMI_DB_PATH")
                    .ok()
                    .filter(|s| !s.is_empty())
                    .map(PathBuf::from)
                    .unwrap_or_else(|| PathBuf::from("data/history")),
            ),
        }
    }
}

impl AssistantConfig {
    /// Defaults and env, overlaid by the TOML file, overlaid by flags
    pub fn load(args: &Args) -> Self {
        let path = args
            .config
            .clone()
            .or_else(|| std::env::var("UMI_ASSISTANT_CONFIG").ok().map(PathBuf::from))
            .unwrap_or_else(|| PathBuf::from("umi_assistant.toml"));
        let mut cfg = Self::from_toml_file(&path);
        args.apply(&mut cfg);
        cfg
    }

    /// Defaults and env, overlaid by `path` when it exists and parses
    pub fn from_toml_file(path: &Path) -> Self {
        let default = Self::default();
        if !path.exists() {
            tracing::info!(target = "umi_assistant", path = %path.display(), "No TOML config found; using defaults/env");
            return default;
        }
        match fs::read_to_string(path) {
            Ok(s) => match toml::from_str::<AssistantToml>(&s) {
                Ok(t) => t.overlay(default),
                Err(e) => {
                    tracing::warn!(target = "umi_assistant", error = %e, "Failed to parse TOML; using defaults");
                    default
                }
            },
            Err(e) => {
                tracing::warn!(target = "umi_assistant", error = %e, "Failed to read TOML; using defaults");
                default
            }
        }
    }
}

impl Args {
    fn apply(&self, cfg: &mut AssistantConfig) {
        if let Some(m) = self.mode {
            cfg.mode = m;
        }
        if let Some(p) = &self.docs {
            cfg.storage.docs_path = p.clone();
        }
        if let Some(p) = &self.db {
            cfg.storage.db_path = Some(p.clone());
        }
        if self.in_memory {
            cfg.storage.db_path = None;
        }
        if let Some(a) = &self.addr {
            cfg.server.addr = a.clone();
        }
        if let Some(d) = &self.static_dir {
            cfg.server.static_dir = Some(d.clone());
        }
    }
}

// =========================
// TOML overlay definitions
// =========================

#[derive(Debug, Clone, Default, serde::Deserialize)]
struct AssistantToml {
    pub mode: Option<Mode>,
    pub llm: Option<LlmToml>,
    pub pipeline: Option<PipelineConfig>,
    pub server: Option<ServerToml>,
    pub storage: Option<StorageToml>,
}

impl AssistantToml {
    fn overlay(self, mut base: AssistantConfig) -> AssistantConfig {
        if let Some(m) = self.mode {
            base.mode = m;
        }
        if let Some(l) = self.llm {
            l.apply(&mut base.llm);
        }
        if let Some(p) = self.pipeline {
            base.pipeline = p;
        }
        if let Some(s) = self.server {
            s.apply(&mut base.server);
        }
        if let Some(s) = self.storage {
            s.apply(&mut base.storage);
        }
        base
    }
}

#[derive(Debug, Clone, Default, serde::Deserialize)]
struct LlmToml {
    pub base_url: Option<String>,
    pub model: Option<String>,
    pub api_key: Option<String>,
    pub request_timeout_ms: Option<u64>,
    pub temperature: Option<f32>,
}
impl LlmToml {
    fn apply(self, l: &mut LlmClientConfig) {
        if let Some(x) = self.base_url {
            l.base_url = x;
        }
        if let Some(x) = self.model {
            l.model = x;
        }
        if let Some(x) = self.api_key.filter(|k| !k.is_empty()) {
            l.api_key = Some(x);
        }
        if let Some(x) = self.request_timeout_ms {
            l.request_timeout_ms = x;
        }
        if let Some(x) = self.temperature {
            l.temperature = x.clamp(0.0, 2.0);
        }
    }
}

#[derive(Debug, Clone, Default, serde::Deserialize)]
struct ServerToml {
    pub addr: Option<String>,
    pub static_dir: Option<PathBuf>,
}
impl ServerToml {
    fn apply(self, s: &mut ServerConfig) {
        if let Some(x) = self.addr {
            s.addr = x;
        }
        if let Some(x) = self.static_dir {
            s.static_dir = Some(x);
        }
    }
}

#[derive(Debug, Clone, Default, serde::Deserialize)]
struct StorageToml {
    pub docs_path: Option<PathBuf>,
    pub db_path: Option<PathBuf>,
    pub in_memory: Option<bool>,
}
impl StorageToml {
    fn apply(self, s: &mut StorageConfig) {
        if let Some(x) = self.docs_path {
            s.docs_path = x;
        }
        if let Some(x) = self.db_path {
            s.db_path = Some(x);
        }
        if self.in_memory == Some(true) {
            s.db_path = None;
        }
    }
}
