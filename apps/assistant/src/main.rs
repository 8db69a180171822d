mod cli;
mod config;
mod server;

use std::sync::Arc;

use clap::Parser;
use config::{Args, AssistantConfig, Mode};
use tracing::info;
use umi_assist_core::context::{HistoryStore, InMemoryHistory, RocksDbHistory};
use umi_assist_core::{Catalog, ChatService, LlmClient};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();

    // Logging / tracing
    let filter = std::env::var("RUST_LOG")
        .unwrap_or_else(|_| "info,umi_assist_core=info,umi_assistant=info".to_string());
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .init();

    let args = Args::parse();
    // Defaults + env, then TOML overlay, then flags
    let cfg = AssistantConfig::load(&args);

    let catalog = Arc::new(Catalog::load(&cfg.storage.docs_path)?);
    let history: Arc<dyn HistoryStore> = match &cfg.storage.db_path {
        Some(path) => {
            if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
                std::fs::create_dir_all(parent)?;
            }
            RocksDbHistory::new(path)?
        }
        None => InMemoryHistory::new(),
    };
    let llm = Arc::new(LlmClient::new(cfg.llm.clone())?);
    info!(
        target = "umi_assistant",
        model = %cfg.llm.model,
        base_url = %cfg.llm.base_url,
        apis = catalog.len(),
        persistent = cfg.storage.db_path.is_some(),
        "UMI assistant starting"
    );

    let service = Arc::new(ChatService::new(llm, catalog, history, cfg.pipeline.clone()));

    match cfg.mode {
        Mode::Cli => cli::run(service, args.session, args.query).await,
        Mode::Server => server::serve(service, &cfg.server).await,
    }
}
