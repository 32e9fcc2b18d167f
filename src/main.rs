//! WEALTHDESK: portfolio analytics, goal planning and advisor copilot
//!
//! Binary entry point: reads config, sets up tracing, opens the store
//! (seeding demo clients on first run), logs the top book alerts and
//! serves the dashboard until Ctrl+C.

use anyhow::Result;
use chrono::Utc;
use std::sync::Arc;
use tracing::{info, warn};

use wealthdesk::config;
use wealthdesk::copilot::anthropic::AnthropicHost;
use wealthdesk::copilot::{Copilot, LlmHost};
use wealthdesk::dashboard::{self, DashboardState};
use wealthdesk::data::seed::demo_clients;
use wealthdesk::recommend::RecommendationEngine;
use wealthdesk::storage::{JsonFileStore, WealthStore};
use wealthdesk::types::NextBestAction;

const BANNER: &str = r#"
__        _______    _    _   _____ _   _ ____  _____ ____  _  __
\ \      / / ____|  / \  | | |_   _| | | |  _ \| ____/ ___|| |/ /
 \ \ /\ / /|  _|   / _ \ | |   | | | |_| | | | |  _| \___ \| ' /
  \ V  V / | |___ / ___ \| |___| | |  _  | |_| | |___ ___) | . \
   \_/\_/  |_____/_/   \_\_____|_| |_| |_|____/|_____|____/|_|\_\

  Portfolio analytics, goal planning and advisor copilot
  v0.1.0
"#;

/// Alerts written to the log at startup.
const STARTUP_ALERTS: usize = 5;

#[tokio::main]
async fn main() -> Result<()> {
    // A missing .env is fine
    let _ = dotenv::dotenv();

    let cfg = config::AppConfig::load("config.toml")?;

    init_logging();

    println!("{BANNER}");
    info!(
        app_name = %cfg.app.name,
        data_file = %cfg.app.data_file,
        dashboard = cfg.dashboard.enabled,
        "WEALTHDESK starting up"
    );

    // -- Open or seed the store ------------------------------------------

    let store = WealthStore::new(Box::new(JsonFileStore::open(&cfg.app.data_file)?));
    if cfg.app.seed_demo_data {
        store.seed_if_empty(&demo_clients())?;
    }

    // -- Engine and copilot ----------------------------------------------

    let engine = RecommendationEngine::new(cfg.analytics.clone());
    let copilot = Copilot::new(build_host(&cfg.llm)?, cfg.analytics.clone());

    let clients = store.list_clients()?;
    let alerts = engine.book_alerts(&clients, Utc::now().date_naive());
    info!(clients = clients.len(), alerts = alerts.len(), "Book loaded");
    for alert in alerts.iter().take(STARTUP_ALERTS) {
        log_alert(alert);
    }

    if !cfg.dashboard.enabled {
        info!("Dashboard disabled. Nothing left to do.");
        return Ok(());
    }

    // -- Serve -----------------------------------------------------------

    let state = Arc::new(DashboardState::new(store, copilot, engine));
    let server = dashboard::spawn_dashboard(state.clone(), cfg.dashboard.port).await?;

    info!("Serving. Press Ctrl+C to stop.");
    tokio::signal::ctrl_c().await?;
    info!("Shutdown signal received.");
    server.abort();

    let usage = state.copilot.host_usage().unwrap_or_default();
    info!(
        copilot_online = state.copilot.is_online(),
        host_calls = usage.calls,
        host_tokens = usage.tokens,
        "WEALTHDESK shut down cleanly."
    );
    Ok(())
}

/// Pick the copilot host from config. No key means offline answers only.
fn build_host(llm: &config::LlmConfig) -> Result<Option<Box<dyn LlmHost>>> {
    if llm.provider == "offline" {
        info!("Copilot running offline");
        return Ok(None);
    }

    let api_key = match config::AppConfig::resolve_env(&llm.api_key_env) {
        Ok(key) if !key.trim().is_empty() => key,
        Ok(_) => {
            warn!(env = %llm.api_key_env, "LLM API key is empty, copilot will use offline answers");
            return Ok(None);
        }
        Err(e) => {
            warn!(error = %e, "No LLM API key configured, copilot will use offline answers");
            return Ok(None);
        }
    };

    match llm.provider.as_str() {
        "anthropic" => {
            let host = AnthropicHost::new(api_key, Some(llm.model.clone()), Some(llm.max_tokens))?;
            info!(model = %host.model_name(), "Using Anthropic copilot host");
            Ok(Some(Box::new(host)))
        }
        other => {
            warn!(provider = other, "Unknown LLM provider, copilot will use offline answers");
            Ok(None)
        }
    }
}

/// Log one book alert.
fn log_alert(alert: &NextBestAction) {
    info!(
        client_id = %alert.client_id,
        priority = %alert.priority,
        kind = %alert.kind,
        impact = format!("${:.2}", alert.impact),
        "{}",
        alert.title
    );
}

/// `RUST_LOG` overrides the default filter; `WEALTHDESK_LOG_JSON` switches to JSON lines.
fn init_logging() {
    use tracing_subscriber::{fmt, EnvFilter};

    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("wealthdesk=info"));

    let json_logging = std::env::var("WEALTHDESK_LOG_JSON").is_ok();

    if json_logging {
        fmt()
            .json()
            .with_env_filter(env_filter)
            .with_target(true)
            .with_thread_ids(true)
            .init();
    } else {
        fmt()
            .with_env_filter(env_filter)
            .with_target(true)
            .init();
    }
}
