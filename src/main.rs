//! Wiring & DI. Entry point: bootstrap adapters, inject into use cases, probe one URL.
//! No business logic here.
//!
//! Usage: `realty-probe <url> [cache-key] [--offline]`

use dotenv::dotenv;
use realty_resilience::adapters::http::ReqwestTransport;
use realty_resilience::adapters::platform::ManualReachability;
use realty_resilience::adapters::storage::{JsonFileStore, MemoryStore};
use realty_resilience::adapters::telemetry::HttpTelemetry;
use realty_resilience::adapters::ui::TracingToast;
use realty_resilience::domain::HttpRequest;
use realty_resilience::ports::{KeyValueStore, NotifierPort, TelemetryPort};
use realty_resilience::shared::AppConfig;
use realty_resilience::usecases::{
    ConnectivityCallbacks, ConnectivityMonitor, ErrorReporter, FallbackRenderer, OfflineReader,
    PersistentCache, QueryExecutor, QueryPolicy, RecoveryBoundary, Rendered, RequestConfig,
    ResilientExecutor,
};
use serde_json::Value;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, warn};
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cwd = std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."));
    let env_loaded = dotenv();
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .with(tracing_subscriber::fmt::layer())
        .init();

    match &env_loaded {
        Ok(path) => info!(path = %path.display(), "loaded .env"),
        Err(_) => info!(cwd = %cwd.display(), "no .env found (check CWD)"),
    }

    let mut positional = Vec::new();
    let mut start_offline = false;
    for arg in std::env::args().skip(1) {
        if arg == "--offline" {
            start_offline = true;
        } else {
            positional.push(arg);
        }
    }
    let Some(url) = positional.first().cloned() else {
        anyhow::bail!("usage: realty-probe <url> [cache-key] [--offline]");
    };
    let cache_key = positional.get(1).cloned().unwrap_or_else(|| url.clone());

    let cfg = AppConfig::load().unwrap_or_else(|e| {
        warn!(error = %e, "config load failed; using defaults");
        AppConfig::default()
    });
    let environment = cfg.environment_or_default();
    info!(?environment, "environment");

    // --- Error reporting sink (one per process) ---
    let telemetry: Option<Arc<dyn TelemetryPort>> = match &cfg.telemetry_url {
        Some(endpoint) if environment.is_production() && cfg.is_telemetry_configured() => {
            info!(endpoint = %endpoint, "telemetry destination configured");
            let mut destination = HttpTelemetry::new(endpoint.clone());
            if let Ok(key) = std::env::var("REALTY_TELEMETRY_API_KEY") {
                destination = destination.with_api_key(key);
            }
            Some(Arc::new(destination))
        }
        _ => None,
    };
    let reporter = Arc::new(ErrorReporter::new(environment, telemetry));

    // --- Connectivity ---
    let platform = Arc::new(ManualReachability::new(!start_offline));
    let notifier: Option<Arc<dyn NotifierPort>> = Some(Arc::new(TracingToast));
    let monitor = ConnectivityMonitor::new(platform, notifier);
    let _toasts = monitor.subscribe(
        ConnectivityCallbacks::new().notifications(cfg.offline_notifications_or_default()),
    );

    // --- Cache ---
    let store: Arc<dyn KeyValueStore> = match &cfg.cache_path {
        Some(path) => {
            let store = JsonFileStore::open(path)
                .await
                .map_err(|e| anyhow::anyhow!("cache store: {}", e))?;
            info!(path = %path, "cache backed by JSON file");
            Arc::new(store)
        }
        None => Arc::new(MemoryStore::new()),
    };
    let cache = Arc::new(PersistentCache::new(store, cfg.cache_prefix_or_default()));
    let swept = cache.cleanup_expired().await;
    if swept > 0 {
        info!(swept, "expired cache entries removed");
    }

    // --- Executors ---
    let executor = Arc::new(
        ResilientExecutor::new(Arc::new(ReqwestTransport::new()))
            .with_connectivity(monitor.clone())
            .with_defaults(RequestConfig::from_app_config(&cfg)),
    );
    let queries = Arc::new(QueryExecutor::new(
        Arc::clone(&reporter),
        QueryPolicy::from_app_config(&cfg),
    ));
    let reader = OfflineReader::new(executor, queries, cache, monitor);

    // --- Probe ---
    // Failures from the read path were already reported by the query policy;
    // they go straight to the fallback renderer.
    let request = HttpRequest::get(url.as_str());
    let fetched = match reader.read::<Value>(&cache_key, &request).await {
        Ok(fetched) => fetched,
        Err(err) => {
            let view = FallbackRenderer::render(&err, false, environment);
            println!("{}", serde_json::to_string_pretty(&view)?);
            std::process::exit(1);
        }
    };
    info!(source = ?fetched.source, "payload received");

    let mut boundary: RecoveryBoundary<String> = RecoveryBoundary::new("probe", reporter);
    match boundary.render(|| serde_json::to_string_pretty(&fetched.value)) {
        Rendered::Children(text) | Rendered::Custom(text) => println!("{text}"),
        Rendered::Fallback(view) => {
            println!("{}", serde_json::to_string_pretty(&view)?);
            std::process::exit(1);
        }
    }
    Ok(())
}
