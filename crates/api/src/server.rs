use anyhow::Context;
use axum::{
    body::Bytes,
    extract::State,
    routing::{get, post},
    Json, Router,
};
use oraclefeed_core::{EventKind, EventRecord, TipAdded, ValueReport};
use oraclefeed_indexer::{
    config::Config,
    listener::{ChainBackfill, RpcProvider},
    EventStores, IngestError,
};
use serde::Serialize;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::{debug, error, info, warn};

#[derive(Clone)]
struct AppState {
    stores: EventStores,
}

/// Body returned by the webhook routes.
///
/// Failed deliveries get an empty object so the event stream does not
/// redeliver payloads that can never be decoded.
#[derive(Debug, Default, Serialize)]
pub struct WebhookResponse {
    /// The normalized record, absent on failure
    #[serde(skip_serializing_if = "Option::is_none")]
    pub event: Option<EventRecord>,
}

fn router_for_state(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/new-report", get(list_reports))
        .route("/tip-added", get(list_tips))
        .route("/webhook/new-report", post(webhook_new_report))
        .route("/webhook/tip-added", post(webhook_tip_added))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Build an in-process API router over already-loaded stores.
pub fn build_app(stores: EventStores) -> Router {
    router_for_state(AppState { stores })
}

/// Run the service: load the stores, start the backfill and serve HTTP until
/// a shutdown signal arrives.
pub async fn run_with_config(config: Config) -> anyhow::Result<()> {
    let stores = EventStores::open(&config.storage)
        .await
        .context("Failed to load event stores")?;

    info!(
        "Loaded {} value reports and {} tips",
        stores.reports().len().await,
        stores.tips().len().await
    );

    let backfill = if config.backfill.enabled {
        let provider = RpcProvider::new(
            &config.network.rpc_url,
            config.contracts.flex,
            config.contracts.autopay,
        )?;
        let backfill = ChainBackfill::new(provider, stores.clone(), &config.backfill);

        Some(tokio::spawn(async move {
            match backfill.run().await {
                Ok(report) => info!(
                    "Backfill of blocks {} to {} finished: {} reports and {} tips inserted",
                    report.from_block, report.to_block, report.reports.inserted, report.tips.inserted
                ),
                Err(e) => error!("Backfill failed: {}", e),
            }
        }))
    } else {
        info!("Backfill disabled");
        None
    };

    let app = build_app(stores);
    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    info!("oraclefeed listening on {}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    if let Some(handle) = backfill {
        if !handle.is_finished() {
            warn!("Aborting backfill still in progress");
        }
        handle.abort();
    }

    info!("oraclefeed shutdown complete");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = tokio::signal::ctrl_c().await {
            error!("Failed to install Ctrl+C handler: {}", err);
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{signal, SignalKind};

        match signal(SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(err) => {
                error!("Failed to install SIGTERM handler: {}", err);
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("Shutdown signal received");
}

async fn health() -> &'static str {
    "OK"
}

async fn list_reports(State(state): State<AppState>) -> Json<Vec<ValueReport>> {
    Json(state.stores.reports().list().await)
}

async fn list_tips(State(state): State<AppState>) -> Json<Vec<TipAdded>> {
    Json(state.stores.tips().list().await)
}

async fn webhook_new_report(State(state): State<AppState>, body: Bytes) -> Json<WebhookResponse> {
    Json(accept_delivery(&state, EventKind::ValueReport, &body).await)
}

async fn webhook_tip_added(State(state): State<AppState>, body: Bytes) -> Json<WebhookResponse> {
    Json(accept_delivery(&state, EventKind::TipAdded, &body).await)
}

async fn accept_delivery(state: &AppState, kind: EventKind, body: &[u8]) -> WebhookResponse {
    match state.stores.ingest_webhook(kind, body).await {
        Ok(ingested) => {
            if ingested.outcome.inserted {
                info!("{} webhook stored ({} retained)", kind, ingested.outcome.len);
            } else {
                debug!("{} webhook already stored", kind);
            }
            WebhookResponse {
                event: Some(ingested.record),
            }
        }
        Err(IngestError::Decode(e)) => {
            warn!("Rejected {} webhook: {}", kind, e);
            WebhookResponse::default()
        }
        Err(IngestError::Persistence(e)) => {
            error!("Failed to persist {} webhook: {}", kind, e);
            WebhookResponse::default()
        }
    }
}
