use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use serde_json::{json, Value};
use std::sync::Arc;
use tower_http::trace::TraceLayer;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use noteforge_core::catalog::{
    CatalogClient, CatalogFetch, InMemoryResponseCache, RECENT_FETCH_LIMIT,
};
use noteforge_core::config::Settings;
use noteforge_core::domain::inputs::WizardRequest;
use noteforge_core::ideas::{self, CohortPreview, IdeaResponse, PlatformHealth, HEALTH_FETCH_LIMIT};
use noteforge_core::llm::{AnthropicPhraser, IdeaPhraser};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let settings = Settings::from_env()?;
    let _sentry_guard = init_sentry(&settings);

    tracing_subscriber::registry()
        .with(EnvFilter::from_default_env())
        .with(tracing_subscriber::fmt::layer())
        .with(sentry_tracing::layer())
        .init();

    let catalog = CatalogClient::from_settings(&settings, Arc::new(InMemoryResponseCache::new()))?;
    if catalog.base_url().is_none() {
        tracing::warn!("PLATFORM_API_BASE missing; ideas will use static bands only");
    }

    let phraser: Option<Arc<dyn IdeaPhraser>> = match AnthropicPhraser::from_settings(&settings) {
        Ok(p) => Some(Arc::new(p)),
        Err(e) => {
            tracing::warn!(error = %e, "phrasing disabled; serving deterministic cards");
            None
        }
    };

    let state = AppState {
        catalog: Arc::new(catalog),
        phraser,
        article_base: settings.article_base.clone(),
    };

    let app = Router::new()
        .route("/healthz", get(healthz))
        .route("/api/suggest", post(suggest))
        .route("/api/catalog/preview", post(catalog_preview))
        .route("/api/platform/health", get(platform_health))
        .with_state(state)
        .layer(TraceLayer::new_for_http());

    let port: u16 = std::env::var("PORT")
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(3000);
    let addr = std::net::SocketAddr::from(([0, 0, 0, 0], port));

    tracing::info!(%addr, "api listening");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

async fn healthz() -> &'static str {
    "ok"
}

#[derive(Clone)]
struct AppState {
    catalog: Arc<CatalogClient>,
    phraser: Option<Arc<dyn IdeaPhraser>>,
    article_base: String,
}

type ApiError = (StatusCode, Json<Value>);

fn invalid_payload(detail: impl std::fmt::Display) -> ApiError {
    (
        StatusCode::BAD_REQUEST,
        Json(json!({ "error": "Invalid payload", "detail": detail.to_string() })),
    )
}

async fn suggest(
    State(state): State<AppState>,
    payload: Result<Json<WizardRequest>, JsonRejection>,
) -> Result<Json<IdeaResponse>, ApiError> {
    let Json(request) = payload.map_err(|e| invalid_payload(e.body_text()))?;
    let inputs = request
        .validate_and_into_inputs()
        .map_err(|e| invalid_payload(format!("{e:#}")))?;

    let fetch = state.catalog.fetch_recent(RECENT_FETCH_LIMIT).await;
    if let CatalogFetch::Unavailable(err) = &fetch {
        tracing::warn!(error = %err, "catalog unavailable; ideas fall back to static bands");
    }
    let products = fetch.into_products();

    let mut response = ideas::build_ideas(&inputs, &products, &state.article_base);
    if let Some(phraser) = &state.phraser {
        ideas::phrase_ideas(phraser.as_ref(), &inputs, &mut response, &state.article_base).await;
    }

    tracing::info!(
        objective = %inputs.objective,
        sample_size = response.sample_size,
        model = %response.model,
        "suggest served"
    );
    Ok(Json(response))
}

async fn catalog_preview(
    State(state): State<AppState>,
    payload: Result<Json<WizardRequest>, JsonRejection>,
) -> Result<Json<CohortPreview>, ApiError> {
    // An absent or unreadable body previews the default request.
    let request = payload.map(|Json(r)| r).unwrap_or_default();
    let inputs = request
        .into_preview_inputs()
        .map_err(|e| invalid_payload(format!("{e:#}")))?;

    let products = state
        .catalog
        .fetch_recent_products(RECENT_FETCH_LIMIT)
        .await;
    Ok(Json(ideas::preview_cohort(inputs, &products)))
}

async fn platform_health(State(state): State<AppState>) -> (StatusCode, Json<PlatformHealth>) {
    let fetch = state.catalog.fetch_recent(HEALTH_FETCH_LIMIT).await;
    let health = PlatformHealth::from_fetch(state.catalog.base_url(), &fetch);

    if let CatalogFetch::Unavailable(err) = fetch {
        let err = anyhow::Error::new(err);
        sentry_anyhow::capture_anyhow(&err);
        tracing::error!(error = %err, "platform health check failed");
        return (StatusCode::SERVICE_UNAVAILABLE, Json(health));
    }
    (StatusCode::OK, Json(health))
}

async fn shutdown_signal() {
    let _ = tokio::signal::ctrl_c().await;
}

fn init_sentry(settings: &Settings) -> Option<sentry::ClientInitGuard> {
    let dsn = settings.sentry_dsn.as_deref()?;
    Some(sentry::init((
        dsn,
        sentry::ClientOptions {
            release: sentry::release_name!(),
            ..Default::default()
        },
    )))
}
