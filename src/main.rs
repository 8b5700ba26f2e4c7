use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use api_rest::{router, AppState};
use medlink_core::CoreConfig;
use medlink_flows::{FlowClient, HttpModelTransport, ModelApiConfig};

const ENV_REST_ADDR: &str = "MEDLINK_REST_ADDR";
const ENV_API_KEY: &str = "MEDLINK_API_KEY";

/// Main entry point for the MedLink server
///
/// Resolves configuration once, then serves the REST API (with OpenAPI/Swagger UI) until
/// interrupted.
///
/// # Environment Variables
/// - `MEDLINK_REST_ADDR`: REST server address (default: "0.0.0.0:3000")
/// - `MEDLINK_API_KEY`: when set, required as `x-api-key` on every route but `/health`
/// - `MEDLINK_APP_ORIGIN`, `MEDLINK_ENFORCE_ORIGIN`, `MEDLINK_MAX_CLOCK_SKEW_MS`,
///   `MEDLINK_SINGLE_USE_TOKENS`, `MEDLINK_SCAN_INTERVAL_MS`: share-link settings
/// - `MEDLINK_MODEL_API_URL`, `MEDLINK_MODEL_API_KEY`, `MEDLINK_MODEL_TIMEOUT_SECS`: AI flows
///   (disabled when no URL is set)
///
/// # Errors
/// Returns an error if:
/// - the logging/tracing configuration cannot be initialised,
/// - any setting is invalid,
/// - the server address cannot be bound, or
/// - the HTTP server fails while running.
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("medlink=info".parse()?)
                .add_directive("api_rest=info".parse()?),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let lookup = |key: &str| std::env::var(key).ok();

    let cfg = CoreConfig::from_lookup(lookup)?;
    let mut state = AppState::new(&cfg).with_api_key(lookup(ENV_API_KEY));

    match ModelApiConfig::from_lookup(lookup)? {
        Some(model_cfg) => {
            tracing::info!("AI flows enabled: {:?}", model_cfg);
            state = state.with_flows(FlowClient::new(HttpModelTransport::new(model_cfg)?));
        }
        None => tracing::info!("AI flows disabled: no model API configured"),
    }

    if state.api_key.is_none() {
        tracing::warn!("{} not set, REST API is open", ENV_API_KEY);
    }

    let rest_addr = lookup(ENV_REST_ADDR).unwrap_or_else(|| "0.0.0.0:3000".into());
    tracing::info!("++ Starting MedLink REST on {}", rest_addr);
    tracing::info!("++ Share links issued for {}", cfg.app_origin());

    let listener = tokio::net::TcpListener::bind(&rest_addr).await?;
    axum::serve(listener, router(state))
        .with_graceful_shutdown(async {
            tokio::signal::ctrl_c().await.ok();
            tracing::info!("Shutting down");
        })
        .await?;

    Ok(())
}
