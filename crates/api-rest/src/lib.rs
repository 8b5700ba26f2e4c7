//! # API REST
//!
//! REST API implementation for MedLink.
//!
//! Handles:
//! - HTTP endpoints with axum
//! - OpenAPI/Swagger documentation
//! - REST-specific concerns (JSON serialization, CORS, the `x-api-key` check)
//!
//! Uses `api-shared` for request/response types and `medlink-core` / `medlink-flows` for the
//! work itself. The binary lives in the workspace root (`medlink-run`); this crate only builds
//! the [`Router`].

#![warn(rust_2018_idioms)]

use axum::{
    extract::{Path, Request, State},
    http::{header, StatusCode},
    middleware::{self, Next},
    response::{IntoResponse, Json, Response},
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use api_shared::auth::{validate_api_key, API_KEY_HEADER};
use api_shared::{
    ErrorRes, HealthRes, HealthService, InvokeFlowReq, IssueShareLinkReq, IssueShareLinkRes,
    LinkStatus, ValidateShareLinkReq, ValidateShareLinkRes,
};
use medlink_core::{render::render_svg, CoreConfig, PatientId, ShareLinkService};
use medlink_flows::{FlowClient, FlowError, HttpModelTransport, ValidatedOutput};

/// Minimum edge length, in pixels, of QR codes served as SVG.
const QR_SVG_MIN_SIZE: u32 = 256;

/// Application state for the REST API server
///
/// Everything here is resolved once at startup; handlers never read the environment.
#[derive(Clone)]
pub struct AppState {
    pub share_links: ShareLinkService,
    /// `None` when no model API is configured; flow requests then get `503`.
    pub flows: Option<Arc<FlowClient<HttpModelTransport>>>,
    /// `None` disables the API-key check.
    pub api_key: Option<Arc<str>>,
}

impl AppState {
    pub fn new(cfg: &CoreConfig) -> Self {
        Self {
            share_links: ShareLinkService::new(cfg),
            flows: None,
            api_key: None,
        }
    }

    pub fn with_flows(mut self, client: FlowClient<HttpModelTransport>) -> Self {
        self.flows = Some(Arc::new(client));
        self
    }

    pub fn with_share_links(mut self, share_links: ShareLinkService) -> Self {
        self.share_links = share_links;
        self
    }

    /// Require `x-api-key` on every route except `/health`. Blank keys are ignored.
    pub fn with_api_key(mut self, key: Option<String>) -> Self {
        self.api_key = key.filter(|k| !k.trim().is_empty()).map(Arc::from);
        self
    }
}

#[derive(OpenApi)]
#[openapi(
    paths(health, issue_share_link, share_link_qr, validate_share_link, invoke_flow),
    components(schemas(
        HealthRes,
        IssueShareLinkReq,
        IssueShareLinkRes,
        ValidateShareLinkReq,
        ValidateShareLinkRes,
        LinkStatus,
        InvokeFlowReq,
        ErrorRes,
    ))
)]
pub struct ApiDoc;

/// Build the REST router.
///
/// Routes:
/// - `GET /health`
/// - `POST /share-links`
/// - `GET /share-links/:patient_id/qr.svg`
/// - `POST /share-links/validate`
/// - `POST /flows/:flow`
/// - Swagger UI at `/swagger-ui`, OpenAPI document at `/api-docs/openapi.json`
pub fn router(state: AppState) -> Router {
    let protected = Router::new()
        .route("/share-links", post(issue_share_link))
        .route("/share-links/validate", post(validate_share_link))
        .route("/share-links/:patient_id/qr.svg", get(share_link_qr))
        .route("/flows/:flow", post(invoke_flow))
        .route_layer(middleware::from_fn_with_state(state.clone(), require_api_key));

    Router::new()
        .route("/health", get(health))
        .merge(protected)
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Rejects requests without the configured API key.
async fn require_api_key(State(state): State<AppState>, req: Request, next: Next) -> Response {
    let Some(expected) = state.api_key.as_deref() else {
        return next.run(req).await;
    };

    let provided = req
        .headers()
        .get(API_KEY_HEADER)
        .and_then(|v| v.to_str().ok());

    match validate_api_key(provided, expected) {
        Ok(()) => next.run(req).await,
        Err(e) => {
            tracing::warn!("Rejected request to {}: {}", req.uri().path(), e);
            (StatusCode::UNAUTHORIZED, Json(ErrorRes::new(e.to_string()))).into_response()
        }
    }
}

#[utoipa::path(
    get,
    path = "/health",
    responses(
        (status = 200, description = "Health check response", body = HealthRes)
    )
)]
/// Health check endpoint for the REST API
///
/// Used by monitoring and load balancer health checks. Never requires an API key.
#[axum::debug_handler]
async fn health(State(_state): State<AppState>) -> Json<HealthRes> {
    Json(HealthService::check_health())
}

#[utoipa::path(
    post,
    path = "/share-links",
    request_body = IssueShareLinkReq,
    responses(
        (status = 200, description = "Share link issued", body = IssueShareLinkRes),
        (status = 400, description = "Invalid patient id"),
        (status = 401, description = "Missing or invalid API key", body = ErrorRes)
    )
)]
/// Issue a share link for a patient
///
/// The link is stamped with the server clock and stays valid for two minutes.
///
/// # Errors
/// Returns `400 Bad Request` if the patient id is empty or contains characters that cannot
/// appear in a profile path.
#[axum::debug_handler]
async fn issue_share_link(
    State(state): State<AppState>,
    Json(req): Json<IssueShareLinkReq>,
) -> Result<Json<IssueShareLinkRes>, (StatusCode, &'static str)> {
    let patient_id = parse_patient_id(&req.patient_id)?;
    let token = state.share_links.issue(&patient_id);
    Ok(Json(IssueShareLinkRes::from(&token)))
}

#[utoipa::path(
    get,
    path = "/share-links/{patient_id}/qr.svg",
    params(
        ("patient_id" = String, Path, description = "Patient whose profile is shared")
    ),
    responses(
        (status = 200, description = "SVG QR code of a freshly issued share link", body = String, content_type = "image/svg+xml"),
        (status = 400, description = "Invalid patient id"),
        (status = 401, description = "Missing or invalid API key", body = ErrorRes),
        (status = 500, description = "Internal server error")
    )
)]
/// Issue a share link and return it as an SVG QR code
///
/// Each request issues a new link, so the image the patient shows is always fresh.
#[axum::debug_handler]
async fn share_link_qr(
    State(state): State<AppState>,
    Path(patient_id): Path<String>,
) -> Result<Response, (StatusCode, &'static str)> {
    let patient_id = parse_patient_id(&patient_id)?;
    let token = state.share_links.issue(&patient_id);

    match render_svg(token.url().as_str(), QR_SVG_MIN_SIZE) {
        Ok(svg) => Ok((
            [
                (header::CONTENT_TYPE, "image/svg+xml"),
                (header::CACHE_CONTROL, "no-store"),
            ],
            svg,
        )
            .into_response()),
        Err(e) => {
            tracing::error!("Render QR error: {:?}", e);
            Err((StatusCode::INTERNAL_SERVER_ERROR, "Internal error"))
        }
    }
}

#[utoipa::path(
    post,
    path = "/share-links/validate",
    request_body = ValidateShareLinkReq,
    responses(
        (status = 200, description = "Validation outcome; rejected links are reported in the body", body = ValidateShareLinkRes),
        (status = 401, description = "Missing or invalid API key", body = ErrorRes)
    )
)]
/// Validate a decoded QR payload
///
/// Applies the same checks as the scanner: URL syntax, origin, profile path, `ts` and the
/// two-minute freshness window (plus single-use when enabled).
#[axum::debug_handler]
async fn validate_share_link(
    State(state): State<AppState>,
    Json(req): Json<ValidateShareLinkReq>,
) -> Json<ValidateShareLinkRes> {
    let res = ValidateShareLinkRes::from(state.share_links.validate(&req.payload));
    tracing::debug!("Share link validated: {:?}", res.status);
    Json(res)
}

#[utoipa::path(
    post,
    path = "/flows/{flow}",
    request_body = InvokeFlowReq,
    params(
        ("flow" = String, Path, description = "symptom_triage, prescription_suggestion, research_summary or health_trends")
    ),
    responses(
        (status = 200, description = "Validated flow output, tagged with the flow name"),
        (status = 400, description = "Unknown flow or invalid input", body = ErrorRes),
        (status = 401, description = "Missing or invalid API key", body = ErrorRes),
        (status = 502, description = "Model service failed or returned output that failed validation", body = ErrorRes),
        (status = 503, description = "No model service configured", body = ErrorRes)
    )
)]
/// Invoke an AI flow
///
/// The input is checked before it is sent and the model's output is checked against the
/// flow's schema before it is returned.
#[axum::debug_handler]
async fn invoke_flow(
    State(state): State<AppState>,
    Path(flow): Path<String>,
    Json(req): Json<InvokeFlowReq>,
) -> Result<Json<ValidatedOutput>, (StatusCode, Json<ErrorRes>)> {
    let Some(client) = state.flows.as_ref() else {
        return Err((
            StatusCode::SERVICE_UNAVAILABLE,
            Json(ErrorRes::new("AI flows are not configured")),
        ));
    };

    match client.invoke_named(&flow, req.input).await {
        Ok(output) => Ok(Json(output)),
        Err(e) => {
            let status = flow_error_status(&e);
            if status.is_server_error() {
                tracing::error!("Flow {} error: {:?}", flow, e);
            } else {
                tracing::debug!("Flow {} rejected: {}", flow, e);
            }
            Err((status, Json(ErrorRes::new(e.to_string()))))
        }
    }
}

fn flow_error_status(err: &FlowError) -> StatusCode {
    match err {
        FlowError::UnknownFlow(_) | FlowError::InvalidInput(_) => StatusCode::BAD_REQUEST,
        FlowError::SchemaMismatch { .. }
        | FlowError::InvalidOutput { .. }
        | FlowError::Transport(_)
        | FlowError::Upstream { .. } => StatusCode::BAD_GATEWAY,
        FlowError::InvalidConfig(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

fn parse_patient_id(raw: &str) -> Result<PatientId, (StatusCode, &'static str)> {
    PatientId::parse(raw).map_err(|e| {
        tracing::debug!("Invalid patient id: {}", e);
        (StatusCode::BAD_REQUEST, "Invalid patient id")
    })
}
