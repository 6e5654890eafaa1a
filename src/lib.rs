pub mod api;
pub mod config;
pub mod infrastructure;
pub mod services;
pub mod utils;

use crate::config::GatewayConfig;
use crate::services::gateway::StorageGateway;
use axum::{
    Router,
    extract::DefaultBodyLimit,
    http::HeaderValue,
    middleware::from_fn,
    routing::{get, post},
};
use std::sync::Arc;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

#[derive(OpenApi)]
#[openapi(
    paths(
        api::handlers::files::upload_file,
        api::handlers::files::search_file,
        api::handlers::files::download_file,
        api::handlers::files::audio_status,
        api::handlers::health::health_check,
    ),
    components(
        schemas(
            api::handlers::files::UploadResponse,
            api::handlers::files::SearchResponse,
            api::handlers::files::AudioStatusResponse,
            api::handlers::health::HealthResponse,
            services::gateway::AudioStatus,
            services::layout::AudioLanguage,
        )
    ),
    tags(
        (name = "files", description = "Document upload and audio lookup endpoints"),
        (name = "system", description = "Service status")
    )
)]
pub struct ApiDoc;

#[derive(Clone)]
pub struct AppState {
    pub gateway: Arc<StorageGateway>,
    pub config: GatewayConfig,
}

pub fn create_app(state: AppState) -> Router {
    let cors = cors_layer(&state.config);

    Router::new()
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .route("/health", get(api::handlers::health::health_check))
        .route(
            "/file/upload",
            post(api::handlers::files::upload_file).layer(DefaultBodyLimit::max(
                state.config.max_file_size + 64 * 1024, // multipart framing
            )),
        )
        .route("/file/find/", get(api::handlers::files::search_file))
        .route("/file/find", get(api::handlers::files::search_file))
        .route("/file/download/", get(api::handlers::files::download_file))
        .route("/file/download", get(api::handlers::files::download_file))
        .route("/file/status/", get(api::handlers::files::audio_status))
        .route("/file/status", get(api::handlers::files::audio_status))
        .layer(from_fn(api::middleware::request_id::request_id_middleware))
        .layer(cors)
        .with_state(state)
}

fn cors_layer(config: &GatewayConfig) -> CorsLayer {
    let origins = if config.allows_any_origin() {
        AllowOrigin::any()
    } else {
        let origins: Vec<HeaderValue> = config
            .allowed_origins
            .iter()
            .filter_map(|origin| match origin.parse() {
                Ok(value) => Some(value),
                Err(_) => {
                    tracing::warn!("Ignoring invalid CORS origin: {}", origin);
                    None
                }
            })
            .collect();
        AllowOrigin::list(origins)
    };

    CorsLayer::new()
        .allow_origin(origins)
        .allow_methods(Any)
        .allow_headers(Any)
}
