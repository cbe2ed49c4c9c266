pub mod dto;
pub mod errors;
pub mod handlers;

use axum::{
    extract::Request,
    http::{header, Method, StatusCode},
    middleware::{self, Next},
    response::{IntoResponse, Response},
    routing::get,
    Router,
};
use tower_http::cors::{Any, CorsLayer};
use utoipa::OpenApi;
use utoipa_axum::router::OpenApiRouter;

use handlers::ApiDoc;

use crate::{
    board::BoardClient, control::ControlService, sensors::SensorService, store::DeviceStore,
};

/// Everything a handler can reach. Cheap to clone; all parts share state.
#[derive(Clone)]
pub struct AppState {
    pub sensors: SensorService,
    pub control: ControlService,
    pub board: BoardClient,
}

impl AppState {
    /// `demo_stale_after_ms`: enables the synthetic esp32 fallback with the
    /// given staleness threshold.
    pub fn new(store: DeviceStore, board: BoardClient, demo_stale_after_ms: Option<i64>) -> Self {
        Self {
            sensors: SensorService::new(store.clone(), demo_stale_after_ms),
            control: ControlService::new(store),
            board,
        }
    }
}

pub fn router(state: AppState) -> Router {
    let (router, api) = OpenApiRouter::with_openapi(ApiDoc::openapi())
        .route(
            "/esp32/data",
            get(handlers::get_esp32_data).post(handlers::post_esp32_data),
        )
        .route(
            "/esp32/config",
            get(handlers::get_esp32_config).post(handlers::post_esp32_config),
        )
        .route(
            "/esp8266/data",
            get(handlers::get_esp8266_data).post(handlers::post_esp8266_data),
        )
        .route(
            "/esp8266/config",
            get(handlers::get_esp8266_config).post(handlers::post_esp8266_config),
        )
        .route(
            "/esp8266/proxy",
            get(handlers::get_proxy).post(handlers::post_proxy),
        )
        .with_state(state)
        .split_for_parts();

    router
        .route("/health", get(handlers::health))
        .route(
            "/api-docs/openapi.json",
            get(move || async move { axum::Json(api) }),
        )
        .layer(CorsLayer::new().allow_origin(Any))
        .layer(middleware::from_fn(preflight_and_probe))
}

/// OPTIONS on any path is a CORS preflight (204); HEAD on any path is a
/// liveness probe (200, empty). Neither reaches a handler.
async fn preflight_and_probe(req: Request, next: Next) -> Response {
    match req.method() {
        &Method::OPTIONS => (
            StatusCode::NO_CONTENT,
            [
                (header::ACCESS_CONTROL_ALLOW_ORIGIN, "*"),
                (header::ACCESS_CONTROL_ALLOW_METHODS, "GET,POST,OPTIONS"),
                (header::ACCESS_CONTROL_ALLOW_HEADERS, "Content-Type"),
            ],
        )
            .into_response(),
        &Method::HEAD => StatusCode::OK.into_response(),
        _ => next.run(req).await,
    }
}
