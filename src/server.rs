//! Router assembly and the HTTP layers wrapped around it.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::extract::{ConnectInfo, DefaultBodyLimit};
use axum::http::{header, HeaderValue, Method, Request, Uri};
use axum::response::Response;
use axum::routing::{delete, get, post};
use axum::{Json, Router};
use serde::Serialize;
use tower::ServiceBuilder;
use tower_http::catch_panic::CatchPanicLayer;
use tower_http::cors::{Any, CorsLayer};
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::set_header::SetResponseHeaderLayer;
use tower_http::trace::TraceLayer;
use tracing::{debug, info, Span};

use crate::api_constants;
use crate::error::ApiError;
use crate::handlers;
use crate::store::ClosetStore;

const BUILD_VERSION: &str = env!("BUILD_VERSION");
const BUILD_DATE: &str = env!("BUILD_DATE");
const RUSTC_VERSION: &str = env!("RUSTC_VERSION");

/// Ceiling for JSON and form bodies.
pub const MAX_JSON_BODY_BYTES: usize = 10 * 1024 * 1024;

pub const MAX_IMAGE_BYTES: usize = 20 * 1024 * 1024;
/// Upload route ceiling: the image plus the text fields and multipart overhead.
pub const MAX_UPLOAD_BODY_BYTES: usize = MAX_IMAGE_BYTES + (1024 * 1024);

#[derive(Serialize)]
struct VersionInfo {
    git_hash: &'static str,
    build_date: &'static str,
    rustc_version: &'static str,
}

/// The closet routes, relative to [`api_constants::CLOSET_BASE_PATH`], with
/// `store` as their shared state.
pub fn closet_router<S: ClosetStore>(store: Arc<S>) -> Router {
    let upload_layer = ServiceBuilder::new()
        .layer(DefaultBodyLimit::max(MAX_UPLOAD_BODY_BYTES))
        .layer(RequestBodyLimitLayer::new(MAX_UPLOAD_BODY_BYTES))
        .into_inner();

    let upload_routes = Router::new()
        .route(api_constants::ADD_ROUTE, post(handlers::add_clothing::<S>))
        .route_layer(upload_layer);

    Router::new()
        .route(api_constants::CLOTHES_ROUTE, get(handlers::list_clothes::<S>))
        .route(api_constants::SEARCH_ROUTE, get(handlers::search_clothes::<S>))
        .route(
            api_constants::OUTFITS_ROUTE,
            get(handlers::list_outfits::<S>).post(handlers::create_outfit::<S>),
        )
        .route(
            api_constants::OUTFIT_DETAILS_ROUTE,
            delete(handlers::delete_outfit::<S>),
        )
        .route(api_constants::OPTIONS_ROUTE, get(handlers::list_options::<S>))
        .route(api_constants::DELETE_ROUTE, delete(handlers::delete_clothing::<S>))
        .merge(upload_routes)
        .with_state(store)
}

/// The complete application: closet routes under their prefix, operational
/// routes, the JSON 404 fallback and the shared middleware stack.
pub fn app<S: ClosetStore>(store: Arc<S>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any)
        .expose_headers([header::HeaderName::from_static("x-build-version")]);

    let build_version_header = SetResponseHeaderLayer::if_not_present(
        header::HeaderName::from_static("x-build-version"),
        HeaderValue::from_static(BUILD_VERSION),
    );

    Router::new()
        .route(api_constants::HEALTH_ROUTE, get(health_check))
        .route(api_constants::VERSION_ROUTE, get(version_info))
        .route(
            api_constants::CLOSET_INDEX_ROUTE,
            get(handlers::list_clothes::<S>).with_state(Arc::clone(&store)),
        )
        .nest(api_constants::CLOSET_BASE_PATH, closet_router(store))
        .fallback(route_not_found)
        .layer(DefaultBodyLimit::max(MAX_JSON_BODY_BYTES))
        .layer(build_version_header)
        .layer(cors)
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(make_request_span)
                .on_request(on_request)
                .on_response(on_response),
        )
        .layer(CatchPanicLayer::new())
}

/// Serves `app` on all interfaces until the process is stopped.
pub async fn serve(app: Router, port: u16) -> anyhow::Result<()> {
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!("Listening on {}", addr);

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await?;

    Ok(())
}

async fn health_check() -> &'static str {
    "OK"
}

async fn version_info() -> Json<VersionInfo> {
    Json(VersionInfo {
        git_hash: BUILD_VERSION,
        build_date: BUILD_DATE,
        rustc_version: RUSTC_VERSION,
    })
}

async fn route_not_found(method: Method, uri: Uri) -> ApiError {
    debug!("Unmatched route: {} {}", method, uri.path());
    ApiError::not_found("Route not found")
}

fn client_ip<B>(req: &Request<B>) -> String {
    req.extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map_or_else(|| "unknown".to_string(), |info| info.0.ip().to_string())
}

fn full_path<B>(req: &Request<B>) -> String {
    let path = req.uri().path();
    match req.uri().query() {
        Some(q) => format!("{path}?{q}"),
        None => path.to_string(),
    }
}

fn make_request_span<B>(req: &Request<B>) -> Span {
    tracing::info_span!(
        "http_request",
        method = %req.method(),
        path = %full_path(req),
        ip = %client_ip(req)
    )
}

fn on_request<B>(req: &Request<B>, _span: &Span) {
    info!("{} {} from {}", req.method(), full_path(req), client_ip(req));
}

fn on_response<B>(response: &Response<B>, latency: Duration, _span: &Span) {
    info!("Response {} in {}ms", response.status(), latency.as_millis());
}
