use crate::access::Origins;
use crate::error::ApiError;
use crate::state::{AppState, STATIC_PREFIX};
use axum::{
    body::{Body, Bytes},
    extract::{Path, Query, Request, State},
    http::{
        header::{AUTHORIZATION, CONTENT_TYPE},
        HeaderValue, Method, Response as HttpResponse, StatusCode,
    },
    middleware::{self, Next},
    response::{IntoResponse, Response},
    routing::{get, post},
    Router,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use simlog_protocol::serialize_json;
use std::sync::Arc;
use tower_http::cors::{AllowOrigin, CorsLayer};

#[derive(Debug, Default, Deserialize)]
struct PathQuery {
    #[serde(default)]
    path: String,
}

/// HTTP surface of the data server.
///
/// CORS wraps authentication so preflight requests never need a token.
pub fn router(state: Arc<AppState>) -> Router {
    let cors = cors_layer(state.cors_origins());
    Router::new()
        .route("/dir-tree", get(dir_tree))
        .route("/data-pack", post(data_pack))
        .route("/read-sim", get(read_sim))
        .route("/file", get(file))
        .route(&format!("/{STATIC_PREFIX}/*path"), get(static_file))
        .route("/health", get(health))
        .layer(middleware::from_fn_with_state(state.clone(), require_auth))
        .layer(cors)
        .with_state(state)
}

fn cors_layer(origins: &Origins) -> CorsLayer {
    let allow_origin = match origins {
        Origins::Any => AllowOrigin::any(),
        Origins::Only(list) => AllowOrigin::list(
            list.iter().filter_map(|origin| HeaderValue::from_str(origin).ok()),
        ),
    };
    CorsLayer::new()
        .allow_origin(allow_origin)
        .allow_methods([Method::GET, Method::POST])
        .allow_headers([CONTENT_TYPE, AUTHORIZATION])
}

async fn dir_tree(
    State(state): State<Arc<AppState>>,
    Query(query): Query<PathQuery>,
) -> Result<Response, ApiError> {
    let tree = state.dir_tree(&query.path).await?;
    Ok(build_response(StatusCode::OK, &tree))
}

async fn data_pack(
    State(state): State<Arc<AppState>>,
    body: Bytes,
) -> Result<Response, ApiError> {
    let body: Value = serde_json::from_slice(&body)
        .map_err(|err| ApiError::BadRequest(format!("Request body is not valid JSON: {err}")))?;
    let pack = state.data_pack(&body).await?;
    Ok(build_response(StatusCode::OK, &pack))
}

async fn read_sim(
    State(state): State<Arc<AppState>>,
    Query(query): Query<PathQuery>,
) -> Result<Response, ApiError> {
    let pack = state.read_sim(&query.path).await?;
    Ok(build_response(StatusCode::OK, pack.as_ref()))
}

async fn file(
    State(state): State<Arc<AppState>>,
    Query(query): Query<PathQuery>,
) -> Result<Response, ApiError> {
    let bytes = state.read_file(&query.path).await?;
    Ok(raw_response(&query.path, bytes))
}

async fn static_file(
    State(state): State<Arc<AppState>>,
    Path(path): Path<String>,
) -> Result<Response, ApiError> {
    let bytes = state.read_file(&path).await?;
    Ok(raw_response(&path, bytes))
}

async fn health(State(state): State<Arc<AppState>>) -> Response {
    build_response(StatusCode::OK, &state.health())
}

async fn require_auth(
    State(state): State<Arc<AppState>>,
    request: Request,
    next: Next,
) -> Response {
    if let Some(token) = state.auth_token() {
        if !token.admits(request.headers()) {
            return ApiError::Unauthorized("Missing or invalid bearer token".to_string())
                .into_response();
        }
    }
    next.run(request).await
}

pub(crate) fn build_response<T: Serialize>(status: StatusCode, body: &T) -> Response {
    let bytes = match serialize_json(body) {
        Ok(json) => json.into_bytes(),
        Err(err) => {
            log::error!("Failed to serialize response: {err}");
            return bare_status(StatusCode::INTERNAL_SERVER_ERROR);
        }
    };

    let mut builder = HttpResponse::builder()
        .status(status)
        .header("content-type", "application/json");

    if status == StatusCode::UNAUTHORIZED {
        builder = builder.header("www-authenticate", "Bearer");
    }

    builder
        .body(Body::from(bytes))
        .unwrap_or_else(|_| bare_status(StatusCode::INTERNAL_SERVER_ERROR))
}

fn raw_response(path: &str, bytes: Vec<u8>) -> Response {
    HttpResponse::builder()
        .status(StatusCode::OK)
        .header("content-type", content_type(path))
        .body(Body::from(bytes))
        .unwrap_or_else(|_| bare_status(StatusCode::INTERNAL_SERVER_ERROR))
}

fn bare_status(status: StatusCode) -> Response {
    let mut response = Response::new(Body::empty());
    *response.status_mut() = status;
    response
}

fn content_type(path: &str) -> &'static str {
    let extension = std::path::Path::new(path)
        .extension()
        .and_then(|ext| ext.to_str())
        .map(str::to_ascii_lowercase);
    match extension.as_deref() {
        Some("csv") => "text/csv; charset=utf-8",
        Some("json") => "application/json",
        Some("txt") | Some("log") => "text/plain; charset=utf-8",
        _ => "application/octet-stream",
    }
}
