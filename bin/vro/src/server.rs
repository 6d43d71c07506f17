//! Live HTTP server.
//!
//! `GET /static/*` serves the static tree; every other `GET` goes through
//! the resolver. Rendering runs on the blocking pool.

use std::{
    sync::Arc,
    time::{SystemTime, UNIX_EPOCH},
};

use axum::{
    Router,
    extract::{Path, State},
    http::{HeaderMap, HeaderValue, StatusCode, Uri, header},
    response::{IntoResponse, Response},
    routing::get,
};
use chrono::{DateTime, Utc};
use tower_http::trace::TraceLayer;
use vro_generator::{Resolution, Resolver, StaticFile};

use crate::error::ServerError;

/// Request paths under this prefix are served from the static tree.
const STATIC_PREFIX: &str = "/static/";

/// HTTP date format for `Last-Modified`.
const HTTP_DATE: &str = "%a, %d %b %Y %H:%M:%S GMT";

/// Shared state for request handlers.
#[derive(Debug)]
pub struct ServerState {
    resolver: Resolver,
}

impl ServerState {
    pub fn new(resolver: Resolver) -> Self {
        Self { resolver }
    }

    pub fn resolver(&self) -> &Resolver {
        &self.resolver
    }
}

/// Create the application router.
pub fn create_router(state: Arc<ServerState>) -> Router {
    Router::new()
        .route("/", get(get_root_page))
        .route("/{*path}", get(get_page))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Handle GET /.
async fn get_root_page(State(state): State<Arc<ServerState>>, headers: HeaderMap) -> Response {
    respond(state, "/".to_string(), &headers).await
}

/// Handle GET /{path}.
async fn get_page(
    State(state): State<Arc<ServerState>>,
    Path(path): Path<String>,
    uri: Uri,
    headers: HeaderMap,
) -> Response {
    let mut request_path = format!("/{path}");
    if uri.path().ends_with('/') && !request_path.ends_with('/') {
        request_path.push('/');
    }
    respond(state, request_path, &headers).await
}

async fn respond(state: Arc<ServerState>, request_path: String, headers: &HeaderMap) -> Response {
    let path = request_path.clone();
    let resolution = tokio::task::spawn_blocking(move || match path.strip_prefix(STATIC_PREFIX) {
        Some(asset) => state.resolver.static_asset(asset),
        None => state.resolver.resolve(&path),
    })
    .await;

    match resolution {
        Ok(Resolution::Page(html)) => (
            [(header::CONTENT_TYPE, "text/html; charset=utf-8")],
            html,
        )
            .into_response(),
        Ok(Resolution::File(file)) => serve_file(file, headers),
        Ok(Resolution::NotFound) => ServerError::NotFound(request_path).into_response(),
        Ok(Resolution::Error(source)) => ServerError::Resolve {
            path: request_path,
            source,
        }
        .into_response(),
        Err(e) => ServerError::from(e).into_response(),
    }
}

/// Serve raw bytes with a guessed content type and conditional-GET support.
fn serve_file(file: StaticFile, headers: &HeaderMap) -> Response {
    let last_modified = http_date(file.modified);

    if let Some(modified) = modified_secs(file.modified)
        && not_modified_since(headers, modified)
    {
        let mut response = StatusCode::NOT_MODIFIED.into_response();
        insert_header(&mut response, header::LAST_MODIFIED, last_modified.as_deref());
        return response;
    }

    let content_type = content_type(&file.name, &file.data);
    let mut response = (StatusCode::OK, file.data).into_response();
    insert_header(&mut response, header::CONTENT_TYPE, Some(&content_type));
    insert_header(&mut response, header::LAST_MODIFIED, last_modified.as_deref());
    response
}

fn insert_header(response: &mut Response, name: header::HeaderName, value: Option<&str>) {
    if let Some(value) = value.and_then(|v| HeaderValue::from_str(v).ok()) {
        response.headers_mut().insert(name, value);
    }
}

/// `Last-Modified` value, or `None` for an unknown (epoch) mtime.
fn http_date(modified: SystemTime) -> Option<String> {
    modified_secs(modified)?;
    let modified: DateTime<Utc> = modified.into();
    Some(modified.format(HTTP_DATE).to_string())
}

/// Whole seconds since the epoch; `None` when the mtime is unknown.
fn modified_secs(modified: SystemTime) -> Option<i64> {
    let secs = modified.duration_since(UNIX_EPOCH).ok()?.as_secs();
    if secs == 0 {
        return None;
    }
    i64::try_from(secs).ok()
}

fn not_modified_since(headers: &HeaderMap, modified: i64) -> bool {
    headers
        .get(header::IF_MODIFIED_SINCE)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| DateTime::parse_from_rfc2822(v).ok())
        .is_some_and(|since| modified <= since.timestamp())
}

/// Content type from the extension, else sniffed from the bytes.
fn content_type(name: &str, data: &[u8]) -> String {
    match mime_guess::from_path(name).first() {
        Some(mime) if mime.type_() == mime_guess::mime::TEXT => format!("{mime}; charset=utf-8"),
        Some(mime) => mime.to_string(),
        None if std::str::from_utf8(data).is_ok() => "text/plain; charset=utf-8".to_string(),
        None => "application/octet-stream".to_string(),
    }
}
