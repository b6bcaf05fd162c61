//! Embedded Web-GUI assets and backup video serving.

use std::sync::OnceLock;

use axum::{
    Router,
    extract::State,
    http::header,
    response::{IntoResponse, Response},
    routing::get,
};
use axum_extra::{
    TypedHeader,
    headers::{ContentLength, ContentType},
};
use hyper::StatusCode;
use thiserror::Error as ThisError;
use tracing::warn;

use crate::app::AppState;

macro_rules! include_utf8_asset {
    ($asset_path:expr) => {
        include_str!(concat!("../../assets/", $asset_path))
    };
}

pub(crate) fn routes() -> Router<AppState> {
    Router::new()
        .route("/", get(serve_ui))
        .route("/app.js", get(serve_app_js))
        .route("/styles.css", get(serve_styles))
        .route("/video/backup", get(serve_backup_video))
}

/// Serves the main HTML page, injecting dynamic content.
async fn serve_ui() -> impl IntoResponse {
    static HTML: OnceLock<String> = OnceLock::new();
    let html = HTML
        .get_or_init(|| {
            include_utf8_asset!("index.tmpl.html")
                .replace("{ title }", "Feedwatch")
                .replace("{ description }", env!("CARGO_PKG_DESCRIPTION"))
                .replace("{ version }", env!("CARGO_PKG_VERSION"))
        })
        .clone();
    (TypedHeader(ContentType::html()), html)
}

async fn serve_app_js() -> impl IntoResponse {
    const JS: &str = include_utf8_asset!("app.js");
    (
        TypedHeader(ContentType::from(mime::APPLICATION_JAVASCRIPT_UTF_8)),
        TypedHeader(ContentLength(JS.len() as u64)),
        JS,
    )
}

async fn serve_styles() -> impl IntoResponse {
    const CSS: &str = include_utf8_asset!("styles.css");
    (
        TypedHeader(ContentType::from(mime::TEXT_CSS)),
        TypedHeader(ContentLength(CSS.len() as u64)),
        CSS,
    )
}

/// Errors serving the backup video asset.
#[derive(Debug, ThisError)]
enum VideoError {
    #[error("backup video not found at {0}")]
    NotFound(String),
    #[error("failed to read backup video: {0}")]
    Io(#[from] std::io::Error),
}

impl IntoResponse for VideoError {
    fn into_response(self) -> Response {
        warn!("{self}");
        let status = match &self {
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Io(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };
        (status, self.to_string()).into_response()
    }
}

/// Serves the configured backup video file whole. The asset is a short loop,
/// so range requests aren't worth the complexity here.
#[axum::debug_handler]
async fn serve_backup_video(
    State(state): State<AppState>,
) -> Result<impl IntoResponse, VideoError> {
    let path = &state.backup_video;
    if !path.is_file() {
        return Err(VideoError::NotFound(path.display().to_string()));
    }
    let data = tokio::fs::read(path).await?;
    Ok(([(header::CONTENT_TYPE, "video/mp4")], data))
}
