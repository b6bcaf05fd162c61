//! HTTP server assembly for the feedwatch control interface.

use core::time::Duration;

use axum::{
    Router,
    body::Body,
    http::Request,
    response::Redirect,
    routing::{self, IntoMakeService, any},
};
use hyper::StatusCode;
use tower::ServiceBuilder;
use tower_http::{
    ServiceBuilderExt as _, request_id::MakeRequestUuid, timeout::TimeoutLayer, trace::TraceLayer,
};

use crate::{
    app::AppState,
    http::{api, assets},
    websocket,
};

/// Creates the main application router: Web-GUI assets, the JSON control API
/// and the WebSocket push channel.
pub(crate) fn create_app_router() -> Router<AppState> {
    Router::new()
        .merge(assets::routes())
        .nest("/api", api::routes())
        .route("/ws", any(websocket::ws_handler))
}

pub(crate) fn create_app(app_state: AppState) -> IntoMakeService<Router<()>> {
    let middleware_stack = ServiceBuilder::new()
        .set_x_request_id(MakeRequestUuid)
        .propagate_x_request_id()
        .layer(TraceLayer::new_for_http())
        .layer(TimeoutLayer::with_status_code(
            StatusCode::REQUEST_TIMEOUT,
            Duration::from_secs(30),
        ));

    let app = create_app_router()
        .with_state(app_state)
        .fallback(routing::any(|req: Request<Body>| async move {
            tracing::warn!(method = %req.method(), uri = %req.uri(), "Unhandled request");
            Redirect::permanent("/")
        }))
        .layer(middleware_stack);

    app.into_make_service()
}
