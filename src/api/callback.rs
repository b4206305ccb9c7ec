use crate::error::Result;
use crate::models::{CallbackOutcome, CallbackParams};
use crate::services::AuthService;
use axum::{
    extract::{Query, State},
    response::Html,
    routing::get,
    Router,
};
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;

pub fn callback_routes(path: &str) -> Router<Arc<AuthService>> {
    Router::new().route(path, get(oauth_callback))
}

async fn oauth_callback(
    State(auth): State<Arc<AuthService>>,
    Query(params): Query<CallbackParams>,
) -> Result<Html<String>> {
    let outcome = auth.handle_callback(params).await?;

    let message = match outcome {
        CallbackOutcome::Authenticated => "Logged in to Play Gen. You can close this tab.",
        CallbackOutcome::Ignored => "Nothing to do here.",
    };

    Ok(Html(page(message)))
}

fn page(message: &str) -> String {
    format!(
        "<!doctype html><html><head><title>Play Gen</title></head>\
         <body><p>{}</p></body></html>",
        message
    )
}

/// Serves the OAuth redirect target until the process exits.
pub async fn start_callback_server(
    addr: &str,
    path: &str,
    auth: Arc<AuthService>,
) -> anyhow::Result<tokio::task::JoinHandle<()>> {
    let app = callback_routes(path)
        .layer(TraceLayer::new_for_http())
        .with_state(auth);

    let listener = TcpListener::bind(addr).await?;
    tracing::info!("Listening for authorization callback on http://{}{}", addr, path);

    Ok(tokio::spawn(async move {
        if let Err(e) = axum::serve(listener, app).await {
            tracing::error!("Callback server error: {}", e);
        }
    }))
}
