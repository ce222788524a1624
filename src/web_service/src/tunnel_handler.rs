use crate::http_server::TunnelRestState;
use axum::extract::{RawForm, State};
use axum::http::header::CONTENT_TYPE;
use axum::response::IntoResponse;
use tracing::debug;
use tunnel::server::dispatcher;
use tunnel::server::request::TunnelRequest;
use tunnel::server::TUNNEL_CONTENT_TYPE;

/// `POST /tunnel`. The status is always 200; backend errors travel inside
/// the framed body, and the charset keeps the bytes untranscoded.
#[axum_macros::debug_handler]
pub async fn tunnel_post(
    State(state): State<TunnelRestState>,
    RawForm(body): RawForm,
) -> impl IntoResponse {
    let request = TunnelRequest::from_form(&body);
    let payload = dispatcher::handle_request(state.connector(), &request).await;
    debug!("TunnelSrv response bytes = {}", payload.len());
    ([(CONTENT_TYPE, TUNNEL_CONTENT_TYPE)], payload)
}
