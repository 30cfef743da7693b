use crate::api::utils::{HandlerBody, deserialize_body, error_response, json_response};
use crate::connection_state::ConnectionState;
use http::{Response, StatusCode};
use hyper::body::Body;
use serde::{Deserialize, Serialize};
use std::fmt::Display;

#[derive(Deserialize)]
struct HardwareConnectionRequest {
    connected: bool,
}

#[derive(Serialize)]
struct HardwareConnectionResponse {
    success: bool,
    status: bool,
}

/// `POST /api/hardware-connection`
///
/// Request: `{"connected": true}`. Response: `{"success": true, "status": true}`.
pub async fn handle<B>(connection: &ConnectionState, body: B) -> Response<HandlerBody>
where
    B: Body,
    B::Error: Display,
{
    let request: HardwareConnectionRequest = match deserialize_body(body).await {
        Ok(request) => request,
        Err(e) => {
            tracing::warn!(error = %e, "Invalid hardware connection update");
            return error_response(StatusCode::BAD_REQUEST, &e.to_string());
        }
    };

    connection.set_connected(request.connected);
    tracing::info!(
        connected = request.connected,
        "Hardware connection status: {}",
        if request.connected { "connected" } else { "disconnected" }
    );

    json_response(
        StatusCode::OK,
        &HardwareConnectionResponse {
            success: true,
            status: request.connected,
        },
    )
}
