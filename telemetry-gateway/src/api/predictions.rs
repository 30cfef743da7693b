use crate::api::utils::{HandlerBody, error_response, json_response};
use crate::predictions::load_predictions;
use http::{Response, StatusCode};
use std::path::Path;

/// `GET /api/predictions`
pub async fn handle(path: &Path) -> Response<HandlerBody> {
    match load_predictions(path).await {
        Ok(predictions) => json_response(StatusCode::OK, &predictions),
        Err(e) => {
            tracing::error!(error = %e, "Error reading predictions");
            error_response(StatusCode::INTERNAL_SERVER_ERROR, "Failed to load predictions")
        }
    }
}
