use crate::aggregator::Aggregator;
use crate::api::utils::{HandlerBody, error_response, json_response};
use http::{Response, StatusCode};

/// `GET /api/all-data`
///
/// Example response, with the sensor cloud unreachable:
///
/// ```json
/// {
///   "graphData": { ... },
///   "riskAssessment": { ... },
///   "blynkData": { "error": "Failed to fetch Blynk data" }
/// }
/// ```
pub async fn handle(aggregator: &Aggregator) -> Response<HandlerBody> {
    match aggregator.get_merged_data().await {
        Ok(merged) => json_response(StatusCode::OK, &merged),
        Err(e) => {
            tracing::error!(error = %e, "Error in all-data API");
            error_response(
                StatusCode::INTERNAL_SERVER_ERROR,
                "Failed to fetch combined data",
            )
        }
    }
}
