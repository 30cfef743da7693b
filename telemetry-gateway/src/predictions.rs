use crate::errors::{GatewayError, Result};
use serde_json::Value;
use std::path::Path;

/// Reads the predictions file produced by the analytics service.
///
/// The file is read on every call so a rewritten file is served immediately.
pub async fn load_predictions(path: &Path) -> Result<Value> {
    let data = tokio::fs::read(path)
        .await
        .map_err(|e| GatewayError::PredictionsError(path.display().to_string(), e.to_string()))?;

    serde_json::from_slice(&data)
        .map_err(|e| GatewayError::PredictionsError(path.display().to_string(), e.to_string()))
}
