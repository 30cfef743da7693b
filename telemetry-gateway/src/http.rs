use crate::errors::GatewayError;
use reqwest::RequestBuilder;
use serde::de::DeserializeOwned;
use std::time::Duration;
use tokio::time::timeout;

/// Sends a request and decodes a JSON response body.
///
/// `limit` applies to the entire request/response cycle, including
/// collecting the body. `upstream` names the target in error messages and must
/// not carry credentials.
pub async fn fetch_json<T: DeserializeOwned>(
    request: RequestBuilder,
    upstream: &str,
    limit: Duration,
) -> Result<T, GatewayError> {
    timeout(limit, async {
        let response = execute(request, upstream).await?;
        let body = response
            .bytes()
            .await
            .map_err(|e| GatewayError::ResponseBodyError(upstream.to_string(), e.to_string()))?;

        serde_json::from_slice(&body)
            .map_err(|e| GatewayError::ResponseBodyError(upstream.to_string(), e.to_string()))
    })
    .await
    .map_err(|_| GatewayError::UpstreamTimeout(upstream.to_string()))?
}

/// Sends a request, only checking that the upstream accepted it. The response
/// body is discarded.
pub async fn send(
    request: RequestBuilder,
    upstream: &str,
    limit: Duration,
) -> Result<(), GatewayError> {
    timeout(limit, execute(request, upstream))
        .await
        .map_err(|_| GatewayError::UpstreamTimeout(upstream.to_string()))?
        .map(|_| ())
}

async fn execute(
    request: RequestBuilder,
    upstream: &str,
) -> Result<reqwest::Response, GatewayError> {
    let response = request.send().await.map_err(|e| {
        // reqwest includes the full URL in its errors; strip it so query
        // credentials never reach the logs.
        GatewayError::UpstreamRequestFailed(upstream.to_string(), e.without_url().to_string())
    })?;

    let status = response.status();
    if !status.is_success() {
        return Err(GatewayError::UpstreamStatus(upstream.to_string(), status));
    }

    Ok(response)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{Value, json};
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn test_fetch_json_success() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/data"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"a": 1})))
            .mount(&server)
            .await;

        let request = reqwest::Client::new().get(format!("{}/data", server.uri()));
        let value: Value = fetch_json(request, "test", Duration::from_secs(5))
            .await
            .unwrap();

        assert_eq!(value, json!({"a": 1}));
    }

    #[tokio::test]
    async fn test_fetch_json_errors() {
        let server = MockServer::start().await;
        Mock::given(path("/missing"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;
        Mock::given(path("/garbage"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html>"))
            .mount(&server)
            .await;
        Mock::given(path("/slow"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!({}))
                    .set_delay(Duration::from_secs(3)),
            )
            .mount(&server)
            .await;

        let client = reqwest::Client::new();
        let limit = Duration::from_millis(500);

        let result: Result<Value, _> =
            fetch_json(client.get(format!("{}/missing", server.uri())), "test", limit).await;
        assert!(matches!(
            result.unwrap_err(),
            GatewayError::UpstreamStatus(_, status) if status == reqwest::StatusCode::NOT_FOUND
        ));

        let result: Result<Value, _> =
            fetch_json(client.get(format!("{}/garbage", server.uri())), "test", limit).await;
        assert!(matches!(
            result.unwrap_err(),
            GatewayError::ResponseBodyError(..)
        ));

        let result: Result<Value, _> =
            fetch_json(client.get(format!("{}/slow", server.uri())), "test", limit).await;
        assert!(matches!(
            result.unwrap_err(),
            GatewayError::UpstreamTimeout(_)
        ));
    }

    #[tokio::test]
    async fn test_connection_refused() {
        // Bind and drop to find a port nothing listens on
        let port = {
            let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
            listener.local_addr().unwrap().port()
        };

        let request = reqwest::Client::new().post(format!("http://127.0.0.1:{port}/"));
        let err = send(request, "nowhere", Duration::from_secs(5))
            .await
            .unwrap_err();

        assert!(matches!(err, GatewayError::UpstreamRequestFailed(..)));
        assert!(err.is_upstream());
    }
}
