mod all_data;
mod hardware_connection;
mod predictions;
pub mod utils;

use crate::aggregator::Aggregator;
use crate::connection_state::ConnectionState;
use crate::errors::GatewayError;
use crate::metrics_defs::REQUEST_DURATION;
use hyper::body::{Body, Incoming};
use hyper::service::Service;
use hyper::{Method, Request, Response, StatusCode};
use shared::histogram;
use std::fmt::Display;
use std::future::Future;
use std::path::PathBuf;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Instant;
use utils::{HandlerBody, allow_any_origin, error_response, preflight_response};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Route {
    AllData,
    Predictions,
    HardwareConnection,
}

impl Route {
    fn from_path(path: &str) -> Option<Self> {
        match path {
            "/api/all-data" => Some(Route::AllData),
            "/api/predictions" => Some(Route::Predictions),
            "/api/hardware-connection" => Some(Route::HardwareConnection),
            _ => None,
        }
    }

    /// HEAD is served wherever GET is; hyper drops the body on the wire.
    fn accepts(&self, method: &Method) -> bool {
        match self {
            Route::AllData | Route::Predictions => {
                *method == Method::GET || *method == Method::HEAD
            }
            Route::HardwareConnection => *method == Method::POST,
        }
    }

    fn name(&self) -> &'static str {
        match self {
            Route::AllData => "all_data",
            Route::Predictions => "predictions",
            Route::HardwareConnection => "hardware_connection",
        }
    }
}

struct GatewayState {
    aggregator: Aggregator,
    connection: ConnectionState,
    predictions_path: PathBuf,
}

/// The public HTTP API of the gateway.
#[derive(Clone)]
pub struct GatewayService {
    state: Arc<GatewayState>,
}

impl GatewayService {
    pub fn new(
        aggregator: Aggregator,
        connection: ConnectionState,
        predictions_path: PathBuf,
    ) -> Self {
        GatewayService {
            state: Arc::new(GatewayState {
                aggregator,
                connection,
                predictions_path,
            }),
        }
    }

    /// Dispatches a request to its handler. Every response allows any origin.
    pub async fn handle<B>(&self, req: Request<B>) -> Response<HandlerBody>
    where
        B: Body,
        B::Error: Display,
    {
        let start = Instant::now();
        let route = Route::from_path(req.uri().path());
        let method = req.method().clone();

        let mut response = match (route, &method) {
            (_, &Method::OPTIONS) => preflight_response(req.headers()),
            (Some(route), method) if route.accepts(method) => {
                self.dispatch(route, req).await
            }
            (Some(_), method) => {
                tracing::debug!(method = %method, path = %req.uri().path(), "Method not allowed");
                error_response(StatusCode::METHOD_NOT_ALLOWED, "Method not allowed")
            }
            (None, method) => {
                tracing::debug!(method = %method, path = %req.uri().path(), "No route matched");
                error_response(StatusCode::NOT_FOUND, "Not found")
            }
        };
        allow_any_origin(response.headers_mut());

        histogram!(
            REQUEST_DURATION,
            "route" => route.map_or("unmatched", |r| r.name()),
            "status" => response.status().as_str().to_owned()
        )
        .record(start.elapsed().as_secs_f64());

        response
    }

    async fn dispatch<B>(&self, route: Route, req: Request<B>) -> Response<HandlerBody>
    where
        B: Body,
        B::Error: Display,
    {
        match route {
            Route::AllData => all_data::handle(&self.state.aggregator).await,
            Route::Predictions => predictions::handle(&self.state.predictions_path).await,
            Route::HardwareConnection => {
                hardware_connection::handle(&self.state.connection, req.into_body()).await
            }
        }
    }
}

impl Service<Request<Incoming>> for GatewayService {
    type Response = Response<HandlerBody>;
    type Error = GatewayError;
    type Future =
        Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>> + Send + 'static>>;

    fn call(&self, req: Request<Incoming>) -> Self::Future {
        let service = self.clone();
        Box::pin(async move { Ok(service.handle(req).await) })
    }
}
