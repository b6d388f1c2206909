//! Request logging middleware with request IDs, status and timing.

use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};
use std::time::Instant;

use http::{HeaderValue, Request, Response};
use tower::{Layer, Service};
use tracing::{Instrument, debug, info, warn};
use uuid::Uuid;

/// Header carrying the request ID, in both directions.
pub const REQUEST_ID_HEADER: &str = "x-request-id";

/// A `Layer` that adds logging with request IDs and timing to requests.
#[derive(Debug, Clone, Copy, Default)]
pub struct RequestLoggerLayer;

impl<S> Layer<S> for RequestLoggerLayer {
    type Service = RequestLoggerService<S>;

    fn layer(&self, service: S) -> Self::Service {
        RequestLoggerService { service }
    }
}

/// A `Service` that logs each request and its outcome.
#[derive(Debug, Clone)]
pub struct RequestLoggerService<S> {
    service: S,
}

impl<S, B, ResBody> Service<Request<B>> for RequestLoggerService<S>
where
    S: Service<Request<B>, Response = Response<ResBody>> + Clone + Send + 'static,
    S::Future: Send + 'static,
    B: Send + 'static,
{
    type Response = S::Response;
    type Error = S::Error;
    type Future = Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>> + Send>>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.service.poll_ready(cx)
    }

    fn call(&mut self, mut request: Request<B>) -> Self::Future {
        let request_id = request
            .headers()
            .get(REQUEST_ID_HEADER)
            .and_then(|v| v.to_str().ok())
            .map_or_else(|| Uuid::new_v4().to_string(), ToString::to_string);

        let header_value = HeaderValue::from_str(&request_id).ok();
        if let Some(value) = &header_value
            && !request.headers().contains_key(REQUEST_ID_HEADER)
        {
            request.headers_mut().insert(REQUEST_ID_HEADER, value.clone());
        }

        let method = request.method().clone();
        let path = request.uri().path().to_string();
        let start_time = Instant::now();

        let span = tracing::info_span!(
            "request",
            request_id = %request_id,
            method = %method,
            path = %path
        );

        span.in_scope(|| {
            debug!(query = request.uri().query().unwrap_or(""), "Received request");
        });

        let future = self.service.call(request);
        Box::pin(
            async move {
                let result = future.await;
                let duration_ms = start_time.elapsed().as_millis();

                match result {
                    Ok(mut response) => {
                        let status = response.status();
                        if let Some(value) = header_value {
                            response.headers_mut().insert(REQUEST_ID_HEADER, value);
                        }
                        if status.is_server_error() {
                            warn!(
                                status = status.as_u16(),
                                duration_ms,
                                "Request completed with server error"
                            );
                        } else {
                            info!(status = status.as_u16(), duration_ms, "Request completed");
                        }
                        Ok(response)
                    }
                    Err(e) => {
                        warn!(duration_ms, "Request failed");
                        Err(e)
                    }
                }
            }
            .instrument(span),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::convert::Infallible;
    use tower::{ServiceExt, service_fn};

    async fn echo_request_id(request: Request<()>) -> Result<Response<String>, Infallible> {
        let id = request
            .headers()
            .get(REQUEST_ID_HEADER)
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default()
            .to_string();
        Ok(Response::new(id))
    }

    #[tokio::test]
    async fn test_generates_request_id() {
        let service = RequestLoggerLayer.layer(service_fn(echo_request_id));
        let response = service.oneshot(Request::new(())).await.unwrap();

        let header =
            response.headers().get(REQUEST_ID_HEADER).unwrap().to_str().unwrap().to_string();
        assert!(Uuid::parse_str(&header).is_ok());
        assert_eq!(response.body(), &header);
    }

    #[tokio::test]
    async fn test_propagates_request_id() {
        let service = RequestLoggerLayer.layer(service_fn(echo_request_id));
        let request = Request::builder().header(REQUEST_ID_HEADER, "abc-123").body(()).unwrap();
        let response = service.oneshot(request).await.unwrap();

        assert_eq!(response.headers().get(REQUEST_ID_HEADER).unwrap(), "abc-123");
        assert_eq!(response.body(), "abc-123");
    }
}
