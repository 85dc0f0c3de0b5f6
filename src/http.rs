//! HTTP client for the openrouteservice directions API.
//!
//! One POST per route with:
//! - API key in the `Authorization` header
//! - Whole-request timeout from [`RoutingConfig::timeout_secs`]
//! - Retry with exponential backoff on 429 and transport errors

use std::time::{Duration, Instant};

use log::{debug, info, warn};
use reqwest::{Client, StatusCode};
use serde_json::Value;

use crate::error::RoutingError;
use crate::routing::{parse_route_response, route_request_body, service_error_message, RouteGeometry, RoutingConfig};
use crate::GpsPoint;

/// Delay before retry number `attempt` (1-based).
///
/// Rate-limited responses back off 500ms, 1s, 2s, 4s; transport errors
/// 400ms, 800ms, 1.6s, 3.2s. Both cap at the fourth step.
pub fn retry_backoff(attempt: u32, rate_limited: bool) -> Duration {
    let step = attempt.saturating_sub(1).min(3);
    if rate_limited {
        Duration::from_millis(500 * (1 << step))
    } else {
        Duration::from_millis(400 * (1 << step))
    }
}

/// Fetches driving routes between two points.
pub struct RouteFetcher {
    client: Client,
    config: RoutingConfig,
}

impl RouteFetcher {
    /// Create a fetcher. Fails if no API key is configured.
    pub fn new(config: RoutingConfig) -> Result<Self, RoutingError> {
        if config.api_key.trim().is_empty() {
            return Err(RoutingError::MissingApiKey);
        }

        let client = Client::builder()
            .tcp_keepalive(Duration::from_secs(30))
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self { client, config })
    }

    pub fn config(&self) -> &RoutingConfig {
        &self.config
    }

    /// Fetch the driving route from `origin` to `destination`.
    pub async fn fetch_route(
        &self,
        origin: &GpsPoint,
        destination: &GpsPoint,
    ) -> Result<RouteGeometry, RoutingError> {
        let body = route_request_body(origin, destination);
        let mut retries = 0;
        let req_start = Instant::now();

        loop {
            let response = self
                .client
                .post(&self.config.endpoint)
                .header("Authorization", &self.config.api_key)
                .header("Accept", "application/json, application/geo+json")
                .json(&body)
                .send()
                .await;

            match response {
                Ok(resp) => {
                    let status = resp.status();

                    if status == StatusCode::TOO_MANY_REQUESTS {
                        retries += 1;
                        if retries > self.config.max_retries {
                            return Err(RoutingError::Status {
                                status: status.as_u16(),
                                message: "Max retries exceeded (429)".to_string(),
                            });
                        }
                        let wait = retry_backoff(retries, true);
                        warn!("[RouteFetcher] 429 Too Many Requests, retry {} with {:?} backoff", retries, wait);
                        tokio::time::sleep(wait).await;
                        continue;
                    }

                    let text = resp.text().await?;
                    debug!("[RouteFetcher] HTTP {} with {} byte body after {:?}", status, text.len(), req_start.elapsed());

                    if !status.is_success() {
                        let message = serde_json::from_str::<Value>(&text)
                            .ok()
                            .and_then(|v| v.get("error").map(service_error_message))
                            .unwrap_or_else(|| status.canonical_reason().unwrap_or("request failed").to_string());
                        warn!("[RouteFetcher] HTTP {}: {}", status, message);
                        return Err(RoutingError::Status { status: status.as_u16(), message });
                    }

                    let route = parse_route_response(&text)?;
                    info!(
                        "[RouteFetcher] Route with {} points, {:.0}m in {:?}",
                        route.points.len(),
                        route.distance_meters,
                        req_start.elapsed()
                    );
                    return Ok(route);
                }
                Err(e) => {
                    retries += 1;
                    if retries > self.config.max_retries {
                        return Err(e.into());
                    }
                    let wait = retry_backoff(retries, false);
                    warn!("[RouteFetcher] Error: {}, retry {} after {:?}", e, retries, wait);
                    tokio::time::sleep(wait).await;
                }
            }
        }
    }
}

/// Blocking wrapper for FFI and non-async hosts - runs the fetch on a
/// single-threaded tokio runtime.
pub fn fetch_route_sync(
    config: RoutingConfig,
    origin: GpsPoint,
    destination: GpsPoint,
) -> Result<RouteGeometry, RoutingError> {
    use tokio::runtime::Builder;

    let rt = Builder::new_current_thread()
        .enable_all()
        .build()
        .map_err(|e| RoutingError::Runtime(e.to_string()))?;

    let fetcher = RouteFetcher::new(config)?;
    rt.block_on(fetcher.fetch_route(&origin, &destination))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::{TcpListener, TcpStream};

    const ROUTE_BODY: &str = r#"{"features":[{"geometry":{"coordinates":[[13.405,52.52],[13.3777,52.5165]]},"properties":{"summary":{"distance":2300.5,"duration":310.0}}}]}"#;

    /// Serve `responses` in order, one per connection, and count requests.
    async fn scripted_endpoint(responses: Vec<(u16, &'static str)>) -> (String, Arc<AtomicUsize>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let hits = Arc::new(AtomicUsize::new(0));

        let counter = hits.clone();
        tokio::spawn(async move {
            for (status, body) in responses {
                let Ok((mut stream, _)) = listener.accept().await else {
                    return;
                };
                read_request(&mut stream).await;
                counter.fetch_add(1, Ordering::SeqCst);
                let response = format!(
                    "HTTP/1.1 {} Scripted\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                    status,
                    body.len(),
                    body
                );
                let _ = stream.write_all(response.as_bytes()).await;
                let _ = stream.shutdown().await;
            }
        });

        (format!("http://{}/v2/directions/driving-car/geojson", addr), hits)
    }

    /// Read one request: headers, then `Content-Length` bytes of body.
    async fn read_request(stream: &mut TcpStream) {
        let mut buf = Vec::new();
        let mut chunk = [0u8; 1024];
        loop {
            let n = stream.read(&mut chunk).await.unwrap_or(0);
            if n == 0 {
                return;
            }
            buf.extend_from_slice(&chunk[..n]);
            let text = String::from_utf8_lossy(&buf);
            if let Some(header_end) = text.find("\r\n\r\n") {
                let content_length = text[..header_end]
                    .lines()
                    .filter_map(|line| line.split_once(':'))
                    .find(|(name, _)| name.eq_ignore_ascii_case("content-length"))
                    .and_then(|(_, value)| value.trim().parse::<usize>().ok())
                    .unwrap_or(0);
                if buf.len() >= header_end + 4 + content_length {
                    return;
                }
            }
        }
    }

    fn local_config(endpoint: String, max_retries: u32) -> RoutingConfig {
        RoutingConfig {
            endpoint,
            api_key: "test-key".to_string(),
            timeout_secs: 5,
            max_retries,
        }
    }

    async fn fetch(config: RoutingConfig) -> Result<RouteGeometry, RoutingError> {
        RouteFetcher::new(config)
            .unwrap()
            .fetch_route(&GpsPoint::new(52.52, 13.405), &GpsPoint::new(52.5165, 13.3777))
            .await
    }

    #[test]
    fn test_retry_backoff() {
        assert_eq!(retry_backoff(1, true), Duration::from_millis(500));
        assert_eq!(retry_backoff(2, true), Duration::from_millis(1000));
        assert_eq!(retry_backoff(4, true), Duration::from_millis(4000));
        assert_eq!(retry_backoff(9, true), Duration::from_millis(4000));
        assert_eq!(retry_backoff(1, false), Duration::from_millis(400));
        assert_eq!(retry_backoff(3, false), Duration::from_millis(1600));
    }

    #[test]
    fn test_missing_api_key() {
        let result = RouteFetcher::new(RoutingConfig::default());
        assert!(matches!(result, Err(RoutingError::MissingApiKey)));

        let blank = RoutingConfig { api_key: "   ".to_string(), ..RoutingConfig::default() };
        assert!(matches!(RouteFetcher::new(blank), Err(RoutingError::MissingApiKey)));
    }

    #[tokio::test]
    async fn test_unreachable_endpoint_reports_http_error() {
        let config = RoutingConfig {
            endpoint: "http://127.0.0.1:9/v2/directions/driving-car/geojson".to_string(),
            api_key: "test-key".to_string(),
            timeout_secs: 5,
            max_retries: 0,
        };
        let fetcher = RouteFetcher::new(config).unwrap();
        let result = fetcher
            .fetch_route(&GpsPoint::new(52.52, 13.405), &GpsPoint::new(52.5165, 13.3777))
            .await;
        assert!(matches!(result, Err(RoutingError::Http(_))));
    }

    #[tokio::test]
    async fn test_rate_limited_requests_are_retried() {
        let (endpoint, hits) = scripted_endpoint(vec![
            (429, r#"{"error":"Rate limit exceeded"}"#),
            (429, r#"{"error":"Rate limit exceeded"}"#),
            (200, ROUTE_BODY),
        ])
        .await;

        let route = fetch(local_config(endpoint, 3)).await.unwrap();
        assert_eq!(hits.load(Ordering::SeqCst), 3);
        assert_eq!(route.points.len(), 2);
        assert_eq!(route.distance_meters, 2300.5);
    }

    #[tokio::test]
    async fn test_rate_limit_gives_up_after_max_retries() {
        let (endpoint, hits) = scripted_endpoint(vec![
            (429, r#"{"error":"Rate limit exceeded"}"#),
            (429, r#"{"error":"Rate limit exceeded"}"#),
            (200, ROUTE_BODY),
        ])
        .await;

        let result = fetch(local_config(endpoint, 1)).await;
        assert!(matches!(result, Err(RoutingError::Status { status: 429, .. })));
        assert_eq!(hits.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_error_status_is_not_retried() {
        let (endpoint, hits) = scripted_endpoint(vec![
            (400, r#"{"error":{"code":2010,"message":"Could not find routable point"}}"#),
            (200, ROUTE_BODY),
        ])
        .await;

        match fetch(local_config(endpoint, 3)).await {
            Err(RoutingError::Status { status, message }) => {
                assert_eq!(status, 400);
                assert!(message.contains("Could not find routable point"));
            }
            other => panic!("unexpected result: {:?}", other),
        }
        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }
}
