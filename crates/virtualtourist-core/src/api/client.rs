//! API client for the Flickr REST API.
//!
//! This module provides the `FlickrClient` struct for searching photos
//! near a coordinate and downloading the image bodies.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, Url};
use tracing::debug;

use crate::fetch::PhotoSource;
use crate::models::{PhotoRef, SearchResponse};

use super::ApiError;

// ============================================================================
// Constants
// ============================================================================

/// Base URL for the REST endpoints
const API_BASE_URL: &str = "https://www.flickr.com/services/rest";

/// Host serving the static image files, prefixed with `farm<n>.`
const STATIC_HOST: &str = "staticflickr.com";

const SEARCH_METHOD: &str = "flickr.photos.search";

/// Default HTTP request timeout in seconds.
/// Applies to every request, so a stalled download fails its slot instead
/// of holding the whole batch.
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;

/// API client for Flickr.
/// Clone is cheap - reqwest::Client uses Arc internally for connection pooling.
#[derive(Clone)]
pub struct FlickrClient {
    client: Client,
    api_key: String,
    base_url: String,
    /// Overrides the per-farm static host when set
    static_base: Option<String>,
}

impl FlickrClient {
    /// Create a new API client with the default timeout
    pub fn new(api_key: impl Into<String>) -> Result<Self, ApiError> {
        Self::with_timeout(api_key, Duration::from_secs(DEFAULT_REQUEST_TIMEOUT_SECS))
    }

    pub fn with_timeout(api_key: impl Into<String>, timeout: Duration) -> Result<Self, ApiError> {
        let client = Client::builder().timeout(timeout).build()?;

        Ok(Self {
            client,
            api_key: api_key.into(),
            base_url: API_BASE_URL.to_string(),
            static_base: None,
        })
    }

    /// Point the client at a different REST endpoint (proxies, test servers)
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// Serve image downloads from `static_base` instead of the farm hosts
    pub fn with_static_base_url(mut self, static_base: impl Into<String>) -> Self {
        self.static_base = Some(static_base.into().trim_end_matches('/').to_string());
        self
    }

    /// Build the search URL for a coordinate
    pub fn search_url(&self, latitude: f64, longitude: f64) -> Result<Url, ApiError> {
        let params = [
            ("method", SEARCH_METHOD.to_string()),
            ("format", "json".to_string()),
            ("nojsoncallback", "1".to_string()),
            ("api_key", self.api_key.clone()),
            ("lat", latitude.to_string()),
            ("lon", longitude.to_string()),
        ];
        Url::parse_with_params(&self.base_url, &params)
            .map_err(|e| ApiError::InvalidResponse(format!("Invalid search URL: {}", e)))
    }

    /// Build the static image URL for a candidate
    pub fn photo_url(&self, photo: &PhotoRef) -> String {
        let host = match &self.static_base {
            Some(base) => base.clone(),
            None => format!("https://farm{}.{}", photo.farm, STATIC_HOST),
        };
        format!("{}/{}/{}_{}.jpg", host, photo.server, photo.id, photo.secret)
    }

    /// Check if response is successful, returning an error with body if not.
    async fn check_response(response: reqwest::Response) -> Result<reqwest::Response, ApiError> {
        if response.status().is_success() {
            Ok(response)
        } else {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            Err(ApiError::from_status(status, &body))
        }
    }

    /// Turn a decoded search envelope into the candidate list
    fn candidates_from(response: SearchResponse) -> Result<Vec<PhotoRef>, ApiError> {
        if response.stat.as_deref() == Some("fail") {
            return Err(ApiError::Remote {
                code: response.code.unwrap_or_default(),
                message: response.message.unwrap_or_default(),
            });
        }
        response
            .photos
            .map(|page| page.photo)
            .ok_or_else(|| ApiError::InvalidResponse("Missing photos in search response".to_string()))
    }
}

#[async_trait]
impl PhotoSource for FlickrClient {
    async fn search(&self, latitude: f64, longitude: f64) -> Result<Vec<PhotoRef>, ApiError> {
        let url = self.search_url(latitude, longitude)?;

        let response = self.client.get(url).send().await?;
        let response = Self::check_response(response).await?;

        let text = response.text().await?;
        let parsed: SearchResponse = serde_json::from_str(&text)
            .map_err(|e| ApiError::InvalidResponse(format!("Failed to parse search response: {}", e)))?;

        let candidates = Self::candidates_from(parsed)?;
        debug!(latitude, longitude, count = candidates.len(), "Search returned candidates");
        Ok(candidates)
    }

    async fn download(&self, photo: &PhotoRef) -> Result<Vec<u8>, ApiError> {
        let url = self.photo_url(photo);

        let response = self.client.get(&url).send().await?;
        let response = Self::check_response(response).await?;

        let bytes = response.bytes().await?;
        Ok(bytes.to_vec())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    use crate::fetch::{is_placeholder, PhotoFetcher};
    use crate::models::SearchPage;

    /// How a local test server answers each connection
    #[derive(Clone)]
    enum Reply {
        Respond(String),
        /// Read the request and never answer
        Hang,
    }

    /// Serve `reply` on an ephemeral local port, returning its base URL
    async fn serve(reply: Reply) -> String {
        let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
        let addr = listener.local_addr().expect("local addr");
        tokio::spawn(async move {
            loop {
                let Ok((mut socket, _)) = listener.accept().await else {
                    return;
                };
                let reply = reply.clone();
                tokio::spawn(async move {
                    let mut buf = [0u8; 4096];
                    match reply {
                        Reply::Respond(response) => {
                            let _ = socket.read(&mut buf).await;
                            let _ = socket.write_all(response.as_bytes()).await;
                            let _ = socket.shutdown().await;
                        }
                        Reply::Hang => {
                            // Keep the socket open until the client gives up
                            while let Ok(n) = socket.read(&mut buf).await {
                                if n == 0 {
                                    break;
                                }
                            }
                        }
                    }
                });
            }
        });
        format!("http://{}", addr)
    }

    fn http_response(status: &str, content_type: &str, body: &str) -> Reply {
        Reply::Respond(format!(
            "HTTP/1.1 {}\r\nContent-Type: {}\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
            status,
            content_type,
            body.len(),
            body
        ))
    }

    fn local_client(base: &str, timeout: Duration) -> FlickrClient {
        FlickrClient::with_timeout("abc123", timeout)
            .expect("client")
            .with_base_url(format!("{}/services/rest", base))
            .with_static_base_url(base)
    }

    fn photo_ref() -> PhotoRef {
        PhotoRef {
            id: "53330219451".to_string(),
            secret: "9f3bb4f9b1".to_string(),
            server: "65535".to_string(),
            farm: 66,
        }
    }

    #[test]
    fn test_photo_url() {
        let client = FlickrClient::new("abc123").expect("client");
        assert_eq!(
            client.photo_url(&photo_ref()),
            "https://farm66.staticflickr.com/65535/53330219451_9f3bb4f9b1.jpg"
        );

        let client = client.with_static_base_url("http://127.0.0.1:8080/");
        assert_eq!(
            client.photo_url(&photo_ref()),
            "http://127.0.0.1:8080/65535/53330219451_9f3bb4f9b1.jpg"
        );
    }

    #[test]
    fn test_search_url_carries_query_parameters() {
        let client = FlickrClient::new("abc123").expect("client");
        let url = client.search_url(37.7749, -122.4194).expect("url");

        assert_eq!(url.host_str(), Some("www.flickr.com"));
        assert_eq!(url.path(), "/services/rest");

        let pairs: Vec<(String, String)> = url
            .query_pairs()
            .map(|(k, v)| (k.into_owned(), v.into_owned()))
            .collect();
        let get = |key: &str| {
            pairs
                .iter()
                .find(|(k, _)| k == key)
                .map(|(_, v)| v.as_str())
        };
        assert_eq!(get("method"), Some("flickr.photos.search"));
        assert_eq!(get("format"), Some("json"));
        assert_eq!(get("nojsoncallback"), Some("1"));
        assert_eq!(get("api_key"), Some("abc123"));
        assert_eq!(get("lat"), Some("37.7749"));
        assert_eq!(get("lon"), Some("-122.4194"));
    }

    #[test]
    fn test_candidates_from_ok() {
        let response = SearchResponse {
            stat: Some("ok".to_string()),
            photos: Some(SearchPage { photo: vec![photo_ref()] }),
            code: None,
            message: None,
        };
        let candidates = FlickrClient::candidates_from(response).expect("candidates");
        assert_eq!(candidates, vec![photo_ref()]);
    }

    #[test]
    fn test_candidates_from_fail() {
        let response = SearchResponse {
            stat: Some("fail".to_string()),
            photos: None,
            code: Some(100),
            message: Some("Invalid API Key".to_string()),
        };
        match FlickrClient::candidates_from(response) {
            Err(ApiError::Remote { code, message }) => {
                assert_eq!(code, 100);
                assert_eq!(message, "Invalid API Key");
            }
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[test]
    fn test_candidates_from_missing_page() {
        let response = SearchResponse {
            stat: Some("ok".to_string()),
            photos: None,
            code: None,
            message: None,
        };
        assert!(matches!(
            FlickrClient::candidates_from(response),
            Err(ApiError::InvalidResponse(_))
        ));
    }

    #[tokio::test]
    async fn test_search_over_http() {
        let body = r#"{"photos":{"photo":[{"id":"53330219451","secret":"9f3bb4f9b1","server":"65535","farm":66}]},"stat":"ok"}"#;
        let base = serve(http_response("200 OK", "application/json", body)).await;
        let client = local_client(&base, Duration::from_secs(5));

        let candidates = client.search(37.7749, -122.4194).await.expect("search");
        assert_eq!(candidates, vec![photo_ref()]);
    }

    #[tokio::test]
    async fn test_search_server_error_status() {
        let base = serve(http_response("500 Internal Server Error", "text/plain", "oops")).await;
        let client = local_client(&base, Duration::from_secs(5));

        match client.search(1.0, 2.0).await {
            Err(ApiError::ServerError(body)) => assert_eq!(body, "oops"),
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_search_malformed_body() {
        let base = serve(http_response("200 OK", "application/json", "{not json")).await;
        let client = local_client(&base, Duration::from_secs(5));

        match client.search(1.0, 2.0).await {
            Err(ApiError::InvalidResponse(message)) => {
                assert!(message.starts_with("Failed to parse search response"));
            }
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_download_over_http() {
        let base = serve(http_response("200 OK", "image/jpeg", "bytes")).await;
        let client = local_client(&base, Duration::from_secs(5));

        let body = client.download(&photo_ref()).await.expect("download");
        assert_eq!(body, b"bytes");
    }

    #[tokio::test]
    async fn test_download_not_found_status() {
        let base = serve(http_response("404 Not Found", "text/plain", "")).await;
        let client = local_client(&base, Duration::from_secs(5));

        assert!(matches!(
            client.download(&photo_ref()).await,
            Err(ApiError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_stalled_download_times_out() {
        let base = serve(Reply::Hang).await;
        let client = local_client(&base, Duration::from_millis(100));

        let started = std::time::Instant::now();
        match client.download(&photo_ref()).await {
            Err(ApiError::NetworkError(e)) => assert!(e.is_timeout(), "not a timeout: {e}"),
            other => panic!("unexpected result: {other:?}"),
        }
        assert!(started.elapsed() < Duration::from_secs(5));
    }

    #[tokio::test]
    async fn test_stalled_download_becomes_placeholder_slot() {
        let base = serve(Reply::Hang).await;
        let client = local_client(&base, Duration::from_millis(100));
        let fetcher = PhotoFetcher::new(Arc::new(client));

        let images = fetcher
            .download_batch(vec![photo_ref()])
            .await
            .expect("batch");
        assert_eq!(images.len(), 1);
        assert!(is_placeholder(&images[0]));
    }
}
