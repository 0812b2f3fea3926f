//! Async HTTP client wrapping reqwest.
//!
//! Not a browser, just HTTP requests. Documents are fetched by rotating through
//! a fixed list of header profiles until one gets a 2xx; JSON endpoints are
//! fetched once with the first profile.

use crate::types::{CloneError, CloneResult};
use serde::de::DeserializeOwned;
use std::time::Duration;
use tracing::{debug, warn};

/// A complete set of request headers impersonating one kind of client.
#[derive(Debug, Clone, Copy)]
pub struct HeaderProfile {
    pub name: &'static str,
    pub user_agent: &'static str,
    pub accept: &'static str,
    pub accept_language: &'static str,
}

/// Tried in order; the first 2xx wins.
pub const HEADER_PROFILES: [HeaderProfile; 3] = [
    HeaderProfile {
        name: "browser",
        user_agent: "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) \
                     AppleWebKit/537.36 (KHTML, like Gecko) \
                     Chrome/131.0.0.0 Safari/537.36",
        accept: "text/html,application/xhtml+xml,application/xml;q=0.9,image/avif,image/webp,*/*;q=0.8",
        accept_language: "en-US,en;q=0.9",
    },
    HeaderProfile {
        name: "search-crawler",
        user_agent: "Mozilla/5.0 (compatible; Googlebot/2.1; +http://www.google.com/bot.html)",
        accept: "text/html,application/xhtml+xml,*/*;q=0.8",
        accept_language: "en",
    },
    HeaderProfile {
        name: "social-preview",
        user_agent: "facebookexternalhit/1.1 (+http://www.facebook.com/externalhit_uatext.php)",
        accept: "*/*",
        accept_language: "en",
    },
];

/// A successfully fetched document.
#[derive(Debug, Clone)]
pub struct FetchedDocument {
    /// Requested URL.
    pub url: String,
    /// Final URL after redirects.
    pub final_url: String,
    /// HTTP status code.
    pub status: u16,
    /// Content-Type header, if any.
    pub content_type: Option<String>,
    /// Response body as text.
    pub body: String,
    /// Name of the header profile that got through.
    pub profile: &'static str,
}

/// HTTP client for the fetch layer.
#[derive(Clone)]
pub struct HttpClient {
    client: reqwest::Client,
    timeout: Duration,
}

impl HttpClient {
    /// Create a client that follows redirects and applies `timeout_ms` per request.
    pub fn new(timeout_ms: u64) -> Self {
        let timeout = Duration::from_millis(timeout_ms);
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .redirect(reqwest::redirect::Policy::limited(10))
            .build()
            .unwrap_or_default();
        Self { client, timeout }
    }

    /// GET `url` with each header profile in turn.
    ///
    /// Fails with [`CloneError::FetchBlocked`] only after every profile was rejected
    /// (non-2xx status, transport error or an unreadable body).
    pub async fn fetch_document(&self, url: &str) -> CloneResult<FetchedDocument> {
        for profile in HEADER_PROFILES.iter() {
            match self.get_with_profile(url, profile).await {
                Ok(resp) if resp.status().is_success() => {
                    let status = resp.status().as_u16();
                    let final_url = resp.url().to_string();
                    let content_type = resp
                        .headers()
                        .get(reqwest::header::CONTENT_TYPE)
                        .and_then(|v| v.to_str().ok())
                        .map(|s| s.to_string());
                    let body = match resp.text().await {
                        Ok(body) => body,
                        Err(e) => {
                            warn!("{} profile body read failed for {url}: {e}", profile.name);
                            continue;
                        }
                    };
                    debug!("fetched {url} with {} profile ({} bytes)", profile.name, body.len());
                    return Ok(FetchedDocument {
                        url: url.to_string(),
                        final_url,
                        status,
                        content_type,
                        body,
                        profile: profile.name,
                    });
                }
                Ok(resp) => {
                    debug!("{} profile rejected for {url}: HTTP {}", profile.name, resp.status());
                }
                Err(e) => {
                    debug!("{} profile failed for {url}: {e}", profile.name);
                }
            }
        }
        Err(CloneError::FetchBlocked {
            url: url.to_string(),
        })
    }

    /// GET a JSON endpoint. Any non-2xx response or undecodable body yields `Ok(None)`.
    pub async fn get_json<T: DeserializeOwned>(&self, url: &str) -> CloneResult<Option<T>> {
        let resp = self
            .client
            .get(url)
            .header(reqwest::header::USER_AGENT, HEADER_PROFILES[0].user_agent)
            .header(reqwest::header::ACCEPT, "application/json")
            .timeout(self.timeout)
            .send()
            .await?;

        if !resp.status().is_success() {
            debug!("{url} answered HTTP {}", resp.status());
            return Ok(None);
        }

        let body = resp.text().await?;
        match serde_json::from_str::<T>(&body) {
            Ok(value) => Ok(Some(value)),
            Err(e) => {
                debug!("{url} returned undecodable JSON: {e}");
                Ok(None)
            }
        }
    }

    /// The underlying reqwest client, for collaborators that POST.
    pub fn inner(&self) -> &reqwest::Client {
        &self.client
    }

    async fn get_with_profile(
        &self,
        url: &str,
        profile: &HeaderProfile,
    ) -> Result<reqwest::Response, reqwest::Error> {
        self.client
            .get(url)
            .header(reqwest::header::USER_AGENT, profile.user_agent)
            .header(reqwest::header::ACCEPT, profile.accept)
            .header(reqwest::header::ACCEPT_LANGUAGE, profile.accept_language)
            .timeout(self.timeout)
            .send()
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[test]
    fn test_profiles_are_distinct() {
        let agents: std::collections::HashSet<_> =
            HEADER_PROFILES.iter().map(|p| p.user_agent).collect();
        assert_eq!(agents.len(), HEADER_PROFILES.len());
        assert_eq!(HEADER_PROFILES[0].name, "browser");
    }

    #[tokio::test]
    async fn test_falls_through_to_crawler_profile() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/"))
            .and(header("user-agent", HEADER_PROFILES[1].user_agent))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html>ok</html>"))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/"))
            .respond_with(ResponseTemplate::new(403))
            .mount(&server)
            .await;

        let client = HttpClient::new(5000);
        let doc = client.fetch_document(&format!("{}/", server.uri())).await.unwrap();
        assert_eq!(doc.profile, "search-crawler");
        assert!(doc.body.contains("ok"));
    }

    #[tokio::test]
    async fn test_all_profiles_rejected_is_fetch_blocked() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(403))
            .expect(3)
            .mount(&server)
            .await;

        let client = HttpClient::new(5000);
        let err = client
            .fetch_document(&format!("{}/page", server.uri()))
            .await
            .unwrap_err();
        assert!(matches!(err, CloneError::FetchBlocked { .. }));
    }

    /// Raw HTTP server whose first `truncated` connections announce a longer
    /// body than they send before hanging up.
    async fn truncating_server(truncated: usize) -> std::net::SocketAddr {
        use tokio::io::{AsyncReadExt, AsyncWriteExt};

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let mut served = 0;
            while let Ok((mut socket, _)) = listener.accept().await {
                let mut buf = vec![0u8; 8192];
                let _ = socket.read(&mut buf).await;
                let response = if served < truncated {
                    "HTTP/1.1 200 OK\r\ncontent-type: text/html\r\ncontent-length: 4096\r\n\r\n<html>cut"
                } else {
                    "HTTP/1.1 200 OK\r\ncontent-type: text/html\r\ncontent-length: 15\r\nconnection: close\r\n\r\n<html>ok</html>"
                };
                served += 1;
                let _ = socket.write_all(response.as_bytes()).await;
                let _ = socket.shutdown().await;
            }
        });
        addr
    }

    #[tokio::test]
    async fn test_truncated_body_falls_through_to_next_profile() {
        let addr = truncating_server(1).await;
        let client = HttpClient::new(5000);
        let doc = client.fetch_document(&format!("http://{addr}/")).await.unwrap();
        assert_eq!(doc.profile, "search-crawler");
        assert_eq!(doc.body, "<html>ok</html>");
    }

    #[tokio::test]
    async fn test_truncated_body_on_every_profile_is_fetch_blocked() {
        let addr = truncating_server(HEADER_PROFILES.len()).await;
        let client = HttpClient::new(5000);
        let err = client
            .fetch_document(&format!("http://{addr}/"))
            .await
            .unwrap_err();
        assert!(matches!(err, CloneError::FetchBlocked { .. }));
    }

    #[tokio::test]
    async fn test_get_json_non_success_is_none() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/missing.json"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let client = HttpClient::new(5000);
        let value: Option<serde_json::Value> = client
            .get_json(&format!("{}/missing.json", server.uri()))
            .await
            .unwrap();
        assert!(value.is_none());
    }
}
