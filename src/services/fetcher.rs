use std::future::Future;
use std::time::Duration;

use reqwest::Client;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::config::FetcherSettings;

/// Errors that can occur while fetching a page
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("HTTP request failed: {0}")]
    RequestError(#[from] reqwest::Error),

    #[error("Upstream returned {status} for {url}")]
    Status { url: String, status: u16 },

    #[error("Invalid response format: {0}")]
    InvalidResponse(String),
}

/// Something that turns a URL into rendered markup
pub trait PageFetcher: Send + Sync {
    fn fetch(&self, url: &str) -> impl Future<Output = Result<String, FetchError>> + Send;
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum RenderBackend {
    /// Plain GET of the page, no script execution
    Direct,
    /// Headless rendering service reached over HTTP
    Service { endpoint: String },
}

/// Job posted to the rendering service
#[derive(Debug, Serialize)]
struct RenderJob<'a> {
    url: &'a str,
    wait_until: &'a str,
    delay_before_return_html: f64,
}

/// Reply of the rendering service
#[derive(Debug, Default, Deserialize)]
struct RenderReply {
    #[serde(default)]
    html: Option<String>,
    #[serde(default)]
    markdown: Option<String>,
}

impl RenderReply {
    /// HTML when present, the markdown rendering otherwise
    fn into_markup(self) -> String {
        match self.html.filter(|html| !html.is_empty()) {
            Some(html) => html,
            None => self.markdown.unwrap_or_default(),
        }
    }
}

/// Page fetcher backed by a rendering service, or by plain HTTP when no
/// service is configured
///
/// Every call opens its own session; nothing is pooled between calls.
#[derive(Debug, Clone)]
pub struct RenderClient {
    backend: RenderBackend,
    wait_until: String,
    settle_delay: Duration,
    timeout: Option<Duration>,
    user_agent: String,
}

impl RenderClient {
    pub fn new(settings: &FetcherSettings) -> Self {
        let backend = match settings.render_endpoint.as_deref().map(str::trim) {
            Some(endpoint) if !endpoint.is_empty() => RenderBackend::Service {
                endpoint: endpoint.to_string(),
            },
            _ => RenderBackend::Direct,
        };

        Self {
            backend,
            wait_until: settings.wait_until.clone(),
            // negative or NaN delays mean no delay
            settle_delay: Duration::try_from_secs_f64(settings.settle_delay_secs).unwrap_or(Duration::ZERO),
            timeout: settings.timeout_secs.map(Duration::from_secs),
            user_agent: settings.user_agent.clone(),
        }
    }

    fn open_session(&self) -> Result<RenderSession<'_>, FetchError> {
        let mut builder = Client::builder().user_agent(self.user_agent.as_str());
        if let Some(timeout) = self.timeout {
            builder = builder.timeout(timeout);
        }

        tracing::trace!("Opening render session");
        Ok(RenderSession {
            client: builder.build()?,
            owner: self,
        })
    }
}

impl PageFetcher for RenderClient {
    async fn fetch(&self, url: &str) -> Result<String, FetchError> {
        let session = self.open_session()?;
        let markup = session.render(url).await;
        drop(session);
        markup
    }
}

/// One rendering session, torn down on drop
struct RenderSession<'a> {
    client: Client,
    owner: &'a RenderClient,
}

impl RenderSession<'_> {
    async fn render(&self, url: &str) -> Result<String, FetchError> {
        match &self.owner.backend {
            RenderBackend::Direct => self.get(url).await,
            RenderBackend::Service { endpoint } => self.render_remote(endpoint, url).await,
        }
    }

    async fn get(&self, url: &str) -> Result<String, FetchError> {
        tracing::debug!("Fetching page: {}", url);

        let response = self.client.get(url).send().await?;
        let status = response.status();
        if status.is_client_error() {
            // Error pages are markup too; a missing player parses to nothing
            tracing::debug!("Upstream returned {} for {}, using its body", status, url);
        } else if !status.is_success() {
            return Err(FetchError::Status {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        Ok(response.text().await?)
    }

    async fn render_remote(&self, endpoint: &str, url: &str) -> Result<String, FetchError> {
        tracing::debug!("Rendering page via {}: {}", endpoint, url);

        let job = RenderJob {
            url,
            wait_until: &self.owner.wait_until,
            delay_before_return_html: self.owner.settle_delay.as_secs_f64(),
        };

        let response = self.client.post(endpoint).json(&job).send().await?;
        if !response.status().is_success() {
            return Err(FetchError::Status {
                url: url.to_string(),
                status: response.status().as_u16(),
            });
        }

        let reply: RenderReply = response
            .json()
            .await
            .map_err(|e| FetchError::InvalidResponse(format!("Failed to parse render reply: {}", e)))?;

        Ok(reply.into_markup())
    }
}

impl Drop for RenderSession<'_> {
    fn drop(&mut self) {
        tracing::trace!("Closing render session");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn settings(render_endpoint: Option<String>) -> FetcherSettings {
        FetcherSettings {
            render_endpoint,
            ..FetcherSettings::default()
        }
    }

    #[test]
    fn test_backend_selection() {
        assert_eq!(RenderClient::new(&settings(None)).backend, RenderBackend::Direct);
        assert_eq!(
            RenderClient::new(&settings(Some("  ".to_string()))).backend,
            RenderBackend::Direct
        );
        assert_eq!(
            RenderClient::new(&settings(Some(" http://render:11235/crawl ".to_string()))).backend,
            RenderBackend::Service {
                endpoint: "http://render:11235/crawl".to_string()
            }
        );
    }

    #[test]
    fn test_reply_falls_back_to_markdown() {
        let reply = RenderReply {
            html: Some(String::new()),
            markdown: Some("# page".to_string()),
        };
        assert_eq!(reply.into_markup(), "# page");
        assert_eq!(RenderReply::default().into_markup(), "");
    }

    #[tokio::test]
    async fn test_direct_fetch_returns_body() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/p/1/gac-history/")
            .with_status(200)
            .with_body("<html>history</html>")
            .create_async()
            .await;

        let client = RenderClient::new(&settings(None));
        let html = client
            .fetch(&format!("{}/p/1/gac-history/", server.url()))
            .await
            .unwrap();

        assert_eq!(html, "<html>history</html>");
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_direct_fetch_server_error_status() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/down")
            .with_status(503)
            .create_async()
            .await;

        let client = RenderClient::new(&settings(None));
        let err = client
            .fetch(&format!("{}/down", server.url()))
            .await
            .unwrap_err();

        assert!(matches!(err, FetchError::Status { status: 503, .. }));
    }

    #[tokio::test]
    async fn test_direct_fetch_client_error_keeps_body() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/p/999/gac-history/")
            .with_status(404)
            .with_body("<html><body>Player not found</body></html>")
            .create_async()
            .await;

        let client = RenderClient::new(&settings(None));
        let html = client
            .fetch(&format!("{}/p/999/gac-history/", server.url()))
            .await
            .unwrap();

        assert_eq!(html, "<html><body>Player not found</body></html>");
    }

    #[test]
    fn test_unrepresentable_settle_delay_does_not_panic() {
        for delay in [f64::INFINITY, f64::NAN, -1.0, 1e30] {
            let client = RenderClient::new(&FetcherSettings {
                settle_delay_secs: delay,
                ..FetcherSettings::default()
            });
            assert_eq!(client.settle_delay, Duration::ZERO, "delay {}", delay);
        }
    }

    #[tokio::test]
    async fn test_render_service_job_and_reply() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/render")
            .match_body(mockito::Matcher::PartialJson(serde_json::json!({
                "url": "https://swgoh.gg/p/1/gac-history/",
                "wait_until": "networkidle",
                "delay_before_return_html": 2.0,
            })))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"html": "<div id=\"battles-attack\"></div>"}"#)
            .create_async()
            .await;

        let client = RenderClient::new(&settings(Some(format!("{}/render", server.url()))));
        let html = client.fetch("https://swgoh.gg/p/1/gac-history/").await.unwrap();

        assert_eq!(html, r#"<div id="battles-attack"></div>"#);
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_render_service_bad_reply() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/render")
            .with_status(200)
            .with_body("not json")
            .create_async()
            .await;

        let client = RenderClient::new(&settings(Some(format!("{}/render", server.url()))));
        let err = client.fetch("https://swgoh.gg/").await.unwrap_err();

        assert!(matches!(err, FetchError::InvalidResponse(_)));
    }
}
