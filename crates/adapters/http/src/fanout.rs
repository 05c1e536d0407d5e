//! HTTP fan-out worker — delivers dispatched requests to every enabled
//! target.
//!
//! The gateway loop hands requests over a channel and never waits; a
//! background task appends the action path to each target's base URL,
//! sends, and logs the response status. Nothing flows back into the
//! automation state.

use feedgate_domain::script::HttpMethod;
use tokio::sync::mpsc;

use crate::config::{TargetConfig, TargetError};

/// User agent presented to the targets.
const USER_AGENT: &str = concat!("feedgate/", env!("CARGO_PKG_VERSION"));

/// One dispatched request, before fan-out.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpRequest {
    pub method: HttpMethod,
    /// Action path, appended to every target's base URL.
    pub path: String,
    /// JSON body; empty means no body.
    pub body: String,
}

#[derive(Debug, Clone)]
struct Target {
    name: String,
    base: String,
}

/// Handle to the fan-out worker.
#[derive(Debug, Clone)]
pub struct HttpFanout {
    requests: mpsc::UnboundedSender<HttpRequest>,
    names: Vec<String>,
}

impl HttpFanout {
    /// Validate the targets and spawn the worker task.
    ///
    /// Disabled targets are kept out of the fan-out set entirely.
    ///
    /// # Errors
    ///
    /// Returns [`TargetError`] when an enabled target URL is malformed.
    pub fn spawn(configs: &[TargetConfig]) -> Result<Self, TargetError> {
        let mut targets = Vec::new();
        for config in configs.iter().filter(|c| c.enabled) {
            config.base_url()?;
            targets.push(Target {
                name: config.name.clone(),
                base: config.url.trim_end_matches('/').to_string(),
            });
        }
        let names = targets.iter().map(|t| t.name.clone()).collect();

        let (tx, rx) = mpsc::unbounded_channel();
        tokio::spawn(run(targets, rx));
        Ok(Self {
            requests: tx,
            names,
        })
    }

    /// Queue a request for delivery; never blocks.
    pub fn send(&self, request: HttpRequest) {
        if self.requests.send(request).is_err() {
            tracing::warn!("http fan-out worker gone, request dropped");
        }
    }

    /// Names of the enabled targets, for the console's `list targets`.
    #[must_use]
    pub fn target_names(&self) -> &[String] {
        &self.names
    }
}

async fn run(targets: Vec<Target>, mut requests: mpsc::UnboundedReceiver<HttpRequest>) {
    let client = match reqwest::Client::builder().user_agent(USER_AGENT).build() {
        Ok(client) => client,
        Err(err) => {
            tracing::error!(%err, "http client construction failed");
            return;
        }
    };

    while let Some(request) = requests.recv().await {
        tracing::info!(
            method = %request.method,
            path = %request.path,
            body_bytes = request.body.len(),
            "http dispatch"
        );
        for target in &targets {
            deliver(&client, target, &request).await;
        }
    }
}

async fn deliver(client: &reqwest::Client, target: &Target, request: &HttpRequest) {
    let url = format!("{}{}", target.base, request.path);
    let mut builder = client
        .request(to_method(request.method), &url)
        .header(reqwest::header::ACCEPT, "application/json, text/plain");
    if !request.body.is_empty() {
        builder = builder
            .header(reqwest::header::CONTENT_TYPE, "application/json")
            .body(request.body.clone());
    }

    tracing::debug!(target = target.name, %url, "sending request");
    match builder.send().await {
        Ok(response) => {
            let status = response.status();
            if status.is_success() {
                tracing::info!(target = target.name, %status, "http response");
            } else {
                tracing::error!(target = target.name, %status, "http response");
            }
        }
        Err(err) => {
            tracing::error!(target = target.name, %url, %err, "http request failed");
        }
    }
}

fn to_method(method: HttpMethod) -> reqwest::Method {
    match method {
        HttpMethod::Get => reqwest::Method::GET,
        HttpMethod::Post => reqwest::Method::POST,
        HttpMethod::Put => reqwest::Method::PUT,
        HttpMethod::Delete => reqwest::Method::DELETE,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    fn target(name: &str, url: &str, enabled: bool) -> TargetConfig {
        TargetConfig {
            name: name.to_string(),
            url: url.to_string(),
            enabled,
        }
    }

    #[tokio::test]
    async fn should_skip_disabled_targets() {
        let fanout = HttpFanout::spawn(&[
            target("on", "http://localhost:1/api", true),
            target("off", "http://localhost:2/api", false),
        ])
        .unwrap();
        assert_eq!(fanout.target_names(), ["on"]);
    }

    #[tokio::test]
    async fn should_reject_invalid_enabled_target() {
        let result = HttpFanout::spawn(&[target("broken", "::nope::", true)]);
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn should_not_validate_disabled_targets() {
        let result = HttpFanout::spawn(&[target("broken", "::nope::", false)]);
        assert!(result.unwrap().target_names().is_empty());
    }

    #[tokio::test]
    async fn should_post_body_to_target() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        let fanout =
            HttpFanout::spawn(&[target("local", &format!("http://{addr}/api"), true)]).unwrap();
        fanout.send(HttpRequest {
            method: HttpMethod::Post,
            path: "/results".to_string(),
            body: r#"{"v":42}"#.to_string(),
        });

        let (mut stream, _) = listener.accept().await.unwrap();
        let mut raw = vec![0u8; 2048];
        let n = stream.read(&mut raw).await.unwrap();
        let text = String::from_utf8_lossy(&raw[..n]).into_owned();
        stream
            .write_all(b"HTTP/1.1 204 No Content\r\ncontent-length: 0\r\n\r\n")
            .await
            .unwrap();

        assert!(text.starts_with("POST /api/results HTTP/1.1"));
        assert!(text.contains("content-type: application/json"));
        assert!(text.contains(r#"{"v":42}"#));
    }

    #[tokio::test]
    async fn should_send_get_without_body() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        let fanout =
            HttpFanout::spawn(&[target("local", &format!("http://{addr}"), true)]).unwrap();
        fanout.send(HttpRequest {
            method: HttpMethod::Get,
            path: "/health".to_string(),
            body: String::new(),
        });

        let (mut stream, _) = listener.accept().await.unwrap();
        let mut raw = vec![0u8; 2048];
        let n = stream.read(&mut raw).await.unwrap();
        let text = String::from_utf8_lossy(&raw[..n]).into_owned();
        stream
            .write_all(b"HTTP/1.1 200 OK\r\ncontent-length: 0\r\n\r\n")
            .await
            .unwrap();

        assert!(text.starts_with("GET /health HTTP/1.1"));
        assert!(!text.contains("content-type"));
    }
}
