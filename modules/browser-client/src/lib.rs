pub mod error;

pub use error::{BrowserError, Result};

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// An interaction performed against an element ref from the last snapshot.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum Action {
    Click {
        #[serde(rename = "ref")]
        element: String,
    },
    Type {
        #[serde(rename = "ref")]
        element: String,
        text: String,
    },
    Scroll {
        direction: String,
        amount: u32,
    },
    Wait {
        #[serde(rename = "timeMs", skip_serializing_if = "Option::is_none")]
        time_ms: Option<u64>,
        #[serde(skip_serializing_if = "Option::is_none")]
        text: Option<String>,
    },
}

#[derive(Debug, Deserialize)]
struct SnapshotResponse {
    snapshot: String,
}

#[derive(Debug, Deserialize)]
struct ScreenshotResponse {
    data: String,
}

/// Client for a single browser session exposed over HTTP.
///
/// The server owns the browser; every call acts on its one active tab, so
/// callers must await each call before issuing the next.
pub struct BrowserClient {
    client: reqwest::Client,
    base_url: String,
    token: Option<String>,
}

impl BrowserClient {
    pub fn new(base_url: &str, token: Option<&str>) -> Result<Self> {
        Self::with_timeout(base_url, token, Duration::from_secs(30))
    }

    pub fn with_timeout(base_url: &str, token: Option<&str>, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            token: token.map(String::from),
        })
    }

    fn endpoint(&self, path: &str) -> String {
        let mut endpoint = format!("{}/{}", self.base_url, path);
        if let Some(ref token) = self.token {
            endpoint.push_str(&format!("?token={token}"));
        }
        endpoint
    }

    async fn check(resp: reqwest::Response) -> Result<reqwest::Response> {
        let status = resp.status();
        if !status.is_success() {
            let message = resp.text().await.unwrap_or_default();
            return Err(BrowserError::Api {
                status: status.as_u16(),
                message,
            });
        }
        Ok(resp)
    }

    /// Load a URL in the active tab.
    pub async fn navigate(&self, url: &str) -> Result<()> {
        tracing::debug!(url, "Browser navigate");

        let resp = self
            .client
            .post(self.endpoint("navigate"))
            .json(&serde_json::json!({ "url": url }))
            .send()
            .await?;
        Self::check(resp).await?;
        Ok(())
    }

    /// Text rendering of the page's accessibility tree, refs included.
    pub async fn snapshot(&self, interactive: bool, max_chars: Option<usize>) -> Result<String> {
        let mut query: Vec<(&str, String)> = vec![
            ("format", "ai".to_string()),
            ("interactive", interactive.to_string()),
        ];
        if let Some(max) = max_chars {
            query.push(("maxChars", max.to_string()));
        }

        let resp = self
            .client
            .get(self.endpoint("snapshot"))
            .query(&query)
            .send()
            .await?;
        let body: SnapshotResponse = Self::check(resp).await?.json().await?;

        tracing::debug!(chars = body.snapshot.chars().count(), "Browser snapshot");
        Ok(body.snapshot)
    }

    pub async fn act(&self, action: &Action) -> Result<()> {
        tracing::debug!(?action, "Browser act");

        let resp = self
            .client
            .post(self.endpoint("act"))
            .json(action)
            .send()
            .await?;
        Self::check(resp).await?;
        Ok(())
    }

    /// PNG screenshot of the viewport, base64-encoded.
    pub async fn screenshot(&self) -> Result<String> {
        let resp = self
            .client
            .post(self.endpoint("screenshot"))
            .json(&serde_json::json!({ "type": "png" }))
            .send()
            .await?;
        let body: ScreenshotResponse = Self::check(resp).await?.json().await?;
        Ok(body.data)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_json, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[test]
    fn test_action_wire_format() {
        let click = serde_json::to_value(Action::Click {
            element: "e12".into(),
        })
        .unwrap();
        assert_eq!(click, serde_json::json!({"kind": "click", "ref": "e12"}));

        let wait = serde_json::to_value(Action::Wait {
            time_ms: Some(1500),
            text: None,
        })
        .unwrap();
        assert_eq!(wait, serde_json::json!({"kind": "wait", "timeMs": 1500}));
    }

    #[tokio::test]
    async fn test_snapshot_passes_options_and_token() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/snapshot"))
            .and(query_param("token", "secret"))
            .and(query_param("interactive", "true"))
            .and(query_param("maxChars", "20000"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(serde_json::json!({"snapshot": "- button \"Message\" [ref=e5]"})),
            )
            .mount(&server)
            .await;

        let client = BrowserClient::new(&server.uri(), Some("secret")).unwrap();
        let text = client.snapshot(true, Some(20_000)).await.unwrap();
        assert!(text.contains("[ref=e5]"));
    }

    #[tokio::test]
    async fn test_act_posts_tagged_action() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/act"))
            .and(body_json(serde_json::json!({"kind": "type", "ref": "e7", "text": "hi"})))
            .respond_with(ResponseTemplate::new(200))
            .expect(1)
            .mount(&server)
            .await;

        let client = BrowserClient::new(&server.uri(), None).unwrap();
        client
            .act(&Action::Type {
                element: "e7".into(),
                text: "hi".into(),
            })
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_navigate_maps_server_errors() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/navigate"))
            .respond_with(ResponseTemplate::new(502).set_body_string("tab crashed"))
            .mount(&server)
            .await;

        let client = BrowserClient::new(&server.uri(), None).unwrap();
        let err = client.navigate("https://www.instagram.com/").await.unwrap_err();
        match err {
            BrowserError::Api { status, message } => {
                assert_eq!(status, 502);
                assert_eq!(message, "tab crashed");
            }
            other => panic!("expected Api error, got {other:?}"),
        }
    }
}
