use std::{fmt, time::Duration};

use async_trait::async_trait;
use serde_json::{Value, json};
use tracing::debug;
use url::Url;

use super::{DiscoveryClient, ProbeError};

/// `reqwest`-backed discovery client for one backend endpoint.
///
/// Without a timeout a probe waits as long as the backend takes; sweeping a
/// large CIDR can legitimately run for minutes.
#[derive(Clone)]
pub struct HttpDiscoveryClient {
    http: reqwest::Client,
    endpoint: Url,
    timeout: Option<Duration>,
}

impl fmt::Debug for HttpDiscoveryClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HttpDiscoveryClient")
            .field("endpoint", &self.endpoint.as_str())
            .field("timeout", &self.timeout)
            .finish()
    }
}

impl HttpDiscoveryClient {
    pub fn new(
        endpoint: Url,
        timeout: Option<Duration>,
    ) -> Result<Self, ProbeError> {
        let http = reqwest::Client::builder()
            .user_agent(concat!("hostsweep/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|err| ProbeError::Transport(err.to_string()))?;
        Ok(Self::with_client(http, endpoint, timeout))
    }

    pub fn with_client(
        http: reqwest::Client,
        endpoint: Url,
        timeout: Option<Duration>,
    ) -> Self {
        Self {
            http,
            endpoint,
            timeout,
        }
    }
}

#[async_trait]
impl DiscoveryClient for HttpDiscoveryClient {
    async fn probe(&self, target: &str) -> Result<Value, ProbeError> {
        debug!(endpoint = %self.endpoint, target, "sending probe request");

        let mut request = self
            .http
            .post(self.endpoint.clone())
            .json(&json!({ "target": target }));
        if let Some(timeout) = self.timeout {
            request = request.timeout(timeout);
        }

        let response = request
            .send()
            .await
            .map_err(|err| ProbeError::Transport(err.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ProbeError::Status {
                status: status.as_u16(),
                body,
            });
        }

        response
            .json::<Value>()
            .await
            .map_err(|err| ProbeError::Decode(err.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{Json, Router, http::StatusCode, routing::post};
    use tokio::net::TcpListener;

    async fn serve(router: Router) -> Url {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, router).await.unwrap();
        });
        Url::parse(&format!("http://{addr}/pipeline")).unwrap()
    }

    #[tokio::test]
    async fn posts_target_and_decodes_json() {
        let router = Router::new().route(
            "/pipeline",
            post(|Json(body): Json<Value>| async move {
                Json(json!({
                    "alive_hosts": [body["target"].clone()],
                    "count": 1
                }))
            }),
        );
        let client = HttpDiscoveryClient::new(serve(router).await, None).unwrap();

        let response = client.probe("10.1.1.1").await.unwrap();
        assert_eq!(response["alive_hosts"], json!(["10.1.1.1"]));
    }

    #[tokio::test]
    async fn non_success_status_captures_body() {
        let router = Router::new().route(
            "/pipeline",
            post(|| async { (StatusCode::BAD_GATEWAY, "backend down") }),
        );
        let client = HttpDiscoveryClient::new(serve(router).await, None).unwrap();

        let err = client.probe("10.1.1.0/30").await.unwrap_err();
        assert_eq!(
            err,
            ProbeError::Status {
                status: 502,
                body: "backend down".into()
            }
        );
        assert_eq!(err.to_string(), "HTTP 502 backend down");
    }

    #[tokio::test]
    async fn connection_refused_is_transport_error() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let endpoint = Url::parse(&format!("http://{addr}/scan")).unwrap();
        let client =
            HttpDiscoveryClient::new(endpoint, Some(Duration::from_secs(5)))
                .unwrap();
        let err = client.probe("10.0.0.1").await.unwrap_err();
        assert!(matches!(err, ProbeError::Transport(_)));
        assert_eq!(err.status_code(), None);
    }
}
