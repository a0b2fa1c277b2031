//! JSON-over-HTTP cluster client.
//!
//! One HTTP/1.1 connection per call, bounded by the caller's timeout.

use std::time::Duration;

use bytes::Bytes;
use http_body_util::{BodyExt, Empty};
use http::{Method, Request, StatusCode};
use hyper_util::rt::TokioIo;
use serde::Deserialize;
use serde::de::DeserializeOwned;
use tracing::debug;

use sweep_core::{MembershipPage, UpgradeState};

use crate::client::{ClusterClient, ClusterFuture};
use crate::error::{ClusterError, ClusterResult, RemovalError};

const USER_AGENT: &str = "nodesweep/0.1";

#[derive(Debug, Deserialize)]
struct UpgradeProgress {
    state: UpgradeState,
}

/// Cluster client for the control-plane REST API.
#[derive(Debug, Clone)]
pub struct HttpClusterClient {
    /// `host:port` of the control plane.
    address: String,
}

impl HttpClusterClient {
    /// Create a client for `host:port`. A leading `http://` and trailing
    /// slashes are accepted and stripped.
    pub fn new(address: impl Into<String>) -> Self {
        let address = address.into();
        let address = address
            .trim()
            .trim_start_matches("http://")
            .trim_end_matches('/')
            .to_string();
        Self { address }
    }

    pub fn address(&self) -> &str {
        &self.address
    }

    async fn call(
        &self,
        method: Method,
        path: &str,
        timeout: Duration,
    ) -> ClusterResult<(StatusCode, Bytes)> {
        match tokio::time::timeout(timeout, self.exchange(method, path)).await {
            Ok(result) => result,
            Err(_) => {
                debug!(address = %self.address, %path, "cluster call timed out");
                Err(ClusterError::Timeout(timeout))
            }
        }
    }

    async fn exchange(&self, method: Method, path: &str) -> ClusterResult<(StatusCode, Bytes)> {
        let stream = tokio::net::TcpStream::connect(self.address.as_str())
            .await
            .map_err(|e| transport("connect", e))?;

        let io = TokioIo::new(stream);
        let (mut sender, conn) = hyper::client::conn::http1::handshake(io)
            .await
            .map_err(|e| transport("handshake", e))?;

        // Drive the connection in the background.
        tokio::spawn(async move {
            let _ = conn.await;
        });

        let req = Request::builder()
            .method(method)
            .uri(path)
            .header("host", self.address.as_str())
            .header("user-agent", USER_AGENT)
            .header("accept", "application/json")
            .body(Empty::<Bytes>::new())
            .map_err(|e| transport("request", e))?;

        let resp = sender
            .send_request(req)
            .await
            .map_err(|e| transport("send", e))?;
        let status = resp.status();
        let body = resp
            .into_body()
            .collect()
            .await
            .map_err(|e| transport("body", e))?
            .to_bytes();

        debug!(address = %self.address, %path, %status, "cluster call completed");
        Ok((status, body))
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        path: &str,
        timeout: Duration,
    ) -> ClusterResult<T> {
        let (status, body) = self.call(Method::GET, path, timeout).await?;
        if !status.is_success() {
            return Err(ClusterError::Transport(format!(
                "GET {path} returned {status}"
            )));
        }
        serde_json::from_slice(&body).map_err(|e| transport("decode", e))
    }
}

impl ClusterClient for HttpClusterClient {
    fn query_membership_page<'a>(
        &'a self,
        token: Option<&'a str>,
        timeout: Duration,
    ) -> ClusterFuture<'a, ClusterResult<MembershipPage>> {
        Box::pin(async move {
            let path = match token {
                Some(token) => format!(
                    "/api/v1/nodes?continuation_token={}",
                    encode_component(token)
                ),
                None => "/api/v1/nodes".to_string(),
            };
            self.get_json::<MembershipPage>(&path, timeout).await
        })
    }

    fn query_upgrade_state(
        &self,
        timeout: Duration,
    ) -> ClusterFuture<'_, ClusterResult<UpgradeState>> {
        Box::pin(async move {
            let progress: UpgradeProgress =
                self.get_json("/api/v1/cluster/upgrade", timeout).await?;
            Ok(progress.state)
        })
    }

    fn remove_node_record<'a>(
        &'a self,
        name: &'a str,
        timeout: Duration,
    ) -> ClusterFuture<'a, Result<(), RemovalError>> {
        Box::pin(async move {
            let path = format!("/api/v1/nodes/{}/state", encode_component(name));
            let (status, body) = self.call(Method::DELETE, &path, timeout).await?;

            if status.is_success() {
                return Ok(());
            }

            let detail = String::from_utf8_lossy(&body).trim().to_string();
            let detail = if detail.is_empty() {
                status.to_string()
            } else {
                format!("{status}: {detail}")
            };

            Err(match status {
                StatusCode::NOT_FOUND => RemovalError::NotFound(name.to_string()),
                StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
                    RemovalError::PermissionDenied(detail)
                }
                _ => RemovalError::Transport(detail),
            })
        })
    }
}

fn transport(stage: &str, err: impl std::fmt::Display) -> ClusterError {
    ClusterError::Transport(format!("{stage}: {err}"))
}

/// Percent-encode a path segment or query value.
fn encode_component(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for b in raw.bytes() {
        match b {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'.' | b'_' | b'~' => {
                out.push(b as char)
            }
            _ => out.push_str(&format!("%{b:02X}")),
        }
    }
    out
}
