//! Sandboxed I/O for node processors
//!
//! The concrete sandboxing policy (allowed paths, allowed hosts, timeouts)
//! is supplied by the host; the contract only requires that calls be
//! awaitable and that failures surface as typed errors rather than silent
//! `None`.

use std::path::{Path, PathBuf};
use std::time::Duration;

use async_trait::async_trait;
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};

use crate::error::{EngineError, Result};

static HTTP_CLIENT: Lazy<reqwest::Client> = Lazy::new(reqwest::Client::new);

/// Response of a sandboxed HTTP request
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HttpResponse {
    pub status: u16,
    pub body: String,
}

/// Host-supplied I/O surface for node processors
#[async_trait]
pub trait SandboxedIo: Send + Sync {
    /// Read a file as UTF-8 text
    async fn read_file(&self, path: &Path) -> Result<String>;

    /// Write UTF-8 text to a file
    async fn write_file(&self, path: &Path, contents: &str) -> Result<()>;

    /// Perform an outbound HTTP request
    async fn http_request(
        &self,
        method: &str,
        url: &str,
        body: Option<serde_json::Value>,
    ) -> Result<HttpResponse>;
}

/// Sandbox policy for [`HostIo`]
///
/// Deny-by-default: an empty allow-list denies everything.
#[derive(Debug, Clone, Default)]
pub struct SandboxPolicy {
    /// File access is confined to these directory roots
    pub allowed_roots: Vec<PathBuf>,
    /// Outbound HTTP is confined to these hosts
    pub allowed_hosts: Vec<String>,
    /// Timeout applied to each outbound request
    pub request_timeout: Option<Duration>,
}

impl SandboxPolicy {
    /// Allow file access under a directory root
    pub fn allow_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.allowed_roots.push(root.into());
        self
    }

    /// Allow outbound HTTP to a host
    pub fn allow_host(mut self, host: impl Into<String>) -> Self {
        self.allowed_hosts.push(host.into());
        self
    }

    /// Set the outbound request timeout
    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = Some(timeout);
        self
    }

    fn path_allowed(&self, path: &Path) -> bool {
        self.allowed_roots.iter().any(|root| path.starts_with(root))
    }

    fn host_allowed(&self, url: &str) -> bool {
        let Some(host) = url
            .strip_prefix("https://")
            .or_else(|| url.strip_prefix("http://"))
            .and_then(|rest| rest.split(['/', ':']).next())
        else {
            return false;
        };
        self.allowed_hosts.iter().any(|allowed| allowed == host)
    }
}

/// Policy-checked I/O implementation backed by tokio and reqwest
pub struct HostIo {
    policy: SandboxPolicy,
}

impl HostIo {
    /// Create a host I/O surface with the given policy
    pub fn new(policy: SandboxPolicy) -> Self {
        Self { policy }
    }
}

#[async_trait]
impl SandboxedIo for HostIo {
    async fn read_file(&self, path: &Path) -> Result<String> {
        if !self.policy.path_allowed(path) {
            return Err(EngineError::IoDenied {
                operation: "read".to_string(),
                target: path.display().to_string(),
            });
        }
        Ok(tokio::fs::read_to_string(path).await?)
    }

    async fn write_file(&self, path: &Path, contents: &str) -> Result<()> {
        if !self.policy.path_allowed(path) {
            return Err(EngineError::IoDenied {
                operation: "write".to_string(),
                target: path.display().to_string(),
            });
        }
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        Ok(tokio::fs::write(path, contents).await?)
    }

    async fn http_request(
        &self,
        method: &str,
        url: &str,
        body: Option<serde_json::Value>,
    ) -> Result<HttpResponse> {
        if !self.policy.host_allowed(url) {
            return Err(EngineError::IoDenied {
                operation: format!("http {}", method),
                target: url.to_string(),
            });
        }

        let method: reqwest::Method = method
            .parse()
            .map_err(|_| EngineError::Http(format!("invalid method '{}'", method)))?;

        let mut request = HTTP_CLIENT.request(method, url);
        if let Some(timeout) = self.policy.request_timeout {
            request = request.timeout(timeout);
        }
        if let Some(body) = body {
            request = request.json(&body);
        }

        let response = request
            .send()
            .await
            .map_err(|e| EngineError::Http(e.to_string()))?;
        let status = response.status().as_u16();
        let body = response
            .text()
            .await
            .map_err(|e| EngineError::Http(e.to_string()))?;

        Ok(HttpResponse { status, body })
    }
}

/// I/O surface that denies every operation
///
/// The default for executions whose host supplied no policy.
pub struct DenyAllIo;

#[async_trait]
impl SandboxedIo for DenyAllIo {
    async fn read_file(&self, path: &Path) -> Result<String> {
        Err(EngineError::IoDenied {
            operation: "read".to_string(),
            target: path.display().to_string(),
        })
    }

    async fn write_file(&self, path: &Path, _contents: &str) -> Result<()> {
        Err(EngineError::IoDenied {
            operation: "write".to_string(),
            target: path.display().to_string(),
        })
    }

    async fn http_request(
        &self,
        method: &str,
        url: &str,
        _body: Option<serde_json::Value>,
    ) -> Result<HttpResponse> {
        Err(EngineError::IoDenied {
            operation: format!("http {}", method),
            target: url.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_read_write_within_root() {
        let dir = tempfile::tempdir().unwrap();
        let io = HostIo::new(SandboxPolicy::default().allow_root(dir.path()));

        let path = dir.path().join("notes.txt");
        io.write_file(&path, "hello").await.unwrap();
        assert_eq!(io.read_file(&path).await.unwrap(), "hello");
    }

    #[tokio::test]
    async fn test_read_outside_root_denied() {
        let dir = tempfile::tempdir().unwrap();
        let io = HostIo::new(SandboxPolicy::default().allow_root(dir.path()));

        let err = io.read_file(Path::new("/etc/hosts")).await.unwrap_err();
        assert!(matches!(err, EngineError::IoDenied { .. }));
    }

    #[tokio::test]
    async fn test_http_host_not_allowed() {
        let io = HostIo::new(SandboxPolicy::default());
        let err = io
            .http_request("GET", "https://example.com/data", None)
            .await
            .unwrap_err();
        assert!(matches!(err, EngineError::IoDenied { .. }));
    }

    #[test]
    fn test_host_matching() {
        let policy = SandboxPolicy::default().allow_host("api.example.com");
        assert!(policy.host_allowed("https://api.example.com/v1/items"));
        assert!(policy.host_allowed("http://api.example.com:8080/v1"));
        assert!(!policy.host_allowed("https://evil.example.com/"));
        assert!(!policy.host_allowed("ftp://api.example.com/"));
    }
}
