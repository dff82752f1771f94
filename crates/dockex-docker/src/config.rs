use std::path::PathBuf;

use url::Host;

use crate::error::{DockerError, Result};

pub const DEFAULT_DOCKER_HOST: &str = "unix:///var/run/docker.sock";
pub const DEFAULT_API_VERSION: &str = "1.41";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DockerConfig {
    pub host: String,
    pub api_version: String,
}

impl Default for DockerConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_DOCKER_HOST.to_string(),
            api_version: DEFAULT_API_VERSION.to_string(),
        }
    }
}

impl DockerConfig {
    /// Reads `DOCKER_HOST` and `DOCKER_API_VERSION`, falling back to the
    /// local socket and the default API version.
    pub fn from_env() -> Self {
        let host = non_empty_env("DOCKER_HOST").unwrap_or_else(|| DEFAULT_DOCKER_HOST.to_string());
        let api_version = non_empty_env("DOCKER_API_VERSION")
            .unwrap_or_else(|| DEFAULT_API_VERSION.to_string());

        Self {
            host,
            api_version: normalize_api_version(&api_version),
        }
    }

    pub fn endpoint(&self) -> Result<DockerEndpoint> {
        DockerEndpoint::parse(&self.host)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DockerEndpoint {
    Unix(PathBuf),
    Tcp { host: String, port: u16 },
}

impl DockerEndpoint {
    pub fn parse(host: &str) -> Result<Self> {
        let trimmed = host.trim();
        if trimmed.is_empty() {
            return Err(DockerError::InvalidHost(host.to_string()));
        }

        let url = url::Url::parse(trimmed).map_err(|_| DockerError::InvalidHost(host.to_string()))?;
        match url.scheme() {
            "unix" => {
                let path = url.path();
                if path.is_empty() || path == "/" {
                    return Err(DockerError::InvalidHost(host.to_string()));
                }
                Ok(Self::Unix(PathBuf::from(path)))
            }
            "tcp" | "http" => {
                // IPv6 literals are stored without brackets so they resolve.
                let host_name = match url.host() {
                    Some(Host::Domain(domain)) if !domain.is_empty() => domain.to_string(),
                    Some(Host::Ipv4(addr)) => addr.to_string(),
                    Some(Host::Ipv6(addr)) => addr.to_string(),
                    _ => return Err(DockerError::InvalidHost(host.to_string())),
                };
                Ok(Self::Tcp {
                    host: host_name,
                    port: url.port().unwrap_or(2375),
                })
            }
            _ => Err(DockerError::InvalidHost(host.to_string())),
        }
    }

    /// Value for the `Host` header. The daemon ignores it on unix sockets.
    pub fn authority(&self) -> String {
        match self {
            Self::Unix(_) => "docker".to_string(),
            Self::Tcp { host, port } => format!("{}:{port}", bracketed(host)),
        }
    }
}

fn bracketed(host: &str) -> String {
    if host.contains(':') {
        format!("[{host}]")
    } else {
        host.to_string()
    }
}

impl std::fmt::Display for DockerEndpoint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Unix(path) => write!(f, "unix://{}", path.display()),
            Self::Tcp { host, port } => write!(f, "tcp://{}:{port}", bracketed(host)),
        }
    }
}

pub fn normalize_api_version(version: &str) -> String {
    version.trim().trim_start_matches(['v', 'V']).to_string()
}

fn non_empty_env(key: &str) -> Option<String> {
    std::env::var(key)
        .ok()
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}
