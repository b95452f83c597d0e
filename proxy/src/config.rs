use std::{env, net::SocketAddr};

use thiserror::Error;

pub const DEFAULT_BACKEND_URL: &str = "http://52.3.42.186";
pub const DEFAULT_ADDR: &str = "0.0.0.0:3000";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid PROXY_ADDR {value:?}: {source}")]
    Addr {
        value: String,
        source: std::net::AddrParseError,
    },
}

#[derive(Debug, Clone)]
pub struct ProxyConfig {
    pub backend_base_url: String,
    pub bind_addr: SocketAddr,
}

impl ProxyConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        let backend_base_url = env::var("BACKEND_BASE_URL")
            .ok()
            .filter(|v| !v.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_BACKEND_URL.to_string());
        let addr = env::var("PROXY_ADDR").unwrap_or_else(|_| DEFAULT_ADDR.to_string());
        let bind_addr = addr.parse().map_err(|source| ConfigError::Addr {
            value: addr.clone(),
            source,
        })?;

        Ok(Self {
            backend_base_url: backend_base_url.trim_end_matches('/').to_string(),
            bind_addr,
        })
    }
}
