use std::env;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::path::PathBuf;

use serde::Deserialize;

use crate::ai_generation::config::ENV_PREFIX;
use crate::error::{Result, StudyError};

pub const DEFAULT_ROUTE: &str = "/api/claude";

fn default_host() -> IpAddr {
    IpAddr::V4(Ipv4Addr::UNSPECIFIED)
}

fn default_port() -> u16 {
    3000
}

fn default_route() -> String {
    DEFAULT_ROUTE.to_string()
}

/// Where the proxy listens. Provider settings live in
/// [crate::ai_generation::config::AiGenerationConfig].
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ProxyServerConfig {
    #[serde(default = "default_host")]
    pub host: IpAddr,
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default = "default_route")]
    pub route: String,
    pub log_file: Option<PathBuf>,
}

impl Default for ProxyServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            route: default_route(),
            log_file: None,
        }
    }
}

impl ProxyServerConfig {
    pub fn from_env() -> Result<Self> {
        Self::from_vars(env::vars())
    }

    pub fn from_vars<I>(vars: I) -> Result<Self>
    where
        I: IntoIterator<Item = (String, String)>,
    {
        let mut config: ProxyServerConfig = envy::prefixed(ENV_PREFIX)
            .from_iter(vars)
            .map_err(|err| StudyError::Configuration {
                message: format!("invalid {ENV_PREFIX}* setting: {err}"),
            })?;
        config.route = normalize_route(&config.route);
        Ok(config)
    }

    pub fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }
}

fn normalize_route(route: &str) -> String {
    let route = route.trim().trim_end_matches('/');
    if route.is_empty() {
        default_route()
    } else if route.starts_with('/') {
        route.to_string()
    } else {
        format!("/{route}")
    }
}
