//! Absolute base URL for same-origin calls made from server-side code.

use crate::config::ServerConfig;

/// The parts of an incoming request that identify its origin.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct RequestOrigin {
    pub forwarded_proto: Option<String>,
    pub forwarded_host: Option<String>,
    pub host: Option<String>,
}

impl RequestOrigin {
    fn origin(&self) -> Option<String> {
        let host = first_value(self.forwarded_host.as_deref())
            .or_else(|| first_value(self.host.as_deref()))?;
        let proto = first_value(self.forwarded_proto.as_deref()).unwrap_or_else(|| {
            if host.starts_with("localhost") || host.starts_with("127.0.0.1") {
                "http".to_string()
            } else {
                "https".to_string()
            }
        });
        Some(format!("{proto}://{host}"))
    }
}

/// Resolution order: configured URL, then the request's origin, then
/// `http://localhost:<port>`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BaseUrlResolver {
    configured: Option<String>,
    port: u16,
}

impl BaseUrlResolver {
    pub fn new(configured: Option<String>, port: u16) -> Self {
        Self { configured: configured.filter(|url| !url.trim().is_empty()), port }
    }

    pub fn from_server_config(server: &ServerConfig) -> Self {
        Self::new(server.public_base_url.clone(), server.port)
    }

    pub fn resolve(&self, request: Option<&RequestOrigin>) -> String {
        let resolved = self
            .configured
            .clone()
            .or_else(|| request.and_then(RequestOrigin::origin))
            .unwrap_or_else(|| format!("http://localhost:{}", self.port));
        resolved.trim_end_matches('/').to_string()
    }
}

// Proxies may append comma-separated hops; the first one is the client-facing value.
fn first_value(header: Option<&str>) -> Option<String> {
    header
        .and_then(|value| value.split(',').next())
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .map(str::to_string)
}
