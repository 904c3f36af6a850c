use std::time::Duration;

use reqwest::Client;
use secrecy::{ExposeSecret, SecretString};
use serde_json::{json, Value};
use staywise_core::config::ProviderConfig;
use staywise_core::domain::places::DEFAULT_LANGUAGE;
use staywise_core::PlaceQuery;
use tracing::{info, warn};

use crate::client::API_KEY_HEADER;

pub const MISSING_KEY_MESSAGE: &str = "provider api key is not configured";

/// Status and body to hand back to the caller unchanged.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ProxyResponse {
    pub status: u16,
    pub body: String,
}

impl ProxyResponse {
    pub fn error(status: u16, message: impl Into<String>) -> Self {
        Self { status, body: json!({ "error": message.into() }).to_string() }
    }
}

/// Forwards place and rate requests to the provider with the key attached.
///
/// Provider responses are relayed byte for byte, including non-2xx statuses.
#[derive(Clone, Debug)]
pub struct UpstreamProxy {
    http: Client,
    base_url: String,
    api_key: Option<SecretString>,
}

impl UpstreamProxy {
    pub fn new(base_url: impl Into<String>, api_key: Option<SecretString>) -> Self {
        Self {
            http: Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: api_key.filter(|key| !key.expose_secret().trim().is_empty()),
        }
    }

    pub fn from_config(config: &ProviderConfig) -> Self {
        let proxy = Self::new(config.base_url.clone(), config.api_key.clone());
        match Client::builder().timeout(Duration::from_secs(config.timeout_secs)).build() {
            Ok(http) => Self { http, ..proxy },
            Err(error) => {
                warn!(event_name = "provider.proxy.client_fallback", error = %error);
                proxy
            }
        }
    }

    pub fn has_api_key(&self) -> bool {
        self.api_key.is_some()
    }

    /// `textQuery` is required; `language` defaults to `en`.
    pub async fn forward_places(
        &self,
        text_query: Option<&str>,
        place_type: Option<&str>,
        language: Option<&str>,
        client_ip: Option<&str>,
    ) -> ProxyResponse {
        let Some(text_query) = text_query.filter(|value| !value.is_empty()) else {
            return ProxyResponse::error(400, "textQuery is required");
        };
        let Some(api_key) = &self.api_key else {
            warn!(event_name = "provider.proxy.missing_key", endpoint = "places");
            return ProxyResponse::error(500, MISSING_KEY_MESSAGE);
        };

        let mut query = PlaceQuery::new(text_query)
            .with_language(language.filter(|value| !value.is_empty()).unwrap_or(DEFAULT_LANGUAGE));
        query.place_type = place_type.filter(|value| !value.is_empty()).map(str::to_string);
        query.client_ip = client_ip.filter(|value| !value.is_empty()).map(str::to_string);

        let request = self
            .http
            .get(format!("{}/data/places", self.base_url))
            .query(&query.to_pairs())
            .header(API_KEY_HEADER, api_key.expose_secret());
        self.relay("places", request).await
    }

    pub async fn forward_rates(&self, body: &Value) -> ProxyResponse {
        let Some(api_key) = &self.api_key else {
            warn!(event_name = "provider.proxy.missing_key", endpoint = "rates");
            return ProxyResponse::error(500, MISSING_KEY_MESSAGE);
        };

        let request = self
            .http
            .post(format!("{}/hotels/rates", self.base_url))
            .header(API_KEY_HEADER, api_key.expose_secret())
            .json(body);
        self.relay("rates", request).await
    }

    async fn relay(&self, endpoint: &'static str, request: reqwest::RequestBuilder) -> ProxyResponse {
        let response = match request.send().await {
            Ok(response) => response,
            Err(error) => {
                warn!(event_name = "provider.proxy.transport_error", endpoint, error = %error);
                return ProxyResponse::error(500, error.to_string());
            }
        };

        let status = response.status().as_u16();
        match response.text().await {
            Ok(body) => {
                info!(event_name = "provider.proxy.relayed", endpoint, status);
                ProxyResponse { status, body }
            }
            Err(error) => {
                warn!(event_name = "provider.proxy.body_error", endpoint, error = %error);
                ProxyResponse::error(500, error.to_string())
            }
        }
    }
}
