use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, Response, StatusCode};
use secrecy::{ExposeSecret, SecretString};
use serde_json::Value;
use staywise_core::config::ProviderConfig;
use staywise_core::errors::{upstream_message, UpstreamEndpoint};
use staywise_core::{PlaceQuery, RateSearchRequest, SearchError};
use tracing::{debug, warn};

pub const API_KEY_HEADER: &str = "X-API-Key";

/// Place lookup and rate search, the two provider calls the tools make.
#[async_trait]
pub trait HotelDataClient: Send + Sync {
    /// Returns the provider envelope (`{ data: [...] }`) verbatim.
    async fn lookup_places(&self, query: &PlaceQuery) -> Result<Value, SearchError>;

    /// Returns the provider response verbatim on 2xx.
    async fn search_rates(&self, request: &RateSearchRequest) -> Result<Value, SearchError>;
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Route {
    /// Provider paths with the API key attached.
    Direct,
    /// `/api/hotels/*` on our own server, which injects the key.
    SameOrigin,
}

#[derive(Clone, Debug)]
pub struct HttpHotelDataClient {
    http: Client,
    base_url: String,
    api_key: Option<SecretString>,
    route: Route,
}

impl HttpHotelDataClient {
    pub fn direct(base_url: impl Into<String>, api_key: SecretString) -> Self {
        Self {
            http: Client::new(),
            base_url: trim_base(base_url.into()),
            api_key: Some(api_key),
            route: Route::Direct,
        }
    }

    pub fn same_origin(base_url: impl Into<String>) -> Self {
        Self {
            http: Client::new(),
            base_url: trim_base(base_url.into()),
            api_key: None,
            route: Route::SameOrigin,
        }
    }

    /// Direct client for the configured provider. A missing key is a
    /// configuration failure.
    pub fn from_config(config: &ProviderConfig) -> Result<Self, SearchError> {
        let api_key = config
            .require_api_key()
            .map_err(|error| SearchError::Configuration(error.to_string()))?
            .clone();
        Self::direct(config.base_url.clone(), api_key)
            .with_timeout(Duration::from_secs(config.timeout_secs))
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Result<Self, SearchError> {
        self.http = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|error| SearchError::Configuration(format!("http client: {error}")))?;
        Ok(self)
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn places_url(&self) -> String {
        match self.route {
            Route::Direct => format!("{}/data/places", self.base_url),
            Route::SameOrigin => format!("{}/api/hotels/places", self.base_url),
        }
    }

    fn rates_url(&self) -> String {
        match self.route {
            Route::Direct => format!("{}/hotels/rates", self.base_url),
            Route::SameOrigin => format!("{}/api/hotels/rates", self.base_url),
        }
    }

    fn authorize(&self, builder: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.api_key {
            Some(key) => builder.header(API_KEY_HEADER, key.expose_secret()),
            None => builder,
        }
    }
}

#[async_trait]
impl HotelDataClient for HttpHotelDataClient {
    async fn lookup_places(&self, query: &PlaceQuery) -> Result<Value, SearchError> {
        let url = self.places_url();
        debug!(event_name = "provider.places.request", url = %url, text_query = %query.text_query);

        let response = self
            .authorize(self.http.get(&url).query(&query.to_pairs()))
            .send()
            .await
            .map_err(transport_error)?;

        let status = response.status();
        debug!(event_name = "provider.places.response", status = status.as_u16());
        read_json(response, UpstreamEndpoint::Places, |status| {
            format!("API returned {}: {}", status.as_u16(), status.canonical_reason().unwrap_or(""))
        })
        .await
    }

    async fn search_rates(&self, request: &RateSearchRequest) -> Result<Value, SearchError> {
        let url = self.rates_url();
        debug!(
            event_name = "provider.rates.request",
            url = %url,
            selector = request.location.kind(),
            rooms = request.occupancies.len(),
            checkin = %request.checkin,
            checkout = %request.checkout
        );

        let response = self
            .authorize(self.http.post(&url).json(request))
            .send()
            .await
            .map_err(transport_error)?;

        let status = response.status();
        debug!(event_name = "provider.rates.response", status = status.as_u16());
        read_json(response, UpstreamEndpoint::Rates, |status| {
            format!("Request failed with status {}", status.as_u16())
        })
        .await
    }
}

async fn read_json(
    response: Response,
    endpoint: UpstreamEndpoint,
    fallback: impl FnOnce(StatusCode) -> String,
) -> Result<Value, SearchError> {
    let status = response.status();
    let body = response.text().await.map_err(transport_error)?;

    if !status.is_success() {
        let message = upstream_message(endpoint, &body, || fallback(status));
        warn!(
            event_name = "provider.upstream_error",
            status = status.as_u16(),
            message = %message
        );
        return Err(SearchError::Upstream { status: status.as_u16(), message });
    }

    serde_json::from_str(&body).map_err(|error| {
        SearchError::Transport(format!("provider returned a body that is not JSON: {error}"))
    })
}

fn transport_error(error: reqwest::Error) -> SearchError {
    warn!(event_name = "provider.transport_error", error = %error);
    SearchError::Transport(error.to_string())
}

fn trim_base(base_url: String) -> String {
    base_url.trim_end_matches('/').to_string()
}
