//! Same-origin proxy to the hotel data provider.
//!
//! - `GET  /api/hotels/places`: place lookup, query string forwarded
//! - `POST /api/hotels/rates`: rate search, JSON body forwarded unchanged
//!
//! The provider key is attached here so it never reaches the browser.

use axum::{
    body::Bytes,
    extract::{Query, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Router,
};
use serde::Deserialize;
use serde_json::Value;
use staywise_provider::ProxyResponse;
use tracing::warn;

use crate::bootstrap::AppState;

#[derive(Debug, Default, Deserialize)]
pub struct PlacesParams {
    #[serde(rename = "textQuery")]
    pub text_query: Option<String>,
    #[serde(rename = "type")]
    pub place_type: Option<String>,
    pub language: Option<String>,
    #[serde(rename = "clientIP")]
    pub client_ip: Option<String>,
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/api/hotels/places", get(places))
        .route("/api/hotels/rates", post(rates))
        .with_state(state)
}

pub async fn places(State(state): State<AppState>, Query(params): Query<PlacesParams>) -> Response {
    let response = state
        .proxy
        .forward_places(
            params.text_query.as_deref(),
            params.place_type.as_deref(),
            params.language.as_deref(),
            params.client_ip.as_deref(),
        )
        .await;
    relay(response)
}

pub async fn rates(State(state): State<AppState>, body: Bytes) -> Response {
    let body: Value = match serde_json::from_slice(&body) {
        Ok(body) => body,
        Err(error) => {
            warn!(event_name = "server.hotels.rates.invalid_body", error = %error);
            return relay(ProxyResponse::error(400, format!("invalid JSON body: {error}")));
        }
    };
    relay(state.proxy.forward_rates(&body).await)
}

fn relay(response: ProxyResponse) -> Response {
    let status = StatusCode::from_u16(response.status).unwrap_or(StatusCode::BAD_GATEWAY);
    (status, [(header::CONTENT_TYPE, "application/json")], response.body).into_response()
}
