use serde::{Deserialize, Serialize};
use serde_json::Value;

pub const DEFAULT_PLACE_TYPE: &str = "hotel";
pub const DEFAULT_LANGUAGE: &str = "en";

/// Query for the provider's place-lookup endpoint.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlaceQuery {
    pub text_query: String,
    #[serde(default, rename = "type", skip_serializing_if = "Option::is_none")]
    pub place_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub language: Option<String>,
    #[serde(default, rename = "clientIP", skip_serializing_if = "Option::is_none")]
    pub client_ip: Option<String>,
}

impl PlaceQuery {
    pub fn new(text_query: impl Into<String>) -> Self {
        Self { text_query: text_query.into(), place_type: None, language: None, client_ip: None }
    }

    pub fn with_type(mut self, place_type: impl Into<String>) -> Self {
        self.place_type = Some(place_type.into());
        self
    }

    pub fn with_language(mut self, language: impl Into<String>) -> Self {
        self.language = Some(language.into());
        self
    }

    /// Query-string pairs in provider order; unset optionals are omitted.
    pub fn to_pairs(&self) -> Vec<(&'static str, String)> {
        let mut pairs = vec![("textQuery", self.text_query.clone())];
        if let Some(place_type) = self.place_type.as_ref().filter(|value| !value.is_empty()) {
            pairs.push(("type", place_type.clone()));
        }
        if let Some(language) = self.language.as_ref().filter(|value| !value.is_empty()) {
            pairs.push(("language", language.clone()));
        }
        if let Some(client_ip) = self.client_ip.as_ref().filter(|value| !value.is_empty()) {
            pairs.push(("clientIP", client_ip.clone()));
        }
        pairs
    }
}

/// Result of resolving a free-text destination into place candidates.
///
/// Stay fields are always present, as `null` when unknown, so the model can see
/// which ones are still missing.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlaceResolution {
    pub query: String,
    pub checkin: Option<String>,
    pub checkout: Option<String>,
    pub adults: Option<u32>,
    pub children: Option<u32>,
    pub places: Vec<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub no_results: bool,
}

impl PlaceResolution {
    /// Place candidates from a provider `{ data: [...] }` envelope; anything
    /// else yields an empty list.
    pub fn places_from_envelope(envelope: &Value) -> Vec<Value> {
        envelope.get("data").and_then(Value::as_array).cloned().unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::{PlaceQuery, PlaceResolution};

    #[test]
    fn query_pairs_skip_unset_values() {
        let query = PlaceQuery::new("Tokyo").with_language("en");
        assert_eq!(
            query.to_pairs(),
            vec![("textQuery", "Tokyo".to_string()), ("language", "en".to_string())]
        );
    }

    #[test]
    fn unknown_stay_fields_serialize_as_null() {
        let resolution = PlaceResolution {
            query: "Kyoto".to_string(),
            checkin: Some("2025-04-01".to_string()),
            checkout: None,
            adults: None,
            children: None,
            places: Vec::new(),
            error: None,
            no_results: true,
        };

        assert_eq!(
            serde_json::to_value(&resolution).unwrap_or_default(),
            json!({
                "query": "Kyoto",
                "checkin": "2025-04-01",
                "checkout": null,
                "adults": null,
                "children": null,
                "places": [],
                "noResults": true
            })
        );
    }

    #[test]
    fn envelope_without_data_array_yields_no_places() {
        assert!(PlaceResolution::places_from_envelope(&json!({ "data": "oops" })).is_empty());
        assert_eq!(
            PlaceResolution::places_from_envelope(&json!({ "data": [{ "placeId": "p1" }] })).len(),
            1
        );
    }
}
