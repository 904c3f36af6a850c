use serde::{Deserialize, Serialize};

use crate::domain::location::{LocationCandidates, LocationSelector};
use crate::errors::ValidationError;

pub const MAX_RESULT_LIMIT: u32 = 5_000;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Occupancy {
    pub adults: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub children: Option<Vec<u8>>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortField {
    TopPicks,
    Price,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortDirection {
    Ascending,
    Descending,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SortCriterion {
    pub field: SortField,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub direction: Option<SortDirection>,
}

/// Optional rate-search filters. Each one reaches the provider only when set,
/// so `false` and `0` are forwarded and unset values never appear.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RateFilters {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_rates_per_hotel: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub board_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub refundable_rates_only: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sort: Option<Vec<SortCriterion>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub room_mapping: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hotel_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub limit: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub offset: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_reviews_count: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_rating: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub zip: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub star_rating: Option<Vec<f64>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hotel_type_ids: Option<Vec<u32>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub chain_ids: Option<Vec<u32>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub facilities: Option<Vec<u32>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub strict_facility_filtering: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stream: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub advanced_accessibility_only: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub feed: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub include_hotel_data: Option<bool>,
}

impl RateFilters {
    pub fn validate(&self) -> Result<(), ValidationError> {
        if let Some(limit) = self.limit {
            if !(1..=MAX_RESULT_LIMIT).contains(&limit) {
                return Err(ValidationError::invalid(
                    "limit",
                    format!("must be between 1 and {MAX_RESULT_LIMIT}"),
                ));
            }
        }
        if let Some(rating) = self.min_rating {
            if !(0.0..=5.0).contains(&rating) {
                return Err(ValidationError::invalid("minRating", "must be between 0 and 5"));
            }
        }
        Ok(())
    }

    // Blank strings count as unset, matching how the provider treats them.
    fn without_blank_strings(mut self) -> Self {
        for field in [&mut self.board_type, &mut self.hotel_name, &mut self.zip, &mut self.feed] {
            if field.as_deref().is_some_and(|value| value.trim().is_empty()) {
                *field = None;
            }
        }
        self
    }
}

/// Rate-search arguments exactly as a caller (usually the model) sends them.
///
/// Nothing here is trusted: [`RateSearchParams::into_request`] validates the
/// required fields and picks the location selector.
#[derive(Clone, Debug, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RateSearchParams {
    #[serde(default)]
    pub hotel_ids: Option<Vec<String>>,
    #[serde(default)]
    pub country_code: Option<String>,
    #[serde(default)]
    pub city_name: Option<String>,
    #[serde(default)]
    pub latitude: Option<f64>,
    #[serde(default)]
    pub longitude: Option<f64>,
    #[serde(default)]
    pub radius: Option<u32>,
    #[serde(default)]
    pub iata_code: Option<String>,
    #[serde(default)]
    pub place_id: Option<String>,
    #[serde(default)]
    pub ai_search: Option<String>,

    #[serde(default)]
    pub occupancies: Option<Vec<Occupancy>>,
    #[serde(default)]
    pub currency: Option<String>,
    #[serde(default)]
    pub guest_nationality: Option<String>,
    #[serde(default)]
    pub checkin: Option<String>,
    #[serde(default)]
    pub checkout: Option<String>,

    #[serde(flatten)]
    pub filters: RateFilters,
}

impl RateSearchParams {
    pub fn location_candidates(&self) -> LocationCandidates {
        LocationCandidates {
            hotel_ids: self.hotel_ids.clone(),
            ai_search: self.ai_search.clone(),
            place_id: self.place_id.clone(),
            country_code: self.country_code.clone(),
            city_name: self.city_name.clone(),
            latitude: self.latitude,
            longitude: self.longitude,
            radius: self.radius,
            iata_code: self.iata_code.clone(),
        }
    }

    pub fn into_request(self) -> Result<RateSearchRequest, ValidationError> {
        let occupancies = self
            .occupancies
            .clone()
            .filter(|occupancies| !occupancies.is_empty())
            .ok_or_else(|| ValidationError::invalid("occupancies", "at least one room is required"))?;
        if occupancies.iter().any(|occupancy| occupancy.adults < 1) {
            return Err(ValidationError::invalid("occupancies", "each room needs at least one adult"));
        }

        let currency = required_text(&self.currency, "currency")?;
        if currency.chars().count() != 3 {
            return Err(ValidationError::invalid("currency", "must be a 3-letter ISO code"));
        }

        let guest_nationality = required_text(&self.guest_nationality, "guestNationality")?;
        if guest_nationality.chars().count() != 2 {
            return Err(ValidationError::invalid("guestNationality", "must be a 2-letter ISO code"));
        }

        let checkin = required_text(&self.checkin, "checkin")?;
        let checkout = required_text(&self.checkout, "checkout")?;
        for (field, value) in [("checkin", &checkin), ("checkout", &checkout)] {
            if !has_iso_date_shape(value) {
                return Err(ValidationError::invalid(field, "must use YYYY-MM-DD"));
            }
        }

        self.filters.validate()?;

        let candidates = self.location_candidates();
        let location = candidates.select()?;
        let ignored = candidates.ignored_selectors();
        if !ignored.is_empty() {
            tracing::debug!(
                event_name = "core.rates.selector_ignored",
                selected = location.kind(),
                ignored = ?ignored,
                "multiple location selectors supplied; lower-priority ones were dropped"
            );
        }

        Ok(RateSearchRequest {
            occupancies,
            currency,
            guest_nationality,
            checkin,
            checkout,
            location,
            filters: self.filters.without_blank_strings(),
        })
    }
}

/// A validated request body for the provider's rate-search endpoint.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RateSearchRequest {
    pub occupancies: Vec<Occupancy>,
    pub currency: String,
    pub guest_nationality: String,
    pub checkin: String,
    pub checkout: String,
    #[serde(flatten)]
    pub location: LocationSelector,
    #[serde(flatten)]
    pub filters: RateFilters,
}

fn required_text(value: &Option<String>, field: &str) -> Result<String, ValidationError> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .map(str::to_string)
        .ok_or_else(|| ValidationError::invalid(field, "is required"))
}

fn has_iso_date_shape(value: &str) -> bool {
    let bytes = value.as_bytes();
    bytes.len() == 10
        && bytes.iter().enumerate().all(|(index, byte)| match index {
            4 | 7 => *byte == b'-',
            _ => byte.is_ascii_digit(),
        })
}

#[cfg(test)]
mod tests {
    use serde_json::{json, Value};

    use super::{RateSearchParams, SortDirection, SortField};
    use crate::domain::location::LocationSelector;
    use crate::errors::ValidationError;

    fn params(value: Value) -> RateSearchParams {
        serde_json::from_value(value).unwrap_or_default()
    }

    fn base() -> Value {
        json!({
            "occupancies": [{ "adults": 2 }],
            "currency": "USD",
            "guestNationality": "US",
            "checkin": "2025-06-10",
            "checkout": "2025-06-12"
        })
    }

    fn with(mut value: Value, extra: Value) -> Value {
        if let (Some(target), Some(source)) = (value.as_object_mut(), extra.as_object()) {
            for (key, field) in source {
                target.insert(key.clone(), field.clone());
            }
        }
        value
    }

    #[test]
    fn request_without_selector_is_rejected_locally() {
        let result = params(base()).into_request();
        assert_eq!(result, Err(ValidationError::MissingLocationSelector));
    }

    #[test]
    fn builds_minimal_request_with_provider_field_names() {
        let request = params(with(base(), json!({ "placeId": "ChIJ-paris" })))
            .into_request()
            .unwrap_or_else(|error| panic!("unexpected rejection: {error}"));

        assert_eq!(request.location, LocationSelector::PlaceId("ChIJ-paris".to_string()));
        assert_eq!(
            serde_json::to_value(&request).unwrap_or_default(),
            json!({
                "occupancies": [{ "adults": 2 }],
                "currency": "USD",
                "guestNationality": "US",
                "checkin": "2025-06-10",
                "checkout": "2025-06-12",
                "placeId": "ChIJ-paris"
            })
        );
    }

    #[test]
    fn set_filters_survive_and_unset_filters_never_appear() {
        let request = params(with(
            base(),
            json!({
                "iataCode": "LHR",
                "refundableRatesOnly": false,
                "offset": 0,
                "maxRatesPerHotel": 1,
                "sort": [{ "field": "price", "direction": "ascending" }],
                "starRating": [4.0, 5.0]
            }),
        ))
        .into_request()
        .unwrap_or_else(|error| panic!("unexpected rejection: {error}"));

        let sort = request.filters.sort.clone().unwrap_or_default();
        assert_eq!(sort[0].field, SortField::Price);
        assert_eq!(sort[0].direction, Some(SortDirection::Ascending));

        let body = serde_json::to_value(&request).unwrap_or_default();
        assert_eq!(body["refundableRatesOnly"], json!(false));
        assert_eq!(body["offset"], json!(0));
        assert_eq!(body["maxRatesPerHotel"], json!(1));
        assert_eq!(body["starRating"], json!([4.0, 5.0]));
        assert_eq!(body["iataCode"], json!("LHR"));

        let object = body.as_object().cloned().unwrap_or_default();
        for absent in ["timeout", "limit", "hotelName", "roomMapping", "includeHotelData", "zip"] {
            assert!(!object.contains_key(absent), "{absent} must not be sent");
        }
    }

    #[test]
    fn blank_string_filters_are_dropped() {
        let request = params(with(base(), json!({ "aiSearch": "spa hotels", "hotelName": " " })))
            .into_request()
            .unwrap_or_else(|error| panic!("unexpected rejection: {error}"));
        assert_eq!(request.filters.hotel_name, None);
    }

    #[test]
    fn lower_priority_selectors_are_not_sent() {
        let request = params(with(
            base(),
            json!({ "hotelIds": ["lp1"], "cityName": "Paris", "countryCode": "FR" }),
        ))
        .into_request()
        .unwrap_or_else(|error| panic!("unexpected rejection: {error}"));

        let body = serde_json::to_value(&request).unwrap_or_default();
        assert_eq!(body["hotelIds"], json!(["lp1"]));
        assert!(body.get("cityName").is_none());
        assert!(body.get("countryCode").is_none());
    }

    #[test]
    fn required_fields_are_validated_before_selector() {
        let cases = [
            (json!({ "occupancies": [] }), "occupancies"),
            (json!({ "occupancies": [{ "adults": 0 }] }), "occupancies"),
            (json!({ "currency": "EURO" }), "currency"),
            (json!({ "guestNationality": "USA" }), "guestNationality"),
            (json!({ "checkin": "10/06/2025" }), "checkin"),
            (json!({ "checkout": "2025-6-12" }), "checkout"),
            (json!({ "limit": 0 }), "limit"),
            (json!({ "limit": 5001 }), "limit"),
            (json!({ "minRating": 5.5 }), "minRating"),
        ];

        for (patch, expected_field) in cases {
            let result = params(with(with(base(), json!({ "placeId": "p" })), patch.clone()))
                .into_request();
            match result {
                Err(ValidationError::InvalidField { field, .. }) => {
                    assert_eq!(field, expected_field, "patch {patch}")
                }
                other => panic!("expected invalid {expected_field} for {patch}, got {other:?}"),
            }
        }
    }

    #[test]
    fn missing_currency_is_reported_by_name() {
        let mut value = with(base(), json!({ "placeId": "p" }));
        if let Some(object) = value.as_object_mut() {
            object.remove("currency");
        }
        assert_eq!(
            params(value).into_request(),
            Err(ValidationError::invalid("currency", "is required"))
        );
    }

    #[test]
    fn children_ages_are_forwarded() {
        let request = params(with(
            base(),
            json!({ "placeId": "p", "occupancies": [{ "adults": 1, "children": [4, 9] }] }),
        ))
        .into_request()
        .unwrap_or_else(|error| panic!("unexpected rejection: {error}"));

        let body = serde_json::to_value(&request).unwrap_or_default();
        assert_eq!(body["occupancies"], json!([{ "adults": 1, "children": [4, 9] }]));
    }
}
