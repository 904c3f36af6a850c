use serde::Serialize;
use serde_json::{Map, Value};

use crate::errors::ValidationError;

/// The one strategy a rate search uses to pick hotels.
///
/// The provider accepts six mutually exclusive selectors; a request carries
/// exactly one of them.
#[derive(Clone, Debug, PartialEq)]
pub enum LocationSelector {
    HotelIds(Vec<String>),
    AiSearch(String),
    PlaceId(String),
    CityAndCountry { city: String, country_code: String },
    GeoRadius { latitude: f64, longitude: f64, radius_meters: Option<u32> },
    Iata(String),
}

impl LocationSelector {
    pub fn kind(&self) -> &'static str {
        match self {
            Self::HotelIds(_) => "hotel_ids",
            Self::AiSearch(_) => "ai_search",
            Self::PlaceId(_) => "place_id",
            Self::CityAndCountry { .. } => "city_and_country",
            Self::GeoRadius { .. } => "geo_radius",
            Self::Iata(_) => "iata",
        }
    }

    /// Provider field names for this selector.
    pub fn to_fields(&self) -> Map<String, Value> {
        let mut fields = Map::new();
        match self {
            Self::HotelIds(ids) => {
                fields.insert("hotelIds".to_string(), Value::from(ids.clone()));
            }
            Self::AiSearch(query) => {
                fields.insert("aiSearch".to_string(), Value::from(query.clone()));
            }
            Self::PlaceId(place_id) => {
                fields.insert("placeId".to_string(), Value::from(place_id.clone()));
            }
            Self::CityAndCountry { city, country_code } => {
                fields.insert("countryCode".to_string(), Value::from(country_code.clone()));
                fields.insert("cityName".to_string(), Value::from(city.clone()));
            }
            Self::GeoRadius { latitude, longitude, radius_meters } => {
                fields.insert("latitude".to_string(), Value::from(*latitude));
                fields.insert("longitude".to_string(), Value::from(*longitude));
                if let Some(radius) = radius_meters {
                    fields.insert("radius".to_string(), Value::from(*radius));
                }
            }
            Self::Iata(code) => {
                fields.insert("iataCode".to_string(), Value::from(code.clone()));
            }
        }
        fields
    }
}

impl Serialize for LocationSelector {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        self.to_fields().serialize(serializer)
    }
}

/// Every selector field as the caller supplied it, before precedence applies.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct LocationCandidates {
    pub hotel_ids: Option<Vec<String>>,
    pub ai_search: Option<String>,
    pub place_id: Option<String>,
    pub country_code: Option<String>,
    pub city_name: Option<String>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub radius: Option<u32>,
    pub iata_code: Option<String>,
}

impl LocationCandidates {
    /// Picks the active selector in fixed precedence order.
    ///
    /// Lower-priority selectors that are also populated are ignored, not
    /// rejected; [`LocationCandidates::ignored_selectors`] reports them.
    pub fn select(&self) -> Result<LocationSelector, ValidationError> {
        self.ranked().into_iter().next().ok_or(ValidationError::MissingLocationSelector)
    }

    pub fn ignored_selectors(&self) -> Vec<&'static str> {
        self.ranked().iter().skip(1).map(LocationSelector::kind).collect()
    }

    fn ranked(&self) -> Vec<LocationSelector> {
        let mut ranked = Vec::new();

        if let Some(ids) = self.hotel_ids.as_ref().filter(|ids| !ids.is_empty()) {
            ranked.push(LocationSelector::HotelIds(ids.clone()));
        }
        if let Some(query) = non_blank(&self.ai_search) {
            ranked.push(LocationSelector::AiSearch(query));
        }
        if let Some(place_id) = non_blank(&self.place_id) {
            ranked.push(LocationSelector::PlaceId(place_id));
        }
        if let (Some(country_code), Some(city)) =
            (non_blank(&self.country_code), non_blank(&self.city_name))
        {
            ranked.push(LocationSelector::CityAndCountry { city, country_code });
        }
        if let (Some(latitude), Some(longitude)) = (self.latitude, self.longitude) {
            ranked.push(LocationSelector::GeoRadius {
                latitude,
                longitude,
                radius_meters: self.radius,
            });
        }
        if let Some(code) = non_blank(&self.iata_code) {
            ranked.push(LocationSelector::Iata(code));
        }

        ranked
    }
}

fn non_blank(value: &Option<String>) -> Option<String> {
    value.as_ref().filter(|value| !value.trim().is_empty()).cloned()
}
