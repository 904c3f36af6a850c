//! Turns a raw rate-search response into a ranked, display-ready view.
//!
//! Every function here is pure: the same response always yields the same
//! views, and normalizing twice gives identical headline prices.

use std::cmp::Ordering;
use std::collections::HashSet;
use std::sync::OnceLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::domain::offers::{HotelOffer, Money, Rate, RateSearchResponse, RoomTypeOffer};

/// Rates listed per room type before the rest collapse into a "+N more" count.
pub const VISIBLE_RATES_PER_ROOM: usize = 3;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RankOrder {
    #[default]
    Provider,
    CheapestFirst,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct HotelMetadata {
    pub name: Option<String>,
    pub main_photo: Option<String>,
    pub address: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct HeadlinePrice {
    pub rate_id: Option<String>,
    pub rate_name: Option<String>,
    pub price: Option<Money>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RateLine {
    pub label: String,
    pub price: Money,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RoomTypeView {
    pub room_type_id: Option<String>,
    pub name: Option<String>,
    pub rate_type: Option<String>,
    pub board_name: Option<String>,
    pub refundable: bool,
    pub remarks: Option<String>,
    pub offer_price: Option<Money>,
    pub rate_count: usize,
    pub rates: Vec<RateLine>,
    pub more_count: usize,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RankedHotelView {
    pub hotel_id: String,
    pub metadata: Option<HotelMetadata>,
    pub rating: Option<f64>,
    pub headline: Option<HeadlinePrice>,
    pub room_types: Vec<RoomTypeView>,
}

impl RankedHotelView {
    pub fn display_title(&self) -> String {
        self.metadata
            .as_ref()
            .and_then(|metadata| metadata.name.clone())
            .filter(|name| !name.trim().is_empty())
            .unwrap_or_else(|| format!("Hotel {}", self.hotel_id))
    }

    pub fn headline_price(&self) -> Option<&Money> {
        self.headline.as_ref().and_then(|headline| headline.price.as_ref())
    }
}

/// What a client shows for one rate-search result.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RatesDisplay {
    Error { code: String, message: String },
    NoResults,
    Hotels { hotels: Vec<RankedHotelView> },
}

impl RatesDisplay {
    pub fn from_response(response: &RateSearchResponse, order: RankOrder) -> Self {
        if let Some(error) = &response.error {
            return Self::Error {
                code: error.code().unwrap_or_else(|| "Unknown".to_string()),
                message: error.message().unwrap_or_else(|| "Failed to fetch hotel rates".to_string()),
            };
        }

        let hotels = normalize(response, order);
        if hotels.is_empty() {
            Self::NoResults
        } else {
            Self::Hotels { hotels }
        }
    }

    /// One-line notice for the degenerate cases.
    pub fn notice(&self) -> Option<String> {
        match self {
            Self::Error { code, .. } => Some(format!("Error: {code}")),
            Self::NoResults => Some("No hotel rates found".to_string()),
            Self::Hotels { .. } => None,
        }
    }
}

/// The cheapest rate across every room type of a hotel.
///
/// Rates without a price sort after priced ones; ties keep received order.
pub fn headline_rate(hotel: &HotelOffer) -> Option<&Rate> {
    let mut rates: Vec<&Rate> = hotel.room_types.iter().flat_map(|room| room.rates.iter()).collect();
    rates.sort_by(|left, right| compare_prices(left.price(), right.price()));
    rates.into_iter().next()
}

pub fn offer_price(room_type: &RoomTypeOffer) -> Option<&Money> {
    room_type.offer_retail_rate.as_ref().and_then(|price| price.first())
}

/// Removes every `<...>` span from provider remarks. Markup is never rendered.
pub fn strip_markup(remarks: &str) -> String {
    static TAG: OnceLock<Regex> = OnceLock::new();
    TAG.get_or_init(|| Regex::new(r"<[^>]*>").expect("static regex"))
        .replace_all(remarks, "")
        .into_owned()
}

pub fn normalize(response: &RateSearchResponse, order: RankOrder) -> Vec<RankedHotelView> {
    let mut seen = HashSet::new();
    let mut views: Vec<RankedHotelView> = response
        .data
        .iter()
        .flatten()
        .filter(|hotel| seen.insert(hotel.hotel_id.clone()))
        .map(hotel_view)
        .collect();

    if order == RankOrder::CheapestFirst {
        views.sort_by(|left, right| compare_prices(left.headline_price(), right.headline_price()));
    }

    views
}

fn hotel_view(hotel: &HotelOffer) -> RankedHotelView {
    let metadata = (hotel.name.is_some() || hotel.main_photo.is_some() || hotel.address.is_some())
        .then(|| HotelMetadata {
            name: hotel.name.clone(),
            main_photo: hotel.main_photo.clone(),
            address: hotel.address.clone(),
        });

    let headline = headline_rate(hotel).map(|rate| HeadlinePrice {
        rate_id: rate.rate_id.clone(),
        rate_name: rate.name.clone(),
        price: rate.price().cloned(),
    });

    RankedHotelView {
        hotel_id: hotel.hotel_id.clone(),
        metadata,
        rating: hotel.rating.filter(|rating| *rating > 0.0),
        headline,
        room_types: hotel.room_types.iter().map(room_type_view).collect(),
    }
}

fn room_type_view(room_type: &RoomTypeOffer) -> RoomTypeView {
    let first = room_type.rates.first();
    let rate_count = room_type.rates.len();

    let rates = if rate_count > 1 {
        room_type
            .rates
            .iter()
            .take(VISIBLE_RATES_PER_ROOM)
            .enumerate()
            .filter_map(|(index, rate)| {
                rate.price().map(|price| RateLine {
                    label: rate
                        .name
                        .clone()
                        .filter(|name| !name.is_empty())
                        .unwrap_or_else(|| format!("Rate {}", index + 1)),
                    price: price.clone(),
                })
            })
            .collect()
    } else {
        Vec::new()
    };

    RoomTypeView {
        room_type_id: room_type.room_type_id.clone(),
        name: room_type.name.clone(),
        rate_type: room_type.rate_type.clone().filter(|value| !value.is_empty()),
        board_name: first.and_then(|rate| rate.board_name.clone()).filter(|value| !value.is_empty()),
        refundable: first.is_some_and(Rate::is_refundable),
        remarks: first
            .and_then(|rate| rate.remarks.as_deref())
            .map(strip_markup)
            .filter(|value| !value.is_empty()),
        offer_price: offer_price(room_type).cloned(),
        rate_count,
        rates,
        more_count: rate_count.saturating_sub(VISIBLE_RATES_PER_ROOM),
    }
}

fn compare_prices(left: Option<&Money>, right: Option<&Money>) -> Ordering {
    match (left, right) {
        (Some(left), Some(right)) => left.amount.cmp(&right.amount),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}
