//! Provider rate-search response model.
//!
//! Deserialization is lenient: unknown fields are ignored, missing or `null`
//! collections are empty, and a malformed entry degrades only the field it
//! sits in, so a partially populated response still produces a usable view.

use rust_decimal::{Decimal, RoundingStrategy};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

/// Any shape that does not parse as `T` (including `null`) becomes `None`.
fn lenient<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned,
{
    let value = Value::deserialize(deserializer)?;
    Ok(serde_json::from_value(value).ok())
}

fn lenient_or_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned + Default,
{
    Ok(lenient(deserializer)?.unwrap_or_default())
}

/// Keeps the entries that parse; anything other than an array is empty.
fn lenient_list<'de, D, T>(deserializer: D) -> Result<Vec<T>, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned,
{
    Ok(parse_entries(Value::deserialize(deserializer)?).unwrap_or_default())
}

fn lenient_optional_list<'de, D, T>(deserializer: D) -> Result<Option<Vec<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned,
{
    Ok(parse_entries(Value::deserialize(deserializer)?))
}

fn parse_entries<T: DeserializeOwned>(value: Value) -> Option<Vec<T>> {
    match value {
        Value::Array(items) => {
            Some(items.into_iter().filter_map(|item| serde_json::from_value(item).ok()).collect())
        }
        _ => None,
    }
}

/// `retailRate.total`: the first entry is the canonical price, so when it has
/// no usable amount the rate carries no price at all.
fn canonical_prices<'de, D>(deserializer: D) -> Result<Vec<Money>, D::Error>
where
    D: Deserializer<'de>,
{
    let Value::Array(items) = Value::deserialize(deserializer)? else {
        return Ok(Vec::new());
    };
    let prices: Vec<Option<Money>> =
        items.into_iter().map(|item| serde_json::from_value(item).ok()).collect();
    match prices.first() {
        Some(Some(_)) => Ok(prices.into_iter().flatten().collect()),
        _ => Ok(Vec::new()),
    }
}

/// Hotel ids arrive as strings, occasionally as numbers.
fn lenient_id<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Value::deserialize(deserializer)? {
        Value::String(id) => id,
        Value::Number(id) => id.to_string(),
        _ => String::new(),
    })
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Money {
    pub amount: Decimal,
    #[serde(default)]
    pub currency: String,
}

impl Money {
    pub fn new(amount: Decimal, currency: impl Into<String>) -> Self {
        Self { amount, currency: currency.into() }
    }

    /// en-US currency rendering: `$1,234.50`, `€80.00`, `¥12,000`.
    pub fn display(&self) -> String {
        let code = if self.currency.trim().is_empty() {
            "USD".to_string()
        } else {
            self.currency.trim().to_ascii_uppercase()
        };
        let decimals = match code.as_str() {
            "JPY" | "KRW" | "VND" | "CLP" | "ISK" => 0,
            _ => 2,
        };
        let number = group_thousands(self.amount, decimals);

        match currency_symbol(&code) {
            Some(symbol) if self.amount.is_sign_negative() => {
                format!("-{symbol}{}", number.trim_start_matches('-'))
            }
            Some(symbol) => format!("{symbol}{number}"),
            None => format!("{code} {number}"),
        }
    }
}

fn currency_symbol(code: &str) -> Option<&'static str> {
    match code {
        "USD" => Some("$"),
        "EUR" => Some("€"),
        "GBP" => Some("£"),
        "JPY" => Some("¥"),
        "INR" => Some("₹"),
        "CAD" => Some("CA$"),
        "AUD" => Some("A$"),
        _ => None,
    }
}

fn group_thousands(amount: Decimal, decimals: u32) -> String {
    let mut rounded = amount.round_dp_with_strategy(decimals, RoundingStrategy::MidpointAwayFromZero);
    rounded.rescale(decimals);
    let text = rounded.to_string();

    let (sign, unsigned) = match text.strip_prefix('-') {
        Some(rest) => ("-", rest),
        None => ("", text.as_str()),
    };
    let (whole, fraction) = match unsigned.split_once('.') {
        Some((whole, fraction)) => (whole, Some(fraction)),
        None => (unsigned, None),
    };

    let mut grouped = String::with_capacity(whole.len() + whole.len() / 3);
    for (index, digit) in whole.chars().enumerate() {
        if index > 0 && (whole.len() - index) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(digit);
    }

    match fraction {
        Some(fraction) => format!("{sign}{grouped}.{fraction}"),
        None => format!("{sign}{grouped}"),
    }
}

/// A field the provider sends either as a single object or as a list.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum OneOrMany<T> {
    Many(Vec<T>),
    One(T),
}

impl<T> OneOrMany<T> {
    /// The single value, or the first element of the list.
    pub fn first(&self) -> Option<&T> {
        match self {
            Self::One(value) => Some(value),
            Self::Many(values) => values.first(),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TaxOrFee {
    #[serde(default)]
    pub included: bool,
    #[serde(default)]
    pub description: Option<String>,
    pub amount: Decimal,
    #[serde(default)]
    pub currency: String,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RetailRate {
    #[serde(default, deserialize_with = "canonical_prices")]
    pub total: Vec<Money>,
    #[serde(default, deserialize_with = "lenient")]
    pub suggested_selling_price: Option<Vec<Money>>,
    #[serde(default, deserialize_with = "lenient")]
    pub initial_price: Option<Vec<Money>>,
    #[serde(default, deserialize_with = "lenient_optional_list")]
    pub taxes_and_fees: Option<Vec<TaxOrFee>>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CancelPolicyInfo {
    #[serde(default)]
    pub cancel_time: Option<String>,
    #[serde(default)]
    pub amount: Option<Decimal>,
    #[serde(default)]
    pub currency: Option<String>,
    #[serde(default, rename = "type")]
    pub kind: Option<String>,
    #[serde(default)]
    pub timezone: Option<String>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CancellationPolicies {
    #[serde(default, deserialize_with = "lenient_optional_list")]
    pub cancel_policy_infos: Option<Vec<CancelPolicyInfo>>,
    #[serde(default)]
    pub refundable_tag: Option<String>,
}

impl CancellationPolicies {
    pub fn is_refundable(&self) -> bool {
        self.refundable_tag.as_deref() == Some("RFN")
    }
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Rate {
    #[serde(default)]
    pub rate_id: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    pub occupancy_number: Option<u32>,
    #[serde(default, deserialize_with = "lenient")]
    pub max_occupancy: Option<u32>,
    #[serde(default, deserialize_with = "lenient")]
    pub adult_count: Option<u32>,
    #[serde(default, deserialize_with = "lenient")]
    pub child_count: Option<u32>,
    #[serde(default)]
    pub board_type: Option<String>,
    #[serde(default)]
    pub board_name: Option<String>,
    #[serde(default)]
    pub remarks: Option<String>,
    #[serde(default, deserialize_with = "lenient_or_default")]
    pub retail_rate: RetailRate,
    #[serde(default, deserialize_with = "lenient")]
    pub cancellation_policies: Option<CancellationPolicies>,
}

impl Rate {
    /// The canonical price: the first entry of `retailRate.total`.
    pub fn price(&self) -> Option<&Money> {
        self.retail_rate.total.first()
    }

    pub fn is_refundable(&self) -> bool {
        self.cancellation_policies.as_ref().is_some_and(CancellationPolicies::is_refundable)
    }
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoomTypeOffer {
    #[serde(default)]
    pub room_type_id: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub offer_id: Option<String>,
    #[serde(default, deserialize_with = "lenient_list")]
    pub rates: Vec<Rate>,
    #[serde(default, deserialize_with = "lenient")]
    pub offer_retail_rate: Option<OneOrMany<Money>>,
    #[serde(default, deserialize_with = "lenient")]
    pub suggested_selling_price: Option<OneOrMany<Money>>,
    #[serde(default, deserialize_with = "lenient")]
    pub offer_initial_price: Option<OneOrMany<Money>>,
    #[serde(default)]
    pub price_type: Option<String>,
    #[serde(default)]
    pub rate_type: Option<String>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HotelOffer {
    #[serde(default, deserialize_with = "lenient_id")]
    pub hotel_id: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default, rename = "main_photo")]
    pub main_photo: Option<String>,
    #[serde(default)]
    pub address: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    pub rating: Option<f64>,
    #[serde(default, deserialize_with = "lenient_list")]
    pub room_types: Vec<RoomTypeOffer>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ErrorDetail {
    #[serde(default)]
    pub code: Option<Value>,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
}

/// Provider error, sent either as a bare string or as a structured object.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ProviderError {
    Message(String),
    Detail(ErrorDetail),
}

impl ProviderError {
    pub fn code(&self) -> Option<String> {
        match self {
            Self::Message(_) => None,
            Self::Detail(detail) => match detail.code.as_ref()? {
                Value::String(code) if !code.is_empty() => Some(code.clone()),
                Value::Number(code) if code.as_i64() != Some(0) => Some(code.to_string()),
                _ => None,
            },
        }
    }

    pub fn message(&self) -> Option<String> {
        match self {
            Self::Message(message) => Some(message.clone()).filter(|text| !text.is_empty()),
            Self::Detail(detail) => detail
                .message
                .clone()
                .filter(|text| !text.is_empty())
                .or_else(|| detail.description.clone().filter(|text| !text.is_empty())),
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RateSearchResponse {
    #[serde(default, deserialize_with = "lenient_optional_list")]
    pub data: Option<Vec<HotelOffer>>,
    #[serde(default)]
    pub error: Option<ProviderError>,
    #[serde(default, deserialize_with = "lenient")]
    pub guest_level: Option<u32>,
    #[serde(default, deserialize_with = "lenient")]
    pub sandbox: Option<bool>,
}

impl RateSearchResponse {
    pub fn from_value(value: &Value) -> Result<Self, serde_json::Error> {
        Self::deserialize(value)
    }
}

#[cfg(test)]
mod tests {
    use rust_decimal::Decimal;
    use serde_json::json;

    use super::{Money, ProviderError, RateSearchResponse};

    #[test]
    fn parses_single_and_list_offer_prices() {
        let response = RateSearchResponse::from_value(&json!({
            "data": [{
                "hotelId": "lp1",
                "roomTypes": [
                    { "offerRetailRate": { "amount": 120.5, "currency": "USD" }, "rates": [] },
                    { "offerRetailRate": [{ "amount": 99, "currency": "EUR" }], "rates": [] }
                ]
            }],
            "sandbox": true,
            "somethingNew": 42
        }))
        .unwrap_or_default();

        let hotels = response.data.unwrap_or_default();
        let first = hotels[0].room_types[0].offer_retail_rate.as_ref().and_then(|price| price.first());
        let second = hotels[0].room_types[1].offer_retail_rate.as_ref().and_then(|price| price.first());
        assert_eq!(first.map(|money| money.amount), Some(Decimal::new(1205, 1)));
        assert_eq!(second.map(|money| money.currency.as_str()), Some("EUR"));
    }

    #[test]
    fn accepts_string_and_object_errors() {
        let flat = RateSearchResponse::from_value(&json!({ "error": "quota exceeded" }))
            .unwrap_or_default();
        assert_eq!(flat.error, Some(ProviderError::Message("quota exceeded".to_string())));

        let nested = RateSearchResponse::from_value(
            &json!({ "error": { "code": 2001, "description": "no availability" } }),
        )
        .unwrap_or_default();
        let error = nested.error.unwrap_or(ProviderError::Message(String::new()));
        assert_eq!(error.code().as_deref(), Some("2001"));
        assert_eq!(error.message().as_deref(), Some("no availability"));
    }

    #[test]
    fn null_collections_and_numeric_ids_still_parse() {
        let response = RateSearchResponse::from_value(&json!({
            "data": [
                { "hotelId": 1042, "roomTypes": null, "rating": "n/a" },
                { "hotelId": "lp2", "roomTypes": [
                    { "rates": null },
                    { "rates": [{ "name": "Flex", "retailRate": null, "cancellationPolicies": "RFN" }] }
                ] }
            ]
        }))
        .expect("lenient response");

        let hotels = response.data.unwrap_or_default();
        assert_eq!(hotels.len(), 2);
        assert_eq!(hotels[0].hotel_id, "1042");
        assert!(hotels[0].room_types.is_empty());
        assert_eq!(hotels[0].rating, None);
        assert!(hotels[1].room_types[0].rates.is_empty());
        let flex = &hotels[1].room_types[1].rates[0];
        assert_eq!(flex.name.as_deref(), Some("Flex"));
        assert!(flex.price().is_none());
        assert!(flex.cancellation_policies.is_none());
    }

    #[test]
    fn amountless_canonical_price_leaves_only_that_rate_unpriced() {
        let response = RateSearchResponse::from_value(&json!({
            "data": [{
                "hotelId": "lp1",
                "roomTypes": [{ "rates": [
                    { "name": "Blank", "retailRate": { "total": [{ "currency": "USD" }, { "amount": 10, "currency": "USD" }] } },
                    { "name": "Priced", "retailRate": { "total": [{ "amount": 30 }] } }
                ] }]
            }]
        }))
        .expect("lenient response");

        let hotels = response.data.unwrap_or_default();
        let rates = &hotels[0].room_types[0].rates;
        assert!(rates[0].price().is_none());
        assert_eq!(rates[1].price().map(|money| money.amount), Some(Decimal::new(30, 0)));
    }

    #[test]
    fn money_renders_like_a_price_tag() {
        assert_eq!(Money::new(Decimal::new(30, 0), "USD").display(), "$30.00");
        assert_eq!(Money::new(Decimal::new(1_234_567, 1), "EUR").display(), "€123,456.70");
        assert_eq!(Money::new(Decimal::new(12_000, 0), "jpy").display(), "¥12,000");
        assert_eq!(Money::new(Decimal::new(995, 1), "CHF").display(), "CHF 99.50");
        assert_eq!(Money::new(Decimal::new(1, 0), "").display(), "$1.00");
        assert_eq!(Money::new(Decimal::new(-25, 1), "USD").display(), "-$2.50");
    }
}
