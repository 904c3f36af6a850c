use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{json, Value};
use staywise_core::{RateSearchParams, SearchError};
use staywise_provider::HotelDataClient;
use tracing::info;

use super::{parse_arguments, Tool, ToolDefinition};

pub const HOTEL_RATES_SEARCH: &str = "hotel_rates_search";

/// Validates rate-search arguments locally, then asks the provider.
///
/// Success returns the provider JSON unchanged.
pub struct HotelRatesSearchTool {
    client: Arc<dyn HotelDataClient>,
}

impl HotelRatesSearchTool {
    pub fn new(client: Arc<dyn HotelDataClient>) -> Self {
        Self { client }
    }
}

#[async_trait]
impl Tool for HotelRatesSearchTool {
    fn name(&self) -> &'static str {
        HOTEL_RATES_SEARCH
    }

    fn definition(&self) -> ToolDefinition {
        ToolDefinition {
            name: HOTEL_RATES_SEARCH.to_string(),
            description: "Search for hotel rates and availability across multiple hotels. Returns \
                          real-time pricing, room options, booking details, and hotel information. \
                          Use this when users want to find hotels with prices, check availability, \
                          or compare rates."
                .to_string(),
            parameters: parameters_schema(),
        }
    }

    async fn execute(&self, input: Value) -> Result<Value, SearchError> {
        let params: RateSearchParams = parse_arguments(HOTEL_RATES_SEARCH, input)?;
        let request = params.into_request()?;

        let response = self.client.search_rates(&request).await?;
        let hotels = response.get("data").and_then(Value::as_array).map_or(0, Vec::len);
        info!(
            event_name = "agent.tool.hotel_rates_search.completed",
            selector = request.location.kind(),
            hotels
        );
        Ok(response)
    }
}

fn parameters_schema() -> Value {
    json!({
        "type": "object",
        "properties": {
            "hotelIds": {
                "type": "array",
                "items": { "type": "string" },
                "description": "An array of hotel IDs to search for availability and pricing"
            },
            "countryCode": {
                "type": "string",
                "description": "The country code in ISO 2-letter format (e.g., \"US\" for United States)"
            },
            "cityName": { "type": "string", "description": "The name of the city to search for hotels in" },
            "latitude": { "type": "number", "description": "The latitude coordinate for location-based hotel searches" },
            "longitude": { "type": "number", "description": "The longitude coordinate for location-based hotel searches" },
            "radius": { "type": "integer", "description": "The search radius in meters for location-based searches" },
            "iataCode": { "type": "string", "description": "The IATA code of the search location, typically an airport code" },
            "placeId": { "type": "string", "description": "The unique Place ID of the search location" },
            "aiSearch": { "type": "string", "description": "AI-powered hotel search based on a natural language query" },
            "occupancies": {
                "type": "array",
                "description": "An array of objects specifying the number of guests per room",
                "items": {
                    "type": "object",
                    "properties": {
                        "adults": { "type": "integer", "minimum": 1, "description": "Number of adults in each selected room" },
                        "children": {
                            "type": "array",
                            "items": { "type": "integer" },
                            "description": "The ages of children of each selected room"
                        }
                    },
                    "required": ["adults"]
                }
            },
            "currency": {
                "type": "string", "minLength": 3, "maxLength": 3,
                "description": "The currency in which the prices will be displayed (ISO 3-letter code)"
            },
            "guestNationality": {
                "type": "string", "minLength": 2, "maxLength": 2,
                "description": "The guest's nationality in ISO 2-letter country code format"
            },
            "checkin": {
                "type": "string", "pattern": "^\\d{4}-\\d{2}-\\d{2}$",
                "description": "The check-in date in YYYY-MM-DD format (ISO 8601)"
            },
            "checkout": {
                "type": "string", "pattern": "^\\d{4}-\\d{2}-\\d{2}$",
                "description": "The check-out date in YYYY-MM-DD format (ISO 8601)"
            },
            "timeout": { "type": "integer", "description": "The maximum time in seconds before the request times out" },
            "maxRatesPerHotel": { "type": "integer", "description": "The number of room rates to return per hotel, sorted by price" },
            "boardType": { "type": "string", "description": "Filter results by board type (e.g., RO, BB, HB)" },
            "refundableRatesOnly": { "type": "boolean", "description": "If true, only refundable rates (RFN) will be included" },
            "sort": {
                "type": "array",
                "description": "Sorting criteria for the results",
                "items": {
                    "type": "object",
                    "properties": {
                        "field": { "type": "string", "enum": ["top_picks", "price"] },
                        "direction": { "type": "string", "enum": ["ascending", "descending"] }
                    },
                    "required": ["field"]
                }
            },
            "roomMapping": { "type": "boolean", "description": "Enable room mapping to retrieve the mappedRoomId for each room" },
            "hotelName": { "type": "string", "description": "A case-insensitive search for a hotel's name" },
            "limit": {
                "type": "integer", "minimum": 1, "maximum": 5000,
                "description": "The maximum number of results to return (default 200, max 5000)"
            },
            "offset": { "type": "integer", "description": "The number of results to skip for pagination" },
            "minReviewsCount": { "type": "integer", "description": "The minimum number of reviews a hotel must have" },
            "minRating": {
                "type": "number", "minimum": 0, "maximum": 5,
                "description": "The minimum rating (on a scale of 0-5) required"
            },
            "zip": { "type": "string", "description": "The zip code of the search location" },
            "starRating": { "type": "array", "items": { "type": "number" }, "description": "An array of hotel star ratings to include" },
            "hotelTypeIds": { "type": "array", "items": { "type": "integer" }, "description": "An array of hotel type IDs to filter the search results" },
            "chainIds": { "type": "array", "items": { "type": "integer" }, "description": "An array of hotel chain IDs to filter the search results" },
            "facilities": { "type": "array", "items": { "type": "integer" }, "description": "An array of facility IDs" },
            "strictFacilityFiltering": { "type": "boolean", "description": "If enabled, only hotels with all specified facilities will be returned" },
            "stream": { "type": "boolean", "description": "If true, enables streaming mode" },
            "advancedAccessibilityOnly": { "type": "boolean", "description": "If true, only hotels with advanced accessibility features will be returned" },
            "feed": { "type": "string", "description": "Which feed to use when searching for rates" },
            "includeHotelData": {
                "type": "boolean",
                "description": "If true, includes hotel data (name, main photo, address, rating) in the response"
            }
        },
        "required": ["occupancies", "currency", "guestNationality", "checkin", "checkout"]
    })
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use async_trait::async_trait;
    use serde_json::{json, Value};
    use staywise_core::errors::MISSING_LOCATION_MESSAGE;
    use staywise_core::{PlaceQuery, RateSearchRequest, SearchError};
    use staywise_provider::HotelDataClient;

    use super::HotelRatesSearchTool;
    use crate::tools::Tool;

    struct FakeRates {
        reply: Result<Value, SearchError>,
        bodies: Mutex<Vec<Value>>,
    }

    impl FakeRates {
        fn new(reply: Result<Value, SearchError>) -> Arc<Self> {
            Arc::new(Self { reply, bodies: Mutex::new(Vec::new()) })
        }

        fn bodies(&self) -> Vec<Value> {
            self.bodies.lock().map(|bodies| bodies.clone()).unwrap_or_default()
        }
    }

    #[async_trait]
    impl HotelDataClient for FakeRates {
        async fn lookup_places(&self, _query: &PlaceQuery) -> Result<Value, SearchError> {
            Ok(json!({ "data": [] }))
        }

        async fn search_rates(&self, request: &RateSearchRequest) -> Result<Value, SearchError> {
            if let Ok(mut bodies) = self.bodies.lock() {
                bodies.push(serde_json::to_value(request).unwrap_or_default());
            }
            self.reply.clone()
        }
    }

    fn base_args() -> Value {
        json!({
            "occupancies": [{ "adults": 2 }],
            "currency": "EUR",
            "guestNationality": "PT",
            "checkin": "2025-05-01",
            "checkout": "2025-05-04"
        })
    }

    #[tokio::test]
    async fn sends_only_the_winning_selector_and_returns_response_verbatim() {
        let reply = json!({ "data": [{ "hotelId": "lp1", "roomTypes": [] }], "guestLevel": 0 });
        let client = FakeRates::new(Ok(reply.clone()));
        let mut args = base_args();
        args["placeId"] = json!("ChIJ-lisbon");
        args["iataCode"] = json!("LIS");
        args["limit"] = json!(20);

        let result = HotelRatesSearchTool::new(client.clone()).execute(args).await;
        assert_eq!(result, Ok(reply));

        let bodies = client.bodies();
        assert_eq!(bodies.len(), 1);
        assert_eq!(bodies[0]["placeId"], "ChIJ-lisbon");
        assert!(bodies[0].get("iataCode").is_none());
        assert_eq!(bodies[0]["limit"], 20);
        assert!(bodies[0].get("offset").is_none());
    }

    #[tokio::test]
    async fn missing_selector_fails_without_network_call() {
        let client = FakeRates::new(Ok(json!({})));
        let result = HotelRatesSearchTool::new(client.clone()).execute(base_args()).await;

        let Err(error) = result else {
            panic!("expected a validation error");
        };
        assert_eq!(error.to_tool_payload()["error"], MISSING_LOCATION_MESSAGE);
        assert!(client.bodies().is_empty());
    }

    #[tokio::test]
    async fn out_of_range_limit_is_rejected_locally() {
        let client = FakeRates::new(Ok(json!({})));
        let mut args = base_args();
        args["cityName"] = json!("Lisbon");
        args["countryCode"] = json!("PT");
        args["limit"] = json!(5001);

        let result = HotelRatesSearchTool::new(client.clone()).execute(args).await;
        assert!(matches!(result, Err(SearchError::Validation(_))));
        assert!(client.bodies().is_empty());
    }

    #[tokio::test]
    async fn upstream_failure_keeps_status() {
        let client = FakeRates::new(Err(SearchError::Upstream {
            status: 400,
            message: "checkout must be after checkin".to_string(),
        }));
        let mut args = base_args();
        args["aiSearch"] = json!("quiet hotels near the river");

        let Err(error) = HotelRatesSearchTool::new(client).execute(args).await else {
            panic!("expected upstream error");
        };
        assert_eq!(
            error.to_tool_payload(),
            json!({ "error": "checkout must be after checkin", "status": 400 })
        );
    }
}
