use std::sync::Arc;

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{json, Value};
use staywise_core::domain::places::{DEFAULT_LANGUAGE, DEFAULT_PLACE_TYPE};
use staywise_core::{IntentDecoder, PlaceQuery, PlaceResolution, SearchError, ValidationError};
use staywise_provider::HotelDataClient;
use tracing::{info, warn};

use super::{parse_arguments, Tool, ToolDefinition};

pub const HOTEL_SEARCH: &str = "hotel_search";

#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct HotelSearchArgs {
    text_query: String,
    #[serde(default, rename = "type")]
    place_type: Option<String>,
    #[serde(default)]
    language: Option<String>,
    #[serde(default)]
    checkin: Option<String>,
    #[serde(default)]
    checkout: Option<String>,
    #[serde(default)]
    adults: Option<u32>,
    #[serde(default)]
    children: Option<u32>,
}

/// Resolves a free-text destination into place candidates plus whatever stay
/// fields the text carries.
pub struct HotelSearchTool {
    client: Arc<dyn HotelDataClient>,
    decoder: Arc<dyn IntentDecoder>,
    language: String,
}

impl HotelSearchTool {
    pub fn new(client: Arc<dyn HotelDataClient>, decoder: Arc<dyn IntentDecoder>) -> Self {
        Self { client, decoder, language: DEFAULT_LANGUAGE.to_string() }
    }

    pub fn with_language(mut self, language: impl Into<String>) -> Self {
        self.language = language.into();
        self
    }

    async fn resolve(&self, args: HotelSearchArgs) -> Result<PlaceResolution, SearchError> {
        let decoded = self.decoder.decode(&args.text_query);
        let query = decoded.text_query.clone().unwrap_or_else(|| args.text_query.clone());

        let mut resolution = PlaceResolution {
            query: query.clone(),
            checkin: non_blank(args.checkin).or(decoded.checkin),
            checkout: non_blank(args.checkout).or(decoded.checkout),
            adults: args.adults.or(decoded.adults),
            children: args.children.or(decoded.children),
            places: Vec::new(),
            error: None,
            no_results: false,
        };

        let place_query = PlaceQuery::new(query)
            .with_type(non_blank(args.place_type).unwrap_or_else(|| DEFAULT_PLACE_TYPE.to_string()))
            .with_language(non_blank(args.language).unwrap_or_else(|| self.language.clone()));

        match self.client.lookup_places(&place_query).await {
            Ok(envelope) => {
                resolution.places = PlaceResolution::places_from_envelope(&envelope);
                resolution.no_results = resolution.places.is_empty();
                info!(
                    event_name = "agent.tool.hotel_search.resolved",
                    query = %resolution.query,
                    places = resolution.places.len()
                );
            }
            Err(error) if error.is_fatal() => return Err(error),
            Err(error) => {
                warn!(
                    event_name = "agent.tool.hotel_search.lookup_failed",
                    query = %resolution.query,
                    error_class = error.class().as_str(),
                    error = %error
                );
                resolution.error = Some(error.to_string());
            }
        }

        Ok(resolution)
    }
}

#[async_trait]
impl Tool for HotelSearchTool {
    fn name(&self) -> &'static str {
        HOTEL_SEARCH
    }

    fn definition(&self) -> ToolDefinition {
        ToolDefinition {
            name: HOTEL_SEARCH.to_string(),
            description: "Hotel search intent resolver. Given a user query, returns place \
                          candidates and normalized dates/occupancy."
                .to_string(),
            parameters: json!({
                "type": "object",
                "properties": {
                    "textQuery": {
                        "type": "string",
                        "minLength": 1,
                        "description": "Search query, e.g. 'Tokyo'"
                    },
                    "type": { "type": "string", "description": "Restrict by type, e.g. 'hotel'" },
                    "language": { "type": "string", "description": "Language code, default 'en'" },
                    "checkin": { "type": "string", "description": "YYYY-MM-DD" },
                    "checkout": { "type": "string", "description": "YYYY-MM-DD" },
                    "adults": { "type": "integer", "minimum": 1, "description": "Number of adults" },
                    "children": { "type": "integer", "minimum": 0, "description": "Number of children" }
                },
                "required": ["textQuery"]
            }),
        }
    }

    async fn execute(&self, input: Value) -> Result<Value, SearchError> {
        let args: HotelSearchArgs = parse_arguments(HOTEL_SEARCH, input)?;
        if args.text_query.trim().is_empty() {
            return Err(ValidationError::invalid("textQuery", "must not be empty").into());
        }

        let resolution = self.resolve(args).await?;
        serde_json::to_value(resolution)
            .map_err(|error| SearchError::Transport(format!("place resolution: {error}")))
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value.filter(|value| !value.trim().is_empty())
}
