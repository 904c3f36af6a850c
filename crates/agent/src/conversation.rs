//! Conversation history and the clarifying-question subflow.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use staywise_core::{DecodedIntent, PlaceResolution};
use thiserror::Error;

pub const DECLINED_MESSAGE: &str = "User declined this question";

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    User,
    Assistant,
    Tool,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ToolCall {
    pub id: String,
    pub name: String,
    pub arguments: Value,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tool_calls: Vec<ToolCall>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_call_id: Option<String>,
}

impl Message {
    pub fn user(text: impl Into<String>) -> Self {
        Self { role: Role::User, content: Some(text.into()), tool_calls: Vec::new(), tool_call_id: None }
    }

    pub fn assistant(content: Option<String>, tool_calls: Vec<ToolCall>) -> Self {
        Self { role: Role::Assistant, content, tool_calls, tool_call_id: None }
    }

    /// Tool output, serialized as the JSON text the model reads back.
    pub fn tool_result(call_id: impl Into<String>, result: &Value) -> Self {
        Self {
            role: Role::Tool,
            content: Some(result.to_string()),
            tool_calls: Vec::new(),
            tool_call_id: Some(call_id.into()),
        }
    }
}

/// A booking field the agent needs before it can search rates.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QuestionField {
    Destination,
    Checkin,
    Checkout,
    Adults,
    Children,
}

impl QuestionField {
    pub const REQUIRED: [QuestionField; 4] =
        [Self::Destination, Self::Checkin, Self::Checkout, Self::Adults];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Destination => "destination",
            Self::Checkin => "checkin",
            Self::Checkout => "checkout",
            Self::Adults => "adults",
            Self::Children => "children",
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuestionOption {
    pub value: String,
    pub label: String,
}

/// What the model asks the user, as sent in `ask_question` arguments.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuestionRequest {
    pub question: String,
    #[serde(default)]
    pub options: Vec<QuestionOption>,
    #[serde(default)]
    pub allows_input: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub input_label: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub input_placeholder: Option<String>,
    #[serde(default)]
    pub fields: Vec<QuestionField>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum QuestionAnswer {
    Provided { values: BTreeMap<String, Value> },
    Declined {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        skipped: Option<bool>,
    },
}

impl QuestionAnswer {
    pub fn provided<I, K>(values: I) -> Self
    where
        I: IntoIterator<Item = (K, Value)>,
        K: Into<String>,
    {
        Self::Provided { values: values.into_iter().map(|(key, value)| (key.into(), value)).collect() }
    }

    /// Tool result the model sees for this answer.
    pub fn to_payload(&self) -> Value {
        match self {
            Self::Provided { values } => json!(values),
            Self::Declined { skipped: Some(skipped) } => {
                json!({ "declined": true, "skipped": skipped, "message": DECLINED_MESSAGE })
            }
            Self::Declined { skipped: None } => {
                json!({ "declined": true, "message": DECLINED_MESSAGE })
            }
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum QuestionState {
    AwaitingResponse,
    Resolved { answer: QuestionAnswer },
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum QuestionError {
    #[error("question `{0}` has already been answered")]
    AlreadyResolved(String),
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PendingQuestion {
    pub call_id: String,
    pub request: QuestionRequest,
    pub state: QuestionState,
}

impl PendingQuestion {
    pub fn new(call_id: impl Into<String>, request: QuestionRequest) -> Self {
        Self { call_id: call_id.into(), request, state: QuestionState::AwaitingResponse }
    }

    pub fn is_resolved(&self) -> bool {
        matches!(self.state, QuestionState::Resolved { .. })
    }

    /// Attaches the user's answer. A question resolves exactly once.
    pub fn resolve(&mut self, answer: QuestionAnswer) -> Result<Value, QuestionError> {
        if self.is_resolved() {
            return Err(QuestionError::AlreadyResolved(self.call_id.clone()));
        }
        let payload = answer.to_payload();
        self.state = QuestionState::Resolved { answer };
        Ok(payload)
    }
}

/// Booking fields known so far in a turn.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GatheredFields {
    pub destination: Option<String>,
    pub checkin: Option<String>,
    pub checkout: Option<String>,
    pub adults: Option<u32>,
    pub children: Option<u32>,
}

impl GatheredFields {
    pub fn missing(&self) -> Vec<QuestionField> {
        QuestionField::REQUIRED.into_iter().filter(|field| !self.has(*field)).collect()
    }

    pub fn has(&self, field: QuestionField) -> bool {
        match field {
            QuestionField::Destination => self.destination.is_some(),
            QuestionField::Checkin => self.checkin.is_some(),
            QuestionField::Checkout => self.checkout.is_some(),
            QuestionField::Adults => self.adults.is_some(),
            QuestionField::Children => self.children.is_some(),
        }
    }

    pub fn absorb_intent(&mut self, intent: &DecodedIntent) {
        merge(&mut self.destination, intent.text_query.clone());
        merge(&mut self.checkin, intent.checkin.clone());
        merge(&mut self.checkout, intent.checkout.clone());
        merge(&mut self.adults, intent.adults);
        merge(&mut self.children, intent.children);
    }

    pub fn absorb_places(&mut self, resolution: &PlaceResolution) {
        if !resolution.places.is_empty() {
            merge(&mut self.destination, Some(resolution.query.clone()));
        }
        merge(&mut self.checkin, resolution.checkin.clone());
        merge(&mut self.checkout, resolution.checkout.clone());
        merge(&mut self.adults, resolution.adults);
        merge(&mut self.children, resolution.children);
    }

    /// Fields confirmed by a rate search the provider accepted.
    pub fn absorb_rate_arguments(&mut self, arguments: &Value) {
        let text = |key: &str| arguments.get(key).and_then(Value::as_str).map(str::to_string);
        merge(&mut self.checkin, text("checkin"));
        merge(&mut self.checkout, text("checkout"));

        let destination = ["cityName", "aiSearch", "placeId", "iataCode"]
            .into_iter()
            .find_map(|key| text(key).filter(|value| !value.is_empty()));
        merge(&mut self.destination, destination);

        let adults: Option<u32> = arguments.get("occupancies").and_then(Value::as_array).map(|rooms| {
            rooms
                .iter()
                .filter_map(|room| room.get("adults").and_then(Value::as_u64))
                .map(|adults| u32::try_from(adults).unwrap_or(u32::MAX))
                .fold(0u32, u32::saturating_add)
        });
        merge(&mut self.adults, adults.filter(|total| *total > 0));
    }

    /// Only `Provided` answers fill fields; a decline leaves them missing.
    pub fn absorb_answer(&mut self, request: &QuestionRequest, answer: &QuestionAnswer) {
        let QuestionAnswer::Provided { values } = answer else {
            return;
        };

        for field in &request.fields {
            let Some(value) = values.get(field.as_str()) else {
                continue;
            };
            match field {
                QuestionField::Destination => merge(&mut self.destination, as_text(value)),
                QuestionField::Checkin => merge(&mut self.checkin, as_text(value)),
                QuestionField::Checkout => merge(&mut self.checkout, as_text(value)),
                QuestionField::Adults => merge(&mut self.adults, as_count(value)),
                QuestionField::Children => merge(&mut self.children, as_count(value)),
            }
        }
    }
}

fn merge<T>(slot: &mut Option<T>, value: Option<T>) {
    if value.is_some() {
        *slot = value;
    }
}

fn as_text(value: &Value) -> Option<String> {
    value.as_str().map(str::trim).filter(|text| !text.is_empty()).map(str::to_string)
}

fn as_count(value: &Value) -> Option<u32> {
    match value {
        Value::Number(number) => number.as_u64().and_then(|count| u32::try_from(count).ok()),
        Value::String(text) => text.trim().parse().ok(),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::{
        GatheredFields, PendingQuestion, QuestionAnswer, QuestionError, QuestionField,
        QuestionRequest, DECLINED_MESSAGE,
    };

    fn request(fields: Vec<QuestionField>) -> QuestionRequest {
        QuestionRequest {
            question: "When are you travelling?".to_string(),
            options: Vec::new(),
            allows_input: true,
            input_label: None,
            input_placeholder: Some("YYYY-MM-DD".to_string()),
            fields,
        }
    }

    #[test]
    fn question_resolves_exactly_once() {
        let mut pending = PendingQuestion::new("call-1", request(vec![QuestionField::Checkin]));

        let payload = pending
            .resolve(QuestionAnswer::provided([("checkin", json!("2025-05-01"))]))
            .unwrap_or_default();
        assert_eq!(payload, json!({ "checkin": "2025-05-01" }));
        assert!(pending.is_resolved());

        let again = pending.resolve(QuestionAnswer::Declined { skipped: None });
        assert_eq!(again, Err(QuestionError::AlreadyResolved("call-1".to_string())));
    }

    #[test]
    fn decline_payload_matches_contract() {
        assert_eq!(
            QuestionAnswer::Declined { skipped: Some(true) }.to_payload(),
            json!({ "declined": true, "skipped": true, "message": DECLINED_MESSAGE })
        );
        assert_eq!(
            QuestionAnswer::Declined { skipped: None }.to_payload(),
            json!({ "declined": true, "message": "User declined this question" })
        );
    }

    #[test]
    fn declined_answer_leaves_fields_missing() {
        let mut gathered = GatheredFields::default();
        gathered.absorb_answer(
            &request(vec![QuestionField::Checkin, QuestionField::Checkout]),
            &QuestionAnswer::Declined { skipped: Some(false) },
        );

        assert_eq!(gathered.missing(), QuestionField::REQUIRED.to_vec());
    }

    #[test]
    fn provided_answer_fills_only_asked_fields() {
        let mut gathered = GatheredFields::default();
        gathered.absorb_answer(
            &request(vec![QuestionField::Adults, QuestionField::Destination]),
            &QuestionAnswer::provided([
                ("adults", json!("2")),
                ("destination", json!("Lisbon")),
                ("checkin", json!("2025-05-01")),
            ]),
        );

        assert_eq!(gathered.adults, Some(2));
        assert_eq!(gathered.destination.as_deref(), Some("Lisbon"));
        assert_eq!(gathered.checkin, None);
        assert_eq!(gathered.missing(), vec![QuestionField::Checkin, QuestionField::Checkout]);
    }

    #[test]
    fn rate_arguments_confirm_dates_and_total_adults() {
        let mut gathered = GatheredFields::default();
        gathered.absorb_rate_arguments(&json!({
            "placeId": "p-1",
            "checkin": "2025-05-01",
            "checkout": "2025-05-03",
            "occupancies": [{ "adults": 2 }, { "adults": 1 }]
        }));

        assert_eq!(gathered.adults, Some(3));
        assert_eq!(gathered.destination.as_deref(), Some("p-1"));
        assert!(gathered.missing().is_empty());
    }

    #[test]
    fn question_request_accepts_camel_case_arguments() {
        let parsed: QuestionRequest = serde_json::from_value(json!({
            "question": "How many adults?",
            "options": [{ "value": "1", "label": "One" }, { "value": "2", "label": "Two" }],
            "allowsInput": false,
            "fields": ["adults"]
        }))
        .unwrap_or_else(|_| request(Vec::new()));

        assert_eq!(parsed.options.len(), 2);
        assert_eq!(parsed.fields, vec![QuestionField::Adults]);
        assert!(!parsed.allows_input);
    }
}
