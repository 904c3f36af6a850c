use async_trait::async_trait;
use serde_json::{json, Value};
use staywise_core::{SearchError, ValidationError};

use super::{parse_arguments, Tool, ToolDefinition};
use crate::conversation::QuestionRequest;

pub const ASK_QUESTION: &str = "ask_question";

/// Pauses the turn until the user answers or declines.
///
/// `execute` only validates the request; the runtime owns the suspension.
#[derive(Clone, Copy, Debug, Default)]
pub struct AskQuestionTool;

impl AskQuestionTool {
    pub fn validate(input: Value) -> Result<QuestionRequest, SearchError> {
        let request: QuestionRequest = parse_arguments(ASK_QUESTION, input)?;

        if request.question.trim().is_empty() {
            return Err(ValidationError::invalid("question", "must not be empty").into());
        }
        if request.options.iter().any(|option| option.value.trim().is_empty()) {
            return Err(ValidationError::invalid("options", "option values must not be empty").into());
        }
        if request.options.is_empty() && !request.allows_input {
            return Err(ValidationError::invalid(
                "options",
                "provide options or set allowsInput so the user can answer",
            )
            .into());
        }
        Ok(request)
    }
}

#[async_trait]
impl Tool for AskQuestionTool {
    fn name(&self) -> &'static str {
        ASK_QUESTION
    }

    fn definition(&self) -> ToolDefinition {
        ToolDefinition {
            name: ASK_QUESTION.to_string(),
            description: "Ask the user a clarifying question when a required detail (destination, \
                          check-in or check-out date, number of adults) is missing or ambiguous. \
                          Offer options for dates and guest counts; allow free input for places."
                .to_string(),
            parameters: json!({
                "type": "object",
                "properties": {
                    "question": {
                        "type": "string",
                        "description": "The question to show, in the user's language"
                    },
                    "options": {
                        "type": "array",
                        "description": "Predefined answers. Values stay in English.",
                        "items": {
                            "type": "object",
                            "properties": {
                                "value": { "type": "string" },
                                "label": { "type": "string" }
                            },
                            "required": ["value", "label"]
                        }
                    },
                    "allowsInput": {
                        "type": "boolean",
                        "description": "Whether the user may type a free-form answer"
                    },
                    "inputLabel": { "type": "string" },
                    "inputPlaceholder": { "type": "string" },
                    "fields": {
                        "type": "array",
                        "description": "Booking fields this question fills",
                        "items": {
                            "type": "string",
                            "enum": ["destination", "checkin", "checkout", "adults", "children"]
                        }
                    }
                },
                "required": ["question"]
            }),
        }
    }

    fn suspends(&self) -> bool {
        true
    }

    async fn execute(&self, input: Value) -> Result<Value, SearchError> {
        let request = Self::validate(input)?;
        serde_json::to_value(request)
            .map_err(|error| SearchError::Validation(ValidationError::Malformed(error.to_string())))
    }
}
