use serde_json::{json, Value};

use crate::tools::{ToolRegistry, ASK_QUESTION, HOTEL_RATES_SEARCH, HOTEL_SEARCH};

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum GuardrailDecision {
    Allow,
    Deny { reason_code: &'static str, user_message: String, fallback_path: &'static str },
}

impl GuardrailDecision {
    /// Result payload returned to the model instead of running the tool.
    pub fn denial_payload(&self) -> Option<Value> {
        match self {
            Self::Allow => None,
            Self::Deny { reason_code, user_message, fallback_path } => Some(json!({
                "error": user_message,
                "kind": "tool_not_allowed",
                "reasonCode": reason_code,
                "fallback": fallback_path,
            })),
        }
    }
}

/// The closed set of tools a turn may call.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct GuardrailPolicy {
    active_tools: Vec<String>,
}

impl Default for GuardrailPolicy {
    fn default() -> Self {
        Self::with_active_tools([HOTEL_SEARCH, HOTEL_RATES_SEARCH, ASK_QUESTION])
    }
}

impl GuardrailPolicy {
    pub fn with_active_tools<I, S>(tools: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut active_tools: Vec<String> = Vec::new();
        for tool in tools {
            let tool = tool.into();
            if !active_tools.contains(&tool) {
                active_tools.push(tool);
            }
        }
        Self { active_tools }
    }

    pub fn active_tools(&self) -> impl Iterator<Item = &str> {
        self.active_tools.iter().map(String::as_str)
    }

    pub fn is_active(&self, tool: &str) -> bool {
        self.active_tools.iter().any(|active| active == tool)
    }

    pub fn evaluate(&self, tool: &str, registry: &ToolRegistry) -> GuardrailDecision {
        if !registry.contains(tool) {
            return GuardrailDecision::Deny {
                reason_code: "tool_unknown",
                user_message: format!("Tool `{tool}` does not exist."),
                fallback_path: "use_listed_tools",
            };
        }
        if !self.is_active(tool) {
            return GuardrailDecision::Deny {
                reason_code: "tool_not_active",
                user_message: format!("Tool `{tool}` is not available in this conversation."),
                fallback_path: "use_listed_tools",
            };
        }
        GuardrailDecision::Allow
    }
}
