use std::collections::HashMap;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use staywise_core::SearchError;

pub mod ask_question;
pub mod hotel_rates;
pub mod hotel_search;

pub use ask_question::{AskQuestionTool, ASK_QUESTION};
pub use hotel_rates::{HotelRatesSearchTool, HOTEL_RATES_SEARCH};
pub use hotel_search::{HotelSearchTool, HOTEL_SEARCH};

/// Name, description and JSON Schema the model sees for one tool.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ToolDefinition {
    pub name: String,
    pub description: String,
    pub parameters: Value,
}

#[async_trait]
pub trait Tool: Send + Sync {
    fn name(&self) -> &'static str;

    fn definition(&self) -> ToolDefinition;

    /// Tools that hand control back to the user instead of producing a result.
    fn suspends(&self) -> bool {
        false
    }

    async fn execute(&self, input: Value) -> Result<Value, SearchError>;
}

#[derive(Default)]
pub struct ToolRegistry {
    tools: HashMap<String, Box<dyn Tool>>,
}

impl ToolRegistry {
    pub fn register<T>(&mut self, tool: T)
    where
        T: Tool + 'static,
    {
        self.tools.insert(tool.name().to_string(), Box::new(tool));
    }

    pub fn get(&self, name: &str) -> Option<&dyn Tool> {
        self.tools.get(name).map(|tool| tool.as_ref())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.tools.contains_key(name)
    }

    /// Definitions for `names`, in the order given; unknown names are skipped.
    pub fn definitions<'a, I>(&self, names: I) -> Vec<ToolDefinition>
    where
        I: IntoIterator<Item = &'a str>,
    {
        names.into_iter().filter_map(|name| self.get(name)).map(|tool| tool.definition()).collect()
    }

    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.tools.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }
}

/// Decodes model-supplied arguments into a typed struct.
pub(crate) fn parse_arguments<T>(tool: &str, input: Value) -> Result<T, SearchError>
where
    T: serde::de::DeserializeOwned,
{
    serde_json::from_value(input).map_err(|error| {
        SearchError::Validation(staywise_core::ValidationError::Malformed(format!(
            "{tool} arguments: {error}"
        )))
    })
}

#[cfg(test)]
mod tests {
    use serde_json::json;
    use staywise_core::SearchError;

    use super::{parse_arguments, AskQuestionTool, ToolRegistry, ASK_QUESTION};
    use crate::conversation::QuestionRequest;

    #[test]
    fn registry_lists_definitions_in_requested_order() {
        let mut registry = ToolRegistry::default();
        registry.register(AskQuestionTool);

        assert_eq!(registry.len(), 1);
        assert!(registry.contains(ASK_QUESTION));
        let definitions = registry.definitions(["missing", ASK_QUESTION]);
        assert_eq!(definitions.len(), 1);
        assert_eq!(definitions[0].name, ASK_QUESTION);
        assert_eq!(definitions[0].parameters["type"], "object");
    }

    #[test]
    fn malformed_arguments_become_validation_errors() {
        let result = parse_arguments::<QuestionRequest>(ASK_QUESTION, json!({ "options": 3 }));
        let Err(SearchError::Validation(error)) = result else {
            panic!("expected a validation error");
        };
        assert!(error.to_string().contains("ask_question arguments"));
    }
}
