use staywise_core::{HeuristicIntentDecoder, IntentDecoder};

use crate::commands::CommandResult;

/// Shows what the intent decoder pulls out of a free-text request.
pub fn run(text: &str) -> CommandResult {
    if text.trim().is_empty() {
        return CommandResult::failure("decode", "invalid_input", "text must not be empty", 2);
    }

    let intent = HeuristicIntentDecoder::new().decode(text);
    match serde_json::to_value(&intent) {
        Ok(data) => CommandResult::success_with_data("decode", "decoded search intent", Some(data)),
        Err(error) => CommandResult::failure("decode", "serialization", error.to_string(), 3),
    }
}
