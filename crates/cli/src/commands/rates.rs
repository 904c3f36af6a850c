use std::fs;
use std::path::Path;

use serde_json::Value;
use staywise_core::{RankOrder, RateSearchResponse, RatesDisplay};

use crate::commands::CommandResult;

/// Ranks a saved rate-search response the way the chat client renders it.
pub fn run(path: &Path, cheapest_first: bool) -> CommandResult {
    let raw = match fs::read_to_string(path) {
        Ok(raw) => raw,
        Err(error) => {
            return CommandResult::failure(
                "rates",
                "file_read",
                format!("could not read `{}`: {error}", path.display()),
                2,
            );
        }
    };

    let response = match serde_json::from_str::<Value>(&raw)
        .and_then(|value| RateSearchResponse::from_value(&value))
    {
        Ok(response) => response,
        Err(error) => {
            return CommandResult::failure(
                "rates",
                "invalid_response",
                format!("`{}` is not a rate-search response: {error}", path.display()),
                3,
            );
        }
    };

    let order = if cheapest_first { RankOrder::CheapestFirst } else { RankOrder::Provider };
    let display = RatesDisplay::from_response(&response, order);
    let message = match &display {
        RatesDisplay::Hotels { hotels } => format!("ranked {} hotels", hotels.len()),
        other => other.notice().unwrap_or_default(),
    };

    match serde_json::to_value(&display) {
        Ok(data) => CommandResult::success_with_data("rates", message, Some(data)),
        Err(error) => CommandResult::failure("rates", "serialization", error.to_string(), 4),
    }
}
