use std::io::{self, BufRead, Write};
use std::sync::Arc;

use serde_json::{json, Value};
use staywise_agent::{AgentRuntime, OpenAiCompatClient, QuestionAnswer, QuestionRequest, TurnOutcome};
use staywise_core::config::{AppConfig, LoadOptions};
use staywise_core::RankOrder;
use staywise_provider::HttpHotelDataClient;

use crate::commands::CommandResult;

/// Runs one conversation turn against the configured model and provider.
///
/// Questions the agent asks are prompted on stderr and answered from stdin;
/// an empty line declines the question.
pub fn run(text: &str) -> CommandResult {
    let config = match AppConfig::load(LoadOptions::default()) {
        Ok(config) => config,
        Err(error) => {
            return CommandResult::failure(
                "chat",
                "config_validation",
                format!("configuration issue: {error}"),
                2,
            );
        }
    };

    let client = match HttpHotelDataClient::from_config(&config.provider) {
        Ok(client) => client,
        Err(error) => return CommandResult::failure("chat", "provider_setup", error.to_string(), 3),
    };
    let llm = match OpenAiCompatClient::from_config(&config.llm) {
        Ok(llm) => llm,
        Err(error) => return CommandResult::failure("chat", "llm_setup", format!("{error:#}"), 3),
    };

    let runtime = match tokio::runtime::Builder::new_current_thread().enable_all().build() {
        Ok(runtime) => runtime,
        Err(error) => {
            return CommandResult::failure(
                "chat",
                "runtime_init",
                format!("failed to initialize async runtime: {error}"),
                4,
            );
        }
    };

    let agent = AgentRuntime::for_hotels(Arc::new(llm), Arc::new(client), &config.agent);
    let result = runtime.block_on(async {
        let mut outcome = agent.run_turn(Vec::new(), text).await?;
        while let TurnOutcome::AwaitingInput { suspended } = outcome {
            let answer = prompt(&suspended.pending.request);
            outcome = agent.resume(suspended, answer).await?;
        }
        Ok::<TurnOutcome, staywise_agent::AgentError>(outcome)
    });

    match result {
        Ok(outcome) => {
            let message = outcome.answer().unwrap_or_default().to_string();
            CommandResult::success_with_data("chat", message, Some(summary(&outcome)))
        }
        Err(error) => CommandResult::failure("chat", "agent_turn", error.to_string(), 5),
    }
}

fn summary(outcome: &TurnOutcome) -> Value {
    json!({
        "budgetExhausted": outcome.is_budget_exhausted(),
        "steps": outcome.steps().len(),
        "missingFields": outcome.missing_fields(),
        "rates": outcome.rates_display(RankOrder::CheapestFirst),
    })
}

fn prompt(request: &QuestionRequest) -> QuestionAnswer {
    let mut stderr = io::stderr();
    let _ = writeln!(stderr, "{}", request.question);
    for (index, option) in request.options.iter().enumerate() {
        let _ = writeln!(stderr, "  {}. {}", index + 1, option.label);
    }
    let _ = write!(stderr, "> ");
    let _ = stderr.flush();

    let mut line = String::new();
    match io::stdin().lock().read_line(&mut line) {
        Ok(_) => answer_from_line(request, &line),
        Err(_) => QuestionAnswer::Declined { skipped: None },
    }
}

/// Maps a typed reply onto the question: an option number picks that option,
/// anything else is taken as free input for every field asked.
pub fn answer_from_line(request: &QuestionRequest, line: &str) -> QuestionAnswer {
    let reply = line.trim();
    if reply.is_empty() {
        return QuestionAnswer::Declined { skipped: Some(true) };
    }

    let value = reply
        .parse::<usize>()
        .ok()
        .and_then(|number| number.checked_sub(1))
        .and_then(|index| request.options.get(index))
        .map_or_else(|| reply.to_string(), |option| option.value.clone());

    if request.fields.is_empty() {
        return QuestionAnswer::provided([("answer", json!(value))]);
    }
    QuestionAnswer::provided(request.fields.iter().map(|field| (field.as_str(), json!(value))))
}

#[cfg(test)]
mod tests {
    use serde_json::json;
    use staywise_agent::{QuestionAnswer, QuestionField, QuestionRequest};

    use super::answer_from_line;

    fn request(fields: Vec<QuestionField>) -> QuestionRequest {
        serde_json::from_value(json!({
            "question": "How many adults?",
            "options": [{ "value": "1", "label": "Just me" }, { "value": "2", "label": "Two" }],
            "allowsInput": true,
        }))
        .map(|request: QuestionRequest| QuestionRequest { fields, ..request })
        .expect("valid question")
    }

    #[test]
    fn option_number_selects_option_value() {
        let answer = answer_from_line(&request(vec![QuestionField::Adults]), "2\n");
        assert_eq!(answer, QuestionAnswer::provided([("adults", json!("2"))]));
    }

    #[test]
    fn free_text_without_fields_is_a_generic_answer() {
        let answer = answer_from_line(&request(Vec::new()), "somewhere quiet");
        assert_eq!(answer, QuestionAnswer::provided([("answer", json!("somewhere quiet"))]));
    }

    #[test]
    fn blank_line_declines() {
        assert_eq!(
            answer_from_line(&request(vec![QuestionField::Checkin]), "  \n"),
            QuestionAnswer::Declined { skipped: Some(true) }
        );
    }
}
