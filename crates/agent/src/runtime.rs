use std::sync::Arc;

use chrono::Local;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use staywise_core::config::AgentConfig;
use staywise_core::{
    HeuristicIntentDecoder, IntentDecoder, PlaceResolution, RankOrder, RankedHotelView,
    RateSearchResponse, RatesDisplay, SearchError, ValidationError,
};
use staywise_provider::HotelDataClient;
use thiserror::Error;
use tracing::{error, info, warn};

use crate::conversation::{
    GatheredFields, Message, PendingQuestion, QuestionAnswer, QuestionField, QuestionRequest,
    ToolCall,
};
use crate::guardrails::GuardrailPolicy;
use crate::llm::{CompletionRequest, LlmClient};
use crate::prompt::{system_contract, BookingDefaults};
use crate::tools::{
    AskQuestionTool, HotelRatesSearchTool, HotelSearchTool, ToolRegistry, HOTEL_RATES_SEARCH,
    HOTEL_SEARCH,
};

pub const DEFAULT_MAX_STEPS: u32 = 5;

#[derive(Debug, Error)]
pub enum AgentError {
    #[error("configuration failure: {0}")]
    Configuration(String),
    #[error("language model call failed: {0}")]
    Llm(String),
    #[error("cannot resume turn: {0}")]
    InvalidResume(String),
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ToolInvocation {
    pub call_id: String,
    pub name: String,
    pub arguments: Value,
    /// `None` only for a question still waiting on the user.
    pub result: Option<Value>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct AgentStep {
    pub number: u32,
    pub content: Option<String>,
    pub invocations: Vec<ToolInvocation>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct LoopState {
    pub turn_id: String,
    pub messages: Vec<Message>,
    pub step: u32,
    pub steps: Vec<AgentStep>,
    pub gathered: GatheredFields,
}

/// A turn parked on an `ask_question` call.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SuspendedTurn {
    pub state: LoopState,
    pub pending: PendingQuestion,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum TurnOutcome {
    Completed { answer: String, state: LoopState },
    BudgetExhausted { partial_answer: Option<String>, state: LoopState },
    AwaitingInput { suspended: SuspendedTurn },
}

impl TurnOutcome {
    pub fn state(&self) -> &LoopState {
        match self {
            Self::Completed { state, .. } | Self::BudgetExhausted { state, .. } => state,
            Self::AwaitingInput { suspended } => &suspended.state,
        }
    }

    pub fn answer(&self) -> Option<&str> {
        match self {
            Self::Completed { answer, .. } => Some(answer),
            Self::BudgetExhausted { partial_answer, .. } => partial_answer.as_deref(),
            Self::AwaitingInput { .. } => None,
        }
    }

    pub fn is_budget_exhausted(&self) -> bool {
        matches!(self, Self::BudgetExhausted { .. })
    }

    pub fn pending_question(&self) -> Option<&PendingQuestion> {
        match self {
            Self::AwaitingInput { suspended } => Some(&suspended.pending),
            _ => None,
        }
    }

    pub fn steps(&self) -> &[AgentStep] {
        &self.state().steps
    }

    pub fn history(&self) -> &[Message] {
        &self.state().messages
    }

    pub fn gathered(&self) -> &GatheredFields {
        &self.state().gathered
    }

    pub fn missing_fields(&self) -> Vec<QuestionField> {
        self.gathered().missing()
    }

    /// Display model for the most recent rate search of the turn.
    pub fn rates_display(&self, order: RankOrder) -> Option<RatesDisplay> {
        let result = self
            .steps()
            .iter()
            .rev()
            .flat_map(|step| step.invocations.iter().rev())
            .filter(|invocation| invocation.name == HOTEL_RATES_SEARCH)
            .find_map(|invocation| invocation.result.as_ref())?;

        if let Some(message) = result.get("error").and_then(Value::as_str) {
            if result.get("data").is_none() {
                let code = result
                    .get("status")
                    .and_then(Value::as_u64)
                    .map_or_else(|| "Unknown".to_string(), |status| status.to_string());
                return Some(RatesDisplay::Error { code, message: message.to_string() });
            }
        }

        let response = RateSearchResponse::from_value(result).ok()?;
        Some(RatesDisplay::from_response(&response, order))
    }

    pub fn hotel_views(&self, order: RankOrder) -> Vec<RankedHotelView> {
        match self.rates_display(order) {
            Some(RatesDisplay::Hotels { hotels }) => hotels,
            _ => Vec::new(),
        }
    }
}

enum Dispatched {
    Result(Value),
    Suspend(QuestionRequest),
}

/// Bounded tool-calling loop over one conversation turn.
pub struct AgentRuntime {
    llm: Arc<dyn LlmClient>,
    tools: ToolRegistry,
    guardrails: GuardrailPolicy,
    decoder: Arc<dyn IntentDecoder>,
    defaults: BookingDefaults,
    max_steps: u32,
}

impl AgentRuntime {
    pub fn new(llm: Arc<dyn LlmClient>, tools: ToolRegistry, guardrails: GuardrailPolicy) -> Self {
        Self {
            llm,
            tools,
            guardrails,
            decoder: Arc::new(HeuristicIntentDecoder::new()),
            defaults: BookingDefaults::default(),
            max_steps: DEFAULT_MAX_STEPS,
        }
    }

    /// Runtime with the three hotel tools registered and active.
    pub fn for_hotels(
        llm: Arc<dyn LlmClient>,
        client: Arc<dyn HotelDataClient>,
        config: &AgentConfig,
    ) -> Self {
        let decoder: Arc<dyn IntentDecoder> = Arc::new(HeuristicIntentDecoder::new());

        let mut tools = ToolRegistry::default();
        tools.register(
            HotelSearchTool::new(client.clone(), decoder.clone()).with_language(config.language.clone()),
        );
        tools.register(HotelRatesSearchTool::new(client));
        tools.register(AskQuestionTool);

        Self::new(llm, tools, GuardrailPolicy::default())
            .with_decoder(decoder)
            .with_max_steps(config.max_steps)
            .with_defaults(BookingDefaults {
                language: config.language.clone(),
                currency: config.currency.clone(),
                guest_nationality: config.guest_nationality.clone(),
            })
    }

    pub fn with_max_steps(mut self, max_steps: u32) -> Self {
        self.max_steps = max_steps;
        self
    }

    pub fn with_decoder(mut self, decoder: Arc<dyn IntentDecoder>) -> Self {
        self.decoder = decoder;
        self
    }

    pub fn with_defaults(mut self, defaults: BookingDefaults) -> Self {
        self.defaults = defaults;
        self
    }

    pub fn max_steps(&self) -> u32 {
        self.max_steps
    }

    pub async fn run_turn(
        &self,
        history: Vec<Message>,
        user_text: &str,
    ) -> Result<TurnOutcome, AgentError> {
        let mut gathered = GatheredFields::default();
        gathered.absorb_intent(&self.decoder.decode(user_text));

        let mut messages = history;
        messages.push(Message::user(user_text));

        let state = LoopState {
            turn_id: uuid::Uuid::new_v4().to_string(),
            messages,
            step: 0,
            steps: Vec::new(),
            gathered,
        };
        info!(
            event_name = "agent.turn.started",
            correlation_id = %state.turn_id,
            history = state.messages.len()
        );
        self.drive(state).await
    }

    /// Feeds the user's answer back as the question's tool result and
    /// continues the loop where it stopped.
    pub async fn resume(
        &self,
        suspended: SuspendedTurn,
        answer: QuestionAnswer,
    ) -> Result<TurnOutcome, AgentError> {
        let SuspendedTurn { mut state, mut pending } = suspended;
        check_step_count(&state, self.max_steps)?;
        let payload = pending
            .resolve(answer.clone())
            .map_err(|error| AgentError::InvalidResume(error.to_string()))?;

        let invocation = state
            .steps
            .last_mut()
            .and_then(|step| {
                step.invocations.iter_mut().find(|invocation| {
                    invocation.call_id == pending.call_id && invocation.result.is_none()
                })
            })
            .ok_or_else(|| {
                AgentError::InvalidResume(format!(
                    "no open question with call id `{}`",
                    pending.call_id
                ))
            })?;
        invocation.result = Some(payload.clone());

        state.messages.push(Message::tool_result(&pending.call_id, &payload));
        state.gathered.absorb_answer(&pending.request, &answer);
        info!(
            event_name = "agent.turn.resumed",
            correlation_id = %state.turn_id,
            declined = matches!(answer, QuestionAnswer::Declined { .. })
        );
        self.drive(state).await
    }

    async fn drive(&self, mut state: LoopState) -> Result<TurnOutcome, AgentError> {
        let system = system_contract(&self.defaults, Local::now());
        let tools = self.tools.definitions(self.guardrails.active_tools());

        loop {
            if state.step >= self.max_steps {
                warn!(
                    event_name = "agent.turn.budget_exhausted",
                    correlation_id = %state.turn_id,
                    steps = state.step
                );
                let partial_answer = state.steps.iter().rev().find_map(|step| step.content.clone());
                return Ok(TurnOutcome::BudgetExhausted { partial_answer, state });
            }

            let request = CompletionRequest {
                system: system.clone(),
                messages: state.messages.clone(),
                tools: tools.clone(),
            };
            let completion = self
                .llm
                .complete(&request)
                .await
                .map_err(|error| AgentError::Llm(format!("{error:#}")))?;

            state
                .messages
                .push(Message::assistant(completion.content.clone(), completion.tool_calls.clone()));

            if completion.tool_calls.is_empty() {
                info!(
                    event_name = "agent.turn.completed",
                    correlation_id = %state.turn_id,
                    steps = state.step
                );
                let answer = completion.content.unwrap_or_default();
                return Ok(TurnOutcome::Completed { answer, state });
            }

            state.step += 1;
            let mut step = AgentStep {
                number: state.step,
                content: completion.content,
                invocations: Vec::with_capacity(completion.tool_calls.len()),
            };
            let mut pending: Option<PendingQuestion> = None;

            for call in completion.tool_calls {
                match self.dispatch(&call, pending.is_some(), &state.turn_id).await? {
                    Dispatched::Result(result) => {
                        absorb_result(&mut state.gathered, &call, &result);
                        state.messages.push(Message::tool_result(&call.id, &result));
                        step.invocations.push(ToolInvocation {
                            call_id: call.id,
                            name: call.name,
                            arguments: call.arguments,
                            result: Some(result),
                        });
                    }
                    Dispatched::Suspend(request) => {
                        pending = Some(PendingQuestion::new(call.id.clone(), request));
                        step.invocations.push(ToolInvocation {
                            call_id: call.id,
                            name: call.name,
                            arguments: call.arguments,
                            result: None,
                        });
                    }
                }
            }
            state.steps.push(step);

            if let Some(pending) = pending {
                info!(
                    event_name = "agent.turn.awaiting_input",
                    correlation_id = %state.turn_id,
                    call_id = %pending.call_id
                );
                return Ok(TurnOutcome::AwaitingInput { suspended: SuspendedTurn { state, pending } });
            }
        }
    }

    async fn dispatch(
        &self,
        call: &ToolCall,
        question_open: bool,
        turn_id: &str,
    ) -> Result<Dispatched, AgentError> {
        let decision = self.guardrails.evaluate(&call.name, &self.tools);
        if let Some(payload) = decision.denial_payload() {
            warn!(
                event_name = "agent.tool.denied",
                correlation_id = %turn_id,
                tool = %call.name
            );
            return Ok(Dispatched::Result(payload));
        }
        let Some(tool) = self.tools.get(&call.name) else {
            return Ok(Dispatched::Result(json!({ "error": format!("Tool `{}` does not exist.", call.name) })));
        };

        if tool.suspends() && question_open {
            let error = SearchError::from(ValidationError::invalid(
                "question",
                "only one question can be asked at a time",
            ));
            return Ok(Dispatched::Result(error.to_tool_payload()));
        }

        info!(
            event_name = "agent.tool.invoked",
            correlation_id = %turn_id,
            tool = %call.name,
            call_id = %call.id
        );
        match tool.execute(call.arguments.clone()).await {
            Ok(result) if tool.suspends() => match serde_json::from_value(result) {
                Ok(request) => Ok(Dispatched::Suspend(request)),
                Err(error) => Ok(Dispatched::Result(
                    SearchError::from(ValidationError::Malformed(error.to_string())).to_tool_payload(),
                )),
            },
            Ok(result) => Ok(Dispatched::Result(result)),
            Err(SearchError::Configuration(message)) => {
                error!(
                    event_name = "agent.tool.configuration_error",
                    correlation_id = %turn_id,
                    tool = %call.name,
                    error = %message
                );
                Err(AgentError::Configuration(message))
            }
            Err(failure) => {
                warn!(
                    event_name = "agent.tool.failed",
                    correlation_id = %turn_id,
                    tool = %call.name,
                    error_class = failure.class().as_str(),
                    error = %failure
                );
                Ok(Dispatched::Result(failure.to_tool_payload()))
            }
        }
    }
}

/// A suspended state comes back from the client, so its step counter must
/// still agree with the recorded steps and stay within budget.
fn check_step_count(state: &LoopState, max_steps: u32) -> Result<(), AgentError> {
    let numbered = state
        .steps
        .iter()
        .zip(1..)
        .all(|(step, expected): (&AgentStep, u32)| step.number == expected);
    if !numbered || state.steps.len() != state.step as usize || state.step > max_steps {
        return Err(AgentError::InvalidResume(format!(
            "suspended state records {} steps but claims step {}",
            state.steps.len(),
            state.step
        )));
    }
    Ok(())
}

fn absorb_result(gathered: &mut GatheredFields, call: &ToolCall, result: &Value) {
    match call.name.as_str() {
        HOTEL_SEARCH => {
            if let Ok(resolution) = serde_json::from_value::<PlaceResolution>(result.clone()) {
                gathered.absorb_places(&resolution);
            }
        }
        HOTEL_RATES_SEARCH if result.get("error").is_none() => {
            gathered.absorb_rate_arguments(&call.arguments);
        }
        _ => {}
    }
}
