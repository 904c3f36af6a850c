//! `POST /api/chat`: runs or resumes one agent turn.
//!
//! The server keeps no conversation state: a suspended turn is returned to
//! the client and sent back with the user's answer.

use axum::{
    extract::State,
    http::{HeaderMap, StatusCode},
    routing::post,
    Json, Router,
};
use serde::{Deserialize, Serialize};
use staywise_agent::{
    AgentError, AgentRuntime, Message, QuestionAnswer, QuestionField, SuspendedTurn, TurnOutcome,
};
use staywise_core::{InterfaceError, RankOrder, RatesDisplay, RequestOrigin, SearchError};
use staywise_provider::proxy::MISSING_KEY_MESSAGE;
use tracing::{error, info};
use uuid::Uuid;

use crate::bootstrap::{AppState, HotelDataSource};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResumeRequest {
    pub suspended: SuspendedTurn,
    pub answer: QuestionAnswer,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatRequest {
    #[serde(default)]
    pub history: Vec<Message>,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub resume: Option<ResumeRequest>,
    #[serde(default)]
    pub order: RankOrder,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatResponse {
    pub correlation_id: String,
    pub outcome: TurnOutcome,
    pub rates: Option<RatesDisplay>,
    pub notice: Option<String>,
    pub missing_fields: Vec<QuestionField>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatError {
    pub error: String,
    pub correlation_id: String,
}

pub fn router(state: AppState) -> Router {
    Router::new().route("/api/chat", post(chat)).with_state(state)
}

pub async fn chat(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(body): Json<ChatRequest>,
) -> Result<Json<ChatResponse>, (StatusCode, Json<ChatError>)> {
    let correlation_id = Uuid::new_v4().to_string();

    // A keyless same-origin proxy cannot serve any tool call.
    if matches!(*state.hotel_data, HotelDataSource::SameOrigin { .. }) && !state.proxy.has_api_key() {
        let error = SearchError::Configuration(MISSING_KEY_MESSAGE.to_string());
        return Err(interface_error(error.into_interface(&correlation_id)));
    }

    let base_url = state.base_url.resolve(Some(&request_origin(&headers)));
    let client = state
        .hotel_data
        .client_for(&base_url)
        .map_err(|error| interface_error(error.into_interface(&correlation_id)))?;
    let runtime = AgentRuntime::for_hotels(state.llm.clone(), client, &state.agent);

    let outcome = match (body.resume, body.message) {
        (Some(resume), _) => runtime.resume(resume.suspended, resume.answer).await,
        (None, Some(message)) if !message.trim().is_empty() => {
            runtime.run_turn(body.history, &message).await
        }
        _ => {
            return Err(interface_error(InterfaceError::BadRequest {
                message: "either `message` or `resume` is required".to_string(),
                correlation_id,
            }))
        }
    }
    .map_err(|error| interface_error(agent_interface_error(error, &correlation_id)))?;

    let rates = outcome.rates_display(body.order);
    info!(
        event_name = "server.chat.turn_finished",
        correlation_id = %correlation_id,
        steps = outcome.steps().len(),
        budget_exhausted = outcome.is_budget_exhausted(),
        awaiting_input = outcome.pending_question().is_some()
    );

    Ok(Json(ChatResponse {
        correlation_id,
        notice: rates.as_ref().and_then(RatesDisplay::notice),
        missing_fields: outcome.missing_fields(),
        rates,
        outcome,
    }))
}

fn request_origin(headers: &HeaderMap) -> RequestOrigin {
    let header = |name: &str| {
        headers.get(name).and_then(|value| value.to_str().ok()).map(str::to_string)
    };
    RequestOrigin {
        forwarded_proto: header("x-forwarded-proto"),
        forwarded_host: header("x-forwarded-host"),
        host: header("host"),
    }
}

fn agent_interface_error(error: AgentError, correlation_id: &str) -> InterfaceError {
    let correlation_id = correlation_id.to_string();
    match error {
        AgentError::Configuration(message) => InterfaceError::Internal { message, correlation_id },
        AgentError::Llm(message) => InterfaceError::ServiceUnavailable { message, correlation_id },
        AgentError::InvalidResume(message) => InterfaceError::BadRequest { message, correlation_id },
    }
}

fn interface_error(error: InterfaceError) -> (StatusCode, Json<ChatError>) {
    let status = match &error {
        InterfaceError::BadRequest { .. } => StatusCode::BAD_REQUEST,
        InterfaceError::ServiceUnavailable { .. } => StatusCode::SERVICE_UNAVAILABLE,
        InterfaceError::Internal { .. } => StatusCode::INTERNAL_SERVER_ERROR,
    };
    error!(
        event_name = "server.chat.failed",
        correlation_id = %error.correlation_id(),
        status = status.as_u16(),
        error = %error
    );
    (
        status,
        Json(ChatError {
            error: error.user_message().to_string(),
            correlation_id: error.correlation_id().to_string(),
        }),
    )
}
