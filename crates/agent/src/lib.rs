//! Conversational hotel-search agent.
//!
//! A turn runs a bounded loop: the model either answers or asks for tools,
//! tool results are appended to the history, and the loop stops on a final
//! answer, on an `ask_question` call (the turn suspends until the user
//! answers), or when the step budget runs out.
//!
//! # Key Types
//!
//! - `AgentRuntime` - the loop itself (see `runtime`)
//! - `LlmClient` - pluggable model client; `OpenAiCompatClient` covers OpenAI and Ollama
//! - `GuardrailPolicy` - the closed set of tools a turn may call
//! - `PendingQuestion` - a clarifying question waiting on the user

pub mod conversation;
pub mod guardrails;
pub mod llm;
pub mod prompt;
pub mod runtime;
pub mod tools;

pub use conversation::{
    GatheredFields, Message, PendingQuestion, QuestionAnswer, QuestionField, QuestionRequest, Role,
    ToolCall,
};
pub use guardrails::{GuardrailDecision, GuardrailPolicy};
pub use llm::{Completion, CompletionRequest, LlmClient, OpenAiCompatClient};
pub use runtime::{AgentError, AgentRuntime, AgentStep, LoopState, SuspendedTurn, TurnOutcome};
pub use tools::{Tool, ToolDefinition, ToolRegistry};
