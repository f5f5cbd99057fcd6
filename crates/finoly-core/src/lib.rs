//! Finoly Core Library
//!
//! Shared functionality for the Finoly expense assistant:
//! - Sanitizing near-JSON model replies
//! - Named time periods to date ranges
//! - Expense record normalization
//! - Query text generation for view requests
//! - The interpreter that classifies and extracts from free text
//! - Pluggable inference backends (Groq, OpenAI-compatible, Ollama, mock)
//! - Prompt library for customizable prompts

pub mod ai;
pub mod config;
pub mod error;
pub mod expense;
pub mod interpreter;
pub mod periods;
pub mod prompts;
pub mod query;

/// Test utilities including a mock inference server
#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;

pub use ai::{
    AIBackend, AIClient, MockBackend, ModelReply, OllamaBackend, OpenAICompatibleBackend,
    ScriptedReply,
};
pub use config::{AIConfig, BackendKind};
pub use error::{Error, Result};
pub use expense::ExpenseRecord;
pub use interpreter::{
    ExpenseExtraction, ExpenseInterpreter, FilterExtraction, Interpretation, PromptAnalysis,
    PromptType,
};
pub use periods::{known_periods, resolve_period, resolve_period_at, DateRange};
pub use prompts::{Prompt, PromptId, PromptInfo, PromptLibrary};
pub use query::{build_query, build_query_at, AmountOperator, AmountRange, AmountValue, FilterSpec, QueryPlan};
