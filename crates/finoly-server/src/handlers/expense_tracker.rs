//! Expense tracker handler
//!
//! One endpoint takes a free-text prompt and answers with either the
//! expenses it records or the query text for the expenses it asks to see.

use std::sync::Arc;

use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use finoly_core::{ExpenseRecord, Interpretation, PromptAnalysis, PromptType, QueryPlan};

use crate::{AppError, AppState};

const UNPARSED_EXPENSE_ERROR: &str = "Failed to parse expense data";
const UNPARSED_FILTER_ERROR: &str = "Failed to parse filter data";
const UNCLEAR_MESSAGE: &str = "Could not determine if this is an addition or view request";

/// Request body for `POST /api/expense-tracker`
#[derive(Debug, Deserialize)]
pub struct ExpenseTrackerRequest {
    pub prompt: Option<String>,
}

#[derive(Debug, Serialize)]
struct AdditionResponse<'a> {
    status: &'static str,
    prompt_type: PromptType,
    original_prompt: &'a str,
    prompt_analysis: &'a PromptAnalysis,
    expenses: &'a [ExpenseRecord],
}

#[derive(Debug, Serialize)]
struct ViewResponse<'a> {
    status: &'static str,
    prompt_type: PromptType,
    original_prompt: &'a str,
    prompt_analysis: &'a PromptAnalysis,
    query_result: &'a QueryPlan,
}

#[derive(Debug, Serialize)]
struct UnparsedResponse<'a> {
    status: &'static str,
    prompt_type: PromptType,
    original_prompt: &'a str,
    prompt_analysis: &'a PromptAnalysis,
    error: &'static str,
    message: &'a str,
    raw_response: &'a str,
}

#[derive(Debug, Serialize)]
struct UnclearResponse<'a> {
    status: &'static str,
    original_prompt: &'a str,
    prompt_analysis: &'a PromptAnalysis,
    message: &'static str,
}

#[derive(Debug, Serialize)]
struct MissingInfoResponse<'a> {
    error: &'static str,
    message: &'a str,
    required_fields: &'a [String],
    example_prompt: &'a str,
    original_prompt: &'a str,
}

#[derive(Debug, Serialize)]
struct InsufficientResponse<'a> {
    error: &'static str,
    message: &'a str,
    missing_fields: &'a [String],
    example_queries: &'a [String],
    original_prompt: &'a str,
}

/// POST /api/expense-tracker - Interpret a free-text expense prompt
pub async fn expense_tracker(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<ExpenseTrackerRequest>, JsonRejection>,
) -> Result<Response, AppError> {
    let interpreter = state.interpreter.as_ref().ok_or_else(|| {
        AppError::internal(
            "AI backend not configured",
            "Please set GROQ_API_KEY (or AI_BACKEND) environment variable",
        )
    })?;

    let prompt = match payload {
        Ok(Json(ExpenseTrackerRequest {
            prompt: Some(prompt),
        })) => prompt,
        Ok(_) => return Err(missing_prompt()),
        Err(rejection) => {
            debug!(error = %rejection, "Rejected expense tracker body");
            return Err(missing_prompt());
        }
    };

    let interpretation = interpreter
        .interpret(&prompt)
        .await
        .map_err(|e| AppError::failed("Expense tracking failed", e))?;

    info!(
        prompt_type = interpretation.analysis().prompt_type.as_str(),
        "Interpreted expense prompt"
    );

    Ok(render(&prompt, &interpretation))
}

fn missing_prompt() -> AppError {
    AppError::bad_request(
        "Missing prompt",
        "Please provide a prompt in the request body",
    )
}

/// Map an interpretation onto its status code and JSON body
fn render(prompt: &str, interpretation: &Interpretation) -> Response {
    match interpretation {
        Interpretation::Addition { analysis, expenses } => Json(AdditionResponse {
            status: "success",
            prompt_type: PromptType::Addition,
            original_prompt: prompt,
            prompt_analysis: analysis,
            expenses,
        })
        .into_response(),
        Interpretation::AdditionMissingInfo {
            required_fields,
            message,
            example_prompt,
            ..
        } => (
            StatusCode::BAD_REQUEST,
            Json(MissingInfoResponse {
                error: "Missing required information",
                message,
                required_fields,
                example_prompt,
                original_prompt: prompt,
            }),
        )
            .into_response(),
        Interpretation::AdditionUnparsed {
            analysis,
            raw_response,
            message,
        } => Json(UnparsedResponse {
            status: "unparsed",
            prompt_type: PromptType::Addition,
            original_prompt: prompt,
            prompt_analysis: analysis,
            error: UNPARSED_EXPENSE_ERROR,
            message,
            raw_response,
        })
        .into_response(),
        Interpretation::View { analysis, query } => Json(ViewResponse {
            status: "success",
            prompt_type: PromptType::View,
            original_prompt: prompt,
            prompt_analysis: analysis,
            query_result: query,
        })
        .into_response(),
        Interpretation::ViewInsufficient {
            message,
            missing_fields,
            example_queries,
            ..
        } => (
            StatusCode::BAD_REQUEST,
            Json(InsufficientResponse {
                error: "Insufficient information",
                message,
                missing_fields,
                example_queries,
                original_prompt: prompt,
            }),
        )
            .into_response(),
        Interpretation::ViewUnparsed {
            analysis,
            raw_response,
            message,
        } => Json(UnparsedResponse {
            status: "unparsed",
            prompt_type: PromptType::View,
            original_prompt: prompt,
            prompt_analysis: analysis,
            error: UNPARSED_FILTER_ERROR,
            message,
            raw_response,
        })
        .into_response(),
        Interpretation::Unclear { analysis } => Json(UnclearResponse {
            status: "unclear",
            original_prompt: prompt,
            prompt_analysis: analysis,
            message: UNCLEAR_MESSAGE,
        })
        .into_response(),
    }
}
