//! One-shot interpretation from the terminal

use anyhow::{Context, Result};

use finoly_core::ai::{AIBackend, AIClient};
use finoly_core::{ExpenseInterpreter, Interpretation, PromptLibrary};

pub async fn cmd_interpret(prompt: &str) -> Result<()> {
    let client = AIClient::from_env().context(
        "AI backend not configured (set GROQ_API_KEY, or AI_BACKEND=ollama|openai_compatible|mock)",
    )?;
    tracing::debug!(host = client.host(), model = client.model(), "Using AI backend");

    let interpreter = ExpenseInterpreter::new(client, PromptLibrary::new());
    let interpretation = interpreter
        .interpret(prompt)
        .await
        .context("Expense tracking failed")?;

    println!("{}", format_interpretation(&interpretation)?);
    Ok(())
}

/// Pretty JSON for an interpretation
pub fn format_interpretation(interpretation: &Interpretation) -> Result<String> {
    Ok(serde_json::to_string_pretty(interpretation)?)
}
