//! JSON extraction for model replies
//!
//! Models wrap their JSON in markdown fences, reasoning blocks and chatty prose.
//! [`sanitize_reply`] cuts a single top-level array/object out of that noise so a
//! strict JSON parser can take over. It is best-effort: the output is not
//! guaranteed to be valid JSON, and callers must handle the parse failure.

use regex::Regex;
use serde::de::DeserializeOwned;

use crate::error::{Error, Result};

use super::types::ModelReply;

const THINK_BLOCK: &str = r"(?s)<think>.*?</think>";
const FENCE_OPEN: &str = "```json";
const FENCE_CLOSE: &str = "```";

/// Where the JSON payload is taken to start
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PayloadStart {
    /// First `[` anywhere in the text, else first `{`
    #[default]
    PreferArray,
    /// First `{`, else first `[`; for tasks whose answer is a single object
    PreferObject,
}

/// Scanner state while walking the JSON payload
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ScanState {
    Outside,
    InString,
    /// A backslash was seen; the next char is skipped and the scanner
    /// returns to the side of the string it came from.
    EscapePending { in_string: bool },
}

/// Reduce a raw model reply to the text of a single JSON value.
///
/// Steps, in order: drop `<think>…</think>` blocks, drop a leading
/// ```` ```json ```` and a trailing ```` ``` ````, trim, skip to the first `[`
/// (or the first `{` when the text has no `[` at all), then cut right after the
/// bracket that balances the payload. Text without any bracket comes back trimmed.
pub fn sanitize_reply(text: &str) -> String {
    sanitize_reply_as(text, PayloadStart::PreferArray)
}

/// [`sanitize_reply`] with an explicit payload start rule
pub fn sanitize_reply_as(text: &str, payload_start: PayloadStart) -> String {
    let think = Regex::new(THINK_BLOCK).expect("valid regex");
    let stripped = think.replace_all(text, "");

    let mut content: &str = &stripped;
    if let Some(rest) = content.strip_prefix(FENCE_OPEN) {
        content = rest;
    }
    if let Some(rest) = content.strip_suffix(FENCE_CLOSE) {
        content = rest;
    }
    let content = content.trim();

    let start = match payload_start {
        PayloadStart::PreferArray => content.find('[').or_else(|| content.find('{')),
        PayloadStart::PreferObject => content.find('{').or_else(|| content.find('[')),
    };
    match start {
        Some(start) => {
            let payload = &content[start..];
            match balanced_end(payload) {
                Some(end) => payload[..end].to_string(),
                None => payload.to_string(),
            }
        }
        None => content.to_string(),
    }
}

/// Byte offset just past the char where bracket and brace depth both return to
/// zero, or `None` if the payload never balances (including an unterminated
/// string, which keeps the scanner in `InString` until the end).
fn balanced_end(payload: &str) -> Option<usize> {
    let mut state = ScanState::Outside;
    let mut brackets: i32 = 0;
    let mut braces: i32 = 0;

    for (i, c) in payload.char_indices() {
        state = match state {
            ScanState::EscapePending { in_string } => {
                if in_string {
                    ScanState::InString
                } else {
                    ScanState::Outside
                }
            }
            ScanState::InString => match c {
                '\\' => ScanState::EscapePending { in_string: true },
                '"' => ScanState::Outside,
                _ => ScanState::InString,
            },
            ScanState::Outside => match c {
                '\\' => ScanState::EscapePending { in_string: false },
                '"' => ScanState::InString,
                '[' | ']' | '{' | '}' => {
                    match c {
                        '[' => brackets += 1,
                        ']' => brackets -= 1,
                        '{' => braces += 1,
                        _ => braces -= 1,
                    }
                    if brackets == 0 && braces == 0 {
                        return Some(i + c.len_utf8());
                    }
                    ScanState::Outside
                }
                _ => ScanState::Outside,
            },
        };
    }

    None
}

/// Sanitize a reply and parse it strictly into `T`
pub fn parse_reply<T: DeserializeOwned>(reply: &ModelReply) -> Result<T> {
    parse_reply_as(reply, PayloadStart::PreferArray)
}

/// [`parse_reply`] with an explicit payload start rule
pub fn parse_reply_as<T: DeserializeOwned>(
    reply: &ModelReply,
    payload_start: PayloadStart,
) -> Result<T> {
    let json_str = reply.sanitized_as(payload_start)?;
    serde_json::from_str(&json_str).map_err(|e| {
        // Truncate long replies for the error message
        Error::MalformedReply(format!("{} | Raw: {}", e, truncate_for_error(&json_str)))
    })
}

fn truncate_for_error(text: &str) -> String {
    if text.chars().count() > 200 {
        let head: String = text.chars().take(200).collect();
        format!("{}...", head)
    } else {
        text.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sanitize_fenced_json_with_prose() {
        let raw = "prefix ```json {\"a\":1} ``` suffix";
        assert_eq!(sanitize_reply(raw), r#"{"a":1}"#);
    }

    #[test]
    fn test_sanitize_leading_fence() {
        let raw = "```json\n[{\"amount\": \"50\", \"category\": \"food\"}]\n```";
        assert_eq!(
            sanitize_reply(raw),
            r#"[{"amount": "50", "category": "food"}]"#
        );
    }

    #[test]
    fn test_sanitize_think_block_then_array() {
        let raw = "<think>\nThe user wants {\"x\": [1, 2]} maybe?\n</think>\n\n[{\"amount\": \"80\"}]";
        assert_eq!(sanitize_reply(raw), r#"[{"amount": "80"}]"#);
    }

    #[test]
    fn test_sanitize_multiple_think_blocks() {
        let raw = "<think>a [</think>{\"k\": 1}<think>b ]</think>";
        assert_eq!(sanitize_reply(raw), r#"{"k": 1}"#);
    }

    #[test]
    fn test_sanitize_unclosed_think_is_kept() {
        let raw = "<think>unfinished {\"k\": 1}";
        assert_eq!(sanitize_reply(raw), r#"{"k": 1}"#);
    }

    #[test]
    fn test_sanitize_escaped_quote_next_to_brace() {
        let raw = r#"Sure! {"note": "she said \"}\" loudly", "n": 2} hope that helps"#;
        assert_eq!(
            sanitize_reply(raw),
            r#"{"note": "she said \"}\" loudly", "n": 2}"#
        );
    }

    #[test]
    fn test_sanitize_backslash_outside_string_skips_next_char() {
        assert_eq!(sanitize_reply(r"x [\] ] tail"), r"[\] ]");
        assert_eq!(sanitize_reply(r#"{"a": 1 \} } after"#), r#"{"a": 1 \} }"#);
    }

    #[test]
    fn test_sanitize_brackets_inside_strings_ignored() {
        let raw = r#"[{"text": "over ] 100 }"}] trailing ]"#;
        assert_eq!(sanitize_reply(raw), r#"[{"text": "over ] 100 }"}]"#);
    }

    #[test]
    fn test_sanitize_prefers_bracket_over_earlier_brace() {
        let raw = r#"{"missing_info": true, "required_fields": ["amount"]}"#;
        assert_eq!(sanitize_reply(raw), r#"["amount"]"#);
    }

    #[test]
    fn test_sanitize_prefer_object() {
        let raw = r#"ok: {"amount_range": {"operator": "between", "value": [50, 200]}} done"#;
        assert_eq!(
            sanitize_reply_as(raw, PayloadStart::PreferObject),
            r#"{"amount_range": {"operator": "between", "value": [50, 200]}}"#
        );
        assert_eq!(sanitize_reply(raw), "[50, 200]");
        assert_eq!(sanitize_reply_as("[1] x", PayloadStart::PreferObject), "[1]");
    }

    #[test]
    fn test_sanitize_unmatched_quote_keeps_rest() {
        let raw = r#"{"a": "open } ] tail"#;
        assert_eq!(sanitize_reply(raw), r#"{"a": "open } ] tail"#);
    }

    #[test]
    fn test_sanitize_no_json_returns_trimmed() {
        assert_eq!(sanitize_reply("  no json here \n"), "no json here");
        assert_eq!(sanitize_reply(""), "");
    }

    #[test]
    fn test_sanitize_unbalanced_returns_tail() {
        assert_eq!(sanitize_reply("x [1, [2, 3]"), "[1, [2, 3]");
    }

    #[test]
    fn test_sanitize_multibyte_text() {
        let raw = "Voilà: {\"category\": \"café\"} ✓";
        assert_eq!(sanitize_reply(raw), "{\"category\": \"café\"}");
    }

    #[test]
    fn test_parse_reply_object() {
        let reply = ModelReply::Text("Here you go:\n{\"a\": 1}\nDone".into());
        let value: serde_json::Value = parse_reply(&reply).unwrap();
        assert_eq!(value["a"], 1);
    }

    #[test]
    fn test_parse_reply_malformed() {
        let reply = ModelReply::Text("I cannot help with that".into());
        let err = parse_reply::<serde_json::Value>(&reply).unwrap_err();
        assert!(matches!(err, Error::MalformedReply(_)));
    }

    #[test]
    fn test_truncate_for_error() {
        let long = "x".repeat(250);
        let truncated = truncate_for_error(&long);
        assert_eq!(truncated.len(), 203);
        assert!(truncated.ends_with("..."));
        assert_eq!(truncate_for_error("short"), "short");
    }
}
