//! Lenient parsing of model output into a [`Classification`].

use serde::Deserialize;
use serde_json::Value;

use crate::types::Classification;

/// Reasoning attached to verdicts whose model output could not be read.
pub const PARSE_ERROR_REASON: &str = "Parse error";

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawVerdict {
    #[serde(default)]
    is_query: Value,
    #[serde(default)]
    confidence: Value,
    #[serde(default)]
    reasoning: Option<String>,
}

/// Remove a surrounding Markdown code fence (```` ```json ```` or ```` ``` ````).
pub fn strip_code_fences(text: &str) -> &str {
    let trimmed = text.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    let rest = rest.strip_prefix("json").unwrap_or(rest);
    let rest = rest.strip_suffix("```").unwrap_or(rest);
    rest.trim()
}

/// Parse model text into a verdict.
///
/// Returns `None` when the text is not a JSON object carrying a boolean
/// `isQuery`. Confidence accepts numbers or numeric strings and is clamped
/// to 0–100; anything else reads as 0.
pub fn parse_classification(text: &str) -> Option<Classification> {
    let raw: RawVerdict = serde_json::from_str(strip_code_fences(text)).ok()?;
    let is_query = raw.is_query.as_bool()?;
    Some(Classification {
        is_query,
        confidence: confidence(&raw.confidence),
        reasoning: raw.reasoning.unwrap_or_default(),
    })
}

#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn confidence(value: &Value) -> u8 {
    let n = match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().trim_end_matches('%').parse::<f64>().ok(),
        _ => None,
    };
    match n {
        Some(n) if n.is_finite() => n.round().clamp(0.0, 100.0) as u8,
        _ => 0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_json() {
        let c = parse_classification(
            r#"{"isQuery": true, "confidence": 85, "reasoning": "asks for notes"}"#,
        )
        .unwrap();
        assert!(c.is_query);
        assert_eq!(c.confidence, 85);
        assert_eq!(c.reasoning, "asks for notes");
    }

    #[test]
    fn fenced_json() {
        let text = "```json\n{\"isQuery\": false, \"confidence\": 10, \"reasoning\": \"chat\"}\n```";
        let c = parse_classification(text).unwrap();
        assert!(!c.is_query);
        assert_eq!(c.confidence, 10);
    }

    #[test]
    fn bare_fence() {
        assert_eq!(strip_code_fences("```\n{}\n```"), "{}");
        assert_eq!(strip_code_fences("  {}  "), "{}");
    }

    #[test]
    fn confidence_is_clamped_and_coerced() {
        let c = parse_classification(r#"{"isQuery": true, "confidence": 250}"#).unwrap();
        assert_eq!(c.confidence, 100);
        let c = parse_classification(r#"{"isQuery": true, "confidence": -4}"#).unwrap();
        assert_eq!(c.confidence, 0);
        let c = parse_classification(r#"{"isQuery": true, "confidence": "72"}"#).unwrap();
        assert_eq!(c.confidence, 72);
        let c = parse_classification(r#"{"isQuery": true, "confidence": 66.6}"#).unwrap();
        assert_eq!(c.confidence, 67);
        let c = parse_classification(r#"{"isQuery": true}"#).unwrap();
        assert_eq!(c.confidence, 0);
    }

    #[test]
    fn garbage_is_rejected() {
        assert!(parse_classification("Sure! Here is my answer").is_none());
        assert!(parse_classification(r#"{"isQuery": "yes"}"#).is_none());
        assert!(parse_classification("[]").is_none());
    }
}
