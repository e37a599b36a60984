//! LLM-backed content classifier
//!
//! Fails open: an unconfigured model, a provider error or an unparseable
//! reply all produce no flags and a zero score.

use serde_json::Value;

use crate::llm::{CompletionRequest, LanguageModel};
use crate::types::{Fetched, ModerationCategory, ModerationFlag, Severity};

/// Flags and score returned by the classifier
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Classification {
    pub flags: Vec<ModerationFlag>,
    /// Clamped to [0, 1]
    pub score: f64,
}

fn prompt(content: &str) -> String {
    let categories: Vec<&str> = ModerationCategory::ALL.iter().map(|c| c.as_str()).collect();
    format!(
        "Analyze the following content for safety issues. Respond with a JSON object containing:\n\
         - \"flags\": array of objects with \"category\" (one of: {}), \"severity\" (low/medium/high), and \"description\"\n\
         - \"score\": overall safety score from 0 (completely safe) to 1 (extremely unsafe)\n\n\
         Content to analyze:\n\"{}\"\n\n\
         Respond ONLY with valid JSON, no other text.",
        categories.join(", "),
        content
    )
}

/// Ask the model to classify `content`
pub async fn classify(model: Option<&dyn LanguageModel>, content: &str) -> Fetched<Classification> {
    let Some(model) = model else {
        return Fetched::fallback(Classification::default(), "classifier not configured");
    };

    let completion = match model.complete(&CompletionRequest::single(prompt(content))).await {
        Ok(completion) => completion,
        Err(e) => {
            tracing::warn!(error = %e, "AI moderation call failed");
            return Fetched::fallback(Classification::default(), e.to_string());
        }
    };

    match parse_classification(&completion.text) {
        Some(classification) => Fetched::Fresh(classification),
        None => {
            tracing::warn!(response = %completion.text, "Failed to parse AI moderation response");
            Fetched::fallback(Classification::default(), "unparseable classifier response")
        }
    }
}

/// Strip a surrounding Markdown code fence, if any
fn unfence(text: &str) -> &str {
    let trimmed = text.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    // Drop the info string ("json") on the opening line
    let body = rest.split_once('\n').map_or("", |(_, body)| body);
    body.trim_end().strip_suffix("```").unwrap_or(body).trim()
}

fn parse_flag(value: &Value) -> Option<ModerationFlag> {
    let object = value.as_object()?;
    let category = object
        .get("category")
        .and_then(Value::as_str)
        .and_then(|s| s.parse().ok())
        .unwrap_or(ModerationCategory::Unknown);
    let severity = object
        .get("severity")
        .and_then(Value::as_str)
        .and_then(|s| s.parse().ok())
        .unwrap_or(Severity::Low);
    let description = object
        .get("description")
        .and_then(Value::as_str)
        .unwrap_or_default();
    Some(ModerationFlag::new(category, severity, description))
}

fn parse_score(value: Option<&Value>) -> f64 {
    let score = match value {
        Some(Value::Number(n)) => n.as_f64().unwrap_or(0.0),
        Some(Value::String(s)) => s.trim().parse().unwrap_or(0.0),
        _ => 0.0,
    };
    if score.is_finite() {
        score.clamp(0.0, 1.0)
    } else {
        0.0
    }
}

/// Parse the classifier's JSON reply; `None` if it is not a JSON object
pub fn parse_classification(text: &str) -> Option<Classification> {
    let data: Value = serde_json::from_str(unfence(text)).ok()?;
    let object = data.as_object()?;

    let flags = object
        .get("flags")
        .and_then(Value::as_array)
        .map(|flags| flags.iter().filter_map(parse_flag).collect())
        .unwrap_or_default();

    Some(Classification {
        flags,
        score: parse_score(object.get("score")),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::scripted::ScriptedModel;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_parse_plain_json() {
        let parsed = parse_classification(
            r#"{"flags": [{"category": "harassment", "severity": "medium", "description": "insult"}], "score": 0.4}"#,
        )
        .unwrap();
        assert_eq!(
            parsed,
            Classification {
                flags: vec![ModerationFlag::new(
                    ModerationCategory::Harassment,
                    Severity::Medium,
                    "insult"
                )],
                score: 0.4,
            }
        );
    }

    #[test]
    fn test_parse_fenced_json() {
        let parsed = parse_classification("```json\n{\"flags\": [], \"score\": 0.2}\n```").unwrap();
        assert!(parsed.flags.is_empty());
        assert!((parsed.score - 0.2).abs() < 1e-9);

        let bare_fence = parse_classification("```\n{\"score\": 0.1}\n```").unwrap();
        assert!((bare_fence.score - 0.1).abs() < 1e-9);
    }

    #[test]
    fn test_parse_lenient_fields() {
        let parsed = parse_classification(
            r#"{"flags": [{"category": "gore"}, "not an object", {"severity": "HIGH"}], "score": "7"}"#,
        )
        .unwrap();
        assert_eq!(parsed.flags.len(), 2);
        assert_eq!(parsed.flags[0].category, ModerationCategory::Unknown);
        assert_eq!(parsed.flags[0].severity, Severity::Low);
        assert_eq!(parsed.flags[1].severity, Severity::High);
        assert_eq!(parsed.score, 1.0);
    }

    #[test]
    fn test_parse_rejects_non_json() {
        assert!(parse_classification("I think this is fine.").is_none());
        assert!(parse_classification("[1, 2]").is_none());
    }

    #[test]
    fn test_negative_score_clamped() {
        assert_eq!(parse_classification(r#"{"score": -3}"#).unwrap().score, 0.0);
    }

    #[tokio::test]
    async fn test_classify_fails_open() {
        let unconfigured = classify(None, "hello").await;
        assert!(unconfigured.is_fallback());
        assert_eq!(unconfigured.value().score, 0.0);

        let failing = ScriptedModel::failing();
        let result = classify(Some(&failing), "hello").await;
        assert!(result.is_fallback());

        let rambling = ScriptedModel::replying("Looks safe to me!");
        let result = classify(Some(&rambling), "hello").await;
        assert!(result.is_fallback());
        assert!(result.value().flags.is_empty());
    }

    #[tokio::test]
    async fn test_classify_sends_content_in_prompt() {
        let model = ScriptedModel::replying(r#"{"flags": [], "score": 0.05}"#);
        let result = classify(Some(&model), "a quiet walk in the park").await;
        assert_eq!(result, Fetched::Fresh(Classification { flags: vec![], score: 0.05 }));

        let request = model.last_request().unwrap();
        assert!(request.system.is_none());
        assert!(request.messages[0].content.contains("\"a quiet walk in the park\""));
        assert!(request.messages[0].content.contains("self_harm"));
    }
}
