//! Content moderation
//!
//! Two layers: a regex scan that blocks obvious cases outright, then an LLM
//! classifier that scores the rest. The verdict compares the score against
//! the threshold of the caller's filter level.

mod classifier;
mod keywords;

pub use classifier::{classify, parse_classification, Classification};
pub use keywords::{scan, KEYWORD_FLAG_DESCRIPTION};

use std::sync::Arc;

use crate::config::{ModerationConfig, SeverityThresholds};
use crate::llm::LanguageModel;
use crate::types::{
    FilterLevel, ModerationCatalog, ModerationCategory, ModerationFlag, ModerationResult, Severity,
};

/// Floor applied to the score when keyword flags exist but did not block
const KEYWORD_SCORE_FLOOR: f64 = 0.5;

fn has_high(flags: &[ModerationFlag]) -> bool {
    flags.iter().any(|f| f.severity == Severity::High)
}

pub struct Moderator {
    classifier: Option<Arc<dyn LanguageModel>>,
    thresholds: SeverityThresholds,
    max_batch_size: usize,
}

impl Moderator {
    pub fn new(classifier: Option<Arc<dyn LanguageModel>>, config: &ModerationConfig) -> Self {
        Self {
            classifier,
            thresholds: config.thresholds,
            max_batch_size: config.max_batch_size,
        }
    }

    pub fn classifier_configured(&self) -> bool {
        self.classifier.is_some()
    }

    /// Score cutoff for a filter level
    pub fn threshold(&self, level: FilterLevel) -> f64 {
        match level {
            FilterLevel::Strict => self.thresholds.strict,
            FilterLevel::Moderate => self.thresholds.moderate,
            FilterLevel::Relaxed => self.thresholds.relaxed,
        }
    }

    /// Moderate one piece of content
    pub async fn moderate(&self, content: &str, level: FilterLevel) -> ModerationResult {
        let keyword_flags = scan(content);
        if has_high(&keyword_flags) {
            tracing::info!(flags = keyword_flags.len(), "content blocked by keyword filter");
            return ModerationResult {
                passed: false,
                flags: keyword_flags,
                score: 1.0,
            };
        }

        let classification = classify(self.classifier.as_deref(), content)
            .await
            .into_value();

        let mut score = classification.score;
        if !keyword_flags.is_empty() {
            score = score.max(KEYWORD_SCORE_FLOOR);
        }

        let mut flags = keyword_flags;
        flags.extend(classification.flags);

        let passed = score < self.threshold(level) && !has_high(&flags);
        tracing::debug!(passed, score, ?level, "content moderated");
        ModerationResult {
            passed,
            flags,
            score,
        }
    }

    /// Moderate up to `max_batch_size` items, each against the moderate
    /// threshold using the raw classifier score
    pub async fn moderate_batch(&self, contents: &[String]) -> Vec<ModerationResult> {
        if contents.len() > self.max_batch_size {
            tracing::debug!(
                submitted = contents.len(),
                limit = self.max_batch_size,
                "batch truncated"
            );
        }

        let threshold = self.threshold(FilterLevel::Moderate);
        let checks = contents.iter().take(self.max_batch_size).map(|content| async move {
            let mut flags = scan(content);
            let classification = classify(self.classifier.as_deref(), content)
                .await
                .into_value();
            flags.extend(classification.flags);

            ModerationResult {
                passed: classification.score < threshold && !has_high(&flags),
                flags,
                score: classification.score,
            }
        });
        futures::future::join_all(checks).await
    }

    /// The advertised categories, severities and filter levels
    pub fn catalog() -> ModerationCatalog {
        ModerationCatalog {
            categories: ModerationCategory::ALL.to_vec(),
            severity_levels: Severity::ALL.to_vec(),
            filter_levels: FilterLevel::ALL.to_vec(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::scripted::{Script, ScriptedModel};
    use pretty_assertions::assert_eq;

    fn moderator_with(model: Option<Arc<ScriptedModel>>) -> Moderator {
        Moderator::new(
            model.map(|m| m as Arc<dyn LanguageModel>),
            &ModerationConfig::default(),
        )
    }

    fn scored(score: f64) -> Arc<ScriptedModel> {
        Arc::new(ScriptedModel::replying(&format!(
            r#"{{"flags": [], "score": {}}}"#,
            score
        )))
    }

    #[tokio::test]
    async fn test_keyword_block_short_circuits() {
        let model = scored(0.0);
        let moderator = moderator_with(Some(model.clone()));

        let result = moderator
            .moderate("I will kill someone", FilterLevel::Relaxed)
            .await;
        assert!(!result.passed);
        assert_eq!(result.score, 1.0);
        assert_eq!(result.flags.len(), 1);
        assert_eq!(result.flags[0].category, ModerationCategory::Violence);
        assert_eq!(model.calls(), 0);
    }

    #[tokio::test]
    async fn test_thresholds_by_level() {
        let moderator = moderator_with(Some(scored(0.5)));
        assert!(!moderator.moderate("hi", FilterLevel::Strict).await.passed);
        assert!(moderator.moderate("hi", FilterLevel::Moderate).await.passed);
        assert!(moderator.moderate("hi", FilterLevel::Relaxed).await.passed);

        let moderator = moderator_with(Some(scored(0.6)));
        assert!(!moderator.moderate("hi", FilterLevel::Moderate).await.passed);
    }

    #[tokio::test]
    async fn test_classifier_high_flag_fails_regardless_of_score() {
        let model = Arc::new(ScriptedModel::replying(
            r#"{"flags": [{"category": "hate_speech", "severity": "high", "description": "slur"}], "score": 0.1}"#,
        ));
        let result = moderator_with(Some(model))
            .moderate("something subtle", FilterLevel::Relaxed)
            .await;
        assert!(!result.passed);
        assert_eq!(result.flags[0].category, ModerationCategory::HateSpeech);
        assert!((result.score - 0.1).abs() < 1e-9);
    }

    #[tokio::test]
    async fn test_unconfigured_classifier_passes_clean_content() {
        let result = moderator_with(None)
            .moderate("Tell me a story", FilterLevel::Strict)
            .await;
        assert_eq!(result, ModerationResult::passing());
    }

    #[tokio::test]
    async fn test_batch_truncates_and_uses_raw_score() {
        let model = Arc::new(ScriptedModel::new(|request| {
            let score = if request.messages[0].content.contains("borderline") {
                0.7
            } else {
                0.1
            };
            Script::Reply(format!(r#"{{"flags": [], "score": {}}}"#, score))
        }));
        let moderator = moderator_with(Some(model.clone()));

        let mut contents: Vec<String> = vec![
            "hello".into(),
            "kill yourself".into(),
            "borderline".into(),
        ];
        contents.extend((0..10).map(|i| format!("filler {}", i)));

        let results = moderator.moderate_batch(&contents).await;
        assert_eq!(results.len(), 10);
        assert_eq!(model.calls(), 10);

        assert!(results[0].passed);
        // Keyword hit: flagged, but the score stays the classifier's
        assert!(!results[1].passed);
        assert!((results[1].score - 0.1).abs() < 1e-9);
        assert_eq!(results[1].flags[0].severity, Severity::High);

        assert!(!results[2].passed);
        assert!((results[2].score - 0.7).abs() < 1e-9);
    }

    #[tokio::test]
    async fn test_batch_empty() {
        assert!(moderator_with(None).moderate_batch(&[]).await.is_empty());
    }

    #[test]
    fn test_catalog() {
        let catalog = Moderator::catalog();
        assert_eq!(catalog.categories.len(), 8);
        assert!(!catalog.categories.contains(&ModerationCategory::Unknown));
        assert_eq!(
            serde_json::to_value(&catalog.severity_levels).unwrap(),
            serde_json::json!(["low", "medium", "high"])
        );
        assert_eq!(
            serde_json::to_value(&catalog.filter_levels).unwrap(),
            serde_json::json!(["strict", "moderate", "relaxed"])
        );
    }
}
