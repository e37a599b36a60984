//! Regex safety net run before the classifier

use once_cell::sync::Lazy;
use regex::Regex;

use crate::types::{ModerationCategory, ModerationFlag, Severity};

pub const KEYWORD_FLAG_DESCRIPTION: &str = "Content matched blocked pattern";

static VIOLENCE_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\b(kill|murder|harm|attack|hurt)\s+(yourself|myself|people|someone)\b").unwrap()
});

static SELF_HARM_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\b(suicide|self[- ]?harm|end\s+(my|your)\s+life)\b").unwrap());

static ILLEGAL_ACTIVITY_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\b(how\s+to\s+(make|create|build)\s+(an?\s+)?(bomb|weapon|drug))\b").unwrap()
});

static PERSONAL_INFO_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\b(what['\x{2019}]?s\s+your\s+(address|phone|ssn|credit\s+card))\b").unwrap()
});

fn patterns() -> [(ModerationCategory, &'static Regex); 4] {
    [
        (ModerationCategory::Violence, &*VIOLENCE_PATTERN),
        (ModerationCategory::SelfHarm, &*SELF_HARM_PATTERN),
        (ModerationCategory::IllegalActivity, &*ILLEGAL_ACTIVITY_PATTERN),
        (ModerationCategory::PersonalInfo, &*PERSONAL_INFO_PATTERN),
    ]
}

/// One high-severity flag per matching pattern, in pattern order
pub fn scan(content: &str) -> Vec<ModerationFlag> {
    let lowered = content.to_lowercase();
    patterns()
        .into_iter()
        .filter(|(_, pattern)| pattern.is_match(&lowered))
        .map(|(category, _)| ModerationFlag::new(category, Severity::High, KEYWORD_FLAG_DESCRIPTION))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn categories(content: &str) -> Vec<ModerationCategory> {
        scan(content).into_iter().map(|f| f.category).collect()
    }

    #[test]
    fn test_clean_content() {
        assert!(scan("Hello, how was your day?").is_empty());
        assert!(scan("").is_empty());
    }

    #[test]
    fn test_each_pattern() {
        assert_eq!(categories("I will HURT SOMEONE"), vec![ModerationCategory::Violence]);
        assert_eq!(categories("thinking about self-harm"), vec![ModerationCategory::SelfHarm]);
        assert_eq!(categories("I want to end my life"), vec![ModerationCategory::SelfHarm]);
        assert_eq!(
            categories("how to build bomb at home"),
            vec![ModerationCategory::IllegalActivity]
        );
        assert_eq!(
            categories("How to make a bomb"),
            vec![ModerationCategory::IllegalActivity]
        );
        assert_eq!(
            categories("What\u{2019}s your credit card number?"),
            vec![ModerationCategory::PersonalInfo]
        );
        assert_eq!(categories("whats your address"), vec![ModerationCategory::PersonalInfo]);
    }

    #[test]
    fn test_word_boundaries() {
        // "skill" contains "kill" but is not a word match
        assert!(scan("skill someone up").is_empty());
        assert!(scan("suicidesquad").is_empty());
    }

    #[test]
    fn test_multiple_matches_are_all_high() {
        let flags = scan("kill yourself, suicide");
        assert_eq!(flags.len(), 2);
        assert!(flags.iter().all(|f| f.severity == Severity::High));
        assert!(flags.iter().all(|f| f.description == KEYWORD_FLAG_DESCRIPTION));
    }
}
