//! Golden tests - fixture-based tests that lock expected behavior
//!
//! The keyword filters and the classifier-reply parser decide what content
//! gets blocked. Their behavior is pinned in JSON fixtures so any change
//! shows up as a failing case.
//!
//! Run with: cargo test --test golden_tests

use serde::Deserialize;
use std::fs;

fn read_fixture(name: &str) -> String {
    let path = format!("{}/tests/fixtures/{}", env!("CARGO_MANIFEST_DIR"), name);
    fs::read_to_string(&path).unwrap_or_else(|e| panic!("Failed to read {}: {}", path, e))
}

// ============================================================================
// KEYWORD FILTER GOLDEN TESTS
// ============================================================================

mod keyword_golden {
    use super::*;
    use bostonia::moderation::{scan, KEYWORD_FLAG_DESCRIPTION};
    use bostonia::types::Severity;

    #[derive(Debug, Deserialize)]
    struct TestCase {
        name: String,
        input: String,
        expected: Vec<String>,
    }

    #[derive(Debug, Deserialize)]
    struct Fixture {
        test_cases: Vec<TestCase>,
    }

    #[test]
    fn test_keyword_filters_golden() {
        let fixture: Fixture = serde_json::from_str(&read_fixture("keyword_filters.json"))
            .expect("Failed to parse fixture JSON");

        for case in fixture.test_cases {
            let flags = scan(&case.input);
            let categories: Vec<String> = flags.iter().map(|f| f.category.to_string()).collect();

            assert_eq!(
                categories, case.expected,
                "Case '{}': category mismatch",
                case.name
            );
            for flag in &flags {
                assert_eq!(flag.severity, Severity::High, "Case '{}'", case.name);
                assert_eq!(flag.description, KEYWORD_FLAG_DESCRIPTION, "Case '{}'", case.name);
            }
        }
    }
}

// ============================================================================
// CLASSIFIER RESPONSE GOLDEN TESTS
// ============================================================================

mod classifier_golden {
    use super::*;
    use bostonia::moderation::parse_classification;

    #[derive(Debug, Deserialize)]
    struct Expected {
        /// (category, severity) pairs
        flags: Vec<(String, String)>,
        score: f64,
    }

    #[derive(Debug, Deserialize)]
    struct TestCase {
        name: String,
        input: String,
        expected: Option<Expected>,
    }

    #[derive(Debug, Deserialize)]
    struct Fixture {
        test_cases: Vec<TestCase>,
    }

    fn severity_name(value: &impl serde::Serialize) -> String {
        serde_json::to_value(value)
            .ok()
            .and_then(|v| v.as_str().map(String::from))
            .unwrap_or_default()
    }

    #[test]
    fn test_classifier_responses_golden() {
        let fixture: Fixture = serde_json::from_str(&read_fixture("classifier_responses.json"))
            .expect("Failed to parse fixture JSON");

        for case in fixture.test_cases {
            let parsed = parse_classification(&case.input);

            match case.expected {
                None => assert!(
                    parsed.is_none(),
                    "Case '{}': expected rejection, got {:?}",
                    case.name,
                    parsed
                ),
                Some(expected) => {
                    let parsed = parsed
                        .unwrap_or_else(|| panic!("Case '{}': reply was rejected", case.name));
                    let flags: Vec<(String, String)> = parsed
                        .flags
                        .iter()
                        .map(|f| (f.category.to_string(), severity_name(&f.severity)))
                        .collect();

                    assert_eq!(flags, expected.flags, "Case '{}': flags mismatch", case.name);
                    assert!(
                        (parsed.score - expected.score).abs() < 1e-9,
                        "Case '{}': expected score {}, got {}",
                        case.name,
                        expected.score,
                        parsed.score
                    );
                }
            }
        }
    }
}
