//! Embedded prompts
//!
//! These are compiled into the binary from .pmt files at build time.

use tracing::debug;

/// System prompt for question distillation
pub const DISTILL: &str = include_str!("../../prompts/distill.pmt");

/// System prompt for answering without a thought template
pub const ANSWER: &str = include_str!("../../prompts/answer.pmt");

/// System prompt for answering with a thought template as experience
pub const ANSWER_WITH_TEMPLATE: &str = include_str!("../../prompts/answer-with-template.pmt");

/// System prompt for template abstraction
pub const ABSTRACT_SYSTEM: &str = include_str!("../../prompts/abstract-system.pmt");

/// User prompt for template abstraction
pub const ABSTRACT: &str = include_str!("../../prompts/abstract.pmt");

/// System prompt for titling
pub const TITLE_SYSTEM: &str = include_str!("../../prompts/title-system.pmt");

/// User prompt for titling
pub const TITLE: &str = include_str!("../../prompts/title.pmt");

/// Enumerated-choice template selection
pub const SELECT: &str = include_str!("../../prompts/select.pmt");

/// Two-way template arbitration
pub const COMPARE: &str = include_str!("../../prompts/compare.pmt");

/// Every embedded prompt name
pub const NAMES: &[&str] = &[
    "distill",
    "answer",
    "answer-with-template",
    "abstract-system",
    "abstract",
    "title-system",
    "title",
    "select",
    "compare",
];

/// Get the embedded prompt by name
pub fn get_embedded(name: &str) -> Option<&'static str> {
    debug!(%name, "get_embedded: called");
    match name {
        "distill" => Some(DISTILL),
        "answer" => Some(ANSWER),
        "answer-with-template" => Some(ANSWER_WITH_TEMPLATE),
        "abstract-system" => Some(ABSTRACT_SYSTEM),
        "abstract" => Some(ABSTRACT),
        "title-system" => Some(TITLE_SYSTEM),
        "title" => Some(TITLE),
        "select" => Some(SELECT),
        "compare" => Some(COMPARE),
        _ => {
            debug!("get_embedded: no match found");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_all_names_resolve() {
        for name in NAMES {
            assert!(get_embedded(name).is_some(), "missing embedded prompt {}", name);
        }
    }

    #[test]
    fn test_get_embedded_distill() {
        let distill = get_embedded("distill").unwrap();
        assert!(distill.contains("boundary conditions"));
        assert!(distill.contains("do not answer"));
    }

    #[test]
    fn test_get_embedded_unknown() {
        assert!(get_embedded("unknown-template").is_none());
    }
}
