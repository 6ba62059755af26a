//! # Intent Classification
//!
//! Decides whether a user message is a lookup request that should be translated
//! into a query, or ordinary chatter that only gets an acknowledgement.

use crate::constants::LOOKUP_KEYWORDS;
use serde::{Deserialize, Serialize};

/// The rule used to detect lookup requests.
///
/// `Substring` matches a keyword anywhere in the lower-cased text, so words such as
/// "whatever" or "showroom" also count as lookups. `WholeWord` only matches
/// complete words and avoids those false positives.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum IntentClassifier {
    #[default]
    #[serde(rename = "substring")]
    Substring,
    #[serde(rename = "word")]
    WholeWord,
}

impl IntentClassifier {
    /// Returns `true` if `text` should be answered with a catalog query.
    pub fn is_lookup(&self, text: &str) -> bool {
        let lowered = text.to_lowercase();
        match self {
            IntentClassifier::Substring => LOOKUP_KEYWORDS.iter().any(|kw| lowered.contains(kw)),
            IntentClassifier::WholeWord => lowered
                .split(|c: char| !c.is_alphanumeric())
                .any(|word| LOOKUP_KEYWORDS.contains(&word)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn substring_mode_detects_keywords() {
        let classifier = IntentClassifier::Substring;
        assert!(classifier.is_lookup("What is the HS code for bolts?"));
        assert!(classifier.is_lookup("SHOW me steel products"));
        assert!(classifier.is_lookup("Can you find the nuts"));
        assert!(!classifier.is_lookup("Thanks"));
        assert!(!classifier.is_lookup(""));
    }

    #[test]
    fn substring_mode_accepts_embedded_keywords() {
        let classifier = IntentClassifier::Substring;
        assert!(classifier.is_lookup("whatever"));
        assert!(classifier.is_lookup("Nice showroom"));
        assert!(classifier.is_lookup("Together we can"));
    }

    #[test]
    fn whole_word_mode_rejects_embedded_keywords() {
        let classifier = IntentClassifier::WholeWord;
        assert!(!classifier.is_lookup("whatever"));
        assert!(!classifier.is_lookup("Nice showroom"));
        assert!(classifier.is_lookup("what's the code for nuts?"));
        assert!(classifier.is_lookup("Please, show: all products"));
    }
}
