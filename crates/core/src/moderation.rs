//! Chat content masking
//!
//! Case-insensitive literal word list. Every occurrence of a listed word is
//! replaced by asterisks, at least three of them, never fewer than the
//! matched characters. This is a local courtesy filter, not a security control.

use regex::{Regex, RegexBuilder};
use tracing::{debug, warn};

/// Words masked out of the box
pub const DEFAULT_BLOCKED_WORDS: &[&str] = &[
    "amk", "aq", "orospu", "s.kerim", "sikerim", "piç", "salak", "aptal", "fuck", "shit", "bitch",
];

const MIN_MASK_LEN: usize = 3;

/// Word-list based masker
#[derive(Debug, Clone)]
pub struct Moderator {
    /// One escaped, case-insensitive pattern per word
    patterns: Vec<Regex>,
}

impl Moderator {
    pub fn new<I, S>(words: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let patterns = words
            .into_iter()
            .map(|w| w.as_ref().trim().to_string())
            .filter(|w| !w.is_empty())
            .filter_map(|w| {
                match RegexBuilder::new(&regex::escape(&w))
                    .case_insensitive(true)
                    .build()
                {
                    Ok(re) => Some(re),
                    Err(e) => {
                        warn!(word = %w, error = %e, "Skipping unusable blocked word");
                        None
                    }
                }
            })
            .collect();
        Self { patterns }
    }

    /// Default list plus any extra words
    pub fn with_extra<I, S>(extra: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut words: Vec<String> = DEFAULT_BLOCKED_WORDS.iter().map(|w| w.to_string()).collect();
        words.extend(extra.into_iter().map(|w| w.as_ref().to_string()));
        Self::new(words)
    }

    /// Mask every listed word, one word at a time
    pub fn mask(&self, text: &str) -> String {
        let mut current = text.to_string();
        for pattern in &self.patterns {
            current = pattern
                .replace_all(&current, |caps: &regex::Captures| {
                    "*".repeat(caps[0].chars().count().max(MIN_MASK_LEN))
                })
                .into_owned();
        }
        if current != text {
            debug!("Masked disallowed content");
        }
        current
    }
}

impl Default for Moderator {
    fn default() -> Self {
        Self::new(DEFAULT_BLOCKED_WORDS)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn contains_listed_word(text: &str) -> bool {
        let lower = text.to_lowercase();
        DEFAULT_BLOCKED_WORDS.iter().any(|w| lower.contains(w))
    }

    #[test]
    fn test_short_word_gets_three_stars() {
        let moderator = Moderator::default();
        let masked = moderator.mask("amk test");
        assert_ne!(masked, "amk test");
        assert_eq!(masked, "*** test");
        assert!(!contains_listed_word(&masked));
    }

    #[test]
    fn test_mask_length_matches_longer_words() {
        let moderator = Moderator::default();
        assert_eq!(moderator.mask("you fuck"), "you ****");
        assert_eq!(moderator.mask("aq"), "***");
        assert_eq!(moderator.mask("orospu"), "******");
    }

    #[test]
    fn test_case_insensitive_and_every_occurrence() {
        let moderator = Moderator::default();
        assert_eq!(moderator.mask("SHIT and Shit"), "**** and ****");
        assert_eq!(moderator.mask("Fuck this shit"), "**** this ****");
    }

    #[test]
    fn test_dot_is_literal() {
        let moderator = Moderator::default();
        assert_eq!(moderator.mask("s.kerim"), "*******");
        assert_eq!(moderator.mask("sXkerim"), "sXkerim");
    }

    #[test]
    fn test_non_ascii_word() {
        let moderator = Moderator::default();
        assert_eq!(moderator.mask("PIÇ değil piç"), "*** değil ***");
        assert_eq!(moderator.mask("Piç"), "***");
    }

    #[test]
    fn test_clean_text_untouched() {
        let moderator = Moderator::default();
        assert_eq!(moderator.mask("good dog"), "good dog");
    }

    #[test]
    fn test_regex_syntax_in_words_is_literal() {
        let moderator = Moderator::new(["c++", "(grr)"]);
        assert_eq!(moderator.mask("I like C++ and (GRR)"), "I like *** and *****");
        assert_eq!(moderator.mask("c and grr"), "c and grr");
    }

    #[test]
    fn test_blank_words_ignored() {
        let moderator = Moderator::new(["", "   "]);
        assert_eq!(moderator.mask("anything"), "anything");
    }

    #[test]
    fn test_extra_words() {
        let moderator = Moderator::with_extra(["woof"]);
        assert_eq!(moderator.mask("WOOF amk"), "**** ***");
    }
}
