//! Canned replies for when the text oracle is unavailable.
//!
//! The input is lower-cased and split into words. Keywords are whole words,
//! so the table lists the inflected forms it accepts. Categories are checked
//! in table order and the first one with a keyword among those words wins, so
//! "hi, tell me about my memory garden" is a greeting, not a garden question.

use memgarden_config::{BUILTIN_FALLBACK, PersonalityConfig};
use serde::Serialize;

/// One row of the keyword table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeywordCategory {
    /// Category name; also the `responses` key that overrides `reply`.
    pub name: &'static str,
    pub keywords: &'static [&'static str],
    /// Reply used when the personality does not configure one.
    pub reply: &'static str,
}

/// Category name reported when nothing matched.
pub const NO_MATCH: &str = "fallback";

/// Keyword categories in priority order.
pub const CATEGORIES: &[KeywordCategory] = &[
    KeywordCategory {
        name: "greeting",
        keywords: &["hello", "hi", "hey", "greetings"],
        reply: "Hi! 🌱 Ready to look at your memory garden? What memory would you like to plant today?",
    },
    KeywordCategory {
        name: "memory_garden",
        keywords: &["memory", "memories", "garden", "gardens", "gardening", "gardener"],
        reply: "I like helping with memories! What special moment do you want to remember today?",
    },
    KeywordCategory {
        name: "help",
        keywords: &["help"],
        reply: "I'm here to help! What kind of memory are you thinking about planting?",
    },
    KeywordCategory {
        name: "moment",
        keywords: &["sunset", "sunsets", "walk", "walks", "walking", "walked"],
        reply: "That sounds nice! 🌅 What made that time special for you?",
    },
    KeywordCategory {
        name: "reflection",
        keywords: &[
            "reflection",
            "reflections",
            "reflect",
            "reflects",
            "reflecting",
            "reflected",
            "reflective",
        ],
        reply: "Thinking about things is good! What did this memory show you about yourself?",
    },
];

/// A synthetic reply standing in for an oracle answer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FallbackReply {
    pub text: String,
    pub category: &'static str,
    /// Always true; lets callers tell canned replies from real ones.
    pub synthetic: bool,
}

/// Picks a canned reply by keyword.
#[derive(Debug, Clone, Copy)]
pub struct FallbackResolver<'a> {
    personality: Option<&'a PersonalityConfig>,
    categories: &'static [KeywordCategory],
}

impl<'a> FallbackResolver<'a> {
    pub fn new(personality: &'a PersonalityConfig) -> Self {
        Self {
            personality: Some(personality),
            categories: CATEGORIES,
        }
    }

    /// A resolver with no personality loaded; only built-in replies.
    pub fn unconfigured() -> Self {
        Self {
            personality: None,
            categories: CATEGORIES,
        }
    }

    /// The first category whose keywords appear as words in `text`.
    pub fn classify(&self, text: &str) -> Option<&'static KeywordCategory> {
        let lowered = text.to_lowercase();
        let words: Vec<&str> = lowered
            .split(|c: char| !c.is_alphanumeric())
            .filter(|w| !w.is_empty())
            .collect();

        self.categories
            .iter()
            .find(|category| category.keywords.iter().any(|k| words.contains(k)))
    }

    /// Resolve a reply for `text`. Never fails.
    pub fn resolve(&self, text: &str) -> FallbackReply {
        let (category, reply) = match self.classify(text) {
            Some(category) => {
                let configured = self.personality.and_then(|p| p.response(category.name));
                (category.name, configured.unwrap_or(category.reply).to_string())
            }
            None => (
                NO_MATCH,
                self.personality
                    .map(|p| p.get_custom_response(NO_MATCH))
                    .unwrap_or_else(|| BUILTIN_FALLBACK.to_string()),
            ),
        };

        FallbackReply {
            text: reply,
            category,
            synthetic: true,
        }
    }
}
