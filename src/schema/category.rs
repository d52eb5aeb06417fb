use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CategoryError {
    #[error("unknown word category: '{0}'")]
    UnknownCategory(String),
}

/// A grammatical word category. Each one names a word set in the store
/// and can be referenced from a grammar as `{category}`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    Nouns,
    Verbs,
    Adjectives,
    Adverbs,
    Determiners,
    Prepositions,
    Conjunctions,
}

impl Category {
    /// Every category, in listing order.
    pub const ALL: [Category; 7] = [
        Self::Nouns,
        Self::Verbs,
        Self::Adjectives,
        Self::Adverbs,
        Self::Determiners,
        Self::Prepositions,
        Self::Conjunctions,
    ];

    /// Returns the store key for this category (e.g., "nouns").
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Nouns => "nouns",
            Self::Verbs => "verbs",
            Self::Adjectives => "adjectives",
            Self::Adverbs => "adverbs",
            Self::Determiners => "determiners",
            Self::Prepositions => "prepositions",
            Self::Conjunctions => "conjunctions",
        }
    }

    /// The placeholder text emitted when the category has no words.
    pub fn placeholder(&self) -> String {
        format!("{{{}}}", self.as_str())
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Category {
    type Err = CategoryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|c| c.as_str() == s)
            .ok_or_else(|| CategoryError::UnknownCategory(s.to_string()))
    }
}
