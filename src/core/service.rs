/// Sentence service: batch generation and the request/response contract.
///
/// Wires together the grammar, the word store, and the generator.

use futures::future::try_join_all;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::Arc;
use thiserror::Error;
use tracing::{info, warn};

use crate::core::generator::{GenerateError, SentenceGenerator};
use crate::core::grammar::{Grammar, GrammarError};
use crate::core::word_bank::{WordBankAccessor, WordStore};

/// Upper bound on sentences per request.
pub const MAX_SENTENCES: usize = 20;
/// Sentences returned when the request gives no usable count.
pub const DEFAULT_SENTENCES: usize = 1;

/// Message returned to clients for any failed batch.
pub const FAILURE_MESSAGE: &str = "Failed to generate sentence";

/// Seed offset between sentences of a seeded batch.
const SEED_STRIDE: u64 = 1000;

#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("generation error: {0}")]
    Generate(#[from] GenerateError),
    #[error("grammar error: {0}")]
    Grammar(#[from] GrammarError),
    #[error("no word store configured")]
    MissingStore,
}

/// A sentence count clamped to `1..=MAX_SENTENCES`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
pub struct SentenceCount(usize);

impl SentenceCount {
    pub fn new(requested: usize) -> Self {
        Self(requested.clamp(DEFAULT_SENTENCES, MAX_SENTENCES))
    }

    /// Interpret a raw query value leniently: leading whitespace, an
    /// optional sign, then leading digits (`"7abc"` is 7). Missing,
    /// non-numeric, zero or negative values give the default.
    pub fn parse(raw: Option<&str>) -> Self {
        match raw.and_then(leading_integer) {
            Some(n) if n > 0 => Self::new(usize::try_from(n).unwrap_or(MAX_SENTENCES)),
            _ => Self(DEFAULT_SENTENCES),
        }
    }

    pub fn get(self) -> usize {
        self.0
    }
}

impl Default for SentenceCount {
    fn default() -> Self {
        Self(DEFAULT_SENTENCES)
    }
}

fn leading_integer(raw: &str) -> Option<i128> {
    let s = raw.trim_start();
    let (negative, digits) = match s.as_bytes().first() {
        Some(b'-') => (true, &s[1..]),
        Some(b'+') => (false, &s[1..]),
        _ => (false, s),
    };
    let end = digits
        .bytes()
        .position(|b| !b.is_ascii_digit())
        .unwrap_or(digits.len());
    if end == 0 {
        return None;
    }
    // Saturate rather than fail on absurdly long inputs; they clamp anyway.
    let value = digits[..end].parse::<i128>().unwrap_or(i128::MAX);
    Some(if negative { -value } else { value })
}

/// A successful batch, serialized as `{"count": N, "sentences": [...]}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SentenceBatch {
    pub count: usize,
    pub sentences: Vec<String>,
}

/// Body of a failed request: `{"error": "..."}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorBody {
    pub error: String,
}

/// Outcome of a request, ready to hand to an HTTP layer.
#[derive(Debug, Clone, PartialEq)]
pub enum SentenceResponse {
    Ok(SentenceBatch),
    Failed(ErrorBody),
}

impl SentenceResponse {
    pub fn status(&self) -> u16 {
        match self {
            Self::Ok(_) => 200,
            Self::Failed(_) => 500,
        }
    }

    pub fn to_json(&self) -> serde_json::Value {
        // Both bodies are plain structs of strings and integers.
        let body = match self {
            Self::Ok(batch) => serde_json::to_value(batch),
            Self::Failed(body) => serde_json::to_value(body),
        };
        body.unwrap_or(serde_json::Value::Null)
    }
}

/// Generates batches of sentences. Built via `SentenceService::builder()`.
#[derive(Debug, Clone)]
pub struct SentenceService {
    generator: SentenceGenerator,
    seed: Option<u64>,
}

/// Builder for constructing a `SentenceService`.
pub struct SentenceServiceBuilder {
    grammar_paths: Vec<String>,
    seed: Option<u64>,
    /// Directly provided grammar (for testing without files).
    grammar: Option<Grammar>,
    store: Option<Arc<dyn WordStore>>,
}

impl SentenceService {
    pub fn builder() -> SentenceServiceBuilder {
        SentenceServiceBuilder {
            grammar_paths: Vec::new(),
            seed: None,
            grammar: None,
            store: None,
        }
    }

    pub fn generator(&self) -> &SentenceGenerator {
        &self.generator
    }

    /// Generate `count` sentences concurrently. All or nothing: the first
    /// failure fails the batch.
    pub async fn generate_many(&self, count: SentenceCount) -> Result<Vec<String>, ServiceError> {
        let n = count.get();
        let runs = (0..n).map(|i| {
            let generator = &self.generator;
            let seed = self
                .seed
                .map(|s| s.wrapping_add(i as u64 * SEED_STRIDE));
            async move {
                match seed {
                    Some(seed) => generator.generate_seeded(seed).await,
                    None => generator.generate().await,
                }
            }
        });

        let sentences = try_join_all(runs).await?;
        info!(count = n, "generated sentence batch");
        Ok(sentences)
    }

    /// Handle one request given the raw `count` value. Internal errors are
    /// logged and replaced by a generic failure body.
    pub async fn respond(&self, raw_count: Option<&str>) -> SentenceResponse {
        let count = SentenceCount::parse(raw_count);
        match self.generate_many(count).await {
            Ok(sentences) => SentenceResponse::Ok(SentenceBatch {
                count: count.get(),
                sentences,
            }),
            Err(e) => {
                warn!(error = %e, requested = count.get(), "sentence batch failed");
                SentenceResponse::Failed(ErrorBody {
                    error: FAILURE_MESSAGE.to_string(),
                })
            }
        }
    }
}

impl SentenceServiceBuilder {
    /// Load a grammar file. Multiple files merge in order, later rules
    /// overriding earlier ones.
    pub fn grammar_path(mut self, path: &str) -> Self {
        self.grammar_paths.push(path.to_string());
        self
    }

    pub fn seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    /// Provide a grammar directly (for testing without files).
    pub fn with_grammar(mut self, grammar: Grammar) -> Self {
        self.grammar = Some(grammar);
        self
    }

    pub fn with_store(mut self, store: Arc<dyn WordStore>) -> Self {
        self.store = Some(store);
        self
    }

    pub fn build(self) -> Result<SentenceService, ServiceError> {
        let store = self.store.ok_or(ServiceError::MissingStore)?;

        let mut paths = self.grammar_paths.iter();
        let mut grammar = match self.grammar {
            Some(grammar) => grammar,
            None => match paths.next() {
                Some(path) => load_grammar(path)?,
                None => Grammar::english()?,
            },
        };
        for path in paths {
            grammar = grammar.merge(&load_grammar(path)?)?;
        }

        info!(rules = grammar.len(), start = grammar.start(), "sentence service ready");

        Ok(SentenceService {
            generator: SentenceGenerator::new(Arc::new(grammar), WordBankAccessor::new(store)),
            seed: self.seed,
        })
    }
}

fn load_grammar(path: &str) -> Result<Grammar, GrammarError> {
    Grammar::load_from_ron(Path::new(path))
}
