/// Sentence generation — recursive grammar expansion over the word bank.

use futures::future::{try_join_all, BoxFuture, FutureExt};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, warn};

use crate::core::grammar::{Grammar, GrammarError, Symbol};
use crate::core::word_bank::{StoreError, WordBankAccessor};

#[derive(Debug, Error)]
pub enum GenerateError {
    #[error("store error: {0}")]
    Store(#[from] StoreError),
    #[error("grammar error: {0}")]
    Grammar(#[from] GrammarError),
}

/// Expands a grammar into sentences, drawing terminal words from a store.
///
/// Cloning is cheap; the grammar is shared and never mutated.
#[derive(Debug, Clone)]
pub struct SentenceGenerator {
    grammar: Arc<Grammar>,
    words: WordBankAccessor,
}

impl SentenceGenerator {
    pub fn new(grammar: Arc<Grammar>, words: WordBankAccessor) -> Self {
        Self { grammar, words }
    }

    pub fn grammar(&self) -> &Grammar {
        &self.grammar
    }

    pub fn words(&self) -> &WordBankAccessor {
        &self.words
    }

    /// Generate one sentence from the start symbol: first character
    /// uppercased, a single period appended.
    pub async fn generate(&self) -> Result<String, GenerateError> {
        self.generate_with(StdRng::from_entropy()).await
    }

    /// Like [`generate`](Self::generate), with reproducible rule choices.
    /// Word draws still depend on the store.
    pub async fn generate_seeded(&self, seed: u64) -> Result<String, GenerateError> {
        self.generate_with(StdRng::seed_from_u64(seed)).await
    }

    /// Expand any symbol: a `{category}`, a rule name, or a literal.
    pub async fn expand(&self, symbol: &str) -> Result<String, GenerateError> {
        let symbol = self.grammar.resolve_token(symbol)?;
        self.expand_symbol(&symbol, StdRng::from_entropy()).await
    }

    async fn generate_with(&self, rng: StdRng) -> Result<String, GenerateError> {
        let start = Symbol::NonterminalRef(self.grammar.start().to_string());
        let expanded = self.expand_symbol(&start, rng).await?;
        Ok(finish_sentence(&expanded))
    }

    fn expand_symbol<'a>(
        &'a self,
        symbol: &'a Symbol,
        mut rng: StdRng,
    ) -> BoxFuture<'a, Result<String, GenerateError>> {
        async move {
            match symbol {
                Symbol::TerminalRef(category) => {
                    match self.words.random_word(*category).await? {
                        Some(word) => Ok(word),
                        None => {
                            warn!(category = %category, "category has no words, emitting placeholder");
                            Ok(category.placeholder())
                        }
                    }
                }
                Symbol::Literal(text) => Ok(text.clone()),
                Symbol::NonterminalRef(name) => {
                    // Validated grammars only reference existing rules; an
                    // unknown name degrades to a literal.
                    let Some(productions) = self.grammar.rule(name) else {
                        return Ok(name.clone());
                    };
                    let index = rng.gen_range(0..productions.len());
                    let production = &productions[index];
                    debug!(rule = %name, alternative = index, "chose production");

                    // Each sibling gets its own generator, derived in source
                    // order, so results do not depend on completion order.
                    let parts = production
                        .symbols
                        .iter()
                        .map(|child| {
                            let child_rng = StdRng::seed_from_u64(rng.gen());
                            self.expand_symbol(child, child_rng)
                        })
                        .collect::<Vec<_>>();

                    let parts = try_join_all(parts).await?;
                    Ok(parts.join(" "))
                }
            }
        }
        .boxed()
    }
}

/// Uppercase the first character and append a period.
pub fn finish_sentence(text: &str) -> String {
    let mut chars = text.chars();
    let mut sentence = match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect::<String>(),
        None => String::new(),
    };
    sentence.push('.');
    sentence
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::word_bank::WordStore;
    use crate::schema::category::Category;
    use crate::store::memory::InMemoryWordStore;
    use async_trait::async_trait;
    use std::time::Duration;

    fn example_grammar() -> Grammar {
        Grammar::from_rules(
            "S",
            [
                ("S", vec!["NP VP"]),
                ("NP", vec!["Det Noun"]),
                ("VP", vec!["Verb"]),
                ("Det", vec!["{determiners}"]),
                ("Noun", vec!["{nouns}"]),
                ("Verb", vec!["{verbs}"]),
            ],
        )
        .unwrap()
    }

    fn generator(grammar: Grammar, store: impl WordStore + 'static) -> SentenceGenerator {
        SentenceGenerator::new(Arc::new(grammar), WordBankAccessor::new(Arc::new(store)))
    }

    fn fox_store() -> InMemoryWordStore {
        let store = InMemoryWordStore::new();
        store.insert("determiners", ["the"]);
        store.insert("nouns", ["fox"]);
        store.insert("verbs", ["jumps"]);
        store
    }

    /// Answers slower for earlier keys in `delays`, so sibling lookups
    /// finish in reverse order.
    struct SlowStore {
        delays: Vec<(&'static str, u64)>,
    }

    #[async_trait]
    impl WordStore for SlowStore {
        async fn all_members(&self, key: &str) -> Result<Vec<String>, StoreError> {
            Ok(vec![key.to_string()])
        }

        async fn random_member(&self, key: &str) -> Result<Option<String>, StoreError> {
            let delay = self
                .delays
                .iter()
                .find(|(k, _)| *k == key)
                .map_or(0, |(_, ms)| *ms);
            tokio::time::sleep(Duration::from_millis(delay)).await;
            Ok(Some(format!("<{}>", key)))
        }
    }

    struct FailingStore;

    #[async_trait]
    impl WordStore for FailingStore {
        async fn all_members(&self, _key: &str) -> Result<Vec<String>, StoreError> {
            Err(StoreError::Unavailable("down".to_string()))
        }

        async fn random_member(&self, key: &str) -> Result<Option<String>, StoreError> {
            if key == "verbs" {
                Err(StoreError::Unavailable("down".to_string()))
            } else {
                Ok(Some(key.to_string()))
            }
        }
    }

    #[tokio::test]
    async fn generates_the_fox_jumps() {
        let g = generator(example_grammar(), fox_store());
        assert_eq!(g.generate().await.unwrap(), "The fox jumps.");
    }

    #[tokio::test]
    async fn empty_category_emits_placeholder() {
        let store = fox_store();
        let g = generator(
            Grammar::from_rules("S", [("S", vec!["{determiners} {adjectives} {nouns}"])]).unwrap(),
            store,
        );
        assert_eq!(g.generate().await.unwrap(), "The {adjectives} fox.");
    }

    #[tokio::test]
    async fn placeholder_at_start_keeps_its_brace() {
        let g = generator(
            Grammar::from_rules("S", [("S", vec!["{adverbs}"])]).unwrap(),
            InMemoryWordStore::new(),
        );
        assert_eq!(g.generate().await.unwrap(), "{adverbs}.");
    }

    #[tokio::test]
    async fn expand_terminal_returns_word_unchanged() {
        let store = InMemoryWordStore::new();
        store.insert("nouns", ["iPhone"]);
        let g = generator(example_grammar(), store);
        assert_eq!(g.expand("{nouns}").await.unwrap(), "iPhone");
        assert_eq!(g.expand("Noun").await.unwrap(), "iPhone");
    }

    #[tokio::test]
    async fn expand_literal_and_missing_category() {
        let g = generator(example_grammar(), InMemoryWordStore::new());
        assert_eq!(g.expand("hello").await.unwrap(), "hello");
        assert_eq!(g.expand("{verbs}").await.unwrap(), "{verbs}");
        assert!(matches!(
            g.expand("{pronouns}").await,
            Err(GenerateError::Grammar(GrammarError::UnknownCategory { .. }))
        ));
    }

    #[tokio::test]
    async fn only_first_character_is_capitalized() {
        let store = InMemoryWordStore::new();
        store.insert("nouns", ["über"]);
        store.insert("verbs", ["RUNS"]);
        let g = generator(
            Grammar::from_rules("S", [("S", vec!["{nouns} {verbs} Fast"])]).unwrap(),
            store,
        );
        assert_eq!(g.generate().await.unwrap(), "Über RUNS Fast.");
    }

    #[tokio::test]
    async fn siblings_keep_source_order() {
        let store = SlowStore {
            delays: vec![("determiners", 30), ("adjectives", 20), ("nouns", 10), ("verbs", 0)],
        };
        let g = generator(
            Grammar::from_rules(
                "S",
                [("S", vec!["{determiners} {adjectives} {nouns} {verbs}"])],
            )
            .unwrap(),
            store,
        );
        assert_eq!(
            g.generate().await.unwrap(),
            "<determiners> <adjectives> <nouns> <verbs>."
        );
    }

    #[tokio::test]
    async fn store_failure_aborts_sentence() {
        let g = generator(example_grammar(), FailingStore);
        assert!(matches!(
            g.generate().await,
            Err(GenerateError::Store(StoreError::Unavailable(_)))
        ));
    }

    #[tokio::test]
    async fn seeded_generation_is_reproducible() {
        let grammar = Grammar::from_rules(
            "S",
            [
                ("S", vec!["A B C"]),
                ("A", vec!["a1", "a2", "a3", "a4"]),
                ("B", vec!["b1", "b2", "b3", "b4"]),
                ("C", vec!["c1", "c2", "c3", "c4"]),
            ],
        )
        .unwrap();
        let g = generator(grammar, InMemoryWordStore::new());
        for seed in 0..10 {
            assert_eq!(
                g.generate_seeded(seed).await.unwrap(),
                g.generate_seeded(seed).await.unwrap()
            );
        }
    }

    #[tokio::test]
    async fn different_seeds_explore_alternatives() {
        let grammar = Grammar::from_rules("S", [("S", vec!["one", "two", "three"])]).unwrap();
        let g = generator(grammar, InMemoryWordStore::new());
        let mut seen = std::collections::HashSet::new();
        for seed in 0..50 {
            seen.insert(g.generate_seeded(seed).await.unwrap());
        }
        assert_eq!(seen.len(), 3);
    }

    #[tokio::test]
    async fn english_grammar_produces_sentences() {
        let store = InMemoryWordStore::new();
        for category in Category::ALL {
            store.insert(category.as_str(), [category.as_str()]);
        }
        let g = generator(Grammar::english().unwrap(), store);
        for _ in 0..25 {
            let sentence = g.generate().await.unwrap();
            assert!(sentence.starts_with("Determiners "), "got: {sentence}");
            assert!(sentence.ends_with('.') && !sentence.ends_with(".."));
            assert!(sentence.contains("nouns verbs"));
            assert!(!sentence.contains('{'));
        }
    }

    #[test]
    fn finish_sentence_rules() {
        assert_eq!(finish_sentence("the fox"), "The fox.");
        assert_eq!(finish_sentence("ß"), "SS.");
        assert_eq!(finish_sentence(""), ".");
    }
}
