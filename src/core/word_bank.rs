/// Word bank access — the store capability and category-level lookups.

use async_trait::async_trait;
use futures::future::try_join_all;
use rustc_hash::{FxHashMap, FxHashSet};
use std::sync::Arc;
use thiserror::Error;
use tracing::debug;

use crate::schema::category::Category;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("word store unavailable: {0}")]
    Unavailable(String),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// A key-value store holding one set of words per key.
///
/// Implementations must be safe to call concurrently; the generator issues
/// independent reads for sibling symbols at the same time.
#[async_trait]
pub trait WordStore: Send + Sync {
    /// All members of the named set. A missing set is empty.
    async fn all_members(&self, key: &str) -> Result<Vec<String>, StoreError>;

    /// One uniformly sampled member of the named set, or `None` if empty.
    async fn random_member(&self, key: &str) -> Result<Option<String>, StoreError>;
}

/// A full copy of every category's words, taken at one point in time.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct WordBank {
    words: FxHashMap<Category, FxHashSet<String>>,
}

impl WordBank {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, category: Category, words: FxHashSet<String>) {
        self.words.insert(category, words);
    }

    /// Words in a category; empty if the category was never loaded.
    pub fn words(&self, category: Category) -> impl Iterator<Item = &str> {
        self.words
            .get(&category)
            .into_iter()
            .flat_map(|set| set.iter().map(String::as_str))
    }

    pub fn contains(&self, category: Category, word: &str) -> bool {
        self.words.get(&category).is_some_and(|set| set.contains(word))
    }

    /// Number of words in a category.
    pub fn len(&self, category: Category) -> usize {
        self.words.get(&category).map_or(0, FxHashSet::len)
    }

    /// Total number of words across all categories.
    pub fn total(&self) -> usize {
        self.words.values().map(FxHashSet::len).sum()
    }

    /// Categories with no words, in listing order. Sentences drawing on
    /// these will contain the `{category}` placeholder.
    pub fn empty_categories(&self) -> Vec<Category> {
        Category::ALL
            .into_iter()
            .filter(|c| self.len(*c) == 0)
            .collect()
    }
}

/// Category-level view over a [`WordStore`].
#[derive(Clone)]
pub struct WordBankAccessor {
    store: Arc<dyn WordStore>,
}

impl WordBankAccessor {
    pub fn new(store: Arc<dyn WordStore>) -> Self {
        Self { store }
    }

    pub fn list_categories(&self) -> &'static [Category] {
        &Category::ALL
    }

    pub async fn words_in_category(&self, category: Category) -> Result<FxHashSet<String>, StoreError> {
        let words = self.store.all_members(category.as_str()).await?;
        debug!(category = %category, count = words.len(), "loaded category");
        Ok(words.into_iter().collect())
    }

    pub async fn random_word(&self, category: Category) -> Result<Option<String>, StoreError> {
        let word = self.store.random_member(category.as_str()).await?;
        debug!(category = %category, found = word.is_some(), "sampled word");
        Ok(word)
    }

    /// Load every category concurrently. Not cached: each call reads the
    /// store again.
    pub async fn snapshot(&self) -> Result<WordBank, StoreError> {
        let loads = self.list_categories().iter().map(|&category| async move {
            let words = self.words_in_category(category).await?;
            Ok::<_, StoreError>((category, words))
        });

        let mut bank = WordBank::new();
        for (category, words) in try_join_all(loads).await? {
            bank.insert(category, words);
        }
        Ok(bank)
    }
}

impl std::fmt::Debug for WordBankAccessor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WordBankAccessor").finish_non_exhaustive()
    }
}
