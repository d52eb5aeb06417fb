//! In-memory word store for development, previews, and tests.

use async_trait::async_trait;
use rand::rngs::StdRng;
use rand::seq::IteratorRandom;
use rand::SeedableRng;
use rustc_hash::{FxHashMap, FxHashSet};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, RwLock};
use tracing::{debug, warn};

use crate::core::word_bank::{StoreError, WordBank, WordStore};
use crate::schema::category::Category;

/// Word sets held in process memory.
///
/// Sampling uses the thread RNG unless the store was created with
/// [`InMemoryWordStore::seeded`], in which case draws are reproducible for a
/// given sequence of calls.
pub struct InMemoryWordStore {
    sets: RwLock<FxHashMap<String, FxHashSet<String>>>,
    rng: Option<Mutex<StdRng>>,
}

impl InMemoryWordStore {
    pub fn new() -> Self {
        Self {
            sets: RwLock::new(FxHashMap::default()),
            rng: None,
        }
    }

    pub fn seeded(seed: u64) -> Self {
        Self {
            sets: RwLock::new(FxHashMap::default()),
            rng: Some(Mutex::new(StdRng::seed_from_u64(seed))),
        }
    }

    /// Add words to the named set.
    pub fn insert<I, W>(&self, key: &str, words: I)
    where
        I: IntoIterator<Item = W>,
        W: Into<String>,
    {
        let mut sets = self.sets.write().unwrap_or_else(|e| e.into_inner());
        sets.entry(key.to_string())
            .or_default()
            .extend(words.into_iter().map(Into::into));
    }

    /// Fill a store from a word bank snapshot.
    pub fn from_word_bank(bank: &WordBank) -> Self {
        let store = Self::new();
        for category in Category::ALL {
            store.insert(category.as_str(), bank.words(category));
        }
        store
    }

    /// Load every `<category>.txt` file in a directory: one word per line,
    /// surrounding whitespace trimmed, blank lines skipped.
    pub fn load_from_dir(dir: &Path) -> Result<Self, StoreError> {
        let store = Self::new();
        store.extend_from_dir(dir)?;
        Ok(store)
    }

    /// Like [`load_from_dir`](Self::load_from_dir), adding to this store.
    /// Returns the number of files read.
    pub fn extend_from_dir(&self, dir: &Path) -> Result<usize, StoreError> {
        let files = word_list_files(dir)?;
        for (category, path) in &files {
            let words = read_word_list(path)?;
            debug!(category = %category, count = words.len(), "loaded word list");
            self.insert(category.as_str(), words);
        }
        Ok(files.len())
    }

    fn members(&self, key: &str) -> Result<Vec<String>, StoreError> {
        let sets = self
            .sets
            .read()
            .map_err(|e| StoreError::Unavailable(e.to_string()))?;
        Ok(sets
            .get(key)
            .map(|set| set.iter().cloned().collect())
            .unwrap_or_default())
    }

    fn sample(&self, key: &str) -> Result<Option<String>, StoreError> {
        let sets = self
            .sets
            .read()
            .map_err(|e| StoreError::Unavailable(e.to_string()))?;
        Ok(sets.get(key).and_then(|set| self.pick(set)))
    }

    fn pick(&self, set: &FxHashSet<String>) -> Option<String> {
        match &self.rng {
            Some(rng) => {
                let mut rng = rng.lock().unwrap_or_else(|e| e.into_inner());
                set.iter().choose(&mut *rng).cloned()
            }
            None => set.iter().choose(&mut rand::thread_rng()).cloned(),
        }
    }
}

impl Default for InMemoryWordStore {
    fn default() -> Self {
        Self::new()
    }
}

/// The `<category>.txt` files in a directory, sorted by path. Text files
/// that name no category are skipped with a warning; grammars cannot
/// reference them.
pub fn word_list_files(dir: &Path) -> Result<Vec<(Category, PathBuf)>, StoreError> {
    let mut files = Vec::new();
    for entry in std::fs::read_dir(dir)? {
        let path = entry?.path();
        if path.extension().and_then(|s| s.to_str()) != Some("txt") {
            continue;
        }
        let Some(stem) = path.file_stem().and_then(|s| s.to_str()) else {
            continue;
        };
        match stem.parse::<Category>() {
            Ok(category) => files.push((category, path)),
            Err(e) => warn!(path = %path.display(), "skipping word list: {}", e),
        }
    }
    files.sort_by(|a, b| a.1.cmp(&b.1));
    Ok(files)
}

/// Read a word-list file into trimmed, non-empty lines.
pub fn read_word_list(path: &Path) -> Result<Vec<String>, StoreError> {
    let contents = std::fs::read_to_string(path)?;
    Ok(contents
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(str::to_string)
        .collect())
}

#[async_trait]
impl WordStore for InMemoryWordStore {
    async fn all_members(&self, key: &str) -> Result<Vec<String>, StoreError> {
        self.members(key)
    }

    async fn random_member(&self, key: &str) -> Result<Option<String>, StoreError> {
        self.sample(key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[tokio::test]
    async fn missing_set_is_empty() {
        let store = InMemoryWordStore::new();
        assert!(store.all_members("nouns").await.unwrap().is_empty());
        assert_eq!(store.random_member("nouns").await.unwrap(), None);
    }

    #[tokio::test]
    async fn random_member_comes_from_set() {
        let store = InMemoryWordStore::new();
        store.insert("verbs", ["runs", "walks", "sings"]);
        for _ in 0..20 {
            let word = store.random_member("verbs").await.unwrap().unwrap();
            assert!(["runs", "walks", "sings"].contains(&word.as_str()));
        }
    }

    #[tokio::test]
    async fn seeded_store_is_reproducible() {
        let words = ["a", "b", "c", "d", "e", "f", "g", "h"];
        let first = InMemoryWordStore::seeded(7);
        let second = InMemoryWordStore::seeded(7);
        first.insert("nouns", words);
        second.insert("nouns", words);

        for _ in 0..10 {
            assert_eq!(
                first.random_member("nouns").await.unwrap(),
                second.random_member("nouns").await.unwrap()
            );
        }
    }

    #[tokio::test]
    async fn load_from_dir_reads_txt_files() {
        let dir = tempfile::tempdir().unwrap();
        let mut nouns = std::fs::File::create(dir.path().join("nouns.txt")).unwrap();
        writeln!(nouns, "fox\n  dog  \n\ncat").unwrap();
        std::fs::write(dir.path().join("README.md"), "ignored").unwrap();

        let store = InMemoryWordStore::load_from_dir(dir.path()).unwrap();
        let mut words = store.all_members("nouns").await.unwrap();
        words.sort();
        assert_eq!(words, vec!["cat", "dog", "fox"]);
        assert!(store.all_members("README").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn unknown_category_files_are_skipped() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("verbs.txt"), "runs\n").unwrap();
        std::fs::write(dir.path().join("pronouns.txt"), "they\n").unwrap();
        std::fs::write(dir.path().join("nouns.txt"), "fox\n").unwrap();

        let files = word_list_files(dir.path()).unwrap();
        let categories: Vec<Category> = files.iter().map(|(c, _)| *c).collect();
        assert_eq!(categories, vec![Category::Nouns, Category::Verbs]);

        let store = InMemoryWordStore::new();
        assert_eq!(store.extend_from_dir(dir.path()).unwrap(), 2);
        assert!(store.all_members("pronouns").await.unwrap().is_empty());
    }

    #[test]
    fn load_from_missing_dir_fails() {
        let result = InMemoryWordStore::load_from_dir(Path::new("does/not/exist"));
        assert!(matches!(result, Err(StoreError::Io(_))));
    }

    #[tokio::test]
    async fn from_word_bank_copies_all_categories() {
        let mut bank = WordBank::new();
        bank.insert(Category::Adverbs, ["quietly".to_string()].into_iter().collect());
        let store = InMemoryWordStore::from_word_bank(&bank);
        assert_eq!(
            store.random_member("adverbs").await.unwrap(),
            Some("quietly".to_string())
        );
    }
}
