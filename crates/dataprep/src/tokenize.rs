//! Tokenization of raw texts, backed by a persistent token cache.

use std::collections::{BTreeMap, BTreeSet};
use std::fs::{self, File};
use std::io::{BufReader, BufWriter, ErrorKind, Write};
use std::path::{Path, PathBuf};

use rayon::prelude::*;
use regex::Regex;
use sha2::{Digest, Sha256};

use crate::defaults;
use crate::error::{DataprepError, DataprepResult};
use crate::record::{Dataset, ProcessedDataset};

/// Splits a text into a sequence of tokens.
pub trait Tokenizer: Sync {
    fn tokenize(&self, text: &str) -> Vec<String>;
}

/// Splits texts into lowercase words.
#[derive(Debug, Clone)]
pub struct WordTokenizer {
    re: Regex,
    min_len: usize,
    stopwords: BTreeSet<String>,
}

impl WordTokenizer {
    pub fn new() -> DataprepResult<Self> {
        let re = Regex::new(r"\w+").map_err(DataprepError::other)?;
        Ok(Self {
            re,
            min_len: 1,
            stopwords: BTreeSet::new(),
        })
    }

    /// Tokens shorter than `min_len` characters are dropped.
    pub fn with_min_len(mut self, min_len: usize) -> Self {
        self.min_len = min_len;
        self
    }

    pub fn with_stopwords<I, S>(mut self, stopwords: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.stopwords = stopwords
            .into_iter()
            .map(|word| word.as_ref().to_lowercase())
            .collect();
        self
    }
}

impl Tokenizer for WordTokenizer {
    fn tokenize(&self, text: &str) -> Vec<String> {
        self.re
            .find_iter(text)
            .map(|m| m.as_str().to_lowercase())
            .filter(|token| token.chars().count() >= self.min_len)
            .filter(|token| !self.stopwords.contains(token))
            .collect()
    }
}

/// Tokens of already processed texts, keyed by the SHA-256 digest of
/// the text.
#[derive(Debug, Default)]
pub struct TokenCache {
    path: PathBuf,
    entries: BTreeMap<String, Vec<String>>,
    dirty: bool,
}

impl TokenCache {
    /// Loads the cache from `dir`. A missing cache file results in an
    /// empty cache.
    pub fn load<P: AsRef<Path>>(dir: P) -> DataprepResult<Self> {
        let path = dir.as_ref().join(defaults::TOKEN_CACHE_FILE);
        let entries = match File::open(&path) {
            Ok(file) => serde_json::from_reader(BufReader::new(file))?,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                log::debug!("no token cache at {}", path.display());
                BTreeMap::new()
            }
            Err(e) => return Err(e.into()),
        };

        Ok(Self {
            path,
            entries,
            dirty: false,
        })
    }

    pub fn key(text: &str) -> String {
        Sha256::digest(text.as_bytes())
            .iter()
            .fold(String::with_capacity(64), |mut out, b| {
                out.push_str(&format!("{b:02x}"));
                out
            })
    }

    pub fn get(&self, text: &str) -> Option<&Vec<String>> {
        self.entries.get(&Self::key(text))
    }

    pub fn insert(&mut self, text: &str, tokens: Vec<String>) {
        self.entries.insert(Self::key(text), tokens);
        self.dirty = true;
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Writes the cache back to disk, if it has changed.
    pub fn save(&mut self) -> DataprepResult<()> {
        if !self.dirty {
            return Ok(());
        }

        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }

        let mut out = BufWriter::new(File::create(&self.path)?);
        serde_json::to_writer(&mut out, &self.entries)?;
        out.flush()?;

        self.dirty = false;
        Ok(())
    }
}

/// Tokenizes all texts; texts found in the cache aren't tokenized
/// again, new results are added to the cache.
pub fn tokenize_all(
    texts: &[String],
    tokenizer: &dyn Tokenizer,
    mut cache: Option<&mut TokenCache>,
) -> Vec<Vec<String>> {
    let cached: Vec<Option<Vec<String>>> = texts
        .iter()
        .map(|text| cache.as_ref().and_then(|c| c.get(text)).cloned())
        .collect();

    let tokens: Vec<Vec<String>> = texts
        .par_iter()
        .zip(cached.into_par_iter())
        .map(|(text, hit)| hit.unwrap_or_else(|| tokenizer.tokenize(text)))
        .collect();

    if let Some(cache) = cache.as_mut() {
        for (text, tokens) in texts.iter().zip(tokens.iter()) {
            if cache.get(text).is_none() {
                cache.insert(text, tokens.clone());
            }
        }
    }

    tokens
}

impl ProcessedDataset {
    /// Tokenizes the raw texts of `data`. If a cache directory is
    /// given, the token cache is loaded before and saved after
    /// tokenization.
    pub fn from_data(
        data: Dataset,
        tokenizer: &dyn Tokenizer,
        cache_dir: Option<&Path>,
    ) -> DataprepResult<Self> {
        let mut cache = cache_dir.map(TokenCache::load).transpose()?;
        let processed_texts =
            tokenize_all(data.raw_texts(), tokenizer, cache.as_mut());

        if let Some(mut cache) = cache {
            cache.save()?;
        }

        ProcessedDataset::new(data, processed_texts)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use ndarray::array;

    use super::*;

    type TestResult = anyhow::Result<()>;

    struct Counting<'a> {
        inner: &'a WordTokenizer,
        calls: AtomicUsize,
    }

    impl Tokenizer for Counting<'_> {
        fn tokenize(&self, text: &str) -> Vec<String> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.inner.tokenize(text)
        }
    }

    #[test]
    fn word_tokenizer() -> TestResult {
        let tokenizer = WordTokenizer::new()?
            .with_min_len(2)
            .with_stopwords(["und"]);

        assert_eq!(
            tokenizer.tokenize("Katzen und Hunde, a Fische!"),
            vec!["katzen", "hunde", "fische"]
        );
        Ok(())
    }

    #[test]
    fn cache_key_is_sha256() {
        assert_eq!(
            TokenCache::key(""),
            "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
        );
    }

    #[test]
    fn processed_dataset_uses_cache() -> TestResult {
        let dir = tempfile::tempdir()?;
        let data = || {
            Dataset::new(
                vec!["Katze\nHund".into(), "Fisch".into()],
                vec!["1".into(), "2".into()],
                array![false, true],
                BTreeMap::new(),
            )
        };

        let words = WordTokenizer::new()?;
        let tokenizer = Counting {
            inner: &words,
            calls: AtomicUsize::new(0),
        };

        let processed =
            ProcessedDataset::from_data(data()?, &tokenizer, Some(dir.path()))?;
        assert_eq!(
            processed.processed_texts(),
            [vec!["katze".to_string(), "hund".into()], vec!["fisch".into()]]
        );
        assert_eq!(tokenizer.calls.load(Ordering::SeqCst), 2);
        assert!(dir.path().join("nlp_cache.json").is_file());

        let processed =
            ProcessedDataset::from_data(data()?, &tokenizer, Some(dir.path()))?;
        assert_eq!(processed.processed_texts().len(), 2);
        assert_eq!(tokenizer.calls.load(Ordering::SeqCst), 2);
        Ok(())
    }

    #[test]
    fn missing_cache_is_empty() -> TestResult {
        let dir = tempfile::tempdir()?;
        let cache = TokenCache::load(dir.path())?;
        assert!(cache.is_empty());
        Ok(())
    }
}
