//! Persistent back-translation cache.
//!
//! Stored as a flat JSON object mapping `"bt::<translated text>"` to the
//! back-translation, so reruns over the same deck skip the network.

use serde_json::{Map, Value};
use slidecheck_core::{BackTranslator, Error, Result};
use std::collections::HashMap;
use std::path::{Path, PathBuf};

const KEY_PREFIX: &str = "bt::";

#[derive(Debug)]
pub struct TranslationCache {
    path: PathBuf,
    entries: HashMap<String, String>,
}

impl TranslationCache {
    /// Load the cache at `path`. A missing or unreadable file starts empty.
    pub fn load(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let entries = match std::fs::read_to_string(&path) {
            Ok(content) => parse_entries(&content).unwrap_or_else(|e| {
                log::warn!("Ignoring corrupt cache {}: {}", path.display(), e);
                HashMap::new()
            }),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => HashMap::new(),
            Err(e) => {
                log::warn!("Could not read cache {}: {}", path.display(), e);
                HashMap::new()
            }
        };
        log::debug!("Loaded {} cached translations from {}", entries.len(), path.display());
        Self { path, entries }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Cached translation of `text`. Empty entries count as misses.
    pub fn get(&self, text: &str) -> Option<&str> {
        self.entries
            .get(&cache_key(text))
            .map(String::as_str)
            .filter(|t| !t.is_empty())
    }

    /// Store a translation. Empty translations are not cached.
    pub fn insert(&mut self, text: &str, translation: &str) {
        if translation.is_empty() {
            return;
        }
        self.entries.insert(cache_key(text), translation.to_string());
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Write the cache as pretty-printed UTF-8 JSON, creating parent
    /// directories as needed.
    pub fn save(&self) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let map: Map<String, Value> = self
            .entries
            .iter()
            .map(|(k, v)| (k.clone(), Value::String(v.clone())))
            .collect();

        let json = serde_json::to_string_pretty(&Value::Object(map))
            .map_err(|e| Error::Cache(format!("Failed to serialize cache: {}", e)))?;
        std::fs::write(&self.path, json).map_err(|e| {
            Error::Cache(format!("Failed to write {}: {}", self.path.display(), e))
        })?;
        Ok(())
    }
}

fn cache_key(text: &str) -> String {
    format!("{}{}", KEY_PREFIX, text)
}

fn parse_entries(content: &str) -> Result<HashMap<String, String>> {
    let value: Value = serde_json::from_str(content)
        .map_err(|e| Error::Cache(format!("Invalid JSON: {}", e)))?;
    let Value::Object(map) = value else {
        return Err(Error::Cache("Cache root is not an object".to_string()));
    };
    Ok(map
        .into_iter()
        .filter_map(|(k, v)| match v {
            Value::String(s) => Some((k, s)),
            _ => None,
        })
        .collect())
}

/// Wraps a translator with a [`TranslationCache`].
///
/// New translations are written to disk as soon as they arrive so an
/// interrupted run keeps its work.
pub struct CachedTranslator<T> {
    inner: T,
    cache: TranslationCache,
    hits: usize,
    misses: usize,
}

impl<T: BackTranslator> CachedTranslator<T> {
    pub fn new(inner: T, cache: TranslationCache) -> Self {
        Self {
            inner,
            cache,
            hits: 0,
            misses: 0,
        }
    }

    pub fn hits(&self) -> usize {
        self.hits
    }

    pub fn misses(&self) -> usize {
        self.misses
    }

    pub fn cache(&self) -> &TranslationCache {
        &self.cache
    }
}

impl<T: BackTranslator> BackTranslator for CachedTranslator<T> {
    fn back_translate(&mut self, text: &str) -> Result<String> {
        if let Some(hit) = self.cache.get(text) {
            self.hits += 1;
            return Ok(hit.to_string());
        }

        self.misses += 1;
        let translated = self.inner.back_translate(text)?;
        if !translated.is_empty() {
            self.cache.insert(text, &translated);
            if let Err(e) = self.cache.save() {
                log::warn!("Failed to persist translation cache: {}", e);
            }
        }
        Ok(translated)
    }

    fn target_language(&self) -> &str {
        self.inner.target_language()
    }
}
