//! Keyword → reply registry persisted to a flat JSON file.

use std::{
    collections::HashMap,
    fmt, fs,
    path::{Path, PathBuf},
    sync::Arc,
};

use log::{debug, error, info, warn};
use serde::{
    Deserialize, Deserializer, Serialize, Serializer,
    de::{MapAccess, Visitor},
};
use strsim::normalized_levenshtein;

use crate::error::{BotError, Result};

const SUGGESTION_THRESHOLD: f64 = 0.6;

/// Trim surrounding whitespace and lowercase.
///
/// Applied to stored keywords and inbound messages alike.
#[must_use]
pub fn normalize_keyword(text: &str) -> String {
    text.trim().to_lowercase()
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeywordEntry {
    pub keyword: String,
    pub reply: String,
}

/// Insertion-ordered keyword mapping with an index for exact lookups.
#[derive(Debug, Clone, Default)]
pub struct KeywordRegistry {
    entries: Vec<KeywordEntry>,
    index: HashMap<String, usize>,
}

impl KeywordRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Exact lookup of an already normalized keyword.
    #[must_use]
    pub fn get(&self, keyword: &str) -> Option<&str> {
        self.entry(keyword).map(|entry| entry.reply.as_str())
    }

    #[must_use]
    pub fn entry(&self, keyword: &str) -> Option<&KeywordEntry> {
        self.index.get(keyword).map(|&idx| &self.entries[idx])
    }

    /// Insert or overwrite. An overwritten keyword keeps its position.
    fn insert(&mut self, keyword: String, reply: String) -> Option<String> {
        if let Some(&idx) = self.index.get(&keyword) {
            return Some(std::mem::replace(&mut self.entries[idx].reply, reply));
        }
        self.index.insert(keyword.clone(), self.entries.len());
        self.entries.push(KeywordEntry { keyword, reply });
        None
    }

    fn remove(&mut self, keyword: &str) -> Option<String> {
        let idx = self.index.remove(keyword)?;
        let entry = self.entries.remove(idx);
        for shifted in &self.entries[idx..] {
            if let Some(position) = self.index.get_mut(&shifted.keyword) {
                *position -= 1;
            }
        }
        Some(entry.reply)
    }

    pub fn keywords(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|entry| entry.keyword.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries
            .iter()
            .map(|entry| (entry.keyword.as_str(), entry.reply.as_str()))
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Closest stored keyword by normalized Levenshtein similarity, for "did you mean" hints.
    #[must_use]
    pub fn closest(&self, keyword: &str) -> Option<&str> {
        self.keywords()
            .map(|candidate| (candidate, normalized_levenshtein(candidate, keyword)))
            .filter(|(_, sim)| *sim >= SUGGESTION_THRESHOLD)
            .max_by(|(_, left), (_, right)| left.total_cmp(right))
            .map(|(candidate, _)| candidate)
    }
}

impl Serialize for KeywordRegistry {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.collect_map(self.iter())
    }
}

impl<'de> Deserialize<'de> for KeywordRegistry {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        deserializer.deserialize_map(RegistryVisitor)
    }
}

struct RegistryVisitor;

impl<'de> Visitor<'de> for RegistryVisitor {
    type Value = KeywordRegistry;

    fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
        formatter.write_str("an object mapping keywords to reply text")
    }

    fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> std::result::Result<Self::Value, A::Error> {
        let mut registry = KeywordRegistry::new();
        while let Some((keyword, reply)) = access.next_entry::<String, String>()? {
            let normalized = normalize_keyword(&keyword);
            if normalized.is_empty() {
                warn!("Skipping registry entry with empty keyword");
                continue;
            }
            registry.insert(normalized, reply);
        }
        Ok(registry)
    }
}

/// Read the registry file.
///
/// A missing file is an empty registry. Read and parse failures are logged and
/// also yield an empty registry.
#[must_use]
pub fn load(path: &Path) -> KeywordRegistry {
    if !path.exists() {
        debug!("No keyword registry at {}, starting empty", path.display());
        return KeywordRegistry::new();
    }

    match read_registry(path) {
        Ok(registry) => registry,
        Err(e) => {
            error!("{e}");
            KeywordRegistry::new()
        }
    }
}

fn read_registry(path: &Path) -> Result<KeywordRegistry> {
    let load_err = |reason: String| BotError::RegistryLoad {
        path: path.to_path_buf(),
        reason,
    };
    let data = fs::read_to_string(path).map_err(|e| load_err(e.to_string()))?;
    serde_json::from_str(&data).map_err(|e| load_err(e.to_string()))
}

/// File-backed registry with write-through persistence.
#[derive(Debug)]
pub struct KeywordStore {
    path: PathBuf,
    registry: Arc<KeywordRegistry>,
}

impl KeywordStore {
    /// Open the store at `path`, loading whatever is on disk.
    pub fn open(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        info!("Keyword registry file: {}", path.display());
        let registry = load(&path);
        info!("Loaded {} keyword replies", registry.len());
        Self {
            path,
            registry: Arc::new(registry),
        }
    }

    /// Write the whole registry to disk atomically via temp file + rename.
    ///
    /// # Errors
    ///
    /// Returns [`BotError::RegistrySave`] if the directory, temp file or rename fails.
    pub fn save(&self) -> Result<()> {
        let save_err = |reason: String| BotError::RegistrySave {
            path: self.path.clone(),
            reason,
        };

        if let Some(parent) = self.path.parent()
            && !parent.as_os_str().is_empty()
        {
            fs::create_dir_all(parent).map_err(|e| save_err(e.to_string()))?;
        }

        let data =
            serde_json::to_string_pretty(&*self.registry).map_err(|e| save_err(e.to_string()))?;
        let tmp = self.path.with_extension("json.tmp");
        fs::write(&tmp, data).map_err(|e| save_err(e.to_string()))?;
        if let Err(e) = fs::rename(&tmp, &self.path) {
            let _ = fs::remove_file(&tmp);
            return Err(save_err(e.to_string()));
        }

        debug!(
            "Saved {} keyword replies to {}",
            self.registry.len(),
            self.path.display()
        );
        Ok(())
    }

    /// Save, logging failures. The in-memory registry is kept either way.
    fn persist(&self) {
        if let Err(e) = self.save() {
            error!("{e}");
        }
    }

    /// Insert or overwrite a keyword reply and persist. Returns the normalized keyword.
    ///
    /// # Errors
    ///
    /// Returns [`BotError::EmptyKeyword`] if the keyword is blank, or
    /// [`BotError::EmptyReply`] if the reply is; nothing is changed.
    pub fn put(&mut self, keyword: &str, reply: impl Into<String>) -> Result<String> {
        let keyword = normalize_keyword(keyword);
        if keyword.is_empty() {
            return Err(BotError::EmptyKeyword);
        }
        let reply = reply.into();
        if reply.trim().is_empty() {
            return Err(BotError::EmptyReply);
        }

        if Arc::make_mut(&mut self.registry)
            .insert(keyword.clone(), reply)
            .is_some()
        {
            debug!("Overwrote keyword reply for '{keyword}'");
        }
        self.persist();
        Ok(keyword)
    }

    /// Remove a keyword and persist. Returns the removed reply.
    ///
    /// # Errors
    ///
    /// Returns [`BotError::KeywordNotFound`] if the keyword is absent; nothing is changed.
    pub fn remove(&mut self, keyword: &str) -> Result<String> {
        let keyword = normalize_keyword(keyword);
        if self.registry.entry(&keyword).is_none() {
            let suggestion = self.registry.closest(&keyword).map(str::to_string);
            return Err(BotError::KeywordNotFound {
                keyword,
                suggestion,
            });
        }
        let reply = Arc::make_mut(&mut self.registry)
            .remove(&keyword)
            .unwrap_or_default();
        self.persist();
        Ok(reply)
    }

    pub fn list(&self) -> impl Iterator<Item = (&str, &str)> {
        self.registry.iter()
    }

    #[must_use]
    pub fn registry(&self) -> &KeywordRegistry {
        &self.registry
    }

    /// Cheap shared handle to the current registry, detached from the store lock.
    #[must_use]
    pub fn snapshot(&self) -> Arc<KeywordRegistry> {
        Arc::clone(&self.registry)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.registry.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.registry.is_empty()
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }
}
