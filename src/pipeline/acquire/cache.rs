//! Content-addressed text cache.
//!
//! Keyed by SHA-256 of the source document bytes, one JSON entry per hash.
//! Multiple runs may hit the same physical file concurrently; puts are
//! idempotent last-writer-wins since recomputing text is harmless. Cache
//! failures are never fatal; a miss just means acquisition runs again.

use std::io;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use super::TextProvider;

/// SHA-256 content hash of a file, lowercase hex.
pub fn content_hash(path: &Path) -> io::Result<String> {
    let bytes = std::fs::read(path)?;
    Ok(format!("{:x}", Sha256::digest(&bytes)))
}

/// SHA-256 of a text value, lowercase hex. For callers that already hold the
/// content in memory.
pub fn text_hash(text: &str) -> String {
    format!("{:x}", Sha256::digest(text.as_bytes()))
}

/// A cached acquisition result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CachedText {
    pub text: String,
    pub provider: TextProvider,
}

/// Cache of acquired text keyed by content hash.
pub trait TextCache: Send + Sync {
    fn get(&self, content_hash: &str) -> Option<CachedText>;
    fn put(&self, content_hash: &str, entry: &CachedText);
}

#[derive(Serialize, Deserialize)]
struct CacheFile {
    content_hash: String,
    text_length: usize,
    provider: TextProvider,
    text: String,
}

/// Filesystem-backed cache, one JSON file per content hash.
pub struct FsTextCache {
    dir: PathBuf,
}

impl FsTextCache {
    /// Open (creating if needed) a cache directory.
    pub fn new(dir: impl Into<PathBuf>) -> io::Result<Self> {
        let dir = dir.into();
        std::fs::create_dir_all(&dir)?;
        Ok(Self { dir })
    }

    fn entry_path(&self, content_hash: &str) -> PathBuf {
        self.dir.join(format!("{content_hash}.json"))
    }
}

impl TextCache for FsTextCache {
    fn get(&self, content_hash: &str) -> Option<CachedText> {
        let path = self.entry_path(content_hash);
        let raw = std::fs::read_to_string(&path).ok()?;
        match serde_json::from_str::<CacheFile>(&raw) {
            Ok(entry) => {
                tracing::debug!(hash = %&content_hash[..16.min(content_hash.len())], "Text cache hit");
                Some(CachedText {
                    text: entry.text,
                    provider: entry.provider,
                })
            }
            Err(e) => {
                tracing::warn!(error = %e, path = %path.display(), "Discarding corrupt cache entry");
                None
            }
        }
    }

    fn put(&self, content_hash: &str, entry: &CachedText) {
        let file = CacheFile {
            content_hash: content_hash.to_string(),
            text_length: entry.text.len(),
            provider: entry.provider,
            text: entry.text.clone(),
        };
        let path = self.entry_path(content_hash);
        let serialized = match serde_json::to_string(&file) {
            Ok(s) => s,
            Err(e) => {
                tracing::warn!(error = %e, "Failed to serialize cache entry");
                return;
            }
        };
        if let Err(e) = std::fs::write(&path, serialized) {
            tracing::warn!(error = %e, path = %path.display(), "Failed to write cache entry");
        }
    }
}

/// In-memory cache for tests.
#[cfg(test)]
pub struct MemoryTextCache {
    entries: std::sync::Mutex<std::collections::HashMap<String, CachedText>>,
}

#[cfg(test)]
impl MemoryTextCache {
    pub fn new() -> Self {
        Self {
            entries: std::sync::Mutex::new(std::collections::HashMap::new()),
        }
    }
}

#[cfg(test)]
impl TextCache for MemoryTextCache {
    fn get(&self, content_hash: &str) -> Option<CachedText> {
        self.entries.lock().unwrap().get(content_hash).cloned()
    }

    fn put(&self, content_hash: &str, entry: &CachedText) {
        self.entries
            .lock()
            .unwrap()
            .insert(content_hash.to_string(), entry.clone());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn content_hash_deterministic() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cert.pdf");
        std::fs::write(&path, b"certificate bytes").unwrap();

        let a = content_hash(&path).unwrap();
        let b = content_hash(&path).unwrap();
        assert_eq!(a, b);
        assert_eq!(a.len(), 64);
    }

    #[test]
    fn content_hash_differs_per_content() {
        let dir = tempfile::tempdir().unwrap();
        let a_path = dir.path().join("a.pdf");
        let b_path = dir.path().join("b.pdf");
        std::fs::write(&a_path, b"first").unwrap();
        std::fs::write(&b_path, b"second").unwrap();
        assert_ne!(content_hash(&a_path).unwrap(), content_hash(&b_path).unwrap());
    }

    #[test]
    fn text_hash_matches_itself() {
        assert_eq!(text_hash("abc"), text_hash("abc"));
        assert_ne!(text_hash("abc"), text_hash("abd"));
    }

    #[test]
    fn put_then_get_roundtrips() {
        let dir = tempfile::tempdir().unwrap();
        let cache = FsTextCache::new(dir.path().join("ocr")).unwrap();

        let entry = CachedText {
            text: "EACH OCCURRENCE $1,000,000".to_string(),
            provider: TextProvider::OcrEngine,
        };
        cache.put("abc123", &entry);
        assert_eq!(cache.get("abc123"), Some(entry));
    }

    #[test]
    fn get_miss_returns_none() {
        let dir = tempfile::tempdir().unwrap();
        let cache = FsTextCache::new(dir.path()).unwrap();
        assert_eq!(cache.get("missing"), None);
    }

    #[test]
    fn put_is_idempotent_last_writer_wins() {
        let dir = tempfile::tempdir().unwrap();
        let cache = FsTextCache::new(dir.path()).unwrap();

        let first = CachedText {
            text: "old text".to_string(),
            provider: TextProvider::NativeLayer,
        };
        let second = CachedText {
            text: "new text".to_string(),
            provider: TextProvider::OcrEngine,
        };
        cache.put("samehash", &first);
        cache.put("samehash", &second);
        assert_eq!(cache.get("samehash"), Some(second));
    }

    #[test]
    fn corrupt_entry_treated_as_miss() {
        let dir = tempfile::tempdir().unwrap();
        let cache = FsTextCache::new(dir.path()).unwrap();
        std::fs::write(dir.path().join("broken.json"), "not json at all").unwrap();
        assert_eq!(cache.get("broken"), None);
    }
}
