use std::collections::HashMap;
use std::sync::{PoisonError, RwLock};

use tracing::debug;

/// Standard data-URI prefix for JPEG payloads
pub const JPEG_DATA_URI_PREFIX: &str = "data:image/jpeg;base64,";

/// Prefix artifact left behind when a data URI has its punctuation stripped
const MALFORMED_PREFIX: &str = "dataimage/jpegbase64";

/// Process-lifetime store of base64 images keyed by cache key.
///
/// Shared by `Arc` between API clients; a fresh cache per client (or per
/// test) keeps state from leaking across owners.
#[derive(Debug, Default)]
pub struct ImageCache {
    entries: RwLock<HashMap<String, String>>,
}

impl ImageCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Cache key for a user's profile picture. `None` is the signed-in user.
    pub fn profile_key(user_id: Option<i64>) -> String {
        match user_id {
            Some(id) => format!("profile_{}", id),
            None => "profile_self".to_string(),
        }
    }

    /// Store an image, replacing any previous entry for the key
    pub fn cache_image(&self, key: &str, data: &str) {
        let mut entries = self.entries.write().unwrap_or_else(PoisonError::into_inner);
        entries.insert(key.to_string(), data.to_string());
        debug!(key = key, bytes = data.len(), "Cached image");
    }

    pub fn get_cached_image(&self, key: &str) -> Option<String> {
        let entries = self.entries.read().unwrap_or_else(PoisonError::into_inner);
        entries.get(key).filter(|d| !d.is_empty()).cloned()
    }

    /// Drop a single entry, e.g. after the picture was replaced
    pub fn remove(&self, key: &str) -> Option<String> {
        let mut entries = self.entries.write().unwrap_or_else(PoisonError::into_inner);
        entries.remove(key)
    }

    /// Remove every entry. Use this to force a refresh of all images.
    pub fn clear(&self) {
        let mut entries = self.entries.write().unwrap_or_else(PoisonError::into_inner);
        let count = entries.len();
        entries.clear();
        debug!(count = count, "Cleared image cache");
    }

    pub fn len(&self) -> usize {
        self.entries.read().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Normalize a base64 image so it carries exactly one JPEG data-URI prefix.
///
/// Strips every `dataimage/jpegbase64` artifact some uploads carry and any
/// leading data-URI prefixes, then adds one standard prefix. Applying it
/// twice is the same as applying it once.
pub fn format_base64_image(raw: &str) -> String {
    let mut cleaned = raw.to_string();
    // Removing one artifact can join the halves of another
    while cleaned.contains(MALFORMED_PREFIX) {
        cleaned = cleaned.replace(MALFORMED_PREFIX, "");
    }

    let mut payload = cleaned.as_str();
    while let Some(rest) = payload.strip_prefix(JPEG_DATA_URI_PREFIX) {
        payload = rest;
    }

    format!("{}{}", JPEG_DATA_URI_PREFIX, payload)
}
