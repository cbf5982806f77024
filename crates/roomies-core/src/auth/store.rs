//! Session token persistence backends.

use std::path::PathBuf;
use std::sync::{Mutex, PoisonError};

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use keyring::Entry;
use serde::{Deserialize, Serialize};

/// Keychain service name
pub const SERVICE_NAME: &str = "roomies";

/// Storage key for the session token
pub const SESSION_KEY: &str = "session";

/// Session file name in the config directory
const SESSION_FILE: &str = "session.json";

/// Durable key-value storage for the session token.
pub trait SessionStore: Send + Sync {
    /// The persisted token, or `None` if there is none
    fn load(&self) -> Result<Option<String>>;
    fn save(&self, token: &str) -> Result<()>;
    /// Remove the persisted token. Clearing an empty store is not an error.
    fn clear(&self) -> Result<()>;
}

/// Keeps the token in the OS keychain.
pub struct KeyringStore {
    service: String,
}

impl KeyringStore {
    pub fn new() -> Self {
        Self {
            service: SERVICE_NAME.to_string(),
        }
    }

    fn entry(&self) -> Result<Entry> {
        Entry::new(&self.service, SESSION_KEY).context("Failed to create keyring entry")
    }
}

impl Default for KeyringStore {
    fn default() -> Self {
        Self::new()
    }
}

impl SessionStore for KeyringStore {
    fn load(&self) -> Result<Option<String>> {
        match self.entry()?.get_password() {
            Ok(token) => Ok(Some(token)),
            Err(keyring::Error::NoEntry) => Ok(None),
            Err(e) => Err(e).context("Failed to retrieve session from keychain"),
        }
    }

    fn save(&self, token: &str) -> Result<()> {
        self.entry()?
            .set_password(token)
            .context("Failed to store session in keychain")
    }

    fn clear(&self) -> Result<()> {
        match self.entry()?.delete_credential() {
            Ok(()) | Err(keyring::Error::NoEntry) => Ok(()),
            Err(e) => Err(e).context("Failed to delete session from keychain"),
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct SessionFile {
    token: String,
    saved_at: DateTime<Utc>,
}

/// Keeps the token in a JSON file, for systems without a keychain.
pub struct FileStore {
    dir: PathBuf,
}

impl FileStore {
    pub fn new(dir: PathBuf) -> Self {
        Self { dir }
    }

    fn session_path(&self) -> PathBuf {
        self.dir.join(SESSION_FILE)
    }
}

impl SessionStore for FileStore {
    fn load(&self) -> Result<Option<String>> {
        let path = self.session_path();
        if !path.exists() {
            return Ok(None);
        }
        let contents = std::fs::read_to_string(&path).context("Failed to read session file")?;
        let data: SessionFile =
            serde_json::from_str(&contents).context("Failed to parse session file")?;
        Ok(Some(data.token))
    }

    fn save(&self, token: &str) -> Result<()> {
        let path = self.session_path();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let data = SessionFile {
            token: token.to_string(),
            saved_at: Utc::now(),
        };
        let contents = serde_json::to_string_pretty(&data)?;
        std::fs::write(path, contents).context("Failed to write session file")?;
        Ok(())
    }

    fn clear(&self) -> Result<()> {
        let path = self.session_path();
        if path.exists() {
            std::fs::remove_file(path).context("Failed to remove session file")?;
        }
        Ok(())
    }
}

/// In-process store. Nothing survives a restart.
#[derive(Debug, Default)]
pub struct MemoryStore {
    token: Mutex<Option<String>>,
    failing: bool,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_token(token: &str) -> Self {
        Self {
            token: Mutex::new(Some(token.to_string())),
            failing: false,
        }
    }

    /// A store whose every operation fails, like a locked keychain
    pub fn failing() -> Self {
        Self {
            token: Mutex::new(None),
            failing: true,
        }
    }

    fn check(&self) -> Result<()> {
        if self.failing {
            anyhow::bail!("Session storage is unavailable");
        }
        Ok(())
    }
}

impl SessionStore for MemoryStore {
    fn load(&self) -> Result<Option<String>> {
        self.check()?;
        Ok(self.token.lock().unwrap_or_else(PoisonError::into_inner).clone())
    }

    fn save(&self, token: &str) -> Result<()> {
        self.check()?;
        *self.token.lock().unwrap_or_else(PoisonError::into_inner) = Some(token.to_string());
        Ok(())
    }

    fn clear(&self) -> Result<()> {
        self.check()?;
        *self.token.lock().unwrap_or_else(PoisonError::into_inner) = None;
        Ok(())
    }
}
