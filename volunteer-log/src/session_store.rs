use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
#[cfg(unix)]
use std::{io::Write, os::unix::fs::OpenOptionsExt};

const VOLUNTEER_ID_FILE: &str = "volunteer_id";
const TOKEN_FILE: &str = "oauth_token.json";

/// OAuth tokens as kept on disk. Only the owner can read the file.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredToken {
    pub access_token: String,
    #[serde(default)]
    pub refresh_token: Option<String>,
    /// Unix timestamp after which the access token must not be used.
    #[serde(default)]
    pub expires_at: Option<i64>,
}

impl StoredToken {
    pub fn is_fresh(&self, now: i64) -> bool {
        self.expires_at.map_or(true, |expires_at| now < expires_at)
    }
}

impl std::fmt::Debug for StoredToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StoredToken")
            .field("has_refresh_token", &self.refresh_token.is_some())
            .field("expires_at", &self.expires_at)
            .finish()
    }
}

/// Locally remembered identity: who is logging hours, and the OAuth tokens
/// that let this device append to the sheet.
#[derive(Debug, Clone)]
pub struct SessionStore {
    root: PathBuf,
}

impl SessionStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn volunteer_id_path(&self) -> PathBuf {
        self.root.join(VOLUNTEER_ID_FILE)
    }

    fn token_path(&self) -> PathBuf {
        self.root.join(TOKEN_FILE)
    }

    pub fn load_volunteer_id(&self) -> Result<Option<String>> {
        let path = self.volunteer_id_path();
        if !path.exists() {
            return Ok(None);
        }

        let id = std::fs::read_to_string(&path).context("Failed to read volunteer id file")?;
        let id = id.trim().to_string();
        if id.is_empty() {
            return Ok(None);
        }
        Ok(Some(id))
    }

    pub fn save_volunteer_id(&self, volunteer_id: &str) -> Result<()> {
        secure_write(&self.volunteer_id_path(), volunteer_id.trim())
    }

    pub fn load_token(&self) -> Result<Option<StoredToken>> {
        let path = self.token_path();
        if !path.exists() {
            return Ok(None);
        }

        let raw = std::fs::read_to_string(&path).context("Failed to read token file")?;
        let token = serde_json::from_str(&raw)
            .with_context(|| format!("Failed to parse token file at {}", path.display()))?;
        Ok(Some(token))
    }

    pub fn save_token(&self, token: &StoredToken) -> Result<()> {
        let raw = serde_json::to_string(token).context("Failed to serialize token")?;
        secure_write(&self.token_path(), &raw)
    }

    pub fn clear_token(&self) -> Result<()> {
        remove_if_exists(&self.token_path())
    }

    /// Forget the volunteer and the device tokens (logout).
    pub fn clear(&self) -> Result<()> {
        remove_if_exists(&self.volunteer_id_path())?;
        self.clear_token()
    }
}

fn remove_if_exists(path: &Path) -> Result<()> {
    if path.exists() {
        std::fs::remove_file(path)
            .with_context(|| format!("Failed to remove {}", path.display()))?;
    }
    Ok(())
}

fn secure_write(path: &Path, content: &str) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    #[cfg(unix)]
    {
        std::fs::OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(true)
            .mode(0o600)
            .open(path)?
            .write_all(content.as_bytes())?;
    }

    #[cfg(not(unix))]
    {
        std::fs::write(path, content)?;
    }

    Ok(())
}
