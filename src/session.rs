//! The signed-in session stored on disk.
//!
//! Only the bearer token matters to the promotions core; the rest is shown to
//! the user so they know which account is active.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::AppConfig;

const SESSION_HOME_VAR: &str = "CINEMA_PROMOTIONS_HOME";
const SESSION_DIR: &str = ".cinema-promotions";
const SESSION_FILE: &str = "session.json";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredSession {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    pub access_token: String,
    pub saved_at: DateTime<Utc>,
}

impl StoredSession {
    pub fn new(access_token: impl Into<String>, email: Option<String>) -> Self {
        Self {
            email,
            access_token: access_token.into(),
            saved_at: Utc::now(),
        }
    }
}

/// `$CINEMA_PROMOTIONS_HOME/session.json`, else `$HOME/.cinema-promotions/session.json`.
pub fn default_session_path() -> Option<PathBuf> {
    if let Ok(dir) = std::env::var(SESSION_HOME_VAR) {
        let mut path = PathBuf::from(dir);
        path.push(SESSION_FILE);
        return Some(path);
    }

    std::env::var("HOME").ok().map(|home| {
        let mut path = PathBuf::from(home);
        path.push(SESSION_DIR);
        path.push(SESSION_FILE);
        path
    })
}

pub fn session_path(config: &AppConfig) -> Option<PathBuf> {
    config.session_file.clone().or_else(default_session_path)
}

pub fn read_session(path: &Path) -> Result<Option<StoredSession>> {
    if !path.exists() {
        return Ok(None);
    }

    let data = fs::read_to_string(path)
        .with_context(|| format!("failed to read session file {}", path.display()))?;
    let session: StoredSession = serde_json::from_str(&data)
        .with_context(|| format!("failed to parse session file {}", path.display()))?;
    Ok(Some(session))
}

pub fn save_session(path: &Path, session: &StoredSession) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("failed creating directory {}", parent.display()))?;
    }

    let payload = serde_json::to_vec_pretty(session)?;
    fs::write(path, payload).with_context(|| format!("failed writing {}", path.display()))?;
    Ok(())
}

/// Returns whether a file was actually removed.
pub fn clear_session_file(path: &Path) -> Result<bool> {
    if path.exists() {
        fs::remove_file(path).with_context(|| format!("failed to remove {}", path.display()))?;
        return Ok(true);
    }
    Ok(false)
}

/// Bearer token to use: the configured `auth_token` first, then the stored
/// session. Blank values count as absent.
pub fn resolve_token(config: &AppConfig) -> Result<Option<String>> {
    if let Some(token) = config.auth_token.as_deref().map(str::trim) {
        if !token.is_empty() {
            debug!("using configured auth token");
            return Ok(Some(token.to_string()));
        }
    }

    let Some(path) = session_path(config) else {
        return Ok(None);
    };
    let token = read_session(&path)?
        .map(|session| session.access_token.trim().to_string())
        .filter(|token| !token.is_empty());
    if token.is_some() {
        debug!(path = %path.display(), "using stored session token");
    }
    Ok(token)
}
