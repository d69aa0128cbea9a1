//! Last-seen update cursor, persisted as JSON across restarts.
//!
//! ```json
//! { "botazavr": { "lastUpdateId": 918273 } }
//! ```

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct BotCursor {
    #[serde(rename = "lastUpdateId", default, skip_serializing_if = "Option::is_none")]
    last_update_id: Option<i64>,
}

/// Shared handle to the cursor file.
#[derive(Clone)]
pub struct CursorCache {
    path: Arc<PathBuf>,
    entries: Arc<Mutex<HashMap<String, BotCursor>>>,
}

impl CursorCache {
    /// Loads `path`. A missing or unreadable file starts an empty cache.
    pub fn load(path: impl AsRef<Path>) -> Self {
        let path = path.as_ref().to_path_buf();
        let entries = match std::fs::read_to_string(&path) {
            Ok(raw) => serde_json::from_str(&raw).unwrap_or_else(|e| {
                warn!(path = %path.display(), error = %e, "Ignoring corrupt cursor cache");
                HashMap::new()
            }),
            Err(e) => {
                debug!(path = %path.display(), error = %e, "No cursor cache yet");
                HashMap::new()
            }
        };

        Self {
            path: Arc::new(path),
            entries: Arc::new(Mutex::new(entries)),
        }
    }

    /// Last update id handled by `bot`, or `0`.
    pub fn last_update_id(&self, bot: &str) -> i64 {
        self.entries
            .lock()
            .get(bot)
            .and_then(|cursor| cursor.last_update_id)
            .unwrap_or(0)
    }

    /// Moves the cursor of `bot` forward to `update_id`. Never moves back.
    pub fn advance(&self, bot: &str, update_id: i64) {
        let mut entries = self.entries.lock();
        let cursor = entries.entry(bot.to_string()).or_default();
        if cursor.last_update_id.unwrap_or(0) < update_id {
            cursor.last_update_id = Some(update_id);
        }
    }

    /// Writes the cache back to its file.
    pub fn save(&self) -> Result<()> {
        let raw = serde_json::to_string(&*self.entries.lock())?;
        std::fs::write(&*self.path, raw)
            .with_context(|| format!("writing {}", self.path.display()))?;
        info!(path = %self.path.display(), "Cursor cache saved");
        Ok(())
    }
}
