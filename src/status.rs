use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};

/// Mutable per-bot record, keyed by bot name.
///
/// Timestamps are unix milliseconds. `next_mint_at`, when set, is
/// authoritative over any cooldown derived from `last_mint_attempt`.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct BotStatus {
    #[serde(default)]
    pub claimed: bool,
    #[serde(default)]
    pub wallet_linked: bool,
    #[serde(default)]
    pub last_mint_attempt: Option<i64>,
    #[serde(default)]
    pub next_mint_at: Option<i64>,
    #[serde(default)]
    pub last_status_check: Option<i64>,
    #[serde(default)]
    pub last_post_result: Option<String>,
    #[serde(default)]
    pub post_ids: Vec<String>,
}

/// Durable mapping from bot name to status, backed by a JSON file.
///
/// Records are created lazily on first reference and never deleted. The
/// file is rewritten after every mutation so a crash loses at most the
/// bot currently being processed.
pub struct StatusStore {
    path: PathBuf,
    statuses: HashMap<String, BotStatus>,
}

impl StatusStore {
    /// Load the store. A missing or malformed file starts empty rather
    /// than failing the process.
    pub fn load<P: AsRef<Path>>(path: P) -> Self {
        let path = path.as_ref().to_path_buf();
        let statuses = match std::fs::read_to_string(&path) {
            Ok(contents) => match serde_json::from_str(&contents) {
                Ok(parsed) => parsed,
                Err(e) => {
                    eprintln!(
                        "Warning: status file {:?} is malformed ({}), starting fresh",
                        path, e
                    );
                    HashMap::new()
                }
            },
            Err(_) => HashMap::new(),
        };

        Self { path, statuses }
    }

    /// Look up a bot's status without creating it
    pub fn get(&self, name: &str) -> Option<&BotStatus> {
        self.statuses.get(name)
    }

    /// Get the mutable status for a bot, creating a default record on
    /// first reference
    pub fn entry(&mut self, name: &str) -> &mut BotStatus {
        self.statuses.entry(name.to_string()).or_default()
    }

    /// Persist the full map to disk
    pub fn save(&self) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)
                    .with_context(|| format!("Failed to create {:?}", parent))?;
            }
        }
        let contents = serde_json::to_string_pretty(&self.statuses)
            .context("Failed to serialize status map")?;
        std::fs::write(&self.path, contents)
            .with_context(|| format!("Failed to write status file {:?}", self.path))?;
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.statuses.len()
    }

    pub fn is_empty(&self) -> bool {
        self.statuses.is_empty()
    }
}
