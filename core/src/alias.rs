//! # Alias Store
//!
//! User-assigned names, persisted as a JSON map of identity to alias.
//! The only state that survives a restart; everything else is rebuilt
//! by discovery.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use tokio::fs;

use plugscout_common::device::DeviceId;
use plugscout_common::warn;

#[derive(Debug)]
pub struct AliasStore {
    path: PathBuf,
    aliases: HashMap<DeviceId, String>,
}

impl AliasStore {
    /// Load the store at `path`. A missing file is an empty store; a
    /// corrupt one is logged and treated as empty rather than blocking
    /// startup.
    pub async fn open(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let aliases = match fs::read_to_string(&path).await {
            Ok(raw) => match serde_json::from_str(&raw) {
                Ok(aliases) => aliases,
                Err(e) => {
                    warn!("Alias file {} is corrupt, starting empty: {e}", path.display());
                    HashMap::new()
                }
            },
            Err(_) => HashMap::new(),
        };
        Self { path, aliases }
    }

    pub fn get(&self, id: &DeviceId) -> Option<String> {
        self.aliases.get(id).cloned()
    }

    pub async fn set(&mut self, id: DeviceId, alias: String) -> Result<()> {
        if self.aliases.get(&id) == Some(&alias) {
            return Ok(());
        }
        self.aliases.insert(id, alias);
        self.persist().await
    }

    pub async fn remove(&mut self, id: &DeviceId) -> Result<()> {
        if self.aliases.remove(id).is_none() {
            return Ok(());
        }
        self.persist().await
    }

    pub async fn remove_many(&mut self, ids: &[DeviceId]) -> Result<()> {
        let mut changed = false;
        for id in ids {
            changed |= self.aliases.remove(id).is_some();
        }
        if changed {
            self.persist().await
        } else {
            Ok(())
        }
    }

    pub fn len(&self) -> usize {
        self.aliases.len()
    }

    pub fn is_empty(&self) -> bool {
        self.aliases.is_empty()
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Write through a temp file and rename, so a crash mid-write
    /// never leaves a half-written alias file behind.
    async fn persist(&self) -> Result<()> {
        let serialized = serde_json::to_string_pretty(&self.aliases)
            .context("failed to serialize alias map")?;
        let tmp = self.path.with_extension("json.tmp");
        fs::write(&tmp, serialized)
            .await
            .with_context(|| format!("failed to write {}", tmp.display()))?;
        fs::rename(&tmp, &self.path)
            .await
            .with_context(|| format!("failed to replace {}", self.path.display()))?;
        Ok(())
    }
}

// ╔════════════════════════════════════════════╗
// ║ ████████╗███████╗███████╗████████╗███████╗ ║
// ║ ╚══██╔══╝██╔════╝██╔════╝╚══██╔══╝██╔════╝ ║
// ║    ██║   █████╗  ███████╗   ██║   ███████╗ ║
// ║    ██║   ██╔══╝  ╚════██║   ██║   ╚════██║ ║
// ║    ██║   ███████╗███████║   ██║   ███████║ ║
// ║    ╚═╝   ╚══════╝╚══════╝   ╚═╝   ╚══════╝ ║
// ╚════════════════════════════════════════════╝
