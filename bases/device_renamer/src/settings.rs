// bases/device_renamer/src/settings.rs
//! Settings saved for scheduled runs
//!
//! The scheduled task starts the installed copy without options. Whatever the
//! registering run was told on its command line is written next to that copy,
//! so every later run names the device the same way.

use crate::error::{RenamerError, Result};
use identity_primitives::NamingScheme;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::debug;

pub const SETTINGS_FILE_NAME: &str = "settings.json";

/// Effective options of an apply-mode run, minus the install directory,
/// which is wherever this file lives
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SavedSettings {
    pub name_prefix: Option<String>,
    pub naming: NamingScheme,
    pub log_dir: PathBuf,
    pub restart_delay_secs: u64,
}

impl SavedSettings {
    /// Write the settings into `dir`, replacing any earlier copy
    pub async fn save(&self, dir: &Path) -> Result<PathBuf> {
        let path = dir.join(SETTINGS_FILE_NAME);
        let content = serde_json::to_vec_pretty(self).map_err(|e| RenamerError::Settings {
            path: path.clone(),
            source: e,
        })?;

        // Write then rename, so a concurrent reader never sees half a file
        let staging = path.with_extension("json.tmp");
        tokio::fs::write(&staging, content)
            .await
            .map_err(|e| RenamerError::io(format!("write {}", staging.display()), e))?;
        tokio::fs::rename(&staging, &path)
            .await
            .map_err(|e| RenamerError::io(format!("replace {}", path.display()), e))?;

        debug!("Saved settings to {}", path.display());
        Ok(path)
    }

    /// Read the settings saved in `dir`; `None` when there are none
    pub async fn load(dir: &Path) -> Result<Option<Self>> {
        let path = dir.join(SETTINGS_FILE_NAME);
        let content = match tokio::fs::read(&path).await {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(RenamerError::io(format!("read {}", path.display()), e)),
        };

        serde_json::from_slice(&content)
            .map(Some)
            .map_err(|e| RenamerError::Settings { path, source: e })
    }
}

/// First directory in `dirs` holding saved settings, with those settings
pub async fn find_saved(dirs: &[PathBuf]) -> Result<Option<(PathBuf, SavedSettings)>> {
    for dir in dirs {
        if let Some(settings) = SavedSettings::load(dir).await? {
            return Ok(Some((dir.clone(), settings)));
        }
    }
    Ok(None)
}
