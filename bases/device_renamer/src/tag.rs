// bases/device_renamer/src/tag.rs
//! Installation tag for inventory and detection rules

use crate::error::{RenamerError, Result};
use chrono::Local;
use std::path::{Path, PathBuf};

pub const TAG_FILE_NAME: &str = "rename-device.tag";

/// Write (or refresh) the tag file marking this program as installed
pub async fn write_install_tag(dir: &Path) -> Result<PathBuf> {
    tokio::fs::create_dir_all(dir)
        .await
        .map_err(|e| RenamerError::io(format!("create tag directory {}", dir.display()), e))?;

    let path = dir.join(TAG_FILE_NAME);
    let content = format!(
        "Installed {} {}\n",
        env!("CARGO_PKG_VERSION"),
        Local::now().to_rfc3339()
    );
    tokio::fs::write(&path, content)
        .await
        .map_err(|e| RenamerError::io(format!("write tag file {}", path.display()), e))?;

    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn creates_directory_and_tag() {
        let dir = TempDir::new().unwrap();
        let target = dir.path().join("nested").join("install");

        let path = write_install_tag(&target).await.unwrap();

        assert_eq!(path, target.join(TAG_FILE_NAME));
        let content = std::fs::read_to_string(&path).unwrap();
        assert!(content.starts_with("Installed "));
    }

    #[tokio::test]
    async fn rewrites_existing_tag() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join(TAG_FILE_NAME), "stale").unwrap();

        write_install_tag(dir.path()).await.unwrap();

        let content = std::fs::read_to_string(dir.path().join(TAG_FILE_NAME)).unwrap();
        assert!(content.starts_with("Installed "));
    }
}
