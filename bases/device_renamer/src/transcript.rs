// bases/device_renamer/src/transcript.rs
//! Session transcript
//!
//! One log file per run. The transcript is opened before anything else and
//! closed when dropped, so the footer is written on every exit path.

use crate::error::{RenamerError, Result};
use chrono::Local;
use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;

const BANNER: &str = "**********************";

#[derive(Debug)]
pub struct Transcript {
    path: PathBuf,
    file: Arc<File>,
    exit_code: Option<i32>,
}

impl Transcript {
    /// Create `<dir>/rename-device-<timestamp>.log` and write the header
    pub async fn open(dir: &Path) -> Result<Self> {
        tokio::fs::create_dir_all(dir)
            .await
            .map_err(|e| RenamerError::io(format!("create log directory {}", dir.display()), e))?;

        let started = Local::now();
        let path = dir.join(format!(
            "rename-device-{}.log",
            started.format("%Y%m%d-%H%M%S")
        ));

        let file = tokio::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .await
            .map_err(|e| RenamerError::io(format!("open transcript {}", path.display()), e))?
            .into_std()
            .await;

        let transcript = Self {
            path,
            file: Arc::new(file),
            exit_code: None,
        };
        transcript
            .write_block(&[
                "Transcript started".to_string(),
                format!("Start time: {}", started.to_rfc3339()),
                format!("Version: {}", env!("CARGO_PKG_VERSION")),
            ])
            .map_err(|e| RenamerError::io("write transcript header", e))?;

        Ok(transcript)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Shared handle for the tracing layer that mirrors status lines here
    pub fn writer(&self) -> Arc<File> {
        Arc::clone(&self.file)
    }

    /// Record the exit code for the footer and close the transcript
    pub fn finish(mut self, exit_code: i32) {
        self.exit_code = Some(exit_code);
    }

    fn write_block(&self, lines: &[String]) -> std::io::Result<()> {
        let mut file = &*self.file;
        writeln!(file, "{BANNER}")?;
        for line in lines {
            writeln!(file, "{line}")?;
        }
        writeln!(file, "{BANNER}")?;
        file.flush()
    }
}

impl Drop for Transcript {
    fn drop(&mut self) {
        let mut lines = vec![
            "Transcript ended".to_string(),
            format!("End time: {}", Local::now().to_rfc3339()),
        ];
        if let Some(code) = self.exit_code {
            lines.push(format!("Exit code: {code}"));
        }
        // Nowhere left to report a failure to
        let _ = self.write_block(&lines);
        let _ = self.file.sync_all();
    }
}
