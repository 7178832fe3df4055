//! Renamer error types with rich context
//!
//! Every variant names the host operation that failed so the transcript
//! line is enough to diagnose a run after the fact.

use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum RenamerError {
    #[error("command execution failed: {command}")]
    CommandFailed {
        command: String,
        #[source]
        source: std::io::Error,
    },

    #[error("command returned non-zero exit code: {command}\nStderr: {stderr}")]
    CommandExitCode { command: String, stderr: String },

    #[error("unexpected output from '{operation}': {reason}")]
    UnexpectedOutput { operation: String, reason: String },

    #[error("failed to determine directory membership: {0}")]
    DirectoryQuery(#[source] Box<RenamerError>),

    #[error("domain controller for {domain} is unreachable")]
    DomainUnreachable { domain: String },

    #[error("candidate name rejected: {0}")]
    InvalidCandidate(String),

    #[error("failed to rename computer to {name}")]
    RenameFailed {
        name: String,
        #[source]
        source: Box<RenamerError>,
    },

    #[error("renamed to {name} but failed to schedule restart")]
    RestartFailed {
        name: String,
        #[source]
        source: Box<RenamerError>,
    },

    #[error("failed to ensure scheduled task '{task}'")]
    Scheduler {
        task: String,
        #[source]
        source: Box<RenamerError>,
    },

    #[error("io error during {operation}")]
    Io {
        operation: String,
        #[source]
        source: std::io::Error,
    },

    #[error("saved settings at {path} are unreadable")]
    Settings {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("failed to lock {path}")]
    Lock {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl RenamerError {
    pub fn io(operation: impl Into<String>, source: std::io::Error) -> Self {
        RenamerError::Io {
            operation: operation.into(),
            source,
        }
    }

    pub fn command_failed(command: impl Into<String>, source: std::io::Error) -> Self {
        RenamerError::CommandFailed {
            command: command.into(),
            source,
        }
    }

    pub fn unexpected_output(operation: impl Into<String>, reason: impl Into<String>) -> Self {
        RenamerError::UnexpectedOutput {
            operation: operation.into(),
            reason: reason.into(),
        }
    }

    pub fn scheduler(task: impl Into<String>, source: RenamerError) -> Self {
        RenamerError::Scheduler {
            task: task.into(),
            source: Box::new(source),
        }
    }
}

pub type Result<T> = std::result::Result<T, RenamerError>;
