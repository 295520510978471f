use serde::{Deserialize, Serialize};
use std::io;
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

/// Why a tagging call failed.
#[derive(Debug, Error)]
pub enum TaggerError {
    #[error("file not found: {}", path.display())]
    NotFound { path: PathBuf },

    #[error(
        "tool executable {} is missing; install it and ensure it is reachable",
        tool.display()
    )]
    ToolUnavailable {
        tool: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("tool failed on {}: {}", path.display(), stderr.trim_end())]
    ToolFailed {
        path: PathBuf,
        code: Option<i32>,
        stderr: String,
    },

    #[error("tool did not finish within {}s on {}", timeout.as_secs_f32(), path.display())]
    TimedOut { path: PathBuf, timeout: Duration },

    #[error("failed to remove backup {}: {source}", path.display())]
    Cleanup {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// Machine-checkable discriminant of a [`TaggerError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    NotFound,
    ToolUnavailable,
    ToolFailed,
    TimedOut,
    Cleanup,
}

impl TaggerError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::NotFound { .. } => ErrorKind::NotFound,
            Self::ToolUnavailable { .. } => ErrorKind::ToolUnavailable,
            Self::ToolFailed { .. } => ErrorKind::ToolFailed,
            Self::TimedOut { .. } => ErrorKind::TimedOut,
            Self::Cleanup { .. } => ErrorKind::Cleanup,
        }
    }
}
