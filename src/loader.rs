//! Loading of pre-extracted trace artifacts.
//!
//! Network records and main-thread tasks are produced upstream from a browser
//! trace and handed over as JSON arrays. Any failure here aborts the audit:
//! no aggregation is attempted on partial input.

use crate::models::{ExecutionTask, TransferRecord};
use serde::de::DeserializeOwned;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::info;

/// Errors produced while loading audit inputs.
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("task {index} in {path} has invalid self time {self_time}")]
    InvalidSelfTime {
        path: PathBuf,
        index: usize,
        self_time: f64,
    },
}

/// Everything the attribution pass consumes.
#[derive(Debug, Clone, Default)]
pub struct AuditInputs {
    pub records: Vec<TransferRecord>,
    pub tasks: Vec<ExecutionTask>,
}

/// Load network records and main-thread tasks, in that order.
pub async fn load_inputs(network_path: &Path, tasks_path: &Path) -> Result<AuditInputs, LoadError> {
    let records: Vec<TransferRecord> = read_json(network_path).await?;
    info!(
        path = %network_path.display(),
        count = records.len(),
        "Loaded network records"
    );

    let tasks: Vec<ExecutionTask> = read_json(tasks_path).await?;
    if let Some((index, task)) = tasks
        .iter()
        .enumerate()
        .find(|(_, t)| !t.self_time.is_finite() || t.self_time < 0.0)
    {
        return Err(LoadError::InvalidSelfTime {
            path: tasks_path.to_path_buf(),
            index,
            self_time: task.self_time,
        });
    }
    info!(
        path = %tasks_path.display(),
        count = tasks.len(),
        "Loaded main-thread tasks"
    );

    Ok(AuditInputs { records, tasks })
}

async fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T, LoadError> {
    let content = tokio::fs::read_to_string(path)
        .await
        .map_err(|source| LoadError::Io {
            path: path.to_path_buf(),
            source,
        })?;

    serde_json::from_str(&content).map_err(|source| LoadError::Parse {
        path: path.to_path_buf(),
        source,
    })
}
