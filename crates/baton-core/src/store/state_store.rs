//! StateStore: transactional access to `<workspace>/.baton/workflow-state.json`.
//!
//! Every mutation is a load-mutate-save critical section keyed by workspace
//! path. Inside one process the section is a tokio mutex; across processes
//! (`baton tool`, `baton steer` and a running loop) it is an exclusive
//! advisory lock on `workflow-state.lock` next to the document. Saves go to a
//! temp file in the same directory and are renamed into place, so a reader
//! sees either the old or the new document, never a torn one.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};

use fs4::fs_std::FileExt;
use tokio::fs;

use crate::config::EngineConfig;
use crate::error::EngineError;
use crate::models::WorkflowState;
use crate::singleflight::SingleFlight;

const STATE_FILE: &str = "workflow-state.json";
const LOCK_FILE: &str = "workflow-state.lock";

pub struct StateStore {
    state_dir: String,
    /// Map: canonical workspace path → transaction lock
    locks: Mutex<HashMap<PathBuf, Arc<tokio::sync::Mutex<()>>>>,
    snapshots: SingleFlight<PathBuf, Result<WorkflowState, EngineError>>,
}

impl StateStore {
    pub fn new(config: &EngineConfig) -> Self {
        Self {
            state_dir: config.state_dir.clone(),
            locks: Mutex::new(HashMap::new()),
            snapshots: SingleFlight::new(),
        }
    }

    pub fn state_path(&self, workspace: &Path) -> PathBuf {
        workspace.join(&self.state_dir).join(STATE_FILE)
    }

    fn lock_path(&self, workspace: &Path) -> PathBuf {
        workspace.join(&self.state_dir).join(LOCK_FILE)
    }

    /// Read the current document. A missing or empty file is an empty state.
    pub async fn load(&self, workspace: &Path) -> Result<WorkflowState, EngineError> {
        read_state(&self.state_path(workspace)).await
    }

    /// Read-only view for viewers polling the same workspace. Concurrent
    /// requests share one read.
    pub async fn snapshot(&self, workspace: &Path) -> Result<WorkflowState, EngineError> {
        let path = self.state_path(workspace);
        self.snapshots
            .run(path.clone(), || async move { read_state(&path).await })
            .await
    }

    /// Apply `mutate` as one atomic read-modify-write.
    pub async fn transaction<R, F>(&self, workspace: &Path, mutate: F) -> Result<R, EngineError>
    where
        F: FnOnce(&mut WorkflowState) -> R,
    {
        self.try_transaction(workspace, |state| Ok::<R, std::convert::Infallible>(mutate(state)))
            .await
            .map(|result| match result {
                Ok(value) => value,
                Err(never) => match never {},
            })
    }

    /// Like `transaction`, but an `Err` from `mutate` discards the changes:
    /// nothing is written and the inner error is handed back.
    pub async fn try_transaction<R, E, F>(
        &self,
        workspace: &Path,
        mutate: F,
    ) -> Result<Result<R, E>, EngineError>
    where
        F: FnOnce(&mut WorkflowState) -> Result<R, E>,
    {
        let lock = self.lock_for(workspace);
        let _guard = lock.lock().await;
        // Released when the handle is dropped at the end of the section.
        let _file_lock = acquire_file_lock(self.lock_path(workspace)).await?;

        let path = self.state_path(workspace);
        let mut state = read_state(&path).await?;
        match mutate(&mut state) {
            Ok(value) => {
                write_state(&path, &state).await?;
                Ok(Ok(value))
            }
            Err(err) => Ok(Err(err)),
        }
    }

    fn lock_for(&self, workspace: &Path) -> Arc<tokio::sync::Mutex<()>> {
        let key = std::fs::canonicalize(workspace).unwrap_or_else(|_| workspace.to_path_buf());
        let mut locks = self.locks.lock().unwrap_or_else(PoisonError::into_inner);
        locks.entry(key).or_default().clone()
    }
}

/// Open (creating if needed) the lock file and block until this handle holds
/// an exclusive lock on it.
async fn acquire_file_lock(path: PathBuf) -> Result<std::fs::File, EngineError> {
    let display = path.display().to_string();
    tokio::task::spawn_blocking(move || {
        if let Some(dir) = path.parent() {
            std::fs::create_dir_all(dir)?;
        }
        let file = std::fs::OpenOptions::new()
            .create(true)
            .read(true)
            .write(true)
            .truncate(false)
            .open(&path)?;
        file.lock_exclusive()?;
        Ok::<_, std::io::Error>(file)
    })
    .await
    .map_err(|e| EngineError::Internal(format!("State lock task failed: {}", e)))?
    .map_err(|e| EngineError::Io(format!("Failed to lock '{}': {}", display, e)))
}

async fn read_state(path: &Path) -> Result<WorkflowState, EngineError> {
    let raw = match fs::read_to_string(path).await {
        Ok(raw) => raw,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(WorkflowState::default()),
        Err(e) => {
            return Err(EngineError::Io(format!(
                "Failed to read workflow state '{}': {}",
                path.display(),
                e
            )))
        }
    };

    if raw.trim().is_empty() {
        return Ok(WorkflowState::default());
    }

    serde_json::from_str(&raw).map_err(|e| {
        EngineError::State(format!(
            "Failed to parse workflow state '{}': {}",
            path.display(),
            e
        ))
    })
}

async fn write_state(path: &Path, state: &WorkflowState) -> Result<(), EngineError> {
    let json = serde_json::to_string_pretty(state)?;
    write_atomic(path, json.as_bytes()).await?;
    tracing::debug!("[StateStore] Saved {}", path.display());
    Ok(())
}

/// Write `contents` to a temp file beside `path` and rename it into place.
pub(crate) async fn write_atomic(path: &Path, contents: &[u8]) -> Result<(), EngineError> {
    let dir = path
        .parent()
        .ok_or_else(|| EngineError::Internal(format!("No parent for '{}'", path.display())))?;
    fs::create_dir_all(dir)
        .await
        .map_err(|e| EngineError::Io(format!("Failed to create '{}': {}", dir.display(), e)))?;

    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    let tmp = dir.join(format!(".{}.{}.tmp", name, uuid::Uuid::new_v4()));
    fs::write(&tmp, contents)
        .await
        .map_err(|e| EngineError::Io(format!("Failed to write '{}': {}", tmp.display(), e)))?;

    if let Err(e) = fs::rename(&tmp, path).await {
        let _ = fs::remove_file(&tmp).await;
        return Err(EngineError::Io(format!(
            "Failed to replace '{}': {}",
            path.display(),
            e
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::WorkflowStatus;

    fn store() -> StateStore {
        StateStore::new(&EngineConfig::default())
    }

    #[tokio::test]
    async fn test_missing_file_is_empty_state() {
        let dir = tempfile::tempdir().unwrap();
        let state = store().load(dir.path()).await.unwrap();
        assert_eq!(state, WorkflowState::default());
    }

    #[tokio::test]
    async fn test_transaction_persists() {
        let dir = tempfile::tempdir().unwrap();
        let store = store();
        store
            .transaction(dir.path(), |s| {
                s.status = WorkflowStatus::AgentDone;
                s.task = "done".into();
            })
            .await
            .unwrap();

        let state = store.load(dir.path()).await.unwrap();
        assert_eq!(state.status, WorkflowStatus::AgentDone);
        assert_eq!(state.task, "done");
        assert!(store.state_path(dir.path()).exists());
    }

    #[tokio::test]
    async fn test_failed_transaction_writes_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let store = store();
        let result = store
            .try_transaction(dir.path(), |s| {
                s.task = "should not persist".into();
                Err::<(), _>("nope".to_string())
            })
            .await
            .unwrap();
        assert_eq!(result, Err("nope".to_string()));
        assert!(!store.state_path(dir.path()).exists());
    }

    #[tokio::test]
    async fn test_concurrent_transactions_do_not_lose_updates() {
        let dir = tempfile::tempdir().unwrap();
        let store = Arc::new(store());
        let mut handles = Vec::new();
        for i in 0..20 {
            let store = store.clone();
            let ws = dir.path().to_path_buf();
            handles.push(tokio::spawn(async move {
                store
                    .transaction(&ws, |s| s.add_progress("dev", format!("step {}", i)))
                    .await
                    .unwrap();
            }));
        }
        for handle in handles {
            handle.await.unwrap();
        }
        let state = store.load(dir.path()).await.unwrap();
        assert_eq!(state.progress.len(), 20);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_separate_stores_share_the_file_lock() {
        let dir = tempfile::tempdir().unwrap();
        let stores = [Arc::new(store()), Arc::new(store())];
        let mut handles = Vec::new();
        for i in 0..40 {
            let store = stores[i % 2].clone();
            let ws = dir.path().to_path_buf();
            handles.push(tokio::spawn(async move {
                store
                    .transaction(&ws, |s| s.add_progress("dev", format!("step {}", i)))
                    .await
                    .unwrap();
            }));
        }
        for handle in handles {
            handle.await.unwrap();
        }
        let state = stores[0].load(dir.path()).await.unwrap();
        assert_eq!(state.progress.len(), 40);
        assert!(dir.path().join(".baton").join(LOCK_FILE).exists());
    }

    #[tokio::test]
    async fn test_corrupt_document_is_a_state_error() {
        let dir = tempfile::tempdir().unwrap();
        let store = store();
        let path = store.state_path(dir.path());
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(&path, "{ not json").unwrap();
        assert!(matches!(store.load(dir.path()).await, Err(EngineError::State(_))));
        assert!(matches!(store.snapshot(dir.path()).await, Err(EngineError::State(_))));
    }
}
