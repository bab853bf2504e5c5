use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use techdesk_core::{AppError, AppResult, Session};
use tracing::warn;

/// Persists the current session as a JSON file so it survives restarts.
#[derive(Debug, Clone)]
pub struct FileSessionStore {
    path: PathBuf,
}

impl FileSessionStore {
    /// Creates a store writing to `path`.
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Returns the backing file path.
    #[must_use]
    pub fn path(&self) -> &Path {
        self.path.as_path()
    }

    /// Loads the stored session. A missing or unreadable file yields `None`.
    pub async fn load(&self) -> AppResult<Option<Session>> {
        let contents = match tokio::fs::read(&self.path).await {
            Ok(contents) => contents,
            Err(error) if error.kind() == ErrorKind::NotFound => return Ok(None),
            Err(error) => {
                return Err(AppError::Internal(format!(
                    "failed to read session file '{}': {error}",
                    self.path.display()
                )));
            }
        };

        match serde_json::from_slice::<Session>(&contents) {
            Ok(session) => Ok(Some(session)),
            Err(error) => {
                warn!(path = %self.path.display(), error = %error, "discarding corrupt session file");
                self.clear().await?;
                Ok(None)
            }
        }
    }

    /// Replaces the stored session.
    pub async fn save(&self, session: &Session) -> AppResult<()> {
        if let Some(parent) = self.path.parent()
            && !parent.as_os_str().is_empty()
        {
            tokio::fs::create_dir_all(parent).await.map_err(|error| {
                AppError::Internal(format!(
                    "failed to create session directory '{}': {error}",
                    parent.display()
                ))
            })?;
        }

        let contents = serde_json::to_vec(session)
            .map_err(|error| AppError::Internal(format!("failed to encode session: {error}")))?;

        let staging = self.path.with_extension("tmp");
        tokio::fs::write(&staging, contents).await.map_err(|error| {
            AppError::Internal(format!(
                "failed to write session file '{}': {error}",
                staging.display()
            ))
        })?;
        tokio::fs::rename(&staging, &self.path)
            .await
            .map_err(|error| {
                AppError::Internal(format!(
                    "failed to replace session file '{}': {error}",
                    self.path.display()
                ))
            })
    }

    /// Removes the stored session. Removing a missing file succeeds.
    pub async fn clear(&self) -> AppResult<()> {
        match tokio::fs::remove_file(&self.path).await {
            Ok(()) => Ok(()),
            Err(error) if error.kind() == ErrorKind::NotFound => Ok(()),
            Err(error) => Err(AppError::Internal(format!(
                "failed to remove session file '{}': {error}",
                self.path.display()
            ))),
        }
    }
}
