//! Ephemeral artifacts
//!
//! Input files the automation binary needs (inventory, extra variables).
//! Each file is owned by an [`Artifact`] guard and removed when the guard
//! drops, whichever way the owning execution attempt ends.

use serde_json::Value as JsonValue;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};
use tracing::{debug, warn};
use uuid::Uuid;

use crate::error::ArtifactError;

/// Inventory used when a request carries none
pub const DEFAULT_INVENTORY: &str = "localhost ansible_connection=local";

/// Scoped ownership of one artifact file
#[derive(Debug)]
pub struct Artifact {
    path: PathBuf,
}

impl Artifact {
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for Artifact {
    fn drop(&mut self) {
        match std::fs::remove_file(&self.path) {
            Ok(()) => debug!(path = %self.path.display(), "Removed artifact"),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => warn!(path = %self.path.display(), error = %e, "Failed to remove artifact"),
        }
    }
}

/// Writes artifacts into a dedicated directory shared by all executions
#[derive(Debug, Clone)]
pub struct ArtifactManager {
    dir: PathBuf,
}

impl ArtifactManager {
    /// Creates the manager, creating `dir` if needed
    pub fn new(dir: impl Into<PathBuf>) -> Result<Self, ArtifactError> {
        let dir = dir.into();
        std::fs::create_dir_all(&dir).map_err(|source| ArtifactError::CreateDir {
            path: dir.clone(),
            source,
        })?;
        Ok(Self { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Writes the inventory file, substituting the local default for empty content
    pub async fn write_inventory(&self, content: &str) -> Result<Artifact, ArtifactError> {
        let content = if content.trim().is_empty() {
            DEFAULT_INVENTORY
        } else {
            content
        };

        let artifact = self.reserve("inventory", "");
        write(&artifact, content.as_bytes()).await?;
        Ok(artifact)
    }

    /// Writes the variable set as JSON. Returns `None` for an empty set, in
    /// which case no variables flag may be passed to the binary.
    pub async fn write_extra_vars(
        &self,
        vars: &HashMap<String, JsonValue>,
    ) -> Result<Option<Artifact>, ArtifactError> {
        if vars.is_empty() {
            return Ok(None);
        }

        let encoded = serde_json::to_vec(vars)?;
        let artifact = self.reserve("extravars", ".json");
        write(&artifact, &encoded).await?;
        Ok(Some(artifact))
    }

    // The guard exists before the write so a partial file is removed too.
    fn reserve(&self, prefix: &str, extension: &str) -> Artifact {
        let nanos = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_nanos())
            .unwrap_or_default();
        let name = format!("{}_{}_{}{}", prefix, nanos, Uuid::new_v4().simple(), extension);
        Artifact {
            path: self.dir.join(name),
        }
    }
}

async fn write(artifact: &Artifact, contents: &[u8]) -> Result<(), ArtifactError> {
    tokio::fs::write(artifact.path(), contents)
        .await
        .map_err(|source| ArtifactError::Write {
            path: artifact.path().to_path_buf(),
            source,
        })?;
    debug!(path = %artifact.path().display(), "Wrote artifact");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entries(dir: &Path) -> usize {
        std::fs::read_dir(dir).unwrap().count()
    }

    #[tokio::test]
    async fn test_empty_inventory_uses_local_default() {
        let dir = tempfile::tempdir().unwrap();
        let manager = ArtifactManager::new(dir.path()).unwrap();

        let artifact = manager.write_inventory("").await.unwrap();

        let content = std::fs::read_to_string(artifact.path()).unwrap();
        assert_eq!(content, "localhost ansible_connection=local");
        assert!(
            artifact
                .path()
                .file_name()
                .unwrap()
                .to_string_lossy()
                .starts_with("inventory_")
        );
    }

    #[tokio::test]
    async fn test_inventory_content_is_written_verbatim() {
        let dir = tempfile::tempdir().unwrap();
        let manager = ArtifactManager::new(dir.path()).unwrap();

        let artifact = manager.write_inventory("[web]\n10.0.0.1\n").await.unwrap();

        let content = std::fs::read_to_string(artifact.path()).unwrap();
        assert_eq!(content, "[web]\n10.0.0.1\n");
    }

    #[tokio::test]
    async fn test_artifact_removed_on_drop() {
        let dir = tempfile::tempdir().unwrap();
        let manager = ArtifactManager::new(dir.path()).unwrap();

        let artifact = manager.write_inventory("").await.unwrap();
        let path = artifact.path().to_path_buf();
        assert!(path.exists());

        drop(artifact);
        assert!(!path.exists());
        assert_eq!(entries(dir.path()), 0);
    }

    #[tokio::test]
    async fn test_empty_vars_are_skipped() {
        let dir = tempfile::tempdir().unwrap();
        let manager = ArtifactManager::new(dir.path()).unwrap();

        let artifact = manager.write_extra_vars(&HashMap::new()).await.unwrap();

        assert!(artifact.is_none());
        assert_eq!(entries(dir.path()), 0);
    }

    #[tokio::test]
    async fn test_vars_written_as_json() {
        let dir = tempfile::tempdir().unwrap();
        let manager = ArtifactManager::new(dir.path()).unwrap();
        let mut vars = HashMap::new();
        vars.insert("port".to_string(), serde_json::json!(8080));
        vars.insert("env".to_string(), serde_json::json!("prod"));

        let artifact = manager.write_extra_vars(&vars).await.unwrap().unwrap();

        let raw = std::fs::read_to_string(artifact.path()).unwrap();
        let decoded: HashMap<String, JsonValue> = serde_json::from_str(&raw).unwrap();
        assert_eq!(decoded, vars);
        assert_eq!(artifact.path().extension().unwrap(), "json");
    }

    #[tokio::test]
    async fn test_concurrent_writes_get_distinct_names() {
        let dir = tempfile::tempdir().unwrap();
        let manager = ArtifactManager::new(dir.path()).unwrap();

        let (a, b) = tokio::join!(manager.write_inventory(""), manager.write_inventory(""));
        let (a, b) = (a.unwrap(), b.unwrap());

        assert_ne!(a.path(), b.path());
        drop(a);
        assert!(b.path().exists());
    }

    #[tokio::test]
    async fn test_unwritable_directory_is_a_write_error() {
        let dir = tempfile::tempdir().unwrap();
        let manager = ArtifactManager::new(dir.path().join("artifacts")).unwrap();
        std::fs::remove_dir(manager.dir()).unwrap();

        let err = manager.write_inventory("").await.unwrap_err();

        assert!(matches!(err, ArtifactError::Write { .. }));
    }

    #[test]
    fn test_new_creates_directory() {
        let dir = tempfile::tempdir().unwrap();
        let nested = dir.path().join("temp").join("ansible");

        ArtifactManager::new(&nested).unwrap();

        assert!(nested.is_dir());
    }
}
