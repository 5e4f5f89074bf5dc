//! Cluster credentials and their scoped on-disk form.
//!
//! A [`ClusterCredential`] is the raw kubeconfig fetched from the secret store.
//! It is turned into a [`MaterializedCredential`] (a private temporary file)
//! for exactly as long as the cluster operations need it. Releasing consumes
//! the handle, so a credential file can be deleted at most once; dropping an
//! unreleased handle still removes the file.

use std::fmt;
use std::io::Write;
use std::path::Path;

use tempfile::NamedTempFile;

use crate::error::{CredentialError, Result};

/// A short-lived cluster access credential (kubeconfig document).
///
/// The contents are never printed; `Debug` is redacted.
pub struct ClusterCredential {
    kubeconfig: String,
}

impl ClusterCredential {
    /// Wrap a kubeconfig document.
    #[must_use]
    pub fn new(kubeconfig: impl Into<String>) -> Self {
        Self {
            kubeconfig: kubeconfig.into(),
        }
    }

    /// Write the credential to a private temporary file.
    ///
    /// The file is created with owner-only permissions in `dir`, or in the
    /// system temporary directory when `dir` is `None`.
    ///
    /// # Errors
    ///
    /// Returns `CredentialError::Materialize` if the file cannot be created or written.
    pub fn materialize(self, dir: Option<&Path>) -> Result<MaterializedCredential> {
        let mut builder = tempfile::Builder::new();
        builder.prefix("kubeconfig-").suffix(".yaml");

        let mut file = match dir {
            Some(dir) => builder.tempfile_in(dir),
            None => builder.tempfile(),
        }
        .map_err(CredentialError::Materialize)?;

        file.write_all(self.kubeconfig.as_bytes())
            .and_then(|()| file.flush())
            .map_err(CredentialError::Materialize)?;

        Ok(MaterializedCredential { file })
    }
}

impl fmt::Debug for ClusterCredential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("ClusterCredential(<redacted>)")
    }
}

/// A credential written to a scoped kubeconfig file.
///
/// Owned by a single decommission invocation.
pub struct MaterializedCredential {
    file: NamedTempFile,
}

impl MaterializedCredential {
    /// Path of the kubeconfig file.
    #[must_use]
    pub fn path(&self) -> &Path {
        self.file.path()
    }

    /// Delete the kubeconfig file.
    ///
    /// # Errors
    ///
    /// Returns the I/O error if the file could not be removed.
    pub fn release(self) -> std::io::Result<()> {
        self.file.close()
    }
}

impl fmt::Debug for MaterializedCredential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MaterializedCredential")
            .field("path", &self.path())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const KUBECONFIG: &str = "apiVersion: v1\nkind: Config\nclusters: []\n";

    #[test]
    fn debug_is_redacted() {
        let credential = ClusterCredential::new("super-secret-token");
        let rendered = format!("{credential:?}");
        assert!(!rendered.contains("super-secret-token"));
    }

    #[test]
    fn materialize_writes_and_release_deletes() {
        let dir = tempfile::tempdir().unwrap();
        let materialized = ClusterCredential::new(KUBECONFIG)
            .materialize(Some(dir.path()))
            .unwrap();

        let path = materialized.path().to_path_buf();
        assert!(path.starts_with(dir.path()));
        assert_eq!(std::fs::read_to_string(&path).unwrap(), KUBECONFIG);

        materialized.release().unwrap();
        assert!(!path.exists());
    }

    #[test]
    fn drop_without_release_deletes() {
        let dir = tempfile::tempdir().unwrap();
        let materialized = ClusterCredential::new(KUBECONFIG)
            .materialize(Some(dir.path()))
            .unwrap();
        let path = materialized.path().to_path_buf();

        drop(materialized);
        assert!(!path.exists());
    }

    #[cfg(unix)]
    #[test]
    fn file_is_owner_only() {
        use std::os::unix::fs::PermissionsExt;

        let materialized = ClusterCredential::new(KUBECONFIG).materialize(None).unwrap();
        let mode = std::fs::metadata(materialized.path())
            .unwrap()
            .permissions()
            .mode();
        assert_eq!(mode & 0o077, 0);
    }

    #[test]
    fn materialize_into_missing_dir_fails() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("does-not-exist");

        let result = ClusterCredential::new(KUBECONFIG).materialize(Some(&missing));
        assert!(matches!(result, Err(CredentialError::Materialize(_))));
    }
}
