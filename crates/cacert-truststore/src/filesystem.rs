//! Filesystem capability: ensure a directory or file is in a given state
//! and report whether anything had to change.

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use async_trait::async_trait;

use crate::TrustStoreError;

/// Desired state of the trust store directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirectorySpec {
    pub path: PathBuf,
    pub owner: String,
    pub group: String,
    pub mode: u32,
    /// Remove entries whose file name is not in `keep`.
    pub purge: bool,
    /// With `purge`, also remove unmanaged subdirectories.
    pub recurse: bool,
    pub keep: BTreeSet<String>,
}

/// Desired state of one managed file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileSpec {
    pub path: PathBuf,
    pub content: Vec<u8>,
    pub owner: String,
    pub group: String,
    pub mode: u32,
}

/// Capability to converge filesystem state. Every method returns whether
/// it changed anything.
#[async_trait]
pub trait Filesystem: Send + Sync {
    async fn ensure_directory(&self, spec: &DirectorySpec) -> Result<bool, TrustStoreError>;
    async fn ensure_file(&self, spec: &FileSpec) -> Result<bool, TrustStoreError>;
    async fn remove_file(&self, path: &Path) -> Result<bool, TrustStoreError>;
}

#[cfg(unix)]
pub use host::HostFilesystem;

#[cfg(unix)]
mod host {
    use std::collections::BTreeSet;
    use std::io;
    use std::os::unix::fs::{MetadataExt, PermissionsExt};
    use std::path::Path;

    use async_trait::async_trait;
    use nix::unistd::{Group, User};

    use super::{DirectorySpec, FileSpec, Filesystem};
    use crate::profile::mode_string;
    use crate::TrustStoreError;

    /// Converges real files on the local host. Blocking syscalls run on
    /// the tokio blocking pool.
    #[derive(Debug, Clone, Default)]
    pub struct HostFilesystem;

    impl HostFilesystem {
        pub fn new() -> Self {
            Self
        }
    }

    #[async_trait]
    impl Filesystem for HostFilesystem {
        async fn ensure_directory(&self, spec: &DirectorySpec) -> Result<bool, TrustStoreError> {
            let spec = spec.clone();
            blocking(move || ensure_directory(&spec)).await
        }

        async fn ensure_file(&self, spec: &FileSpec) -> Result<bool, TrustStoreError> {
            let spec = spec.clone();
            blocking(move || ensure_file(&spec)).await
        }

        async fn remove_file(&self, path: &Path) -> Result<bool, TrustStoreError> {
            let path = path.to_path_buf();
            blocking(move || match std::fs::remove_file(&path) {
                Ok(()) => {
                    tracing::info!(path = %path.display(), "Removed certificate file");
                    Ok(true)
                }
                Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(false),
                Err(e) => Err(e.into()),
            })
            .await
        }
    }

    async fn blocking<F>(f: F) -> Result<bool, TrustStoreError>
    where
        F: FnOnce() -> Result<bool, TrustStoreError> + Send + 'static,
    {
        tokio::task::spawn_blocking(f)
            .await
            .map_err(|e| TrustStoreError::Io(io::Error::other(e)))?
    }

    fn ensure_directory(spec: &DirectorySpec) -> Result<bool, TrustStoreError> {
        let mut changed = false;

        match std::fs::symlink_metadata(&spec.path) {
            Ok(meta) if meta.is_dir() => {}
            Ok(_) => {
                return Err(TrustStoreError::Io(io::Error::new(
                    io::ErrorKind::AlreadyExists,
                    format!("{} exists and is not a directory", spec.path.display()),
                )));
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                std::fs::create_dir_all(&spec.path)?;
                tracing::info!(path = %spec.path.display(), "Created trust store directory");
                changed = true;
            }
            Err(e) => return Err(e.into()),
        }

        changed |= apply_ownership(&spec.path, &spec.owner, &spec.group)?;
        changed |= apply_mode(&spec.path, spec.mode)?;

        if spec.purge {
            changed |= purge_unmanaged(&spec.path, &spec.keep, spec.recurse)?;
        }

        Ok(changed)
    }

    fn ensure_file(spec: &FileSpec) -> Result<bool, TrustStoreError> {
        let existing = match std::fs::read(&spec.path) {
            Ok(bytes) => Some(bytes),
            Err(e) if e.kind() == io::ErrorKind::NotFound => None,
            Err(e) => return Err(e.into()),
        };

        let mut changed = false;
        if existing.as_deref() != Some(spec.content.as_slice()) {
            write_atomic(&spec.path, &spec.content, spec.mode)?;
            tracing::info!(
                path = %spec.path.display(),
                created = existing.is_none(),
                "Wrote certificate file"
            );
            changed = true;
        }

        changed |= apply_ownership(&spec.path, &spec.owner, &spec.group)?;
        changed |= apply_mode(&spec.path, spec.mode)?;
        Ok(changed)
    }

    fn write_atomic(path: &Path, content: &[u8], mode: u32) -> Result<(), TrustStoreError> {
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        let tmp = path.with_file_name(format!(".{file_name}.cacert-tmp"));
        std::fs::write(&tmp, content)?;
        std::fs::set_permissions(&tmp, std::fs::Permissions::from_mode(mode))?;
        std::fs::rename(&tmp, path)?;
        Ok(())
    }

    fn apply_ownership(path: &Path, owner: &str, group: &str) -> Result<bool, TrustStoreError> {
        let uid = User::from_name(owner)
            .map_err(io::Error::from)?
            .ok_or_else(|| TrustStoreError::UnknownPrincipal {
                kind: "user",
                name: owner.to_string(),
            })?
            .uid;
        let gid = Group::from_name(group)
            .map_err(io::Error::from)?
            .ok_or_else(|| TrustStoreError::UnknownPrincipal {
                kind: "group",
                name: group.to_string(),
            })?
            .gid;

        let meta = std::fs::metadata(path)?;
        if meta.uid() == uid.as_raw() && meta.gid() == gid.as_raw() {
            return Ok(false);
        }
        nix::unistd::chown(path, Some(uid), Some(gid)).map_err(io::Error::from)?;
        tracing::info!(path = %path.display(), owner, group, "Corrected ownership");
        Ok(true)
    }

    fn apply_mode(path: &Path, mode: u32) -> Result<bool, TrustStoreError> {
        let current = std::fs::metadata(path)?.permissions().mode() & 0o7777;
        if current == mode {
            return Ok(false);
        }
        std::fs::set_permissions(path, std::fs::Permissions::from_mode(mode))?;
        tracing::info!(
            path = %path.display(),
            from = %mode_string(current),
            to = %mode_string(mode),
            "Corrected mode"
        );
        Ok(true)
    }

    fn purge_unmanaged(
        dir: &Path,
        keep: &BTreeSet<String>,
        recurse: bool,
    ) -> Result<bool, TrustStoreError> {
        let mut changed = false;
        for entry in std::fs::read_dir(dir)? {
            let entry = entry?;
            let name = entry.file_name().to_string_lossy().into_owned();
            if keep.contains(&name) {
                continue;
            }
            let path = entry.path();
            if entry.file_type()?.is_dir() {
                if !recurse {
                    tracing::debug!(path = %path.display(), "Leaving unmanaged subdirectory");
                    continue;
                }
                std::fs::remove_dir_all(&path)?;
            } else {
                std::fs::remove_file(&path)?;
            }
            tracing::info!(path = %path.display(), "Purged unmanaged entry");
            changed = true;
        }
        Ok(changed)
    }
}
