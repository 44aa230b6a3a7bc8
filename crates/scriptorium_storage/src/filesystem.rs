//! Filesystem-backed persistence.

use scriptorium_error::{ScriptoriumResult, StorageError, StorageErrorKind};
use scriptorium_interface::Persistence;
use std::path::{Path, PathBuf};

/// Writes documents to the local filesystem.
///
/// `directory` normally names a directory, created on demand. A path ending
/// in `.txt` is treated as the exact target file instead, with
/// `suggested_name` ignored. Content is normalised to end in exactly one
/// newline and written via a temporary sibling file plus rename so readers
/// never observe a half-written document.
#[derive(Debug, Clone, Copy, Default)]
pub struct FileSystemPersistence;

impl FileSystemPersistence {
    fn resolve_target(suggested_name: &str, directory: &Path) -> ScriptoriumResult<PathBuf> {
        let is_file_target = directory
            .extension()
            .is_some_and(|ext| ext.eq_ignore_ascii_case("txt"));

        if is_file_target {
            return Ok(directory.to_path_buf());
        }

        if suggested_name.is_empty() || suggested_name.contains(['/', '\\']) {
            return Err(StorageError::new(StorageErrorKind::InvalidPath(format!(
                "unusable file name '{}'",
                suggested_name
            )))
            .into());
        }

        Ok(directory.join(suggested_name))
    }

    fn ensure_parent(target: &Path) -> ScriptoriumResult<()> {
        let Some(parent) = target.parent().filter(|p| !p.as_os_str().is_empty()) else {
            return Ok(());
        };
        std::fs::create_dir_all(parent).map_err(|e| {
            StorageError::new(StorageErrorKind::DirectoryCreation(format!(
                "{}: {}",
                parent.display(),
                e
            )))
        })?;
        Ok(())
    }
}

impl Persistence for FileSystemPersistence {
    #[tracing::instrument(skip(self, text), fields(chars = text.len()))]
    fn persist(
        &self,
        text: &str,
        suggested_name: &str,
        directory: &Path,
    ) -> ScriptoriumResult<PathBuf> {
        let target = Self::resolve_target(suggested_name, directory)?;
        Self::ensure_parent(&target)?;

        let mut content = text.trim_end().to_string();
        content.push('\n');

        let staging = target.with_extension("txt.partial");
        std::fs::write(&staging, content.as_bytes()).map_err(|e| {
            StorageError::new(StorageErrorKind::FileWrite(format!(
                "{}: {}",
                staging.display(),
                e
            )))
        })?;
        std::fs::rename(&staging, &target).map_err(|e| {
            let _ = std::fs::remove_file(&staging);
            StorageError::new(StorageErrorKind::FileWrite(format!(
                "{}: {}",
                target.display(),
                e
            )))
        })?;

        tracing::info!(path = %target.display(), "Saved document");
        Ok(target)
    }
}
