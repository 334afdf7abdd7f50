//! Course material files. Metadata lives in the database; the files
//! themselves are copied into a `Materials` folder under the application base
//! directory and referenced by a relative path. The two are not updated
//! atomically: deleting drops the row first and then tries to remove the file.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::{info, warn};
use uuid::Uuid;

use crate::db::PortalStore;
use crate::models::{CourseMaterial, MaterialInput};

/// Folder under the base directory that receives attached files.
pub const MATERIALS_DIR: &str = "Materials";

#[derive(Debug, Error)]
pub enum MaterialError {
    #[error("Choose a file to attach.")]
    SourceMissing,
    #[error("Stored file not found on disk.")]
    StoredFileMissing(PathBuf),
    #[error("{action} {}: {source}", .path.display())]
    Io {
        action: &'static str,
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// A file copied into the materials folder, not yet recorded in the database.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredFile {
    /// Name the user picked.
    pub file_name: String,
    /// `Materials/<token>_<file name>`, relative to the base directory.
    pub relative_path: String,
}

/// Resolves and manages stored material files under a base directory.
#[derive(Debug, Clone)]
pub struct MaterialLibrary {
    base_dir: PathBuf,
}

impl MaterialLibrary {
    pub fn new(base_dir: impl Into<PathBuf>) -> Self {
        Self {
            base_dir: base_dir.into(),
        }
    }

    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    pub fn materials_dir(&self) -> PathBuf {
        self.base_dir.join(MATERIALS_DIR)
    }

    /// Copy `source` into the materials folder under a name prefixed with a
    /// random token so two uploads of `notes.pdf` never collide.
    pub fn import(&self, source: &Path) -> Result<StoredFile, MaterialError> {
        if !source.is_file() {
            return Err(MaterialError::SourceMissing);
        }
        let file_name = source
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .ok_or(MaterialError::SourceMissing)?;

        let dir = self.materials_dir();
        fs::create_dir_all(&dir).map_err(|source| MaterialError::Io {
            action: "failed to create",
            path: dir.clone(),
            source,
        })?;

        let stored_name = stored_file_name(&file_name);
        let destination = dir.join(&stored_name);
        fs::copy(source, &destination).map_err(|err| MaterialError::Io {
            action: "failed to copy into",
            path: destination.clone(),
            source: err,
        })?;

        Ok(StoredFile {
            file_name,
            relative_path: format!("{MATERIALS_DIR}/{stored_name}"),
        })
    }

    /// Absolute location of a stored path. Absolute paths are kept as-is.
    pub fn resolve(&self, stored_path: &str) -> PathBuf {
        let path = Path::new(stored_path);
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.base_dir.join(path)
        }
    }

    /// Remove a stored file. A file that is already gone is not an error;
    /// returns whether something was deleted.
    pub fn remove(&self, stored_path: &str) -> Result<bool, MaterialError> {
        if stored_path.trim().is_empty() {
            return Ok(false);
        }
        let path = self.resolve(stored_path);
        match fs::remove_file(&path) {
            Ok(()) => Ok(true),
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(false),
            Err(source) => Err(MaterialError::Io {
                action: "failed to remove",
                path,
                source,
            }),
        }
    }

    /// Hand a stored file to the operating system's default application.
    pub fn open(&self, stored_path: &str) -> Result<PathBuf, MaterialError> {
        let path = self.resolve(stored_path);
        if !path.is_file() {
            return Err(MaterialError::StoredFileMissing(path));
        }
        open::that(&path).map_err(|source| MaterialError::Io {
            action: "failed to open",
            path: path.clone(),
            source,
        })?;
        Ok(path)
    }
}

/// `<32 hex chars>_<original name>`.
pub fn stored_file_name(original: &str) -> String {
    format!("{}_{}", Uuid::new_v4().simple(), original)
}

/// Copy a file into the library and record it against `course_id`. If the
/// insert fails the copied file is removed again.
pub fn attach_material(
    store: &dyn PortalStore,
    library: &MaterialLibrary,
    course_id: i64,
    source: &Path,
) -> anyhow::Result<i64> {
    let stored = library.import(source)?;
    let input = MaterialInput {
        course_id,
        file_name: stored.file_name.clone(),
        file_path: stored.relative_path.clone(),
    };

    match store.create_material(&input) {
        Ok(id) => {
            info!(id, course_id, path = %stored.relative_path, "material attached");
            Ok(id)
        }
        Err(err) => {
            if let Err(cleanup) = library.remove(&stored.relative_path) {
                warn!(error = %cleanup, "failed to clean up copied material");
            }
            Err(err.context("failed to record material"))
        }
    }
}

/// Delete the metadata row, then the backing file if it is still there.
pub fn delete_material(
    store: &dyn PortalStore,
    library: &MaterialLibrary,
    material: &CourseMaterial,
) -> anyhow::Result<()> {
    store.delete_material(material.id)?;
    match library.remove(&material.file_path) {
        Ok(true) => info!(id = material.id, "material file removed"),
        Ok(false) => info!(id = material.id, "material file already gone"),
        Err(err) => warn!(id = material.id, error = %err, "failed to remove material file"),
    }
    Ok(())
}

/// Open the stored file of a material, returning the resolved location.
pub fn open_material(
    library: &MaterialLibrary,
    material: &CourseMaterial,
) -> Result<PathBuf, MaterialError> {
    let path = library.open(&material.file_path)?;
    info!(id = material.id, path = %path.display(), "material opened");
    Ok(path)
}
