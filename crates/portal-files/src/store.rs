use std::fs::{self, OpenOptions};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

use tracing::info;
use uuid::Uuid;

use crate::error::FileError;
use crate::traits::{FileCategory, FileIntake, StoredFile, content_type_for};

/// Where uploads live and how large they may be.
#[derive(Debug, Clone)]
pub struct FileStoreConfig {
    pub root: PathBuf,
    pub max_upload_bytes: u64,
}

impl Default for FileStoreConfig {
    fn default() -> Self {
        Self {
            root: PathBuf::from("uploads"),
            max_upload_bytes: 10 * 1024 * 1024,
        }
    }
}

/// FileStore is a [`FileIntake`] backed by the local filesystem.
///
/// Locators map to paths under the root directory:
///   `resume/<uuid>.pdf` → `{root}/resume/<uuid>.pdf`
pub struct FileStore {
    root: PathBuf,
    max_upload_bytes: u64,
}

impl FileStore {
    /// Open a store, creating the root and one directory per category.
    pub fn open(config: &FileStoreConfig) -> Result<Self, FileError> {
        for category in FileCategory::ALL {
            fs::create_dir_all(config.root.join(category.as_str()))
                .map_err(|e| FileError::Io(e.to_string()))?;
        }
        Ok(Self {
            root: config.root.clone(),
            max_upload_bytes: config.max_upload_bytes,
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Split a locator into its category, file name and extension.
    ///
    /// Only names this store could have generated pass: a UUID stem, an
    /// extension allowed for the category, no separators.
    fn parse_locator(locator: &str) -> Result<(FileCategory, &str, String), FileError> {
        let reject = || FileError::Rejected(format!("invalid locator: {locator:?}"));

        let (category, name) = locator.split_once('/').ok_or_else(reject)?;
        let category: FileCategory = category.parse()?;
        if name.contains(['/', '\\']) || name.contains("..") {
            return Err(reject());
        }
        let (stem, extension) = name.rsplit_once('.').ok_or_else(reject)?;
        if Uuid::parse_str(stem).is_err() || !category.accepts(extension) {
            return Err(reject());
        }
        Ok((category, name, extension.to_string()))
    }
}

/// Lower-cased extension of an uploaded file name.
fn extension_of(original_name: &str) -> Option<String> {
    let base = original_name.rsplit(['/', '\\']).next().unwrap_or_default();
    let (stem, ext) = base.rsplit_once('.')?;
    if stem.is_empty() || ext.is_empty() {
        return None;
    }
    Some(ext.to_ascii_lowercase())
}

impl FileIntake for FileStore {
    fn store(
        &self,
        category: FileCategory,
        original_name: &str,
        data: &[u8],
    ) -> Result<String, FileError> {
        if data.is_empty() {
            return Err(FileError::Rejected("file is empty".into()));
        }
        let size = data.len() as u64;
        if size > self.max_upload_bytes {
            return Err(FileError::TooLarge {
                size,
                max: self.max_upload_bytes,
            });
        }
        let extension = extension_of(original_name).ok_or_else(|| {
            FileError::Rejected(format!("file name {original_name:?} has no extension"))
        })?;
        if !category.accepts(&extension) {
            return Err(FileError::Rejected(format!(
                ".{extension} is not accepted for {category}; allowed: {}",
                category.allowed_extensions().join(", ")
            )));
        }

        let name = format!("{}.{extension}", Uuid::new_v4());
        let path = self.root.join(category.as_str()).join(&name);

        let mut file = OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&path)
            .map_err(|e| match e.kind() {
                ErrorKind::AlreadyExists => {
                    FileError::Io(format!("refusing to overwrite {}", path.display()))
                }
                _ => FileError::Io(e.to_string()),
            })?;
        file.write_all(data)
            .and_then(|()| file.sync_all())
            .map_err(|e| FileError::Io(e.to_string()))?;

        let locator = format!("{category}/{name}");
        info!(locator = %locator, bytes = size, "Stored upload");
        Ok(locator)
    }

    fn read(&self, locator: &str) -> Result<StoredFile, FileError> {
        let (category, name, extension) = Self::parse_locator(locator)?;
        let path = self.root.join(category.as_str()).join(name);

        let data = match fs::read(&path) {
            Ok(data) => data,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                return Err(FileError::NotFound(locator.to_string()));
            }
            Err(e) => return Err(FileError::Io(e.to_string())),
        };

        Ok(StoredFile {
            locator: locator.to_string(),
            content_type: content_type_for(&extension),
            data,
        })
    }
}
