use std::fmt;
use std::str::FromStr;

use crate::error::FileError;

/// What an uploaded file is for. Each category has its own directory and
/// its own list of accepted extensions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FileCategory {
    Resume,
    Photo,
    JobDescription,
}

impl FileCategory {
    pub const ALL: [FileCategory; 3] = [
        FileCategory::Resume,
        FileCategory::Photo,
        FileCategory::JobDescription,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            FileCategory::Resume => "resume",
            FileCategory::Photo => "photo",
            FileCategory::JobDescription => "job_description",
        }
    }

    /// Lower-case extensions accepted for this category.
    pub fn allowed_extensions(&self) -> &'static [&'static str] {
        match self {
            FileCategory::Resume => &["pdf", "doc", "docx"],
            FileCategory::Photo => &["jpg", "jpeg", "png", "webp"],
            FileCategory::JobDescription => &["pdf", "doc", "docx", "txt", "md"],
        }
    }

    pub fn accepts(&self, extension: &str) -> bool {
        self.allowed_extensions().contains(&extension)
    }
}

impl fmt::Display for FileCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FileCategory {
    type Err = FileError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        FileCategory::ALL
            .into_iter()
            .find(|c| c.as_str() == s)
            .ok_or_else(|| FileError::Rejected(format!("unknown file category: {s:?}")))
    }
}

/// A file read back from storage.
#[derive(Debug, Clone)]
pub struct StoredFile {
    pub locator: String,
    pub content_type: &'static str,
    pub data: Vec<u8>,
}

/// Accepts uploads and serves them back by locator.
///
/// Locators are opaque to callers. A stored file is never overwritten;
/// every `store` yields a fresh locator.
pub trait FileIntake: Send + Sync {
    /// Validate and persist `data`. `original_name` only contributes its
    /// extension.
    fn store(
        &self,
        category: FileCategory,
        original_name: &str,
        data: &[u8],
    ) -> Result<String, FileError>;

    /// Retrieve a previously stored file.
    fn read(&self, locator: &str) -> Result<StoredFile, FileError>;
}

/// MIME type served for a stored extension.
pub fn content_type_for(extension: &str) -> &'static str {
    match extension {
        "pdf" => "application/pdf",
        "doc" => "application/msword",
        "docx" => "application/vnd.openxmlformats-officedocument.wordprocessingml.document",
        "jpg" | "jpeg" => "image/jpeg",
        "png" => "image/png",
        "webp" => "image/webp",
        "txt" => "text/plain; charset=utf-8",
        "md" => "text/markdown; charset=utf-8",
        _ => "application/octet-stream",
    }
}
