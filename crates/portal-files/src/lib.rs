//! Portal Files: stores uploaded documents and images under a root
//! directory and hands back opaque locators of the form
//! `<category>/<uuid>.<ext>`.

pub mod error;
pub mod store;
pub mod traits;

pub use error::FileError;
pub use store::{FileStore, FileStoreConfig};
pub use traits::{FileCategory, FileIntake, StoredFile};
