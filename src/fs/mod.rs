pub mod atomic_write;
pub mod backup;
pub mod error;
pub mod mode;

pub use atomic_write::{
    atomic_write, atomic_write_async, stage, StagedFile, WriteOptions, WriteOutcome,
};
pub use backup::{backup_path, backup_timestamp, list_backups};
pub use error::{WriteError, WriteStep};
pub use mode::{FileMode, DEFAULT_FILE_MODE};

use std::path::Path;

/// Directory that holds `path`. A bare file name lives in `.`.
pub(crate) fn parent_dir(path: &Path) -> &Path {
    match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    }
}
