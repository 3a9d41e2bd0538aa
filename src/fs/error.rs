use std::fmt;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// What the writer was doing when the OS said no.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteStep {
    CreateParentDirs,
    InspectTarget,
    CopyBackup,
    SetBackupPermissions,
    CreateTemp,
    WriteTemp,
    SyncTemp,
    SetPermissions,
    Rename,
    ReadExisting,
    WriteDryRun,
}

impl fmt::Display for WriteStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::CreateParentDirs => "create parent directories for",
            Self::InspectTarget => "inspect",
            Self::CopyBackup => "back up",
            Self::SetBackupPermissions => "set permissions on backup",
            Self::CreateTemp => "create temp file",
            Self::WriteTemp => "write temp file",
            Self::SyncTemp => "fsync temp file",
            Self::SetPermissions => "set permissions on temp file",
            Self::Rename => "rename temp file onto",
            Self::ReadExisting => "read existing",
            Self::WriteDryRun => "write dry-run output for",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Error)]
pub enum WriteError {
    /// Parent directory is missing and creating it was not requested.
    #[error("no parent directory for {}", .0.display())]
    MissingParentDir(PathBuf),

    #[error("cannot write {}: target is a directory", .0.display())]
    NotAFile(PathBuf),

    #[error("failed to {step} {}", .path.display())]
    Io {
        step: WriteStep,
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("atomic write task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

impl WriteError {
    pub(crate) fn io(step: WriteStep, path: &Path, source: io::Error) -> Self {
        Self::Io {
            step,
            path: path.to_path_buf(),
            source,
        }
    }

    pub fn is_missing_parent_dir(&self) -> bool {
        matches!(self, Self::MissingParentDir(_))
    }

    pub fn step(&self) -> Option<WriteStep> {
        match self {
            Self::Io { step, .. } => Some(*step),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn io_error_names_step_and_path() {
        let err = WriteError::io(
            WriteStep::Rename,
            Path::new("/etc/app.conf"),
            io::Error::from(io::ErrorKind::PermissionDenied),
        );
        assert_eq!(err.to_string(), "failed to rename temp file onto /etc/app.conf");
        assert_eq!(err.step(), Some(WriteStep::Rename));
        assert!(std::error::Error::source(&err).is_some());
    }

    #[test]
    fn missing_parent_is_distinguishable() {
        let err = WriteError::MissingParentDir(PathBuf::from("/nope"));
        assert!(err.is_missing_parent_dir());
        assert_eq!(err.step(), None);

        let other = WriteError::NotAFile(PathBuf::from("/tmp"));
        assert!(!other.is_missing_parent_dir());
    }
}
