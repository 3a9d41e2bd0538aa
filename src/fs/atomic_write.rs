// Atomic file writes: write temp, fsync, chmod, rename.
//
// The temp file always lives next to the target so the rename never crosses
// a filesystem boundary. rename(2) on POSIX and MoveFileEx on Windows both
// replace the target in one step, so readers see the old file or the new one.

use super::backup::create_backup;
use super::error::{WriteError, WriteStep};
use super::mode::{mode_of, permissions_for, FileMode};
use super::parent_dir;
use serde::{Deserialize, Serialize};
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use uuid::Uuid;

/// Prefix shared by every temp file this crate creates.
pub const TEMP_PREFIX: &str = ".atomwrite.";

#[cfg(unix)]
const TEMP_MODE: u32 = 0o600;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct WriteOptions {
    /// Create the missing parent chain instead of failing.
    pub create_parent_dirs: bool,
    pub mode: FileMode,
    /// Copy the existing target to `<target>.<unix-seconds>` first.
    pub backup: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WriteOutcome {
    /// Mode bits applied to the target.
    pub mode: u32,
    pub backup: Option<PathBuf>,
}

/// Atomically replaces `path` with `contents`.
///
/// On any error the target is left exactly as it was and the temp file is
/// removed. A backup made before the failure stays on disk.
pub fn atomic_write(
    path: &Path,
    contents: &[u8],
    options: &WriteOptions,
) -> Result<WriteOutcome, WriteError> {
    ensure_parent(path, options.create_parent_dirs)?;

    let existing = match fs::metadata(path) {
        Ok(meta) if meta.is_dir() => return Err(WriteError::NotAFile(path.to_path_buf())),
        Ok(meta) => Some(mode_of(&meta)),
        Err(e) if e.kind() == io::ErrorKind::NotFound => None,
        Err(e) => return Err(WriteError::io(WriteStep::InspectTarget, path, e)),
    };

    let backup = match existing {
        Some(bits) if options.backup => Some(create_backup(path, bits)?),
        _ => None,
    };

    let mode = options.mode.resolve(existing);
    stage(path, contents, mode)?.commit()?;

    tracing::info!(
        path = %path.display(),
        bytes = contents.len(),
        mode = format_args!("{mode:04o}"),
        "atomic write committed"
    );
    Ok(WriteOutcome { mode, backup })
}

/// Async version for tokio contexts. Delegates to the blocking pool since
/// fsync and rename must happen synchronously.
pub async fn atomic_write_async(
    path: PathBuf,
    contents: Vec<u8>,
    options: WriteOptions,
) -> Result<WriteOutcome, WriteError> {
    tokio::task::spawn_blocking(move || atomic_write(&path, &contents, &options)).await?
}

fn ensure_parent(path: &Path, create: bool) -> Result<(), WriteError> {
    let parent = parent_dir(path);
    match fs::metadata(parent) {
        Ok(_) => return Ok(()),
        Err(e) if e.kind() == io::ErrorKind::NotFound => {}
        Err(e) => return Err(WriteError::io(WriteStep::InspectTarget, parent, e)),
    }

    if !create {
        return Err(WriteError::MissingParentDir(parent.to_path_buf()));
    }

    tracing::debug!(dir = %parent.display(), "creating parent directories");
    create_dir_chain(parent).map_err(|e| WriteError::io(WriteStep::CreateParentDirs, path, e))
}

#[cfg(unix)]
fn create_dir_chain(dir: &Path) -> io::Result<()> {
    use std::os::unix::fs::DirBuilderExt;
    fs::DirBuilder::new()
        .recursive(true)
        .mode(super::mode::DEFAULT_DIR_MODE)
        .create(dir)
}

#[cfg(not(unix))]
fn create_dir_chain(dir: &Path) -> io::Result<()> {
    fs::create_dir_all(dir)
}

/// A fully written and synced temp file waiting to replace its target.
///
/// Dropping it without calling [`StagedFile::commit`] removes the temp file
/// and leaves the target alone.
#[derive(Debug)]
pub struct StagedFile {
    file: Option<fs::File>,
    temp_path: PathBuf,
    target: PathBuf,
    committed: bool,
}

/// Writes `contents` to a fresh temp file beside `path` and applies `mode_bits`.
/// The parent directory must already exist.
pub fn stage(path: &Path, contents: &[u8], mode_bits: u32) -> Result<StagedFile, WriteError> {
    if path.file_name().is_none() {
        return Err(WriteError::NotAFile(path.to_path_buf()));
    }

    let (file, temp_path) = create_temp(parent_dir(path))?;

    // From here on an early return drops `staged`, which removes the temp file.
    let mut staged = StagedFile {
        file: Some(file),
        temp_path,
        target: path.to_path_buf(),
        committed: false,
    };
    staged.fill(contents, mode_bits)?;

    tracing::debug!(
        temp = %staged.temp_path.display(),
        target_path = %staged.target.display(),
        "staged temp file"
    );
    Ok(staged)
}

/// Fixed-length name so long target names still leave room for it.
fn temp_name() -> String {
    format!("{TEMP_PREFIX}{}.tmp", Uuid::new_v4().as_simple())
}

// Owner-only until the payload is synced and the final mode is applied.
fn create_temp(dir: &Path) -> Result<(fs::File, PathBuf), WriteError> {
    let temp_path = dir.join(temp_name());
    let mut open = fs::OpenOptions::new();
    open.write(true).create_new(true);
    #[cfg(unix)]
    {
        use std::os::unix::fs::OpenOptionsExt;
        open.mode(TEMP_MODE);
    }
    let file = open
        .open(&temp_path)
        .map_err(|e| WriteError::io(WriteStep::CreateTemp, &temp_path, e))?;
    Ok((file, temp_path))
}

impl StagedFile {
    pub fn temp_path(&self) -> &Path {
        &self.temp_path
    }

    pub fn target(&self) -> &Path {
        &self.target
    }

    fn fill(&mut self, contents: &[u8], mode_bits: u32) -> Result<(), WriteError> {
        let temp_path = &self.temp_path;
        let Some(file) = self.file.as_mut() else {
            return Ok(());
        };

        file.write_all(contents)
            .map_err(|e| WriteError::io(WriteStep::WriteTemp, temp_path, e))?;
        file.sync_all()
            .map_err(|e| WriteError::io(WriteStep::SyncTemp, temp_path, e))?;

        let current = file
            .metadata()
            .map_err(|e| WriteError::io(WriteStep::SetPermissions, temp_path, e))?
            .permissions();
        file.set_permissions(permissions_for(current, mode_bits))
            .map_err(|e| WriteError::io(WriteStep::SetPermissions, temp_path, e))
    }

    /// Renames the temp file onto the target.
    pub fn commit(mut self) -> Result<(), WriteError> {
        // Windows refuses to rename a file with an open handle
        drop(self.file.take());

        fs::rename(&self.temp_path, &self.target)
            .map_err(|e| WriteError::io(WriteStep::Rename, &self.target, e))?;
        self.committed = true;

        sync_dir(parent_dir(&self.target));
        Ok(())
    }
}

impl Drop for StagedFile {
    fn drop(&mut self) {
        drop(self.file.take());
        if self.committed {
            return;
        }
        if let Err(e) = fs::remove_file(&self.temp_path) {
            if e.kind() != io::ErrorKind::NotFound {
                tracing::warn!(
                    temp = %self.temp_path.display(),
                    error = %e,
                    "failed to remove temp file"
                );
            }
        }
    }
}

// Persist the directory entry so the rename survives power loss.
#[cfg(unix)]
fn sync_dir(dir: &Path) {
    if let Err(e) = fs::File::open(dir).and_then(|d| d.sync_all()) {
        tracing::debug!(dir = %dir.display(), error = %e, "directory fsync failed");
    }
}

#[cfg(not(unix))]
fn sync_dir(_dir: &Path) {}
