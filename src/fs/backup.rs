// Timestamped backups: `<target>.<unix-seconds>` next to the target.
//
// One backup per write. Retention belongs to whoever owns the directory.

use super::error::{WriteError, WriteStep};
use super::mode::permissions_for;
use chrono::Utc;
use std::ffi::OsString;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

/// Backup path for `target` taken at `unix_secs`.
pub fn backup_path(target: &Path, unix_secs: i64) -> PathBuf {
    let mut name: OsString = target.as_os_str().to_owned();
    name.push(format!(".{unix_secs}"));
    PathBuf::from(name)
}

/// Returns the timestamp if `candidate` is `<target_name>.<digits>`.
pub fn backup_timestamp(target_name: &str, candidate: &str) -> Option<i64> {
    let digits = candidate.strip_prefix(target_name)?.strip_prefix('.')?;
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    digits.parse().ok()
}

/// Backups of `target` in its directory, oldest first.
pub fn list_backups(target: &Path) -> io::Result<Vec<PathBuf>> {
    let Some(target_name) = target.file_name().and_then(|n| n.to_str()) else {
        return Ok(Vec::new());
    };
    let dir = super::parent_dir(target);

    let mut found: Vec<(i64, PathBuf)> = Vec::new();
    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        if !entry.file_type()?.is_file() {
            continue;
        }
        let name = entry.file_name();
        let Some(name) = name.to_str() else { continue };
        if let Some(ts) = backup_timestamp(target_name, name) {
            found.push((ts, entry.path()));
        }
    }
    found.sort_by(|a, b| a.0.cmp(&b.0).then_with(|| a.1.cmp(&b.1)));
    Ok(found.into_iter().map(|(_, path)| path).collect())
}

/// Copy `target` to its timestamped backup path and give the copy `mode_bits`.
///
/// An existing file at the backup path is never replaced: the call fails with
/// `AlreadyExists` under [`WriteStep::CopyBackup`]. Only a backup this call
/// created is removed when a later step fails.
pub fn create_backup(target: &Path, mode_bits: u32) -> Result<PathBuf, WriteError> {
    let backup = backup_path(target, Utc::now().timestamp());

    let mut source =
        fs::File::open(target).map_err(|e| WriteError::io(WriteStep::CopyBackup, target, e))?;

    let mut open = fs::OpenOptions::new();
    open.write(true).create_new(true);
    #[cfg(unix)]
    {
        use std::os::unix::fs::OpenOptionsExt;
        open.mode(0o600);
    }
    let mut copy = open
        .open(&backup)
        .map_err(|e| WriteError::io(WriteStep::CopyBackup, &backup, e))?;

    let result = (|| -> Result<(), WriteError> {
        io::copy(&mut source, &mut copy)
            .map_err(|e| WriteError::io(WriteStep::CopyBackup, &backup, e))?;
        copy.sync_all()
            .map_err(|e| WriteError::io(WriteStep::CopyBackup, &backup, e))?;
        let current = copy
            .metadata()
            .map_err(|e| WriteError::io(WriteStep::SetBackupPermissions, &backup, e))?
            .permissions();
        copy.set_permissions(permissions_for(current, mode_bits))
            .map_err(|e| WriteError::io(WriteStep::SetBackupPermissions, &backup, e))
    })();
    drop(copy);

    if let Err(e) = result {
        if let Err(cleanup) = fs::remove_file(&backup) {
            tracing::warn!(
                path = %backup.display(),
                error = %cleanup,
                "failed to remove partial backup"
            );
        }
        return Err(e);
    }

    tracing::info!(
        target_path = %target.display(),
        backup = %backup.display(),
        "backed up existing file"
    );
    Ok(backup)
}
