// Write-if-changed on top of the atomic writer.
//
// Identical contents are never rewritten, so mtimes stay put and watchers
// don't fire. Dry runs print what would land on disk instead of writing it.

use crate::fs::{atomic_write, WriteError, WriteOptions, WriteStep};
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

#[derive(Debug, Clone)]
pub struct RenderInput<'a> {
    pub path: &'a Path,
    pub contents: &'a [u8],
    pub options: WriteOptions,
    pub dry: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RenderResult {
    /// The contents were rendered: replaced on disk, or printed on a dry run.
    pub did_render: bool,
    /// The target holds, or would hold, the requested contents.
    pub would_render: bool,
    pub backup: Option<PathBuf>,
}

pub fn render(input: &RenderInput<'_>, dry_stream: &mut dyn Write) -> Result<RenderResult, WriteError> {
    if matches_existing(input.path, input.contents)? {
        tracing::debug!(path = %input.path.display(), "contents unchanged, skipping write");
        return Ok(RenderResult {
            did_render: false,
            would_render: true,
            backup: None,
        });
    }

    if input.dry {
        write_dry(input, dry_stream)
            .map_err(|e| WriteError::io(WriteStep::WriteDryRun, input.path, e))?;
        return Ok(RenderResult {
            did_render: true,
            would_render: true,
            backup: None,
        });
    }

    let outcome = atomic_write(input.path, input.contents, &input.options)?;
    Ok(RenderResult {
        did_render: true,
        would_render: true,
        backup: outcome.backup,
    })
}

fn matches_existing(path: &Path, contents: &[u8]) -> Result<bool, WriteError> {
    match fs::metadata(path) {
        // cheap reject before reading the whole file
        Ok(meta) if !meta.is_file() || meta.len() != contents.len() as u64 => return Ok(false),
        Ok(_) => {}
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(false),
        Err(e) => return Err(WriteError::io(WriteStep::ReadExisting, path, e)),
    }
    let existing = fs::read(path).map_err(|e| WriteError::io(WriteStep::ReadExisting, path, e))?;
    Ok(existing == contents)
}

fn write_dry(input: &RenderInput<'_>, out: &mut dyn Write) -> io::Result<()> {
    writeln!(out, "> {}", input.path.display())?;
    out.write_all(input.contents)?;
    out.flush()
}
