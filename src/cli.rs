use anyhow::{Context, Result};
use atomwrite::fs::{FileMode, WriteOptions};
use clap::{ArgAction, Parser};
use std::path::PathBuf;

/// Atomically replace a file with stdin (or --from), optionally backing up the old one.
#[derive(Parser, Debug)]
#[command(name = "atomwrite")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Target file. `~` and `$VARS` are expanded
    pub path: String,

    /// Read new contents from this file instead of stdin
    #[arg(long)]
    pub from: Option<PathBuf>,

    /// Create missing parent directories
    #[arg(short, long)]
    pub parents: bool,

    /// Octal mode for the file, or "preserve" to keep the existing one
    #[arg(short, long)]
    pub mode: Option<FileMode>,

    /// Keep the old contents as <path>.<unix-seconds>
    #[arg(short, long)]
    pub backup: bool,

    /// Print what would be written instead of writing it
    #[arg(short = 'n', long)]
    pub dry_run: bool,

    /// Config file (default: platform config dir)
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// More logging (-v info, -vv debug)
    #[arg(short, long, action = ArgAction::Count)]
    pub verbose: u8,
}

impl Cli {
    /// Flags win over config. Boolean flags can only switch behaviour on.
    pub fn write_options(&self, defaults: WriteOptions) -> WriteOptions {
        WriteOptions {
            create_parent_dirs: defaults.create_parent_dirs || self.parents,
            mode: self.mode.unwrap_or(defaults.mode),
            backup: defaults.backup || self.backup,
        }
    }

    pub fn target(&self) -> Result<PathBuf> {
        let expanded = shellexpand::full(&self.path)
            .with_context(|| format!("Failed to expand path: {}", self.path))?;
        Ok(PathBuf::from(expanded.as_ref()))
    }
}
