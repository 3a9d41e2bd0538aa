//! Crash-safe file replacement.
//!
//! [`fs::atomic_write`] writes to a temp file beside the target, fsyncs it,
//! applies the mode, and renames it into place. Readers see the old file or
//! the new one, never a mix. A timestamped backup of the old contents
//! (`<target>.<unix-seconds>`) can be kept on request.

pub mod config;
pub mod fs;
pub mod render;

pub use fs::{atomic_write, atomic_write_async, FileMode, WriteError, WriteOptions, WriteOutcome};
