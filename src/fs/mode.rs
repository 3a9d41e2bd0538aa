// Permission bits for the written file.
//
// `Preserve` keeps whatever mode the existing target has, falling back to
// DEFAULT_FILE_MODE for new files. A numeric 0 means the same thing.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

/// Mode applied to files that did not exist before the write.
pub const DEFAULT_FILE_MODE: u32 = 0o644;

/// Mode for parent directories created on the caller's behalf.
pub const DEFAULT_DIR_MODE: u32 = 0o755;

const MAX_MODE: u32 = 0o7777;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FileMode {
    #[default]
    Preserve,
    Exact(u32),
}

impl FileMode {
    /// Resolve against the mode of the existing target, if any.
    pub fn resolve(self, existing: Option<u32>) -> u32 {
        match self {
            Self::Exact(bits) => bits,
            Self::Preserve => existing.unwrap_or(DEFAULT_FILE_MODE),
        }
    }
}

impl From<u32> for FileMode {
    fn from(bits: u32) -> Self {
        if bits == 0 {
            Self::Preserve
        } else {
            Self::Exact(bits)
        }
    }
}

impl fmt::Display for FileMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Preserve => write!(f, "preserve"),
            Self::Exact(bits) => write!(f, "{bits:04o}"),
        }
    }
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ParseModeError {
    #[error("invalid octal mode '{0}'")]
    NotOctal(String),
    #[error("mode {0:o} exceeds 7777")]
    OutOfRange(u32),
}

impl FromStr for FileMode {
    type Err = ParseModeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        if trimmed.eq_ignore_ascii_case("preserve") {
            return Ok(Self::Preserve);
        }
        let digits = trimmed.strip_prefix("0o").unwrap_or(trimmed);
        if digits.is_empty() {
            return Err(ParseModeError::NotOctal(s.to_string()));
        }
        let bits =
            u32::from_str_radix(digits, 8).map_err(|_| ParseModeError::NotOctal(s.to_string()))?;
        if bits > MAX_MODE {
            return Err(ParseModeError::OutOfRange(bits));
        }
        Ok(Self::from(bits))
    }
}

impl Serialize for FileMode {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for FileMode {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

/// Permission bits of existing file metadata.
#[cfg(unix)]
pub fn mode_of(meta: &std::fs::Metadata) -> u32 {
    use std::os::unix::fs::PermissionsExt;
    meta.permissions().mode() & MAX_MODE
}

// Only the read-only bit exists off Unix; report it in Unix terms.
#[cfg(not(unix))]
pub fn mode_of(meta: &std::fs::Metadata) -> u32 {
    if meta.permissions().readonly() {
        0o444
    } else {
        DEFAULT_FILE_MODE
    }
}

#[cfg(unix)]
pub(crate) fn permissions_for(_current: std::fs::Permissions, bits: u32) -> std::fs::Permissions {
    use std::os::unix::fs::PermissionsExt;
    std::fs::Permissions::from_mode(bits & MAX_MODE)
}

#[cfg(not(unix))]
pub(crate) fn permissions_for(mut current: std::fs::Permissions, bits: u32) -> std::fs::Permissions {
    current.set_readonly(bits & 0o222 == 0);
    current
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_is_preserve() {
        assert_eq!(FileMode::from(0), FileMode::Preserve);
        assert_eq!(FileMode::from(0o600), FileMode::Exact(0o600));
    }

    #[test]
    fn preserve_uses_existing_mode() {
        assert_eq!(FileMode::Preserve.resolve(Some(0o600)), 0o600);
    }

    #[test]
    fn preserve_without_existing_uses_default() {
        assert_eq!(FileMode::Preserve.resolve(None), DEFAULT_FILE_MODE);
    }

    #[test]
    fn exact_ignores_existing_mode() {
        assert_eq!(FileMode::Exact(0o640).resolve(Some(0o600)), 0o640);
        assert_eq!(FileMode::Exact(0o640).resolve(None), 0o640);
    }

    #[test]
    fn parses_octal_forms() {
        assert_eq!("0644".parse(), Ok(FileMode::Exact(0o644)));
        assert_eq!("0o600".parse(), Ok(FileMode::Exact(0o600)));
        assert_eq!("600".parse(), Ok(FileMode::Exact(0o600)));
        assert_eq!("Preserve".parse(), Ok(FileMode::Preserve));
        assert_eq!("0".parse(), Ok(FileMode::Preserve));
    }

    #[test]
    fn rejects_garbage() {
        assert!("rw-r--r--".parse::<FileMode>().is_err());
        assert!("0899".parse::<FileMode>().is_err());
        assert!("".parse::<FileMode>().is_err());
        assert_eq!(
            "17777".parse::<FileMode>(),
            Err(ParseModeError::OutOfRange(0o17777))
        );
    }

    #[test]
    fn display_is_zero_padded_octal() {
        assert_eq!(FileMode::Exact(0o600).to_string(), "0600");
        assert_eq!(FileMode::Preserve.to_string(), "preserve");
    }
}
