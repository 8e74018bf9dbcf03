//! Configuration types for stratadb.
//!
//! The [`Config`] struct controls process-level behavior:
//! - Whether the snapshot persistence layer is enabled
//! - Where snapshot files are written
//! - How often autosave fires (writes between saves)
//!
//! Per-library index settings (kind, metric, nlist, nprobe) are not part
//! of this struct; they live on each [`Library`](crate::Library).
//!
//! # Example
//! ```rust
//! use stratadb::Config;
//!
//! // In-memory only (the default): no snapshots, no autosave
//! let config = Config::default();
//!
//! // Persistent, autosaving every 100 writes
//! let config = Config {
//!     persistence: true,
//!     snapshot_dir: "./data".into(),
//!     autosave_threshold: 100,
//! };
//! ```

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::error::{Result, StrataError};

/// Sentinel value that disables autosave.
pub const AUTOSAVE_DISABLED: i64 = -1;

/// Database configuration options.
///
/// All fields have sensible defaults. Use struct update syntax to override
/// specific settings:
///
/// ```rust
/// use stratadb::Config;
///
/// let config = Config {
///     persistence: true,
///     ..Default::default()
/// };
/// ```
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Config {
    /// Gates the snapshot layer.
    ///
    /// When `false` (the default), `save_snapshot`, `restore_snapshot`,
    /// and autosave all report [`Unavailable`](crate::StrataError::Unavailable).
    pub persistence: bool,

    /// Directory for snapshot files.
    ///
    /// The atomic-write temp file is created in the same directory so the
    /// final rename never crosses a filesystem boundary.
    /// Default: `./data`
    pub snapshot_dir: PathBuf,

    /// Number of mutating operations between automatic snapshots.
    ///
    /// [`AUTOSAVE_DISABLED`] (`-1`, the default) turns autosave off.
    /// Autosave fires inside the store lock so the snapshot always
    /// observes a consistent state.
    pub autosave_threshold: i64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            persistence: false,
            snapshot_dir: PathBuf::from("./data"),
            autosave_threshold: AUTOSAVE_DISABLED,
        }
    }
}

impl Config {
    /// Creates a new Config with default settings.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a Config with persistence enabled in the given directory.
    ///
    /// Autosave stays disabled; call sites that want it set
    /// `autosave_threshold` explicitly.
    ///
    /// # Example
    /// ```rust
    /// use stratadb::Config;
    ///
    /// let config = Config::persistent("./data");
    /// assert!(config.persistence);
    /// ```
    pub fn persistent(snapshot_dir: impl Into<PathBuf>) -> Self {
        Self {
            persistence: true,
            snapshot_dir: snapshot_dir.into(),
            ..Default::default()
        }
    }

    /// Validates the configuration.
    ///
    /// Called automatically by [`StrataDB::open()`](crate::StrataDB::open).
    ///
    /// # Errors
    /// Returns [`InvalidArgument`](StrataError::InvalidArgument) if
    /// `autosave_threshold` is neither `-1` nor a positive integer.
    pub fn validate(&self) -> Result<()> {
        if self.autosave_threshold != AUTOSAVE_DISABLED && self.autosave_threshold <= 0 {
            return Err(StrataError::invalid_argument(format!(
                "autosave_threshold must be -1 (disabled) or a positive integer, got {}",
                self.autosave_threshold
            )));
        }
        Ok(())
    }

    /// Returns true when autosave is enabled.
    ///
    /// Autosave requires both persistence and a positive threshold.
    #[inline]
    pub fn autosave_enabled(&self) -> bool {
        self.persistence && self.autosave_threshold > 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert!(!config.persistence);
        assert_eq!(config.snapshot_dir, PathBuf::from("./data"));
        assert_eq!(config.autosave_threshold, AUTOSAVE_DISABLED);
        assert!(!config.autosave_enabled());
    }

    #[test]
    fn test_persistent_constructor() {
        let config = Config::persistent("/tmp/snapshots");
        assert!(config.persistence);
        assert_eq!(config.snapshot_dir, PathBuf::from("/tmp/snapshots"));
        assert_eq!(config.autosave_threshold, AUTOSAVE_DISABLED);
    }

    #[test]
    fn test_validate_success() {
        assert!(Config::default().validate().is_ok());
        let config = Config {
            autosave_threshold: 50,
            ..Default::default()
        };
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_zero_threshold() {
        let config = Config {
            autosave_threshold: 0,
            ..Default::default()
        };
        assert!(config.validate().unwrap_err().is_invalid_argument());
    }

    #[test]
    fn test_validate_negative_threshold_other_than_sentinel() {
        let config = Config {
            autosave_threshold: -7,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_autosave_requires_persistence() {
        let config = Config {
            persistence: false,
            autosave_threshold: 10,
            ..Default::default()
        };
        assert!(!config.autosave_enabled());

        let config = Config {
            persistence: true,
            autosave_threshold: 10,
            ..Default::default()
        };
        assert!(config.autosave_enabled());
    }
}
