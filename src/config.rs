//! Session configuration.
//!
//! Environment variables:
//! - `ZTRACE_DISABLED`: any non-empty value turns every wrapper into a
//!   pass-through. Read once per process.
//! - `ZTRACE_LOG_DIR`: root of the log tree (default `./ztrace_logs`).
//! - `ZTRACE_SOURCE_ROOT`: extra directory to look up source files in.

use std::env;
use std::path::PathBuf;
use std::sync::OnceLock;

pub const DISABLED_VAR: &str = "ZTRACE_DISABLED";
pub const LOG_DIR_VAR: &str = "ZTRACE_LOG_DIR";
pub const SOURCE_ROOT_VAR: &str = "ZTRACE_SOURCE_ROOT";

pub const DEFAULT_LOG_DIR: &str = "./ztrace_logs";
pub const IGNORE_MARKER: &str = "ztrace: ignore";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub disabled: bool,
    pub log_dir: PathBuf,
    pub source_root: Option<PathBuf>,
    pub ignore_marker: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            disabled: false,
            log_dir: PathBuf::from(DEFAULT_LOG_DIR),
            source_root: None,
            ignore_marker: IGNORE_MARKER.to_string(),
        }
    }
}

impl Config {
    pub fn from_env() -> Self {
        Self {
            disabled: disabled_by_env(),
            log_dir: env_path(LOG_DIR_VAR).unwrap_or_else(|| PathBuf::from(DEFAULT_LOG_DIR)),
            source_root: env_path(SOURCE_ROOT_VAR),
            ignore_marker: IGNORE_MARKER.to_string(),
        }
    }

    pub fn with_log_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.log_dir = dir.into();
        self
    }

    pub fn with_disabled(mut self, disabled: bool) -> Self {
        self.disabled = disabled;
        self
    }

    pub fn with_source_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.source_root = Some(root.into());
        self
    }
}

/// The process-wide disable switch.
pub fn disabled_by_env() -> bool {
    static DISABLED: OnceLock<bool> = OnceLock::new();
    *DISABLED.get_or_init(|| is_set(env::var_os(DISABLED_VAR)))
}

fn is_set(value: Option<std::ffi::OsString>) -> bool {
    value.map(|v| !v.is_empty()).unwrap_or(false)
}

fn env_path(var: &str) -> Option<PathBuf> {
    env::var_os(var).filter(|v| !v.is_empty()).map(PathBuf::from)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn switch_values() {
        assert!(!is_set(None));
        assert!(!is_set(Some("".into())));
        assert!(is_set(Some("1".into())));
        // any non-empty value counts, "0" included
        assert!(is_set(Some("0".into())));
    }

    #[test]
    fn builders() {
        let cfg = Config::default()
            .with_log_dir("/tmp/logs")
            .with_disabled(true)
            .with_source_root("/src");
        assert_eq!(cfg.log_dir, PathBuf::from("/tmp/logs"));
        assert!(cfg.disabled);
        assert_eq!(cfg.source_root, Some(PathBuf::from("/src")));
        assert_eq!(cfg.ignore_marker, IGNORE_MARKER);
    }
}
