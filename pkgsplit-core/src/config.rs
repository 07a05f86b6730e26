//! Configuration file support for pkgsplit
//!
//! Loads project-specific configuration from JSON files.
//!
//! Search order:
//! 1. Explicit path (--config CLI flag)
//! 2. `.pkgsplitrc.json` in project root
//! 3. `pkgsplit.config.json` in project root
//!
//! All fields are optional. CLI flags take precedence over config file values.

use anyhow::{Context, Result};
use globset::{GlobBuilder, GlobSet, GlobSetBuilder};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Default bound on the forward search for a unit terminator, in bytes.
/// Guarantees termination of discovery on malformed or truncated input.
pub const DEFAULT_FORWARD_WINDOW: usize = 500_000;

/// Default bound on the search for a function's return clause, in bytes
pub const DEFAULT_RETURN_WINDOW: usize = 512;

/// pkgsplit configuration loaded from a JSON config file
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PkgsplitConfig {
    /// Glob patterns for unit names to include (default: all units)
    #[serde(default)]
    pub include_units: Vec<String>,

    /// Glob patterns for unit names to exclude (default: none)
    #[serde(default)]
    pub exclude_units: Vec<String>,

    /// Scan limit overrides
    #[serde(default)]
    pub scan: Option<ScanConfig>,
}

/// Scan limit overrides
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ScanConfig {
    /// Forward terminator search window in bytes (default: 500000)
    pub forward_window: Option<usize>,
    /// Return-clause search window in bytes (default: 512)
    pub return_window: Option<usize>,
}

/// Bounds applied by the discovery and member scans
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScanLimits {
    /// Forward terminator search window in bytes
    pub forward_window: usize,
    /// Return-clause search window in bytes
    pub return_window: usize,
}

impl Default for ScanLimits {
    fn default() -> Self {
        ScanLimits {
            forward_window: DEFAULT_FORWARD_WINDOW,
            return_window: DEFAULT_RETURN_WINDOW,
        }
    }
}

/// Resolved configuration with compiled glob patterns
#[derive(Debug)]
pub struct ResolvedConfig {
    /// Compiled include patterns (None means include all units)
    pub include: Option<GlobSet>,
    /// Compiled exclude patterns
    pub exclude: GlobSet,
    /// Scan limits with defaults applied
    pub limits: ScanLimits,
    /// Path the config was loaded from (None if defaults)
    pub config_path: Option<PathBuf>,
}

impl Default for ResolvedConfig {
    fn default() -> Self {
        ResolvedConfig {
            include: None,
            exclude: GlobSet::empty(),
            limits: ScanLimits::default(),
            config_path: None,
        }
    }
}

impl ResolvedConfig {
    /// Check whether a discovered unit passes the include/exclude filters.
    /// Matching is case-insensitive against the canonical unit name.
    pub fn should_include_unit(&self, unit_name: &str) -> bool {
        if let Some(ref include) = self.include {
            if !include.is_match(unit_name) {
                return false;
            }
        }
        !self.exclude.is_match(unit_name)
    }
}

impl PkgsplitConfig {
    /// Validate the configuration for logical errors
    pub fn validate(&self) -> Result<()> {
        if let Some(ref scan) = self.scan {
            if let Some(w) = scan.forward_window {
                if w == 0 {
                    anyhow::bail!("scan.forward_window must be positive (got 0)");
                }
            }
            if let Some(w) = scan.return_window {
                if w == 0 {
                    anyhow::bail!("scan.return_window must be positive (got 0)");
                }
            }
        }

        // Glob syntax errors surface here rather than at first use
        for pattern in self.include_units.iter().chain(self.exclude_units.iter()) {
            GlobBuilder::new(pattern)
                .build()
                .with_context(|| format!("invalid unit glob pattern: {}", pattern))?;
        }

        Ok(())
    }

    /// Resolve into compiled patterns and defaulted limits
    pub fn resolve(&self, config_path: Option<PathBuf>) -> Result<ResolvedConfig> {
        let include = if self.include_units.is_empty() {
            None
        } else {
            Some(build_glob_set(&self.include_units)?)
        };
        let exclude = build_glob_set(&self.exclude_units)?;

        let limits = ScanLimits {
            forward_window: self
                .scan
                .as_ref()
                .and_then(|s| s.forward_window)
                .unwrap_or(DEFAULT_FORWARD_WINDOW),
            return_window: self
                .scan
                .as_ref()
                .and_then(|s| s.return_window)
                .unwrap_or(DEFAULT_RETURN_WINDOW),
        };

        Ok(ResolvedConfig {
            include,
            exclude,
            limits,
            config_path,
        })
    }
}

/// Compile unit-name patterns case-insensitively
fn build_glob_set(patterns: &[String]) -> Result<GlobSet> {
    let mut builder = GlobSetBuilder::new();
    for pattern in patterns {
        let glob = GlobBuilder::new(pattern)
            .case_insensitive(true)
            .build()
            .with_context(|| format!("invalid unit glob pattern: {}", pattern))?;
        builder.add(glob);
    }
    builder.build().context("failed to compile unit glob set")
}

/// Load configuration from the project root, resolving defaults.
///
/// An explicit path that does not exist is an error; an absent implicit
/// config file is not (defaults are returned).
pub fn load_and_resolve(project_root: &Path, explicit: Option<&Path>) -> Result<ResolvedConfig> {
    let config_path = match explicit {
        Some(path) => {
            if !path.exists() {
                anyhow::bail!("config file does not exist: {}", path.display());
            }
            Some(path.to_path_buf())
        }
        None => discover_config_file(project_root),
    };

    match config_path {
        Some(path) => {
            let contents = std::fs::read_to_string(&path)
                .with_context(|| format!("failed to read config file: {}", path.display()))?;
            let config: PkgsplitConfig = serde_json::from_str(&contents)
                .with_context(|| format!("failed to parse config file: {}", path.display()))?;
            config.validate()?;
            config.resolve(Some(path))
        }
        None => Ok(ResolvedConfig::default()),
    }
}

/// Search the project root for an implicit config file
fn discover_config_file(project_root: &Path) -> Option<PathBuf> {
    for name in [".pkgsplitrc.json", "pkgsplit.config.json"] {
        let candidate = project_root.join(name);
        if candidate.exists() {
            return Some(candidate);
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_include_everything() {
        let resolved = ResolvedConfig::default();
        assert!(resolved.should_include_unit("PKG_BILLING"));
        assert_eq!(resolved.limits.forward_window, DEFAULT_FORWARD_WINDOW);
        assert_eq!(resolved.limits.return_window, DEFAULT_RETURN_WINDOW);
    }

    #[test]
    fn include_filter_is_case_insensitive() {
        let config: PkgsplitConfig =
            serde_json::from_str(r#"{ "include_units": ["pkg_*"] }"#).unwrap();
        let resolved = config.resolve(None).unwrap();
        assert!(resolved.should_include_unit("PKG_BILLING"));
        assert!(!resolved.should_include_unit("UTIL"));
    }

    #[test]
    fn exclude_wins_over_include() {
        let config: PkgsplitConfig = serde_json::from_str(
            r#"{ "include_units": ["pkg_*"], "exclude_units": ["pkg_legacy*"] }"#,
        )
        .unwrap();
        let resolved = config.resolve(None).unwrap();
        assert!(resolved.should_include_unit("PKG_BILLING"));
        assert!(!resolved.should_include_unit("PKG_LEGACY_API"));
    }

    #[test]
    fn zero_window_is_rejected() {
        let config: PkgsplitConfig =
            serde_json::from_str(r#"{ "scan": { "forward_window": 0 } }"#).unwrap();
        assert!(config.validate().is_err());
    }

    #[test]
    fn scan_overrides_apply() {
        let config: PkgsplitConfig =
            serde_json::from_str(r#"{ "scan": { "forward_window": 1024, "return_window": 64 } }"#)
                .unwrap();
        let resolved = config.resolve(None).unwrap();
        assert_eq!(resolved.limits.forward_window, 1024);
        assert_eq!(resolved.limits.return_window, 64);
    }

    #[test]
    fn unknown_fields_are_rejected() {
        let parsed: Result<PkgsplitConfig, _> = serde_json::from_str(r#"{ "nope": true }"#);
        assert!(parsed.is_err());
    }

    #[test]
    fn explicit_missing_config_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("nope.json");
        assert!(load_and_resolve(dir.path(), Some(&missing)).is_err());
    }

    #[test]
    fn implicit_config_is_discovered() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join(".pkgsplitrc.json"),
            r#"{ "exclude_units": ["scratch*"] }"#,
        )
        .unwrap();
        let resolved = load_and_resolve(dir.path(), None).unwrap();
        assert!(resolved.config_path.is_some());
        assert!(!resolved.should_include_unit("SCRATCH_PAD"));
    }
}
