//! Include/exclude rules deciding which local paths are deployed.
//!
//! Patterns use gitignore semantics via the `ignore` crate: a pattern
//! without a slash matches at any depth, a pattern with a leading directory
//! component (`src/**`) is anchored at the deploy root. A path is transferred
//! when an include pattern matches it (or one of its parents) and no exclude
//! pattern does. Exclusion always wins.

use ignore::gitignore::{Gitignore, GitignoreBuilder};
use std::path::Path;

/// Everything, dotfiles included (`.htaccess` and friends)
pub const DEFAULT_INCLUDE: &[&str] = &["**/*", ".*"];

/// Never deployed, even if present in the build output
pub const DEFAULT_EXCLUDE: &[&str] = &[
    ".git/**",
    ".gitignore",
    "node_modules/**",
    "src/**",
    "*.log",
];

/// Errors raised while compiling patterns
#[derive(Debug, thiserror::Error)]
#[error("invalid pattern '{pattern}': {message}")]
pub struct RuleError {
    pub pattern: String,
    pub message: String,
}

/// Compiled include and exclude patterns
#[derive(Debug)]
pub struct TransferRules {
    include: Gitignore,
    exclude: Gitignore,
    include_patterns: Vec<String>,
    exclude_patterns: Vec<String>,
}

impl TransferRules {
    /// The fixed deployment policy
    pub fn standard() -> Self {
        // The built-in patterns are static and known to compile.
        match Self::new(DEFAULT_INCLUDE, DEFAULT_EXCLUDE) {
            Ok(rules) => rules,
            Err(e) => unreachable!("built-in transfer rules must compile: {e}"),
        }
    }

    /// Compile custom include/exclude patterns
    pub fn new(include: &[&str], exclude: &[&str]) -> Result<Self, RuleError> {
        Ok(Self {
            include: build_matcher(include)?,
            exclude: build_matcher(exclude)?,
            include_patterns: include.iter().map(|p| p.to_string()).collect(),
            exclude_patterns: exclude.iter().map(|p| p.to_string()).collect(),
        })
    }

    /// Check whether a path relative to the deploy root may be transferred.
    ///
    /// `is_dir` should be true if the path is a directory.
    pub fn is_transferable(&self, rel_path: &Path, is_dir: bool) -> bool {
        !self.is_excluded(rel_path, is_dir) && self.is_included(rel_path, is_dir)
    }

    /// Check whether any exclude pattern matches the path or one of its parents
    pub fn is_excluded(&self, rel_path: &Path, is_dir: bool) -> bool {
        self.exclude
            .matched_path_or_any_parents(rel_path, is_dir)
            .is_ignore()
    }

    fn is_included(&self, rel_path: &Path, is_dir: bool) -> bool {
        // Directories are always walked; inclusion is decided per file.
        is_dir
            || self
                .include
                .matched_path_or_any_parents(rel_path, is_dir)
                .is_ignore()
    }

    pub fn include_patterns(&self) -> &[String] {
        &self.include_patterns
    }

    pub fn exclude_patterns(&self) -> &[String] {
        &self.exclude_patterns
    }
}

fn build_matcher(patterns: &[&str]) -> Result<Gitignore, RuleError> {
    let mut builder = GitignoreBuilder::new("");
    for pattern in patterns {
        builder.add_line(None, pattern).map_err(|e| RuleError {
            pattern: pattern.to_string(),
            message: e.to_string(),
        })?;
    }
    builder.build().map_err(|e| RuleError {
        pattern: patterns.join(", "),
        message: e.to_string(),
    })
}
