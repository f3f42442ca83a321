// path_policy.rs — Allow/deny checks for files a fix wants to touch.
//
// Paths are repository-relative. Patterns are globs where `*` never crosses
// a `/`; a pattern without any `/` is also tried against the file name so
// that "*.pem" catches keys in any directory.
//
// Rules:
// 1. Absolute paths and paths with `..` components are always rejected.
// 2. A path matching any forbidden pattern is rejected (deny wins).
// 3. A non-empty allow-list must match the path.
// 4. Invalid glob patterns never match (fail-closed for allow, ignored for deny).

use std::path::{Component, Path};

use glob::{MatchOptions, Pattern};
use lander_core::{Fix, LanderError};

use crate::config::SecuritySettings;

/// Check a single repository-relative path against the security settings.
pub fn check_path(path: &str, security: &SecuritySettings) -> Result<(), LanderError> {
    if path.trim().is_empty() {
        return Err(violation(path, "empty path"));
    }

    let as_path = Path::new(path);
    if as_path.is_absolute()
        || as_path
            .components()
            .any(|c| matches!(c, Component::ParentDir | Component::RootDir | Component::Prefix(_)))
    {
        return Err(violation(path, "path escapes the repository"));
    }

    if let Some(pattern) = security
        .forbidden_file_patterns
        .iter()
        .find(|p| matches_path(p, path))
    {
        return Err(violation(
            path,
            &format!("matches forbidden pattern `{}`", pattern),
        ));
    }

    if !security.allowed_file_patterns.is_empty()
        && !security
            .allowed_file_patterns
            .iter()
            .any(|p| matches_path(p, path))
    {
        return Err(violation(path, "not covered by any allowed pattern"));
    }

    Ok(())
}

/// Check every file and the size limits of a fix before anything is written.
pub fn check_fix(fix: &Fix, security: &SecuritySettings) -> Result<(), LanderError> {
    let files = fix.touched_files();

    if files.len() > security.max_files_per_commit {
        return Err(violation(
            &files.join(", "),
            &format!(
                "{} files exceed the limit of {}",
                files.len(),
                security.max_files_per_commit
            ),
        ));
    }

    if fix.estimated_impact.lines_changed > security.max_lines_per_commit {
        return Err(violation(
            &files.join(", "),
            &format!(
                "{} changed lines exceed the limit of {}",
                fix.estimated_impact.lines_changed, security.max_lines_per_commit
            ),
        ));
    }

    for file in &files {
        check_path(file, security)?;
    }
    Ok(())
}

/// Match a pattern against a relative path (and against the file name for
/// slash-free patterns).
pub fn matches_path(pattern: &str, path: &str) -> bool {
    if pattern.is_empty() {
        return false;
    }
    if glob_match(pattern, path) {
        return true;
    }
    if !pattern.contains('/') {
        if let Some(name) = path.rsplit('/').next() {
            return glob_match(pattern, name);
        }
    }
    false
}

fn glob_match(pattern: &str, target: &str) -> bool {
    let opts = MatchOptions {
        require_literal_separator: true,
        require_literal_leading_dot: false,
        ..Default::default()
    };
    match Pattern::new(pattern) {
        Ok(p) => p.matches_with(target, opts),
        Err(_) => false,
    }
}

fn violation(path: &str, reason: &str) -> LanderError {
    LanderError::SecurityViolation {
        path: path.to_string(),
        reason: reason.to_string(),
    }
}
