// message.rs — Commit messages and review descriptions for landed fixes.
//
// Both generators are pure: the same fix, verification, and issue always
// produce byte-identical text. No timestamps, no random ids.

use lander_core::{Fix, Issue, VerificationResult};

use crate::config::CommitSettings;

/// Directory names treated as source roots when deriving a scope.
const SOURCE_ROOTS: &[&str] = &["src", "lib", "app", "pkg", "packages", "crates", "source"];

/// Warnings and recommendations listed in a review description.
const MAX_LISTED_NOTES: usize = 3;

/// A conventional-commit style message before rendering.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommitMessage {
    pub commit_type: String,
    pub scope: Option<String>,
    pub subject: String,
    pub body: Option<String>,
    pub footer: Option<String>,
    pub breaking: bool,
}

impl CommitMessage {
    /// First line of the commit.
    pub fn header(&self, conventional: bool) -> String {
        if !conventional {
            return self.subject.clone();
        }
        let scope = self
            .scope
            .as_ref()
            .map(|s| format!("({})", s))
            .unwrap_or_default();
        let bang = if self.breaking { "!" } else { "" };
        format!("{}{}{}: {}", self.commit_type, scope, bang, self.subject)
    }

    /// Full commit text: header, blank line, body, blank line, footer.
    pub fn render(&self, conventional: bool) -> String {
        let mut text = self.header(conventional);
        for section in [&self.body, &self.footer].into_iter().flatten() {
            text.push_str("\n\n");
            text.push_str(section);
        }
        text
    }
}

/// Conventional commit type for a fix category. Unknown categories are fixes.
pub fn commit_type_for(category: &str) -> &'static str {
    match normalize_category(category).as_str() {
        "bug-fix" | "bugfix" | "bug" => "fix",
        "performance" | "perf" => "perf",
        "security" => "fix",
        "style" => "style",
        "refactor" | "refactoring" => "refactor",
        "test" | "tests" => "test",
        "documentation" | "docs" => "docs",
        "dependency" | "dependencies" => "chore",
        _ => "fix",
    }
}

/// Lowercase kebab form of a category (`BugFix`, `bug_fix` → `bug-fix`).
pub fn normalize_category(category: &str) -> String {
    let mut out = String::new();
    let mut prev_lower = false;
    for c in category.trim().chars() {
        if c.is_uppercase() {
            if prev_lower {
                out.push('-');
            }
            out.extend(c.to_lowercase());
            prev_lower = false;
        } else if c.is_alphanumeric() {
            out.push(c);
            prev_lower = c.is_lowercase() || c.is_ascii_digit();
        } else {
            if !out.ends_with('-') && !out.is_empty() {
                out.push('-');
            }
            prev_lower = false;
        }
    }
    out.trim_end_matches('-').to_string()
}

/// Scope for single-file fixes: the first directory under a source root,
/// otherwise the parent directory name.
pub fn derive_scope(files: &[String]) -> Option<String> {
    if files.len() != 1 {
        return None;
    }
    let segments: Vec<&str> = files[0].split('/').filter(|s| !s.is_empty()).collect();
    let dirs = segments.split_last().map(|(_, dirs)| dirs)?;

    if let Some(root) = dirs.iter().position(|d| SOURCE_ROOTS.contains(d)) {
        if let Some(next) = dirs.get(root + 1) {
            return Some(next.to_string());
        }
    }
    dirs.last().map(|d| d.to_string())
}

/// Build the commit message for a fix.
pub fn compose_message(
    fix: &Fix,
    verification: &VerificationResult,
    issue: Option<&Issue>,
    settings: &CommitSettings,
) -> CommitMessage {
    let files = fix.touched_files();

    let suffix = match issue {
        Some(issue) if settings.include_issue_id => format!(" (#{})", issue.id),
        _ => String::new(),
    };
    let subject = build_subject(&fix.description, &suffix, settings.max_subject_length);

    let mut body = vec![format!("Fix type: {}", fix.fix_type)];
    if !fix.strategy.is_empty() {
        body.push(format!("Strategy: {}", fix.strategy));
    }
    body.push(format!("Files changed: {}", files.len()));
    body.push(format!("Lines changed: {}", fix.estimated_impact.lines_changed));
    if settings.include_verification_info {
        body.push(String::new());
        body.push(format!(
            "Verification score: {:.2}",
            verification.overall_score
        ));
        body.push(format!(
            "Tests passed: {}/{}",
            verification.summary.passed, verification.summary.total
        ));
        body.push(format!("Warnings: {}", verification.warnings.len()));
    }

    let mut footer = Vec::new();
    if let Some(issue) = issue {
        footer.push(format!("Fixes: {}", issue.id));
    }
    footer.push(format!("Fix-Id: {}", fix.id));
    footer.push(format!(
        "Verification-Score: {:.2}",
        verification.overall_score
    ));

    CommitMessage {
        commit_type: commit_type_for(&fix.fix_type).to_string(),
        scope: derive_scope(&files),
        subject,
        body: Some(body.join("\n")),
        footer: Some(footer.join("\n")),
        breaking: fix.breaking_change,
    }
}

/// Markdown body for a remote review.
pub fn compose_description(
    fix: &Fix,
    verification: &VerificationResult,
    issue: Option<&Issue>,
) -> String {
    let mut out = String::new();

    out.push_str("## Summary\n\n");
    out.push_str(fix.description.trim());
    out.push_str("\n\n");

    if let Some(issue) = issue {
        out.push_str("## Issue\n\n");
        out.push_str(&format!("- **ID**: {}\n", issue.id));
        out.push_str(&format!("- **Type**: {}\n", issue.issue_type));
        out.push_str(&format!("- **Severity**: {}\n", issue.severity));
        if let Some(location) = issue.location() {
            out.push_str(&format!("- **Location**: `{}`\n", location));
        }
        out.push_str(&format!("- **Message**: {}\n\n", issue.message));
    }

    out.push_str("## Changes\n\n");
    for (i, action) in fix.actions.iter().enumerate() {
        let lines = if action.start_line == action.end_line {
            format!("line {}", action.start_line)
        } else {
            format!("lines {}-{}", action.start_line, action.end_line)
        };
        out.push_str(&format!("{}. `{}` ({})\n", i + 1, action.file, lines));
    }
    out.push_str(&format!(
        "\n{} file(s), {} line(s) changed, risk score {:.2}\n\n",
        fix.touched_files().len(),
        fix.estimated_impact.lines_changed,
        fix.estimated_impact.risk_score
    ));

    out.push_str("## Verification\n\n");
    out.push_str(&format!(
        "- **Score**: {:.1}%\n",
        verification.overall_score * 100.0
    ));
    let summary = verification.summary;
    if summary.total > 0 {
        out.push_str(&format!(
            "- **Tests**: {}/{} passed ({:.1}%)\n",
            summary.passed,
            summary.total,
            summary.passed as f64 * 100.0 / summary.total as f64
        ));
    } else {
        out.push_str("- **Tests**: none run\n");
    }
    out.push_str(&format!(
        "- **Approval required**: {}\n",
        if verification.approval_required {
            "yes"
        } else {
            "no"
        }
    ));

    push_notes(&mut out, "Warnings", &verification.warnings);
    push_notes(&mut out, "Recommendations", &verification.recommendations);

    out.push_str(&format!("\n---\n\nFix ID: `{}`\n", fix.id));
    out
}

fn push_notes(out: &mut String, heading: &str, notes: &[String]) {
    if notes.is_empty() {
        return;
    }
    out.push_str(&format!("\n## {}\n\n", heading));
    for note in notes.iter().take(MAX_LISTED_NOTES) {
        out.push_str(&format!("- {}\n", note));
    }
    if notes.len() > MAX_LISTED_NOTES {
        out.push_str(&format!(
            "- ...and {} more\n",
            notes.len() - MAX_LISTED_NOTES
        ));
    }
}

/// First line of the description, truncated so that description plus
/// suffix fit in `max_len` characters.
fn build_subject(description: &str, suffix: &str, max_len: usize) -> String {
    let first_line = description.lines().next().unwrap_or("").trim();
    let suffix_len = suffix.chars().count();

    // A suffix that leaves no room for text is dropped.
    let (budget, suffix) = if suffix_len + 4 <= max_len {
        (max_len - suffix_len, suffix)
    } else {
        (max_len, "")
    };

    let mut subject = if first_line.chars().count() > budget {
        let kept: String = first_line.chars().take(budget.saturating_sub(3)).collect();
        format!("{}...", kept.trim_end())
    } else {
        first_line.to_string()
    };
    subject.push_str(suffix);
    subject
}
