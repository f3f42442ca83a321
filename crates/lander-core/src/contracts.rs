// contracts.rs — Data handed to the pipeline by upstream collaborators.
//
// Issues come from the detector, fixes from the generator, and
// verification results from the verifier. The pipeline never mutates
// them; it only decides whether and how to land the fix.
//
// JSON field names are camelCase to match the producers' documents.

use serde::{Deserialize, Serialize};

/// A problem reported by the issue detector.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Issue {
    pub id: String,
    #[serde(rename = "type")]
    pub issue_type: String,
    pub severity: String,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub line: Option<u32>,
}

impl Issue {
    /// `file:line`, `file`, or `None` when the issue has no location.
    pub fn location(&self) -> Option<String> {
        match (&self.file, self.line) {
            (Some(file), Some(line)) => Some(format!("{}:{}", file, line)),
            (Some(file), None) => Some(file.clone()),
            _ => None,
        }
    }
}

/// One whole-file replacement within a fix.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct FixAction {
    pub file: String,
    pub start_line: u32,
    pub end_line: u32,
    /// Full new content of `file` (replacement, not a patch).
    pub new_content: String,
}

/// The generator's estimate of how far a fix reaches.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct EstimatedImpact {
    pub files_changed: usize,
    pub lines_changed: usize,
    /// 0.0 (harmless) to 1.0 (dangerous).
    pub risk_score: f64,
}

/// A proposed change produced by the fix generator.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Fix {
    pub id: String,
    /// Fix category, e.g. "bug-fix", "performance", "security".
    #[serde(rename = "type")]
    pub fix_type: String,
    pub description: String,
    /// How the generator produced the fix (not the landing strategy).
    #[serde(default)]
    pub strategy: String,
    pub actions: Vec<FixAction>,
    #[serde(default)]
    pub estimated_impact: EstimatedImpact,
    /// Marks the commit header with `!`.
    #[serde(default)]
    pub breaking_change: bool,
}

impl Fix {
    /// Files touched by the fix, deduplicated, in first-seen order.
    pub fn touched_files(&self) -> Vec<String> {
        let mut files: Vec<String> = Vec::new();
        for action in &self.actions {
            if !files.contains(&action.file) {
                files.push(action.file.clone());
            }
        }
        files
    }
}

/// Pass/total counts from the verifier's test run.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct TestSummary {
    pub passed: u32,
    pub total: u32,
}

/// The verifier's assessment of a fix.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct VerificationResult {
    /// 0.0 to 1.0.
    pub overall_score: f64,
    pub approval_required: bool,
    #[serde(default)]
    pub summary: TestSummary,
    #[serde(default)]
    pub warnings: Vec<String>,
    #[serde(default)]
    pub recommendations: Vec<String>,
}
