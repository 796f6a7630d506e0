//! Remediation suggestions for analysis findings
//!
//! Each [`Finding`] becomes exactly one [`Suggestion`]. Actions are picked by category and,
//! for metadata and structure findings, by what the message talks about. Findings without a
//! matching template simply carry no actions.

use serde::{Deserialize, Serialize};

use crate::analysis::{AnalysisReport, Category, Finding, Severity};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionKind {
    AddContent,
    AddLabels,
    Review,
    Restructure,
    Reorganize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Action {
    #[serde(rename = "type")]
    pub kind: ActionKind,
    pub description: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub example: Option<String>,
}

impl Action {
    fn new(kind: ActionKind, description: &str, example: Option<&str>) -> Self {
        Self {
            kind,
            description: description.to_string(),
            example: example.map(str::to_string),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Suggestion {
    /// Message of the originating finding
    pub finding: String,
    pub severity: Severity,
    pub category: Category,
    pub recommendation: String,
    pub actions: Vec<Action>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SuggestionReport {
    pub page_id: String,
    pub title: String,
    pub suggestions: Vec<Suggestion>,
    pub priority_actions: Vec<String>,
}

const OWNER_EXAMPLE: &str = "<p><strong>Owner:</strong> @team-or-person</p>";
const REVIEWED_EXAMPLE: &str = "<p><strong>Last reviewed:</strong> 2024-01-15</p>";
const HEADINGS_EXAMPLE: &str = "<h2>Overview</h2>\n<p>...</p>\n<h2>Details</h2>\n<p>...</p>";
const LABELS_EXAMPLE: &str = "documentation, runbook, process";

/// Actions for a finding, empty when no template applies
pub fn actions_for(finding: &Finding) -> Vec<Action> {
    let message = finding.message.to_lowercase();

    match finding.category {
        Category::Metadata if message.contains("owner") => vec![Action::new(
            ActionKind::AddContent,
            "Add an owner or contact section near the top of the page",
            Some(OWNER_EXAMPLE),
        )],
        Category::Metadata if message.contains("reviewed") => vec![Action::new(
            ActionKind::AddContent,
            "Add a last reviewed date",
            Some(REVIEWED_EXAMPLE),
        )],
        Category::Structure if message.contains("heading") => vec![Action::new(
            ActionKind::Restructure,
            "Split the content into sections with descriptive headings",
            Some(HEADINGS_EXAMPLE),
        )],
        Category::Labels => vec![Action::new(
            ActionKind::AddLabels,
            "Add category labels so the page can be discovered",
            Some(LABELS_EXAMPLE),
        )],
        Category::Staleness => vec![Action::new(
            ActionKind::Review,
            "Review the page for accuracy, then update it or archive it",
            None,
        )],
        Category::Nesting => vec![Action::new(
            ActionKind::Reorganize,
            "Move the page closer to the space root or merge it into its parent",
            None,
        )],
        _ => Vec::new(),
    }
}

pub fn suggest(finding: &Finding) -> Suggestion {
    Suggestion {
        finding: finding.message.clone(),
        severity: finding.severity,
        category: finding.category,
        recommendation: finding.recommendation.clone(),
        actions: actions_for(finding),
    }
}

/// Messages of every error- and warning-level suggestion, in order
pub fn priority_actions(suggestions: &[Suggestion]) -> Vec<String> {
    suggestions
        .iter()
        .filter(|s| matches!(s.severity, Severity::Error | Severity::Warning))
        .map(|s| s.finding.clone())
        .collect()
}

pub fn generate_suggestions(report: &AnalysisReport) -> SuggestionReport {
    let suggestions: Vec<Suggestion> = report.findings.iter().map(suggest).collect();
    let priority_actions = priority_actions(&suggestions);

    SuggestionReport {
        page_id: report.page_id.clone(),
        title: report.title.clone(),
        suggestions,
        priority_actions,
    }
}
