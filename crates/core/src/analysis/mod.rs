//! Content quality analysis for normalized pages
//!
//! The engine is a list of independent [`Rule`]s. Each rule inspects a [`PageRecord`] and
//! returns zero or more [`Finding`]s; the engine concatenates them in rule order and builds a
//! summary. Rules never see each other's output, so the set can be extended or tested one
//! rule at a time.
//!
//! Every rule is total: a page with missing optional fields degrades to "no finding" or to the
//! empty-content finding, never to an error.

pub mod rules;

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::confluence::PageRecord;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Error,
    Warning,
    Info,
}

impl Severity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Error => "error",
            Severity::Warning => "warning",
            Severity::Info => "info",
        }
    }
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    Title,
    Metadata,
    Structure,
    Labels,
    Staleness,
    Nesting,
}

impl Category {
    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Title => "title",
            Category::Metadata => "metadata",
            Category::Structure => "structure",
            Category::Labels => "labels",
            Category::Staleness => "staleness",
            Category::Nesting => "nesting",
        }
    }
}

impl std::fmt::Display for Category {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A detected quality issue
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Finding {
    pub severity: Severity,
    pub category: Category,
    pub message: String,
    pub recommendation: String,
}

impl Finding {
    pub fn new(
        severity: Severity,
        category: Category,
        message: impl Into<String>,
        recommendation: impl Into<String>,
    ) -> Self {
        Self {
            severity,
            category,
            message: message.into(),
            recommendation: recommendation.into(),
        }
    }
}

/// Inputs shared by every rule besides the page itself
#[derive(Debug, Clone, Copy)]
pub struct RuleContext {
    pub now: DateTime<Utc>,
}

/// A single independent check
pub trait Rule: Send + Sync {
    fn name(&self) -> &'static str;

    /// Category carried by every finding this rule reports
    fn category(&self) -> Category;

    fn check(&self, page: &PageRecord, ctx: &RuleContext) -> Vec<Finding>;
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeverityCounts {
    pub error: usize,
    pub warning: usize,
    pub info: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisSummary {
    pub total: usize,
    pub by_severity: SeverityCounts,
    pub by_category: BTreeMap<String, usize>,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisReport {
    pub page_id: String,
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    pub findings: Vec<Finding>,
    pub summary: AnalysisSummary,
}

/// Ordered collection of rules
pub struct RuleSet {
    rules: Vec<Box<dyn Rule>>,
}

impl Default for RuleSet {
    fn default() -> Self {
        Self {
            rules: vec![
                Box::new(rules::TitleRule),
                Box::new(rules::MetadataRule::default()),
                Box::new(rules::StructureRule),
                Box::new(rules::LabelsRule),
                Box::new(rules::StalenessRule),
                Box::new(rules::NestingRule),
            ],
        }
    }
}

impl RuleSet {
    pub fn empty() -> Self {
        Self { rules: Vec::new() }
    }

    pub fn with_rule(mut self, rule: impl Rule + 'static) -> Self {
        self.rules.push(Box::new(rule));
        self
    }

    pub fn rule_names(&self) -> Vec<&'static str> {
        self.rules.iter().map(|rule| rule.name()).collect()
    }

    pub fn run(&self, page: &PageRecord, ctx: &RuleContext) -> Vec<Finding> {
        self.rules
            .iter()
            .flat_map(|rule| {
                let findings = rule.check(page, ctx);
                debug_assert!(
                    findings.iter().all(|f| f.category == rule.category()),
                    "rule {} reported a finding outside {:?}",
                    rule.name(),
                    rule.category()
                );
                findings
            })
            .collect()
    }

    pub fn analyze_at(&self, page: &PageRecord, now: DateTime<Utc>) -> AnalysisReport {
        let findings = self.run(page, &RuleContext { now });
        let summary = summarize(&findings);

        AnalysisReport {
            page_id: page.id.clone(),
            title: page.title.clone(),
            url: page.url.clone(),
            findings,
            summary,
        }
    }
}

/// Analyze a page with the default rule set as of now
pub fn analyze(page: &PageRecord) -> AnalysisReport {
    analyze_at(page, Utc::now())
}

/// Analyze a page with the default rule set as of `now`
pub fn analyze_at(page: &PageRecord, now: DateTime<Utc>) -> AnalysisReport {
    RuleSet::default().analyze_at(page, now)
}

/// Severity and category histograms plus a one-line verdict
pub fn summarize(findings: &[Finding]) -> AnalysisSummary {
    let mut by_severity = SeverityCounts::default();
    let mut by_category: BTreeMap<String, usize> = BTreeMap::new();

    for finding in findings {
        match finding.severity {
            Severity::Error => by_severity.error += 1,
            Severity::Warning => by_severity.warning += 1,
            Severity::Info => by_severity.info += 1,
        }
        *by_category
            .entry(finding.category.as_str().to_string())
            .or_default() += 1;
    }

    let message = if findings.is_empty() {
        "Page follows best practices!".to_string()
    } else {
        format!(
            "Found {} issue(s): {} error(s), {} warning(s), {} info",
            findings.len(),
            by_severity.error,
            by_severity.warning,
            by_severity.info
        )
    };

    AnalysisSummary {
        total: findings.len(),
        by_severity,
        by_category,
        message,
    }
}
