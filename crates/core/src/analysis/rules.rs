//! Built-in analysis rules
//!
//! The content checks are regex heuristics over raw storage markup. They will miss unusual
//! phrasings; that is accepted.

use std::sync::OnceLock;

use chrono::{DateTime, Utc};
use regex::Regex;

use super::{Category, Finding, Rule, RuleContext, Severity};
use crate::confluence::PageRecord;

pub const MIN_TITLE_LENGTH: usize = 5;
pub const MAX_TITLE_LENGTH: usize = 100;
pub const GENERIC_TITLE_TERMS: [&str; 5] = ["untitled", "new page", "draft", "test", "temp"];

pub const HEADINGLESS_BODY_LIMIT: usize = 500;
pub const LONG_PARAGRAPH_LIMIT: usize = 1000;

pub const CATEGORY_LABELS: [&str; 7] = [
    "documentation",
    "runbook",
    "process",
    "tutorial",
    "reference",
    "api",
    "troubleshooting",
];

pub const STALE_WARNING_DAYS: i64 = 365;
pub const STALE_INFO_DAYS: i64 = 180;

pub const MAX_NESTING_DEPTH: usize = 4;

// ============================================================================
// Title
// ============================================================================

pub struct TitleRule;

impl Rule for TitleRule {
    fn name(&self) -> &'static str {
        "title-conventions"
    }

    fn category(&self) -> Category {
        Category::Title
    }

    fn check(&self, page: &PageRecord, _ctx: &RuleContext) -> Vec<Finding> {
        let title = page.title.trim();
        let length = title.chars().count();
        let mut findings = Vec::new();

        if length < MIN_TITLE_LENGTH {
            findings.push(Finding::new(
                Severity::Warning,
                Category::Title,
                format!("Title is too short ({length} characters)"),
                format!("Use a descriptive title of at least {MIN_TITLE_LENGTH} characters"),
            ));
        } else if length > MAX_TITLE_LENGTH {
            findings.push(Finding::new(
                Severity::Warning,
                Category::Title,
                format!("Title is too long ({length} characters)"),
                format!("Keep titles under {MAX_TITLE_LENGTH} characters"),
            ));
        }

        // Short all-caps titles are usually acronyms. Uncased scripts never count.
        if length > MIN_TITLE_LENGTH
            && title.chars().any(char::is_uppercase)
            && !title.chars().any(char::is_lowercase)
        {
            findings.push(Finding::new(
                Severity::Info,
                Category::Title,
                "Title is all uppercase",
                "Use sentence case or title case",
            ));
        }

        if title.ends_with(['.', '!', '?']) {
            findings.push(Finding::new(
                Severity::Info,
                Category::Title,
                "Title ends with punctuation",
                "Remove trailing punctuation from the title",
            ));
        }

        let lowered = title.to_lowercase();
        if let Some(term) = GENERIC_TITLE_TERMS
            .iter()
            .find(|term| lowered.contains(**term))
        {
            findings.push(Finding::new(
                Severity::Warning,
                Category::Title,
                format!("Title contains generic term \"{term}\""),
                "Replace generic wording with a title that describes the content",
            ));
        }

        findings
    }
}

// ============================================================================
// Metadata
// ============================================================================

/// Flags a page whose body never matches `pattern`
pub struct MissingPattern {
    pub pattern: Regex,
    pub severity: Severity,
    pub category: Category,
    pub message: &'static str,
    pub recommendation: &'static str,
}

impl MissingPattern {
    pub fn evaluate(&self, body: &str) -> Option<Finding> {
        (!self.pattern.is_match(body)).then(|| {
            Finding::new(
                self.severity,
                self.category,
                self.message,
                self.recommendation,
            )
        })
    }
}

pub struct MetadataRule {
    checks: Vec<MissingPattern>,
}

impl Default for MetadataRule {
    fn default() -> Self {
        Self {
            checks: vec![
                MissingPattern {
                    pattern: Regex::new(r"(?i)owner|contact|maintainer|maintained by").unwrap(),
                    severity: Severity::Warning,
                    category: Category::Metadata,
                    message: "No owner or contact information found",
                    recommendation: "Add an owner or maintainer so readers know who to ask",
                },
                MissingPattern {
                    pattern: Regex::new(
                        r"(?i)last[\s_-]*reviewed|reviewed[\s_-]+(on|at|date)|review[\s_-]+date",
                    )
                    .unwrap(),
                    severity: Severity::Info,
                    category: Category::Metadata,
                    message: "No last reviewed date found",
                    recommendation: "Add a \"Last reviewed\" date to signal freshness",
                },
            ],
        }
    }
}

impl MetadataRule {
    pub fn with_check(mut self, check: MissingPattern) -> Self {
        self.checks.push(check);
        self
    }
}

impl Rule for MetadataRule {
    fn name(&self) -> &'static str {
        "metadata-presence"
    }

    fn category(&self) -> Category {
        Category::Metadata
    }

    fn check(&self, page: &PageRecord, _ctx: &RuleContext) -> Vec<Finding> {
        self.checks
            .iter()
            .filter_map(|check| check.evaluate(&page.body))
            .collect()
    }
}

// ============================================================================
// Structure
// ============================================================================

fn heading_pattern() -> &'static Regex {
    static RE_HEADING: OnceLock<Regex> = OnceLock::new();
    RE_HEADING.get_or_init(|| Regex::new(r"(?i)<h[1-6][\s>]").unwrap())
}

fn code_macro_pattern() -> &'static Regex {
    static RE_CODE: OnceLock<Regex> = OnceLock::new();
    RE_CODE.get_or_init(|| {
        Regex::new(
            r#"(?is)<ac:structured-macro[^>]*ac:name="code"[^>]*>(.*?)</ac:structured-macro>"#,
        )
        .unwrap()
    })
}

fn language_param_pattern() -> &'static Regex {
    static RE_LANGUAGE: OnceLock<Regex> = OnceLock::new();
    RE_LANGUAGE
        .get_or_init(|| Regex::new(r#"(?i)<ac:parameter[^>]*ac:name="language"[^>]*>\s*\S"#).unwrap())
}

/// Number of code macros without a `language` parameter
pub fn count_unlabeled_code_blocks(body: &str) -> usize {
    code_macro_pattern()
        .captures_iter(body)
        .filter(|caps| {
            caps.get(1)
                .map_or(true, |inner| !language_param_pattern().is_match(inner.as_str()))
        })
        .count()
}

/// Number of `</p>`-delimited segments longer than [`LONG_PARAGRAPH_LIMIT`]
pub fn count_long_paragraphs(body: &str) -> usize {
    body.split("</p>")
        .filter(|segment| segment.chars().count() > LONG_PARAGRAPH_LIMIT)
        .count()
}

pub struct StructureRule;

impl Rule for StructureRule {
    fn name(&self) -> &'static str {
        "structure"
    }

    fn category(&self) -> Category {
        Category::Structure
    }

    fn check(&self, page: &PageRecord, _ctx: &RuleContext) -> Vec<Finding> {
        let body = page.body.as_str();

        if body.trim().is_empty() {
            return vec![Finding::new(
                Severity::Error,
                Category::Structure,
                "Page has no content",
                "Add content or archive the page if it is no longer needed",
            )];
        }

        let mut findings = Vec::new();

        if body.chars().count() > HEADINGLESS_BODY_LIMIT && !heading_pattern().is_match(body) {
            findings.push(Finding::new(
                Severity::Warning,
                Category::Structure,
                "Page has no headings",
                "Break the content into sections with headings",
            ));
        }

        let long_paragraphs = count_long_paragraphs(body);
        if long_paragraphs > 0 {
            findings.push(Finding::new(
                Severity::Info,
                Category::Structure,
                format!(
                    "{long_paragraphs} paragraph(s) longer than {LONG_PARAGRAPH_LIMIT} characters"
                ),
                "Split long paragraphs or use lists and tables",
            ));
        }

        let unlabeled = count_unlabeled_code_blocks(body);
        if unlabeled > 0 {
            findings.push(Finding::new(
                Severity::Info,
                Category::Structure,
                format!("{unlabeled} code block(s) without a language"),
                "Set the language on code blocks to enable syntax highlighting",
            ));
        }

        findings
    }
}

// ============================================================================
// Labels
// ============================================================================

pub struct LabelsRule;

impl Rule for LabelsRule {
    fn name(&self) -> &'static str {
        "labels"
    }

    fn category(&self) -> Category {
        Category::Labels
    }

    fn check(&self, page: &PageRecord, _ctx: &RuleContext) -> Vec<Finding> {
        if page.labels.is_empty() {
            return vec![Finding::new(
                Severity::Warning,
                Category::Labels,
                "Page has no labels",
                "Add labels so the page can be found and grouped",
            )];
        }

        let categorized = page.labels.iter().any(|label| {
            let label = label.to_lowercase();
            CATEGORY_LABELS.iter().any(|term| label.contains(term))
        });

        if categorized {
            Vec::new()
        } else {
            vec![Finding::new(
                Severity::Info,
                Category::Labels,
                "No category labels found",
                format!("Add a category label such as: {}", CATEGORY_LABELS.join(", ")),
            )]
        }
    }
}

// ============================================================================
// Staleness
// ============================================================================

/// Parse a Confluence timestamp (`2024-01-31T10:00:00.000Z` and RFC 3339 offsets)
pub fn parse_timestamp(value: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value)
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}

pub struct StalenessRule;

impl Rule for StalenessRule {
    fn name(&self) -> &'static str {
        "staleness"
    }

    fn category(&self) -> Category {
        Category::Staleness
    }

    fn check(&self, page: &PageRecord, ctx: &RuleContext) -> Vec<Finding> {
        let Some(modified) = page.last_modified_at.as_deref().and_then(parse_timestamp) else {
            return Vec::new();
        };

        let days = (ctx.now - modified).num_days();

        let finding = if days > STALE_WARNING_DAYS {
            Finding::new(
                Severity::Warning,
                Category::Staleness,
                format!("Page has not been updated in {} year(s)", days / 365),
                "Review the content for accuracy or archive it",
            )
        } else if days > STALE_INFO_DAYS {
            Finding::new(
                Severity::Info,
                Category::Staleness,
                format!("Page has not been updated in {} month(s)", days / 30),
                "Schedule a review of this page",
            )
        } else {
            return Vec::new();
        };

        vec![finding]
    }
}

// ============================================================================
// Nesting
// ============================================================================

pub struct NestingRule;

impl Rule for NestingRule {
    fn name(&self) -> &'static str {
        "nesting-depth"
    }

    fn category(&self) -> Category {
        Category::Nesting
    }

    fn check(&self, page: &PageRecord, _ctx: &RuleContext) -> Vec<Finding> {
        let depth = page.ancestors.len();
        if depth > MAX_NESTING_DEPTH {
            vec![Finding::new(
                Severity::Warning,
                Category::Nesting,
                format!("Page is nested {depth} levels deep"),
                format!("Keep pages within {MAX_NESTING_DEPTH} levels of the space root"),
            )]
        } else {
            Vec::new()
        }
    }
}
