//! Core library for confluence-mcp
//!
//! This crate is the **Functional Core** of the project, following the Functional Core -
//! Imperative Shell pattern used across the workspace:
//!
//! - **`confluence_mcp_core`** (this crate): pure transformation functions with zero I/O
//! - **`confluence-mcp`**: HTTP access, configuration, CLI and the MCP server
//!
//! Nothing here touches the network or the environment. Raw Confluence responses come in,
//! stable records, write payloads, findings and suggestions go out, so everything is
//! testable with fixture data.
//!
//! # Module Organization
//!
//! - [`confluence`]: raw API models, the result normalizer and write payload builders
//! - [`policy`]: write gating (enable flag and space allowlist)
//! - [`analysis`]: rule-based content quality analysis
//! - [`suggestions`]: remediation actions for analysis findings
//!
//! # Example Usage
//!
//! ```rust,ignore
//! use confluence_mcp_core::analysis::analyze;
//! use confluence_mcp_core::confluence::normalize::normalize_page;
//! use confluence_mcp_core::suggestions::generate_suggestions;
//!
//! let page = normalize_page(raw_content, "https://acme.atlassian.net");
//! let report = analyze(&page);
//! let suggestions = generate_suggestions(&report);
//!
//! assert_eq!(suggestions.suggestions.len(), report.findings.len());
//! ```

pub mod analysis;
pub mod confluence;
pub mod policy;
pub mod suggestions;
