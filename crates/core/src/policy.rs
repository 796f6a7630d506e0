//! Write gating
//!
//! Mutations are disabled unless explicitly enabled, and may further be restricted to an
//! allowlist of space keys. The allowlist applies to every write, whichever way the target
//! space is learned: from the arguments (create) or from the page being modified.

use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PolicyError {
    #[error("Write operations are disabled. Set CONFLUENCE_ENABLE_WRITES=true to enable {0}.")]
    WritesDisabled(String),

    #[error("Space '{space}' is not in the allowed spaces list for {operation}: {allowed}")]
    SpaceNotAllowed {
        operation: String,
        space: String,
        allowed: String,
    },
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WritePolicy {
    pub enabled: bool,
    /// Empty means every space is allowed
    pub allowed_spaces: Vec<String>,
}

impl WritePolicy {
    pub fn new(enabled: bool, allowed_spaces: Vec<String>) -> Self {
        Self {
            enabled,
            allowed_spaces,
        }
    }

    /// Parse a comma separated allowlist, ignoring blanks
    pub fn parse_allowed_spaces(raw: &str) -> Vec<String> {
        raw.split(',')
            .map(str::trim)
            .filter(|key| !key.is_empty())
            .map(str::to_string)
            .collect()
    }

    pub fn has_allowlist(&self) -> bool {
        !self.allowed_spaces.is_empty()
    }

    /// Whether `space_key` passes the allowlist. Keys compare exactly: personal space keys
    /// (`~accountid`) are case-significant.
    pub fn allows_space(&self, space_key: &str) -> bool {
        !self.has_allowlist() || self.allowed_spaces.iter().any(|allowed| allowed == space_key)
    }

    /// Check a write before it is sent
    ///
    /// Dry runs are always permitted. `space_key` is `None` only when no allowlist is
    /// configured; callers resolve the page's space otherwise.
    pub fn authorize(
        &self,
        operation: &str,
        space_key: Option<&str>,
        dry_run: bool,
    ) -> Result<(), PolicyError> {
        if dry_run {
            return Ok(());
        }

        if !self.enabled {
            return Err(PolicyError::WritesDisabled(operation.to_string()));
        }

        match space_key {
            Some(space) if !self.allows_space(space) => Err(PolicyError::SpaceNotAllowed {
                operation: operation.to_string(),
                space: space.to_string(),
                allowed: self.allowed_spaces.join(", "),
            }),
            _ => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_allowed_spaces() {
        assert_eq!(
            WritePolicy::parse_allowed_spaces(" DOC, ,OPS ,"),
            vec!["DOC".to_string(), "OPS".to_string()]
        );
        assert!(WritePolicy::parse_allowed_spaces("").is_empty());
    }

    #[test]
    fn test_disabled_blocks_live_writes() {
        let policy = WritePolicy::default();
        assert_eq!(
            policy.authorize("create_page", Some("DOC"), false),
            Err(PolicyError::WritesDisabled("create_page".to_string()))
        );
    }

    #[test]
    fn test_dry_run_bypasses_policy() {
        let policy = WritePolicy::new(false, vec!["OPS".to_string()]);
        assert!(policy.authorize("update_page", Some("DOC"), true).is_ok());
    }

    #[test]
    fn test_allowlist_applies_to_updates_too() {
        let policy = WritePolicy::new(true, vec!["OPS".to_string()]);

        assert!(policy.authorize("create_page", Some("OPS"), false).is_ok());
        assert!(matches!(
            policy.authorize("update_page", Some("DOC"), false),
            Err(PolicyError::SpaceNotAllowed { .. })
        ));
    }

    #[test]
    fn test_space_keys_are_case_sensitive() {
        let policy = WritePolicy::new(
            true,
            vec!["OPS".to_string(), "~5b10ac8d82e05b22cc7d4ef5".to_string()],
        );

        assert!(policy.allows_space("~5b10ac8d82e05b22cc7d4ef5"));
        assert!(!policy.allows_space("~5B10AC8D82E05B22CC7D4EF5"));
        assert!(!policy.allows_space("ops"));
    }

    #[test]
    fn test_enabled_without_allowlist() {
        let policy = WritePolicy::new(true, vec![]);
        assert!(policy.authorize("archive_page", None, false).is_ok());
        assert!(policy.allows_space("ANY"));
    }
}
