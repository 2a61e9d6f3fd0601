//! Organizer/attendee identity resolution.
//!
//! Resolution is a pure lookup against two tables prepared before the run:
//! `aliases` (raw email → corrected email) and `names` (display name → email).
//! Nothing here prompts or writes; see [`crate::aliases`] for that.

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::LazyLock;

/// `local@domain.tld` with no whitespace anywhere.
static EMAIL: LazyLock<Result<Regex, regex::Error>> =
    LazyLock::new(|| Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@.]+$"));

/// A confirmed, deliverable identity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolvedIdentity {
    pub email: String,
    pub display_name: Option<String>,
}

/// Read-only identity lookup for one run.
#[derive(Debug, Clone, Default)]
pub struct IdentityResolver {
    aliases: BTreeMap<String, String>,
    names: BTreeMap<String, String>,
}

impl IdentityResolver {
    pub fn new(aliases: BTreeMap<String, String>, names: BTreeMap<String, String>) -> Self {
        IdentityResolver { aliases, names }
    }

    /// Resolve a raw (email, name) pair.
    ///
    /// A valid email resolves to its alias override or to itself. An invalid
    /// email needs an alias entry. A name alone needs a name entry. Anything
    /// else is unresolved (`None`).
    pub fn resolve(&self, raw_email: Option<&str>, raw_name: Option<&str>) -> Option<ResolvedIdentity> {
        let email = non_blank(raw_email);
        let name = non_blank(raw_name);

        let resolved = match email {
            Some(email) if is_valid_email(email) => Some(
                self.aliases
                    .get(email)
                    .cloned()
                    .unwrap_or_else(|| email.to_string()),
            ),
            Some(email) => self.aliases.get(email).cloned(),
            None => name.and_then(|n| self.names.get(n).cloned()),
        }?;

        Some(ResolvedIdentity {
            email: resolved,
            display_name: name.map(str::to_string),
        })
    }

    /// Whether resolving this pair would need an entry that isn't in the tables.
    pub fn needs_mapping(&self, raw_email: Option<&str>, raw_name: Option<&str>) -> bool {
        let has_input = non_blank(raw_email).is_some() || non_blank(raw_name).is_some();
        has_input && self.resolve(raw_email, raw_name).is_none()
    }
}

pub fn is_valid_email(s: &str) -> bool {
    EMAIL.as_ref().is_ok_and(|re| re.is_match(s))
}

fn non_blank(s: Option<&str>) -> Option<&str> {
    s.map(str::trim).filter(|s| !s.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn resolver() -> IdentityResolver {
        let aliases = BTreeMap::from([
            ("old@corp.example".to_string(), "new@corp.example".to_string()),
            ("Jane Doe".to_string(), "jane@corp.example".to_string()),
        ]);
        let names = BTreeMap::from([("Bob Builder".to_string(), "bob@corp.example".to_string())]);
        IdentityResolver::new(aliases, names)
    }

    #[test]
    fn test_valid_email_without_alias_is_identity() {
        let r = resolver();
        for email in ["alice@example.com", "a.b+tag@sub.example.org", "Mixed@Case.IO"] {
            let resolved = r.resolve(Some(email), None).unwrap();
            assert_eq!(resolved.email, email);
            assert_eq!(resolved.display_name, None);
        }
    }

    #[test]
    fn test_valid_email_alias_override() {
        let resolved = resolver()
            .resolve(Some("old@corp.example"), Some("Old Name"))
            .unwrap();
        assert_eq!(resolved.email, "new@corp.example");
        assert_eq!(resolved.display_name.as_deref(), Some("Old Name"));
    }

    #[test]
    fn test_invalid_email_requires_alias() {
        let r = resolver();
        assert_eq!(
            r.resolve(Some("Jane Doe"), None).map(|i| i.email).as_deref(),
            Some("jane@corp.example")
        );
        assert_eq!(r.resolve(Some("not an email"), None), None);
        // An invalid email does not fall back to the name table
        assert_eq!(r.resolve(Some("nope"), Some("Bob Builder")), None);
    }

    #[test]
    fn test_name_only_uses_name_table() {
        let r = resolver();
        let bob = r.resolve(None, Some("Bob Builder")).unwrap();
        assert_eq!(bob.email, "bob@corp.example");
        assert_eq!(bob.display_name.as_deref(), Some("Bob Builder"));
        assert_eq!(r.resolve(None, Some("Stranger")), None);
    }

    #[test]
    fn test_nothing_is_unresolved() {
        let r = resolver();
        assert_eq!(r.resolve(None, None), None);
        assert_eq!(r.resolve(Some("  "), Some("")), None);
        assert!(!r.needs_mapping(None, None));
        assert!(r.needs_mapping(None, Some("Stranger")));
    }

    #[test]
    fn test_email_syntax() {
        assert!(is_valid_email("a@b.co"));
        assert!(!is_valid_email("a@b"));
        assert!(!is_valid_email("@b.co"));
        assert!(!is_valid_email("a@.co"));
        assert!(!is_valid_email("a@b."));
        assert!(!is_valid_email("a b@c.de"));
        assert!(!is_valid_email("a@b@c.de"));
        assert!(!is_valid_email("plainname"));
        assert!(!is_valid_email("a@b.co."));
        assert!(!is_valid_email("a@b.co\n"));
    }
}
