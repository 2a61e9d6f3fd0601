//! Identity lookup tables on disk, and the preparation phase that fills them.
//!
//! Two JSON objects are kept side by side:
//!   aliases.json  raw email → corrected email
//!   names.json    display name → email
//!
//! Both are written sorted by key so that diffs stay small. The tables are
//! only mutated here, before conversion starts; conversion itself gets a
//! read-only [`IdentityResolver`].

use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};

use crate::convert::is_materialized_instance;
use crate::error::{IcsPortError, IcsPortResult};
use crate::event::{CalendarEvent, Identity};
use crate::identity::{IdentityResolver, is_valid_email};

/// Source of answers for identities the tables don't cover.
///
/// Implementations may return `Ok(None)` to leave an identity unmapped.
pub trait Prompter {
    /// Ask for the real address behind a malformed one.
    fn email_for_address(&mut self, raw_address: &str) -> IcsPortResult<Option<String>>;

    /// Ask for the address of someone only known by name.
    fn email_for_name(&mut self, name: &str) -> IcsPortResult<Option<String>>;
}

pub struct AliasStore {
    aliases_path: PathBuf,
    names_path: PathBuf,
    aliases: BTreeMap<String, String>,
    names: BTreeMap<String, String>,
}

impl AliasStore {
    /// Load both tables. Missing files are treated as empty tables.
    pub fn load(aliases_path: &Path, names_path: &Path) -> IcsPortResult<Self> {
        Ok(AliasStore {
            aliases: load_table(aliases_path)?,
            names: load_table(names_path)?,
            aliases_path: aliases_path.to_path_buf(),
            names_path: names_path.to_path_buf(),
        })
    }

    pub fn save(&self) -> IcsPortResult<()> {
        save_table(&self.aliases_path, &self.aliases)?;
        save_table(&self.names_path, &self.names)?;
        Ok(())
    }

    /// Snapshot the tables into a resolver for one run.
    pub fn resolver(&self) -> IdentityResolver {
        IdentityResolver::new(self.aliases.clone(), self.names.clone())
    }

    pub fn aliases(&self) -> &BTreeMap<String, String> {
        &self.aliases
    }

    pub fn names(&self) -> &BTreeMap<String, String> {
        &self.names
    }
}

/// Outcome of a preparation pass.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct PrepareSummary {
    pub aliases_added: usize,
    pub names_added: usize,
    /// Identities left unmapped (declined or invalid answers)
    pub skipped: usize,
}

impl PrepareSummary {
    pub fn changed(&self) -> bool {
        self.aliases_added > 0 || self.names_added > 0
    }
}

/// Ask `prompter` about every organizer/attendee that wouldn't resolve, then
/// save the tables if anything was added.
pub fn prepare(
    store: &mut AliasStore,
    events: &[CalendarEvent],
    prompter: &mut dyn Prompter,
) -> IcsPortResult<PrepareSummary> {
    let resolver = store.resolver();
    let mut summary = PrepareSummary::default();
    let mut seen = BTreeSet::new();

    let identities = events
        .iter()
        .filter(|e| {
            e.is_recurrence_exception()
                || !e.uid.as_deref().is_some_and(is_materialized_instance)
        })
        .flat_map(|e| e.organizer.iter().chain(e.attendees.iter()));

    for identity in identities {
        if !resolver.needs_mapping(identity.email.as_deref(), identity.name.as_deref()) {
            continue;
        }

        let Some(missing) = MissingEntry::from_identity(identity) else {
            continue;
        };
        if !seen.insert(missing.clone()) {
            continue;
        }

        let answer = match &missing {
            MissingEntry::Address(raw) => prompter.email_for_address(raw)?,
            MissingEntry::Name(name) => prompter.email_for_name(name)?,
        };

        let Some(email) = answer.map(|a| a.trim().to_string()) else {
            summary.skipped += 1;
            continue;
        };
        if !is_valid_email(&email) {
            log::warn!("Ignoring invalid address '{}' for {:?}", email, missing);
            summary.skipped += 1;
            continue;
        }

        match missing {
            MissingEntry::Address(raw) => {
                store.aliases.insert(raw, email);
                summary.aliases_added += 1;
            }
            MissingEntry::Name(name) => {
                store.names.insert(name, email);
                summary.names_added += 1;
            }
        }
    }

    if summary.changed() {
        store.save()?;
        log::info!(
            "Saved {} new aliases and {} new names",
            summary.aliases_added,
            summary.names_added
        );
    }

    Ok(summary)
}

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
enum MissingEntry {
    Address(String),
    Name(String),
}

impl MissingEntry {
    fn from_identity(identity: &Identity) -> Option<Self> {
        let email = identity.email.as_deref().map(str::trim).filter(|s| !s.is_empty());
        let name = identity.name.as_deref().map(str::trim).filter(|s| !s.is_empty());

        match (email, name) {
            (Some(email), _) => Some(MissingEntry::Address(email.to_string())),
            (None, Some(name)) => Some(MissingEntry::Name(name.to_string())),
            (None, None) => None,
        }
    }
}

fn load_table(path: &Path) -> IcsPortResult<BTreeMap<String, String>> {
    if !path.exists() {
        return Ok(BTreeMap::new());
    }

    let contents = std::fs::read_to_string(path)?;
    if contents.trim().is_empty() {
        return Ok(BTreeMap::new());
    }

    serde_json::from_str(&contents)
        .map_err(|e| IcsPortError::AliasStore(format!("{}: {}", path.display(), e)))
}

fn save_table(path: &Path, table: &BTreeMap<String, String>) -> IcsPortResult<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let mut contents = serde_json::to_string_pretty(table)?;
    contents.push('\n');
    std::fs::write(path, contents)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::VecDeque;

    /// Replays canned answers and records what was asked.
    struct ScriptedPrompter {
        answers: VecDeque<Option<String>>,
        asked: Vec<String>,
    }

    impl ScriptedPrompter {
        fn new(answers: &[Option<&str>]) -> Self {
            ScriptedPrompter {
                answers: answers.iter().map(|a| a.map(str::to_string)).collect(),
                asked: Vec::new(),
            }
        }
    }

    impl Prompter for ScriptedPrompter {
        fn email_for_address(&mut self, raw: &str) -> IcsPortResult<Option<String>> {
            self.asked.push(format!("address:{}", raw));
            Ok(self.answers.pop_front().flatten())
        }

        fn email_for_name(&mut self, name: &str) -> IcsPortResult<Option<String>> {
            self.asked.push(format!("name:{}", name));
            Ok(self.answers.pop_front().flatten())
        }
    }

    fn identity(email: Option<&str>, name: Option<&str>) -> Identity {
        Identity {
            email: email.map(str::to_string),
            name: name.map(str::to_string),
            status: None,
        }
    }

    fn event(uid: &str, organizer: Identity, attendees: Vec<Identity>) -> CalendarEvent {
        CalendarEvent {
            uid: Some(uid.to_string()),
            organizer: Some(organizer),
            attendees,
            ..Default::default()
        }
    }

    #[test]
    fn test_missing_files_load_as_empty() {
        let dir = tempfile::tempdir().unwrap();
        let store = AliasStore::load(&dir.path().join("a.json"), &dir.path().join("n.json")).unwrap();
        assert!(store.aliases().is_empty());
        assert!(store.names().is_empty());
    }

    #[test]
    fn test_prepare_asks_once_per_identity_and_saves_sorted() {
        let dir = tempfile::tempdir().unwrap();
        let aliases_path = dir.path().join("aliases.json");
        let names_path = dir.path().join("names.json");
        let mut store = AliasStore::load(&aliases_path, &names_path).unwrap();

        let events = vec![
            event(
                "1",
                identity(None, Some("Zed")),
                vec![
                    identity(Some("ok@example.com"), None),
                    identity(Some("broken address"), None),
                ],
            ),
            event("2", identity(None, Some("Zed")), vec![identity(None, Some("Amy"))]),
        ];

        let mut prompter = ScriptedPrompter::new(&[
            Some("zed@example.com"),
            Some("fixed@example.com"),
            Some("amy@example.com"),
        ]);
        let summary = prepare(&mut store, &events, &mut prompter).unwrap();

        assert_eq!(
            prompter.asked,
            vec!["name:Zed", "address:broken address", "name:Amy"]
        );
        assert_eq!(summary.aliases_added, 1);
        assert_eq!(summary.names_added, 2);

        let names_json = std::fs::read_to_string(&names_path).unwrap();
        let amy = names_json.find("Amy").unwrap();
        let zed = names_json.find("Zed").unwrap();
        assert!(amy < zed, "names.json should be sorted by key");

        let reloaded = AliasStore::load(&aliases_path, &names_path).unwrap();
        let resolver = reloaded.resolver();
        assert_eq!(
            resolver.resolve(Some("broken address"), None).unwrap().email,
            "fixed@example.com"
        );
        assert_eq!(resolver.resolve(None, Some("Zed")).unwrap().email, "zed@example.com");
    }

    #[test]
    fn test_prepare_skips_declined_and_invalid_answers() {
        let dir = tempfile::tempdir().unwrap();
        let aliases_path = dir.path().join("aliases.json");
        let mut store = AliasStore::load(&aliases_path, &dir.path().join("names.json")).unwrap();

        let events = vec![event(
            "1",
            identity(None, Some("Nobody")),
            vec![identity(None, Some("Typo"))],
        )];
        let mut prompter = ScriptedPrompter::new(&[None, Some("not an email")]);
        let summary = prepare(&mut store, &events, &mut prompter).unwrap();

        assert_eq!(summary.skipped, 2);
        assert!(!summary.changed());
        assert!(!aliases_path.exists(), "nothing added, nothing written");
    }

    #[test]
    fn test_prepare_ignores_materialized_occurrences() {
        let dir = tempfile::tempdir().unwrap();
        let mut store =
            AliasStore::load(&dir.path().join("a.json"), &dir.path().join("n.json")).unwrap();

        let events = vec![event("series_R20250101", identity(None, Some("Ghost")), vec![])];
        let mut prompter = ScriptedPrompter::new(&[]);
        prepare(&mut store, &events, &mut prompter).unwrap();

        assert!(prompter.asked.is_empty());
    }

    #[test]
    fn test_corrupt_table_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("aliases.json");
        std::fs::write(&path, "[1, 2").unwrap();

        let result = AliasStore::load(&path, &dir.path().join("n.json"));
        assert!(matches!(result, Err(IcsPortError::AliasStore(_))));
    }
}
