//! Import checkpoint: the index of the last confirmed delivery for a document.
//!
//! Stored next to the source document as `<document>.checkpoint`, holding a
//! single decimal number.

use std::ffi::OsString;
use std::path::{Path, PathBuf};

use crate::error::{IcsPortError, IcsPortResult};

const CHECKPOINT_EXTENSION: &str = ".checkpoint";

#[derive(Debug, Clone)]
pub struct CheckpointStore {
    path: PathBuf,
}

impl CheckpointStore {
    /// Checkpoint for the given source document (ICS or NDJSON).
    pub fn for_document(document: &Path) -> Self {
        let mut name = OsString::from(document.as_os_str());
        name.push(CHECKPOINT_EXTENSION);
        CheckpointStore {
            path: PathBuf::from(name),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Last confirmed index, or `None` if no run has confirmed anything yet.
    pub fn load(&self) -> IcsPortResult<Option<usize>> {
        if !self.path.exists() {
            return Ok(None);
        }

        let content = std::fs::read_to_string(&self.path)?;
        let trimmed = content.trim();
        trimmed
            .parse::<usize>()
            .map(Some)
            .map_err(|_| IcsPortError::CorruptCheckpoint {
                path: self.path.clone(),
                content: trimmed.to_string(),
            })
    }

    pub fn save(&self, index: usize) -> IcsPortResult<()> {
        let mut temp = OsString::from(self.path.as_os_str());
        temp.push(".tmp");
        let temp = PathBuf::from(temp);

        std::fs::write(&temp, index.to_string())?;
        std::fs::rename(&temp, &self.path)?;
        Ok(())
    }

    /// Remove the checkpoint. Missing files are fine.
    pub fn clear(&self) -> IcsPortResult<bool> {
        match std::fs::remove_file(&self.path) {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sidecar_path() {
        let store = CheckpointStore::for_document(Path::new("/data/export.ics"));
        assert_eq!(store.path(), Path::new("/data/export.ics.checkpoint"));
    }

    #[test]
    fn test_save_load_clear() {
        let dir = tempfile::tempdir().unwrap();
        let store = CheckpointStore::for_document(&dir.path().join("cal.jsonl"));

        assert_eq!(store.load().unwrap(), None);

        store.save(0).unwrap();
        assert_eq!(store.load().unwrap(), Some(0));

        store.save(41).unwrap();
        assert_eq!(store.load().unwrap(), Some(41));
        assert_eq!(std::fs::read_to_string(store.path()).unwrap(), "41");

        assert!(store.clear().unwrap());
        assert_eq!(store.load().unwrap(), None);
        assert!(!store.clear().unwrap());
    }

    #[test]
    fn test_trailing_newline_is_accepted() {
        let dir = tempfile::tempdir().unwrap();
        let store = CheckpointStore::for_document(&dir.path().join("cal.ics"));
        std::fs::write(store.path(), "7\n").unwrap();
        assert_eq!(store.load().unwrap(), Some(7));
    }

    #[test]
    fn test_corrupt_checkpoint() {
        let dir = tempfile::tempdir().unwrap();
        let store = CheckpointStore::for_document(&dir.path().join("cal.ics"));
        std::fs::write(store.path(), "-3").unwrap();

        match store.load() {
            Err(IcsPortError::CorruptCheckpoint { content, .. }) => assert_eq!(content, "-3"),
            other => panic!("Expected corrupt checkpoint, got {:?}", other),
        }
    }
}
