//! Durable key-value storage holding the passcode across restarts.

use std::collections::BTreeMap;
use std::fmt::Debug;
use std::fs::File;
use std::io::{BufReader, BufWriter, ErrorKind, Write};
use std::path::{Path, PathBuf};
use log::{info, warn};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use crate::buffer::PASSCODE_MAX_LEN;

/// Slot the passcode lives in.
pub const PASSCODE_KEY: &str = "password";
/// Passcode written when the store has none.
pub const DEFAULT_PASSCODE: &str = "1234";

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("store IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("store file is not valid: {0}")]
    Json(#[from] serde_json::Error),
}

/// Named string slots. Writes are staged by [PasscodeStore::set] and only become
/// durable on [PasscodeStore::commit].
pub trait PasscodeStore: Debug {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError>;
    fn set(&mut self, key: &str, value: &str) -> Result<(), StoreError>;
    fn commit(&mut self) -> Result<(), StoreError>;
}

/// Whether `value` can be a passcode: 1 to [PASSCODE_MAX_LEN] digits.
pub fn is_valid_passcode(value: &str) -> bool {
    let len = value.chars().count();
    (1..=PASSCODE_MAX_LEN).contains(&len) && value.chars().all(|c| c.is_ascii_digit())
}

/// Reads the passcode, writing [DEFAULT_PASSCODE] first if there is no usable one.
pub fn load_passcode(store: &mut dyn PasscodeStore) -> Result<String, StoreError> {
    match store.get(PASSCODE_KEY)? {
        Some(passcode) if is_valid_passcode(&passcode) => {
            info!("Passcode found.");
            return Ok(passcode);
        }
        Some(passcode) => warn!("Stored passcode {:?} is not usable, resetting.", passcode),
        None => info!("Passcode not found, using default."),
    }

    store.set(PASSCODE_KEY, DEFAULT_PASSCODE)?;
    store.commit()?;
    Ok(DEFAULT_PASSCODE.to_string())
}

#[derive(Serialize, Deserialize, Debug, Default, Clone)]
#[serde(transparent)]
struct StoreFile {
    values: BTreeMap<String, String>,
}

/// Store kept as a flat JSON object in a single file.
#[derive(Debug)]
pub struct JsonFileStore {
    path: PathBuf,
    contents: StoreFile,
}

impl JsonFileStore {
    /// Opens the store at `path`. A missing file is an empty store.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let path = path.as_ref().to_path_buf();
        let contents = match File::open(&path) {
            Ok(file) => serde_json::from_reader(BufReader::new(file))?,
            Err(err) if err.kind() == ErrorKind::NotFound => StoreFile::default(),
            Err(err) => return Err(err.into()),
        };
        Ok(JsonFileStore { path, contents })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn write_to(&self, path: &Path) -> Result<(), StoreError> {
        let mut writer = BufWriter::new(File::create(path)?);
        serde_json::to_writer_pretty(&mut writer, &self.contents)?;
        writer.flush()?;
        writer.get_ref().sync_all()?;
        Ok(())
    }
}

impl PasscodeStore for JsonFileStore {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        Ok(self.contents.values.get(key).cloned())
    }

    fn set(&mut self, key: &str, value: &str) -> Result<(), StoreError> {
        self.contents.values.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn commit(&mut self) -> Result<(), StoreError> {
        let mut tmp = self.path.clone().into_os_string();
        tmp.push(".tmp");
        let tmp = PathBuf::from(tmp);

        let written = self
            .write_to(&tmp)
            .and_then(|()| std::fs::rename(&tmp, &self.path).map_err(StoreError::from));
        if written.is_err() {
            if let Err(err) = std::fs::remove_file(&tmp) {
                if err.kind() != ErrorKind::NotFound {
                    warn!("Could not remove {}: {}", tmp.display(), err);
                }
            }
        }
        written
    }
}

/// In-memory store that tracks what has been committed.
#[cfg(test)]
#[derive(Debug, Default)]
pub struct MemoryStore {
    staged: BTreeMap<String, String>,
    committed: BTreeMap<String, String>,
    pub commits: usize,
    pub fail_writes: bool,
}

#[cfg(test)]
impl MemoryStore {
    pub fn with(key: &str, value: &str) -> Self {
        let mut store = MemoryStore::default();
        store.staged.insert(key.to_string(), value.to_string());
        store.committed = store.staged.clone();
        store
    }

    pub fn committed(&self, key: &str) -> Option<&str> {
        self.committed.get(key).map(String::as_str)
    }
}

#[cfg(test)]
impl PasscodeStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        Ok(self.staged.get(key).cloned())
    }

    fn set(&mut self, key: &str, value: &str) -> Result<(), StoreError> {
        if self.fail_writes {
            return Err(std::io::Error::from(ErrorKind::StorageFull).into());
        }
        self.staged.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn commit(&mut self) -> Result<(), StoreError> {
        if self.fail_writes {
            return Err(std::io::Error::from(ErrorKind::StorageFull).into());
        }
        self.committed = self.staged.clone();
        self.commits += 1;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn passcode_validity() {
        assert!(is_valid_passcode("1234"));
        assert!(is_valid_passcode("0"));
        assert!(is_valid_passcode("123456789012345"));
        assert!(!is_valid_passcode("1234567890123456"));
        assert!(!is_valid_passcode(""));
        assert!(!is_valid_passcode("12a4"));
        assert!(!is_valid_passcode("12#4"));
    }

    #[test]
    fn missing_passcode_writes_default() {
        let mut store = MemoryStore::default();
        assert_eq!(load_passcode(&mut store).unwrap(), DEFAULT_PASSCODE);
        assert_eq!(store.committed(PASSCODE_KEY), Some(DEFAULT_PASSCODE));
        assert_eq!(store.commits, 1);
    }

    #[test]
    fn existing_passcode_is_kept() {
        let mut store = MemoryStore::with(PASSCODE_KEY, "9876");
        assert_eq!(load_passcode(&mut store).unwrap(), "9876");
        assert_eq!(store.commits, 0);
    }

    #[test]
    fn unusable_passcode_is_replaced() {
        let mut store = MemoryStore::with(PASSCODE_KEY, "");
        assert_eq!(load_passcode(&mut store).unwrap(), DEFAULT_PASSCODE);
        assert_eq!(store.committed(PASSCODE_KEY), Some(DEFAULT_PASSCODE));
    }

    #[test]
    fn failing_store_fails_the_load() {
        let mut store = MemoryStore { fail_writes: true, ..Default::default() };
        assert!(matches!(load_passcode(&mut store), Err(StoreError::Io(_))));
    }

    #[test]
    fn json_store_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("keylock.json");

        let mut store = JsonFileStore::open(&path).unwrap();
        assert_eq!(store.get(PASSCODE_KEY).unwrap(), None);
        store.set(PASSCODE_KEY, "5678").unwrap();
        // staged only
        assert!(!path.exists());
        store.commit().unwrap();

        let reopened = JsonFileStore::open(&path).unwrap();
        assert_eq!(reopened.get(PASSCODE_KEY).unwrap().as_deref(), Some("5678"));
        assert_eq!(reopened.path(), path);
    }

    #[test]
    fn failed_commit_leaves_no_temp_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("keylock.json");
        let mut store = JsonFileStore::open(&path).unwrap();
        // a directory in the way makes the final rename fail
        std::fs::create_dir(&path).unwrap();
        store.set(PASSCODE_KEY, "42").unwrap();

        assert!(matches!(store.commit(), Err(StoreError::Io(_))));
        assert!(!dir.path().join("keylock.json.tmp").exists());
        assert!(path.is_dir());
    }

    #[test]
    fn json_store_file_is_a_flat_object() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("keylock.json");
        let mut store = JsonFileStore::open(&path).unwrap();
        store.set(PASSCODE_KEY, "42").unwrap();
        store.commit().unwrap();

        let raw: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(raw, serde_json::json!({ "password": "42" }));
    }

    #[test]
    fn malformed_file_is_an_open_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("keylock.json");
        std::fs::write(&path, "not json").unwrap();
        assert!(matches!(JsonFileStore::open(&path), Err(StoreError::Json(_))));
    }
}
