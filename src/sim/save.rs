/// Clear flags: the only thing kept between runs.
///
/// Each normal protagonist gets a `cleared_<protagonist>=true` entry
/// once its true ending is reached. When every normal protagonist is
/// cleared the hidden scenario shows up on the title screen.
///
/// ## File format:
///   Key-value lines in `clears.dat`, e.g.
///   ```
///   cleared_ショウ編=true
///   cleared_しょう編=true
///   ```
///
/// Writes rewrite the whole file. Writing the same flag twice is
/// harmless, so callers never retry.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use crate::domain::cast::Cast;
use crate::error::SaveError;

const CLEARS_FILE: &str = "clears.dat";

/// Key-value persistence capability.
pub trait KeyValueStore {
    fn get(&self, key: &str) -> Option<String>;
    fn set(&mut self, key: &str, value: &str) -> Result<(), SaveError>;
}

// ══════════════════════════════════════════════════════════════
// Clear flags
// ══════════════════════════════════════════════════════════════

pub fn clear_key(protagonist: &str) -> String {
    format!("cleared_{}", protagonist)
}

pub fn record_clear(store: &mut dyn KeyValueStore, protagonist: &str) -> Result<(), SaveError> {
    store.set(&clear_key(protagonist), "true")
}

pub fn is_cleared(store: &dyn KeyValueStore, protagonist: &str) -> bool {
    store.get(&clear_key(protagonist)).as_deref() == Some("true")
}

/// Every normal protagonist cleared. A cast with no normal protagonists
/// never unlocks anything.
pub fn hidden_unlocked(store: &dyn KeyValueStore, cast: &Cast) -> bool {
    !cast.protagonists.is_empty()
        && cast.protagonists.iter().all(|p| is_cleared(store, p))
}

// ══════════════════════════════════════════════════════════════
// In-memory store
// ══════════════════════════════════════════════════════════════

#[derive(Clone, Debug, Default)]
pub struct MemoryStore {
    entries: BTreeMap<String, String>,
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Option<String> {
        self.entries.get(key).cloned()
    }

    fn set(&mut self, key: &str, value: &str) -> Result<(), SaveError> {
        self.entries.insert(key.to_string(), value.to_string());
        Ok(())
    }
}

// ══════════════════════════════════════════════════════════════
// File store
// ══════════════════════════════════════════════════════════════

#[derive(Clone, Debug)]
pub struct FileStore {
    path: PathBuf,
    entries: BTreeMap<String, String>,
}

impl FileStore {
    /// Open `clears.dat` in the save directory.
    pub fn open_default() -> Self {
        Self::open(save_dir().join(CLEARS_FILE))
    }

    /// A missing or unreadable file is an empty store.
    pub fn open(path: PathBuf) -> Self {
        let entries = match std::fs::read_to_string(&path) {
            Ok(content) => parse(&content),
            Err(e) => {
                if e.kind() != std::io::ErrorKind::NotFound {
                    tracing::warn!("could not read {}: {e}", path.display());
                }
                BTreeMap::new()
            }
        };
        FileStore { path, entries }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl KeyValueStore for FileStore {
    fn get(&self, key: &str) -> Option<String> {
        self.entries.get(key).cloned()
    }

    fn set(&mut self, key: &str, value: &str) -> Result<(), SaveError> {
        self.entries.insert(key.to_string(), value.to_string());
        std::fs::write(&self.path, serialize(&self.entries)).map_err(|source| SaveError::Io {
            path: self.path.clone(),
            source,
        })
    }
}

/// Directory for clears and the log file.
pub fn save_dir() -> PathBuf {
    // 1. Try exe directory (works for local/portable installs)
    if let Ok(exe) = std::env::current_exe() {
        let resolved = exe.canonicalize().unwrap_or(exe);
        if let Some(parent) = resolved.parent() {
            // System installs like /usr/games/ won't be writable
            let test_path = parent.join(".write_test_kamishibai");
            if std::fs::write(&test_path, "").is_ok() {
                let _ = std::fs::remove_file(&test_path);
                return parent.to_path_buf();
            }
        }
    }

    // 2. XDG data home
    if let Ok(home) = std::env::var("HOME") {
        let xdg = PathBuf::from(&home).join(".local/share/kamishibai");
        if std::fs::create_dir_all(&xdg).is_ok() {
            return xdg;
        }
    }

    // 3. CWD
    std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."))
}

fn serialize(entries: &BTreeMap<String, String>) -> String {
    let mut out = String::new();
    for (k, v) in entries {
        out.push_str(&format!("{}={}\n", k, v));
    }
    out
}

fn parse(content: &str) -> BTreeMap<String, String> {
    content
        .lines()
        .filter_map(|line| {
            let (k, v) = line.trim().split_once('=')?;
            let k = k.trim();
            if k.is_empty() || k.starts_with('#') {
                None
            } else {
                Some((k.to_string(), v.trim().to_string()))
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unlock_needs_every_normal_protagonist() {
        let cast = Cast::default();
        let mut store = MemoryStore::default();
        assert!(!hidden_unlocked(&store, &cast));

        record_clear(&mut store, "ショウ編").unwrap();
        assert!(!hidden_unlocked(&store, &cast));

        record_clear(&mut store, "しょう編").unwrap();
        assert!(hidden_unlocked(&store, &cast));
    }

    #[test]
    fn only_literal_true_counts() {
        let mut store = MemoryStore::default();
        store.set("cleared_A", "yes").unwrap();
        assert!(!is_cleared(&store, "A"));
        store.set("cleared_A", "true").unwrap();
        assert!(is_cleared(&store, "A"));
    }

    #[test]
    fn empty_cast_never_unlocks() {
        let cast = Cast { protagonists: vec![], ..Cast::default() };
        assert!(!hidden_unlocked(&MemoryStore::default(), &cast));
    }

    #[test]
    fn file_store_persists_across_opens() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(CLEARS_FILE);

        let mut store = FileStore::open(path.clone());
        assert_eq!(store.get("cleared_A"), None);
        record_clear(&mut store, "A").unwrap();
        record_clear(&mut store, "A").unwrap();

        let reopened = FileStore::open(path.clone());
        assert!(is_cleared(&reopened, "A"));
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "cleared_A=true\n");
    }

    #[test]
    fn parse_skips_junk_lines() {
        let m = parse("# comment\n\ncleared_A = true\nnonsense\n=x\n");
        assert_eq!(m.len(), 1);
        assert_eq!(m.get("cleared_A").map(String::as_str), Some("true"));
    }

    #[test]
    fn write_failure_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = FileStore::open(dir.path().join("no/such/dir/clears.dat"));
        assert!(matches!(store.set("k", "v"), Err(SaveError::Io { .. })));
    }
}
