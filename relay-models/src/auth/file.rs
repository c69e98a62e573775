//! JSON-file credential store with change notifications.

use std::collections::BTreeMap;
use std::ffi::OsString;
use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use fs2::FileExt;
use notify::{RecommendedWatcher, RecursiveMode, Watcher, recommended_watcher};
use tokio::sync::broadcast;
use tracing::{debug, warn};

use super::store::{EVENT_CAPACITY, KeyValueStore, StoreEvent};
use crate::Result;

/// Credential store persisted as a flat JSON object.
///
/// The file is re-read on every access, so edits made by another process
/// (or by hand) are visible immediately. Writes go through an owner-only
/// temporary file and a rename. Read-modify-write cycles are serialized
/// within the process by a mutex and across processes by an advisory lock
/// on a `<file>.lock` sidecar.
#[derive(Debug, Clone)]
pub struct FileStore {
    path: PathBuf,
    write_lock: Arc<Mutex<()>>,
}

impl FileStore {
    /// Create a store backed by `path`. The file need not exist yet.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            write_lock: Arc::new(Mutex::new(())),
        }
    }

    /// Store at the default location (`<config_dir>/credentials.json`).
    pub fn at_default_location() -> Self {
        Self::new(relay_paths::credentials_path())
    }

    /// Path of the backing file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Start watching the backing file.
    ///
    /// Each observed change is diffed against the previous contents and
    /// produces one [`StoreEvent`] per changed key. A deleted file produces a
    /// single clear event.
    ///
    /// A file that turns up empty while the previous contents were not is
    /// treated as the middle of an in-place rewrite and skipped. Clear the
    /// store by deleting the file or writing `{}`.
    pub fn watch(&self) -> Result<StoreWatcher> {
        let dir = self.parent_dir();
        std::fs::create_dir_all(&dir)?;

        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        let snapshot = Mutex::new(read_snapshot(&self.path).unwrap_or_default());
        let path = self.path.clone();
        let file_name = self.path.file_name().map(|n| n.to_os_string());
        let tx = events.clone();

        let mut watcher = recommended_watcher(move |event: notify::Result<notify::Event>| {
            let event = match event {
                Ok(event) => event,
                Err(e) => {
                    warn!(error = %e, "credential store watch error");
                    return;
                }
            };
            if !event
                .paths
                .iter()
                .any(|p| p.file_name().map(|n| n.to_os_string()) == file_name)
            {
                return;
            }

            let contents = match read_contents(&path) {
                Ok(contents) => contents,
                Err(e) => {
                    warn!(error = %e, "failed to read credential store");
                    return;
                }
            };

            let mut previous = snapshot.lock().unwrap_or_else(|e| e.into_inner());
            if is_truncated(contents.as_deref(), &previous) {
                debug!("skipping truncated credential store");
                return;
            }
            let current = match parse_snapshot(contents) {
                Ok(current) => current,
                Err(e) => {
                    // Likely a partial write; the next event will carry the rest.
                    debug!(error = %e, "skipping unreadable credential store");
                    return;
                }
            };

            for change in diff_snapshots(&previous, &current) {
                debug!(key = ?change.key, "credential store changed");
                let _ = tx.send(change);
            }
            *previous = current;
        })?;

        watcher.watch(&dir, RecursiveMode::NonRecursive)?;
        debug!(path = %self.path.display(), "watching credential store");

        Ok(StoreWatcher {
            _watcher: watcher,
            events,
        })
    }

    fn read_map(&self) -> Result<BTreeMap<String, String>> {
        Ok(read_snapshot(&self.path)?.unwrap_or_default())
    }

    fn parent_dir(&self) -> PathBuf {
        self.path
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from("."))
    }

    /// Run `change` against the current map and persist the result if it
    /// reports a modification.
    fn update(&self, change: impl FnOnce(&mut BTreeMap<String, String>) -> bool) -> Result<()> {
        let _guard = self.write_lock.lock().unwrap_or_else(|e| e.into_inner());
        let dir = self.parent_dir();
        std::fs::create_dir_all(&dir)?;
        let lock = self.lock_file()?;

        let mut map = self.read_map()?;
        if change(&mut map) {
            self.write_map(&dir, &map)?;
        }
        drop(lock);
        Ok(())
    }

    /// Open the sidecar lock file and take an exclusive advisory lock on it.
    /// The lock is released when the returned handle is dropped.
    fn lock_file(&self) -> Result<File> {
        let mut name = self
            .path
            .file_name()
            .map(OsString::from)
            .unwrap_or_else(|| OsString::from("credentials"));
        name.push(".lock");
        let file = OpenOptions::new()
            .create(true)
            .truncate(false)
            .write(true)
            .open(self.path.with_file_name(name))?;
        FileExt::lock_exclusive(&file)?;
        Ok(file)
    }

    fn write_map(&self, dir: &Path, map: &BTreeMap<String, String>) -> Result<()> {
        let json = serde_json::to_string_pretty(map)?;
        // NamedTempFile is created 0600 on unix and keeps that mode across the rename.
        let mut tmp = tempfile::NamedTempFile::new_in(dir)?;
        tmp.write_all(json.as_bytes())?;
        tmp.as_file().sync_all()?;
        tmp.persist(&self.path).map_err(|e| e.error)?;
        Ok(())
    }
}

impl KeyValueStore for FileStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        Ok(self.read_map()?.remove(key))
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        self.update(|map| {
            map.insert(key.to_string(), value.to_string());
            true
        })
    }

    fn remove(&self, key: &str) -> Result<()> {
        self.update(|map| map.remove(key).is_some())
    }

    fn keys(&self) -> Result<Vec<String>> {
        Ok(self.read_map()?.into_keys().collect())
    }
}

/// Live watch on a [`FileStore`]. Dropping it stops the watch.
pub struct StoreWatcher {
    _watcher: RecommendedWatcher,
    events: broadcast::Sender<StoreEvent>,
}

impl StoreWatcher {
    /// Subscribe to change events.
    pub fn subscribe(&self) -> broadcast::Receiver<StoreEvent> {
        self.events.subscribe()
    }
}

type Snapshot = Option<BTreeMap<String, String>>;

/// Raw file contents; `Ok(None)` when it does not exist.
fn read_contents(path: &Path) -> Result<Option<String>> {
    match std::fs::read_to_string(path) {
        Ok(contents) => Ok(Some(contents)),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(e.into()),
    }
}

fn parse_snapshot(contents: Option<String>) -> Result<Snapshot> {
    match contents {
        None => Ok(None),
        Some(contents) if contents.trim().is_empty() => Ok(Some(BTreeMap::new())),
        Some(contents) => Ok(Some(serde_json::from_str(&contents)?)),
    }
}

fn read_snapshot(path: &Path) -> Result<Snapshot> {
    parse_snapshot(read_contents(path)?)
}

/// An empty file replacing non-empty contents is a truncate in progress.
fn is_truncated(contents: Option<&str>, previous: &Snapshot) -> bool {
    contents.is_some_and(|c| c.trim().is_empty())
        && previous.as_ref().is_some_and(|old| !old.is_empty())
}

fn diff_snapshots(previous: &Snapshot, current: &Snapshot) -> Vec<StoreEvent> {
    let empty = BTreeMap::new();
    match (previous, current) {
        (Some(old), None) if !old.is_empty() => vec![StoreEvent::cleared()],
        _ => {
            let old = previous.as_ref().unwrap_or(&empty);
            let new = current.as_ref().unwrap_or(&empty);
            let mut keys: Vec<&String> = old.keys().chain(new.keys()).collect();
            keys.sort();
            keys.dedup();
            keys.into_iter()
                .filter(|k| old.get(*k) != new.get(*k))
                .map(|k| StoreEvent::changed(k.as_str()))
                .collect()
        }
    }
}
