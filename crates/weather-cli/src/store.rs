use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::config::SNAPSHOT_KEY;
use crate::model::ForecastSnapshot;

/// Key-value surface shared between the fetching process and display surfaces.
///
/// Each key is replaced atomically; there is no multi-key transaction.
pub trait SnapshotStore {
    fn put(&self, key: &str, bytes: &[u8]) -> Result<(), StoreWriteError>;
    fn get(&self, key: &str) -> io::Result<Option<Vec<u8>>>;
}

impl<S: SnapshotStore + ?Sized> SnapshotStore for &S {
    fn put(&self, key: &str, bytes: &[u8]) -> Result<(), StoreWriteError> {
        (**self).put(key, bytes)
    }

    fn get(&self, key: &str) -> io::Result<Option<Vec<u8>>> {
        (**self).get(key)
    }
}

#[derive(Debug, Error)]
pub enum StoreWriteError {
    #[error("invalid store key '{0}'")]
    InvalidKey(String),
    #[error("failed to serialize snapshot: {0}")]
    Serialize(#[from] serde_json::Error),
    #[error("failed to write {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// One JSON file per key under `<root>/<namespace>/`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileSnapshotStore {
    dir: PathBuf,
}

impl FileSnapshotStore {
    pub fn new(root: &Path, namespace: &str) -> Self {
        Self {
            dir: root.join(namespace),
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn path_for(&self, key: &str) -> Option<PathBuf> {
        is_valid_key(key).then(|| self.dir.join(format!("{key}.json")))
    }
}

impl SnapshotStore for FileSnapshotStore {
    fn put(&self, key: &str, bytes: &[u8]) -> Result<(), StoreWriteError> {
        let path = self
            .path_for(key)
            .ok_or_else(|| StoreWriteError::InvalidKey(key.to_string()))?;
        write_atomic(&path, bytes).map_err(|source| StoreWriteError::Io { path, source })
    }

    fn get(&self, key: &str) -> io::Result<Option<Vec<u8>>> {
        let Some(path) = self.path_for(key) else {
            return Ok(None);
        };

        match fs::read(&path) {
            Ok(bytes) => Ok(Some(bytes)),
            Err(error) if error.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(error) => Err(error),
        }
    }
}

fn is_valid_key(key: &str) -> bool {
    !key.is_empty()
        && key != "."
        && key != ".."
        && !key.contains(['/', '\\'])
}

fn write_atomic(path: &Path, bytes: &[u8]) -> io::Result<()> {
    let parent = path.parent().ok_or_else(|| {
        io::Error::new(
            io::ErrorKind::InvalidInput,
            "store path must have a parent directory",
        )
    })?;
    fs::create_dir_all(parent)?;

    let tmp_path = path.with_extension(format!("{}.tmp", std::process::id()));
    fs::write(&tmp_path, bytes)?;
    fs::rename(&tmp_path, path).inspect_err(|_| {
        let _ = fs::remove_file(&tmp_path);
    })
}

pub fn save_snapshot<S>(store: &S, snapshot: &ForecastSnapshot) -> Result<(), StoreWriteError>
where
    S: SnapshotStore + ?Sized,
{
    let payload = snapshot.to_json_vec()?;
    store.put(SNAPSHOT_KEY, &payload)
}

/// Latest shared snapshot; unreadable or corrupt payloads read as absent.
pub fn load_snapshot<S>(store: &S) -> Option<ForecastSnapshot>
where
    S: SnapshotStore + ?Sized,
{
    let bytes = match store.get(SNAPSHOT_KEY) {
        Ok(Some(bytes)) => bytes,
        Ok(None) => return None,
        Err(error) => {
            tracing::warn!(%error, "failed to read shared snapshot");
            return None;
        }
    };

    match ForecastSnapshot::from_json_slice(&bytes) {
        Ok(snapshot) => Some(snapshot),
        Err(error) => {
            tracing::warn!(%error, "ignoring corrupt shared snapshot");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SHARED_NAMESPACE;
    use crate::model::tests::{fixture_snapshot, full_precision_snapshot};

    fn store_in(dir: &tempfile::TempDir) -> FileSnapshotStore {
        FileSnapshotStore::new(dir.path(), SHARED_NAMESPACE)
    }

    #[test]
    fn store_get_without_put_is_none() {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = store_in(&dir);

        assert_eq!(store.get(SNAPSHOT_KEY).expect("get"), None);
        assert_eq!(load_snapshot(&store), None);
    }

    #[test]
    fn store_get_returns_last_put_bytes() {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = store_in(&dir);

        store.put("k", b"first").expect("put");
        store.put("k", b"second").expect("put");

        assert_eq!(store.get("k").expect("get"), Some(b"second".to_vec()));
        assert_eq!(store.get("other").expect("get"), None);
    }

    #[test]
    fn store_writes_under_namespace_directory() {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = store_in(&dir);

        store.put(SNAPSHOT_KEY, b"{}").expect("put");

        let path = dir.path().join(SHARED_NAMESPACE).join("WeatherData.json");
        assert!(path.exists());
        assert_eq!(store.path_for(SNAPSHOT_KEY), Some(path));
    }

    #[test]
    fn store_rejects_path_like_keys() {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = store_in(&dir);

        for key in ["", "..", "../escape", "a/b", "a\\b"] {
            assert!(matches!(
                store.put(key, b"x"),
                Err(StoreWriteError::InvalidKey(_))
            ));
        }
    }

    #[test]
    fn store_reports_io_failure_on_put() {
        let dir = tempfile::tempdir().expect("tempdir");
        let blocker = dir.path().join("blocked");
        fs::write(&blocker, "not a directory").expect("write");
        let store = FileSnapshotStore::new(&blocker, SHARED_NAMESPACE);

        let error = store.put(SNAPSHOT_KEY, b"{}").expect_err("must fail");
        assert!(matches!(error, StoreWriteError::Io { .. }));
    }

    #[test]
    fn store_failed_rename_leaves_no_temp_file() {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = store_in(&dir);
        let target = store.path_for("k").expect("path");
        fs::create_dir_all(target.join("occupied")).expect("mkdir");

        let error = store.put("k", b"payload").expect_err("must fail");
        assert!(matches!(error, StoreWriteError::Io { .. }));

        let leftovers: Vec<_> = fs::read_dir(store.dir())
            .expect("read dir")
            .filter_map(Result::ok)
            .filter(|entry| entry.file_name().to_string_lossy().ends_with(".tmp"))
            .collect();
        assert!(leftovers.is_empty(), "temp files left: {leftovers:?}");
    }

    #[test]
    fn store_snapshot_roundtrip_preserves_all_fields() {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = store_in(&dir);

        for snapshot in [fixture_snapshot(), full_precision_snapshot()] {
            save_snapshot(&store, &snapshot).expect("save");

            assert_eq!(load_snapshot(&store), Some(snapshot));
        }
    }

    #[test]
    fn store_treats_corrupt_snapshot_as_absent() {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = store_in(&dir);
        store.put(SNAPSHOT_KEY, b"{not-json").expect("put");

        assert_eq!(load_snapshot(&store), None);
    }
}
