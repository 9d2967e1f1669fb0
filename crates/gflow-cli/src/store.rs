//! File-backed credential store.
//!
//! All accounts live in one JSON object keyed by account id. Every write
//! replaces the file atomically (temp file + rename) with `0600` permissions.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use gflow_google::{AuthError, AuthResult, CredentialRecord, CredentialStore};
use tracing::debug;

type Records = BTreeMap<String, CredentialRecord>;

/// A [`CredentialStore`] persisted as JSON on disk.
#[derive(Debug)]
pub struct FileCredentialStore {
    path: PathBuf,
    /// Serializes read-modify-write cycles within this process.
    write_lock: Mutex<()>,
}

impl FileCredentialStore {
    /// Creates a store backed by `path`. The file is created on first write.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            write_lock: Mutex::new(()),
        }
    }

    /// Returns the backing file path.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Returns the stored account ids.
    pub fn ids(&self) -> AuthResult<Vec<String>> {
        Ok(self.read_all()?.into_keys().collect())
    }

    /// Deletes the record stored under `id`. Returns false if there was none.
    pub fn remove(&self, id: &str) -> AuthResult<bool> {
        let _guard = self.lock()?;
        let mut records = self.read_all()?;
        let removed = records.remove(id).is_some();
        if removed {
            self.write_all(&records)?;
        }
        Ok(removed)
    }

    fn lock(&self) -> AuthResult<std::sync::MutexGuard<'_, ()>> {
        self.write_lock
            .lock()
            .map_err(|_| AuthError::store("credential file lock poisoned"))
    }

    fn read_all(&self) -> AuthResult<Records> {
        if !self.path.exists() {
            return Ok(Records::new());
        }
        let content = fs::read_to_string(&self.path).map_err(|e| {
            AuthError::store(format!(
                "failed to read {}: {}",
                self.path.display(),
                e
            ))
        })?;
        if content.trim().is_empty() {
            return Ok(Records::new());
        }
        serde_json::from_str(&content).map_err(|e| {
            AuthError::store(format!(
                "failed to parse {}: {}",
                self.path.display(),
                e
            ))
        })
    }

    fn write_all(&self, records: &Records) -> AuthResult<()> {
        if let Some(parent) = self.path.parent()
            && !parent.as_os_str().is_empty()
        {
            fs::create_dir_all(parent).map_err(|e| {
                AuthError::store(format!("failed to create {}: {}", parent.display(), e))
            })?;
        }

        let content = serde_json::to_string_pretty(records)
            .map_err(|e| AuthError::store(format!("failed to serialize credentials: {}", e)))?;

        let temp_path = self.path.with_extension("json.tmp");
        fs::write(&temp_path, content).map_err(|e| {
            AuthError::store(format!("failed to write {}: {}", temp_path.display(), e))
        })?;

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            fs::set_permissions(&temp_path, fs::Permissions::from_mode(0o600)).map_err(|e| {
                AuthError::store(format!("failed to restrict permissions: {}", e))
            })?;
        }

        fs::rename(&temp_path, &self.path).map_err(|e| {
            AuthError::store(format!("failed to replace {}: {}", self.path.display(), e))
        })?;

        debug!(path = %self.path.display(), "saved credentials");
        Ok(())
    }
}

impl CredentialStore for FileCredentialStore {
    fn get(&self, id: &str) -> AuthResult<Option<CredentialRecord>> {
        Ok(self.read_all()?.remove(id))
    }

    fn put(&self, id: &str, record: CredentialRecord) -> AuthResult<()> {
        let _guard = self.lock()?;
        let mut records = self.read_all()?;
        records.insert(id.to_string(), record);
        self.write_all(&records)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, Utc};
    use secrecy::ExposeSecret;
    use tempfile::TempDir;

    fn record(token: &str) -> CredentialRecord {
        CredentialRecord::new("id.apps.googleusercontent.com", "secret")
            .with_refresh_token("refresh")
            .with_access_token(token, Some(Utc::now() + Duration::hours(1)))
    }

    #[test]
    fn missing_file_reads_as_empty() {
        let dir = TempDir::new().unwrap();
        let store = FileCredentialStore::new(dir.path().join("credentials.json"));
        assert!(store.get("default").unwrap().is_none());
        assert!(store.ids().unwrap().is_empty());
    }

    #[test]
    fn put_then_get() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested").join("credentials.json");
        let store = FileCredentialStore::new(&path);

        store.put("default", record("A1")).unwrap();
        store.put("work", record("W1")).unwrap();

        let loaded = store.get("default").unwrap().unwrap();
        assert_eq!(loaded.access_token.expose_secret(), "A1");
        assert_eq!(store.ids().unwrap(), vec!["default", "work"]);
        assert!(!path.with_extension("json.tmp").exists());

        // A second store over the same file sees the same data.
        let reopened = FileCredentialStore::new(&path);
        assert_eq!(
            reopened.get("work").unwrap().unwrap().access_token.expose_secret(),
            "W1"
        );
    }

    #[test]
    fn put_replaces_full_record() {
        let dir = TempDir::new().unwrap();
        let store = FileCredentialStore::new(dir.path().join("credentials.json"));
        store.put("default", record("A1")).unwrap();
        store.put("default", record("A2")).unwrap();

        let loaded = store.get("default").unwrap().unwrap();
        assert_eq!(loaded.access_token.expose_secret(), "A2");
        assert_eq!(loaded.refresh_token.unwrap().expose_secret(), "refresh");
    }

    #[test]
    fn remove_record() {
        let dir = TempDir::new().unwrap();
        let store = FileCredentialStore::new(dir.path().join("credentials.json"));
        store.put("default", record("A1")).unwrap();

        assert!(store.remove("default").unwrap());
        assert!(!store.remove("default").unwrap());
        assert!(store.get("default").unwrap().is_none());
    }

    #[test]
    fn corrupt_file_is_a_store_error() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("credentials.json");
        fs::write(&path, "{not json").unwrap();

        let err = FileCredentialStore::new(&path).get("default").unwrap_err();
        assert_eq!(err.kind(), gflow_google::AuthErrorKind::StoreError);
    }

    #[cfg(unix)]
    #[test]
    fn file_is_private() {
        use std::os::unix::fs::PermissionsExt;

        let dir = TempDir::new().unwrap();
        let path = dir.path().join("credentials.json");
        FileCredentialStore::new(&path)
            .put("default", record("A1"))
            .unwrap();

        let mode = fs::metadata(&path).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o600);
    }
}
