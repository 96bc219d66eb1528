//! User profile documents.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Profile record written after an account is created
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserProfile {
    pub uid: String,
    pub email: String,
    pub username: String,
    /// Milliseconds since the Unix epoch
    pub created_at: i64,
}

impl UserProfile {
    pub fn new(uid: &str, email: &str, username: &str) -> Self {
        Self {
            uid: uid.to_string(),
            email: email.to_string(),
            username: username.to_string(),
            created_at: chrono::Utc::now().timestamp_millis(),
        }
    }
}

/// Document store holding one profile per uid
pub trait ProfileStore {
    /// Create or overwrite the profile for `profile.uid`
    fn put_profile(&mut self, profile: &UserProfile) -> Result<()>;

    fn get_profile(&self, uid: &str) -> Result<Option<UserProfile>>;
}

/// Stores each profile as `<root>/users/<uid>.json`
pub struct DirProfileStore {
    root: PathBuf,
}

impl DirProfileStore {
    pub fn new(root: &Path) -> Self {
        Self {
            root: root.to_path_buf(),
        }
    }

    fn collection(&self) -> PathBuf {
        self.root.join("users")
    }

    fn document_path(&self, uid: &str) -> Result<PathBuf> {
        // uids become file names, so keep them to a single safe path segment
        if uid.is_empty()
            || !uid
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
        {
            anyhow::bail!("Invalid profile id: {:?}", uid);
        }
        Ok(self.collection().join(format!("{}.json", uid)))
    }
}

impl ProfileStore for DirProfileStore {
    fn put_profile(&mut self, profile: &UserProfile) -> Result<()> {
        let path = self.document_path(&profile.uid)?;
        std::fs::create_dir_all(self.collection())?;
        let content = serde_json::to_string_pretty(profile)?;
        std::fs::write(&path, content).with_context(|| format!("writing {}", path.display()))?;
        Ok(())
    }

    fn get_profile(&self, uid: &str) -> Result<Option<UserProfile>> {
        let path = self.document_path(uid)?;
        if !path.exists() {
            return Ok(None);
        }
        let content =
            std::fs::read_to_string(&path).with_context(|| format!("reading {}", path.display()))?;
        let profile = serde_json::from_str(&content)
            .with_context(|| format!("parsing {}", path.display()))?;
        Ok(Some(profile))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_put_and_get() {
        let dir = TempDir::new().unwrap();
        let mut store = DirProfileStore::new(dir.path());

        let profile = UserProfile::new("abc-123", "test@gmail.com", "user");
        store.put_profile(&profile).unwrap();

        assert_eq!(store.get_profile("abc-123").unwrap(), Some(profile));
        assert!(dir.path().join("users").join("abc-123.json").exists());
    }

    #[test]
    fn test_missing_profile() {
        let dir = TempDir::new().unwrap();
        let store = DirProfileStore::new(dir.path());
        assert_eq!(store.get_profile("nope").unwrap(), None);
    }

    #[test]
    fn test_put_overwrites() {
        let dir = TempDir::new().unwrap();
        let mut store = DirProfileStore::new(dir.path());

        let mut profile = UserProfile::new("u1", "a@b.co", "first");
        store.put_profile(&profile).unwrap();
        profile.username = "second".to_string();
        store.put_profile(&profile).unwrap();

        let loaded = store.get_profile("u1").unwrap().unwrap();
        assert_eq!(loaded.username, "second");
    }

    #[test]
    fn test_rejects_path_like_uid() {
        let dir = TempDir::new().unwrap();
        let mut store = DirProfileStore::new(dir.path());
        let profile = UserProfile::new("../escape", "a@b.co", "x");
        assert!(store.put_profile(&profile).is_err());
        assert!(store.get_profile("").is_err());
    }

    #[test]
    fn test_document_field_names() {
        let profile = UserProfile {
            uid: "u1".to_string(),
            email: "a@b.co".to_string(),
            username: "user".to_string(),
            created_at: 1_700_000_000_000,
        };
        let value = serde_json::to_value(&profile).unwrap();
        assert_eq!(value["uid"], "u1");
        assert_eq!(value["email"], "a@b.co");
        assert_eq!(value["username"], "user");
        assert_eq!(value["created_at"], 1_700_000_000_000i64);
    }
}
