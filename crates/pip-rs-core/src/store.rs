//! Per-user persistence for cellar entries and taste profiles.

use async_trait::async_trait;
use log::{debug, info};
use parking_lot::{Mutex, RwLock};
use pip_rs_protocol::{CellarBottle, UserProfile};
use std::collections::HashMap;
use std::fs::{self, File};
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use thiserror::Error;
use uuid::Uuid;

const CELLAR_FILE: &str = "cellar.jsonl";
const PROFILE_FILE: &str = "profile.json";

/// Errors returned by cellar and profile stores.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("serialization error: {0}")]
    Serde(#[from] serde_json::Error),
    #[error("invalid user id: {0}")]
    InvalidUser(String),
}

/// A user's cellar: owned, tried and wishlist entries.
#[async_trait]
pub trait CellarStore: Send + Sync {
    /// All entries, oldest first.
    async fn list(&self, user_id: &str) -> Result<Vec<CellarBottle>, StoreError>;

    async fn get(&self, user_id: &str, bottle_id: Uuid) -> Result<Option<CellarBottle>, StoreError> {
        Ok(self
            .list(user_id)
            .await?
            .into_iter()
            .find(|bottle| bottle.id == bottle_id))
    }

    /// Insert a new entry or replace the one with the same id.
    async fn upsert(&self, user_id: &str, bottle: CellarBottle) -> Result<(), StoreError>;

    /// Remove an entry, returning it if it existed.
    async fn remove(
        &self,
        user_id: &str,
        bottle_id: Uuid,
    ) -> Result<Option<CellarBottle>, StoreError>;
}

/// A user's taste profile.
#[async_trait]
pub trait ProfileStore: Send + Sync {
    async fn load(&self, user_id: &str) -> Result<Option<UserProfile>, StoreError>;

    async fn save(&self, user_id: &str, profile: &UserProfile) -> Result<(), StoreError>;

    /// Clear the profile, returning the previous one.
    async fn reset(&self, user_id: &str) -> Result<Option<UserProfile>, StoreError>;
}

fn upsert_into(bottles: &mut Vec<CellarBottle>, bottle: CellarBottle) {
    match bottles.iter_mut().find(|existing| existing.id == bottle.id) {
        Some(existing) => *existing = bottle,
        None => bottles.push(bottle),
    }
}

fn remove_from(bottles: &mut Vec<CellarBottle>, bottle_id: Uuid) -> Option<CellarBottle> {
    let idx = bottles.iter().position(|bottle| bottle.id == bottle_id)?;
    Some(bottles.remove(idx))
}

/// Cellars held in memory, keyed by user.
#[derive(Debug, Clone, Default)]
pub struct InMemoryCellarStore {
    cellars: Arc<RwLock<HashMap<String, Vec<CellarBottle>>>>,
}

impl InMemoryCellarStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl CellarStore for InMemoryCellarStore {
    async fn list(&self, user_id: &str) -> Result<Vec<CellarBottle>, StoreError> {
        Ok(self
            .cellars
            .read()
            .get(user_id)
            .cloned()
            .unwrap_or_default())
    }

    async fn upsert(&self, user_id: &str, bottle: CellarBottle) -> Result<(), StoreError> {
        let mut cellars = self.cellars.write();
        upsert_into(cellars.entry(user_id.to_string()).or_default(), bottle);
        Ok(())
    }

    async fn remove(
        &self,
        user_id: &str,
        bottle_id: Uuid,
    ) -> Result<Option<CellarBottle>, StoreError> {
        let mut cellars = self.cellars.write();
        Ok(cellars
            .get_mut(user_id)
            .and_then(|bottles| remove_from(bottles, bottle_id)))
    }
}

/// Profiles held in memory, keyed by user.
#[derive(Debug, Clone, Default)]
pub struct InMemoryProfileStore {
    profiles: Arc<RwLock<HashMap<String, UserProfile>>>,
}

impl InMemoryProfileStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ProfileStore for InMemoryProfileStore {
    async fn load(&self, user_id: &str) -> Result<Option<UserProfile>, StoreError> {
        Ok(self.profiles.read().get(user_id).cloned())
    }

    async fn save(&self, user_id: &str, profile: &UserProfile) -> Result<(), StoreError> {
        self.profiles
            .write()
            .insert(user_id.to_string(), profile.clone());
        Ok(())
    }

    async fn reset(&self, user_id: &str) -> Result<Option<UserProfile>, StoreError> {
        Ok(self.profiles.write().remove(user_id))
    }
}

/// File-backed store: one directory per user holding `cellar.jsonl` and
/// `profile.json`. Writes go to a temp file and are renamed into place.
#[derive(Debug)]
pub struct FileStore {
    root: PathBuf,
    write_lock: Mutex<()>,
}

impl FileStore {
    pub fn new(root: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let root = root.into();
        fs::create_dir_all(&root)?;
        info!("opened file store (root={})", root.display());
        Ok(Self {
            root,
            write_lock: Mutex::new(()),
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn user_dir(&self, user_id: &str) -> Result<PathBuf, StoreError> {
        let valid = !user_id.is_empty()
            && user_id
                .chars()
                .all(|ch| ch.is_ascii_alphanumeric() || ch == '-' || ch == '_' || ch == '.')
            && user_id != "."
            && user_id != "..";
        if !valid {
            return Err(StoreError::InvalidUser(user_id.to_string()));
        }
        Ok(self.root.join(user_id))
    }

    fn read_cellar(&self, user_id: &str) -> Result<Vec<CellarBottle>, StoreError> {
        let path = self.user_dir(user_id)?.join(CELLAR_FILE);
        if !path.exists() {
            return Ok(Vec::new());
        }
        let reader = BufReader::new(File::open(&path)?);
        let mut bottles = Vec::new();
        for line in reader.lines() {
            let line = line?;
            if line.trim().is_empty() {
                continue;
            }
            bottles.push(serde_json::from_str(&line)?);
        }
        Ok(bottles)
    }

    fn write_cellar(&self, user_id: &str, bottles: &[CellarBottle]) -> Result<(), StoreError> {
        let mut contents = Vec::new();
        for bottle in bottles {
            serde_json::to_writer(&mut contents, bottle)?;
            contents.push(b'\n');
        }
        self.write_atomic(user_id, CELLAR_FILE, &contents)
    }

    fn write_atomic(&self, user_id: &str, file: &str, contents: &[u8]) -> Result<(), StoreError> {
        let dir = self.user_dir(user_id)?;
        fs::create_dir_all(&dir)?;
        let tmp = dir.join(format!("{file}.tmp"));
        let mut handle = File::create(&tmp)?;
        handle.write_all(contents)?;
        handle.sync_all()?;
        fs::rename(&tmp, dir.join(file))?;
        debug!("wrote {} (user={}, bytes={})", file, user_id, contents.len());
        Ok(())
    }
}

#[async_trait]
impl CellarStore for FileStore {
    async fn list(&self, user_id: &str) -> Result<Vec<CellarBottle>, StoreError> {
        self.read_cellar(user_id)
    }

    async fn upsert(&self, user_id: &str, bottle: CellarBottle) -> Result<(), StoreError> {
        let _guard = self.write_lock.lock();
        let mut bottles = self.read_cellar(user_id)?;
        upsert_into(&mut bottles, bottle);
        self.write_cellar(user_id, &bottles)
    }

    async fn remove(
        &self,
        user_id: &str,
        bottle_id: Uuid,
    ) -> Result<Option<CellarBottle>, StoreError> {
        let _guard = self.write_lock.lock();
        let mut bottles = self.read_cellar(user_id)?;
        let removed = remove_from(&mut bottles, bottle_id);
        if removed.is_some() {
            self.write_cellar(user_id, &bottles)?;
        }
        Ok(removed)
    }
}

#[async_trait]
impl ProfileStore for FileStore {
    async fn load(&self, user_id: &str) -> Result<Option<UserProfile>, StoreError> {
        let path = self.user_dir(user_id)?.join(PROFILE_FILE);
        if !path.exists() {
            return Ok(None);
        }
        let contents = fs::read_to_string(path)?;
        Ok(Some(serde_json::from_str(&contents)?))
    }

    async fn save(&self, user_id: &str, profile: &UserProfile) -> Result<(), StoreError> {
        let _guard = self.write_lock.lock();
        let contents = serde_json::to_vec_pretty(profile)?;
        self.write_atomic(user_id, PROFILE_FILE, &contents)
    }

    async fn reset(&self, user_id: &str) -> Result<Option<UserProfile>, StoreError> {
        let previous = ProfileStore::load(self, user_id).await?;
        let path = self.user_dir(user_id)?.join(PROFILE_FILE);
        if path.exists() {
            let _guard = self.write_lock.lock();
            fs::remove_file(path)?;
        }
        Ok(previous)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pip_rs_protocol::BottleStatus;
    use pretty_assertions::assert_eq;
    use tempfile::TempDir;

    #[tokio::test]
    async fn in_memory_cellar_upserts_and_removes() {
        let store = InMemoryCellarStore::new();
        let mut bottle = CellarBottle::named("Catena Malbec", BottleStatus::Owned, 1);
        store.upsert("u1", bottle.clone()).await.expect("upsert");
        bottle.quantity = 3;
        store.upsert("u1", bottle.clone()).await.expect("upsert");

        let listed = store.list("u1").await.expect("list");
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].quantity, 3);
        assert!(store.list("u2").await.expect("list").is_empty());

        let removed = store.remove("u1", bottle.id).await.expect("remove");
        assert_eq!(removed.map(|b| b.id), Some(bottle.id));
        assert_eq!(store.remove("u1", bottle.id).await.expect("remove"), None);
    }

    #[tokio::test]
    async fn file_store_persists_across_instances() {
        let temp = TempDir::new().expect("tmp");
        let bottle = CellarBottle::named("Bodega Lomas Rioja Reserva", BottleStatus::Tried, 0);
        {
            let store = FileStore::new(temp.path()).expect("store");
            store.upsert("alice", bottle.clone()).await.expect("upsert");
            let profile = UserProfile {
                preferred_attributes: vec!["earthy".to_string()],
                total_ratings: 1,
                ..UserProfile::default()
            };
            store.save("alice", &profile).await.expect("save");
        }

        let store = FileStore::new(temp.path()).expect("store");
        let bottles = store.list("alice").await.expect("list");
        assert_eq!(bottles, vec![bottle]);
        let profile = store.load("alice").await.expect("load").expect("profile");
        assert_eq!(profile.preferred_attributes, vec!["earthy".to_string()]);

        let previous = store.reset("alice").await.expect("reset");
        assert!(previous.is_some());
        assert_eq!(store.load("alice").await.expect("load"), None);
    }

    #[tokio::test]
    async fn file_store_rejects_path_like_user_ids() {
        let temp = TempDir::new().expect("tmp");
        let store = FileStore::new(temp.path()).expect("store");
        let err = store.list("../escape").await.unwrap_err();
        assert!(matches!(err, StoreError::InvalidUser(_)));
    }
}
