//! Preference storage
//!
//! Players remember user choices (speed, volume, language, resume position)
//! in a JSON tree shared by every player in the process:
//!
//! ```text
//! { "<namespace>": { "<player id>": { "<key>": value }, "<key>": value } }
//! ```
//!
//! Scoped entries live under the player id, unscoped ("general") entries
//! live directly under the namespace. The tree can be backed by a JSON file
//! so preferences survive restarts.

use crate::utils::error::{IntoPlayerError, Result};
use log::{debug, warn};
use parking_lot::RwLock;
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// The shared JSON tree behind every [`PreferenceStore`]
#[derive(Debug, Default)]
pub struct PreferenceArea {
    /// Root object, keyed by namespace
    root: RwLock<Map<String, Value>>,

    /// Backing file; `None` keeps everything in memory
    path: Option<PathBuf>,
}

impl PreferenceArea {
    /// Create an area that is never written to disk
    pub fn in_memory() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Open a file-backed area, loading any existing contents.
    ///
    /// An unreadable or malformed file is logged and replaced on the next
    /// write rather than failing the player.
    pub fn open(path: impl AsRef<Path>) -> Result<Arc<Self>> {
        let path = path.as_ref().to_path_buf();
        let mut root = Map::new();

        if path.exists() {
            let data = std::fs::read_to_string(&path)?;
            match serde_json::from_str::<Value>(&data) {
                Ok(Value::Object(map)) => root = map,
                Ok(_) => warn!("Preference file {:?} is not a JSON object, starting fresh", path),
                Err(e) => warn!("Preference file {:?} is corrupt ({}), starting fresh", path, e),
            }
        }

        debug!("Opened preference area at {:?}", path);

        Ok(Arc::new(Self {
            root: RwLock::new(root),
            path: Some(path),
        }))
    }

    /// Write the tree to its backing file, if any
    pub fn flush(&self) -> Result<()> {
        let Some(path) = &self.path else {
            return Ok(());
        };

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .storage_err("Creating preference directory")?;
        }

        let data = serde_json::to_string_pretty(&*self.root.read())?;
        std::fs::write(path, data).storage_err("Writing preference file")?;
        Ok(())
    }

    /// Copy of the whole tree
    pub fn snapshot(&self) -> Value {
        Value::Object(self.root.read().clone())
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    fn persist(&self) {
        if let Err(e) = self.flush() {
            warn!("Failed to persist preferences: {}", e);
        }
    }
}

/// One player's view of the preference area
#[derive(Debug, Clone)]
pub struct PreferenceStore {
    area: Arc<PreferenceArea>,
    namespace: String,
    id: String,
}

impl PreferenceStore {
    /// Create a store for player `id` under `namespace`.
    ///
    /// Existing entries for the same namespace and id are kept.
    pub fn new(area: Arc<PreferenceArea>, namespace: impl Into<String>, id: impl Into<String>) -> Self {
        let store = Self {
            area,
            namespace: namespace.into(),
            id: id.into(),
        };

        {
            let mut root = store.area.root.write();
            let ns = object_entry(&mut root, &store.namespace);
            object_entry(ns, &store.id);
        }

        store
    }

    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    /// The shared area behind this store
    pub fn area(&self) -> &Arc<PreferenceArea> {
        &self.area
    }

    /// A store over the same area and namespace for another player
    pub fn for_player(&self, id: impl Into<String>) -> Self {
        Self::new(self.area.clone(), self.namespace.clone(), id)
    }

    /// Store `value` under `key`, in the player's bucket when `scoped`
    pub fn set_item(&self, key: &str, value: impl Into<Value>, scoped: bool) {
        {
            let mut root = self.area.root.write();
            let bucket = self.bucket_mut(&mut root, scoped);
            bucket.insert(key.to_string(), value.into());
        }
        self.area.persist();
    }

    /// Raw JSON value stored under `key`
    pub fn get_item(&self, key: &str, scoped: bool) -> Option<Value> {
        let root = self.area.root.read();
        let ns = root.get(&self.namespace)?.as_object()?;
        let bucket = if scoped {
            ns.get(&self.id)?.as_object()?
        } else {
            ns
        };
        bucket.get(key).cloned()
    }

    /// Typed lookup; a value of the wrong shape reads as missing
    pub fn get<T: DeserializeOwned>(&self, key: &str, scoped: bool) -> Option<T> {
        let value = self.get_item(key, scoped)?;
        match serde_json::from_value(value) {
            Ok(v) => Some(v),
            Err(e) => {
                debug!("Ignoring stored '{}' of unexpected shape: {}", key, e);
                None
            }
        }
    }

    pub fn remove_item(&self, key: &str, scoped: bool) {
        let removed = {
            let mut root = self.area.root.write();
            let bucket = self.bucket_mut(&mut root, scoped);
            bucket.remove(key).is_some()
        };
        if removed {
            self.area.persist();
        }
    }

    /// Reset the namespace to hold only an empty bucket for this player
    pub fn clear(&self) {
        {
            let mut root = self.area.root.write();
            let mut fresh = Map::new();
            fresh.insert(self.id.clone(), Value::Object(Map::new()));
            root.insert(self.namespace.clone(), Value::Object(fresh));
        }
        self.area.persist();
    }

    fn bucket_mut<'m>(&self, root: &'m mut Map<String, Value>, scoped: bool) -> &'m mut Map<String, Value> {
        let ns = object_entry(root, &self.namespace);
        if scoped {
            object_entry(ns, &self.id)
        } else {
            ns
        }
    }
}

/// The object stored under `key`, replacing anything that is not an object
fn object_entry<'m>(map: &'m mut Map<String, Value>, key: &str) -> &'m mut Map<String, Value> {
    let slot = map
        .entry(key.to_string())
        .or_insert_with(|| Value::Object(Map::new()));
    if !slot.is_object() {
        *slot = Value::Object(Map::new());
    }
    match slot {
        Value::Object(map) => map,
        _ => unreachable!("slot was just replaced with an object"),
    }
}
