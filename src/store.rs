//! Opaque persistence for trained model state, keyed by model-type name.

use anyhow::{Context, Result};
use std::fs;
use std::path::PathBuf;

/// Black-box key-value store for trained model state and metrics. The core
/// never knows or cares how the values are kept.
pub trait ModelStore: Send + Sync {
    fn save(&self, name: &str, value: &serde_json::Value) -> Result<()>;
    fn load(&self, name: &str) -> Result<Option<serde_json::Value>>;
}

/// Directory-backed store: one `<name>.json` file per key.
pub struct JsonFileStore {
    dir: PathBuf,
}

impl JsonFileStore {
    pub fn new(dir: impl Into<PathBuf>) -> Result<Self> {
        let dir = dir.into();
        fs::create_dir_all(&dir)
            .with_context(|| format!("creating model directory {}", dir.display()))?;
        Ok(JsonFileStore { dir })
    }

    fn path(&self, name: &str) -> PathBuf {
        self.dir.join(format!("{name}.json"))
    }
}

impl ModelStore for JsonFileStore {
    fn save(&self, name: &str, value: &serde_json::Value) -> Result<()> {
        let path = self.path(name);
        let content = serde_json::to_string_pretty(value)?;
        fs::write(&path, content).with_context(|| format!("writing {}", path.display()))?;
        Ok(())
    }

    fn load(&self, name: &str) -> Result<Option<serde_json::Value>> {
        let path = self.path(name);
        if !path.exists() {
            return Ok(None);
        }
        let content =
            fs::read_to_string(&path).with_context(|| format!("reading {}", path.display()))?;
        Ok(Some(serde_json::from_str(&content)?))
    }
}

/// In-memory store for tests and for running without persistence.
#[derive(Default)]
pub struct MemoryStore {
    entries: std::sync::Mutex<std::collections::HashMap<String, serde_json::Value>>,
}

impl ModelStore for MemoryStore {
    fn save(&self, name: &str, value: &serde_json::Value) -> Result<()> {
        self.entries
            .lock()
            .expect("store poisoned")
            .insert(name.to_string(), value.clone());
        Ok(())
    }

    fn load(&self, name: &str) -> Result<Option<serde_json::Value>> {
        Ok(self
            .entries
            .lock()
            .expect("store poisoned")
            .get(name)
            .cloned())
    }
}
