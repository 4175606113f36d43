//! Local context: recently used argument values, remembered between invocations
//!
//! Stored as TOML with one table per engine:
//!
//! ```toml
//! enabled = true
//!
//! [mysql]
//! resource-group-name = "group123456789"
//! location = "eastus"
//! server-name = "server12345678"
//! ```

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tracing::debug;

use super::error::{ConfigError, Result};

pub const RESOURCE_GROUP_KEY: &str = "resource-group-name";
pub const LOCATION_KEY: &str = "location";
pub const SERVER_NAME_KEY: &str = "server-name";

/// Key-value settings consulted when arguments are omitted
pub trait SettingsStore: Send + Sync {
    /// Whether values are read and written at all
    fn is_enabled(&self) -> bool;

    fn get(&self, section: &str, key: &str) -> Option<String>;

    fn set(&self, section: &str, key: &str, value: &str) -> Result<()>;
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LocalContext {
    #[serde(default = "enabled_by_default")]
    pub enabled: bool,
    #[serde(flatten)]
    pub sections: BTreeMap<String, BTreeMap<String, String>>,
}

impl Default for LocalContext {
    fn default() -> Self {
        Self {
            enabled: enabled_by_default(),
            sections: BTreeMap::new(),
        }
    }
}

fn enabled_by_default() -> bool {
    true
}

/// File-backed store; every `set` is written through immediately
pub struct FileSettingsStore {
    path: PathBuf,
    persist: bool,
    context: Mutex<LocalContext>,
}

impl FileSettingsStore {
    /// Open the store at `path`; a missing file is an empty, enabled context.
    ///
    /// `persist` is the config-level `param_persist` switch. When false the store
    /// neither reads nor writes, whatever the file says.
    pub fn open(path: &Path, persist: bool) -> Result<Self> {
        let context = if path.exists() {
            let content = fs::read_to_string(path).map_err(|e| ConfigError::LoadError {
                path: path.display().to_string(),
                source: e,
            })?;
            toml::from_str(&content)?
        } else {
            LocalContext::default()
        };

        Ok(Self {
            path: path.to_path_buf(),
            persist,
            context: Mutex::new(context),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Copy of the current contents
    pub fn snapshot(&self) -> LocalContext {
        self.lock().clone()
    }

    /// Turn the local context on or off and save
    pub fn set_enabled(&self, enabled: bool) -> Result<()> {
        let mut context = self.lock();
        context.enabled = enabled;
        self.save(&context)
    }

    /// Forget every remembered value and save
    pub fn clear(&self) -> Result<()> {
        let mut context = self.lock();
        context.sections.clear();
        self.save(&context)
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, LocalContext> {
        self.context.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn save(&self, context: &LocalContext) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).map_err(|e| ConfigError::SaveError {
                path: parent.display().to_string(),
                source: e,
            })?;
        }
        let content = toml::to_string_pretty(context)?;
        fs::write(&self.path, content).map_err(|e| ConfigError::SaveError {
            path: self.path.display().to_string(),
            source: e,
        })
    }
}

impl SettingsStore for FileSettingsStore {
    fn is_enabled(&self) -> bool {
        self.persist && self.lock().enabled
    }

    fn get(&self, section: &str, key: &str) -> Option<String> {
        if !self.is_enabled() {
            return None;
        }
        self.lock()
            .sections
            .get(section)
            .and_then(|s| s.get(key))
            .cloned()
    }

    fn set(&self, section: &str, key: &str, value: &str) -> Result<()> {
        if !self.is_enabled() {
            return Ok(());
        }
        debug!("Local context [{}] {} = {}", section, key, value);
        let mut context = self.lock();
        context
            .sections
            .entry(section.to_string())
            .or_default()
            .insert(key.to_string(), value.to_string());
        self.save(&context)
    }
}

/// In-memory store for callers that never persist
#[derive(Default)]
pub struct MemorySettingsStore {
    values: Mutex<BTreeMap<(String, String), String>>,
}

impl MemorySettingsStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(self, section: &str, key: &str, value: &str) -> Self {
        self.values
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .insert((section.to_string(), key.to_string()), value.to_string());
        self
    }
}

impl SettingsStore for MemorySettingsStore {
    fn is_enabled(&self) -> bool {
        true
    }

    fn get(&self, section: &str, key: &str) -> Option<String> {
        self.values
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .get(&(section.to_string(), key.to_string()))
            .cloned()
    }

    fn set(&self, section: &str, key: &str, value: &str) -> Result<()> {
        self.values
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .insert((section.to_string(), key.to_string()), value.to_string());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_memory_store() {
        let store = MemorySettingsStore::new().with("mysql", LOCATION_KEY, "westus");
        assert_eq!(store.get("mysql", LOCATION_KEY).as_deref(), Some("westus"));
        assert!(store.get("postgres", LOCATION_KEY).is_none());

        store.set("postgres", SERVER_NAME_KEY, "pg1").unwrap();
        assert_eq!(store.get("postgres", SERVER_NAME_KEY).as_deref(), Some("pg1"));
    }

    #[test]
    fn test_context_toml_layout() {
        let content = r#"
enabled = false

[mysql]
resource-group-name = "rg1"
"#;
        let context: LocalContext = toml::from_str(content).unwrap();
        assert!(!context.enabled);
        assert_eq!(context.sections["mysql"][RESOURCE_GROUP_KEY], "rg1");
    }
}
