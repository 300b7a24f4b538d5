use anyhow::{Context, Result};
use log::warn;
use serde::{Deserialize, Serialize};
use std::{
    fs,
    path::{Path, PathBuf},
};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct ReferenceTimeSettings {
    /// Ask network time servers before falling back to the device clock.
    pub prefer_network: bool,
    /// Tried in order; the first answer wins.
    pub servers: Vec<String>,
    pub timeout_ms: u64,
    /// How long a network offset is reused before asking again.
    pub cache_ttl_ms: u64,
}

impl Default for ReferenceTimeSettings {
    fn default() -> Self {
        Self {
            prefer_network: true,
            servers: vec![
                "pool.ntp.org".into(),
                "time.google.com".into(),
                "time.cloudflare.com".into(),
            ],
            timeout_ms: 5_000,
            cache_ttl_ms: 60_000,
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct UserSettings {
    reference_time: ReferenceTimeSettings,
}

/// JSON settings file in the data directory. A missing or malformed file
/// yields defaults.
pub struct SettingsStore {
    path: PathBuf,
    data: UserSettings,
}

impl SettingsStore {
    pub fn new(path: PathBuf) -> Result<Self> {
        let data = if path.exists() {
            let contents = fs::read_to_string(&path)
                .with_context(|| format!("Failed to read settings from {}", path.display()))?;
            serde_json::from_str(&contents).unwrap_or_else(|err| {
                warn!("Ignoring malformed settings in {}: {err}", path.display());
                UserSettings::default()
            })
        } else {
            UserSettings::default()
        };

        Ok(Self {
            path,
            data,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn reference_time(&self) -> ReferenceTimeSettings {
        self.data.reference_time.clone()
    }
}
