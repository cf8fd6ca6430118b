//! Compiler settings.
//!
//! Settings are an optional JSON file owned by the user; everything in it can
//! also come from the command line, which always wins.
use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

pub const SETTINGS_SCHEMA_VERSION: u32 = 1;

/// JMeter release targeted when neither flag nor settings name one.
pub const DEFAULT_JMETER_VERSION: &str = "5.6.3";

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct Settings {
    pub schema_version: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub jmeter_version: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub plan_name: Option<String>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            schema_version: SETTINGS_SCHEMA_VERSION,
            jmeter_version: None,
            plan_name: None,
        }
    }
}

/// Load and validate settings from `path`.
pub fn load_settings(path: &Path) -> Result<Settings> {
    let bytes = fs::read(path).with_context(|| format!("read settings {}", path.display()))?;
    let settings: Settings = serde_json::from_slice(&bytes)
        .with_context(|| format!("parse settings JSON {}", path.display()))?;
    validate_settings(&settings)?;
    Ok(settings)
}

pub fn validate_settings(settings: &Settings) -> Result<()> {
    if settings.schema_version != SETTINGS_SCHEMA_VERSION {
        return Err(anyhow!(
            "unsupported settings schema_version {}",
            settings.schema_version
        ));
    }
    if let Some(version) = settings.jmeter_version.as_deref() {
        if version.trim().is_empty() {
            return Err(anyhow!("jmeter_version must be non-empty when set"));
        }
    }
    if let Some(name) = settings.plan_name.as_deref() {
        if name.trim().is_empty() {
            return Err(anyhow!("plan_name must be non-empty when set"));
        }
    }
    Ok(())
}

/// Target version: flag, then settings, then [`DEFAULT_JMETER_VERSION`].
pub fn effective_version(flag: Option<&str>, settings: &Settings) -> String {
    flag.or(settings.jmeter_version.as_deref())
        .unwrap_or(DEFAULT_JMETER_VERSION)
        .to_string()
}
