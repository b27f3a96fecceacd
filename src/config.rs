// gsm-lookup Configuration Module
//
// This module handles loading lookup defaults from gsm-lookup.yaml and
// detecting the Google Cloud project to read secrets from.

use crate::policy::Policy;
use crate::resolver::LookupOptions;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Name of the configuration file looked up in the current directory
pub const CONFIG_FILE_NAME: &str = "gsm-lookup.yaml";

/// Lookup configuration. Every field is optional; CLI flags take precedence.
#[derive(Debug, Serialize, Deserialize, Clone, Default, PartialEq)]
#[serde(default)]
pub struct LookupConfig {
    /// Google Cloud project holding the secrets
    pub project: Option<String>,

    /// Version of the secret(s)
    pub version_id: Option<String>,

    /// Stage of the secret version
    pub version_stage: Option<String>,

    /// Secrets contain nested JSON values
    pub nested: Option<bool>,

    /// Join the values into one extended secret
    pub join: Option<bool>,

    /// Terms were expanded from a hierarchy
    pub bypath: Option<bool>,

    /// Action to take if the secret is missing ("error", "warn" or "skip")
    pub on_missing: Option<String>,

    /// Action to take if access to the secret is denied ("error", "warn" or "skip")
    pub on_denied: Option<String>,
}

impl LookupConfig {
    /// Load configuration from a YAML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref())
            .with_context(|| format!("Failed to read config file: {:?}", path.as_ref()))?;

        let config: LookupConfig = serde_yaml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {:?}", path.as_ref()))?;

        Ok(config)
    }

    /// Load gsm-lookup.yaml from the current directory if it exists
    pub fn from_current_dir() -> Result<Option<Self>> {
        let path = Path::new(CONFIG_FILE_NAME);
        if !path.exists() {
            return Ok(None);
        }
        Self::from_file(path).map(Some)
    }

    /// Validate the configuration and turn it into lookup options.
    ///
    /// Policy strings are checked here, before any secret is fetched.
    pub fn into_options(self) -> Result<LookupOptions> {
        let on_missing = match self.on_missing.as_deref() {
            Some(value) => Policy::parse_option("on_missing", value)?,
            None => Policy::default(),
        };
        let on_denied = match self.on_denied.as_deref() {
            Some(value) => Policy::parse_option("on_denied", value)?,
            None => Policy::default(),
        };

        if let Some(project) = &self.project {
            if project.trim().is_empty() {
                anyhow::bail!("Project cannot be empty");
            }
        }

        Ok(LookupOptions {
            version_id: self.version_id,
            version_stage: self.version_stage,
            nested: self.nested.unwrap_or(false),
            join: self.join.unwrap_or(false),
            bypath: self.bypath.unwrap_or(false),
            on_missing,
            on_denied,
        })
    }

    /// Overlay `other` on top of `self`; set values in `other` win.
    pub fn merge(self, other: LookupConfig) -> LookupConfig {
        LookupConfig {
            project: other.project.or(self.project),
            version_id: other.version_id.or(self.version_id),
            version_stage: other.version_stage.or(self.version_stage),
            nested: other.nested.or(self.nested),
            join: other.join.or(self.join),
            bypath: other.bypath.or(self.bypath),
            on_missing: other.on_missing.or(self.on_missing),
            on_denied: other.on_denied.or(self.on_denied),
        }
    }
}

/// Path of the per-user configuration file
pub fn global_config_path() -> Result<PathBuf> {
    let home = dirs::home_dir().context("Failed to determine home directory")?;
    Ok(home.join(".config").join("gsm-lookup").join("config.yaml"))
}

/// Detect the Google Cloud project ID from multiple sources.
///
/// # Detection Order
///
/// 1. `GSM_LOOKUP_PROJECT`, `GOOGLE_CLOUD_PROJECT`, `GCP_PROJECT` environment variables
/// 2. `project` in local `gsm-lookup.yaml`
/// 3. `project` in the global config
pub fn detect_project_id() -> Result<Option<String>> {
    resolve_project(None, LookupConfig::from_current_dir()?.as_ref())
}

/// Pick the project for a lookup.
///
/// An explicit `flag` wins over everything. Otherwise the order of
/// [`detect_project_id`] applies, with `local` standing in for the
/// configuration file of the current directory.
pub fn resolve_project(flag: Option<String>, local: Option<&LookupConfig>) -> Result<Option<String>> {
    if let Some(id) = flag {
        return Ok(Some(id));
    }

    if let Some(id) = project_from_env() {
        return Ok(Some(id));
    }

    if let Some(id) = local.and_then(|config| config.project.clone()) {
        return Ok(Some(id));
    }

    let global = global_config_path()?;
    if global.exists() {
        return Ok(LookupConfig::from_file(&global)?.project);
    }

    Ok(None)
}

fn project_from_env() -> Option<String> {
    ["GSM_LOOKUP_PROJECT", "GOOGLE_CLOUD_PROJECT", "GCP_PROJECT"]
        .iter()
        .filter_map(|var| std::env::var(var).ok())
        .map(|value| value.trim().to_string())
        .find(|value| !value.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_gives_error_policies() {
        let options = LookupConfig::default().into_options().unwrap();

        assert_eq!(options.on_missing, Policy::Error);
        assert_eq!(options.on_denied, Policy::Error);
        assert_eq!(options.version_id, None);
        assert!(!options.nested);
    }

    #[test]
    fn test_config_validation_invalid_policy() {
        let config = LookupConfig {
            on_missing: Some("ignore".to_string()),
            ..LookupConfig::default()
        };

        let err = config.into_options().unwrap_err();
        assert!(err.to_string().contains("\"on_missing\""));
    }

    #[test]
    fn test_config_validation_empty_project() {
        let config = LookupConfig {
            project: Some("  ".to_string()),
            ..LookupConfig::default()
        };

        assert!(config.into_options().is_err());
    }

    #[test]
    fn test_parse_yaml() {
        let yaml = "project: my-project\nnested: true\non_missing: WARN\n";
        let config: LookupConfig = serde_yaml::from_str(yaml).unwrap();

        assert_eq!(config.project.as_deref(), Some("my-project"));
        let options = config.into_options().unwrap();
        assert!(options.nested);
        assert_eq!(options.on_missing, Policy::Warn);
    }

    #[test]
    fn test_merge_prefers_overrides() {
        let file = LookupConfig {
            project: Some("from-file".to_string()),
            version_id: Some("3".to_string()),
            on_denied: Some("skip".to_string()),
            ..LookupConfig::default()
        };
        let flags = LookupConfig {
            project: Some("from-flag".to_string()),
            join: Some(true),
            ..LookupConfig::default()
        };

        let merged = file.merge(flags);
        assert_eq!(merged.project.as_deref(), Some("from-flag"));
        assert_eq!(merged.version_id.as_deref(), Some("3"));
        assert_eq!(merged.on_denied.as_deref(), Some("skip"));
        assert_eq!(merged.join, Some(true));
    }

    #[test]
    fn test_merge_can_turn_file_flags_off() {
        let file = LookupConfig {
            nested: Some(true),
            join: Some(true),
            bypath: Some(true),
            ..LookupConfig::default()
        };
        let flags = LookupConfig {
            nested: Some(false),
            join: Some(false),
            ..LookupConfig::default()
        };

        let options = file.merge(flags).into_options().unwrap();
        assert!(!options.nested);
        assert!(!options.join);
        assert!(options.bypath);
    }

    #[test]
    fn test_project_flag_wins() {
        let local = LookupConfig {
            project: Some("from-file".to_string()),
            ..LookupConfig::default()
        };

        let project = resolve_project(Some("from-flag".to_string()), Some(&local)).unwrap();
        assert_eq!(project.as_deref(), Some("from-flag"));
    }
}
