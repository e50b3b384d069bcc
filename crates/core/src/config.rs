//! Engine configuration with precedence and validation
//!
//! Precedence, lowest first: built-in defaults, the JSON file named by
//! `OBJACL_CONFIG`, then individual `OBJACL_*` environment variables.

use crate::errors::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const CONFIG_FILE_VAR: &str = "OBJACL_CONFIG";
pub const DEFAULT_ADMIN_AUTHORITY: &str = "ROLE_ADMIN";

/// Tunables for the ACL engine
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AclConfig {
    /// Maximum number of cached ACLs (`None` keeps every ACL)
    pub cache_capacity: Option<usize>,
    /// Object identities per store query during lookup
    pub lookup_batch_size: usize,
    /// Deadline for each store call on the read path
    #[serde(rename = "lookup_timeout_ms", with = "duration_ms")]
    pub lookup_timeout: Duration,
    /// Emit audit events for ACEs flagged for auditing
    pub audit_enabled: bool,
    /// Authority allowed to change ACL ownership
    pub ownership_authority: String,
    /// Authority allowed to change ACE audit flags
    pub auditing_authority: String,
    /// Authority allowed to make any other ACL change
    pub general_authority: String,
}

impl Default for AclConfig {
    fn default() -> Self {
        Self {
            cache_capacity: None,
            lookup_batch_size: 50,
            lookup_timeout: Duration::from_secs(5),
            audit_enabled: true,
            ownership_authority: DEFAULT_ADMIN_AUTHORITY.to_string(),
            auditing_authority: DEFAULT_ADMIN_AUTHORITY.to_string(),
            general_authority: DEFAULT_ADMIN_AUTHORITY.to_string(),
        }
    }
}

impl AclConfig {
    pub fn builder() -> AclConfigBuilder {
        AclConfigBuilder::new()
    }

    /// Reject values the engine cannot run with
    pub fn validate(&self) -> Result<()> {
        if self.lookup_batch_size == 0 {
            return Err(Error::configuration("lookup_batch_size must be at least 1"));
        }
        if self.cache_capacity == Some(0) {
            return Err(Error::configuration(
                "cache_capacity must be at least 1 when set",
            ));
        }
        if self.lookup_timeout.is_zero() {
            return Err(Error::configuration("lookup_timeout must be greater than zero"));
        }
        for (name, value) in [
            ("ownership_authority", &self.ownership_authority),
            ("auditing_authority", &self.auditing_authority),
            ("general_authority", &self.general_authority),
        ] {
            if value.trim().is_empty() {
                return Err(Error::configuration(format!("{name} must not be empty")));
            }
        }
        Ok(())
    }
}

mod duration_ms {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u64(u64::try_from(duration.as_millis()).unwrap_or(u64::MAX))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        u64::deserialize(deserializer).map(Duration::from_millis)
    }
}

/// Builder for creating engine configurations
pub struct AclConfigBuilder {
    config: AclConfig,
}

impl AclConfigBuilder {
    /// Create a new builder with default configuration
    pub fn new() -> Self {
        Self {
            config: AclConfig::default(),
        }
    }

    /// Bound the cache to `capacity` ACLs
    pub fn with_cache_capacity(mut self, capacity: usize) -> Self {
        self.config.cache_capacity = Some(capacity);
        self
    }

    pub fn with_lookup_batch_size(mut self, batch_size: usize) -> Self {
        self.config.lookup_batch_size = batch_size;
        self
    }

    pub fn with_lookup_timeout(mut self, timeout: Duration) -> Self {
        self.config.lookup_timeout = timeout;
        self
    }

    pub fn with_audit_enabled(mut self, enabled: bool) -> Self {
        self.config.audit_enabled = enabled;
        self
    }

    /// Use one authority for ownership, auditing and general changes
    pub fn with_admin_authority(mut self, authority: impl Into<String>) -> Self {
        let authority = authority.into();
        self.config.ownership_authority = authority.clone();
        self.config.auditing_authority = authority.clone();
        self.config.general_authority = authority;
        self
    }

    pub fn with_ownership_authority(mut self, authority: impl Into<String>) -> Self {
        self.config.ownership_authority = authority.into();
        self
    }

    pub fn with_auditing_authority(mut self, authority: impl Into<String>) -> Self {
        self.config.auditing_authority = authority.into();
        self
    }

    pub fn with_general_authority(mut self, authority: impl Into<String>) -> Self {
        self.config.general_authority = authority.into();
        self
    }

    /// Build and validate the configuration
    pub fn build(self) -> Result<AclConfig> {
        self.config.validate()?;
        Ok(self.config)
    }
}

impl Default for AclConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Source of configuration for debugging and precedence tracking
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConfigSource {
    /// Default configuration
    Default,
    /// Configuration file
    ConfigFile(PathBuf),
    /// Environment variable
    EnvironmentVariable(String),
}

/// Configuration together with every source that contributed to it
#[derive(Debug, Clone)]
pub struct LoadedConfig {
    pub config: AclConfig,
    pub sources: Vec<ConfigSource>,
}

/// Configuration loader that handles precedence
pub struct AclConfigLoader;

impl AclConfigLoader {
    /// Load configuration from defaults, the config file and the environment
    pub fn load() -> Result<LoadedConfig> {
        Self::load_with(|name| std::env::var(name).ok())
    }

    /// Same as [`load`](Self::load) with a custom variable lookup
    pub fn load_with<F>(lookup: F) -> Result<LoadedConfig>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = AclConfig::default();
        let mut sources = vec![ConfigSource::Default];

        if let Some(path) = lookup(CONFIG_FILE_VAR) {
            let path = PathBuf::from(path);
            config = Self::load_from_file(&path)?;
            tracing::debug!(path = %path.display(), "loaded ACL configuration file");
            sources.push(ConfigSource::ConfigFile(path));
        }

        sources.extend(Self::apply_env(&mut config, &lookup)?);

        config.validate()?;
        Ok(LoadedConfig { config, sources })
    }

    /// Load configuration from a JSON file; missing keys keep their defaults
    pub fn load_from_file(path: &Path) -> Result<AclConfig> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            Error::configuration(format!("cannot read '{}': {e}", path.display()))
        })?;
        let config: AclConfig = serde_json::from_str(&content)?;
        Ok(config)
    }

    fn apply_env<F>(config: &mut AclConfig, lookup: &F) -> Result<Vec<ConfigSource>>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut applied = Vec::new();

        if let Some(value) = lookup("OBJACL_CACHE_CAPACITY") {
            config.cache_capacity = match value.trim() {
                "" | "unbounded" => None,
                n => Some(parse_var("OBJACL_CACHE_CAPACITY", n)?),
            };
            applied.push("OBJACL_CACHE_CAPACITY");
        }

        if let Some(value) = lookup("OBJACL_LOOKUP_BATCH_SIZE") {
            config.lookup_batch_size = parse_var("OBJACL_LOOKUP_BATCH_SIZE", &value)?;
            applied.push("OBJACL_LOOKUP_BATCH_SIZE");
        }

        if let Some(value) = lookup("OBJACL_LOOKUP_TIMEOUT_MS") {
            config.lookup_timeout =
                Duration::from_millis(parse_var("OBJACL_LOOKUP_TIMEOUT_MS", &value)?);
            applied.push("OBJACL_LOOKUP_TIMEOUT_MS");
        }

        if let Some(value) = lookup("OBJACL_AUDIT_ENABLED") {
            config.audit_enabled = parse_var("OBJACL_AUDIT_ENABLED", &value.to_lowercase())?;
            applied.push("OBJACL_AUDIT_ENABLED");
        }

        // The blanket admin authority goes first so the specific ones win
        if let Some(value) = lookup("OBJACL_ADMIN_AUTHORITY") {
            config.ownership_authority = value.clone();
            config.auditing_authority = value.clone();
            config.general_authority = value;
            applied.push("OBJACL_ADMIN_AUTHORITY");
        }

        if let Some(value) = lookup("OBJACL_OWNERSHIP_AUTHORITY") {
            config.ownership_authority = value;
            applied.push("OBJACL_OWNERSHIP_AUTHORITY");
        }

        if let Some(value) = lookup("OBJACL_AUDITING_AUTHORITY") {
            config.auditing_authority = value;
            applied.push("OBJACL_AUDITING_AUTHORITY");
        }

        if let Some(value) = lookup("OBJACL_GENERAL_AUTHORITY") {
            config.general_authority = value;
            applied.push("OBJACL_GENERAL_AUTHORITY");
        }

        Ok(applied
            .into_iter()
            .map(|name| ConfigSource::EnvironmentVariable(name.to_string()))
            .collect())
    }
}

fn parse_var<T: std::str::FromStr>(name: &str, value: &str) -> Result<T> {
    value
        .trim()
        .parse()
        .map_err(|_| Error::configuration(format!("{name} has invalid value '{value}'")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;
    use std::collections::HashMap;
    use std::io::Write;

    fn vars(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name| map.get(name).cloned()
    }

    #[test]
    fn test_defaults_are_valid() {
        let config = AclConfig::default();
        config.validate().unwrap();
        assert_eq!(config.lookup_batch_size, 50);
        assert_eq!(config.general_authority, "ROLE_ADMIN");
    }

    #[test]
    fn test_builder_validation() {
        assert!(AclConfig::builder().with_lookup_batch_size(0).build().is_err());
        assert!(AclConfig::builder().with_cache_capacity(0).build().is_err());
        assert!(AclConfig::builder()
            .with_lookup_timeout(Duration::ZERO)
            .build()
            .is_err());

        let config = AclConfig::builder()
            .with_cache_capacity(128)
            .with_admin_authority("ROLE_ACL_ADMIN")
            .with_ownership_authority("ROLE_OWNER_ADMIN")
            .build()
            .unwrap();
        assert_eq!(config.cache_capacity, Some(128));
        assert_eq!(config.general_authority, "ROLE_ACL_ADMIN");
        assert_eq!(config.ownership_authority, "ROLE_OWNER_ADMIN");
    }

    #[test]
    fn test_file_then_env_precedence() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{ "lookup_batch_size": 10, "lookup_timeout_ms": 250, "audit_enabled": false }}"#
        )
        .unwrap();
        let path = file.path().to_string_lossy().to_string();

        let loaded = AclConfigLoader::load_with(vars(&[
            (CONFIG_FILE_VAR, path.as_str()),
            ("OBJACL_LOOKUP_BATCH_SIZE", "20"),
        ]))
        .unwrap();

        assert_eq!(loaded.config.lookup_batch_size, 20);
        assert_eq!(loaded.config.lookup_timeout, Duration::from_millis(250));
        assert!(!loaded.config.audit_enabled);
        assert_eq!(loaded.config.cache_capacity, None);
        assert_eq!(
            loaded.sources,
            vec![
                ConfigSource::Default,
                ConfigSource::ConfigFile(PathBuf::from(&path)),
                ConfigSource::EnvironmentVariable("OBJACL_LOOKUP_BATCH_SIZE".to_string()),
            ]
        );
    }

    #[test]
    fn test_env_authorities() {
        let loaded = AclConfigLoader::load_with(vars(&[
            ("OBJACL_ADMIN_AUTHORITY", "ROLE_SUPER"),
            ("OBJACL_AUDITING_AUTHORITY", "ROLE_AUDITOR"),
            ("OBJACL_CACHE_CAPACITY", "unbounded"),
        ]))
        .unwrap();
        assert_eq!(loaded.config.ownership_authority, "ROLE_SUPER");
        assert_eq!(loaded.config.general_authority, "ROLE_SUPER");
        assert_eq!(loaded.config.auditing_authority, "ROLE_AUDITOR");
        assert_eq!(loaded.config.cache_capacity, None);
    }

    #[test]
    fn test_invalid_env_value() {
        let err = AclConfigLoader::load_with(vars(&[("OBJACL_LOOKUP_TIMEOUT_MS", "soon")]))
            .unwrap_err();
        assert!(err.to_string().contains("OBJACL_LOOKUP_TIMEOUT_MS"));

        assert!(AclConfigLoader::load_with(vars(&[("OBJACL_LOOKUP_BATCH_SIZE", "0")])).is_err());
    }

    #[test]
    fn test_missing_config_file() {
        let result =
            AclConfigLoader::load_with(vars(&[(CONFIG_FILE_VAR, "/nonexistent/objacl.json")]));
        assert!(result.is_err());
    }

    #[test]
    #[serial]
    fn test_load_from_process_env() {
        std::env::set_var("OBJACL_CACHE_CAPACITY", "64");
        let loaded = AclConfigLoader::load();
        std::env::remove_var("OBJACL_CACHE_CAPACITY");

        assert_eq!(loaded.unwrap().config.cache_capacity, Some(64));
    }
}
