//! Configuration loading and management
//!
//! A single [`GatewayConfig`] is built once at process start (from YAML or
//! [`GatewayConfig::default_config`]) and shared by `Arc` with every
//! component. Nothing reads configuration from ambient globals.
//!
//! A file without an `access` key gets the same guard as the defaults:
//! deleting from `users_collection` requires `admin_role`. Write
//! `access: []` to run without route guards.
//!
//! ```yaml
//! bind_address: 0.0.0.0:8080
//! collections: [users, properties, transactions]
//! users_collection: users
//! admin_role: admin
//! access:
//!   - collection: users
//!     operations: [delete]
//!     role: admin
//! identity:
//!   provider: static_tokens
//!   tokens:
//!     dev-token: user-1
//! storage:
//!   backend: memory
//! ```

use crate::core::operation::Operation;
use anyhow::{Context, Result};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use std::sync::OnceLock;
use thiserror::Error;

/// Paths served by the gateway itself, unavailable as collection names
pub const RESERVED_PATHS: &[&str] = &["health", "healthz"];

/// Route guard: `operations` on `collection` require `role`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccessRule {
    pub collection: String,
    pub operations: Vec<Operation>,
    pub role: String,
}

/// Which identity provider verifies bearer tokens
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "provider", rename_all = "snake_case")]
pub enum IdentityConfig {
    /// Fixed token → subject table (development, tests)
    StaticTokens {
        #[serde(default)]
        tokens: BTreeMap<String, String>,
    },

    /// Remote `accounts:lookup` verification (feature `remote-auth`)
    IdentityToolkit {
        endpoint: String,
        #[serde(default)]
        api_key: Option<String>,
    },
}

impl Default for IdentityConfig {
    fn default() -> Self {
        IdentityConfig::StaticTokens {
            tokens: BTreeMap::new(),
        }
    }
}

/// Which document store backs the gateway
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "backend", rename_all = "snake_case")]
pub enum StorageConfig {
    /// Process-local store, lost on restart
    #[default]
    Memory,

    /// MongoDB (feature `mongodb_backend`)
    Mongodb { uri: String, database: String },
}

/// Cross-origin settings for browser callers
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CorsConfig {
    /// Origins allowed to call the API; empty disables CORS headers
    #[serde(default)]
    pub allowed_origins: Vec<String>,
}

/// Complete gateway configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GatewayConfig {
    /// Socket address to listen on
    #[serde(default = "default_bind_address")]
    pub bind_address: String,

    /// Allow-set of collection names
    #[serde(default = "default_collections")]
    pub collections: Vec<String>,

    /// Collection holding user profile documents
    #[serde(default = "default_users_collection")]
    pub users_collection: String,

    /// Role admitted by every role check
    #[serde(default = "default_admin_role")]
    pub admin_role: String,

    /// Route guards; see [`default_access`] when the key is absent
    #[serde(default)]
    pub access: Vec<AccessRule>,

    #[serde(default)]
    pub identity: IdentityConfig,

    #[serde(default)]
    pub storage: StorageConfig,

    #[serde(default)]
    pub cors: CorsConfig,

    /// Default tracing filter, overridden by `RUST_LOG`
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

fn default_bind_address() -> String {
    "127.0.0.1:3000".to_string()
}

fn default_collections() -> Vec<String> {
    vec![
        "users".to_string(),
        "properties".to_string(),
        "transactions".to_string(),
    ]
}

fn default_users_collection() -> String {
    "users".to_string()
}

fn default_admin_role() -> String {
    "admin".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

/// Guard applied when no `access` rules are configured
pub fn default_access(users_collection: &str, admin_role: &str) -> Vec<AccessRule> {
    vec![AccessRule {
        collection: users_collection.to_string(),
        operations: vec![Operation::Delete],
        role: admin_role.to_string(),
    }]
}

/// Errors found while validating a configuration
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("at least one collection must be configured")]
    NoCollections,

    #[error("invalid collection name '{name}'")]
    InvalidCollectionName { name: String },

    #[error("collection name '{name}' is reserved")]
    ReservedCollection { name: String },

    #[error("collection '{name}' is listed twice")]
    DuplicateCollection { name: String },

    #[error("users collection '{name}' is not in the collection allow-set")]
    UsersCollectionNotAllowed { name: String },

    #[error("access rule references unknown collection '{name}'")]
    UnknownAccessCollection { name: String },

    #[error("role names must not be empty")]
    EmptyRole,
}

fn is_valid_collection_name(name: &str) -> bool {
    static COLLECTION_REGEX: OnceLock<Regex> = OnceLock::new();
    let regex = COLLECTION_REGEX.get_or_init(|| Regex::new(r"^[A-Za-z0-9_-]+$").unwrap());
    regex.is_match(name)
}

impl GatewayConfig {
    /// Load configuration from a YAML file
    pub fn from_yaml_file(path: &str) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config file '{}'", path))?;
        Self::from_yaml_str(&content).with_context(|| format!("invalid config file '{}'", path))
    }

    /// Load configuration from a YAML string
    pub fn from_yaml_str(yaml: &str) -> Result<Self> {
        let value = match serde_yaml::from_str(yaml)? {
            serde_yaml::Value::Null => serde_yaml::Value::Mapping(Default::default()),
            value => value,
        };
        let access_given = value.get("access").is_some();

        let mut config: Self = serde_yaml::from_value(value)?;
        if !access_given {
            config.access = default_access(&config.users_collection, &config.admin_role);
        }
        config.validate()?;
        Ok(config)
    }

    /// Development defaults: three collections, deleting users needs admin
    pub fn default_config() -> Self {
        Self {
            bind_address: default_bind_address(),
            collections: default_collections(),
            users_collection: default_users_collection(),
            admin_role: default_admin_role(),
            access: default_access(&default_users_collection(), &default_admin_role()),
            identity: IdentityConfig::default(),
            storage: StorageConfig::default(),
            cors: CorsConfig::default(),
            log_level: default_log_level(),
        }
    }

    /// Whether `name` is in the collection allow-set
    pub fn is_known_collection(&self, name: &str) -> bool {
        self.collections.iter().any(|c| c == name)
    }

    /// Check internal consistency
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.collections.is_empty() {
            return Err(ConfigError::NoCollections);
        }

        let mut seen = HashSet::new();
        for name in &self.collections {
            if !is_valid_collection_name(name) {
                return Err(ConfigError::InvalidCollectionName { name: name.clone() });
            }
            if RESERVED_PATHS.contains(&name.as_str()) {
                return Err(ConfigError::ReservedCollection { name: name.clone() });
            }
            if !seen.insert(name.as_str()) {
                return Err(ConfigError::DuplicateCollection { name: name.clone() });
            }
        }

        if !self.is_known_collection(&self.users_collection) {
            return Err(ConfigError::UsersCollectionNotAllowed {
                name: self.users_collection.clone(),
            });
        }

        if self.admin_role.trim().is_empty() {
            return Err(ConfigError::EmptyRole);
        }

        for rule in &self.access {
            if !self.is_known_collection(&rule.collection) {
                return Err(ConfigError::UnknownAccessCollection {
                    name: rule.collection.clone(),
                });
            }
            if rule.role.trim().is_empty() {
                return Err(ConfigError::EmptyRole);
            }
        }

        Ok(())
    }
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self::default_config()
    }
}
