//! Process-wide configuration.
//!
//! Settings here only influence descriptors resolved after they are changed.
//! A published `TableDescriptor` never observes a later configuration.

use std::sync::{Arc, LazyLock};

use anyhow::Context;
use fromenv::FromEnv;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};

use crate::error::Error;

static GLOBAL: LazyLock<RwLock<Arc<GlobalConfig>>> =
    LazyLock::new(|| RwLock::new(Arc::new(GlobalConfig::default())));

/// Settings shared by every entity and query.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GlobalConfig {
    /// Convert `CamelCase` entity and field names to `snake_case` table and
    /// column names when no explicit name is given.
    pub camel_to_underline: bool,

    /// Column name that marks a logical-delete column on every entity.
    pub logic_delete_column: Option<String>,

    /// Column name that marks an optimistic-lock version column on every entity.
    pub version_column: Option<String>,

    /// Column name that marks a tenant column on every entity.
    pub tenant_column: Option<String>,

    /// Literal stored in the logical-delete column for live rows.
    pub logic_normal_value: String,

    /// Literal stored in the logical-delete column for deleted rows.
    pub logic_deleted_value: String,

    /// Fail resolution instead of silently skipping fields whose type cannot
    /// be persisted.
    pub strict_types: bool,

    /// Identifier of the dialect returned by `default_dialect`.
    pub dialect: String,
}

impl Default for GlobalConfig {
    fn default() -> Self {
        Self {
            camel_to_underline: true,
            logic_delete_column: None,
            version_column: None,
            tenant_column: None,
            logic_normal_value: "0".to_string(),
            logic_deleted_value: "1".to_string(),
            strict_types: false,
            dialect: "postgres".to_string(),
        }
    }
}

/// Options read from `ORM_*` environment variables.
#[derive(Debug, Clone, FromEnv)]
pub struct EnvOptions {
    /// `ORM_CAMEL_TO_UNDERLINE`
    #[env(from = "ORM_CAMEL_TO_UNDERLINE", default = "true")]
    pub camel_to_underline: bool,
    /// `ORM_LOGIC_DELETE_COLUMN`; blank means none.
    #[env(from = "ORM_LOGIC_DELETE_COLUMN", default = "")]
    pub logic_delete_column: String,
    /// `ORM_VERSION_COLUMN`; blank means none.
    #[env(from = "ORM_VERSION_COLUMN", default = "")]
    pub version_column: String,
    /// `ORM_TENANT_COLUMN`; blank means none.
    #[env(from = "ORM_TENANT_COLUMN", default = "")]
    pub tenant_column: String,
    /// `ORM_LOGIC_NORMAL_VALUE`
    #[env(from = "ORM_LOGIC_NORMAL_VALUE", default = "0")]
    pub logic_normal_value: String,
    /// `ORM_LOGIC_DELETED_VALUE`
    #[env(from = "ORM_LOGIC_DELETED_VALUE", default = "1")]
    pub logic_deleted_value: String,
    /// `ORM_STRICT_TYPES`
    #[env(from = "ORM_STRICT_TYPES", default = "false")]
    pub strict_types: bool,
    /// `ORM_DIALECT`
    #[env(from = "ORM_DIALECT", default = "postgres")]
    pub dialect: String,
}

impl GlobalConfig {
    /// Load configuration from `ORM_*` environment variables.
    ///
    /// # Errors
    ///
    /// Returns an error if a variable cannot be read or holds an invalid value.
    pub fn from_env() -> crate::error::Result<Self> {
        let options = EnvOptions::from_env()
            .finalize()
            .context("issue loading orm options")
            .map_err(|e| Error::Environment {
                description: format!("{e:#}"),
            })?;
        Ok(Self::from(options))
    }
}

impl From<EnvOptions> for GlobalConfig {
    fn from(options: EnvOptions) -> Self {
        Self {
            camel_to_underline: options.camel_to_underline,
            logic_delete_column: non_blank(options.logic_delete_column),
            version_column: non_blank(options.version_column),
            tenant_column: non_blank(options.tenant_column),
            logic_normal_value: options.logic_normal_value.trim().to_string(),
            logic_deleted_value: options.logic_deleted_value.trim().to_string(),
            strict_types: options.strict_types,
            dialect: options.dialect.trim().to_lowercase(),
        }
    }
}

fn non_blank(raw: String) -> Option<String> {
    let trimmed = raw.trim();
    if trimmed.is_empty() { None } else { Some(trimmed.to_string()) }
}

/// Returns the current process-wide configuration.
#[must_use]
pub fn global_config() -> Arc<GlobalConfig> {
    Arc::clone(&GLOBAL.read())
}

/// Replaces the process-wide configuration.
pub fn set_global_config(config: GlobalConfig) {
    tracing::debug!(?config, "replacing global orm configuration");
    *GLOBAL.write() = Arc::new(config);
}

#[cfg(test)]
mod tests {
    use super::*;

    fn options() -> EnvOptions {
        EnvOptions {
            camel_to_underline: true,
            logic_delete_column: " ".to_string(),
            version_column: "version".to_string(),
            tenant_column: String::new(),
            logic_normal_value: " 0 ".to_string(),
            logic_deleted_value: "1".to_string(),
            strict_types: false,
            dialect: "MySQL".to_string(),
        }
    }

    #[test]
    fn env_options_convert() {
        let config = GlobalConfig::from(options());
        assert!(config.camel_to_underline);
        assert!(!config.strict_types);
        assert_eq!(config.logic_delete_column, None);
        assert_eq!(config.version_column.as_deref(), Some("version"));
        assert_eq!(config.tenant_column, None);
        assert_eq!(config.logic_normal_value, "0");
        assert_eq!(config.dialect, "mysql");
    }

    #[test]
    fn env_defaults_match_default_config() {
        let options = EnvOptions {
            logic_delete_column: String::new(),
            version_column: String::new(),
            logic_normal_value: "0".to_string(),
            dialect: "postgres".to_string(),
            ..options()
        };
        assert_eq!(GlobalConfig::from(options), GlobalConfig::default());
    }

    #[test]
    fn defaults() {
        let config = GlobalConfig::default();
        assert!(config.camel_to_underline);
        assert_eq!(config.logic_normal_value, "0");
        assert_eq!(config.logic_deleted_value, "1");
        assert_eq!(config.dialect, "postgres");
    }
}
