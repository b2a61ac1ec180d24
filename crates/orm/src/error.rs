//! Errors

use std::sync::Arc;

use thiserror::Error;

/// Result type used across the crate.
pub type Result<T> = anyhow::Result<T, Error>;

/// Underlying cause carried by a [`Error::Configuration`].
pub type Cause = Arc<dyn std::error::Error + Send + Sync>;

/// Errors raised while resolving entity metadata or rendering SQL.
///
/// The type is `Clone` so a failed first resolution can be handed to every
/// caller that waited on it.
#[derive(Error, Debug, Clone)]
pub enum Error {
    /// Entity metadata is inconsistent. Raised when a descriptor is first
    /// resolved; nothing is published for the entity.
    #[error("entity: {entity}, description: {description}")]
    Configuration {
        /// Name of the entity being resolved.
        entity: String,
        /// What is wrong with it.
        description: String,
        /// Underlying failure, when there is one.
        #[source]
        cause: Option<Cause>,
    },

    /// A statement cannot be rendered. The builder remains usable.
    #[error("render: {description}")]
    Render {
        /// What could not be rendered.
        description: String,
    },

    /// Configuration loaded from the environment is invalid.
    #[error("environment: {description}")]
    Environment {
        /// The offending setting.
        description: String,
    },
}

impl Error {
    /// Wraps `cause` as the source of a configuration error.
    pub fn configuration_with(
        entity: impl Into<String>, description: impl Into<String>, cause: anyhow::Error,
    ) -> Self {
        let boxed: Box<dyn std::error::Error + Send + Sync> = cause.into();
        Self::Configuration {
            entity: entity.into(),
            description: description.into(),
            cause: Some(Arc::from(boxed)),
        }
    }

    /// Returns `true` for errors raised during metadata resolution.
    #[must_use]
    pub const fn is_configuration(&self) -> bool {
        matches!(self, Self::Configuration { .. })
    }
}

macro_rules! config_error {
    ($entity:expr, $($arg:tt)*) => {
        $crate::Error::Configuration {
            entity: $entity.to_string(),
            description: format!($($arg)*),
            cause: None,
        }
    };
}

macro_rules! render_error {
    ($($arg:tt)*) => {
        $crate::Error::Render { description: format!($($arg)*) }
    };
}

pub(crate) use {config_error, render_error};

#[cfg(test)]
mod tests {
    use std::error::Error as _;

    use anyhow::anyhow;

    use super::Error;

    #[test]
    fn configuration_display() {
        let err = config_error!("Account", "duplicate version column `{}`", "rev");
        assert_eq!(
            err.to_string(),
            "entity: Account, description: duplicate version column `rev`"
        );
        assert!(err.is_configuration());
        assert!(err.source().is_none());
    }

    #[test]
    fn configuration_keeps_cause() {
        let err = Error::configuration_with("Account", "bad handler", anyhow!("boom"));
        let cloned = err.clone();
        assert_eq!(cloned.source().map(ToString::to_string), Some("boom".to_string()));
    }

    #[test]
    fn render_display() {
        let err = render_error!("upsert is not supported by {}", "oracle");
        assert_eq!(err.to_string(), "render: upsert is not supported by oracle");
        assert!(!err.is_configuration());
    }
}
