//! Value-transform handlers.
//!
//! A handler converts a field's in-memory value into the representation bound
//! to the statement. Handlers are built once, when the owning entity is
//! resolved, from a [`HandlerFactory`].

use std::fmt;
use std::sync::Arc;

use anyhow::{Result, anyhow, bail};
use sea_query::Value;

use crate::types::FieldType;

/// Converts bound values for a single column.
pub trait TypeHandler: Send + Sync + fmt::Debug {
    /// Name used in diagnostics.
    fn name(&self) -> &str;

    /// Convert an in-memory value into the value bound to the statement.
    ///
    /// # Errors
    ///
    /// Returns an error if the value cannot be represented.
    fn to_sql(&self, value: Value) -> Result<Value>;
}

/// Handler constructor taking the declared collection type and its element type.
pub type CollectionCtor = fn(&str, &str) -> Result<Arc<dyn TypeHandler>>;

/// Handler constructor taking a single type name.
pub type TypedCtor = fn(&str) -> Result<Arc<dyn TypeHandler>>;

/// Handler constructor taking no arguments.
pub type DefaultCtor = fn() -> Result<Arc<dyn TypeHandler>>;

/// Describes how a handler may be constructed.
///
/// Any combination of constructors may be present. The resolver picks the
/// most specific one the field can satisfy.
#[derive(Clone, Copy)]
pub struct HandlerFactory {
    name: &'static str,
    collection: Option<CollectionCtor>,
    typed: Option<TypedCtor>,
    default: Option<DefaultCtor>,
}

impl fmt::Debug for HandlerFactory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HandlerFactory")
            .field("name", &self.name)
            .field("collection", &self.collection.is_some())
            .field("typed", &self.typed.is_some())
            .field("default", &self.default.is_some())
            .finish()
    }
}

impl HandlerFactory {
    /// A factory with no constructors.
    #[must_use]
    pub const fn new(name: &'static str) -> Self {
        Self {
            name,
            collection: None,
            typed: None,
            default: None,
        }
    }

    /// Adds a `(collection type, element type)` constructor.
    #[must_use]
    pub const fn with_collection(mut self, ctor: CollectionCtor) -> Self {
        self.collection = Some(ctor);
        self
    }

    /// Adds a `(type)` constructor.
    #[must_use]
    pub const fn with_type(mut self, ctor: TypedCtor) -> Self {
        self.typed = Some(ctor);
        self
    }

    /// Adds a no-argument constructor.
    #[must_use]
    pub const fn with_default(mut self, ctor: DefaultCtor) -> Self {
        self.default = Some(ctor);
        self
    }

    /// Handler name.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        self.name
    }

    /// Build a handler for a field of the given type.
    ///
    /// Collection fields try `(collection, element)`, then `(element)`, then
    /// `()`. Other fields try `(type)`, then `()`. A constructor that exists
    /// but fails is not retried with a lower tier.
    ///
    /// # Errors
    ///
    /// Returns the constructor's error, or an error if no constructor fits.
    pub fn build(&self, field_type: &FieldType) -> Result<Arc<dyn TypeHandler>> {
        let failed =
            |e: anyhow::Error| e.context(format!("failed invoking constructor for handler {}", self.name));

        if let FieldType::Collection { element, .. } = field_type {
            if let Some(ctor) = self.collection {
                return ctor(&field_type.name(), element).map_err(failed);
            }
            if let Some(ctor) = self.typed {
                return ctor(element).map_err(failed);
            }
        } else if let Some(ctor) = self.typed {
            return ctor(&field_type.name()).map_err(failed);
        }

        match self.default {
            Some(ctor) => ctor().map_err(failed),
            None => Err(anyhow!("unable to find a usable constructor for {}", self.name)),
        }
    }
}

/// Stores values as JSON text.
///
/// String values must already hold valid JSON; other scalar values are
/// serialised.
#[derive(Debug, Clone)]
pub struct JsonHandler {
    target: String,
}

impl JsonHandler {
    /// Factory accepting collection, typed and default construction.
    pub const FACTORY: HandlerFactory = HandlerFactory::new("JsonHandler")
        .with_collection(Self::for_collection)
        .with_type(Self::for_type)
        .with_default(Self::untyped);

    fn for_collection(container: &str, element: &str) -> Result<Arc<dyn TypeHandler>> {
        if element.is_empty() {
            bail!("collection `{container}` has no element type");
        }
        Ok(Arc::new(Self {
            target: container.to_string(),
        }))
    }

    fn for_type(name: &str) -> Result<Arc<dyn TypeHandler>> {
        Ok(Arc::new(Self {
            target: name.to_string(),
        }))
    }

    fn untyped() -> Result<Arc<dyn TypeHandler>> {
        Ok(Arc::new(Self {
            target: "json".to_string(),
        }))
    }

    /// Type the handler was built for.
    #[must_use]
    pub fn target(&self) -> &str {
        &self.target
    }
}

impl TypeHandler for JsonHandler {
    fn name(&self) -> &str {
        "JsonHandler"
    }

    fn to_sql(&self, value: Value) -> Result<Value> {
        let json = match value {
            Value::String(Some(raw)) => {
                serde_json::from_str::<serde_json::Value>(&raw)
                    .map_err(|e| anyhow!("invalid json for {}: {e}", self.target))?;
                return Ok(Value::String(Some(raw)));
            }
            Value::String(None) => return Ok(Value::String(None)),
            Value::Bool(Some(v)) => serde_json::Value::from(v),
            Value::Int(Some(v)) => serde_json::Value::from(v),
            Value::BigInt(Some(v)) => serde_json::Value::from(v),
            Value::Unsigned(Some(v)) => serde_json::Value::from(v),
            Value::BigUnsigned(Some(v)) => serde_json::Value::from(v),
            Value::Double(Some(v)) => serde_json::Value::from(v),
            other => bail!("unsupported value for {}: {other:?}", self.target),
        };
        Ok(Value::String(Some(Box::new(json.to_string()))))
    }
}
