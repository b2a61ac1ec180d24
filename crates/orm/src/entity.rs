use crate::handler::HandlerFactory;
use crate::listener::ListenerFactory;
use crate::types::FieldType;

/// Trait for types that map onto a table.
///
/// Typically implemented via the `entity!` macro rather than manually.
pub trait Entity: 'static {
    /// Describe the entity's table and fields.
    ///
    /// Called at most once per type by the metadata resolver.
    fn describe() -> EntityDef;
}

/// Declares an ORM entity with automatic `Entity` trait implementation.
///
/// Per-field column options follow the field type as `=> [option, ...]`:
///
/// | option              | meaning                                        |
/// |---------------------|------------------------------------------------|
/// | `id`, `id = Kind`   | primary key (`Auto`, `Generator`, `Sequence`, `None`) |
/// | `column = "name"`   | explicit column name                           |
/// | `ignore`            | keep the column but never select or write it   |
/// | `large`             | exclude from the default projection            |
/// | `logic_delete`      | logical-delete marker                          |
/// | `version`           | optimistic-lock version                        |
/// | `tenant_id`         | tenant marker                                  |
/// | `on_insert = "sql"` | expression used when the insert omits the column |
/// | `on_update = "sql"` | expression used when the update omits the column |
/// | `handler = PATH`    | a [`HandlerFactory`] for the column's values   |
/// | `mask = "rule"`     | masking rule for text columns                  |
/// | `alias = "name"`    | alternate name used in projections             |
/// | `enum`              | the field type is an enum persisted by name    |
///
/// # Examples
///
/// ```ignore
/// entity! {
///     table = "tb_account",
///     #[derive(Debug, Clone)]
///     pub struct Account {
///         pub id: i64 => [id],
///         pub user_name: String,
///         pub avatar: Vec<u8> => [large],
///         pub version: i32 => [version],
///         pub deleted: bool => [logic_delete],
///     }
/// }
/// ```
#[macro_export]
macro_rules! entity {
    (
        $(table = $table:literal,)?
        $(#[$meta:meta])*
        pub struct $struct_name:ident {
            $(
                $(#[$field_meta:meta])*
                pub $field_name:ident : $field_type:ty $(=> [$($option:tt)*])?
            ),* $(,)?
        }
    ) => {
        #[allow(missing_docs)]
        $(#[$meta])*
        pub struct $struct_name {
            $(
                $(#[$field_meta])*
                pub $field_name : $field_type
            ),*
        }

        impl $crate::Entity for $struct_name {
            fn describe() -> $crate::EntityDef {
                let def = $crate::EntityDef::new(stringify!($struct_name));
                $( let def = def.table($crate::TableConfig::named($table)); )?
                def $(
                    .field($crate::__column_options!(
                        $crate::FieldDef::parse(stringify!($field_name), stringify!($field_type));
                        $($($option)*)?
                    ))
                )*
            }
        }
    };
}

#[doc(hidden)]
#[macro_export]
macro_rules! __column_options {
    ($def:expr;) => { $def };
    ($def:expr; id = $kind:ident $(, $($rest:tt)*)?) => {
        $crate::__column_options!($def.id($crate::KeyType::$kind); $($($rest)*)?)
    };
    ($def:expr; id $(, $($rest:tt)*)?) => {
        $crate::__column_options!($def.id($crate::KeyType::Auto); $($($rest)*)?)
    };
    ($def:expr; column = $name:literal $(, $($rest:tt)*)?) => {
        $crate::__column_options!($def.column($name); $($($rest)*)?)
    };
    ($def:expr; ignore $(, $($rest:tt)*)?) => {
        $crate::__column_options!($def.ignore(); $($($rest)*)?)
    };
    ($def:expr; large $(, $($rest:tt)*)?) => {
        $crate::__column_options!($def.large(); $($($rest)*)?)
    };
    ($def:expr; logic_delete $(, $($rest:tt)*)?) => {
        $crate::__column_options!($def.logic_delete(); $($($rest)*)?)
    };
    ($def:expr; version $(, $($rest:tt)*)?) => {
        $crate::__column_options!($def.version(); $($($rest)*)?)
    };
    ($def:expr; tenant_id $(, $($rest:tt)*)?) => {
        $crate::__column_options!($def.tenant_id(); $($($rest)*)?)
    };
    ($def:expr; on_insert = $value:literal $(, $($rest:tt)*)?) => {
        $crate::__column_options!($def.on_insert($value); $($($rest)*)?)
    };
    ($def:expr; on_update = $value:literal $(, $($rest:tt)*)?) => {
        $crate::__column_options!($def.on_update($value); $($($rest)*)?)
    };
    ($def:expr; handler = $factory:path $(, $($rest:tt)*)?) => {
        $crate::__column_options!($def.handler($factory); $($($rest)*)?)
    };
    ($def:expr; mask = $rule:literal $(, $($rest:tt)*)?) => {
        $crate::__column_options!($def.mask($rule); $($($rest)*)?)
    };
    ($def:expr; alias = $alias:literal $(, $($rest:tt)*)?) => {
        $crate::__column_options!($def.alias($alias); $($($rest)*)?)
    };
    ($def:expr; enum $(, $($rest:tt)*)?) => {
        $crate::__column_options!($def.enumeration(); $($($rest)*)?)
    };
}

/// Declarative description of an entity: its table options and fields.
#[derive(Debug, Clone)]
pub struct EntityDef {
    pub(crate) name: String,
    pub(crate) table: Option<TableConfig>,
    pub(crate) fields: Vec<FieldDef>,
    pub(crate) parent: Option<Box<EntityDef>>,
    pub(crate) getter_aliases: Vec<(String, String)>,
}

impl EntityDef {
    /// Start describing the entity `name` (its type name).
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            table: None,
            fields: Vec::new(),
            parent: None,
            getter_aliases: Vec::new(),
        }
    }

    /// Explicit table options.
    #[must_use]
    pub fn table(mut self, table: TableConfig) -> Self {
        self.table = Some(table);
        self
    }

    /// Adds a field, in declaration order.
    #[must_use]
    pub fn field(mut self, field: FieldDef) -> Self {
        self.fields.push(field);
        self
    }

    /// Inherit the fields of `parent`. Fields declared here shadow parent
    /// fields with the same name, ignoring case.
    #[must_use]
    pub fn extends(mut self, parent: Self) -> Self {
        self.parent = Some(Box::new(parent));
        self
    }

    /// Alias declared on this entity's accessor for `field`, which may be
    /// inherited. Takes precedence over the field's own alias.
    #[must_use]
    pub fn getter_alias(mut self, field: impl Into<String>, alias: impl Into<String>) -> Self {
        self.getter_aliases.push((field.into(), alias.into()));
        self
    }

    /// Entity name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Table options, if any were given.
    #[must_use]
    pub const fn table_config(&self) -> Option<&TableConfig> {
        self.table.as_ref()
    }

    /// Instance fields of this entity and its ancestors: own fields first, in
    /// declaration order, then each ancestor's. A field whose name (ignoring
    /// case) was already collected is skipped.
    #[must_use]
    pub fn column_fields(&self) -> Vec<&FieldDef> {
        let mut fields: Vec<&FieldDef> = Vec::new();
        let mut current = Some(self);
        while let Some(def) = current {
            for field in &def.fields {
                if field.is_static
                    || fields.iter().any(|f| f.name.eq_ignore_ascii_case(&field.name))
                {
                    continue;
                }
                fields.push(field);
            }
            current = def.parent.as_deref();
        }
        fields
    }

    /// Accessor-level alias for `field`, searching from this entity upward.
    #[must_use]
    pub fn getter_alias_for(&self, field: &str) -> Option<&str> {
        let mut current = Some(self);
        while let Some(def) = current {
            if let Some((_, alias)) = def.getter_aliases.iter().find(|(name, _)| name == field) {
                return Some(alias);
            }
            current = def.parent.as_deref();
        }
        None
    }
}

/// Table-level options.
#[derive(Debug, Clone, Default)]
pub struct TableConfig {
    pub(crate) name: Option<String>,
    pub(crate) schema: Option<String>,
    pub(crate) camel_to_underline: Option<bool>,
    pub(crate) data_source: Option<String>,
    pub(crate) on_insert: Vec<ListenerFactory>,
    pub(crate) on_update: Vec<ListenerFactory>,
}

impl TableConfig {
    /// Options with an explicit table name.
    #[must_use]
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
            ..Self::default()
        }
    }

    /// Schema the table lives in.
    #[must_use]
    pub fn schema(mut self, schema: impl Into<String>) -> Self {
        self.schema = Some(schema.into());
        self
    }

    /// Override the global camel-to-underline setting for this entity.
    #[must_use]
    pub const fn camel_to_underline(mut self, enabled: bool) -> Self {
        self.camel_to_underline = Some(enabled);
        self
    }

    /// Logical data source the table belongs to.
    #[must_use]
    pub fn data_source(mut self, data_source: impl Into<String>) -> Self {
        self.data_source = Some(data_source.into());
        self
    }

    /// Adds an insert listener. Listeners run in the order added.
    #[must_use]
    pub fn on_insert(mut self, listener: ListenerFactory) -> Self {
        self.on_insert.push(listener);
        self
    }

    /// Adds an update listener. Listeners run in the order added.
    #[must_use]
    pub fn on_update(mut self, listener: ListenerFactory) -> Self {
        self.on_update.push(listener);
        self
    }
}

/// Primary key generation strategy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum KeyType {
    /// Database generated (identity/auto-increment).
    #[default]
    Auto,
    /// Produced by a named key generator.
    Generator,
    /// Read from a database sequence.
    Sequence,
    /// Supplied by the caller.
    None,
}

/// Primary key options.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct KeyConfig {
    /// Generation strategy.
    pub key_type: KeyType,
    /// Generator name or sequence SQL, depending on `key_type`.
    pub value: Option<String>,
    /// Generate the key before the insert rather than after.
    pub before: bool,
}

/// Column-level options.
#[derive(Debug, Clone, Default)]
pub struct ColumnConfig {
    /// Explicit column name.
    pub column: Option<String>,
    /// Keep the column in metadata but never select or write it.
    pub ignore: bool,
    /// Exclude from the default projection.
    pub large: bool,
    /// Logical-delete marker.
    pub logic_delete: bool,
    /// Optimistic-lock version marker.
    pub version: bool,
    /// Tenant marker.
    pub tenant_id: bool,
    /// Expression written when an insert omits the column.
    pub on_insert_value: Option<String>,
    /// Expression written when an update omits the column.
    pub on_update_value: Option<String>,
    /// Value-transform handler.
    pub type_handler: Option<HandlerFactory>,
    /// Alternate name used in projections.
    pub alias: Option<String>,
}

/// A single entity field.
#[derive(Debug, Clone)]
pub struct FieldDef {
    pub(crate) name: String,
    pub(crate) field_type: FieldType,
    pub(crate) is_static: bool,
    pub(crate) column: ColumnConfig,
    pub(crate) key: Option<KeyConfig>,
    pub(crate) mask: Option<String>,
}

impl FieldDef {
    /// A field with an already classified type.
    #[must_use]
    pub fn new(name: impl Into<String>, field_type: FieldType) -> Self {
        Self {
            name: name.into(),
            field_type,
            is_static: false,
            column: ColumnConfig::default(),
            key: None,
            mask: None,
        }
    }

    /// A field whose type is given as written in source.
    #[must_use]
    pub fn parse(name: impl Into<String>, written_type: &str) -> Self {
        Self::new(name, FieldType::parse(written_type))
    }

    /// Field name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Declared type.
    #[must_use]
    pub const fn field_type(&self) -> &FieldType {
        &self.field_type
    }

    /// Marks the field as shared by all instances. Such fields are never columns.
    #[must_use]
    pub const fn static_field(mut self) -> Self {
        self.is_static = true;
        self
    }

    /// Marks the field as the primary key (or part of it).
    #[must_use]
    pub fn id(self, key_type: KeyType) -> Self {
        self.key(KeyConfig {
            key_type,
            ..KeyConfig::default()
        })
    }

    /// Primary key with full options.
    #[must_use]
    pub fn key(mut self, key: KeyConfig) -> Self {
        self.key = Some(key);
        self
    }

    /// Explicit column name.
    #[must_use]
    pub fn column(mut self, name: impl Into<String>) -> Self {
        self.column.column = Some(name.into());
        self
    }

    /// See [`ColumnConfig::ignore`].
    #[must_use]
    pub const fn ignore(mut self) -> Self {
        self.column.ignore = true;
        self
    }

    /// See [`ColumnConfig::large`].
    #[must_use]
    pub const fn large(mut self) -> Self {
        self.column.large = true;
        self
    }

    /// See [`ColumnConfig::logic_delete`].
    #[must_use]
    pub const fn logic_delete(mut self) -> Self {
        self.column.logic_delete = true;
        self
    }

    /// See [`ColumnConfig::version`].
    #[must_use]
    pub const fn version(mut self) -> Self {
        self.column.version = true;
        self
    }

    /// See [`ColumnConfig::tenant_id`].
    #[must_use]
    pub const fn tenant_id(mut self) -> Self {
        self.column.tenant_id = true;
        self
    }

    /// See [`ColumnConfig::on_insert_value`].
    #[must_use]
    pub fn on_insert(mut self, value: impl Into<String>) -> Self {
        self.column.on_insert_value = Some(value.into());
        self
    }

    /// See [`ColumnConfig::on_update_value`].
    #[must_use]
    pub fn on_update(mut self, value: impl Into<String>) -> Self {
        self.column.on_update_value = Some(value.into());
        self
    }

    /// See [`ColumnConfig::type_handler`].
    #[must_use]
    pub const fn handler(mut self, factory: HandlerFactory) -> Self {
        self.column.type_handler = Some(factory);
        self
    }

    /// Masking rule, see [`crate::mask`]. Only valid on text fields.
    #[must_use]
    pub fn mask(mut self, rule: impl Into<String>) -> Self {
        self.mask = Some(rule.into());
        self
    }

    /// See [`ColumnConfig::alias`].
    #[must_use]
    pub fn alias(mut self, alias: impl Into<String>) -> Self {
        self.column.alias = Some(alias.into());
        self
    }

    /// Declares the field type to be an enum.
    #[must_use]
    pub fn enumeration(mut self) -> Self {
        self.field_type = FieldType::Enum(self.field_type.name());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base() -> EntityDef {
        EntityDef::new("IdEntity")
            .field(FieldDef::parse("id", "i64").id(KeyType::Auto))
            .field(FieldDef::parse("createdAt", "NaiveDateTime"))
    }

    #[test]
    fn own_fields_first() {
        let def = EntityDef::new("Outer")
            .field(FieldDef::parse("name", "String"))
            .field(FieldDef::parse("CREATEDAT", "String"))
            .field(FieldDef::parse("COUNTER", "i32").static_field())
            .extends(base());

        let names: Vec<&str> = def.column_fields().iter().map(|f| f.name()).collect();
        assert_eq!(names, ["name", "CREATEDAT", "id"]);
        assert_eq!(def.column_fields()[1].field_type(), &FieldType::parse("String"));
    }

    #[test]
    fn getter_alias_searches_upward() {
        let def = EntityDef::new("Outer")
            .getter_alias("id", "outer_id")
            .extends(base().getter_alias("createdAt", "created"));

        assert_eq!(def.getter_alias_for("id"), Some("outer_id"));
        assert_eq!(def.getter_alias_for("createdAt"), Some("created"));
        assert_eq!(def.getter_alias_for("name"), None);
    }

    #[test]
    fn enumeration_keeps_name() {
        let field = FieldDef::parse("status", "Option<Status>").enumeration();
        assert_eq!(field.field_type(), &FieldType::Enum("Status".to_string()));
    }
}
