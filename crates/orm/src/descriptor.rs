//! Resolved table metadata.

use std::sync::Arc;

use crate::entity::KeyType;
use crate::handler::TypeHandler;
use crate::listener::Listener;
use crate::types::FieldType;

/// Primary key details of a key column.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyDescriptor {
    /// Generation strategy.
    pub key_type: KeyType,
    /// Generator name or sequence SQL.
    pub value: Option<String>,
    /// Generate before the insert.
    pub before: bool,
}

/// A resolved column.
#[derive(Debug, Clone)]
pub struct ColumnDescriptor {
    pub(crate) column: String,
    pub(crate) property: String,
    pub(crate) field_type: FieldType,
    pub(crate) alias: Option<String>,
    pub(crate) handler: Option<Arc<dyn TypeHandler>>,
    pub(crate) mask: Option<String>,
    pub(crate) ignore: bool,
    pub(crate) key: Option<KeyDescriptor>,
}

impl ColumnDescriptor {
    /// Column name.
    #[must_use]
    pub fn column(&self) -> &str {
        &self.column
    }

    /// Source field name.
    #[must_use]
    pub fn property(&self) -> &str {
        &self.property
    }

    /// Declared field type.
    #[must_use]
    pub const fn field_type(&self) -> &FieldType {
        &self.field_type
    }

    /// Alternate projection name.
    #[must_use]
    pub fn alias(&self) -> Option<&str> {
        self.alias.as_deref()
    }

    /// Value-transform handler.
    #[must_use]
    pub fn handler(&self) -> Option<&Arc<dyn TypeHandler>> {
        self.handler.as_ref()
    }

    /// Masking rule.
    #[must_use]
    pub fn mask(&self) -> Option<&str> {
        self.mask.as_deref()
    }

    /// Column is kept in metadata only.
    #[must_use]
    pub const fn is_ignored(&self) -> bool {
        self.ignore
    }

    /// Key details, for primary key columns.
    #[must_use]
    pub const fn key(&self) -> Option<&KeyDescriptor> {
        self.key.as_ref()
    }

    /// `true` for primary key columns.
    #[must_use]
    pub const fn is_primary_key(&self) -> bool {
        self.key.is_some()
    }
}

/// Immutable metadata for one entity type.
///
/// Built once by the resolver and shared by every reader.
#[derive(Debug)]
pub struct TableDescriptor {
    pub(crate) entity: String,
    pub(crate) table_name: String,
    pub(crate) schema: Option<String>,
    pub(crate) data_source: Option<String>,
    // primary keys first, then the remaining columns in field order
    pub(crate) columns: Vec<ColumnDescriptor>,
    pub(crate) key_count: usize,
    pub(crate) logic_delete_column: Option<String>,
    pub(crate) version_column: Option<String>,
    pub(crate) tenant_column: Option<String>,
    pub(crate) logic_normal_value: String,
    pub(crate) logic_deleted_value: String,
    pub(crate) on_insert_defaults: Vec<(String, String)>,
    pub(crate) on_update_defaults: Vec<(String, String)>,
    pub(crate) large_columns: Vec<String>,
    pub(crate) default_projection: Vec<String>,
    pub(crate) associations: Vec<(String, String)>,
    pub(crate) collections: Vec<(String, String)>,
    pub(crate) insert_listeners: Vec<Arc<dyn Listener>>,
    pub(crate) update_listeners: Vec<Arc<dyn Listener>>,
}

impl TableDescriptor {
    /// Name of the entity type.
    #[must_use]
    pub fn entity(&self) -> &str {
        &self.entity
    }

    /// Table name.
    #[must_use]
    pub fn table_name(&self) -> &str {
        &self.table_name
    }

    /// Schema, if any.
    #[must_use]
    pub fn schema(&self) -> Option<&str> {
        self.schema.as_deref()
    }

    /// `schema.table`, or the bare table name without a schema.
    #[must_use]
    pub fn table_name_with_schema(&self) -> String {
        match &self.schema {
            Some(schema) => format!("{schema}.{}", self.table_name),
            None => self.table_name.clone(),
        }
    }

    /// Logical data source tag.
    #[must_use]
    pub fn data_source(&self) -> Option<&str> {
        self.data_source.as_deref()
    }

    /// All columns, primary keys first.
    #[must_use]
    pub fn columns(&self) -> &[ColumnDescriptor] {
        &self.columns
    }

    /// Primary key columns, in declaration order.
    #[must_use]
    pub fn primary_keys(&self) -> &[ColumnDescriptor] {
        &self.columns[..self.key_count]
    }

    /// Columns that are not part of the primary key.
    #[must_use]
    pub fn non_key_columns(&self) -> &[ColumnDescriptor] {
        &self.columns[self.key_count..]
    }

    /// Column by column name.
    #[must_use]
    pub fn column(&self, column: &str) -> Option<&ColumnDescriptor> {
        self.columns.iter().find(|c| c.column == column)
    }

    /// Column by source field name.
    #[must_use]
    pub fn column_by_property(&self, property: &str) -> Option<&ColumnDescriptor> {
        self.columns.iter().find(|c| c.property == property)
    }

    /// Column by column name, falling back to the source field name.
    #[must_use]
    pub fn lookup(&self, name: &str) -> Option<&ColumnDescriptor> {
        self.column(name).or_else(|| self.column_by_property(name))
    }

    /// Logical-delete column.
    #[must_use]
    pub fn logic_delete_column(&self) -> Option<&str> {
        self.logic_delete_column.as_deref()
    }

    /// Optimistic-lock version column.
    #[must_use]
    pub fn version_column(&self) -> Option<&str> {
        self.version_column.as_deref()
    }

    /// Tenant column.
    #[must_use]
    pub fn tenant_column(&self) -> Option<&str> {
        self.tenant_column.as_deref()
    }

    /// Literal marking a row as live.
    #[must_use]
    pub fn logic_normal_value(&self) -> &str {
        &self.logic_normal_value
    }

    /// Literal marking a row as deleted.
    #[must_use]
    pub fn logic_deleted_value(&self) -> &str {
        &self.logic_deleted_value
    }

    /// Column → expression written when an insert omits the column.
    #[must_use]
    pub fn on_insert_defaults(&self) -> &[(String, String)] {
        &self.on_insert_defaults
    }

    /// Column → expression written when an update omits the column.
    #[must_use]
    pub fn on_update_defaults(&self) -> &[(String, String)] {
        &self.on_update_defaults
    }

    /// Columns excluded from the default projection for size reasons.
    #[must_use]
    pub fn large_columns(&self) -> &[String] {
        &self.large_columns
    }

    /// Columns selected when a query names none.
    #[must_use]
    pub fn default_projection(&self) -> &[String] {
        &self.default_projection
    }

    /// Field → type name of nested entity fields. Never joined automatically.
    #[must_use]
    pub fn associations(&self) -> &[(String, String)] {
        &self.associations
    }

    /// Field → element type name of collection fields.
    #[must_use]
    pub fn collections(&self) -> &[(String, String)] {
        &self.collections
    }

    /// Insert listeners, in run order.
    #[must_use]
    pub fn insert_listeners(&self) -> &[Arc<dyn Listener>] {
        &self.insert_listeners
    }

    /// Update listeners, in run order.
    #[must_use]
    pub fn update_listeners(&self) -> &[Arc<dyn Listener>] {
        &self.update_listeners
    }
}
