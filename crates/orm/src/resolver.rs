//! Entity metadata resolution.
//!
//! Descriptors are built at most once per entity type. Concurrent first
//! requests for the same type wait on a single build; requests for different
//! types never wait on each other.

use std::any::TypeId;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, LazyLock};

use dashmap::DashMap;
use moka::sync::Cache;

use crate::config::{GlobalConfig, global_config};
use crate::descriptor::{ColumnDescriptor, KeyDescriptor, TableDescriptor};
use crate::entity::{Entity, EntityDef, FieldDef};
use crate::error::{Error, Result, config_error};
use crate::types::{ColumnTypeRegistry, FieldType};

static RESOLVER: LazyLock<EntityMetadataResolver> = LazyLock::new(EntityMetadataResolver::new);

/// Resolve (or fetch the cached) descriptor for `E` from the process-wide resolver.
///
/// # Errors
///
/// Returns a configuration error if the entity's metadata is inconsistent.
pub fn table_descriptor<E: Entity>() -> Result<Arc<TableDescriptor>> {
    RESOLVER.resolve::<E>()
}

/// Look up an already resolved descriptor by `schema.table` or table name.
#[must_use]
pub fn table_descriptor_by_name(name: &str) -> Option<Arc<TableDescriptor>> {
    RESOLVER.by_table_name(name)
}

/// Forget every descriptor held by the process-wide resolver.
///
/// Intended for test isolation; descriptors already handed out stay valid.
pub fn reset_table_descriptors() {
    RESOLVER.clear();
}

/// Builds and caches [`TableDescriptor`]s.
pub struct EntityMetadataResolver {
    by_type: Cache<TypeId, Arc<TableDescriptor>>,
    by_name: DashMap<String, Arc<TableDescriptor>>,
    scans: AtomicUsize,
}

impl Default for EntityMetadataResolver {
    fn default() -> Self {
        Self::new()
    }
}

impl EntityMetadataResolver {
    /// An empty resolver.
    #[must_use]
    pub fn new() -> Self {
        Self {
            by_type: Cache::builder().build(),
            by_name: DashMap::new(),
            scans: AtomicUsize::new(0),
        }
    }

    /// Descriptor for `E`, building it on first use.
    ///
    /// # Errors
    ///
    /// Returns a configuration error if the entity's metadata is inconsistent.
    /// Nothing is cached in that case and the next call tries again.
    pub fn resolve<E: Entity>(&self) -> Result<Arc<TableDescriptor>> {
        self.by_type
            .try_get_with(TypeId::of::<E>(), || -> Result<Arc<TableDescriptor>> {
                let descriptor = Arc::new(self.build(&E::describe(), &global_config())?);

                let name = descriptor.table_name_with_schema();
                if let Some(previous) = self.by_name.insert(name.clone(), Arc::clone(&descriptor)) {
                    tracing::warn!(
                        table = %name,
                        previous = previous.entity(),
                        entity = descriptor.entity(),
                        "table name is mapped by more than one entity"
                    );
                }
                tracing::debug!(
                    entity = descriptor.entity(),
                    table = %name,
                    columns = descriptor.columns().len(),
                    "published table descriptor"
                );
                Ok(descriptor)
            })
            .map_err(|e| Error::clone(&e))
    }

    /// Previously resolved descriptor by `schema.table` or table name.
    #[must_use]
    pub fn by_table_name(&self, name: &str) -> Option<Arc<TableDescriptor>> {
        let name = name.trim();
        if name.is_empty() {
            return None;
        }
        self.by_name.get(name).map(|entry| Arc::clone(entry.value()))
    }

    /// Number of descriptor builds performed so far.
    #[must_use]
    pub fn scan_count(&self) -> usize {
        self.scans.load(Ordering::SeqCst)
    }

    /// Forget every cached descriptor.
    pub fn clear(&self) {
        self.by_type.invalidate_all();
        self.by_name.clear();
    }

    /// Build a descriptor from an entity description.
    ///
    /// # Errors
    ///
    /// Returns a configuration error if the description is inconsistent.
    pub fn build(&self, def: &EntityDef, config: &GlobalConfig) -> Result<TableDescriptor> {
        self.scans.fetch_add(1, Ordering::SeqCst);
        DescriptorBuilder::new(def, config).build()
    }
}

struct DescriptorBuilder<'a> {
    def: &'a EntityDef,
    config: &'a GlobalConfig,
    camel_to_underline: bool,
    keys: Vec<ColumnDescriptor>,
    columns: Vec<ColumnDescriptor>,
    logic_delete_column: Option<String>,
    version_column: Option<String>,
    tenant_column: Option<String>,
    on_insert_defaults: Vec<(String, String)>,
    on_update_defaults: Vec<(String, String)>,
    large_columns: Vec<String>,
    default_projection: Vec<String>,
    associations: Vec<(String, String)>,
    collections: Vec<(String, String)>,
}

impl<'a> DescriptorBuilder<'a> {
    fn new(def: &'a EntityDef, config: &'a GlobalConfig) -> Self {
        let camel_to_underline = def
            .table_config()
            .and_then(|table| table.camel_to_underline)
            .unwrap_or(config.camel_to_underline);

        Self {
            def,
            config,
            camel_to_underline,
            keys: Vec::new(),
            columns: Vec::new(),
            logic_delete_column: None,
            version_column: None,
            tenant_column: None,
            on_insert_defaults: Vec::new(),
            on_update_defaults: Vec::new(),
            large_columns: Vec::new(),
            default_projection: Vec::new(),
            associations: Vec::new(),
            collections: Vec::new(),
        }
    }

    fn build(mut self) -> Result<TableDescriptor> {
        let def = self.def;
        let registry = ColumnTypeRegistry::global();

        for field in def.column_fields() {
            let field_type = field.field_type();

            if registry.is_ignored(field_type) {
                tracing::debug!(entity = def.name(), field = field.name(), "dropping query helper field");
                continue;
            }

            if field.column.type_handler.is_none()
                && !field_type.is_enum()
                && !registry.is_supported(field_type)
            {
                self.skip_unsupported(field)?;
                continue;
            }

            self.add_column(field)?;
        }

        let table = def.table_config();
        let table_name = table.and_then(|t| t.name.clone()).unwrap_or_else(|| {
            if self.camel_to_underline {
                camel_to_underline(def.name())
            } else {
                def.name().to_string()
            }
        });

        let key_count = self.keys.len();
        let mut columns = self.keys;
        columns.append(&mut self.columns);

        Ok(TableDescriptor {
            entity: def.name().to_string(),
            table_name,
            schema: table.and_then(|t| t.schema.clone()).filter(|s| !s.trim().is_empty()),
            data_source: table
                .and_then(|t| t.data_source.clone())
                .filter(|s| !s.trim().is_empty()),
            columns,
            key_count,
            logic_delete_column: self.logic_delete_column,
            version_column: self.version_column,
            tenant_column: self.tenant_column,
            logic_normal_value: self.config.logic_normal_value.clone(),
            logic_deleted_value: self.config.logic_deleted_value.clone(),
            on_insert_defaults: self.on_insert_defaults,
            on_update_defaults: self.on_update_defaults,
            large_columns: self.large_columns,
            default_projection: self.default_projection,
            associations: self.associations,
            collections: self.collections,
            insert_listeners: table
                .map(|t| t.on_insert.iter().map(|factory| factory()).collect())
                .unwrap_or_default(),
            update_listeners: table
                .map(|t| t.on_update.iter().map(|factory| factory()).collect())
                .unwrap_or_default(),
        })
    }

    // Fields without a handler whose type is neither a registered scalar nor
    // an enum are not columns. Collections and nested entities are recorded.
    fn skip_unsupported(&mut self, field: &FieldDef) -> Result<()> {
        if field.column.ignore {
            return Ok(());
        }
        match field.field_type() {
            FieldType::Collection { element, .. } => {
                self.collections.push((field.name().to_string(), element.clone()));
            }
            FieldType::Scalar(name) => {
                self.associations.push((field.name().to_string(), name.clone()));
            }
            other => {
                if self.config.strict_types {
                    return Err(config_error!(
                        self.def.name(),
                        "field `{}` has unsupported type `{other}` and no type handler",
                        field.name()
                    ));
                }
                tracing::debug!(
                    entity = self.def.name(),
                    field = field.name(),
                    field_type = %other,
                    "skipping field with unsupported type"
                );
            }
        }
        Ok(())
    }

    fn add_column(&mut self, field: &FieldDef) -> Result<()> {
        let def = self.def;
        let entity = def.name();
        let options = &field.column;
        let column = self.column_name(field);

        Self::claim_role(
            entity,
            "logical-delete",
            &mut self.logic_delete_column,
            options.logic_delete || self.config.logic_delete_column.as_deref() == Some(column.as_str()),
            &column,
        )?;
        Self::claim_role(
            entity,
            "version",
            &mut self.version_column,
            options.version || self.config.version_column.as_deref() == Some(column.as_str()),
            &column,
        )?;
        Self::claim_role(
            entity,
            "tenant",
            &mut self.tenant_column,
            options.tenant_id || self.config.tenant_column.as_deref() == Some(column.as_str()),
            &column,
        )?;

        if let Some(value) = non_blank(options.on_insert_value.as_deref()) {
            self.on_insert_defaults.push((column.clone(), value));
        }
        if let Some(value) = non_blank(options.on_update_value.as_deref()) {
            self.on_update_defaults.push((column.clone(), value));
        }
        if options.large {
            self.large_columns.push(column.clone());
        }
        if !options.large && !options.ignore && !self.default_projection.contains(&column) {
            self.default_projection.push(column.clone());
        }

        let handler = match &options.type_handler {
            Some(factory) => Some(factory.build(field.field_type()).map_err(|e| {
                Error::configuration_with(
                    entity,
                    format!("cannot construct handler {} for field `{}`", factory.name(), field.name()),
                    e,
                )
            })?),
            None => None,
        };

        let mask = non_blank(field.mask.as_deref());
        if let Some(rule) = &mask
            && !field.field_type().is_text()
        {
            return Err(config_error!(
                entity,
                "mask `{rule}` only supports text fields, `{}` is `{}`",
                field.name(),
                field.field_type()
            ));
        }

        let alias = def
            .getter_alias_for(field.name())
            .map(ToString::to_string)
            .or_else(|| options.alias.clone());

        let descriptor = ColumnDescriptor {
            column,
            property: field.name().to_string(),
            field_type: field.field_type().clone(),
            alias,
            handler,
            mask,
            ignore: options.ignore,
            key: field.key.as_ref().map(|key| KeyDescriptor {
                key_type: key.key_type,
                value: key.value.clone(),
                before: key.before,
            }),
        };

        if descriptor.key.is_some() {
            self.keys.push(descriptor);
        } else {
            self.columns.push(descriptor);
        }
        Ok(())
    }

    fn claim_role(
        entity: &str, role: &str, slot: &mut Option<String>, marked: bool, column: &str,
    ) -> Result<()> {
        if !marked {
            return Ok(());
        }
        if let Some(existing) = slot {
            return Err(config_error!(
                entity,
                "more than one {role} column: `{existing}` and `{column}`"
            ));
        }
        *slot = Some(column.to_string());
        Ok(())
    }

    fn column_name(&self, field: &FieldDef) -> String {
        if let Some(name) = non_blank(field.column.column.as_deref()) {
            return name;
        }
        if self.camel_to_underline {
            camel_to_underline(field.name())
        } else {
            field.name().to_string()
        }
    }
}

fn non_blank(value: Option<&str>) -> Option<String> {
    value.map(str::trim).filter(|v| !v.is_empty()).map(ToString::to_string)
}

/// `UserAccount` → `user_account`, `userID` → `user_id`.
#[must_use]
pub fn camel_to_underline(name: &str) -> String {
    let mut out = String::with_capacity(name.len() + 4);
    let mut prev: Option<char> = None;
    for ch in name.chars() {
        if ch.is_uppercase()
            && let Some(p) = prev
            && !p.is_uppercase()
            && p != '_'
        {
            out.push('_');
        }
        out.extend(ch.to_lowercase());
        prev = Some(ch);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entity::{KeyType, TableConfig};
    use crate::handler::{HandlerFactory, JsonHandler};

    fn resolve(def: &EntityDef) -> Result<TableDescriptor> {
        EntityMetadataResolver::new().build(def, &GlobalConfig::default())
    }

    #[test]
    fn camel_case_names() {
        assert_eq!(camel_to_underline("UserAccount"), "user_account");
        assert_eq!(camel_to_underline("userID"), "user_id");
        assert_eq!(camel_to_underline("user_name"), "user_name");
        assert_eq!(camel_to_underline("A"), "a");
    }

    #[test]
    fn keys_precede_columns() {
        let def = EntityDef::new("Order")
            .field(FieldDef::parse("title", "String"))
            .field(FieldDef::parse("tenantNo", "i64").id(KeyType::None))
            .field(FieldDef::parse("amount", "f64"))
            .field(FieldDef::parse("orderId", "i64").id(KeyType::Auto));

        let descriptor = resolve(&def).unwrap();
        let columns: Vec<&str> = descriptor.columns().iter().map(ColumnDescriptor::column).collect();
        assert_eq!(columns, ["tenant_no", "order_id", "title", "amount"]);
        assert_eq!(descriptor.primary_keys().len(), 2);
        assert_eq!(descriptor.non_key_columns().len(), 2);
        assert_eq!(descriptor.default_projection(), ["title", "tenant_no", "amount", "order_id"]);
    }

    #[test]
    fn duplicate_version_column() {
        let def = EntityDef::new("Ledger")
            .field(FieldDef::parse("id", "i64").id(KeyType::Auto))
            .field(FieldDef::parse("rev", "i32").version())
            .field(FieldDef::parse("revision", "i32").version());

        let err = resolve(&def).unwrap_err();
        assert!(err.is_configuration());
        let message = err.to_string();
        assert!(message.contains("Ledger"), "{message}");
        assert!(message.contains("revision"), "{message}");
    }

    #[test]
    fn global_role_names() {
        let config = GlobalConfig {
            logic_delete_column: Some("is_deleted".to_string()),
            ..GlobalConfig::default()
        };
        let def = EntityDef::new("Note")
            .field(FieldDef::parse("id", "i64").id(KeyType::Auto))
            .field(FieldDef::parse("isDeleted", "bool"));
        let descriptor = EntityMetadataResolver::new().build(&def, &config).unwrap();
        assert_eq!(descriptor.logic_delete_column(), Some("is_deleted"));

        let twice = def.field(FieldDef::parse("gone", "bool").logic_delete());
        EntityMetadataResolver::new().build(&twice, &config).unwrap_err();
    }

    #[test]
    fn unsupported_fields_are_recorded_or_skipped() {
        let def = EntityDef::new("Profile")
            .field(FieldDef::parse("id", "i64").id(KeyType::Auto))
            .field(FieldDef::parse("address", "Address"))
            .field(FieldDef::parse("tags", "Vec<String>"))
            .field(FieldDef::parse("attrs", "HashMap<String, String>"))
            .field(FieldDef::parse("helper", "QueryWrapper"))
            .field(FieldDef::parse("status", "Status").enumeration());

        let descriptor = resolve(&def).unwrap();
        let columns: Vec<&str> = descriptor.columns().iter().map(ColumnDescriptor::column).collect();
        assert_eq!(columns, ["id", "status"]);
        assert_eq!(descriptor.associations(), [("address".to_string(), "Address".to_string())]);
        assert_eq!(descriptor.collections(), [("tags".to_string(), "String".to_string())]);
    }

    #[test]
    fn strict_types_rejects_maps() {
        let config = GlobalConfig {
            strict_types: true,
            ..GlobalConfig::default()
        };
        let def = EntityDef::new("Profile")
            .field(FieldDef::parse("attrs", "HashMap<String, String>"));
        let err = EntityMetadataResolver::new().build(&def, &config).unwrap_err();
        assert!(err.to_string().contains("attrs"));
    }

    #[test]
    fn handler_makes_collection_a_column() {
        let def = EntityDef::new("Article")
            .field(FieldDef::parse("id", "i64").id(KeyType::Auto))
            .field(FieldDef::parse("tags", "Vec<String>").handler(JsonHandler::FACTORY));

        let descriptor = resolve(&def).unwrap();
        let tags = descriptor.column("tags").unwrap();
        assert_eq!(tags.handler().map(|h| h.name()), Some("JsonHandler"));
        assert!(descriptor.collections().is_empty());
    }

    #[test]
    fn handler_failure_is_configuration_error() {
        let def = EntityDef::new("Article")
            .field(FieldDef::parse("tags", "Vec<String>").handler(HandlerFactory::new("Nothing")));

        let err = resolve(&def).unwrap_err();
        assert!(err.is_configuration());
        assert!(std::error::Error::source(&err).is_some());
    }

    #[test]
    fn mask_requires_text() {
        let def = EntityDef::new("Card").field(FieldDef::parse("number", "i64").mask("bank_card_number"));
        let err = resolve(&def).unwrap_err();
        assert!(err.to_string().contains("number"));

        let def = EntityDef::new("Card").field(FieldDef::parse("number", "String").mask(" mobile "));
        let descriptor = resolve(&def).unwrap();
        assert_eq!(descriptor.column("number").and_then(ColumnDescriptor::mask), Some("mobile"));
    }

    #[test]
    fn table_options() {
        let def = EntityDef::new("UserAccount")
            .table(TableConfig::default().schema("crm").data_source("replica"))
            .field(FieldDef::parse("userName", "String").on_insert(" now() ").large())
            .field(FieldDef::parse("secret", "String").ignore());

        let descriptor = resolve(&def).unwrap();
        assert_eq!(descriptor.table_name(), "user_account");
        assert_eq!(descriptor.table_name_with_schema(), "crm.user_account");
        assert_eq!(descriptor.data_source(), Some("replica"));
        assert_eq!(descriptor.on_insert_defaults(), [("user_name".to_string(), "now()".to_string())]);
        assert_eq!(descriptor.large_columns(), ["user_name"]);
        assert!(descriptor.default_projection().is_empty());
        assert!(descriptor.column("secret").unwrap().is_ignored());
    }

    #[test]
    fn camel_to_underline_disabled() {
        let def = EntityDef::new("UserAccount")
            .table(TableConfig::default().camel_to_underline(false))
            .field(FieldDef::parse("userName", "String"));

        let descriptor = resolve(&def).unwrap();
        assert_eq!(descriptor.table_name(), "UserAccount");
        assert_eq!(descriptor.columns()[0].column(), "userName");
    }

    #[test]
    fn getter_alias_wins() {
        let base = EntityDef::new("IdEntity").field(FieldDef::parse("id", "i32").id(KeyType::Auto).alias("pk"));
        let def = EntityDef::new("Outer")
            .table(TableConfig::named("tb_outer"))
            .field(FieldDef::parse("name", "String"))
            .getter_alias("id", "outer_id")
            .extends(base);

        let descriptor = resolve(&def).unwrap();
        assert_eq!(descriptor.primary_keys()[0].alias(), Some("outer_id"));
        assert_eq!(descriptor.table_name(), "tb_outer");
    }
}
