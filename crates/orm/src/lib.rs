//! Entity metadata and SQL rendering for relational databases.
//!
//! Entities are described once, resolved into an immutable
//! [`TableDescriptor`], and used to build SELECT, INSERT, UPDATE and DELETE
//! statements for a pluggable SQL [`Dialect`]. Every statement renders to SQL
//! text plus the ordered list of values bound to its placeholders.
//!
//! # Quick Start
//!
//! ## Define an Entity
//!
//! ```ignore
//! use flex_orm::{entity, JsonHandler};
//!
//! entity! {
//!     table = "tb_account",
//!     #[derive(Debug, Clone)]
//!     pub struct Account {
//!         pub id: i64 => [id],
//!         pub user_name: String,
//!         pub tags: Vec<String> => [handler = JsonHandler::FACTORY],
//!         pub avatar: Vec<u8> => [large],
//!         pub version: i32 => [version],
//!         pub deleted: bool => [logic_delete],
//!     }
//! }
//! ```
//!
//! ## Select
//!
//! ```ignore
//! use flex_orm::{Postgres, QueryColumn, QueryWrapper, column};
//!
//! let query = QueryWrapper::new()
//!     .from_entity::<Account>()?
//!     .r#where(column("user_name").like("%rust%"))
//!     .and(column("id").in_list([1, 2, 3]))
//!     .order_by_desc(column("id"))
//!     .limit(10)
//!     .build(&Postgres::new())?;
//! // SELECT "id", "user_name", "tags", "version", "deleted" FROM "tb_account"
//! // WHERE ("user_name" LIKE $1 AND "id" IN ($2, $3, $4)) AND "deleted" = 0
//! // ORDER BY "id" DESC LIMIT 10
//! ```
//!
//! ## Sub-selects
//!
//! ```ignore
//! let articles = QueryWrapper::new()
//!     .select([QueryColumn::count(QueryColumn::all())])
//!     .from(QueryTable::named("article"))
//!     .r#where(QueryColumn::new("article", "account_id").eq_column(QueryColumn::new("account", "id")));
//!
//! let query = QueryWrapper::new()
//!     .select([column("id"), QueryColumn::select(articles).alias("total")])
//!     .from(QueryTable::named("account"))
//!     .build(&MySql::new())?;
//! ```
//!
//! ## Insert, update and delete
//!
//! ```ignore
//! InsertBuilder::<Account>::new()
//!     .set("user_name", "alice")
//!     .on_conflict("user_name")
//!     .do_update_all()
//!     .build(&Postgres::new())?;
//!
//! // UPDATE "tb_account" SET "user_name" = $1, "version" = "version" + 1
//! // WHERE "id" = $2 AND "version" = $3 AND "deleted" = 0
//! UpdateBuilder::<Account>::new()
//!     .set("user_name", "bob")
//!     .r#where(column("id").eq(42))
//!     .expect_version(3)
//!     .build(&Postgres::new())?;
//!
//! // UPDATE "tb_account" SET "deleted" = 1 WHERE "id" = $1 AND "deleted" = 0
//! DeleteBuilder::<Account>::new().r#where(column("id").eq(42)).build(&Postgres::new())?;
//! ```

pub mod config;
mod delete;
mod descriptor;
pub mod dialect;
mod entity;
mod error;
mod fragment;
pub mod handler;
mod insert;
pub mod listener;
pub mod mask;
mod query;
mod resolver;
mod statement;
pub mod types;
mod update;
mod wrapper;

pub use config::{GlobalConfig, global_config, set_global_config};
pub use delete::DeleteBuilder;
pub use descriptor::{ColumnDescriptor, KeyDescriptor, TableDescriptor};
pub use dialect::{
    ConflictAction, Dialect, KeywordWrap, MySql, Oracle, Placeholder, Postgres, Sqlite, Upsert,
    default_dialect, dialect, register_dialect,
};
pub use entity::{ColumnConfig, Entity, EntityDef, FieldDef, KeyConfig, KeyType, TableConfig};
pub use error::{Cause, Error, Result};
pub use fragment::{
    CompareOp, InSource, Join, JoinKind, Operand, QueryColumn, QueryCondition, QueryTable, column,
};
pub use handler::{HandlerFactory, JsonHandler, TypeHandler};
pub use insert::InsertBuilder;
pub use listener::{Assignments, Listener, ListenerFactory};
pub use query::{ParamWriter, Query, RenderContext, SqlWriter, TextWriter, render};
pub use resolver::{
    EntityMetadataResolver, camel_to_underline, reset_table_descriptors, table_descriptor,
    table_descriptor_by_name,
};
// Bound values are sea-query values; re-exported so callers need not depend on it.
pub use sea_query::Value;
pub use types::{ColumnTypeRegistry, FieldType, register_ignored_type, register_supported_type};
pub use update::UpdateBuilder;
pub use wrapper::QueryWrapper;
