//! Common test helpers shared across integration tests.
#![allow(dead_code)]

use std::sync::Arc;

use chrono::NaiveDateTime;
use flex_orm::{
    Assignments, Entity, EntityDef, FieldDef, JsonHandler, KeyType, Listener, TableConfig, Value,
    entity,
};

// Common test entities used across multiple test files

entity! {
    table = "tb_account",
    #[derive(Debug, Clone)]
    pub struct Account {
        pub id: i64 => [id],
        pub user_name: String,
        pub age: i32,
        pub tags: Vec<String> => [handler = JsonHandler::FACTORY],
        pub avatar: Vec<u8> => [large],
        pub version: i32 => [version],
        pub deleted: bool => [logic_delete],
    }
}

entity! {
    #[derive(Debug, Clone)]
    pub struct Article {
        pub id: i64 => [id],
        pub account_id: i64,
        pub title: String,
        pub content: String => [large],
        pub created_at: NaiveDateTime => [on_insert = "now()"],
        pub updated_at: NaiveDateTime => [on_insert = "now()", on_update = "now()"],
    }
}

entity! {
    #[derive(Debug, Clone)]
    pub struct UserProfile {
        pub id: i64 => [id],
        pub nick_name: String => [column = "nickname", alias = "nick"],
        pub mobile: String => [mask = "mobile"],
        pub secret: String => [ignore],
    }
}

entity! {
    #[derive(Debug, Clone)]
    pub struct Item {
        pub id: i64 => [id],
        pub name: Option<String>,
    }
}

/// Entity described by hand, with listeners that stamp the modifying user.
#[derive(Debug, Clone)]
pub struct Audited {
    pub id: i64,
    pub name: String,
    pub modified_by: String,
}

impl Entity for Audited {
    fn describe() -> EntityDef {
        EntityDef::new("Audited")
            .table(TableConfig::default().on_insert(stamp).on_update(stamp))
            .field(FieldDef::parse("id", "i64").id(KeyType::Auto))
            .field(FieldDef::parse("name", "String"))
            .field(FieldDef::parse("modifiedBy", "String"))
    }
}

#[derive(Debug)]
struct Stamp;

impl Listener for Stamp {
    fn on_insert(&self, values: &mut Assignments) {
        values.push(("modifiedBy".to_string(), Value::from("system")));
    }

    fn on_update(&self, values: &mut Assignments) {
        values.retain(|(name, _)| name != "id");
        values.push(("modifiedBy".to_string(), Value::from("system")));
    }
}

fn stamp() -> Arc<dyn Listener> {
    Arc::new(Stamp)
}

/// Route `tracing` output to the test harness. Filter with `RUST_LOG`.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// Normalize SQL by collapsing whitespace.
fn normalize_sql(sql: &str) -> String {
    sql.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Canonicalize SQL for comparison by removing identifier quotes and normalizing whitespace.
/// Preserves quotes inside string literals.
fn canonicalize_sql(sql: &str) -> String {
    let mut cleaned = String::with_capacity(sql.len());
    let mut in_single_quote = false;

    for ch in sql.chars() {
        match ch {
            '\'' => {
                in_single_quote = !in_single_quote;
                cleaned.push(ch);
            }
            '"' | '`' if !in_single_quote => {
                // Strip identifier quoting so one expectation fits every dialect.
            }
            _ => cleaned.push(ch),
        }
    }

    normalize_sql(&cleaned)
}

/// Assert that SQL contains all expected fragments in order.
///
/// Identifier quotes are stripped and whitespace normalized before
/// fragments are searched for sequentially in the generated SQL.
#[allow(clippy::missing_panics_doc)]
pub fn assert_sql_contains(actual: &str, fragments: &[&str]) {
    let actual_canonical = canonicalize_sql(actual);
    let mut search_start = 0usize;

    for fragment in fragments {
        let fragment_canonical = canonicalize_sql(fragment);
        if fragment_canonical.is_empty() {
            continue;
        }

        if let Some(pos) = actual_canonical[search_start..].find(&fragment_canonical) {
            search_start += pos + fragment_canonical.len();
        } else {
            panic!(
                "expected SQL fragment `{fragment_canonical}` not found in `{actual_canonical}`"
            );
        }
    }
}
