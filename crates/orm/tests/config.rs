//! Integration tests for process-wide configuration.
//!
//! Global settings are shared by every test in a binary, so this file holds a
//! single test.

#![allow(missing_docs)]
#![allow(dead_code)]
#![allow(non_snake_case)]

use flex_orm::{
    GlobalConfig, InsertBuilder, QueryWrapper, column, default_dialect, entity, global_config,
    set_global_config, table_descriptor,
};

entity! {
    pub struct UserAccount {
        pub userId: i64 => [id],
        pub userName: String,
        pub removed: String,
    }
}

entity! {
    pub struct AuditLog {
        pub logId: i64 => [id],
        pub message: String,
    }
}

#[test]
fn global_settings_apply_to_later_resolutions() {
    let first = table_descriptor::<UserAccount>().unwrap();
    assert_eq!(first.table_name(), "user_account");
    assert_eq!(first.logic_delete_column(), None);

    set_global_config(GlobalConfig {
        camel_to_underline: false,
        logic_delete_column: Some("removed".to_string()),
        logic_normal_value: "live".to_string(),
        logic_deleted_value: "gone".to_string(),
        dialect: "mysql".to_string(),
        ..GlobalConfig::default()
    });
    assert!(!global_config().camel_to_underline);

    // already published descriptors keep the settings they were built with
    let cached = table_descriptor::<UserAccount>().unwrap();
    assert_eq!(cached.table_name(), "user_account");

    let log = table_descriptor::<AuditLog>().unwrap();
    assert_eq!(log.table_name(), "AuditLog");
    assert_eq!(log.primary_keys()[0].column(), "logId");

    let dialect = default_dialect().unwrap();
    assert_eq!(dialect.name(), "mysql");
    let query = QueryWrapper::new()
        .from_entity::<AuditLog>()
        .unwrap()
        .r#where(column("message").like("%boot%"))
        .build(dialect.as_ref())
        .unwrap();
    assert_eq!(query.sql, "SELECT `logId`, `message` FROM `AuditLog` WHERE `message` LIKE ?");

    flex_orm::reset_table_descriptors();
    let account = table_descriptor::<UserAccount>().unwrap();
    assert_eq!(account.table_name(), "UserAccount");
    assert_eq!(account.logic_delete_column(), Some("removed"));

    let insert = InsertBuilder::<UserAccount>::new().set("userName", "ann").build(dialect.as_ref());
    assert_eq!(
        insert.unwrap().sql,
        "INSERT INTO `UserAccount` (`userName`, `removed`) VALUES (?, 'live')"
    );

    set_global_config(GlobalConfig::default());
}
