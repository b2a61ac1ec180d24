//! Integration tests for entity metadata resolution.

#![allow(missing_docs)]
#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Barrier};
use std::thread;
use std::time::Duration;

use flex_orm::{
    Entity, EntityDef, EntityMetadataResolver, FieldDef, KeyType, TableConfig, entity,
    reset_table_descriptors, table_descriptor, table_descriptor_by_name,
};

entity! {
    table = "ledger",
    pub struct Ledger {
        pub id: i64 => [id],
        pub amount: i64,
        pub version: i32 => [version],
    }
}

entity! {
    pub struct Journal {
        pub id: i64 => [id],
        pub note: String,
    }
}

static SLOW_DESCRIBES: AtomicUsize = AtomicUsize::new(0);

/// Takes long enough to describe that concurrent first lookups overlap.
pub struct Slow;

impl Entity for Slow {
    fn describe() -> EntityDef {
        SLOW_DESCRIBES.fetch_add(1, Ordering::SeqCst);
        thread::sleep(Duration::from_millis(50));
        EntityDef::new("Slow")
            .field(FieldDef::parse("id", "i64").id(KeyType::Auto))
            .field(FieldDef::parse("version", "i32").version())
    }
}

pub struct Broken;

impl Entity for Broken {
    fn describe() -> EntityDef {
        EntityDef::new("Broken")
            .field(FieldDef::parse("id", "i64").id(KeyType::Auto))
            .field(FieldDef::parse("rev", "i32").version())
            .field(FieldDef::parse("revision", "i32").version())
    }
}

pub struct Invoice;

impl Entity for Invoice {
    fn describe() -> EntityDef {
        let audit = EntityDef::new("Audit")
            .field(FieldDef::parse("id", "i64").id(KeyType::Auto))
            .field(FieldDef::parse("createdBy", "String").on_insert("current_user"));

        EntityDef::new("Invoice")
            .table(TableConfig::default().schema("billing"))
            .field(FieldDef::parse("total", "Decimal"))
            .field(FieldDef::parse("CreatedBy", "String"))
            .extends(audit)
    }
}

#[test]
fn concurrent_first_resolution_builds_once() {
    const THREADS: usize = 16;
    let resolver = EntityMetadataResolver::new();
    let barrier = Barrier::new(THREADS);

    let descriptors: Vec<_> = thread::scope(|scope| {
        let handles: Vec<_> = (0..THREADS)
            .map(|_| {
                scope.spawn(|| {
                    barrier.wait();
                    resolver.resolve::<Slow>().unwrap()
                })
            })
            .collect();
        handles.into_iter().map(|handle| handle.join().unwrap()).collect()
    });

    assert_eq!(resolver.scan_count(), 1);
    assert_eq!(SLOW_DESCRIBES.load(Ordering::SeqCst), 1);
    assert_eq!(descriptors.len(), THREADS);
    assert!(descriptors.iter().all(|d| Arc::ptr_eq(d, &descriptors[0])));
    assert_eq!(descriptors[0].version_column(), Some("version"));

    let by_name = resolver.by_table_name("slow").unwrap();
    assert!(Arc::ptr_eq(&by_name, &descriptors[0]));
}

#[test]
fn distinct_types_resolve_independently() {
    let resolver = EntityMetadataResolver::new();

    thread::scope(|scope| {
        scope.spawn(|| resolver.resolve::<Ledger>().unwrap());
        scope.spawn(|| resolver.resolve::<Journal>().unwrap());
    });

    assert_eq!(resolver.scan_count(), 2);
    assert_eq!(resolver.by_table_name("journal").unwrap().entity(), "Journal");
}

#[test]
fn failed_resolution_is_not_cached() {
    let resolver = EntityMetadataResolver::new();

    let err = resolver.resolve::<Broken>().unwrap_err();
    assert!(err.is_configuration());
    assert!(err.to_string().contains("Broken"));

    resolver.resolve::<Broken>().unwrap_err();
    assert_eq!(resolver.scan_count(), 2);
    assert!(resolver.by_table_name("broken").is_none());
}

#[test]
fn inherited_fields_follow_own_fields() {
    let resolver = EntityMetadataResolver::new();
    let invoice = resolver.resolve::<Invoice>().unwrap();

    let columns: Vec<&str> = invoice.columns().iter().map(|c| c.column()).collect();
    assert_eq!(columns, ["id", "total", "created_by"]);
    // the child's `CreatedBy` shadows the parent's `createdBy`
    assert!(invoice.on_insert_defaults().is_empty());
    assert_eq!(invoice.table_name_with_schema(), "billing.invoice");
    assert!(resolver.by_table_name("billing.invoice").is_some());
    assert!(resolver.by_table_name("invoice").is_none());
}

#[test]
fn reset_forgets_global_descriptors() {
    let first = table_descriptor::<Ledger>().unwrap();
    assert!(Arc::ptr_eq(&first, &table_descriptor::<Ledger>().unwrap()));
    assert!(table_descriptor_by_name("ledger").is_some());

    reset_table_descriptors();
    assert!(table_descriptor_by_name("ledger").is_none());

    let second = table_descriptor::<Ledger>().unwrap();
    assert!(!Arc::ptr_eq(&first, &second));
    assert_eq!(first.columns().len(), second.columns().len());
}
