//! Integration tests for statement rendering across dialects.

#![allow(missing_docs)]

mod common;

use common::{Account, Article, Audited, Item, UserProfile, assert_sql_contains, init_tracing};
use flex_orm::{
    DeleteBuilder, Dialect, Error, InsertBuilder, Join, MySql, Oracle, Postgres, QueryColumn,
    QueryCondition, QueryTable, QueryWrapper, Sqlite, UpdateBuilder, Value, column, dialect,
    table_descriptor, table_descriptor_by_name,
};

fn article_count() -> QueryWrapper {
    QueryWrapper::new()
        .select([QueryColumn::count(QueryColumn::all())])
        .from(QueryTable::named("article"))
        .r#where(QueryColumn::new("article", "account_id").eq_column(QueryColumn::new("account", "id")))
        .and(QueryColumn::new("article", "published").eq(true))
}

// ----------------------------------------------------------------------------
// SELECT
// ----------------------------------------------------------------------------

#[test]
fn select_entity_default_projection() {
    init_tracing();
    let query = QueryWrapper::new()
        .from_entity::<Account>()
        .unwrap()
        .r#where(column("user_name").like("%rust%"))
        .and(column("id").in_list([1, 2, 3]))
        .order_by_desc(column("id"))
        .limit(10)
        .build(&Postgres::new())
        .unwrap();

    assert_eq!(
        query.sql,
        r#"SELECT "id", "user_name", "age", "tags", "version", "deleted" FROM "tb_account" WHERE ("user_name" LIKE $1 AND "id" IN ($2, $3, $4)) AND "deleted" = 0 ORDER BY "id" DESC LIMIT 10"#
    );
    assert_eq!(
        query.params,
        vec![Value::from("%rust%"), Value::from(1), Value::from(2), Value::from(3)]
    );
}

#[test]
fn params_line_up_with_placeholders() {
    let query = QueryWrapper::new()
        .from(QueryTable::named("account"))
        .r#where(column("id").eq(1))
        .and(column("user_name").eq("abc"))
        .and(column("active").eq(true));

    let expected = vec![Value::from(1), Value::from("abc"), Value::from(true)];
    for id in ["postgres", "mysql", "sqlite", "oracle"] {
        let target = dialect(id).unwrap();
        let rendered = query.build(target.as_ref()).unwrap();

        let placeholders = if id == "postgres" {
            rendered.sql.matches('$').count()
        } else {
            rendered.sql.matches('?').count()
        };
        assert_eq!(placeholders, rendered.params.len(), "{id}: {}", rendered.sql);
        assert_eq!(rendered.params, expected);
    }
    assert_eq!(query.bound_values().unwrap(), expected);

    let sql = query.to_sql(&Postgres::new()).unwrap();
    assert_eq!(sql, r#"SELECT * FROM "account" WHERE "id" = $1 AND "user_name" = $2 AND "active" = $3"#);
}

#[test]
fn sub_select_alias_only_in_projection() {
    let query = QueryWrapper::new()
        .select([column("id"), QueryColumn::select(article_count()).alias("total")])
        .from(QueryTable::named("account"))
        .r#where(column("age").gt(18))
        .build(&Postgres::new())
        .unwrap();

    assert_eq!(
        query.sql,
        r#"SELECT "id", (SELECT COUNT(*) FROM "article" WHERE "account_id" = "account"."id" AND "published" = $1) AS "total" FROM "account" WHERE "age" > $2"#
    );
    assert_eq!(query.params, vec![Value::from(true), Value::from(18)]);

    let filtered = QueryWrapper::new()
        .from(QueryTable::named("account"))
        .r#where(QueryColumn::select(article_count()).alias("total").gt(5))
        .build(&MySql::new())
        .unwrap();

    assert_eq!(
        filtered.sql,
        "SELECT * FROM `account` WHERE (SELECT COUNT(*) FROM `article` WHERE `account_id` = `account`.`id` AND `published` = ?) > ?"
    );
    assert!(!filtered.sql.contains("AS"));
    assert_eq!(filtered.params, vec![Value::from(true), Value::from(5)]);
}

#[test]
fn sub_select_bound_values_match_nested_query() {
    let nested = article_count();
    let total = QueryColumn::select(nested.clone()).alias("total");
    assert_eq!(total.bound_values().unwrap(), nested.bound_values().unwrap());
    assert_eq!(total.sub_query().unwrap().bound_values().unwrap(), vec![Value::from(true)]);
}

#[test]
fn clone_is_independent_of_nested_queries() {
    let original = QueryWrapper::new()
        .select([column("id"), QueryColumn::select(article_count()).alias("total")])
        .from(QueryTable::named("account"));
    let before = original.build(&Postgres::new()).unwrap();

    let mut copy = original.clone();
    let nested = copy.columns_mut()[1].sub_query_mut().unwrap();
    *nested = std::mem::take(nested).and(QueryColumn::new("article", "score").gt(10)).limit(1);
    let copy = copy.r#where(column("age").lt(65));

    let after = original.build(&Postgres::new()).unwrap();
    assert_eq!(before, after);
    assert!(!after.sql.contains("score"));
    assert_eq!(original.bound_values().unwrap(), vec![Value::from(true)]);

    assert_sql_contains(
        &copy.to_sql(&Postgres::new()).unwrap(),
        &[r#""published" = $1 AND "score" > $2 LIMIT 1) AS "total""#, r#"WHERE "age" < $3"#],
    );
    assert_eq!(
        copy.bound_values().unwrap(),
        vec![Value::from(true), Value::from(10), Value::from(65)]
    );
}

#[test]
fn exists_and_in_sub_queries() {
    let article = QueryTable::named("article").alias("ar");
    let written = QueryWrapper::new()
        .select([article.column("id")])
        .from(article.clone())
        .r#where(article.column("account_id").eq_column(QueryColumn::new("account", "id")));
    let banned = QueryWrapper::new().select([column("account_id")]).from(QueryTable::named("banned"));

    let query = QueryWrapper::new()
        .from(QueryTable::named("account"))
        .r#where(QueryCondition::exists(written))
        .and(column("id").not_in_query(banned))
        .build(&Postgres::new())
        .unwrap();

    assert_eq!(
        query.sql,
        r#"SELECT * FROM "account" WHERE EXISTS (SELECT "ar"."id" FROM "article" AS "ar" WHERE "ar"."account_id" = "account"."id") AND "id" NOT IN (SELECT "account_id" FROM "banned")"#
    );
    assert!(query.params.is_empty());
}

#[test]
fn conditional_and_empty_conditions_are_skipped() {
    let name: Option<&str> = None;
    let query = QueryWrapper::new()
        .from(QueryTable::named("account"))
        .r#where(column("user_name").eq(name.unwrap_or_default()).when(name.is_some()))
        .and(column("id").in_list(Vec::<i64>::new()))
        .and(column("age").between(18, 65))
        .build(&Sqlite::new())
        .unwrap();

    assert_eq!(query.sql, r#"SELECT * FROM "account" WHERE "age" BETWEEN ? AND ?"#);
    assert_eq!(query.params, vec![Value::from(18), Value::from(65)]);
}

#[test]
fn raw_fragments_bind_in_order() {
    let query = QueryWrapper::new()
        .select([QueryColumn::raw("coalesce(score, ?)", [0]).alias("score")])
        .from(QueryTable::named("account"))
        .r#where(QueryCondition::raw("age > ? OR age < ?", [65, 18]))
        .and(column("active").eq(true))
        .build(&Postgres::new())
        .unwrap();

    assert_eq!(
        query.sql,
        r#"SELECT coalesce(score, $1) AS "score" FROM "account" WHERE (age > $2 OR age < $3) AND "active" = $4"#
    );
    assert_eq!(query.params.len(), 4);

    let quoted = QueryWrapper::new()
        .from(QueryTable::named("account"))
        .r#where(QueryCondition::raw("note <> '?' AND id = ?", [1]))
        .build(&Postgres::new())
        .unwrap();
    assert_eq!(quoted.sql, r#"SELECT * FROM "account" WHERE note <> '?' AND id = $1"#);
    assert_eq!(quoted.params, vec![Value::from(1)]);

    let mismatched = QueryWrapper::new()
        .from(QueryTable::named("account"))
        .r#where(QueryCondition::raw("age > ?", Vec::<i32>::new()))
        .build(&Postgres::new());
    assert!(matches!(mismatched, Err(Error::Render { .. })));
}

#[test]
fn join_adds_live_row_predicate() {
    let article = QueryTable::entity::<Article>().unwrap();
    let account = QueryTable::entity::<Account>().unwrap().alias("a");
    let query = QueryWrapper::new()
        .select([article.column("title"), account.column("user_name")])
        .from(article.clone())
        .join(Join::left(account.clone(), article.column("account_id").eq_column(account.column("id"))));

    assert_eq!(
        query.to_sql(&Postgres::new()).unwrap(),
        r#"SELECT "article"."title", "a"."user_name" FROM "article" LEFT JOIN "tb_account" AS "a" ON "article"."account_id" = "a"."id" AND "a"."deleted" = 0"#
    );
    assert_eq!(
        query.with_deleted().to_sql(&Postgres::new()).unwrap(),
        r#"SELECT "article"."title", "a"."user_name" FROM "article" LEFT JOIN "tb_account" AS "a" ON "article"."account_id" = "a"."id""#
    );
}

#[test]
fn skipped_condition_keeps_or_inside_guard() {
    let query = QueryWrapper::new()
        .from_entity::<Account>()
        .unwrap()
        .r#where(column("age").lt(18).or(column("age").gt(65)))
        .and(column("user_name").eq("x").when(false))
        .build(&Postgres::new())
        .unwrap();
    assert_eq!(
        query.sql,
        r#"SELECT "id", "user_name", "age", "tags", "version", "deleted" FROM "tb_account" WHERE ("age" < $1 OR "age" > $2) AND "deleted" = 0"#
    );
    assert_eq!(query.params, vec![Value::from(18), Value::from(65)]);

    let query = QueryWrapper::new()
        .from(QueryTable::named("account"))
        .r#where(column("id").eq(1).when(false))
        .or(column("age").lt(18).or(column("age").gt(65)))
        .and(column("active").eq(true))
        .build(&Postgres::new())
        .unwrap();
    assert_eq!(
        query.sql,
        r#"SELECT * FROM "account" WHERE ("age" < $1 OR "age" > $2) AND "active" = $3"#
    );
}

#[test]
fn with_deleted_drops_where_guard() {
    let query = QueryWrapper::new().from_entity::<Account>().unwrap().with_deleted();
    assert_eq!(
        query.to_sql(&Postgres::new()).unwrap(),
        r#"SELECT "id", "user_name", "age", "tags", "version", "deleted" FROM "tb_account""#
    );
}

#[test]
fn projection_uses_column_alias_and_skips_ignored() {
    let query = QueryWrapper::new().from_entity::<UserProfile>().unwrap();
    assert_eq!(
        query.to_sql(&MySql::new()).unwrap(),
        "SELECT `id`, `nickname` AS `nick`, `mobile` FROM `user_profile`"
    );
}

#[test]
fn derived_table_in_from() {
    let adults = QueryWrapper::new()
        .select([column("id"), column("age")])
        .from(QueryTable::named("account"))
        .r#where(column("age").ge(18));
    let outer = QueryTable::select(adults, "adults");
    let query = QueryWrapper::new()
        .select([QueryColumn::avg(outer.column("age")).alias("mean")])
        .from(outer)
        .build(&Postgres::new())
        .unwrap();

    assert_eq!(
        query.sql,
        r#"SELECT AVG("adults"."age") AS "mean" FROM (SELECT "id", "age" FROM "account" WHERE "age" >= $1) AS "adults""#
    );
    assert_eq!(query.params, vec![Value::from(18)]);
}

#[test]
fn pagination_per_dialect() {
    let page = QueryWrapper::new().from(QueryTable::named("t")).limit(10).offset(20);
    assert_eq!(page.to_sql(&Postgres::new()).unwrap(), r#"SELECT * FROM "t" LIMIT 10 OFFSET 20"#);
    assert_eq!(page.to_sql(&MySql::new()).unwrap(), "SELECT * FROM `t` LIMIT 20, 10");
    assert_eq!(page.to_sql(&Sqlite::new()).unwrap(), r#"SELECT * FROM "t" LIMIT 10 OFFSET 20"#);
    assert_eq!(
        page.to_sql(&Oracle::new()).unwrap(),
        r#"SELECT * FROM "t" OFFSET 20 ROWS FETCH NEXT 10 ROWS ONLY"#
    );

    let skip = QueryWrapper::new().from(QueryTable::named("t")).offset(5);
    assert_eq!(skip.to_sql(&Sqlite::new()).unwrap(), r#"SELECT * FROM "t" LIMIT -1 OFFSET 5"#);
    assert_eq!(
        skip.to_sql(&MySql::new()).unwrap(),
        format!("SELECT * FROM `t` LIMIT 5, {}", u64::MAX)
    );

    let first = QueryWrapper::new().from(QueryTable::named("t")).limit(1);
    assert_eq!(
        first.to_sql(&Oracle::new()).unwrap(),
        r#"SELECT * FROM "t" OFFSET 0 ROWS FETCH NEXT 1 ROWS ONLY"#
    );
    assert_eq!(Oracle::new().select_by_query(&first).unwrap(), first.build(&Oracle::new()).unwrap());
}

#[test]
fn descriptors_are_shared() {
    let first = table_descriptor::<Account>().unwrap();
    let second = table_descriptor::<Account>().unwrap();
    assert!(std::sync::Arc::ptr_eq(&first, &second));

    let by_name = table_descriptor_by_name("tb_account").unwrap();
    assert_eq!(by_name.entity(), "Account");
    assert_eq!(by_name.large_columns(), ["avatar"]);
    assert_eq!(by_name.primary_keys().len(), 1);
    assert!(table_descriptor_by_name("  ").is_none());

    let profile = table_descriptor::<UserProfile>().unwrap();
    let mobile = profile.column("mobile").unwrap();
    assert_eq!(mobile.mask(), Some("mobile"));
    assert_eq!(flex_orm::mask::mask("mobile", "13812345678"), "138****5678");
}

// ----------------------------------------------------------------------------
// INSERT
// ----------------------------------------------------------------------------

#[test]
fn insert_adds_logic_delete_default() {
    init_tracing();
    let query = InsertBuilder::<Account>::new()
        .set("user_name", "alice")
        .set("age", 30)
        .set("tags", r#"["a","b"]"#)
        .build(&Postgres::new())
        .unwrap();

    assert_eq!(
        query.sql,
        r#"INSERT INTO "tb_account" ("user_name", "age", "tags", "deleted") VALUES ($1, $2, $3, 0)"#
    );
    assert_eq!(
        query.params,
        vec![Value::from("alice"), Value::from(30), Value::from(r#"["a","b"]"#)]
    );
}

#[test]
fn insert_runs_handlers() {
    let query = InsertBuilder::<Account>::new().set("tags", 7).build(&MySql::new()).unwrap();
    assert_eq!(query.params, vec![Value::from("7")]);

    let rejected = InsertBuilder::<Account>::new().set("tags", "not json").build(&MySql::new());
    let Err(Error::Render { description }) = rejected else {
        panic!("expected a render error");
    };
    assert!(description.contains("JsonHandler"));
}

#[test]
fn insert_on_insert_defaults() {
    let query = InsertBuilder::<Article>::new()
        .set("account_id", 1_i64)
        .set("title", "hello")
        .set_raw("created_at", "DEFAULT")
        .build(&Postgres::new())
        .unwrap();

    assert_eq!(
        query.sql,
        r#"INSERT INTO "article" ("account_id", "title", "created_at", "updated_at") VALUES ($1, $2, DEFAULT, now())"#
    );
    assert_eq!(query.params, vec![Value::from(1_i64), Value::from("hello")]);
}

#[test]
fn insert_drops_ignored_and_rejects_unknown() {
    let query = InsertBuilder::<UserProfile>::new()
        .set("nick_name", "neo")
        .set("secret", "hidden")
        .set("mobile", "13812345678")
        .build(&Postgres::new())
        .unwrap();
    assert_eq!(query.sql, r#"INSERT INTO "user_profile" ("nickname", "mobile") VALUES ($1, $2)"#);

    let unknown = InsertBuilder::<UserProfile>::new().set("nope", 1).build(&Postgres::new());
    assert!(matches!(unknown, Err(Error::Render { .. })));
}

#[test]
fn insert_default_values() {
    assert_eq!(
        InsertBuilder::<Item>::new().build(&Postgres::new()).unwrap().sql,
        r#"INSERT INTO "item" DEFAULT VALUES"#
    );
    assert_eq!(
        InsertBuilder::<Item>::new().build(&MySql::new()).unwrap().sql,
        "INSERT INTO `item` () VALUES ()"
    );
    assert!(matches!(
        InsertBuilder::<Item>::new().build(&Oracle::new()),
        Err(Error::Render { .. })
    ));
}

#[test]
fn upsert_per_dialect() {
    let upsert = InsertBuilder::<Item>::new().set("id", 1).set("name", "n").on_conflict("id").do_update_all();

    assert_eq!(
        upsert.build(&Postgres::new()).unwrap().sql,
        r#"INSERT INTO "item" ("id", "name") VALUES ($1, $2) ON CONFLICT ("id") DO UPDATE SET "name" = EXCLUDED."name""#
    );
    assert_eq!(
        upsert.build(&Sqlite::new()).unwrap().sql,
        r#"INSERT INTO "item" ("id", "name") VALUES (?, ?) ON CONFLICT ("id") DO UPDATE SET "name" = EXCLUDED."name""#
    );
    assert_eq!(
        upsert.build(&MySql::new()).unwrap().sql,
        "INSERT INTO `item` (`id`, `name`) VALUES (?, ?) ON DUPLICATE KEY UPDATE `name` = VALUES(`name`)"
    );
    assert!(matches!(upsert.build(&Oracle::new()), Err(Error::Render { .. })));

    let ignore = InsertBuilder::<Item>::new().set("id", 1).on_conflict("id").do_nothing();
    assert_sql_contains(&ignore.build(&Postgres::new()).unwrap().sql, &["ON CONFLICT (id) DO NOTHING"]);
    assert_sql_contains(&ignore.build(&MySql::new()).unwrap().sql, &["ON DUPLICATE KEY UPDATE id = id"]);

    let untargeted = InsertBuilder::<Item>::new().set("name", "n").do_update(&["name"]);
    assert!(matches!(untargeted.build(&Postgres::new()), Err(Error::Render { .. })));
}

#[test]
fn upsert_resolves_conflict_names() {
    let by_field = InsertBuilder::<UserProfile>::new()
        .set("id", 1)
        .set("nick_name", "n")
        .set("mobile", "m")
        .on_conflict("nick_name")
        .do_update_all();
    assert_eq!(
        by_field.build(&Postgres::new()).unwrap().sql,
        r#"INSERT INTO "user_profile" ("id", "nickname", "mobile") VALUES ($1, $2, $3) ON CONFLICT ("nickname") DO UPDATE SET "id" = EXCLUDED."id", "mobile" = EXCLUDED."mobile""#
    );

    let explicit = InsertBuilder::<UserProfile>::new()
        .set("id", 1)
        .set("nick_name", "n")
        .on_conflict("id")
        .do_update(&["nick_name"]);
    assert_sql_contains(
        &explicit.build(&Postgres::new()).unwrap().sql,
        &["ON CONFLICT (id) DO UPDATE SET nickname = EXCLUDED.nickname"],
    );

    let unknown_target =
        InsertBuilder::<Account>::new().set("user_name", "alice").on_conflict("no_such").do_nothing();
    assert!(matches!(unknown_target.build(&Postgres::new()), Err(Error::Render { .. })));

    let unknown_update =
        InsertBuilder::<Account>::new().set("user_name", "alice").on_conflict("id").do_update(&["no_such"]);
    assert!(matches!(unknown_update.build(&Postgres::new()), Err(Error::Render { .. })));
}

#[test]
fn insert_listener_adds_assignment() {
    let query = InsertBuilder::<Audited>::new().set("name", "x").build(&Postgres::new()).unwrap();
    assert_eq!(query.sql, r#"INSERT INTO "audited" ("name", "modified_by") VALUES ($1, $2)"#);
    assert_eq!(query.params, vec![Value::from("x"), Value::from("system")]);
}

// ----------------------------------------------------------------------------
// UPDATE
// ----------------------------------------------------------------------------

#[test]
fn update_manages_version() {
    init_tracing();
    let query = UpdateBuilder::<Account>::new()
        .set("user_name", "bob")
        .set("version", 99)
        .r#where(column("id").eq(42))
        .expect_version(3)
        .build(&Postgres::new())
        .unwrap();

    assert_eq!(
        query.sql,
        r#"UPDATE "tb_account" SET "user_name" = $1, "version" = "version" + 1 WHERE "id" = $2 AND "version" = $3 AND "deleted" = 0"#
    );
    assert_eq!(query.params, vec![Value::from("bob"), Value::from(42), Value::from(3)]);
}

#[test]
fn update_groups_condition_before_guards() {
    let query = UpdateBuilder::<Account>::new()
        .set("age", 31)
        .r#where(column("id").eq(1).or(column("id").eq(2)))
        .build(&MySql::new())
        .unwrap();

    assert_eq!(
        query.sql,
        "UPDATE `tb_account` SET `age` = ?, `version` = `version` + 1 WHERE (`id` = ? OR `id` = ?) AND `deleted` = 0"
    );
}

#[test]
fn update_without_assignments_fails() {
    let nothing = UpdateBuilder::<Account>::new().r#where(column("id").eq(1));
    assert!(matches!(nothing.build(&Postgres::new()), Err(Error::Render { .. })));

    let only_version = UpdateBuilder::<Account>::new().set("version", 2);
    assert!(matches!(only_version.build(&Postgres::new()), Err(Error::Render { .. })));
}

#[test]
fn update_on_update_defaults() {
    let query = UpdateBuilder::<Article>::new()
        .set("title", "t")
        .r#where(column("id").eq(1))
        .build(&Postgres::new())
        .unwrap();
    assert_eq!(
        query.sql,
        r#"UPDATE "article" SET "title" = $1, "updated_at" = now() WHERE "id" = $2"#
    );
}

#[test]
fn update_listener_rewrites_assignments() {
    let query = UpdateBuilder::<Audited>::new()
        .set("id", 7)
        .set("name", "y")
        .r#where(column("id").eq(7))
        .build(&Postgres::new())
        .unwrap();
    assert_eq!(
        query.sql,
        r#"UPDATE "audited" SET "name" = $1, "modified_by" = $2 WHERE "id" = $3"#
    );
    assert_eq!(query.params, vec![Value::from("y"), Value::from("system"), Value::from(7)]);
}

// ----------------------------------------------------------------------------
// DELETE
// ----------------------------------------------------------------------------

#[test]
fn delete_is_logical_when_configured() {
    let delete = DeleteBuilder::<Account>::new().r#where(column("id").eq(42));
    assert_eq!(
        delete.build(&Postgres::new()).unwrap().sql,
        r#"UPDATE "tb_account" SET "deleted" = 1 WHERE "id" = $1 AND "deleted" = 0"#
    );

    let physical = DeleteBuilder::<Account>::new().r#where(column("id").eq(42)).physical();
    assert_eq!(
        physical.build(&Postgres::new()).unwrap().sql,
        r#"DELETE FROM "tb_account" WHERE "id" = $1"#
    );

    assert_eq!(
        DeleteBuilder::<Account>::new().build(&Postgres::new()).unwrap().sql,
        r#"UPDATE "tb_account" SET "deleted" = 1 WHERE "deleted" = 0"#
    );
}

#[test]
fn delete_without_logic_column() {
    let query = DeleteBuilder::<Item>::new()
        .r#where(column("id").in_list([1, 2]))
        .build(&MySql::new())
        .unwrap();
    assert_eq!(query.sql, "DELETE FROM `item` WHERE `id` IN (?, ?)");
    assert_eq!(query.params, vec![Value::from(1), Value::from(2)]);
}

#[test]
fn dialect_is_object_safe() {
    let dialects: Vec<Box<dyn Dialect>> = vec![Box::new(Postgres::new()), Box::new(MySql::new())];
    for dialect in &dialects {
        let query = DeleteBuilder::<Item>::new().r#where(column("id").eq(1)).build(dialect.as_ref());
        assert_eq!(query.unwrap().params, vec![Value::from(1)]);
    }
}
