//! Integration tests for the Row façade.
//!
//! These tests require a PostgreSQL database to be running.
//! Set DATABASE_URL and run with `cargo test -- --ignored`.

use std::sync::Arc;

use ouroboros_pgorm::{
    Catalog, Column, Connection, EnumType, FetchOptions, FilterSet, InsertOptions, OnConflict,
    IsolationLevel, OrderDirection, OrmError, Returning, Row, SqlType, SqlValue, Table,
    TableSchema, TransactionOptions, TypeRegistry,
};

fn values(pairs: &[(&str, SqlValue)]) -> Vec<(String, SqlValue)> {
    pairs.iter().map(|(k, v)| (k.to_string(), v.clone())).collect()
}

fn schema() -> (Catalog, Arc<TableSchema>) {
    let mut catalog = Catalog::with_registry(Arc::new(TypeRegistry::new()));
    catalog
        .declare_enum(EnumType::new("CrudMood", ["happy", "sad"]))
        .unwrap();
    let users = catalog
        .declare_table(
            Table::new("CrudUser")
                .column(Column::new("id", SqlType::Serial).primary_key())
                .column(Column::new("name", SqlType::Text).not_null())
                .column(Column::new("age", SqlType::Integer))
                .column(Column::new("mood", SqlType::Enum("crud_mood".into())))
                .column(Column::new("tags", SqlType::array(SqlType::Text)))
                .column(Column::new("created_at", SqlType::TimestampTz).default_sql("now()")),
        )
        .unwrap();
    (catalog, users)
}

async fn setup() -> Result<(Connection, Catalog, Arc<TableSchema>), OrmError> {
    let (catalog, users) = schema();
    let conn = Connection::from_env().await?;
    catalog.drop_all(conn.pool()).await?;
    catalog.create_all(conn.pool()).await?;
    Ok((conn, catalog, users))
}

#[tokio::test]
#[ignore] // Only run with --ignored flag when database is available
async fn test_insert_fetch_update_delete() -> Result<(), Box<dyn std::error::Error>> {
    let (conn, catalog, users) = setup().await?;
    let pool = conn.pool();

    let alice = Row::insert(
        pool,
        &users,
        &values(&[
            ("name", "Alice".into()),
            ("age", 30.into()),
            ("mood", "happy".into()),
            ("tags", SqlValue::array(["admin", "ops"])),
        ]),
    )
    .await?;
    assert!(matches!(alice.get("id"), Some(SqlValue::Int(id)) if *id > 0));
    assert!(matches!(alice.get("created_at"), Some(SqlValue::TimestampTz(_))));
    // The returned row carries the supplied values too.
    assert_eq!(alice.get("name"), Some(&SqlValue::from("Alice")));

    Row::insert(pool, &users, &values(&[("name", "Bob".into()), ("age", SqlValue::Null)])).await?;

    let filters = FilterSet::new().gt("age", 18).or_eq("name", "Alice");
    let adults = Row::fetch(pool, users.as_ref(), &filters, &FetchOptions::new()).await?;
    assert_eq!(adults.len(), 1);
    assert_eq!(adults[0].get("mood"), Some(&SqlValue::from("happy")));
    assert_eq!(adults[0].get("tags"), Some(&SqlValue::array(["admin", "ops"])));

    let no_age = Row::fetch(
        pool,
        users.as_ref(),
        &FilterSet::new().eq("age", SqlValue::Null),
        &FetchOptions::new().order_by("id", OrderDirection::Asc),
    )
    .await?;
    assert_eq!(no_age.len(), 1);
    assert_eq!(no_age[0].get("name"), Some(&SqlValue::from("Bob")));

    let updated = Row::update_record(pool, &users, &alice, &values(&[("age", 31.into())])).await?;
    assert_eq!(updated, 1);
    let age = Row::fetch_value(
        pool,
        users.as_ref(),
        "age",
        &FilterSet::new().eq("name", "Alice"),
        &FetchOptions::new(),
    )
    .await?;
    assert_eq!(age, Some(SqlValue::Int(31)));

    assert_eq!(Row::delete_record(pool, &users, &alice).await?, 1);
    assert_eq!(Row::delete(pool, &users, &FilterSet::new()).await?, 1);

    catalog.drop_all(pool).await?;
    Ok(())
}

#[tokio::test]
#[ignore]
async fn test_insert_many_and_conflicts() -> Result<(), Box<dyn std::error::Error>> {
    let (conn, catalog, users) = setup().await?;
    let pool = conn.pool();

    let rows = vec![
        values(&[("name", "a".into()), ("age", 1.into())]),
        values(&[("name", "b".into())]),
        values(&[("name", "c".into()), ("age", 3.into())]),
    ];
    assert_eq!(Row::insert_many(pool, &users, &rows, None).await?, 3);

    let first = Row::fetch_row(
        pool,
        users.as_ref(),
        &FilterSet::new().eq("name", "a"),
    )
    .await?
    .expect("row a");

    let upserted = Row::insert_with(
        pool,
        &users,
        &values(&[
            ("id", first.get("id").cloned().unwrap_or(SqlValue::Null)),
            ("name", "a2".into()),
        ]),
        &InsertOptions::new()
            .on_conflict(OnConflict::UpdatePrimaryKey)
            .returning(Returning::All),
    )
    .await?
    .expect("upsert returns the row");
    assert_eq!(upserted.get("name"), Some(&SqlValue::from("a2")));

    let page = Row::fetch(
        pool,
        users.as_ref(),
        &FilterSet::new(),
        &FetchOptions::new()
            .order_by("name", OrderDirection::Desc)
            .limit(2)
            .offset(1),
    )
    .await?;
    let names: Vec<_> = page.iter().filter_map(|r| r.get("name").cloned()).collect();
    assert_eq!(names, vec![SqlValue::from("b"), SqlValue::from("a2")]);

    catalog.drop_all(pool).await?;
    Ok(())
}

#[tokio::test]
#[ignore]
async fn test_transaction_rollback() -> Result<(), Box<dyn std::error::Error>> {
    let (conn, catalog, users) = setup().await?;

    let mut tx = conn.begin_with(TransactionOptions::new()).await?;
    Row::insert(tx.executor(), &users, &values(&[("name", "ghost".into())])).await?;
    tx.rollback().await?;

    let rows = Row::fetch(conn.pool(), users.as_ref(), &FilterSet::new(), &FetchOptions::new()).await?;
    assert!(rows.is_empty());

    catalog.drop_all(conn.pool()).await?;
    Ok(())
}

#[tokio::test]
#[ignore]
async fn test_read_only_transaction_rejects_writes() -> Result<(), Box<dyn std::error::Error>> {
    let (conn, catalog, users) = setup().await?;

    let options = TransactionOptions::new()
        .isolation(IsolationLevel::Serializable)
        .read_only()
        .deferrable();
    let mut tx = conn.begin_with(options).await?;
    let rows = Row::fetch(tx.executor(), users.as_ref(), &FilterSet::new(), &FetchOptions::new()).await?;
    assert!(rows.is_empty());
    let err = Row::insert(tx.executor(), &users, &values(&[("name", "nope".into())]))
        .await
        .unwrap_err();
    // 25006: read_only_sql_transaction
    assert_eq!(err.sqlstate().as_deref(), Some("25006"));
    tx.rollback().await?;

    catalog.drop_all(conn.pool()).await?;
    Ok(())
}

#[tokio::test]
async fn test_invalid_transaction_options_fail_before_io() {
    let pool = sqlx::postgres::PgPoolOptions::new()
        .connect_lazy("postgresql://localhost/unused")
        .unwrap();
    let conn = Connection::from_pool(pool);
    let err = conn
        .begin_with(TransactionOptions::new().read_only().deferrable())
        .await
        .unwrap_err();
    assert!(matches!(err, OrmError::Configuration(_)));
}

#[tokio::test]
#[ignore]
async fn test_array_columns_round_trip() -> Result<(), Box<dyn std::error::Error>> {
    let mut catalog = Catalog::with_registry(Arc::new(TypeRegistry::new()));
    catalog.declare_enum(EnumType::new("ShiftMood", ["calm", "busy"]))?;
    let shifts = catalog.declare_table(
        Table::new("Shift")
            .column(Column::new("id", SqlType::Serial).primary_key())
            .column(Column::new("moods", SqlType::array(SqlType::Enum("shift_mood".into()))))
            .column(Column::new("starts", SqlType::array(SqlType::Time)))
            .column(Column::new("blobs", SqlType::array(SqlType::Bytea)))
            .column(Column::new("breaks", SqlType::array(SqlType::Interval)))
            .column(Column::new("devices", SqlType::array(SqlType::MacAddr))),
    )?;

    let conn = Connection::from_env().await?;
    catalog.drop_all(conn.pool()).await?;
    catalog.create_all(conn.pool()).await?;

    let moods = SqlValue::Array(vec!["busy".into(), SqlValue::Null, "calm".into()]);
    let starts = SqlValue::Array(vec![SqlValue::Time(
        chrono::NaiveTime::from_hms_opt(9, 30, 0).unwrap(),
    )]);
    let blobs = SqlValue::Array(vec![SqlValue::Bytes(vec![0xca, 0xfe])]);
    let breaks = SqlValue::Array(vec![SqlValue::Interval(sqlx::postgres::types::PgInterval {
        months: 0,
        days: 0,
        microseconds: 900_000_000,
    })]);
    let devices = SqlValue::Array(vec![SqlValue::MacAddr(mac_address::MacAddress::new([
        0x02, 0, 0, 0, 0, 0x01,
    ]))]);

    Row::insert(
        conn.pool(),
        &shifts,
        &values(&[
            ("moods", moods.clone()),
            ("starts", starts.clone()),
            ("blobs", blobs.clone()),
            ("breaks", breaks.clone()),
            ("devices", devices.clone()),
        ]),
    )
    .await?;

    let row = Row::fetch_row(conn.pool(), shifts.as_ref(), &FilterSet::new())
        .await?
        .expect("inserted shift");
    assert_eq!(row.get("moods"), Some(&moods));
    assert_eq!(row.get("starts"), Some(&starts));
    assert_eq!(row.get("blobs"), Some(&blobs));
    assert_eq!(row.get("breaks"), Some(&breaks));
    assert_eq!(row.get("devices"), Some(&devices));

    catalog.drop_all(conn.pool()).await?;
    Ok(())
}

#[tokio::test]
async fn test_delete_record_without_primary_key_fails_before_io() {
    // No database needed: the statement is rejected while compiling.
    let mut catalog = Catalog::with_registry(Arc::new(TypeRegistry::new()));
    let log = catalog
        .declare_table(Table::new("CrudLog").column(Column::new("message", SqlType::Text)))
        .unwrap();
    let pool = sqlx::postgres::PgPoolOptions::new()
        .connect_lazy("postgresql://localhost/unused")
        .unwrap();
    let row = Row::new(values(&[("message", "x".into())]));
    let err = Row::delete_record(&pool, &log, &row).await.unwrap_err();
    assert!(matches!(err, OrmError::Configuration(_)));
}
