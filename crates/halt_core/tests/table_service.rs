use halt_core::db::open_db_in_memory;
use halt_core::{Filter, Record, SqliteTableRepository, TableService};
use serde_json::{json, Value};

fn record(value: Value) -> Record {
    value.as_object().cloned().unwrap()
}

#[test]
fn service_scopes_calls_to_its_table() {
    let conn = open_db_in_memory().unwrap();
    conn.execute_batch(
        "CREATE TABLE Users (Name TEXT, MashConfig TEXT);
         CREATE TABLE Other (Name TEXT, MashConfig TEXT);",
    )
    .unwrap();
    let service = TableService::new(SqliteTableRepository::new(&conn), "Users");
    assert_eq!(service.table(), "Users");

    let id = service
        .insert(&record(json!({"Name": "bob", "theme": "dark"})))
        .unwrap();
    service
        .update_by_id(id, &record(json!({"lang": "en"})))
        .unwrap();

    let loaded = service.get(id).unwrap().unwrap();
    assert_eq!(
        loaded,
        record(json!({"Name": "bob", "MashConfig": {"theme": "dark", "lang": "en"}}))
    );

    let other: i64 = conn
        .query_row("SELECT COUNT(*) FROM Other;", [], |row| row.get(0))
        .unwrap();
    assert_eq!(other, 0);
}

#[test]
fn service_get_returns_none_after_delete() {
    let conn = open_db_in_memory().unwrap();
    conn.execute_batch("CREATE TABLE Users (Name TEXT, MashConfig TEXT);")
        .unwrap();
    let service = TableService::new(SqliteTableRepository::new(&conn), "Users");

    let id = service.insert(&record(json!({"Name": "bob"}))).unwrap();
    assert_eq!(service.delete(&Filter::row_id(id)).unwrap(), 1);
    assert!(service.get(id).unwrap().is_none());
    assert!(service.load_row(&Filter::all()).unwrap().is_empty());
}

#[test]
fn service_forwards_tuple_loads() {
    let conn = open_db_in_memory().unwrap();
    conn.execute_batch("CREATE TABLE Users (Name TEXT, Age INTEGER, MashConfig TEXT);")
        .unwrap();
    let service = TableService::new(SqliteTableRepository::new(&conn), "Users");
    service
        .insert(&record(json!({"Name": "ann", "Age": 41, "pet": "cat"})))
        .unwrap();

    assert_eq!(
        service.load_row_values(&Filter::all()).unwrap(),
        vec![vec![json!("ann"), json!(41), json!({"pet": "cat"})]]
    );
    assert_eq!(
        service
            .load_column(&["Age", "Name"], &Filter::eq("Age", 41))
            .unwrap(),
        vec![vec![json!(41), json!("ann")]]
    );
}
