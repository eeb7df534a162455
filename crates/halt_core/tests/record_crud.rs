use halt_core::db::open_db_in_memory;
use halt_core::{
    objectify, Filter, HaltConfig, HaltError, Record, SqliteTableRepository, TableRepository,
};
use rusqlite::Connection;
use serde_json::{json, Value};

fn test_db() -> Connection {
    let conn = open_db_in_memory().unwrap();
    conn.execute_batch("CREATE TABLE Test (Name TEXT, Password TEXT, MashConfig TEXT);")
        .unwrap();
    conn
}

fn record(value: Value) -> Record {
    value.as_object().cloned().unwrap()
}

fn no_mash() -> HaltConfig {
    HaltConfig::default().with_mash(false)
}

type RawRow = (Option<String>, Option<String>, Option<String>);

fn all_data(conn: &Connection) -> Vec<RawRow> {
    let mut stmt = conn
        .prepare("SELECT Name, Password, MashConfig FROM Test ORDER BY rowid;")
        .unwrap();
    stmt.query_map([], |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)))
        .unwrap()
        .collect::<Result<Vec<_>, _>>()
        .unwrap()
}

fn stored_blob(conn: &Connection) -> Record {
    let rows = all_data(conn);
    assert_eq!(rows.len(), 1);
    objectify(rows[0].2.as_deref()).unwrap()
}

#[test]
fn insert_declared_columns_without_mash() {
    let conn = test_db();
    let repo = SqliteTableRepository::with_config(&conn, no_mash());

    let row_id = repo
        .insert("Test", &record(json!({"Name": "bob", "Password": "password"})))
        .unwrap();

    assert_eq!(row_id, 1);
    assert_eq!(
        all_data(&conn),
        vec![(Some("bob".to_string()), Some("password".to_string()), None)]
    );
}

#[test]
fn insert_only_extra_fields_fills_extension_column() {
    let conn = test_db();
    let repo = SqliteTableRepository::new(&conn);

    repo.insert("Test", &record(json!({"random": 15}))).unwrap();

    let rows = all_data(&conn);
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].0, None);
    assert_eq!(rows[0].1, None);
    assert_eq!(rows[0].2.as_deref(), Some(r#"{"random":15}"#));
}

#[test]
fn insert_with_columns_and_extras_splits_them() {
    let conn = test_db();
    let repo = SqliteTableRepository::new(&conn);

    repo.insert("Test", &record(json!({"Name": "bob", "random": 15})))
        .unwrap();

    let rows = all_data(&conn);
    assert_eq!(rows[0].0.as_deref(), Some("bob"));
    assert_eq!(rows[0].1, None);
    assert_eq!(stored_blob(&conn), record(json!({"random": 15})));
}

#[test]
fn insert_without_mash_drops_extras() {
    let conn = test_db();
    let repo = SqliteTableRepository::with_config(&conn, no_mash());

    repo.insert("Test", &record(json!({"Name": "bob", "random": 15})))
        .unwrap();

    assert_eq!(all_data(&conn), vec![(Some("bob".to_string()), None, None)]);
}

#[test]
fn insert_with_no_extras_leaves_extension_null() {
    let conn = test_db();
    let repo = SqliteTableRepository::new(&conn);

    repo.insert("Test", &record(json!({"Name": "bob"}))).unwrap();

    assert_eq!(all_data(&conn)[0].2, None);
}

#[test]
fn insert_empty_record_creates_default_row() {
    let conn = test_db();
    let repo = SqliteTableRepository::new(&conn);

    let first = repo.insert("Test", &Record::new()).unwrap();
    let second = repo.insert("Test", &Record::new()).unwrap();

    assert_eq!(second, first + 1);
    assert_eq!(all_data(&conn), vec![(None, None, None), (None, None, None)]);
}

#[test]
fn insert_into_missing_table_fails() {
    let conn = test_db();
    let repo = SqliteTableRepository::new(&conn);

    let err = repo.insert("Missing", &record(json!({"a": 1}))).unwrap_err();
    assert!(matches!(err, HaltError::UnknownTable(table) if table == "Missing"));
}

#[test]
fn insert_rejects_non_identifier_table_names() {
    let conn = test_db();
    let repo = SqliteTableRepository::new(&conn);

    let err = repo
        .insert("Test; DROP TABLE Test", &record(json!({"Name": "x"})))
        .unwrap_err();
    assert!(matches!(err, HaltError::InvalidIdentifier(_)));
    assert!(all_data(&conn).is_empty());
}

#[test]
fn insert_extras_into_table_without_extension_column_fails() {
    let conn = test_db();
    conn.execute_batch("CREATE TABLE Plain (Name TEXT);").unwrap();
    let repo = SqliteTableRepository::new(&conn);

    let err = repo
        .insert("Plain", &record(json!({"Name": "bob", "random": 1})))
        .unwrap_err();
    assert!(matches!(
        err,
        HaltError::MissingExtensionColumn { ref table, ref column }
            if table == "Plain" && column == "MashConfig"
    ));

    repo.insert("Plain", &record(json!({"Name": "bob"}))).unwrap();
}

#[test]
fn insert_uses_configured_extension_column() {
    let conn = test_db();
    conn.execute_batch("CREATE TABLE Custom (Name TEXT, Extra TEXT);")
        .unwrap();
    let repo =
        SqliteTableRepository::with_config(&conn, HaltConfig::default().with_extension_column("Extra"));

    repo.insert("Custom", &record(json!({"Name": "bob", "color": "red"})))
        .unwrap();

    let rows = repo.load_row("Custom", &Filter::all()).unwrap();
    assert_eq!(
        rows,
        vec![record(json!({"Name": "bob", "Extra": {"color": "red"}}))]
    );
}

#[test]
fn insert_surfaces_constraint_violations() {
    let conn = open_db_in_memory().unwrap();
    conn.execute_batch("CREATE TABLE Users (Name TEXT NOT NULL, MashConfig TEXT);")
        .unwrap();
    let repo = SqliteTableRepository::new(&conn);

    let err = repo.insert("Users", &record(json!({"age": 3}))).unwrap_err();
    assert!(matches!(err, HaltError::Db(_)));
}

#[test]
fn load_column_returns_requested_columns_in_order() {
    let conn = test_db();
    let repo = SqliteTableRepository::new(&conn);
    repo.insert(
        "Test",
        &record(json!({"Name": "bob", "Password": "pass", "random": 15})),
    )
    .unwrap();

    let names = repo.load_column("Test", &["Name"], &Filter::all()).unwrap();
    assert_eq!(names[0][0], json!("bob"));

    let pairs = repo
        .load_column("Test", &["Password", "Name"], &Filter::all())
        .unwrap();
    assert_eq!(pairs, vec![vec![json!("pass"), json!("bob")]]);
}

#[test]
fn load_column_rejects_unknown_and_empty_column_lists() {
    let conn = test_db();
    let repo = SqliteTableRepository::new(&conn);

    let err = repo
        .load_column("Test", &["random"], &Filter::all())
        .unwrap_err();
    assert!(matches!(err, HaltError::UnknownColumn { ref column, .. } if column == "random"));

    let err = repo.load_column("Test", &[], &Filter::all()).unwrap_err();
    assert!(matches!(err, HaltError::InvalidInput(_)));
}

#[test]
fn load_row_nests_extension_blob() {
    let conn = test_db();
    let repo = SqliteTableRepository::new(&conn);
    repo.insert(
        "Test",
        &record(json!({"Name": "bob", "Password": "pass", "random": 15})),
    )
    .unwrap();

    let rows = repo.load_row("Test", &Filter::all()).unwrap();
    assert_eq!(
        rows,
        vec![record(json!({
            "MashConfig": {"random": 15},
            "Password": "pass",
            "Name": "bob"
        }))]
    );

    let tuples = repo.load_row_values("Test", &Filter::all()).unwrap();
    assert_eq!(
        tuples,
        vec![vec![json!("bob"), json!("pass"), json!({"random": 15})]]
    );
}

#[test]
fn load_row_returns_empty_object_for_null_blob_and_honours_filter() {
    let conn = test_db();
    let repo = SqliteTableRepository::new(&conn);
    repo.insert("Test", &record(json!({"Name": "bob"}))).unwrap();
    repo.insert("Test", &record(json!({"Name": "tom", "x": 1})))
        .unwrap();

    let rows = repo.load_row("Test", &Filter::eq("Name", "bob")).unwrap();
    assert_eq!(
        rows,
        vec![record(json!({"Name": "bob", "Password": null, "MashConfig": {}}))]
    );
}

#[test]
fn load_row_reports_corrupt_blob() {
    let conn = test_db();
    conn.execute(
        "INSERT INTO Test (Name, MashConfig) VALUES ('bob', '{not json');",
        [],
    )
    .unwrap();
    let repo = SqliteTableRepository::new(&conn);

    let err = repo.load_row("Test", &Filter::all()).unwrap_err();
    assert!(matches!(err, HaltError::InvalidBlob { row_id: Some(1), .. }));
}

#[test]
fn delete_removes_matching_rows() {
    let conn = test_db();
    let repo = SqliteTableRepository::new(&conn);
    repo.insert(
        "Test",
        &record(json!({"Name": "bob", "Password": "pass", "random": 15})),
    )
    .unwrap();
    repo.insert("Test", &record(json!({"Name": "tom"}))).unwrap();

    let deleted = repo
        .delete("Test", &Filter::raw("where Name == 'bob'", Vec::new()))
        .unwrap();

    assert_eq!(deleted, 1);
    assert_eq!(all_data(&conn), vec![(Some("tom".to_string()), None, None)]);
}

#[test]
fn delete_with_empty_filter_clears_table() {
    let conn = test_db();
    let repo = SqliteTableRepository::new(&conn);
    repo.insert("Test", &record(json!({"Name": "a"}))).unwrap();
    repo.insert("Test", &record(json!({"Name": "b"}))).unwrap();

    assert_eq!(repo.delete("Test", &Filter::all()).unwrap(), 2);
    assert!(all_data(&conn).is_empty());
}

#[test]
fn update_columns_without_mash_keeps_blob() {
    let conn = test_db();
    let repo = SqliteTableRepository::new(&conn);
    repo.insert(
        "Test",
        &record(json!({"Name": "bob", "Password": "pass", "random": 15})),
    )
    .unwrap();

    let no_mash_repo = SqliteTableRepository::with_config(&conn, no_mash());
    let matched = no_mash_repo
        .update(
            "Test",
            &record(json!({"Name": "tom", "random2": 15})),
            &Filter::raw("where Name == ?", vec![json!("bob")]),
        )
        .unwrap();

    assert_eq!(matched, 1);
    assert_eq!(
        all_data(&conn),
        vec![(
            Some("tom".to_string()),
            Some("pass".to_string()),
            Some(r#"{"random":15}"#.to_string())
        )]
    );
}

#[test]
fn update_only_extras_merges_into_blob() {
    let conn = test_db();
    let repo = SqliteTableRepository::new(&conn);
    SqliteTableRepository::with_config(&conn, no_mash())
        .insert("Test", &record(json!({"Name": "bob", "Password": "pass"})))
        .unwrap();

    repo.update(
        "Test",
        &record(json!({"r": 1, "r2": 2})),
        &Filter::eq("Name", "bob"),
    )
    .unwrap();
    let rows = all_data(&conn);
    assert_eq!(rows[0].0.as_deref(), Some("bob"));
    assert_eq!(rows[0].1.as_deref(), Some("pass"));
    assert_eq!(stored_blob(&conn), record(json!({"r": 1, "r2": 2})));

    repo.update(
        "Test",
        &record(json!({"r": 10, "r3": 30})),
        &Filter::eq("Name", "bob"),
    )
    .unwrap();
    assert_eq!(
        stored_blob(&conn),
        record(json!({"r": 10, "r2": 2, "r3": 30}))
    );
}

#[test]
fn update_columns_and_extras_follows_renamed_rows() {
    let conn = test_db();
    let repo = SqliteTableRepository::new(&conn);
    SqliteTableRepository::with_config(&conn, no_mash())
        .insert("Test", &record(json!({"Name": "bob", "Password": "pass"})))
        .unwrap();

    repo.update(
        "Test",
        &record(json!({"Name": "tom", "r": 1, "r2": 2})),
        &Filter::eq("Name", "bob"),
    )
    .unwrap();
    let rows = all_data(&conn);
    assert_eq!(rows[0].0.as_deref(), Some("tom"));
    assert_eq!(rows[0].1.as_deref(), Some("pass"));
    assert_eq!(stored_blob(&conn), record(json!({"r": 1, "r2": 2})));

    repo.update(
        "Test",
        &record(json!({"Name": "peter", "r": 10, "r3": 30})),
        &Filter::raw("where Name == 'tom'", Vec::new()),
    )
    .unwrap();
    let rows = all_data(&conn);
    assert_eq!(rows[0].0.as_deref(), Some("peter"));
    assert_eq!(rows[0].1.as_deref(), Some("pass"));
    assert_eq!(
        stored_blob(&conn),
        record(json!({"r": 10, "r2": 2, "r3": 30}))
    );
}

#[test]
fn update_merges_per_row_blobs_independently() {
    let conn = test_db();
    let repo = SqliteTableRepository::new(&conn);
    repo.insert("Test", &record(json!({"Password": "same", "a": 1})))
        .unwrap();
    repo.insert("Test", &record(json!({"Password": "same", "b": 2})))
        .unwrap();

    let matched = repo
        .update(
            "Test",
            &record(json!({"c": 3})),
            &Filter::eq("Password", "same"),
        )
        .unwrap();

    assert_eq!(matched, 2);
    let blobs = repo
        .load_column("Test", &["MashConfig"], &Filter::all())
        .unwrap()
        .into_iter()
        .map(|row| objectify(row[0].as_str()).unwrap())
        .collect::<Vec<_>>();
    assert_eq!(
        blobs,
        vec![
            record(json!({"a": 1, "c": 3})),
            record(json!({"b": 2, "c": 3}))
        ]
    );
}

#[test]
fn update_without_matches_returns_zero() {
    let conn = test_db();
    let repo = SqliteTableRepository::new(&conn);
    repo.insert("Test", &record(json!({"Name": "bob"}))).unwrap();

    let matched = repo
        .update("Test", &record(json!({"x": 1})), &Filter::eq("Name", "nobody"))
        .unwrap();

    assert_eq!(matched, 0);
    assert_eq!(all_data(&conn)[0].2, None);
}

#[test]
fn update_with_corrupt_blob_rolls_back_column_writes() {
    let conn = test_db();
    conn.execute(
        "INSERT INTO Test (Name, MashConfig) VALUES ('bob', '[1, 2]');",
        [],
    )
    .unwrap();
    let repo = SqliteTableRepository::new(&conn);

    let err = repo
        .update(
            "Test",
            &record(json!({"Name": "tom", "x": 1})),
            &Filter::all(),
        )
        .unwrap_err();

    assert!(matches!(err, HaltError::InvalidBlob { .. }));
    assert_eq!(all_data(&conn)[0].0.as_deref(), Some("bob"));
    assert!(conn.is_autocommit());
}

#[test]
fn update_by_row_id_targets_one_row() {
    let conn = test_db();
    let repo = SqliteTableRepository::new(&conn);
    let first = repo.insert("Test", &record(json!({"Name": "a"}))).unwrap();
    repo.insert("Test", &record(json!({"Name": "b"}))).unwrap();

    repo.update("Test", &record(json!({"Password": "p"})), &Filter::row_id(first))
        .unwrap();

    let passwords = repo
        .load_column("Test", &["Password"], &Filter::all())
        .unwrap();
    assert_eq!(passwords, vec![vec![json!("p")], vec![json!(null)]]);
}
