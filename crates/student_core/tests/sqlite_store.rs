use student_core::{
    open_store, ListOrder, NewStudent, OrderColumn, SqliteStudentStore, StoreConfig, StoreError,
    StudentStore, UNIQUE_VIOLATION_CODE,
};

fn new_student(registration_no: &str, name: &str, marks: i32) -> NewStudent {
    NewStudent {
        registration_no: registration_no.to_string(),
        name: name.to_string(),
        marks,
    }
}

#[tokio::test]
async fn insert_assigns_id_and_timestamp() {
    let store = SqliteStudentStore::open_in_memory().unwrap();

    let first = store.insert(&new_student("REG001", "Ari", 64)).await.unwrap();
    let second = store.insert(&new_student("REG002", "Bo", 91)).await.unwrap();

    assert_eq!(first.registration_no, "REG001");
    assert_eq!(first.name, "Ari");
    assert_eq!(first.marks, 64);
    assert!(second.id > first.id);
    assert!(second.created_at >= first.created_at);
}

#[tokio::test]
async fn duplicate_registration_is_a_conflict() {
    let store = SqliteStudentStore::open_in_memory().unwrap();
    store.insert(&new_student("REG001", "Ari", 64)).await.unwrap();

    let err = store
        .insert(&new_student("REG001", "Someone Else", 10))
        .await
        .unwrap_err();
    match err {
        StoreError::Conflict { code, .. } => assert_eq!(code, UNIQUE_VIOLATION_CODE),
        other => panic!("expected conflict, got {other}"),
    }
    assert_eq!(store.select_all(ListOrder::NEWEST_FIRST).await.unwrap().len(), 1);
}

#[tokio::test]
async fn select_one_matches_exactly() {
    let store = SqliteStudentStore::open_in_memory().unwrap();
    store.insert(&new_student("REG001", "Ari", 64)).await.unwrap();

    let found = store.select_one("REG001").await.unwrap().unwrap();
    assert_eq!(found.name, "Ari");
    assert!(store.select_one("reg001").await.unwrap().is_none());
    assert!(store.select_one("REG00").await.unwrap().is_none());
}

#[tokio::test]
async fn select_all_orders_by_creation_time() {
    let store = SqliteStudentStore::open_in_memory().unwrap();
    for (reg, name) in [("REG001", "Ari"), ("REG002", "Bo"), ("REG003", "Cy")] {
        store.insert(&new_student(reg, name, 50)).await.unwrap();
    }

    let newest_first = store.select_all(ListOrder::NEWEST_FIRST).await.unwrap();
    let regs = newest_first
        .iter()
        .map(|s| s.registration_no.as_str())
        .collect::<Vec<_>>();
    assert_eq!(regs, ["REG003", "REG002", "REG001"]);

    let oldest_first = store
        .select_all(ListOrder {
            column: OrderColumn::CreatedAt,
            descending: false,
        })
        .await
        .unwrap();
    assert_eq!(oldest_first[0].registration_no, "REG001");
}

#[tokio::test]
async fn delete_where_removes_only_matching_row_and_tolerates_missing() {
    let store = SqliteStudentStore::open_in_memory().unwrap();
    store.insert(&new_student("REG001", "Ari", 64)).await.unwrap();
    store.insert(&new_student("REG002", "Bo", 91)).await.unwrap();

    store.delete_where("REG001").await.unwrap();
    store.delete_where("REG404").await.unwrap();

    let remaining = store.select_all(ListOrder::NEWEST_FIRST).await.unwrap();
    assert_eq!(remaining.len(), 1);
    assert_eq!(remaining[0].registration_no, "REG002");
}

#[tokio::test]
async fn open_store_builds_local_backend_from_config() {
    let dir = tempfile::tempdir().unwrap();
    let config = StoreConfig::Local {
        db_path: dir.path().join("students.sqlite3"),
    };

    let store = open_store(&config).unwrap();
    store.insert(&new_student("REG001", "Ari", 64)).await.unwrap();
    drop(store);

    let reopened = open_store(&config).unwrap();
    assert!(reopened.select_one("REG001").await.unwrap().is_some());
}
