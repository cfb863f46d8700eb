mod common;

use common::{image_fixture, memory_config, user_fixture};
use picter_core::store::DocumentStore;
use picter_core::{ConnectionState, Db, DbConfig, DbError, SqliteStore};

#[tokio::test]
async fn connect_bootstraps_schema_and_sets_state() {
    let config = memory_config();
    let db_name = config.db.clone();
    let mut db = Db::new(config);
    assert_eq!(db.state(), ConnectionState::Disconnected);

    let report = db.connect().await.unwrap();
    assert!(db.is_connected());
    assert_eq!(report.created.len(), 6);
    assert!(report.created.contains(&format!("database:{db_name}")));
    assert!(report
        .created
        .contains(&format!("index:{db_name}.users.username")));

    db.disconnect().await.unwrap();
    assert_eq!(db.state(), ConnectionState::Disconnected);
}

#[tokio::test]
async fn reconnecting_to_initialized_store_creates_nothing() {
    let dir = tempfile::tempdir().unwrap();
    let config = DbConfig::default().with_data_dir(dir.path());

    let mut first = Db::new(config.clone());
    assert!(!first.connect().await.unwrap().is_noop());
    first
        .images()
        .save(image_fixture())
        .await
        .unwrap();
    first.disconnect().await.unwrap();

    let mut second = Db::new(config);
    let report = second.connect().await.unwrap();
    assert!(report.is_noop(), "unexpected objects: {:?}", report.created);
    assert_eq!(second.images().list().await.unwrap().len(), 1);
    second.disconnect().await.unwrap();
}

#[tokio::test]
async fn connect_adds_indexes_missing_from_existing_collections() {
    let dir = tempfile::tempdir().unwrap();
    {
        let store = SqliteStore::open("localhost", 28015, Some(dir.path())).unwrap();
        store.db_create("picter").unwrap();
        store.collection_create("picter", "images").unwrap();
        store.collection_create("picter", "users").unwrap();
        store.close().unwrap();
    }

    let mut db = Db::new(DbConfig::default().with_data_dir(dir.path()));
    let report = db.connect().await.unwrap();
    assert_eq!(
        report.created,
        vec![
            "index:picter.images.createdAt",
            "index:picter.images.userId",
            "index:picter.users.username",
        ]
    );
    db.disconnect().await.unwrap();
}

#[tokio::test]
async fn unreachable_store_fails_with_connection_error() {
    let dir = tempfile::tempdir().unwrap();
    let mut db = Db::new(DbConfig::default().with_data_dir(dir.path().join("missing")));

    let err = db.connect().await.unwrap_err();
    assert!(matches!(err, DbError::Connection { .. }));
    assert!(err.to_string().contains("localhost:28015"));
    assert_eq!(db.state(), ConnectionState::Disconnected);
}

#[tokio::test]
async fn invalid_database_name_fails_connect_and_stays_disconnected() {
    let mut db = Db::new(memory_config().with_db("bad-name"));
    let err = db.connect().await.unwrap_err();
    assert!(matches!(err, DbError::Store(_)));
    assert!(!db.is_connected());
}

#[tokio::test]
async fn double_connect_is_rejected() {
    let mut db = Db::new(memory_config());
    db.connect().await.unwrap();

    let err = db.connect().await.unwrap_err();
    assert!(matches!(err, DbError::AlreadyConnected));
    assert!(db.is_connected());
    db.disconnect().await.unwrap();
}

#[tokio::test]
async fn disconnect_requires_connection() {
    let mut db = Db::new(memory_config());
    assert!(matches!(
        db.disconnect().await,
        Err(DbError::NotConnected)
    ));

    db.connect().await.unwrap();
    db.disconnect().await.unwrap();
    assert!(matches!(
        db.disconnect().await,
        Err(DbError::NotConnected)
    ));
}

#[tokio::test]
async fn operations_before_connect_fail_with_not_connected() {
    let db = Db::new(memory_config());

    assert!(matches!(
        db.images().save(image_fixture()).await,
        Err(DbError::NotConnected)
    ));
    assert!(matches!(
        db.images().get("anything").await,
        Err(DbError::NotConnected)
    ));
    assert!(matches!(
        db.images().like("anything").await,
        Err(DbError::NotConnected)
    ));
    assert!(matches!(db.images().list().await, Err(DbError::NotConnected)));
    assert!(matches!(
        db.images().list_by_user("u1").await,
        Err(DbError::NotConnected)
    ));
    assert!(matches!(
        db.images().list_by_tag("awesome").await,
        Err(DbError::NotConnected)
    ));
    assert!(matches!(
        db.users().save(user_fixture()).await,
        Err(DbError::NotConnected)
    ));
    assert!(matches!(
        db.users().get("ana").await,
        Err(DbError::NotConnected)
    ));
    assert!(matches!(
        db.users().authenticate("ana", "foo123").await,
        Err(DbError::NotConnected)
    ));
}

#[tokio::test]
async fn operations_after_disconnect_fail_with_not_connected() {
    let mut db = Db::new(memory_config());
    db.connect().await.unwrap();
    let saved = db.images().save(image_fixture()).await.unwrap();
    let user = db.users().save(user_fixture()).await.unwrap();
    db.disconnect().await.unwrap();

    assert!(matches!(
        db.images().save(image_fixture()).await,
        Err(DbError::NotConnected)
    ));
    assert!(matches!(
        db.images().get(&saved.public_id).await,
        Err(DbError::NotConnected)
    ));
    assert!(matches!(
        db.images().like(&saved.public_id).await,
        Err(DbError::NotConnected)
    ));
    assert!(matches!(db.images().list().await, Err(DbError::NotConnected)));
    assert!(matches!(
        db.images().list_by_user(&saved.user_id).await,
        Err(DbError::NotConnected)
    ));
    assert!(matches!(
        db.images().list_by_tag("awesome").await,
        Err(DbError::NotConnected)
    ));
    assert!(matches!(
        db.users().save(user_fixture()).await,
        Err(DbError::NotConnected)
    ));
    assert!(matches!(
        db.users().get(&user.username).await,
        Err(DbError::NotConnected)
    ));
    assert!(matches!(
        db.users().authenticate(&user.username, "foo123").await,
        Err(DbError::NotConnected)
    ));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_connects_to_one_file_store_all_succeed() {
    let dir = tempfile::tempdir().unwrap();

    for round in 0..10 {
        let base = DbConfig::default().with_data_dir(dir.path());
        let mut a = Db::new(base.clone().with_db(format!("picter_a{round}")));
        let mut b = Db::new(base.clone().with_db(format!("picter_b{round}")));
        let (first, second) = tokio::join!(a.connect(), b.connect());
        assert_eq!(first.unwrap().created.len(), 6, "round {round}");
        assert_eq!(second.unwrap().created.len(), 6, "round {round}");
        a.disconnect().await.unwrap();
        b.disconnect().await.unwrap();

        let shared = base.with_db(format!("picter_shared{round}"));
        let mut c = Db::new(shared.clone());
        let mut d = Db::new(shared);
        let (first, second) = tokio::join!(c.connect(), d.connect());
        let mut created = first.unwrap().created;
        created.extend(second.unwrap().created);
        created.sort();
        created.dedup();
        assert_eq!(created.len(), 6, "round {round}");
        c.disconnect().await.unwrap();
        d.disconnect().await.unwrap();
    }
}
