//! SQLite implementation of the document-store contract.
//!
//! # Responsibility
//! - Map databases/collections/indexes onto SQLite tables and expression
//!   indexes, tracked in `store_*` catalog tables.
//! - Store documents as JSON text and query them with SQLite JSON functions.
//!
//! # Invariants
//! - A server is identified by `(host, port)`: a file under the data
//!   directory, or a named shared-cache in-memory database.
//! - Collection `c` of database `d` lives in table `"d.c"`; its index `i`
//!   is the SQLite index `"d.c.i"` over `json_extract(doc, '$.i')`.
//! - All access goes through one connection guarded by a mutex held for a
//!   single trait call.
//! - Index DDL runs inside the transaction that catalogs it, so a catalogued
//!   index that exists in `sqlite_master` is fully built.
//! - Read-then-write transactions take the write lock up front, so the busy
//!   timeout covers contention between handles on one file.

use super::{
    Direction, Document, DocumentStore, Filter, IndexSpec, InsertReport, Query, StoreError,
    StoreResult, WriteReport, ID_FIELD,
};
use once_cell::sync::Lazy;
use regex::Regex;
use rusqlite::types::Value as SqlValue;
use rusqlite::{
    params, params_from_iter, Connection, ErrorCode, OpenFlags, OptionalExtension,
    TransactionBehavior,
};
use serde_json::Value;
use std::path::Path;
use std::sync::Mutex;
use std::time::Duration;
use uuid::Uuid;

static NAME_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Za-z0-9_]+$").expect("valid name regex"));

const CATALOG_SQL: &str = "
CREATE TABLE IF NOT EXISTS store_databases (
    name TEXT PRIMARY KEY NOT NULL
);
CREATE TABLE IF NOT EXISTS store_collections (
    db TEXT NOT NULL,
    name TEXT NOT NULL,
    PRIMARY KEY (db, name)
);
CREATE TABLE IF NOT EXISTS store_indexes (
    db TEXT NOT NULL,
    collection TEXT NOT NULL,
    name TEXT NOT NULL,
    multi INTEGER NOT NULL,
    is_unique INTEGER NOT NULL,
    PRIMARY KEY (db, collection, name)
);";

/// Document store backed by one SQLite connection.
pub struct SqliteStore {
    conn: Mutex<Option<Connection>>,
    location: String,
}

impl SqliteStore {
    /// Opens the server identified by `host` and `port`.
    ///
    /// With `data_dir` the server is the file `<data_dir>/<host>-<port>.sqlite3`
    /// and the directory must already exist. Without it the server is an
    /// in-memory database shared by every connection to the same name in this
    /// process; it disappears when the last connection closes.
    pub fn open(host: &str, port: u16, data_dir: Option<&Path>) -> StoreResult<Self> {
        let server = server_name(host, port);
        let (conn, location) = match data_dir {
            Some(dir) => {
                if !dir.is_dir() {
                    return Err(StoreError::Unreachable(dir.display().to_string()));
                }
                let path = dir.join(format!("{server}.sqlite3"));
                let location = path.display().to_string();
                (Connection::open(&path)?, location)
            }
            None => {
                let uri = format!("file:{server}?mode=memory&cache=shared");
                let conn = Connection::open_with_flags(
                    &uri,
                    OpenFlags::SQLITE_OPEN_READ_WRITE
                        | OpenFlags::SQLITE_OPEN_CREATE
                        | OpenFlags::SQLITE_OPEN_URI
                        | OpenFlags::SQLITE_OPEN_NO_MUTEX,
                )?;
                (conn, uri)
            }
        };

        conn.busy_timeout(Duration::from_secs(5))?;
        conn.execute_batch(CATALOG_SQL)?;

        Ok(Self {
            conn: Mutex::new(Some(conn)),
            location,
        })
    }

    /// File path or URI this store is connected to.
    pub fn location(&self) -> &str {
        &self.location
    }

    fn with_conn<T>(&self, op: impl FnOnce(&mut Connection) -> StoreResult<T>) -> StoreResult<T> {
        let mut guard = self.conn.lock().map_err(|_| StoreError::Poisoned)?;
        let conn = guard.as_mut().ok_or(StoreError::Closed)?;
        op(conn)
    }
}

impl DocumentStore for SqliteStore {
    fn db_list(&self) -> StoreResult<Vec<String>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare("SELECT name FROM store_databases ORDER BY name ASC;")?;
            let names = stmt
                .query_map([], |row| row.get::<_, String>(0))?
                .collect::<Result<Vec<_>, _>>()?;
            Ok(names)
        })
    }

    fn db_create(&self, db: &str) -> StoreResult<()> {
        validate_name("database", db)?;
        self.with_conn(|conn| {
            let inserted = conn.execute(
                "INSERT OR IGNORE INTO store_databases (name) VALUES (?1);",
                [db],
            )?;
            if inserted == 0 {
                return Err(StoreError::DatabaseExists(db.to_string()));
            }
            Ok(())
        })
    }

    fn collection_list(&self, db: &str) -> StoreResult<Vec<String>> {
        validate_name("database", db)?;
        self.with_conn(|conn| {
            ensure_database(conn, db)?;
            let mut stmt = conn
                .prepare("SELECT name FROM store_collections WHERE db = ?1 ORDER BY name ASC;")?;
            let names = stmt
                .query_map([db], |row| row.get::<_, String>(0))?
                .collect::<Result<Vec<_>, _>>()?;
            Ok(names)
        })
    }

    fn collection_create(&self, db: &str, collection: &str) -> StoreResult<()> {
        validate_name("database", db)?;
        validate_name("collection", collection)?;
        self.with_conn(|conn| {
            let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
            ensure_database(&tx, db)?;
            if collection_exists(&tx, db, collection)? {
                return Err(StoreError::CollectionExists(qualified(db, collection)));
            }

            tx.execute_batch(&format!(
                "CREATE TABLE {} (
                    id TEXT PRIMARY KEY NOT NULL,
                    doc TEXT NOT NULL
                );",
                table_ident(db, collection)
            ))?;
            tx.execute(
                "INSERT INTO store_collections (db, name) VALUES (?1, ?2);",
                params![db, collection],
            )?;
            tx.commit()?;
            Ok(())
        })
    }

    fn index_list(&self, db: &str, collection: &str) -> StoreResult<Vec<String>> {
        validate_name("database", db)?;
        validate_name("collection", collection)?;
        self.with_conn(|conn| {
            ensure_collection(conn, db, collection)?;
            catalog_indexes(conn, db, collection)
        })
    }

    fn index_create(&self, db: &str, collection: &str, index: IndexSpec<'_>) -> StoreResult<()> {
        validate_name("database", db)?;
        validate_name("collection", collection)?;
        validate_name("index", index.name)?;
        self.with_conn(|conn| {
            let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
            ensure_collection(&tx, db, collection)?;
            if lookup_index(&tx, db, collection, index.name)?.is_some() {
                return Err(StoreError::IndexExists(qualified_index(
                    db, collection, index.name,
                )));
            }

            let unique = if index.unique { "UNIQUE " } else { "" };
            tx.execute_batch(&format!(
                "CREATE {unique}INDEX {} ON {} ({});",
                index_ident(db, collection, index.name),
                table_ident(db, collection),
                field_expr(index.name)
            ))?;
            tx.execute(
                "INSERT INTO store_indexes (db, collection, name, multi, is_unique)
                 VALUES (?1, ?2, ?3, ?4, ?5);",
                params![db, collection, index.name, index.multi, index.unique],
            )?;
            tx.commit()?;
            Ok(())
        })
    }

    fn index_wait(&self, db: &str, collection: &str) -> StoreResult<()> {
        validate_name("database", db)?;
        validate_name("collection", collection)?;
        self.with_conn(|conn| {
            ensure_collection(conn, db, collection)?;
            for name in catalog_indexes(conn, db, collection)? {
                let physical = qualified_index(db, collection, &name);
                let built: bool = conn.query_row(
                    "SELECT EXISTS(
                        SELECT 1
                        FROM sqlite_master
                        WHERE type = 'index' AND name = ?1
                    );",
                    [physical.as_str()],
                    |row| row.get(0),
                )?;
                if !built {
                    return Err(StoreError::IndexNotReady(physical));
                }
            }
            Ok(())
        })
    }

    fn insert(
        &self,
        db: &str,
        collection: &str,
        mut document: Document,
    ) -> StoreResult<InsertReport> {
        validate_name("database", db)?;
        validate_name("collection", collection)?;

        let (id, generated) = match document.get(ID_FIELD) {
            Some(Value::String(id)) => (id.clone(), false),
            Some(other) => {
                return Ok(InsertReport::rejected(format!(
                    "primary key `{ID_FIELD}` must be a string, got `{other}`"
                )));
            }
            None => {
                let id = Uuid::new_v4().to_string();
                document.insert(ID_FIELD.to_string(), Value::String(id.clone()));
                (id, true)
            }
        };
        let body = serde_json::to_string(&document)?;

        self.with_conn(|conn| {
            ensure_collection(conn, db, collection)?;
            let outcome = conn.execute(
                &format!(
                    "INSERT INTO {} (id, doc) VALUES (?1, ?2);",
                    table_ident(db, collection)
                ),
                params![id, body],
            );

            match outcome {
                Ok(_) => Ok(InsertReport {
                    inserted: 1,
                    generated_keys: if generated { vec![id] } else { Vec::new() },
                    ..InsertReport::default()
                }),
                Err(rusqlite::Error::SqliteFailure(err, message))
                    if err.code == ErrorCode::ConstraintViolation =>
                {
                    Ok(InsertReport::rejected(
                        message.unwrap_or_else(|| err.to_string()),
                    ))
                }
                Err(err) => Err(err.into()),
            }
        })
    }

    fn get(&self, db: &str, collection: &str, id: &str) -> StoreResult<Option<Document>> {
        validate_name("database", db)?;
        validate_name("collection", collection)?;
        self.with_conn(|conn| {
            ensure_collection(conn, db, collection)?;
            load_document(conn, db, collection, id)
        })
    }

    fn update(
        &self,
        db: &str,
        collection: &str,
        id: &str,
        patch: Document,
    ) -> StoreResult<WriteReport> {
        validate_name("database", db)?;
        validate_name("collection", collection)?;
        if let Some(new_id) = patch.get(ID_FIELD) {
            if new_id.as_str() != Some(id) {
                return Err(StoreError::InvalidDocument(format!(
                    "primary key `{ID_FIELD}` of `{id}` cannot be changed"
                )));
            }
        }

        self.with_conn(|conn| {
            let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
            ensure_collection(&tx, db, collection)?;
            let Some(mut document) = load_document(&tx, db, collection, id)? else {
                return Ok(WriteReport {
                    replaced: 0,
                    skipped: 1,
                });
            };

            document.extend(patch);
            tx.execute(
                &format!(
                    "UPDATE {} SET doc = ?2 WHERE id = ?1;",
                    table_ident(db, collection)
                ),
                params![id, serde_json::to_string(&document)?],
            )?;
            tx.commit()?;

            Ok(WriteReport {
                replaced: 1,
                skipped: 0,
            })
        })
    }

    fn query(&self, db: &str, collection: &str, query: &Query) -> StoreResult<Vec<Document>> {
        validate_name("database", db)?;
        validate_name("collection", collection)?;
        self.with_conn(|conn| {
            ensure_collection(conn, db, collection)?;

            let mut sql = format!("SELECT doc FROM {}", table_ident(db, collection));
            let mut bind_values: Vec<SqlValue> = Vec::new();

            match &query.filter {
                Filter::All => {}
                Filter::IndexEq { index, value } => {
                    validate_name("index", index)?;
                    let multi = lookup_index(conn, db, collection, index)?.ok_or_else(|| {
                        StoreError::IndexMissing(qualified_index(db, collection, index))
                    })?;
                    if multi {
                        sql.push_str(&membership_clause(index));
                    } else {
                        sql.push_str(&format!(" WHERE {} = ?1", field_expr(index)));
                    }
                    bind_values.push(sql_value(value)?);
                }
                Filter::Contains { field, value } => {
                    validate_name("field", field)?;
                    sql.push_str(&membership_clause(field));
                    bind_values.push(sql_value(value)?);
                }
            }

            if let Some(order) = &query.order {
                validate_name("field", &order.field)?;
                let direction = match order.direction {
                    Direction::Asc => "ASC",
                    Direction::Desc => "DESC",
                };
                sql.push_str(&format!(
                    " ORDER BY {} {direction}, rowid {direction}",
                    field_expr(&order.field)
                ));
            }

            let mut stmt = conn.prepare(&sql)?;
            let mut rows = stmt.query(params_from_iter(bind_values))?;
            let mut documents = Vec::new();
            while let Some(row) = rows.next()? {
                let body: String = row.get(0)?;
                documents.push(parse_document(&body)?);
            }
            Ok(documents)
        })
    }

    fn close(&self) -> StoreResult<()> {
        let mut guard = self.conn.lock().map_err(|_| StoreError::Poisoned)?;
        let conn = guard.take().ok_or(StoreError::Closed)?;
        conn.close().map_err(|(_, err)| StoreError::from(err))
    }
}

impl InsertReport {
    fn rejected(message: String) -> Self {
        Self {
            errors: 1,
            first_error: Some(message),
            ..Self::default()
        }
    }
}

fn validate_name(kind: &'static str, name: &str) -> StoreResult<()> {
    if NAME_RE.is_match(name) {
        Ok(())
    } else {
        Err(StoreError::InvalidName {
            kind,
            name: name.to_string(),
        })
    }
}

fn server_name(host: &str, port: u16) -> String {
    let host: String = host
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '.' || c == '_' || c == '-' {
                c
            } else {
                '_'
            }
        })
        .collect();
    format!("{host}-{port}")
}

fn qualified(db: &str, collection: &str) -> String {
    format!("{db}.{collection}")
}

fn qualified_index(db: &str, collection: &str, index: &str) -> String {
    format!("{db}.{collection}.{index}")
}

// Names are validated against NAME_RE before they reach any of these.
fn table_ident(db: &str, collection: &str) -> String {
    format!("\"{}\"", qualified(db, collection))
}

fn index_ident(db: &str, collection: &str, index: &str) -> String {
    format!("\"{}\"", qualified_index(db, collection, index))
}

fn field_expr(field: &str) -> String {
    format!("json_extract(doc, '$.{field}')")
}

// json_each over a scalar yields that scalar, so this matches both plain
// values and array members.
fn membership_clause(field: &str) -> String {
    format!(
        " WHERE EXISTS (
            SELECT 1 FROM json_each(doc, '$.{field}') AS member
            WHERE member.value = ?1
        )"
    )
}

fn sql_value(value: &Value) -> StoreResult<SqlValue> {
    match value {
        Value::String(text) => Ok(SqlValue::Text(text.clone())),
        Value::Bool(flag) => Ok(SqlValue::Integer(i64::from(*flag))),
        Value::Number(number) => {
            if let Some(integer) = number.as_i64() {
                Ok(SqlValue::Integer(integer))
            } else if let Some(real) = number.as_f64() {
                Ok(SqlValue::Real(real))
            } else {
                Err(StoreError::UnsupportedValue(value.clone()))
            }
        }
        Value::Null | Value::Array(_) | Value::Object(_) => {
            Err(StoreError::UnsupportedValue(value.clone()))
        }
    }
}

fn parse_document(body: &str) -> StoreResult<Document> {
    match serde_json::from_str::<Value>(body)? {
        Value::Object(document) => Ok(document),
        other => Err(StoreError::InvalidDocument(format!(
            "stored value is not an object: `{other}`"
        ))),
    }
}

fn load_document(
    conn: &Connection,
    db: &str,
    collection: &str,
    id: &str,
) -> StoreResult<Option<Document>> {
    let body: Option<String> = conn
        .query_row(
            &format!(
                "SELECT doc FROM {} WHERE id = ?1;",
                table_ident(db, collection)
            ),
            [id],
            |row| row.get(0),
        )
        .optional()?;
    body.as_deref().map(parse_document).transpose()
}

fn ensure_database(conn: &Connection, db: &str) -> StoreResult<()> {
    let exists: bool = conn.query_row(
        "SELECT EXISTS(SELECT 1 FROM store_databases WHERE name = ?1);",
        [db],
        |row| row.get(0),
    )?;
    if exists {
        Ok(())
    } else {
        Err(StoreError::DatabaseMissing(db.to_string()))
    }
}

fn collection_exists(conn: &Connection, db: &str, collection: &str) -> StoreResult<bool> {
    let exists: bool = conn.query_row(
        "SELECT EXISTS(
            SELECT 1 FROM store_collections WHERE db = ?1 AND name = ?2
        );",
        params![db, collection],
        |row| row.get(0),
    )?;
    Ok(exists)
}

fn ensure_collection(conn: &Connection, db: &str, collection: &str) -> StoreResult<()> {
    ensure_database(conn, db)?;
    if collection_exists(conn, db, collection)? {
        Ok(())
    } else {
        Err(StoreError::CollectionMissing(qualified(db, collection)))
    }
}

fn catalog_indexes(conn: &Connection, db: &str, collection: &str) -> StoreResult<Vec<String>> {
    let mut stmt = conn.prepare(
        "SELECT name FROM store_indexes
         WHERE db = ?1 AND collection = ?2
         ORDER BY name ASC;",
    )?;
    let names = stmt
        .query_map(params![db, collection], |row| row.get::<_, String>(0))?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(names)
}

/// Returns `Some(multi)` when the index is catalogued.
fn lookup_index(
    conn: &Connection,
    db: &str,
    collection: &str,
    index: &str,
) -> StoreResult<Option<bool>> {
    let multi = conn
        .query_row(
            "SELECT multi FROM store_indexes
             WHERE db = ?1 AND collection = ?2 AND name = ?3;",
            params![db, collection, index],
            |row| row.get::<_, bool>(0),
        )
        .optional()?;
    Ok(multi)
}

#[cfg(test)]
mod tests {
    use super::SqliteStore;
    use crate::store::{
        Direction, Document, DocumentStore, IndexSpec, Query, StoreError, ID_FIELD,
    };
    use serde_json::{json, Value};
    use uuid::Uuid;

    fn memory_store() -> SqliteStore {
        let host = format!("store-test-{}", Uuid::new_v4().simple());
        SqliteStore::open(&host, 28015, None).unwrap()
    }

    fn photos_store() -> SqliteStore {
        let store = memory_store();
        store.db_create("app").unwrap();
        store.collection_create("app", "photos").unwrap();
        store
    }

    fn doc(value: Value) -> Document {
        match value {
            Value::Object(document) => document,
            other => panic!("not an object: {other}"),
        }
    }

    fn names(documents: &[Document]) -> Vec<&str> {
        documents
            .iter()
            .map(|document| document["name"].as_str().unwrap())
            .collect()
    }

    #[test]
    fn catalog_tracks_databases_collections_and_indexes() {
        let store = photos_store();
        store
            .index_create("app", "photos", IndexSpec::simple("rank"))
            .unwrap();

        assert_eq!(store.db_list().unwrap(), vec!["app"]);
        assert_eq!(store.collection_list("app").unwrap(), vec!["photos"]);
        assert_eq!(store.index_list("app", "photos").unwrap(), vec!["rank"]);
        store.index_wait("app", "photos").unwrap();
    }

    #[test]
    fn creating_existing_objects_is_rejected() {
        let store = photos_store();
        store
            .index_create("app", "photos", IndexSpec::simple("rank"))
            .unwrap();

        assert!(matches!(
            store.db_create("app"),
            Err(StoreError::DatabaseExists(_))
        ));
        assert!(matches!(
            store.collection_create("app", "photos"),
            Err(StoreError::CollectionExists(_))
        ));
        assert!(matches!(
            store.index_create("app", "photos", IndexSpec::simple("rank")),
            Err(StoreError::IndexExists(_))
        ));
    }

    #[test]
    fn invalid_names_never_reach_sql() {
        let store = memory_store();
        let err = store.db_create("app\"; DROP TABLE x; --").unwrap_err();
        assert!(matches!(err, StoreError::InvalidName { kind: "database", .. }));
        assert!(matches!(
            store.collection_create("app", "a.b"),
            Err(StoreError::InvalidName { .. })
        ));
    }

    #[test]
    fn missing_database_and_collection_are_reported() {
        let store = memory_store();
        assert!(matches!(
            store.collection_list("nope"),
            Err(StoreError::DatabaseMissing(_))
        ));
        store.db_create("app").unwrap();
        assert!(matches!(
            store.get("app", "photos", "x"),
            Err(StoreError::CollectionMissing(_))
        ));
    }

    #[test]
    fn insert_generates_ids_and_get_reads_them_back() {
        let store = photos_store();
        let report = store
            .insert("app", "photos", doc(json!({"name": "a"})))
            .unwrap();
        assert_eq!(report.inserted, 1);
        assert_eq!(report.errors, 0);
        assert_eq!(report.generated_keys.len(), 1);

        let id = &report.generated_keys[0];
        let stored = store.get("app", "photos", id).unwrap().unwrap();
        assert_eq!(stored[ID_FIELD], json!(id));
        assert_eq!(stored["name"], json!("a"));
        assert!(store.get("app", "photos", "missing").unwrap().is_none());
    }

    #[test]
    fn insert_reports_unique_violations_instead_of_failing() {
        let store = photos_store();
        store
            .index_create("app", "photos", IndexSpec::unique("name"))
            .unwrap();
        store
            .insert("app", "photos", doc(json!({"name": "dup"})))
            .unwrap();

        let report = store
            .insert("app", "photos", doc(json!({"name": "dup"})))
            .unwrap();
        assert_eq!(report.inserted, 0);
        assert_eq!(report.errors, 1);
        assert!(report.first_error.unwrap().contains("UNIQUE"));
        assert!(report.generated_keys.is_empty());
    }

    #[test]
    fn insert_with_duplicate_explicit_id_is_reported() {
        let store = photos_store();
        let first = store
            .insert("app", "photos", doc(json!({"id": "fixed", "name": "a"})))
            .unwrap();
        assert_eq!(first.inserted, 1);
        assert!(first.generated_keys.is_empty());

        let second = store
            .insert("app", "photos", doc(json!({"id": "fixed", "name": "b"})))
            .unwrap();
        assert_eq!(second.errors, 1);
    }

    #[test]
    fn update_merges_fields_and_skips_missing_documents() {
        let store = photos_store();
        let report = store
            .insert("app", "photos", doc(json!({"name": "a", "likes": 0})))
            .unwrap();
        let id = report.generated_keys[0].clone();

        let written = store
            .update("app", "photos", &id, doc(json!({"likes": 1, "liked": true})))
            .unwrap();
        assert_eq!(written.replaced, 1);

        let stored = store.get("app", "photos", &id).unwrap().unwrap();
        assert_eq!(stored["name"], json!("a"));
        assert_eq!(stored["likes"], json!(1));
        assert_eq!(stored["liked"], json!(true));

        let skipped = store
            .update("app", "photos", "missing", doc(json!({"likes": 1})))
            .unwrap();
        assert_eq!(skipped.skipped, 1);

        assert!(matches!(
            store.update("app", "photos", &id, doc(json!({"id": "other"}))),
            Err(StoreError::InvalidDocument(_))
        ));
    }

    #[test]
    fn order_by_breaks_ties_by_insertion_order() {
        let store = photos_store();
        for (name, rank) in [("a", 1), ("b", 2), ("c", 2), ("d", 0)] {
            store
                .insert("app", "photos", doc(json!({"name": name, "rank": rank})))
                .unwrap();
        }

        let desc = store
            .query("app", "photos", &Query::all().order_by("rank", Direction::Desc))
            .unwrap();
        assert_eq!(names(&desc), vec!["c", "b", "a", "d"]);

        let asc = store
            .query("app", "photos", &Query::all().order_by("rank", Direction::Asc))
            .unwrap();
        assert_eq!(names(&asc), vec!["d", "a", "b", "c"]);
    }

    #[test]
    fn multi_index_matches_scalars_and_array_members() {
        let store = photos_store();
        store
            .index_create("app", "photos", IndexSpec::multi("owner"))
            .unwrap();
        store
            .insert("app", "photos", doc(json!({"name": "a", "owner": "u1"})))
            .unwrap();
        store
            .insert("app", "photos", doc(json!({"name": "b", "owner": ["u2", "u1"]})))
            .unwrap();
        store
            .insert("app", "photos", doc(json!({"name": "c", "owner": "u2"})))
            .unwrap();

        store.index_wait("app", "photos").unwrap();
        let owned = store
            .query(
                "app",
                "photos",
                &Query::index_eq("owner", "u1").order_by("name", Direction::Asc),
            )
            .unwrap();
        assert_eq!(names(&owned), vec!["a", "b"]);
    }

    #[test]
    fn simple_index_matches_exact_values() {
        let store = photos_store();
        store
            .index_create("app", "photos", IndexSpec::simple("rank"))
            .unwrap();
        for (name, rank) in [("a", 1), ("b", 2), ("c", 1)] {
            store
                .insert("app", "photos", doc(json!({"name": name, "rank": rank})))
                .unwrap();
        }

        let ranked = store
            .query(
                "app",
                "photos",
                &Query::index_eq("rank", 1).order_by("name", Direction::Desc),
            )
            .unwrap();
        assert_eq!(names(&ranked), vec!["c", "a"]);
    }

    #[test]
    fn querying_unknown_index_fails() {
        let store = photos_store();
        let err = store
            .query("app", "photos", &Query::index_eq("owner", "u1"))
            .unwrap_err();
        assert!(matches!(err, StoreError::IndexMissing(_)));
    }

    #[test]
    fn contains_filters_array_fields() {
        let store = photos_store();
        store
            .insert("app", "photos", doc(json!({"name": "a", "tags": ["sun", "sea"]})))
            .unwrap();
        store
            .insert("app", "photos", doc(json!({"name": "b", "tags": ["snow"]})))
            .unwrap();
        store
            .insert("app", "photos", doc(json!({"name": "c"})))
            .unwrap();

        let matched = store
            .query("app", "photos", &Query::contains("tags", "sea"))
            .unwrap();
        assert_eq!(names(&matched), vec!["a"]);
    }

    #[test]
    fn null_lookup_values_are_unsupported() {
        let store = photos_store();
        let err = store
            .query("app", "photos", &Query::contains("tags", Value::Null))
            .unwrap_err();
        assert!(matches!(err, StoreError::UnsupportedValue(Value::Null)));
    }

    #[test]
    fn closed_store_rejects_calls() {
        let store = photos_store();
        store.close().unwrap();
        assert!(matches!(store.db_list(), Err(StoreError::Closed)));
        assert!(matches!(store.close(), Err(StoreError::Closed)));
    }

    #[test]
    fn missing_data_dir_is_unreachable() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("absent");
        let err = SqliteStore::open("localhost", 28015, Some(&missing))
            .err()
            .unwrap();
        assert!(matches!(err, StoreError::Unreachable(_)));
    }

    #[test]
    fn file_store_persists_across_connections() {
        let dir = tempfile::tempdir().unwrap();
        let store = SqliteStore::open("localhost", 28015, Some(dir.path())).unwrap();
        assert!(store.location().ends_with("localhost-28015.sqlite3"));
        store.db_create("app").unwrap();
        store.close().unwrap();

        let reopened = SqliteStore::open("localhost", 28015, Some(dir.path())).unwrap();
        assert_eq!(reopened.db_list().unwrap(), vec!["app"]);
    }
}
