//! Document-store contract used by the repositories.
//!
//! # Responsibility
//! - Describe the backing store as databases holding named collections of
//!   schema-less JSON documents with named secondary indexes.
//! - Keep storage engine details behind the [`DocumentStore`] trait.
//!
//! # Invariants
//! - Every document carries a string `id` primary key, generated by the
//!   store when the inserted document has none.
//! - Each trait call is atomic on its own; no call spans another.
//! - Insert reports constraint violations per document instead of failing.
//! - Index-backed queries are issued only after `index_wait` succeeds.

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use thiserror::Error;

mod sqlite;

pub use sqlite::SqliteStore;

/// One stored JSON object.
pub type Document = serde_json::Map<String, Value>;

pub type StoreResult<T> = Result<T, StoreError>;

/// Primary key field present on every document.
pub const ID_FIELD: &str = "id";

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("{0}")]
    Sqlite(#[from] rusqlite::Error),
    #[error("invalid document json: {0}")]
    Json(#[from] serde_json::Error),
    #[error("store at `{0}` is unreachable")]
    Unreachable(String),
    #[error("invalid {kind} name `{name}`; expected [A-Za-z0-9_]+")]
    InvalidName { kind: &'static str, name: String },
    #[error("database `{0}` already exists")]
    DatabaseExists(String),
    #[error("database `{0}` does not exist")]
    DatabaseMissing(String),
    #[error("collection `{0}` already exists")]
    CollectionExists(String),
    #[error("collection `{0}` does not exist")]
    CollectionMissing(String),
    #[error("index `{0}` already exists")]
    IndexExists(String),
    #[error("index `{0}` does not exist")]
    IndexMissing(String),
    #[error("index `{0}` is not ready")]
    IndexNotReady(String),
    #[error("invalid document: {0}")]
    InvalidDocument(String),
    #[error("value `{0}` cannot be compared through an index")]
    UnsupportedValue(Value),
    #[error("store connection lock poisoned")]
    Poisoned,
    #[error("store connection is closed")]
    Closed,
}

/// Secondary index definition. The indexed field has the index's name.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IndexSpec<'a> {
    pub name: &'a str,
    /// Array-valued fields match when any element equals the lookup value.
    pub multi: bool,
    pub unique: bool,
}

impl<'a> IndexSpec<'a> {
    pub const fn simple(name: &'a str) -> Self {
        Self {
            name,
            multi: false,
            unique: false,
        }
    }

    pub const fn multi(name: &'a str) -> Self {
        Self {
            name,
            multi: true,
            unique: false,
        }
    }

    pub const fn unique(name: &'a str) -> Self {
        Self {
            name,
            multi: false,
            unique: true,
        }
    }
}

/// Outcome of an insert call.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InsertReport {
    pub inserted: u64,
    pub errors: u64,
    /// First per-document error reported by the store.
    pub first_error: Option<String>,
    /// Ids generated by the store, in insertion order.
    pub generated_keys: Vec<String>,
}

/// Outcome of an update call.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WriteReport {
    pub replaced: u64,
    /// Documents the update targeted but did not find.
    pub skipped: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Asc,
    Desc,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderBy {
    pub field: String,
    pub direction: Direction,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Filter {
    All,
    /// Equality lookup through a named secondary index.
    IndexEq { index: String, value: Value },
    /// Documents whose array `field` contains `value`.
    Contains { field: String, value: Value },
}

/// Read query over one collection.
///
/// Equal sort keys keep insertion order in the requested direction.
#[derive(Debug, Clone, PartialEq)]
pub struct Query {
    pub filter: Filter,
    pub order: Option<OrderBy>,
}

impl Query {
    pub fn all() -> Self {
        Self {
            filter: Filter::All,
            order: None,
        }
    }

    pub fn index_eq(index: impl Into<String>, value: impl Into<Value>) -> Self {
        Self {
            filter: Filter::IndexEq {
                index: index.into(),
                value: value.into(),
            },
            order: None,
        }
    }

    pub fn contains(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Self {
            filter: Filter::Contains {
                field: field.into(),
                value: value.into(),
            },
            order: None,
        }
    }

    pub fn order_by(mut self, field: impl Into<String>, direction: Direction) -> Self {
        self.order = Some(OrderBy {
            field: field.into(),
            direction,
        });
        self
    }
}

/// Backing document store.
///
/// Implementations must be shareable across threads; repositories call them
/// from blocking worker tasks.
pub trait DocumentStore: Send + Sync {
    fn db_list(&self) -> StoreResult<Vec<String>>;
    fn db_create(&self, db: &str) -> StoreResult<()>;

    fn collection_list(&self, db: &str) -> StoreResult<Vec<String>>;
    fn collection_create(&self, db: &str, collection: &str) -> StoreResult<()>;

    fn index_list(&self, db: &str, collection: &str) -> StoreResult<Vec<String>>;
    fn index_create(&self, db: &str, collection: &str, index: IndexSpec<'_>) -> StoreResult<()>;
    /// Blocks until every index of `collection` can serve queries.
    fn index_wait(&self, db: &str, collection: &str) -> StoreResult<()>;

    fn insert(&self, db: &str, collection: &str, document: Document) -> StoreResult<InsertReport>;
    fn get(&self, db: &str, collection: &str, id: &str) -> StoreResult<Option<Document>>;
    /// Merges the top-level fields of `patch` into the stored document.
    fn update(
        &self,
        db: &str,
        collection: &str,
        id: &str,
        patch: Document,
    ) -> StoreResult<WriteReport>;
    fn query(&self, db: &str, collection: &str, query: &Query) -> StoreResult<Vec<Document>>;

    /// Releases the underlying connection. Later calls fail with `Closed`.
    fn close(&self) -> StoreResult<()>;
}

/// Serializes a record into a document; the record must serialize as an object.
pub fn to_document<T: Serialize>(value: &T) -> StoreResult<Document> {
    match serde_json::to_value(value)? {
        Value::Object(document) => Ok(document),
        other => Err(StoreError::InvalidDocument(format!(
            "expected a JSON object, got `{other}`"
        ))),
    }
}

/// Deserializes a stored document into a record.
pub fn from_document<T: DeserializeOwned>(document: Document) -> StoreResult<T> {
    Ok(serde_json::from_value(Value::Object(document))?)
}
