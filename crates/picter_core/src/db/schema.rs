//! Required collections and indexes, and the idempotent bootstrap that
//! creates them.
//!
//! # Invariants
//! - Every object is checked before it is created, so bootstrap can run
//!   against an initialized store any number of times.
//! - Indexes are checked per index, not only when their collection is new.
//! - An object created by another handle between the check and the create
//!   counts as present, not as a failure.

use crate::db::DbResult;
use crate::store::{DocumentStore, IndexSpec, StoreError, StoreResult};
use log::info;

pub const IMAGES: &str = "images";
pub const USERS: &str = "users";

/// Field names shared by the schema and the repositories.
pub mod fields {
    pub const PUBLIC_ID: &str = "publicId";
    pub const CREATED_AT: &str = "createdAt";
    pub const USER_ID: &str = "userId";
    pub const TAGS: &str = "tags";
    pub const LIKES: &str = "likes";
    pub const LIKED: &str = "liked";
    pub const USERNAME: &str = "username";
}

#[derive(Debug, Clone, Copy)]
pub struct CollectionSchema {
    pub name: &'static str,
    pub indexes: &'static [IndexSpec<'static>],
}

const SCHEMA: &[CollectionSchema] = &[
    CollectionSchema {
        name: IMAGES,
        indexes: &[
            IndexSpec::simple(fields::CREATED_AT),
            IndexSpec::multi(fields::USER_ID),
        ],
    },
    CollectionSchema {
        name: USERS,
        indexes: &[IndexSpec::unique(fields::USERNAME)],
    },
];

/// Collections (with their indexes) the repositories rely on.
pub fn required_collections() -> &'static [CollectionSchema] {
    SCHEMA
}

/// Objects created by one bootstrap run, as `database:<db>`,
/// `collection:<db>.<name>` and `index:<db>.<collection>.<name>`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BootstrapReport {
    pub created: Vec<String>,
}

impl BootstrapReport {
    /// True when the store was already fully initialized.
    pub fn is_noop(&self) -> bool {
        self.created.is_empty()
    }
}

/// Creates whatever part of the schema is missing in `db`.
pub fn bootstrap(store: &dyn DocumentStore, db: &str) -> DbResult<BootstrapReport> {
    let mut report = BootstrapReport::default();

    if !store.db_list()?.iter().any(|name| name == db) && created(store.db_create(db))? {
        report.created.push(format!("database:{db}"));
    }

    let collections = store.collection_list(db)?;
    for collection in SCHEMA {
        if !collections.iter().any(|name| name == collection.name)
            && created(store.collection_create(db, collection.name))?
        {
            report
                .created
                .push(format!("collection:{db}.{}", collection.name));
        }

        let indexes = store.index_list(db, collection.name)?;
        for index in collection.indexes {
            if indexes.iter().any(|name| name == index.name) {
                continue;
            }
            if created(store.index_create(db, collection.name, *index))? {
                report
                    .created
                    .push(format!("index:{db}.{}.{}", collection.name, index.name));
            }
        }
    }

    for object in &report.created {
        info!("event=schema_create module=db status=ok object={object}");
    }
    Ok(report)
}

/// `Ok(false)` when the object already exists.
fn created(result: StoreResult<()>) -> StoreResult<bool> {
    match result {
        Ok(()) => Ok(true),
        Err(
            StoreError::DatabaseExists(_)
            | StoreError::CollectionExists(_)
            | StoreError::IndexExists(_),
        ) => Ok(false),
        Err(err) => Err(err),
    }
}
