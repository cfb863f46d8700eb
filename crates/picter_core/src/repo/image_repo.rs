//! Image persistence and queries.
//!
//! # Responsibility
//! - Save images with derived `tags`, `createdAt` and `publicId`.
//! - Serve lookups by public id and listings by recency, owner and tag.
//!
//! # Invariants
//! - `publicId` is written in a second update, once the store has assigned
//!   the id. Until then the document is mid-save and no read returns it.
//! - `tags` are computed at save time only.
//! - Listings are ordered by `createdAt` descending.
//! - `like` reads then writes the counter in two store calls; concurrent
//!   likes of one image can lose an increment.

use super::{decode, inserted_id, log_outcome};
use crate::db::schema::{fields, IMAGES};
use crate::db::{run_blocking, Db, DbError, DbResult, NotFoundTarget};
use crate::derived::public_id::{decode_public_id, encode_public_id};
use crate::derived::tags::{extract_tags, normalize_tag};
use crate::model::image::{Image, NewImage};
use crate::store::{to_document, Direction, Document, DocumentStore, Query};
use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::{json, Value};
use std::time::Instant;

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ImageInsert<'a> {
    description: &'a str,
    tags: Vec<String>,
    url: &'a str,
    likes: u64,
    liked: bool,
    user_id: &'a str,
    #[serde(with = "chrono::serde::ts_microseconds")]
    created_at: DateTime<Utc>,
}

/// Image operations bound to a [`Db`].
///
/// Methods take the repository by value, so calls on a temporary
/// repository can be joined.
#[derive(Clone, Copy)]
pub struct ImageRepository<'db> {
    db: &'db Db,
}

impl<'db> ImageRepository<'db> {
    pub(crate) fn new(db: &'db Db) -> Self {
        Self { db }
    }

    /// Stores a new image and returns it as persisted.
    ///
    /// # Errors
    /// - [`DbError::Persistence`] with the store's first insert error.
    pub async fn save(self, image: NewImage) -> DbResult<Image> {
        let started_at = Instant::now();
        let store = self.db.store()?;
        let db = self.db.config().db.clone();
        let result = run_blocking(move || save_image(store.as_ref(), &db, &image)).await;
        log_outcome("image_save", started_at, &result);
        result
    }

    /// Marks the image liked and increments its like counter.
    ///
    /// # Errors
    /// - [`DbError::NotFound`] when no image has this public id.
    pub async fn like(self, public_id: &str) -> DbResult<Image> {
        let started_at = Instant::now();
        let store = self.db.store()?;
        let db = self.db.config().db.clone();
        let public_id = public_id.to_string();
        let result = run_blocking(move || like_image(store.as_ref(), &db, &public_id)).await;
        log_outcome("image_like", started_at, &result);
        result
    }

    /// # Errors
    /// - [`DbError::NotFound`] when no image has this public id.
    pub async fn get(self, public_id: &str) -> DbResult<Image> {
        let started_at = Instant::now();
        let store = self.db.store()?;
        let db = self.db.config().db.clone();
        let public_id = public_id.to_string();
        let result = run_blocking(move || get_image(store.as_ref(), &db, &public_id)).await;
        log_outcome("image_get", started_at, &result);
        result
    }

    /// All images, most recent first.
    pub async fn list(self) -> DbResult<Vec<Image>> {
        let started_at = Instant::now();
        let store = self.db.store()?;
        let db = self.db.config().db.clone();
        let result = run_blocking(move || {
            let query = Query::all().order_by(fields::CREATED_AT, Direction::Desc);
            query_images(store.as_ref(), &db, &query)
        })
        .await;
        log_outcome("image_list", started_at, &result);
        result
    }

    /// Images owned by `user_id`, most recent first.
    pub async fn list_by_user(self, user_id: &str) -> DbResult<Vec<Image>> {
        let started_at = Instant::now();
        let store = self.db.store()?;
        let db = self.db.config().db.clone();
        let user_id = user_id.to_string();
        let result = run_blocking(move || {
            store.index_wait(&db, IMAGES)?;
            let query = Query::index_eq(fields::USER_ID, user_id)
                .order_by(fields::CREATED_AT, Direction::Desc);
            query_images(store.as_ref(), &db, &query)
        })
        .await;
        log_outcome("image_list_by_user", started_at, &result);
        result
    }

    /// Images tagged with `tag`, most recent first.
    ///
    /// `tag` is normalized like extracted tags, so `#Family` finds `family`.
    pub async fn list_by_tag(self, tag: &str) -> DbResult<Vec<Image>> {
        let started_at = Instant::now();
        let store = self.db.store()?;
        let db = self.db.config().db.clone();
        let tag = normalize_tag(tag);
        let result = run_blocking(move || {
            store.index_wait(&db, IMAGES)?;
            let query =
                Query::contains(fields::TAGS, tag).order_by(fields::CREATED_AT, Direction::Desc);
            query_images(store.as_ref(), &db, &query)
        })
        .await;
        log_outcome("image_list_by_tag", started_at, &result);
        result
    }
}

fn save_image(store: &dyn DocumentStore, db: &str, image: &NewImage) -> DbResult<Image> {
    let insert = ImageInsert {
        description: &image.description,
        tags: extract_tags(image.description.as_str()),
        url: &image.url,
        likes: 0,
        liked: false,
        user_id: &image.user_id,
        created_at: Utc::now(),
    };
    let id = inserted_id(store.insert(db, IMAGES, to_document(&insert)?)?)?;

    let public_id = encode_public_id(&id);
    let mut patch = Document::new();
    patch.insert(
        fields::PUBLIC_ID.to_string(),
        Value::String(public_id.clone()),
    );
    let written = store.update(db, IMAGES, &id, patch)?;
    if written.replaced == 0 {
        return Err(DbError::NotFound(NotFoundTarget::Image(public_id)));
    }

    load_image(store, db, &id)?.ok_or(DbError::NotFound(NotFoundTarget::Image(public_id)))
}

fn like_image(store: &dyn DocumentStore, db: &str, public_id: &str) -> DbResult<Image> {
    let image = get_image(store, db, public_id)?;

    let mut patch = Document::new();
    patch.insert(fields::LIKED.to_string(), Value::Bool(true));
    patch.insert(
        fields::LIKES.to_string(),
        json!(image.likes.saturating_add(1)),
    );
    let written = store.update(db, IMAGES, &image.id, patch)?;
    if written.replaced == 0 {
        return Err(not_found(public_id));
    }

    get_image(store, db, public_id)
}

fn get_image(store: &dyn DocumentStore, db: &str, public_id: &str) -> DbResult<Image> {
    // A token that does not decode cannot name a stored image.
    let id = decode_public_id(public_id).map_err(|_| not_found(public_id))?;
    load_image(store, db, &id)?.ok_or_else(|| not_found(public_id))
}

fn load_image(store: &dyn DocumentStore, db: &str, id: &str) -> DbResult<Option<Image>> {
    match store.get(db, IMAGES, id)? {
        Some(document) if is_published(&document) => decode(document).map(Some),
        _ => Ok(None),
    }
}

fn query_images(store: &dyn DocumentStore, db: &str, query: &Query) -> DbResult<Vec<Image>> {
    store
        .query(db, IMAGES, query)?
        .into_iter()
        .filter(|document| is_published(document))
        .map(decode)
        .collect()
}

fn is_published(document: &Document) -> bool {
    document
        .get(fields::PUBLIC_ID)
        .is_some_and(Value::is_string)
}

fn not_found(public_id: &str) -> DbError {
    DbError::NotFound(NotFoundTarget::Image(public_id.to_string()))
}
