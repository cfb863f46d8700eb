//! User persistence and authentication.
//!
//! # Invariants
//! - Plaintext passwords are never persisted or returned; only the digest.
//! - `username` uniqueness is enforced by the store's unique index.
//! - `authenticate` reports bad credentials as `false`, never as an error.

use super::{decode, inserted_id, log_outcome};
use crate::db::schema::{fields, USERS};
use crate::db::{run_blocking, Db, DbError, DbResult, NotFoundTarget};
use crate::derived::password::{hash_password, verify_password};
use crate::model::user::{NewUser, User};
use crate::store::{to_document, DocumentStore, Query};
use chrono::{DateTime, Utc};
use log::info;
use serde::Serialize;
use std::time::Instant;

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct UserInsert<'a> {
    username: &'a str,
    password: String,
    email: &'a str,
    name: &'a str,
    #[serde(with = "chrono::serde::ts_microseconds")]
    created_at: DateTime<Utc>,
}

/// User operations bound to a [`Db`].
///
/// Methods take the repository by value, so calls on a temporary
/// repository can be joined.
#[derive(Clone, Copy)]
pub struct UserRepository<'db> {
    db: &'db Db,
}

impl<'db> UserRepository<'db> {
    pub(crate) fn new(db: &'db Db) -> Self {
        Self { db }
    }

    /// Stores a new user with its password digested.
    ///
    /// # Errors
    /// - [`DbError::Persistence`] with the store's first insert error, e.g.
    ///   when the username is taken.
    pub async fn save(self, user: NewUser) -> DbResult<User> {
        let started_at = Instant::now();
        let store = self.db.store()?;
        let db = self.db.config().db.clone();
        let result = run_blocking(move || save_user(store.as_ref(), &db, &user)).await;
        log_outcome("user_save", started_at, &result);
        result
    }

    /// # Errors
    /// - [`DbError::NotFound`] when no user has this exact username.
    pub async fn get(self, username: &str) -> DbResult<User> {
        let started_at = Instant::now();
        let store = self.db.store()?;
        let db = self.db.config().db.clone();
        let username = username.to_string();
        let result = run_blocking(move || get_user(store.as_ref(), &db, &username)).await;
        log_outcome("user_get", started_at, &result);
        result
    }

    /// Checks a username/password pair.
    ///
    /// Unknown usernames and wrong passwords both yield `Ok(false)`.
    ///
    /// # Errors
    /// - Connection and store failures still propagate.
    pub async fn authenticate(self, username: &str, password: &str) -> DbResult<bool> {
        let started_at = Instant::now();
        let store = self.db.store()?;
        let db = self.db.config().db.clone();
        let username = username.to_string();
        let password = password.to_string();
        let result = run_blocking(move || {
            match get_user(store.as_ref(), &db, &username) {
                Ok(user) => Ok(verify_password(&password, &user.password_hash)),
                Err(DbError::NotFound(_)) => Ok(false),
                Err(err) => Err(err),
            }
        })
        .await;

        if let Ok(accepted) = result {
            // Outcome only; which part of the credential failed is not logged.
            info!(
                "event=user_authenticate module=repo status=ok accepted={accepted} duration_ms={}",
                started_at.elapsed().as_millis()
            );
        } else {
            log_outcome("user_authenticate", started_at, &result);
        }
        result
    }
}

fn save_user(store: &dyn DocumentStore, db: &str, user: &NewUser) -> DbResult<User> {
    let insert = UserInsert {
        username: &user.username,
        password: hash_password(&user.password),
        email: &user.email,
        name: &user.name,
        created_at: Utc::now(),
    };
    let id = inserted_id(store.insert(db, USERS, to_document(&insert)?)?)?;

    match store.get(db, USERS, &id)? {
        Some(document) => decode(document),
        None => Err(DbError::NotFound(NotFoundTarget::User(
            user.username.clone(),
        ))),
    }
}

fn get_user(store: &dyn DocumentStore, db: &str, username: &str) -> DbResult<User> {
    store.index_wait(db, USERS)?;
    store
        .query(db, USERS, &Query::index_eq(fields::USERNAME, username))?
        .into_iter()
        .next()
        .map(decode)
        .transpose()?
        .ok_or_else(|| DbError::NotFound(NotFoundTarget::User(username.to_string())))
}
