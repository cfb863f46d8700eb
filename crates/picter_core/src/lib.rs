//! Persistence layer for the Picter photo-sharing service.
//! Stores images and users, derives hashtags, public ids and password
//! digests, and answers recency, ownership and tag queries.

pub mod config;
pub mod db;
pub mod derived;
pub mod logging;
pub mod model;
pub mod repo;
pub mod store;

pub use config::{ConfigError, DbConfig};
pub use db::{BootstrapReport, ConnectionState, Db, DbError, DbResult, NotFoundTarget};
pub use derived::password::{hash_password, verify_password};
pub use derived::public_id::{decode_public_id, encode_public_id, PublicIdError};
pub use derived::tags::{extract_tags, normalize_tag};
pub use logging::{default_log_level, init_logging, logging_status, LogTarget, LoggingError};
pub use model::image::{Image, NewImage};
pub use model::user::{NewUser, User};
pub use repo::image_repo::ImageRepository;
pub use repo::user_repo::UserRepository;
pub use store::{DocumentStore, SqliteStore, StoreError};

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
