//! Connection lifecycle for the photo store.
//!
//! # Responsibility
//! - Own the document-store handle and the connection state machine.
//! - Bootstrap the required schema on connect.
//! - Hand out repositories bound to the live connection.
//!
//! # Invariants
//! - State moves `Disconnected -> Connecting -> Connected -> Disconnected`.
//! - Repository calls check the state on every call, not at construction.
//! - A failed connect leaves the component `Disconnected` with no open handle.

use crate::config::DbConfig;
use crate::repo::image_repo::ImageRepository;
use crate::repo::user_repo::UserRepository;
use crate::store::{DocumentStore, StoreError};
use log::{error, info, warn};
use std::fmt::{Display, Formatter};
use std::sync::Arc;
use std::time::Instant;
use thiserror::Error;

mod connect;
pub mod schema;

pub use schema::BootstrapReport;

pub type DbResult<T> = Result<T, DbError>;

/// Entity a lookup failed to find.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NotFoundTarget {
    /// Keyed by public id.
    Image(String),
    /// Keyed by username.
    User(String),
}

impl Display for NotFoundTarget {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Image(public_id) => write!(f, "image `{public_id}`"),
            Self::User(username) => write!(f, "user `{username}`"),
        }
    }
}

#[derive(Debug, Error)]
pub enum DbError {
    #[error("cannot connect to store at {target}: {source}")]
    Connection {
        target: String,
        #[source]
        source: StoreError,
    },
    #[error("not connected")]
    NotConnected,
    #[error("already connected")]
    AlreadyConnected,
    #[error("persistence failed: {0}")]
    Persistence(String),
    #[error("{0} not found")]
    NotFound(NotFoundTarget),
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error("invalid stored data: {0}")]
    InvalidData(String),
    #[error("store task failed: {0}")]
    Task(String),
}

impl DbError {
    /// Stable code used in `error_code=` log fields.
    pub fn code(&self) -> &'static str {
        match self {
            Self::Connection { .. } => "connection_failed",
            Self::NotConnected => "not_connected",
            Self::AlreadyConnected => "already_connected",
            Self::Persistence(_) => "persistence_failed",
            Self::NotFound(_) => "not_found",
            Self::Store(_) => "store_error",
            Self::InvalidData(_) => "invalid_data",
            Self::Task(_) => "task_failed",
        }
    }
}

/// Observable connection state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Disconnected,
    Connecting,
    Connected,
}

enum Slot {
    Disconnected,
    Connecting,
    Connected(Arc<dyn DocumentStore>),
}

/// Data-access component for images and users.
///
/// ```no_run
/// # async fn demo() -> picter_core::DbResult<()> {
/// use picter_core::{Db, DbConfig, NewImage};
///
/// let mut db = Db::new(DbConfig::default().with_data_dir("/var/lib/picter"));
/// db.connect().await?;
/// let image = db
///     .images()
///     .save(NewImage::new("#sunset at the pier", "https://cdn/p.jpg", "u1"))
///     .await?;
/// assert_eq!(image.tags, vec!["sunset"]);
/// db.disconnect().await?;
/// # Ok(())
/// # }
/// ```
pub struct Db {
    config: DbConfig,
    slot: Slot,
}

impl Db {
    pub fn new(config: DbConfig) -> Self {
        Self {
            config,
            slot: Slot::Disconnected,
        }
    }

    pub fn config(&self) -> &DbConfig {
        &self.config
    }

    pub fn state(&self) -> ConnectionState {
        match self.slot {
            Slot::Disconnected => ConnectionState::Disconnected,
            Slot::Connecting => ConnectionState::Connecting,
            Slot::Connected(_) => ConnectionState::Connected,
        }
    }

    pub fn is_connected(&self) -> bool {
        self.state() == ConnectionState::Connected
    }

    /// Opens the store and ensures the database, collections and indexes exist.
    ///
    /// Returns what the bootstrap had to create; empty on an initialized store.
    ///
    /// # Errors
    /// - [`DbError::AlreadyConnected`] unless the state is `Disconnected`.
    /// - [`DbError::Connection`] when the store cannot be opened.
    /// - Any bootstrap failure, after which the handle is closed again.
    pub async fn connect(&mut self) -> DbResult<BootstrapReport> {
        if !matches!(self.slot, Slot::Disconnected) {
            warn!(
                "event=db_connect module=db status=rejected target={} error_code=already_connected",
                self.config.target()
            );
            return Err(DbError::AlreadyConnected);
        }

        let started_at = Instant::now();
        info!(
            "event=db_connect module=db status=start target={} db={}",
            self.config.target(),
            self.config.db
        );
        self.slot = Slot::Connecting;

        let config = self.config.clone();
        match run_blocking(move || connect::open_and_bootstrap(&config)).await {
            Ok((store, report)) => {
                self.slot = Slot::Connected(store);
                info!(
                    "event=db_connect module=db status=ok target={} db={} created={} duration_ms={}",
                    self.config.target(),
                    self.config.db,
                    report.created.len(),
                    started_at.elapsed().as_millis()
                );
                Ok(report)
            }
            Err(err) => {
                self.slot = Slot::Disconnected;
                error!(
                    "event=db_connect module=db status=error target={} duration_ms={} error_code={} error={}",
                    self.config.target(),
                    started_at.elapsed().as_millis(),
                    err.code(),
                    err
                );
                Err(err)
            }
        }
    }

    /// Closes the store handle.
    ///
    /// # Errors
    /// - [`DbError::NotConnected`] unless the state is `Connected`. A
    ///   `Connecting` state left behind by a cancelled connect is reset.
    pub async fn disconnect(&mut self) -> DbResult<()> {
        let store = match std::mem::replace(&mut self.slot, Slot::Disconnected) {
            Slot::Connected(store) => store,
            Slot::Disconnected | Slot::Connecting => {
                warn!("event=db_disconnect module=db status=rejected error_code=not_connected");
                return Err(DbError::NotConnected);
            }
        };

        run_blocking(move || store.close().map_err(DbError::from)).await?;
        info!(
            "event=db_disconnect module=db status=ok target={}",
            self.config.target()
        );
        Ok(())
    }

    pub fn images(&self) -> ImageRepository<'_> {
        ImageRepository::new(self)
    }

    pub fn users(&self) -> UserRepository<'_> {
        UserRepository::new(self)
    }

    /// Live store handle, or `NotConnected`.
    pub(crate) fn store(&self) -> DbResult<Arc<dyn DocumentStore>> {
        match &self.slot {
            Slot::Connected(store) => Ok(Arc::clone(store)),
            Slot::Disconnected | Slot::Connecting => Err(DbError::NotConnected),
        }
    }
}

/// Runs blocking store work on the blocking thread pool.
pub(crate) async fn run_blocking<T, F>(task: F) -> DbResult<T>
where
    F: FnOnce() -> DbResult<T> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(task)
        .await
        .map_err(|err| DbError::Task(err.to_string()))?
}
