//! Store opening for [`super::Db::connect`].
//!
//! # Invariants
//! - The returned handle has the full schema bootstrapped.
//! - On bootstrap failure the freshly opened handle is closed before the
//!   error is returned.

use super::schema::{bootstrap, BootstrapReport};
use super::{DbError, DbResult};
use crate::config::DbConfig;
use crate::store::{DocumentStore, SqliteStore};
use log::{info, warn};
use std::sync::Arc;

pub(super) fn open_and_bootstrap(
    config: &DbConfig,
) -> DbResult<(Arc<dyn DocumentStore>, BootstrapReport)> {
    let store = SqliteStore::open(&config.host, config.port, config.data_dir.as_deref())
        .map_err(|source| DbError::Connection {
            target: config.target(),
            source,
        })?;
    info!(
        "event=store_open module=db status=ok location={}",
        store.location()
    );

    match bootstrap(&store, &config.db) {
        Ok(report) => {
            let store: Arc<dyn DocumentStore> = Arc::new(store);
            Ok((store, report))
        }
        Err(err) => {
            if let Err(close_err) = store.close() {
                warn!(
                    "event=store_close module=db status=error error_code=close_after_bootstrap_failed error={}",
                    close_err
                );
            }
            Err(err)
        }
    }
}
