//! Repositories over the live store connection.
//!
//! # Responsibility
//! - Compute derived fields (`tags`, `publicId`, password digest,
//!   `createdAt`) and persist entities.
//! - Translate store outcomes into semantic errors (`NotFound`,
//!   `Persistence`).
//!
//! # Invariants
//! - Every operation checks the connection state when it is called.
//! - Each operation runs as one blocking task and completes after its last
//!   store call completes.
//! - Entities returned by writes are re-read from the store.

use crate::db::{DbError, DbResult};
use crate::store::{from_document, Document, InsertReport};
use log::{error, info};
use serde::de::DeserializeOwned;
use std::time::Instant;

pub mod image_repo;
pub mod user_repo;

/// Returns the generated id of a single-document insert.
fn inserted_id(report: InsertReport) -> DbResult<String> {
    if report.errors > 0 {
        return Err(DbError::Persistence(
            report
                .first_error
                .unwrap_or_else(|| "store reported an insert error".to_string()),
        ));
    }
    report
        .generated_keys
        .into_iter()
        .next()
        .ok_or_else(|| DbError::InvalidData("insert returned no generated key".to_string()))
}

fn decode<T: DeserializeOwned>(document: Document) -> DbResult<T> {
    from_document(document).map_err(|err| DbError::InvalidData(err.to_string()))
}

fn log_outcome<T>(event: &str, started_at: Instant, result: &DbResult<T>) {
    match result {
        Ok(_) => info!(
            "event={event} module=repo status=ok duration_ms={}",
            started_at.elapsed().as_millis()
        ),
        Err(err) => error!(
            "event={event} module=repo status=error duration_ms={} error_code={} error={}",
            started_at.elapsed().as_millis(),
            err.code(),
            err
        ),
    }
}
