//! Stored entities and the caller-supplied inputs that create them.
//!
//! # Responsibility
//! - Define the image and user records as stored in the document store.
//! - Keep derived fields out of the input types so callers cannot set them.
//!
//! # Invariants
//! - Stored field names are camelCase (`publicId`, `userId`, `createdAt`).
//! - `createdAt` is persisted as integer microseconds since the Unix epoch.

pub mod image;
pub mod user;
