//! Pure derivations computed by the repositories from caller input.
//!
//! # Responsibility
//! - Extract hashtags from image descriptions.
//! - Encode internal ids into public identifiers and back.
//! - Digest plaintext passwords.
//!
//! # Invariants
//! - Every function here is deterministic and free of I/O.
//! - Callers never set derived fields directly; repositories own them.

pub mod password;
pub mod public_id;
pub mod tags;
