//! Public identifier codec.
//!
//! Internal ids are store-defined opaque strings. The public form is the
//! URL-safe, unpadded base64 encoding of the id bytes, which is a bijection
//! over UTF-8 strings: decoding rejects non-canonical tokens, so each id has
//! exactly one public form.

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use thiserror::Error;

/// Failure to turn a public token back into an internal id.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PublicIdError {
    #[error("public id `{token}` is not a valid encoding: {reason}")]
    Malformed { token: String, reason: String },
    #[error("public id `{0}` does not decode to a UTF-8 id")]
    NotUtf8(String),
}

/// Encodes an internal id into its public token.
pub fn encode_public_id(id: &str) -> String {
    URL_SAFE_NO_PAD.encode(id.as_bytes())
}

/// Decodes a public token produced by [`encode_public_id`].
pub fn decode_public_id(token: &str) -> Result<String, PublicIdError> {
    let bytes = URL_SAFE_NO_PAD
        .decode(token)
        .map_err(|err| PublicIdError::Malformed {
            token: token.to_string(),
            reason: err.to_string(),
        })?;

    String::from_utf8(bytes).map_err(|_| PublicIdError::NotUtf8(token.to_string()))
}
