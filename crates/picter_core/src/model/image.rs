//! Image entity.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Image as stored, including every derived field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Image {
    /// Store-assigned id. Never exposed outside the service boundary.
    pub id: String,
    /// Encoded form of `id`, safe to hand out.
    pub public_id: String,
    pub description: String,
    /// Hashtags of `description` at creation time, lowercase, in order.
    pub tags: Vec<String>,
    pub url: String,
    pub likes: u64,
    pub liked: bool,
    /// Owner id. Not checked against the users collection.
    pub user_id: String,
    #[serde(with = "chrono::serde::ts_microseconds")]
    pub created_at: DateTime<Utc>,
}

/// Caller input for saving a new image.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewImage {
    pub description: String,
    pub url: String,
    pub user_id: String,
}

impl NewImage {
    pub fn new(
        description: impl Into<String>,
        url: impl Into<String>,
        user_id: impl Into<String>,
    ) -> Self {
        Self {
            description: description.into(),
            url: url.into(),
            user_id: user_id.into(),
        }
    }
}
