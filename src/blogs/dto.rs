use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use crate::auth::dto::PublicUser;
use crate::blogs::repo::BlogWithAuthor;

/// Request body for creating or updating a blog. Missing fields deserialize
/// to empty strings and are rejected by validation.
#[derive(Debug, Deserialize)]
pub struct BlogPayload {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub content: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BlogResponse {
    pub id: i64,
    pub title: String,
    pub content: String,
    pub author: PublicUser,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

impl From<BlogWithAuthor> for BlogResponse {
    fn from(b: BlogWithAuthor) -> Self {
        Self {
            id: b.id,
            title: b.title,
            content: b.content,
            author: PublicUser {
                id: b.author_id,
                email: b.author_email,
                name: b.author_name,
                role: b.author_role,
            },
            created_at: b.created_at,
            updated_at: b.updated_at,
        }
    }
}

/// Paginated listing envelope.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PageResponse {
    pub content: Vec<BlogResponse>,
    pub total_elements: i64,
    pub total_pages: i64,
    pub size: i64,
    pub number: i64,
}

#[derive(Debug, Deserialize)]
pub struct PageParams {
    #[serde(default = "default_page")]
    pub page: i64,
    #[serde(default = "default_size")]
    pub size: i64,
}

fn default_page() -> i64 {
    1
}
fn default_size() -> i64 {
    10
}
