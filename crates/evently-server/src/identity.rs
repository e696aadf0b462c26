//! Request-scoped caller identity.
//!
//! Callers identify themselves with `X-Evently-User: <user id>` or
//! `Authorization: Bearer <user id>`. The header only names a user; the
//! create-event operation resolves it against the `users` table and
//! rejects unknown or inactive users.

use axum::http::HeaderMap;
use thiserror::Error;

/// Header carrying the caller's user ID.
pub const USER_HEADER: &str = "x-evently-user";

/// The user a request claims to act as. Inserted into GraphQL request data.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Author {
    pub user_id: String,
}

/// Failures resolving the author of a write.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum IdentityError {
    /// No identity header was sent.
    #[error("authentication required")]
    Missing,

    /// An identity header was sent but could not be read.
    #[error("malformed identity header")]
    Malformed,

    /// The named user does not exist.
    #[error("unknown user: {0}")]
    UnknownUser(String),

    /// The named user exists but is deactivated.
    #[error("user is inactive: {0}")]
    Inactive(String),
}

/// Extracts the claimed author from request headers.
///
/// Returns `Ok(None)` when no identity header is present; anonymous
/// requests may still run queries.
pub fn author_from_headers(headers: &HeaderMap) -> Result<Option<Author>, IdentityError> {
    let user_id = if let Some(val) = headers.get(USER_HEADER) {
        val.to_str().map_err(|_| IdentityError::Malformed)?.trim()
    } else if let Some(val) = headers.get(axum::http::header::AUTHORIZATION) {
        let val = val.to_str().map_err(|_| IdentityError::Malformed)?;
        val.strip_prefix("Bearer ")
            .ok_or(IdentityError::Malformed)?
            .trim()
    } else {
        return Ok(None);
    };

    if user_id.is_empty() {
        return Err(IdentityError::Malformed);
    }

    Ok(Some(Author {
        user_id: user_id.to_string(),
    }))
}
