//! Mapping internal failures to GraphQL errors.
//!
//! Every error sent to a client carries `extensions.code`. Internal details
//! are logged and replaced by a short message.

use async_graphql::{Error, ErrorExtensions};

use crate::event_create::CreateEventError;

impl ErrorExtensions for CreateEventError {
    fn extend(&self) -> Error {
        let message = match self {
            Self::Persistence(e) => {
                tracing::error!(error = %e, "event persistence failed");
                "failed to save event".to_string()
            }
            other => other.to_string(),
        };

        Error::new(message).extend_with(|_, ext| {
            ext.set("code", self.code().to_string());
            if let Some(id) = self.saved_id() {
                ext.set("id", id.to_string());
            }
        })
    }
}

/// Logs `err` and returns an opaque `INTERNAL` error.
pub(crate) fn internal_error(operation: &str, err: impl std::fmt::Display) -> Error {
    tracing::error!(operation, error = %err, "graphql resolver failed");
    Error::new("internal error").extend_with(|_, ext| ext.set("code", "INTERNAL".to_string()))
}
