//! Error types for the people API client.
//!
//! # Design
//! `NotFound` gets a dedicated variant because callers frequently distinguish
//! "the profile does not exist" from "the server returned an unexpected
//! status." All other non-2xx responses land in `HttpError` with the raw
//! status code and body for debugging. `SerializationError` also covers a
//! search filter that fails to encode to JSON — the request is never built in
//! that case rather than silently degrading to an unfiltered listing.

use thiserror::Error;

/// Errors returned by `PeopleClient` build and parse methods.
#[derive(Debug, Error)]
pub enum ApiError {
    /// The server returned 404 — the requested resource does not exist.
    #[error("resource not found")]
    NotFound,

    /// The server returned a non-2xx status other than 404.
    #[error("HTTP {status}: {body}")]
    HttpError { status: u16, body: String },

    /// The response body could not be deserialized into the expected type.
    #[error("deserialization failed: {0}")]
    DeserializationError(String),

    /// The request payload or search filter could not be serialized to JSON.
    #[error("serialization failed: {0}")]
    SerializationError(String),
}
