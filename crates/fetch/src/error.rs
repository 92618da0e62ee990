//! Shared error types for the fetch crate.

use cardex_core::{CardError, CardTypeParseError};
use cardex_storage::StorageError;
use thiserror::Error;

/// Errors from issuing an HTTP request, after retries are exhausted (§4.B).
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum FetchError {
    #[error("request to {url} failed: {source}")]
    Request {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("request to {url} returned status {status}")]
    Status { url: String, status: u16 },

    #[error("request to {url} redirected back to the list page, treated as not-found")]
    RedirectedToList { url: String },
}

/// Errors from turning a fetched HTML document into a [`cardex_core::Card`]
/// and its skills (§4.D).
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ParseError {
    #[error("missing required element: {0}")]
    MissingElement(&'static str),

    #[error(transparent)]
    CardType(#[from] CardTypeParseError),

    #[error(transparent)]
    CardValidation(#[from] CardError),

    #[error("malformed raw_json: {0}")]
    RawJson(#[from] serde_json::Error),
}

/// Unifies fetch, parse, and store failures for one card into a single type,
/// so the pipeline driver's completion-stream consumer never has to
/// downcast (§4.F, §7). Both variants are non-fatal at the per-card level; a
/// failing card never aborts the rest of a `sync` run.
#[derive(Debug, Error)]
pub enum CardTaskError {
    #[error(transparent)]
    Fetch(#[from] FetchError),

    #[error(transparent)]
    Parse(#[from] ParseError),

    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// Raised before any card-level work starts (§4.C): a search that never
/// returns a first page.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum DiscoveryError {
    #[error(transparent)]
    Fetch(#[from] FetchError),
}
