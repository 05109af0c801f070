use std::path::PathBuf;

use thiserror::Error;

/// Authorization or credential failure on the remote-spreadsheet path.
///
/// A missing client secret is the only condition fatal to that path; every
/// other variant aborts the current attempt and is surfaced for the user to
/// retry manually.
#[derive(Debug, Error)]
pub enum AuthError {
    #[error("client secret not found at {0}; the remote spreadsheet source requires it")]
    MissingClientSecret(PathBuf),

    #[error("client secret at {path} is not a valid installed-app secret: {source}")]
    MalformedClientSecret {
        path: PathBuf,
        source: serde_json::Error,
    },

    #[error("auth_uri in the client secret is not a valid URL: {0}")]
    BadAuthUri(String),

    #[error("no cached credential and no refresh token; interactive authorization required")]
    NeedsAuthorization,

    #[error("token endpoint rejected the request: {0}")]
    TokenRejected(String),

    #[error("authorization redirect never delivered a code: {0}")]
    RedirectFailed(String),

    #[error(transparent)]
    Http(#[from] reqwest::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Remote data retrieval failure (listing or reading a spreadsheet).
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("spreadsheet API returned {status}: {body}")]
    Status {
        status: reqwest::StatusCode,
        body: String,
    },

    #[error(transparent)]
    Http(#[from] reqwest::Error),
}

/// Malformed uploaded file. Surfaced to the user, never recovered.
#[derive(Debug, Error)]
pub enum ParseError {
    #[error(transparent)]
    Csv(#[from] csv::Error),

    #[error("could not read {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("file has no header row")]
    MissingHeader,
}

/// Search provider transport or HTTP failure. Per-call and non-fatal: the
/// enrichment loop treats it as zero results and keeps going.
#[derive(Debug, Error)]
pub enum SearchError {
    #[error("search API returned {status}: {body}")]
    Status {
        status: reqwest::StatusCode,
        body: String,
    },

    #[error(transparent)]
    Http(#[from] reqwest::Error),
}
