use reqwest::StatusCode;

/// Errors surfaced by the history and detail scrapers.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("unknown card type")]
    UnknownCardType,
    #[error("invalid {0}")]
    InvalidId(&'static str),
    #[error(transparent)]
    Transport(#[from] reqwest::Error),
    #[error("{}", .0.canonical_reason().unwrap_or("unexpected HTTP status"))]
    HttpStatus(StatusCode),
    #[error("unable to find ticket history or no ticket history")]
    EmptyHistory,
    #[error("unable to read {0}")]
    MissingField(&'static str),
}

/// A single labelled value that failed to parse during a history scan.
/// These aggregate across the whole scan instead of aborting it.
#[derive(Debug, thiserror::Error)]
#[error("{label} {kind}")]
pub struct FieldError {
    pub label: &'static str,
    #[source]
    pub kind: FieldErrorKind,
}

#[derive(Debug, thiserror::Error)]
pub enum FieldErrorKind {
    #[error(transparent)]
    Date(#[from] chrono::ParseError),
    #[error(transparent)]
    Int(#[from] std::num::ParseIntError),
    #[error("invalid price string")]
    Price,
    #[error("ticket block is missing one or more fields")]
    Incomplete,
}
