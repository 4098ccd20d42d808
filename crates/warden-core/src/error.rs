//! Error types for Warden

use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

/// Warden error taxonomy.
///
/// Stage failures (`BindFailure`, `SearchFailure`, `SortFailure`,
/// `FetchFailure`) carry no protocol diagnostics in their display text;
/// the underlying detail is logged at the failure site and must not be
/// shown to untrusted callers.
#[derive(Error, Debug)]
pub enum Error {
    // Configuration Errors
    #[error("Directory service is not configured: {0}")]
    Configuration(String),

    // Controller Selection Errors
    #[error("Failed to locate an available directory server")]
    NoDirectoryServerAvailable,

    // Pipeline Stage Errors
    #[error("Failed to bind to the directory server")]
    BindFailure,

    #[error("Failed to create the directory search query")]
    SearchFailure,

    #[error("Failed to sort the search result")]
    SortFailure,

    #[error("Failed to read the search result entries")]
    FetchFailure,

    #[error("Failed to close the connection to the directory server")]
    UnbindFailure,

    // Internal Errors
    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl Error {
    /// Short machine-readable code for the error kind.
    pub fn code(&self) -> &'static str {
        match self {
            Error::Configuration(_) => "Configuration",
            Error::NoDirectoryServerAvailable => "NoDirectoryServerAvailable",
            Error::BindFailure => "BindFailure",
            Error::SearchFailure => "SearchFailure",
            Error::SortFailure => "SortFailure",
            Error::FetchFailure => "FetchFailure",
            Error::UnbindFailure => "UnbindFailure",
            Error::Io(_) => "Io",
            Error::Other(_) => "Internal",
        }
    }

    /// True for failures of a pipeline stage after a connection was
    /// established, where cleanup of the connection is still owed.
    pub fn is_stage_failure(&self) -> bool {
        matches!(
            self,
            Error::BindFailure | Error::SearchFailure | Error::SortFailure | Error::FetchFailure
        )
    }
}
