//! Terminal counterpart of the dashboard: a typed API client, the explicit
//! session it authenticates with, and the client-side aggregation and export.

pub mod api;
pub mod dashboard;
pub mod export;
pub mod session;

use thiserror::Error;

pub use api::ApiClient;
pub use session::{Session, TokenStore};

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("Not logged in")]
    NotLoggedIn,

    #[error("Session expired. Please login again.")]
    SessionExpired,

    /// Non-success response carrying the server's `{ "message": ... }`.
    #[error("{message}")]
    Api { status: u16, message: String },

    #[error("{0}")]
    Form(&'static str),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
}
