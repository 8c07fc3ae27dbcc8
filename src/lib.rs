//! Propman is a REST backend for managing a small property portfolio:
//! apartments, owners, tenants, maintenance payments and bank transactions.
//!
//! This library provides a JSON API protected by bearer tokens, a bulk
//! transaction importer and a balance-sheet report.

#![warn(missing_docs)]

use std::{net::SocketAddr, time::Duration};

use axum::{
    Json,
    extract::rejection::{JsonRejection, PathRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use axum_server::Handle;
use serde_json::json;
use tokio::signal;

mod app_state;
mod auth;
mod db;
mod endpoints;
mod import;
mod logging;
mod password;
mod report;
mod resource;
mod routing;
mod seed;
mod user;

#[cfg(test)]
mod test_utils;

pub use app_state::AppState;
pub use auth::{Claims, DEFAULT_TOKEN_DURATION};
pub use db::initialize as initialize_db;
pub use logging::{LOG_BODY_LENGTH_LIMIT, logging_middleware};
pub use password::{PasswordHash, ValidatedPassword};
pub use resource::{
    Constraint, Field, FieldKind, RESOURCES, Resource, ResourceRow, RowId,
};
pub use routing::build_router;
pub use user::{Role, User, UserID, create_user, get_user_by_username};

/// An async task that waits for either the ctrl+c or terminate signal, whichever comes first, and
/// then signals the server to shut down gracefully.
///
/// `handle` is a handle to an Axum `Server`.
pub async fn graceful_shutdown(handle: Handle<SocketAddr>) {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::debug!("Received ctrl+c signal.");
            handle.graceful_shutdown(Some(Duration::from_secs(1)));
        },
        _ = terminate => {
            tracing::debug!("Received terminate signal.");
            handle.graceful_shutdown(Some(Duration::from_secs(1)));
        },
    }
}

/// The errors that may occur in the application.
#[derive(Debug, thiserror::Error, PartialEq)]
pub enum Error {
    /// The request did not include an `Authorization` header.
    #[error("no token")]
    Unauthenticated,

    /// The bearer token could not be parsed, has a bad signature or has
    /// expired.
    #[error("invalid token")]
    InvalidToken,

    /// The username or password was wrong.
    ///
    /// The message is the same for both so it does not reveal which usernames exist.
    #[error("invalid credentials")]
    InvalidCredentials,

    /// A signed token could not be created.
    #[error("could not create token: {0}")]
    TokenCreation(String),

    /// The user provided a password that is too easy to guess.
    #[error("password is too weak: {0}")]
    TooWeak(String),

    /// An unexpected error occurred with the underlying hashing library.
    ///
    /// The error string should only be logged for debugging on the server.
    /// When communicating with the application client this error should be
    /// replaced with a general error type indicating an internal server error.
    #[error("hashing failed: {0}")]
    HashingError(String),

    /// The username is already taken by another user.
    #[error("the username already exists in the database")]
    DuplicateUsername,

    /// The request body or path could not be parsed, e.g. malformed JSON or a
    /// non-integer ID.
    #[error("bad request: {0}")]
    BadRequest(String),

    /// A key in the request body is not a column of the resource.
    #[error("unknown field \"{0}\"")]
    UnknownField(String),

    /// A column that must be set when creating a row was not in the request body.
    #[error("missing required field \"{0}\"")]
    MissingField(String),

    /// The value for a column does not have the column's type.
    #[error("invalid value for field \"{field}\": {reason}")]
    InvalidFieldValue {
        /// The name of the offending column.
        field: String,
        /// Why the value was rejected.
        reason: String,
    },

    /// An update request did not contain any columns.
    #[error("no fields to update")]
    NoFieldsToUpdate,

    /// A row in a bulk import could not be inserted, so the whole batch was
    /// rolled back.
    #[error(
        "import failed{}: {cause}",
        .row.map(|row| format!(" at row {row}")).unwrap_or_default()
    )]
    ImportFailed {
        /// The zero-based index of the row that failed, or `None` if the
        /// transaction itself could not be started or committed.
        row: Option<usize>,
        /// The error that caused the import to fail.
        cause: Box<Error>,
    },

    /// The requested resource was not found.
    ///
    /// For HTTP request handlers, the client should check that the parameters
    /// (e.g., ID) are correct and that the resource has been created.
    ///
    /// Internally, this error may occur when a query returns no rows.
    #[error("the requested resource could not be found")]
    NotFound,

    /// The route exists but does not accept the request's HTTP method.
    #[error("method not allowed")]
    MethodNotAllowed,

    /// An unhandled/unexpected SQL error.
    #[error("an unexpected SQL error occurred: {0}")]
    SqlError(rusqlite::Error),

    /// Could not acquire the database lock
    #[error("could not acquire the database lock")]
    DatabaseLockError,
}

impl From<rusqlite::Error> for Error {
    fn from(value: rusqlite::Error) -> Self {
        match value {
            // Code 2067 occurs when a UNIQUE constraint failed.
            rusqlite::Error::SqliteFailure(sql_error, Some(ref desc))
                if sql_error.extended_code == 2067 && desc.ends_with("user.username") =>
            {
                Error::DuplicateUsername
            }
            rusqlite::Error::QueryReturnedNoRows => Error::NotFound,
            error => {
                tracing::error!("an unhandled SQL error occurred: {}", error);
                Error::SqlError(error)
            }
        }
    }
}

impl From<JsonRejection> for Error {
    fn from(rejection: JsonRejection) -> Self {
        Error::BadRequest(rejection.body_text())
    }
}

impl From<PathRejection> for Error {
    fn from(rejection: PathRejection) -> Self {
        Error::BadRequest(rejection.body_text())
    }
}

impl Error {
    /// The HTTP status code that the client should see for this error.
    pub fn status_code(&self) -> StatusCode {
        match self {
            Error::Unauthenticated | Error::InvalidToken | Error::InvalidCredentials => {
                StatusCode::UNAUTHORIZED
            }
            Error::BadRequest(_)
            | Error::UnknownField(_)
            | Error::MissingField(_)
            | Error::InvalidFieldValue { .. }
            | Error::NoFieldsToUpdate
            | Error::TooWeak(_) => StatusCode::BAD_REQUEST,
            Error::NotFound => StatusCode::NOT_FOUND,
            Error::MethodNotAllowed => StatusCode::METHOD_NOT_ALLOWED,
            Error::DuplicateUsername => StatusCode::CONFLICT,
            Error::ImportFailed { cause, .. } => cause.status_code(),
            Error::TokenCreation(_)
            | Error::HashingError(_)
            | Error::SqlError(_)
            | Error::DatabaseLockError => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// The message that is safe to show to the client.
    fn client_message(&self) -> String {
        match self {
            Error::Unauthenticated => "No token".to_owned(),
            Error::InvalidToken => "Invalid token".to_owned(),
            Error::InvalidCredentials => "Invalid credentials".to_owned(),
            Error::ImportFailed {
                row: Some(row),
                cause,
            } => format!("Import failed at row {row}: {}", cause.client_message()),
            Error::ImportFailed { row: None, cause } => {
                format!("Import failed: {}", cause.client_message())
            }
            // Any errors that are not handled above are not intended to be shown to the client.
            error if error.status_code().is_server_error() => {
                "An unexpected error occurred, check the server logs for more details.".to_owned()
            }
            error => error.to_string(),
        }
    }
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        let status = self.status_code();

        if status.is_server_error() {
            tracing::error!("An unexpected error occurred: {}", self);
        }

        (status, Json(json!({ "error": self.client_message() }))).into_response()
    }
}
