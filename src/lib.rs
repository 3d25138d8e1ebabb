//! Fintrack is a personal-finance tracking web backend.
//!
//! This library provides a JSON REST API for managing transactions and
//! savings goals per user, bulk CSV/JSON import, and product
//! recommendations ranked against the user's spending and goals.

#![warn(missing_docs)]

use std::{net::SocketAddr, time::Duration};

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use axum_server::Handle;
use serde_json::json;
use tokio::signal;

mod analysis;
mod app_state;
mod auth;
mod catalog;
mod database_id;
mod db;
mod endpoints;
mod goal;
mod import;
mod keywords;
mod logging;
mod pagination;
mod recommend;
mod transaction;
mod user;

/// Application router configuration.
pub mod routing;

pub use app_state::AppState;
pub use db::initialize as initialize_db;
pub use logging::logging_middleware;
pub use routing::build_router;

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
    /// The email used for registration already belongs to a user.
    #[error("Email already in use")]
    EmailTaken,

    /// The email/password pair did not match a registered user.
    ///
    /// Deliberately does not say which of the two was wrong.
    #[error("Invalid credentials")]
    InvalidCredentials,

    /// The email or password field was empty or missing.
    #[error("Email and password are required")]
    MissingCredentials,

    /// The bearer token was missing, malformed, or expired.
    #[error("Invalid token")]
    InvalidToken,

    /// An unexpected error occurred while signing a token.
    #[error("Token creation error")]
    TokenCreation,

    /// An unexpected error occurred with the underlying hashing library.
    ///
    /// The error string should only be logged for debugging on the server,
    /// never sent to the client.
    #[error("hashing failed: {0}")]
    HashingError(String),

    /// An empty string was used as a goal's text.
    #[error("Goal text is required")]
    EmptyGoalText,

    /// The requested resource was not found.
    ///
    /// Also returned when the resource exists but belongs to another user,
    /// so that callers cannot probe for other users' data.
    #[error("the requested resource could not be found")]
    NotFound,

    /// The uploaded file could not be read as CSV or JSON.
    #[error("Invalid file: {0}")]
    UnreadableImport(String),

    /// The uploaded file was readable but contained no valid transactions.
    #[error("No valid transactions found in file")]
    EmptyImport,

    /// The multipart form could not be parsed or had no file field.
    #[error("Could not parse multipart form: {0}")]
    MultipartError(String),

    /// Could not acquire the database lock.
    #[error("could not acquire the database lock")]
    DatabaseLockError,

    /// An unhandled/unexpected SQL error.
    #[error("an unexpected SQL error occurred: {0}")]
    SqlError(rusqlite::Error),
}

impl From<rusqlite::Error> for Error {
    fn from(value: rusqlite::Error) -> Self {
        match value {
            // Code 2067 occurs when a UNIQUE constraint failed.
            rusqlite::Error::SqliteFailure(sql_error, Some(ref desc))
                if sql_error.extended_code == 2067 && desc.contains("email") =>
            {
                Error::EmailTaken
            }
            rusqlite::Error::QueryReturnedNoRows => Error::NotFound,
            error => {
                tracing::error!("an unhandled SQL error occurred: {}", error);
                Error::SqlError(error)
            }
        }
    }
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        let status = match self {
            Error::EmailTaken | Error::MissingCredentials | Error::EmptyGoalText => {
                StatusCode::BAD_REQUEST
            }
            Error::InvalidCredentials | Error::InvalidToken => StatusCode::UNAUTHORIZED,
            Error::NotFound => StatusCode::NOT_FOUND,
            Error::UnreadableImport(_) | Error::MultipartError(_) => StatusCode::BAD_REQUEST,
            Error::EmptyImport => {
                // Import errors carry extra fields so the client can show
                // how many rows made it in (always zero here).
                return (
                    StatusCode::BAD_REQUEST,
                    Json(json!({
                        "error": self.to_string(),
                        "imported": 0,
                        "details": "Please check that your file contains valid data with \
                                    the required columns (Amount, Type, Account).",
                    })),
                )
                    .into_response();
            }
            Error::TokenCreation
            | Error::HashingError(_)
            | Error::DatabaseLockError
            | Error::SqlError(_) => {
                tracing::error!("An unexpected error occurred: {}", self);
                return (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    Json(json!({"error": "Internal server error"})),
                )
                    .into_response();
            }
        };

        (status, Json(json!({"error": self.to_string()}))).into_response()
    }
}

#[cfg(test)]
mod error_tests {
    use axum::{http::StatusCode, response::IntoResponse};

    use crate::Error;

    #[test]
    fn not_found_maps_to_404() {
        let response = Error::NotFound.into_response();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[test]
    fn invalid_token_maps_to_401() {
        let response = Error::InvalidToken.into_response();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[test]
    fn empty_import_maps_to_400() {
        let response = Error::EmptyImport.into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn duplicate_email_constraint_maps_to_email_taken() {
        let error = rusqlite::Error::SqliteFailure(
            rusqlite::ffi::Error {
                code: rusqlite::ffi::ErrorCode::ConstraintViolation,
                extended_code: 2067,
            },
            Some("UNIQUE constraint failed: users.email".to_owned()),
        );

        assert_eq!(Error::from(error), Error::EmailTaken);
    }

    #[test]
    fn no_rows_maps_to_not_found() {
        assert_eq!(
            Error::from(rusqlite::Error::QueryReturnedNoRows),
            Error::NotFound
        );
    }
}
