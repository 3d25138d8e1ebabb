//! Implements a struct that holds the state of the REST server.

use std::sync::{Arc, Mutex};

use jsonwebtoken::{DecodingKey, EncodingKey};
use rusqlite::Connection;

use crate::{Error, catalog::ProductCatalog, db::initialize};

/// The keys used for signing and verifying JSON Web Tokens.
#[derive(Clone)]
pub struct JwtKeys {
    /// The key used to sign new tokens.
    pub encoding: EncodingKey,
    /// The key used to verify incoming tokens.
    pub decoding: DecodingKey,
}

impl JwtKeys {
    /// Derive a pair of HS256 keys from a `secret` string.
    pub fn from_secret(secret: &str) -> Self {
        Self {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
        }
    }
}

/// The state of the REST server.
#[derive(Clone)]
pub struct AppState {
    /// The keys used for signing and verifying JWTs.
    pub jwt_keys: JwtKeys,

    /// The database connection.
    pub db_connection: Arc<Mutex<Connection>>,

    /// The static product catalog used for recommendations.
    ///
    /// Immutable after start-up and shared read-only across requests.
    pub catalog: Arc<ProductCatalog>,

    /// The API key for the external text-generation service, if configured.
    ///
    /// Absence is not an error: recommendations fall back to a keyword
    /// heuristic that needs no network access.
    pub gemini_api_key: Option<String>,

    /// The HTTP client used for the optional text-generation call.
    pub http_client: reqwest::Client,
}

impl AppState {
    /// Create a new [AppState] with a SQLite database connection.
    ///
    /// This function will initialize the database by adding the tables for
    /// the domain models.
    ///
    /// # Errors
    /// Returns an error if the database cannot be initialized.
    pub fn new(
        db_connection: Connection,
        jwt_secret: &str,
        gemini_api_key: Option<String>,
    ) -> Result<Self, Error> {
        initialize(&db_connection)?;

        Ok(Self {
            jwt_keys: JwtKeys::from_secret(jwt_secret),
            db_connection: Arc::new(Mutex::new(db_connection)),
            catalog: Arc::new(ProductCatalog::builtin()),
            gemini_api_key,
            http_client: reqwest::Client::new(),
        })
    }
}
