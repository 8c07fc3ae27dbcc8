//! Implements a struct that holds the state of the REST server.

use std::sync::{Arc, Mutex};

use jsonwebtoken::{DecodingKey, EncodingKey};
use rusqlite::Connection;
use time::Duration;

use crate::{Error, auth::DEFAULT_TOKEN_DURATION, db::initialize};

/// The keys used to sign and verify session tokens.
///
/// Both keys are derived from the same shared secret.
#[derive(Clone)]
pub struct TokenKeys {
    /// The key for signing new tokens.
    pub encoding_key: EncodingKey,
    /// The key for verifying tokens sent by clients.
    pub decoding_key: DecodingKey,
}

impl TokenKeys {
    /// Derive the signing and verification keys from `secret`.
    pub fn from_secret(secret: &str) -> Self {
        Self {
            encoding_key: EncodingKey::from_secret(secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
        }
    }
}

impl std::fmt::Debug for TokenKeys {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("TokenKeys { .. }")
    }
}

/// The state of the REST server.
///
/// Everything except the database connection is immutable after start up.
#[derive(Debug, Clone)]
pub struct AppState {
    /// The keys for signing and verifying session tokens.
    pub token_keys: TokenKeys,

    /// How long a session token is valid for after it is issued.
    pub token_duration: Duration,

    /// The database connection
    pub db_connection: Arc<Mutex<Connection>>,
}

impl AppState {
    /// Create a new [AppState] with a SQLite database connection.
    ///
    /// This function will initialize the database by adding the tables for the domain models.
    ///
    /// # Errors
    /// Returns an error if the database cannot be initialized.
    pub fn new(db_connection: Connection, token_secret: &str) -> Result<Self, Error> {
        initialize(&db_connection)?;

        Ok(Self {
            token_keys: TokenKeys::from_secret(token_secret),
            token_duration: DEFAULT_TOKEN_DURATION,
            db_connection: Arc::new(Mutex::new(db_connection)),
        })
    }
}
