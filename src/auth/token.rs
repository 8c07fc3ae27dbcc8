//! Signing and verifying the JSON Web Tokens used as session tokens.

use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};
use time::{Duration, OffsetDateTime};

use crate::{
    Error,
    user::{Role, User, UserID},
};

/// How long a session token is valid for after it is issued.
pub const DEFAULT_TOKEN_DURATION: Duration = Duration::hours(24);

/// The contents of a session token.
///
/// Route handlers behind the auth guard can receive the claims of the caller's
/// token with `Extension(claims): Extension<Claims>`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Claims {
    /// The ID of the user the token was issued to.
    pub id: UserID,
    /// The username of the user the token was issued to.
    pub username: String,
    /// The role of the user at the time the token was issued.
    pub role: Role,
    /// When the token was issued, as a Unix timestamp in seconds.
    pub iat: i64,
    /// When the token expires, as a Unix timestamp in seconds.
    pub exp: i64,
}

/// Create a signed token for `user` that expires `duration` after `issued_at`.
///
/// # Errors
///
/// Returns [Error::TokenCreation] if the token could not be signed.
pub fn encode_token(
    user: &User,
    issued_at: OffsetDateTime,
    duration: Duration,
    encoding_key: &EncodingKey,
) -> Result<String, Error> {
    let claims = Claims {
        id: user.id,
        username: user.username.clone(),
        role: user.role.clone(),
        iat: issued_at.unix_timestamp(),
        exp: (issued_at + duration).unix_timestamp(),
    };

    encode(&Header::new(Algorithm::HS256), &claims, encoding_key)
        .map_err(|error| Error::TokenCreation(error.to_string()))
}

/// Verify the signature and expiry of `token` and get its claims.
///
/// # Errors
///
/// Returns [Error::InvalidToken] if the token is malformed, was not signed with
/// the matching key or has expired.
pub fn decode_token(token: &str, decoding_key: &DecodingKey) -> Result<Claims, Error> {
    decode::<Claims>(token, decoding_key, &Validation::new(Algorithm::HS256))
        .map(|token_data| token_data.claims)
        .map_err(|error| {
            tracing::debug!("rejected token: {error}");
            Error::InvalidToken
        })
}
