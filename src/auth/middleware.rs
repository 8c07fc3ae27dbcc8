//! Authentication middleware that verifies the bearer token on each request.

use axum::{
    RequestPartsExt,
    extract::{FromRef, Request, State},
    http::{HeaderMap, header::AUTHORIZATION},
    middleware::Next,
    response::{IntoResponse, Response},
};
use axum_extra::{
    TypedHeader,
    headers::{Authorization, authorization::Bearer},
};
use jsonwebtoken::DecodingKey;

use crate::{AppState, Error, auth::token::decode_token};

/// The state needed for the auth middleware.
#[derive(Clone)]
pub struct AuthState {
    /// The key for verifying session tokens.
    pub decoding_key: DecodingKey,
}

impl FromRef<AppState> for AuthState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            decoding_key: state.token_keys.decoding_key.clone(),
        }
    }
}

/// Middleware function that checks for a valid bearer token in the
/// `Authorization` header.
///
/// If the token is valid, its [Claims](crate::Claims) are placed into the
/// request extensions and the request is executed normally. Otherwise a 401
/// response is returned: "No token" if the header is absent or holds the
/// bearer scheme with no token, "Invalid token" for anything else.
///
/// **Note**: Route handlers can use the function argument
/// `Extension(claims): Extension<Claims>` to receive the claims.
pub async fn auth_guard(State(state): State<AuthState>, request: Request, next: Next) -> Response {
    let (mut parts, body) = request.into_parts();
    let empty_bearer = is_empty_bearer(&parts.headers);

    let bearer = match parts.extract::<TypedHeader<Authorization<Bearer>>>().await {
        Ok(TypedHeader(Authorization(bearer))) => bearer,
        Err(rejection) if rejection.is_missing() || empty_bearer => {
            return Error::Unauthenticated.into_response();
        }
        Err(rejection) => {
            tracing::debug!("malformed authorization header: {rejection}");
            return Error::InvalidToken.into_response();
        }
    };

    let claims = match decode_token(bearer.token(), &state.decoding_key) {
        Ok(claims) => claims,
        Err(error) => return error.into_response(),
    };

    parts.extensions.insert(claims);
    let request = Request::from_parts(parts, body);

    next.run(request).await
}

/// Whether the `Authorization` header is the bearer scheme on its own.
fn is_empty_bearer(headers: &HeaderMap) -> bool {
    headers
        .get(AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .is_some_and(|value| value.trim().eq_ignore_ascii_case("bearer"))
}
