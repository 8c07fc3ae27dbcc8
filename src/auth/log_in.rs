//! Defines the route handler for exchanging a username and password for a
//! session token.

use std::sync::{Arc, Mutex};

use axum::{
    Json,
    extract::{FromRef, State, rejection::JsonRejection},
};
use jsonwebtoken::EncodingKey;
use rusqlite::Connection;
use serde::{Deserialize, Serialize};
use time::{Duration, OffsetDateTime};

use crate::{
    AppState, Error, PasswordHash,
    auth::token::encode_token,
    user::{Role, get_user_by_username},
};

/// The state needed for logging in.
#[derive(Clone)]
pub struct LogInState {
    /// The key for signing session tokens.
    pub encoding_key: EncodingKey,
    /// How long issued tokens are valid for.
    pub token_duration: Duration,
    /// The database connection for looking up users.
    pub db_connection: Arc<Mutex<Connection>>,
}

impl FromRef<AppState> for LogInState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            encoding_key: state.token_keys.encoding_key.clone(),
            token_duration: state.token_duration,
            db_connection: state.db_connection.clone(),
        }
    }
}

/// The body of a log-in request.
#[derive(Clone, Deserialize, Serialize)]
pub struct Credentials {
    /// The username entered when logging in.
    pub username: String,
    /// The password entered when logging in.
    pub password: String,
}

/// The response to a successful log-in request.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct LogInResponse {
    /// The signed session token to send as a bearer token.
    pub token: String,
    /// The role of the user that logged in.
    pub role: Role,
    /// The username of the user that logged in.
    pub username: String,
}

/// Handler for log-in requests.
///
/// # Errors
///
/// Responds with [Error::InvalidCredentials] if the username does not belong to
/// a user or the password is wrong. The two cases are indistinguishable to the
/// client, including in how long they take, since a password is always checked
/// against a bcrypt hash.
pub async fn post_log_in(
    State(state): State<LogInState>,
    credentials: Result<Json<Credentials>, JsonRejection>,
) -> Result<Json<LogInResponse>, Error> {
    let Json(credentials) = credentials?;

    let user = {
        let connection = state.db_connection.lock().map_err(|error| {
            tracing::error!("could not acquire database lock: {error}");
            Error::DatabaseLockError
        })?;

        match get_user_by_username(&credentials.username, &connection) {
            Ok(user) => Some(user),
            Err(Error::NotFound) => None,
            Err(error) => return Err(error),
        }
    };

    let Some(user) = user else {
        PasswordHash::verify_unknown_user(&credentials.password);
        tracing::info!("log-in attempt for unknown user {:?}", credentials.username);
        return Err(Error::InvalidCredentials);
    };

    if !user.password_hash.verify(&credentials.password)? {
        tracing::info!("wrong password for user {:?}", user.username);
        return Err(Error::InvalidCredentials);
    }

    let token = encode_token(
        &user,
        OffsetDateTime::now_utc(),
        state.token_duration,
        &state.encoding_key,
    )?;

    tracing::info!("user {:?} logged in", user.username);

    Ok(Json(LogInResponse {
        token,
        role: user.role,
        username: user.username,
    }))
}

#[cfg(test)]
mod tests {
    use axum::{Router, routing::post};
    use axum_test::TestServer;
    use serde_json::{Value, json};

    use crate::{
        AppState,
        auth::{
            log_in::{LogInResponse, post_log_in},
            token::decode_token,
        },
        endpoints,
        test_utils::{TEST_PASSWORD, must_create_test_state, must_create_user},
        user::Role,
    };

    fn get_test_server() -> (TestServer, AppState) {
        let state = must_create_test_state();
        let app = Router::new()
            .route(endpoints::LOG_IN, post(post_log_in))
            .with_state(state.clone());

        (
            TestServer::new(app).expect("Could not create test server."),
            state,
        )
    }

    #[tokio::test]
    async fn log_in_succeeds_with_valid_credentials() {
        let (server, state) = get_test_server();
        let user = must_create_user("manager", &state);

        let response = server
            .post(endpoints::LOG_IN)
            .json(&json!({"username": "manager", "password": TEST_PASSWORD}))
            .await;

        response.assert_status_ok();
        let body = response.json::<LogInResponse>();
        assert_eq!(body.username, "manager");
        assert_eq!(body.role, Role::new(Role::DEFAULT));
        let claims = decode_token(&body.token, &state.token_keys.decoding_key).unwrap();
        assert_eq!(claims.id, user.id);
        assert_eq!(claims.username, user.username);
        assert_eq!(claims.role, user.role);
    }

    #[tokio::test]
    async fn wrong_username_and_wrong_password_give_identical_errors() {
        let (server, state) = get_test_server();
        must_create_user("manager", &state);

        let wrong_username = server
            .post(endpoints::LOG_IN)
            .json(&json!({"username": "someone", "password": TEST_PASSWORD}))
            .await;
        let wrong_password = server
            .post(endpoints::LOG_IN)
            .json(&json!({"username": "manager", "password": "wrongpassword"}))
            .await;

        wrong_username.assert_status_unauthorized();
        wrong_password.assert_status_unauthorized();
        assert_eq!(wrong_username.text(), wrong_password.text());
        wrong_password.assert_json(&json!({"error": "Invalid credentials"}));
    }

    #[tokio::test]
    async fn log_in_with_missing_field_is_bad_request() {
        let (server, _) = get_test_server();

        let response = server
            .post(endpoints::LOG_IN)
            .json(&json!({"username": "manager"}))
            .await;

        response.assert_status_bad_request();
        assert!(response.json::<Value>()["error"].is_string());
    }
}
