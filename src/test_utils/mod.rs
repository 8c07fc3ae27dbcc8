#![allow(missing_docs)]

use axum_test::TestServer;
use rusqlite::Connection;
use serde_json::json;

use crate::{
    AppState, Claims, PasswordHash, ValidatedPassword,
    auth::LogInResponse,
    endpoints,
    user::{Role, User, UserID, create_user},
};

pub(crate) const TEST_SECRET: &str = "a-test-secret";
pub(crate) const TEST_PASSWORD: &str = "correct-horse-battery-staple";

/// Create app state backed by a fresh in-memory database.
pub(crate) fn must_create_test_state() -> AppState {
    let db_connection =
        Connection::open_in_memory().expect("Could not open database in memory.");

    AppState::new(db_connection, TEST_SECRET).expect("Could not create app state.")
}

/// Insert a user with [TEST_PASSWORD] and the default role.
pub(crate) fn must_create_user(username: &str, state: &AppState) -> User {
    // The minimum bcrypt cost keeps the tests fast.
    let password_hash = PasswordHash::new(ValidatedPassword::new_unchecked(TEST_PASSWORD), 4)
        .expect("Could not hash password.");
    let connection = state.db_connection.lock().unwrap();

    create_user(username, password_hash, Role::new(Role::DEFAULT), &connection)
        .expect("Could not create user.")
}

/// Log in as `username` with [TEST_PASSWORD] and return the session token.
pub(crate) async fn must_log_in(server: &TestServer, username: &str) -> String {
    let response = server
        .post(endpoints::LOG_IN)
        .json(&json!({"username": username, "password": TEST_PASSWORD}))
        .await;
    response.assert_status_ok();

    response.json::<LogInResponse>().token
}

/// Claims for handlers tested without the auth guard.
pub(crate) fn test_claims() -> Claims {
    Claims {
        id: UserID::new(1),
        username: "manager".to_owned(),
        role: Role::new(Role::DEFAULT),
        iat: 0,
        exp: 0,
    }
}
