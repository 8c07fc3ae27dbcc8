//! Imports a batch of bank transactions as a single all-or-nothing unit.

use std::sync::{Arc, Mutex};

use axum::{
    Extension, Json,
    extract::{FromRef, State, rejection::JsonRejection},
};
use rusqlite::{Connection, types::Value as SqlValue};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::{
    AppState, Claims, Error,
    resource::{ColumnValues, TRANSACTIONS, insert_row},
};

/// The category given to every imported transaction.
pub const IMPORT_CATEGORY: &str = "Bank Import";

/// The keys read from each imported row. Any other keys are ignored.
const IMPORTED_FIELDS: [&str; 4] = ["date", "description", "amount", "type"];

/// The state needed for importing transactions.
#[derive(Debug, Clone)]
pub struct ImportState {
    /// The database connection for managing transactions.
    pub db_connection: Arc<Mutex<Connection>>,
}

impl FromRef<AppState> for ImportState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            db_connection: state.db_connection.clone(),
        }
    }
}

/// The body of a bulk import request.
#[derive(Debug, Deserialize, Serialize)]
pub struct BulkImportRequest {
    /// The transactions to import, each a JSON object with the keys "date",
    /// "description", "amount" and "type".
    pub rows: Vec<Value>,
}

/// The response to a successful bulk import.
#[derive(Debug, PartialEq, Deserialize, Serialize)]
pub struct BulkImportResponse {
    /// How many transactions were imported.
    pub imported: usize,
}

/// A route handler for importing a batch of transactions.
///
/// Either every row is imported or none are.
pub async fn bulk_import_endpoint(
    State(state): State<ImportState>,
    Extension(claims): Extension<Claims>,
    body: Result<Json<BulkImportRequest>, JsonRejection>,
) -> Result<Json<BulkImportResponse>, Error> {
    let Json(request) = body?;

    let connection = state.db_connection.lock().map_err(|error| {
        tracing::error!("could not acquire database lock: {error}");
        Error::DatabaseLockError
    })?;

    let imported = import_transactions(&request.rows, &connection).inspect_err(|error| {
        tracing::warn!("{} failed to import transactions: {error}", claims.username)
    })?;

    tracing::info!("{} imported {imported} transactions", claims.username);

    Ok(Json(BulkImportResponse { imported }))
}

/// Insert every row into the transactions table inside one database
/// transaction, returning the number of rows inserted.
///
/// # Errors
///
/// Returns [Error::ImportFailed] with the zero-based index of the first row
/// that could not be inserted, or with no index if the database transaction
/// could not be started or committed. Nothing is inserted in either case.
pub fn import_transactions(rows: &[Value], connection: &Connection) -> Result<usize, Error> {
    let tx = connection.unchecked_transaction().map_err(|error| {
        tracing::error!("could not start transaction: {error}");
        Error::ImportFailed {
            row: None,
            cause: Box::new(error.into()),
        }
    })?;

    for (index, row) in rows.iter().enumerate() {
        let result = parse_import_row(row).and_then(|values| insert_row(&TRANSACTIONS, &values, &tx));

        if let Err(cause) = result {
            if let Err(error) = tx.rollback() {
                tracing::error!("could not roll back transaction import: {error}");
            }

            return Err(Error::ImportFailed {
                row: Some(index),
                cause: Box::new(cause),
            });
        }
    }

    tx.commit().map_err(|error| {
        tracing::error!("could not commit transaction import: {error}");
        Error::ImportFailed {
            row: None,
            cause: Box::new(error.into()),
        }
    })?;

    Ok(rows.len())
}

fn parse_import_row(row: &Value) -> Result<ColumnValues, Error> {
    let row = row
        .as_object()
        .ok_or_else(|| Error::BadRequest("expected each row to be a JSON object".to_owned()))?;

    let mut values = ColumnValues::with_capacity(IMPORTED_FIELDS.len() + 1);

    for name in IMPORTED_FIELDS {
        let field = TRANSACTIONS
            .field(name)
            .ok_or_else(|| Error::UnknownField(name.to_owned()))?;
        let value = row
            .get(name)
            .ok_or_else(|| Error::MissingField(name.to_owned()))?;

        values.push((field, field.to_sql_value(value)?));
    }

    let category = TRANSACTIONS
        .field("category")
        .ok_or_else(|| Error::UnknownField("category".to_owned()))?;
    values.push((category, SqlValue::Text(IMPORT_CATEGORY.to_owned())));

    Ok(values)
}


#[cfg(test)]
mod bulk_import_endpoint_tests {
    use axum::{Extension, Router, routing::post};
    use axum_test::TestServer;
    use serde_json::json;

    use crate::{
        endpoints,
        import::{BulkImportResponse, bulk_import_endpoint},
        test_utils::{must_create_test_state, test_claims},
    };

    fn get_test_server() -> TestServer {
        let app = Router::new()
            .route(endpoints::BULK_IMPORT, post(bulk_import_endpoint))
            .layer(Extension(test_claims()))
            .with_state(must_create_test_state());

        TestServer::new(app).expect("Could not create test server.")
    }

    #[tokio::test]
    async fn responds_with_imported_count() {
        let server = get_test_server();

        let response = server
            .post(endpoints::BULK_IMPORT)
            .json(&json!({"rows": [
                {"date": "2024-03-01", "description": "Rent", "amount": 100.0, "type": "credit"},
                {"date": "2024-03-02", "description": "Cleaning", "amount": 50.0, "type": "debit"},
            ]}))
            .await;

        response.assert_status_ok();
        assert_eq!(
            response.json::<BulkImportResponse>(),
            BulkImportResponse { imported: 2 }
        );
    }

    #[tokio::test]
    async fn invalid_row_is_bad_request_with_row_index() {
        let server = get_test_server();

        let response = server
            .post(endpoints::BULK_IMPORT)
            .json(&json!({"rows": [
                {"date": "2024-03-01", "description": "Rent", "amount": 100.0, "type": "credit"},
                {"date": "not a date", "description": "Cleaning", "amount": 50.0, "type": "debit"},
            ]}))
            .await;

        response.assert_status_bad_request();
        response.assert_json(&json!({
            "error": "Import failed at row 1: invalid value for field \"date\": expected a date formatted as YYYY-MM-DD"
        }));
    }

    #[tokio::test]
    async fn missing_rows_key_is_bad_request() {
        let server = get_test_server();

        server
            .post(endpoints::BULK_IMPORT)
            .json(&json!({"transactions": []}))
            .await
            .assert_status_bad_request();
    }
}
