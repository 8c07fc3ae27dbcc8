//! Populates an empty database with demo data so the client has something to
//! show.

use std::sync::{Arc, Mutex};

use axum::{
    Extension, Json,
    extract::{FromRef, State},
};
use rusqlite::Connection;
use serde_json::{Value, json};

use crate::{
    AppState, Claims, Error,
    resource::{
        APARTMENTS, MAINTENANCE_PAYMENTS, OWNERS, Resource, ResourceRow, TENANTS, TRANSACTIONS,
        insert_row,
    },
};

/// The state needed for seeding demo data.
#[derive(Debug, Clone)]
pub struct SeedState {
    /// The database connection for inserting the demo rows.
    pub db_connection: Arc<Mutex<Connection>>,
}

impl FromRef<AppState> for SeedState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            db_connection: state.db_connection.clone(),
        }
    }
}

/// Whether [seed_demo_data] inserted anything.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SeedOutcome {
    /// The demo rows were inserted.
    Seeded,
    /// The database already had apartments, so nothing was inserted.
    AlreadySeeded,
}

/// A route handler for seeding demo data.
pub async fn seed_endpoint(
    State(state): State<SeedState>,
    Extension(claims): Extension<Claims>,
) -> Result<Json<Value>, Error> {
    let connection = state.db_connection.lock().map_err(|error| {
        tracing::error!("could not acquire database lock: {error}");
        Error::DatabaseLockError
    })?;

    let message = match seed_demo_data(&connection)? {
        SeedOutcome::Seeded => {
            tracing::info!("{} seeded the database with demo data", claims.username);
            "Sample data seeded"
        }
        SeedOutcome::AlreadySeeded => "Sample data already present",
    };

    Ok(Json(json!({ "message": message })))
}

/// Insert a small set of apartments, owners, tenants, maintenance payments and
/// transactions in one database transaction.
///
/// Nothing is inserted if there are already apartments in the database.
///
/// # Errors
///
/// This function will return an error if there is an SQL error, in which case
/// nothing is inserted.
pub fn seed_demo_data(connection: &Connection) -> Result<SeedOutcome, Error> {
    let tx = connection.unchecked_transaction()?;

    let apartment_count: i64 =
        tx.query_row("SELECT COUNT(*) FROM \"apartments\"", [], |row| row.get(0))?;
    if apartment_count > 0 {
        return Ok(SeedOutcome::AlreadySeeded);
    }

    let a101 = insert_json(
        &APARTMENTS,
        json!({"unit_number": "A-101", "block": "A", "floor": 1, "area_sqft": 850.0, "status": "occupied"}),
        &tx,
    )?;
    let a102 = insert_json(
        &APARTMENTS,
        json!({"unit_number": "A-102", "block": "A", "floor": 1, "area_sqft": 920.0, "status": "occupied"}),
        &tx,
    )?;
    insert_json(
        &APARTMENTS,
        json!({"unit_number": "B-201", "block": "B", "floor": 2, "area_sqft": 1100.0}),
        &tx,
    )?;

    let a101_id = a101.get("id").cloned().unwrap_or(Value::Null);
    let a102_id = a102.get("id").cloned().unwrap_or(Value::Null);

    insert_json(
        &OWNERS,
        json!({"name": "Priya Raman", "email": "priya@example.com", "phone": "555-0101", "apartment_id": a101_id}),
        &tx,
    )?;
    insert_json(
        &OWNERS,
        json!({"name": "Tomas Berg", "email": "tomas@example.com", "apartment_id": a102_id}),
        &tx,
    )?;

    insert_json(
        &TENANTS,
        json!({
            "name": "Alex Kim",
            "email": "alex@example.com",
            "apartment_id": a101_id,
            "lease_start": "2024-01-01",
            "lease_end": "2024-12-31",
            "monthly_rent": 1500.0
        }),
        &tx,
    )?;

    insert_json(
        &MAINTENANCE_PAYMENTS,
        json!({"apartment_id": a101_id, "period": "2024-01", "amount_due": 200.0, "amount_paid": 200.0, "status": "paid", "paid_on": "2024-01-05"}),
        &tx,
    )?;
    insert_json(
        &MAINTENANCE_PAYMENTS,
        json!({"apartment_id": a101_id, "period": "2024-02", "amount_due": 200.0}),
        &tx,
    )?;
    insert_json(
        &MAINTENANCE_PAYMENTS,
        json!({"apartment_id": a102_id, "period": "2024-02", "amount_due": 220.0, "amount_paid": 100.0}),
        &tx,
    )?;

    insert_json(
        &TRANSACTIONS,
        json!({"date": "2024-01-05", "description": "Maintenance A-101", "amount": 200.0, "type": "credit", "category": "Maintenance"}),
        &tx,
    )?;
    insert_json(
        &TRANSACTIONS,
        json!({"date": "2024-01-10", "description": "Lift servicing", "amount": 450.0, "type": "debit", "category": "Repairs"}),
        &tx,
    )?;
    insert_json(
        &TRANSACTIONS,
        json!({"date": "2024-01-31", "description": "Rent A-101", "amount": 1500.0, "type": "credit", "category": "Rent"}),
        &tx,
    )?;

    tx.commit()?;

    Ok(SeedOutcome::Seeded)
}

fn insert_json(
    resource: &Resource,
    body: Value,
    connection: &Connection,
) -> Result<ResourceRow, Error> {
    let body = match body {
        Value::Object(body) => body,
        _ => return Err(Error::BadRequest("expected a JSON object".to_owned())),
    };
    let values = resource.parse_create(&body)?;

    insert_row(resource, &values, connection)
}
