//! The balance-sheet report over bank transactions and unpaid maintenance fees.

use std::{
    collections::HashMap,
    sync::{Arc, Mutex},
};

use axum::{
    Json,
    extract::{FromRef, State},
};
use rusqlite::Connection;
use serde::{Deserialize, Serialize};

use crate::{AppState, Error};

/// The state needed for generating reports.
#[derive(Debug, Clone)]
pub struct ReportState {
    /// The database connection for reading transactions and payments.
    pub db_connection: Arc<Mutex<Connection>>,
}

impl FromRef<AppState> for ReportState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            db_connection: state.db_connection.clone(),
        }
    }
}

/// The assets side of the balance sheet.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Assets {
    /// Total credits minus total debits.
    pub bank_balance: f64,
    /// The outstanding amount of pending maintenance payments.
    pub maintenance_receivable: f64,
}

/// A summary of what the property portfolio holds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BalanceSheet {
    /// The breakdown of assets.
    pub assets: Assets,
    /// The sum of all assets.
    pub total_assets: f64,
}

/// A route handler for the balance-sheet report.
pub async fn get_balance_sheet_endpoint(
    State(state): State<ReportState>,
) -> Result<Json<BalanceSheet>, Error> {
    let connection = state.db_connection.lock().map_err(|error| {
        tracing::error!("could not acquire database lock: {error}");
        Error::DatabaseLockError
    })?;

    get_balance_sheet(&connection).map(Json)
}

/// Compute the balance sheet from the current transactions and maintenance
/// payments. Empty tables count as zero.
///
/// # Errors
///
/// This function will return an error if there is an SQL error.
pub fn get_balance_sheet(connection: &Connection) -> Result<BalanceSheet, Error> {
    let totals_by_type: HashMap<String, f64> = connection
        .prepare("SELECT type, COALESCE(SUM(amount), 0.0) FROM \"transactions\" GROUP BY type")?
        .query_map([], |row| Ok((row.get(0)?, row.get(1)?)))?
        .collect::<Result<_, _>>()?;

    let credit = totals_by_type.get("credit").copied().unwrap_or(0.0);
    let debit = totals_by_type.get("debit").copied().unwrap_or(0.0);
    let bank_balance = credit - debit;

    let maintenance_receivable: f64 = connection.query_row(
        "SELECT COALESCE(SUM(amount_due - amount_paid), 0.0)
        FROM \"maintenance_payments\"
        WHERE status = 'pending'",
        [],
        |row| row.get(0),
    )?;

    Ok(BalanceSheet {
        assets: Assets {
            bank_balance,
            maintenance_receivable,
        },
        total_assets: bank_balance + maintenance_receivable,
    })
}


#[cfg(test)]
mod get_balance_sheet_endpoint_tests {
    use axum::{Router, routing::get};
    use axum_test::TestServer;
    use serde_json::json;

    use crate::{endpoints, report::get_balance_sheet_endpoint, test_utils::must_create_test_state};

    #[tokio::test]
    async fn responds_with_camel_case_json() {
        let app = Router::new()
            .route(endpoints::BALANCE_SHEET, get(get_balance_sheet_endpoint))
            .with_state(must_create_test_state());
        let server = TestServer::new(app).expect("Could not create test server.");

        let response = server.get(endpoints::BALANCE_SHEET).await;

        response.assert_status_ok();
        response.assert_json(&json!({
            "assets": {"bankBalance": 0.0, "maintenanceReceivable": 0.0},
            "totalAssets": 0.0,
        }));
    }
}
