//! The API endpoints URIs.
//!
//! For endpoints that take a parameter, e.g., '/api/apartments/{id}', use [format_endpoint].

/// The route for exchanging a username and password for a session token.
pub const LOG_IN: &str = "/api/login";
/// The route for populating the database with demo data.
pub const SEED: &str = "/api/seed";
/// The route for importing a batch of bank transactions.
pub const BULK_IMPORT: &str = "/api/transactions/bulk";
/// The route for the balance-sheet report.
pub const BALANCE_SHEET: &str = "/api/reports/balance-sheet";
/// Matches every API path that no other route does.
pub const API_FALLBACK: &str = "/api/{*path}";

/// The route for listing and creating the rows of the resource `name`.
pub fn resource_collection(name: &str) -> String {
    format!("/api/{name}")
}

/// The route for updating and deleting a single row of the resource `name`.
pub fn resource_item(name: &str) -> String {
    format!("/api/{name}/{{id}}")
}

/// Replace the first parameter in `endpoint_path` with `id`.
///
/// ```ignore
/// assert_eq!(format_endpoint("/api/apartments/{id}", 1), "/api/apartments/1");
/// ```
pub fn format_endpoint(endpoint_path: &str, id: i64) -> String {
    let mut param_start = None;
    let mut param_end = None;

    for (i, c) in endpoint_path.char_indices() {
        if c == '{' {
            param_start = Some(i);
        } else if param_start.is_some() && c == '}' {
            param_end = Some(i + 1);
            break;
        }
    }

    let param_start = match param_start {
        Some(start) => start,
        None => return endpoint_path.to_string(),
    };

    let param_end = param_end.unwrap_or(endpoint_path.len());

    format!(
        "{}{}{}",
        &endpoint_path[..param_start],
        id,
        &endpoint_path[param_end..]
    )
}
