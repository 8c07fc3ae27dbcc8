//! The tables exposed through the generic list, create, update and delete
//! endpoints.
//!
//! Each resource has a fixed schema declared up front, so request bodies can
//! only ever touch the declared columns.

mod endpoints;
mod schema;
mod store;

pub use endpoints::resource_routes;
pub use schema::{
    APARTMENTS, ColumnValues, Constraint, Field, FieldKind, MAINTENANCE_PAYMENTS, OWNERS,
    RESOURCES, Resource, TENANTS, TRANSACTIONS,
};
pub use store::insert_row;
#[cfg(test)]
pub use store::list_rows;

/// A row of a resource table as a JSON object, keyed by column name.
pub type ResourceRow = serde_json::Map<String, serde_json::Value>;

/// The integer primary key of a row in a resource table.
pub type RowId = i64;
