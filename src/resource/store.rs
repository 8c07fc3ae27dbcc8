//! SQL for reading and writing the rows of a [Resource].

use std::iter::once;

use rusqlite::{Connection, Row, params_from_iter, types::Value as SqlValue};
use serde_json::{Number, Value};

use crate::{
    Error,
    resource::{ResourceRow, RowId, schema::ColumnValues, schema::Resource},
};

/// Get every row of `resource`, ordered by ID.
///
/// # Errors
///
/// This function will return an error if there is an SQL error.
pub fn list_rows(resource: &Resource, connection: &Connection) -> Result<Vec<ResourceRow>, Error> {
    connection
        .prepare(&format!(
            "SELECT {} FROM \"{}\" ORDER BY id ASC",
            resource.select_columns(),
            resource.name
        ))?
        .query_map([], |row| map_resource_row(resource, row))?
        .map(|maybe_row| maybe_row.map_err(Error::from))
        .collect()
}

/// Insert a row with the given column values and return it as stored.
///
/// Columns that are not given take their defaults.
///
/// # Errors
///
/// This function will return an error if there is an SQL error.
pub fn insert_row(
    resource: &Resource,
    values: &ColumnValues,
    connection: &Connection,
) -> Result<ResourceRow, Error> {
    let query = if values.is_empty() {
        format!(
            "INSERT INTO \"{}\" DEFAULT VALUES RETURNING {}",
            resource.name,
            resource.select_columns()
        )
    } else {
        let columns = values
            .iter()
            .map(|(field, _)| format!("\"{}\"", field.name))
            .collect::<Vec<_>>()
            .join(", ");
        let placeholders = (1..=values.len())
            .map(|i| format!("?{i}"))
            .collect::<Vec<_>>()
            .join(", ");

        format!(
            "INSERT INTO \"{}\" ({columns}) VALUES ({placeholders}) RETURNING {}",
            resource.name,
            resource.select_columns()
        )
    };

    connection
        .query_row(
            &query,
            params_from_iter(values.iter().map(|(_, value)| value)),
            |row| map_resource_row(resource, row),
        )
        .map_err(Error::from)
}

/// Set the given columns of the row `id` and return the updated row.
///
/// # Errors
///
/// This function will return a:
/// - [Error::NotFound] if there is no row with `id`,
/// - [Error::SqlError] if there is some other SQL error.
pub fn update_row(
    resource: &Resource,
    id: RowId,
    values: &ColumnValues,
    connection: &Connection,
) -> Result<ResourceRow, Error> {
    if values.is_empty() {
        return Err(Error::NoFieldsToUpdate);
    }

    let assignments = values
        .iter()
        .enumerate()
        .map(|(i, (field, _))| format!("\"{}\" = ?{}", field.name, i + 1))
        .collect::<Vec<_>>()
        .join(", ");

    let query = format!(
        "UPDATE \"{}\" SET {assignments} WHERE id = ?{} RETURNING {}",
        resource.name,
        values.len() + 1,
        resource.select_columns()
    );

    let params = values
        .iter()
        .map(|(_, value)| value.clone())
        .chain(once(SqlValue::Integer(id)));

    connection
        .query_row(&query, params_from_iter(params), |row| {
            map_resource_row(resource, row)
        })
        .map_err(Error::from)
}

/// Delete the row `id`, returning the number of rows deleted.
///
/// Deleting a row that does not exist is not an error.
///
/// # Errors
///
/// This function will return an error if there is an SQL error.
pub fn delete_row(resource: &Resource, id: RowId, connection: &Connection) -> Result<usize, Error> {
    connection
        .execute(
            &format!("DELETE FROM \"{}\" WHERE id = ?1", resource.name),
            [id],
        )
        .map_err(Error::from)
}

/// Map a row selected with [Resource::select_columns] to a JSON object.
pub(crate) fn map_resource_row(
    resource: &Resource,
    row: &Row,
) -> Result<ResourceRow, rusqlite::Error> {
    let mut resource_row = ResourceRow::new();
    resource_row.insert("id".to_owned(), Value::from(row.get::<_, RowId>(0)?));

    for (i, field) in resource.fields.iter().enumerate() {
        let value: SqlValue = row.get(i + 1)?;
        resource_row.insert(field.name.to_owned(), sql_to_json(value));
    }

    Ok(resource_row)
}

fn sql_to_json(value: SqlValue) -> Value {
    match value {
        SqlValue::Null => Value::Null,
        SqlValue::Integer(integer) => Value::from(integer),
        SqlValue::Real(real) => Number::from_f64(real).map_or(Value::Null, Value::Number),
        SqlValue::Text(text) => Value::String(text),
        // No column is declared as a blob.
        SqlValue::Blob(_) => Value::Null,
    }
}
