//! The fixed column schema for each resource and the conversion of JSON
//! request values into SQL values.
//!
//! Column names used in SQL only ever come from the static definitions in this
//! file, never from client input.

use rusqlite::{Connection, types::Value as SqlValue};
use serde_json::Value;
use time::{Date, format_description::BorrowedFormatItem, macros::format_description};

use crate::{Error, resource::ResourceRow};

/// Dates are exchanged and stored as ISO 8601 calendar dates, e.g. "2024-01-31".
const DATE_FORMAT: &[BorrowedFormatItem] = format_description!("[year]-[month]-[day]");

/// The type of value a column holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    /// Free text.
    Text,
    /// A whole number, e.g. a floor number or a foreign key.
    Integer,
    /// A floating point number, e.g. an amount of money.
    Real,
    /// A calendar date formatted as "YYYY-MM-DD".
    Date,
}

impl FieldKind {
    fn sql_type(self) -> &'static str {
        match self {
            FieldKind::Text | FieldKind::Date => "TEXT",
            FieldKind::Integer => "INTEGER",
            FieldKind::Real => "REAL",
        }
    }
}

/// Whether a column must be given a value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Constraint {
    /// The column must be set on create and can never be null.
    Required,
    /// The column may be omitted or set to null.
    Optional,
    /// The column may be omitted on create, in which case it takes the given
    /// SQL default. It can never be null.
    Defaulted(&'static str),
}

/// A column of a resource table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Field {
    /// The column name.
    pub name: &'static str,
    /// The type of value the column holds.
    pub kind: FieldKind,
    /// Whether the column must be given a value.
    pub constraint: Constraint,
}

impl Field {
    const fn required(name: &'static str, kind: FieldKind) -> Self {
        Self {
            name,
            kind,
            constraint: Constraint::Required,
        }
    }

    const fn optional(name: &'static str, kind: FieldKind) -> Self {
        Self {
            name,
            kind,
            constraint: Constraint::Optional,
        }
    }

    const fn defaulted(name: &'static str, kind: FieldKind, default: &'static str) -> Self {
        Self {
            name,
            kind,
            constraint: Constraint::Defaulted(default),
        }
    }

    fn is_nullable(&self) -> bool {
        self.constraint == Constraint::Optional
    }

    fn column_definition(&self) -> String {
        let sql_type = self.kind.sql_type();

        match self.constraint {
            Constraint::Required => format!("\"{}\" {sql_type} NOT NULL", self.name),
            Constraint::Optional => format!("\"{}\" {sql_type}", self.name),
            Constraint::Defaulted(default) => {
                format!("\"{}\" {sql_type} NOT NULL DEFAULT {default}", self.name)
            }
        }
    }

    /// Convert a JSON value from a request into a value for this column.
    ///
    /// Numbers may also be given as strings, e.g. "12.50", since rows from bank
    /// statement exports are often all text.
    ///
    /// # Errors
    ///
    /// Returns [Error::InvalidFieldValue] if the value does not have the
    /// column's type or is null for a column that cannot be null.
    pub fn to_sql_value(&self, value: &Value) -> Result<SqlValue, Error> {
        let invalid = |reason: &str| Error::InvalidFieldValue {
            field: self.name.to_owned(),
            reason: reason.to_owned(),
        };

        match (self.kind, value) {
            (_, Value::Null) if self.is_nullable() => Ok(SqlValue::Null),
            (_, Value::Null) => Err(invalid("cannot be null")),
            (FieldKind::Text, Value::String(text)) => Ok(SqlValue::Text(text.clone())),
            (FieldKind::Text, _) => Err(invalid("expected a string")),
            (FieldKind::Integer, Value::Number(number)) => number
                .as_i64()
                .map(SqlValue::Integer)
                .ok_or_else(|| invalid("expected an integer")),
            (FieldKind::Integer, Value::String(text)) => text
                .trim()
                .parse()
                .map(SqlValue::Integer)
                .map_err(|_| invalid("expected an integer")),
            (FieldKind::Integer, _) => Err(invalid("expected an integer")),
            (FieldKind::Real, Value::Number(number)) => number
                .as_f64()
                .map(SqlValue::Real)
                .ok_or_else(|| invalid("expected a number")),
            (FieldKind::Real, Value::String(text)) => text
                .trim()
                .parse::<f64>()
                .ok()
                .filter(|number| number.is_finite())
                .map(SqlValue::Real)
                .ok_or_else(|| invalid("expected a number")),
            (FieldKind::Real, _) => Err(invalid("expected a number")),
            (FieldKind::Date, Value::String(text)) => Date::parse(text, DATE_FORMAT)
                .map(|_| SqlValue::Text(text.clone()))
                .map_err(|_| invalid("expected a date formatted as YYYY-MM-DD")),
            (FieldKind::Date, _) => Err(invalid("expected a date formatted as YYYY-MM-DD")),
        }
    }
}

/// Validated column values, in the order they were given.
pub type ColumnValues = Vec<(&'static Field, SqlValue)>;

/// A table-backed entity exposed through the generic CRUD endpoints.
#[derive(Debug, PartialEq, Eq)]
pub struct Resource {
    /// The name used in URLs, which is also the table name.
    pub name: &'static str,
    /// The columns of the table, excluding the implicit `id` column.
    pub fields: &'static [Field],
}

impl Resource {
    /// Get the column called `name`.
    pub fn field(&self, name: &str) -> Option<&'static Field> {
        self.fields.iter().find(|field| field.name == name)
    }

    /// Create the table for this resource if it does not already exist.
    ///
    /// # Errors
    ///
    /// This function will return an error if the SQL query failed.
    pub fn create_table(&self, connection: &Connection) -> Result<(), rusqlite::Error> {
        let columns = self
            .fields
            .iter()
            .map(Field::column_definition)
            .collect::<Vec<_>>()
            .join(",\n    ");

        connection.execute(
            &format!(
                "CREATE TABLE IF NOT EXISTS \"{}\" (\n    id INTEGER PRIMARY KEY,\n    {columns}\n)",
                self.name
            ),
            (),
        )?;

        Ok(())
    }

    /// The `SELECT` column list in the order expected by
    /// [map_resource_row](crate::resource::store::map_resource_row).
    pub(crate) fn select_columns(&self) -> String {
        std::iter::once("id".to_owned())
            .chain(self.fields.iter().map(|field| format!("\"{}\"", field.name)))
            .collect::<Vec<_>>()
            .join(", ")
    }

    /// Validate the body of a create request.
    ///
    /// # Errors
    ///
    /// Returns:
    /// - [Error::UnknownField] if a key is not a column of the resource,
    /// - [Error::InvalidFieldValue] if a value does not fit its column,
    /// - [Error::MissingField] if a required column is absent.
    pub fn parse_create(&self, body: &ResourceRow) -> Result<ColumnValues, Error> {
        let values = self.parse_columns(body)?;

        if let Some(missing) = self.fields.iter().find(|field| {
            field.constraint == Constraint::Required && !body.contains_key(field.name)
        }) {
            return Err(Error::MissingField(missing.name.to_owned()));
        }

        Ok(values)
    }

    /// Validate the body of an update request.
    ///
    /// # Errors
    ///
    /// Returns:
    /// - [Error::UnknownField] if a key is not a column of the resource,
    /// - [Error::InvalidFieldValue] if a value does not fit its column,
    /// - [Error::NoFieldsToUpdate] if the body is empty.
    pub fn parse_update(&self, body: &ResourceRow) -> Result<ColumnValues, Error> {
        if body.is_empty() {
            return Err(Error::NoFieldsToUpdate);
        }

        self.parse_columns(body)
    }

    fn parse_columns(&self, body: &ResourceRow) -> Result<ColumnValues, Error> {
        body.iter()
            .map(|(name, value)| {
                let field = self
                    .field(name)
                    .ok_or_else(|| Error::UnknownField(name.to_owned()))?;

                Ok::<_, Error>((field, field.to_sql_value(value)?))
            })
            .collect()
    }
}

/// Apartments and their occupancy status.
pub static APARTMENTS: Resource = Resource {
    name: "apartments",
    fields: &[
        Field::required("unit_number", FieldKind::Text),
        Field::optional("block", FieldKind::Text),
        Field::optional("floor", FieldKind::Integer),
        Field::optional("area_sqft", FieldKind::Real),
        Field::defaulted("status", FieldKind::Text, "'vacant'"),
    ],
};

/// Owners of apartments.
pub static OWNERS: Resource = Resource {
    name: "owners",
    fields: &[
        Field::required("name", FieldKind::Text),
        Field::optional("email", FieldKind::Text),
        Field::optional("phone", FieldKind::Text),
        Field::optional("apartment_id", FieldKind::Integer),
    ],
};

/// People renting apartments.
pub static TENANTS: Resource = Resource {
    name: "tenants",
    fields: &[
        Field::required("name", FieldKind::Text),
        Field::optional("email", FieldKind::Text),
        Field::optional("phone", FieldKind::Text),
        Field::optional("apartment_id", FieldKind::Integer),
        Field::optional("lease_start", FieldKind::Date),
        Field::optional("lease_end", FieldKind::Date),
        Field::optional("monthly_rent", FieldKind::Real),
    ],
};

/// Maintenance fees billed per apartment.
pub static MAINTENANCE_PAYMENTS: Resource = Resource {
    name: "maintenance_payments",
    fields: &[
        Field::optional("apartment_id", FieldKind::Integer),
        Field::optional("period", FieldKind::Text),
        Field::required("amount_due", FieldKind::Real),
        Field::defaulted("amount_paid", FieldKind::Real, "0"),
        Field::defaulted("status", FieldKind::Text, "'pending'"),
        Field::optional("paid_on", FieldKind::Date),
    ],
};

/// Bank transactions. `type` is conventionally "credit" or "debit".
pub static TRANSACTIONS: Resource = Resource {
    name: "transactions",
    fields: &[
        Field::required("date", FieldKind::Date),
        Field::required("description", FieldKind::Text),
        Field::required("amount", FieldKind::Real),
        Field::required("type", FieldKind::Text),
        Field::optional("category", FieldKind::Text),
    ],
};

/// Every resource exposed through the generic CRUD endpoints.
pub static RESOURCES: [&Resource; 5] = [
    &APARTMENTS,
    &OWNERS,
    &TENANTS,
    &MAINTENANCE_PAYMENTS,
    &TRANSACTIONS,
];

#[cfg(test)]
mod field_tests {
    use rusqlite::types::Value as SqlValue;
    use serde_json::json;

    use crate::{
        Error,
        resource::schema::{Field, FieldKind},
    };

    #[test]
    fn real_accepts_integers_and_numeric_strings() {
        let field = Field::required("amount", FieldKind::Real);

        assert_eq!(field.to_sql_value(&json!(100)), Ok(SqlValue::Real(100.0)));
        assert_eq!(field.to_sql_value(&json!(" 12.5")), Ok(SqlValue::Real(12.5)));
    }

    #[test]
    fn real_rejects_text() {
        let field = Field::required("amount", FieldKind::Real);

        assert!(matches!(
            field.to_sql_value(&json!("twelve")),
            Err(Error::InvalidFieldValue { field, .. }) if field == "amount"
        ));
    }

    #[test]
    fn integer_rejects_fractions() {
        let field = Field::optional("floor", FieldKind::Integer);

        assert!(matches!(
            field.to_sql_value(&json!(1.5)),
            Err(Error::InvalidFieldValue { .. })
        ));
    }

    #[test]
    fn date_must_be_iso_formatted() {
        let field = Field::required("date", FieldKind::Date);

        assert_eq!(
            field.to_sql_value(&json!("2024-02-29")),
            Ok(SqlValue::Text("2024-02-29".to_owned()))
        );
        assert!(field.to_sql_value(&json!("29/02/2024")).is_err());
        assert!(field.to_sql_value(&json!("2023-02-29")).is_err());
    }

    #[test]
    fn null_only_allowed_for_optional_fields() {
        let optional = Field::optional("email", FieldKind::Text);
        let required = Field::required("name", FieldKind::Text);
        let defaulted = Field::defaulted("status", FieldKind::Text, "'pending'");

        assert_eq!(optional.to_sql_value(&json!(null)), Ok(SqlValue::Null));
        assert!(required.to_sql_value(&json!(null)).is_err());
        assert!(defaulted.to_sql_value(&json!(null)).is_err());
    }

    #[test]
    fn text_rejects_numbers() {
        let field = Field::required("name", FieldKind::Text);

        assert!(field.to_sql_value(&json!(42)).is_err());
    }
}
