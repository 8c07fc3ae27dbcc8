//! Creates the application's tables.

use rusqlite::{Connection, Transaction, TransactionBehavior};

use crate::{Error, resource::RESOURCES, user::create_user_table};

/// Create the user table and the table for every resource if they do not
/// already exist.
///
/// All tables are created in a single exclusive transaction, so a partially
/// initialized database is never left behind.
///
/// # Errors
/// Returns an error if there is an SQL error.
pub fn initialize(connection: &Connection) -> Result<(), Error> {
    let transaction = Transaction::new_unchecked(connection, TransactionBehavior::Exclusive)?;

    create_user_table(&transaction)?;

    for resource in RESOURCES {
        resource.create_table(&transaction)?;
    }

    transaction.commit()?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use rusqlite::Connection;

    use crate::{db::initialize, resource::RESOURCES};

    fn table_names(connection: &Connection) -> Vec<String> {
        connection
            .prepare("SELECT name FROM sqlite_master WHERE type = 'table' ORDER BY name")
            .unwrap()
            .query_map([], |row| row.get(0))
            .unwrap()
            .collect::<Result<_, _>>()
            .unwrap()
    }

    #[test]
    fn creates_user_and_resource_tables() {
        let connection = Connection::open_in_memory().unwrap();

        initialize(&connection).unwrap();

        let tables = table_names(&connection);
        assert!(tables.contains(&"user".to_owned()));
        for resource in RESOURCES {
            assert!(tables.contains(&resource.name.to_owned()));
        }
    }

    #[test]
    fn initialize_twice_succeeds() {
        let connection = Connection::open_in_memory().unwrap();

        initialize(&connection).unwrap();

        assert_eq!(initialize(&connection), Ok(()));
    }
}
