//! Database initialization for the application.

use rusqlite::Connection;

use crate::{
    Error, goal::create_goal_table, transaction::create_transaction_table,
    user::create_user_table,
};

/// Create the tables for the application's domain models.
///
/// Tables are only created if they do not already exist, so it is safe to
/// call this on every startup.
///
/// # Errors
/// Returns an [Error::SqlError] if a table could not be created.
pub fn initialize(connection: &Connection) -> Result<(), Error> {
    connection.pragma_update(None, "foreign_keys", true)?;

    create_user_table(connection)?;
    create_transaction_table(connection)?;
    create_goal_table(connection)?;

    Ok(())
}
