//! Transaction management for the finance tracker.
//!
//! This module contains everything related to transactions:
//! - The `Transaction` model and the `NewTransaction` input type
//! - Database functions for storing, querying, and deleting transactions
//! - Route handlers for listing, creating, deleting, and exporting
//!   transactions

use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use rusqlite::{Connection, Row};
use serde::{Deserialize, Serialize};
use serde_json::json;
use time::{Date, OffsetDateTime};

use crate::{
    AppState, Error,
    auth::Claims,
    database_id::DatabaseID,
    user::{UserID, get_user_by_email},
};

// ============================================================================
// MODELS
// ============================================================================

/// An expense or income, i.e. an event where money was either spent or earned.
///
/// The owning user is tracked internally but never serialized to clients.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Transaction {
    /// The ID of the transaction.
    pub id: DatabaseID,
    /// The ID of the user who owns this transaction.
    #[serde(skip_serializing)]
    pub user_id: UserID,
    /// A short label for the transaction.
    pub title: Option<String>,
    /// The amount of money spent or earned in this transaction.
    pub amount: f64,
    /// Either `income` or `expense`. Free text in practice; only the exact
    /// string `expense` counts towards spending analysis.
    #[serde(rename = "type")]
    pub transaction_type: Option<String>,
    /// The spending category, e.g. "Food".
    pub category: Option<String>,
    /// The account the money moved through, e.g. "checking".
    pub account: Option<String>,
    /// When the transaction happened.
    pub date: Date,
    /// Free-form notes.
    pub notes: Option<String>,
}

/// The client-supplied fields for creating a transaction.
///
/// Every field is optional so that JSON imports tolerate sparse objects;
/// unknown fields are ignored. The date defaults to today when absent.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct NewTransaction {
    /// A short label for the transaction.
    pub title: Option<String>,
    /// The amount of money spent or earned.
    pub amount: f64,
    /// Either `income` or `expense`.
    #[serde(rename = "type")]
    pub transaction_type: Option<String>,
    /// The spending category.
    pub category: Option<String>,
    /// The account the money moved through.
    pub account: Option<String>,
    /// When the transaction happened, defaults to today.
    pub date: Option<Date>,
    /// Free-form notes.
    pub notes: Option<String>,
}

// ============================================================================
// ROUTE HANDLERS
// ============================================================================

/// A route handler for listing all of the caller's transactions.
pub async fn get_transactions_endpoint(
    claims: Claims,
    State(state): State<AppState>,
) -> Result<Json<Vec<Transaction>>, Error> {
    let connection = state
        .db_connection
        .lock()
        .map_err(|_| Error::DatabaseLockError)?;
    let user = get_user_by_email(&claims.sub, &connection)?;

    get_transactions_by_user(user.id, &connection).map(Json)
}

/// A route handler for creating a new transaction owned by the caller.
pub async fn create_transaction_endpoint(
    claims: Claims,
    State(state): State<AppState>,
    Json(data): Json<NewTransaction>,
) -> Result<impl IntoResponse, Error> {
    let connection = state
        .db_connection
        .lock()
        .map_err(|_| Error::DatabaseLockError)?;
    let user = get_user_by_email(&claims.sub, &connection)?;

    let transaction = create_transaction(data, user.id, &connection)?;

    Ok((StatusCode::CREATED, Json(transaction)))
}

/// A route handler for deleting a transaction by its database ID.
///
/// Returns 404 when the transaction does not exist or belongs to another
/// user, without revealing which of the two it was.
pub async fn delete_transaction_endpoint(
    claims: Claims,
    State(state): State<AppState>,
    Path(transaction_id): Path<DatabaseID>,
) -> Result<impl IntoResponse, Error> {
    let connection = state
        .db_connection
        .lock()
        .map_err(|_| Error::DatabaseLockError)?;
    let user = get_user_by_email(&claims.sub, &connection)?;

    delete_transaction(transaction_id, user.id, &connection)?;

    Ok(Json(json!({"message": "Transaction deleted successfully"})))
}

/// A route handler for exporting the caller's transactions.
///
/// The payload is the same JSON as the list endpoint; clients save it to a
/// file.
pub async fn export_transactions_endpoint(
    claims: Claims,
    state: State<AppState>,
) -> Result<Json<Vec<Transaction>>, Error> {
    get_transactions_endpoint(claims, state).await
}

// ============================================================================
// DATABASE FUNCTIONS
// ============================================================================

/// Create the transaction table.
///
/// # Errors
/// This function will return an error if the SQL query failed.
pub fn create_transaction_table(connection: &Connection) -> Result<(), rusqlite::Error> {
    connection.execute(
        "CREATE TABLE IF NOT EXISTS transactions (
                id INTEGER PRIMARY KEY,
                user_id INTEGER NOT NULL REFERENCES users(id),
                title TEXT,
                amount REAL NOT NULL,
                type TEXT,
                category TEXT,
                account TEXT,
                date TEXT NOT NULL,
                notes TEXT
                )",
        (),
    )?;

    Ok(())
}

/// Create a new transaction in the database owned by `user_id`.
///
/// The date defaults to today when the input does not supply one.
///
/// # Errors
/// This function will return an [Error::SqlError] if there is an SQL error.
pub fn create_transaction(
    data: NewTransaction,
    user_id: UserID,
    connection: &Connection,
) -> Result<Transaction, Error> {
    let date = data.date.unwrap_or_else(|| OffsetDateTime::now_utc().date());

    let transaction = connection
        .prepare(
            "INSERT INTO transactions (user_id, title, amount, type, category, account, date, notes)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
             RETURNING id, user_id, title, amount, type, category, account, date, notes",
        )?
        .query_row(
            (
                user_id.as_i64(),
                &data.title,
                data.amount,
                &data.transaction_type,
                &data.category,
                &data.account,
                date,
                &data.notes,
            ),
            map_transaction_row,
        )?;

    Ok(transaction)
}

/// Insert many transactions for `user_id` in a single SQL transaction.
///
/// Used by the bulk importer so that a failure part-way through does not
/// leave half an import behind.
///
/// # Errors
/// Returns an [Error::SqlError] if there is an unexpected SQL error.
pub fn create_transactions(
    data: Vec<NewTransaction>,
    user_id: UserID,
    connection: &Connection,
) -> Result<Vec<Transaction>, Error> {
    let tx = connection.unchecked_transaction()?;
    let mut created = Vec::with_capacity(data.len());

    {
        let mut statement = tx.prepare(
            "INSERT INTO transactions (user_id, title, amount, type, category, account, date, notes)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
             RETURNING id, user_id, title, amount, type, category, account, date, notes",
        )?;

        for item in data {
            let date = item.date.unwrap_or_else(|| OffsetDateTime::now_utc().date());
            let transaction = statement.query_row(
                (
                    user_id.as_i64(),
                    &item.title,
                    item.amount,
                    &item.transaction_type,
                    &item.category,
                    &item.account,
                    date,
                    &item.notes,
                ),
                map_transaction_row,
            )?;

            created.push(transaction);
        }
    }

    tx.commit()?;
    Ok(created)
}

/// Retrieve all transactions owned by `user_id`.
///
/// # Errors
/// This function will return an [Error::SqlError] if there is an SQL error.
pub fn get_transactions_by_user(
    user_id: UserID,
    connection: &Connection,
) -> Result<Vec<Transaction>, Error> {
    let transactions = connection
        .prepare(
            "SELECT id, user_id, title, amount, type, category, account, date, notes
             FROM transactions WHERE user_id = :user_id",
        )?
        .query_map(&[(":user_id", &user_id.as_i64())], map_transaction_row)?
        .collect::<Result<Vec<_>, _>>()?;

    Ok(transactions)
}

/// Delete the transaction with `id` if it is owned by `user_id`.
///
/// # Errors
/// This function will return:
/// - [Error::NotFound] if `id` does not refer to a transaction owned by
///   `user_id`,
/// - [Error::SqlError] if there is some other SQL error.
pub fn delete_transaction(
    id: DatabaseID,
    user_id: UserID,
    connection: &Connection,
) -> Result<(), Error> {
    let rows_deleted = connection.execute(
        "DELETE FROM transactions WHERE id = ?1 AND user_id = ?2",
        (id, user_id.as_i64()),
    )?;

    if rows_deleted == 0 {
        return Err(Error::NotFound);
    }

    Ok(())
}

pub(crate) fn map_transaction_row(row: &Row) -> Result<Transaction, rusqlite::Error> {
    Ok(Transaction {
        id: row.get(0)?,
        user_id: UserID::new(row.get(1)?),
        title: row.get(2)?,
        amount: row.get(3)?,
        transaction_type: row.get(4)?,
        category: row.get(5)?,
        account: row.get(6)?,
        date: row.get(7)?,
        notes: row.get(8)?,
    })
}

#[cfg(test)]
mod database_tests {
    use rusqlite::Connection;
    use time::{OffsetDateTime, macros::date};

    use crate::{
        Error,
        db::initialize,
        transaction::{
            NewTransaction, create_transaction, create_transactions, delete_transaction,
            get_transactions_by_user,
        },
        user::{UserID, create_user},
    };

    fn get_test_connection() -> (Connection, UserID) {
        let connection = Connection::open_in_memory().unwrap();
        initialize(&connection).unwrap();
        let user = create_user("foo@bar.baz", "hash", &connection).unwrap();

        (connection, user.id)
    }

    fn expense(amount: f64, category: &str) -> NewTransaction {
        NewTransaction {
            title: Some("Test".to_owned()),
            amount,
            transaction_type: Some("expense".to_owned()),
            category: Some(category.to_owned()),
            account: Some("checking".to_owned()),
            date: Some(date!(2025 - 06 - 01)),
            notes: None,
        }
    }

    #[test]
    fn create_transaction_defaults_date_to_today() {
        let (connection, user_id) = get_test_connection();
        let data = NewTransaction {
            amount: 12.5,
            date: None,
            ..NewTransaction::default()
        };

        let transaction = create_transaction(data, user_id, &connection).unwrap();

        assert_eq!(transaction.date, OffsetDateTime::now_utc().date());
    }

    #[test]
    fn get_transactions_is_scoped_to_user() {
        let (connection, user_id) = get_test_connection();
        let other = create_user("other@bar.baz", "hash", &connection).unwrap();
        create_transaction(expense(10.0, "Food"), user_id, &connection).unwrap();
        create_transaction(expense(99.0, "Travel"), other.id, &connection).unwrap();

        let transactions = get_transactions_by_user(user_id, &connection).unwrap();

        assert_eq!(transactions.len(), 1);
        assert_eq!(transactions[0].category.as_deref(), Some("Food"));
    }

    #[test]
    fn create_transactions_inserts_all_rows() {
        let (connection, user_id) = get_test_connection();
        let data = vec![expense(1.0, "Food"), expense(2.0, "Rent")];

        let created = create_transactions(data, user_id, &connection).unwrap();

        assert_eq!(created.len(), 2);
        assert_eq!(get_transactions_by_user(user_id, &connection).unwrap().len(), 2);
    }

    #[test]
    fn delete_transaction_removes_row() {
        let (connection, user_id) = get_test_connection();
        let transaction = create_transaction(expense(10.0, "Food"), user_id, &connection).unwrap();

        delete_transaction(transaction.id, user_id, &connection).unwrap();

        assert!(get_transactions_by_user(user_id, &connection).unwrap().is_empty());
    }

    #[test]
    fn delete_transaction_owned_by_other_user_fails() {
        let (connection, user_id) = get_test_connection();
        let other = create_user("other@bar.baz", "hash", &connection).unwrap();
        let transaction = create_transaction(expense(10.0, "Food"), other.id, &connection).unwrap();

        let result = delete_transaction(transaction.id, user_id, &connection);

        assert_eq!(result, Err(Error::NotFound));
        assert_eq!(get_transactions_by_user(other.id, &connection).unwrap().len(), 1);
    }

    #[test]
    fn delete_missing_transaction_fails() {
        let (connection, user_id) = get_test_connection();

        assert_eq!(
            delete_transaction(999, user_id, &connection),
            Err(Error::NotFound)
        );
    }
}
