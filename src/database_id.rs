//! The ID type for rows in the application database.

/// Alias for the integer type used for database row IDs.
pub type DatabaseID = i64;
