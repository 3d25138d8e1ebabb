//! Defines the endpoints for the REST API.

/// Liveness probe, responds to unauthenticated GET requests.
pub const HELLO: &str = "/api/hello";

/// Create a new user account.
pub const REGISTER: &str = "/api/auth/register";

/// Exchange credentials for a bearer token.
pub const LOG_IN: &str = "/api/auth/login";

/// List (GET) or create (POST) the caller's transactions.
pub const TRANSACTIONS: &str = "/api/transactions";

/// Delete a transaction by ID.
pub const TRANSACTION: &str = "/api/transactions/{id}";

/// Export the caller's transactions as JSON.
pub const EXPORT_TRANSACTIONS: &str = "/api/transactions/export";

/// Bulk import transactions from an uploaded CSV or JSON file.
pub const IMPORT_TRANSACTIONS: &str = "/api/transactions/import";

/// List (GET) or create (POST) the caller's goals.
pub const GOALS: &str = "/api/goals";

/// Update (PUT) or delete (DELETE) a goal by ID.
pub const GOAL: &str = "/api/goals/{id}";

/// Mark a goal as completed.
pub const COMPLETE_GOAL: &str = "/api/goals/{id}/complete";

/// Paginated product recommendations for the caller.
pub const RECOMMENDATIONS: &str = "/api/recommendations";

/// Format an endpoint containing an `{id}` placeholder with a concrete ID.
///
/// Useful in tests and clients that need the resolved path.
pub fn format_endpoint(endpoint: &str, id: i64) -> String {
    endpoint.replace("{id}", &id.to_string())
}
