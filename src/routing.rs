//! Application router configuration.

use axum::{
    Json, Router,
    http::StatusCode,
    middleware,
    response::{IntoResponse, Response},
    routing::{delete, get, post, put},
};
use serde_json::json;
use tower_http::cors::{Any, CorsLayer};

use crate::{
    AppState,
    auth::{log_in, register},
    endpoints,
    goal::{
        complete_goal_endpoint, create_goal_endpoint, delete_goal_endpoint, get_goals_endpoint,
        update_goal_endpoint,
    },
    import::import_transactions_endpoint,
    logging::logging_middleware,
    recommend::get_recommendations_endpoint,
    transaction::{
        create_transaction_endpoint, delete_transaction_endpoint, export_transactions_endpoint,
        get_transactions_endpoint,
    },
};

/// Return a router with all the app's routes.
pub fn build_router(state: AppState) -> Router {
    // The SPA is served from a different origin during development, so the
    // API answers cross-origin requests.
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route(endpoints::HELLO, get(get_hello))
        .route(endpoints::REGISTER, post(register))
        .route(endpoints::LOG_IN, post(log_in))
        .route(
            endpoints::TRANSACTIONS,
            get(get_transactions_endpoint).post(create_transaction_endpoint),
        )
        .route(endpoints::TRANSACTION, delete(delete_transaction_endpoint))
        .route(
            endpoints::EXPORT_TRANSACTIONS,
            get(export_transactions_endpoint),
        )
        .route(
            endpoints::IMPORT_TRANSACTIONS,
            post(import_transactions_endpoint),
        )
        .route(
            endpoints::GOALS,
            get(get_goals_endpoint).post(create_goal_endpoint),
        )
        .route(
            endpoints::GOAL,
            put(update_goal_endpoint).delete(delete_goal_endpoint),
        )
        .route(endpoints::COMPLETE_GOAL, put(complete_goal_endpoint))
        .route(
            endpoints::RECOMMENDATIONS,
            get(get_recommendations_endpoint),
        )
        .fallback(get_404_not_found)
        .layer(middleware::from_fn(logging_middleware))
        .layer(cors)
        .with_state(state)
}

/// An unauthenticated liveness probe.
async fn get_hello() -> &'static str {
    "Hello! The server is running 🎉"
}

async fn get_404_not_found() -> Response {
    (StatusCode::NOT_FOUND, Json(json!({ "error": "Not found" }))).into_response()
}
