//! Savings-goal management for the finance tracker.
//!
//! Goals use partial-update semantics: an update only overwrites a field
//! when the incoming payload supplies a non-null value. The `completedAt`
//! date is server-assigned and is non-null exactly when `completed` is
//! true.

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

/// A savings goal, e.g. "Save $5000 for a house deposit".
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Goal {
    /// The ID of the goal.
    pub id: DatabaseID,
    /// The ID of the user who owns this goal.
    #[serde(skip_serializing)]
    pub user_id: UserID,
    /// What the goal is, required and non-empty.
    pub text: String,
    /// A JSON-encoded list of steps. Treated as an opaque string and never
    /// parsed server-side.
    pub steps: Option<String>,
    /// A free-text timeframe, e.g. "6 months".
    pub timeframe: Option<String>,
    /// When the goal was created. Server-assigned, immutable.
    pub created_at: Date,
    /// Whether the goal has been completed.
    pub completed: bool,
    /// When the goal was completed. Non-null exactly when `completed` is
    /// true.
    pub completed_at: Option<Date>,
}

/// The client-supplied fields for creating a goal.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct NewGoal {
    /// What the goal is. Required.
    pub text: String,
    /// A JSON-encoded list of steps, stored verbatim.
    pub steps: Option<String>,
    /// A free-text timeframe.
    pub timeframe: Option<String>,
    /// Whether the goal starts out completed. Defaults to false.
    pub completed: Option<bool>,
}

/// A partial update to a goal.
///
/// `None` fields are left unchanged.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct GoalUpdate {
    /// Replacement goal text.
    pub text: Option<String>,
    /// Replacement steps string.
    pub steps: Option<String>,
    /// Replacement timeframe.
    pub timeframe: Option<String>,
    /// The new completion state. Flipping to true stamps `completedAt`
    /// with today's date; flipping to false clears it.
    pub completed: Option<bool>,
}

// ============================================================================
// ROUTE HANDLERS
// ============================================================================

/// A route handler for listing all of the caller's goals.
pub async fn get_goals_endpoint(
    claims: Claims,
    State(state): State<AppState>,
) -> Result<Json<Vec<Goal>>, Error> {
    let connection = state
        .db_connection
        .lock()
        .map_err(|_| Error::DatabaseLockError)?;
    let user = get_user_by_email(&claims.sub, &connection)?;

    get_goals_by_user(user.id, &connection).map(Json)
}

/// A route handler for creating a new goal owned by the caller.
pub async fn create_goal_endpoint(
    claims: Claims,
    State(state): State<AppState>,
    Json(data): Json<NewGoal>,
) -> Result<impl IntoResponse, Error> {
    if data.text.trim().is_empty() {
        return Err(Error::EmptyGoalText);
    }

    let connection = state
        .db_connection
        .lock()
        .map_err(|_| Error::DatabaseLockError)?;
    let user = get_user_by_email(&claims.sub, &connection)?;

    let goal = create_goal(data, user.id, &connection)?;

    Ok((StatusCode::CREATED, Json(goal)))
}

/// A route handler for partially updating one of the caller's goals.
pub async fn update_goal_endpoint(
    claims: Claims,
    State(state): State<AppState>,
    Path(goal_id): Path<DatabaseID>,
    Json(update): Json<GoalUpdate>,
) -> Result<Json<Goal>, Error> {
    let connection = state
        .db_connection
        .lock()
        .map_err(|_| Error::DatabaseLockError)?;
    let user = get_user_by_email(&claims.sub, &connection)?;

    update_goal(goal_id, update, user.id, &connection).map(Json)
}

/// A route handler that marks one of the caller's goals as completed.
///
/// Shorthand for a partial update with `{"completed": true}`.
pub async fn complete_goal_endpoint(
    claims: Claims,
    State(state): State<AppState>,
    Path(goal_id): Path<DatabaseID>,
) -> Result<Json<Goal>, Error> {
    let update = GoalUpdate {
        completed: Some(true),
        ..GoalUpdate::default()
    };

    let connection = state
        .db_connection
        .lock()
        .map_err(|_| Error::DatabaseLockError)?;
    let user = get_user_by_email(&claims.sub, &connection)?;

    update_goal(goal_id, update, user.id, &connection).map(Json)
}

/// A route handler for deleting one of the caller's goals.
pub async fn delete_goal_endpoint(
    claims: Claims,
    State(state): State<AppState>,
    Path(goal_id): Path<DatabaseID>,
) -> Result<impl IntoResponse, Error> {
    let connection = state
        .db_connection
        .lock()
        .map_err(|_| Error::DatabaseLockError)?;
    let user = get_user_by_email(&claims.sub, &connection)?;

    delete_goal(goal_id, user.id, &connection)?;

    Ok(Json(json!({"message": "Goal deleted successfully"})))
}

// ============================================================================
// DATABASE FUNCTIONS
// ============================================================================

/// Create the goal table.
///
/// # Errors
/// This function will return an error if the SQL query failed.
pub fn create_goal_table(connection: &Connection) -> Result<(), rusqlite::Error> {
    connection.execute(
        "CREATE TABLE IF NOT EXISTS goals (
                id INTEGER PRIMARY KEY,
                user_id INTEGER NOT NULL REFERENCES users(id),
                text TEXT NOT NULL,
                steps TEXT,
                timeframe TEXT,
                created_at TEXT NOT NULL,
                completed INTEGER NOT NULL DEFAULT 0,
                completed_at TEXT
                )",
        (),
    )?;

    Ok(())
}

/// Create a new goal in the database owned by `user_id`.
///
/// `createdAt` is stamped with today's date and `completedAt` starts out
/// null regardless of the completion flag.
///
/// # Errors
/// This function will return an [Error::SqlError] if there is an SQL error.
pub fn create_goal(data: NewGoal, user_id: UserID, connection: &Connection) -> Result<Goal, Error> {
    let created_at = OffsetDateTime::now_utc().date();
    let completed = data.completed.unwrap_or(false);

    let goal = connection
        .prepare(
            "INSERT INTO goals (user_id, text, steps, timeframe, created_at, completed, completed_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, NULL)
             RETURNING id, user_id, text, steps, timeframe, created_at, completed, completed_at",
        )?
        .query_row(
            (
                user_id.as_i64(),
                &data.text,
                &data.steps,
                &data.timeframe,
                created_at,
                completed,
            ),
            map_goal_row,
        )?;

    Ok(goal)
}

/// Retrieve all goals owned by `user_id`.
///
/// # Errors
/// This function will return an [Error::SqlError] if there is an SQL error.
pub fn get_goals_by_user(user_id: UserID, connection: &Connection) -> Result<Vec<Goal>, Error> {
    let goals = connection
        .prepare(
            "SELECT id, user_id, text, steps, timeframe, created_at, completed, completed_at
             FROM goals WHERE user_id = :user_id",
        )?
        .query_map(&[(":user_id", &user_id.as_i64())], map_goal_row)?
        .collect::<Result<Vec<_>, _>>()?;

    Ok(goals)
}

/// Retrieve a goal by its `id`.
///
/// # Errors
/// This function will return:
/// - [Error::NotFound] if `id` does not refer to a valid goal,
/// - [Error::SqlError] if there is some other SQL error.
pub fn get_goal(id: DatabaseID, connection: &Connection) -> Result<Goal, Error> {
    let goal = connection
        .prepare(
            "SELECT id, user_id, text, steps, timeframe, created_at, completed, completed_at
             FROM goals WHERE id = :id",
        )?
        .query_row(&[(":id", &id)], map_goal_row)?;

    Ok(goal)
}

/// Apply a partial update to the goal with `id`, which must be owned by
/// `user_id`.
///
/// Only non-null fields of `update` are applied. Flipping `completed` to
/// true stamps `completedAt` with today's date; flipping it to false
/// clears it.
///
/// # Errors
/// This function will return:
/// - [Error::NotFound] if `id` does not refer to a goal owned by `user_id`,
/// - [Error::SqlError] if there is some other SQL error.
pub fn update_goal(
    id: DatabaseID,
    update: GoalUpdate,
    user_id: UserID,
    connection: &Connection,
) -> Result<Goal, Error> {
    let mut goal = get_goal(id, connection)?;
    ensure_owner(&goal, user_id)?;

    if let Some(text) = update.text {
        goal.text = text;
    }

    if let Some(steps) = update.steps {
        goal.steps = Some(steps);
    }

    if let Some(timeframe) = update.timeframe {
        goal.timeframe = Some(timeframe);
    }

    if let Some(completed) = update.completed {
        goal.completed = completed;

        if completed && goal.completed_at.is_none() {
            goal.completed_at = Some(OffsetDateTime::now_utc().date());
        } else if !completed {
            goal.completed_at = None;
        }
    }

    connection.execute(
        "UPDATE goals
         SET text = ?1, steps = ?2, timeframe = ?3, completed = ?4, completed_at = ?5
         WHERE id = ?6",
        (
            &goal.text,
            &goal.steps,
            &goal.timeframe,
            goal.completed,
            goal.completed_at,
            goal.id,
        ),
    )?;

    Ok(goal)
}

/// Delete the goal with `id`, which must be owned by `user_id`.
///
/// # Errors
/// This function will return:
/// - [Error::NotFound] if `id` does not refer to a goal owned by `user_id`,
/// - [Error::SqlError] if there is some other SQL error.
pub fn delete_goal(id: DatabaseID, user_id: UserID, connection: &Connection) -> Result<(), Error> {
    let goal = get_goal(id, connection)?;
    ensure_owner(&goal, user_id)?;

    connection.execute("DELETE FROM goals WHERE id = ?1", (id,))?;

    Ok(())
}

/// The authorization check performed before every goal mutation.
///
/// Reports an unowned goal as [Error::NotFound] so that callers cannot
/// distinguish "does not exist" from "belongs to someone else".
fn ensure_owner(goal: &Goal, user_id: UserID) -> Result<(), Error> {
    if goal.user_id != user_id {
        return Err(Error::NotFound);
    }

    Ok(())
}

fn map_goal_row(row: &Row) -> Result<Goal, rusqlite::Error> {
    Ok(Goal {
        id: row.get(0)?,
        user_id: UserID::new(row.get(1)?),
        text: row.get(2)?,
        steps: row.get(3)?,
        timeframe: row.get(4)?,
        created_at: row.get(5)?,
        completed: row.get(6)?,
        completed_at: row.get(7)?,
    })
}

#[cfg(test)]
mod database_tests {
    use rusqlite::Connection;
    use time::OffsetDateTime;

    use crate::{
        Error,
        db::initialize,
        goal::{GoalUpdate, NewGoal, create_goal, delete_goal, get_goal, update_goal},
        user::{UserID, create_user},
    };

    fn get_test_connection() -> (Connection, UserID) {
        let connection = Connection::open_in_memory().unwrap();
        initialize(&connection).unwrap();
        let user = create_user("foo@bar.baz", "hash", &connection).unwrap();

        (connection, user.id)
    }

    fn test_goal() -> NewGoal {
        NewGoal {
            text: "Save for a house deposit".to_owned(),
            steps: Some(r#"["open savings account","set up automatic payment"]"#.to_owned()),
            timeframe: Some("2 years".to_owned()),
            completed: None,
        }
    }

    #[test]
    fn create_goal_stamps_created_at_and_defaults_completed() {
        let (connection, user_id) = get_test_connection();

        let goal = create_goal(test_goal(), user_id, &connection).unwrap();

        assert_eq!(goal.created_at, OffsetDateTime::now_utc().date());
        assert!(!goal.completed);
        assert_eq!(goal.completed_at, None);
    }

    #[test]
    fn completing_goal_sets_completed_at_and_keeps_other_fields() {
        let (connection, user_id) = get_test_connection();
        let goal = create_goal(test_goal(), user_id, &connection).unwrap();

        let update = GoalUpdate {
            completed: Some(true),
            ..GoalUpdate::default()
        };
        let updated = update_goal(goal.id, update, user_id, &connection).unwrap();

        assert!(updated.completed);
        assert_eq!(updated.completed_at, Some(OffsetDateTime::now_utc().date()));
        assert_eq!(updated.text, goal.text);
        assert_eq!(updated.steps, goal.steps);
        assert_eq!(updated.timeframe, goal.timeframe);
    }

    #[test]
    fn reopening_goal_clears_completed_at() {
        let (connection, user_id) = get_test_connection();
        let goal = create_goal(test_goal(), user_id, &connection).unwrap();
        let complete = GoalUpdate {
            completed: Some(true),
            ..GoalUpdate::default()
        };
        update_goal(goal.id, complete, user_id, &connection).unwrap();

        let reopen = GoalUpdate {
            completed: Some(false),
            ..GoalUpdate::default()
        };
        let updated = update_goal(goal.id, reopen, user_id, &connection).unwrap();

        assert!(!updated.completed);
        assert_eq!(updated.completed_at, None);
    }

    #[test]
    fn update_only_overwrites_supplied_fields() {
        let (connection, user_id) = get_test_connection();
        let goal = create_goal(test_goal(), user_id, &connection).unwrap();

        let update = GoalUpdate {
            text: Some("Save for a bigger house deposit".to_owned()),
            ..GoalUpdate::default()
        };
        let updated = update_goal(goal.id, update, user_id, &connection).unwrap();

        assert_eq!(updated.text, "Save for a bigger house deposit");
        assert_eq!(updated.steps, goal.steps);
        assert_eq!(updated.timeframe, goal.timeframe);
        assert_eq!(updated.completed, goal.completed);
    }

    #[test]
    fn update_persists_to_database() {
        let (connection, user_id) = get_test_connection();
        let goal = create_goal(test_goal(), user_id, &connection).unwrap();

        let update = GoalUpdate {
            timeframe: Some("3 years".to_owned()),
            ..GoalUpdate::default()
        };
        update_goal(goal.id, update, user_id, &connection).unwrap();

        let fetched = get_goal(goal.id, &connection).unwrap();
        assert_eq!(fetched.timeframe.as_deref(), Some("3 years"));
    }

    #[test]
    fn update_goal_owned_by_other_user_fails() {
        let (connection, user_id) = get_test_connection();
        let other = create_user("other@bar.baz", "hash", &connection).unwrap();
        let goal = create_goal(test_goal(), other.id, &connection).unwrap();

        let update = GoalUpdate {
            text: Some("Hijacked".to_owned()),
            ..GoalUpdate::default()
        };
        let result = update_goal(goal.id, update, user_id, &connection);

        assert_eq!(result, Err(Error::NotFound));
        assert_eq!(get_goal(goal.id, &connection).unwrap().text, goal.text);
    }

    #[test]
    fn delete_goal_owned_by_other_user_fails() {
        let (connection, user_id) = get_test_connection();
        let other = create_user("other@bar.baz", "hash", &connection).unwrap();
        let goal = create_goal(test_goal(), other.id, &connection).unwrap();

        assert_eq!(
            delete_goal(goal.id, user_id, &connection),
            Err(Error::NotFound)
        );
        assert!(get_goal(goal.id, &connection).is_ok());
    }

    #[test]
    fn delete_goal_removes_row() {
        let (connection, user_id) = get_test_connection();
        let goal = create_goal(test_goal(), user_id, &connection).unwrap();

        delete_goal(goal.id, user_id, &connection).unwrap();

        assert_eq!(get_goal(goal.id, &connection), Err(Error::NotFound));
    }
}

#[cfg(test)]
mod endpoint_tests {
    use axum_test::TestServer;
    use rusqlite::Connection;
    use serde_json::{Value, json};

    use crate::{AppState, auth::encode_jwt, build_router, endpoints, user::create_user};

    fn get_test_server() -> (TestServer, String) {
        let connection = Connection::open_in_memory().unwrap();
        let state = AppState::new(connection, "foobar", None).unwrap();

        {
            let connection = state.db_connection.lock().unwrap();
            create_user("foo@bar.baz", "hash", &connection).unwrap();
        }

        let token = encode_jwt("foo@bar.baz", &state.jwt_keys.encoding).unwrap();
        let server = TestServer::new(build_router(state));

        (server, token)
    }

    #[tokio::test]
    async fn create_goal_with_blank_text_fails() {
        let (server, token) = get_test_server();

        let response = server
            .post(endpoints::GOALS)
            .authorization_bearer(&token)
            .json(&json!({"text": "   "}))
            .await;

        response.assert_status(axum::http::StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn complete_endpoint_marks_goal_completed() {
        let (server, token) = get_test_server();

        let created = server
            .post(endpoints::GOALS)
            .authorization_bearer(&token)
            .json(&json!({"text": "Pay off credit card debt"}))
            .await
            .json::<Value>();
        let id = created["id"].as_i64().unwrap();

        let response = server
            .put(&endpoints::format_endpoint(endpoints::COMPLETE_GOAL, id))
            .authorization_bearer(&token)
            .await;

        response.assert_status_ok();
        let body = response.json::<Value>();
        assert_eq!(body["completed"], true);
        assert!(body["completedAt"].is_string());
        assert!(body.get("user_id").is_none());
    }

    #[tokio::test]
    async fn update_missing_goal_returns_404() {
        let (server, token) = get_test_server();

        server
            .put(&endpoints::format_endpoint(endpoints::GOAL, 999))
            .authorization_bearer(&token)
            .json(&json!({"completed": true}))
            .await
            .assert_status(axum::http::StatusCode::NOT_FOUND);
    }
}
