//! Bulk import of transactions from uploaded CSV or JSON files.
//!
//! The CSV format is deliberately lenient: the first line names the
//! columns, rows that do not parse are dropped rather than failing the
//! whole batch, and only a wholly-empty result is reported as an error.
//! There is no quote-aware escaping beyond stripping literal `"`
//! characters.

use axum::{Json, extract::Multipart, extract::State, response::IntoResponse};
use serde_json::json;
use time::{Date, format_description::BorrowedFormatItem, macros::format_description};

use crate::{
    AppState, Error,
    auth::Claims,
    transaction::{NewTransaction, create_transactions},
    user::get_user_by_email,
};

/// Import dates are written as month/day/year, with or without zero
/// padding.
const CSV_DATE_FORMAT: &[BorrowedFormatItem] =
    format_description!("[month padding:none]/[day padding:none]/[year]");

/// A route handler for importing transactions from an uploaded file.
///
/// Expects a multipart form with a `file` field. A filename ending in
/// `.csv` selects the CSV parser; anything else is deserialized as a JSON
/// array of transactions. Parsed rows are saved for the caller in a single
/// SQL transaction.
pub async fn import_transactions_endpoint(
    claims: Claims,
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<impl IntoResponse, Error> {
    let mut upload = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|error| Error::MultipartError(error.to_string()))?
    {
        if field.name() == Some("file") || field.file_name().is_some() {
            let file_name = field.file_name().unwrap_or_default().to_owned();
            let bytes = field
                .bytes()
                .await
                .map_err(|error| Error::MultipartError(error.to_string()))?;

            upload = Some((file_name, bytes));
            break;
        }
    }

    let (file_name, bytes) =
        upload.ok_or_else(|| Error::MultipartError("missing file field".to_owned()))?;

    let rows = if file_name.to_lowercase().ends_with(".csv") {
        parse_csv(&String::from_utf8_lossy(&bytes))?
    } else {
        parse_json(&bytes)?
    };

    if rows.is_empty() {
        return Err(Error::EmptyImport);
    }

    let imported = {
        let connection = state
            .db_connection
            .lock()
            .map_err(|_| Error::DatabaseLockError)?;
        let user = get_user_by_email(&claims.sub, &connection)?;

        create_transactions(rows, user.id, &connection)?
    };

    tracing::info!("Imported {} transactions for {}", imported.len(), claims.sub);

    Ok(Json(json!({
        "message": "Imported successfully",
        "imported": imported.len(),
        "details": format!(
            "{} transaction(s) were imported and saved to your account.",
            imported.len()
        ),
    })))
}

/// Parse CSV `text` into transaction rows.
///
/// The first line is a lowercased, comma-split header row. Data rows are
/// comma-split; a row is skipped when its token count does not match the
/// header count, when a required field (amount, type, account) is empty,
/// or when any field fails to parse. Unrecognized headers are ignored.
///
/// Returns the rows that survived, possibly none.
///
/// # Errors
/// This function will return an [Error::UnreadableImport] if `text` has no
/// header line.
pub fn parse_csv(text: &str) -> Result<Vec<NewTransaction>, Error> {
    let mut lines = text.lines();

    let headers: Vec<String> = match lines.next() {
        Some(header_line) => header_line
            .to_lowercase()
            .split(',')
            .map(|header| header.trim().to_owned())
            .collect(),
        None => return Err(Error::UnreadableImport("CSV file is empty".to_owned())),
    };

    let mut transactions = Vec::new();

    for line in lines {
        let tokens: Vec<&str> = line.split(',').collect();

        if tokens.len() != headers.len() {
            continue;
        }

        if let Some(transaction) = parse_csv_row(&headers, &tokens) {
            transactions.push(transaction);
        }
    }

    Ok(transactions)
}

/// Parse a single CSV row. Returns `None` when the row should be skipped.
fn parse_csv_row(headers: &[String], tokens: &[&str]) -> Option<NewTransaction> {
    let mut transaction = NewTransaction::default();
    let mut amount = None;

    for (header, token) in headers.iter().zip(tokens) {
        let value = token.replace('"', "");
        let value = value.trim();

        match header.as_str() {
            "title" => {
                transaction.title = Some(if value.is_empty() {
                    "Untitled".to_owned()
                } else {
                    value.to_owned()
                });
            }
            "amount" => {
                if value.is_empty() {
                    return None;
                }

                amount = Some(parse_amount(value)?);
            }
            "type" => {
                if value.is_empty() {
                    return None;
                }

                transaction.transaction_type = Some(value.to_lowercase());
            }
            "category" => {
                transaction.category = Some(if value.is_empty() {
                    "Uncategorized".to_owned()
                } else {
                    value.to_owned()
                });
            }
            "account" => {
                if value.is_empty() {
                    return None;
                }

                transaction.account = Some(value.to_owned());
            }
            "date" => {
                if !value.is_empty() {
                    transaction.date = Some(Date::parse(value, &CSV_DATE_FORMAT).ok()?);
                }
            }
            "notes" => transaction.notes = Some(value.to_owned()),
            _ => {}
        }
    }

    // A row that never saw the amount, type, or account column is useless.
    if transaction.transaction_type.is_none() || transaction.account.is_none() {
        return None;
    }

    transaction.amount = amount?;

    Some(transaction)
}

/// Parse an amount that may carry currency symbols or stray text, e.g.
/// `$12.50abc` parses to 12.50.
fn parse_amount(value: &str) -> Option<f64> {
    let cleaned: String = value
        .chars()
        .filter(|c| c.is_ascii_digit() || *c == '-' || *c == '.')
        .collect();

    cleaned.parse().ok()
}

/// Parse a JSON array of transaction objects.
///
/// Unknown fields are ignored; there is no per-field validation beyond
/// type coercion.
///
/// # Errors
/// This function will return an [Error::UnreadableImport] if `bytes` is
/// not a JSON array of objects.
pub fn parse_json(bytes: &[u8]) -> Result<Vec<NewTransaction>, Error> {
    serde_json::from_slice(bytes).map_err(|error| Error::UnreadableImport(error.to_string()))
}


#[cfg(test)]
mod endpoint_tests {
    use axum_test::{
        TestServer,
        multipart::{MultipartForm, Part},
    };
    use rusqlite::Connection;
    use serde_json::Value;

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

    fn csv_upload(content: &str) -> MultipartForm {
        MultipartForm::new().add_part(
            "file",
            Part::bytes(content.as_bytes().to_vec())
                .file_name("transactions.csv")
                .mime_type("text/csv"),
        )
    }

    #[tokio::test]
    async fn csv_import_saves_valid_rows() {
        let (server, token) = get_test_server();

        let csv = "title,amount,type,category,account,date,notes\n\
                   Lunch,12.50,expense,Food,checking,6/1/2025,team lunch\n\
                   Salary,2000,income,,checking,6/2/2025,\n";

        let response = server
            .post(endpoints::IMPORT_TRANSACTIONS)
            .authorization_bearer(&token)
            .multipart(csv_upload(csv))
            .await;

        response.assert_status_ok();
        assert_eq!(response.json::<Value>()["imported"], 2);

        let listed = server
            .get(endpoints::TRANSACTIONS)
            .authorization_bearer(&token)
            .await
            .json::<Vec<Value>>();
        assert_eq!(listed.len(), 2);
    }

    #[tokio::test]
    async fn import_with_no_valid_rows_is_an_error() {
        let (server, token) = get_test_server();

        let csv = "amount,type,account\n,expense,checking\n";

        let response = server
            .post(endpoints::IMPORT_TRANSACTIONS)
            .authorization_bearer(&token)
            .multipart(csv_upload(csv))
            .await;

        response.assert_status(axum::http::StatusCode::BAD_REQUEST);
        let body = response.json::<Value>();
        assert_eq!(body["imported"], 0);
        assert!(body["error"].as_str().unwrap().contains("No valid transactions"));
    }

    #[tokio::test]
    async fn json_import_saves_rows() {
        let (server, token) = get_test_server();

        let payload = r#"[{"title": "Rent", "amount": 1200.0, "type": "expense", "account": "checking"}]"#;
        let form = MultipartForm::new().add_part(
            "file",
            Part::bytes(payload.as_bytes().to_vec())
                .file_name("transactions.json")
                .mime_type("application/json"),
        );

        let response = server
            .post(endpoints::IMPORT_TRANSACTIONS)
            .authorization_bearer(&token)
            .multipart(form)
            .await;

        response.assert_status_ok();
        assert_eq!(response.json::<Value>()["imported"], 1);
    }

    #[tokio::test]
    async fn unreadable_json_is_an_error() {
        let (server, token) = get_test_server();

        let form = MultipartForm::new().add_part(
            "file",
            Part::bytes(b"not json at all".to_vec())
                .file_name("transactions.json")
                .mime_type("application/json"),
        );

        let response = server
            .post(endpoints::IMPORT_TRANSACTIONS)
            .authorization_bearer(&token)
            .multipart(form)
            .await;

        response.assert_status(axum::http::StatusCode::BAD_REQUEST);
        assert!(
            response.json::<Value>()["error"]
                .as_str()
                .unwrap()
                .starts_with("Invalid file")
        );
    }
}
