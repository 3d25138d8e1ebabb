//! User registration, login, and bearer-token authentication.
//!
//! Handlers exchange an email/password pair for a signed JWT whose subject
//! is the user's email. Protected routes receive the caller's identity by
//! taking [Claims] as an extractor argument.

use axum::{
    Json, RequestPartsExt,
    extract::{FromRef, FromRequestParts, State},
    http::{StatusCode, request::Parts},
    response::IntoResponse,
};
use axum_extra::{
    TypedHeader,
    headers::{Authorization, authorization::Bearer},
};
use jsonwebtoken::{DecodingKey, EncodingKey, Header, TokenData, Validation, decode, encode};
use serde::{Deserialize, Serialize};
use serde_json::json;
use time::{Duration, OffsetDateTime};

use crate::{AppState, Error, user::create_user, user::get_user_by_email};

/// How long a token stays valid after being issued.
const TOKEN_DURATION: Duration = Duration::days(1);

/// The contents of a JSON Web Token.
#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    /// The expiry time of the token as a unix timestamp.
    pub exp: usize,
    /// The time the token was issued as a unix timestamp.
    pub iat: usize,
    /// The email of the user the token was issued to.
    pub sub: String,
}

impl<S> FromRequestParts<S> for Claims
where
    AppState: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = Error;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let TypedHeader(Authorization(bearer)) = parts
            .extract::<TypedHeader<Authorization<Bearer>>>()
            .await
            .map_err(|_| Error::InvalidToken)?;

        let state = AppState::from_ref(state);
        let token_data = decode_jwt(bearer.token(), &state.jwt_keys.decoding)?;

        Ok(token_data.claims)
    }
}

/// The email and password sent by a client when registering or logging in.
#[derive(Debug, Deserialize)]
pub struct Credentials {
    /// The email identifying the account.
    #[serde(default)]
    pub email: String,
    /// The plain-text password, hashed before storage and never logged.
    #[serde(default)]
    pub password: String,
}

/// Handler for creating a new user account.
///
/// # Errors
///
/// This function will return an error when:
/// - the email or password is empty,
/// - the email already belongs to a user,
/// - an internal error occurred while hashing the password.
pub async fn register(
    State(state): State<AppState>,
    Json(credentials): Json<Credentials>,
) -> Result<impl IntoResponse, Error> {
    if credentials.email.is_empty() || credentials.password.is_empty() {
        return Err(Error::MissingCredentials);
    }

    let password_hash = bcrypt::hash(&credentials.password, bcrypt::DEFAULT_COST)
        .map_err(|error| Error::HashingError(error.to_string()))?;

    let connection = state
        .db_connection
        .lock()
        .map_err(|_| Error::DatabaseLockError)?;
    let user = create_user(&credentials.email, &password_hash, &connection)?;

    Ok((
        StatusCode::CREATED,
        Json(json!({
            "message": "User registered successfully",
            "email": user.email,
        })),
    ))
}

/// Handler for exchanging credentials for a bearer token.
///
/// Returns the same error for an unknown email and a wrong password so
/// that the endpoint cannot be used to probe for registered emails.
///
/// # Errors
///
/// This function will return an error when:
/// - the email or password is empty,
/// - the email does not belong to a registered user,
/// - the password is not correct,
/// - an internal error occurred when verifying the password or signing the
///   token.
pub async fn log_in(
    State(state): State<AppState>,
    Json(credentials): Json<Credentials>,
) -> Result<impl IntoResponse, Error> {
    if credentials.email.is_empty() || credentials.password.is_empty() {
        return Err(Error::MissingCredentials);
    }

    let user = {
        let connection = state
            .db_connection
            .lock()
            .map_err(|_| Error::DatabaseLockError)?;

        get_user_by_email(&credentials.email, &connection).map_err(|error| match error {
            Error::NotFound => Error::InvalidCredentials,
            error => error,
        })?
    };

    let password_is_correct = bcrypt::verify(&credentials.password, &user.password_hash)
        .map_err(|error| Error::HashingError(error.to_string()))?;

    if !password_is_correct {
        return Err(Error::InvalidCredentials);
    }

    let token = encode_jwt(&user.email, &state.jwt_keys.encoding)?;

    Ok(Json(json!({
        "message": "Login successful",
        "email": user.email,
        "token": token,
    })))
}

pub(crate) fn encode_jwt(email: &str, encoding_key: &EncodingKey) -> Result<String, Error> {
    let now = OffsetDateTime::now_utc();
    let claims = Claims {
        exp: (now + TOKEN_DURATION).unix_timestamp() as usize,
        iat: now.unix_timestamp() as usize,
        sub: email.to_owned(),
    };

    encode(&Header::default(), &claims, encoding_key).map_err(|_| Error::TokenCreation)
}

fn decode_jwt(token: &str, decoding_key: &DecodingKey) -> Result<TokenData<Claims>, Error> {
    decode(token, decoding_key, &Validation::default()).map_err(|_| Error::InvalidToken)
}
