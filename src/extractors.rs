use axum::extract::rejection::JsonRejection;
use axum::extract::{FromRequest, FromRequestParts, Request};
use axum::http::request::Parts;
use axum::http::{header, HeaderMap};
use axum::Json;
use rusqlite::params;
use serde::de::DeserializeOwned;

use crate::error::AppError;
use crate::state::AppState;
use crate::validation::{FieldErrors, ROOT_FIELD};

/// Represents the currently authenticated user.
#[derive(Debug, Clone)]
pub struct CurrentUser {
    pub id: String,
    pub email: String,
}

/// Extractor that requires authentication.
/// Returns 401 if no valid session found.
impl FromRequestParts<AppState> for CurrentUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let token = session_token(&parts.headers, &state.config.auth.cookie_name)
            .ok_or(AppError::Unauthorized)?;

        let conn = state.db.get()?;
        let user = conn.query_row(
            "SELECT u.id, u.email FROM sessions s \
             JOIN users u ON u.id = s.user_id \
             WHERE s.token = ?1 AND s.expires_at > datetime('now')",
            params![token],
            |row| {
                Ok(CurrentUser {
                    id: row.get(0)?,
                    email: row.get(1)?,
                })
            },
        );
        match user {
            Ok(user) => Ok(user),
            Err(rusqlite::Error::QueryReturnedNoRows) => Err(AppError::Unauthorized),
            Err(e) => Err(e.into()),
        }
    }
}

/// Optional user extractor. Yields `None` instead of a 401 when signed out.
pub struct MaybeUser(pub Option<CurrentUser>);

impl FromRequestParts<AppState> for MaybeUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        match CurrentUser::from_request_parts(parts, state).await {
            Ok(user) => Ok(MaybeUser(Some(user))),
            Err(AppError::Unauthorized) => Ok(MaybeUser(None)),
            Err(e) => Err(e),
        }
    }
}

/// JSON body extractor whose failures use the same field-keyed 422 shape
/// as rule-based validation.
pub struct ValidatedJson<T>(pub T);

impl<T, S> FromRequest<S> for ValidatedJson<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        match Json::<T>::from_request(req, state).await {
            Ok(Json(value)) => Ok(ValidatedJson(value)),
            Err(rejection) => {
                tracing::debug!("Rejected JSON body: {}", rejection.body_text());
                Err(AppError::Validation(rejection_errors(&rejection)))
            }
        }
    }
}

fn rejection_errors(rejection: &JsonRejection) -> FieldErrors {
    match rejection {
        JsonRejection::JsonDataError(e) => FieldErrors::from_body_error(&e.body_text()),
        JsonRejection::JsonSyntaxError(_) => {
            let mut errors = FieldErrors::default();
            errors.add(ROOT_FIELD, "Request body is not valid JSON");
            errors
        }
        JsonRejection::MissingJsonContentType(_) => {
            let mut errors = FieldErrors::default();
            errors.add(ROOT_FIELD, "Expected an application/json body");
            errors
        }
        other => {
            let mut errors = FieldErrors::default();
            errors.add(ROOT_FIELD, other.body_text());
            errors
        }
    }
}

/// Value of the session cookie, if the request carries one.
pub fn session_token<'a>(headers: &'a HeaderMap, cookie_name: &str) -> Option<&'a str> {
    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|s| s.split(';'))
        .map(|s| s.trim())
        .find_map(|cookie| {
            let mut split = cookie.splitn(2, '=');
            let key = split.next()?.trim();
            let val = split.next()?.trim();
            if key == cookie_name && !val.is_empty() {
                Some(val)
            } else {
                None
            }
        })
}
