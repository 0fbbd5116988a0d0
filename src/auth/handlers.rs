use axum::extract::{Query, State};
use axum::http::{header, HeaderMap};
use axum::response::{AppendHeaders, IntoResponse, Redirect, Response};
use rusqlite::params;
use serde::Deserialize;

use crate::auth::provider::Identity;
use crate::auth::redirect::sanitize_next;
use crate::auth::session;
use crate::error::{AppError, AppResult};
use crate::extractors::session_token;
use crate::state::{AppState, DbPool};

const CALLBACK_FAILED: &str = "/login?error=callback_failed";

#[derive(Deserialize)]
pub struct CallbackParams {
    pub code: Option<String>,
    pub next: Option<String>,
}

/// Finish the provider's sign-in: trade the code for an identity, open a
/// session and send the browser on to `next`.
pub async fn callback(
    State(state): State<AppState>,
    Query(params): Query<CallbackParams>,
) -> Response {
    let next = sanitize_next(params.next.as_deref());

    let Some(code) = params.code.filter(|c| !c.is_empty()) else {
        tracing::warn!("Auth callback without code");
        return Redirect::to(CALLBACK_FAILED).into_response();
    };

    let identity = match state.identity.exchange_code(&code).await {
        Ok(identity) => identity,
        Err(e) => {
            tracing::error!("Auth callback error: {}", e);
            return Redirect::to(CALLBACK_FAILED).into_response();
        }
    };

    let token = upsert_user(&state.db, &identity).and_then(|_| {
        session::create_session(&state.db, &identity.id, state.config.auth.session_hours)
    });
    let token = match token {
        Ok(token) => token,
        Err(e) => {
            tracing::error!("Failed to open session: {}", e);
            return Redirect::to(CALLBACK_FAILED).into_response();
        }
    };

    tracing::info!(user_id = %identity.id, "User signed in");

    let cookie = session::session_cookie(
        &state.config.auth.cookie_name,
        &token,
        state.config.auth.session_hours,
        state.config.auth.secure_cookies,
    );
    (
        AppendHeaders([(header::SET_COOKIE, cookie)]),
        Redirect::to(&next),
    )
        .into_response()
}

pub async fn logout(State(state): State<AppState>, headers: HeaderMap) -> AppResult<Response> {
    let cookie_name = &state.config.auth.cookie_name;
    if let Some(token) = session_token(&headers, cookie_name) {
        session::delete_session(&state.db, token).map_err(|e| AppError::Internal(e.to_string()))?;
    }

    Ok((
        AppendHeaders([(header::SET_COOKIE, session::clear_session_cookie(cookie_name))]),
        Redirect::to("/login"),
    )
        .into_response())
}

/// Insert the user on first sign-in. Later sign-ins refresh the email but
/// keep profile fields the user may have edited.
pub fn upsert_user(pool: &DbPool, identity: &Identity) -> anyhow::Result<()> {
    let conn = pool.get()?;
    conn.execute(
        "INSERT INTO users (id, email, display_name, avatar_url) VALUES (?1, ?2, ?3, ?4)
         ON CONFLICT(id) DO UPDATE SET
             email = excluded.email,
             display_name = COALESCE(users.display_name, excluded.display_name),
             avatar_url = COALESCE(users.avatar_url, excluded.avatar_url),
             updated_at = datetime('now')",
        params![
            identity.id,
            identity.email,
            identity.display_name,
            identity.avatar_url
        ],
    )?;
    Ok(())
}
