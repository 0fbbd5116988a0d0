use axum::extract::State;
use axum::routing::get;
use axum::{Json, Router};
use rusqlite::{params, Connection, OptionalExtension};

use crate::db::models::User;
use crate::error::{AppError, AppResult};
use crate::extractors::{CurrentUser, ValidatedJson};
use crate::state::AppState;
use crate::validation::UpdateUserInput;

pub fn router() -> Router<AppState> {
    Router::new().route("/api/me", get(get_me).patch(update_me))
}

async fn get_me(State(state): State<AppState>, user: CurrentUser) -> AppResult<Json<User>> {
    let conn = state.db.get()?;
    let me = find_user(&conn, &user.id)?.ok_or(AppError::Unauthorized)?;
    Ok(Json(me))
}

async fn update_me(
    State(state): State<AppState>,
    user: CurrentUser,
    ValidatedJson(input): ValidatedJson<UpdateUserInput>,
) -> AppResult<Json<User>> {
    let input = input.validate()?;

    let conn = state.db.get()?;
    conn.execute(
        "UPDATE users SET display_name = ?1, avatar_url = ?2, updated_at = datetime('now') WHERE id = ?3",
        params![input.display_name, input.avatar_url, user.id],
    )?;
    let me = find_user(&conn, &user.id)?.ok_or(AppError::Unauthorized)?;

    tracing::info!(user_id = %me.id, "Profile updated");
    Ok(Json(me))
}

pub fn find_user(conn: &Connection, id: &str) -> AppResult<Option<User>> {
    let sql = format!("SELECT {} FROM users u WHERE u.id = ?1", User::COLUMNS);
    let user = conn
        .query_row(&sql, params![id], |row| User::from_row(row, 0))
        .optional()?;
    Ok(user)
}
