use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use rusqlite::{params, Connection, OptionalExtension};
use serde::Deserialize;

use crate::db::models::{LikeState, Post, Restaurant, User};
use crate::error::{AppError, AppResult};
use crate::extractors::{CurrentUser, MaybeUser, ValidatedJson};
use crate::state::AppState;
use crate::validation::{CreatePostInput, NewPost};

const LIST_LIMIT: i64 = 100;

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListParams {
    pub restaurant_id: Option<String>,
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/posts", get(list_posts).post(create_post))
        .route("/api/posts/{id}/like", post(toggle_like_handler))
}

// --- Handlers ---

async fn list_posts(
    State(state): State<AppState>,
    MaybeUser(user): MaybeUser,
    Query(params): Query<ListParams>,
) -> AppResult<Json<Vec<Post>>> {
    let conn = state.db.get()?;
    let viewer = user.as_ref().map(|u| u.id.as_str());
    let posts = query_posts(&conn, viewer, params.restaurant_id.as_deref())?;
    Ok(Json(posts))
}

async fn create_post(
    State(state): State<AppState>,
    user: CurrentUser,
    ValidatedJson(input): ValidatedJson<CreatePostInput>,
) -> AppResult<Response> {
    let new_post = input.validate()?;

    let conn = state.db.get()?;
    let post_id = insert_post(&conn, &user.id, &new_post)?;
    let post = query_post(&conn, &post_id, Some(&user.id))?.ok_or(AppError::NotFound)?;

    tracing::info!(post_id = %post.id, restaurant_id = %post.restaurant_id, "Post created");
    Ok((StatusCode::CREATED, Json(post)).into_response())
}

async fn toggle_like_handler(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(post_id): Path<String>,
) -> AppResult<Json<LikeState>> {
    let mut conn = state.db.get()?;
    let like = toggle_like(&mut conn, &user.id, &post_id)?;
    Ok(Json(like))
}

// --- Query helpers ---

/// Insert a validated post. Fails with `NotFound` when the restaurant is unknown.
pub fn insert_post(conn: &Connection, user_id: &str, new_post: &NewPost) -> AppResult<String> {
    let restaurant_exists: bool = conn.query_row(
        "SELECT COUNT(*) > 0 FROM restaurants WHERE id = ?1",
        params![new_post.restaurant_id],
        |r| r.get(0),
    )?;
    if !restaurant_exists {
        return Err(AppError::NotFound);
    }

    let post_id = uuid::Uuid::now_v7().to_string();
    let images = serde_json::to_string(&new_post.images)?;
    conn.execute(
        "INSERT INTO posts (id, user_id, restaurant_id, description, images) VALUES (?1, ?2, ?3, ?4, ?5)",
        params![
            post_id,
            user_id,
            new_post.restaurant_id,
            new_post.description,
            images
        ],
    )?;
    Ok(post_id)
}

/// Flip the user's like on a post and keep the cached count in step.
/// Both writes commit together.
pub fn toggle_like(conn: &mut Connection, user_id: &str, post_id: &str) -> AppResult<LikeState> {
    let tx = conn.transaction()?;

    let post_exists: bool = tx.query_row(
        "SELECT COUNT(*) > 0 FROM posts WHERE id = ?1",
        params![post_id],
        |r| r.get(0),
    )?;
    if !post_exists {
        return Err(AppError::NotFound);
    }

    let existing: Option<String> = tx
        .query_row(
            "SELECT id FROM likes WHERE user_id = ?1 AND post_id = ?2",
            params![user_id, post_id],
            |r| r.get(0),
        )
        .optional()?;

    let liked = match existing {
        Some(like_id) => {
            tx.execute("DELETE FROM likes WHERE id = ?1", params![like_id])?;
            tx.execute(
                "UPDATE posts SET likes_count = MAX(likes_count - 1, 0) WHERE id = ?1",
                params![post_id],
            )?;
            false
        }
        None => {
            tx.execute(
                "INSERT INTO likes (id, user_id, post_id) VALUES (?1, ?2, ?3)",
                params![uuid::Uuid::now_v7().to_string(), user_id, post_id],
            )?;
            tx.execute(
                "UPDATE posts SET likes_count = likes_count + 1 WHERE id = ?1",
                params![post_id],
            )?;
            true
        }
    };

    let likes_count: i64 = tx.query_row(
        "SELECT likes_count FROM posts WHERE id = ?1",
        params![post_id],
        |r| r.get(0),
    )?;
    tx.commit()?;

    Ok(LikeState { liked, likes_count })
}

fn select_sql(filter: &str) -> String {
    format!(
        "SELECT {}, {}, {},
                EXISTS(SELECT 1 FROM likes l WHERE l.post_id = p.id AND l.user_id = ?1)
         FROM posts p
         JOIN users u ON u.id = p.user_id
         JOIN restaurants r ON r.id = p.restaurant_id
         {}",
        Post::COLUMNS,
        User::COLUMNS,
        Restaurant::COLUMNS,
        filter
    )
}

pub fn query_posts(
    conn: &Connection,
    viewer_id: Option<&str>,
    restaurant_id: Option<&str>,
) -> AppResult<Vec<Post>> {
    let sql = select_sql(
        "WHERE (?2 IS NULL OR p.restaurant_id = ?2)
         ORDER BY p.created_at DESC, p.id DESC
         LIMIT ?3",
    );
    let mut stmt = conn.prepare(&sql)?;
    let posts = stmt
        .query_map(
            params![viewer_id.unwrap_or(""), restaurant_id, LIST_LIMIT],
            Post::from_joined_row,
        )?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(posts)
}

pub fn query_post(conn: &Connection, post_id: &str, viewer_id: Option<&str>) -> AppResult<Option<Post>> {
    let sql = select_sql("WHERE p.id = ?2");
    let post = conn
        .query_row(
            &sql,
            params![viewer_id.unwrap_or(""), post_id],
            Post::from_joined_row,
        )
        .optional()?;
    Ok(post)
}
