use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use rusqlite::{params, Connection, OptionalExtension};
use serde::Serialize;

use crate::db::models::Restaurant;
use crate::error::{AppError, AppResult};
use crate::extractors::{CurrentUser, ValidatedJson};
use crate::state::AppState;
use crate::validation::CreateRestaurantInput;

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RestaurantDetail {
    #[serde(flatten)]
    pub restaurant: Restaurant,
    pub post_count: i64,
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/restaurants", post(create_restaurant))
        .route("/api/restaurants/{id}", get(get_restaurant))
}

/// Save a restaurant picked on the map. A restaurant already stored at the
/// same coordinates is returned as is.
async fn create_restaurant(
    State(state): State<AppState>,
    _user: CurrentUser,
    ValidatedJson(input): ValidatedJson<CreateRestaurantInput>,
) -> AppResult<Response> {
    let input = input.validate()?;
    let conn = state.db.get()?;

    let (restaurant, created) = find_or_create(&conn, &input)?;
    let status = if created {
        tracing::info!(restaurant_id = %restaurant.id, name = %restaurant.name, "Restaurant created");
        StatusCode::CREATED
    } else {
        StatusCode::OK
    };
    Ok((status, Json(restaurant)).into_response())
}

async fn get_restaurant(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> AppResult<Json<RestaurantDetail>> {
    let conn = state.db.get()?;
    let restaurant = find_by_id(&conn, &id)?.ok_or(AppError::NotFound)?;
    let post_count: i64 = conn.query_row(
        "SELECT COUNT(*) FROM posts WHERE restaurant_id = ?1",
        params![id],
        |r| r.get(0),
    )?;
    Ok(Json(RestaurantDetail {
        restaurant,
        post_count,
    }))
}

pub fn find_or_create(
    conn: &Connection,
    input: &CreateRestaurantInput,
) -> AppResult<(Restaurant, bool)> {
    let sql = format!(
        "SELECT {} FROM restaurants r WHERE r.latitude = ?1 AND r.longitude = ?2 LIMIT 1",
        Restaurant::COLUMNS
    );
    let existing = conn
        .query_row(&sql, params![input.latitude, input.longitude], |row| {
            Restaurant::from_row(row, 0)
        })
        .optional()?;
    if let Some(restaurant) = existing {
        return Ok((restaurant, false));
    }

    let id = uuid::Uuid::now_v7().to_string();
    conn.execute(
        "INSERT INTO restaurants (id, name, address, latitude, longitude, place_id)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        params![
            id,
            input.name,
            input.address,
            input.latitude,
            input.longitude,
            input.place_id
        ],
    )?;
    let restaurant = find_by_id(conn, &id)?
        .ok_or_else(|| AppError::Internal("restaurant vanished after insert".into()))?;
    Ok((restaurant, true))
}

pub fn find_by_id(conn: &Connection, id: &str) -> AppResult<Option<Restaurant>> {
    let sql = format!(
        "SELECT {} FROM restaurants r WHERE r.id = ?1",
        Restaurant::COLUMNS
    );
    let restaurant = conn
        .query_row(&sql, params![id], |row| Restaurant::from_row(row, 0))
        .optional()?;
    Ok(restaurant)
}
