use axum::extract::{Query, State};
use axum::routing::get;
use axum::{Json, Router};
use serde::Deserialize;

use crate::error::{AppError, AppResult};
use crate::extractors::CurrentUser;
use crate::places::{Coordinate, PlaceDescriptor, ResolvedLocation};
use crate::state::AppState;

#[derive(Deserialize)]
pub struct PointParams {
    pub lat: f64,
    pub lng: f64,
}

#[derive(Deserialize)]
pub struct SearchParams {
    #[serde(default)]
    pub q: String,
    pub lat: Option<f64>,
    pub lng: Option<f64>,
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/places/resolve", get(resolve))
        .route("/api/places/search", get(search))
        .route("/api/places/geocode", get(geocode))
}

/// Name the place at a point. Always answers; the last resort is the
/// formatted coordinates.
async fn resolve(
    State(state): State<AppState>,
    _user: CurrentUser,
    Query(params): Query<PointParams>,
) -> AppResult<Json<ResolvedLocation>> {
    let point = checked_point(params.lat, params.lng)?;
    Ok(Json(state.resolver.resolve(point).await))
}

async fn search(
    State(state): State<AppState>,
    _user: CurrentUser,
    Query(params): Query<SearchParams>,
) -> AppResult<Json<Vec<PlaceDescriptor>>> {
    let query = params.q.trim();
    if query.is_empty() {
        return Ok(Json(Vec::new()));
    }
    let bias = match (params.lat, params.lng) {
        (Some(lat), Some(lng)) => Some(checked_point(lat, lng)?),
        _ => None,
    };
    let results = state.places.search_text(query, bias).await?;
    Ok(Json(results))
}

/// Geocoding search is best effort: failures come back as no results.
async fn geocode(
    State(state): State<AppState>,
    _user: CurrentUser,
    Query(params): Query<SearchParams>,
) -> AppResult<Json<Vec<PlaceDescriptor>>> {
    let query = params.q.trim();
    if query.is_empty() {
        return Ok(Json(Vec::new()));
    }
    match state.geocoder.search(query).await {
        Ok(results) => Ok(Json(results)),
        Err(e) => {
            tracing::warn!(query, "Geocoding search failed: {}", e);
            Ok(Json(Vec::new()))
        }
    }
}

pub(crate) fn checked_point(lat: f64, lng: f64) -> AppResult<Coordinate> {
    if !lat.is_finite() || !(-90.0..=90.0).contains(&lat) {
        return Err(AppError::BadRequest("lat must be between -90 and 90".into()));
    }
    if !lng.is_finite() || !(-180.0..=180.0).contains(&lng) {
        return Err(AppError::BadRequest("lng must be between -180 and 180".into()));
    }
    Ok(Coordinate::new(lat, lng))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn checked_point_rejects_out_of_range() {
        assert!(checked_point(35.0, 139.0).is_ok());
        assert!(checked_point(91.0, 0.0).is_err());
        assert!(checked_point(0.0, -181.0).is_err());
        assert!(checked_point(f64::NAN, 0.0).is_err());
    }
}
