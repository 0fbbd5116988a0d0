use axum::extract::{Query, State};
use axum::routing::{get, post};
use axum::{Json, Router};
use rusqlite::Connection;
use serde::{Deserialize, Serialize};

use crate::error::{AppError, AppResult};
use crate::extractors::{CurrentUser, ValidatedJson};
use crate::map::cluster::MAX_ZOOM_LEVEL;
use crate::map::viewport::{FIT_PADDING, FOCUS_ZOOM};
use crate::map::{ClickOutcome, ClusterOptions, Marker, MarkerLayer, Pixel, RenderedLayers, Viewport};
use crate::places::{Coordinate, ResolvedLocation};
use crate::routes::places::checked_point;
use crate::state::AppState;

const DEFAULT_WIDTH: f64 = 800.0;
const DEFAULT_HEIGHT: f64 = 600.0;

#[derive(Deserialize)]
pub struct LayerParams {
    pub zoom: Option<f64>,
    pub q: Option<String>,
    pub lat: Option<f64>,
    pub lng: Option<f64>,
    pub width: Option<f64>,
    pub height: Option<f64>,
}

#[derive(Serialize)]
pub struct LayerResponse {
    #[serde(flatten)]
    pub layers: RenderedLayers,
    /// Where to move the camera so every search result is in view.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub focus: Option<Viewport>,
}

#[derive(Deserialize)]
pub struct ClickRequest {
    pub viewport: Viewport,
    pub pixel: Pixel,
    pub q: Option<String>,
}

#[derive(Serialize)]
pub struct ClickResponse {
    pub outcome: ClickOutcome,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub resolved: Option<ResolvedLocation>,
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/map/layer", get(layer))
        .route("/api/map/click", post(click))
}

async fn layer(
    State(state): State<AppState>,
    _user: CurrentUser,
    Query(params): Query<LayerParams>,
) -> AppResult<Json<LayerResponse>> {
    let map = &state.config.map;
    let zoom = params.zoom.unwrap_or(map.zoom);
    if !zoom.is_finite() || zoom < 0.0 {
        return Err(AppError::BadRequest("zoom must be a non-negative number".into()));
    }
    let zoom = clamp_zoom(zoom);
    let center = match (params.lat, params.lng) {
        (Some(lat), Some(lng)) => checked_point(lat, lng)?,
        _ => Coordinate::new(map.center[1], map.center[0]),
    };

    let marker_layer = build_layer(&state, params.q.as_deref(), Some(center)).await?;

    let locations: Vec<Coordinate> = marker_layer
        .search_results()
        .iter()
        .map(|m| m.location)
        .collect();
    let focus = (!locations.is_empty()).then(|| {
        Viewport {
            center,
            zoom,
            width: params.width.unwrap_or(DEFAULT_WIDTH),
            height: params.height.unwrap_or(DEFAULT_HEIGHT),
        }
        .fit(&locations, FIT_PADDING, FOCUS_ZOOM)
    });

    Ok(Json(LayerResponse {
        layers: marker_layer.render(zoom),
        focus,
    }))
}

/// Resolve a click on the map. Empty map clicks are named through the
/// place resolver so the client can offer to post there.
async fn click(
    State(state): State<AppState>,
    _user: CurrentUser,
    ValidatedJson(req): ValidatedJson<ClickRequest>,
) -> AppResult<Json<ClickResponse>> {
    let mut viewport = req.viewport;
    if !(viewport.width > 0.0 && viewport.height > 0.0 && viewport.zoom.is_finite()) {
        return Err(AppError::BadRequest("viewport must have a size and zoom".into()));
    }
    viewport.center = checked_point(viewport.center.lat, viewport.center.lng)?;
    viewport.zoom = clamp_zoom(viewport.zoom);

    let marker_layer = build_layer(&state, req.q.as_deref(), Some(viewport.center)).await?;
    let outcome = marker_layer.click(&viewport, req.pixel);

    let resolved = match &outcome {
        ClickOutcome::Map { coordinate, .. } => Some(state.resolver.resolve(*coordinate).await),
        _ => None,
    };

    Ok(Json(ClickResponse { outcome, resolved }))
}

/// Keep zoom inside the levels the map can render. Past the deepest level
/// the projection overflows and clicks no longer map to coordinates.
fn clamp_zoom(zoom: f64) -> f64 {
    zoom.clamp(0.0, f64::from(MAX_ZOOM_LEVEL))
}

async fn build_layer(
    state: &AppState,
    query: Option<&str>,
    bias: Option<Coordinate>,
) -> AppResult<MarkerLayer> {
    let markers = {
        let conn = state.db.get()?;
        post_markers(&conn)?
    };

    let search_results = match query.map(str::trim).filter(|q| !q.is_empty()) {
        Some(q) => match state.places.search_text(q, bias).await {
            Ok(places) => places.iter().map(Marker::from).collect(),
            Err(e) => {
                tracing::warn!(query = q, "Map search failed: {}", e);
                Vec::new()
            }
        },
        None => Vec::new(),
    };

    Ok(MarkerLayer::new(
        markers,
        search_results,
        ClusterOptions::from(&state.config.map),
    ))
}

/// One marker per post, placed at the post's restaurant.
pub fn post_markers(conn: &Connection) -> AppResult<Vec<Marker>> {
    let mut stmt = conn.prepare(
        "SELECT r.id, r.name, r.address, r.latitude, r.longitude
         FROM posts p
         JOIN restaurants r ON r.id = p.restaurant_id
         ORDER BY p.created_at DESC, p.id DESC",
    )?;
    let markers = stmt
        .query_map([], |row| {
            let mut marker = Marker::new(
                row.get::<_, String>(0)?,
                Coordinate::new(row.get(3)?, row.get(4)?),
                row.get::<_, String>(1)?,
            );
            marker.detail = row.get(2)?;
            Ok(marker)
        })?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(markers)
}
