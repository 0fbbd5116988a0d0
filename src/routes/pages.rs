use askama::Template;
use axum::extract::{Query, State};
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Redirect, Response};
use axum::routing::get;
use axum::Router;
use serde::Deserialize;

use crate::error::AppResult;
use crate::extractors::MaybeUser;
use crate::routes::profile::find_user;
use crate::state::AppState;

#[derive(Template)]
#[template(path = "pages/login.html")]
pub struct LoginTemplate {
    pub error: Option<String>,
    pub authorize_url: Option<String>,
}

#[derive(Template)]
#[template(path = "pages/map.html")]
pub struct MapTemplate {
    pub display_name: String,
    pub map_style: String,
    pub access_token: String,
    pub center_lng: f64,
    pub center_lat: f64,
    pub zoom: f64,
}

#[derive(Deserialize)]
pub struct LoginParams {
    pub error: Option<String>,
}

/// Wrapper to render askama templates as axum responses
pub struct Html<T: Template>(pub T);

impl<T: Template> IntoResponse for Html<T> {
    fn into_response(self) -> Response {
        match self.0.render() {
            Ok(body) => (
                StatusCode::OK,
                [(header::CONTENT_TYPE, "text/html; charset=utf-8")],
                body,
            )
                .into_response(),
            Err(e) => {
                tracing::error!("Template render error: {}", e);
                (StatusCode::INTERNAL_SERVER_ERROR, "Template error").into_response()
            }
        }
    }
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(index))
        .route("/login", get(login))
        .route("/main", get(main_page))
}

async fn index(maybe_user: MaybeUser) -> Redirect {
    if maybe_user.0.is_some() {
        Redirect::to("/main")
    } else {
        Redirect::to("/login")
    }
}

async fn login(
    State(state): State<AppState>,
    maybe_user: MaybeUser,
    Query(params): Query<LoginParams>,
) -> Response {
    if maybe_user.0.is_some() {
        return Redirect::to("/main").into_response();
    }

    let error = params.error.map(|code| match code.as_str() {
        "callback_failed" => "Sign-in failed. Please try again.".to_string(),
        _ => "Something went wrong.".to_string(),
    });

    Html(LoginTemplate {
        error,
        authorize_url: state.config.auth.authorize_url.clone(),
    })
    .into_response()
}

async fn main_page(State(state): State<AppState>, maybe_user: MaybeUser) -> AppResult<Response> {
    let Some(user) = maybe_user.0 else {
        return Ok(Redirect::to("/login").into_response());
    };

    let conn = state.db.get()?;
    let display_name = find_user(&conn, &user.id)?
        .and_then(|u| u.display_name)
        .unwrap_or(user.email);

    let map = &state.config.map;
    Ok(Html(MapTemplate {
        display_name,
        map_style: map.style.clone(),
        access_token: state.config.geocoding.access_token.clone().unwrap_or_default(),
        center_lng: map.center[0],
        center_lat: map.center[1],
        zoom: map.zoom,
    })
    .into_response())
}
