use reqwest::{header, StatusCode};
use serde::de::DeserializeOwned;
use serde::Deserialize;

use crate::db::models::{LikeState, Post, User};
use crate::places::{Coordinate, ResolvedLocation};
use crate::validation::{CreatePostInput, FieldErrors};

#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("not signed in")]
    Unauthorized,

    #[error("validation failed")]
    Validation(FieldErrors),

    #[error("server returned {status}: {message}")]
    Status { status: u16, message: String },
}

#[derive(Deserialize)]
struct ErrorBody {
    #[serde(default)]
    error: Option<String>,
    #[serde(default)]
    errors: Option<FieldErrors>,
}

/// Typed access to the DineSpot JSON API.
#[derive(Clone)]
pub struct ApiClient {
    http: reqwest::Client,
    base_url: String,
    cookie: Option<String>,
}

impl ApiClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            cookie: None,
        }
    }

    /// Attach an existing session.
    pub fn with_session(mut self, cookie_name: &str, token: &str) -> Self {
        self.cookie = Some(format!("{}={}", cookie_name, token));
        self
    }

    fn request(&self, method: reqwest::Method, path: &str) -> reqwest::RequestBuilder {
        let builder = self
            .http
            .request(method, format!("{}{}", self.base_url, path));
        match &self.cookie {
            Some(cookie) => builder.header(header::COOKIE, cookie),
            None => builder,
        }
    }

    async fn decode<T: DeserializeOwned>(response: reqwest::Response) -> Result<T, ClientError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response.json().await?);
        }
        if status == StatusCode::UNAUTHORIZED {
            return Err(ClientError::Unauthorized);
        }

        let body: Option<ErrorBody> = response.json().await.ok();
        match body {
            Some(ErrorBody {
                errors: Some(errors),
                ..
            }) => Err(ClientError::Validation(errors)),
            other => Err(ClientError::Status {
                status: status.as_u16(),
                message: other.and_then(|b| b.error).unwrap_or_default(),
            }),
        }
    }

    pub async fn me(&self) -> Result<User, ClientError> {
        let response = self.request(reqwest::Method::GET, "/api/me").send().await?;
        Self::decode(response).await
    }

    pub async fn posts(&self, restaurant_id: Option<&str>) -> Result<Vec<Post>, ClientError> {
        let mut request = self.request(reqwest::Method::GET, "/api/posts");
        if let Some(rid) = restaurant_id {
            request = request.query(&[("restaurantId", rid)]);
        }
        Self::decode(request.send().await?).await
    }

    pub async fn create_post(&self, input: &CreatePostInput) -> Result<Post, ClientError> {
        let response = self
            .request(reqwest::Method::POST, "/api/posts")
            .json(input)
            .send()
            .await?;
        Self::decode(response).await
    }

    pub async fn toggle_like(&self, post_id: &str) -> Result<LikeState, ClientError> {
        let response = self
            .request(reqwest::Method::POST, &format!("/api/posts/{}/like", post_id))
            .send()
            .await?;
        Self::decode(response).await
    }

    pub async fn resolve(&self, point: Coordinate) -> Result<ResolvedLocation, ClientError> {
        let response = self
            .request(reqwest::Method::GET, "/api/places/resolve")
            .query(&[("lat", point.lat), ("lng", point.lng)])
            .send()
            .await?;
        Self::decode(response).await
    }
}
