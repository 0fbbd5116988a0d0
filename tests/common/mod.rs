#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use dinespot::auth::handlers::upsert_user;
use dinespot::auth::provider::AuthProviderError;
use dinespot::auth::{session, Identity, IdentityProvider};
use dinespot::config::Config;
use dinespot::db;
use dinespot::places::{Coordinate, Geocoder, PlaceDescriptor, PlacesError, PlacesSearch};
use dinespot::state::{AppState, DbPool};
use tempfile::TempDir;

pub const GOOD_CODE: &str = "good-code";

/// Restaurant search answering from fixed lists. Every call is counted;
/// with `fail` set each call answers like an unavailable vendor.
#[derive(Default)]
pub struct FakePlaces {
    pub nearby: Vec<PlaceDescriptor>,
    pub text: Vec<PlaceDescriptor>,
    pub fail: bool,
    pub calls: Arc<AtomicUsize>,
}

impl FakePlaces {
    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Default::default()
        }
    }

    fn answer(&self, results: &[PlaceDescriptor]) -> Result<Vec<PlaceDescriptor>, PlacesError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.fail {
            return Err(PlacesError::Status {
                status: 503,
                body: "backend unavailable".into(),
            });
        }
        Ok(results.to_vec())
    }
}

#[async_trait]
impl PlacesSearch for FakePlaces {
    async fn search_nearby(
        &self,
        _center: Coordinate,
        _radius_m: f64,
    ) -> Result<Vec<PlaceDescriptor>, PlacesError> {
        self.answer(&self.nearby)
    }

    async fn search_text(
        &self,
        _query: &str,
        _bias: Option<Coordinate>,
    ) -> Result<Vec<PlaceDescriptor>, PlacesError> {
        self.answer(&self.text)
    }
}

pub struct FailingGeocoder;

#[async_trait]
impl Geocoder for FailingGeocoder {
    async fn reverse(&self, _point: Coordinate) -> Result<Vec<PlaceDescriptor>, PlacesError> {
        Err(PlacesError::NotConfigured)
    }

    async fn search(&self, _query: &str) -> Result<Vec<PlaceDescriptor>, PlacesError> {
        Err(PlacesError::NotConfigured)
    }
}

/// Accepts [`GOOD_CODE`] and nothing else.
pub struct FakeIdentity;

#[async_trait]
impl IdentityProvider for FakeIdentity {
    async fn exchange_code(&self, code: &str) -> Result<Identity, AuthProviderError> {
        if code == GOOD_CODE {
            Ok(identity("provider-user-1", "aki@example.com"))
        } else {
            Err(AuthProviderError::Rejected {
                status: 400,
                body: "invalid code".into(),
            })
        }
    }
}

pub fn identity(id: &str, email: &str) -> Identity {
    Identity {
        id: id.into(),
        email: email.into(),
        display_name: Some("Aki".into()),
        avatar_url: None,
    }
}

pub fn place(id: &str, name: &str, lat: f64, lng: f64) -> PlaceDescriptor {
    PlaceDescriptor::basic(id, name, format!("{} address", name), Coordinate::new(lat, lng))
}

pub struct TestApp {
    pub base_url: String,
    pub pool: DbPool,
    pub config: Config,
    _dir: TempDir,
}

impl TestApp {
    /// Create a user with a live session and return the cookie header value.
    pub fn sign_in(&self, user_id: &str) -> String {
        upsert_user(&self.pool, &identity(user_id, &format!("{}@example.com", user_id))).unwrap();
        let token = session::create_session(&self.pool, user_id, 1).unwrap();
        format!("{}={}", self.config.auth.cookie_name, token)
    }

    pub fn token(cookie: &str) -> &str {
        cookie.split_once('=').map(|(_, t)| t).unwrap()
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }
}

pub async fn spawn_app(places: FakePlaces) -> TestApp {
    let dir = TempDir::new().unwrap();
    let pool = db::create_pool(&dir.path().join("test.db")).expect("Failed to create test database");
    db::run_migrations(&pool).expect("Failed to run migrations");

    let config = Config::default();
    let state = AppState::new(
        pool.clone(),
        config.clone(),
        Arc::new(places),
        Arc::new(FailingGeocoder),
        Arc::new(FakeIdentity),
    );

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, dinespot::app(state)).await.unwrap();
    });

    TestApp {
        base_url: format!("http://{}", addr),
        pool,
        config,
        _dir: dir,
    }
}

/// A client that leaves redirects for the test to inspect.
pub fn http() -> reqwest::Client {
    reqwest::Client::builder()
        .redirect(reqwest::redirect::Policy::none())
        .build()
        .unwrap()
}
