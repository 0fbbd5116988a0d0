use std::sync::Arc;

use r2d2::Pool;
use r2d2_sqlite::SqliteConnectionManager;

use crate::auth::provider::IdentityProvider;
use crate::config::Config;
use crate::places::{Geocoder, PlacesSearch, Resolver};

pub type DbPool = Pool<SqliteConnectionManager>;

#[derive(Clone)]
pub struct AppState {
    pub db: DbPool,
    pub config: Config,
    pub places: Arc<dyn PlacesSearch>,
    pub geocoder: Arc<dyn Geocoder>,
    pub identity: Arc<dyn IdentityProvider>,
    pub resolver: Arc<Resolver>,
}

impl AppState {
    /// Wire the resolver on top of the given services.
    pub fn new(
        db: DbPool,
        config: Config,
        places: Arc<dyn PlacesSearch>,
        geocoder: Arc<dyn Geocoder>,
        identity: Arc<dyn IdentityProvider>,
    ) -> Self {
        let resolver = Arc::new(Resolver::new(
            places.clone(),
            geocoder.clone(),
            &config.places,
        ));
        Self {
            db,
            config,
            places,
            geocoder,
            identity,
            resolver,
        }
    }
}
