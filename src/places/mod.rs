//! Restaurant and location lookups against the external places and
//! geocoding services.
//!
//! Vendor payloads never leave this module: each client decodes its own
//! response shape and maps it through [`VendorRecord::into_descriptor`] into
//! the shared [`PlaceDescriptor`].

pub mod google;
pub mod mapbox;
pub mod resolver;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

pub use resolver::{ResolutionSource, ResolvedLocation, Resolver};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinate {
    pub lat: f64,
    pub lng: f64,
}

impl Coordinate {
    pub fn new(lat: f64, lng: f64) -> Self {
        Self { lat, lng }
    }

    /// Straight-line distance in degree space. Not geodesic.
    pub fn planar_distance(&self, other: &Coordinate) -> f64 {
        ((self.lat - other.lat).powi(2) + (self.lng - other.lng).powi(2)).sqrt()
    }
}

/// A normalized restaurant or location, independent of which vendor produced it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlaceDescriptor {
    pub id: String,
    pub name: String,
    pub address: String,
    pub location: Coordinate,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rating: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub price_level: Option<u8>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub types: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_open: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub website: Option<String>,
}

impl PlaceDescriptor {
    /// A descriptor carrying only identity, label and position.
    pub fn basic(
        id: impl Into<String>,
        name: impl Into<String>,
        address: impl Into<String>,
        location: Coordinate,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            address: address.into(),
            location,
            rating: None,
            price_level: None,
            types: Vec::new(),
            is_open: None,
            website: None,
        }
    }
}

/// Raw records as each vendor returns them.
#[derive(Debug, Clone)]
pub enum VendorRecord {
    /// A places-search result; `fallback` fills in a missing location.
    Places {
        place: google::Place,
        fallback: Coordinate,
    },
    Geocoding(mapbox::Feature),
}

impl VendorRecord {
    pub fn into_descriptor(self) -> PlaceDescriptor {
        match self {
            VendorRecord::Places { place, fallback } => place.into_descriptor(fallback),
            VendorRecord::Geocoding(feature) => feature.into_descriptor(),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum PlacesError {
    #[error("API key not configured")]
    NotConfigured,

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("unexpected status {status}: {body}")]
    Status { status: u16, body: String },

    #[error("invalid URL: {0}")]
    Url(#[from] url::ParseError),

    #[error("base URL cannot carry a path")]
    InvalidBaseUrl,
}

/// Restaurant search service.
#[async_trait]
pub trait PlacesSearch: Send + Sync {
    /// Restaurants within `radius_m` meters of `center`, in service ranking order.
    async fn search_nearby(
        &self,
        center: Coordinate,
        radius_m: f64,
    ) -> Result<Vec<PlaceDescriptor>, PlacesError>;

    /// Free-text restaurant search, optionally biased toward a location.
    async fn search_text(
        &self,
        query: &str,
        bias: Option<Coordinate>,
    ) -> Result<Vec<PlaceDescriptor>, PlacesError>;
}

/// Forward and reverse geocoding service.
#[async_trait]
pub trait Geocoder: Send + Sync {
    /// Place names at a point, best match first.
    async fn reverse(&self, point: Coordinate) -> Result<Vec<PlaceDescriptor>, PlacesError>;

    /// Points of interest matching a query.
    async fn search(&self, query: &str) -> Result<Vec<PlaceDescriptor>, PlacesError>;
}
