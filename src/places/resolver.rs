//! Resolves a map point to the restaurant (or place) the user most likely
//! meant.
//!
//! Strategies run in order and the first one producing a descriptor wins.
//! A failing strategy counts as "no result". When every strategy comes up
//! empty the raw coordinates are returned, so resolution itself never fails.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use super::{Coordinate, Geocoder, PlaceDescriptor, PlacesError, PlacesSearch};
use crate::config::PlacesConfig;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResolutionSource {
    Nearby,
    WideSearch,
    ReverseGeocode,
    Coordinates,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResolvedLocation {
    pub source: ResolutionSource,
    pub place: PlaceDescriptor,
}

#[async_trait]
pub trait ResolveStrategy: Send + Sync {
    fn source(&self) -> ResolutionSource;

    async fn resolve(&self, point: Coordinate) -> Result<Option<PlaceDescriptor>, PlacesError>;
}

/// Small-radius search; trusts the service's ranking.
pub struct NearbyFirst {
    pub places: Arc<dyn PlacesSearch>,
    pub radius_m: f64,
}

#[async_trait]
impl ResolveStrategy for NearbyFirst {
    fn source(&self) -> ResolutionSource {
        ResolutionSource::Nearby
    }

    async fn resolve(&self, point: Coordinate) -> Result<Option<PlaceDescriptor>, PlacesError> {
        let results = self.places.search_nearby(point, self.radius_m).await?;
        Ok(results.into_iter().next())
    }
}

/// Wider search; picks the result closest to the point.
pub struct NearbyClosest {
    pub places: Arc<dyn PlacesSearch>,
    pub radius_m: f64,
}

#[async_trait]
impl ResolveStrategy for NearbyClosest {
    fn source(&self) -> ResolutionSource {
        ResolutionSource::WideSearch
    }

    async fn resolve(&self, point: Coordinate) -> Result<Option<PlaceDescriptor>, PlacesError> {
        let results = self.places.search_nearby(point, self.radius_m).await?;
        Ok(closest(results, point))
    }
}

/// Names the point through reverse geocoding.
pub struct ReverseGeocode {
    pub geocoder: Arc<dyn Geocoder>,
}

#[async_trait]
impl ResolveStrategy for ReverseGeocode {
    fn source(&self) -> ResolutionSource {
        ResolutionSource::ReverseGeocode
    }

    async fn resolve(&self, point: Coordinate) -> Result<Option<PlaceDescriptor>, PlacesError> {
        let features = self.geocoder.reverse(point).await?;
        Ok(features
            .into_iter()
            .find(|f| !f.address.trim().is_empty())
            .map(|f| PlaceDescriptor::basic(f.id, f.name, f.address, point)))
    }
}

/// Element nearest to `point` by planar distance. Equal distances keep the
/// earlier element.
pub fn closest(candidates: Vec<PlaceDescriptor>, point: Coordinate) -> Option<PlaceDescriptor> {
    candidates
        .into_iter()
        .map(|c| (c.location.planar_distance(&point), c))
        .reduce(|best, next| if next.0 < best.0 { next } else { best })
        .map(|(_, c)| c)
}

/// Descriptor for a point nothing else could name.
pub fn coordinates_descriptor(point: Coordinate) -> PlaceDescriptor {
    let label = format!("{:.4}, {:.4}", point.lat, point.lng);
    PlaceDescriptor::basic(
        format!("coords:{:.4},{:.4}", point.lat, point.lng),
        "Selected location",
        label,
        point,
    )
}

pub struct Resolver {
    strategies: Vec<Box<dyn ResolveStrategy>>,
}

impl Resolver {
    pub fn new(
        places: Arc<dyn PlacesSearch>,
        geocoder: Arc<dyn Geocoder>,
        config: &PlacesConfig,
    ) -> Self {
        Self::with_strategies(vec![
            Box::new(NearbyFirst {
                places: places.clone(),
                radius_m: config.nearby_radius_m,
            }),
            Box::new(NearbyClosest {
                places,
                radius_m: config.wide_radius_m,
            }),
            Box::new(ReverseGeocode { geocoder }),
        ])
    }

    pub fn with_strategies(strategies: Vec<Box<dyn ResolveStrategy>>) -> Self {
        Self { strategies }
    }

    pub async fn resolve(&self, point: Coordinate) -> ResolvedLocation {
        for strategy in &self.strategies {
            let source = strategy.source();
            match strategy.resolve(point).await {
                Ok(Some(place)) => {
                    tracing::debug!(?source, id = %place.id, "Resolved map point");
                    return ResolvedLocation { source, place };
                }
                Ok(None) => {
                    tracing::debug!(?source, "No result, falling through");
                }
                Err(e) => {
                    tracing::warn!(?source, "Lookup failed, falling through: {}", e);
                }
            }
        }

        ResolvedLocation {
            source: ResolutionSource::Coordinates,
            place: coordinates_descriptor(point),
        }
    }
}
