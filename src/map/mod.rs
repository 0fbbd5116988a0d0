//! Marker layers for the map page.
//!
//! Two layers are rendered: restaurants (clustered up to
//! `cluster_max_zoom`) and search results (never clustered). Output is
//! GeoJSON the map client feeds straight into its sources.

pub mod click;
pub mod cluster;
pub mod viewport;

use serde::{Deserialize, Serialize};

use crate::config::MapConfig;
use crate::places::{Coordinate, PlaceDescriptor};

pub use click::{ClickOutcome, ClickTarget};
pub use viewport::{Pixel, Viewport};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Marker {
    pub id: String,
    pub location: Coordinate,
    pub label: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rating: Option<f64>,
}

impl Marker {
    pub fn new(id: impl Into<String>, location: Coordinate, label: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            location,
            label: label.into(),
            detail: None,
            rating: None,
        }
    }
}

impl From<&PlaceDescriptor> for Marker {
    fn from(place: &PlaceDescriptor) -> Self {
        Self {
            id: place.id.clone(),
            location: place.location,
            label: place.name.clone(),
            detail: Some(place.address.clone()),
            rating: place.rating,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ClusterOptions {
    /// Highest zoom at which markers are still clustered
    pub max_zoom: u8,
    /// Cluster radius in screen pixels
    pub radius: f64,
}

impl Default for ClusterOptions {
    fn default() -> Self {
        Self {
            max_zoom: 14,
            radius: 50.0,
        }
    }
}

impl From<&MapConfig> for ClusterOptions {
    fn from(config: &MapConfig) -> Self {
        Self {
            max_zoom: config.cluster_max_zoom,
            radius: config.cluster_radius,
        }
    }
}

// -- GeoJSON --

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Geometry {
    Point { coordinates: [f64; 2] },
}

impl Geometry {
    pub fn point(location: Coordinate) -> Self {
        Geometry::Point {
            coordinates: [location.lng, location.lat],
        }
    }

    pub fn coordinate(&self) -> Coordinate {
        match self {
            Geometry::Point {
                coordinates: [lng, lat],
            } => Coordinate::new(*lat, *lng),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FeatureProperties {
    Cluster {
        cluster: bool,
        cluster_id: u64,
        point_count: usize,
        point_count_abbreviated: String,
    },
    #[serde(rename_all = "camelCase")]
    SearchResult {
        restaurant_id: String,
        restaurant_name: String,
        address: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        rating: Option<f64>,
    },
    #[serde(rename_all = "camelCase")]
    Restaurant {
        restaurant_id: String,
        restaurant_name: String,
        post_count: usize,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename = "Feature")]
pub struct Feature {
    pub geometry: Geometry,
    pub properties: FeatureProperties,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename = "FeatureCollection")]
pub struct FeatureCollection {
    pub features: Vec<Feature>,
}

/// Both layers rendered for one zoom level.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RenderedLayers {
    pub zoom: f64,
    pub restaurants: FeatureCollection,
    pub search_results: FeatureCollection,
}

pub struct MarkerLayer {
    markers: Vec<Marker>,
    search_results: Vec<Marker>,
    options: ClusterOptions,
}

impl MarkerLayer {
    pub fn new(markers: Vec<Marker>, search_results: Vec<Marker>, options: ClusterOptions) -> Self {
        Self {
            markers,
            search_results,
            options,
        }
    }

    pub fn options(&self) -> ClusterOptions {
        self.options
    }

    pub fn markers(&self) -> &[Marker] {
        &self.markers
    }

    pub fn search_results(&self) -> &[Marker] {
        &self.search_results
    }

    pub fn render(&self, zoom: f64) -> RenderedLayers {
        RenderedLayers {
            zoom,
            restaurants: self.render_restaurants(zoom),
            search_results: FeatureCollection {
                features: self.search_results.iter().map(search_feature).collect(),
            },
        }
    }

    fn render_restaurants(&self, zoom: f64) -> FeatureCollection {
        let level = cluster::zoom_level(zoom);
        if level > self.options.max_zoom {
            return FeatureCollection {
                features: self.markers.iter().map(restaurant_feature).collect(),
            };
        }

        let points: Vec<Coordinate> = self.markers.iter().map(|m| m.location).collect();
        let features = cluster::cluster(&points, level, self.options.radius)
            .into_iter()
            .map(|group| {
                if group.members.len() == 1 {
                    restaurant_feature(&self.markers[group.members[0]])
                } else {
                    Feature {
                        geometry: Geometry::point(group.center),
                        properties: FeatureProperties::Cluster {
                            cluster: true,
                            cluster_id: group.id,
                            point_count: group.members.len(),
                            point_count_abbreviated: abbreviate(group.members.len()),
                        },
                    }
                }
            })
            .collect();

        FeatureCollection { features }
    }

    /// Zoom at which the given cluster splits, with the cluster's center.
    /// `None` when the id does not name a cluster of this layer.
    pub fn cluster_expansion(&self, cluster_id: u64) -> Option<(Coordinate, u8)> {
        let (seed, level) = cluster::decode_id(cluster_id)?;
        if level > self.options.max_zoom || seed >= self.markers.len() {
            return None;
        }
        let points: Vec<Coordinate> = self.markers.iter().map(|m| m.location).collect();
        let group = cluster::cluster(&points, level, self.options.radius)
            .into_iter()
            .find(|g| g.id == cluster_id && g.members.len() > 1)?;
        let zoom = cluster::expansion_zoom(&points, &group, self.options);
        Some((group.center, zoom))
    }
}

fn restaurant_feature(marker: &Marker) -> Feature {
    Feature {
        geometry: Geometry::point(marker.location),
        properties: FeatureProperties::Restaurant {
            restaurant_id: marker.id.clone(),
            restaurant_name: marker.label.clone(),
            post_count: 1,
        },
    }
}

fn search_feature(marker: &Marker) -> Feature {
    Feature {
        geometry: Geometry::point(marker.location),
        properties: FeatureProperties::SearchResult {
            restaurant_id: marker.id.clone(),
            restaurant_name: marker.label.clone(),
            address: marker.detail.clone().unwrap_or_default(),
            rating: marker.rating,
        },
    }
}

/// `1234` → `"1.2k"`, matching the label the map client shows on clusters.
fn abbreviate(count: usize) -> String {
    if count >= 10_000 {
        format!("{}k", count / 1000)
    } else if count >= 1000 {
        format!("{:.1}k", count as f64 / 1000.0)
    } else {
        count.to_string()
    }
}
