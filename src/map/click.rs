use serde::{Deserialize, Serialize};

use super::{Feature, FeatureProperties, MarkerLayer, Pixel, RenderedLayers, Viewport};
use crate::places::Coordinate;

/// Circle radii the map client draws, in pixels.
const POINT_RADIUS: f64 = 8.0;
const SEARCH_RESULT_RADIUS: f64 = 10.0;

fn cluster_radius(point_count: usize) -> f64 {
    match point_count {
        0..=99 => 20.0,
        100..=749 => 30.0,
        _ => 40.0,
    }
}

/// The rendered feature under the cursor.
#[derive(Debug, Clone, PartialEq)]
pub enum ClickTarget {
    Point {
        restaurant_id: String,
        coordinate: Coordinate,
        search_result: bool,
    },
    Cluster {
        cluster_id: u64,
        coordinate: Coordinate,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ClickOutcome {
    /// A restaurant marker was clicked.
    #[serde(rename_all = "camelCase")]
    Select {
        restaurant_id: String,
        coordinate: Coordinate,
        pixel: Pixel,
        search_result: bool,
    },
    /// A cluster was clicked; the map should animate here.
    EaseTo { center: Coordinate, zoom: f64 },
    /// Nothing was under the cursor.
    Map { coordinate: Coordinate, pixel: Pixel },
}

/// Topmost feature within reach of `pixel`. Search results sit above
/// restaurant points, which sit above clusters; later features in a layer
/// are drawn over earlier ones.
pub fn hit_test(layers: &RenderedLayers, viewport: &Viewport, pixel: Pixel) -> Option<ClickTarget> {
    let hit = |feature: &Feature, radius: f64| {
        viewport
            .project(feature.geometry.coordinate())
            .distance(&pixel)
            <= radius
    };

    for feature in layers.search_results.features.iter().rev() {
        if let FeatureProperties::SearchResult { restaurant_id, .. } = &feature.properties {
            if hit(feature, SEARCH_RESULT_RADIUS) {
                return Some(ClickTarget::Point {
                    restaurant_id: restaurant_id.clone(),
                    coordinate: feature.geometry.coordinate(),
                    search_result: true,
                });
            }
        }
    }

    for feature in layers.restaurants.features.iter().rev() {
        if let FeatureProperties::Restaurant { restaurant_id, .. } = &feature.properties {
            if hit(feature, POINT_RADIUS) {
                return Some(ClickTarget::Point {
                    restaurant_id: restaurant_id.clone(),
                    coordinate: feature.geometry.coordinate(),
                    search_result: false,
                });
            }
        }
    }

    for feature in layers.restaurants.features.iter().rev() {
        if let FeatureProperties::Cluster {
            cluster_id,
            point_count,
            ..
        } = &feature.properties
        {
            if hit(feature, cluster_radius(*point_count)) {
                return Some(ClickTarget::Cluster {
                    cluster_id: *cluster_id,
                    coordinate: feature.geometry.coordinate(),
                });
            }
        }
    }

    None
}

impl MarkerLayer {
    /// Resolves a click at `pixel` on a map showing this layer.
    pub fn click(&self, viewport: &Viewport, pixel: Pixel) -> ClickOutcome {
        let layers = self.render(viewport.zoom);
        match hit_test(&layers, viewport, pixel) {
            Some(ClickTarget::Point {
                restaurant_id,
                coordinate,
                search_result,
            }) => ClickOutcome::Select {
                restaurant_id,
                coordinate,
                pixel,
                search_result,
            },
            Some(ClickTarget::Cluster {
                cluster_id,
                coordinate,
            }) => match self.cluster_expansion(cluster_id) {
                Some((_, zoom)) => ClickOutcome::EaseTo {
                    center: coordinate,
                    zoom: f64::from(zoom),
                },
                None => ClickOutcome::Map {
                    coordinate: viewport.unproject(pixel),
                    pixel,
                },
            },
            None => ClickOutcome::Map {
                coordinate: viewport.unproject(pixel),
                pixel,
            },
        }
    }
}
