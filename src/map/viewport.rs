use serde::{Deserialize, Serialize};

use super::cluster::{project, unproject, world_size};
use crate::places::Coordinate;

/// Zoom the map settles at when focusing on search results.
pub const FOCUS_ZOOM: f64 = 15.0;
/// Screen padding kept around fitted results.
pub const FIT_PADDING: f64 = 50.0;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Pixel {
    pub x: f64,
    pub y: f64,
}

impl Pixel {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    pub fn distance(&self, other: &Pixel) -> f64 {
        ((self.x - other.x).powi(2) + (self.y - other.y).powi(2)).sqrt()
    }
}

/// What the user currently sees: a center, a zoom and the canvas size in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Viewport {
    pub center: Coordinate,
    pub zoom: f64,
    pub width: f64,
    pub height: f64,
}

impl Viewport {
    /// Screen position of a coordinate, origin at the canvas' top-left.
    pub fn project(&self, location: Coordinate) -> Pixel {
        let size = world_size(self.zoom);
        let (x, y) = project(location);
        let (cx, cy) = project(self.center);
        Pixel::new(
            (x - cx) * size + self.width / 2.0,
            (y - cy) * size + self.height / 2.0,
        )
    }

    pub fn unproject(&self, pixel: Pixel) -> Coordinate {
        let size = world_size(self.zoom);
        let (cx, cy) = project(self.center);
        unproject(
            cx + (pixel.x - self.width / 2.0) / size,
            cy + (pixel.y - self.height / 2.0) / size,
        )
    }

    /// Frame `locations`: a single location is centered at [`FOCUS_ZOOM`];
    /// several are fitted inside the padded canvas, never zooming past
    /// `max_zoom`. No locations leaves the viewport as it is.
    pub fn fit(&self, locations: &[Coordinate], padding: f64, max_zoom: f64) -> Viewport {
        match locations {
            [] => *self,
            [only] => Viewport {
                center: *only,
                zoom: FOCUS_ZOOM.min(max_zoom),
                ..*self
            },
            _ => {
                let (mut min_x, mut min_y) = (f64::MAX, f64::MAX);
                let (mut max_x, mut max_y) = (f64::MIN, f64::MIN);
                for location in locations {
                    let (x, y) = project(*location);
                    min_x = min_x.min(x);
                    min_y = min_y.min(y);
                    max_x = max_x.max(x);
                    max_y = max_y.max(y);
                }

                let avail_w = (self.width - 2.0 * padding).max(1.0);
                let avail_h = (self.height - 2.0 * padding).max(1.0);
                let span_x = max_x - min_x;
                let span_y = max_y - min_y;

                let zoom = if span_x <= 0.0 && span_y <= 0.0 {
                    max_zoom
                } else {
                    let scale_x = if span_x > 0.0 { avail_w / span_x } else { f64::MAX };
                    let scale_y = if span_y > 0.0 { avail_h / span_y } else { f64::MAX };
                    (scale_x.min(scale_y) / super::cluster::TILE_SIZE)
                        .log2()
                        .min(max_zoom)
                        .max(0.0)
                };

                Viewport {
                    center: unproject((min_x + max_x) / 2.0, (min_y + max_y) / 2.0),
                    zoom,
                    ..*self
                }
            }
        }
    }
}
