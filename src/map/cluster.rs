use std::f64::consts::PI;

use super::ClusterOptions;
use crate::places::Coordinate;

/// Pixel size of one map tile; the map client renders 512px tiles.
pub const TILE_SIZE: f64 = 512.0;

const MAX_LATITUDE: f64 = 85.051_128_78;
/// Deepest zoom the map client renders.
pub const MAX_ZOOM_LEVEL: u8 = 24;

/// Web Mercator position in [0, 1] x [0, 1], origin top-left.
pub fn project(location: Coordinate) -> (f64, f64) {
    let lat = location.lat.clamp(-MAX_LATITUDE, MAX_LATITUDE).to_radians();
    let x = location.lng / 360.0 + 0.5;
    let y = 0.5 - (PI / 4.0 + lat / 2.0).tan().ln() / (2.0 * PI);
    (x, y)
}

pub fn unproject(x: f64, y: f64) -> Coordinate {
    let lng = (x - 0.5) * 360.0;
    let lat = (2.0 * ((0.5 - y) * 2.0 * PI).exp().atan() - PI / 2.0).to_degrees();
    Coordinate::new(lat, lng)
}

/// Width of the whole world in pixels at `zoom`.
pub fn world_size(zoom: f64) -> f64 {
    TILE_SIZE * 2f64.powf(zoom)
}

pub fn zoom_level(zoom: f64) -> u8 {
    if !zoom.is_finite() || zoom <= 0.0 {
        return 0;
    }
    (zoom.floor() as u8).min(MAX_ZOOM_LEVEL)
}

/// Cluster ids carry the seed marker index and the zoom level they were
/// computed at.
pub fn encode_id(seed: usize, level: u8) -> u64 {
    ((seed as u64) << 5) | (u64::from(level) + 1)
}

pub fn decode_id(id: u64) -> Option<(usize, u8)> {
    let level = (id & 0x1f).checked_sub(1)?;
    Some(((id >> 5) as usize, level as u8))
}

#[derive(Debug, Clone, PartialEq)]
pub struct Group {
    pub id: u64,
    /// Indices into the clustered slice, seed first
    pub members: Vec<usize>,
    pub center: Coordinate,
}

/// Greedy single-pass clustering at an integer zoom level.
///
/// Markers are visited in input order; each unassigned marker seeds a group
/// and absorbs every later unassigned marker within `radius_px`.
pub fn cluster(points: &[Coordinate], level: u8, radius_px: f64) -> Vec<Group> {
    let size = world_size(f64::from(level));
    let projected: Vec<(f64, f64)> = points
        .iter()
        .map(|p| {
            let (x, y) = project(*p);
            (x * size, y * size)
        })
        .collect();

    let mut assigned = vec![false; points.len()];
    let mut groups = Vec::new();

    for seed in 0..points.len() {
        if assigned[seed] {
            continue;
        }
        assigned[seed] = true;
        let (sx, sy) = projected[seed];
        let mut members = vec![seed];

        for other in (seed + 1)..points.len() {
            if assigned[other] {
                continue;
            }
            let (ox, oy) = projected[other];
            if ((ox - sx).powi(2) + (oy - sy).powi(2)).sqrt() <= radius_px {
                assigned[other] = true;
                members.push(other);
            }
        }

        let n = members.len() as f64;
        let (cx, cy) = members.iter().fold((0.0, 0.0), |(ax, ay), &i| {
            (ax + projected[i].0 / n, ay + projected[i].1 / n)
        });

        groups.push(Group {
            id: encode_id(seed, level),
            members,
            center: unproject(cx / size, cy / size),
        });
    }

    groups
}

/// Lowest zoom above the group's level at which its members no longer form
/// a single group. Past the clustering limit every marker stands alone.
pub fn expansion_zoom(points: &[Coordinate], group: &Group, options: ClusterOptions) -> u8 {
    let start = decode_id(group.id).map(|(_, level)| level).unwrap_or(0);
    let members: Vec<Coordinate> = group.members.iter().map(|&i| points[i]).collect();

    for level in (start + 1)..=options.max_zoom {
        if cluster(&members, level, options.radius).len() > 1 {
            return level;
        }
    }
    options.max_zoom.saturating_add(1)
}
