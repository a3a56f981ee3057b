//! Orthographic-style projection of geographic points onto the globe disc

use std::f32::consts::{PI, TAU};

/// Fraction of the radius, measured horizontally from the disc center,
/// inside which a projected point counts as front-facing.
pub const FRONT_BAND: f32 = 0.95;

/// A (latitude, longitude) pair in degrees.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct GeoPoint {
    pub lat: f32,
    pub lon: f32,
}

impl GeoPoint {
    /// Latitude is clamped to [-90, 90], longitude wrapped into [-180, 180].
    pub fn new(lat: f32, lon: f32) -> Self {
        Self {
            lat: lat.clamp(-90.0, 90.0),
            lon: wrap_longitude(lon),
        }
    }
}

/// A point in canvas pixel space.
#[derive(Clone, Copy, Debug, PartialEq, Default)]
pub struct ScreenPoint {
    pub x: f32,
    pub y: f32,
}

impl ScreenPoint {
    pub const fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    pub fn distance(self, other: ScreenPoint) -> f32 {
        ((self.x - other.x).powi(2) + (self.y - other.y).powi(2)).sqrt()
    }

    pub fn lerp(self, other: ScreenPoint, t: f32) -> ScreenPoint {
        ScreenPoint::new(self.x + (other.x - self.x) * t, self.y + (other.y - self.y) * t)
    }
}

fn wrap_longitude(lon: f32) -> f32 {
    if (-180.0..=180.0).contains(&lon) {
        return lon;
    }
    let wrapped = (lon + 180.0).rem_euclid(360.0) - 180.0;
    if wrapped == -180.0 && lon > 0.0 { 180.0 } else { wrapped }
}

/// Project a geographic point onto a disc of `radius` around `center`,
/// with the globe turned by `rotation` radians.
///
/// Far-hemisphere points still land inside the disc; callers cull them
/// with [`in_front_band`].
#[inline]
pub fn project(point: GeoPoint, center: ScreenPoint, radius: f32, rotation: f32) -> ScreenPoint {
    let lat_angle = -point.lat * PI / 180.0;
    let lon_angle = point.lon * PI / 180.0 - rotation;

    ScreenPoint {
        x: center.x + radius * lat_angle.cos() * lon_angle.sin(),
        y: center.y + radius * lat_angle.sin(),
    }
}

/// Horizontal band test approximating back-face culling.
#[inline]
pub fn in_front_band(p: ScreenPoint, center: ScreenPoint, radius: f32) -> bool {
    (p.x - center.x).abs() <= radius * FRONT_BAND
}

/// Wrap an angle into [0, TAU).
#[inline]
pub fn wrap_angle(angle: f32) -> f32 {
    let wrapped = angle.rem_euclid(TAU);
    if wrapped >= TAU { 0.0 } else { wrapped }
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPS: f32 = 1e-3;

    fn center() -> ScreenPoint {
        ScreenPoint::new(40.0, 25.0)
    }

    #[test]
    fn projection_stays_inside_disc_bounds() {
        let c = center();
        let r = 20.0;
        for lat in (-90..=90).step_by(15) {
            for lon in (-180..=180).step_by(20) {
                for rot in [-7.5f32, -1.0, 0.0, 0.3, 3.3, 12.0, 1000.0] {
                    let p = project(GeoPoint::new(lat as f32, lon as f32), c, r, rot);
                    assert!(p.x >= c.x - r - EPS && p.x <= c.x + r + EPS, "x out of range: {:?}", p);
                    assert!(p.y >= c.y - r - EPS && p.y <= c.y + r + EPS, "y out of range: {:?}", p);
                }
            }
        }
    }

    #[test]
    fn projection_is_periodic_in_rotation() {
        let c = center();
        for (lat, lon) in [(51.5, -0.1), (-33.9, 151.2), (0.0, 0.0), (89.0, 179.0)] {
            for rot in [0.0f32, 0.7, 2.0, -4.0] {
                let a = project(GeoPoint::new(lat, lon), c, 20.0, rot);
                let b = project(GeoPoint::new(lat, lon), c, 20.0, rot + TAU);
                assert!((a.x - b.x).abs() < EPS && (a.y - b.y).abs() < EPS);
            }
        }
    }

    #[test]
    fn origin_projects_to_center_without_rotation() {
        let p = project(GeoPoint::new(0.0, 0.0), center(), 20.0, 0.0);
        assert!((p.x - 40.0).abs() < EPS);
        assert!((p.y - 25.0).abs() < EPS);
    }

    #[test]
    fn north_is_up() {
        let p = project(GeoPoint::new(90.0, 0.0), center(), 20.0, 0.0);
        assert!((p.y - 5.0).abs() < EPS);
    }

    #[test]
    fn rotation_brings_longitude_to_center() {
        let p = project(GeoPoint::new(0.0, 90.0), center(), 20.0, std::f32::consts::FRAC_PI_2);
        assert!((p.x - 40.0).abs() < EPS);
    }

    #[test]
    fn front_band_rejects_limb_points() {
        let c = center();
        assert!(in_front_band(ScreenPoint::new(40.0, 0.0), c, 20.0));
        assert!(in_front_band(ScreenPoint::new(58.9, 0.0), c, 20.0));
        assert!(!in_front_band(ScreenPoint::new(59.8, 0.0), c, 20.0));
        assert!(!in_front_band(ScreenPoint::new(20.0, 0.0), c, 20.0));
    }

    #[test]
    fn geopoint_normalizes_input() {
        let p = GeoPoint::new(120.0, 190.0);
        assert_eq!(p.lat, 90.0);
        assert!((p.lon - -170.0).abs() < EPS);
        assert_eq!(GeoPoint::new(0.0, 180.0).lon, 180.0);
        assert_eq!(GeoPoint::new(0.0, 540.0).lon, 180.0);
    }

    #[test]
    fn wrap_angle_handles_negatives() {
        assert!((wrap_angle(-0.5) - (TAU - 0.5)).abs() < EPS);
        assert!((wrap_angle(TAU * 3.0 + 0.25) - 0.25).abs() < EPS);
    }
}
