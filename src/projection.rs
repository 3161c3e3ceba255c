//! Linear mapping from geographic coordinates into a pixel rectangle.
//!
//! Longitude grows to the right. Latitude is flipped so that north renders
//! toward the top of the image, where pixel `y` is smallest.

use crate::{BoundingRegion, GpsPoint, OverlayError, Result};

/// A point in pixel space (origin top-left, `y` grows downward).
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "json", derive(serde::Serialize, serde::Deserialize))]
pub struct PixelPoint {
    pub x: f64,
    pub y: f64,
}

impl PixelPoint {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

impl From<PixelPoint> for geo::Coord<f64> {
    fn from(p: PixelPoint) -> Self {
        geo::Coord { x: p.x, y: p.y }
    }
}

impl From<geo::Coord<f64>> for PixelPoint {
    fn from(c: geo::Coord<f64>) -> Self {
        Self::new(c.x, c.y)
    }
}

/// An axis-aligned pixel rectangle.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "json", derive(serde::Serialize, serde::Deserialize))]
pub struct PixelRect {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl PixelRect {
    pub fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self { x, y, width, height }
    }

    /// Shrink by `px` on every side.
    pub fn inset(&self, px: f64) -> Self {
        Self::new(
            self.x + px,
            self.y + px,
            (self.width - 2.0 * px).max(0.0),
            (self.height - 2.0 * px).max(0.0),
        )
    }

    pub fn right(&self) -> f64 {
        self.x + self.width
    }

    pub fn bottom(&self) -> f64 {
        self.y + self.height
    }

    /// Inclusive containment test.
    pub fn contains(&self, p: &PixelPoint) -> bool {
        p.x >= self.x && p.x <= self.right() && p.y >= self.y && p.y <= self.bottom()
    }
}

/// Project a geographic point into `target` using `region` as the extent.
///
/// # Errors
///
/// [`OverlayError::DegenerateRegion`] when the region has zero width or height.
///
/// # Example
/// ```
/// use track_overlay::{project, BoundingRegion, GpsPoint, PixelRect};
///
/// let region = BoundingRegion { min_lat: 52.0, max_lat: 52.1, min_lon: 13.0, max_lon: 13.1 };
/// let target = PixelRect::new(10.0, 20.0, 200.0, 100.0);
///
/// // North-west corner lands on the top-left of the rectangle
/// let p = project(GpsPoint::new(52.1, 13.0), &region, &target).unwrap();
/// assert!((p.x - 10.0).abs() < 1e-9 && (p.y - 20.0).abs() < 1e-9);
/// ```
pub fn project(point: GpsPoint, region: &BoundingRegion, target: &PixelRect) -> Result<PixelPoint> {
    Projector::new(*region, *target).map(|projector| projector.project(point))
}

/// A validated region-to-rectangle mapping.
///
/// Construction checks the region once, so projecting every track sample
/// of a minimap needs no per-point error handling.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Projector {
    region: BoundingRegion,
    target: PixelRect,
}

impl Projector {
    /// # Errors
    ///
    /// [`OverlayError::DegenerateRegion`] when `region.width()` or
    /// `region.height()` is zero.
    pub fn new(region: BoundingRegion, target: PixelRect) -> Result<Self> {
        if region.is_degenerate() {
            return Err(OverlayError::DegenerateRegion);
        }
        Ok(Self { region, target })
    }

    pub fn region(&self) -> &BoundingRegion {
        &self.region
    }

    pub fn target(&self) -> &PixelRect {
        &self.target
    }

    pub fn project(&self, point: GpsPoint) -> PixelPoint {
        let fx = (point.longitude - self.region.min_lon) / self.region.width();
        let fy = (point.latitude - self.region.min_lat) / self.region.height();
        PixelPoint::new(
            fx * self.target.width + self.target.x,
            (1.0 - fy) * self.target.height + self.target.y,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn approx_eq(a: f64, b: f64, epsilon: f64) -> bool {
        (a - b).abs() < epsilon
    }

    fn region() -> BoundingRegion {
        BoundingRegion { min_lat: 52.0, max_lat: 52.1, min_lon: 13.0, max_lon: 13.1 }
    }

    fn assert_point(p: PixelPoint, x: f64, y: f64) {
        assert!(approx_eq(p.x, x, 1e-9) && approx_eq(p.y, y, 1e-9), "got {:?}, want ({}, {})", p, x, y);
    }

    #[test]
    fn test_corners_map_to_rect_corners() {
        let target = PixelRect::new(100.0, 50.0, 300.0, 150.0);
        let projector = Projector::new(region(), target).unwrap();

        assert_point(projector.project(GpsPoint::new(52.1, 13.0)), 100.0, 50.0); // NW
        assert_point(projector.project(GpsPoint::new(52.1, 13.1)), 400.0, 50.0); // NE
        assert_point(projector.project(GpsPoint::new(52.0, 13.0)), 100.0, 200.0); // SW
        assert_point(projector.project(GpsPoint::new(52.0, 13.1)), 400.0, 200.0); // SE
    }

    #[test]
    fn test_interior_point_stays_inside() {
        let target = PixelRect::new(0.0, 0.0, 288.0, 144.0);
        let projector = Projector::new(region(), target).unwrap();
        let p = projector.project(GpsPoint::new(52.03, 13.07));
        assert!(p.x > target.x && p.x < target.right());
        assert!(p.y > target.y && p.y < target.bottom());
    }

    #[test]
    fn test_north_is_up() {
        let projector = Projector::new(region(), PixelRect::new(0.0, 0.0, 100.0, 100.0)).unwrap();
        let south = projector.project(GpsPoint::new(52.02, 13.05));
        let north = projector.project(GpsPoint::new(52.08, 13.05));
        assert!(north.y < south.y);
    }

    #[test]
    fn test_degenerate_longitude() {
        let flat = BoundingRegion { min_lat: 52.0, max_lat: 52.1, min_lon: 13.0, max_lon: 13.0 };
        let target = PixelRect::new(0.0, 0.0, 10.0, 10.0);
        assert_eq!(project(GpsPoint::new(52.05, 13.0), &flat, &target), Err(OverlayError::DegenerateRegion));
    }

    #[test]
    fn test_degenerate_latitude() {
        let flat = BoundingRegion { min_lat: 52.0, max_lat: 52.0, min_lon: 13.0, max_lon: 13.1 };
        assert_eq!(
            Projector::new(flat, PixelRect::new(0.0, 0.0, 10.0, 10.0)),
            Err(OverlayError::DegenerateRegion)
        );
    }

    #[test]
    fn test_rect_inset_and_contains() {
        let rect = PixelRect::new(10.0, 10.0, 100.0, 50.0);
        let inner = rect.inset(5.0);
        assert_eq!(inner, PixelRect::new(15.0, 15.0, 90.0, 40.0));
        assert!(rect.contains(&PixelPoint::new(110.0, 60.0)));
        assert!(!inner.contains(&PixelPoint::new(12.0, 30.0)));
        // Inset never produces negative extents
        assert_eq!(PixelRect::new(0.0, 0.0, 4.0, 4.0).inset(5.0).width, 0.0);
    }
}
