//! Narrow-phase shapes.
//!
//! Every body is placed by its bounding rectangle; the [`Shape`] says what
//! actually occupies that rectangle. Rectangles against rectangles are
//! resolved exactly; any pair involving an ellipse or polygon is lowered to
//! `geo` polygons and intersected there.
//!
//! ```text
//!   Rect            Ellipse           Polygon (relative to bounds origin)
//!  ┌──────┐        ┌──────┐          ┌──────┐
//!  │██████│        │ ████ │          │  ██  │
//!  │██████│        │██████│          │ ████ │
//!  │██████│        │ ████ │          │██████│
//!  └──────┘        └──────┘          └──────┘
//! ```

use geo::{Area, BooleanOps, BoundingRect, Contains, LineString, Point, Polygon};
use serde::{Deserialize, Serialize};

use crate::types::{constants, Rect, Vec2};

/// Intersections smaller than this are treated as touching, not overlapping.
const MIN_OVERLAP_AREA: f64 = 1e-9;

/// Outline of a body inside its bounding rectangle.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum Shape {
    /// Fills the bounding rectangle.
    #[default]
    Rect,
    /// Axis-aligned ellipse inscribed in the bounding rectangle.
    Ellipse,
    /// Arbitrary simple polygon; vertices are offsets from the bounds origin.
    Polygon { vertices: Vec<Vec2> },
}

/// Result of intersecting two shapes.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Overlap {
    pub area: f64,
    /// Bounding rectangle of the intersection region
    pub bounds: Rect,
}

impl Shape {
    /// Polygon built from absolute vertices, stored relative to `origin`.
    pub fn polygon_at(origin: Vec2, vertices: &[Vec2]) -> Self {
        Shape::Polygon {
            vertices: vertices.iter().map(|v| *v - origin).collect(),
        }
    }

    /// Axis-aligned rectangle covering the shape when placed at `bounds`.
    ///
    /// Polygons may reach outside their bounds (pocket capture regions do).
    pub fn extent(&self, bounds: &Rect) -> Rect {
        match self {
            Shape::Rect | Shape::Ellipse => *bounds,
            Shape::Polygon { vertices } => {
                if vertices.is_empty() {
                    return Rect::new(bounds.x, bounds.y, 0.0, 0.0);
                }
                let mut min = Vec2::new(f64::INFINITY, f64::INFINITY);
                let mut max = Vec2::new(f64::NEG_INFINITY, f64::NEG_INFINITY);
                for v in vertices {
                    min.x = min.x.min(v.x);
                    min.y = min.y.min(v.y);
                    max.x = max.x.max(v.x);
                    max.y = max.y.max(v.y);
                }
                Rect::new(bounds.x + min.x, bounds.y + min.y, max.x - min.x, max.y - min.y)
            }
        }
    }

    /// Lower the shape to a `geo` polygon placed at `bounds`.
    pub fn to_polygon(&self, bounds: &Rect) -> Polygon<f64> {
        let coords: Vec<(f64, f64)> = match self {
            Shape::Rect => vec![
                (bounds.left(), bounds.top()),
                (bounds.right(), bounds.top()),
                (bounds.right(), bounds.bottom()),
                (bounds.left(), bounds.bottom()),
            ],
            Shape::Ellipse => {
                let c = bounds.center();
                let rx = bounds.width / 2.0;
                let ry = bounds.height / 2.0;
                let n = constants::ELLIPSE_SEGMENTS;
                (0..n)
                    .map(|i| {
                        let theta = std::f64::consts::TAU * (i as f64) / (n as f64);
                        (c.x + rx * theta.cos(), c.y + ry * theta.sin())
                    })
                    .collect()
            }
            Shape::Polygon { vertices } => vertices
                .iter()
                .map(|v| (bounds.x + v.x, bounds.y + v.y))
                .collect(),
        };
        Polygon::new(LineString::from(coords), vec![])
    }

    /// Whether `point` lies strictly inside the shape placed at `bounds`.
    pub fn contains_point(&self, bounds: &Rect, point: Vec2) -> bool {
        match self {
            Shape::Rect => bounds.contains(point),
            Shape::Ellipse => {
                let rx = bounds.width / 2.0;
                let ry = bounds.height / 2.0;
                if rx <= 0.0 || ry <= 0.0 {
                    return false;
                }
                let d = point - bounds.center();
                (d.x / rx).powi(2) + (d.y / ry).powi(2) < 1.0
            }
            Shape::Polygon { .. } => self
                .to_polygon(bounds)
                .contains(&Point::new(point.x, point.y)),
        }
    }
}

/// Intersect two placed shapes.
///
/// Returns `None` when the shapes are disjoint or only share an edge.
pub fn overlap(a: &Shape, a_bounds: &Rect, b: &Shape, b_bounds: &Rect) -> Option<Overlap> {
    let a_extent = a.extent(a_bounds);
    let b_extent = b.extent(b_bounds);
    let coarse = a_extent.intersection(&b_extent)?;

    if let (Shape::Rect, Shape::Rect) = (a, b) {
        return Some(Overlap {
            area: coarse.area(),
            bounds: coarse,
        });
    }

    let region = a.to_polygon(a_bounds).intersection(&b.to_polygon(b_bounds));
    let area = region.unsigned_area();
    if area < MIN_OVERLAP_AREA {
        return None;
    }
    let rect = region.bounding_rect()?;
    Some(Overlap {
        area,
        bounds: Rect::new(rect.min().x, rect.min().y, rect.width(), rect.height()),
    })
}

/// Shorthand for `overlap(..).is_some()`.
pub fn overlaps(a: &Shape, a_bounds: &Rect, b: &Shape, b_bounds: &Rect) -> bool {
    overlap(a, a_bounds, b, b_bounds).is_some()
}

// =============================================================================
// Tests
// =============================================================================
