//! Table boundary and the gaps cut into it.
//!
//! A gap is a closed interval along one side. A body whose predicted span
//! along that side lies entirely inside a gap crosses the side without
//! bouncing (this is how pockets let balls leave the playing area).
//!
//! ```text
//!        gap [120, 150] on the north side
//!   ┌──────────┐   ┌──────────────────┐
//!   │          ╵   ╵                  │
//!   │        ●  ──►  crosses freely   │
//!   │                                 │
//! ```

use serde::{Deserialize, Serialize};

use crate::types::{Rect, Side, Vec2};

/// Closed range along one side of the boundary.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GapInterval {
    pub start: f64,
    pub end: f64,
}

impl GapInterval {
    pub fn new(start: f64, end: f64) -> Self {
        Self {
            start: start.min(end),
            end: start.max(end),
        }
    }

    /// Whether `[start, start + len]` fits inside the gap.
    pub fn admits(&self, start: f64, len: f64) -> bool {
        start >= self.start && start + len <= self.end
    }
}

/// Gap intervals for each side of the boundary.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GapRegistry {
    sides: [Vec<GapInterval>; 4],
}

impl GapRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, side: Side, gap: GapInterval) {
        let gaps = &mut self.sides[side.index()];
        if !gaps.contains(&gap) {
            gaps.push(gap);
        }
    }

    /// Fold another registry's gaps into this one (pockets contribute theirs
    /// to the table-wide registry).
    pub fn merge(&mut self, other: &GapRegistry) {
        for side in Side::ALL {
            for gap in other.gaps(side) {
                self.add(side, *gap);
            }
        }
    }

    pub fn gaps(&self, side: Side) -> &[GapInterval] {
        &self.sides[side.index()]
    }

    pub fn is_empty(&self) -> bool {
        self.sides.iter().all(Vec::is_empty)
    }

    pub fn allows_passage(&self, side: Side, start: f64, len: f64) -> bool {
        self.gaps(side).iter().any(|g| g.admits(start, len))
    }
}

/// The bounds rectangle together with its gaps.
#[derive(Debug, Clone, PartialEq)]
pub struct Boundary {
    pub bounds: Rect,
    pub gaps: GapRegistry,
}

impl Boundary {
    pub fn new(bounds: Rect) -> Self {
        Self {
            bounds,
            gaps: GapRegistry::new(),
        }
    }

    pub fn with_gaps(bounds: Rect, gaps: GapRegistry) -> Self {
        Self { bounds, gaps }
    }

    /// Sides a body with predicted bounds `next` would bounce off.
    ///
    /// At most one of east/west and one of south/north is reported; east is
    /// checked before west and south before north.
    pub fn crossings(&self, next: &Rect) -> (Option<Side>, Option<Side>) {
        let b = &self.bounds;
        let horizontal = if next.right() > b.right() {
            Some(Side::East)
        } else if next.left() < b.left() {
            Some(Side::West)
        } else {
            None
        };
        let vertical = if next.bottom() > b.bottom() {
            Some(Side::South)
        } else if next.top() < b.top() {
            Some(Side::North)
        } else {
            None
        };
        (
            horizontal.filter(|side| !self.passes_through_gap(*side, next)),
            vertical.filter(|side| !self.passes_through_gap(*side, next)),
        )
    }

    /// Whether the body's span along `side` fits inside one of its gaps.
    pub fn passes_through_gap(&self, side: Side, next: &Rect) -> bool {
        let (start, len) = if side.is_vertical() {
            (next.y, next.height)
        } else {
            (next.x, next.width)
        };
        self.gaps.allows_passage(side, start, len)
    }
}

/// Wall response: the axis perpendicular to `side` is negated and scaled by
/// `restitution`; the parallel axis is untouched.
pub fn reflect(velocity: Vec2, side: Side, restitution: f64) -> Vec2 {
    if side.is_vertical() {
        Vec2::new(velocity.x * -restitution, velocity.y)
    } else {
        Vec2::new(velocity.x, velocity.y * -restitution)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn boundary() -> Boundary {
        Boundary::new(Rect::new(100.0, 89.0, 700.0, 351.0))
    }

    #[test]
    fn test_no_crossing_inside() {
        let b = boundary();
        let next = Rect::new(200.0, 200.0, 25.0, 25.0);
        assert_eq!(b.crossings(&next), (None, None));
    }

    #[test]
    fn test_corner_crossing_reports_both_axes() {
        let b = boundary();
        let next = Rect::new(98.0, 87.0, 25.0, 25.0);
        assert_eq!(b.crossings(&next), (Some(Side::West), Some(Side::North)));

        let next = Rect::new(780.0, 420.0, 25.0, 25.0);
        assert_eq!(b.crossings(&next), (Some(Side::East), Some(Side::South)));
    }

    #[test]
    fn test_gap_suppresses_crossing() {
        let mut b = boundary();
        b.gaps.add(Side::North, GapInterval::new(429.0, 467.0));

        let through = Rect::new(435.0, 85.0, 25.0, 25.0);
        assert_eq!(b.crossings(&through), (None, None));

        // Straddles the gap edge: still bounces
        let partial = Rect::new(450.0, 85.0, 25.0, 25.0);
        assert_eq!(b.crossings(&partial), (None, Some(Side::North)));
    }

    #[test]
    fn test_reflect_only_touches_perpendicular_axis() {
        let v = Vec2::new(-5.0, 2.0);
        let r = reflect(v, Side::West, 0.74);
        assert!((r.x - 3.7).abs() < 1e-12);
        assert_eq!(r.y, 2.0);

        let r = reflect(Vec2::new(1.5, 4.0), Side::South, 0.5);
        assert_eq!(r.x, 1.5);
        assert_eq!(r.y, -2.0);
    }

    #[test]
    fn test_merge_deduplicates() {
        let mut a = GapRegistry::new();
        a.add(Side::West, GapInterval::new(0.0, 10.0));
        let mut b = GapRegistry::new();
        b.add(Side::West, GapInterval::new(0.0, 10.0));
        b.add(Side::East, GapInterval::new(5.0, 15.0));
        a.merge(&b);
        assert_eq!(a.gaps(Side::West).len(), 1);
        assert_eq!(a.gaps(Side::East).len(), 1);
    }
}
