//! Movable bodies on the table.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::policy::BodyType;
use crate::shape::{self, Overlap, Shape};
use crate::types::{Rect, Vec2};

/// Stable handle for an entity, assigned by the simulation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct EntityId(pub u32);

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// A body moving on the table.
///
/// `velocity` is a per-tick displacement, not a true velocity. Position and
/// velocity are only changed by the engine during a tick, or through the
/// mutation primitives below by whoever owns the entity between ticks.
#[derive(Debug, Clone, PartialEq)]
pub struct Entity {
    pub id: EntityId,
    pub bounds: Rect,
    pub velocity: Vec2,
    pub mass: f64,
    pub kind: BodyType,
    pub shape: Shape,
    /// Excluded from motion and collision while set
    pub suspended: bool,
    /// Rendering order only; has no effect on physics
    pub order: i32,
}

impl Entity {
    /// Create a resting, unit-mass rectangular body.
    pub fn new(kind: BodyType, bounds: Rect) -> Self {
        Self {
            id: EntityId(0),
            bounds,
            velocity: Vec2::ZERO,
            mass: 1.0,
            kind,
            shape: Shape::Rect,
            suspended: false,
            order: 0,
        }
    }

    pub fn with_shape(mut self, shape: Shape) -> Self {
        self.shape = shape;
        self
    }

    pub fn with_mass(mut self, mass: f64) -> Self {
        self.mass = mass;
        self
    }

    pub fn with_velocity(mut self, velocity: Vec2) -> Self {
        self.velocity = velocity;
        self
    }

    pub fn with_order(mut self, order: i32) -> Self {
        self.order = order;
        self
    }

    pub fn location(&self) -> Vec2 {
        self.bounds.origin()
    }

    pub fn center(&self) -> Vec2 {
        self.bounds.center()
    }

    /// Bounds after the next move.
    pub fn next_bounds(&self) -> Rect {
        self.bounds.translated(self.velocity)
    }

    pub fn next_center(&self) -> Vec2 {
        self.next_bounds().center()
    }

    pub fn is_moving(&self) -> bool {
        !self.velocity.is_zero()
    }

    /// Bounds used when testing the predicted frame. Round bodies are grown by
    /// `inflation` so that bodies about to touch register as colliding.
    pub fn collision_bounds(&self, inflation: f64) -> Rect {
        let next = self.next_bounds();
        match self.shape {
            Shape::Ellipse => next.inflated(inflation),
            _ => next,
        }
    }

    /// Overlap of the two bodies in their current positions.
    pub fn overlap_with(&self, other: &Entity) -> Option<Overlap> {
        shape::overlap(&self.shape, &self.bounds, &other.shape, &other.bounds)
    }

    /// Whether the two bodies will overlap after their next move.
    pub fn collision_pending(&self, other: &Entity, inflation: f64) -> bool {
        shape::overlaps(
            &self.shape,
            &self.collision_bounds(inflation),
            &other.shape,
            &other.collision_bounds(inflation),
        )
    }

    /// Move the top-left corner to `location`.
    pub fn teleport(&mut self, location: Vec2) {
        self.bounds.x = location.x;
        self.bounds.y = location.y;
    }

    /// Move so the body is centered on `center`.
    pub fn teleport_center(&mut self, center: Vec2) {
        self.teleport(center - self.bounds.size() / 2.0);
    }

    pub fn set_velocity(&mut self, velocity: Vec2) {
        self.velocity = velocity;
    }

    pub fn set_suspended(&mut self, suspended: bool) {
        self.suspended = suspended;
    }

    /// Apply one tick of motion. Suspended bodies stay put.
    pub fn advance(&mut self) {
        if !self.suspended {
            self.bounds = self.next_bounds();
        }
    }
}

impl fmt::Display for Entity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Entity({} at {} v={})", self.id, self.bounds, self.velocity)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ball(x: f64, y: f64) -> Entity {
        Entity::new(BodyType(1), Rect::new(x, y, 25.0, 25.0)).with_shape(Shape::Ellipse)
    }

    #[test]
    fn test_next_bounds_follow_velocity() {
        let e = ball(10.0, 20.0).with_velocity(Vec2::new(3.0, -4.0));
        assert_eq!(e.next_bounds(), Rect::new(13.0, 16.0, 25.0, 25.0));
        assert_eq!(e.next_center(), Vec2::new(25.5, 28.5));
    }

    #[test]
    fn test_advance_respects_suspension() {
        let mut e = ball(0.0, 0.0).with_velocity(Vec2::new(1.0, 1.0));
        e.set_suspended(true);
        e.advance();
        assert_eq!(e.location(), Vec2::ZERO);

        e.set_suspended(false);
        e.advance();
        assert_eq!(e.location(), Vec2::new(1.0, 1.0));
    }

    #[test]
    fn test_teleport_center() {
        let mut e = ball(0.0, 0.0);
        e.teleport_center(Vec2::new(100.0, 50.0));
        assert_eq!(e.center(), Vec2::new(100.0, 50.0));
        assert_eq!(e.location(), Vec2::new(87.5, 37.5));
    }

    #[test]
    fn test_collision_pending_uses_inflation() {
        // Circles exactly touching after the move: only the inflated test sees it
        let a = ball(0.0, 0.0).with_velocity(Vec2::new(1.0, 0.0));
        let b = ball(26.0, 0.0);
        assert!(!a.collision_pending(&b, 0.0));
        assert!(a.collision_pending(&b, 1.0));
    }
}
