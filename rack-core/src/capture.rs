//! Capture regions (pockets).
//!
//! A capture region is an ordinary entity whose shape outlines the area a
//! body must reach to be taken off the table. [`CaptureHandler`] is installed
//! as the `Custom` rule between the captured type and the region type:
//!
//! ```text
//!   Ball ──(Custom: CaptureHandler)──▶ Pocket
//!
//!   center inside pocket outline?
//!     yes → park ball on the pocket's anchor, stop it, suspend it, queue event
//!     no  → nothing, the ball keeps rolling
//! ```
//!
//! Events are drained by whoever owns the game rules.

use std::cell::RefCell;

use tracing::trace;

use crate::entity::{Entity, EntityId};
use crate::policy::CollisionHandler;
use crate::types::Vec2;

/// A body was captured by a region.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Capture {
    pub entity: EntityId,
    pub region: EntityId,
}

/// `Custom` collision handler that sinks bodies into capture regions.
#[derive(Debug, Default)]
pub struct CaptureHandler {
    events: RefCell<Vec<Capture>>,
}

impl CaptureHandler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Point a captured body is centered on: the middle of the region's bounds.
    pub fn anchor(region: &Entity) -> Vec2 {
        region.bounds.center()
    }

    /// Take every capture queued since the last drain, oldest first.
    pub fn drain(&self) -> Vec<Capture> {
        std::mem::take(&mut *self.events.borrow_mut())
    }

    pub fn pending(&self) -> usize {
        self.events.borrow().len()
    }
}

impl CollisionHandler for CaptureHandler {
    /// `body` is the entity being captured, `region` the capture region.
    fn check_collision(&self, body: &mut Entity, region: &mut Entity) -> bool {
        if !region.shape.contains_point(&region.bounds, body.next_center()) {
            return false;
        }

        body.teleport_center(Self::anchor(region));
        body.set_velocity(Vec2::ZERO);
        body.set_suspended(true);

        trace!(entity = %body.id, region = %region.id, "captured");
        self.events.borrow_mut().push(Capture {
            entity: body.id,
            region: region.id,
        });
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::policy::BodyType;
    use crate::shape::Shape;
    use crate::types::Rect;

    fn pocket() -> Entity {
        let bounds = Rect::new(100.0, 100.0, 38.0, 38.0);
        let mut e = Entity::new(BodyType(2), bounds).with_shape(Shape::polygon_at(
            bounds.origin(),
            &[
                Vec2::new(90.0, 90.0),
                Vec2::new(140.0, 90.0),
                Vec2::new(140.0, 140.0),
                Vec2::new(90.0, 140.0),
            ],
        ));
        e.id = EntityId(20);
        e
    }

    fn ball(x: f64, y: f64, v: Vec2) -> Entity {
        let mut e = Entity::new(BodyType(1), Rect::new(x, y, 25.0, 25.0))
            .with_shape(Shape::Ellipse)
            .with_velocity(v);
        e.id = EntityId(3);
        e
    }

    #[test]
    fn test_capture_relocates_and_suspends() {
        let handler = CaptureHandler::new();
        let mut region = pocket();
        let mut b = ball(95.0, 95.0, Vec2::new(2.0, 2.0));

        assert!(handler.check_collision(&mut b, &mut region));
        assert_eq!(b.center(), Vec2::new(119.0, 119.0));
        assert_eq!(b.velocity, Vec2::ZERO);
        assert!(b.suspended);

        let events = handler.drain();
        assert_eq!(
            events,
            vec![Capture {
                entity: EntityId(3),
                region: EntityId(20)
            }]
        );
        assert_eq!(handler.pending(), 0);
    }

    #[test]
    fn test_no_capture_outside_region() {
        let handler = CaptureHandler::new();
        let mut region = pocket();
        // Ball overlaps the outline but its center stays outside
        let mut b = ball(130.0, 130.0, Vec2::new(1.0, 1.0));

        assert!(!handler.check_collision(&mut b, &mut region));
        assert!(!b.suspended);
        assert_eq!(b.velocity, Vec2::new(1.0, 1.0));
        assert!(handler.drain().is_empty());
    }
}
