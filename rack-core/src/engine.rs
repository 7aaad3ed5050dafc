//! Resolution engine: narrow phase, collision response and motion.
//!
//! One call to [`CollisionEngine::update`] is one tick:
//!
//! ```text
//! ┌──────────── pass (at most max_passes, repeats while colliding) ──────┐
//! │  rebuild grid from predicted extents                                 │
//! │  for each pair sharing a cell   → policy → bounce / custom handler   │
//! │  for each moving body           → boundary → wall bounce             │
//! └──────────────────────────────────────────────────────────────────────┘
//!   advance every active body, apply friction, report whether any moves
//! ```
//!
//! ## Response model
//!
//! Body/body bounces use the standard 2D impulse split: velocity along the
//! tangent is kept, velocity along the normal follows the 1D inelastic
//! collision with restitution `e`. Walls are the infinite-mass limit of the
//! same formula, so only the perpendicular component flips.

use serde::{Deserialize, Serialize};
use tracing::{debug, trace, warn};

use crate::boundary::{self, Boundary};
use crate::entity::Entity;
use crate::grid::{GridLayout, SpatialGrid};
use crate::policy::{CollisionRule, PolicyTable};
use crate::types::{constants, Side, Vec2};

/// Tunables for the resolution loop.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Upper bound on resolution passes per tick (at least one always runs)
    pub max_passes: usize,
    /// Speed below which a body is stopped instead of slowed by friction
    pub rest_speed: f64,
    /// Growth applied to round bodies when testing the predicted frame
    pub collision_inflation: f64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            max_passes: constants::MAX_PASSES,
            rest_speed: constants::REST_SPEED,
            collision_inflation: constants::COLLISION_INFLATION,
        }
    }
}

/// What a body last collided with during the current tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Partner {
    Body(usize),
    Wall(Side),
}

/// Summary of the most recent tick.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TickReport {
    pub passes: usize,
    pub contacts: usize,
    pub still_moving: bool,
}

/// Collision resolver for a fixed table.
#[derive(Debug)]
pub struct CollisionEngine {
    boundary: Boundary,
    grid: SpatialGrid,
    policy: PolicyTable,
    config: EngineConfig,
    last_contact: Vec<Option<Partner>>,
    pairs: Vec<(usize, usize)>,
    report: TickReport,
}

impl CollisionEngine {
    pub fn new(
        boundary: Boundary,
        layout: GridLayout,
        policy: PolicyTable,
        config: EngineConfig,
    ) -> Self {
        Self {
            boundary,
            grid: SpatialGrid::new(layout),
            policy,
            config,
            last_contact: Vec::new(),
            pairs: Vec::new(),
            report: TickReport::default(),
        }
    }

    pub fn boundary(&self) -> &Boundary {
        &self.boundary
    }

    pub fn policy(&self) -> &PolicyTable {
        &self.policy
    }

    pub fn policy_mut(&mut self) -> &mut PolicyTable {
        &mut self.policy
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn last_report(&self) -> TickReport {
        self.report
    }

    /// Run one tick over `entities`. Returns true while anything is moving.
    ///
    /// Iteration follows slice order, so a given input always produces the
    /// same result.
    pub fn update(&mut self, entities: &mut [Entity]) -> bool {
        self.last_contact.clear();
        self.last_contact.resize(entities.len(), None);

        let max_passes = self.config.max_passes.max(1);
        let mut passes = 0;
        let mut contacts = 0;
        let mut have_collision = true;

        while have_collision && passes < max_passes {
            passes += 1;
            have_collision = false;

            self.grid.clear();
            for (i, e) in entities.iter().enumerate() {
                if !e.suspended {
                    self.grid.insert(i, &e.shape.extent(&e.next_bounds()));
                }
            }

            self.grid.candidate_pairs(&mut self.pairs);
            for k in 0..self.pairs.len() {
                let (i, j) = self.pairs[k];
                if self.check_pair(entities, i, j) {
                    have_collision = true;
                    contacts += 1;
                }
            }

            for (i, e) in entities.iter_mut().enumerate() {
                let hits = self.check_walls(i, e);
                if hits > 0 {
                    have_collision = true;
                    contacts += hits;
                }
            }
        }

        if have_collision {
            warn!(
                passes,
                contacts, "pass limit reached with collisions still unresolved"
            );
        }

        let still_moving = self.apply_motion(entities);
        self.report = TickReport {
            passes,
            contacts,
            still_moving,
        };
        debug!(passes, contacts, still_moving, "tick resolved");
        still_moving
    }

    /// Pairwise check. Returns true if the pair collided.
    fn check_pair(&mut self, entities: &mut [Entity], i: usize, j: usize) -> bool {
        let (a, b) = pair_mut(entities, i, j);
        if a.suspended || b.suspended {
            return false;
        }
        if !a.is_moving() && !b.is_moving() {
            return false;
        }

        let Some(pair) = self.policy.resolve_pair(a.kind, b.kind) else {
            return false;
        };

        if let CollisionRule::Bounce { .. } = pair.rule {
            separate(a, b);
        }

        if !a.collision_pending(b, self.config.collision_inflation) {
            return false;
        }
        if self.last_contact[i] == Some(Partner::Body(j)) {
            return false;
        }

        let collided = match pair.rule {
            CollisionRule::None => false,
            CollisionRule::Bounce { restitution } => {
                let (va, vb) = impulse_response(a, b, *restitution);
                trace!(a = %a.id, b = %b.id, ?va, ?vb, "bounce");
                a.velocity = va;
                b.velocity = vb;
                true
            }
            CollisionRule::Custom(handler) => {
                let hit = if pair.swapped {
                    handler.check_collision(b, a)
                } else {
                    handler.check_collision(a, b)
                };
                if hit {
                    trace!(a = %a.id, b = %b.id, "custom collision");
                }
                hit
            }
        };

        if collided {
            self.last_contact[i] = Some(Partner::Body(j));
            self.last_contact[j] = Some(Partner::Body(i));
        }
        collided
    }

    /// Boundary check for one body. Returns the number of sides bounced off.
    fn check_walls(&mut self, i: usize, e: &mut Entity) -> usize {
        if e.suspended || !e.is_moving() {
            return 0;
        }
        let Some(restitution) = self.policy.wall_restitution(e.kind) else {
            return 0;
        };

        let (horizontal, vertical) = self.boundary.crossings(&e.next_bounds());
        let mut hits = 0;
        for side in [horizontal, vertical].into_iter().flatten() {
            if self.last_contact[i] == Some(Partner::Wall(side)) || !approaching(e.velocity, side)
            {
                continue;
            }
            e.velocity = wall_response(e.velocity, side, restitution);
            self.last_contact[i] = Some(Partner::Wall(side));
            trace!(entity = %e.id, %side, velocity = ?e.velocity, "wall bounce");
            hits += 1;
        }
        hits
    }

    /// Advance every active body and apply friction.
    fn apply_motion(&self, entities: &mut [Entity]) -> bool {
        let mut still_moving = false;
        for e in entities.iter_mut() {
            e.advance();
            if !e.suspended && e.velocity.magnitude() > self.config.rest_speed {
                e.velocity = e.velocity * self.policy.friction(e.kind);
                still_moving |= !e.velocity.is_zero();
            } else {
                e.velocity = Vec2::ZERO;
            }
        }
        still_moving
    }
}

/// Two distinct entities borrowed mutably, `i < j`.
fn pair_mut(entities: &mut [Entity], i: usize, j: usize) -> (&mut Entity, &mut Entity) {
    let (head, tail) = entities.split_at_mut(j);
    (&mut head[i], &mut tail[0])
}

/// Whether `velocity` carries the body further across `side`.
fn approaching(velocity: Vec2, side: Side) -> bool {
    match side {
        Side::East => velocity.x > 0.0,
        Side::West => velocity.x < 0.0,
        Side::South => velocity.y > 0.0,
        Side::North => velocity.y < 0.0,
    }
}

/// Unit normal pointing from `b` to `a`, taken between predicted centers.
///
/// Falls back to the current centers, then to the relative velocity, when
/// the centers coincide. Zero only if all three are degenerate.
fn collision_normal(a: &Entity, b: &Entity) -> Vec2 {
    first_normal([
        a.next_center() - b.next_center(),
        a.center() - b.center(),
        b.velocity - a.velocity,
    ])
}

/// Unit normal pointing from `b` to `a` in the current frame.
///
/// Predicted centers of two fast bodies closing on each other can already
/// have crossed, so they only break ties when the current centers coincide.
fn separation_normal(a: &Entity, b: &Entity) -> Vec2 {
    first_normal([
        a.center() - b.center(),
        a.next_center() - b.next_center(),
        b.velocity - a.velocity,
    ])
}

fn first_normal(candidates: [Vec2; 3]) -> Vec2 {
    candidates
        .into_iter()
        .map(|d| d.normalized())
        .find(|n| !n.is_zero())
        .unwrap_or(Vec2::ZERO)
}

/// Push interpenetrating bodies apart along the separation normal, scaled by
/// the overlap's width and height.
fn separate(a: &mut Entity, b: &mut Entity) {
    let Some(overlap) = a.overlap_with(b) else {
        return;
    };
    let n = separation_normal(a, b);
    let shift = n.component_mul(&overlap.bounds.size());
    trace!(a = %a.id, b = %b.id, ?shift, "separating overlap");
    a.bounds = a.bounds.translated(shift);
    b.bounds = b.bounds.translated(-shift);
}

/// Post-collision velocities of `a` and `b` for restitution `e`.
///
/// ```text
/// n = normalize(center_a - center_b)      t = (n.y, -n.x)
/// a' = t (va·t) + n [ mb e (vb·n - va·n) + ma (va·n) + mb (vb·n) ] / (ma + mb)
/// b' = t (vb·t) + n [ ma e (va·n - vb·n) + mb (vb·n) + ma (va·n) ] / (ma + mb)
/// ```
///
/// Velocities are returned unchanged when no normal can be found.
pub fn impulse_response(a: &Entity, b: &Entity, e: f64) -> (Vec2, Vec2) {
    let n = collision_normal(a, b);
    let total_mass = a.mass + b.mass;
    if n.is_zero() || total_mass <= 0.0 {
        return (a.velocity, b.velocity);
    }
    let t = n.perpendicular();
    let (ma, mb) = (a.mass, b.mass);
    let (va, vb) = (a.velocity, b.velocity);
    let (an, bn) = (va.dot(&n), vb.dot(&n));

    let a_normal = (mb * e * (bn - an) + ma * an + mb * bn) / total_mass;
    let b_normal = (ma * e * (an - bn) + mb * bn + ma * an) / total_mass;

    (
        t * va.dot(&t) + n * a_normal,
        t * vb.dot(&t) + n * b_normal,
    )
}

/// Velocity after bouncing off `side` of the boundary.
pub fn wall_response(velocity: Vec2, side: Side, restitution: f64) -> Vec2 {
    boundary::reflect(velocity, side, restitution)
}
