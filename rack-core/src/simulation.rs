//! Simulation driver.
//!
//! Owns the entities and the engine. The periodic scheduler stays outside:
//! whoever drives the simulation calls [`Simulation::tick`] once per interval
//! and reads state back between calls.

use tracing::{debug, info};

use crate::engine::{CollisionEngine, TickReport};
use crate::entity::{Entity, EntityId};
use crate::types::Vec2;

/// A table full of entities plus the engine that moves them.
#[derive(Debug)]
pub struct Simulation {
    engine: CollisionEngine,
    entities: Vec<Entity>,
    next_id: u32,
    running: bool,
    ticks: u64,
}

impl Simulation {
    pub fn new(engine: CollisionEngine) -> Self {
        Self {
            engine,
            entities: Vec::new(),
            next_id: 0,
            running: false,
            ticks: 0,
        }
    }

    pub fn engine(&self) -> &CollisionEngine {
        &self.engine
    }

    pub fn engine_mut(&mut self) -> &mut CollisionEngine {
        &mut self.engine
    }

    /// Add an entity and return its id. Entities are processed in the order
    /// they were added.
    pub fn add(&mut self, mut entity: Entity) -> EntityId {
        let id = EntityId(self.next_id);
        self.next_id += 1;
        entity.id = id;
        self.entities.push(entity);
        id
    }

    pub fn remove(&mut self, id: EntityId) -> Option<Entity> {
        let index = self.index_of(id)?;
        Some(self.entities.remove(index))
    }

    pub fn get(&self, id: EntityId) -> Option<&Entity> {
        self.entities.iter().find(|e| e.id == id)
    }

    pub fn get_mut(&mut self, id: EntityId) -> Option<&mut Entity> {
        self.entities.iter_mut().find(|e| e.id == id)
    }

    pub fn entities(&self) -> &[Entity] {
        &self.entities
    }

    /// Ids sorted for drawing: by `order`, ties broken by id.
    pub fn render_order(&self) -> Vec<EntityId> {
        let mut ids: Vec<(i32, EntityId)> = self.entities.iter().map(|e| (e.order, e.id)).collect();
        ids.sort_unstable();
        ids.into_iter().map(|(_, id)| id).collect()
    }

    /// Move an entity's top-left corner. Returns false for unknown ids.
    pub fn teleport(&mut self, id: EntityId, location: Vec2) -> bool {
        self.get_mut(id).map(|e| e.teleport(location)).is_some()
    }

    pub fn set_velocity(&mut self, id: EntityId, velocity: Vec2) -> bool {
        self.get_mut(id).map(|e| e.set_velocity(velocity)).is_some()
    }

    pub fn set_suspended(&mut self, id: EntityId, suspended: bool) -> bool {
        self.get_mut(id).map(|e| e.set_suspended(suspended)).is_some()
    }

    /// Start ticking. Calling it again while running does nothing.
    pub fn start(&mut self) {
        if !self.running {
            self.running = true;
            debug!(entities = self.entities.len(), "simulation started");
        }
    }

    /// Stop ticking. Calling it again while stopped does nothing.
    pub fn stop(&mut self) {
        if self.running {
            self.running = false;
            debug!(ticks = self.ticks, "simulation stopped");
        }
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    pub fn tick_count(&self) -> u64 {
        self.ticks
    }

    pub fn last_report(&self) -> TickReport {
        self.engine.last_report()
    }

    /// Run one engine update if started. Returns whether anything is still
    /// moving; a stopped simulation reports false and changes nothing.
    pub fn tick(&mut self) -> bool {
        if !self.running {
            return false;
        }
        self.ticks += 1;
        self.engine.update(&mut self.entities)
    }

    /// Tick until everything rests, the simulation is stopped, or `max_ticks`
    /// is reached. Returns the number of ticks run.
    pub fn run_until_rest(&mut self, max_ticks: usize) -> usize {
        let mut ran = 0;
        while ran < max_ticks && self.running {
            ran += 1;
            if !self.tick() {
                break;
            }
        }
        info!(ticks = ran, total = self.ticks, "table at rest");
        ran
    }

    fn index_of(&self, id: EntityId) -> Option<usize> {
        self.entities.iter().position(|e| e.id == id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::boundary::Boundary;
    use crate::engine::EngineConfig;
    use crate::grid::GridLayout;
    use crate::policy::{BodyType, CollisionRule, PolicyTable};
    use crate::types::Rect;

    fn simulation() -> (Simulation, BodyType) {
        let mut policy = PolicyTable::new();
        let ball = policy.register_type("Ball");
        policy.configure(ball, CollisionRule::bounce(0.965), 0.98);
        policy.set_override(ball, BodyType::WALL, CollisionRule::bounce(0.74));
        let bounds = Rect::new(0.0, 0.0, 400.0, 200.0);
        let engine = CollisionEngine::new(
            Boundary::new(bounds),
            GridLayout::compute(bounds, Vec2::new(20.0, 20.0), 4),
            policy,
            EngineConfig::default(),
        );
        (Simulation::new(engine), ball)
    }

    #[test]
    fn test_ids_are_stable_across_removal() {
        let (mut sim, ball) = simulation();
        let a = sim.add(Entity::new(ball, Rect::new(10.0, 10.0, 20.0, 20.0)));
        let b = sim.add(Entity::new(ball, Rect::new(50.0, 10.0, 20.0, 20.0)));
        let c = sim.add(Entity::new(ball, Rect::new(90.0, 10.0, 20.0, 20.0)));
        assert!(sim.remove(b).is_some());
        assert!(sim.remove(b).is_none());
        assert_eq!(sim.get(c).map(|e| e.bounds.x), Some(90.0));
        let ids: Vec<EntityId> = sim.entities().iter().map(|e| e.id).collect();
        assert_eq!(ids, vec![a, c]);
    }

    #[test]
    fn test_render_order() {
        let (mut sim, ball) = simulation();
        let a = sim.add(Entity::new(ball, Rect::new(0.0, 0.0, 1.0, 1.0)).with_order(5));
        let b = sim.add(Entity::new(ball, Rect::new(0.0, 0.0, 1.0, 1.0)).with_order(-1));
        let c = sim.add(Entity::new(ball, Rect::new(0.0, 0.0, 1.0, 1.0)).with_order(5));
        assert_eq!(sim.render_order(), vec![b, a, c]);
    }

    #[test]
    fn test_start_stop_idempotent() {
        let (mut sim, ball) = simulation();
        let id = sim.add(
            Entity::new(ball, Rect::new(100.0, 100.0, 20.0, 20.0))
                .with_velocity(Vec2::new(2.0, 0.0)),
        );

        assert!(!sim.tick(), "stopped simulation must not tick");
        assert_eq!(sim.get(id).map(|e| e.bounds.x), Some(100.0));

        sim.start();
        sim.start();
        assert!(sim.is_running());
        assert!(sim.tick());
        assert_eq!(sim.tick_count(), 1);

        sim.stop();
        sim.stop();
        assert!(!sim.is_running());
        assert!(!sim.tick());
        assert_eq!(sim.tick_count(), 1);
    }

    #[test]
    fn test_run_until_rest_terminates() {
        let (mut sim, ball) = simulation();
        sim.add(
            Entity::new(ball, Rect::new(100.0, 100.0, 20.0, 20.0))
                .with_velocity(Vec2::new(8.0, 3.0)),
        );
        sim.start();
        let ran = sim.run_until_rest(10_000);
        assert!(ran < 10_000, "friction should stop the ball");
        assert!(sim.entities().iter().all(|e| !e.is_moving()));
    }

    #[test]
    fn test_mutation_primitives() {
        let (mut sim, ball) = simulation();
        let id = sim.add(Entity::new(ball, Rect::new(0.0, 0.0, 20.0, 20.0)));
        assert!(sim.teleport(id, Vec2::new(30.0, 40.0)));
        assert!(sim.set_velocity(id, Vec2::new(1.0, 0.0)));
        assert!(sim.set_suspended(id, true));
        let e = sim.get(id).expect("entity exists");
        assert_eq!(e.location(), Vec2::new(30.0, 40.0));
        assert!(e.suspended);
        assert!(!sim.teleport(EntityId(99), Vec2::ZERO));
    }
}
