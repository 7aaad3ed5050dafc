//! # Rack Core
//!
//! A grid-partitioned 2D collision engine for billiard-style tables.
//!
//! ## Architecture
//!
//! - `types`: Core data structures (Vec2, Rect, Side, constants)
//! - `shape`: Body outlines and the narrow-phase overlap test
//! - `entity`: Movable bodies and their mutation primitives
//! - `policy`: Per-type collision rules and friction
//! - `boundary`: Table bounds with pocket gaps, wall reflection
//! - `grid`: Uniform-grid broad phase
//! - `engine`: Multi-pass resolution, impulse response, friction
//! - `capture`: Custom handler that sinks balls into pockets
//! - `simulation`: Entity store and tick driver
//! - `config`: YAML policy/table loader
//! - `error`: Configuration errors

pub mod boundary;
pub mod capture;
pub mod config;
pub mod engine;
pub mod entity;
pub mod error;
pub mod grid;
pub mod policy;
pub mod shape;
pub mod simulation;
pub mod types;

pub use capture::{Capture, CaptureHandler};
pub use config::{ConfigLoader, HandlerMap, PolicyConfig, TableConfig};
pub use engine::{CollisionEngine, EngineConfig, TickReport};
pub use entity::{Entity, EntityId};
pub use error::{ConfigError, Result};
pub use policy::{BodyType, CollisionHandler, CollisionRule, PolicyTable};
pub use shape::Shape;
pub use simulation::Simulation;
pub use types::{Rect, Side, Vec2};
