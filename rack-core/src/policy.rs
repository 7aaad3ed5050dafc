//! Per-type collision policy.
//!
//! Each body type carries a default [`CollisionRule`] and a friction
//! coefficient, plus optional per-counterpart overrides. Types are interned
//! into small integer ids so lookups are plain `Vec` indexing.
//!
//! ```text
//!                 counterpart →  Wall        Ball          Pocket
//!   Ball   (default Bounce .965) Bounce .74  Bounce .965   Custom(capture)
//!   Pocket (unconfigured)        -           -             -
//! ```
//!
//! Lookups are directional: `lookup(Ball, Pocket)` and `lookup(Pocket, Ball)`
//! are answered by different rows. [`PolicyTable::resolve_pair`] settles
//! which row governs a given pair.

use std::fmt;
use std::rc::Rc;

use serde::{Deserialize, Serialize};

use crate::entity::Entity;

/// Interned body type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct BodyType(pub u16);

impl BodyType {
    /// Pseudo-type standing for the table boundary (infinite mass).
    pub const WALL: BodyType = BodyType(0);

    pub const WALL_NAME: &'static str = "Wall";

    fn index(self) -> usize {
        self.0 as usize
    }
}

/// Handler for `Custom` collisions.
///
/// `a` is the body whose policy holds the rule, `b` the counterpart. The
/// handler decides the outcome alone (e.g. relocating a captured body) and
/// returns whether a collision took place.
pub trait CollisionHandler {
    fn check_collision(&self, a: &mut Entity, b: &mut Entity) -> bool;
}

impl<F> CollisionHandler for F
where
    F: Fn(&mut Entity, &mut Entity) -> bool,
{
    fn check_collision(&self, a: &mut Entity, b: &mut Entity) -> bool {
        self(a, b)
    }
}

/// What happens when two bodies (or a body and the wall) meet.
#[derive(Clone, Default)]
pub enum CollisionRule {
    #[default]
    None,
    Bounce {
        restitution: f64,
    },
    Custom(Rc<dyn CollisionHandler>),
}

impl CollisionRule {
    pub fn bounce(restitution: f64) -> Self {
        CollisionRule::Bounce { restitution }
    }

    pub fn custom<H: CollisionHandler + 'static>(handler: H) -> Self {
        CollisionRule::Custom(Rc::new(handler))
    }

    pub fn is_none(&self) -> bool {
        matches!(self, CollisionRule::None)
    }

    pub fn restitution(&self) -> Option<f64> {
        match self {
            CollisionRule::Bounce { restitution } => Some(*restitution),
            _ => None,
        }
    }
}

impl fmt::Debug for CollisionRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CollisionRule::None => f.write_str("None"),
            CollisionRule::Bounce { restitution } => write!(f, "Bounce({restitution})"),
            CollisionRule::Custom(_) => f.write_str("Custom(..)"),
        }
    }
}

/// The rule governing one pair and the orientation it applies in.
#[derive(Debug, Clone, Copy)]
pub struct PairRule<'a> {
    pub rule: &'a CollisionRule,
    /// True when the counterpart's row was used, so the handler must see
    /// the entities in `(b, a)` order.
    pub swapped: bool,
}

#[derive(Debug, Clone)]
struct TypeProfile {
    name: String,
    configured: bool,
    default_rule: CollisionRule,
    friction: f64,
    overrides: Vec<Option<CollisionRule>>,
}

impl TypeProfile {
    fn unconfigured(name: &str) -> Self {
        Self {
            name: name.to_string(),
            configured: false,
            default_rule: CollisionRule::None,
            friction: 1.0,
            overrides: Vec::new(),
        }
    }
}

/// Collision policy for every known body type.
#[derive(Debug, Clone)]
pub struct PolicyTable {
    types: Vec<TypeProfile>,
}

impl Default for PolicyTable {
    fn default() -> Self {
        Self::new()
    }
}

impl PolicyTable {
    pub fn new() -> Self {
        Self {
            types: vec![TypeProfile::unconfigured(BodyType::WALL_NAME)],
        }
    }

    /// Intern a type name. Registering a known name returns the existing id.
    pub fn register_type(&mut self, name: &str) -> BodyType {
        if let Some(id) = self.type_id(name) {
            return id;
        }
        let Ok(raw) = u16::try_from(self.types.len()) else {
            panic!("body type limit reached: cannot register '{name}'");
        };
        let id = BodyType(raw);
        self.types.push(TypeProfile::unconfigured(name));
        id
    }

    pub fn type_id(&self, name: &str) -> Option<BodyType> {
        self.types
            .iter()
            .position(|t| t.name == name)
            .map(|i| BodyType(i as u16))
    }

    pub fn type_name(&self, ty: BodyType) -> Option<&str> {
        self.types.get(ty.index()).map(|t| t.name.as_str())
    }

    /// Number of interned types, including the wall.
    pub fn len(&self) -> usize {
        self.types.len()
    }

    pub fn is_empty(&self) -> bool {
        self.types.len() <= 1
    }

    fn profile_mut(&mut self, ty: BodyType) -> &mut TypeProfile {
        if ty.index() >= self.types.len() {
            for i in self.types.len()..=ty.index() {
                self.types.push(TypeProfile::unconfigured(&format!("type{i}")));
            }
        }
        &mut self.types[ty.index()]
    }

    /// Set the default rule and friction for a type.
    pub fn configure(&mut self, ty: BodyType, default_rule: CollisionRule, friction: f64) {
        let profile = self.profile_mut(ty);
        profile.configured = true;
        profile.default_rule = default_rule;
        profile.friction = friction;
    }

    /// Override the rule `ty` applies when meeting `counterpart`.
    pub fn set_override(&mut self, ty: BodyType, counterpart: BodyType, rule: CollisionRule) {
        let profile = self.profile_mut(ty);
        profile.configured = true;
        if profile.overrides.len() <= counterpart.index() {
            profile.overrides.resize(counterpart.index() + 1, None);
        }
        profile.overrides[counterpart.index()] = Some(rule);
    }

    /// Rule `ty` applies to `counterpart`: the override if present, else the
    /// type default. `None` for unconfigured types.
    pub fn lookup(&self, ty: BodyType, counterpart: BodyType) -> Option<&CollisionRule> {
        let profile = self.types.get(ty.index()).filter(|p| p.configured)?;
        match profile.overrides.get(counterpart.index()) {
            Some(Some(rule)) => Some(rule),
            _ => Some(&profile.default_rule),
        }
    }

    /// Friction coefficient for `ty`; unconfigured types keep their speed.
    pub fn friction(&self, ty: BodyType) -> f64 {
        self.types
            .get(ty.index())
            .filter(|p| p.configured)
            .map_or(1.0, |p| p.friction)
    }

    /// Restitution against the boundary, if `ty` bounces off walls at all.
    pub fn wall_restitution(&self, ty: BodyType) -> Option<f64> {
        self.lookup(ty, BodyType::WALL).and_then(CollisionRule::restitution)
    }

    /// Rule governing a pair of bodies.
    ///
    /// `a`'s row is consulted first; if it yields no rule (unconfigured type
    /// or `None`), `b`'s row keyed by `a` is used with the roles swapped.
    pub fn resolve_pair(&self, a: BodyType, b: BodyType) -> Option<PairRule<'_>> {
        match self.lookup(a, b) {
            Some(rule) if !rule.is_none() => Some(PairRule {
                rule,
                swapped: false,
            }),
            _ => self
                .lookup(b, a)
                .filter(|rule| !rule.is_none())
                .map(|rule| PairRule {
                    rule,
                    swapped: true,
                }),
        }
    }
}
