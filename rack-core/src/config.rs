//! Table and policy configuration loader.
//!
//! Loads collision policies and table layouts from YAML files so tables can
//! be tuned without recompiling.
//!
//! ## Directory Structure
//!
//! ```text
//! config/
//! ├── policies/
//! │   ├── eightball.yaml
//! │   └── carom.yaml
//! └── tables/
//!     ├── eightball.yaml
//!     └── carom.yaml
//! ```
//!
//! A policy names body types and their rules; `custom` rules refer to
//! handlers by name, which the caller supplies when building:
//!
//! ```yaml
//! types:
//!   - name: Ball
//!     friction: 0.98
//!     default: { behavior: bounce, restitution: 0.965 }
//!     overrides:
//!       Wall: { behavior: bounce, restitution: 0.74 }
//!       Pocket: { behavior: custom, handler: capture }
//! ```

use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::path::{Path, PathBuf};
use std::rc::Rc;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::boundary::{Boundary, GapInterval, GapRegistry};
use crate::engine::{CollisionEngine, EngineConfig};
use crate::entity::Entity;
use crate::error::{ConfigError, Result};
use crate::grid::GridLayout;
use crate::policy::{BodyType, CollisionHandler, CollisionRule, PolicyTable};
use crate::shape::Shape;
use crate::simulation::Simulation;
use crate::types::{Rect, Side, Vec2};

/// Named `Custom` handlers available to a policy.
pub type HandlerMap = HashMap<String, Rc<dyn CollisionHandler>>;

// =============================================================================
// Policy
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Behavior {
    #[default]
    None,
    Bounce,
    Custom,
}

/// One collision rule as written in YAML.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct RuleConfig {
    pub behavior: Behavior,
    #[serde(default)]
    pub restitution: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub handler: Option<String>,
}

impl RuleConfig {
    fn to_rule(&self, handlers: &HandlerMap) -> Result<CollisionRule> {
        match self.behavior {
            Behavior::None => Ok(CollisionRule::None),
            Behavior::Bounce => {
                if !(0.0..=1.0).contains(&self.restitution) {
                    return Err(ConfigError::Invalid(format!(
                        "restitution {} outside [0, 1]",
                        self.restitution
                    )));
                }
                Ok(CollisionRule::bounce(self.restitution))
            }
            Behavior::Custom => {
                let name = self.handler.as_deref().ok_or_else(|| {
                    ConfigError::Invalid("custom rule without a handler name".to_string())
                })?;
                let handler = handlers
                    .get(name)
                    .ok_or_else(|| ConfigError::UnknownHandler(name.to_string()))?;
                Ok(CollisionRule::Custom(Rc::clone(handler)))
            }
        }
    }
}

fn default_friction() -> f64 {
    1.0
}

/// Policy entry for one body type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TypeConfig {
    pub name: String,
    /// Per-tick speed multiplier while rolling
    #[serde(default = "default_friction")]
    pub friction: f64,
    #[serde(default)]
    pub default: RuleConfig,
    /// Rules keyed by counterpart type name (`Wall` for the boundary)
    #[serde(default)]
    pub overrides: BTreeMap<String, RuleConfig>,
}

/// A full collision policy plus engine tunables.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PolicyConfig {
    pub name: String,
    #[serde(default)]
    pub engine: EngineConfig,
    #[serde(default)]
    pub types: Vec<TypeConfig>,
}

impl PolicyConfig {
    pub fn from_yaml(contents: &str) -> Result<Self> {
        Ok(serde_yaml::from_str(contents)?)
    }

    /// Build the policy table, binding `custom` rules to `handlers`.
    ///
    /// Types are interned in declaration order, then any counterpart only
    /// named in an override.
    pub fn build(&self, handlers: &HandlerMap) -> Result<PolicyTable> {
        let mut policy = PolicyTable::new();

        for t in &self.types {
            if t.name == BodyType::WALL_NAME {
                return Err(ConfigError::Invalid(format!(
                    "'{}' is reserved for the boundary",
                    t.name
                )));
            }
            if policy.type_id(&t.name).is_some() {
                return Err(ConfigError::Invalid(format!("duplicate type '{}'", t.name)));
            }
            policy.register_type(&t.name);
        }

        for t in &self.types {
            if !(0.0..=1.0).contains(&t.friction) {
                return Err(ConfigError::Invalid(format!(
                    "friction {} for '{}' outside [0, 1]",
                    t.friction, t.name
                )));
            }
            let ty = policy.register_type(&t.name);
            policy.configure(ty, t.default.to_rule(handlers)?, t.friction);
            for (counterpart, rule) in &t.overrides {
                let other = policy.register_type(counterpart);
                policy.set_override(ty, other, rule.to_rule(handlers)?);
            }
        }

        debug!(policy = %self.name, types = policy.len(), "collision policy built");
        Ok(policy)
    }
}

// =============================================================================
// Table
// =============================================================================

fn default_pocket_kind() -> String {
    "Pocket".to_string()
}

/// A capture region placed on the table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PocketConfig {
    pub name: String,
    #[serde(default = "default_pocket_kind")]
    pub kind: String,
    pub bounds: Rect,
    /// Capture outline in table coordinates; empty means the bounds rectangle
    #[serde(default)]
    pub outline: Vec<Vec2>,
    /// Boundary gaps this pocket opens
    #[serde(default)]
    pub gaps: BTreeMap<Side, Vec<GapInterval>>,
    #[serde(default)]
    pub order: i32,
}

impl PocketConfig {
    fn shape(&self) -> Shape {
        if self.outline.is_empty() {
            Shape::Rect
        } else {
            Shape::polygon_at(self.bounds.origin(), &self.outline)
        }
    }
}

/// Table layout: bounds, broad-phase sizing hints, gaps and pockets.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TableConfig {
    pub name: String,
    pub bounds: Rect,
    /// Typical body size, used to size the collision grid
    pub object_size: Vec2,
    pub expected_count: usize,
    #[serde(default)]
    pub gaps: BTreeMap<Side, Vec<GapInterval>>,
    #[serde(default)]
    pub pockets: Vec<PocketConfig>,
}

impl TableConfig {
    pub fn from_yaml(contents: &str) -> Result<Self> {
        let table: TableConfig = serde_yaml::from_str(contents)?;
        table.validate()?;
        Ok(table)
    }

    pub fn validate(&self) -> Result<()> {
        if !(self.bounds.width > 0.0 && self.bounds.height > 0.0) {
            return Err(ConfigError::Invalid(format!(
                "table '{}' has empty bounds {}",
                self.name, self.bounds
            )));
        }
        if self.object_size.x < 0.0 || self.object_size.y < 0.0 {
            return Err(ConfigError::Invalid(format!(
                "table '{}' has negative object size {}",
                self.name, self.object_size
            )));
        }
        for pocket in &self.pockets {
            if !pocket.outline.is_empty() && pocket.outline.len() < 3 {
                return Err(ConfigError::Invalid(format!(
                    "pocket '{}' outline needs at least 3 vertices",
                    pocket.name
                )));
            }
        }
        Ok(())
    }

    /// Table gaps plus every gap contributed by a pocket.
    pub fn gap_registry(&self) -> GapRegistry {
        let mut registry = GapRegistry::new();
        add_gaps(&mut registry, &self.gaps);
        for pocket in &self.pockets {
            let mut own = GapRegistry::new();
            add_gaps(&mut own, &pocket.gaps);
            registry.merge(&own);
        }
        registry
    }

    pub fn boundary(&self) -> Boundary {
        Boundary::with_gaps(self.bounds, self.gap_registry())
    }

    pub fn grid_layout(&self) -> GridLayout {
        GridLayout::compute(self.bounds, self.object_size, self.expected_count)
    }

    /// One resting entity per pocket, typed through `policy`.
    pub fn pocket_entities(&self, policy: &mut PolicyTable) -> Vec<Entity> {
        self.pockets
            .iter()
            .map(|p| {
                let kind = policy.register_type(&p.kind);
                Entity::new(kind, p.bounds)
                    .with_shape(p.shape())
                    .with_order(p.order)
            })
            .collect()
    }

    /// Engine plus pockets for this table under `policy`.
    pub fn build_simulation(
        &self,
        policy: &PolicyConfig,
        handlers: &HandlerMap,
    ) -> Result<Simulation> {
        let mut table = policy.build(handlers)?;
        let pockets = self.pocket_entities(&mut table);
        let engine =
            CollisionEngine::new(self.boundary(), self.grid_layout(), table, policy.engine);

        let mut sim = Simulation::new(engine);
        for pocket in pockets {
            sim.add(pocket);
        }
        debug!(table = %self.name, pockets = self.pockets.len(), "table built");
        Ok(sim)
    }
}

fn add_gaps(registry: &mut GapRegistry, gaps: &BTreeMap<Side, Vec<GapInterval>>) {
    for (side, intervals) in gaps {
        for g in intervals {
            registry.add(*side, GapInterval::new(g.start, g.end));
        }
    }
}

// =============================================================================
// Loader
// =============================================================================

/// Configuration loader with configurable base directory.
pub struct ConfigLoader {
    base_path: PathBuf,
}

impl ConfigLoader {
    /// Create a new loader with the given base path.
    ///
    /// The base path should contain `policies/` and `tables/` subdirectories.
    pub fn new<P: AsRef<Path>>(base_path: P) -> Self {
        Self {
            base_path: base_path.as_ref().to_path_buf(),
        }
    }

    /// Load a policy by name (without .yaml extension).
    ///
    /// # Example
    /// ```ignore
    /// let loader = ConfigLoader::new("config");
    /// let policy = loader.load_policy("eightball")?;
    /// ```
    pub fn load_policy(&self, name: &str) -> Result<PolicyConfig> {
        self.load("policies", name)
    }

    /// Load and validate a table layout by name.
    pub fn load_table(&self, name: &str) -> Result<TableConfig> {
        let table: TableConfig = self.load("tables", name)?;
        table.validate()?;
        Ok(table)
    }

    pub fn list_policies(&self) -> Result<Vec<String>> {
        self.list("policies")
    }

    pub fn list_tables(&self) -> Result<Vec<String>> {
        self.list("tables")
    }

    fn load<T: DeserializeOwned>(&self, subdir: &str, name: &str) -> Result<T> {
        let path = self.base_path.join(subdir).join(format!("{}.yaml", name));
        if !path.exists() {
            return Err(ConfigError::NotFound(name.to_string()));
        }
        let contents = fs::read_to_string(&path)?;
        let value: T = serde_yaml::from_str(&contents)?;
        debug!(path = %path.display(), "configuration loaded");
        Ok(value)
    }

    /// Stems of the `.yaml` files under `subdir`, sorted. A missing
    /// directory lists as empty.
    fn list(&self, subdir: &str) -> Result<Vec<String>> {
        let dir = self.base_path.join(subdir);
        if !dir.is_dir() {
            return Ok(Vec::new());
        }

        let mut names = fs::read_dir(&dir)?
            .map(|entry| entry.map(|e| e.path()))
            .collect::<std::io::Result<Vec<_>>>()?
            .into_iter()
            .filter(|path| path.extension().is_some_and(|ext| ext == "yaml"))
            .filter_map(|path| path.file_stem()?.to_str().map(str::to_owned))
            .collect::<Vec<_>>();
        names.sort_unstable();
        Ok(names)
    }
}

// =============================================================================
// Tests
// =============================================================================
