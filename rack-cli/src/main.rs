//! Break-shot runner.
//!
//! Loads a table and policy from the config directory, racks fifteen balls,
//! fires the cue ball and ticks at a fixed interval until the table settles.
//!
//! ```text
//! rack --table eightball --policy eightball --power 18 --angle 1.5
//! RUST_LOG=rack_core=trace rack --interval-ms 0
//! ```

use std::rc::Rc;
use std::thread;
use std::time::Duration;

use clap::Parser;
use tracing::{info, warn};

use rack_core::{
    BodyType, CaptureHandler, CollisionHandler, ConfigError, ConfigLoader, Entity, EntityId,
    HandlerMap, Rect, Result, Shape, Simulation, Vec2,
};

/// Rack and break on a configured table
#[derive(Parser, Debug)]
#[command(name = "rack")]
#[command(about = "Run a break shot on a YAML-configured billiards table")]
struct Args {
    /// Directory holding policies/ and tables/
    #[arg(long, default_value = "config")]
    config: String,

    /// Collision policy name (loaded from <config>/policies/)
    #[arg(long, default_value = "eightball")]
    policy: String,

    /// Table layout name (loaded from <config>/tables/)
    #[arg(long, default_value = "eightball")]
    table: String,

    /// Cue ball speed in units per tick
    #[arg(long, default_value_t = 18.0)]
    power: f64,

    /// Shot angle in degrees, 0 points at the rack
    #[arg(long, default_value_t = 0.0, allow_hyphen_values = true)]
    angle: f64,

    /// Give up after this many ticks
    #[arg(long, default_value_t = 5000)]
    max_ticks: usize,

    /// Delay between ticks; 0 runs flat out
    #[arg(long, default_value_t = 30)]
    interval_ms: u64,

    /// List available policies and tables, then exit
    #[arg(long)]
    list: bool,
}

const BALL_TYPE: &str = "Ball";
const RACK_SIZE: usize = 15;
const BALL_GAP: f64 = 0.5;
const DEFAULT_FILTER: &str = "rack=info,rack_core=info";

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(DEFAULT_FILTER)),
        )
        .init();

    let args = Args::parse();
    let loader = ConfigLoader::new(&args.config);

    if args.list {
        info!(
            policies = ?loader.list_policies()?,
            tables = ?loader.list_tables()?,
            "available configuration"
        );
        return Ok(());
    }

    let policy = loader.load_policy(&args.policy)?;
    let table = loader.load_table(&args.table)?;

    let capture = Rc::new(CaptureHandler::new());
    let mut handlers = HandlerMap::new();
    handlers.insert("capture".to_string(), capture.clone() as Rc<dyn CollisionHandler>);

    let mut sim = table.build_simulation(&policy, &handlers)?;
    let ball = sim.engine().policy().type_id(BALL_TYPE).ok_or_else(|| {
        ConfigError::Invalid(format!("policy '{}' has no {BALL_TYPE} type", policy.name))
    })?;

    let size = table.object_size;
    let balls = rack(&mut sim, ball, &table.bounds, size);
    let cue = place_cue(&mut sim, ball, &table.bounds, size);

    let radians = args.angle.to_radians();
    sim.set_velocity(cue, Vec2::new(radians.cos(), radians.sin()) * args.power);
    info!(
        table = %table.name,
        policy = %policy.name,
        balls = balls.len() + 1,
        power = args.power,
        angle = args.angle,
        "break"
    );

    sim.start();
    let mut ticks = 0;
    let mut settled = false;
    while ticks < args.max_ticks {
        ticks += 1;
        let moving = sim.tick();
        for event in capture.drain() {
            let label = if event.entity == cue { "cue" } else { "object" };
            info!(
                tick = ticks,
                ball = %event.entity,
                pocket = %event.region,
                label,
                "ball captured"
            );
        }
        if !moving {
            settled = true;
            break;
        }
        if args.interval_ms > 0 {
            thread::sleep(Duration::from_millis(args.interval_ms));
        }
    }
    sim.stop();

    if settled {
        info!(ticks, "table at rest");
    } else {
        warn!(ticks, "gave up before the table came to rest");
    }

    for id in balls.iter().copied().chain(std::iter::once(cue)) {
        if let Some(e) = sim.get(id) {
            let state = if e.suspended { "pocketed" } else { "on table" };
            info!(ball = %id, x = e.bounds.x, y = e.bounds.y, state, "final position");
        }
    }
    Ok(())
}

/// Fifteen balls in a triangle pointing at the head of the table.
fn rack(sim: &mut Simulation, kind: BodyType, bounds: &Rect, size: Vec2) -> Vec<EntityId> {
    let apex = Vec2::new(
        bounds.x + bounds.width * 0.68,
        bounds.y + (bounds.height - size.y) / 2.0,
    );
    let row_step = (size.x + BALL_GAP) * 3f64.sqrt() / 2.0;
    let col_step = size.y + BALL_GAP;

    let mut ids = Vec::with_capacity(RACK_SIZE);
    let mut row = 0;
    while ids.len() < RACK_SIZE {
        for k in 0..=row {
            if ids.len() == RACK_SIZE {
                break;
            }
            let offset = k as f64 - row as f64 / 2.0;
            let at = Vec2::new(apex.x + row as f64 * row_step, apex.y + offset * col_step);
            ids.push(sim.add(ball_at(kind, at, size, ids.len() as i32 + 1)));
        }
        row += 1;
    }
    ids
}

/// Cue ball on the head spot.
fn place_cue(sim: &mut Simulation, kind: BodyType, bounds: &Rect, size: Vec2) -> EntityId {
    let at = Vec2::new(
        bounds.x + bounds.width * 0.25,
        bounds.y + (bounds.height - size.y) / 2.0,
    );
    sim.add(ball_at(kind, at, size, 0))
}

fn ball_at(kind: BodyType, at: Vec2, size: Vec2, order: i32) -> Entity {
    Entity::new(kind, Rect::new(at.x, at.y, size.x, size.y))
        .with_shape(Shape::Ellipse)
        .with_order(order)
}
