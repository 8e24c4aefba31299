//! # WARDEN Simulation
//!
//! MISSION: Show the engine separating humans from scripts at server load:
//! - 500 entities, 20% of them scripted
//! - 20 Hz tick rate
//! - Events fed from 4 worker threads
//!
//! Usage: `warden_sim [entities] [ticks] [threads]`
//!
//! Set `WARDEN_CONFIG` to a TOML file to override the engine configuration,
//! and `RUST_LOG` to control log output. Without a config file every run
//! starts from a fresh reputation table in a scratch directory.

use std::path::Path;
use std::sync::Arc;
use std::time::Instant;

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use tracing_subscriber::EnvFilter;
use warden::{
    EntityId, HostEvent, MovementFlags, SecurityResult, StaticEnvironment, Vec3, Warden,
    WardenConfig,
};

/// Ticks between clean-interval rewards (5 seconds).
const REWARD_INTERVAL_TICKS: u64 = 100;
/// Milliseconds per tick at 20 Hz.
const TICK_MS: u64 = 50;

/// Behaviour driving one simulated entity.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Behaviour {
    Human,
    SpeedHack,
    AutoClicker,
    Triggerbot,
}

impl Behaviour {
    const ALL: [Self; 4] = [Self::Human, Self::SpeedHack, Self::AutoClicker, Self::Triggerbot];

    fn for_index(index: u64) -> Self {
        // One in five entities is scripted, spread over the three scripts.
        match index % 15 {
            0 => Self::SpeedHack,
            5 => Self::AutoClicker,
            10 => Self::Triggerbot,
            _ => Self::Human,
        }
    }

    const fn label(self) -> &'static str {
        match self {
            Self::Human => "human",
            Self::SpeedHack => "speed hack",
            Self::AutoClicker => "auto clicker",
            Self::Triggerbot => "triggerbot",
        }
    }
}

/// Mutable state of one simulated entity.
struct Actor {
    entity: EntityId,
    identity: String,
    behaviour: Behaviour,
    position: Vec3,
    yaw: f64,
    next_click_ms: u64,
    alerted: bool,
}

impl Actor {
    fn new(index: u64) -> Self {
        #[allow(clippy::cast_precision_loss)]
        let x = index as f64 * 4.0;
        Self {
            entity: EntityId(index),
            identity: format!("player-{index:05}"),
            behaviour: Behaviour::for_index(index),
            position: Vec3::new(x, 64.0, 0.0),
            yaw: 0.0,
            next_click_ms: 0,
            alerted: false,
        }
    }

    /// Feeds one tick of this actor's events into the engine.
    fn tick(&mut self, warden: &Warden, rng: &mut ChaCha8Rng, tick: u64) -> SecurityResult<()> {
        let now_ms = tick * TICK_MS;
        let alert = warden.config().alert_level;

        let (velocity, yaw_step) = match self.behaviour {
            Behaviour::SpeedHack => {
                let speed = if tick % 2 == 0 { 3.0 } else { 4.0 };
                (Vec3::new(speed, 0.0, 0.0), 0.0)
            }
            _ => {
                let speed = rng.gen_range(0.18..0.28);
                (Vec3::new(speed, 0.0, 0.0), rng.gen_range(-4.0..4.0))
            }
        };
        self.position = self.position + velocity;
        self.yaw += yaw_step;

        let movement = HostEvent::Movement {
            entity: self.entity,
            position: self.position,
            yaw: self.yaw,
            pitch: rng.gen_range(-10.0..10.0),
            velocity,
            flags: MovementFlags { claimed_on_ground: true, server_on_ground: true, ..Default::default() },
            timestamp_ms: now_ms,
        };
        self.alerted |= warden.ingest(&movement) >= alert;

        if now_ms >= self.next_click_ms {
            self.alerted |= warden.ingest(&HostEvent::Click { entity: self.entity, timestamp_ms: now_ms }) >= alert;
            self.next_click_ms = now_ms
                + match self.behaviour {
                    Behaviour::AutoClicker => 100,
                    _ => rng.gen_range(120..400),
                };
        }

        if tick % 10 == 0 {
            let reaction = match self.behaviour {
                Behaviour::Triggerbot => rng.gen_range(8.0..30.0),
                _ => rng.gen_range(170.0..380.0),
            };
            self.alerted |= warden.record_combat_reaction(self.entity, reaction, now_ms)? >= alert;
        }

        if tick > 0 && tick % REWARD_INTERVAL_TICKS == 0 {
            if !self.alerted {
                warden.record_clean_interval(self.entity)?;
            }
            self.alerted = false;
        }
        Ok(())
    }
}

fn arg(index: usize, default: u64) -> u64 {
    std::env::args().nth(index).and_then(|a| a.parse().ok()).unwrap_or(default)
}

fn load_config(scratch: &Path) -> SecurityResult<WardenConfig> {
    match std::env::var_os("WARDEN_CONFIG") {
        Some(path) => WardenConfig::from_file(Path::new(&path)),
        None => Ok(WardenConfig { data_path: scratch.join("reputation.dat"), ..WardenConfig::default() }),
    }
}

fn main() -> SecurityResult<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .init();

    let entity_count = arg(1, 500);
    let ticks = arg(2, 1_200);
    let threads = arg(3, 4).max(1);

    println!("╔══════════════════════════════════════════════════════════════════╗");
    println!("║              WARDEN - HUMANS VS SCRIPTS SIMULATION               ║");
    println!("╚══════════════════════════════════════════════════════════════════╝");
    println!();
    println!("┌─ CONFIGURATION ─────────────────────────────────────────────────┐");
    println!("│ Entities:           {entity_count}");
    println!("│ Ticks:              {ticks} ({} s at 20 Hz)", ticks / 20);
    println!("│ Worker threads:     {threads}");
    println!("└──────────────────────────────────────────────────────────────────┘");
    println!();

    let scratch = tempfile::tempdir()?;
    let config = load_config(scratch.path())?;
    let warden = Warden::with_environment(config, Arc::new(StaticEnvironment::default()))?;

    let mut actors: Vec<Actor> = (0..entity_count).map(Actor::new).collect();
    for actor in &actors {
        warden.register_session(actor.entity, &actor.identity)?;
    }

    println!("Running simulation...");
    let start = Instant::now();

    let chunk = usize::try_from(entity_count.div_ceil(threads)).unwrap_or(usize::MAX).max(1);
    std::thread::scope(|scope| -> SecurityResult<()> {
        let workers: Vec<_> = actors
            .chunks_mut(chunk)
            .enumerate()
            .map(|(worker, group)| {
                let warden = &warden;
                scope.spawn(move || -> SecurityResult<()> {
                    let mut rng = ChaCha8Rng::seed_from_u64(0x5EED ^ worker as u64);
                    for tick in 0..ticks {
                        for actor in group.iter_mut() {
                            actor.tick(warden, &mut rng, tick)?;
                        }
                    }
                    Ok(())
                })
            })
            .collect();

        for worker in workers {
            match worker.join() {
                Ok(result) => result?,
                Err(_) => tracing::error!("Simulation worker panicked"),
            }
        }
        Ok(())
    })?;

    let elapsed = start.elapsed();
    let stats = warden.stats();

    println!();
    println!("╔══════════════════════════════════════════════════════════════════╗");
    println!("║                       SIMULATION RESULTS                         ║");
    println!("╚══════════════════════════════════════════════════════════════════╝");
    println!();
    println!("┌─ PERFORMANCE ───────────────────────────────────────────────────┐");
    println!("│ Wall time:          {:.2?}", elapsed);
    println!("│ Events:             {}", stats.events);
    #[allow(clippy::cast_precision_loss)]
    let rate = stats.events as f64 / elapsed.as_secs_f64().max(1e-9);
    println!("│ Events/sec:         {rate:.0}");
    println!("└──────────────────────────────────────────────────────────────────┘");
    println!();
    println!("┌─ DETECTION ─────────────────────────────────────────────────────┐");
    println!("│ {:<14} {:>6} {:>9} {:>14}", "behaviour", "count", "flagged", "mean rep");
    for behaviour in Behaviour::ALL {
        let group: Vec<&Actor> = actors.iter().filter(|a| a.behaviour == behaviour).collect();
        if group.is_empty() {
            continue;
        }
        let reputations: Vec<f64> = group.iter().map(|a| warden.get_reputation(&a.identity)).collect();
        let flagged = reputations.iter().filter(|&&r| r < 50.0).count();
        #[allow(clippy::cast_precision_loss)]
        let mean = reputations.iter().sum::<f64>() / reputations.len() as f64;
        println!("│ {:<14} {:>6} {:>9} {:>14.1}", behaviour.label(), group.len(), flagged, mean);
    }
    println!("│");
    println!("│ Alerts:             {}", stats.alerts);
    println!("│ Violations:         {}", stats.violations);
    println!("└──────────────────────────────────────────────────────────────────┘");

    let maintenance = warden.shutdown();
    println!();
    println!("Reputation saves: {} ({} failed)", maintenance.saves, maintenance.save_failures);

    Ok(())
}
