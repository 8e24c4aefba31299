//! # Physics Prediction
//!
//! Pure functions that say what movement the server should expect.
//!
//! Everything here is stateless and deterministic: identical inputs give
//! bit-identical outputs, so a flagged tick can be replayed and re-scored.

use warden_shared::{MovementFlags, Vec3};

/// Downward acceleration per tick while airborne (units/tick²).
pub const GRAVITY: f64 = 0.08;

/// Velocity multiplier per tick in open air.
pub const AIR_FRICTION: f64 = 0.98;
/// Velocity multiplier per tick in water and other liquids.
pub const LIQUID_FRICTION: f64 = 0.8;
/// Velocity multiplier per tick in lava.
pub const LAVA_FRICTION: f64 = 0.5;
/// Velocity multiplier per tick on the ground.
pub const GROUND_FRICTION: f64 = 0.6;

/// Walking speed (units/tick).
pub const BASE_WALK_SPEED: f64 = 0.1;
/// Speed multiplier while sprinting.
pub const SPRINT_MULTIPLIER: f64 = 1.3;
/// Speed multiplier while sneaking.
pub const SNEAK_MULTIPLIER: f64 = 0.3;

/// The medium surrounding an entity.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Medium {
    /// Open air.
    #[default]
    Air,
    /// Water or another non-damaging liquid.
    Liquid,
    /// Lava.
    Lava,
}

impl Medium {
    /// Derives the medium from host flags. Lava wins over liquid.
    #[must_use]
    pub const fn from_flags(flags: &MovementFlags) -> Self {
        if flags.in_lava {
            Self::Lava
        } else if flags.in_liquid {
            Self::Liquid
        } else {
            Self::Air
        }
    }

    /// True for liquid and lava.
    #[must_use]
    pub const fn is_fluid(self) -> bool {
        matches!(self, Self::Liquid | Self::Lava)
    }
}

/// Movement-relevant state of an entity.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct EntityState {
    /// Current velocity (units/tick).
    pub velocity: Vec3,
    /// Authoritative grounded state.
    pub on_ground: bool,
    /// Entity is sprinting.
    pub sprinting: bool,
    /// Entity is sneaking.
    pub sneaking: bool,
}

impl EntityState {
    /// Builds the state from host flags, trusting the server's ground check.
    #[must_use]
    pub const fn from_flags(velocity: Vec3, flags: &MovementFlags) -> Self {
        Self {
            velocity,
            on_ground: flags.server_on_ground,
            sprinting: flags.sprinting,
            sneaking: flags.sneaking,
        }
    }
}

/// Friction multiplier for the entity in the given medium.
#[must_use]
pub fn friction(state: &EntityState, medium: Medium) -> f64 {
    match medium {
        Medium::Liquid => LIQUID_FRICTION,
        Medium::Lava => LAVA_FRICTION,
        Medium::Air if state.on_ground => GROUND_FRICTION,
        Medium::Air => AIR_FRICTION,
    }
}

/// Velocity expected one tick from now.
///
/// Applies friction first, then gravity unless grounded or in a fluid.
#[must_use]
pub fn predict(state: &EntityState, medium: Medium) -> Vec3 {
    let mut expected = state.velocity * friction(state, medium);
    if !state.on_ground && !medium.is_fluid() {
        expected.y -= GRAVITY;
    }
    expected
}

/// Horizontal distance a legitimate entity can cover in `ticks`.
///
/// Sneaking takes precedence over sprinting.
#[must_use]
pub fn expected_distance(state: &EntityState, ticks: u32) -> f64 {
    let multiplier = if state.sneaking {
        SNEAK_MULTIPLIER
    } else if state.sprinting {
        SPRINT_MULTIPLIER
    } else {
        1.0
    };
    BASE_WALK_SPEED * multiplier * f64::from(ticks)
}
