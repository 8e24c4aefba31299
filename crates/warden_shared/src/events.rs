//! Host feed types.
//!
//! These are the shapes the host server delivers to the detection core.
//! The host decodes its own network traffic; the core only sees these.

use crate::math::Vec3;
use serde::{Deserialize, Serialize};

/// Transient per-session entity handle.
///
/// Distinct from the stable identity used for reputation, which survives
/// reconnects.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct EntityId(pub u64);

impl std::fmt::Display for EntityId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "entity#{}", self.0)
    }
}

/// Movement state flags for one tick.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MovementFlags {
    /// Grounded state as claimed by the client.
    pub claimed_on_ground: bool,
    /// Grounded state according to the authoritative server world.
    pub server_on_ground: bool,
    /// Entity is submerged in water or another non-damaging liquid.
    pub in_liquid: bool,
    /// Entity is submerged in lava.
    pub in_lava: bool,
    /// Entity is sprinting.
    pub sprinting: bool,
    /// Entity is sneaking.
    pub sneaking: bool,
}

/// Events delivered by the host.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum HostEvent {
    /// Per-tick movement update.
    Movement {
        /// Entity handle
        entity: EntityId,
        /// Reported position
        position: Vec3,
        /// Reported yaw in degrees
        yaw: f64,
        /// Reported pitch in degrees
        pitch: f64,
        /// Reported velocity in units per tick
        velocity: Vec3,
        /// Movement flags
        flags: MovementFlags,
        /// Host timestamp in milliseconds
        timestamp_ms: u64,
    },

    /// Click or interaction.
    Click {
        /// Entity handle
        entity: EntityId,
        /// Host timestamp in milliseconds
        timestamp_ms: u64,
    },

    /// Combat hit landed by the entity.
    CombatHit {
        /// Entity handle
        entity: EntityId,
        /// Host timestamp in milliseconds
        timestamp_ms: u64,
    },

    /// Entity disconnected.
    Disconnect {
        /// Entity handle
        entity: EntityId,
    },
}

impl HostEvent {
    /// Returns the entity this event concerns.
    #[must_use]
    pub const fn entity(&self) -> EntityId {
        match self {
            Self::Movement { entity, .. }
            | Self::Click { entity, .. }
            | Self::CombatHit { entity, .. }
            | Self::Disconnect { entity } => *entity,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_entity() {
        let event = HostEvent::Click { entity: EntityId(7), timestamp_ms: 100 };
        assert_eq!(event.entity(), EntityId(7));
        assert_eq!(EntityId(7).to_string(), "entity#7");
    }
}
