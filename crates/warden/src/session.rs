//! Session table: maps transient entity handles to persistent identities.

use std::sync::Arc;

use dashmap::DashMap;
use warden_shared::{EntityId, MovementFlags, Vec3};

/// One movement update as last seen for an entity.
#[derive(Clone, Copy, Debug, PartialEq)]
pub(crate) struct Frame {
    pub position: Vec3,
    pub yaw: f64,
    pub pitch: f64,
    pub velocity: Vec3,
    pub flags: MovementFlags,
    pub timestamp_ms: u64,
}

#[derive(Default)]
struct Session {
    identity: Option<Arc<str>>,
    last_frame: Option<Frame>,
}

/// Live sessions keyed by entity.
///
/// Entities that move before they are registered get an anonymous entry so
/// their movement still has a previous frame to compare against.
#[derive(Default)]
pub(crate) struct SessionTable {
    sessions: DashMap<EntityId, Session>,
}

impl SessionTable {
    pub fn register(&self, entity: EntityId, identity: &str) -> Option<Arc<str>> {
        let mut session = self.sessions.entry(entity).or_default();
        session.identity.replace(Arc::from(identity))
    }

    pub fn remove(&self, entity: EntityId) -> bool {
        self.sessions.remove(&entity).is_some()
    }

    pub fn identity(&self, entity: EntityId) -> Option<Arc<str>> {
        self.sessions.get(&entity).and_then(|s| s.identity.clone())
    }

    /// Stores `frame` as the newest one and returns the frame it replaced.
    pub fn swap_frame(&self, entity: EntityId, frame: Frame) -> Option<Frame> {
        let mut session = self.sessions.entry(entity).or_default();
        session.last_frame.replace(frame)
    }

    /// Sessions with a registered identity.
    pub fn registered(&self) -> usize {
        self.sessions.iter().filter(|s| s.identity.is_some()).count()
    }

    /// All session entries.
    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    /// Forgets entities whose telemetry went idle.
    ///
    /// Anonymous sessions are dropped. Registered ones keep their identity
    /// but lose the last frame, so the next movement only seeds history.
    /// Returns the number of sessions dropped.
    pub fn release_idle(&self, entities: &[EntityId]) -> usize {
        let mut dropped = 0;
        for entity in entities {
            if self.sessions.remove_if(entity, |_, s| s.identity.is_none()).is_some() {
                dropped += 1;
            } else if let Some(mut session) = self.sessions.get_mut(entity) {
                session.last_frame = None;
            }
        }
        dropped
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn frame(x: f64) -> Frame {
        Frame {
            position: Vec3::new(x, 0.0, 0.0),
            yaw: 0.0,
            pitch: 0.0,
            velocity: Vec3::ZERO,
            flags: MovementFlags::default(),
            timestamp_ms: 0,
        }
    }

    #[test]
    fn test_register_and_frames() {
        let table = SessionTable::default();
        assert!(table.swap_frame(EntityId(1), frame(1.0)).is_none());
        assert_eq!(table.swap_frame(EntityId(1), frame(2.0)), Some(frame(1.0)));
        assert_eq!(table.registered(), 0);

        assert!(table.register(EntityId(1), "alex").is_none());
        assert_eq!(table.identity(EntityId(1)).as_deref(), Some("alex"));
        assert_eq!(table.registered(), 1);

        assert!(table.remove(EntityId(1)));
        assert!(!table.remove(EntityId(1)));
        assert!(table.identity(EntityId(1)).is_none());
    }

    #[test]
    fn test_release_idle() {
        let table = SessionTable::default();
        table.swap_frame(EntityId(1), frame(1.0));
        table.register(EntityId(2), "alex");
        table.swap_frame(EntityId(2), frame(2.0));
        table.swap_frame(EntityId(3), frame(3.0));

        assert_eq!(table.release_idle(&[EntityId(1), EntityId(2), EntityId(9)]), 1);
        assert_eq!(table.len(), 2);
        assert_eq!(table.registered(), 1);
        assert_eq!(table.identity(EntityId(2)).as_deref(), Some("alex"));
        assert!(table.swap_frame(EntityId(2), frame(4.0)).is_none());
        assert_eq!(table.swap_frame(EntityId(3), frame(5.0)), Some(frame(3.0)));
    }
}
