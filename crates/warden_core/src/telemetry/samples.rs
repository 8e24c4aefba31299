//! Typed telemetry samples and the keys that address them.

use warden_shared::Vec3;

/// One recorded position.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct PositionSample {
    /// Reported position.
    pub position: Vec3,
    /// Euclidean distance from the previous reported position.
    pub distance_from_prev: f64,
    /// Host timestamp in milliseconds.
    pub timestamp_ms: u64,
}

/// One recorded rotation.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct RotationSample {
    /// Yaw in degrees.
    pub yaw: f64,
    /// Pitch in degrees.
    pub pitch: f64,
    /// Yaw change since the previous sample, normalized to `(-180, 180]`.
    pub yaw_delta: f64,
    /// Unsigned pitch change since the previous sample.
    pub pitch_delta: f64,
    /// Host timestamp in milliseconds.
    pub timestamp_ms: u64,
}

impl RotationSample {
    /// True if neither yaw nor pitch moved.
    #[must_use]
    pub fn is_frozen(&self) -> bool {
        self.yaw_delta == 0.0 && self.pitch_delta == 0.0
    }
}

/// Named statistical detectors.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[repr(u8)]
pub enum PatternType {
    /// Intervals that never vary (macro clicking).
    PerfectTiming = 0,
    /// Aim moving along a straight line.
    LinearAim = 1,
    /// Speed that never varies.
    ConstantSpeed = 2,
    /// Input with no human micro-jitter.
    ZeroJitter = 3,
    /// Reactions faster than a human can manage.
    InstantReaction = 4,
    /// Successive values that track each other exactly.
    PerfectPrediction = 5,
}

impl PatternType {
    /// Every detector, in discriminant order.
    pub const ALL: [Self; 6] = [
        Self::PerfectTiming,
        Self::LinearAim,
        Self::ConstantSpeed,
        Self::ZeroJitter,
        Self::InstantReaction,
        Self::PerfectPrediction,
    ];

    /// Stable upper-case name, used as a check name.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::PerfectTiming => "PERFECT_TIMING",
            Self::LinearAim => "LINEAR_AIM",
            Self::ConstantSpeed => "CONSTANT_SPEED",
            Self::ZeroJitter => "ZERO_JITTER",
            Self::InstantReaction => "INSTANT_REACTION",
            Self::PerfectPrediction => "PERFECT_PREDICTION",
        }
    }
}

/// A batch of values submitted to one detector.
#[derive(Clone, Debug, PartialEq)]
pub struct PatternSample {
    /// Detector the values were submitted to.
    pub pattern: PatternType,
    /// Raw values.
    pub values: Vec<f64>,
    /// Host timestamp in milliseconds.
    pub timestamp_ms: u64,
}

/// Gameplay domains observed through resource and interaction events.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[repr(u8)]
pub enum DomainKind {
    /// Block break intervals (ms).
    Mining = 0,
    /// Catch reaction times (ms).
    Fishing = 1,
    /// Crafts per minute.
    Crafting = 2,
    /// Resources gained per minute.
    ResourceGain = 3,
}

impl DomainKind {
    /// Every domain, in discriminant order.
    pub const ALL: [Self; 4] = [Self::Mining, Self::Fishing, Self::Crafting, Self::ResourceGain];

    /// Stable upper-case name, used as a check name.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Mining => "MINING",
            Self::Fishing => "FISHING",
            Self::Crafting => "CRAFTING",
            Self::ResourceGain => "RESOURCE_GAIN",
        }
    }
}

/// Scalar series kept per entity.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum SeriesKind {
    /// Milliseconds between consecutive clicks.
    ClickIntervals,
    /// Milliseconds between consecutive combat hits.
    HitIntervals,
    /// Milliseconds from a combat stimulus to the entity's response.
    ReactionTimes,
    /// Observations for one gameplay domain.
    Domain(DomainKind),
}

/// Addresses one buffer of an entity profile.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum BufferKind {
    /// Position history.
    Position,
    /// Rotation history.
    Rotation,
    /// Velocity history.
    Velocity,
    /// Pattern submissions for one detector.
    Pattern(PatternType),
    /// A scalar series.
    Series(SeriesKind),
}

/// Owned point-in-time copy of one buffer, oldest first.
#[derive(Clone, Debug, PartialEq)]
pub enum Snapshot {
    /// Position history.
    Positions(Vec<PositionSample>),
    /// Rotation history.
    Rotations(Vec<RotationSample>),
    /// Velocity history.
    Velocities(Vec<Vec3>),
    /// Pattern submissions.
    Patterns(Vec<PatternSample>),
    /// Scalar series.
    Series(Vec<f64>),
}

impl Snapshot {
    /// Number of samples in the snapshot.
    #[must_use]
    pub fn len(&self) -> usize {
        match self {
            Self::Positions(v) => v.len(),
            Self::Rotations(v) => v.len(),
            Self::Velocities(v) => v.len(),
            Self::Patterns(v) => v.len(),
            Self::Series(v) => v.len(),
        }
    }

    /// True if the snapshot holds no samples.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
