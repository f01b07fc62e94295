#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Core contracts shared across the Awaking simulation.
//!
//! This crate defines the message surface that connects adapters, the
//! authoritative world, and pure systems. Adapters submit [`Command`] values
//! describing desired mutations, the world executes those commands via its
//! `apply` entry point, and then broadcasts [`Event`] values describing what
//! happened. Rendering and persistence layers only ever read the immutable
//! snapshots defined here.

use std::time::Duration;

pub use glam::Vec2;
use serde::{Deserialize, Serialize};

/// Canonical title emitted when the experience boots.
pub const TITLE: &str = "Awaking";

/// Commands that express all permissible world mutations.
#[derive(Clone, Debug, PartialEq)]
pub enum Command {
    /// Resizes the player-centred viewport used for spawning and bounds checks.
    ConfigureViewport {
        /// Width of the visible region in world units.
        width: f32,
        /// Height of the visible region in world units.
        height: f32,
    },
    /// Moves the player to the provided world position.
    MovePlayer {
        /// New centre of the player's bounding box.
        position: Vec2,
    },
    /// Requests that the population spawn a single NPC immediately.
    SpawnNpc,
    /// Advances the simulation by one frame.
    Tick {
        /// Duration of simulated time that elapsed since the previous tick.
        dt: Duration,
        /// Whether the interaction action is held during this tick.
        interact_pressed: bool,
    },
    /// Resumes player state from a persisted record.
    ///
    /// A successful restore starts the session over: every live NPC is
    /// despawned and the population is unlocked, even after the game ended.
    Restore {
        /// Record produced by a previous session.
        record: SaveRecord,
    },
}

/// Events broadcast by the world after processing commands.
#[derive(Clone, Debug, PartialEq)]
pub enum Event {
    /// Indicates that the simulation clock advanced.
    TimeAdvanced {
        /// Duration of simulated time that elapsed in the tick.
        dt: Duration,
    },
    /// Confirms that an NPC entered the population.
    NpcSpawned {
        /// Identifier assigned to the new NPC.
        npc: NpcId,
        /// Initial centre of the NPC.
        position: Vec2,
        /// Disposition rolled for the NPC.
        disposition: Disposition,
    },
    /// Reports that an NPC drifted out of bounds and was moved back to an edge.
    NpcRespawned {
        /// Identifier of the repositioned NPC.
        npc: NpcId,
        /// Centre of the NPC after repositioning.
        position: Vec2,
    },
    /// Reports that a convinced NPC left the playfield for good.
    NpcDespawned {
        /// Identifier of the removed NPC.
        npc: NpcId,
    },
    /// Reports that a spawn request was refused.
    SpawnRejected {
        /// Why the population refused to grow.
        reason: SpawnRejection,
    },
    /// Describes the outcome of a completed interaction.
    InteractionResolved {
        /// Full accounting of the interaction.
        report: InteractionReport,
    },
    /// Announces that the player's influence crossed the critical threshold.
    ThresholdCrossed,
    /// Announces that the game reached a terminal state.
    GameEnded {
        /// Terminal state the player landed in.
        state: GameState,
    },
    /// Confirms that player state was resumed from a save record.
    StateRestored,
    /// Reports that a save record could not be resumed; state is unchanged.
    RestoreRejected {
        /// Human-readable reason the record was refused.
        reason: String,
    },
}

/// Reasons a spawn request may be refused by the population.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SpawnRejection {
    /// The population already holds its maximum number of NPCs.
    AtCapacity,
}

/// Unique identifier assigned to an NPC.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct NpcId(u32);

impl NpcId {
    /// Creates a new NPC identifier with the provided numeric value.
    #[must_use]
    pub const fn new(value: u32) -> Self {
        Self(value)
    }

    /// Retrieves the numeric representation of the identifier.
    #[must_use]
    pub const fn get(&self) -> u32 {
        self.0
    }
}

/// Receptiveness category that governs how easily an NPC is persuaded.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Disposition {
    /// Hostile to persuasion; hardest to convince.
    Closed,
    /// Undecided; may go either way.
    Indecisive,
    /// Open to persuasion; easiest to convince.
    Receptive,
}

impl Disposition {
    /// Every disposition ordered from least to most receptive.
    pub const ALL: [Disposition; 3] = [Self::Closed, Self::Indecisive, Self::Receptive];
}

/// Horizontal heading of a walking NPC.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Heading {
    /// Walking toward decreasing x.
    Left,
    /// Walking toward increasing x.
    Right,
}

impl Heading {
    /// Signed unit factor applied to horizontal velocity.
    #[must_use]
    pub const fn sign(self) -> f32 {
        match self {
            Self::Left => -1.0,
            Self::Right => 1.0,
        }
    }

    /// Returns the opposite heading.
    #[must_use]
    pub const fn reversed(self) -> Self {
        match self {
            Self::Left => Self::Right,
            Self::Right => Self::Left,
        }
    }
}

/// Axis-aligned bounding box expressed in world units.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Aabb {
    min: Vec2,
    size: Vec2,
}

impl Aabb {
    /// Creates a box from its upper-left corner and size.
    #[must_use]
    pub const fn from_min_and_size(min: Vec2, size: Vec2) -> Self {
        Self { min, size }
    }

    /// Creates a box of the provided size centred on `center`.
    #[must_use]
    pub fn from_center(center: Vec2, size: Vec2) -> Self {
        Self {
            min: center - size * 0.5,
            size,
        }
    }

    /// Upper-left corner of the box.
    #[must_use]
    pub const fn min(&self) -> Vec2 {
        self.min
    }

    /// Width and height of the box.
    #[must_use]
    pub const fn size(&self) -> Vec2 {
        self.size
    }

    /// Centre of the box.
    #[must_use]
    pub fn center(&self) -> Vec2 {
        self.min + self.size * 0.5
    }

    /// Smallest x covered by the box.
    #[must_use]
    pub fn left(&self) -> f32 {
        self.min.x
    }

    /// Largest x covered by the box.
    #[must_use]
    pub fn right(&self) -> f32 {
        self.min.x + self.size.x
    }

    /// Smallest y covered by the box.
    #[must_use]
    pub fn top(&self) -> f32 {
        self.min.y
    }

    /// Largest y covered by the box.
    #[must_use]
    pub fn bottom(&self) -> f32 {
        self.min.y + self.size.y
    }

    /// Grows the box by `margin` on every side.
    #[must_use]
    pub fn inflate(&self, margin: f32) -> Self {
        Self {
            min: self.min - Vec2::splat(margin),
            size: self.size + Vec2::splat(margin * 2.0),
        }
    }

    /// Reports whether two boxes share any interior area.
    #[must_use]
    pub fn intersects(&self, other: &Aabb) -> bool {
        self.left() < other.right()
            && other.left() < self.right()
            && self.top() < other.bottom()
            && other.top() < self.bottom()
    }

    /// Penetration depth along each axis when the boxes intersect.
    #[must_use]
    pub fn overlap(&self, other: &Aabb) -> Option<Vec2> {
        if !self.intersects(other) {
            return None;
        }

        let x = self.right().min(other.right()) - self.left().max(other.left());
        let y = self.bottom().min(other.bottom()) - self.top().max(other.top());
        Some(Vec2::new(x, y))
    }
}

/// Visible region of the world, kept centred on the player.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Viewport {
    offset: Vec2,
    width: f32,
    height: f32,
}

impl Viewport {
    /// Creates a viewport whose upper-left corner sits at `offset`.
    #[must_use]
    pub const fn new(offset: Vec2, width: f32, height: f32) -> Self {
        Self {
            offset,
            width,
            height,
        }
    }

    /// Creates a viewport of the provided size centred on `focus`.
    #[must_use]
    pub fn centered_on(focus: Vec2, width: f32, height: f32) -> Self {
        Self {
            offset: focus - Vec2::new(width, height) * 0.5,
            width,
            height,
        }
    }

    /// Upper-left corner of the viewport in world units.
    #[must_use]
    pub const fn offset(&self) -> Vec2 {
        self.offset
    }

    /// Width of the viewport in world units.
    #[must_use]
    pub const fn width(&self) -> f32 {
        self.width
    }

    /// Height of the viewport in world units.
    #[must_use]
    pub const fn height(&self) -> f32 {
        self.height
    }

    /// Left edge in world units.
    #[must_use]
    pub fn left(&self) -> f32 {
        self.offset.x
    }

    /// Right edge in world units.
    #[must_use]
    pub fn right(&self) -> f32 {
        self.offset.x + self.width
    }

    /// Top edge in world units.
    #[must_use]
    pub fn top(&self) -> f32 {
        self.offset.y
    }

    /// Centre of the viewport in world units.
    #[must_use]
    pub fn center(&self) -> Vec2 {
        self.offset + Vec2::new(self.width, self.height) * 0.5
    }

    /// Bounding box covering the viewport.
    #[must_use]
    pub fn bounds(&self) -> Aabb {
        Aabb::from_min_and_size(self.offset, Vec2::new(self.width, self.height))
    }
}

/// Terminal state machine over the player's resources.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum GameState {
    /// The game is still running.
    Playing,
    /// Energy ran out before influence ever crossed the critical threshold.
    Exhausted,
    /// Energy or influence ran out after the critical threshold was crossed.
    Unraveled,
}

impl GameState {
    /// Reports whether the state is terminal.
    #[must_use]
    pub const fn is_game_over(self) -> bool {
        !matches!(self, Self::Playing)
    }

    /// Reports whether the special post-threshold ending was reached.
    #[must_use]
    pub const fn is_special_ending(self) -> bool {
        matches!(self, Self::Unraveled)
    }
}

/// Full accounting of a single resolved interaction.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct InteractionReport {
    /// NPC the player interacted with.
    pub npc: NpcId,
    /// Disposition of the NPC when the interaction started.
    pub disposition_before: Disposition,
    /// Disposition of the NPC once the interaction resolved.
    pub disposition_after: Disposition,
    /// Whether the NPC was persuaded.
    pub convinced: bool,
    /// Net change applied to the player's influence percentage.
    pub influence_delta: f32,
    /// Net change applied to the player's energy percentage.
    pub energy_delta: f32,
    /// Whether this interaction pushed influence across the critical threshold.
    pub threshold_crossed: bool,
}

/// Immutable representation of a single NPC's state used for queries.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct NpcSnapshot {
    /// Unique identifier assigned to the NPC.
    pub id: NpcId,
    /// Centre of the NPC in world units.
    pub position: Vec2,
    /// Bounding box derived from the position.
    pub bounds: Aabb,
    /// Current walking heading.
    pub heading: Heading,
    /// Current disposition.
    pub disposition: Disposition,
    /// Whether the NPC has been persuaded and is walking out.
    pub convinced: bool,
    /// Whether an interaction is in progress.
    pub interacting: bool,
    /// Whether the NPC is the player's current interaction target.
    pub can_interact: bool,
}

/// Read-only snapshot describing every NPC in the population.
#[derive(Clone, Debug, Default)]
pub struct NpcView {
    snapshots: Vec<NpcSnapshot>,
}

impl NpcView {
    /// Creates a new NPC view from the provided snapshots.
    #[must_use]
    pub fn from_snapshots(mut snapshots: Vec<NpcSnapshot>) -> Self {
        snapshots.sort_by_key(|snapshot| snapshot.id);
        Self { snapshots }
    }

    /// Iterator over the captured snapshots in deterministic order.
    pub fn iter(&self) -> impl Iterator<Item = &NpcSnapshot> {
        self.snapshots.iter()
    }

    /// Number of NPCs captured by the view.
    #[must_use]
    pub fn len(&self) -> usize {
        self.snapshots.len()
    }

    /// Reports whether the view is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.snapshots.is_empty()
    }

    /// Snapshots ordered by the bottom edge of their bounds, back to front.
    #[must_use]
    pub fn depth_sorted(&self) -> Vec<NpcSnapshot> {
        let mut ordered = self.snapshots.clone();
        ordered.sort_by(|a, b| a.bounds.bottom().total_cmp(&b.bounds.bottom()));
        ordered
    }

    /// Consumes the view, yielding the underlying snapshots.
    #[must_use]
    pub fn into_vec(self) -> Vec<NpcSnapshot> {
        self.snapshots
    }
}

/// Immutable representation of the player's resource state.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PlayerSnapshot {
    /// Centre of the player's bounding box.
    pub position: Vec2,
    /// Influence percentage in `0.0..=100.0`.
    pub influence_percentage: f32,
    /// Energy percentage in `0.0..=100.0`.
    pub energy_percentage: f32,
    /// Current ability to persuade.
    pub conviction_rate: f32,
    /// Whether influence ever crossed the critical threshold.
    pub threshold_exceeded: bool,
    /// Number of NPCs persuaded so far.
    pub convinced_count: u32,
    /// Current terminal-state classification.
    pub state: GameState,
}

/// Scalars the lighting overlay derives from the player's state.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct LightCue {
    /// Light radius as a fraction of the maximum radius, in `0.0..=1.0`.
    pub radius_fraction: f32,
    /// Light intensity in `0.0..=1.0`.
    pub intensity: f32,
}

/// Flat record persisted by save/load layers to resume a session.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct SaveRecord {
    /// Centre of the player's bounding box.
    pub player_position: Vec2,
    /// Influence percentage at save time.
    pub influence_percentage: f32,
    /// Energy percentage at save time.
    pub energy_percentage: f32,
    /// Conviction rate at save time.
    pub conviction_rate: f32,
    /// Whether the critical threshold had been crossed.
    pub threshold_exceeded: bool,
    /// Number of NPCs persuaded so far; absent in older records.
    #[serde(default)]
    pub convinced_count: u32,
}
