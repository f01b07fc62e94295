//! Individual NPC entity: disposition state machine, locomotion and
//! collision avoidance.

use awaking_core::{
    Aabb, Disposition, Heading, InteractionReport, NpcId, NpcSnapshot, Vec2, Viewport,
};
use awaking_system_conviction::{conviction_probability, rejected_disposition, roll};
use awaking_system_resources::PlayerResources;
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::Tuning;

const MIN_STEP_SECONDS: f32 = 0.001;

/// Locomotion and timing knobs shared by every NPC.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NpcTuning {
    /// Width of the NPC's bounding box.
    pub width: f32,
    /// Height of the NPC's bounding box.
    pub height: f32,
    /// Amount trimmed from the width to form the narrower collision box.
    pub collision_inset: f32,
    /// Slowest walking speed rolled at spawn, in units per second.
    pub min_speed: f32,
    /// Fastest walking speed rolled at spawn, in units per second.
    pub max_speed: f32,
    /// Seconds an interaction keeps the NPC frozen in place.
    pub interaction_duration: f32,
    /// Speed multiplier applied while a convinced NPC walks out.
    pub convinced_speed_multiplier: f32,
    /// Distance beyond the viewport edge before an NPC counts as off-screen.
    pub offscreen_margin: f32,
    /// Seconds a convinced NPC must spend off-screen before it is removed.
    pub offscreen_limit: f32,
    /// Per-tick chance of a spontaneous heading reversal.
    pub reversal_chance: f32,
    /// Seconds after a reversal during which no other reversal may happen.
    pub reversal_cooldown: f32,
    /// Seconds after a collision during which collisions are ignored.
    pub collision_cooldown: f32,
    /// Seconds without real progress before the NPC is nudged forward.
    pub stuck_threshold: f32,
    /// Displacement below which the NPC counts as not moving.
    pub stuck_distance: f32,
    /// Distance of the forward nudge applied to a stuck NPC.
    pub stuck_nudge: f32,
}

impl Default for NpcTuning {
    fn default() -> Self {
        Self {
            width: 32.0,
            height: 64.0,
            collision_inset: 20.0,
            min_speed: 80.0,
            max_speed: 120.0,
            interaction_duration: 5.0,
            convinced_speed_multiplier: 1.5,
            offscreen_margin: 40.0,
            offscreen_limit: 2.0,
            reversal_chance: 0.001,
            reversal_cooldown: 3.0,
            collision_cooldown: 0.5,
            stuck_threshold: 8.0,
            stuck_distance: 10.0,
            stuck_nudge: 20.0,
        }
    }
}

/// A persuadable pedestrian walking across the playfield.
#[derive(Clone, Debug)]
pub struct Npc {
    id: NpcId,
    position: Vec2,
    size: Vec2,
    collision_size: Vec2,
    heading: Heading,
    speed: f32,
    disposition: Disposition,
    convinced: bool,
    interacting: bool,
    interaction_timer: f32,
    interaction_duration: f32,
    can_interact: bool,
    collision_cooldown: f32,
    reversal_cooldown: f32,
    stuck_timer: f32,
    last_position: Vec2,
    time_offscreen: f32,
    expired: bool,
}

impl Npc {
    /// Creates an NPC centred on `position`.
    #[must_use]
    pub fn new(
        id: NpcId,
        position: Vec2,
        heading: Heading,
        speed: f32,
        disposition: Disposition,
        tuning: &NpcTuning,
    ) -> Self {
        let size = Vec2::new(tuning.width, tuning.height);
        let collision_width = (tuning.width - tuning.collision_inset).max(1.0);
        Self {
            id,
            position,
            size,
            collision_size: Vec2::new(collision_width, tuning.height),
            heading,
            speed,
            disposition,
            convinced: false,
            interacting: false,
            interaction_timer: 0.0,
            interaction_duration: tuning.interaction_duration,
            can_interact: false,
            collision_cooldown: 0.0,
            reversal_cooldown: 0.0,
            stuck_timer: 0.0,
            last_position: position,
            time_offscreen: 0.0,
            expired: false,
        }
    }

    /// Identifier of the NPC.
    #[must_use]
    pub fn id(&self) -> NpcId {
        self.id
    }

    /// Authoritative centre of the NPC.
    #[must_use]
    pub fn position(&self) -> Vec2 {
        self.position
    }

    /// Bounding box snapped to whole units.
    #[must_use]
    pub fn bounds(&self) -> Aabb {
        Aabb::from_min_and_size((self.position - self.size * 0.5).round(), self.size)
    }

    /// Narrower box used for NPC-to-NPC collisions.
    #[must_use]
    pub fn collision_bounds(&self) -> Aabb {
        Aabb::from_center(self.bounds().center(), self.collision_size)
    }

    /// Current walking heading.
    #[must_use]
    pub fn heading(&self) -> Heading {
        self.heading
    }

    /// Base walking speed in units per second.
    #[must_use]
    pub fn speed(&self) -> f32 {
        self.speed
    }

    /// Current disposition.
    #[must_use]
    pub fn disposition(&self) -> Disposition {
        self.disposition
    }

    /// Whether the NPC has been persuaded.
    #[must_use]
    pub fn convinced(&self) -> bool {
        self.convinced
    }

    /// Whether an interaction is in progress.
    #[must_use]
    pub fn interacting(&self) -> bool {
        self.interacting
    }

    /// Seconds elapsed in the current interaction.
    #[must_use]
    pub fn interaction_timer(&self) -> f32 {
        self.interaction_timer
    }

    /// Whether the NPC is flagged as the player's interaction target.
    #[must_use]
    pub fn can_interact(&self) -> bool {
        self.can_interact
    }

    /// Whether the NPC left the playfield for good and awaits removal.
    #[must_use]
    pub fn expired(&self) -> bool {
        self.expired
    }

    /// Read-only snapshot for rendering layers.
    #[must_use]
    pub fn snapshot(&self) -> NpcSnapshot {
        NpcSnapshot {
            id: self.id,
            position: self.position,
            bounds: self.bounds(),
            heading: self.heading,
            disposition: self.disposition,
            convinced: self.convinced,
            interacting: self.interacting,
            can_interact: self.can_interact,
        }
    }

    /// Resolves a persuasion attempt by the player.
    ///
    /// Returns `None` without touching any state when the NPC is already
    /// interacting or convinced. Otherwise exactly two uniform draws are taken
    /// from `rng` (conviction, then disposition shift), at most one disposition
    /// transition happens and the player's resources are adjusted once.
    pub fn interact<R>(
        &mut self,
        player: &mut PlayerResources,
        tuning: &Tuning,
        rng: &mut R,
    ) -> Option<InteractionReport>
    where
        R: Rng + ?Sized,
    {
        if self.interacting || self.convinced {
            return None;
        }

        let disposition_before = self.disposition;
        let threshold_before = player.threshold_exceeded();
        let probability = conviction_probability(
            disposition_before,
            player.conviction_rate(),
            threshold_before,
            &tuning.conviction,
        );
        let convinced = roll(probability, rng);
        let shift_draw: f32 = rng.gen();

        let delta = if threshold_before {
            self.disposition = Disposition::Closed;
            player.apply_unraveling_penalty()
        } else {
            let delta = player.apply_interaction(disposition_before, convinced);
            if convinced {
                self.convinced = true;
                self.disposition = Disposition::Receptive;
            } else {
                self.disposition =
                    rejected_disposition(disposition_before, shift_draw, &tuning.shift);
            }
            delta
        };

        self.interacting = true;
        self.interaction_timer = 0.0;
        self.can_interact = false;

        Some(InteractionReport {
            npc: self.id,
            disposition_before,
            disposition_after: self.disposition,
            convinced: self.convinced,
            influence_delta: delta.influence,
            energy_delta: delta.energy,
            threshold_crossed: !threshold_before && player.threshold_exceeded(),
        })
    }

    /// Advances locomotion by `dt` seconds.
    ///
    /// `obstacles` holds the collision boxes of the other NPCs that are not
    /// interacting.
    pub fn update<R>(
        &mut self,
        dt: f32,
        viewport: &Viewport,
        obstacles: &[Aabb],
        tuning: &NpcTuning,
        rng: &mut R,
    ) where
        R: Rng + ?Sized,
    {
        let dt = if dt.is_finite() {
            dt.max(MIN_STEP_SECONDS)
        } else {
            MIN_STEP_SECONDS
        };
        self.collision_cooldown = (self.collision_cooldown - dt).max(0.0);
        self.reversal_cooldown = (self.reversal_cooldown - dt).max(0.0);

        if self.interacting {
            self.interaction_timer += dt;
            if self.interaction_timer >= self.interaction_duration {
                self.interacting = false;
                self.interaction_timer = 0.0;
            }
            return;
        }

        if self.convinced {
            self.walk_out(dt, viewport, tuning);
            return;
        }

        self.detect_stuck(dt, tuning);

        // No spontaneous turns while still walking in from beyond the margin.
        let offscreen = self.beyond_margin(viewport, tuning).is_some();
        if !offscreen
            && self.reversal_cooldown <= 0.0
            && rng.gen::<f32>() < tuning.reversal_chance
        {
            self.heading = self.heading.reversed();
            self.reversal_cooldown = tuning.reversal_cooldown;
        }

        if self.collision_cooldown <= 0.0 {
            self.resolve_collision(obstacles, tuning, rng);
        }

        self.position.x += self.heading.sign() * self.speed * dt;
        self.keep_on_playfield(viewport, tuning);
    }

    pub(crate) fn set_can_interact(&mut self, can_interact: bool) {
        self.can_interact = can_interact;
    }

    /// Forces the NPC closed unless its disposition is frozen by conviction.
    pub(crate) fn force_closed(&mut self) {
        if !self.convinced {
            self.disposition = Disposition::Closed;
        }
    }

    /// Moves the NPC to a fresh edge position, keeping its disposition.
    pub(crate) fn relocate(&mut self, position: Vec2, heading: Heading) {
        self.position = position;
        self.heading = heading;
        self.stuck_timer = 0.0;
        self.last_position = position;
        self.time_offscreen = 0.0;
    }

    fn walk_out(&mut self, dt: f32, viewport: &Viewport, tuning: &NpcTuning) {
        let to_left = self.position.x - viewport.left();
        let to_right = viewport.right() - self.position.x;
        self.heading = if to_left < to_right {
            Heading::Left
        } else {
            Heading::Right
        };

        let speed = self.speed * tuning.convinced_speed_multiplier;
        self.position.x += self.heading.sign() * speed * dt;

        if self.beyond_margin(viewport, tuning).is_some() {
            self.time_offscreen += dt;
            if self.time_offscreen >= tuning.offscreen_limit {
                self.expired = true;
            }
        } else {
            self.time_offscreen = 0.0;
        }
    }

    fn detect_stuck(&mut self, dt: f32, tuning: &NpcTuning) {
        if self.position.distance(self.last_position) < tuning.stuck_distance {
            self.stuck_timer += dt;
            if self.stuck_timer > tuning.stuck_threshold {
                self.position.x += self.heading.sign() * tuning.stuck_nudge;
                self.stuck_timer = 0.0;
            }
        } else {
            self.stuck_timer = 0.0;
            self.last_position = self.position;
        }
    }

    fn resolve_collision<R>(&mut self, obstacles: &[Aabb], tuning: &NpcTuning, rng: &mut R)
    where
        R: Rng + ?Sized,
    {
        let own = self.collision_bounds();
        let Some((other, overlap)) = obstacles
            .iter()
            .find_map(|other| own.overlap(other).map(|overlap| (other, overlap)))
        else {
            return;
        };

        if rng.gen::<bool>() {
            let away = own.center() - other.center();
            if overlap.x <= overlap.y {
                self.position.x += push_sign(away.x, -self.heading.sign()) * overlap.x;
            } else {
                self.position.y += push_sign(away.y, 1.0) * overlap.y;
            }
        } else {
            self.heading = self.heading.reversed();
        }
        self.collision_cooldown = tuning.collision_cooldown;
    }

    fn keep_on_playfield(&mut self, viewport: &Viewport, tuning: &NpcTuning) {
        let Some(side) = self.beyond_margin(viewport, tuning) else {
            self.time_offscreen = 0.0;
            return;
        };

        // Walkers still coming in from a spawn edge are left alone.
        if side != self.heading {
            return;
        }

        self.heading = self.heading.reversed();
        self.position.x = match side {
            Heading::Left => viewport.left(),
            Heading::Right => viewport.right(),
        };
    }

    /// Side of the viewport the NPC has left by more than the grace margin.
    fn beyond_margin(&self, viewport: &Viewport, tuning: &NpcTuning) -> Option<Heading> {
        let bounds = self.bounds();
        if bounds.right() < viewport.left() - tuning.offscreen_margin {
            Some(Heading::Left)
        } else if bounds.left() > viewport.right() + tuning.offscreen_margin {
            Some(Heading::Right)
        } else {
            None
        }
    }
}

fn push_sign(component: f32, fallback: f32) -> f32 {
    if component > 0.0 {
        1.0
    } else if component < 0.0 {
        -1.0
    } else {
        fallback
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn push_sign_falls_back_for_coincident_centres() {
        assert_eq!(push_sign(0.0, -1.0), -1.0);
        assert_eq!(push_sign(3.0, -1.0), 1.0);
        assert_eq!(push_sign(-0.5, 1.0), -1.0);
    }

    #[test]
    fn collision_box_is_narrower_than_bounds() {
        let tuning = NpcTuning::default();
        let npc = Npc::new(
            NpcId::new(0),
            Vec2::new(100.0, 100.0),
            Heading::Right,
            100.0,
            Disposition::Closed,
            &tuning,
        );
        assert!((npc.collision_bounds().size().x - 12.0).abs() < f32::EPSILON);
        assert_eq!(npc.collision_bounds().center(), npc.bounds().center());
    }
}
