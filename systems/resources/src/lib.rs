#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Player resource bookkeeping: influence, energy, conviction rate and the
//! terminal game-over state machine.
//!
//! Every mutation clamps instead of failing. Once the game reaches a
//! terminal [`GameState`] the resources freeze, so repeated calls after the
//! end never change the outcome.

use awaking_core::{Disposition, GameState, PlayerSnapshot, SaveRecord, Vec2};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::info;

const PERCENT_MIN: f32 = 0.0;
const PERCENT_MAX: f32 = 100.0;

/// Economy tuning surface for the player's resources.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ResourceTuning {
    /// Influence at which the world turns against the player, one way.
    pub critical_influence_threshold: f32,
    /// Influence the player starts a fresh session with.
    pub initial_influence: f32,
    /// Energy the player starts a fresh session with.
    pub initial_energy: f32,
    /// Conviction rate the player starts a fresh session with.
    pub initial_conviction_rate: f32,
    /// Lower clamp for the conviction rate before the threshold is crossed.
    pub min_conviction_rate: f32,
    /// Upper clamp for the conviction rate.
    pub max_conviction_rate: f32,
    /// Passive energy drain in percentage points per second.
    pub energy_decay_rate: f32,
    /// Multiplier applied to the passive energy drain after the threshold.
    pub threshold_decay_multiplier: f32,
    /// Passive influence drain per second once the threshold has been crossed.
    pub influence_decay_rate: f32,
    /// Fixed energy cost of every interaction after the threshold.
    pub unraveling_energy_loss: f32,
}

impl Default for ResourceTuning {
    fn default() -> Self {
        Self {
            critical_influence_threshold: 87.0,
            initial_influence: 0.0,
            initial_energy: 100.0,
            initial_conviction_rate: 0.5,
            min_conviction_rate: 0.1,
            max_conviction_rate: 0.9,
            energy_decay_rate: 0.5,
            threshold_decay_multiplier: 2.0,
            influence_decay_rate: 0.5,
            unraveling_energy_loss: 10.0,
        }
    }
}

/// Resource deltas applied after interacting with one disposition.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DispositionDeltas {
    /// Influence gained when the NPC is persuaded.
    pub influence_on_success: f32,
    /// Net energy change when the NPC is persuaded.
    pub energy_on_success: f32,
    /// Conviction rate gained when the NPC is persuaded.
    pub rate_on_success: f32,
    /// Influence change when the NPC rejects the player.
    pub influence_on_rejection: f32,
    /// Energy change when the NPC rejects the player.
    pub energy_on_rejection: f32,
    /// Conviction rate lost when the NPC rejects the player.
    pub rate_on_rejection: f32,
}

impl Default for DispositionDeltas {
    fn default() -> Self {
        InteractionTable::default().receptive
    }
}

/// Outcome table keyed by the disposition the player interacted with.
///
/// Harder dispositions reward more influence and cost more energy.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct InteractionTable {
    /// Deltas applied after interacting with a closed NPC.
    pub closed: DispositionDeltas,
    /// Deltas applied after interacting with an indecisive NPC.
    pub indecisive: DispositionDeltas,
    /// Deltas applied after interacting with a receptive NPC.
    pub receptive: DispositionDeltas,
}

impl Default for InteractionTable {
    fn default() -> Self {
        Self {
            closed: DispositionDeltas {
                influence_on_success: 7.0,
                energy_on_success: -1.0,
                rate_on_success: 0.03,
                influence_on_rejection: -1.0,
                energy_on_rejection: -5.0,
                rate_on_rejection: 0.03,
            },
            indecisive: DispositionDeltas {
                influence_on_success: 6.0,
                energy_on_success: 1.0,
                rate_on_success: 0.02,
                influence_on_rejection: -0.7,
                energy_on_rejection: -3.5,
                rate_on_rejection: 0.02,
            },
            receptive: DispositionDeltas {
                influence_on_success: 5.0,
                energy_on_success: 3.0,
                rate_on_success: 0.01,
                influence_on_rejection: -0.5,
                energy_on_rejection: -2.5,
                rate_on_rejection: 0.01,
            },
        }
    }
}

impl InteractionTable {
    /// Deltas for the provided disposition.
    #[must_use]
    pub fn for_disposition(&self, disposition: Disposition) -> &DispositionDeltas {
        match disposition {
            Disposition::Closed => &self.closed,
            Disposition::Indecisive => &self.indecisive,
            Disposition::Receptive => &self.receptive,
        }
    }
}

/// Net change actually applied to the player after clamping.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct ResourceDelta {
    /// Applied change to the influence percentage.
    pub influence: f32,
    /// Applied change to the energy percentage.
    pub energy: f32,
}

/// Errors raised when a persisted record cannot be resumed.
#[derive(Clone, Debug, PartialEq, Error)]
pub enum RestoreError {
    /// A numeric field held NaN or an infinity.
    #[error("save record field `{field}` is not a finite number")]
    NonFinite {
        /// Name of the offending field.
        field: &'static str,
    },
}

/// Influence, energy and conviction-rate bookkeeping for the player.
#[derive(Clone, Debug)]
pub struct PlayerResources {
    tuning: ResourceTuning,
    table: InteractionTable,
    influence: f32,
    energy: f32,
    conviction_rate: f32,
    threshold_exceeded: bool,
    convinced_count: u32,
    state: GameState,
}

impl Default for PlayerResources {
    fn default() -> Self {
        Self::new(ResourceTuning::default(), InteractionTable::default())
    }
}

impl PlayerResources {
    /// Creates a fresh resource pool using the provided tuning.
    #[must_use]
    pub fn new(tuning: ResourceTuning, table: InteractionTable) -> Self {
        let mut resources = Self {
            influence: PERCENT_MIN,
            energy: clamp_percent(tuning.initial_energy),
            conviction_rate: clamp_rate(tuning.initial_conviction_rate, &tuning),
            threshold_exceeded: false,
            convinced_count: 0,
            state: GameState::Playing,
            tuning,
            table,
        };
        let initial_influence = resources.tuning.initial_influence;
        let _ = resources.update_influence(initial_influence);
        resources
    }

    /// Resumes a resource pool from a persisted record.
    ///
    /// Out-of-range percentages are clamped. Influence at or above the
    /// critical threshold marks the threshold as exceeded even if the record
    /// says otherwise.
    pub fn from_record(
        record: &SaveRecord,
        tuning: ResourceTuning,
        table: InteractionTable,
    ) -> Result<Self, RestoreError> {
        ensure_finite("influence_percentage", record.influence_percentage)?;
        ensure_finite("energy_percentage", record.energy_percentage)?;
        ensure_finite("conviction_rate", record.conviction_rate)?;

        let mut resources = Self::new(tuning, table);
        resources.influence = clamp_percent(record.influence_percentage);
        resources.energy = clamp_percent(record.energy_percentage);
        resources.convinced_count = record.convinced_count;
        resources.threshold_exceeded = record.threshold_exceeded
            || resources.influence >= resources.tuning.critical_influence_threshold;
        resources.conviction_rate = if resources.threshold_exceeded {
            0.0
        } else {
            clamp_rate(record.conviction_rate, &resources.tuning)
        };
        Ok(resources)
    }

    /// Tuning applied to this pool.
    #[must_use]
    pub fn tuning(&self) -> &ResourceTuning {
        &self.tuning
    }

    /// Influence percentage in `0.0..=100.0`.
    #[must_use]
    pub fn influence_percentage(&self) -> f32 {
        self.influence
    }

    /// Energy percentage in `0.0..=100.0`.
    #[must_use]
    pub fn energy_percentage(&self) -> f32 {
        self.energy
    }

    /// Current conviction rate; zero once the threshold has been exceeded.
    #[must_use]
    pub fn conviction_rate(&self) -> f32 {
        self.conviction_rate
    }

    /// Whether influence ever reached the critical threshold.
    #[must_use]
    pub fn threshold_exceeded(&self) -> bool {
        self.threshold_exceeded
    }

    /// Number of NPCs persuaded so far.
    #[must_use]
    pub fn convinced_count(&self) -> u32 {
        self.convinced_count
    }

    /// Current terminal-state classification.
    #[must_use]
    pub fn state(&self) -> GameState {
        self.state
    }

    /// Whether the game has ended.
    #[must_use]
    pub fn game_over(&self) -> bool {
        self.state.is_game_over()
    }

    /// Whether the post-threshold ending was reached.
    #[must_use]
    pub fn special_ending_triggered(&self) -> bool {
        self.state.is_special_ending()
    }

    /// Adds `delta` to influence, clamped to `0.0..=100.0`.
    ///
    /// Reaching the critical threshold flips the threshold flag for good and
    /// zeroes the conviction rate. Returns the resulting percentage.
    pub fn update_influence(&mut self, delta: f32) -> f32 {
        if self.game_over() || delta.is_nan() {
            return self.influence;
        }

        self.influence = clamp_percent(self.influence + delta);
        if !self.threshold_exceeded && self.influence >= self.tuning.critical_influence_threshold {
            self.threshold_exceeded = true;
            self.conviction_rate = 0.0;
            info!(
                influence = self.influence,
                threshold = self.tuning.critical_influence_threshold,
                "critical influence threshold exceeded"
            );
        }
        self.influence
    }

    /// Adds `delta` to energy, clamped to `0.0..=100.0`. Returns the resulting percentage.
    pub fn update_energy(&mut self, delta: f32) -> f32 {
        if self.game_over() || delta.is_nan() {
            return self.energy;
        }

        self.energy = clamp_percent(self.energy + delta);
        self.energy
    }

    /// Raises the conviction rate up to its maximum; ignored after the threshold.
    pub fn increase_conviction_rate(&mut self, amount: f32) -> f32 {
        if self.game_over() || self.threshold_exceeded {
            return self.conviction_rate;
        }

        self.conviction_rate =
            (self.conviction_rate + amount.abs()).min(self.tuning.max_conviction_rate);
        self.conviction_rate
    }

    /// Lowers the conviction rate down to its minimum; ignored after the threshold.
    pub fn decrease_conviction_rate(&mut self, amount: f32) -> f32 {
        if self.game_over() || self.threshold_exceeded {
            return self.conviction_rate;
        }

        self.conviction_rate =
            (self.conviction_rate - amount.abs()).max(self.tuning.min_conviction_rate);
        self.conviction_rate
    }

    /// Applies the outcome-table deltas for a pre-threshold interaction.
    pub fn apply_interaction(
        &mut self,
        disposition: Disposition,
        convinced: bool,
    ) -> ResourceDelta {
        if self.game_over() {
            return ResourceDelta::default();
        }

        let deltas = self.table.for_disposition(disposition).clone();
        let before = self.capture();
        if convinced {
            let _ = self.update_energy(deltas.energy_on_success);
            let _ = self.increase_conviction_rate(deltas.rate_on_success);
            let _ = self.update_influence(deltas.influence_on_success);
            self.convinced_count = self.convinced_count.saturating_add(1);
        } else {
            let _ = self.update_energy(deltas.energy_on_rejection);
            let _ = self.decrease_conviction_rate(deltas.rate_on_rejection);
            let _ = self.update_influence(deltas.influence_on_rejection);
        }
        self.delta_since(before)
    }

    /// Applies the guaranteed-failure penalty used once the threshold is exceeded.
    ///
    /// Energy drops by a fixed amount and influence shrinks in proportion to
    /// how many such interactions the remaining energy could pay for.
    pub fn apply_unraveling_penalty(&mut self) -> ResourceDelta {
        if self.game_over() {
            return ResourceDelta::default();
        }

        let before = self.capture();
        let energy_loss = self.tuning.unraveling_energy_loss.abs();
        let remaining_interactions = if energy_loss > 0.0 {
            (self.energy / energy_loss).max(1.0)
        } else {
            1.0
        };
        let influence_loss = self.influence / remaining_interactions;

        let _ = self.update_energy(-energy_loss);
        let _ = self.update_influence(-influence_loss);
        self.delta_since(before)
    }

    /// Applies passive decay for `dt` seconds, then evaluates terminal conditions.
    ///
    /// Returns the new state when this call ended the game.
    pub fn tick(&mut self, dt: f32) -> Option<GameState> {
        if self.game_over() {
            return None;
        }

        let dt = if dt.is_finite() { dt.max(0.0) } else { 0.0 };
        let mut energy_loss = self.tuning.energy_decay_rate * dt;
        if self.threshold_exceeded {
            energy_loss *= self.tuning.threshold_decay_multiplier;
            let _ = self.update_influence(-self.tuning.influence_decay_rate * dt);
        }
        let _ = self.update_energy(-energy_loss);

        self.evaluate()
    }

    /// Classifies the current resources and latches a terminal state.
    ///
    /// Post-threshold exhaustion takes priority when both resources hit zero
    /// in the same tick.
    pub fn evaluate(&mut self) -> Option<GameState> {
        if self.game_over() {
            return None;
        }

        let depleted = self.energy <= PERCENT_MIN || self.influence <= PERCENT_MIN;
        let next = if self.threshold_exceeded && depleted {
            GameState::Unraveled
        } else if self.energy <= PERCENT_MIN {
            GameState::Exhausted
        } else {
            return None;
        };

        self.state = next;
        info!(state = ?next, influence = self.influence, energy = self.energy, "game ended");
        Some(next)
    }

    /// Read-only snapshot for rendering layers.
    #[must_use]
    pub fn snapshot(&self, position: Vec2) -> PlayerSnapshot {
        PlayerSnapshot {
            position,
            influence_percentage: self.influence,
            energy_percentage: self.energy,
            conviction_rate: self.conviction_rate,
            threshold_exceeded: self.threshold_exceeded,
            convinced_count: self.convinced_count,
            state: self.state,
        }
    }

    /// Flat record suitable for persistence layers.
    #[must_use]
    pub fn save_record(&self, position: Vec2) -> SaveRecord {
        SaveRecord {
            player_position: position,
            influence_percentage: self.influence,
            energy_percentage: self.energy,
            conviction_rate: self.conviction_rate,
            threshold_exceeded: self.threshold_exceeded,
            convinced_count: self.convinced_count,
        }
    }

    fn capture(&self) -> (f32, f32) {
        (self.influence, self.energy)
    }

    fn delta_since(&self, (influence, energy): (f32, f32)) -> ResourceDelta {
        ResourceDelta {
            influence: self.influence - influence,
            energy: self.energy - energy,
        }
    }
}

fn clamp_percent(value: f32) -> f32 {
    if value.is_nan() {
        return PERCENT_MIN;
    }
    value.clamp(PERCENT_MIN, PERCENT_MAX)
}

/// Clamps a conviction rate into the tuned bounds without panicking on
/// inverted or NaN bounds.
fn clamp_rate(value: f32, tuning: &ResourceTuning) -> f32 {
    let low = tuning.min_conviction_rate.min(tuning.max_conviction_rate);
    let high = tuning.max_conviction_rate.max(tuning.min_conviction_rate);
    value.max(low).min(high)
}

fn ensure_finite(field: &'static str, value: f32) -> Result<(), RestoreError> {
    if value.is_finite() {
        Ok(())
    } else {
        Err(RestoreError::NonFinite { field })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clamp_percent_handles_nan() {
        assert_eq!(clamp_percent(f32::NAN), 0.0);
        assert_eq!(clamp_percent(150.0), 100.0);
    }

    #[test]
    fn clamp_rate_tolerates_inverted_and_nan_bounds() {
        let inverted = ResourceTuning {
            min_conviction_rate: 0.9,
            max_conviction_rate: 0.1,
            ..ResourceTuning::default()
        };
        assert_eq!(clamp_rate(0.5, &inverted), 0.5);
        assert_eq!(clamp_rate(2.0, &inverted), 0.9);

        let nan = ResourceTuning {
            min_conviction_rate: f32::NAN,
            ..ResourceTuning::default()
        };
        assert_eq!(clamp_rate(0.0, &nan), 0.0);
        assert_eq!(clamp_rate(1.5, &nan), 0.9);
    }

    #[test]
    fn rejection_table_rates_grow_with_difficulty() {
        let table = InteractionTable::default();
        assert!(table.closed.rate_on_rejection > table.indecisive.rate_on_rejection);
        assert!(table.indecisive.rate_on_rejection > table.receptive.rate_on_rejection);
        assert!(table.closed.influence_on_success > table.receptive.influence_on_success);
        assert!(table.closed.energy_on_success < table.receptive.energy_on_success);
    }
}
