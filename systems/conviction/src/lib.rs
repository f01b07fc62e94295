#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Pure conviction model that turns player state into persuasion odds.
//!
//! The model never owns randomness. Callers supply the random source, and
//! [`roll`] consumes exactly one uniform draw so replays with an injected
//! generator stay reproducible.

use awaking_core::Disposition;
use rand::Rng;
use serde::{Deserialize, Serialize};

/// Tuning knobs for the base persuasion odds.
///
/// Success probability is `base(disposition) + conviction_rate * rate_weight`,
/// clamped to `0.0..=1.0`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConvictionTuning {
    /// Base odds against a closed NPC.
    pub closed_base: f32,
    /// Base odds against an indecisive NPC.
    pub indecisive_base: f32,
    /// Base odds against a receptive NPC.
    pub receptive_base: f32,
    /// Weight applied to the player's conviction rate; must stay non-negative.
    pub rate_weight: f32,
}

impl Default for ConvictionTuning {
    fn default() -> Self {
        Self {
            closed_base: 0.2,
            indecisive_base: 0.4,
            receptive_base: 0.7,
            rate_weight: 0.3,
        }
    }
}

impl ConvictionTuning {
    /// Base odds for the provided disposition before the rate contribution.
    #[must_use]
    pub fn base_odds(&self, disposition: Disposition) -> f32 {
        match disposition {
            Disposition::Closed => self.closed_base,
            Disposition::Indecisive => self.indecisive_base,
            Disposition::Receptive => self.receptive_base,
        }
    }

    /// Reports whether odds grow with receptiveness and with the conviction rate.
    #[must_use]
    pub fn is_monotone(&self) -> bool {
        self.rate_weight >= 0.0
            && self.closed_base <= self.indecisive_base
            && self.indecisive_base <= self.receptive_base
    }
}

/// Chances that a rejected NPC drifts to a neighbouring disposition.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ShiftTuning {
    /// Chance that a closed NPC becomes indecisive after rejecting the player.
    pub softening_chance: f32,
    /// Chance that an indecisive NPC becomes closed after rejecting the player.
    pub hardening_chance: f32,
    /// Chance that a receptive NPC becomes indecisive after rejecting the player.
    pub cooling_chance: f32,
}

impl Default for ShiftTuning {
    fn default() -> Self {
        Self {
            softening_chance: 0.2,
            hardening_chance: 0.3,
            cooling_chance: 0.2,
        }
    }
}

/// Probability that a persuasion attempt succeeds.
///
/// Returns zero once the critical threshold has been exceeded, regardless of
/// disposition or rate.
#[must_use]
pub fn conviction_probability(
    disposition: Disposition,
    conviction_rate: f32,
    threshold_exceeded: bool,
    tuning: &ConvictionTuning,
) -> f32 {
    if threshold_exceeded {
        return 0.0;
    }

    let odds = tuning.base_odds(disposition) + conviction_rate * tuning.rate_weight;
    if odds.is_nan() {
        return 0.0;
    }
    odds.clamp(0.0, 1.0)
}

/// Resolves a Bernoulli trial with exactly one uniform draw from `rng`.
pub fn roll<R>(probability: f32, rng: &mut R) -> bool
where
    R: Rng + ?Sized,
{
    let draw: f32 = rng.gen();
    draw < probability
}

/// Disposition a rejecting NPC ends up in, given a uniform `draw` in `0.0..1.0`.
#[must_use]
pub fn rejected_disposition(
    disposition: Disposition,
    draw: f32,
    tuning: &ShiftTuning,
) -> Disposition {
    match disposition {
        Disposition::Closed if draw < tuning.softening_chance => Disposition::Indecisive,
        Disposition::Indecisive if draw < tuning.hardening_chance => Disposition::Closed,
        Disposition::Receptive if draw < tuning.cooling_chance => Disposition::Indecisive,
        unchanged => unchanged,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn nan_rate_never_persuades() {
        let tuning = ConvictionTuning::default();
        let odds = conviction_probability(Disposition::Receptive, f32::NAN, false, &tuning);
        assert_eq!(odds, 0.0);
    }

    #[test]
    fn default_tuning_is_monotone() {
        assert!(ConvictionTuning::default().is_monotone());
    }
}
