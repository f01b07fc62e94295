use awaking_core::Disposition;
use awaking_system_conviction::{
    conviction_probability, rejected_disposition, roll, ConvictionTuning, ShiftTuning,
};
use rand::{Error, RngCore, SeedableRng};
use rand_chacha::ChaCha8Rng;

/// Generator that always yields the same word and counts how often it was asked.
struct FixedRng {
    word: u32,
    draws: usize,
}

impl FixedRng {
    fn new(word: u32) -> Self {
        Self { word, draws: 0 }
    }
}

impl RngCore for FixedRng {
    fn next_u32(&mut self) -> u32 {
        self.draws += 1;
        self.word
    }

    fn next_u64(&mut self) -> u64 {
        self.draws += 1;
        u64::from(self.word) << 32 | u64::from(self.word)
    }

    fn fill_bytes(&mut self, dest: &mut [u8]) {
        self.draws += 1;
        dest.fill(self.word as u8);
    }

    fn try_fill_bytes(&mut self, dest: &mut [u8]) -> Result<(), Error> {
        self.fill_bytes(dest);
        Ok(())
    }
}

#[test]
fn probability_is_non_decreasing_in_conviction_rate() {
    let tuning = ConvictionTuning::default();
    for disposition in Disposition::ALL {
        let mut previous = f32::NEG_INFINITY;
        for step in 0..=100 {
            let rate = step as f32 / 100.0;
            let odds = conviction_probability(disposition, rate, false, &tuning);
            assert!(odds >= previous, "{disposition:?} odds fell at rate {rate}");
            assert!((0.0..=1.0).contains(&odds));
            previous = odds;
        }
    }
}

#[test]
fn receptive_beats_indecisive_beats_closed() {
    let tuning = ConvictionTuning::default();
    for step in 0..=100 {
        let rate = step as f32 / 100.0;
        let closed = conviction_probability(Disposition::Closed, rate, false, &tuning);
        let indecisive = conviction_probability(Disposition::Indecisive, rate, false, &tuning);
        let receptive = conviction_probability(Disposition::Receptive, rate, false, &tuning);
        assert!(receptive >= indecisive);
        assert!(indecisive >= closed);
    }
}

#[test]
fn threshold_forbids_persuasion() {
    let tuning = ConvictionTuning::default();
    for disposition in Disposition::ALL {
        assert_eq!(conviction_probability(disposition, 0.9, true, &tuning), 0.0);
    }
}

#[test]
fn roll_consumes_exactly_one_draw() {
    let mut rng = FixedRng::new(0);
    assert!(roll(0.5, &mut rng));
    assert_eq!(rng.draws, 1);

    let mut rng = FixedRng::new(u32::MAX);
    assert!(!roll(0.97, &mut rng));
    assert_eq!(rng.draws, 1);
}

#[test]
fn zero_probability_never_succeeds() {
    let mut rng = FixedRng::new(0);
    assert!(!roll(0.0, &mut rng));
}

#[test]
fn empirical_rate_tracks_probability() {
    let mut rng = ChaCha8Rng::seed_from_u64(0x5eed);
    let successes = (0..10_000).filter(|_| roll(0.3, &mut rng)).count();
    assert!((2_700..3_300).contains(&successes), "got {successes}");
}

#[test]
fn rejection_shifts_follow_tuning() {
    let tuning = ShiftTuning::default();
    assert_eq!(
        rejected_disposition(Disposition::Closed, 0.0, &tuning),
        Disposition::Indecisive
    );
    assert_eq!(
        rejected_disposition(Disposition::Closed, 0.99, &tuning),
        Disposition::Closed
    );
    assert_eq!(
        rejected_disposition(Disposition::Indecisive, 0.1, &tuning),
        Disposition::Closed
    );
    assert_eq!(
        rejected_disposition(Disposition::Indecisive, 0.5, &tuning),
        Disposition::Indecisive
    );
    assert_eq!(
        rejected_disposition(Disposition::Receptive, 0.1, &tuning),
        Disposition::Indecisive
    );
    assert_eq!(
        rejected_disposition(Disposition::Receptive, 0.9, &tuning),
        Disposition::Receptive
    );
}
