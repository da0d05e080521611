//! Acceptors for local search move acceptance.
//!
//! Acceptors decide whether a candidate move may enter the forager, based on
//! the score it would produce and the previous step's score. Acceptance draws
//! randomness from the phase's seeded RNG, so runs stay reproducible.

use std::fmt::Debug;

use rand::rngs::StdRng;
use rand::Rng;

use tutorplan_core::domain::PlanningSolution;

/// Trait for accepting or rejecting moves in local search.
///
/// Acceptors implement different strategies for escaping local optima.
pub trait Acceptor<S: PlanningSolution>: Send + Debug {
    /// Returns true if a move resulting in `move_score` should be accepted,
    /// given the previous step's score.
    fn is_accepted(
        &mut self,
        last_step_score: &S::Score,
        move_score: &S::Score,
        rng: &mut StdRng,
    ) -> bool;

    /// Called when a phase starts.
    fn phase_started(&mut self, _initial_score: &S::Score) {}

    /// Called when a step ends with an accepted move.
    fn step_ended(&mut self, _step_score: &S::Score) {}
}

/// Hill climbing acceptor - accepts only non-worsening moves.
///
/// The simplest acceptor. Plateau moves are allowed, so the search can walk
/// across equal-score regions, but it cannot escape a strict local optimum.
#[derive(Debug, Clone, Default)]
pub struct HillClimbingAcceptor;

impl HillClimbingAcceptor {
    pub fn new() -> Self {
        Self
    }
}

impl<S: PlanningSolution> Acceptor<S> for HillClimbingAcceptor {
    fn is_accepted(
        &mut self,
        last_step_score: &S::Score,
        move_score: &S::Score,
        _rng: &mut StdRng,
    ) -> bool {
        move_score >= last_step_score
    }
}

/// Late acceptance acceptor - accepts moves that improve on a historical score.
///
/// Maintains a circular buffer of recent step scores and accepts moves that
/// are at least as good as the score from N steps ago. This lets the search
/// temporarily worsen while a deep improvement is still remembered.
pub struct LateAcceptanceAcceptor<S: PlanningSolution> {
    late_acceptance_size: usize,
    score_history: Vec<Option<S::Score>>,
    current_index: usize,
}

impl<S: PlanningSolution> Debug for LateAcceptanceAcceptor<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LateAcceptanceAcceptor")
            .field("late_acceptance_size", &self.late_acceptance_size)
            .field("current_index", &self.current_index)
            .finish()
    }
}

impl<S: PlanningSolution> Clone for LateAcceptanceAcceptor<S> {
    fn clone(&self) -> Self {
        Self {
            late_acceptance_size: self.late_acceptance_size,
            score_history: self.score_history.clone(),
            current_index: self.current_index,
        }
    }
}

impl<S: PlanningSolution> LateAcceptanceAcceptor<S> {
    /// Creates a new late acceptance acceptor.
    ///
    /// # Arguments
    /// * `late_acceptance_size` - Number of historical scores to keep
    pub fn new(late_acceptance_size: usize) -> Self {
        Self {
            late_acceptance_size,
            score_history: vec![None; late_acceptance_size],
            current_index: 0,
        }
    }
}

impl<S: PlanningSolution> Default for LateAcceptanceAcceptor<S> {
    fn default() -> Self {
        Self::new(400)
    }
}

impl<S: PlanningSolution> Acceptor<S> for LateAcceptanceAcceptor<S> {
    fn is_accepted(
        &mut self,
        last_step_score: &S::Score,
        move_score: &S::Score,
        _rng: &mut StdRng,
    ) -> bool {
        // Always accept improving moves
        if move_score > last_step_score {
            return true;
        }

        // Accept if not worse than the late score
        if let Some(late_score) = &self.score_history[self.current_index] {
            move_score >= late_score
        } else {
            // No history yet, accept
            true
        }
    }

    fn phase_started(&mut self, initial_score: &S::Score) {
        for slot in &mut self.score_history {
            *slot = Some(*initial_score);
        }
        self.current_index = 0;
    }

    fn step_ended(&mut self, step_score: &S::Score) {
        self.score_history[self.current_index] = Some(*step_score);
        self.current_index = (self.current_index + 1) % self.late_acceptance_size;
    }
}

/// Simulated annealing acceptor - accepts worsening moves with
/// temperature-based probability.
///
/// Starts with high acceptance probability and decays it every step, so the
/// search explores broadly early on and settles into hill climbing as the
/// temperature approaches zero.
#[derive(Debug, Clone)]
pub struct SimulatedAnnealingAcceptor {
    starting_temperature: f64,
    current_temperature: f64,
    decay_rate: f64,
}

impl SimulatedAnnealingAcceptor {
    /// Creates a new simulated annealing acceptor.
    ///
    /// # Arguments
    /// * `starting_temperature` - Initial acceptance probability (0.0 to 1.0)
    /// * `decay_rate` - Multiplicative decay per step (e.g., 0.99)
    pub fn new(starting_temperature: f64, decay_rate: f64) -> Self {
        Self {
            starting_temperature,
            current_temperature: starting_temperature,
            decay_rate,
        }
    }

    pub fn current_temperature(&self) -> f64 {
        self.current_temperature
    }
}

impl Default for SimulatedAnnealingAcceptor {
    fn default() -> Self {
        Self::new(1.0, 0.99)
    }
}

impl<S: PlanningSolution> Acceptor<S> for SimulatedAnnealingAcceptor {
    fn is_accepted(
        &mut self,
        last_step_score: &S::Score,
        move_score: &S::Score,
        rng: &mut StdRng,
    ) -> bool {
        // Always accept improving moves
        if move_score > last_step_score {
            return true;
        }

        if self.current_temperature <= 0.0 {
            return false;
        }

        rng.random::<f64>() < self.current_temperature.min(1.0)
    }

    fn phase_started(&mut self, _initial_score: &S::Score) {
        self.current_temperature = self.starting_temperature;
    }

    fn step_ended(&mut self, _step_score: &S::Score) {
        self.current_temperature *= self.decay_rate;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::ToySolution;
    use rand::SeedableRng;
    use tutorplan_core::score::HardSoftScore;

    fn accepts<A: Acceptor<ToySolution>>(
        acceptor: &mut A,
        last: HardSoftScore,
        candidate: HardSoftScore,
        rng: &mut StdRng,
    ) -> bool {
        acceptor.is_accepted(&last, &candidate, rng)
    }

    #[test]
    fn test_hill_climbing_rejects_worse() {
        let mut acceptor = HillClimbingAcceptor::new();
        let mut rng = StdRng::seed_from_u64(0);

        let last = HardSoftScore::of(0, -10);
        assert!(accepts(&mut acceptor, last, HardSoftScore::of(0, -5), &mut rng));
        assert!(accepts(&mut acceptor, last, HardSoftScore::of(0, -10), &mut rng));
        assert!(!accepts(&mut acceptor, last, HardSoftScore::of(0, -11), &mut rng));
        assert!(!accepts(&mut acceptor, last, HardSoftScore::of(-1, 0), &mut rng));
    }

    #[test]
    fn test_late_acceptance_uses_history() {
        let mut acceptor = LateAcceptanceAcceptor::<ToySolution>::new(2);
        let mut rng = StdRng::seed_from_u64(0);

        Acceptor::<ToySolution>::phase_started(&mut acceptor, &HardSoftScore::of(0, -10));

        // Worse than last step but matching the late score from 2 steps ago.
        Acceptor::<ToySolution>::step_ended(&mut acceptor, &HardSoftScore::of(0, -4));
        Acceptor::<ToySolution>::step_ended(&mut acceptor, &HardSoftScore::of(0, -3));
        let last = HardSoftScore::of(0, -3);
        assert!(accepts(&mut acceptor, last, HardSoftScore::of(0, -4), &mut rng));
        assert!(!accepts(&mut acceptor, last, HardSoftScore::of(0, -12), &mut rng));
    }

    #[test]
    fn test_simulated_annealing_cools_down() {
        let mut acceptor = SimulatedAnnealingAcceptor::new(1.0, 0.5);
        let mut rng = StdRng::seed_from_u64(0);

        let last = HardSoftScore::of(0, -5);
        let worse = HardSoftScore::of(0, -20);

        // Full temperature accepts everything.
        assert!(accepts(&mut acceptor, last, worse, &mut rng));

        // Cool to zero: only improving moves pass.
        for _ in 0..200 {
            Acceptor::<ToySolution>::step_ended(&mut acceptor, &last);
        }
        assert!(acceptor.current_temperature() < 1e-30);
        assert!(!accepts(&mut acceptor, last, worse, &mut rng));
        assert!(accepts(&mut acceptor, last, HardSoftScore::of(0, -1), &mut rng));
    }

    #[test]
    fn test_simulated_annealing_is_deterministic_per_seed() {
        let last = HardSoftScore::of(0, -5);
        let worse = HardSoftScore::of(0, -6);

        let run = |seed: u64| -> Vec<bool> {
            let mut acceptor = SimulatedAnnealingAcceptor::new(0.5, 0.99);
            let mut rng = StdRng::seed_from_u64(seed);
            (0..32)
                .map(|_| accepts(&mut acceptor, last, worse, &mut rng))
                .collect()
        };

        assert_eq!(run(11), run(11));
    }
}
