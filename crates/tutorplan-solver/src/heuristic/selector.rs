//! Move selectors - sample random moves from the search neighborhood.
//!
//! A selector owns the variable descriptors it draws from and produces one
//! candidate move per call. Selection is sampling-based rather than
//! exhaustive: the local search phase asks for as many candidates as its
//! forager wants to see, and the selector picks entities and values uniformly
//! with the phase's seeded RNG. The same seed therefore replays the same
//! stream of candidates.

use std::fmt::Debug;

use rand::rngs::StdRng;
use rand::Rng;

use tutorplan_core::domain::PlanningSolution;

use super::descriptor::VariableDescriptor;
use super::r#move::{EitherMove, Move, ReassignMove, SwapMove};

/// Samples candidate moves for a local search phase.
pub trait MoveSelector<S: PlanningSolution>: Send {
    /// The concrete move type this selector produces.
    type Move: Move<S>;

    /// Samples one candidate move, or None if the solution admits no move
    /// of this type (no entities, empty value range).
    fn sample_move(&self, solution: &S, rng: &mut StdRng) -> Option<Self::Move>;
}

/// Selects reassign moves: a random entity paired with a random value from
/// the variable's registered range.
pub struct ReassignMoveSelector<S, V> {
    descriptor: VariableDescriptor<S, V>,
    entity_counter: fn(&S) -> usize,
}

impl<S, V> ReassignMoveSelector<S, V> {
    pub fn new(descriptor: VariableDescriptor<S, V>, entity_counter: fn(&S) -> usize) -> Self {
        Self {
            descriptor,
            entity_counter,
        }
    }
}

impl<S, V> MoveSelector<S> for ReassignMoveSelector<S, V>
where
    S: PlanningSolution,
    V: Clone + PartialEq + Send + Sync + Debug + 'static,
{
    type Move = ReassignMove<S, V>;

    fn sample_move(&self, solution: &S, rng: &mut StdRng) -> Option<Self::Move> {
        let entity_count = (self.entity_counter)(solution);
        let value_range = self.descriptor.value_range();
        if entity_count == 0 || value_range.is_empty() {
            return None;
        }

        let entity_index = rng.random_range(0..entity_count);
        let value = value_range[rng.random_range(0..value_range.len())].clone();

        Some(ReassignMove::new(
            entity_index,
            Some(value),
            self.descriptor.getter(),
            self.descriptor.setter(),
            self.descriptor.variable_name(),
        ))
    }
}

/// Selects swap moves: two distinct random entities exchanging the
/// variable's values.
pub struct SwapMoveSelector<S, V> {
    descriptor: VariableDescriptor<S, V>,
    entity_counter: fn(&S) -> usize,
}

impl<S, V> SwapMoveSelector<S, V> {
    pub fn new(descriptor: VariableDescriptor<S, V>, entity_counter: fn(&S) -> usize) -> Self {
        Self {
            descriptor,
            entity_counter,
        }
    }
}

impl<S, V> MoveSelector<S> for SwapMoveSelector<S, V>
where
    S: PlanningSolution,
    V: Clone + PartialEq + Send + Sync + Debug + 'static,
{
    type Move = SwapMove<S, V>;

    fn sample_move(&self, solution: &S, rng: &mut StdRng) -> Option<Self::Move> {
        let entity_count = (self.entity_counter)(solution);
        if entity_count < 2 {
            return None;
        }

        let left_index = rng.random_range(0..entity_count);
        // Sample the second index from the remaining entities so the pair
        // is always distinct.
        let mut right_index = rng.random_range(0..entity_count - 1);
        if right_index >= left_index {
            right_index += 1;
        }

        Some(SwapMove::new(
            left_index,
            right_index,
            self.descriptor.getter(),
            self.descriptor.setter(),
            self.descriptor.variable_name(),
        ))
    }
}

/// Mixes two selectors with an even coin flip per sample.
///
/// If the chosen side cannot produce a move the other side is tried, so the
/// union only returns None when both sides are exhausted.
pub struct UnionMoveSelector<A, B> {
    first: A,
    second: B,
}

impl<A, B> UnionMoveSelector<A, B> {
    pub fn new(first: A, second: B) -> Self {
        Self { first, second }
    }
}

impl<S, A, B> MoveSelector<S> for UnionMoveSelector<A, B>
where
    S: PlanningSolution,
    A: MoveSelector<S>,
    B: MoveSelector<S>,
{
    type Move = EitherMove<A::Move, B::Move>;

    fn sample_move(&self, solution: &S, rng: &mut StdRng) -> Option<Self::Move> {
        if rng.random_bool(0.5) {
            if let Some(m) = self.first.sample_move(solution, rng) {
                return Some(EitherMove::Left(m));
            }
            self.second.sample_move(solution, rng).map(EitherMove::Right)
        } else {
            if let Some(m) = self.second.sample_move(solution, rng) {
                return Some(EitherMove::Right(m));
            }
            self.first.sample_move(solution, rng).map(EitherMove::Left)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{toy_descriptor, toy_entity_count, ToySolution};
    use rand::SeedableRng;

    #[test]
    fn test_reassign_selector_stays_in_domain() {
        let selector = ReassignMoveSelector::new(toy_descriptor(), toy_entity_count);
        let solution = ToySolution::with_slots(vec![Some(0), Some(1), Some(2)]);
        let mut rng = StdRng::seed_from_u64(7);

        for _ in 0..100 {
            let m = selector.sample_move(&solution, &mut rng).unwrap();
            assert!(m.entity_index() < 3);
            let value = *m.to_value().unwrap();
            assert!((0..=9).contains(&value));
        }
    }

    #[test]
    fn test_swap_selector_picks_distinct_entities() {
        let selector = SwapMoveSelector::new(toy_descriptor(), toy_entity_count);
        let solution = ToySolution::with_slots(vec![Some(0), Some(1), Some(2), Some(3)]);
        let mut rng = StdRng::seed_from_u64(7);

        for _ in 0..100 {
            let m = selector.sample_move(&solution, &mut rng).unwrap();
            assert_ne!(m.left_index(), m.right_index());
            assert!(m.left_index() < 4);
            assert!(m.right_index() < 4);
        }
    }

    #[test]
    fn test_swap_selector_needs_two_entities() {
        let selector = SwapMoveSelector::new(toy_descriptor(), toy_entity_count);
        let solution = ToySolution::with_slots(vec![Some(0)]);
        let mut rng = StdRng::seed_from_u64(7);

        assert!(selector.sample_move(&solution, &mut rng).is_none());
    }

    #[test]
    fn test_union_selector_produces_both_variants() {
        let selector = UnionMoveSelector::new(
            ReassignMoveSelector::new(toy_descriptor(), toy_entity_count),
            SwapMoveSelector::new(toy_descriptor(), toy_entity_count),
        );
        let solution = ToySolution::with_slots(vec![Some(0), Some(1), Some(2)]);
        let mut rng = StdRng::seed_from_u64(7);

        let mut reassigns = 0;
        let mut swaps = 0;
        for _ in 0..200 {
            match selector.sample_move(&solution, &mut rng).unwrap() {
                EitherMove::Left(_) => reassigns += 1,
                EitherMove::Right(_) => swaps += 1,
            }
        }
        assert!(reassigns > 0);
        assert!(swaps > 0);
    }

    #[test]
    fn test_same_seed_replays_same_moves() {
        let selector = ReassignMoveSelector::new(toy_descriptor(), toy_entity_count);
        let solution = ToySolution::with_slots(vec![Some(0), Some(1), Some(2)]);

        let mut first = StdRng::seed_from_u64(42);
        let mut second = StdRng::seed_from_u64(42);
        for _ in 0..50 {
            let a = selector.sample_move(&solution, &mut first).unwrap();
            let b = selector.sample_move(&solution, &mut second).unwrap();
            assert_eq!(a.entity_index(), b.entity_index());
            assert_eq!(a.to_value(), b.to_value());
        }
    }
}
