// Typed constraint set for zero-erasure incremental scoring.
//
// This module provides the `ConstraintSet` trait which enables fully
// monomorphized constraint evaluation without virtual dispatch.

use tutorplan_core::score::Score;

// A single constraint with incremental scoring capability.
//
// # Incremental Protocol
//
// The incremental methods allow delta-based score updates:
//
// 1. Call `initialize` once to populate internal state
// 2. Before changing an entity's variable: call `on_retract` with old state
// 3. After changing the variable: call `on_insert` with new state
// 4. Score delta = insert_delta + retract_delta
//
// This avoids full re-evaluation on every move. For any solution state the
// running total produced by the protocol must equal `evaluate` from scratch.
pub trait IncrementalConstraint<S, Sc: Score>: Send + Sync {
    // Full evaluation of this constraint.
    //
    // Iterates all entities and computes the total score impact without
    // touching internal state. Use this for verification and score
    // explanation; use `on_insert`/`on_retract` for deltas.
    fn evaluate(&self, solution: &S) -> Sc;

    // Returns the number of matches (violations or rewards) currently tracked.
    fn match_count(&self) -> usize;

    // Initializes internal state by inserting all entities.
    //
    // Must be called before using incremental methods.
    // Returns the total score from initialization.
    fn initialize(&mut self, solution: &S) -> Sc;

    // Called after an entity is inserted or its variable changed.
    //
    // Returns the score delta from this insertion.
    fn on_insert(&mut self, solution: &S, entity_index: usize) -> Sc;

    // Called before an entity's variable changes, while the solution still
    // holds the old value.
    //
    // Returns the score delta (the removed contribution, negated) from this
    // retraction.
    fn on_retract(&mut self, solution: &S, entity_index: usize) -> Sc;

    // Resets internal state for a new solving session.
    fn reset(&mut self);

    // Returns the constraint name.
    fn name(&self) -> &str;

    // Returns true if this is a hard constraint.
    fn is_hard(&self) -> bool {
        false
    }
}

// Result of evaluating a single constraint.
#[derive(Debug, Clone)]
pub struct ConstraintResult<Sc> {
    // Constraint name.
    pub name: String,
    // Score contribution from this constraint.
    pub score: Sc,
    // Number of matches for this constraint.
    pub match_count: usize,
    // Whether this is a hard constraint.
    pub is_hard: bool,
}

// A set of constraints that can be evaluated together.
//
// `ConstraintSet` is implemented for tuples of `IncrementalConstraint`,
// enabling fully typed constraint evaluation without virtual dispatch.
// Registration is explicit: the tuple passed in is the whole rule set.
pub trait ConstraintSet<S, Sc: Score>: Send + Sync {
    // Evaluates all constraints from scratch and returns the total score.
    fn evaluate_all(&self, solution: &S) -> Sc;

    // Returns the number of constraints in this set.
    fn constraint_count(&self) -> usize;

    // Evaluates each constraint individually and returns per-constraint
    // results, in registration order. Used for score explanation.
    fn evaluate_each(&self, solution: &S) -> Vec<ConstraintResult<Sc>>;

    // Initializes all constraints by inserting all entities.
    //
    // Must be called before using incremental methods.
    // Returns the total score from initialization.
    fn initialize_all(&mut self, solution: &S) -> Sc;

    // Called after an entity changed. Returns the total score delta.
    fn on_insert_all(&mut self, solution: &S, entity_index: usize) -> Sc;

    // Called before an entity changes. Returns the total score delta.
    fn on_retract_all(&mut self, solution: &S, entity_index: usize) -> Sc;

    // Resets all constraints for a new solving session.
    fn reset_all(&mut self);
}

// Implement `ConstraintSet` for an empty tuple (no constraints).
impl<S: Send + Sync, Sc: Score> ConstraintSet<S, Sc> for () {
    #[inline]
    fn evaluate_all(&self, _solution: &S) -> Sc {
        Sc::zero()
    }

    #[inline]
    fn constraint_count(&self) -> usize {
        0
    }

    #[inline]
    fn evaluate_each(&self, _solution: &S) -> Vec<ConstraintResult<Sc>> {
        Vec::new()
    }

    #[inline]
    fn initialize_all(&mut self, _solution: &S) -> Sc {
        Sc::zero()
    }

    #[inline]
    fn on_insert_all(&mut self, _solution: &S, _entity_index: usize) -> Sc {
        Sc::zero()
    }

    #[inline]
    fn on_retract_all(&mut self, _solution: &S, _entity_index: usize) -> Sc {
        Sc::zero()
    }

    #[inline]
    fn reset_all(&mut self) {}
}

// Macro to implement `ConstraintSet` for tuples of various sizes.
macro_rules! impl_constraint_set_for_tuple {
    ($($idx:tt: $T:ident),+) => {
        impl<S, Sc, $($T),+> ConstraintSet<S, Sc> for ($($T,)+)
        where
            S: Send + Sync,
            Sc: Score,
            $($T: IncrementalConstraint<S, Sc>,)+
        {
            #[inline]
            fn evaluate_all(&self, solution: &S) -> Sc {
                let mut total = Sc::zero();
                $(total = total + self.$idx.evaluate(solution);)+
                total
            }

            #[inline]
            fn constraint_count(&self) -> usize {
                let mut count = 0;
                $(let _ = &self.$idx; count += 1;)+
                count
            }

            fn evaluate_each(&self, solution: &S) -> Vec<ConstraintResult<Sc>> {
                vec![$(ConstraintResult {
                    name: self.$idx.name().to_string(),
                    score: self.$idx.evaluate(solution),
                    match_count: self.$idx.match_count(),
                    is_hard: self.$idx.is_hard(),
                }),+]
            }

            #[inline]
            fn initialize_all(&mut self, solution: &S) -> Sc {
                let mut total = Sc::zero();
                $(total = total + self.$idx.initialize(solution);)+
                total
            }

            #[inline]
            fn on_insert_all(&mut self, solution: &S, entity_index: usize) -> Sc {
                let mut total = Sc::zero();
                $(total = total + self.$idx.on_insert(solution, entity_index);)+
                total
            }

            #[inline]
            fn on_retract_all(&mut self, solution: &S, entity_index: usize) -> Sc {
                let mut total = Sc::zero();
                $(total = total + self.$idx.on_retract(solution, entity_index);)+
                total
            }

            #[inline]
            fn reset_all(&mut self) {
                $(self.$idx.reset();)+
            }
        }
    };
}

// Implement for tuples of size 1 through 12
impl_constraint_set_for_tuple!(0: C0);
impl_constraint_set_for_tuple!(0: C0, 1: C1);
impl_constraint_set_for_tuple!(0: C0, 1: C1, 2: C2);
impl_constraint_set_for_tuple!(0: C0, 1: C1, 2: C2, 3: C3);
impl_constraint_set_for_tuple!(0: C0, 1: C1, 2: C2, 3: C3, 4: C4);
impl_constraint_set_for_tuple!(0: C0, 1: C1, 2: C2, 3: C3, 4: C4, 5: C5);
impl_constraint_set_for_tuple!(0: C0, 1: C1, 2: C2, 3: C3, 4: C4, 5: C5, 6: C6);
impl_constraint_set_for_tuple!(0: C0, 1: C1, 2: C2, 3: C3, 4: C4, 5: C5, 6: C6, 7: C7);
impl_constraint_set_for_tuple!(0: C0, 1: C1, 2: C2, 3: C3, 4: C4, 5: C5, 6: C6, 7: C7, 8: C8);
impl_constraint_set_for_tuple!(0: C0, 1: C1, 2: C2, 3: C3, 4: C4, 5: C5, 6: C6, 7: C7, 8: C8, 9: C9);
impl_constraint_set_for_tuple!(0: C0, 1: C1, 2: C2, 3: C3, 4: C4, 5: C5, 6: C6, 7: C7, 8: C8, 9: C9, 10: C10);
impl_constraint_set_for_tuple!(0: C0, 1: C1, 2: C2, 3: C3, 4: C4, 5: C5, 6: C6, 7: C7, 8: C8, 9: C9, 10: C10, 11: C11);

#[cfg(test)]
mod tests {
    use super::*;
    use tutorplan_core::HardSoftScore;

    // Toy solution: each entity is an Option<u32> slot.
    type Slots = Vec<Option<u32>>;

    // Penalizes every unassigned slot one hard unit.
    struct Unassigned {
        violations: std::collections::HashSet<usize>,
    }

    impl Unassigned {
        fn new() -> Self {
            Self {
                violations: std::collections::HashSet::new(),
            }
        }
    }

    impl IncrementalConstraint<Slots, HardSoftScore> for Unassigned {
        fn evaluate(&self, solution: &Slots) -> HardSoftScore {
            HardSoftScore::of_hard(-(solution.iter().filter(|s| s.is_none()).count() as i64))
        }

        fn match_count(&self) -> usize {
            self.violations.len()
        }

        fn initialize(&mut self, solution: &Slots) -> HardSoftScore {
            self.violations.clear();
            for (i, slot) in solution.iter().enumerate() {
                if slot.is_none() {
                    self.violations.insert(i);
                }
            }
            HardSoftScore::of_hard(-(self.violations.len() as i64))
        }

        fn on_insert(&mut self, solution: &Slots, entity_index: usize) -> HardSoftScore {
            if solution[entity_index].is_none() {
                self.violations.insert(entity_index);
                HardSoftScore::of_hard(-1)
            } else {
                HardSoftScore::ZERO
            }
        }

        fn on_retract(&mut self, _solution: &Slots, entity_index: usize) -> HardSoftScore {
            if self.violations.remove(&entity_index) {
                HardSoftScore::of_hard(1)
            } else {
                HardSoftScore::ZERO
            }
        }

        fn reset(&mut self) {
            self.violations.clear();
        }

        fn name(&self) -> &str {
            "unassigned"
        }

        fn is_hard(&self) -> bool {
            true
        }
    }

    // Rewards every slot holding an even value one soft unit.
    struct EvenValue {
        matches: std::collections::HashSet<usize>,
    }

    impl EvenValue {
        fn new() -> Self {
            Self {
                matches: std::collections::HashSet::new(),
            }
        }
    }

    impl IncrementalConstraint<Slots, HardSoftScore> for EvenValue {
        fn evaluate(&self, solution: &Slots) -> HardSoftScore {
            let n = solution.iter().flatten().filter(|v| *v % 2 == 0).count();
            HardSoftScore::of_soft(n as i64)
        }

        fn match_count(&self) -> usize {
            self.matches.len()
        }

        fn initialize(&mut self, solution: &Slots) -> HardSoftScore {
            self.matches.clear();
            for (i, slot) in solution.iter().enumerate() {
                if matches!(slot, Some(v) if v % 2 == 0) {
                    self.matches.insert(i);
                }
            }
            HardSoftScore::of_soft(self.matches.len() as i64)
        }

        fn on_insert(&mut self, solution: &Slots, entity_index: usize) -> HardSoftScore {
            if matches!(solution[entity_index], Some(v) if v % 2 == 0) {
                self.matches.insert(entity_index);
                HardSoftScore::of_soft(1)
            } else {
                HardSoftScore::ZERO
            }
        }

        fn on_retract(&mut self, _solution: &Slots, entity_index: usize) -> HardSoftScore {
            if self.matches.remove(&entity_index) {
                HardSoftScore::of_soft(-1)
            } else {
                HardSoftScore::ZERO
            }
        }

        fn reset(&mut self) {
            self.matches.clear();
        }

        fn name(&self) -> &str {
            "even_value"
        }
    }

    #[test]
    fn test_tuple_evaluate_all_is_sum_of_parts() {
        let slots: Slots = vec![Some(2), None, Some(3), Some(4)];
        let set = (Unassigned::new(), EvenValue::new());

        let total = set.evaluate_all(&slots);
        let each = set.evaluate_each(&slots);

        assert_eq!(total, HardSoftScore::of(-1, 2));
        assert_eq!(each.len(), 2);
        let sum = each
            .iter()
            .fold(HardSoftScore::ZERO, |acc, r| acc + r.score);
        assert_eq!(sum, total);
        assert!(each[0].is_hard);
        assert!(!each[1].is_hard);
    }

    #[test]
    fn test_incremental_matches_full_evaluation() {
        let mut slots: Slots = vec![Some(1), None, Some(2)];
        let mut set = (Unassigned::new(), EvenValue::new());

        let mut running = set.initialize_all(&slots);
        assert_eq!(running, set.evaluate_all(&slots));

        // Assign the empty slot an even value.
        running = running + set.on_retract_all(&slots, 1);
        slots[1] = Some(6);
        running = running + set.on_insert_all(&slots, 1);
        assert_eq!(running, set.evaluate_all(&slots));
        assert_eq!(running, HardSoftScore::of(0, 2));

        // Flip an even value to odd.
        running = running + set.on_retract_all(&slots, 2);
        slots[2] = Some(5);
        running = running + set.on_insert_all(&slots, 2);
        assert_eq!(running, set.evaluate_all(&slots));
    }

    #[test]
    fn test_empty_set_scores_zero() {
        let slots: Slots = vec![None, None];
        let set = ();
        assert_eq!(
            ConstraintSet::<Slots, HardSoftScore>::evaluate_all(&set, &slots),
            HardSoftScore::ZERO
        );
        assert_eq!(
            ConstraintSet::<Slots, HardSoftScore>::constraint_count(&set),
            0
        );
    }
}
