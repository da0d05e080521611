//! Shared toy fixture for solver tests.
//!
//! A minimal solution with one integer variable per entity and two
//! constraints: a hard penalty per unassigned slot and a soft penalty per
//! pair of entities sharing a value. Small enough to reason about by hand,
//! rich enough that construction and local search have real work to do.

use std::collections::HashMap;

use tutorplan_core::domain::PlanningSolution;
use tutorplan_core::score::HardSoftScore;
use tutorplan_scoring::{IncrementalConstraint, IncrementalScoreDirector, ScoreDirector};

use crate::heuristic::VariableDescriptor;

#[derive(Clone, Debug)]
pub(crate) struct ToySolution {
    pub slots: Vec<Option<i32>>,
    pub score: Option<HardSoftScore>,
}

impl ToySolution {
    pub fn with_slots(slots: Vec<Option<i32>>) -> Self {
        Self { slots, score: None }
    }

    pub fn unassigned(count: usize) -> Self {
        Self::with_slots(vec![None; count])
    }
}

impl PlanningSolution for ToySolution {
    type Score = HardSoftScore;

    fn score(&self) -> Option<HardSoftScore> {
        self.score
    }

    fn set_score(&mut self, score: Option<HardSoftScore>) {
        self.score = score;
    }

    fn is_initialized(&self) -> bool {
        self.slots.iter().all(Option::is_some)
    }
}

pub(crate) fn get_slot(solution: &ToySolution, entity_index: usize) -> Option<i32> {
    solution.slots[entity_index]
}

pub(crate) fn set_slot(solution: &mut ToySolution, entity_index: usize, value: Option<i32>) {
    solution.slots[entity_index] = value;
}

pub(crate) fn toy_entity_count(solution: &ToySolution) -> usize {
    solution.slots.len()
}

/// Descriptor over the single `slot` variable with domain 0..=9.
pub(crate) fn toy_descriptor() -> VariableDescriptor<ToySolution, i32> {
    VariableDescriptor::new("slot", get_slot, set_slot, (0..10).collect())
}

/// Hard penalty of 1 per unassigned slot.
#[derive(Debug, Default)]
pub(crate) struct UnassignedPenalty {
    unassigned: usize,
}

impl IncrementalConstraint<ToySolution, HardSoftScore> for UnassignedPenalty {
    fn evaluate(&self, solution: &ToySolution) -> HardSoftScore {
        let unassigned = solution.slots.iter().filter(|s| s.is_none()).count();
        HardSoftScore::of_hard(-(unassigned as i64))
    }

    fn match_count(&self) -> usize {
        self.unassigned
    }

    fn initialize(&mut self, solution: &ToySolution) -> HardSoftScore {
        self.unassigned = solution.slots.iter().filter(|s| s.is_none()).count();
        HardSoftScore::of_hard(-(self.unassigned as i64))
    }

    fn on_insert(&mut self, solution: &ToySolution, entity_index: usize) -> HardSoftScore {
        if solution.slots[entity_index].is_none() {
            self.unassigned += 1;
            HardSoftScore::of_hard(-1)
        } else {
            HardSoftScore::ZERO
        }
    }

    fn on_retract(&mut self, solution: &ToySolution, entity_index: usize) -> HardSoftScore {
        if solution.slots[entity_index].is_none() {
            self.unassigned -= 1;
            HardSoftScore::of_hard(1)
        } else {
            HardSoftScore::ZERO
        }
    }

    fn reset(&mut self) {
        self.unassigned = 0;
    }

    fn name(&self) -> &str {
        "unassignedPenalty"
    }

    fn is_hard(&self) -> bool {
        true
    }
}

/// Soft penalty of 1 per pair of entities assigned the same value.
#[derive(Debug, Default)]
pub(crate) struct DuplicateValuePenalty {
    value_counts: HashMap<i32, usize>,
    pair_count: usize,
}

impl IncrementalConstraint<ToySolution, HardSoftScore> for DuplicateValuePenalty {
    fn evaluate(&self, solution: &ToySolution) -> HardSoftScore {
        let mut counts: HashMap<i32, usize> = HashMap::new();
        for slot in solution.slots.iter().flatten() {
            *counts.entry(*slot).or_insert(0) += 1;
        }
        let pairs: usize = counts.values().map(|&c| c * (c - 1) / 2).sum();
        HardSoftScore::of_soft(-(pairs as i64))
    }

    fn match_count(&self) -> usize {
        self.pair_count
    }

    fn initialize(&mut self, solution: &ToySolution) -> HardSoftScore {
        self.reset();
        for slot in solution.slots.iter().flatten() {
            *self.value_counts.entry(*slot).or_insert(0) += 1;
        }
        self.pair_count = self
            .value_counts
            .values()
            .map(|&c| c * (c - 1) / 2)
            .sum();
        HardSoftScore::of_soft(-(self.pair_count as i64))
    }

    fn on_insert(&mut self, solution: &ToySolution, entity_index: usize) -> HardSoftScore {
        let Some(value) = solution.slots[entity_index] else {
            return HardSoftScore::ZERO;
        };
        let existing = *self.value_counts.get(&value).unwrap_or(&0);
        self.value_counts.insert(value, existing + 1);
        self.pair_count += existing;
        HardSoftScore::of_soft(-(existing as i64))
    }

    fn on_retract(&mut self, solution: &ToySolution, entity_index: usize) -> HardSoftScore {
        let Some(value) = solution.slots[entity_index] else {
            return HardSoftScore::ZERO;
        };
        let remaining = self.value_counts.get_mut(&value).unwrap();
        *remaining -= 1;
        let freed = *remaining;
        self.pair_count -= freed;
        HardSoftScore::of_soft(freed as i64)
    }

    fn reset(&mut self) {
        self.value_counts.clear();
        self.pair_count = 0;
    }

    fn name(&self) -> &str {
        "duplicateValuePenalty"
    }
}

pub(crate) type ToyDirector =
    IncrementalScoreDirector<ToySolution, (UnassignedPenalty, DuplicateValuePenalty)>;

pub(crate) fn toy_director(slots: Vec<Option<i32>>) -> ToyDirector {
    let mut director = IncrementalScoreDirector::new(
        ToySolution::with_slots(slots),
        (
            UnassignedPenalty::default(),
            DuplicateValuePenalty::default(),
        ),
        toy_entity_count,
    );
    director.calculate_score();
    director
}
