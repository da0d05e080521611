// Recording score director for automatic undo tracking.
//
// The `RecordingScoreDirector` wraps an existing score director and stores
// typed undo closures registered by moves:
//
// ```text
// let mut recording = RecordingScoreDirector::new(&mut inner);
// candidate.do_move(&mut recording);   // move registers its undo closure
// let score = recording.calculate_score();
// recording.undo_changes();            // retract, restore values, re-insert
// ```
//
// Moves capture old values through their typed getters and register undo
// closures via `register_undo()`; the closures restore the planning variables
// while the wrapper replays the retract/insert notifications so incremental
// constraint state stays consistent across the undo.

use tutorplan_core::domain::PlanningSolution;

use super::ScoreDirector;

pub struct RecordingScoreDirector<'a, S: PlanningSolution> {
    inner: &'a mut dyn ScoreDirector<S>,
    // Typed undo closures registered by moves.
    undo_stack: Vec<Box<dyn FnOnce(&mut S) + Send>>,
    // Entities modified during this step, in first-touch order.
    modified_entities: Vec<usize>,
}

impl<'a, S: PlanningSolution> RecordingScoreDirector<'a, S> {
    // Creates a new recording score director wrapping the inner director.
    pub fn new(inner: &'a mut dyn ScoreDirector<S>) -> Self {
        Self {
            inner,
            undo_stack: Vec::with_capacity(16),
            modified_entities: Vec::with_capacity(8),
        }
    }

    // Undoes all recorded changes in reverse order.
    //
    // For incremental scoring correctness:
    // 1. Retract current (post-move) contributions of each modified entity
    // 2. Run undo closures to restore planning variable values
    // 3. Re-insert the restored contributions
    pub fn undo_changes(&mut self) {
        for &entity_index in &self.modified_entities {
            self.inner.before_variable_changed(entity_index);
        }

        while let Some(undo) = self.undo_stack.pop() {
            undo(self.inner.working_solution_mut());
        }

        for entity_index in self.modified_entities.drain(..) {
            self.inner.after_variable_changed(entity_index);
        }
    }

    // Resets the recording state for reuse.
    //
    // Call this at the start of each step to reuse the Vec allocations.
    pub fn reset_recording(&mut self) {
        self.undo_stack.clear();
        self.modified_entities.clear();
    }

    // Returns the number of recorded undo closures.
    pub fn change_count(&self) -> usize {
        self.undo_stack.len()
    }

    // Returns true if there are no recorded changes.
    pub fn is_empty(&self) -> bool {
        self.undo_stack.is_empty()
    }
}

impl<S: PlanningSolution> ScoreDirector<S> for RecordingScoreDirector<'_, S> {
    fn working_solution(&self) -> &S {
        self.inner.working_solution()
    }

    fn working_solution_mut(&mut self) -> &mut S {
        self.inner.working_solution_mut()
    }

    fn calculate_score(&mut self) -> S::Score {
        self.inner.calculate_score()
    }

    fn clone_working_solution(&self) -> S {
        self.inner.clone_working_solution()
    }

    fn before_variable_changed(&mut self, entity_index: usize) {
        // Forward to inner for incremental scoring
        self.inner.before_variable_changed(entity_index);
    }

    fn after_variable_changed(&mut self, entity_index: usize) {
        self.inner.after_variable_changed(entity_index);

        // Track entity for the retract/insert replay on undo (no duplicates)
        if !self.modified_entities.contains(&entity_index) {
            self.modified_entities.push(entity_index);
        }
    }

    fn entity_count(&self) -> usize {
        self.inner.entity_count()
    }

    fn reset(&mut self) {
        self.inner.reset();
        self.undo_stack.clear();
        self.modified_entities.clear();
    }

    fn register_undo(&mut self, undo: Box<dyn FnOnce(&mut S) + Send>) {
        self.undo_stack.push(undo);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constraint::IncrementalConstraint;
    use crate::director::IncrementalScoreDirector;
    use tutorplan_core::HardSoftScore;

    #[derive(Clone)]
    struct Sol {
        slots: Vec<Option<u32>>,
        score: Option<HardSoftScore>,
    }

    impl PlanningSolution for Sol {
        type Score = HardSoftScore;

        fn score(&self) -> Option<HardSoftScore> {
            self.score
        }

        fn set_score(&mut self, score: Option<HardSoftScore>) {
            self.score = score;
        }
    }

    // Penalizes slots holding odd values, tracking violations incrementally.
    struct OddValue {
        violations: std::collections::HashSet<usize>,
    }

    impl IncrementalConstraint<Sol, HardSoftScore> for OddValue {
        fn evaluate(&self, s: &Sol) -> HardSoftScore {
            let n = s.slots.iter().flatten().filter(|v| *v % 2 == 1).count();
            HardSoftScore::of_hard(-(n as i64))
        }

        fn match_count(&self) -> usize {
            self.violations.len()
        }

        fn initialize(&mut self, s: &Sol) -> HardSoftScore {
            self.violations.clear();
            for (i, slot) in s.slots.iter().enumerate() {
                if matches!(slot, Some(v) if v % 2 == 1) {
                    self.violations.insert(i);
                }
            }
            HardSoftScore::of_hard(-(self.violations.len() as i64))
        }

        fn on_insert(&mut self, s: &Sol, i: usize) -> HardSoftScore {
            if matches!(s.slots[i], Some(v) if v % 2 == 1) {
                self.violations.insert(i);
                HardSoftScore::of_hard(-1)
            } else {
                HardSoftScore::ZERO
            }
        }

        fn on_retract(&mut self, _s: &Sol, i: usize) -> HardSoftScore {
            if self.violations.remove(&i) {
                HardSoftScore::of_hard(1)
            } else {
                HardSoftScore::ZERO
            }
        }

        fn reset(&mut self) {
            self.violations.clear();
        }

        fn name(&self) -> &str {
            "odd_value"
        }

        fn is_hard(&self) -> bool {
            true
        }
    }

    fn inner(slots: Vec<Option<u32>>) -> IncrementalScoreDirector<Sol, (OddValue,)> {
        IncrementalScoreDirector::new(
            Sol { slots, score: None },
            (OddValue {
                violations: std::collections::HashSet::new(),
            },),
            |s: &Sol| s.slots.len(),
        )
    }

    // Simulates a move: notify, mutate, register undo, notify.
    fn apply_change(
        recording: &mut RecordingScoreDirector<'_, Sol>,
        entity_index: usize,
        value: Option<u32>,
    ) {
        let old = recording.working_solution().slots[entity_index];
        recording.before_variable_changed(entity_index);
        recording.working_solution_mut().slots[entity_index] = value;
        recording.after_variable_changed(entity_index);
        recording.register_undo(Box::new(move |s: &mut Sol| {
            s.slots[entity_index] = old;
        }));
    }

    #[test]
    fn test_undo_restores_values_and_score() {
        let mut d = inner(vec![Some(2), Some(4)]);
        let base = d.calculate_score();
        assert_eq!(base, HardSoftScore::ZERO);

        let mut recording = RecordingScoreDirector::new(&mut d);
        apply_change(&mut recording, 0, Some(3));
        assert_eq!(recording.calculate_score(), HardSoftScore::of_hard(-1));

        recording.undo_changes();
        assert_eq!(recording.calculate_score(), base);
        assert_eq!(recording.working_solution().slots[0], Some(2));
        assert_eq!(d.evaluate_fresh(), HardSoftScore::ZERO);
    }

    #[test]
    fn test_undo_replays_in_reverse_order() {
        let mut d = inner(vec![Some(2), Some(4)]);
        d.calculate_score();

        let mut recording = RecordingScoreDirector::new(&mut d);
        // Two stacked changes on the same entity.
        apply_change(&mut recording, 0, Some(3));
        apply_change(&mut recording, 0, Some(5));
        assert_eq!(recording.change_count(), 2);

        recording.undo_changes();
        assert_eq!(recording.working_solution().slots[0], Some(2));
        assert_eq!(d.calculate_score(), HardSoftScore::ZERO);
    }

    #[test]
    fn test_reset_recording_reuses_allocation() {
        let mut d = inner(vec![Some(2)]);
        d.calculate_score();

        let mut recording = RecordingScoreDirector::new(&mut d);
        apply_change(&mut recording, 0, Some(9));
        recording.undo_changes();
        recording.reset_recording();
        assert!(recording.is_empty());
    }
}
