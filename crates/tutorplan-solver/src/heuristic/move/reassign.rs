//! ReassignMove - assigns a value to a planning variable.
//!
//! This is the most fundamental move type: it picks one entity, one variable,
//! and replaces the variable's value with another from the full domain.
//!
//! # Zero-Erasure Design
//!
//! The move stores typed function pointers that operate directly on the
//! solution. No `Arc<dyn>`, no `Box<dyn Any>`, no `downcast_ref`.

use std::fmt::Debug;

use tutorplan_core::domain::PlanningSolution;
use tutorplan_scoring::ScoreDirector;

use super::Move;

/// A move that assigns a value to an entity's variable.
///
/// # Type Parameters
/// * `S` - The planning solution type
/// * `V` - The variable value type
#[derive(Clone, Copy)]
pub struct ReassignMove<S, V> {
    entity_index: usize,
    to_value: Option<V>,
    getter: fn(&S, usize) -> Option<V>,
    setter: fn(&mut S, usize, Option<V>),
    variable_name: &'static str,
}

impl<S, V: Debug> Debug for ReassignMove<S, V> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReassignMove")
            .field("entity_index", &self.entity_index)
            .field("variable_name", &self.variable_name)
            .field("to_value", &self.to_value)
            .finish()
    }
}

impl<S, V> ReassignMove<S, V> {
    /// Creates a new reassign move with typed function pointers.
    ///
    /// # Arguments
    /// * `entity_index` - Index of the entity in its collection
    /// * `to_value` - The value to assign (None to unassign)
    /// * `getter` - Function pointer to get the current value from the solution
    /// * `setter` - Function pointer to set the value on the solution
    /// * `variable_name` - Name of the variable (for debugging)
    pub fn new(
        entity_index: usize,
        to_value: Option<V>,
        getter: fn(&S, usize) -> Option<V>,
        setter: fn(&mut S, usize, Option<V>),
        variable_name: &'static str,
    ) -> Self {
        Self {
            entity_index,
            to_value,
            getter,
            setter,
            variable_name,
        }
    }

    /// Returns the entity index.
    pub fn entity_index(&self) -> usize {
        self.entity_index
    }

    /// Returns the target value.
    pub fn to_value(&self) -> Option<&V> {
        self.to_value.as_ref()
    }
}

impl<S, V> Move<S> for ReassignMove<S, V>
where
    S: PlanningSolution,
    V: Clone + PartialEq + Send + Sync + Debug + 'static,
{
    fn is_doable(&self, score_director: &dyn ScoreDirector<S>) -> bool {
        let current = (self.getter)(score_director.working_solution(), self.entity_index);

        match (&current, &self.to_value) {
            (None, None) => false,                      // Both unassigned
            (Some(cur), Some(target)) => cur != target, // Different values
            _ => true,                                  // One assigned, one not
        }
    }

    fn do_move(&self, score_director: &mut dyn ScoreDirector<S>) {
        // Capture the old value with the typed getter before notifying.
        let old_value = (self.getter)(score_director.working_solution(), self.entity_index);

        score_director.before_variable_changed(self.entity_index);

        (self.setter)(
            score_director.working_solution_mut(),
            self.entity_index,
            self.to_value.clone(),
        );

        score_director.after_variable_changed(self.entity_index);

        let setter = self.setter;
        let idx = self.entity_index;
        score_director.register_undo(Box::new(move |s: &mut S| {
            setter(s, idx, old_value);
        }));
    }

    fn entity_indices(&self) -> &[usize] {
        std::slice::from_ref(&self.entity_index)
    }

    fn variable_name(&self) -> &'static str {
        self.variable_name
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{get_slot, set_slot, toy_director};
    use tutorplan_scoring::RecordingScoreDirector;

    #[test]
    fn test_is_doable() {
        let director = toy_director(vec![Some(0), None]);

        let same = ReassignMove::new(0, Some(0), get_slot, set_slot, "slot");
        assert!(!same.is_doable(&director));

        let change = ReassignMove::new(0, Some(1), get_slot, set_slot, "slot");
        assert!(change.is_doable(&director));

        let assign = ReassignMove::new(1, Some(2), get_slot, set_slot, "slot");
        assert!(assign.is_doable(&director));
    }

    #[test]
    fn test_do_move_updates_value_and_score() {
        let mut director = toy_director(vec![Some(3), Some(3)]);
        let before = director.calculate_score();

        let m = ReassignMove::new(1, Some(4), get_slot, set_slot, "slot");
        m.do_move(&mut director);

        assert_eq!(get_slot(director.working_solution(), 1), Some(4));
        assert_ne!(director.calculate_score(), before);
        assert_eq!(director.calculate_score(), director.evaluate_fresh());
    }

    #[test]
    fn test_undo_through_recording_director() {
        let mut director = toy_director(vec![Some(3), Some(3)]);
        let before = director.calculate_score();

        {
            let mut recording = RecordingScoreDirector::new(&mut director);
            let m = ReassignMove::new(0, Some(9), get_slot, set_slot, "slot");
            m.do_move(&mut recording);
            recording.undo_changes();
        }

        assert_eq!(get_slot(director.working_solution(), 0), Some(3));
        assert_eq!(director.calculate_score(), before);
    }
}
