//! SwapMove - exchanges variable values between two entities.
//!
//! Where a ReassignMove pulls a fresh value out of the domain, a swap
//! redistributes values that are already in use. Swaps preserve the value
//! histogram of the solution, which makes them effective late in a solve when
//! the right mix of values is present but attached to the wrong entities.

use std::fmt::Debug;

use tutorplan_core::domain::PlanningSolution;
use tutorplan_scoring::ScoreDirector;

use super::Move;

/// A move that swaps one variable's values between two entities.
///
/// # Type Parameters
/// * `S` - The planning solution type
/// * `V` - The variable value type
#[derive(Clone, Copy)]
pub struct SwapMove<S, V> {
    indices: [usize; 2],
    getter: fn(&S, usize) -> Option<V>,
    setter: fn(&mut S, usize, Option<V>),
    variable_name: &'static str,
}

impl<S, V> Debug for SwapMove<S, V> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SwapMove")
            .field("left_index", &self.indices[0])
            .field("right_index", &self.indices[1])
            .field("variable_name", &self.variable_name)
            .finish()
    }
}

impl<S, V> SwapMove<S, V> {
    /// Creates a new swap move between two entities.
    pub fn new(
        left_index: usize,
        right_index: usize,
        getter: fn(&S, usize) -> Option<V>,
        setter: fn(&mut S, usize, Option<V>),
        variable_name: &'static str,
    ) -> Self {
        Self {
            indices: [left_index, right_index],
            getter,
            setter,
            variable_name,
        }
    }

    /// Returns the left entity index.
    pub fn left_index(&self) -> usize {
        self.indices[0]
    }

    /// Returns the right entity index.
    pub fn right_index(&self) -> usize {
        self.indices[1]
    }
}

impl<S, V> Move<S> for SwapMove<S, V>
where
    S: PlanningSolution,
    V: Clone + PartialEq + Send + Sync + Debug + 'static,
{
    fn is_doable(&self, score_director: &dyn ScoreDirector<S>) -> bool {
        if self.indices[0] == self.indices[1] {
            return false;
        }
        let solution = score_director.working_solution();
        let left = (self.getter)(solution, self.indices[0]);
        let right = (self.getter)(solution, self.indices[1]);
        left != right
    }

    fn do_move(&self, score_director: &mut dyn ScoreDirector<S>) {
        let [left_idx, right_idx] = self.indices;

        let solution = score_director.working_solution();
        let left_value = (self.getter)(solution, left_idx);
        let right_value = (self.getter)(solution, right_idx);

        score_director.before_variable_changed(left_idx);
        (self.setter)(
            score_director.working_solution_mut(),
            left_idx,
            right_value.clone(),
        );
        score_director.after_variable_changed(left_idx);

        score_director.before_variable_changed(right_idx);
        (self.setter)(
            score_director.working_solution_mut(),
            right_idx,
            left_value.clone(),
        );
        score_director.after_variable_changed(right_idx);

        let setter = self.setter;
        score_director.register_undo(Box::new(move |s: &mut S| {
            setter(s, left_idx, left_value);
            setter(s, right_idx, right_value);
        }));
    }

    fn entity_indices(&self) -> &[usize] {
        &self.indices
    }

    fn variable_name(&self) -> &'static str {
        self.variable_name
    }
}
