// ScoreDirector trait - the single gateway for solution mutation.

use tutorplan_core::domain::PlanningSolution;

// Mediates between the solver and the scoring system.
//
// All planning-variable changes go through a score director: a move calls
// `before_variable_changed`, mutates the working solution, then calls
// `after_variable_changed`. The director keeps a running score consistent
// with the state, so `calculate_score` after a change returns the score of
// exactly that state.
//
// The trait is object-safe so moves can operate on `&mut dyn ScoreDirector<S>`
// and the same move type works against both the real director and the
// recording wrapper used for candidate evaluation.
pub trait ScoreDirector<S: PlanningSolution>: Send {
    // Returns a reference to the working solution.
    fn working_solution(&self) -> &S;

    // Returns a mutable reference to the working solution.
    //
    // Mutations made through this reference bypass incremental bookkeeping;
    // callers must pair them with the before/after notifications or `reset`.
    fn working_solution_mut(&mut self) -> &mut S;

    // Calculates and returns the score of the current working solution.
    fn calculate_score(&mut self) -> S::Score;

    // Clones the working solution, stamping it with the current score.
    fn clone_working_solution(&self) -> S;

    // Called before an entity's planning variable changes, while the
    // solution still holds the old value.
    fn before_variable_changed(&mut self, entity_index: usize);

    // Called after an entity's planning variable changed.
    fn after_variable_changed(&mut self, entity_index: usize);

    // Returns the number of planning entities.
    fn entity_count(&self) -> usize;

    // Discards incremental state; the next `calculate_score` re-evaluates
    // everything from scratch.
    fn reset(&mut self);

    // Registers an undo closure for the change in progress.
    //
    // Only recording directors store these; the default discards them, which
    // is correct when a move is applied for keeps.
    fn register_undo(&mut self, undo: Box<dyn FnOnce(&mut S) + Send>) {
        let _ = undo;
    }
}
