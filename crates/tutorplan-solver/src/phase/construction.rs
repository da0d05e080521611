//! Construction heuristic phase.
//!
//! Walks the entities in index order and gives every unassigned variable a
//! value from its registered range. Candidate assignments for one entity are
//! ranked by a forager: first-fit takes the first doable candidate, best-fit
//! scores every candidate through the director and keeps the winner.
//!
//! The phase always runs to completion, even when early termination has been
//! requested. Local search and any anytime snapshot both require a fully
//! initialized solution, so cancellation only takes effect from the next
//! phase onward.

use std::fmt::Debug;
use std::marker::PhantomData;
use std::time::Instant;

use tracing::info;

use tutorplan_core::domain::PlanningSolution;
use tutorplan_scoring::{RecordingScoreDirector, ScoreDirector};

use crate::heuristic::r#move::{Move, ReassignMove};
use crate::heuristic::VariableDescriptor;
use crate::phase::Phase;
use crate::scope::SolverScope;

/// Trait for selecting a move during construction.
///
/// Foragers evaluate candidate moves and pick one based on their strategy.
/// Returns the index of the selected move, not a cloned move.
pub trait ConstructionForager<S, M>: Send + Debug
where
    S: PlanningSolution,
    M: Move<S>,
{
    /// Picks a move index from the candidates for one entity.
    ///
    /// Returns None if no suitable move is found.
    fn pick_move_index<D: ScoreDirector<S>>(
        &self,
        candidates: &[M],
        score_director: &mut D,
    ) -> Option<usize>;
}

/// First Fit forager - picks the first doable move.
///
/// The fastest forager: it takes the first candidate that can be executed,
/// without scoring any of them.
pub struct FirstFitForager<S, M> {
    _phantom: PhantomData<fn() -> (S, M)>,
}

impl<S, M> Clone for FirstFitForager<S, M> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<S, M> Copy for FirstFitForager<S, M> {}

impl<S, M> Default for FirstFitForager<S, M> {
    fn default() -> Self {
        Self::new()
    }
}

impl<S, M> Debug for FirstFitForager<S, M> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FirstFitForager").finish()
    }
}

impl<S, M> FirstFitForager<S, M> {
    pub fn new() -> Self {
        Self {
            _phantom: PhantomData,
        }
    }
}

impl<S, M> ConstructionForager<S, M> for FirstFitForager<S, M>
where
    S: PlanningSolution,
    M: Move<S>,
{
    fn pick_move_index<D: ScoreDirector<S>>(
        &self,
        candidates: &[M],
        score_director: &mut D,
    ) -> Option<usize> {
        candidates
            .iter()
            .position(|m| m.is_doable(score_director))
    }
}

/// Best Fit forager - evaluates all moves and picks the best.
///
/// Each candidate is executed, scored and undone through a recording
/// director. Ties keep the earliest candidate, which keeps construction
/// deterministic.
pub struct BestFitForager<S, M> {
    _phantom: PhantomData<fn() -> (S, M)>,
}

impl<S, M> Clone for BestFitForager<S, M> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<S, M> Copy for BestFitForager<S, M> {}

impl<S, M> Default for BestFitForager<S, M> {
    fn default() -> Self {
        Self::new()
    }
}

impl<S, M> Debug for BestFitForager<S, M> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BestFitForager").finish()
    }
}

impl<S, M> BestFitForager<S, M> {
    pub fn new() -> Self {
        Self {
            _phantom: PhantomData,
        }
    }
}

impl<S, M> ConstructionForager<S, M> for BestFitForager<S, M>
where
    S: PlanningSolution,
    M: Move<S>,
{
    fn pick_move_index<D: ScoreDirector<S>>(
        &self,
        candidates: &[M],
        score_director: &mut D,
    ) -> Option<usize> {
        let mut best_idx: Option<usize> = None;
        let mut best_score: Option<S::Score> = None;

        for (idx, m) in candidates.iter().enumerate() {
            if !m.is_doable(score_director) {
                continue;
            }

            let score = {
                let mut recording = RecordingScoreDirector::new(score_director);
                m.do_move(&mut recording);
                let score = recording.calculate_score();
                recording.undo_changes();
                score
            };

            let is_better = match &best_score {
                None => true,
                Some(best) => score > *best,
            };

            if is_better {
                best_idx = Some(idx);
                best_score = Some(score);
            }
        }

        best_idx
    }
}

/// Construction heuristic phase that builds an initial solution.
///
/// Iterates over entities in index order and assigns a value from the
/// variable's registered range to each entity whose variable is still
/// unassigned. Entities with a preset value are left untouched.
///
/// # Type Parameters
/// * `S` - The planning solution type
/// * `V` - The variable value type
/// * `Fo` - The forager type
pub struct ConstructionHeuristicPhase<S, V, Fo> {
    descriptor: VariableDescriptor<S, V>,
    entity_counter: fn(&S) -> usize,
    forager: Fo,
}

impl<S, V, Fo> ConstructionHeuristicPhase<S, V, Fo> {
    pub fn new(
        descriptor: VariableDescriptor<S, V>,
        entity_counter: fn(&S) -> usize,
        forager: Fo,
    ) -> Self {
        Self {
            descriptor,
            entity_counter,
            forager,
        }
    }
}

impl<S, V: Debug, Fo: Debug> Debug for ConstructionHeuristicPhase<S, V, Fo> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConstructionHeuristicPhase")
            .field("descriptor", &self.descriptor)
            .field("forager", &self.forager)
            .finish()
    }
}

impl<S, D, V, Fo> Phase<S, D> for ConstructionHeuristicPhase<S, V, Fo>
where
    S: PlanningSolution,
    D: ScoreDirector<S>,
    V: Clone + PartialEq + Send + Sync + Debug + 'static,
    Fo: ConstructionForager<S, ReassignMove<S, V>>,
{
    fn solve(&mut self, solver_scope: &mut SolverScope<S, D>) {
        let phase_start = Instant::now();
        let mut steps: u64 = 0;

        info!(
            event = "phase_start",
            phase = "Construction Heuristic",
            phase_index = 0,
        );

        let entity_count = (self.entity_counter)(solver_scope.working_solution());
        let getter = self.descriptor.getter();
        let setter = self.descriptor.setter();
        let variable_name = self.descriptor.variable_name();

        for entity_index in 0..entity_count {
            if getter(solver_scope.working_solution(), entity_index).is_some() {
                continue;
            }

            let mut candidates: Vec<ReassignMove<S, V>> = self
                .descriptor
                .value_range()
                .iter()
                .map(|value| {
                    ReassignMove::new(
                        entity_index,
                        Some(value.clone()),
                        getter,
                        setter,
                        variable_name,
                    )
                })
                .collect();

            let candidate_count = candidates.len() as u64;
            let director = solver_scope.score_director_mut();
            if let Some(idx) = self.forager.pick_move_index(&candidates, director) {
                let m = candidates.swap_remove(idx);
                m.do_move(director);
                director.calculate_score();
            }

            solver_scope.add_move_count(candidate_count);
            solver_scope.increment_step_count();
            steps += 1;
        }

        solver_scope.update_best_solution();

        let duration = phase_start.elapsed();
        let speed = if duration.as_secs_f64() > 0.0 {
            (steps as f64 / duration.as_secs_f64()) as u64
        } else {
            0
        };
        let score = solver_scope
            .best_score()
            .map(|s| format!("{s}"))
            .unwrap_or_else(|| "none".to_string());

        info!(
            event = "phase_end",
            phase = "Construction Heuristic",
            phase_index = 0,
            duration_ms = duration.as_millis() as u64,
            steps = steps,
            speed = speed,
            score = score,
        );
    }

    fn phase_type_name(&self) -> &'static str {
        "ConstructionHeuristic"
    }
}
