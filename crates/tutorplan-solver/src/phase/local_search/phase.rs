//! Local search phase implementation.

use std::fmt::Debug;
use std::time::Instant;

use tracing::{debug, info, trace};

use tutorplan_core::domain::PlanningSolution;
use tutorplan_scoring::{RecordingScoreDirector, ScoreDirector};

use crate::heuristic::r#move::Move;
use crate::heuristic::selector::MoveSelector;
use crate::phase::local_search::{Acceptor, LocalSearchForager};
use crate::phase::Phase;
use crate::scope::SolverScope;
use crate::termination::Termination;

/// Default number of candidate moves sampled per step before giving up.
const DEFAULT_MOVE_EVALUATION_LIMIT: usize = 128;

/// Local search phase that improves an existing solution.
///
/// Each step:
/// 1. Samples candidate moves from the selector with the scope's seeded RNG
/// 2. Evaluates each candidate through incremental rescoring with recorded undo
/// 3. Offers the resulting score to the acceptor
/// 4. Applies the move the forager picks from the accepted candidates
///
/// A step that accepts nothing within the sampling budget ends the phase: the
/// search is stuck and more sampling of the same neighborhood will not free
/// it. The phase also stops when its termination fires or the solver's
/// cooperative cancellation flag is raised. The best solution snapshot is
/// updated at every improving step, so interrupting mid-phase still leaves a
/// usable result in the scope.
pub struct LocalSearchPhase<Sel, A, Fo, T> {
    move_selector: Sel,
    acceptor: A,
    forager: Fo,
    termination: T,
    move_evaluation_limit: usize,
}

impl<Sel, A, Fo, T> LocalSearchPhase<Sel, A, Fo, T> {
    /// Creates a new local search phase.
    pub fn new(move_selector: Sel, acceptor: A, forager: Fo, termination: T) -> Self {
        Self {
            move_selector,
            acceptor,
            forager,
            termination,
            move_evaluation_limit: DEFAULT_MOVE_EVALUATION_LIMIT,
        }
    }

    /// Overrides the per-step sampling budget.
    pub fn with_move_evaluation_limit(mut self, limit: usize) -> Self {
        self.move_evaluation_limit = limit;
        self
    }
}

impl<Sel, A: Debug, Fo: Debug, T: Debug> Debug for LocalSearchPhase<Sel, A, Fo, T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LocalSearchPhase")
            .field("acceptor", &self.acceptor)
            .field("forager", &self.forager)
            .field("termination", &self.termination)
            .field("move_evaluation_limit", &self.move_evaluation_limit)
            .finish()
    }
}

impl<S, D, Sel, A, Fo, T> Phase<S, D> for LocalSearchPhase<Sel, A, Fo, T>
where
    S: PlanningSolution,
    D: ScoreDirector<S>,
    Sel: MoveSelector<S>,
    A: Acceptor<S>,
    Fo: LocalSearchForager<S, Sel::Move>,
    T: Termination<S, D>,
{
    fn solve(&mut self, solver_scope: &mut SolverScope<S, D>) {
        let phase_start = Instant::now();
        let mut steps: u64 = 0;
        let mut moves_evaluated: u64 = 0;
        let mut last_progress_time = Instant::now();
        let mut last_progress_moves: u64 = 0;

        info!(event = "phase_start", phase = "Local Search", phase_index = 1);

        let mut last_step_score = solver_scope.calculate_score();
        self.acceptor.phase_started(&last_step_score);

        // Record the incoming solution, so interrupting before the first
        // improving step still leaves a best snapshot behind.
        solver_scope.update_best_solution();

        loop {
            if solver_scope.is_terminate_early() || self.termination.is_terminated(solver_scope) {
                break;
            }

            self.forager.step_started();
            let mut sampled: usize = 0;

            while sampled < self.move_evaluation_limit && !self.forager.is_quit_early() {
                let (director, rng) = solver_scope.director_and_rng();

                let Some(candidate) = self
                    .move_selector
                    .sample_move(director.working_solution(), rng)
                else {
                    break;
                };
                sampled += 1;
                moves_evaluated += 1;

                if !candidate.is_doable(director) {
                    continue;
                }

                // Evaluate through a recording director, then undo.
                let move_score = {
                    let mut recording = RecordingScoreDirector::new(director);
                    candidate.do_move(&mut recording);
                    let score = recording.calculate_score();
                    recording.undo_changes();
                    score
                };

                if self
                    .acceptor
                    .is_accepted(&last_step_score, &move_score, rng)
                {
                    self.forager.add_move(candidate, move_score);
                }
            }

            solver_scope.add_move_count(sampled as u64);

            let now = Instant::now();
            if now.duration_since(last_progress_time).as_secs() >= 1 {
                let moves_delta = moves_evaluated - last_progress_moves;
                let elapsed_secs = now.duration_since(last_progress_time).as_secs_f64();
                let current_speed = (moves_delta as f64 / elapsed_secs) as u64;
                debug!(
                    event = "progress",
                    steps = solver_scope.total_step_count(),
                    speed = current_speed,
                    score = %last_step_score,
                );
                last_progress_time = now;
                last_progress_moves = moves_evaluated;
            }

            let Some((selected_move, selected_score)) = self.forager.pick_move() else {
                // No accepted moves - we're stuck
                break;
            };

            // Execute the selected move (for real this time)
            let director = solver_scope.score_director_mut();
            selected_move.do_move(director);
            director.calculate_score();

            let step = solver_scope.increment_step_count();
            steps += 1;
            last_step_score = selected_score;
            self.acceptor.step_ended(&selected_score);

            trace!(event = "step", step = step, score = %selected_score, accepted = true);

            solver_scope.update_best_solution();
        }

        let duration = phase_start.elapsed();
        let speed = if duration.as_secs_f64() > 0.0 {
            (moves_evaluated as f64 / duration.as_secs_f64()) as u64
        } else {
            0
        };
        let score = solver_scope
            .best_score()
            .map(|s| format!("{s}"))
            .unwrap_or_else(|| "none".to_string());

        info!(
            event = "phase_end",
            phase = "Local Search",
            phase_index = 1,
            duration_ms = duration.as_millis() as u64,
            steps = steps,
            speed = speed,
            score = score,
        );
    }

    fn phase_type_name(&self) -> &'static str {
        "LocalSearch"
    }
}
