//! Solver wiring for the timetable domain.
//!
//! Registers the two planning variables (timeslot, tutor), assembles phases
//! and terminations from a [`SolverConfig`], and exposes the solve entry
//! points. Everything stays concretely typed: configuration choices are
//! folded into small delegation enums instead of trait objects, so one
//! solver type covers every configuration.

use std::sync::atomic::AtomicBool;
use std::sync::Arc;
use std::time::{Duration, Instant};

use rand::rngs::StdRng;
use thiserror::Error;
use tracing::info;

use tutorplan_config::{
    AcceptorConfig, ConstraintWeights, ConstructionHeuristicType, PhaseConfig, SolverConfig,
};
use tutorplan_core::{HardSoftScore, PlanningSolution, Score};
use tutorplan_scoring::{ConstraintSet, IncrementalScoreDirector, ScoreDirector};
use tutorplan_solver::parallel::multi_start;
use tutorplan_solver::phase::construction::ConstructionForager;
use tutorplan_solver::{
    AcceptedCountForager, Acceptor, BestFitForager, ConstructionHeuristicPhase, FirstFitForager,
    HillClimbingAcceptor, LateAcceptanceAcceptor, LocalSearchPhase, OrTermination, Phase,
    ReassignMove, ReassignMoveSelector, SimulatedAnnealingAcceptor, Solver, SolverScope,
    StepCountTermination, SwapMoveSelector, TimeTermination, UnimprovedStepCountTermination,
    UnionMoveSelector, VariableDescriptor,
};

use crate::constraints::{create_constraints, TimetableConstraints};
use crate::domain::Timetable;

/// Wall-clock budget applied when the configuration sets no limit at all.
const DEFAULT_TIME_LIMIT: Duration = Duration::from_secs(30);

const DEFAULT_LATE_ACCEPTANCE_SIZE: usize = 400;

const DEFAULT_ACCEPTED_COUNT_LIMIT: usize = 1;

/// Errors detected before any search begins.
#[derive(Debug, Error)]
pub enum SolveError {
    #[error("nothing to schedule into: the timeslot grid is empty")]
    NoTimeslots,

    #[error("nobody to teach: the tutor list is empty")]
    NoTutors,
}

/// Score director over the full timetable constraint catalogue.
pub type TimetableDirector = IncrementalScoreDirector<Timetable, TimetableConstraints>;

/// Builds a fresh director for the given solution with the configured weights.
pub fn build_director(solution: Timetable, weights: &ConstraintWeights) -> TimetableDirector {
    IncrementalScoreDirector::new(solution, create_constraints(weights), assignment_count)
}

pub fn assignment_count(solution: &Timetable) -> usize {
    solution.assignment_count()
}

fn assignment_timeslot(solution: &Timetable, index: usize) -> Option<usize> {
    solution.assignments[index].timeslot
}

fn set_assignment_timeslot(solution: &mut Timetable, index: usize, value: Option<usize>) {
    solution.assignments[index].timeslot = value;
}

fn assignment_tutor(solution: &Timetable, index: usize) -> Option<usize> {
    solution.assignments[index].tutor
}

fn set_assignment_tutor(solution: &mut Timetable, index: usize, value: Option<usize>) {
    solution.assignments[index].tutor = value;
}

fn timeslot_descriptor(problem: &Timetable) -> VariableDescriptor<Timetable, usize> {
    VariableDescriptor::new(
        "timeslot",
        assignment_timeslot,
        set_assignment_timeslot,
        (0..problem.timeslots.len()).collect(),
    )
}

fn tutor_descriptor(problem: &Timetable) -> VariableDescriptor<Timetable, usize> {
    VariableDescriptor::new(
        "tutor",
        assignment_tutor,
        set_assignment_tutor,
        (0..problem.tutors.len()).collect(),
    )
}

/// Construction forager choice kept as a concrete type.
#[derive(Debug, Clone, Copy)]
enum ChosenConstructionForager {
    FirstFit(FirstFitForager<Timetable, ReassignMove<Timetable, usize>>),
    BestFit(BestFitForager<Timetable, ReassignMove<Timetable, usize>>),
}

impl ConstructionForager<Timetable, ReassignMove<Timetable, usize>> for ChosenConstructionForager {
    fn pick_move_index<D: ScoreDirector<Timetable>>(
        &self,
        candidates: &[ReassignMove<Timetable, usize>],
        score_director: &mut D,
    ) -> Option<usize> {
        match self {
            ChosenConstructionForager::FirstFit(forager) => {
                forager.pick_move_index(candidates, score_director)
            }
            ChosenConstructionForager::BestFit(forager) => {
                forager.pick_move_index(candidates, score_director)
            }
        }
    }
}

/// Acceptor choice kept as a concrete type.
#[derive(Debug)]
enum ChosenAcceptor {
    HillClimbing(HillClimbingAcceptor),
    LateAcceptance(LateAcceptanceAcceptor<Timetable>),
    SimulatedAnnealing(SimulatedAnnealingAcceptor),
}

impl Acceptor<Timetable> for ChosenAcceptor {
    fn is_accepted(
        &mut self,
        last_step_score: &HardSoftScore,
        move_score: &HardSoftScore,
        rng: &mut StdRng,
    ) -> bool {
        match self {
            ChosenAcceptor::HillClimbing(acceptor) => {
                Acceptor::<Timetable>::is_accepted(acceptor, last_step_score, move_score, rng)
            }
            ChosenAcceptor::LateAcceptance(acceptor) => {
                Acceptor::<Timetable>::is_accepted(acceptor, last_step_score, move_score, rng)
            }
            ChosenAcceptor::SimulatedAnnealing(acceptor) => {
                Acceptor::<Timetable>::is_accepted(acceptor, last_step_score, move_score, rng)
            }
        }
    }

    fn phase_started(&mut self, initial_score: &HardSoftScore) {
        match self {
            ChosenAcceptor::HillClimbing(acceptor) => {
                Acceptor::<Timetable>::phase_started(acceptor, initial_score)
            }
            ChosenAcceptor::LateAcceptance(acceptor) => {
                Acceptor::<Timetable>::phase_started(acceptor, initial_score)
            }
            ChosenAcceptor::SimulatedAnnealing(acceptor) => {
                Acceptor::<Timetable>::phase_started(acceptor, initial_score)
            }
        }
    }

    fn step_ended(&mut self, step_score: &HardSoftScore) {
        match self {
            ChosenAcceptor::HillClimbing(acceptor) => {
                Acceptor::<Timetable>::step_ended(acceptor, step_score)
            }
            ChosenAcceptor::LateAcceptance(acceptor) => {
                Acceptor::<Timetable>::step_ended(acceptor, step_score)
            }
            ChosenAcceptor::SimulatedAnnealing(acceptor) => {
                Acceptor::<Timetable>::step_ended(acceptor, step_score)
            }
        }
    }
}

/// Two-pass construction: every assignment first receives a timeslot, then
/// a tutor. Both passes run inside one solver phase, so the solution that
/// leaves construction is always fully assigned, even under a zero budget
/// or an already-raised cancellation flag.
#[derive(Debug)]
struct TimetableConstruction {
    timeslot_pass: ConstructionHeuristicPhase<Timetable, usize, ChosenConstructionForager>,
    tutor_pass: ConstructionHeuristicPhase<Timetable, usize, ChosenConstructionForager>,
}

impl<D: ScoreDirector<Timetable>> Phase<Timetable, D> for TimetableConstruction {
    fn solve(&mut self, solver_scope: &mut SolverScope<Timetable, D>) {
        self.timeslot_pass.solve(solver_scope);
        self.tutor_pass.solve(solver_scope);
    }

    fn phase_type_name(&self) -> &'static str {
        "ConstructionHeuristic"
    }
}

type SolveTermination = OrTermination<(
    Option<TimeTermination>,
    Option<StepCountTermination>,
    Option<UnimprovedStepCountTermination<Timetable>>,
)>;

/// The wall-clock budget for this solve, if any.
///
/// A configured time limit always wins. Without one, the default budget
/// applies only when no step-based limit is configured either; a run with
/// a step budget is already bounded.
fn effective_time_limit(config: &SolverConfig) -> Option<Duration> {
    if let Some(limit) = config.time_limit() {
        return Some(limit);
    }
    let step_bounded = config.termination.as_ref().is_some_and(|termination| {
        termination.step_count_limit.is_some() || termination.unimproved_step_count_limit.is_some()
    });
    if step_bounded {
        None
    } else {
        Some(DEFAULT_TIME_LIMIT)
    }
}

/// Builds a fresh composite termination from the configured limits.
///
/// Terminations carry per-run state, so each solver and each phase gets its
/// own instance.
fn build_termination(config: &SolverConfig) -> SolveTermination {
    let termination = config.termination.as_ref();
    OrTermination::new((
        effective_time_limit(config).map(TimeTermination::new),
        termination
            .and_then(|t| t.step_count_limit)
            .map(StepCountTermination::new),
        termination
            .and_then(|t| t.unimproved_step_count_limit)
            .map(UnimprovedStepCountTermination::new),
    ))
}

/// Phase settings folded from the configuration; later entries win.
struct PhasePlan {
    construction: ConstructionHeuristicType,
    acceptor: Option<AcceptorConfig>,
    accepted_count_limit: usize,
    move_evaluation_limit: Option<usize>,
}

impl PhasePlan {
    fn from_config(config: &SolverConfig) -> Self {
        let mut plan = PhasePlan {
            construction: ConstructionHeuristicType::default(),
            acceptor: None,
            accepted_count_limit: DEFAULT_ACCEPTED_COUNT_LIMIT,
            move_evaluation_limit: None,
        };
        for phase in &config.phases {
            match phase {
                PhaseConfig::ConstructionHeuristic(construction) => {
                    plan.construction = construction.construction_heuristic_type;
                }
                PhaseConfig::LocalSearch(local_search) => {
                    if local_search.acceptor.is_some() {
                        plan.acceptor = local_search.acceptor.clone();
                    }
                    if let Some(limit) = local_search
                        .forager
                        .as_ref()
                        .and_then(|forager| forager.accepted_count_limit)
                    {
                        plan.accepted_count_limit = limit;
                    }
                    if local_search.move_evaluation_limit.is_some() {
                        plan.move_evaluation_limit = local_search.move_evaluation_limit;
                    }
                }
            }
        }
        plan
    }

    fn construction_forager(&self) -> ChosenConstructionForager {
        match self.construction {
            ConstructionHeuristicType::FirstFit => {
                ChosenConstructionForager::FirstFit(FirstFitForager::new())
            }
            ConstructionHeuristicType::BestFit => {
                ChosenConstructionForager::BestFit(BestFitForager::new())
            }
        }
    }

    fn acceptor(&self) -> ChosenAcceptor {
        match &self.acceptor {
            Some(AcceptorConfig::HillClimbing) => {
                ChosenAcceptor::HillClimbing(HillClimbingAcceptor::new())
            }
            Some(AcceptorConfig::SimulatedAnnealing(annealing)) => {
                ChosenAcceptor::SimulatedAnnealing(SimulatedAnnealingAcceptor::new(
                    annealing.starting_temperature.unwrap_or(1.0),
                    annealing.decay_rate.unwrap_or(0.99),
                ))
            }
            Some(AcceptorConfig::LateAcceptance(late_acceptance)) => {
                ChosenAcceptor::LateAcceptance(LateAcceptanceAcceptor::new(
                    late_acceptance
                        .late_acceptance_size
                        .unwrap_or(DEFAULT_LATE_ACCEPTANCE_SIZE),
                ))
            }
            None => ChosenAcceptor::LateAcceptance(LateAcceptanceAcceptor::new(
                DEFAULT_LATE_ACCEPTANCE_SIZE,
            )),
        }
    }
}

/// One seeded end-to-end run: fresh director, phases and terminations.
fn solve_single(
    problem: &Timetable,
    config: &SolverConfig,
    plan: &PhasePlan,
    seed: u64,
    cancel: Option<&Arc<AtomicBool>>,
) -> Timetable {
    let forager = plan.construction_forager();
    let construction = TimetableConstruction {
        timeslot_pass: ConstructionHeuristicPhase::new(
            timeslot_descriptor(problem),
            assignment_count,
            forager,
        ),
        tutor_pass: ConstructionHeuristicPhase::new(
            tutor_descriptor(problem),
            assignment_count,
            forager,
        ),
    };

    // Reassign and swap neighborhoods over both variables, mixed evenly.
    let selector = UnionMoveSelector::new(
        UnionMoveSelector::new(
            ReassignMoveSelector::new(timeslot_descriptor(problem), assignment_count),
            ReassignMoveSelector::new(tutor_descriptor(problem), assignment_count),
        ),
        UnionMoveSelector::new(
            SwapMoveSelector::new(timeslot_descriptor(problem), assignment_count),
            SwapMoveSelector::new(tutor_descriptor(problem), assignment_count),
        ),
    );
    let mut local_search = LocalSearchPhase::new(
        selector,
        plan.acceptor(),
        AcceptedCountForager::new(plan.accepted_count_limit),
        build_termination(config),
    );
    if let Some(limit) = plan.move_evaluation_limit {
        local_search = local_search.with_move_evaluation_limit(limit);
    }

    let mut solver =
        Solver::new((construction, local_search)).with_termination(build_termination(config));
    if let Some(flag) = cancel {
        solver = solver.with_shared_terminate_flag(Arc::clone(flag));
    }

    solver.solve_seeded(build_director(problem.clone(), &config.weights), seed)
}

/// Solves the timetable with the given configuration.
pub fn solve(problem: Timetable, config: &SolverConfig) -> Result<Timetable, SolveError> {
    solve_with_cancel(problem, config, None)
}

/// Solves with an optional cooperative cancellation flag.
///
/// Raising the flag stops the search at the next step boundary; the best
/// solution found so far is still returned, fully assigned. With a
/// `run_count` above one, independent seeded runs race on the thread pool
/// and the best final score wins; the flag cancels all of them.
pub fn solve_with_cancel(
    problem: Timetable,
    config: &SolverConfig,
    cancel: Option<Arc<AtomicBool>>,
) -> Result<Timetable, SolveError> {
    if problem.timeslots.is_empty() {
        return Err(SolveError::NoTimeslots);
    }
    if problem.tutors.is_empty() {
        return Err(SolveError::NoTutors);
    }

    let plan = PhasePlan::from_config(config);
    info!(
        event = "solve_start",
        entity_count = problem.assignment_count(),
        value_count = problem.timeslots.len() * problem.tutors.len(),
        constraint_count = create_constraints(&config.weights).constraint_count(),
        time_limit_secs = effective_time_limit(config).map_or(0, |limit| limit.as_secs()),
    );
    let solve_start = Instant::now();

    let base_seed = config.random_seed.unwrap_or_else(rand::random);
    let run_count = config.run_count.unwrap_or(1);
    let cancel_ref = cancel.as_ref();

    let solution = if run_count > 1 {
        match multi_start(run_count, base_seed, |_run_index, seed| {
            solve_single(&problem, config, &plan, seed, cancel_ref)
        }) {
            Some(result) => result.solution,
            None => solve_single(&problem, config, &plan, base_seed, cancel_ref),
        }
    } else {
        solve_single(&problem, config, &plan, base_seed, cancel_ref)
    };

    let score = solution.score().unwrap_or(HardSoftScore::ZERO);
    info!(
        event = "solve_end",
        score = format!("{score}"),
        feasible = score.is_feasible(),
        duration_ms = solve_start.elapsed().as_millis() as u64,
    );
    Ok(solution)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::demo_data::DemoData;
    use crate::domain::{default_timeslots, Cohort, Level, Platform, Student, Tutor};
    use std::sync::atomic::Ordering;
    use tutorplan_config::{
        ConstructionHeuristicConfig, LateAcceptanceConfig, LocalSearchConfig,
    };

    fn bounded_config(seed: u64) -> SolverConfig {
        SolverConfig::new()
            .with_random_seed(seed)
            .with_step_count_limit(400)
    }

    #[test]
    fn test_solve_rejects_empty_tutor_list() {
        let problem = Timetable::new(
            default_timeslots(),
            vec![Cohort::new("2A", Level::Beginner, Platform::Scratch)],
            vec![],
            vec![Student::new("s01", 0, vec![2; 12])],
        );

        let err = solve(problem, &bounded_config(1)).unwrap_err();
        assert!(matches!(err, SolveError::NoTutors));
    }

    #[test]
    fn test_solve_rejects_empty_timeslot_grid() {
        let problem = Timetable::new(
            vec![],
            vec![Cohort::new("2A", Level::Beginner, Platform::Scratch)],
            vec![Tutor::new("Ada", 4, 6)],
            vec![Student::new("s01", 0, vec![])],
        );

        let err = solve(problem, &bounded_config(1)).unwrap_err();
        assert!(matches!(err, SolveError::NoTimeslots));
    }

    #[test]
    fn test_solve_assigns_every_student() {
        let solution = solve(DemoData::Small.generate(), &bounded_config(42)).unwrap();

        assert!(solution.is_initialized());
        assert!(solution.score.is_some());
    }

    #[test]
    fn test_same_seed_same_timetable() {
        let first = solve(DemoData::Small.generate(), &bounded_config(7)).unwrap();
        let second = solve(DemoData::Small.generate(), &bounded_config(7)).unwrap();

        assert_eq!(first.assignments, second.assignments);
        assert_eq!(first.score, second.score);
    }

    #[test]
    fn test_configured_phases_are_honored() {
        let config = bounded_config(3)
            .with_phase(PhaseConfig::ConstructionHeuristic(
                ConstructionHeuristicConfig {
                    construction_heuristic_type: ConstructionHeuristicType::BestFit,
                },
            ))
            .with_phase(PhaseConfig::LocalSearch(LocalSearchConfig {
                acceptor: Some(AcceptorConfig::LateAcceptance(LateAcceptanceConfig {
                    late_acceptance_size: Some(50),
                })),
                forager: None,
                move_evaluation_limit: Some(64),
            }));

        let solution = solve(DemoData::Small.generate(), &config).unwrap();
        assert!(solution.is_initialized());
    }

    #[test]
    fn test_raised_cancel_flag_still_returns_full_assignment() {
        let cancel = Arc::new(AtomicBool::new(false));
        cancel.store(true, Ordering::SeqCst);

        let solution = solve_with_cancel(
            DemoData::Small.generate(),
            &bounded_config(9),
            Some(Arc::clone(&cancel)),
        )
        .unwrap();

        // Construction is exempt from cancellation; local search never ran.
        assert!(solution.is_initialized());
    }

    #[test]
    fn test_default_time_budget_applies_only_without_other_limits() {
        assert_eq!(
            effective_time_limit(&SolverConfig::new()),
            Some(DEFAULT_TIME_LIMIT)
        );
        assert_eq!(
            effective_time_limit(&SolverConfig::new().with_step_count_limit(100)),
            None
        );
        assert_eq!(
            effective_time_limit(&SolverConfig::new().with_unimproved_step_count_limit(100)),
            None
        );
        assert_eq!(
            effective_time_limit(&SolverConfig::new().with_termination_seconds(5)),
            Some(Duration::from_secs(5))
        );
    }

    #[test]
    fn test_phase_plan_takes_last_entry() {
        let config = SolverConfig::new()
            .with_phase(PhaseConfig::LocalSearch(LocalSearchConfig {
                acceptor: Some(AcceptorConfig::HillClimbing),
                forager: None,
                move_evaluation_limit: None,
            }))
            .with_phase(PhaseConfig::LocalSearch(LocalSearchConfig {
                acceptor: Some(AcceptorConfig::LateAcceptance(LateAcceptanceConfig {
                    late_acceptance_size: Some(25),
                })),
                forager: None,
                move_evaluation_limit: Some(32),
            }));

        let plan = PhasePlan::from_config(&config);
        assert!(matches!(
            plan.acceptor,
            Some(AcceptorConfig::LateAcceptance(_))
        ));
        assert_eq!(plan.move_evaluation_limit, Some(32));
        assert_eq!(plan.accepted_count_limit, DEFAULT_ACCEPTED_COUNT_LIMIT);
    }
}
