//! Configuration system for tutorplan.
//!
//! Load solver configuration from TOML files to control termination,
//! phases, acceptors, and constraint weights without code changes.
//! Loading is fail-fast: a configuration that parses but cannot drive a
//! legal solve (zero time budget, zero step cap, negative weight) is
//! rejected at load time, before any search begins.
//!
//! # Examples
//!
//! Load configuration from TOML string:
//!
//! ```
//! use tutorplan_config::SolverConfig;
//! use std::time::Duration;
//!
//! let config = SolverConfig::from_toml_str(r#"
//!     random_seed = 7
//!
//!     [termination]
//!     seconds_spent_limit = 30
//!     unimproved_step_count_limit = 20000
//!
//!     [[phases]]
//!     type = "construction_heuristic"
//!     construction_heuristic_type = "best_fit"
//!
//!     [[phases]]
//!     type = "local_search"
//!     [phases.acceptor]
//!     type = "late_acceptance"
//!     late_acceptance_size = 200
//! "#).unwrap();
//!
//! assert_eq!(config.time_limit(), Some(Duration::from_secs(30)));
//! assert_eq!(config.phases.len(), 2);
//! ```
//!
//! Use default config when file is missing:
//!
//! ```
//! use tutorplan_config::SolverConfig;
//!
//! let config = SolverConfig::load("solver.toml").unwrap_or_default();
//! // Proceeds with defaults if file doesn't exist
//! ```

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Configuration error
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// Main solver configuration.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub struct SolverConfig {
    /// Random seed for reproducible results.
    #[serde(default)]
    pub random_seed: Option<u64>,

    /// Number of independent solver runs raced in parallel.
    ///
    /// Each run gets its own seed derived from `random_seed`; the best
    /// final score wins. Unset means a single run.
    #[serde(default)]
    pub run_count: Option<usize>,

    /// Termination configuration.
    #[serde(default)]
    pub termination: Option<TerminationConfig>,

    /// Phase configurations.
    #[serde(default)]
    pub phases: Vec<PhaseConfig>,

    /// Constraint weight overrides. Missing entries keep their defaults.
    #[serde(default)]
    pub weights: ConstraintWeights,
}

impl SolverConfig {
    /// Creates a new default configuration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Loads configuration from a TOML file.
    ///
    /// # Errors
    ///
    /// Returns error if the file doesn't exist, contains invalid TOML, or
    /// fails [`SolverConfig::validate`].
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        Self::from_toml_file(path)
    }

    /// Loads configuration from a TOML file.
    pub fn from_toml_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_toml_str(&contents)
    }

    /// Parses and validates configuration from a TOML string.
    pub fn from_toml_str(s: &str) -> Result<Self, ConfigError> {
        let config: SolverConfig = toml::from_str(s)?;
        config.validate()?;
        Ok(config)
    }

    /// Sets the termination time limit.
    pub fn with_termination_seconds(mut self, seconds: u64) -> Self {
        self.termination = Some(TerminationConfig {
            seconds_spent_limit: Some(seconds),
            ..self.termination.unwrap_or_default()
        });
        self
    }

    /// Sets the termination step limit.
    pub fn with_step_count_limit(mut self, steps: u64) -> Self {
        self.termination = Some(TerminationConfig {
            step_count_limit: Some(steps),
            ..self.termination.unwrap_or_default()
        });
        self
    }

    /// Sets the unimproved-step termination limit.
    pub fn with_unimproved_step_count_limit(mut self, steps: u64) -> Self {
        self.termination = Some(TerminationConfig {
            unimproved_step_count_limit: Some(steps),
            ..self.termination.unwrap_or_default()
        });
        self
    }

    /// Sets the random seed.
    pub fn with_random_seed(mut self, seed: u64) -> Self {
        self.random_seed = Some(seed);
        self
    }

    /// Sets the parallel run count.
    pub fn with_run_count(mut self, runs: usize) -> Self {
        self.run_count = Some(runs);
        self
    }

    /// Adds a phase configuration.
    pub fn with_phase(mut self, phase: PhaseConfig) -> Self {
        self.phases.push(phase);
        self
    }

    /// Returns the termination time limit, if configured.
    ///
    /// Convenience method that delegates to `termination.time_limit()`.
    ///
    /// # Examples
    ///
    /// ```
    /// use tutorplan_config::SolverConfig;
    /// use std::time::Duration;
    ///
    /// let config = SolverConfig::from_toml_str(r#"
    ///     [termination]
    ///     minutes_spent_limit = 1
    ///     seconds_spent_limit = 30
    /// "#).unwrap();
    ///
    /// assert_eq!(config.time_limit(), Some(Duration::from_secs(90)));
    /// ```
    pub fn time_limit(&self) -> Option<Duration> {
        self.termination.as_ref().and_then(|t| t.time_limit())
    }

    /// Checks the configuration for values that make a solve impossible.
    ///
    /// A budget that is configured but computes to zero means no legal
    /// search can run at all, which is a setup mistake rather than a
    /// degenerate solve, so it is rejected here instead of producing an
    /// empty run.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if let Some(termination) = &self.termination {
            termination.validate()?;
        }
        if self.run_count == Some(0) {
            return Err(ConfigError::Invalid(
                "run_count must be at least 1".to_string(),
            ));
        }
        for phase in &self.phases {
            phase.validate()?;
        }
        self.weights.validate()?;
        Ok(())
    }
}

/// Termination configuration.
///
/// Time limits combine: `minutes_spent_limit` and `seconds_spent_limit`
/// are summed into one budget.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub struct TerminationConfig {
    /// Maximum seconds to spend solving.
    pub seconds_spent_limit: Option<u64>,

    /// Maximum minutes to spend solving.
    pub minutes_spent_limit: Option<u64>,

    /// Maximum number of steps.
    pub step_count_limit: Option<u64>,

    /// Maximum unimproved steps before terminating.
    pub unimproved_step_count_limit: Option<u64>,
}

impl TerminationConfig {
    /// Returns the time limit as a Duration, if any.
    pub fn time_limit(&self) -> Option<Duration> {
        let seconds =
            self.seconds_spent_limit.unwrap_or(0) + self.minutes_spent_limit.unwrap_or(0) * 60;
        if seconds > 0 {
            Some(Duration::from_secs(seconds))
        } else {
            None
        }
    }

    fn validate(&self) -> Result<(), ConfigError> {
        let time_configured =
            self.seconds_spent_limit.is_some() || self.minutes_spent_limit.is_some();
        if time_configured && self.time_limit().is_none() {
            return Err(ConfigError::Invalid(
                "time budget must be positive".to_string(),
            ));
        }
        if self.step_count_limit == Some(0) {
            return Err(ConfigError::Invalid(
                "step_count_limit must be at least 1".to_string(),
            ));
        }
        if self.unimproved_step_count_limit == Some(0) {
            return Err(ConfigError::Invalid(
                "unimproved_step_count_limit must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

/// Phase configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum PhaseConfig {
    /// Construction heuristic phase.
    ConstructionHeuristic(ConstructionHeuristicConfig),

    /// Local search phase.
    LocalSearch(LocalSearchConfig),
}

impl PhaseConfig {
    fn validate(&self) -> Result<(), ConfigError> {
        match self {
            PhaseConfig::ConstructionHeuristic(_) => Ok(()),
            PhaseConfig::LocalSearch(config) => config.validate(),
        }
    }
}

/// Construction heuristic configuration.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub struct ConstructionHeuristicConfig {
    /// Type of construction heuristic.
    #[serde(default)]
    pub construction_heuristic_type: ConstructionHeuristicType,
}

/// Construction heuristic types.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ConstructionHeuristicType {
    /// Assign the first value whose move is doable.
    #[default]
    FirstFit,

    /// Evaluate every candidate value and assign the best-scoring one.
    BestFit,
}

/// Local search configuration.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub struct LocalSearchConfig {
    /// Acceptor configuration.
    pub acceptor: Option<AcceptorConfig>,

    /// Forager configuration.
    pub forager: Option<ForagerConfig>,

    /// Maximum number of moves sampled and evaluated per step.
    pub move_evaluation_limit: Option<usize>,
}

impl LocalSearchConfig {
    fn validate(&self) -> Result<(), ConfigError> {
        if let Some(acceptor) = &self.acceptor {
            acceptor.validate()?;
        }
        if let Some(forager) = &self.forager {
            if forager.accepted_count_limit == Some(0) {
                return Err(ConfigError::Invalid(
                    "accepted_count_limit must be at least 1".to_string(),
                ));
            }
        }
        if self.move_evaluation_limit == Some(0) {
            return Err(ConfigError::Invalid(
                "move_evaluation_limit must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

/// Acceptor configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AcceptorConfig {
    /// Hill climbing (only accept moves at least as good as the last step).
    HillClimbing,

    /// Simulated annealing acceptor.
    SimulatedAnnealing(SimulatedAnnealingConfig),

    /// Late acceptance acceptor.
    LateAcceptance(LateAcceptanceConfig),
}

impl AcceptorConfig {
    fn validate(&self) -> Result<(), ConfigError> {
        match self {
            AcceptorConfig::HillClimbing => Ok(()),
            AcceptorConfig::SimulatedAnnealing(config) => config.validate(),
            AcceptorConfig::LateAcceptance(config) => {
                if config.late_acceptance_size == Some(0) {
                    return Err(ConfigError::Invalid(
                        "late_acceptance_size must be at least 1".to_string(),
                    ));
                }
                Ok(())
            }
        }
    }
}

/// Simulated annealing configuration.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub struct SimulatedAnnealingConfig {
    /// Starting acceptance probability for worsening moves.
    pub starting_temperature: Option<f64>,

    /// Multiplicative temperature decay applied after every step.
    pub decay_rate: Option<f64>,
}

impl SimulatedAnnealingConfig {
    fn validate(&self) -> Result<(), ConfigError> {
        if let Some(temperature) = self.starting_temperature {
            if !temperature.is_finite() || temperature < 0.0 {
                return Err(ConfigError::Invalid(
                    "starting_temperature must be finite and non-negative".to_string(),
                ));
            }
        }
        if let Some(decay) = self.decay_rate {
            if !decay.is_finite() || decay <= 0.0 || decay > 1.0 {
                return Err(ConfigError::Invalid(
                    "decay_rate must be in (0, 1]".to_string(),
                ));
            }
        }
        Ok(())
    }
}

/// Late acceptance configuration.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub struct LateAcceptanceConfig {
    /// Size of late acceptance list.
    pub late_acceptance_size: Option<usize>,
}

/// Forager configuration.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub struct ForagerConfig {
    /// Maximum number of accepted moves to collect before picking.
    pub accepted_count_limit: Option<usize>,
}

/// Per-constraint weight multipliers.
///
/// Every field defaults to the catalogue weight, so a TOML `[weights]`
/// table only needs the entries it overrides. A weight of zero disables
/// the constraint; negative weights are rejected because they would turn
/// a penalty into a reward.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default, rename_all = "snake_case")]
pub struct ConstraintWeights {
    /// Pair of assignments in one classroom from different cohorts (hard).
    pub same_cohort_per_classroom: i64,

    /// Tutor teaching at a timeslot they are not available for (hard).
    pub tutor_availability: i64,

    /// Tutor teaching a level they are not proficient in (hard).
    pub tutor_level_proficiency: i64,

    /// Tutor teaching a platform they do not support (hard).
    pub tutor_platform_proficiency: i64,

    /// Missing seat below the classroom minimum size (hard).
    pub classroom_min_size: i64,

    /// Excess seat above the classroom maximum size (hard).
    pub classroom_max_size: i64,

    /// Lesson above the tutor's maximum load (hard).
    pub tutor_max_load: i64,

    /// Student scheduled at a timeslot they marked impossible (soft).
    pub student_availability: i64,

    /// Seat of distance from the optimal class-size band (soft).
    pub optimal_class_size: i64,

    /// Lesson beyond the tutor's ideal load (soft).
    pub tutor_ideal_load: i64,

    /// Distinct cohort above the tutor's diversity cap (soft).
    pub tutor_cohort_diversity_cap: i64,

    /// Assignment starting at the preferred time of day (soft reward).
    pub preferred_time_of_day: i64,
}

impl Default for ConstraintWeights {
    fn default() -> Self {
        ConstraintWeights {
            same_cohort_per_classroom: 4,
            tutor_availability: 1,
            tutor_level_proficiency: 1,
            tutor_platform_proficiency: 1,
            classroom_min_size: 1,
            classroom_max_size: 1,
            tutor_max_load: 1,
            student_availability: 50,
            optimal_class_size: 20,
            tutor_ideal_load: 1,
            tutor_cohort_diversity_cap: 500,
            preferred_time_of_day: 10,
        }
    }
}

impl ConstraintWeights {
    fn validate(&self) -> Result<(), ConfigError> {
        let entries = [
            ("same_cohort_per_classroom", self.same_cohort_per_classroom),
            ("tutor_availability", self.tutor_availability),
            ("tutor_level_proficiency", self.tutor_level_proficiency),
            (
                "tutor_platform_proficiency",
                self.tutor_platform_proficiency,
            ),
            ("classroom_min_size", self.classroom_min_size),
            ("classroom_max_size", self.classroom_max_size),
            ("tutor_max_load", self.tutor_max_load),
            ("student_availability", self.student_availability),
            ("optimal_class_size", self.optimal_class_size),
            ("tutor_ideal_load", self.tutor_ideal_load),
            (
                "tutor_cohort_diversity_cap",
                self.tutor_cohort_diversity_cap,
            ),
            ("preferred_time_of_day", self.preferred_time_of_day),
        ];
        for (name, weight) in entries {
            if weight < 0 {
                return Err(ConfigError::Invalid(format!(
                    "weight {name} must not be negative, got {weight}"
                )));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_toml_parsing() {
        let toml = r#"
            random_seed = 42
            run_count = 4

            [termination]
            seconds_spent_limit = 30
            unimproved_step_count_limit = 10000

            [[phases]]
            type = "construction_heuristic"
            construction_heuristic_type = "best_fit"

            [[phases]]
            type = "local_search"
            move_evaluation_limit = 256
            [phases.acceptor]
            type = "late_acceptance"
            late_acceptance_size = 400
        "#;

        let config = SolverConfig::from_toml_str(toml).unwrap();
        assert_eq!(config.random_seed, Some(42));
        assert_eq!(config.run_count, Some(4));
        let termination = config.termination.unwrap();
        assert_eq!(termination.seconds_spent_limit, Some(30));
        assert_eq!(termination.unimproved_step_count_limit, Some(10000));
        assert_eq!(config.phases.len(), 2);
        match &config.phases[0] {
            PhaseConfig::ConstructionHeuristic(ch) => {
                assert_eq!(
                    ch.construction_heuristic_type,
                    ConstructionHeuristicType::BestFit
                );
            }
            other => panic!("expected construction heuristic, got {other:?}"),
        }
        match &config.phases[1] {
            PhaseConfig::LocalSearch(ls) => {
                assert_eq!(ls.move_evaluation_limit, Some(256));
                assert!(matches!(
                    ls.acceptor,
                    Some(AcceptorConfig::LateAcceptance(LateAcceptanceConfig {
                        late_acceptance_size: Some(400),
                    }))
                ));
            }
            other => panic!("expected local search, got {other:?}"),
        }
    }

    #[test]
    fn test_weights_default_to_catalogue_values() {
        let weights = ConstraintWeights::default();
        assert_eq!(weights.same_cohort_per_classroom, 4);
        assert_eq!(weights.tutor_availability, 1);
        assert_eq!(weights.student_availability, 50);
        assert_eq!(weights.optimal_class_size, 20);
        assert_eq!(weights.tutor_cohort_diversity_cap, 500);
        assert_eq!(weights.preferred_time_of_day, 10);
    }

    #[test]
    fn test_partial_weights_table_keeps_defaults() {
        let toml = r#"
            [weights]
            student_availability = 100
        "#;

        let config = SolverConfig::from_toml_str(toml).unwrap();
        assert_eq!(config.weights.student_availability, 100);
        assert_eq!(config.weights.same_cohort_per_classroom, 4);
        assert_eq!(config.weights.tutor_cohort_diversity_cap, 500);
    }

    #[test]
    fn test_builder() {
        let config = SolverConfig::new()
            .with_random_seed(123)
            .with_termination_seconds(60)
            .with_unimproved_step_count_limit(5000)
            .with_run_count(8)
            .with_phase(PhaseConfig::ConstructionHeuristic(
                ConstructionHeuristicConfig::default(),
            ))
            .with_phase(PhaseConfig::LocalSearch(LocalSearchConfig::default()));

        assert_eq!(config.random_seed, Some(123));
        assert_eq!(config.run_count, Some(8));
        let termination = config.termination.as_ref().unwrap();
        assert_eq!(termination.seconds_spent_limit, Some(60));
        assert_eq!(termination.unimproved_step_count_limit, Some(5000));
        assert_eq!(config.phases.len(), 2);
        config.validate().unwrap();
    }

    #[test]
    fn test_time_limit_combines_minutes_and_seconds() {
        let config = SolverConfig::new()
            .with_termination_seconds(30)
            .with_step_count_limit(100);
        let mut termination = config.termination.clone().unwrap();
        termination.minutes_spent_limit = Some(2);
        assert_eq!(termination.time_limit(), Some(Duration::from_secs(150)));
        assert_eq!(config.time_limit(), Some(Duration::from_secs(30)));
    }

    #[test]
    fn test_zero_time_budget_rejected() {
        let toml = r#"
            [termination]
            seconds_spent_limit = 0
        "#;

        let err = SolverConfig::from_toml_str(toml).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)), "got {err:?}");
    }

    #[test]
    fn test_zero_minutes_with_positive_seconds_accepted() {
        let toml = r#"
            [termination]
            minutes_spent_limit = 0
            seconds_spent_limit = 10
        "#;

        let config = SolverConfig::from_toml_str(toml).unwrap();
        assert_eq!(config.time_limit(), Some(Duration::from_secs(10)));
    }

    #[test]
    fn test_zero_step_count_limit_rejected() {
        let toml = r#"
            [termination]
            step_count_limit = 0
        "#;

        assert!(matches!(
            SolverConfig::from_toml_str(toml),
            Err(ConfigError::Invalid(_))
        ));
    }

    #[test]
    fn test_zero_run_count_rejected() {
        let err = SolverConfig::new().with_run_count(0).validate().unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
    }

    #[test]
    fn test_negative_weight_rejected() {
        let toml = r#"
            [weights]
            optimal_class_size = -3
        "#;

        let err = SolverConfig::from_toml_str(toml).unwrap_err();
        match err {
            ConfigError::Invalid(message) => {
                assert!(message.contains("optimal_class_size"), "got {message}");
            }
            other => panic!("expected Invalid, got {other:?}"),
        }
    }

    #[test]
    fn test_zero_late_acceptance_size_rejected() {
        let toml = r#"
            [[phases]]
            type = "local_search"
            [phases.acceptor]
            type = "late_acceptance"
            late_acceptance_size = 0
        "#;

        assert!(matches!(
            SolverConfig::from_toml_str(toml),
            Err(ConfigError::Invalid(_))
        ));
    }

    #[test]
    fn test_simulated_annealing_decay_range_checked() {
        let toml = r#"
            [[phases]]
            type = "local_search"
            [phases.acceptor]
            type = "simulated_annealing"
            starting_temperature = 0.8
            decay_rate = 1.5
        "#;

        assert!(matches!(
            SolverConfig::from_toml_str(toml),
            Err(ConfigError::Invalid(_))
        ));

        let toml = r#"
            [[phases]]
            type = "local_search"
            [phases.acceptor]
            type = "simulated_annealing"
            starting_temperature = 0.8
            decay_rate = 0.995
        "#;

        SolverConfig::from_toml_str(toml).unwrap();
    }

    #[test]
    fn test_malformed_toml_is_parse_error() {
        let err = SolverConfig::from_toml_str("termination = \"soon\"").unwrap_err();
        assert!(matches!(err, ConfigError::Toml(_)), "got {err:?}");
    }

    #[test]
    fn test_load_missing_file_errors() {
        let err = SolverConfig::load("/nonexistent/tutorplan-solver.toml").unwrap_err();
        assert!(matches!(err, ConfigError::Io(_)));
    }
}
