//! Command line entry point for the tutorplan solver.
//!
//! Run with: cargo run -p tutorplan -- [DATA_DIR]
//!
//! Without a data directory the built-in demo instance is solved, so the
//! binary works out of the box.

use std::io;
use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use owo_colors::OwoColorize;
use thiserror::Error;
use tracing::info;

use tutorplan::solver::build_director;
use tutorplan::{load_problem, output, report, solve, DemoData, LoadError, SolveError};
use tutorplan_config::{ConfigError, SolverConfig};
use tutorplan_scoring::ScoreDirector;

/// School timetabling solver: assigns students to tutors and timeslots.
#[derive(Debug, Parser)]
#[command(name = "tutorplan", version, about)]
struct Cli {
    /// Directory holding cohorts.csv, tutors.csv and students.csv.
    /// Without it a built-in demo instance is solved.
    data_dir: Option<PathBuf>,

    /// Solver configuration file (TOML).
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Write the solved timetable to this CSV file.
    #[arg(short, long, value_name = "FILE")]
    output: Option<PathBuf>,

    /// Random seed override for reproducible runs.
    #[arg(long)]
    seed: Option<u64>,

    /// Number of parallel seeded runs racing for the best score.
    #[arg(long)]
    runs: Option<usize>,

    /// Solve the large demo instance instead of the small one.
    #[arg(long)]
    large: bool,
}

#[derive(Debug, Error)]
enum AppError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Load(#[from] LoadError),

    #[error(transparent)]
    Solve(#[from] SolveError),

    #[error("cannot write {path}: {source}")]
    Output { path: PathBuf, source: io::Error },
}

fn run(cli: &Cli) -> Result<(), AppError> {
    let mut config = match &cli.config {
        Some(path) => SolverConfig::load(path)?,
        None => SolverConfig::new(),
    };
    if let Some(seed) = cli.seed {
        config = config.with_random_seed(seed);
    }
    if let Some(runs) = cli.runs {
        config = config.with_run_count(runs);
    }
    config.validate()?;

    let problem = match &cli.data_dir {
        Some(dir) => load_problem(dir)?,
        None => {
            let demo = if cli.large {
                DemoData::Large
            } else {
                DemoData::Small
            };
            info!("no data directory given, solving the built-in {demo:?} demo instance");
            demo.generate()
        }
    };

    let solution = solve(problem, &config)?;

    // A fresh director re-derives the per-constraint breakdown for the
    // report; the solve already stamped the total score.
    let mut director = build_director(solution, &config.weights);
    director.calculate_score();
    let results = director.constraint_results();
    let solution = director.into_solution();

    report::print_full_report(&solution, &results);

    if let Some(path) = &cli.output {
        output::write_timetable_csv(&solution, path).map_err(|source| AppError::Output {
            path: path.clone(),
            source,
        })?;
        info!("timetable written to {}", path.display());
    }

    Ok(())
}

fn main() -> ExitCode {
    tutorplan_console::init();

    let cli = Cli::parse();
    match run(&cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(error) => {
            eprintln!("{} {error}", "error:".bright_red().bold());
            ExitCode::FAILURE
        }
    }
}
