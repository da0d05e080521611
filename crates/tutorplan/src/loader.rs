//! Delimited data loading for the timetable problem.
//!
//! Reads `cohorts.csv`, `tutors.csv` and `students.csv` from a data
//! directory into a [`Timetable`] on the default timeslot grid. Loading is
//! tolerant per row: a malformed row is skipped with a warning naming the
//! file and line, so one bad record never blocks the rest of the intake.

use std::collections::HashMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::warn;

use crate::domain::{default_timeslots, Cohort, Level, Platform, Student, Timetable, Tutor};

/// Cohort definitions file name.
pub const COHORTS_FILE: &str = "cohorts.csv";

/// Tutor definitions file name.
pub const TUTORS_FILE: &str = "tutors.csv";

/// Student definitions file name.
pub const STUDENTS_FILE: &str = "students.csv";

/// Column where a tutor row's availability flags begin.
const TUTOR_AVAILABILITY_OFFSET: usize = 15;

/// Columns between a student's last availability score and the cohort label.
const STUDENT_COHORT_GAP: usize = 2;

#[derive(Debug, Error)]
pub enum LoadError {
    #[error("cannot read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// Loads a timetable problem from a data directory.
///
/// The timeslot grid is the default weekly grid; the three data files are
/// parsed against it. Unreadable files fail the load, unreadable rows only
/// cost that row.
pub fn load_problem(dir: &Path) -> Result<Timetable, LoadError> {
    let timeslots = default_timeslots();

    let cohorts = parse_cohorts(&read(dir, COHORTS_FILE)?, COHORTS_FILE);
    let tutors = parse_tutors(&read(dir, TUTORS_FILE)?, TUTORS_FILE, timeslots.len());
    let students = parse_students(
        &read(dir, STUDENTS_FILE)?,
        STUDENTS_FILE,
        &cohorts,
        timeslots.len(),
    );

    Ok(Timetable::new(timeslots, cohorts, tutors, students))
}

fn read(dir: &Path, file: &str) -> Result<String, LoadError> {
    let path = dir.join(file);
    fs::read_to_string(&path).map_err(|source| LoadError::Io { path, source })
}

/// Data rows with their 1-based line numbers; the header row is skipped.
fn data_rows(text: &str) -> impl Iterator<Item = (usize, &str)> {
    text.lines()
        .enumerate()
        .skip(1)
        .map(|(index, line)| (index + 1, line))
        .filter(|(_, line)| !line.trim().is_empty())
}

fn split_row(line: &str) -> Vec<&str> {
    line.split(',').collect()
}

fn parse_count(field: &str) -> Option<usize> {
    field.trim().parse().ok()
}

/// Parses a boolean cell; only "true" and "false" (any case) are accepted.
fn parse_flag(field: &str) -> Option<bool> {
    match field.trim().to_ascii_lowercase().as_str() {
        "true" => Some(true),
        "false" => Some(false),
        _ => None,
    }
}

/// Columns: label[0], level[2], platform[3].
fn parse_cohorts(text: &str, file: &str) -> Vec<Cohort> {
    let mut cohorts: Vec<Cohort> = Vec::new();
    let mut seen: HashMap<String, usize> = HashMap::new();

    for (line_number, line) in data_rows(text) {
        let fields = split_row(line);
        if fields.len() < 4 {
            warn!(
                "{file} line {line_number}: expected at least 4 columns, got {}; row skipped",
                fields.len()
            );
            continue;
        }
        let label = fields[0].trim();
        if label.is_empty() {
            warn!("{file} line {line_number}: empty cohort label; row skipped");
            continue;
        }
        let Some(level) = Level::parse(fields[2]) else {
            warn!(
                "{file} line {line_number}: unknown level {:?}; row skipped",
                fields[2].trim()
            );
            continue;
        };
        let Some(platform) = Platform::parse(fields[3]) else {
            warn!(
                "{file} line {line_number}: unknown platform {:?}; row skipped",
                fields[3].trim()
            );
            continue;
        };
        if seen.contains_key(label) {
            warn!("{file} line {line_number}: duplicate cohort label {label:?}; row skipped");
            continue;
        }

        seen.insert(label.to_string(), cohorts.len());
        cohorts.push(Cohort::new(label, level, platform));
    }
    cohorts
}

/// Columns: name[0], ideal_lessons[1], max_lessons[2], platform flags
/// starting at 3 (variant order), level flags starting at 6 (variant
/// order), availability flags starting at 15 (timeslot order).
fn parse_tutors(text: &str, file: &str, timeslot_count: usize) -> Vec<Tutor> {
    let required = TUTOR_AVAILABILITY_OFFSET + timeslot_count;
    let mut tutors = Vec::new();

    'rows: for (line_number, line) in data_rows(text) {
        let fields = split_row(line);
        if fields.len() < required {
            warn!(
                "{file} line {line_number}: expected at least {required} columns, got {}; row skipped",
                fields.len()
            );
            continue;
        }
        let name = fields[0].trim();
        if name.is_empty() {
            warn!("{file} line {line_number}: empty tutor name; row skipped");
            continue;
        }
        let Some(ideal_lessons) = parse_count(fields[1]) else {
            warn!(
                "{file} line {line_number}: unreadable ideal lesson count {:?}; row skipped",
                fields[1].trim()
            );
            continue;
        };
        let Some(max_lessons) = parse_count(fields[2]) else {
            warn!(
                "{file} line {line_number}: unreadable max lesson count {:?}; row skipped",
                fields[2].trim()
            );
            continue;
        };

        let mut platforms = Vec::new();
        for (offset, platform) in Platform::ALL.iter().enumerate() {
            match parse_flag(fields[3 + offset]) {
                Some(true) => platforms.push(*platform),
                Some(false) => {}
                None => {
                    warn!(
                        "{file} line {line_number}: unreadable platform flag {:?}; row skipped",
                        fields[3 + offset].trim()
                    );
                    continue 'rows;
                }
            }
        }

        let mut levels = Vec::new();
        for (offset, level) in Level::ALL.iter().enumerate() {
            match parse_flag(fields[6 + offset]) {
                Some(true) => levels.push(*level),
                Some(false) => {}
                None => {
                    warn!(
                        "{file} line {line_number}: unreadable level flag {:?}; row skipped",
                        fields[6 + offset].trim()
                    );
                    continue 'rows;
                }
            }
        }

        let mut availability = Vec::with_capacity(timeslot_count);
        for slot in 0..timeslot_count {
            match parse_flag(fields[TUTOR_AVAILABILITY_OFFSET + slot]) {
                Some(flag) => availability.push(flag),
                None => {
                    warn!(
                        "{file} line {line_number}: unreadable availability flag {:?}; row skipped",
                        fields[TUTOR_AVAILABILITY_OFFSET + slot].trim()
                    );
                    continue 'rows;
                }
            }
        }

        tutors.push(
            Tutor::new(name, ideal_lessons, max_lessons)
                .with_platforms(platforms)
                .with_levels(levels)
                .with_availability(availability),
        );
    }
    tutors
}

/// Columns: id[0], availability scores starting at 1 (timeslot order),
/// cohort label two columns past the last score.
fn parse_students(
    text: &str,
    file: &str,
    cohorts: &[Cohort],
    timeslot_count: usize,
) -> Vec<Student> {
    let by_label: HashMap<&str, usize> = cohorts
        .iter()
        .enumerate()
        .map(|(index, cohort)| (cohort.label.as_str(), index))
        .collect();
    let label_column = timeslot_count + STUDENT_COHORT_GAP;
    let required = label_column + 1;
    let mut students = Vec::new();

    'rows: for (line_number, line) in data_rows(text) {
        let fields = split_row(line);
        if fields.len() < required {
            warn!(
                "{file} line {line_number}: expected at least {required} columns, got {}; row skipped",
                fields.len()
            );
            continue;
        }
        let id = fields[0].trim();
        if id.is_empty() {
            warn!("{file} line {line_number}: empty student id; row skipped");
            continue;
        }

        let mut availability = Vec::with_capacity(timeslot_count);
        for slot in 0..timeslot_count {
            match fields[1 + slot].trim().parse::<i32>() {
                Ok(score) => availability.push(score),
                Err(_) => {
                    warn!(
                        "{file} line {line_number}: unreadable availability score {:?}; row skipped",
                        fields[1 + slot].trim()
                    );
                    continue 'rows;
                }
            }
        }

        let label = fields[label_column].trim();
        let Some(&cohort) = by_label.get(label) else {
            warn!("{file} line {line_number}: unknown cohort label {label:?}; student dropped");
            continue;
        };

        students.push(Student::new(id, cohort, availability));
    }
    students
}
