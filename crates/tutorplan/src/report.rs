//! Console reports over a solved timetable.
//!
//! Pure collector functions derive the report data (classrooms, utilization,
//! usage grids, diagnostics); thin print functions render them with the same
//! color conventions the progress console uses. Collectors are the tested
//! surface, printers only format.

use std::collections::BTreeMap;

use num_format::{Locale, ToFormattedString};
use owo_colors::OwoColorize;

use tutorplan_core::{HardSoftScore, Score};
use tutorplan_scoring::ConstraintResult;

use crate::domain::{Timetable, MAX_CLASS_SIZE, MIN_CLASS_SIZE};

/// Members of each derived classroom, keyed by (tutor, timeslot).
///
/// The key order makes every report walk classrooms tutor by tutor in a
/// stable order.
pub fn classrooms(solution: &Timetable) -> BTreeMap<(usize, usize), Vec<usize>> {
    let mut rooms: BTreeMap<(usize, usize), Vec<usize>> = BTreeMap::new();
    for index in 0..solution.assignment_count() {
        if let Some(key) = solution.classroom_key(index) {
            rooms.entry(key).or_default().push(index);
        }
    }
    rooms
}

/// One tutor's teaching load relative to their maximum.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TutorUtilization {
    pub tutor: usize,
    pub lessons: usize,
    pub max_lessons: usize,
    pub percent: u32,
}

/// Lessons taught per tutor, busiest first. Unused tutors sort last.
pub fn tutor_utilization(solution: &Timetable) -> Vec<TutorUtilization> {
    let mut lessons = vec![0usize; solution.tutors.len()];
    for (tutor, _) in classrooms(solution).keys() {
        lessons[*tutor] += 1;
    }

    let mut utilization: Vec<TutorUtilization> = solution
        .tutors
        .iter()
        .enumerate()
        .map(|(tutor, info)| {
            let taught = lessons[tutor];
            let percent = if info.max_lessons > 0 {
                (taught * 100 / info.max_lessons) as u32
            } else {
                0
            };
            TutorUtilization {
                tutor,
                lessons: taught,
                max_lessons: info.max_lessons,
                percent,
            }
        })
        .collect();
    utilization.sort_by(|a, b| b.percent.cmp(&a.percent).then(a.tutor.cmp(&b.tutor)));
    utilization
}

/// Class and student counts for one timeslot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SlotUsage {
    pub timeslot: usize,
    pub classes: usize,
    pub students: usize,
}

/// Usage per timeslot, in grid order.
pub fn slot_usage(solution: &Timetable) -> Vec<SlotUsage> {
    let mut usage: Vec<SlotUsage> = (0..solution.timeslots.len())
        .map(|timeslot| SlotUsage {
            timeslot,
            classes: 0,
            students: 0,
        })
        .collect();
    for ((_, timeslot), members) in &classrooms(solution) {
        usage[*timeslot].classes += 1;
        usage[*timeslot].students += members.len();
    }
    usage
}

/// One cohort's placement across the timetable.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CohortSummary {
    pub cohort: usize,
    /// All students in the cohort, assigned or not.
    pub students: usize,
    /// Cohort member count per classroom that holds at least one member.
    pub class_sizes: Vec<usize>,
}

pub fn cohort_summaries(solution: &Timetable) -> Vec<CohortSummary> {
    let mut summaries: Vec<CohortSummary> = (0..solution.cohorts.len())
        .map(|cohort| CohortSummary {
            cohort,
            students: 0,
            class_sizes: Vec::new(),
        })
        .collect();
    for student in &solution.students {
        summaries[student.cohort].students += 1;
    }
    for members in classrooms(solution).values() {
        let mut per_cohort: BTreeMap<usize, usize> = BTreeMap::new();
        for &index in members {
            *per_cohort.entry(solution.cohort_of(index)).or_insert(0) += 1;
        }
        for (cohort, count) in per_cohort {
            summaries[cohort].class_sizes.push(count);
        }
    }
    summaries
}

/// Everything a human should double-check in a finished timetable.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct Diagnostics {
    /// Assignments placing a student at a timeslot they cannot attend.
    pub impossible_students: Vec<usize>,
    /// Classrooms taught outside the tutor's availability.
    pub unavailable_tutors: Vec<(usize, usize)>,
    /// Classrooms below the minimum or above the maximum size.
    pub outsized_classrooms: Vec<(usize, usize)>,
    /// Assignments taught at a level the tutor lacks.
    pub unqualified_level: Vec<usize>,
    /// Assignments taught on a platform the tutor lacks.
    pub unqualified_platform: Vec<usize>,
    /// Classrooms mixing more than one cohort.
    pub mixed_classrooms: Vec<(usize, usize)>,
    /// Assignments still missing a variable.
    pub unassigned: Vec<usize>,
}

impl Diagnostics {
    pub fn is_clean(&self) -> bool {
        *self == Diagnostics::default()
    }
}

pub fn diagnose(solution: &Timetable) -> Diagnostics {
    let mut diagnostics = Diagnostics::default();

    for index in 0..solution.assignment_count() {
        let assignment = &solution.assignments[index];
        if assignment.timeslot.is_none() || assignment.tutor.is_none() {
            diagnostics.unassigned.push(index);
        }
        if let Some(timeslot) = assignment.timeslot {
            if !solution.student_of(index).can_attend(timeslot) {
                diagnostics.impossible_students.push(index);
            }
        }
        if let Some(tutor) = assignment.tutor {
            let cohort = &solution.cohorts[solution.cohort_of(index)];
            if !solution.tutors[tutor].can_teach(cohort.level) {
                diagnostics.unqualified_level.push(index);
            }
            if !solution.tutors[tutor].can_teach_platform(cohort.platform) {
                diagnostics.unqualified_platform.push(index);
            }
        }
    }

    for ((tutor, timeslot), members) in &classrooms(solution) {
        let key = (*tutor, *timeslot);
        if !solution.tutors[*tutor].is_available(*timeslot) {
            diagnostics.unavailable_tutors.push(key);
        }
        if members.len() < MIN_CLASS_SIZE || members.len() > MAX_CLASS_SIZE {
            diagnostics.outsized_classrooms.push(key);
        }
        let first_cohort = solution.cohort_of(members[0]);
        if members
            .iter()
            .any(|&index| solution.cohort_of(index) != first_cohort)
        {
            diagnostics.mixed_classrooms.push(key);
        }
    }

    diagnostics
}

fn section(title: &str) {
    println!();
    println!("{}", title.bold());
    println!("{}", "=".repeat(64));
}

fn format_score(score: HardSoftScore) -> String {
    if score.is_feasible() {
        format!("{score}").green().bold().to_string()
    } else {
        format!("{score}").red().bold().to_string()
    }
}

/// Assignment listing grouped cohort, then tutor and timeslot.
pub fn print_timetable(solution: &Timetable) {
    section("TIMETABLE");
    let rooms = classrooms(solution);

    for (cohort_index, cohort) in solution.cohorts.iter().enumerate() {
        let mut lines = Vec::new();
        for ((tutor, timeslot), members) in &rooms {
            let ids: Vec<&str> = members
                .iter()
                .filter(|&&index| solution.cohort_of(index) == cohort_index)
                .map(|&index| solution.student_of(index).id.as_str())
                .collect();
            if ids.is_empty() {
                continue;
            }
            lines.push(format!(
                "  {:<12} {:<16} {:>2} students: {}",
                solution.timeslots[*timeslot].to_string(),
                solution.tutors[*tutor].name,
                ids.len(),
                ids.join(", ")
            ));
        }

        println!();
        println!(
            "{} ({} / {})",
            cohort.label.cyan().bold(),
            cohort.level,
            cohort.platform
        );
        if lines.is_empty() {
            println!("  {}", "no classes scheduled".dimmed());
        }
        for line in lines {
            println!("{line}");
        }
    }

    let unassigned: Vec<&str> = (0..solution.assignment_count())
        .filter(|&index| solution.classroom_key(index).is_none())
        .map(|index| solution.student_of(index).id.as_str())
        .collect();
    if !unassigned.is_empty() {
        println!();
        println!("{} {}", "Unassigned:".yellow().bold(), unassigned.join(", "));
    }
}

pub fn print_tutor_utilization(solution: &Timetable) {
    section("TUTOR UTILIZATION");
    for utilization in tutor_utilization(solution) {
        let tutor = &solution.tutors[utilization.tutor];
        let line = format!(
            "  {:<16} {:>2}/{:<2} lessons {:>4}%",
            tutor.name, utilization.lessons, utilization.max_lessons, utilization.percent
        );
        if utilization.lessons == 0 {
            println!("{} {}", line.dimmed(), "unused".yellow());
        } else {
            println!("{line}");
        }
    }
}

pub fn print_slot_summary(solution: &Timetable) {
    section("TIMESLOT USAGE");
    let usage = slot_usage(solution);
    let total_classes: usize = usage.iter().map(|u| u.classes).sum();
    let total_students: usize = usage.iter().map(|u| u.students).sum();

    for slot in &usage {
        println!(
            "  {:<12} {:>3} classes {:>4} students",
            solution.timeslots[slot.timeslot].to_string(),
            slot.classes,
            slot.students
        );
    }

    let average = if total_classes > 0 {
        total_students as f64 / total_classes as f64
    } else {
        0.0
    };
    println!(
        "  {} {:>3} classes {:>4} students, avg size {:.1}",
        format!("{:<12}", "total").bold(),
        total_classes,
        total_students,
        average
    );
}

pub fn print_cohort_summary(solution: &Timetable) {
    section("COHORTS");
    for summary in cohort_summaries(solution) {
        let cohort = &solution.cohorts[summary.cohort];
        let sizes = summary
            .class_sizes
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join(", ");
        println!(
            "  {} {:<24} {:>3} students, {} classes [{}]",
            format!("{:<8}", cohort.label).cyan(),
            format!("{} / {}", cohort.level, cohort.platform),
            summary.students,
            summary.class_sizes.len(),
            sizes
        );
    }
}

pub fn print_diagnostics(solution: &Timetable) {
    section("DIAGNOSTICS");
    let diagnostics = diagnose(solution);
    if diagnostics.is_clean() {
        println!("  {}", "No issues found.".green());
        return;
    }

    for &index in &diagnostics.unassigned {
        println!(
            "  {} {} has no full assignment",
            "✖".red().bold(),
            solution.student_of(index).id
        );
    }
    for &index in &diagnostics.impossible_students {
        println!(
            "  {} {} is scheduled at a timeslot they cannot attend",
            "⚠".yellow().bold(),
            solution.student_of(index).id
        );
    }
    for &(tutor, timeslot) in &diagnostics.unavailable_tutors {
        println!(
            "  {} {} teaches at {} outside their availability",
            "✖".red().bold(),
            solution.tutors[tutor].name,
            solution.timeslots[timeslot]
        );
    }
    for &(tutor, timeslot) in &diagnostics.mixed_classrooms {
        println!(
            "  {} {} at {} mixes cohorts",
            "✖".red().bold(),
            solution.tutors[tutor].name,
            solution.timeslots[timeslot]
        );
    }
    for &(tutor, timeslot) in &diagnostics.outsized_classrooms {
        println!(
            "  {} {} at {} is outside the {}..{} size range",
            "⚠".yellow().bold(),
            solution.tutors[tutor].name,
            solution.timeslots[timeslot],
            MIN_CLASS_SIZE,
            MAX_CLASS_SIZE
        );
    }
    for &index in &diagnostics.unqualified_level {
        println!(
            "  {} {} is taught at a level their tutor lacks",
            "✖".red().bold(),
            solution.student_of(index).id
        );
    }
    for &index in &diagnostics.unqualified_platform {
        println!(
            "  {} {} is taught on a platform their tutor lacks",
            "✖".red().bold(),
            solution.student_of(index).id
        );
    }
}

/// Per-constraint match counts and the hard/soft total.
pub fn print_score_summary(solution: &Timetable, results: &[ConstraintResult<HardSoftScore>]) {
    section("SCORE");
    for result in results {
        let kind = if result.is_hard { "hard" } else { "soft" };
        let matches = result.match_count.to_formatted_string(&Locale::en);
        let line = format!(
            "  {:<28} {:<4} {:>8} matches {:>16}",
            result.name,
            kind,
            matches,
            format!("{}", result.score)
        );
        if result.score == HardSoftScore::ZERO {
            println!("{}", line.dimmed());
        } else if result.is_hard {
            println!("{}", line.red());
        } else {
            println!("{}", line.yellow());
        }
    }

    let score = solution.score.unwrap_or(HardSoftScore::ZERO);
    println!();
    println!("  {} {}", format!("{:<28}", "Total").bold(), format_score(score));
}

/// The whole report suite, in reading order.
pub fn print_full_report(solution: &Timetable, results: &[ConstraintResult<HardSoftScore>]) {
    print_timetable(solution);
    print_tutor_utilization(solution);
    print_slot_summary(solution);
    print_cohort_summary(solution);
    print_diagnostics(solution);
    print_score_summary(solution, results);
}
