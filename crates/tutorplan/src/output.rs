//! Delimited export of a solved timetable.

use std::fs;
use std::io;
use std::path::Path;

use crate::domain::Timetable;

/// Column header of the exported table.
pub const OUTPUT_HEADER: &str = "student_id,cohort_label,level,platform,tutor,timeslot";

/// Renders the timetable as CSV text, one row per student.
///
/// Rows sort by cohort label, then tutor name, timeslot description and
/// student id, so repeated exports of the same timetable diff cleanly.
/// Unassigned students keep empty tutor and timeslot fields and sort
/// ahead of their cohort's scheduled rows.
pub fn timetable_csv(solution: &Timetable) -> String {
    let mut indexes: Vec<usize> = (0..solution.assignment_count()).collect();
    indexes.sort_by_key(|&index| {
        let assignment = &solution.assignments[index];
        let tutor = assignment
            .tutor
            .map(|tutor| solution.tutors[tutor].name.clone())
            .unwrap_or_default();
        let timeslot = assignment
            .timeslot
            .map(|timeslot| solution.timeslots[timeslot].to_string())
            .unwrap_or_default();
        (
            solution.cohorts[solution.cohort_of(index)].label.clone(),
            tutor,
            timeslot,
            solution.student_of(index).id.clone(),
        )
    });

    let mut csv = String::from(OUTPUT_HEADER);
    csv.push('\n');
    for index in indexes {
        let student = solution.student_of(index);
        let cohort = &solution.cohorts[student.cohort];
        let assignment = &solution.assignments[index];
        let tutor = assignment
            .tutor
            .map(|tutor| solution.tutors[tutor].name.as_str())
            .unwrap_or_default();
        let timeslot = assignment
            .timeslot
            .map(|timeslot| solution.timeslots[timeslot].to_string())
            .unwrap_or_default();
        csv.push_str(&format!(
            "{},{},{},{},{},{}\n",
            student.id, cohort.label, cohort.level, cohort.platform, tutor, timeslot
        ));
    }
    csv
}

/// Writes the CSV export to `path`.
pub fn write_timetable_csv(solution: &Timetable, path: &Path) -> io::Result<()> {
    fs::write(path, timetable_csv(solution))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{default_timeslots, Cohort, Level, Platform, Student, Tutor};

    fn fixture() -> Timetable {
        let cohorts = vec![
            Cohort::new("3B", Level::Intermediate, Platform::Python),
            Cohort::new("2A", Level::Beginner, Platform::Scratch),
        ];
        let tutors = vec![
            Tutor::new("Grace", 2, 3).with_availability(vec![true; 12]),
            Tutor::new("Ada", 4, 6).with_availability(vec![true; 12]),
        ];
        let students = vec![
            Student::new("s02", 0, vec![2; 12]),
            Student::new("s01", 1, vec![2; 12]),
            Student::new("s03", 1, vec![2; 12]),
        ];
        let mut timetable = Timetable::new(default_timeslots(), cohorts, tutors, students);
        // s02 with Grace on Tuesday, s01 with Ada on Monday, s03 unplaced.
        timetable.assignments[0].tutor = Some(0);
        timetable.assignments[0].timeslot = Some(3);
        timetable.assignments[1].tutor = Some(1);
        timetable.assignments[1].timeslot = Some(0);
        timetable
    }

    #[test]
    fn test_csv_sorts_by_cohort_then_tutor() {
        let csv = timetable_csv(&fixture());
        let lines: Vec<&str> = csv.lines().collect();

        assert_eq!(lines[0], OUTPUT_HEADER);
        // Cohort 2A sorts before 3B; within 2A the unassigned row leads.
        assert_eq!(lines[1], "s03,2A,Beginner,Scratch,,");
        assert_eq!(lines[2], "s01,2A,Beginner,Scratch,Ada,MON 15:30");
        assert_eq!(lines[3], "s02,3B,Intermediate,Python,Grace,TUE 15:30");
        assert_eq!(lines.len(), 4);
    }

    #[test]
    fn test_csv_ends_with_newline() {
        let csv = timetable_csv(&fixture());
        assert!(csv.ends_with('\n'));
    }

    #[test]
    fn test_write_round_trips_through_disk() {
        let dir = std::env::temp_dir().join("tutorplan-output-test");
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("timetable.csv");

        let timetable = fixture();
        write_timetable_csv(&timetable, &path).unwrap();
        let written = std::fs::read_to_string(&path).unwrap();
        std::fs::remove_file(&path).ok();

        assert_eq!(written, timetable_csv(&timetable));
    }
}
