//! Domain model for the school timetabling problem.
//!
//! Problem facts (timeslots, cohorts, tutors, students) are immutable for
//! the duration of a solve. The only mutable state is the pair of decision
//! variables on each [`Assignment`]; everything else is indexed by position
//! into the fact vectors, so entities stay `Copy`-cheap and hashable.

use std::collections::HashSet;
use std::fmt;

use chrono::{NaiveTime, Weekday};

use tutorplan_core::{HardSoftScore, PlanningSolution};

/// Availability score meaning a student cannot attend at all.
///
/// Higher scores mean more preferred; the scale above zero is data, not code.
pub const AVAILABILITY_IMPOSSIBLE: i32 = 0;

/// Smallest classroom that is allowed to run (groups of 1 or 2 are penalized).
pub const MIN_CLASS_SIZE: usize = 3;

/// Largest classroom that is allowed to run.
pub const MAX_CLASS_SIZE: usize = 7;

/// Lower edge of the class size band that incurs no soft penalty.
pub const OPTIMAL_CLASS_SIZE_MIN: usize = 6;

/// Upper edge of the class size band that incurs no soft penalty.
pub const OPTIMAL_CLASS_SIZE_MAX: usize = 7;

/// The start time rewarded by the preferred time-of-day constraint.
pub fn preferred_start_time() -> NaiveTime {
    hm(15, 30)
}

fn hm(hour: u32, minute: u32) -> NaiveTime {
    // Literal arguments are always in range.
    NaiveTime::from_hms_opt(hour, minute, 0).expect("valid literal time")
}

/// A teaching slot in the weekly grid. Equality is by value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Timeslot {
    pub day: Weekday,
    pub start_time: NaiveTime,
    /// Optional end time; the default grid leaves it unset (one-hour lessons).
    pub end_time: Option<NaiveTime>,
}

impl Timeslot {
    pub fn new(day: Weekday, start_time: NaiveTime) -> Self {
        Timeslot {
            day,
            start_time,
            end_time: None,
        }
    }

    pub fn with_end_time(mut self, end_time: NaiveTime) -> Self {
        self.end_time = Some(end_time);
        self
    }
}

impl fmt::Display for Timeslot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let day = format!("{}", self.day).to_uppercase();
        write!(f, "{} {}", day, self.start_time.format("%H:%M"))
    }
}

/// The default weekly grid: Monday through Thursday, three afternoon slots.
pub fn default_timeslots() -> Vec<Timeslot> {
    let days = [Weekday::Mon, Weekday::Tue, Weekday::Wed, Weekday::Thu];
    let starts = [hm(15, 30), hm(16, 30), hm(17, 30)];

    let mut timeslots = Vec::with_capacity(days.len() * starts.len());
    for day in days {
        for start in starts {
            timeslots.push(Timeslot::new(day, start));
        }
    }
    timeslots
}

/// Course proficiency level of a cohort.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Level {
    Beginner,
    Elementary,
    Intermediate,
    UpperIntermediate,
    Advanced,
}

impl Level {
    /// All levels, in the column order of the tutor input format.
    pub const ALL: [Level; 5] = [
        Level::Beginner,
        Level::Elementary,
        Level::Intermediate,
        Level::UpperIntermediate,
        Level::Advanced,
    ];

    /// Parses a level name, ignoring case and separator characters.
    pub fn parse(s: &str) -> Option<Level> {
        let folded: String = s
            .chars()
            .filter(|c| !matches!(c, '_' | '-' | ' '))
            .collect::<String>()
            .to_uppercase();
        match folded.as_str() {
            "BEGINNER" => Some(Level::Beginner),
            "ELEMENTARY" => Some(Level::Elementary),
            "INTERMEDIATE" => Some(Level::Intermediate),
            "UPPERINTERMEDIATE" => Some(Level::UpperIntermediate),
            "ADVANCED" => Some(Level::Advanced),
            _ => None,
        }
    }
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Level::Beginner => "Beginner",
            Level::Elementary => "Elementary",
            Level::Intermediate => "Intermediate",
            Level::UpperIntermediate => "UpperIntermediate",
            Level::Advanced => "Advanced",
        };
        f.write_str(name)
    }
}

/// Delivery platform a cohort is taught on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Platform {
    Scratch,
    Python,
    Web,
}

impl Platform {
    /// All platforms, in the column order of the tutor input format.
    pub const ALL: [Platform; 3] = [Platform::Scratch, Platform::Python, Platform::Web];

    /// Parses a platform name, ignoring case.
    pub fn parse(s: &str) -> Option<Platform> {
        match s.trim().to_uppercase().as_str() {
            "SCRATCH" => Some(Platform::Scratch),
            "PYTHON" => Some(Platform::Python),
            "WEB" => Some(Platform::Web),
            _ => None,
        }
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Platform::Scratch => "Scratch",
            Platform::Python => "Python",
            Platform::Web => "Web",
        };
        f.write_str(name)
    }
}

/// A group of students taught together at one level on one platform.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Cohort {
    /// Unique label, e.g. "2A". Students reference cohorts by label on load.
    pub label: String,
    pub level: Level,
    pub platform: Platform,
}

impl Cohort {
    pub fn new(label: impl Into<String>, level: Level, platform: Platform) -> Self {
        Cohort {
            label: label.into(),
            level,
            platform,
        }
    }
}

impl fmt::Display for Cohort {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.label)
    }
}

/// A tutor with proficiencies, availability and load limits.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Tutor {
    pub name: String,
    pub levels: HashSet<Level>,
    pub platforms: HashSet<Platform>,
    /// Availability per timeslot index; missing entries mean unavailable.
    pub availability: Vec<bool>,
    /// Lessons per week this tutor would like to teach.
    pub ideal_lessons: usize,
    /// Lessons per week this tutor can teach at most.
    pub max_lessons: usize,
}

impl Tutor {
    pub fn new(name: impl Into<String>, ideal_lessons: usize, max_lessons: usize) -> Self {
        Tutor {
            name: name.into(),
            levels: HashSet::new(),
            platforms: HashSet::new(),
            availability: Vec::new(),
            ideal_lessons,
            max_lessons,
        }
    }

    pub fn with_levels(mut self, levels: impl IntoIterator<Item = Level>) -> Self {
        self.levels.extend(levels);
        self
    }

    pub fn with_platforms(mut self, platforms: impl IntoIterator<Item = Platform>) -> Self {
        self.platforms.extend(platforms);
        self
    }

    pub fn with_availability(mut self, availability: Vec<bool>) -> Self {
        self.availability = availability;
        self
    }

    pub fn can_teach(&self, level: Level) -> bool {
        self.levels.contains(&level)
    }

    pub fn can_teach_platform(&self, platform: Platform) -> bool {
        self.platforms.contains(&platform)
    }

    /// Whether the tutor is available at the given timeslot index.
    /// Unknown timeslots count as unavailable.
    pub fn is_available(&self, timeslot: usize) -> bool {
        self.availability.get(timeslot).copied().unwrap_or(false)
    }
}

/// A student to be scheduled into exactly one classroom.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Student {
    pub id: String,
    /// Index of the student's cohort in the solution's cohort vector.
    pub cohort: usize,
    /// Availability score per timeslot index; 0 means the student cannot
    /// attend, higher means more preferred. Missing entries default to 0.
    pub availability: Vec<i32>,
}

impl Student {
    pub fn new(id: impl Into<String>, cohort: usize, availability: Vec<i32>) -> Self {
        Student {
            id: id.into(),
            cohort,
            availability,
        }
    }

    pub fn availability_at(&self, timeslot: usize) -> i32 {
        self.availability
            .get(timeslot)
            .copied()
            .unwrap_or(AVAILABILITY_IMPOSSIBLE)
    }

    pub fn can_attend(&self, timeslot: usize) -> bool {
        self.availability_at(timeslot) > AVAILABILITY_IMPOSSIBLE
    }
}

/// The planning entity: one student's seat in the weekly timetable.
///
/// `timeslot` and `tutor` are the decision variables; the student reference
/// is fixed for the assignment's lifetime. `room` exists for room-based
/// problem variants and stays unassigned in the school timetable.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Assignment {
    /// Index of the student in the solution's student vector.
    pub student: usize,
    pub timeslot: Option<usize>,
    pub tutor: Option<usize>,
    pub room: Option<usize>,
}

impl Assignment {
    pub fn new(student: usize) -> Self {
        Assignment {
            student,
            timeslot: None,
            tutor: None,
            room: None,
        }
    }
}

/// The full timetabling problem and its (possibly partial) solution.
#[derive(Debug, Clone)]
pub struct Timetable {
    pub timeslots: Vec<Timeslot>,
    pub cohorts: Vec<Cohort>,
    pub tutors: Vec<Tutor>,
    pub students: Vec<Student>,
    pub assignments: Vec<Assignment>,
    pub score: Option<HardSoftScore>,
}

impl Timetable {
    /// Builds an unsolved timetable with one cleared assignment per student.
    pub fn new(
        timeslots: Vec<Timeslot>,
        cohorts: Vec<Cohort>,
        tutors: Vec<Tutor>,
        students: Vec<Student>,
    ) -> Self {
        let assignments = (0..students.len()).map(Assignment::new).collect();
        Timetable {
            timeslots,
            cohorts,
            tutors,
            students,
            assignments,
            score: None,
        }
    }

    /// The student behind an assignment.
    pub fn student_of(&self, assignment: usize) -> &Student {
        &self.students[self.assignments[assignment].student]
    }

    /// The cohort index of an assignment's student.
    pub fn cohort_of(&self, assignment: usize) -> usize {
        self.student_of(assignment).cohort
    }

    /// The (tutor, timeslot) classroom key of an assignment, once both
    /// decision variables are set. A half-assigned seat is in no classroom.
    pub fn classroom_key(&self, assignment: usize) -> Option<(usize, usize)> {
        let a = &self.assignments[assignment];
        match (a.tutor, a.timeslot) {
            (Some(tutor), Some(timeslot)) => Some((tutor, timeslot)),
            _ => None,
        }
    }

    pub fn assignment_count(&self) -> usize {
        self.assignments.len()
    }
}

impl PlanningSolution for Timetable {
    type Score = HardSoftScore;

    fn score(&self) -> Option<HardSoftScore> {
        self.score
    }

    fn set_score(&mut self, score: Option<HardSoftScore>) {
        self.score = score;
    }

    fn is_initialized(&self) -> bool {
        self.assignments
            .iter()
            .all(|a| a.timeslot.is_some() && a.tutor.is_some())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_timeslot_display() {
        let slot = Timeslot::new(Weekday::Mon, hm(15, 30));
        assert_eq!(slot.to_string(), "MON 15:30");

        let slot = Timeslot::new(Weekday::Thu, hm(17, 30));
        assert_eq!(slot.to_string(), "THU 17:30");
    }

    #[test]
    fn test_default_timeslots_cover_the_grid() {
        let slots = default_timeslots();
        assert_eq!(slots.len(), 12);
        assert_eq!(slots[0], Timeslot::new(Weekday::Mon, hm(15, 30)));
        assert_eq!(slots[11], Timeslot::new(Weekday::Thu, hm(17, 30)));

        // Slot order is day-major, matching the column order of the
        // availability input formats.
        assert_eq!(slots[3].day, Weekday::Tue);
        assert_eq!(slots[3].start_time, hm(15, 30));
    }

    #[test]
    fn test_level_parse_accepts_spelling_variants() {
        assert_eq!(Level::parse("BEGINNER"), Some(Level::Beginner));
        assert_eq!(Level::parse("beginner"), Some(Level::Beginner));
        assert_eq!(
            Level::parse("UPPER_INTERMEDIATE"),
            Some(Level::UpperIntermediate)
        );
        assert_eq!(
            Level::parse("Upper Intermediate"),
            Some(Level::UpperIntermediate)
        );
        assert_eq!(Level::parse("wizard"), None);
    }

    #[test]
    fn test_platform_parse() {
        assert_eq!(Platform::parse("Scratch"), Some(Platform::Scratch));
        assert_eq!(Platform::parse(" python "), Some(Platform::Python));
        assert_eq!(Platform::parse("java"), None);
    }

    #[test]
    fn test_availability_defaults_to_strictest() {
        let tutor = Tutor::new("Ada", 4, 6).with_availability(vec![true, false]);
        assert!(tutor.is_available(0));
        assert!(!tutor.is_available(1));
        assert!(!tutor.is_available(7));

        let student = Student::new("s01", 0, vec![2, 0]);
        assert!(student.can_attend(0));
        assert!(!student.can_attend(1));
        assert_eq!(student.availability_at(9), AVAILABILITY_IMPOSSIBLE);
    }

    #[test]
    fn test_classroom_key_requires_both_variables() {
        let cohorts = vec![Cohort::new("2A", Level::Beginner, Platform::Scratch)];
        let students = vec![Student::new("s01", 0, vec![1; 4])];
        let tutors = vec![Tutor::new("Ada", 4, 6)];
        let mut timetable = Timetable::new(default_timeslots(), cohorts, tutors, students);

        assert_eq!(timetable.classroom_key(0), None);
        assert!(!timetable.is_initialized());

        timetable.assignments[0].timeslot = Some(3);
        assert_eq!(timetable.classroom_key(0), None);

        timetable.assignments[0].tutor = Some(0);
        assert_eq!(timetable.classroom_key(0), Some((0, 3)));
        assert!(timetable.is_initialized());
    }
}
