//! Built-in demo instances, used when no data directory is given.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::domain::{
    default_timeslots, Cohort, Level, Platform, Student, Timetable, Tutor,
    AVAILABILITY_IMPOSSIBLE,
};

/// Which built-in instance to generate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DemoData {
    /// Two cohorts, one tutor, eight students. Small enough to check by
    /// hand, and solvable to a zero hard score.
    Small,
    /// Six cohorts, five tutors, sixty students with uneven availability.
    Large,
}

impl DemoData {
    pub fn generate(self) -> Timetable {
        match self {
            DemoData::Small => small(),
            DemoData::Large => large(),
        }
    }
}

fn small() -> Timetable {
    let timeslots = default_timeslots();
    let cohorts = vec![
        Cohort::new("2A", Level::Beginner, Platform::Scratch),
        Cohort::new("3B", Level::Intermediate, Platform::Python),
    ];
    let tutors = vec![Tutor::new("Ada", 8, 10)
        .with_levels([Level::Beginner, Level::Intermediate])
        .with_platforms([Platform::Scratch, Platform::Python])
        .with_availability(vec![true; timeslots.len()])];
    let students = (0..8)
        .map(|i| {
            let cohort = if i < 4 { 0 } else { 1 };
            Student::new(format!("s{:02}", i + 1), cohort, vec![2; 12])
        })
        .collect();

    Timetable::new(timeslots, cohorts, tutors, students)
}

fn large() -> Timetable {
    let mut rng = StdRng::seed_from_u64(0);
    let timeslots = default_timeslots();

    let cohorts = vec![
        Cohort::new("1A", Level::Beginner, Platform::Scratch),
        Cohort::new("2A", Level::Elementary, Platform::Scratch),
        Cohort::new("2B", Level::Elementary, Platform::Python),
        Cohort::new("3A", Level::Intermediate, Platform::Python),
        Cohort::new("3B", Level::UpperIntermediate, Platform::Python),
        Cohort::new("4A", Level::Advanced, Platform::Web),
    ];

    // Ada covers every course and every slot, so no cohort is unteachable
    // no matter what the random availabilities come out as.
    let tutors = vec![
        Tutor::new("Ada", 6, 8)
            .with_levels(Level::ALL)
            .with_platforms(Platform::ALL)
            .with_availability(vec![true; timeslots.len()]),
        Tutor::new("Grace", 4, 6)
            .with_levels([Level::Beginner, Level::Elementary])
            .with_platforms([Platform::Scratch])
            .with_availability(random_availability(&mut rng, timeslots.len())),
        Tutor::new("Alan", 4, 6)
            .with_levels([Level::Intermediate, Level::UpperIntermediate])
            .with_platforms([Platform::Python])
            .with_availability(random_availability(&mut rng, timeslots.len())),
        Tutor::new("Edsger", 3, 5)
            .with_levels([Level::UpperIntermediate, Level::Advanced])
            .with_platforms([Platform::Python, Platform::Web])
            .with_availability(random_availability(&mut rng, timeslots.len())),
        Tutor::new("Barbara", 5, 7)
            .with_levels([Level::Beginner, Level::Elementary, Level::Intermediate])
            .with_platforms([Platform::Scratch, Platform::Python])
            .with_availability(random_availability(&mut rng, timeslots.len())),
    ];

    let cohort_count = cohorts.len();
    let students = (0..60)
        .map(|i| {
            let mut availability: Vec<i32> = (0..timeslots.len())
                .map(|_| rng.random_range(0..=3))
                .collect();
            if availability
                .iter()
                .all(|&score| score == AVAILABILITY_IMPOSSIBLE)
            {
                availability[i % timeslots.len()] = 2;
            }
            Student::new(format!("s{:02}", i + 1), i % cohort_count, availability)
        })
        .collect();

    Timetable::new(timeslots, cohorts, tutors, students)
}

fn random_availability(rng: &mut StdRng, len: usize) -> Vec<bool> {
    (0..len).map(|_| rng.random_bool(0.75)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::solver::build_director;
    use tutorplan_config::ConstraintWeights;
    use tutorplan_core::HardSoftScore;

    #[test]
    fn test_small_shape() {
        let timetable = DemoData::Small.generate();

        assert_eq!(timetable.timeslots.len(), 12);
        assert_eq!(timetable.cohorts.len(), 2);
        assert_eq!(timetable.tutors.len(), 1);
        assert_eq!(timetable.students.len(), 8);
        assert_eq!(timetable.assignment_count(), 8);
        assert!(timetable.assignments.iter().all(|a| a.timeslot.is_none()));
    }

    #[test]
    fn test_small_hand_schedule_scores_cleanly() {
        let mut timetable = DemoData::Small.generate();
        // One class per cohort: 2A on Monday 15:30, 3B on Monday 16:30.
        for index in 0..8 {
            timetable.assignments[index].tutor = Some(0);
            timetable.assignments[index].timeslot = Some(if index < 4 { 0 } else { 1 });
        }

        let director = build_director(timetable, &ConstraintWeights::default());
        // Two classes of four: 2 * 3 * 20 size penalty, 4 * 10 preferred
        // time reward for the Monday 15:30 class.
        assert_eq!(director.evaluate_fresh(), HardSoftScore::of(0, -80));
    }

    #[test]
    fn test_large_every_cohort_is_teachable() {
        let timetable = DemoData::Large.generate();

        assert_eq!(timetable.cohorts.len(), 6);
        assert_eq!(timetable.tutors.len(), 5);
        assert_eq!(timetable.students.len(), 60);
        for cohort in &timetable.cohorts {
            assert!(
                timetable
                    .tutors
                    .iter()
                    .any(|t| t.can_teach(cohort.level) && t.can_teach_platform(cohort.platform)),
                "no tutor for {}",
                cohort.label
            );
        }
    }

    #[test]
    fn test_large_every_student_can_attend_somewhere() {
        let timetable = DemoData::Large.generate();
        for student in &timetable.students {
            assert!(
                (0..timetable.timeslots.len()).any(|slot| student.can_attend(slot)),
                "{} has no possible timeslot",
                student.id
            );
        }
    }

    #[test]
    fn test_large_is_deterministic() {
        let first = DemoData::Large.generate();
        let second = DemoData::Large.generate();

        assert_eq!(first.students, second.students);
        assert_eq!(first.tutors, second.tutors);
        assert_eq!(first.cohorts, second.cohorts);
    }
}
