//! Incremental constraints for the school timetable.
//!
//! Each constraint keeps just enough internal state to answer score deltas
//! in O(affected group) when one assignment changes, and can always be
//! cross-checked against its pure `evaluate` recompute. Weights come from
//! [`ConstraintWeights`]; a weight of zero disables a constraint's score
//! contribution without removing its bookkeeping.

use std::collections::{HashMap, HashSet};

use chrono::NaiveTime;

use tutorplan_config::ConstraintWeights;
use tutorplan_core::HardSoftScore;
use tutorplan_scoring::IncrementalConstraint;

use crate::domain::{
    preferred_start_time, Timetable, MAX_CLASS_SIZE, MIN_CLASS_SIZE, OPTIMAL_CLASS_SIZE_MAX,
    OPTIMAL_CLASS_SIZE_MIN,
};

/// A tutor may teach at most this many distinct cohorts, unless half their
/// distinct timeslot count is higher.
const COHORT_CAP_FLOOR: usize = 3;

/// The full constraint catalogue in evaluation order.
pub type TimetableConstraints = (
    CohortConflictConstraint,
    TutorAvailabilityConstraint,
    LevelProficiencyConstraint,
    PlatformProficiencyConstraint,
    MinClassSizeConstraint,
    MaxClassSizeConstraint,
    TutorMaxLoadConstraint,
    StudentAvailabilityConstraint,
    OptimalClassSizeConstraint,
    TutorIdealLoadConstraint,
    CohortDiversityConstraint,
    PreferredTimeConstraint,
);

/// Builds the constraint catalogue with the given weights.
pub fn create_constraints(weights: &ConstraintWeights) -> TimetableConstraints {
    (
        CohortConflictConstraint::new(weights.same_cohort_per_classroom),
        TutorAvailabilityConstraint::new(weights.tutor_availability),
        LevelProficiencyConstraint::new(weights.tutor_level_proficiency),
        PlatformProficiencyConstraint::new(weights.tutor_platform_proficiency),
        MinClassSizeConstraint::new(weights.classroom_min_size),
        MaxClassSizeConstraint::new(weights.classroom_max_size),
        TutorMaxLoadConstraint::new(weights.tutor_max_load),
        StudentAvailabilityConstraint::new(weights.student_availability),
        OptimalClassSizeConstraint::new(weights.optimal_class_size),
        TutorIdealLoadConstraint::new(weights.tutor_ideal_load),
        CohortDiversityConstraint::new(weights.tutor_cohort_diversity_cap),
        PreferredTimeConstraint::new(weights.preferred_time_of_day),
    )
}

// ============================================================================
// Shared helpers
// ============================================================================

/// Classroom sizes for the current assignment state.
fn classroom_counts(solution: &Timetable) -> HashMap<(usize, usize), usize> {
    let mut counts = HashMap::new();
    for index in 0..solution.assignment_count() {
        if let Some(key) = solution.classroom_key(index) {
            *counts.entry(key).or_insert(0) += 1;
        }
    }
    counts
}

/// Decrements a multiset entry, dropping it when it reaches zero.
fn decrement(map: &mut HashMap<usize, usize>, key: usize) {
    match map.get_mut(&key) {
        Some(count) if *count > 1 => *count -= 1,
        _ => {
            map.remove(&key);
        }
    }
}

// ============================================================================
// Hard constraints
// ============================================================================

/// Every pair of assignments sharing a classroom must be from one cohort.
///
/// Penalizes per cross-cohort pair, so splitting a badly mixed classroom
/// improves the score with every student that moves out.
pub struct CohortConflictConstraint {
    weight: i64,
    /// Per classroom: how many members each cohort currently has in it.
    rooms: HashMap<(usize, usize), HashMap<usize, usize>>,
    mixed_pairs: usize,
}

impl CohortConflictConstraint {
    pub fn new(weight: i64) -> Self {
        CohortConflictConstraint {
            weight,
            rooms: HashMap::new(),
            mixed_pairs: 0,
        }
    }
}

impl IncrementalConstraint<Timetable, HardSoftScore> for CohortConflictConstraint {
    fn evaluate(&self, solution: &Timetable) -> HardSoftScore {
        let mut rooms: HashMap<(usize, usize), HashMap<usize, usize>> = HashMap::new();
        for index in 0..solution.assignment_count() {
            if let Some(key) = solution.classroom_key(index) {
                let cohort = solution.cohort_of(index);
                *rooms.entry(key).or_default().entry(cohort).or_insert(0) += 1;
            }
        }

        let mut pairs: i64 = 0;
        for room in rooms.values() {
            let members: i64 = room.values().map(|&n| n as i64).sum();
            let same_cohort: i64 = room.values().map(|&n| n as i64 * (n as i64 - 1) / 2).sum();
            pairs += members * (members - 1) / 2 - same_cohort;
        }
        HardSoftScore::of_hard(-self.weight * pairs)
    }

    fn match_count(&self) -> usize {
        self.mixed_pairs
    }

    fn initialize(&mut self, solution: &Timetable) -> HardSoftScore {
        self.reset();
        let mut total = HardSoftScore::ZERO;
        for index in 0..solution.assignment_count() {
            total = total + self.on_insert(solution, index);
        }
        total
    }

    fn on_insert(&mut self, solution: &Timetable, entity_index: usize) -> HardSoftScore {
        let Some(key) = solution.classroom_key(entity_index) else {
            return HardSoftScore::ZERO;
        };
        let cohort = solution.cohort_of(entity_index);

        let room = self.rooms.entry(key).or_default();
        let members: usize = room.values().sum();
        let same_cohort = room.get(&cohort).copied().unwrap_or(0);
        let new_pairs = members - same_cohort;
        *room.entry(cohort).or_insert(0) += 1;

        self.mixed_pairs += new_pairs;
        HardSoftScore::of_hard(-self.weight * new_pairs as i64)
    }

    fn on_retract(&mut self, solution: &Timetable, entity_index: usize) -> HardSoftScore {
        let Some(key) = solution.classroom_key(entity_index) else {
            return HardSoftScore::ZERO;
        };
        let cohort = solution.cohort_of(entity_index);

        let Some(room) = self.rooms.get_mut(&key) else {
            return HardSoftScore::ZERO;
        };
        let members: usize = room.values().sum();
        let same_cohort = room.get(&cohort).copied().unwrap_or(0);
        // Pairs this member formed with every other cohort's members.
        let dropped_pairs = members - same_cohort;
        decrement(room, cohort);
        if room.is_empty() {
            self.rooms.remove(&key);
        }

        self.mixed_pairs -= dropped_pairs;
        HardSoftScore::of_hard(self.weight * dropped_pairs as i64)
    }

    fn reset(&mut self) {
        self.rooms.clear();
        self.mixed_pairs = 0;
    }

    fn name(&self) -> &str {
        "Same cohort per classroom"
    }

    fn is_hard(&self) -> bool {
        true
    }
}

/// The assigned tutor must be available at the assigned timeslot.
pub struct TutorAvailabilityConstraint {
    weight: i64,
    violations: HashSet<usize>,
}

impl TutorAvailabilityConstraint {
    pub fn new(weight: i64) -> Self {
        TutorAvailabilityConstraint {
            weight,
            violations: HashSet::new(),
        }
    }

    fn check(&self, solution: &Timetable, index: usize) -> bool {
        let a = &solution.assignments[index];
        match (a.tutor, a.timeslot) {
            (Some(tutor), Some(timeslot)) => !solution.tutors[tutor].is_available(timeslot),
            _ => false,
        }
    }
}

impl IncrementalConstraint<Timetable, HardSoftScore> for TutorAvailabilityConstraint {
    fn evaluate(&self, solution: &Timetable) -> HardSoftScore {
        let violations = (0..solution.assignment_count())
            .filter(|&index| self.check(solution, index))
            .count();
        HardSoftScore::of_hard(-self.weight * violations as i64)
    }

    fn match_count(&self) -> usize {
        self.violations.len()
    }

    fn initialize(&mut self, solution: &Timetable) -> HardSoftScore {
        self.reset();
        let mut total = HardSoftScore::ZERO;
        for index in 0..solution.assignment_count() {
            total = total + self.on_insert(solution, index);
        }
        total
    }

    fn on_insert(&mut self, solution: &Timetable, entity_index: usize) -> HardSoftScore {
        if self.check(solution, entity_index) {
            self.violations.insert(entity_index);
            HardSoftScore::of_hard(-self.weight)
        } else {
            HardSoftScore::ZERO
        }
    }

    fn on_retract(&mut self, _solution: &Timetable, entity_index: usize) -> HardSoftScore {
        if self.violations.remove(&entity_index) {
            HardSoftScore::of_hard(self.weight)
        } else {
            HardSoftScore::ZERO
        }
    }

    fn reset(&mut self) {
        self.violations.clear();
    }

    fn name(&self) -> &str {
        "Tutor availability"
    }

    fn is_hard(&self) -> bool {
        true
    }
}

/// The assigned tutor must be proficient at the student's cohort level.
pub struct LevelProficiencyConstraint {
    weight: i64,
    violations: HashSet<usize>,
}

impl LevelProficiencyConstraint {
    pub fn new(weight: i64) -> Self {
        LevelProficiencyConstraint {
            weight,
            violations: HashSet::new(),
        }
    }

    fn check(&self, solution: &Timetable, index: usize) -> bool {
        let Some(tutor) = solution.assignments[index].tutor else {
            return false;
        };
        let level = solution.cohorts[solution.cohort_of(index)].level;
        !solution.tutors[tutor].can_teach(level)
    }
}

impl IncrementalConstraint<Timetable, HardSoftScore> for LevelProficiencyConstraint {
    fn evaluate(&self, solution: &Timetable) -> HardSoftScore {
        let violations = (0..solution.assignment_count())
            .filter(|&index| self.check(solution, index))
            .count();
        HardSoftScore::of_hard(-self.weight * violations as i64)
    }

    fn match_count(&self) -> usize {
        self.violations.len()
    }

    fn initialize(&mut self, solution: &Timetable) -> HardSoftScore {
        self.reset();
        let mut total = HardSoftScore::ZERO;
        for index in 0..solution.assignment_count() {
            total = total + self.on_insert(solution, index);
        }
        total
    }

    fn on_insert(&mut self, solution: &Timetable, entity_index: usize) -> HardSoftScore {
        if self.check(solution, entity_index) {
            self.violations.insert(entity_index);
            HardSoftScore::of_hard(-self.weight)
        } else {
            HardSoftScore::ZERO
        }
    }

    fn on_retract(&mut self, _solution: &Timetable, entity_index: usize) -> HardSoftScore {
        if self.violations.remove(&entity_index) {
            HardSoftScore::of_hard(self.weight)
        } else {
            HardSoftScore::ZERO
        }
    }

    fn reset(&mut self) {
        self.violations.clear();
    }

    fn name(&self) -> &str {
        "Tutor level proficiency"
    }

    fn is_hard(&self) -> bool {
        true
    }
}

/// The assigned tutor must support the student's cohort platform.
pub struct PlatformProficiencyConstraint {
    weight: i64,
    violations: HashSet<usize>,
}

impl PlatformProficiencyConstraint {
    pub fn new(weight: i64) -> Self {
        PlatformProficiencyConstraint {
            weight,
            violations: HashSet::new(),
        }
    }

    fn check(&self, solution: &Timetable, index: usize) -> bool {
        let Some(tutor) = solution.assignments[index].tutor else {
            return false;
        };
        let platform = solution.cohorts[solution.cohort_of(index)].platform;
        !solution.tutors[tutor].can_teach_platform(platform)
    }
}

impl IncrementalConstraint<Timetable, HardSoftScore> for PlatformProficiencyConstraint {
    fn evaluate(&self, solution: &Timetable) -> HardSoftScore {
        let violations = (0..solution.assignment_count())
            .filter(|&index| self.check(solution, index))
            .count();
        HardSoftScore::of_hard(-self.weight * violations as i64)
    }

    fn match_count(&self) -> usize {
        self.violations.len()
    }

    fn initialize(&mut self, solution: &Timetable) -> HardSoftScore {
        self.reset();
        let mut total = HardSoftScore::ZERO;
        for index in 0..solution.assignment_count() {
            total = total + self.on_insert(solution, index);
        }
        total
    }

    fn on_insert(&mut self, solution: &Timetable, entity_index: usize) -> HardSoftScore {
        if self.check(solution, entity_index) {
            self.violations.insert(entity_index);
            HardSoftScore::of_hard(-self.weight)
        } else {
            HardSoftScore::ZERO
        }
    }

    fn on_retract(&mut self, _solution: &Timetable, entity_index: usize) -> HardSoftScore {
        if self.violations.remove(&entity_index) {
            HardSoftScore::of_hard(self.weight)
        } else {
            HardSoftScore::ZERO
        }
    }

    fn reset(&mut self) {
        self.violations.clear();
    }

    fn name(&self) -> &str {
        "Tutor platform proficiency"
    }

    fn is_hard(&self) -> bool {
        true
    }
}

fn size_shortfall(count: usize) -> i64 {
    if count > 0 && count < MIN_CLASS_SIZE {
        (MIN_CLASS_SIZE - count) as i64
    } else {
        0
    }
}

fn size_overflow(count: usize) -> i64 {
    count.saturating_sub(MAX_CLASS_SIZE) as i64
}

/// Non-empty classrooms below the minimum size, penalized per missing seat.
///
/// Empty classrooms do not exist as groups, so emptiness is never penalized.
pub struct MinClassSizeConstraint {
    weight: i64,
    counts: HashMap<(usize, usize), usize>,
}

impl MinClassSizeConstraint {
    pub fn new(weight: i64) -> Self {
        MinClassSizeConstraint {
            weight,
            counts: HashMap::new(),
        }
    }
}

impl IncrementalConstraint<Timetable, HardSoftScore> for MinClassSizeConstraint {
    fn evaluate(&self, solution: &Timetable) -> HardSoftScore {
        let missing: i64 = classroom_counts(solution)
            .values()
            .map(|&count| size_shortfall(count))
            .sum();
        HardSoftScore::of_hard(-self.weight * missing)
    }

    fn match_count(&self) -> usize {
        self.counts
            .values()
            .filter(|&&count| size_shortfall(count) > 0)
            .count()
    }

    fn initialize(&mut self, solution: &Timetable) -> HardSoftScore {
        self.reset();
        let mut total = HardSoftScore::ZERO;
        for index in 0..solution.assignment_count() {
            total = total + self.on_insert(solution, index);
        }
        total
    }

    fn on_insert(&mut self, solution: &Timetable, entity_index: usize) -> HardSoftScore {
        let Some(key) = solution.classroom_key(entity_index) else {
            return HardSoftScore::ZERO;
        };
        let count = self.counts.entry(key).or_insert(0);
        let before = *count;
        *count += 1;
        HardSoftScore::of_hard(-self.weight * (size_shortfall(before + 1) - size_shortfall(before)))
    }

    fn on_retract(&mut self, solution: &Timetable, entity_index: usize) -> HardSoftScore {
        let Some(key) = solution.classroom_key(entity_index) else {
            return HardSoftScore::ZERO;
        };
        let Some(count) = self.counts.get_mut(&key) else {
            return HardSoftScore::ZERO;
        };
        let before = *count;
        let after = before - 1;
        if after == 0 {
            self.counts.remove(&key);
        } else {
            *count = after;
        }
        HardSoftScore::of_hard(-self.weight * (size_shortfall(after) - size_shortfall(before)))
    }

    fn reset(&mut self) {
        self.counts.clear();
    }

    fn name(&self) -> &str {
        "Classroom minimum size"
    }

    fn is_hard(&self) -> bool {
        true
    }
}

/// Classrooms above the maximum size, penalized per excess seat.
pub struct MaxClassSizeConstraint {
    weight: i64,
    counts: HashMap<(usize, usize), usize>,
}

impl MaxClassSizeConstraint {
    pub fn new(weight: i64) -> Self {
        MaxClassSizeConstraint {
            weight,
            counts: HashMap::new(),
        }
    }
}

impl IncrementalConstraint<Timetable, HardSoftScore> for MaxClassSizeConstraint {
    fn evaluate(&self, solution: &Timetable) -> HardSoftScore {
        let excess: i64 = classroom_counts(solution)
            .values()
            .map(|&count| size_overflow(count))
            .sum();
        HardSoftScore::of_hard(-self.weight * excess)
    }

    fn match_count(&self) -> usize {
        self.counts
            .values()
            .filter(|&&count| size_overflow(count) > 0)
            .count()
    }

    fn initialize(&mut self, solution: &Timetable) -> HardSoftScore {
        self.reset();
        let mut total = HardSoftScore::ZERO;
        for index in 0..solution.assignment_count() {
            total = total + self.on_insert(solution, index);
        }
        total
    }

    fn on_insert(&mut self, solution: &Timetable, entity_index: usize) -> HardSoftScore {
        let Some(key) = solution.classroom_key(entity_index) else {
            return HardSoftScore::ZERO;
        };
        let count = self.counts.entry(key).or_insert(0);
        let before = *count;
        *count += 1;
        HardSoftScore::of_hard(-self.weight * (size_overflow(before + 1) - size_overflow(before)))
    }

    fn on_retract(&mut self, solution: &Timetable, entity_index: usize) -> HardSoftScore {
        let Some(key) = solution.classroom_key(entity_index) else {
            return HardSoftScore::ZERO;
        };
        let Some(count) = self.counts.get_mut(&key) else {
            return HardSoftScore::ZERO;
        };
        let before = *count;
        let after = before - 1;
        if after == 0 {
            self.counts.remove(&key);
        } else {
            *count = after;
        }
        HardSoftScore::of_hard(-self.weight * (size_overflow(after) - size_overflow(before)))
    }

    fn reset(&mut self) {
        self.counts.clear();
    }

    fn name(&self) -> &str {
        "Classroom maximum size"
    }

    fn is_hard(&self) -> bool {
        true
    }
}

fn load_excess(lessons: usize, limit: usize) -> i64 {
    lessons.saturating_sub(limit) as i64
}

/// Tutors teaching more distinct timeslots than their maximum load,
/// penalized per excess lesson.
pub struct TutorMaxLoadConstraint {
    weight: i64,
    /// Per tutor: assignment count in each timeslot. Distinct keys are the
    /// tutor's lesson count.
    lessons: HashMap<usize, HashMap<usize, usize>>,
    over_limit: HashSet<usize>,
}

impl TutorMaxLoadConstraint {
    pub fn new(weight: i64) -> Self {
        TutorMaxLoadConstraint {
            weight,
            lessons: HashMap::new(),
            over_limit: HashSet::new(),
        }
    }
}

impl IncrementalConstraint<Timetable, HardSoftScore> for TutorMaxLoadConstraint {
    fn evaluate(&self, solution: &Timetable) -> HardSoftScore {
        let mut slots_by_tutor: HashMap<usize, HashSet<usize>> = HashMap::new();
        for index in 0..solution.assignment_count() {
            if let Some((tutor, timeslot)) = solution.classroom_key(index) {
                slots_by_tutor.entry(tutor).or_default().insert(timeslot);
            }
        }
        let excess: i64 = slots_by_tutor
            .iter()
            .map(|(&tutor, slots)| load_excess(slots.len(), solution.tutors[tutor].max_lessons))
            .sum();
        HardSoftScore::of_hard(-self.weight * excess)
    }

    fn match_count(&self) -> usize {
        self.over_limit.len()
    }

    fn initialize(&mut self, solution: &Timetable) -> HardSoftScore {
        self.reset();
        let mut total = HardSoftScore::ZERO;
        for index in 0..solution.assignment_count() {
            total = total + self.on_insert(solution, index);
        }
        total
    }

    fn on_insert(&mut self, solution: &Timetable, entity_index: usize) -> HardSoftScore {
        let Some((tutor, timeslot)) = solution.classroom_key(entity_index) else {
            return HardSoftScore::ZERO;
        };
        let slots = self.lessons.entry(tutor).or_default();
        let before = slots.len();
        *slots.entry(timeslot).or_insert(0) += 1;
        let after = slots.len();
        if after == before {
            return HardSoftScore::ZERO;
        }

        let limit = solution.tutors[tutor].max_lessons;
        if load_excess(after, limit) > 0 {
            self.over_limit.insert(tutor);
        }
        HardSoftScore::of_hard(-self.weight * (load_excess(after, limit) - load_excess(before, limit)))
    }

    fn on_retract(&mut self, solution: &Timetable, entity_index: usize) -> HardSoftScore {
        let Some((tutor, timeslot)) = solution.classroom_key(entity_index) else {
            return HardSoftScore::ZERO;
        };
        let Some(slots) = self.lessons.get_mut(&tutor) else {
            return HardSoftScore::ZERO;
        };
        let before = slots.len();
        decrement(slots, timeslot);
        let after = slots.len();
        let empty = slots.is_empty();
        if empty {
            self.lessons.remove(&tutor);
        }
        if after == before {
            return HardSoftScore::ZERO;
        }

        let limit = solution.tutors[tutor].max_lessons;
        if load_excess(after, limit) == 0 {
            self.over_limit.remove(&tutor);
        }
        HardSoftScore::of_hard(self.weight * (load_excess(before, limit) - load_excess(after, limit)))
    }

    fn reset(&mut self) {
        self.lessons.clear();
        self.over_limit.clear();
    }

    fn name(&self) -> &str {
        "Tutor maximum load"
    }

    fn is_hard(&self) -> bool {
        true
    }
}

// ============================================================================
// Soft constraints
// ============================================================================

/// Students placed at a timeslot they marked as impossible.
pub struct StudentAvailabilityConstraint {
    weight: i64,
    violations: HashSet<usize>,
}

impl StudentAvailabilityConstraint {
    pub fn new(weight: i64) -> Self {
        StudentAvailabilityConstraint {
            weight,
            violations: HashSet::new(),
        }
    }

    fn check(&self, solution: &Timetable, index: usize) -> bool {
        let Some(timeslot) = solution.assignments[index].timeslot else {
            return false;
        };
        !solution.student_of(index).can_attend(timeslot)
    }
}

impl IncrementalConstraint<Timetable, HardSoftScore> for StudentAvailabilityConstraint {
    fn evaluate(&self, solution: &Timetable) -> HardSoftScore {
        let violations = (0..solution.assignment_count())
            .filter(|&index| self.check(solution, index))
            .count();
        HardSoftScore::of_soft(-self.weight * violations as i64)
    }

    fn match_count(&self) -> usize {
        self.violations.len()
    }

    fn initialize(&mut self, solution: &Timetable) -> HardSoftScore {
        self.reset();
        let mut total = HardSoftScore::ZERO;
        for index in 0..solution.assignment_count() {
            total = total + self.on_insert(solution, index);
        }
        total
    }

    fn on_insert(&mut self, solution: &Timetable, entity_index: usize) -> HardSoftScore {
        if self.check(solution, entity_index) {
            self.violations.insert(entity_index);
            HardSoftScore::of_soft(-self.weight)
        } else {
            HardSoftScore::ZERO
        }
    }

    fn on_retract(&mut self, _solution: &Timetable, entity_index: usize) -> HardSoftScore {
        if self.violations.remove(&entity_index) {
            HardSoftScore::of_soft(self.weight)
        } else {
            HardSoftScore::ZERO
        }
    }

    fn reset(&mut self) {
        self.violations.clear();
    }

    fn name(&self) -> &str {
        "Student availability"
    }
}

fn band_distance(count: usize) -> i64 {
    if count == 0 || (OPTIMAL_CLASS_SIZE_MIN..=OPTIMAL_CLASS_SIZE_MAX).contains(&count) {
        0
    } else {
        (count as i64 - OPTIMAL_CLASS_SIZE_MAX as i64).abs()
    }
}

/// Classrooms outside the optimal size band, penalized per seat of distance
/// from the band's upper edge.
pub struct OptimalClassSizeConstraint {
    weight: i64,
    counts: HashMap<(usize, usize), usize>,
}

impl OptimalClassSizeConstraint {
    pub fn new(weight: i64) -> Self {
        OptimalClassSizeConstraint {
            weight,
            counts: HashMap::new(),
        }
    }
}

impl IncrementalConstraint<Timetable, HardSoftScore> for OptimalClassSizeConstraint {
    fn evaluate(&self, solution: &Timetable) -> HardSoftScore {
        let distance: i64 = classroom_counts(solution)
            .values()
            .map(|&count| band_distance(count))
            .sum();
        HardSoftScore::of_soft(-self.weight * distance)
    }

    fn match_count(&self) -> usize {
        self.counts
            .values()
            .filter(|&&count| band_distance(count) > 0)
            .count()
    }

    fn initialize(&mut self, solution: &Timetable) -> HardSoftScore {
        self.reset();
        let mut total = HardSoftScore::ZERO;
        for index in 0..solution.assignment_count() {
            total = total + self.on_insert(solution, index);
        }
        total
    }

    fn on_insert(&mut self, solution: &Timetable, entity_index: usize) -> HardSoftScore {
        let Some(key) = solution.classroom_key(entity_index) else {
            return HardSoftScore::ZERO;
        };
        let count = self.counts.entry(key).or_insert(0);
        let before = *count;
        *count += 1;
        HardSoftScore::of_soft(-self.weight * (band_distance(before + 1) - band_distance(before)))
    }

    fn on_retract(&mut self, solution: &Timetable, entity_index: usize) -> HardSoftScore {
        let Some(key) = solution.classroom_key(entity_index) else {
            return HardSoftScore::ZERO;
        };
        let Some(count) = self.counts.get_mut(&key) else {
            return HardSoftScore::ZERO;
        };
        let before = *count;
        let after = before - 1;
        if after == 0 {
            self.counts.remove(&key);
        } else {
            *count = after;
        }
        HardSoftScore::of_soft(-self.weight * (band_distance(after) - band_distance(before)))
    }

    fn reset(&mut self) {
        self.counts.clear();
    }

    fn name(&self) -> &str {
        "Optimal class size"
    }
}

/// Tutors teaching more distinct timeslots than they would like to,
/// penalized lightly per lesson beyond the ideal.
pub struct TutorIdealLoadConstraint {
    weight: i64,
    lessons: HashMap<usize, HashMap<usize, usize>>,
    over_ideal: HashSet<usize>,
}

impl TutorIdealLoadConstraint {
    pub fn new(weight: i64) -> Self {
        TutorIdealLoadConstraint {
            weight,
            lessons: HashMap::new(),
            over_ideal: HashSet::new(),
        }
    }
}

impl IncrementalConstraint<Timetable, HardSoftScore> for TutorIdealLoadConstraint {
    fn evaluate(&self, solution: &Timetable) -> HardSoftScore {
        let mut slots_by_tutor: HashMap<usize, HashSet<usize>> = HashMap::new();
        for index in 0..solution.assignment_count() {
            if let Some((tutor, timeslot)) = solution.classroom_key(index) {
                slots_by_tutor.entry(tutor).or_default().insert(timeslot);
            }
        }
        let excess: i64 = slots_by_tutor
            .iter()
            .map(|(&tutor, slots)| load_excess(slots.len(), solution.tutors[tutor].ideal_lessons))
            .sum();
        HardSoftScore::of_soft(-self.weight * excess)
    }

    fn match_count(&self) -> usize {
        self.over_ideal.len()
    }

    fn initialize(&mut self, solution: &Timetable) -> HardSoftScore {
        self.reset();
        let mut total = HardSoftScore::ZERO;
        for index in 0..solution.assignment_count() {
            total = total + self.on_insert(solution, index);
        }
        total
    }

    fn on_insert(&mut self, solution: &Timetable, entity_index: usize) -> HardSoftScore {
        let Some((tutor, timeslot)) = solution.classroom_key(entity_index) else {
            return HardSoftScore::ZERO;
        };
        let slots = self.lessons.entry(tutor).or_default();
        let before = slots.len();
        *slots.entry(timeslot).or_insert(0) += 1;
        let after = slots.len();
        if after == before {
            return HardSoftScore::ZERO;
        }

        let ideal = solution.tutors[tutor].ideal_lessons;
        if load_excess(after, ideal) > 0 {
            self.over_ideal.insert(tutor);
        }
        HardSoftScore::of_soft(-self.weight * (load_excess(after, ideal) - load_excess(before, ideal)))
    }

    fn on_retract(&mut self, solution: &Timetable, entity_index: usize) -> HardSoftScore {
        let Some((tutor, timeslot)) = solution.classroom_key(entity_index) else {
            return HardSoftScore::ZERO;
        };
        let Some(slots) = self.lessons.get_mut(&tutor) else {
            return HardSoftScore::ZERO;
        };
        let before = slots.len();
        decrement(slots, timeslot);
        let after = slots.len();
        let empty = slots.is_empty();
        if empty {
            self.lessons.remove(&tutor);
        }
        if after == before {
            return HardSoftScore::ZERO;
        }

        let ideal = solution.tutors[tutor].ideal_lessons;
        if load_excess(after, ideal) == 0 {
            self.over_ideal.remove(&tutor);
        }
        HardSoftScore::of_soft(self.weight * (load_excess(before, ideal) - load_excess(after, ideal)))
    }

    fn reset(&mut self) {
        self.lessons.clear();
        self.over_ideal.clear();
    }

    fn name(&self) -> &str {
        "Tutor ideal load"
    }
}

#[derive(Default)]
struct TutorTeaching {
    cohorts: HashMap<usize, usize>,
    timeslots: HashMap<usize, usize>,
}

fn diversity_excess(teaching: &TutorTeaching) -> i64 {
    let cap = COHORT_CAP_FLOOR.max(teaching.timeslots.len() / 2);
    (teaching.cohorts.len() as i64 - cap as i64).max(0)
}

/// Tutors spread across more distinct cohorts than their cap allows.
///
/// The cap scales with how many distinct timeslots the tutor teaches:
/// `max(3, distinct_timeslots / 2)`, so a heavily used tutor is allowed
/// more variety than a lightly used one.
pub struct CohortDiversityConstraint {
    weight: i64,
    teaching: HashMap<usize, TutorTeaching>,
    over_cap: HashSet<usize>,
}

impl CohortDiversityConstraint {
    pub fn new(weight: i64) -> Self {
        CohortDiversityConstraint {
            weight,
            teaching: HashMap::new(),
            over_cap: HashSet::new(),
        }
    }
}

impl IncrementalConstraint<Timetable, HardSoftScore> for CohortDiversityConstraint {
    fn evaluate(&self, solution: &Timetable) -> HardSoftScore {
        let mut teaching: HashMap<usize, TutorTeaching> = HashMap::new();
        for index in 0..solution.assignment_count() {
            let a = &solution.assignments[index];
            let Some(tutor) = a.tutor else { continue };
            let entry = teaching.entry(tutor).or_default();
            *entry.cohorts.entry(solution.cohort_of(index)).or_insert(0) += 1;
            if let Some(timeslot) = a.timeslot {
                *entry.timeslots.entry(timeslot).or_insert(0) += 1;
            }
        }
        let excess: i64 = teaching.values().map(diversity_excess).sum();
        HardSoftScore::of_soft(-self.weight * excess)
    }

    fn match_count(&self) -> usize {
        self.over_cap.len()
    }

    fn initialize(&mut self, solution: &Timetable) -> HardSoftScore {
        self.reset();
        let mut total = HardSoftScore::ZERO;
        for index in 0..solution.assignment_count() {
            total = total + self.on_insert(solution, index);
        }
        total
    }

    fn on_insert(&mut self, solution: &Timetable, entity_index: usize) -> HardSoftScore {
        let a = &solution.assignments[entity_index];
        let Some(tutor) = a.tutor else {
            return HardSoftScore::ZERO;
        };
        let cohort = solution.cohort_of(entity_index);

        let entry = self.teaching.entry(tutor).or_default();
        let before = diversity_excess(entry);
        *entry.cohorts.entry(cohort).or_insert(0) += 1;
        if let Some(timeslot) = a.timeslot {
            *entry.timeslots.entry(timeslot).or_insert(0) += 1;
        }
        let after = diversity_excess(entry);

        if after > 0 {
            self.over_cap.insert(tutor);
        } else {
            self.over_cap.remove(&tutor);
        }
        HardSoftScore::of_soft(-self.weight * (after - before))
    }

    fn on_retract(&mut self, solution: &Timetable, entity_index: usize) -> HardSoftScore {
        let a = &solution.assignments[entity_index];
        let Some(tutor) = a.tutor else {
            return HardSoftScore::ZERO;
        };
        let cohort = solution.cohort_of(entity_index);

        let Some(entry) = self.teaching.get_mut(&tutor) else {
            return HardSoftScore::ZERO;
        };
        let before = diversity_excess(entry);
        decrement(&mut entry.cohorts, cohort);
        if let Some(timeslot) = a.timeslot {
            decrement(&mut entry.timeslots, timeslot);
        }
        let after = diversity_excess(entry);
        let empty = entry.cohorts.is_empty() && entry.timeslots.is_empty();

        if empty {
            self.teaching.remove(&tutor);
            self.over_cap.remove(&tutor);
        } else if after > 0 {
            self.over_cap.insert(tutor);
        } else {
            self.over_cap.remove(&tutor);
        }
        HardSoftScore::of_soft(self.weight * (before - after))
    }

    fn reset(&mut self) {
        self.teaching.clear();
        self.over_cap.clear();
    }

    fn name(&self) -> &str {
        "Tutor cohort diversity"
    }
}

/// Rewards assignments that start at the preferred time of day.
pub struct PreferredTimeConstraint {
    weight: i64,
    preferred: NaiveTime,
    matches: HashSet<usize>,
}

impl PreferredTimeConstraint {
    pub fn new(weight: i64) -> Self {
        PreferredTimeConstraint {
            weight,
            preferred: preferred_start_time(),
            matches: HashSet::new(),
        }
    }

    fn check(&self, solution: &Timetable, index: usize) -> bool {
        let Some(timeslot) = solution.assignments[index].timeslot else {
            return false;
        };
        solution.timeslots[timeslot].start_time == self.preferred
    }
}

impl IncrementalConstraint<Timetable, HardSoftScore> for PreferredTimeConstraint {
    fn evaluate(&self, solution: &Timetable) -> HardSoftScore {
        let matches = (0..solution.assignment_count())
            .filter(|&index| self.check(solution, index))
            .count();
        HardSoftScore::of_soft(self.weight * matches as i64)
    }

    fn match_count(&self) -> usize {
        self.matches.len()
    }

    fn initialize(&mut self, solution: &Timetable) -> HardSoftScore {
        self.reset();
        let mut total = HardSoftScore::ZERO;
        for index in 0..solution.assignment_count() {
            total = total + self.on_insert(solution, index);
        }
        total
    }

    fn on_insert(&mut self, solution: &Timetable, entity_index: usize) -> HardSoftScore {
        if self.check(solution, entity_index) {
            self.matches.insert(entity_index);
            HardSoftScore::of_soft(self.weight)
        } else {
            HardSoftScore::ZERO
        }
    }

    fn on_retract(&mut self, _solution: &Timetable, entity_index: usize) -> HardSoftScore {
        if self.matches.remove(&entity_index) {
            HardSoftScore::of_soft(-self.weight)
        } else {
            HardSoftScore::ZERO
        }
    }

    fn reset(&mut self) {
        self.matches.clear();
    }

    fn name(&self) -> &str {
        "Preferred time of day"
    }
}
