//! Pure progress rules: what a completed workout adds to a user's totals, and
//! when a challenge counts as finished.

use crate::db::models::WorkoutExercise;

/// What completing one workout adds to the owner's statistics.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WorkoutTotals {
    pub sets: i64,
    pub reps: i64,
    pub exercises: i64,
    pub workouts: i64,
}

impl WorkoutTotals {
    /// Totals for a set of `(sets, reps)` slots. Reps count every set. Sums
    /// saturate at `i64::MAX` instead of wrapping.
    pub fn from_slots<I>(slots: I) -> Self
    where
        I: IntoIterator<Item = (i64, i64)>,
    {
        slots.into_iter().fold(
            WorkoutTotals {
                workouts: 1,
                ..Self::default()
            },
            |acc, (sets, reps)| WorkoutTotals {
                sets: acc.sets.saturating_add(sets),
                reps: acc.reps.saturating_add(sets.saturating_mul(reps)),
                exercises: acc.exercises.saturating_add(1),
                workouts: acc.workouts,
            },
        )
    }

    pub fn for_workout(rows: &[WorkoutExercise]) -> Self {
        Self::from_slots(rows.iter().map(|r| (r.sets, r.reps)))
    }
}

/// A challenge is complete once every linked badge is done. A challenge with no
/// badges is never complete.
pub fn challenge_complete(completed: i64, total_badges: i64) -> bool {
    total_badges > 0 && completed == total_badges
}
