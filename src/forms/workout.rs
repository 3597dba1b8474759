use rusqlite::Connection;

use crate::db::exercises;
use crate::db::models::{Workout, WorkoutExercise};
use crate::db::workouts::{SlotFields, WorkoutFields, SLOT_COUNT};
use crate::forms::{FormData, FormErrors, Validator, INVALID_CHOICE, NON_FIELD};

pub const NAME: &str = "nom";

pub const DUPLICATE_EXERCISE: &str = "Vous ne pouvez pas utiliser le même exercice plusieurs fois.";

/// Field names of slot `n` (1-based): exercise, sets, reps.
pub fn slot_fields(n: usize) -> (String, String, String) {
    (
        format!("exercice_{n}"),
        format!("sets_{n}"),
        format!("reps_{n}"),
    )
}

/// Whether any exercise is used by more than one slot.
pub fn has_duplicate_exercise(slots: &[SlotFields]) -> bool {
    slots
        .iter()
        .enumerate()
        .any(|(i, slot)| slots[..i].iter().any(|s| s.exercise_id == slot.exercise_id))
}

/// Validate a four-slot submission. Slots may only use approved exercises and
/// an exercise may not appear twice. Outer error is the database.
pub fn validate(
    conn: &Connection,
    data: &FormData,
) -> rusqlite::Result<Result<WorkoutFields, FormErrors>> {
    let mut v = Validator::new(data);
    let name = v.required(NAME, 100);

    let mut slots = [SlotFields {
        exercise_id: 0,
        sets: 0,
        reps: 0,
    }; SLOT_COUNT];

    for (i, slot) in slots.iter_mut().enumerate() {
        let (exercise, sets, reps) = slot_fields(i + 1);
        slot.exercise_id = v.choice_id(&exercise);
        if !v.has_error(&exercise) && !exercises::is_approved(conn, slot.exercise_id)? {
            v.error(&exercise, INVALID_CHOICE);
        }
        slot.sets = v.integer(&sets, 1);
        slot.reps = v.integer(&reps, 1);
    }

    let all_picked = (1..=SLOT_COUNT).all(|n| !v.has_error(&slot_fields(n).0));
    if all_picked && has_duplicate_exercise(&slots) {
        v.error(NON_FIELD, DUPLICATE_EXERCISE);
    }

    Ok(v.finish(WorkoutFields { name, slots }))
}

/// Form values pre-filled from a stored workout, slot `n` from the `n`th row.
pub fn initial(workout: &Workout, rows: &[WorkoutExercise]) -> FormData {
    let mut pairs = vec![(NAME.to_string(), workout.name.clone())];
    for (i, row) in rows.iter().enumerate() {
        let (exercise, sets, reps) = slot_fields(i + 1);
        pairs.push((exercise, row.exercise_id.to_string()));
        pairs.push((sets, row.sets.to_string()));
        pairs.push((reps, row.reps.to_string()));
    }
    FormData::from_pairs(pairs)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::exercises::insert_named;
    use crate::db::test_support::migrated_pool;

    fn submission(name: &str, ids: [i64; 4]) -> FormData {
        let mut pairs = vec![(NAME.to_string(), name.to_string())];
        for (i, id) in ids.iter().enumerate() {
            let (exercise, sets, reps) = slot_fields(i + 1);
            pairs.push((exercise, id.to_string()));
            pairs.push((sets, "3".to_string()));
            pairs.push((reps, "10".to_string()));
        }
        FormData::from_pairs(pairs)
    }

    #[test]
    fn duplicate_detection() {
        let slot = |exercise_id| SlotFields {
            exercise_id,
            sets: 1,
            reps: 1,
        };
        assert!(!has_duplicate_exercise(&[slot(1), slot(2), slot(3), slot(4)]));
        assert!(has_duplicate_exercise(&[slot(1), slot(2), slot(3), slot(1)]));
        assert!(has_duplicate_exercise(&[slot(1), slot(2), slot(2), slot(4)]));
    }

    #[test]
    fn valid_submission_keeps_slot_order() {
        let (_tmp, pool) = migrated_pool();
        let conn = pool.get().unwrap();
        let ids = ["A", "B", "C", "D"].map(|n| insert_named(&conn, n, true));

        let fields = validate(&conn, &submission("Full body", ids))
            .unwrap()
            .unwrap();
        assert_eq!(fields.name, "Full body");
        assert_eq!(fields.slots.map(|s| s.exercise_id), ids);
    }

    #[test]
    fn repeated_exercise_is_a_form_error() {
        let (_tmp, pool) = migrated_pool();
        let conn = pool.get().unwrap();
        let ids = ["A", "B", "C"].map(|n| insert_named(&conn, n, true));

        let errors = validate(&conn, &submission("Oops", [ids[0], ids[1], ids[2], ids[0]]))
            .unwrap()
            .unwrap_err();
        assert_eq!(errors.get(NON_FIELD), [DUPLICATE_EXERCISE.to_string()]);
    }

    #[test]
    fn pending_exercises_cannot_be_used() {
        let (_tmp, pool) = migrated_pool();
        let conn = pool.get().unwrap();
        let mut ids = ["A", "B", "C"].map(|n| insert_named(&conn, n, true)).to_vec();
        ids.push(insert_named(&conn, "Pending", false));

        let errors = validate(&conn, &submission("x", [ids[0], ids[1], ids[2], ids[3]]))
            .unwrap()
            .unwrap_err();
        assert_eq!(errors.get("exercice_4"), [INVALID_CHOICE.to_string()]);
    }

    #[test]
    fn initial_round_trips_through_validation() {
        let (_tmp, pool) = migrated_pool();
        let conn = pool.get().unwrap();
        let ids = ["A", "B", "C", "D"].map(|n| insert_named(&conn, n, true));
        let workout = Workout {
            id: 1,
            name: "Stored".into(),
            created_at: String::new(),
            creator_id: 1,
        };
        let rows: Vec<WorkoutExercise> = ids
            .iter()
            .enumerate()
            .map(|(i, &exercise_id)| WorkoutExercise {
                id: i as i64 + 1,
                workout_id: 1,
                exercise_id,
                exercise_name: String::new(),
                sets: 4,
                reps: 6,
            })
            .collect();

        let fields = validate(&conn, &initial(&workout, &rows))
            .unwrap()
            .unwrap();
        assert_eq!(fields.name, "Stored");
        assert!(fields.slots.iter().all(|s| s.sets == 4 && s.reps == 6));
    }
}
