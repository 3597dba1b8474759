use rusqlite::{params, Connection, Row};

use crate::db::models::{Workout, WorkoutExercise};
use crate::db::{contains_pattern, optional};

/// A workout is always made of exactly this many slots.
pub const SLOT_COUNT: usize = 4;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SlotFields {
    pub exercise_id: i64,
    pub sets: i64,
    pub reps: i64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkoutFields {
    pub name: String,
    pub slots: [SlotFields; SLOT_COUNT],
}

fn workout_from_row(row: &Row<'_>) -> rusqlite::Result<Workout> {
    Ok(Workout {
        id: row.get(0)?,
        name: row.get(1)?,
        created_at: row.get(2)?,
        creator_id: row.get(3)?,
    })
}

fn slot_from_row(row: &Row<'_>) -> rusqlite::Result<WorkoutExercise> {
    Ok(WorkoutExercise {
        id: row.get(0)?,
        workout_id: row.get(1)?,
        exercise_id: row.get(2)?,
        exercise_name: row.get(3)?,
        sets: row.get(4)?,
        reps: row.get(5)?,
    })
}

/// Create the workout and its slots, in slot order, atomically.
pub fn create(conn: &Connection, creator_id: i64, fields: &WorkoutFields) -> rusqlite::Result<i64> {
    let tx = conn.unchecked_transaction()?;
    tx.execute(
        "INSERT INTO workouts (name, creator_id) VALUES (?1, ?2)",
        params![fields.name, creator_id],
    )?;
    let workout_id = tx.last_insert_rowid();

    for slot in &fields.slots {
        tx.execute(
            "INSERT INTO workout_exercises (workout_id, exercise_id, sets, reps) \
             VALUES (?1, ?2, ?3, ?4)",
            params![workout_id, slot.exercise_id, slot.sets, slot.reps],
        )?;
    }

    tx.commit()?;
    Ok(workout_id)
}

/// Rename the workout and rewrite its existing slots in place. Slot `n` of the
/// submission lands on the `n`th row by id; no rows are added or removed.
pub fn update(conn: &Connection, workout_id: i64, fields: &WorkoutFields) -> rusqlite::Result<()> {
    let tx = conn.unchecked_transaction()?;
    tx.execute(
        "UPDATE workouts SET name = ?1 WHERE id = ?2",
        params![fields.name, workout_id],
    )?;

    let existing = slots(&tx, workout_id)?;
    for (row, slot) in existing.iter().zip(fields.slots.iter()) {
        tx.execute(
            "UPDATE workout_exercises SET exercise_id = ?1, sets = ?2, reps = ?3 WHERE id = ?4",
            params![slot.exercise_id, slot.sets, slot.reps, row.id],
        )?;
    }

    tx.commit()?;
    Ok(())
}

pub fn delete(conn: &Connection, workout_id: i64) -> rusqlite::Result<bool> {
    let rows = conn.execute("DELETE FROM workouts WHERE id = ?1", params![workout_id])?;
    Ok(rows > 0)
}

pub fn find(conn: &Connection, workout_id: i64) -> rusqlite::Result<Option<Workout>> {
    optional(conn.query_row(
        "SELECT id, name, created_at, creator_id FROM workouts WHERE id = ?1",
        params![workout_id],
        workout_from_row,
    ))
}

pub fn slots(conn: &Connection, workout_id: i64) -> rusqlite::Result<Vec<WorkoutExercise>> {
    let mut stmt = conn.prepare(
        "SELECT we.id, we.workout_id, we.exercise_id, e.name, we.sets, we.reps \
         FROM workout_exercises we JOIN exercises e ON e.id = we.exercise_id \
         WHERE we.workout_id = ?1 ORDER BY we.id",
    )?;
    let rows = stmt
        .query_map(params![workout_id], slot_from_row)?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(rows)
}

/// The creator's workouts with their slots, optionally filtered by name.
pub fn list_for_creator(
    conn: &Connection,
    creator_id: i64,
    search: Option<&str>,
) -> rusqlite::Result<Vec<(Workout, Vec<WorkoutExercise>)>> {
    let pattern = contains_pattern(search.unwrap_or(""));
    let mut stmt = conn.prepare(
        "SELECT id, name, created_at, creator_id FROM workouts \
         WHERE creator_id = ?1 AND name LIKE ?2 ESCAPE '\\' ORDER BY created_at DESC, id DESC",
    )?;
    let workouts = stmt
        .query_map(params![creator_id, pattern], workout_from_row)?
        .collect::<Result<Vec<_>, _>>()?;

    workouts
        .into_iter()
        .map(|w| {
            let rows = slots(conn, w.id)?;
            Ok((w, rows))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::exercises::insert_named;
    use crate::db::test_support::migrated_pool;
    use crate::db::users::{insert_plain, Roles};

    fn fields(name: &str, ids: [i64; 4]) -> WorkoutFields {
        WorkoutFields {
            name: name.into(),
            slots: ids.map(|exercise_id| SlotFields {
                exercise_id,
                sets: 3,
                reps: 10,
            }),
        }
    }

    #[test]
    fn create_writes_four_slots_in_order() {
        let (_tmp, pool) = migrated_pool();
        let conn = pool.get().unwrap();
        let user = insert_plain(&conn, "alice", Roles::default());
        let ids = ["A", "B", "C", "D"].map(|n| insert_named(&conn, n, true));

        let workout_id = create(&conn, user, &fields("Full body", ids)).unwrap();
        let rows = slots(&conn, workout_id).unwrap();
        assert_eq!(rows.len(), SLOT_COUNT);
        let names: Vec<&str> = rows.iter().map(|r| r.exercise_name.as_str()).collect();
        assert_eq!(names, vec!["A", "B", "C", "D"]);
        assert_eq!(find(&conn, workout_id).unwrap().unwrap().creator_id, user);
    }

    #[test]
    fn update_rewrites_rows_in_place() {
        let (_tmp, pool) = migrated_pool();
        let conn = pool.get().unwrap();
        let user = insert_plain(&conn, "alice", Roles::default());
        let ids = ["A", "B", "C", "D", "E"].map(|n| insert_named(&conn, n, true));

        let workout_id = create(&conn, user, &fields("Push", [ids[0], ids[1], ids[2], ids[3]])).unwrap();
        let before: Vec<i64> = slots(&conn, workout_id).unwrap().iter().map(|r| r.id).collect();

        let mut edit = fields("Push v2", [ids[4], ids[1], ids[2], ids[3]]);
        edit.slots[3].reps = 20;
        update(&conn, workout_id, &edit).unwrap();

        let after = slots(&conn, workout_id).unwrap();
        let after_ids: Vec<i64> = after.iter().map(|r| r.id).collect();
        assert_eq!(before, after_ids);
        assert_eq!(after[0].exercise_name, "E");
        assert_eq!(after[3].reps, 20);
        assert_eq!(find(&conn, workout_id).unwrap().unwrap().name, "Push v2");
    }

    #[test]
    fn delete_cascades_to_slots() {
        let (_tmp, pool) = migrated_pool();
        let conn = pool.get().unwrap();
        let user = insert_plain(&conn, "alice", Roles::default());
        let ids = ["A", "B", "C", "D"].map(|n| insert_named(&conn, n, true));
        let workout_id = create(&conn, user, &fields("Legs", ids)).unwrap();

        assert!(delete(&conn, workout_id).unwrap());
        let remaining: i64 = conn
            .query_row("SELECT COUNT(*) FROM workout_exercises", [], |row| row.get(0))
            .unwrap();
        assert_eq!(remaining, 0);
    }

    #[test]
    fn list_for_creator_filters_by_owner_and_name() {
        let (_tmp, pool) = migrated_pool();
        let conn = pool.get().unwrap();
        let alice = insert_plain(&conn, "alice", Roles::default());
        let bob = insert_plain(&conn, "bob", Roles::default());
        let ids = ["A", "B", "C", "D"].map(|n| insert_named(&conn, n, true));
        create(&conn, alice, &fields("Jambes lourdes", ids)).unwrap();
        create(&conn, alice, &fields("Haut du corps", ids)).unwrap();
        create(&conn, bob, &fields("Jambes", ids)).unwrap();

        let mine = list_for_creator(&conn, alice, Some("jambes")).unwrap();
        assert_eq!(mine.len(), 1);
        assert_eq!(mine[0].0.name, "Jambes lourdes");
        assert_eq!(mine[0].1.len(), SLOT_COUNT);

        assert_eq!(list_for_creator(&conn, alice, None).unwrap().len(), 2);
    }
}
