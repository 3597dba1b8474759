use rusqlite::types::Value;
use rusqlite::{params, params_from_iter, Connection, Row};

use crate::db::models::{Exercise, MuscleGroup};
use crate::db::{contains_pattern, optional};

const EXERCISE_SELECT: &str = "SELECT e.id, e.name, e.muscle_group_id, g.name, e.suggested_sets, \
     e.suggested_reps, e.description, e.image, e.is_approved \
     FROM exercises e JOIN muscle_groups g ON g.id = e.muscle_group_id";

#[derive(Debug, Clone, PartialEq)]
pub struct ExerciseFields {
    pub name: String,
    pub muscle_group_id: i64,
    pub suggested_sets: i64,
    pub suggested_reps: i64,
    pub description: String,
    pub image: Option<String>,
}

/// Bank filters. Both are optional and combine with AND.
#[derive(Debug, Clone, Default)]
pub struct BankFilter<'a> {
    pub search: Option<&'a str>,
    pub muscle_group_id: Option<i64>,
}

fn from_row(row: &Row<'_>) -> rusqlite::Result<Exercise> {
    Ok(Exercise {
        id: row.get(0)?,
        name: row.get(1)?,
        muscle_group_id: row.get(2)?,
        muscle_group: row.get(3)?,
        suggested_sets: row.get(4)?,
        suggested_reps: row.get(5)?,
        description: row.get(6)?,
        image: row.get(7)?,
        is_approved: row.get(8)?,
    })
}

pub fn muscle_groups(conn: &Connection) -> rusqlite::Result<Vec<MuscleGroup>> {
    let mut stmt = conn.prepare("SELECT id, name FROM muscle_groups ORDER BY id")?;
    let groups = stmt
        .query_map([], |row| {
            Ok(MuscleGroup {
                id: row.get(0)?,
                name: row.get(1)?,
            })
        })?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(groups)
}

pub fn muscle_group_exists(conn: &Connection, id: i64) -> rusqlite::Result<bool> {
    conn.query_row(
        "SELECT COUNT(*) > 0 FROM muscle_groups WHERE id = ?1",
        params![id],
        |row| row.get(0),
    )
}

pub fn insert(conn: &Connection, fields: &ExerciseFields, approved: bool) -> rusqlite::Result<i64> {
    conn.execute(
        "INSERT INTO exercises (name, muscle_group_id, suggested_sets, suggested_reps, \
         description, image, is_approved) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
        params![
            fields.name,
            fields.muscle_group_id,
            fields.suggested_sets,
            fields.suggested_reps,
            fields.description,
            fields.image,
            approved,
        ],
    )?;
    Ok(conn.last_insert_rowid())
}

/// Overwrite a pending exercise with the reviewed values and approve it.
pub fn approve(conn: &Connection, id: i64, fields: &ExerciseFields) -> rusqlite::Result<()> {
    conn.execute(
        "UPDATE exercises SET name = ?1, muscle_group_id = ?2, suggested_sets = ?3, \
         suggested_reps = ?4, description = ?5, image = ?6, is_approved = 1 WHERE id = ?7",
        params![
            fields.name,
            fields.muscle_group_id,
            fields.suggested_sets,
            fields.suggested_reps,
            fields.description,
            fields.image,
            id,
        ],
    )?;
    Ok(())
}

pub fn delete(conn: &Connection, id: i64) -> rusqlite::Result<bool> {
    let rows = conn.execute("DELETE FROM exercises WHERE id = ?1", params![id])?;
    Ok(rows > 0)
}

pub fn find(conn: &Connection, id: i64) -> rusqlite::Result<Option<Exercise>> {
    optional(conn.query_row(
        &format!("{EXERCISE_SELECT} WHERE e.id = ?1"),
        params![id],
        from_row,
    ))
}

/// Head of the moderation queue: the oldest exercise still waiting for approval.
pub fn first_pending(conn: &Connection) -> rusqlite::Result<Option<Exercise>> {
    optional(conn.query_row(
        &format!("{EXERCISE_SELECT} WHERE e.is_approved = 0 ORDER BY e.id LIMIT 1"),
        [],
        from_row,
    ))
}

pub fn pending_count(conn: &Connection) -> rusqlite::Result<i64> {
    conn.query_row(
        "SELECT COUNT(*) FROM exercises WHERE is_approved = 0",
        [],
        |row| row.get(0),
    )
}

pub fn is_approved(conn: &Connection, id: i64) -> rusqlite::Result<bool> {
    conn.query_row(
        "SELECT COUNT(*) > 0 FROM exercises WHERE id = ?1 AND is_approved = 1",
        params![id],
        |row| row.get(0),
    )
}

/// Approved exercises, narrowed by the bank filters.
pub fn bank(conn: &Connection, filter: &BankFilter<'_>) -> rusqlite::Result<Vec<Exercise>> {
    let mut sql = format!("{EXERCISE_SELECT} WHERE e.is_approved = 1");
    let mut values: Vec<Value> = Vec::new();

    if let Some(search) = filter.search.filter(|s| !s.is_empty()) {
        values.push(Value::Text(contains_pattern(search)));
        sql.push_str(&format!(" AND e.name LIKE ?{} ESCAPE '\\'", values.len()));
    }
    if let Some(group) = filter.muscle_group_id {
        values.push(Value::Integer(group));
        sql.push_str(&format!(" AND e.muscle_group_id = ?{}", values.len()));
    }
    sql.push_str(" ORDER BY e.name");

    let mut stmt = conn.prepare(&sql)?;
    let exercises = stmt
        .query_map(params_from_iter(values), from_row)?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(exercises)
}

#[cfg(test)]
pub(crate) fn insert_named(conn: &Connection, name: &str, approved: bool) -> i64 {
    let fields = ExerciseFields {
        name: name.to_string(),
        muscle_group_id: 1,
        suggested_sets: 3,
        suggested_reps: 10,
        description: String::new(),
        image: None,
    };
    insert(conn, &fields, approved).unwrap()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::test_support::migrated_pool;

    #[test]
    fn bank_only_lists_approved_exercises() {
        let (_tmp, pool) = migrated_pool();
        let conn = pool.get().unwrap();
        insert_named(&conn, "Back Squat", true);
        insert_named(&conn, "Front squat", false);
        insert_named(&conn, "Bench press", true);

        let names: Vec<String> = bank(
            &conn,
            &BankFilter {
                search: Some("squat"),
                muscle_group_id: None,
            },
        )
        .unwrap()
        .into_iter()
        .map(|e| e.name)
        .collect();
        assert_eq!(names, vec!["Back Squat"]);
    }

    #[test]
    fn bank_filters_are_conjunctive() {
        let (_tmp, pool) = migrated_pool();
        let conn = pool.get().unwrap();
        insert_named(&conn, "Pompes", true);
        let mut fields = ExerciseFields {
            name: "Pompes diamant".into(),
            muscle_group_id: 5,
            suggested_sets: 3,
            suggested_reps: 12,
            description: String::new(),
            image: None,
        };
        insert(&conn, &fields, true).unwrap();
        fields.name = "Dips".into();
        insert(&conn, &fields, true).unwrap();

        let both = bank(
            &conn,
            &BankFilter {
                search: Some("pompes"),
                muscle_group_id: Some(5),
            },
        )
        .unwrap();
        assert_eq!(both.len(), 1);
        assert_eq!(both[0].name, "Pompes diamant");

        let group_only = bank(
            &conn,
            &BankFilter {
                search: None,
                muscle_group_id: Some(5),
            },
        )
        .unwrap();
        assert_eq!(group_only.len(), 2);
    }

    #[test]
    fn queue_head_is_oldest_pending() {
        let (_tmp, pool) = migrated_pool();
        let conn = pool.get().unwrap();
        insert_named(&conn, "Approved", true);
        let first = insert_named(&conn, "Pending one", false);
        insert_named(&conn, "Pending two", false);

        assert_eq!(pending_count(&conn).unwrap(), 2);
        assert_eq!(first_pending(&conn).unwrap().unwrap().id, first);

        delete(&conn, first).unwrap();
        assert_eq!(
            first_pending(&conn).unwrap().unwrap().name,
            "Pending two"
        );
    }

    #[test]
    fn approve_makes_exercise_visible() {
        let (_tmp, pool) = migrated_pool();
        let conn = pool.get().unwrap();
        let id = insert_named(&conn, "Tirage", false);
        let fields = ExerciseFields {
            name: "Tirage vertical".into(),
            muscle_group_id: 2,
            suggested_sets: 4,
            suggested_reps: 8,
            description: "Dos large".into(),
            image: None,
        };
        approve(&conn, id, &fields).unwrap();

        let exercise = find(&conn, id).unwrap().unwrap();
        assert!(exercise.is_approved);
        assert_eq!(exercise.name, "Tirage vertical");
        assert!(is_approved(&conn, id).unwrap());
        assert_eq!(pending_count(&conn).unwrap(), 0);
    }
}
