use rusqlite::Connection;

use crate::db::exercises::{self, ExerciseFields};
use crate::db::models::Exercise;
use crate::forms::{FormData, FormErrors, Validator, INVALID_CHOICE};

pub const NAME: &str = "nom";
pub const MUSCLE_GROUP: &str = "groupe_musculaire";
pub const SUGGESTED_SETS: &str = "series_sugg";
pub const SUGGESTED_REPS: &str = "reps_sugg";
pub const DESCRIPTION: &str = "description";
pub const IMAGE: &str = "image";

/// Outer error is the database, inner error is the user's input.
pub fn validate(
    conn: &Connection,
    data: &FormData,
) -> rusqlite::Result<Result<ExerciseFields, FormErrors>> {
    let mut v = Validator::new(data);
    let name = v.required(NAME, 100);
    let muscle_group_id = v.choice_id(MUSCLE_GROUP);
    if !v.has_error(MUSCLE_GROUP) && !exercises::muscle_group_exists(conn, muscle_group_id)? {
        v.error(MUSCLE_GROUP, INVALID_CHOICE);
    }
    let suggested_sets = v.integer(SUGGESTED_SETS, 1);
    let suggested_reps = v.integer(SUGGESTED_REPS, 1);
    let description = v.text(DESCRIPTION, 2000);
    let image = v.optional(IMAGE, 255);

    Ok(v.finish(ExerciseFields {
        name,
        muscle_group_id,
        suggested_sets,
        suggested_reps,
        description,
        image,
    }))
}

/// Form values pre-filled from an existing exercise (moderation review).
pub fn initial(exercise: &Exercise) -> FormData {
    FormData::from_pairs([
        (NAME, exercise.name.clone()),
        (MUSCLE_GROUP, exercise.muscle_group_id.to_string()),
        (SUGGESTED_SETS, exercise.suggested_sets.to_string()),
        (SUGGESTED_REPS, exercise.suggested_reps.to_string()),
        (DESCRIPTION, exercise.description.clone()),
        (IMAGE, exercise.image.clone().unwrap_or_default()),
    ])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::test_support::migrated_pool;

    #[test]
    fn valid_submission_is_cleaned() {
        let (_tmp, pool) = migrated_pool();
        let conn = pool.get().unwrap();
        let data = FormData::from_pairs([
            (NAME, " Soulevé de terre "),
            (MUSCLE_GROUP, "2"),
            (SUGGESTED_SETS, "5"),
            (SUGGESTED_REPS, "5"),
        ]);

        let fields = validate(&conn, &data).unwrap().unwrap();
        assert_eq!(fields.name, "Soulevé de terre");
        assert_eq!(fields.muscle_group_id, 2);
        assert_eq!(fields.description, "");
        assert_eq!(fields.image, None);
    }

    #[test]
    fn unknown_muscle_group_is_rejected() {
        let (_tmp, pool) = migrated_pool();
        let conn = pool.get().unwrap();
        let data = FormData::from_pairs([
            (NAME, "Curl"),
            (MUSCLE_GROUP, "999"),
            (SUGGESTED_SETS, "3"),
            (SUGGESTED_REPS, "12"),
        ]);

        let errors = validate(&conn, &data).unwrap().unwrap_err();
        assert_eq!(errors.get(MUSCLE_GROUP), [INVALID_CHOICE.to_string()]);
    }
}
