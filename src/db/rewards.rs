use rusqlite::{params, Connection, Row};

use crate::db::models::{Badge, Challenge, UserBadgeProgress};
use crate::db::optional;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BadgeFields {
    pub name: String,
    pub category: String,
    pub code: String,
    pub description: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChallengeFields {
    pub name: String,
    /// `YYYY-MM-DD HH:MM:SS`, UTC, so it compares with `datetime('now')`.
    pub deadline: String,
    pub badge_ids: Vec<i64>,
}

fn badge_from_row(row: &Row<'_>) -> rusqlite::Result<Badge> {
    Ok(Badge {
        id: row.get(0)?,
        name: row.get(1)?,
        category: row.get(2)?,
        code: row.get(3)?,
        description: row.get(4)?,
    })
}

fn challenge_from_row(row: &Row<'_>) -> rusqlite::Result<Challenge> {
    Ok(Challenge {
        id: row.get(0)?,
        name: row.get(1)?,
        deadline: row.get(2)?,
    })
}

// -- Badges --

pub fn insert_badge(conn: &Connection, fields: &BadgeFields) -> rusqlite::Result<i64> {
    conn.execute(
        "INSERT INTO badges (name, category, code, description) VALUES (?1, ?2, ?3, ?4)",
        params![fields.name, fields.category, fields.code, fields.description],
    )?;
    Ok(conn.last_insert_rowid())
}

pub fn badge_code_taken(conn: &Connection, code: &str) -> rusqlite::Result<bool> {
    conn.query_row(
        "SELECT COUNT(*) > 0 FROM badges WHERE code = ?1",
        params![code],
        |row| row.get(0),
    )
}

pub fn badges(conn: &Connection) -> rusqlite::Result<Vec<Badge>> {
    let mut stmt = conn.prepare(
        "SELECT id, name, category, code, description FROM badges ORDER BY category, name",
    )?;
    let badges = stmt
        .query_map([], badge_from_row)?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(badges)
}

pub fn badge_exists(conn: &Connection, id: i64) -> rusqlite::Result<bool> {
    conn.query_row(
        "SELECT COUNT(*) > 0 FROM badges WHERE id = ?1",
        params![id],
        |row| row.get(0),
    )
}

// -- Challenges --

/// Persist the challenge, then one link row per badge.
pub fn insert_challenge(conn: &Connection, fields: &ChallengeFields) -> rusqlite::Result<i64> {
    let tx = conn.unchecked_transaction()?;
    tx.execute(
        "INSERT INTO challenges (name, deadline) VALUES (?1, ?2)",
        params![fields.name, fields.deadline],
    )?;
    let challenge_id = tx.last_insert_rowid();

    for badge_id in &fields.badge_ids {
        tx.execute(
            "INSERT INTO challenge_badges (challenge_id, badge_id) VALUES (?1, ?2)",
            params![challenge_id, badge_id],
        )?;
    }

    tx.commit()?;
    Ok(challenge_id)
}

pub fn find_challenge(conn: &Connection, id: i64) -> rusqlite::Result<Option<Challenge>> {
    optional(conn.query_row(
        "SELECT id, name, deadline FROM challenges WHERE id = ?1",
        params![id],
        challenge_from_row,
    ))
}

/// Challenges whose deadline has not passed, soonest first.
pub fn active_challenges(conn: &Connection) -> rusqlite::Result<Vec<Challenge>> {
    let mut stmt = conn.prepare(
        "SELECT id, name, deadline FROM challenges \
         WHERE deadline >= datetime('now') ORDER BY deadline",
    )?;
    let challenges = stmt
        .query_map([], challenge_from_row)?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(challenges)
}

pub fn challenge_badges(conn: &Connection, challenge_id: i64) -> rusqlite::Result<Vec<Badge>> {
    let mut stmt = conn.prepare(
        "SELECT b.id, b.name, b.category, b.code, b.description FROM badges b \
         JOIN challenge_badges cb ON cb.badge_id = b.id \
         WHERE cb.challenge_id = ?1 ORDER BY b.name",
    )?;
    let badges = stmt
        .query_map(params![challenge_id], badge_from_row)?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(badges)
}

// -- Progress --

/// Completed progress rows for the user within this challenge.
pub fn completed_count(conn: &Connection, user_id: i64, challenge_id: i64) -> rusqlite::Result<i64> {
    conn.query_row(
        "SELECT COUNT(*) FROM user_badge_progress \
         WHERE user_id = ?1 AND challenge_id = ?2 AND is_complete = 1",
        params![user_id, challenge_id],
        |row| row.get(0),
    )
}

/// Mark one badge of a challenge as done for the user. Returns the row.
pub fn record_completion(
    conn: &Connection,
    user_id: i64,
    challenge_id: i64,
    badge_id: i64,
) -> rusqlite::Result<UserBadgeProgress> {
    conn.execute(
        "INSERT INTO user_badge_progress (user_id, badge_id, challenge_id, is_complete, completed_at) \
         VALUES (?1, ?2, ?3, 1, datetime('now')) \
         ON CONFLICT(user_id, badge_id, challenge_id) DO UPDATE SET \
           is_complete = 1, \
           completed_at = COALESCE(user_badge_progress.completed_at, excluded.completed_at)",
        params![user_id, badge_id, challenge_id],
    )?;
    conn.query_row(
        "SELECT id, user_id, badge_id, challenge_id, is_complete, completed_at \
         FROM user_badge_progress WHERE user_id = ?1 AND badge_id = ?2 AND challenge_id = ?3",
        params![user_id, badge_id, challenge_id],
        |row| {
            Ok(UserBadgeProgress {
                id: row.get(0)?,
                user_id: row.get(1)?,
                badge_id: row.get(2)?,
                challenge_id: row.get(3)?,
                is_complete: row.get(4)?,
                completed_at: row.get(5)?,
            })
        },
    )
}

#[cfg(test)]
pub(crate) fn insert_badge_named(conn: &Connection, name: &str) -> i64 {
    insert_badge(
        conn,
        &BadgeFields {
            name: name.to_string(),
            category: "Force".into(),
            code: crate::forms::slugify(name),
            description: String::new(),
        },
    )
    .unwrap()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::test_support::migrated_pool;
    use crate::db::users::{insert_plain, Roles};
    use crate::progress::challenge_complete;

    #[test]
    fn challenge_links_every_selected_badge() {
        let (_tmp, pool) = migrated_pool();
        let conn = pool.get().unwrap();
        let a = insert_badge_named(&conn, "Centurion");
        let b = insert_badge_named(&conn, "Marathon");

        let id = insert_challenge(
            &conn,
            &ChallengeFields {
                name: "Printemps".into(),
                deadline: "2999-01-01 00:00:00".into(),
                badge_ids: vec![a, b],
            },
        )
        .unwrap();

        let linked: Vec<String> = challenge_badges(&conn, id)
            .unwrap()
            .into_iter()
            .map(|b| b.name)
            .collect();
        assert_eq!(linked, vec!["Centurion", "Marathon"]);
    }

    #[test]
    fn expired_challenges_are_not_active() {
        let (_tmp, pool) = migrated_pool();
        let conn = pool.get().unwrap();
        for (name, deadline) in [
            ("Passé", "2000-01-01 00:00:00"),
            ("Lointain", "2999-06-01 00:00:00"),
            ("Proche", "2999-01-01 00:00:00"),
        ] {
            insert_challenge(
                &conn,
                &ChallengeFields {
                    name: name.into(),
                    deadline: deadline.into(),
                    badge_ids: Vec::new(),
                },
            )
            .unwrap();
        }

        let names: Vec<String> = active_challenges(&conn)
            .unwrap()
            .into_iter()
            .map(|c| c.name)
            .collect();
        assert_eq!(names, vec!["Proche", "Lointain"]);
    }

    #[test]
    fn completion_counts_drive_challenge_state() {
        let (_tmp, pool) = migrated_pool();
        let conn = pool.get().unwrap();
        let user = insert_plain(&conn, "alice", Roles::default());
        let a = insert_badge_named(&conn, "Un");
        let b = insert_badge_named(&conn, "Deux");
        let challenge = insert_challenge(
            &conn,
            &ChallengeFields {
                name: "Duo".into(),
                deadline: "2999-01-01 00:00:00".into(),
                badge_ids: vec![a, b],
            },
        )
        .unwrap();
        let total = challenge_badges(&conn, challenge).unwrap().len() as i64;

        record_completion(&conn, user, challenge, a).unwrap();
        let done = completed_count(&conn, user, challenge).unwrap();
        assert!(!challenge_complete(done, total));

        // Recording twice is a no-op
        let first = record_completion(&conn, user, challenge, b).unwrap();
        let again = record_completion(&conn, user, challenge, b).unwrap();
        assert_eq!(first.id, again.id);
        assert_eq!(first.completed_at, again.completed_at);

        let done = completed_count(&conn, user, challenge).unwrap();
        assert!(challenge_complete(done, total));
    }

    #[test]
    fn badge_codes_are_unique() {
        let (_tmp, pool) = migrated_pool();
        let conn = pool.get().unwrap();
        insert_badge_named(&conn, "Lève-tôt");
        assert!(badge_code_taken(&conn, "leve-tot").unwrap());
        assert!(!badge_code_taken(&conn, "couche-tard").unwrap());
    }
}
