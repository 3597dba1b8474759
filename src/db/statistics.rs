use rusqlite::{params, Connection, Row};

use crate::db::models::{Statistics, StatisticsRow};
use crate::leaderboard::SortKey;
use crate::progress::WorkoutTotals;

const STATS_COLUMNS: &str =
    "s.user_id, s.sets_done, s.reps_done, s.workouts_completed, s.exercises_completed, s.badges_earned";

fn from_row(row: &Row<'_>) -> rusqlite::Result<Statistics> {
    Ok(Statistics {
        user_id: row.get(0)?,
        sets_done: row.get(1)?,
        reps_done: row.get(2)?,
        workouts_completed: row.get(3)?,
        exercises_completed: row.get(4)?,
        badges_earned: row.get(5)?,
    })
}

fn ensure(conn: &Connection, user_id: i64) -> rusqlite::Result<()> {
    conn.execute(
        "INSERT OR IGNORE INTO statistics (user_id) VALUES (?1)",
        params![user_id],
    )?;
    Ok(())
}

/// The user's statistics, created with zero totals on first access.
pub fn get_or_create(conn: &Connection, user_id: i64) -> rusqlite::Result<Statistics> {
    ensure(conn, user_id)?;
    conn.query_row(
        &format!("SELECT {STATS_COLUMNS} FROM statistics s WHERE s.user_id = ?1"),
        params![user_id],
        from_row,
    )
}

/// Add a completed workout to the user's totals. Every call adds again.
/// Totals saturate rather than overflow.
pub fn add_workout(
    conn: &Connection,
    user_id: i64,
    totals: &WorkoutTotals,
) -> rusqlite::Result<Statistics> {
    let tx = conn.unchecked_transaction()?;
    let current = get_or_create(&tx, user_id)?;
    let stats = Statistics {
        sets_done: current.sets_done.saturating_add(totals.sets),
        reps_done: current.reps_done.saturating_add(totals.reps),
        workouts_completed: current.workouts_completed.saturating_add(totals.workouts),
        exercises_completed: current.exercises_completed.saturating_add(totals.exercises),
        ..current
    };
    tx.execute(
        "UPDATE statistics SET sets_done = ?1, reps_done = ?2, \
         workouts_completed = ?3, exercises_completed = ?4 WHERE user_id = ?5",
        params![
            stats.sets_done,
            stats.reps_done,
            stats.workouts_completed,
            stats.exercises_completed,
            user_id
        ],
    )?;
    tx.commit()?;
    Ok(stats)
}

/// Every statistics row, best first by `key`. Ties keep whatever order the
/// database returns.
pub fn ordered_by(conn: &Connection, key: SortKey) -> rusqlite::Result<Vec<StatisticsRow>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {STATS_COLUMNS}, u.username FROM statistics s \
         JOIN users u ON u.id = s.user_id ORDER BY s.{} DESC",
        key.column()
    ))?;
    let rows = stmt
        .query_map([], |row| {
            Ok(StatisticsRow {
                stats: from_row(row)?,
                username: row.get(6)?,
            })
        })?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(rows)
}
