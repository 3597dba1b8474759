use crate::db::models::StatisticsRow;

/// Leaderboard orderings. The query-string names are the public ones.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortKey {
    #[default]
    BadgesEarned,
    RepsDone,
    SetsDone,
    WorkoutsCompleted,
    ExercisesCompleted,
}

impl SortKey {
    pub const ALL: [SortKey; 5] = [
        SortKey::BadgesEarned,
        SortKey::RepsDone,
        SortKey::SetsDone,
        SortKey::WorkoutsCompleted,
        SortKey::ExercisesCompleted,
    ];

    /// Parse the `sort` query parameter. Anything unknown means badges.
    pub fn parse(raw: Option<&str>) -> Self {
        raw.and_then(|value| Self::ALL.into_iter().find(|k| k.query_name() == value))
            .unwrap_or_default()
    }

    pub fn query_name(self) -> &'static str {
        match self {
            SortKey::BadgesEarned => "badges_obtenus",
            SortKey::RepsDone => "reps_effectuees",
            SortKey::SetsDone => "sets_effectues",
            SortKey::WorkoutsCompleted => "entrainements_completes",
            SortKey::ExercisesCompleted => "exercices_completes",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            SortKey::BadgesEarned => "Badges obtenus",
            SortKey::RepsDone => "Répétitions",
            SortKey::SetsDone => "Séries",
            SortKey::WorkoutsCompleted => "Entraînements",
            SortKey::ExercisesCompleted => "Exercices",
        }
    }

    /// Column of the `statistics` table this key orders by.
    pub fn column(self) -> &'static str {
        match self {
            SortKey::BadgesEarned => "badges_earned",
            SortKey::RepsDone => "reps_done",
            SortKey::SetsDone => "sets_done",
            SortKey::WorkoutsCompleted => "workouts_completed",
            SortKey::ExercisesCompleted => "exercises_completed",
        }
    }
}

#[derive(Debug, Clone)]
pub struct RankedEntry {
    pub rank: usize,
    pub username: String,
    pub sets_done: i64,
    pub reps_done: i64,
    pub workouts_completed: i64,
    pub exercises_completed: i64,
    pub badges_earned: i64,
}

/// Number rows 1, 2, 3... in the order given. Equal scores still get distinct
/// ranks.
pub fn rank(rows: Vec<StatisticsRow>) -> Vec<RankedEntry> {
    rows.into_iter()
        .enumerate()
        .map(|(i, row)| RankedEntry {
            rank: i + 1,
            username: row.username,
            sets_done: row.stats.sets_done,
            reps_done: row.stats.reps_done,
            workouts_completed: row.stats.workouts_completed,
            exercises_completed: row.stats.exercises_completed,
            badges_earned: row.stats.badges_earned,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::models::Statistics;

    fn row(name: &str, badges: i64) -> StatisticsRow {
        StatisticsRow {
            username: name.into(),
            stats: Statistics {
                badges_earned: badges,
                ..Statistics::default()
            },
        }
    }

    #[test]
    fn unknown_sort_keys_fall_back_to_badges() {
        for raw in [None, Some(""), Some("id"), Some("-badges_obtenus"), Some("BADGES_OBTENUS")] {
            assert_eq!(SortKey::parse(raw), SortKey::BadgesEarned, "{raw:?}");
        }
    }

    #[test]
    fn known_sort_keys_parse() {
        for key in SortKey::ALL {
            assert_eq!(SortKey::parse(Some(key.query_name())), key);
        }
    }

    #[test]
    fn rank_is_positional_even_on_ties() {
        let ranked = rank(vec![row("a", 5), row("b", 5), row("c", 5), row("d", 1)]);
        let ranks: Vec<usize> = ranked.iter().map(|r| r.rank).collect();
        assert_eq!(ranks, vec![1, 2, 3, 4]);
        assert_eq!(ranked[3].username, "d");
    }

    #[test]
    fn rank_of_nothing_is_empty() {
        assert!(rank(Vec::new()).is_empty());
    }
}
