use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: i64,
    pub username: String,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub height_cm: Option<f64>,
    pub weight_kg: Option<f64>,
    pub sex: Option<Sex>,
    pub birth_date: Option<String>,
    pub avatar: Option<String>,
    pub is_staff: bool,
    pub is_superuser: bool,
    pub is_active: bool,
    pub last_login: Option<String>,
    pub date_joined: String,
}

impl User {
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
            .trim()
            .to_string()
    }

    pub fn is_privileged(&self) -> bool {
        self.is_staff || self.is_superuser
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Sex {
    #[serde(rename = "M")]
    Male,
    #[serde(rename = "F")]
    Female,
    #[serde(rename = "O")]
    Other,
}

impl Sex {
    pub const ALL: [Sex; 3] = [Sex::Male, Sex::Female, Sex::Other];

    pub fn code(self) -> &'static str {
        match self {
            Sex::Male => "M",
            Sex::Female => "F",
            Sex::Other => "O",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Sex::Male => "Homme",
            Sex::Female => "Femme",
            Sex::Other => "Autre",
        }
    }

    pub fn from_code(code: &str) -> Option<Self> {
        Sex::ALL.into_iter().find(|s| s.code() == code)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MuscleGroup {
    pub id: i64,
    pub name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Exercise {
    pub id: i64,
    pub name: String,
    pub muscle_group_id: i64,
    pub muscle_group: String,
    pub suggested_sets: i64,
    pub suggested_reps: i64,
    pub description: String,
    pub image: Option<String>,
    pub is_approved: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Workout {
    pub id: i64,
    pub name: String,
    pub created_at: String,
    pub creator_id: i64,
}

/// One slot of a workout, joined with the exercise it points at.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkoutExercise {
    pub id: i64,
    pub workout_id: i64,
    pub exercise_id: i64,
    pub exercise_name: String,
    pub sets: i64,
    pub reps: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Badge {
    pub id: i64,
    pub name: String,
    pub category: String,
    pub code: String,
    pub description: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Challenge {
    pub id: i64,
    pub name: String,
    pub deadline: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserBadgeProgress {
    pub id: i64,
    pub user_id: i64,
    pub badge_id: i64,
    pub challenge_id: i64,
    pub is_complete: bool,
    pub completed_at: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Statistics {
    pub user_id: i64,
    pub sets_done: i64,
    pub reps_done: i64,
    pub workouts_completed: i64,
    pub exercises_completed: i64,
    pub badges_earned: i64,
}

/// A leaderboard source row: statistics joined with the owner's username.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatisticsRow {
    pub username: String,
    pub stats: Statistics,
}
