use crate::domain;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use validator::Validate;

/// DTO for a user's points and streak counters
#[derive(Serialize, Deserialize, ToSchema, Debug, Clone, PartialEq, Eq)]
pub struct UserStats {
    #[schema(example = 4)]
    pub user_id: i32,
    #[schema(example = 42)]
    pub total_points: i32,
    #[schema(example = 3)]
    pub current_streak: i32,
    #[schema(example = 5)]
    pub longest_streak: i32,
    pub last_active_date: Option<NaiveDate>,
    #[schema(example = 2)]
    pub todos_completed_today: i32,
    #[schema(example = 18)]
    pub total_todos_completed: i32,
}

impl From<domain::stats::UserStats> for UserStats {
    fn from(value: domain::stats::UserStats) -> Self {
        UserStats {
            user_id: value.user_id,
            total_points: value.total_points,
            current_streak: value.current_streak,
            longest_streak: value.longest_streak,
            last_active_date: value.last_active_date,
            todos_completed_today: value.todos_completed_today,
            total_todos_completed: value.total_todos_completed,
        }
    }
}

/// DTO for manually adjusting a user's stats. Omitted fields are left alone.
#[derive(Serialize, Deserialize, Validate, ToSchema, Debug, Clone, Default)]
pub struct UpdateStats {
    #[serde(default)]
    #[validate(range(min = 0))]
    pub total_points: Option<i32>,
    #[serde(default)]
    #[validate(range(min = 0))]
    pub current_streak: Option<i32>,
    #[serde(default)]
    #[validate(range(min = 0))]
    pub longest_streak: Option<i32>,
    #[serde(default)]
    pub last_active_date: Option<NaiveDate>,
    #[serde(default)]
    #[validate(range(min = 0))]
    pub todos_completed_today: Option<i32>,
    #[serde(default)]
    #[validate(range(min = 0))]
    pub total_todos_completed: Option<i32>,
}

impl From<UpdateStats> for domain::stats::UpdateStats {
    fn from(value: UpdateStats) -> Self {
        domain::stats::UpdateStats {
            total_points: value.total_points,
            current_streak: value.current_streak,
            longest_streak: value.longest_streak,
            last_active_date: value.last_active_date,
            todos_completed_today: value.todos_completed_today,
            total_todos_completed: value.total_todos_completed,
        }
    }
}
