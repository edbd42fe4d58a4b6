use crate::domain;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};
use validator::Validate;

/// Query parameters for the analytics endpoint
#[derive(Deserialize, Validate, IntoParams, Debug, Default)]
#[into_params(parameter_in = Query)]
pub struct AnalyticsQuery {
    /// How many days of daily stats to return, counting back from today. Defaults to 7.
    #[validate(range(min = 1, max = 90))]
    pub days: Option<u32>,
}

impl AnalyticsQuery {
    pub fn window_days(&self) -> u32 {
        self.days.unwrap_or(domain::analytics::DEFAULT_WINDOW_DAYS)
    }
}

#[derive(Serialize, Deserialize, ToSchema, Debug, Clone, PartialEq, Eq)]
pub struct TaskStats {
    #[schema(example = 12)]
    pub total_tasks: u32,
    #[schema(example = 9)]
    pub completed_tasks: u32,
    #[schema(example = 3)]
    pub active_tasks: u32,
    /// Rounded percentage of tasks which are complete
    #[schema(example = 75)]
    pub completion_rate: u32,
    #[schema(example = 2)]
    pub recurring_tasks: u32,
}

impl From<domain::analytics::TaskStats> for TaskStats {
    fn from(value: domain::analytics::TaskStats) -> Self {
        TaskStats {
            total_tasks: value.total_tasks,
            completed_tasks: value.completed_tasks,
            active_tasks: value.active_tasks,
            completion_rate: value.completion_rate,
            recurring_tasks: value.recurring_tasks,
        }
    }
}

#[derive(Serialize, Deserialize, ToSchema, Debug, Clone, PartialEq, Eq)]
pub struct CategoryStats {
    #[schema(example = "Work")]
    pub category: String,
    pub total: u32,
    pub completed: u32,
    #[schema(example = 50)]
    pub percentage: u32,
}

impl From<domain::analytics::CategoryStats> for CategoryStats {
    fn from(value: domain::analytics::CategoryStats) -> Self {
        CategoryStats {
            category: value.category,
            total: value.total,
            completed: value.completed,
            percentage: value.percentage,
        }
    }
}

#[derive(Serialize, Deserialize, ToSchema, Debug, Clone, PartialEq, Eq)]
pub struct DailyStats {
    pub date: NaiveDate,
    pub completed: u32,
    pub total: u32,
}

impl From<domain::analytics::DailyStats> for DailyStats {
    fn from(value: domain::analytics::DailyStats) -> Self {
        DailyStats {
            date: value.date,
            completed: value.completed,
            total: value.total,
        }
    }
}

#[derive(Serialize, Deserialize, ToSchema, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ProductivityTrend {
    Improving,
    Stable,
    Declining,
}

impl From<domain::analytics::ProductivityTrend> for ProductivityTrend {
    fn from(value: domain::analytics::ProductivityTrend) -> Self {
        match value {
            domain::analytics::ProductivityTrend::Improving => Self::Improving,
            domain::analytics::ProductivityTrend::Stable => Self::Stable,
            domain::analytics::ProductivityTrend::Declining => Self::Declining,
        }
    }
}

/// Aggregated view of a user's tasks. Generated instances of recurring tasks aren't counted.
#[derive(Serialize, Deserialize, ToSchema, Debug, Clone, PartialEq, Eq)]
pub struct TaskAnalytics {
    pub task_stats: TaskStats,
    pub categories: Vec<CategoryStats>,
    /// One entry per day in the requested window, oldest first
    pub daily: Vec<DailyStats>,
    pub trend: ProductivityTrend,
}

impl From<domain::analytics::TaskAnalytics> for TaskAnalytics {
    fn from(value: domain::analytics::TaskAnalytics) -> Self {
        TaskAnalytics {
            task_stats: value.task_stats.into(),
            categories: value.categories.into_iter().map(CategoryStats::from).collect(),
            daily: value.daily.into_iter().map(DailyStats::from).collect(),
            trend: value.trend.into(),
        }
    }
}
