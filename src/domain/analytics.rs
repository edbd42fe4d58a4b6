use crate::domain;
use crate::domain::clock::Clock;
use crate::domain::task::Task;
use crate::domain::task::driven_ports::TaskReader;
use crate::domain::task::driving_ports::TaskError;
use crate::external_connections::ExternalConnectivity;
use chrono::{Days, NaiveDate};
use std::collections::BTreeMap;

/// Default number of days covered by the daily breakdown
pub const DEFAULT_WINDOW_DAYS: u32 = 7;
const TREND_WINDOW_DAYS: u32 = 14;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskStats {
    pub total_tasks: u32,
    pub completed_tasks: u32,
    pub active_tasks: u32,
    /// Rounded percentage of top-level tasks that are completed
    pub completion_rate: u32,
    pub recurring_tasks: u32,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CategoryStats {
    pub category: String,
    pub total: u32,
    pub completed: u32,
    pub percentage: u32,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DailyStats {
    pub date: NaiveDate,
    pub completed: u32,
    pub total: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProductivityTrend {
    Improving,
    Stable,
    Declining,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskAnalytics {
    pub task_stats: TaskStats,
    pub categories: Vec<CategoryStats>,
    pub daily: Vec<DailyStats>,
    pub trend: ProductivityTrend,
}

fn rounded_percent(part: u32, whole: u32) -> u32 {
    if whole == 0 {
        return 0;
    }

    (f64::from(part) * 100.0 / f64::from(whole)).round() as u32
}

fn top_level(tasks: &[Task]) -> impl Iterator<Item = &Task> {
    tasks.iter().filter(|task| !task.is_instance())
}

pub fn calculate_task_stats(tasks: &[Task]) -> TaskStats {
    let total_tasks = top_level(tasks).count() as u32;
    let completed_tasks = top_level(tasks).filter(|task| task.completed).count() as u32;

    TaskStats {
        total_tasks,
        completed_tasks,
        active_tasks: total_tasks - completed_tasks,
        completion_rate: rounded_percent(completed_tasks, total_tasks),
        recurring_tasks: top_level(tasks)
            .filter(|task| task.recurrence.is_recurring())
            .count() as u32,
    }
}

/// Per-category completion over top-level tasks, in order of each category's first appearance
pub fn calculate_category_stats(tasks: &[Task]) -> Vec<CategoryStats> {
    let mut categories: Vec<CategoryStats> = Vec::new();

    for task in top_level(tasks) {
        let position = match categories
            .iter()
            .position(|stats| stats.category == task.category)
        {
            Some(position) => position,
            None => {
                categories.push(CategoryStats {
                    category: task.category.clone(),
                    total: 0,
                    completed: 0,
                    percentage: 0,
                });
                categories.len() - 1
            }
        };

        let stats = &mut categories[position];
        stats.total += 1;
        if task.completed {
            stats.completed += 1;
        }
    }

    for stats in categories.iter_mut() {
        stats.percentage = rounded_percent(stats.completed, stats.total);
    }

    categories
}

/// Tasks bucketed by creation day over the [days] days ending on [today], oldest first
pub fn calculate_daily_stats(tasks: &[Task], days: u32, today: NaiveDate) -> Vec<DailyStats> {
    let mut buckets: BTreeMap<NaiveDate, DailyStats> = (0..days)
        .filter_map(|offset| today.checked_sub_days(Days::new(u64::from(offset))))
        .map(|date| {
            (date, DailyStats {
                date,
                completed: 0,
                total: 0,
            })
        })
        .collect();

    for task in tasks {
        if let Some(bucket) = buckets.get_mut(&task.created_at.date_naive()) {
            bucket.total += 1;
            if task.completed {
                bucket.completed += 1;
            }
        }
    }

    buckets.into_values().collect()
}

/// Compares the average daily completion ratio of the last week against the week before it
pub fn productivity_trend(tasks: &[Task], today: NaiveDate) -> ProductivityTrend {
    let daily = calculate_daily_stats(tasks, TREND_WINDOW_DAYS, today);
    if daily.len() < 2 {
        return ProductivityTrend::Stable;
    }

    let (first_week, second_week) = daily.split_at(daily.len().min(7));
    let first_rate = mean_completion_ratio(first_week);
    let second_rate = mean_completion_ratio(second_week);

    if second_rate > first_rate * 1.1 {
        ProductivityTrend::Improving
    } else if second_rate < first_rate * 0.9 {
        ProductivityTrend::Declining
    } else {
        ProductivityTrend::Stable
    }
}

fn mean_completion_ratio(days: &[DailyStats]) -> f64 {
    if days.is_empty() {
        return 0.0;
    }

    let ratio_sum: f64 = days
        .iter()
        .map(|day| {
            if day.total > 0 {
                f64::from(day.completed) / f64::from(day.total)
            } else {
                0.0
            }
        })
        .sum();

    ratio_sum / days.len() as f64
}

pub fn analyze(tasks: &[Task], days: u32, today: NaiveDate) -> TaskAnalytics {
    TaskAnalytics {
        task_stats: calculate_task_stats(tasks),
        categories: calculate_category_stats(tasks),
        daily: calculate_daily_stats(tasks, days, today),
        trend: productivity_trend(tasks, today),
    }
}

pub mod driving_ports {
    use super::*;
    use crate::domain::user::driven_ports::DetectUser;

    pub trait AnalyticsPort {
        async fn task_analytics(
            &self,
            user_id: i32,
            days: u32,
            ext_cxn: &mut impl ExternalConnectivity,
            clock: &impl Clock,
            u_detect: &impl DetectUser,
            task_read: &impl TaskReader,
        ) -> Result<TaskAnalytics, TaskError>;
    }
}

pub struct AnalyticsService;

impl driving_ports::AnalyticsPort for AnalyticsService {
    async fn task_analytics(
        &self,
        user_id: i32,
        days: u32,
        ext_cxn: &mut impl ExternalConnectivity,
        clock: &impl Clock,
        u_detect: &impl domain::user::driven_ports::DetectUser,
        task_read: &impl TaskReader,
    ) -> Result<TaskAnalytics, TaskError> {
        domain::user::ensure_owner_exists(user_id, &mut *ext_cxn, u_detect).await?;
        let tasks = task_read.tasks_for_user(user_id, &mut *ext_cxn).await?;

        Ok(analyze(&tasks, days, clock.today()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::analytics::driving_ports::AnalyticsPort;
    use crate::domain::recurrence::RecurrenceType;
    use crate::domain::task::test_util::{InMemoryTaskPersistence, task_fixture};
    use crate::domain::test_util::{FixedClock, date};
    use crate::domain::user::test_util::InMemoryUserPersistence;
    use crate::external_connections;
    use chrono::{TimeZone, Utc};
    use speculoos::prelude::*;
    use std::sync::RwLock;

    fn task(id: i32, category: &str, completed: bool, created: NaiveDate) -> Task {
        let mut task = task_fixture(id, 1, "Tracked");
        task.category = category.to_owned();
        task.completed = completed;
        task.created_at = Utc
            .from_utc_datetime(&created.and_hms_opt(10, 0, 0).expect("valid time"));
        task
    }

    #[test]
    fn task_stats_ignore_instances() {
        let mut recurring = task(1, "Health", true, date(2024, 5, 1));
        recurring.recurrence = RecurrenceType::Daily;
        let mut instance = task(2, "Health", false, date(2024, 5, 1));
        instance.parent_task_id = Some(1);
        let tasks = vec![
            recurring,
            instance,
            task(3, "Work", false, date(2024, 5, 1)),
            task(4, "Work", false, date(2024, 5, 1)),
        ];

        assert_eq!(
            TaskStats {
                total_tasks: 3,
                completed_tasks: 1,
                active_tasks: 2,
                completion_rate: 33,
                recurring_tasks: 1,
            },
            calculate_task_stats(&tasks)
        );
    }

    #[test]
    fn empty_task_list_has_zero_rate() {
        assert_eq!(0, calculate_task_stats(&[]).completion_rate);
    }

    #[test]
    fn categories_keep_first_seen_order() {
        let tasks = vec![
            task(1, "Work", true, date(2024, 5, 1)),
            task(2, "Study", false, date(2024, 5, 1)),
            task(3, "Work", false, date(2024, 5, 1)),
        ];

        let categories = calculate_category_stats(&tasks);
        assert_eq!(
            vec![
                CategoryStats {
                    category: "Work".to_owned(),
                    total: 2,
                    completed: 1,
                    percentage: 50,
                },
                CategoryStats {
                    category: "Study".to_owned(),
                    total: 1,
                    completed: 0,
                    percentage: 0,
                },
            ],
            categories
        );
    }

    #[test]
    fn daily_stats_cover_window_oldest_first() {
        let tasks = vec![
            task(1, "Work", true, date(2024, 5, 1)),
            task(2, "Work", false, date(2024, 5, 1)),
            task(3, "Work", true, date(2024, 4, 29)),
            task(4, "Work", true, date(2024, 4, 1)),
        ];

        let daily = calculate_daily_stats(&tasks, 3, date(2024, 5, 1));
        assert_eq!(
            vec![
                DailyStats { date: date(2024, 4, 29), completed: 1, total: 1 },
                DailyStats { date: date(2024, 4, 30), completed: 0, total: 0 },
                DailyStats { date: date(2024, 5, 1), completed: 1, total: 2 },
            ],
            daily
        );
    }

    #[test]
    fn trend_compares_weeks() {
        let today = date(2024, 5, 14);
        let improving = vec![
            task(1, "Work", false, date(2024, 5, 2)),
            task(2, "Work", true, date(2024, 5, 10)),
        ];
        let declining = vec![
            task(1, "Work", true, date(2024, 5, 2)),
            task(2, "Work", false, date(2024, 5, 10)),
        ];
        let stable = vec![
            task(1, "Work", true, date(2024, 5, 2)),
            task(2, "Work", true, date(2024, 5, 10)),
        ];

        assert_eq!(ProductivityTrend::Improving, productivity_trend(&improving, today));
        assert_eq!(ProductivityTrend::Declining, productivity_trend(&declining, today));
        assert_eq!(ProductivityTrend::Stable, productivity_trend(&stable, today));
        assert_eq!(ProductivityTrend::Stable, productivity_trend(&[], today));
    }

    #[tokio::test]
    async fn service_analyzes_users_tasks() {
        let user_persist = InMemoryUserPersistence::with_default_user();
        let task_persist = RwLock::new(InMemoryTaskPersistence::new_with_tasks(vec![
            task(1, "Work", true, date(2024, 5, 1)),
        ]));
        let mut ext_cxn = external_connections::test_util::FakeExternalConnectivity::new();
        let clock = FixedClock::at_noon(2024, 5, 1);

        let analytics = AnalyticsService
            .task_analytics(1, 7, &mut ext_cxn, &clock, &user_persist, &task_persist)
            .await;
        assert_that!(analytics).is_ok().matches(|analytics| {
            analytics.task_stats.completion_rate == 100
                && analytics.daily.len() == 7
                && analytics.daily[6].total == 1
        });
    }
}
