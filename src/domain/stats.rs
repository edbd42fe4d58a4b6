use crate::domain;
use crate::domain::clock::Clock;
use crate::domain::stats::driven_ports::{StatsReader, StatsWriter};
use crate::domain::stats::driving_ports::StatsError;
use crate::domain::todo::driven_ports::TodoReader;
use crate::external_connections::ExternalConnectivity;
use anyhow::Context;
use chrono::{Days, NaiveDate};
use tracing::{error, info};

/// Gamification counters for a single user
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserStats {
    pub user_id: i32,
    pub total_points: i32,
    pub current_streak: i32,
    pub longest_streak: i32,
    /// The day of the most recent todo completion
    pub last_active_date: Option<NaiveDate>,
    pub todos_completed_today: i32,
    pub total_todos_completed: i32,
}

impl UserStats {
    /// Zeroed stats for a user who has never completed anything
    pub fn empty(user_id: i32) -> UserStats {
        UserStats {
            user_id,
            total_points: 0,
            current_streak: 0,
            longest_streak: 0,
            last_active_date: None,
            todos_completed_today: 0,
            total_todos_completed: 0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Streak {
    pub current: i32,
    pub longest: i32,
}

/// Recomputes streak counters from the previous stats and how many todos were completed today.
///
/// A streak grows when activity today follows activity yesterday, restarts at 1 after a gap,
/// and stays put for repeat activity on the same day. With no activity today the streak is
/// dropped unless the user was already active today. The longest streak never falls below the
/// current one.
pub fn calculate_streak(
    previous: Option<&UserStats>,
    todos_completed_today: u32,
    today: NaiveDate,
) -> Streak {
    let Some(previous) = previous else {
        return Streak {
            current: 0,
            longest: 0,
        };
    };

    let yesterday = today.checked_sub_days(Days::new(1));
    let mut current = previous.current_streak;
    let mut longest = previous.longest_streak;

    if todos_completed_today > 0 {
        if previous.last_active_date.is_some() && previous.last_active_date == yesterday {
            current = current.saturating_add(1);
        } else if previous.last_active_date != Some(today) {
            current = 1;
        }

        longest = longest.max(current);
    } else if previous.last_active_date != Some(today) {
        current = 0;
    }

    Streak { current, longest }
}

/// Folds a todo completion worth [points] into [previous], where [completed_today] already
/// includes the todo being completed
pub fn record_todo_completion(
    previous: UserStats,
    points: i32,
    completed_today: u32,
    today: NaiveDate,
) -> UserStats {
    let streak = calculate_streak(Some(&previous), completed_today, today);

    UserStats {
        total_points: previous.total_points.saturating_add(points),
        current_streak: streak.current,
        longest_streak: streak.longest,
        last_active_date: Some(today),
        todos_completed_today: completed_today as i32,
        total_todos_completed: previous.total_todos_completed.saturating_add(1),
        ..previous
    }
}

/// True when [last_active] is older than the day before [today], so the streak can no
/// longer be extended
pub fn should_reset_streak(last_active: Option<NaiveDate>, today: NaiveDate) -> bool {
    let Some(last_active) = last_active else {
        return false;
    };

    today
        .checked_sub_days(Days::new(1))
        .is_some_and(|yesterday| last_active < yesterday)
}

/// Brings stored stats up to date for a read on [today]. The streak lapses only once a full
/// day has passed without a completion; activity yesterday keeps it alive until today ends.
pub fn refresh_for_day(stats: &UserStats, completed_today: u32, today: NaiveDate) -> UserStats {
    let current_streak = if should_reset_streak(stats.last_active_date, today) {
        0
    } else {
        stats.current_streak
    };

    UserStats {
        current_streak,
        todos_completed_today: completed_today as i32,
        ..stats.clone()
    }
}

/// Typed partial update for a user's stats
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UpdateStats {
    pub total_points: Option<i32>,
    pub current_streak: Option<i32>,
    pub longest_streak: Option<i32>,
    pub last_active_date: Option<NaiveDate>,
    pub todos_completed_today: Option<i32>,
    pub total_todos_completed: Option<i32>,
}

impl UpdateStats {
    /// Merges the populated fields onto [stats], raising the longest streak if the merged
    /// current streak would exceed it
    pub fn apply_to(&self, stats: &mut UserStats) {
        if let Some(total_points) = self.total_points {
            stats.total_points = total_points;
        }
        if let Some(current_streak) = self.current_streak {
            stats.current_streak = current_streak;
        }
        if let Some(longest_streak) = self.longest_streak {
            stats.longest_streak = longest_streak;
        }
        if let Some(last_active_date) = self.last_active_date {
            stats.last_active_date = Some(last_active_date);
        }
        if let Some(todos_completed_today) = self.todos_completed_today {
            stats.todos_completed_today = todos_completed_today;
        }
        if let Some(total_todos_completed) = self.total_todos_completed {
            stats.total_todos_completed = total_todos_completed;
        }

        stats.longest_streak = stats.longest_streak.max(stats.current_streak);
    }
}

pub mod driven_ports {
    use super::*;

    pub trait StatsReader: Sync {
        async fn stats_for_user(
            &self,
            user_id: i32,
            ext_cxn: &mut impl ExternalConnectivity,
        ) -> Result<Option<UserStats>, anyhow::Error>;
    }

    pub trait StatsWriter: Sync {
        /// Inserts or replaces the stats row for [stats]'s user
        async fn save_stats(
            &self,
            stats: &UserStats,
            ext_cxn: &mut impl ExternalConnectivity,
        ) -> Result<(), anyhow::Error>;
    }
}

pub mod driving_ports {
    use super::*;
    use crate::domain::user::driven_ports::DetectUser;
    use thiserror::Error;

    #[derive(Debug, Error)]
    pub enum StatsError {
        #[error("The specified user did not exist.")]
        UserDoesNotExist,
        #[error(transparent)]
        PortError(#[from] anyhow::Error),
    }

    impl From<domain::user::OwnerLookupError> for StatsError {
        fn from(value: domain::user::OwnerLookupError) -> Self {
            match value {
                domain::user::OwnerLookupError::UserDoesNotExist(user_id) => {
                    error!("User {} didn't exist when reading stats.", user_id);
                    StatsError::UserDoesNotExist
                }
                domain::user::OwnerLookupError::PortError(err) => {
                    StatsError::from(err.context("Verifying stats owner"))
                }
            }
        }
    }

    pub trait StatsPort {
        async fn stats_for_user(
            &self,
            user_id: i32,
            ext_cxn: &mut impl ExternalConnectivity,
            clock: &impl Clock,
            u_detect: &impl DetectUser,
            todo_read: &impl TodoReader,
            stats_read: &impl StatsReader,
            stats_write: &impl StatsWriter,
        ) -> Result<UserStats, StatsError>;
        async fn update_stats(
            &self,
            user_id: i32,
            update: &UpdateStats,
            ext_cxn: &mut impl ExternalConnectivity,
            u_detect: &impl DetectUser,
            stats_read: &impl StatsReader,
            stats_write: &impl StatsWriter,
        ) -> Result<UserStats, StatsError>;
    }
}

pub struct StatsService;

impl driving_ports::StatsPort for StatsService {
    async fn stats_for_user(
        &self,
        user_id: i32,
        ext_cxn: &mut impl ExternalConnectivity,
        clock: &impl Clock,
        u_detect: &impl domain::user::driven_ports::DetectUser,
        todo_read: &impl TodoReader,
        stats_read: &impl StatsReader,
        stats_write: &impl StatsWriter,
    ) -> Result<UserStats, StatsError> {
        domain::user::ensure_owner_exists(user_id, &mut *ext_cxn, u_detect).await?;
        let stored = stats_read
            .stats_for_user(user_id, &mut *ext_cxn)
            .await
            .context("reading user stats")?;
        let today = clock.today();
        let completed_today = todo_read
            .todos_for_user(user_id, &mut *ext_cxn)
            .await
            .context("counting todos completed today")?
            .iter()
            .filter(|todo| {
                todo.completed
                    && todo
                        .completed_at
                        .is_some_and(|completed_at| completed_at.date_naive() == today)
            })
            .count() as u32;

        let current = match stored {
            Some(ref stats) => refresh_for_day(stats, completed_today, today),
            None => UserStats::empty(user_id),
        };

        if stored.as_ref() != Some(&current) {
            info!("Persisting refreshed stats for user {user_id}");
            stats_write
                .save_stats(&current, &mut *ext_cxn)
                .await
                .context("saving refreshed user stats")?;
        }

        Ok(current)
    }

    async fn update_stats(
        &self,
        user_id: i32,
        update: &UpdateStats,
        ext_cxn: &mut impl ExternalConnectivity,
        u_detect: &impl domain::user::driven_ports::DetectUser,
        stats_read: &impl StatsReader,
        stats_write: &impl StatsWriter,
    ) -> Result<UserStats, StatsError> {
        domain::user::ensure_owner_exists(user_id, &mut *ext_cxn, u_detect).await?;
        let mut stats = stats_read
            .stats_for_user(user_id, &mut *ext_cxn)
            .await
            .context("reading user stats for update")?
            .unwrap_or_else(|| UserStats::empty(user_id));

        update.apply_to(&mut stats);
        stats_write
            .save_stats(&stats, &mut *ext_cxn)
            .await
            .context("saving updated user stats")?;

        Ok(stats)
    }
}

#[cfg(test)]
mod tests {
    use super::test_util::*;
    use super::*;
    use crate::domain::stats::driving_ports::StatsPort;
    use crate::domain::test_util::{Connectivity, FixedClock, date};
    use crate::domain::todo::Priority;
    use crate::domain::todo::test_util::{InMemoryTodoPersistence, todo_fixture};
    use crate::domain::user::test_util::InMemoryUserPersistence;
    use crate::external_connections;
    use chrono::{TimeZone, Utc};
    use speculoos::prelude::*;
    use std::sync::RwLock;

    fn stats_with(current: i32, longest: i32, last_active: Option<NaiveDate>) -> UserStats {
        UserStats {
            current_streak: current,
            longest_streak: longest,
            last_active_date: last_active,
            ..UserStats::empty(1)
        }
    }

    mod calculate_streak {
        use super::*;

        #[test]
        fn no_previous_stats_is_zero() {
            let streak = calculate_streak(None, 3, date(2024, 5, 1));
            assert_eq!(Streak { current: 0, longest: 0 }, streak);
        }

        #[test]
        fn activity_after_yesterday_extends() {
            let previous = stats_with(3, 5, Some(date(2024, 4, 30)));
            let streak = calculate_streak(Some(&previous), 1, date(2024, 5, 1));
            assert_eq!(Streak { current: 4, longest: 5 }, streak);
        }

        #[test]
        fn activity_after_gap_restarts() {
            let previous = stats_with(4, 5, Some(date(2024, 4, 29)));
            let streak = calculate_streak(Some(&previous), 1, date(2024, 5, 1));
            assert_eq!(Streak { current: 1, longest: 5 }, streak);
        }

        #[test]
        fn no_activity_today_drops_streak() {
            let previous = stats_with(5, 5, Some(date(2024, 4, 30)));
            let streak = calculate_streak(Some(&previous), 0, date(2024, 5, 1));
            assert_eq!(Streak { current: 0, longest: 5 }, streak);
        }

        #[test]
        fn repeat_activity_today_keeps_streak() {
            let previous = stats_with(2, 7, Some(date(2024, 5, 1)));
            let streak = calculate_streak(Some(&previous), 4, date(2024, 5, 1));
            assert_eq!(Streak { current: 2, longest: 7 }, streak);
        }

        #[test]
        fn extending_past_longest_raises_it() {
            let previous = stats_with(5, 5, Some(date(2024, 4, 30)));
            let streak = calculate_streak(Some(&previous), 1, date(2024, 5, 1));
            assert_eq!(Streak { current: 6, longest: 6 }, streak);
        }

        #[test]
        fn never_active_starts_at_one() {
            let previous = UserStats::empty(1);
            let streak = calculate_streak(Some(&previous), 1, date(2024, 5, 1));
            assert_eq!(Streak { current: 1, longest: 1 }, streak);
        }

        #[test]
        fn crosses_month_boundaries() {
            let previous = stats_with(1, 1, Some(date(2024, 2, 29)));
            let streak = calculate_streak(Some(&previous), 1, date(2024, 3, 1));
            assert_eq!(Streak { current: 2, longest: 2 }, streak);
        }
    }

    #[test]
    fn record_todo_completion_accumulates() {
        let previous = UserStats {
            total_points: 7,
            total_todos_completed: 3,
            ..stats_with(1, 4, Some(date(2024, 4, 30)))
        };

        let updated = record_todo_completion(previous, 5, 1, date(2024, 5, 1));
        assert_eq!(
            UserStats {
                user_id: 1,
                total_points: 12,
                current_streak: 2,
                longest_streak: 4,
                last_active_date: Some(date(2024, 5, 1)),
                todos_completed_today: 1,
                total_todos_completed: 4,
            },
            updated
        );
    }

    mod should_reset_streak {
        use super::*;

        #[test]
        fn active_yesterday_is_kept() {
            assert!(!should_reset_streak(Some(date(2024, 4, 30)), date(2024, 5, 1)));
        }

        #[test]
        fn active_today_is_kept() {
            assert!(!should_reset_streak(Some(date(2024, 5, 1)), date(2024, 5, 1)));
        }

        #[test]
        fn two_days_back_resets() {
            assert!(should_reset_streak(Some(date(2024, 4, 29)), date(2024, 5, 1)));
        }

        #[test]
        fn never_active_is_kept() {
            assert!(!should_reset_streak(None, date(2024, 5, 1)));
        }
    }

    #[test]
    fn record_todo_completion_saturates() {
        let previous = UserStats {
            total_points: i32::MAX - 2,
            total_todos_completed: i32::MAX,
            ..stats_with(i32::MAX, i32::MAX, Some(date(2024, 4, 30)))
        };

        let updated = record_todo_completion(previous, 5, 1, date(2024, 5, 1));
        assert_eq!(i32::MAX, updated.total_points);
        assert_eq!(i32::MAX, updated.current_streak);
        assert_eq!(i32::MAX, updated.longest_streak);
        assert_eq!(i32::MAX, updated.total_todos_completed);
    }

    #[test]
    fn update_keeps_current_within_longest() {
        let mut stats = stats_with(2, 3, None);
        UpdateStats {
            current_streak: Some(9),
            ..Default::default()
        }
        .apply_to(&mut stats);

        assert_eq!(9, stats.current_streak);
        assert_eq!(9, stats.longest_streak);
    }

    mod stats_for_user {
        use super::*;

        #[tokio::test]
        async fn creates_stats_on_first_read() {
            let user_persist = InMemoryUserPersistence::with_default_user();
            let todo_persist = InMemoryTodoPersistence::new_locked();
            let stats_persist = InMemoryStatsPersistence::new_locked();
            let mut ext_cxn = external_connections::test_util::FakeExternalConnectivity::new();
            let clock = FixedClock::at_noon(2024, 5, 1);

            let stats_result = StatsService
                .stats_for_user(1, &mut ext_cxn, &clock, &user_persist, &todo_persist, &stats_persist, &stats_persist)
                .await;
            assert_that!(stats_result).is_ok_containing(UserStats::empty(1));

            let locked_stats = stats_persist.read().expect("stats persist rw lock poisoned");
            assert_eq!(vec![UserStats::empty(1)], locked_stats.stats);
        }

        #[tokio::test]
        async fn lapsed_streak_is_dropped() {
            let user_persist = InMemoryUserPersistence::with_default_user();
            let todo_persist = InMemoryTodoPersistence::new_locked();
            let stats_persist = RwLock::new(InMemoryStatsPersistence::new_with_stats(vec![
                stats_with(6, 8, Some(date(2024, 4, 28))),
            ]));
            let mut ext_cxn = external_connections::test_util::FakeExternalConnectivity::new();
            let clock = FixedClock::at_noon(2024, 5, 1);

            let stats_result = StatsService
                .stats_for_user(1, &mut ext_cxn, &clock, &user_persist, &todo_persist, &stats_persist, &stats_persist)
                .await;
            assert_that!(stats_result)
                .is_ok()
                .matches(|stats| stats.current_streak == 0 && stats.longest_streak == 8);

            let locked_stats = stats_persist.read().expect("stats persist rw lock poisoned");
            assert_eq!(0, locked_stats.stats[0].current_streak);
        }

        #[tokio::test]
        async fn streak_from_yesterday_survives_a_read() {
            let user_persist = InMemoryUserPersistence::with_default_user();
            let todo_persist = InMemoryTodoPersistence::new_locked();
            let stored = UserStats {
                todos_completed_today: 3,
                ..stats_with(5, 5, Some(date(2024, 4, 30)))
            };
            let stats_persist =
                RwLock::new(InMemoryStatsPersistence::new_with_stats(vec![stored.clone()]));
            let mut ext_cxn = external_connections::test_util::FakeExternalConnectivity::new();
            let clock = FixedClock::at_noon(2024, 5, 1);

            let stats_result = StatsService
                .stats_for_user(1, &mut ext_cxn, &clock, &user_persist, &todo_persist, &stats_persist, &stats_persist)
                .await;
            assert_that!(stats_result).is_ok().matches(|stats| {
                stats.current_streak == 5
                    && stats.longest_streak == 5
                    && stats.last_active_date == Some(date(2024, 4, 30))
                    && stats.todos_completed_today == 0
            });

            let locked_stats = stats_persist.read().expect("stats persist rw lock poisoned");
            assert_eq!(5, locked_stats.stats[0].current_streak);
        }

        #[tokio::test]
        async fn counts_todos_completed_today() {
            let user_persist = InMemoryUserPersistence::with_default_user();
            let mut done_today = todo_fixture(1, 1, Priority::Low);
            done_today.completed = true;
            done_today.completed_at = Some(Utc.with_ymd_and_hms(2024, 5, 1, 7, 0, 0).unwrap());
            let mut done_before = todo_fixture(2, 1, Priority::Low);
            done_before.completed = true;
            done_before.completed_at = Some(Utc.with_ymd_and_hms(2024, 4, 30, 7, 0, 0).unwrap());
            let todo_persist = RwLock::new(InMemoryTodoPersistence::new_with_todos(vec![
                done_today,
                done_before,
            ]));
            let stats_persist = RwLock::new(InMemoryStatsPersistence::new_with_stats(vec![
                stats_with(2, 2, Some(date(2024, 5, 1))),
            ]));
            let mut ext_cxn = external_connections::test_util::FakeExternalConnectivity::new();
            let clock = FixedClock::at_noon(2024, 5, 1);

            let stats_result = StatsService
                .stats_for_user(1, &mut ext_cxn, &clock, &user_persist, &todo_persist, &stats_persist, &stats_persist)
                .await;
            assert_that!(stats_result)
                .is_ok()
                .matches(|stats| stats.current_streak == 2 && stats.todos_completed_today == 1);
        }

        #[tokio::test]
        async fn unknown_user() {
            let user_persist = InMemoryUserPersistence::new_locked();
            let todo_persist = InMemoryTodoPersistence::new_locked();
            let stats_persist = InMemoryStatsPersistence::new_locked();
            let mut ext_cxn = external_connections::test_util::FakeExternalConnectivity::new();
            let clock = FixedClock::at_noon(2024, 5, 1);

            let stats_result = StatsService
                .stats_for_user(3, &mut ext_cxn, &clock, &user_persist, &todo_persist, &stats_persist, &stats_persist)
                .await;
            let Err(StatsError::UserDoesNotExist) = stats_result else {
                panic!("Expected missing user, got {stats_result:#?}");
            };
        }
    }

    mod update_stats {
        use super::*;

        #[tokio::test]
        async fn merges_onto_existing_stats() {
            let user_persist = InMemoryUserPersistence::with_default_user();
            let stats_persist = RwLock::new(InMemoryStatsPersistence::new_with_stats(vec![
                stats_with(1, 1, Some(date(2024, 5, 1))),
            ]));
            let mut ext_cxn = external_connections::test_util::FakeExternalConnectivity::new();
            let update = UpdateStats {
                total_points: Some(40),
                ..Default::default()
            };

            let update_result = StatsService
                .update_stats(1, &update, &mut ext_cxn, &user_persist, &stats_persist, &stats_persist)
                .await;
            assert_that!(update_result)
                .is_ok()
                .matches(|stats| stats.total_points == 40 && stats.current_streak == 1);
        }

        #[tokio::test]
        async fn returns_port_err() {
            let user_persist = InMemoryUserPersistence::with_default_user();
            let mut raw_stats = InMemoryStatsPersistence::new();
            raw_stats.connected = Connectivity::Disconnected;
            let stats_persist = RwLock::new(raw_stats);
            let mut ext_cxn = external_connections::test_util::FakeExternalConnectivity::new();

            let update_result = StatsService
                .update_stats(1, &UpdateStats::default(), &mut ext_cxn, &user_persist, &stats_persist, &stats_persist)
                .await;
            assert_that!(update_result)
                .is_err()
                .matches(|err| matches!(err, StatsError::PortError(_)));
        }
    }
}
