use crate::domain;
use crate::domain::stats::UserStats;
use crate::external_connections::{ConnectionHandle, ExternalConnectivity};
use anyhow::{Context, Error};
use chrono::NaiveDate;
use sqlx::{FromRow, query, query_as};

#[derive(FromRow)]
struct UserStatsRow {
    user_id: i32,
    total_points: i32,
    current_streak: i32,
    longest_streak: i32,
    last_active_date: Option<NaiveDate>,
    todos_completed_today: i32,
    total_todos_completed: i32,
}

impl From<UserStatsRow> for UserStats {
    fn from(value: UserStatsRow) -> Self {
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

pub struct DbStatsReader;

impl domain::stats::driven_ports::StatsReader for DbStatsReader {
    async fn stats_for_user(
        &self,
        user_id: i32,
        ext_cxn: &mut impl ExternalConnectivity,
    ) -> Result<Option<UserStats>, Error> {
        let mut cxn = ext_cxn.database_cxn().await?;

        let stats = query_as::<_, UserStatsRow>("SELECT us.* FROM user_stats us WHERE us.user_id = $1")
            .bind(user_id)
            .fetch_optional(cxn.borrow_connection())
            .await
            .context("trying to fetch stats for a user")?
            .map(UserStats::from);

        Ok(stats)
    }
}

pub struct DbStatsWriter;

impl domain::stats::driven_ports::StatsWriter for DbStatsWriter {
    async fn save_stats(
        &self,
        stats: &UserStats,
        ext_cxn: &mut impl ExternalConnectivity,
    ) -> Result<(), Error> {
        let mut cxn = ext_cxn.database_cxn().await?;

        query(
            "INSERT INTO user_stats(user_id, total_points, current_streak, longest_streak, \
                last_active_date, todos_completed_today, total_todos_completed) \
            VALUES ($1, $2, $3, $4, $5, $6, $7) \
            ON CONFLICT (user_id) DO UPDATE SET total_points = EXCLUDED.total_points, \
                current_streak = EXCLUDED.current_streak, longest_streak = EXCLUDED.longest_streak, \
                last_active_date = EXCLUDED.last_active_date, \
                todos_completed_today = EXCLUDED.todos_completed_today, \
                total_todos_completed = EXCLUDED.total_todos_completed",
        )
        .bind(stats.user_id)
        .bind(stats.total_points)
        .bind(stats.current_streak)
        .bind(stats.longest_streak)
        .bind(stats.last_active_date)
        .bind(stats.todos_completed_today)
        .bind(stats.total_todos_completed)
        .execute(cxn.borrow_connection())
        .await
        .context("trying to save stats for a user")?;

        Ok(())
    }
}
