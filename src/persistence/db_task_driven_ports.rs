use super::NewId;
use crate::domain;
use crate::domain::recurrence::{RecurrenceRule, RecurrenceType};
use crate::domain::task::{NewTask, Task};
use crate::domain::todo::Priority;
use crate::external_connections::{ConnectionHandle, ExternalConnectivity};
use anyhow::{Context, Error};
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::types::Json;
use sqlx::{FromRow, query, query_as};

const TASK_COLUMNS: &str = "t.id, t.owner_user_id, t.title, t.description, t.category, \
    t.scheduled_time, t.recurrence, t.recurrence_rule, t.completed, t.created_at, t.due_date, \
    t.last_completed_at, t.parent_task_id, t.points, t.priority";

/// Stored shape of a recurrence rule in the `recurrence_rule` JSONB column
#[derive(Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RecurrenceRuleRecord {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    end_date: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    days_of_week: Vec<u8>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    day_of_month: Option<u8>,
}

impl From<&RecurrenceRule> for RecurrenceRuleRecord {
    fn from(value: &RecurrenceRule) -> Self {
        RecurrenceRuleRecord {
            kind: value.kind.as_str().to_owned(),
            end_date: value.end_date.clone(),
            days_of_week: value.days_of_week.clone(),
            day_of_month: value.day_of_month,
        }
    }
}

impl From<RecurrenceRuleRecord> for RecurrenceRule {
    fn from(value: RecurrenceRuleRecord) -> Self {
        RecurrenceRule {
            kind: RecurrenceType::from(value.kind.as_str()),
            end_date: value.end_date,
            days_of_week: value.days_of_week,
            day_of_month: value.day_of_month,
        }
    }
}

#[derive(FromRow)]
struct TaskRow {
    id: i32,
    owner_user_id: i32,
    title: String,
    description: Option<String>,
    category: String,
    scheduled_time: String,
    recurrence: String,
    recurrence_rule: Option<Json<RecurrenceRuleRecord>>,
    completed: bool,
    created_at: DateTime<Utc>,
    due_date: Option<NaiveDate>,
    last_completed_at: Option<DateTime<Utc>>,
    parent_task_id: Option<i32>,
    points: Option<i32>,
    priority: Option<String>,
}

impl TryFrom<TaskRow> for Task {
    type Error = anyhow::Error;

    fn try_from(value: TaskRow) -> Result<Self, Self::Error> {
        let priority = value
            .priority
            .as_deref()
            .map(str::parse::<Priority>)
            .transpose()
            .with_context(|| format!("reading priority of task {}", value.id))?;

        Ok(Task {
            id: value.id,
            owner_user_id: value.owner_user_id,
            title: value.title,
            description: value.description,
            category: value.category,
            time: value.scheduled_time,
            recurrence: RecurrenceType::from(value.recurrence.as_str()),
            recurrence_rule: value
                .recurrence_rule
                .map(|Json(record)| RecurrenceRule::from(record)),
            completed: value.completed,
            created_at: value.created_at,
            due_date: value.due_date,
            last_completed_at: value.last_completed_at,
            parent_task_id: value.parent_task_id,
            points: value.points,
            priority,
        })
    }
}

pub struct DbTaskReader;

impl domain::task::driven_ports::TaskReader for DbTaskReader {
    async fn tasks_for_user(
        &self,
        user_id: i32,
        ext_cxn: &mut impl ExternalConnectivity,
    ) -> Result<Vec<Task>, Error> {
        let mut cxn = ext_cxn.database_cxn().await?;

        let rows = query_as::<_, TaskRow>(&format!(
            "SELECT {TASK_COLUMNS} FROM task t WHERE t.owner_user_id = $1 ORDER BY t.id"
        ))
        .bind(user_id)
        .fetch_all(cxn.borrow_connection())
        .await
        .context("trying to fetch tasks for a user")?;

        rows.into_iter().map(Task::try_from).collect()
    }

    async fn user_task_by_id(
        &self,
        user_id: i32,
        task_id: i32,
        ext_cxn: &mut impl ExternalConnectivity,
    ) -> Result<Option<Task>, Error> {
        let mut cxn = ext_cxn.database_cxn().await?;

        let row = query_as::<_, TaskRow>(&format!(
            "SELECT {TASK_COLUMNS} FROM task t WHERE t.owner_user_id = $1 AND t.id = $2"
        ))
        .bind(user_id)
        .bind(task_id)
        .fetch_optional(cxn.borrow_connection())
        .await
        .context("trying to fetch a task by ID")?;

        row.map(Task::try_from).transpose()
    }
}

pub struct DbTaskWriter;

impl domain::task::driven_ports::TaskWriter for DbTaskWriter {
    async fn create_task_for_user(
        &self,
        user_id: i32,
        new_task: &NewTask,
        ext_cxn: &mut impl ExternalConnectivity,
    ) -> Result<i32, Error> {
        let mut cxn = ext_cxn.database_cxn().await?;

        let new_id = query_as::<_, NewId>(
            "INSERT INTO task(owner_user_id, title, description, category, scheduled_time, recurrence, \
                recurrence_rule, completed, created_at, due_date, last_completed_at, parent_task_id, points, priority) \
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14) \
            RETURNING task.id",
        )
        .bind(user_id)
        .bind(&new_task.title)
        .bind(&new_task.description)
        .bind(&new_task.category)
        .bind(&new_task.time)
        .bind(new_task.recurrence.as_str())
        .bind(
            new_task
                .recurrence_rule
                .as_ref()
                .map(|rule| Json(RecurrenceRuleRecord::from(rule))),
        )
        .bind(new_task.completed)
        .bind(new_task.created_at)
        .bind(new_task.due_date)
        .bind(new_task.last_completed_at)
        .bind(new_task.parent_task_id)
        .bind(new_task.points)
        .bind(new_task.priority.map(|priority| priority.as_str()))
        .fetch_one(cxn.borrow_connection())
        .await
        .context("trying to insert a new task into the database")?;

        Ok(new_id.id)
    }

    async fn save_task(
        &self,
        task: &Task,
        ext_cxn: &mut impl ExternalConnectivity,
    ) -> Result<(), Error> {
        let mut cxn = ext_cxn.database_cxn().await?;

        query(
            "UPDATE task SET title = $1, description = $2, category = $3, scheduled_time = $4, \
                recurrence = $5, recurrence_rule = $6, completed = $7, due_date = $8, \
                last_completed_at = $9, points = $10, priority = $11 \
            WHERE id = $12 AND owner_user_id = $13",
        )
        .bind(&task.title)
        .bind(&task.description)
        .bind(&task.category)
        .bind(&task.time)
        .bind(task.recurrence.as_str())
        .bind(
            task.recurrence_rule
                .as_ref()
                .map(|rule| Json(RecurrenceRuleRecord::from(rule))),
        )
        .bind(task.completed)
        .bind(task.due_date)
        .bind(task.last_completed_at)
        .bind(task.points)
        .bind(task.priority.map(|priority| priority.as_str()))
        .bind(task.id)
        .bind(task.owner_user_id)
        .execute(cxn.borrow_connection())
        .await
        .context("trying to update a task in the database")?;

        Ok(())
    }

    async fn delete_task_and_instances(
        &self,
        user_id: i32,
        task_id: i32,
        ext_cxn: &mut impl ExternalConnectivity,
    ) -> Result<u64, Error> {
        let mut cxn = ext_cxn.database_cxn().await?;

        let result = query(
            "DELETE FROM task WHERE owner_user_id = $1 AND (id = $2 OR parent_task_id = $2)",
        )
        .bind(user_id)
        .bind(task_id)
        .execute(cxn.borrow_connection())
        .await
        .context("trying to remove a task and its instances from the database")?;

        Ok(result.rows_affected())
    }
}
