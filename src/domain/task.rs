use crate::domain;
use crate::domain::calendar;
use crate::domain::clock::Clock;
use crate::domain::recurrence::{self, NextOccurrence, RecurrenceRule, RecurrenceType};
use crate::domain::task::driven_ports::{TaskReader, TaskWriter};
use crate::domain::task::driving_ports::TaskError;
use crate::domain::todo::Priority;
use crate::external_connections::{
    ExternalConnectivity, Transactable, TransactableExternalConnectivity, TransactionHandle,
};
use anyhow::Context;
use chrono::{DateTime, NaiveDate, Utc};
use tracing::{error, info};

/// A scheduled task. Tasks with a parent reference are generated instances of a recurring
/// template; the rest are top-level tasks.
#[derive(PartialEq, Eq, Debug, Clone)]
pub struct Task {
    pub id: i32,
    pub owner_user_id: i32,
    pub title: String,
    pub description: Option<String>,
    pub category: String,
    /// Time of day in HH:MM form
    pub time: String,
    pub recurrence: RecurrenceType,
    pub recurrence_rule: Option<RecurrenceRule>,
    pub completed: bool,
    pub created_at: DateTime<Utc>,
    pub due_date: Option<NaiveDate>,
    pub last_completed_at: Option<DateTime<Utc>>,
    pub parent_task_id: Option<i32>,
    pub points: Option<i32>,
    pub priority: Option<Priority>,
}

impl Task {
    pub fn is_instance(&self) -> bool {
        self.parent_task_id.is_some()
    }

    /// The explicit rule if one was attached, otherwise an unconstrained rule for the task's
    /// recurrence type
    pub fn effective_rule(&self) -> RecurrenceRule {
        self.recurrence_rule
            .clone()
            .unwrap_or_else(|| RecurrenceRule::of_kind(self.recurrence))
    }
}

/// User-supplied content for a new task
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreateTask {
    pub title: String,
    pub description: Option<String>,
    pub category: String,
    pub time: String,
    pub recurrence: RecurrenceType,
    pub recurrence_rule: Option<RecurrenceRule>,
    pub due_date: Option<NaiveDate>,
    pub points: Option<i32>,
    pub priority: Option<Priority>,
}

/// A complete task record waiting for the store to assign it an ID
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewTask {
    pub title: String,
    pub description: Option<String>,
    pub category: String,
    pub time: String,
    pub recurrence: RecurrenceType,
    pub recurrence_rule: Option<RecurrenceRule>,
    pub completed: bool,
    pub created_at: DateTime<Utc>,
    pub due_date: Option<NaiveDate>,
    pub last_completed_at: Option<DateTime<Utc>>,
    pub parent_task_id: Option<i32>,
    pub points: Option<i32>,
    pub priority: Option<Priority>,
}

impl NewTask {
    fn from_create(create: &CreateTask, created_at: DateTime<Utc>) -> NewTask {
        NewTask {
            title: create.title.clone(),
            description: create.description.clone(),
            category: create.category.clone(),
            time: create.time.clone(),
            recurrence: create.recurrence,
            recurrence_rule: create.recurrence_rule.clone(),
            completed: false,
            created_at,
            due_date: create.due_date,
            last_completed_at: None,
            parent_task_id: None,
            points: create.points,
            priority: create.priority,
        }
    }
}

/// Typed partial update for a task. Fields left as [None] are not touched.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UpdateTask {
    pub title: Option<String>,
    pub description: Option<String>,
    pub category: Option<String>,
    pub time: Option<String>,
    pub recurrence: Option<RecurrenceType>,
    pub recurrence_rule: Option<RecurrenceRule>,
    pub due_date: Option<NaiveDate>,
    pub points: Option<i32>,
    pub priority: Option<Priority>,
}

impl UpdateTask {
    /// Merges the populated fields of this update onto [task]
    pub fn apply_to(&self, task: &mut Task) {
        if let Some(ref title) = self.title {
            task.title = title.clone();
        }
        if let Some(ref description) = self.description {
            task.description = Some(description.clone());
        }
        if let Some(ref category) = self.category {
            task.category = category.clone();
        }
        if let Some(ref time) = self.time {
            task.time = time.clone();
        }
        if let Some(recurrence) = self.recurrence {
            task.recurrence = recurrence;
        }
        if let Some(ref rule) = self.recurrence_rule {
            task.recurrence_rule = Some(rule.clone());
        }
        if let Some(due_date) = self.due_date {
            task.due_date = Some(due_date);
        }
        if let Some(points) = self.points {
            task.points = Some(points);
        }
        if let Some(priority) = self.priority {
            task.priority = Some(priority);
        }
    }
}

/// The records produced by moving a task from pending to completed
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompletedTask {
    pub task: Task,
    /// The next occurrence of a recurring task, if the recurrence produces one
    pub successor: Option<NewTask>,
}

/// Marks [task] completed at [now] and, for recurring tasks that have another occurrence,
/// builds the successor instance. Successors always point at the series template, so
/// completing an instance yields a sibling rather than a grandchild.
pub fn complete_task(task: &Task, now: DateTime<Utc>) -> CompletedTask {
    let mut completed = task.clone();
    completed.completed = true;
    completed.last_completed_at = Some(now);

    let successor = if task.recurrence.is_recurring() {
        match recurrence::next_occurrence(now.date_naive(), &task.effective_rule()) {
            NextOccurrence::On(next_due) => Some(NewTask {
                title: task.title.clone(),
                description: task.description.clone(),
                category: task.category.clone(),
                time: task.time.clone(),
                recurrence: task.recurrence,
                recurrence_rule: task.recurrence_rule.clone(),
                completed: false,
                created_at: now,
                due_date: Some(next_due),
                last_completed_at: None,
                parent_task_id: Some(task.parent_task_id.unwrap_or(task.id)),
                points: task.points,
                priority: task.priority,
            }),
            NextOccurrence::Never => None,
        }
    } else {
        None
    };

    CompletedTask {
        task: completed,
        successor,
    }
}

/// Moves [task] back to pending. Instances spawned when it was completed are left alone.
pub fn reopen_task(task: &Task) -> Task {
    let mut reopened = task.clone();
    reopened.completed = false;
    reopened.last_completed_at = None;

    reopened
}

/// A recurring template alongside a summary of its generated instances
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecurringTaskSummary {
    pub template: Task,
    pub instance_count: usize,
    /// Whether the series is overdue for another instance based on its latest completion
    pub next_instance_due: bool,
}

/// Collects the recurring templates in [tasks] (instances are never templates)
pub fn summarize_recurring(tasks: &[Task], today: NaiveDate) -> Vec<RecurringTaskSummary> {
    tasks
        .iter()
        .filter(|task| task.recurrence.is_recurring() && !task.is_instance())
        .map(|template| {
            let series: Vec<&Task> = tasks
                .iter()
                .filter(|task| task.id == template.id || task.parent_task_id == Some(template.id))
                .collect();
            let latest_completion = series.iter().filter_map(|task| task.last_completed_at).max();

            RecurringTaskSummary {
                template: template.clone(),
                instance_count: series.len() - 1,
                next_instance_due: recurrence::should_generate_next_instance(
                    latest_completion,
                    &template.effective_rule(),
                    today,
                ),
            }
        })
        .collect()
}

/// Result of changing a task's completion state
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompletionOutcome {
    pub task: Task,
    pub spawned_instance_id: Option<i32>,
}

pub mod driven_ports {
    use super::*;

    pub trait TaskReader: Sync {
        async fn tasks_for_user(
            &self,
            user_id: i32,
            ext_cxn: &mut impl ExternalConnectivity,
        ) -> Result<Vec<Task>, anyhow::Error>;
        async fn user_task_by_id(
            &self,
            user_id: i32,
            task_id: i32,
            ext_cxn: &mut impl ExternalConnectivity,
        ) -> Result<Option<Task>, anyhow::Error>;
    }

    pub trait TaskWriter: Sync {
        async fn create_task_for_user(
            &self,
            user_id: i32,
            new_task: &NewTask,
            ext_cxn: &mut impl ExternalConnectivity,
        ) -> Result<i32, anyhow::Error>;

        /// Overwrites every mutable column of the stored task with the values in [task]
        async fn save_task(
            &self,
            task: &Task,
            ext_cxn: &mut impl ExternalConnectivity,
        ) -> Result<(), anyhow::Error>;

        /// Removes the task and every instance generated from it, returning how many records
        /// were removed
        async fn delete_task_and_instances(
            &self,
            user_id: i32,
            task_id: i32,
            ext_cxn: &mut impl ExternalConnectivity,
        ) -> Result<u64, anyhow::Error>;
    }
}

pub mod driving_ports {
    use super::*;
    use crate::domain::user::driven_ports::DetectUser;
    use thiserror::Error;

    #[derive(Debug, Error)]
    pub enum TaskError {
        #[error("The specified user did not exist.")]
        UserDoesNotExist,
        #[error("The specified task did not exist.")]
        TaskDoesNotExist,
        #[error(transparent)]
        PortError(#[from] anyhow::Error),
    }

    impl From<domain::user::OwnerLookupError> for TaskError {
        fn from(value: domain::user::OwnerLookupError) -> Self {
            match value {
                domain::user::OwnerLookupError::UserDoesNotExist(user_id) => {
                    error!("User {} didn't exist when working with tasks.", user_id);
                    TaskError::UserDoesNotExist
                }
                domain::user::OwnerLookupError::PortError(err) => {
                    TaskError::from(err.context("Verifying task owner"))
                }
            }
        }
    }

    pub trait TaskPort {
        async fn tasks_for_user(
            &self,
            user_id: i32,
            ext_cxn: &mut impl ExternalConnectivity,
            u_detect: &impl DetectUser,
            task_read: &impl TaskReader,
        ) -> Result<Vec<Task>, TaskError>;
        async fn tasks_for_day(
            &self,
            user_id: i32,
            day: NaiveDate,
            hour: Option<u32>,
            ext_cxn: &mut impl ExternalConnectivity,
            clock: &impl Clock,
            u_detect: &impl DetectUser,
            task_read: &impl TaskReader,
        ) -> Result<Vec<Task>, TaskError>;
        async fn user_task_by_id(
            &self,
            user_id: i32,
            task_id: i32,
            ext_cxn: &mut impl ExternalConnectivity,
            u_detect: &impl DetectUser,
            task_read: &impl TaskReader,
        ) -> Result<Option<Task>, TaskError>;
        async fn recurring_tasks(
            &self,
            user_id: i32,
            ext_cxn: &mut impl ExternalConnectivity,
            clock: &impl Clock,
            u_detect: &impl DetectUser,
            task_read: &impl TaskReader,
        ) -> Result<Vec<RecurringTaskSummary>, TaskError>;
        async fn task_instances(
            &self,
            user_id: i32,
            task_id: i32,
            ext_cxn: &mut impl ExternalConnectivity,
            u_detect: &impl DetectUser,
            task_read: &impl TaskReader,
        ) -> Result<Vec<Task>, TaskError>;
        async fn create_task_for_user(
            &self,
            user_id: i32,
            task: &CreateTask,
            ext_cxn: &mut impl ExternalConnectivity,
            clock: &impl Clock,
            u_detect: &impl DetectUser,
            task_write: &impl TaskWriter,
        ) -> Result<i32, TaskError>;
        async fn update_task(
            &self,
            user_id: i32,
            task_id: i32,
            update: &UpdateTask,
            ext_cxn: &mut impl ExternalConnectivity,
            task_read: &impl TaskReader,
            task_write: &impl TaskWriter,
        ) -> Result<Task, TaskError>;
        async fn set_task_completion(
            &self,
            user_id: i32,
            task_id: i32,
            completed: bool,
            ext_cxn: &mut impl TransactableExternalConnectivity,
            clock: &impl Clock,
            task_read: &impl TaskReader,
            task_write: &impl TaskWriter,
        ) -> Result<CompletionOutcome, TaskError>;
        async fn delete_task(
            &self,
            user_id: i32,
            task_id: i32,
            ext_cxn: &mut impl ExternalConnectivity,
            task_write: &impl TaskWriter,
        ) -> Result<u64, TaskError>;
    }
}

pub struct TaskService;

impl driving_ports::TaskPort for TaskService {
    async fn tasks_for_user(
        &self,
        user_id: i32,
        ext_cxn: &mut impl ExternalConnectivity,
        u_detect: &impl domain::user::driven_ports::DetectUser,
        task_read: &impl TaskReader,
    ) -> Result<Vec<Task>, TaskError> {
        domain::user::ensure_owner_exists(user_id, &mut *ext_cxn, u_detect).await?;
        let tasks = task_read.tasks_for_user(user_id, &mut *ext_cxn).await?;

        Ok(tasks)
    }

    async fn tasks_for_day(
        &self,
        user_id: i32,
        day: NaiveDate,
        hour: Option<u32>,
        ext_cxn: &mut impl ExternalConnectivity,
        clock: &impl Clock,
        u_detect: &impl domain::user::driven_ports::DetectUser,
        task_read: &impl TaskReader,
    ) -> Result<Vec<Task>, TaskError> {
        let tasks = self
            .tasks_for_user(user_id, &mut *ext_cxn, u_detect, task_read)
            .await?;
        let today = clock.today();

        let scheduled = match hour {
            Some(hour) => calendar::tasks_for_date_and_hour(&tasks, day, hour, today),
            None => calendar::tasks_for_date(&tasks, day, today),
        };

        Ok(scheduled.into_iter().cloned().collect())
    }

    async fn user_task_by_id(
        &self,
        user_id: i32,
        task_id: i32,
        ext_cxn: &mut impl ExternalConnectivity,
        u_detect: &impl domain::user::driven_ports::DetectUser,
        task_read: &impl TaskReader,
    ) -> Result<Option<Task>, TaskError> {
        domain::user::ensure_owner_exists(user_id, &mut *ext_cxn, u_detect).await?;
        let task = task_read
            .user_task_by_id(user_id, task_id, &mut *ext_cxn)
            .await?;

        Ok(task)
    }

    async fn recurring_tasks(
        &self,
        user_id: i32,
        ext_cxn: &mut impl ExternalConnectivity,
        clock: &impl Clock,
        u_detect: &impl domain::user::driven_ports::DetectUser,
        task_read: &impl TaskReader,
    ) -> Result<Vec<RecurringTaskSummary>, TaskError> {
        let tasks = self
            .tasks_for_user(user_id, &mut *ext_cxn, u_detect, task_read)
            .await?;

        Ok(summarize_recurring(&tasks, clock.today()))
    }

    async fn task_instances(
        &self,
        user_id: i32,
        task_id: i32,
        ext_cxn: &mut impl ExternalConnectivity,
        u_detect: &impl domain::user::driven_ports::DetectUser,
        task_read: &impl TaskReader,
    ) -> Result<Vec<Task>, TaskError> {
        let tasks = self
            .tasks_for_user(user_id, &mut *ext_cxn, u_detect, task_read)
            .await?;
        if !tasks.iter().any(|task| task.id == task_id) {
            return Err(TaskError::TaskDoesNotExist);
        }

        Ok(tasks
            .into_iter()
            .filter(|task| task.id == task_id || task.parent_task_id == Some(task_id))
            .collect())
    }

    async fn create_task_for_user(
        &self,
        user_id: i32,
        task: &CreateTask,
        ext_cxn: &mut impl ExternalConnectivity,
        clock: &impl Clock,
        u_detect: &impl domain::user::driven_ports::DetectUser,
        task_write: &impl TaskWriter,
    ) -> Result<i32, TaskError> {
        domain::user::ensure_owner_exists(user_id, &mut *ext_cxn, u_detect).await?;
        let new_task = NewTask::from_create(task, clock.now());
        let created_task_id = task_write
            .create_task_for_user(user_id, &new_task, &mut *ext_cxn)
            .await?;

        Ok(created_task_id)
    }

    async fn update_task(
        &self,
        user_id: i32,
        task_id: i32,
        update: &UpdateTask,
        ext_cxn: &mut impl ExternalConnectivity,
        task_read: &impl TaskReader,
        task_write: &impl TaskWriter,
    ) -> Result<Task, TaskError> {
        let mut task = task_read
            .user_task_by_id(user_id, task_id, &mut *ext_cxn)
            .await
            .context("looking up a task to update")?
            .ok_or(TaskError::TaskDoesNotExist)?;

        update.apply_to(&mut task);
        task_write
            .save_task(&task, &mut *ext_cxn)
            .await
            .context("updating a task")?;

        Ok(task)
    }

    async fn set_task_completion(
        &self,
        user_id: i32,
        task_id: i32,
        completed: bool,
        ext_cxn: &mut impl TransactableExternalConnectivity,
        clock: &impl Clock,
        task_read: &impl TaskReader,
        task_write: &impl TaskWriter,
    ) -> Result<CompletionOutcome, TaskError> {
        let mut txn = ext_cxn
            .start_transaction()
            .await
            .context("starting task completion transaction")?;
        let task = task_read
            .user_task_by_id(user_id, task_id, &mut txn)
            .await
            .context("looking up a task to complete")?
            .ok_or(TaskError::TaskDoesNotExist)?;

        if task.completed == completed {
            return Ok(CompletionOutcome {
                task,
                spawned_instance_id: None,
            });
        }

        if !completed {
            let reopened = reopen_task(&task);
            task_write
                .save_task(&reopened, &mut txn)
                .await
                .context("reopening a task")?;
            txn.commit().await?;

            return Ok(CompletionOutcome {
                task: reopened,
                spawned_instance_id: None,
            });
        }

        let CompletedTask {
            task: completed_task,
            successor,
        } = complete_task(&task, clock.now());
        task_write
            .save_task(&completed_task, &mut txn)
            .await
            .context("marking a task completed")?;

        let spawned_instance_id = match successor {
            Some(ref next_instance) => {
                let instance_id = task_write
                    .create_task_for_user(user_id, next_instance, &mut txn)
                    .await
                    .context("creating the next instance of a recurring task")?;
                info!(
                    "Task {task_id} spawned instance {instance_id} due {:?}",
                    next_instance.due_date
                );
                Some(instance_id)
            }
            None => None,
        };
        txn.commit().await?;

        Ok(CompletionOutcome {
            task: completed_task,
            spawned_instance_id,
        })
    }

    async fn delete_task(
        &self,
        user_id: i32,
        task_id: i32,
        ext_cxn: &mut impl ExternalConnectivity,
        task_write: &impl TaskWriter,
    ) -> Result<u64, TaskError> {
        let deleted = task_write
            .delete_task_and_instances(user_id, task_id, &mut *ext_cxn)
            .await
            .context("deleting a task")?;
        if deleted == 0 {
            return Err(TaskError::TaskDoesNotExist);
        }

        Ok(deleted)
    }
}
