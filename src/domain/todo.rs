use crate::domain::clock::Clock;
use crate::domain::stats::driven_ports::{StatsReader, StatsWriter};
use crate::domain::stats::{self, UserStats};
use crate::domain::todo::driven_ports::{TodoReader, TodoWriter};
use crate::domain::todo::driving_ports::TodoError;
use crate::domain::{self, user};
use crate::external_connections::{
    ExternalConnectivity, Transactable, TransactableExternalConnectivity, TransactionHandle,
};
use anyhow::{Context, anyhow};
use chrono::{DateTime, Utc};
use std::str::FromStr;
use tracing::{error, info};

/// Importance tier of a todo or task. Each tier is worth a fixed number of points.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Priority {
    Low,
    #[default]
    Medium,
    High,
}

impl Priority {
    pub fn points(&self) -> i32 {
        match self {
            Priority::Low => 1,
            Priority::Medium => 3,
            Priority::High => 5,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Priority::Low => "low",
            Priority::Medium => "medium",
            Priority::High => "high",
        }
    }
}

impl FromStr for Priority {
    type Err = anyhow::Error;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "low" => Ok(Priority::Low),
            "medium" => Ok(Priority::Medium),
            "high" => Ok(Priority::High),
            other => Err(anyhow!("unknown priority \"{other}\"")),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Todo {
    pub id: i32,
    pub owner_user_id: i32,
    pub title: String,
    pub description: Option<String>,
    pub completed: bool,
    pub points: i32,
    pub priority: Priority,
    pub created_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
    pub category: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreateTodo {
    pub title: String,
    pub description: Option<String>,
    pub priority: Priority,
    pub category: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewTodo {
    pub title: String,
    pub description: Option<String>,
    pub priority: Priority,
    pub points: i32,
    pub created_at: DateTime<Utc>,
    pub category: Option<String>,
}

impl NewTodo {
    fn from_create(create: &CreateTodo, created_at: DateTime<Utc>) -> NewTodo {
        NewTodo {
            title: create.title.clone(),
            description: create.description.clone(),
            priority: create.priority,
            points: create.priority.points(),
            created_at,
            category: create.category.clone(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UpdateTodo {
    pub title: Option<String>,
    pub description: Option<String>,
    pub priority: Option<Priority>,
    pub category: Option<String>,
}

impl UpdateTodo {
    /// Merges the populated fields onto [todo]. Changing the priority re-derives the points.
    pub fn apply_to(&self, todo: &mut Todo) {
        if let Some(ref title) = self.title {
            todo.title = title.clone();
        }
        if let Some(ref description) = self.description {
            todo.description = Some(description.clone());
        }
        if let Some(priority) = self.priority {
            todo.priority = priority;
            todo.points = priority.points();
        }
        if let Some(ref category) = self.category {
            todo.category = Some(category.clone());
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TodoCompletionOutcome {
    pub todo: Todo,
    pub stats: UserStats,
}

pub mod driven_ports {
    use super::*;

    pub trait TodoReader: Sync {
        async fn todos_for_user(
            &self,
            user_id: i32,
            ext_cxn: &mut impl ExternalConnectivity,
        ) -> Result<Vec<Todo>, anyhow::Error>;
        async fn user_todo_by_id(
            &self,
            user_id: i32,
            todo_id: i32,
            ext_cxn: &mut impl ExternalConnectivity,
        ) -> Result<Option<Todo>, anyhow::Error>;
    }

    pub trait TodoWriter: Sync {
        async fn create_todo_for_user(
            &self,
            user_id: i32,
            new_todo: &NewTodo,
            ext_cxn: &mut impl ExternalConnectivity,
        ) -> Result<i32, anyhow::Error>;
        async fn save_todo(
            &self,
            todo: &Todo,
            ext_cxn: &mut impl ExternalConnectivity,
        ) -> Result<(), anyhow::Error>;
        /// Returns whether a todo was actually removed
        async fn delete_todo(
            &self,
            user_id: i32,
            todo_id: i32,
            ext_cxn: &mut impl ExternalConnectivity,
        ) -> Result<bool, anyhow::Error>;
    }
}

pub mod driving_ports {
    use super::*;
    use crate::domain::user::driven_ports::DetectUser;
    use thiserror::Error;

    #[derive(Debug, Error)]
    pub enum TodoError {
        #[error("The specified user did not exist.")]
        UserDoesNotExist,
        #[error("The specified todo did not exist.")]
        TodoDoesNotExist,
        #[error(transparent)]
        PortError(#[from] anyhow::Error),
    }

    impl From<user::OwnerLookupError> for TodoError {
        fn from(value: user::OwnerLookupError) -> Self {
            match value {
                user::OwnerLookupError::UserDoesNotExist(user_id) => {
                    error!("User {} didn't exist when working with todos.", user_id);
                    TodoError::UserDoesNotExist
                }
                user::OwnerLookupError::PortError(err) => {
                    TodoError::from(err.context("Verifying todo owner"))
                }
            }
        }
    }

    pub trait TodoPort {
        async fn todos_for_user(
            &self,
            user_id: i32,
            ext_cxn: &mut impl ExternalConnectivity,
            u_detect: &impl DetectUser,
            todo_read: &impl TodoReader,
        ) -> Result<Vec<Todo>, TodoError>;
        async fn create_todo_for_user(
            &self,
            user_id: i32,
            todo: &CreateTodo,
            ext_cxn: &mut impl ExternalConnectivity,
            clock: &impl Clock,
            u_detect: &impl DetectUser,
            todo_write: &impl TodoWriter,
        ) -> Result<i32, TodoError>;
        async fn update_todo(
            &self,
            user_id: i32,
            todo_id: i32,
            update: &UpdateTodo,
            ext_cxn: &mut impl ExternalConnectivity,
            todo_read: &impl TodoReader,
            todo_write: &impl TodoWriter,
        ) -> Result<Todo, TodoError>;
        async fn delete_todo(
            &self,
            user_id: i32,
            todo_id: i32,
            ext_cxn: &mut impl ExternalConnectivity,
            todo_write: &impl TodoWriter,
        ) -> Result<(), TodoError>;
        async fn set_todo_completion(
            &self,
            user_id: i32,
            todo_id: i32,
            completed: bool,
            ext_cxn: &mut impl TransactableExternalConnectivity,
            clock: &impl Clock,
            todo_read: &impl TodoReader,
            todo_write: &impl TodoWriter,
            stats_read: &impl StatsReader,
            stats_write: &impl StatsWriter,
        ) -> Result<TodoCompletionOutcome, TodoError>;
    }
}

pub struct TodoService;

impl driving_ports::TodoPort for TodoService {
    async fn todos_for_user(
        &self,
        user_id: i32,
        ext_cxn: &mut impl ExternalConnectivity,
        u_detect: &impl user::driven_ports::DetectUser,
        todo_read: &impl TodoReader,
    ) -> Result<Vec<Todo>, TodoError> {
        domain::user::ensure_owner_exists(user_id, &mut *ext_cxn, u_detect).await?;
        let todos = todo_read.todos_for_user(user_id, &mut *ext_cxn).await?;

        Ok(todos)
    }

    async fn create_todo_for_user(
        &self,
        user_id: i32,
        todo: &CreateTodo,
        ext_cxn: &mut impl ExternalConnectivity,
        clock: &impl Clock,
        u_detect: &impl user::driven_ports::DetectUser,
        todo_write: &impl TodoWriter,
    ) -> Result<i32, TodoError> {
        domain::user::ensure_owner_exists(user_id, &mut *ext_cxn, u_detect).await?;
        let new_todo = NewTodo::from_create(todo, clock.now());
        let todo_id = todo_write
            .create_todo_for_user(user_id, &new_todo, &mut *ext_cxn)
            .await?;

        Ok(todo_id)
    }

    async fn update_todo(
        &self,
        user_id: i32,
        todo_id: i32,
        update: &UpdateTodo,
        ext_cxn: &mut impl ExternalConnectivity,
        todo_read: &impl TodoReader,
        todo_write: &impl TodoWriter,
    ) -> Result<Todo, TodoError> {
        let mut todo = todo_read
            .user_todo_by_id(user_id, todo_id, &mut *ext_cxn)
            .await
            .context("looking up a todo to update")?
            .ok_or(TodoError::TodoDoesNotExist)?;

        update.apply_to(&mut todo);
        todo_write
            .save_todo(&todo, &mut *ext_cxn)
            .await
            .context("updating a todo")?;

        Ok(todo)
    }

    async fn delete_todo(
        &self,
        user_id: i32,
        todo_id: i32,
        ext_cxn: &mut impl ExternalConnectivity,
        todo_write: &impl TodoWriter,
    ) -> Result<(), TodoError> {
        let deleted = todo_write
            .delete_todo(user_id, todo_id, &mut *ext_cxn)
            .await
            .context("deleting a todo")?;
        if !deleted {
            return Err(TodoError::TodoDoesNotExist);
        }

        Ok(())
    }

    async fn set_todo_completion(
        &self,
        user_id: i32,
        todo_id: i32,
        completed: bool,
        ext_cxn: &mut impl TransactableExternalConnectivity,
        clock: &impl Clock,
        todo_read: &impl TodoReader,
        todo_write: &impl TodoWriter,
        stats_read: &impl StatsReader,
        stats_write: &impl StatsWriter,
    ) -> Result<TodoCompletionOutcome, TodoError> {
        let mut txn = ext_cxn
            .start_transaction()
            .await
            .context("starting todo completion transaction")?;
        let mut todo = todo_read
            .user_todo_by_id(user_id, todo_id, &mut txn)
            .await
            .context("looking up a todo to complete")?
            .ok_or(TodoError::TodoDoesNotExist)?;
        let previous_stats = stats_read
            .stats_for_user(user_id, &mut txn)
            .await
            .context("reading stats for todo completion")?;

        if todo.completed == completed {
            return Ok(TodoCompletionOutcome {
                todo,
                stats: previous_stats.unwrap_or_else(|| UserStats::empty(user_id)),
            });
        }

        if !completed {
            todo.completed = false;
            todo.completed_at = None;
            todo_write
                .save_todo(&todo, &mut txn)
                .await
                .context("reopening a todo")?;
            txn.commit().await?;

            return Ok(TodoCompletionOutcome {
                todo,
                stats: previous_stats.unwrap_or_else(|| UserStats::empty(user_id)),
            });
        }

        let now = clock.now();
        let today = now.date_naive();
        todo.completed = true;
        todo.completed_at = Some(now);
        todo_write
            .save_todo(&todo, &mut txn)
            .await
            .context("marking a todo completed")?;

        let completed_today = todo_read
            .todos_for_user(user_id, &mut txn)
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

        let updated_stats = stats::record_todo_completion(
            previous_stats.unwrap_or_else(|| UserStats::empty(user_id)),
            todo.points,
            completed_today,
            today,
        );
        stats_write
            .save_stats(&updated_stats, &mut txn)
            .await
            .context("saving stats after todo completion")?;
        txn.commit().await?;

        info!(
            "User {user_id} completed todo {todo_id}, streak now {}",
            updated_stats.current_streak
        );

        Ok(TodoCompletionOutcome {
            todo,
            stats: updated_stats,
        })
    }
}
