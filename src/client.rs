pub mod cache;
pub mod remote;

use crate::{app_env, dto};
pub use cache::LocalCache;
pub use remote::{HttpRemote, RemoteStore};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use thiserror::Error;
use tracing::{info, warn};

const DEFAULT_CACHE_PATH: &str = "task-streaks-cache.json";

#[derive(Debug, Error)]
pub enum SyncError {
    #[error("the task API request failed")]
    Remote(#[source] anyhow::Error),
    #[error("the local cache could not be used")]
    Cache(#[source] anyhow::Error),
    #[error("no {kind} with ID {id} is loaded")]
    NotLoaded { kind: &'static str, id: i32 },
    #[error("client configuration is invalid: {0}")]
    Config(String),
}

/// Where the client's API and cache live, and which user it acts for
#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub api_url: String,
    pub user_id: i32,
    pub cache_path: PathBuf,
}

impl ClientConfig {
    /// Reads the configuration from the environment. The cache path is optional.
    pub fn from_env() -> Result<Self, SyncError> {
        let api_url = std::env::var(app_env::TASKS_API_URL)
            .map_err(|_| SyncError::Config(format!("{} is not set", app_env::TASKS_API_URL)))?;
        let user_id = std::env::var(app_env::TASKS_USER_ID)
            .map_err(|_| SyncError::Config(format!("{} is not set", app_env::TASKS_USER_ID)))?
            .parse::<i32>()
            .map_err(|err| {
                SyncError::Config(format!("{} is not a user ID: {err}", app_env::TASKS_USER_ID))
            })?;
        let cache_path = std::env::var(app_env::TASKS_CACHE_PATH)
            .unwrap_or_else(|_| DEFAULT_CACHE_PATH.to_owned());

        Ok(ClientConfig {
            api_url,
            user_id,
            cache_path: PathBuf::from(cache_path),
        })
    }
}

/// Everything the client knows about its user, as written to the local cache
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq, Default)]
pub struct Snapshot {
    pub tasks: Vec<dto::Task>,
    pub todos: Vec<dto::Todo>,
    pub stats: Option<dto::UserStats>,
}

/// Where the state currently held by a [ClientState] came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StateSource {
    Remote,
    Cache,
    Empty,
}

/// In-memory copy of a user's tasks, todos, and stats, kept in line with the task API.
///
/// Changes are sent to the API first. Local state only changes once the API accepts them,
/// and a failed request leaves it untouched. Every accepted change is mirrored into the local cache.
pub struct ClientState<R: RemoteStore> {
    remote: R,
    cache: LocalCache,
    snapshot: Snapshot,
    source: StateSource,
}

impl ClientState<HttpRemote> {
    /// Loads state for the configured user over HTTP
    pub async fn connect(config: &ClientConfig) -> Result<Self, SyncError> {
        let remote = HttpRemote::new(config)?;
        let cache = LocalCache::new(config.cache_path.clone());

        Self::load(remote, cache).await
    }
}

impl<R: RemoteStore> ClientState<R> {
    /// Fetches everything from the API, or falls back to the cached snapshot if the API can't be reached.
    /// Without either the state starts out empty.
    pub async fn load(remote: R, cache: LocalCache) -> Result<Self, SyncError> {
        let fetched = futures::try_join!(
            remote.fetch_tasks(),
            remote.fetch_todos(),
            remote.fetch_stats()
        );

        match fetched {
            Ok((tasks, todos, stats)) => {
                let state = ClientState {
                    remote,
                    cache,
                    snapshot: Snapshot {
                        tasks,
                        todos,
                        stats: Some(stats),
                    },
                    source: StateSource::Remote,
                };
                state.mirror_to_cache().await;

                Ok(state)
            }
            Err(err) => {
                warn!(error = ?err, "Task API unreachable, falling back to cached state");
                let cached = cache.load().await?;
                let (snapshot, source) = match cached {
                    Some(snapshot) => (snapshot, StateSource::Cache),
                    None => (Snapshot::default(), StateSource::Empty),
                };
                info!(?source, "Loaded client state without the task API");

                Ok(ClientState {
                    remote,
                    cache,
                    snapshot,
                    source,
                })
            }
        }
    }

    /// Replaces all local state with a fresh copy from the API
    #[tracing::instrument(skip(self))]
    pub async fn refresh(&mut self) -> Result<(), SyncError> {
        let (tasks, todos, stats) = futures::try_join!(
            self.remote.fetch_tasks(),
            self.remote.fetch_todos(),
            self.remote.fetch_stats()
        )
        .map_err(SyncError::Remote)?;

        self.snapshot = Snapshot {
            tasks,
            todos,
            stats: Some(stats),
        };
        self.source = StateSource::Remote;
        self.mirror_to_cache().await;

        Ok(())
    }

    pub fn source(&self) -> StateSource {
        self.source
    }

    pub fn snapshot(&self) -> &Snapshot {
        &self.snapshot
    }

    pub fn tasks(&self) -> &[dto::Task] {
        &self.snapshot.tasks
    }

    pub fn todos(&self) -> &[dto::Todo] {
        &self.snapshot.todos
    }

    pub fn stats(&self) -> Option<&dto::UserStats> {
        self.snapshot.stats.as_ref()
    }

    /// Repeating tasks which were created directly rather than generated from another task
    pub fn recurring_tasks(&self) -> impl Iterator<Item = &dto::Task> {
        self.snapshot.tasks.iter().filter(|task| {
            task.recurrence != dto::RecurrenceKind::Once && task.parent_task_id.is_none()
        })
    }

    /// The given recurring task followed by the tasks generated from it, matching the server's
    /// instances listing
    pub fn task_instances(&self, template_id: i32) -> impl Iterator<Item = &dto::Task> {
        self.snapshot
            .tasks
            .iter()
            .filter(move |task| task.id == template_id || task.parent_task_id == Some(template_id))
    }

    /// Creates a task and reloads the task list so it includes the stored version
    #[tracing::instrument(skip(self))]
    pub async fn add_task(&mut self, new_task: &dto::NewTask) -> Result<i32, SyncError> {
        let new_id = self
            .remote
            .create_task(new_task)
            .await
            .map_err(SyncError::Remote)?;
        self.reload_tasks().await?;

        Ok(new_id)
    }

    #[tracing::instrument(skip(self))]
    pub async fn update_task(
        &mut self,
        task_id: i32,
        update: &dto::UpdateTask,
    ) -> Result<dto::Task, SyncError> {
        let updated = self
            .remote
            .update_task(task_id, update)
            .await
            .map_err(SyncError::Remote)?;

        match self.snapshot.tasks.iter_mut().find(|task| task.id == task_id) {
            Some(existing) => *existing = updated.clone(),
            None => self.snapshot.tasks.push(updated.clone()),
        }
        self.mirror_to_cache().await;

        Ok(updated)
    }

    /// Marks a task complete or incomplete. The task list is reloaded afterward since completing a
    /// recurring task may generate its next instance.
    #[tracing::instrument(skip(self))]
    pub async fn set_task_completion(
        &mut self,
        task_id: i32,
        completed: bool,
    ) -> Result<dto::TaskCompletionResult, SyncError> {
        let outcome = self
            .remote
            .set_task_completion(task_id, completed)
            .await
            .map_err(SyncError::Remote)?;
        self.reload_tasks().await?;

        Ok(outcome)
    }

    /// Flips a loaded task's completion state
    pub async fn toggle_task_complete(
        &mut self,
        task_id: i32,
    ) -> Result<dto::TaskCompletionResult, SyncError> {
        let currently_completed = self
            .snapshot
            .tasks
            .iter()
            .find(|task| task.id == task_id)
            .map(|task| task.completed)
            .ok_or(SyncError::NotLoaded {
                kind: "task",
                id: task_id,
            })?;

        self.set_task_completion(task_id, !currently_completed).await
    }

    /// Deletes a task along with every instance generated from it
    #[tracing::instrument(skip(self))]
    pub async fn delete_task(&mut self, task_id: i32) -> Result<u64, SyncError> {
        let deleted_count = self
            .remote
            .delete_task(task_id)
            .await
            .map_err(SyncError::Remote)?;

        self.snapshot
            .tasks
            .retain(|task| task.id != task_id && task.parent_task_id != Some(task_id));
        self.mirror_to_cache().await;

        Ok(deleted_count)
    }

    /// Creates a todo and reloads the todo list so it includes the stored version
    #[tracing::instrument(skip(self))]
    pub async fn add_todo(&mut self, new_todo: &dto::NewTodo) -> Result<i32, SyncError> {
        let new_id = self
            .remote
            .create_todo(new_todo)
            .await
            .map_err(SyncError::Remote)?;
        self.snapshot.todos = self
            .remote
            .fetch_todos()
            .await
            .map_err(SyncError::Remote)?;
        self.mirror_to_cache().await;

        Ok(new_id)
    }

    #[tracing::instrument(skip(self))]
    pub async fn update_todo(
        &mut self,
        todo_id: i32,
        update: &dto::UpdateTodo,
    ) -> Result<dto::Todo, SyncError> {
        let updated = self
            .remote
            .update_todo(todo_id, update)
            .await
            .map_err(SyncError::Remote)?;

        self.replace_todo(updated.clone());
        self.mirror_to_cache().await;

        Ok(updated)
    }

    /// Marks a todo complete or incomplete, picking up the stats the server recalculated
    #[tracing::instrument(skip(self))]
    pub async fn set_todo_completion(
        &mut self,
        todo_id: i32,
        completed: bool,
    ) -> Result<dto::TodoCompletionResult, SyncError> {
        let outcome = self
            .remote
            .set_todo_completion(todo_id, completed)
            .await
            .map_err(SyncError::Remote)?;

        self.replace_todo(outcome.todo.clone());
        self.snapshot.stats = Some(outcome.stats.clone());
        self.mirror_to_cache().await;

        Ok(outcome)
    }

    /// Flips a loaded todo's completion state
    pub async fn toggle_todo_complete(
        &mut self,
        todo_id: i32,
    ) -> Result<dto::TodoCompletionResult, SyncError> {
        let currently_completed = self
            .snapshot
            .todos
            .iter()
            .find(|todo| todo.id == todo_id)
            .map(|todo| todo.completed)
            .ok_or(SyncError::NotLoaded {
                kind: "todo",
                id: todo_id,
            })?;

        self.set_todo_completion(todo_id, !currently_completed).await
    }

    #[tracing::instrument(skip(self))]
    pub async fn delete_todo(&mut self, todo_id: i32) -> Result<(), SyncError> {
        self.remote
            .delete_todo(todo_id)
            .await
            .map_err(SyncError::Remote)?;

        self.snapshot.todos.retain(|todo| todo.id != todo_id);
        self.mirror_to_cache().await;

        Ok(())
    }

    #[tracing::instrument(skip(self))]
    pub async fn update_stats(
        &mut self,
        update: &dto::UpdateStats,
    ) -> Result<dto::UserStats, SyncError> {
        let stats = self
            .remote
            .update_stats(update)
            .await
            .map_err(SyncError::Remote)?;

        self.snapshot.stats = Some(stats.clone());
        self.mirror_to_cache().await;

        Ok(stats)
    }

    async fn reload_tasks(&mut self) -> Result<(), SyncError> {
        self.snapshot.tasks = self
            .remote
            .fetch_tasks()
            .await
            .map_err(SyncError::Remote)?;
        self.mirror_to_cache().await;

        Ok(())
    }

    fn replace_todo(&mut self, updated: dto::Todo) {
        match self
            .snapshot
            .todos
            .iter_mut()
            .find(|todo| todo.id == updated.id)
        {
            Some(existing) => *existing = updated,
            None => self.snapshot.todos.push(updated),
        }
    }

    /// The cache is a fallback, so failing to write it doesn't fail the change that triggered the write
    async fn mirror_to_cache(&self) {
        if let Err(err) = self.cache.store(&self.snapshot).await {
            warn!(error = ?err, "Could not update the local cache");
        }
    }
}
