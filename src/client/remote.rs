use crate::client::{ClientConfig, SyncError};
use crate::dto;
use anyhow::Context;
use reqwest_middleware::{ClientBuilder, ClientWithMiddleware};
use reqwest_tracing::TracingMiddleware;
use serde::de::DeserializeOwned;
use std::time::Duration;

const REQUEST_TIMEOUT_SECS: u64 = 10;

/// The task API as seen by a single user's client. Every operation is scoped to that user.
pub trait RemoteStore: Sync {
    async fn fetch_tasks(&self) -> Result<Vec<dto::Task>, anyhow::Error>;
    async fn fetch_todos(&self) -> Result<Vec<dto::Todo>, anyhow::Error>;
    async fn fetch_stats(&self) -> Result<dto::UserStats, anyhow::Error>;

    async fn create_task(&self, task: &dto::NewTask) -> Result<i32, anyhow::Error>;
    async fn update_task(
        &self,
        task_id: i32,
        update: &dto::UpdateTask,
    ) -> Result<dto::Task, anyhow::Error>;
    async fn set_task_completion(
        &self,
        task_id: i32,
        completed: bool,
    ) -> Result<dto::TaskCompletionResult, anyhow::Error>;
    async fn delete_task(&self, task_id: i32) -> Result<u64, anyhow::Error>;

    async fn create_todo(&self, todo: &dto::NewTodo) -> Result<i32, anyhow::Error>;
    async fn update_todo(
        &self,
        todo_id: i32,
        update: &dto::UpdateTodo,
    ) -> Result<dto::Todo, anyhow::Error>;
    async fn set_todo_completion(
        &self,
        todo_id: i32,
        completed: bool,
    ) -> Result<dto::TodoCompletionResult, anyhow::Error>;
    async fn delete_todo(&self, todo_id: i32) -> Result<(), anyhow::Error>;

    async fn update_stats(&self, update: &dto::UpdateStats) -> Result<dto::UserStats, anyhow::Error>;
}

/// [RemoteStore] which talks to the task API over HTTP, propagating trace context on each request
pub struct HttpRemote {
    user_url: String,
    http_client: ClientWithMiddleware,
}

impl HttpRemote {
    pub fn new(config: &ClientConfig) -> Result<Self, SyncError> {
        let base_client = reqwest::Client::builder()
            .use_rustls_tls()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()
            .context("Building task API HTTP client")
            .map_err(SyncError::Remote)?;
        let http_client = ClientBuilder::new(base_client)
            .with(TracingMiddleware::default())
            .build();

        Ok(HttpRemote {
            user_url: format!(
                "{}/users/{}",
                config.api_url.trim_end_matches('/'),
                config.user_id
            ),
            http_client,
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.user_url)
    }

    /// Sends a request and reads a JSON body out of a successful response
    async fn read_json<T: DeserializeOwned>(
        request: reqwest_middleware::RequestBuilder,
        action: &str,
    ) -> Result<T, anyhow::Error> {
        let response = request
            .send()
            .await
            .with_context(|| format!("sending request to {action}"))?
            .error_for_status()
            .with_context(|| format!("task API refused to {action}"))?;

        response
            .json::<T>()
            .await
            .with_context(|| format!("reading response after trying to {action}"))
    }
}

impl RemoteStore for HttpRemote {
    async fn fetch_tasks(&self) -> Result<Vec<dto::Task>, anyhow::Error> {
        Self::read_json(self.http_client.get(self.url("/tasks")), "fetch tasks").await
    }

    async fn fetch_todos(&self) -> Result<Vec<dto::Todo>, anyhow::Error> {
        Self::read_json(self.http_client.get(self.url("/todos")), "fetch todos").await
    }

    async fn fetch_stats(&self) -> Result<dto::UserStats, anyhow::Error> {
        Self::read_json(self.http_client.get(self.url("/stats")), "fetch stats").await
    }

    async fn create_task(&self, task: &dto::NewTask) -> Result<i32, anyhow::Error> {
        let inserted: dto::InsertedTask = Self::read_json(
            self.http_client.post(self.url("/tasks")).json(task),
            "create a task",
        )
        .await?;

        Ok(inserted.id)
    }

    async fn update_task(
        &self,
        task_id: i32,
        update: &dto::UpdateTask,
    ) -> Result<dto::Task, anyhow::Error> {
        Self::read_json(
            self.http_client
                .patch(self.url(&format!("/tasks/{task_id}")))
                .json(update),
            "update a task",
        )
        .await
    }

    async fn set_task_completion(
        &self,
        task_id: i32,
        completed: bool,
    ) -> Result<dto::TaskCompletionResult, anyhow::Error> {
        Self::read_json(
            self.http_client
                .put(self.url(&format!("/tasks/{task_id}/completion")))
                .json(&dto::TaskCompletion { completed }),
            "change a task's completion",
        )
        .await
    }

    async fn delete_task(&self, task_id: i32) -> Result<u64, anyhow::Error> {
        let deleted: dto::DeletedTasks = Self::read_json(
            self.http_client.delete(self.url(&format!("/tasks/{task_id}"))),
            "delete a task",
        )
        .await?;

        Ok(deleted.deleted_count)
    }

    async fn create_todo(&self, todo: &dto::NewTodo) -> Result<i32, anyhow::Error> {
        let inserted: dto::InsertedTodo = Self::read_json(
            self.http_client.post(self.url("/todos")).json(todo),
            "create a todo",
        )
        .await?;

        Ok(inserted.id)
    }

    async fn update_todo(
        &self,
        todo_id: i32,
        update: &dto::UpdateTodo,
    ) -> Result<dto::Todo, anyhow::Error> {
        Self::read_json(
            self.http_client
                .patch(self.url(&format!("/todos/{todo_id}")))
                .json(update),
            "update a todo",
        )
        .await
    }

    async fn set_todo_completion(
        &self,
        todo_id: i32,
        completed: bool,
    ) -> Result<dto::TodoCompletionResult, anyhow::Error> {
        Self::read_json(
            self.http_client
                .put(self.url(&format!("/todos/{todo_id}/completion")))
                .json(&dto::TodoCompletion { completed }),
            "change a todo's completion",
        )
        .await
    }

    async fn delete_todo(&self, todo_id: i32) -> Result<(), anyhow::Error> {
        self.http_client
            .delete(self.url(&format!("/todos/{todo_id}")))
            .send()
            .await
            .context("sending request to delete a todo")?
            .error_for_status()
            .context("task API refused to delete a todo")?;

        Ok(())
    }

    async fn update_stats(&self, update: &dto::UpdateStats) -> Result<dto::UserStats, anyhow::Error> {
        Self::read_json(
            self.http_client.patch(self.url("/stats")).json(update),
            "update stats",
        )
        .await
    }
}
