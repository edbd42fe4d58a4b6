use super::NewId;
use crate::domain;
use crate::domain::todo::{NewTodo, Priority, Todo};
use crate::external_connections::{ConnectionHandle, ExternalConnectivity};
use anyhow::{Context, Error};
use chrono::{DateTime, Utc};
use sqlx::{FromRow, query, query_as};

pub struct DbTodoReader;

#[derive(FromRow)]
struct TodoItemRow {
    id: i32,
    owner_user_id: i32,
    title: String,
    description: Option<String>,
    completed: bool,
    points: i32,
    priority: String,
    created_at: DateTime<Utc>,
    completed_at: Option<DateTime<Utc>>,
    category: Option<String>,
}

impl TryFrom<TodoItemRow> for Todo {
    type Error = anyhow::Error;

    fn try_from(value: TodoItemRow) -> Result<Self, Self::Error> {
        let priority: Priority = value
            .priority
            .parse()
            .with_context(|| format!("reading priority of todo {}", value.id))?;

        Ok(Todo {
            id: value.id,
            owner_user_id: value.owner_user_id,
            title: value.title,
            description: value.description,
            completed: value.completed,
            points: value.points,
            priority,
            created_at: value.created_at,
            completed_at: value.completed_at,
            category: value.category,
        })
    }
}

impl domain::todo::driven_ports::TodoReader for DbTodoReader {
    async fn todos_for_user(
        &self,
        user_id: i32,
        ext_cxn: &mut impl ExternalConnectivity,
    ) -> Result<Vec<Todo>, Error> {
        let mut cxn = ext_cxn.database_cxn().await?;

        let rows = query_as::<_, TodoItemRow>(
            "SELECT ti.* FROM todo_item ti WHERE ti.owner_user_id = $1 ORDER BY ti.id",
        )
        .bind(user_id)
        .fetch_all(cxn.borrow_connection())
        .await
        .context("trying to fetch todo items for a user")?;

        rows.into_iter().map(Todo::try_from).collect()
    }

    async fn user_todo_by_id(
        &self,
        user_id: i32,
        todo_id: i32,
        ext_cxn: &mut impl ExternalConnectivity,
    ) -> Result<Option<Todo>, Error> {
        let mut cxn = ext_cxn.database_cxn().await?;

        let row = query_as::<_, TodoItemRow>(
            "SELECT ti.* FROM todo_item ti WHERE ti.owner_user_id = $1 AND ti.id = $2",
        )
        .bind(user_id)
        .bind(todo_id)
        .fetch_optional(cxn.borrow_connection())
        .await
        .context("trying to fetch a todo item by ID")?;

        row.map(Todo::try_from).transpose()
    }
}

pub struct DbTodoWriter;

impl domain::todo::driven_ports::TodoWriter for DbTodoWriter {
    async fn create_todo_for_user(
        &self,
        user_id: i32,
        new_todo: &NewTodo,
        ext_cxn: &mut impl ExternalConnectivity,
    ) -> Result<i32, Error> {
        let mut cxn = ext_cxn.database_cxn().await?;

        let new_id = query_as::<_, NewId>(
            "INSERT INTO todo_item(owner_user_id, title, description, points, priority, created_at, category) \
            VALUES ($1, $2, $3, $4, $5, $6, $7) RETURNING todo_item.id",
        )
        .bind(user_id)
        .bind(&new_todo.title)
        .bind(&new_todo.description)
        .bind(new_todo.points)
        .bind(new_todo.priority.as_str())
        .bind(new_todo.created_at)
        .bind(&new_todo.category)
        .fetch_one(cxn.borrow_connection())
        .await
        .context("trying to insert a new todo into the database")?;

        Ok(new_id.id)
    }

    async fn save_todo(
        &self,
        todo: &Todo,
        ext_cxn: &mut impl ExternalConnectivity,
    ) -> Result<(), Error> {
        let mut cxn = ext_cxn.database_cxn().await?;

        query(
            "UPDATE todo_item SET title = $1, description = $2, completed = $3, points = $4, \
                priority = $5, completed_at = $6, category = $7 \
            WHERE id = $8 AND owner_user_id = $9",
        )
        .bind(&todo.title)
        .bind(&todo.description)
        .bind(todo.completed)
        .bind(todo.points)
        .bind(todo.priority.as_str())
        .bind(todo.completed_at)
        .bind(&todo.category)
        .bind(todo.id)
        .bind(todo.owner_user_id)
        .execute(cxn.borrow_connection())
        .await
        .context("trying to update a todo in the database")?;

        Ok(())
    }

    async fn delete_todo(
        &self,
        user_id: i32,
        todo_id: i32,
        ext_cxn: &mut impl ExternalConnectivity,
    ) -> Result<bool, Error> {
        let mut cxn = ext_cxn.database_cxn().await?;

        let result = query("DELETE FROM todo_item WHERE owner_user_id = $1 AND id = $2")
            .bind(user_id)
            .bind(todo_id)
            .execute(cxn.borrow_connection())
            .await
            .context("trying to remove a todo from the database")?;

        Ok(result.rows_affected() > 0)
    }
}
