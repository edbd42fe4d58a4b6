use super::test_util::{self, create_user, send_empty, send_json};
use crate::api::test_util::deserialize_body;
use crate::dto;
use axum::http::{Method, StatusCode};

#[test]
#[cfg_attr(not(feature = "integration_test"), ignore)]
fn completing_todo_awards_points_and_starts_streak() {
    test_util::prepare_db_and_test(|router| async move {
        let user_id = create_user(&router, "Tess").await;
        let todos_url = format!("/users/{user_id}/todos");

        let response = send_json(
            &router,
            Method::POST,
            &todos_url,
            &dto::NewTodo {
                title: String::from("File taxes"),
                description: None,
                priority: dto::Priority::High,
                category: None,
            },
        )
        .await;
        assert_eq!(StatusCode::CREATED, response.status());
        let inserted: dto::InsertedTodo = deserialize_body(response.into_body()).await;

        let completion_url = format!("{todos_url}/{}/completion", inserted.id);
        let response = send_json(
            &router,
            Method::PUT,
            &completion_url,
            &dto::TodoCompletion { completed: true },
        )
        .await;
        assert_eq!(StatusCode::OK, response.status());
        let outcome: dto::TodoCompletionResult = deserialize_body(response.into_body()).await;
        assert!(outcome.todo.completed);
        assert_eq!(5, outcome.stats.total_points);
        assert_eq!(1, outcome.stats.current_streak);
        assert_eq!(1, outcome.stats.todos_completed_today);

        // Points stay awarded when a todo is un-completed
        let response = send_json(
            &router,
            Method::PUT,
            &completion_url,
            &dto::TodoCompletion { completed: false },
        )
        .await;
        let outcome: dto::TodoCompletionResult = deserialize_body(response.into_body()).await;
        assert!(!outcome.todo.completed);
        assert_eq!(5, outcome.stats.total_points);
    });
}

#[test]
#[cfg_attr(not(feature = "integration_test"), ignore)]
fn deleted_todo_is_gone() {
    test_util::prepare_db_and_test(|router| async move {
        let user_id = create_user(&router, "Dee").await;
        let todos_url = format!("/users/{user_id}/todos");

        let response = send_json(
            &router,
            Method::POST,
            &todos_url,
            &dto::NewTodo {
                title: String::from("Call mom"),
                description: None,
                priority: dto::Priority::Low,
                category: Some(String::from("Family")),
            },
        )
        .await;
        let inserted: dto::InsertedTodo = deserialize_body(response.into_body()).await;

        let response = send_empty(
            &router,
            Method::DELETE,
            &format!("{todos_url}/{}", inserted.id),
        )
        .await;
        assert_eq!(StatusCode::NO_CONTENT, response.status());

        let response = send_empty(&router, Method::GET, &todos_url).await;
        let todos: Vec<dto::Todo> = deserialize_body(response.into_body()).await;
        assert!(todos.is_empty());
    });
}
