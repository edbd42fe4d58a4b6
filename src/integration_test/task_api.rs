use super::test_util::{self, create_user, send_empty, send_json};
use crate::api::test_util::deserialize_body;
use crate::dto;
use axum::http::{Method, StatusCode};

fn daily_task(title: &str) -> dto::NewTask {
    dto::NewTask {
        title: title.to_owned(),
        description: None,
        category: "Health".to_owned(),
        time: "07:30".to_owned(),
        recurrence: dto::RecurrenceKind::Daily,
        recurrence_rule: None,
        due_date: None,
        points: Some(5),
        priority: None,
    }
}

#[test]
#[cfg_attr(not(feature = "integration_test"), ignore)]
fn completing_recurring_task_spawns_one_instance() {
    test_util::prepare_db_and_test(|router| async move {
        let user_id = create_user(&router, "Rita").await;
        let tasks_url = format!("/users/{user_id}/tasks");

        let response = send_json(&router, Method::POST, &tasks_url, &daily_task("Stretch")).await;
        assert_eq!(StatusCode::CREATED, response.status());
        let inserted: dto::InsertedTask = deserialize_body(response.into_body()).await;

        let completion_url = format!("{tasks_url}/{}/completion", inserted.id);
        let response = send_json(
            &router,
            Method::PUT,
            &completion_url,
            &dto::TaskCompletion { completed: true },
        )
        .await;
        assert_eq!(StatusCode::OK, response.status());
        let outcome: dto::TaskCompletionResult = deserialize_body(response.into_body()).await;
        assert!(outcome.task.completed);
        let Some(instance_id) = outcome.spawned_instance_id else {
            panic!("Completing a daily task should spawn its next instance");
        };

        // Completing again without un-completing first changes nothing
        let response = send_json(
            &router,
            Method::PUT,
            &completion_url,
            &dto::TaskCompletion { completed: true },
        )
        .await;
        let outcome: dto::TaskCompletionResult = deserialize_body(response.into_body()).await;
        assert_eq!(None, outcome.spawned_instance_id);

        let response = send_empty(
            &router,
            Method::GET,
            &format!("{tasks_url}/{}/instances", inserted.id),
        )
        .await;
        let series: Vec<dto::Task> = deserialize_body(response.into_body()).await;
        assert_eq!(2, series.len());
        let Some(instance) = series.iter().find(|task| task.id == instance_id) else {
            panic!("Spawned instance should be listed with its template");
        };
        assert_eq!(Some(inserted.id), instance.parent_task_id);
        assert!(!instance.completed);

        let response = send_empty(&router, Method::GET, &format!("{tasks_url}/recurring")).await;
        let recurring: Vec<dto::RecurringTaskSummary> =
            deserialize_body(response.into_body()).await;
        assert_eq!(1, recurring.len());
        assert_eq!(1, recurring[0].instance_count);
    });
}

#[test]
#[cfg_attr(not(feature = "integration_test"), ignore)]
fn deleting_template_removes_instances() {
    test_util::prepare_db_and_test(|router| async move {
        let user_id = create_user(&router, "Dana").await;
        let tasks_url = format!("/users/{user_id}/tasks");

        let response = send_json(&router, Method::POST, &tasks_url, &daily_task("Read")).await;
        let inserted: dto::InsertedTask = deserialize_body(response.into_body()).await;
        send_json(
            &router,
            Method::PUT,
            &format!("{tasks_url}/{}/completion", inserted.id),
            &dto::TaskCompletion { completed: true },
        )
        .await;

        let response = send_empty(
            &router,
            Method::DELETE,
            &format!("{tasks_url}/{}", inserted.id),
        )
        .await;
        assert_eq!(StatusCode::OK, response.status());
        let deleted: dto::DeletedTasks = deserialize_body(response.into_body()).await;
        assert_eq!(2, deleted.deleted_count);

        let response = send_empty(&router, Method::GET, &tasks_url).await;
        let remaining: Vec<dto::Task> = deserialize_body(response.into_body()).await;
        assert!(remaining.is_empty());
    });
}

#[test]
#[cfg_attr(not(feature = "integration_test"), ignore)]
fn tasks_are_scoped_to_their_owner() {
    test_util::prepare_db_and_test(|router| async move {
        let owner_id = create_user(&router, "Owner").await;
        let other_id = create_user(&router, "Other").await;

        let response = send_json(
            &router,
            Method::POST,
            &format!("/users/{owner_id}/tasks"),
            &daily_task("Private"),
        )
        .await;
        let inserted: dto::InsertedTask = deserialize_body(response.into_body()).await;

        let response = send_empty(
            &router,
            Method::GET,
            &format!("/users/{other_id}/tasks/{}", inserted.id),
        )
        .await;

        assert_eq!(StatusCode::NOT_FOUND, response.status());
    });
}
