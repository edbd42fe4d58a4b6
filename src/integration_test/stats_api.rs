use super::test_util::{self, create_user, send_empty, send_json};
use crate::api::test_util::deserialize_body;
use crate::dto;
use axum::http::{Method, StatusCode};

#[test]
#[cfg_attr(not(feature = "integration_test"), ignore)]
fn stats_are_created_on_first_read() {
    test_util::prepare_db_and_test(|router| async move {
        let user_id = create_user(&router, "Sam").await;

        let response = send_empty(&router, Method::GET, &format!("/users/{user_id}/stats")).await;

        assert_eq!(StatusCode::OK, response.status());
        let stats: dto::UserStats = deserialize_body(response.into_body()).await;
        assert_eq!(user_id, stats.user_id);
        assert_eq!(0, stats.total_points);
        assert_eq!(None, stats.last_active_date);
    });
}

#[test]
#[cfg_attr(not(feature = "integration_test"), ignore)]
fn manual_update_raises_longest_streak() {
    test_util::prepare_db_and_test(|router| async move {
        let user_id = create_user(&router, "Lee").await;

        let response = send_json(
            &router,
            Method::PATCH,
            &format!("/users/{user_id}/stats"),
            &dto::UpdateStats {
                total_points: Some(120),
                current_streak: Some(4),
                last_active_date: Some(chrono::Utc::now().date_naive()),
                ..Default::default()
            },
        )
        .await;

        assert_eq!(StatusCode::OK, response.status());
        let stats: dto::UserStats = deserialize_body(response.into_body()).await;
        assert_eq!(120, stats.total_points);
        assert_eq!(4, stats.current_streak);
        assert_eq!(4, stats.longest_streak);
    });
}

#[test]
#[cfg_attr(not(feature = "integration_test"), ignore)]
fn missing_user_has_no_stats() {
    test_util::prepare_db_and_test(|router| async move {
        let response = send_empty(&router, Method::GET, "/users/4040/stats").await;

        assert_eq!(StatusCode::NOT_FOUND, response.status());
    });
}

#[test]
#[cfg_attr(not(feature = "integration_test"), ignore)]
fn reading_stats_keeps_yesterdays_streak() {
    test_util::prepare_db_and_test(|router| async move {
        let user_id = create_user(&router, "Ari").await;
        let stats_url = format!("/users/{user_id}/stats");
        let yesterday = chrono::Utc::now().date_naive() - chrono::Days::new(1);

        let response = send_json(
            &router,
            Method::PATCH,
            &stats_url,
            &dto::UpdateStats {
                current_streak: Some(5),
                last_active_date: Some(yesterday),
                ..Default::default()
            },
        )
        .await;
        assert_eq!(StatusCode::OK, response.status());

        let response = send_empty(&router, Method::GET, &stats_url).await;
        assert_eq!(StatusCode::OK, response.status());
        let stats: dto::UserStats = deserialize_body(response.into_body()).await;
        assert_eq!(5, stats.current_streak);
        assert_eq!(Some(yesterday), stats.last_active_date);

        let response = send_json(
            &router,
            Method::POST,
            &format!("/users/{user_id}/todos"),
            &dto::NewTodo {
                title: String::from("Water the plants"),
                description: None,
                priority: dto::Priority::Low,
                category: None,
            },
        )
        .await;
        let inserted: dto::InsertedTodo = deserialize_body(response.into_body()).await;

        let response = send_json(
            &router,
            Method::PUT,
            &format!("/users/{user_id}/todos/{}/completion", inserted.id),
            &dto::TodoCompletion { completed: true },
        )
        .await;
        assert_eq!(StatusCode::OK, response.status());
        let outcome: dto::TodoCompletionResult = deserialize_body(response.into_body()).await;
        assert_eq!(6, outcome.stats.current_streak);
        assert_eq!(6, outcome.stats.longest_streak);
    });
}

#[test]
#[cfg_attr(not(feature = "integration_test"), ignore)]
fn reading_stats_after_a_missed_day_drops_the_streak() {
    test_util::prepare_db_and_test(|router| async move {
        let user_id = create_user(&router, "Noor").await;
        let stats_url = format!("/users/{user_id}/stats");
        let two_days_ago = chrono::Utc::now().date_naive() - chrono::Days::new(2);

        send_json(
            &router,
            Method::PATCH,
            &stats_url,
            &dto::UpdateStats {
                current_streak: Some(5),
                last_active_date: Some(two_days_ago),
                ..Default::default()
            },
        )
        .await;

        let response = send_empty(&router, Method::GET, &stats_url).await;
        let stats: dto::UserStats = deserialize_body(response.into_body()).await;
        assert_eq!(0, stats.current_streak);
        assert_eq!(5, stats.longest_streak);
    });
}
