use super::test_util::{self, send_empty, send_json};
use crate::api::test_util::deserialize_body;
use crate::dto;
use axum::http::{Method, StatusCode};

#[test]
#[cfg_attr(not(feature = "integration_test"), ignore)]
fn can_create_user() {
    test_util::prepare_db_and_test(|router| async move {
        let new_user = dto::NewUser {
            first_name: String::from("Evan"),
            last_name: String::from("Rittenhouse"),
        };

        let response = send_json(&router, Method::POST, "/users", &new_user).await;
        assert_eq!(StatusCode::CREATED, response.status());

        let response = send_empty(&router, Method::GET, "/users").await;
        let users: Vec<dto::User> = deserialize_body(response.into_body()).await;
        assert_eq!(1, users.len());
        assert_eq!("Evan", users[0].first_name);
    });
}

#[test]
#[cfg_attr(not(feature = "integration_test"), ignore)]
fn duplicate_user_is_a_conflict() {
    test_util::prepare_db_and_test(|router| async move {
        let new_user = dto::NewUser {
            first_name: String::from("Evan"),
            last_name: String::from("Rittenhouse"),
        };

        send_json(&router, Method::POST, "/users", &new_user).await;
        let response = send_json(&router, Method::POST, "/users", &new_user).await;

        assert_eq!(StatusCode::CONFLICT, response.status());
    });
}
