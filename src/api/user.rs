use crate::domain::user::driving_ports::{CreateUserError, UserPort};
use crate::external_connections::ExternalConnectivity;
use crate::routing_utils::{
    BasicErrorResponse, ConflictErrorResponse, GenericErrorResponse, Json, ValidationErrorResponse,
};
use crate::{AppState, SharedData, domain, dto, persistence};
use axum::Router;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{ErrorResponse, IntoResponse, Response};
use axum::routing::get;
use std::sync::Arc;
use tracing::info;
use utoipa::OpenApi;
use validator::Validate;

#[derive(OpenApi)]
#[openapi(paths(get_users, create_user))]
/// Defines the OpenAPI documentation for the user API
pub struct UsersApi;
/// Constant used to group user endpoints in OpenAPI documentation
pub const USER_API_GROUP: &str = "Users";

impl IntoResponse for CreateUserError {
    fn into_response(self) -> Response {
        match self {
            CreateUserError::UserAlreadyExists => {
                ConflictErrorResponse(self.to_string()).into_response()
            }
            CreateUserError::PortError(cause) => GenericErrorResponse(cause).into_response(),
        }
    }
}

/// Builds a router for all the user routes
pub fn user_routes() -> Router<Arc<SharedData>> {
    Router::new().route(
        "/users",
        get(|State(app_state): AppState| async move {
            let mut ext_cxn = app_state.ext_cxn.clone();
            let user_service = domain::user::UserService;

            get_users(&mut ext_cxn, &user_service).await
        })
        .post(
            |State(app_state): AppState, Json(new_user): Json<dto::NewUser>| async move {
                let mut ext_cxn = app_state.ext_cxn.clone();
                let user_service = domain::user::UserService;

                create_user(new_user, &mut ext_cxn, &user_service).await
            },
        ),
    )
}

#[utoipa::path(
    get,
    path = "/users",
    tag = USER_API_GROUP,
    responses(
        (status = 200, description = "List of users", body = Vec<dto::User>),
        (status = 500, response = BasicErrorResponse),
    ),
)]
#[tracing::instrument(skip_all)]
/// Retrieves a list of all the users in the system.
async fn get_users(
    ext_cxn: &mut impl ExternalConnectivity,
    user_service: &impl UserPort,
) -> Result<Json<Vec<dto::User>>, ErrorResponse> {
    info!("Requested users");
    let user_reader = persistence::db_user_driven_ports::DbReadUsers;

    let users = user_service
        .get_users(&mut *ext_cxn, &user_reader)
        .await
        .map_err(GenericErrorResponse)?;

    Ok(Json(users.into_iter().map(dto::User::from).collect()))
}

#[utoipa::path(
    post,
    path = "/users",
    tag = USER_API_GROUP,
    request_body = dto::NewUser,
    responses(
        (status = 201, description = "User created", body = dto::InsertedUser),
        (status = 400, response = BasicErrorResponse),
        (status = 409, response = BasicErrorResponse),
        (status = 500, response = BasicErrorResponse),
    ),
)]
#[tracing::instrument(skip(ext_cxn, user_service))]
/// Creates a user.
async fn create_user(
    new_user: dto::NewUser,
    ext_cxn: &mut impl ExternalConnectivity,
    user_service: &impl UserPort,
) -> Result<(StatusCode, Json<dto::InsertedUser>), ErrorResponse> {
    info!("Attempt to create user: {}", new_user);
    new_user.validate().map_err(ValidationErrorResponse::from)?;

    let domain_user = domain::user::CreateUser::from(new_user);
    let user_writer = persistence::db_user_driven_ports::DbWriteUsers;
    let user_detect = persistence::db_user_driven_ports::DbDetectUser;

    let new_id = user_service
        .create_user(&domain_user, &mut *ext_cxn, &user_writer, &user_detect)
        .await?;

    Ok((StatusCode::CREATED, Json(dto::InsertedUser { id: new_id })))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::test_util::deserialize_body;
    use crate::domain::user::test_util::MockUserService;
    use crate::external_connections::test_util::FakeExternalConnectivity;
    use speculoos::prelude::*;
    use std::sync::Mutex;

    mod get_users {
        use super::*;

        #[tokio::test]
        async fn happy_path() {
            let mut user_service_raw = MockUserService::new();
            let mut ext_cxn = FakeExternalConnectivity::new();
            user_service_raw
                .get_users_result
                .set_returned_result(Ok(vec![domain::user::User {
                    id: 5,
                    first_name: "Jane".to_owned(),
                    last_name: "Doe".to_owned(),
                }]));
            let user_service = Mutex::new(user_service_raw);

            let response = get_users(&mut ext_cxn, &user_service).await;
            let Ok(Json(users)) = response else {
                panic!("Didn't get users back");
            };

            assert_that!(users).is_equal_to(vec![dto::User {
                id: 5,
                first_name: "Jane".to_owned(),
                last_name: "Doe".to_owned(),
            }]);
        }

        #[tokio::test]
        async fn returns_500_on_failure() {
            let mut user_service_raw = MockUserService::new();
            let mut ext_cxn = FakeExternalConnectivity::new();
            user_service_raw
                .get_users_result
                .set_returned_result(Err("database offline".to_owned()));
            let user_service = Mutex::new(user_service_raw);

            let response = get_users(&mut ext_cxn, &user_service)
                .await
                .into_response();

            assert_eq!(StatusCode::INTERNAL_SERVER_ERROR, response.status());
            let body: BasicErrorResponse = deserialize_body(response.into_body()).await;
            assert_eq!("internal_error", body.error_code);
        }
    }

    mod create_user {
        use super::*;

        fn new_user() -> dto::NewUser {
            dto::NewUser {
                first_name: "Jane".to_owned(),
                last_name: "Doe".to_owned(),
            }
        }

        #[tokio::test]
        async fn happy_path() {
            let mut user_service_raw = MockUserService::new();
            let mut ext_cxn = FakeExternalConnectivity::new();
            user_service_raw.create_user_result.set_returned_result(Ok(5));
            let user_service = Mutex::new(user_service_raw);

            let response = create_user(new_user(), &mut ext_cxn, &user_service).await;
            let Ok((status, Json(inserted))) = response else {
                panic!("User creation failed");
            };

            assert_eq!(StatusCode::CREATED, status);
            assert_eq!(5, inserted.id);
        }

        #[tokio::test]
        async fn duplicate_user_gives_409() {
            let mut user_service_raw = MockUserService::new();
            let mut ext_cxn = FakeExternalConnectivity::new();
            user_service_raw
                .create_user_result
                .set_returned_result(Err(CreateUserError::UserAlreadyExists));
            let user_service = Mutex::new(user_service_raw);

            let response = create_user(new_user(), &mut ext_cxn, &user_service)
                .await
                .into_response();

            assert_eq!(StatusCode::CONFLICT, response.status());
            let body: BasicErrorResponse = deserialize_body(response.into_body()).await;
            assert_eq!("conflict", body.error_code);
        }

        #[tokio::test]
        async fn long_names_give_400() {
            let user_service = Mutex::new(MockUserService::new());
            let mut ext_cxn = FakeExternalConnectivity::new();

            let long_user = dto::NewUser {
                first_name: "A".repeat(31),
                last_name: "Doe".to_owned(),
            };
            let response = create_user(long_user, &mut ext_cxn, &user_service)
                .await
                .into_response();

            assert_eq!(StatusCode::BAD_REQUEST, response.status());
        }
    }
}
