use crate::domain;
use derive_more::Display;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use validator::Validate;

/// DTO for a constructed user
#[derive(Serialize, Deserialize, ToSchema, Debug, Clone, PartialEq, Eq)]
pub struct User {
    #[schema(example = 4)]
    pub id: i32,
    #[schema(example = "John")]
    pub first_name: String,
    #[schema(example = "Doe")]
    pub last_name: String,
}

impl From<domain::user::User> for User {
    fn from(value: domain::user::User) -> Self {
        User {
            id: value.id,
            first_name: value.first_name,
            last_name: value.last_name,
        }
    }
}

/// DTO for creating a new user via the API
#[derive(Serialize, Deserialize, Display, Validate, ToSchema, Debug, Clone)]
#[display("{first_name} {last_name}")]
pub struct NewUser {
    #[validate(length(min = 1, max = 30))]
    #[schema(example = "John")]
    pub first_name: String,
    #[validate(length(min = 1, max = 50))]
    #[schema(example = "Doe")]
    pub last_name: String,
}

impl From<NewUser> for domain::user::CreateUser {
    fn from(value: NewUser) -> Self {
        domain::user::CreateUser {
            first_name: value.first_name,
            last_name: value.last_name,
        }
    }
}

/// DTO containing the ID of a user that was created via the API.
#[derive(Serialize, Deserialize, ToSchema, Debug)]
pub struct InsertedUser {
    #[schema(example = 10)]
    pub id: i32,
}
