use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum_macros::{FromRequest, FromRequestParts};
#[cfg(test)]
use serde::Deserialize;
use serde::Serialize;
use tracing::error;
use utoipa::openapi::{RefOr, Schema};
use utoipa::{ToResponse, ToSchema, openapi};
use validator::ValidationErrors;

/// Contains diagnostic information about an API failure
#[derive(Serialize, Debug, ToSchema, ToResponse)]
#[cfg_attr(test, derive(Deserialize))]
#[response(examples(
    ("Not Found" = (
        summary = "Entity could not be found (404)",
        value = json!({
            "error_code": "not_found",
            "error_description": "The specified task did not exist.",
            "extra_info": null
        })
    )),

    ("Conflict" = (
        summary = "The request clashes with existing data (409)",
        value = json!({
            "error_code": "conflict",
            "error_description": "The provided user already exists.",
            "extra_info": null
        })
    )),

    ("Internal Failure" = (
        summary = "Something unexpected went wrong inside the server (500)",
        value = json!({
            "error_code": "internal_error",
            "error_description": "Could not access data to complete your request",
            "extra_info": null
        })
    )),

    ("Invalid Input" = (
        summary = "Invalid request body was passed (400)",
        value = json!({
            "error_code": "invalid_input",
            "error_description": "Submitted data was invalid.",
            "extra_info": {
                "time": [
                    {
                        "code": "time_of_day",
                        "message": null,
                        "params": {
                            "value": "25:99"
                        }
                    }
                ]
            }
        })
    )),

    ("Malformed JSON" = (
        summary = "Invalid JSON passed to server (400)",
        value = json!({
            "error_code": "invalid_json",
            "error_description": "The passed request body contained malformed or unreadable JSON.",
            "extra_info": "Failed to parse the request body as JSON: EOF while parsing an object at line 4 column 0"
        })
    ))
))]
pub struct BasicErrorResponse {
    pub error_code: String,
    pub error_description: String,
    #[cfg_attr(test, serde(skip_deserializing))]
    pub extra_info: Option<ExtraInfo>,
}

#[derive(Serialize, Debug, ToSchema)]
#[serde(untagged)]
pub enum ExtraInfo {
    ValidationIssues(ValidationErrorSchema),
    Message(String),
}

/// Stand-in OpenAPI schema for [ValidationErrors] which just provides an empty object
#[derive(Serialize, Debug)]
#[serde(transparent)]
pub struct ValidationErrorSchema(ValidationErrors);

impl<'schem> ToSchema<'schem> for ValidationErrorSchema {
    fn schema() -> (&'schem str, RefOr<Schema>) {
        (
            "ValidationErrorSchema",
            openapi::ObjectBuilder::new().into(),
        )
    }
}

fn basic_error(status: StatusCode, code: &str, description: String, extra_info: Option<ExtraInfo>) -> Response {
    (
        status,
        axum::Json(BasicErrorResponse {
            error_code: code.into(),
            error_description: description,
            extra_info,
        }),
    )
        .into_response()
}

/// Response type that wraps validation errors and turns them into [BasicErrorResponse]s
pub struct ValidationErrorResponse(ValidationErrors);

impl IntoResponse for ValidationErrorResponse {
    fn into_response(self) -> Response {
        basic_error(
            StatusCode::BAD_REQUEST,
            "invalid_input",
            "Submitted data was invalid.".to_owned(),
            Some(ExtraInfo::ValidationIssues(ValidationErrorSchema(self.0))),
        )
    }
}

impl From<ValidationErrors> for ValidationErrorResponse {
    fn from(value: ValidationErrors) -> Self {
        Self(value)
    }
}

/// Response for a missing entity, carrying a description of what couldn't be found
pub struct NotFoundErrorResponse(pub String);

impl IntoResponse for NotFoundErrorResponse {
    fn into_response(self) -> Response {
        basic_error(StatusCode::NOT_FOUND, "not_found", self.0, None)
    }
}

/// Response for a request which clashes with data that already exists
pub struct ConflictErrorResponse(pub String);

impl IntoResponse for ConflictErrorResponse {
    fn into_response(self) -> Response {
        basic_error(StatusCode::CONFLICT, "conflict", self.0, None)
    }
}

/// Response for unexpected failures. The cause is logged but never sent to the client.
pub struct GenericErrorResponse(pub anyhow::Error);

impl IntoResponse for GenericErrorResponse {
    fn into_response(self) -> Response {
        error!("Request failed: {:#}", self.0);
        basic_error(
            StatusCode::INTERNAL_SERVER_ERROR,
            "internal_error",
            "Could not access data to complete your request".to_owned(),
            None,
        )
    }
}

/// Wrapper for [axum::Json] which customizes the error response to use our
/// data structure for API errors
#[derive(FromRequest)]
#[from_request(via(axum::Json), rejection(JsonErrorResponse))]
pub struct Json<T>(pub T);

impl<T: Serialize> IntoResponse for Json<T> {
    fn into_response(self) -> Response {
        axum::Json(self.0).into_response()
    }
}

/// Response type representing JSON parse errors
pub struct JsonErrorResponse {
    parse_problem: String,
}

impl From<JsonRejection> for JsonErrorResponse {
    fn from(value: JsonRejection) -> Self {
        JsonErrorResponse {
            parse_problem: value.body_text(),
        }
    }
}

impl IntoResponse for JsonErrorResponse {
    fn into_response(self) -> Response {
        basic_error(
            StatusCode::BAD_REQUEST,
            "invalid_json",
            "The passed request body contained malformed or unreadable JSON.".into(),
            Some(ExtraInfo::Message(self.parse_problem)),
        )
    }
}

/// Wrapper for [axum::extract::Query] which reports malformed query strings with our
/// API error structure
#[derive(FromRequestParts)]
#[from_request(via(axum::extract::Query), rejection(QueryErrorResponse))]
pub struct Query<T>(pub T);

/// Response type representing query string parse errors
pub struct QueryErrorResponse {
    parse_problem: String,
}

impl From<QueryRejection> for QueryErrorResponse {
    fn from(value: QueryRejection) -> Self {
        QueryErrorResponse {
            parse_problem: value.body_text(),
        }
    }
}

impl IntoResponse for QueryErrorResponse {
    fn into_response(self) -> Response {
        basic_error(
            StatusCode::BAD_REQUEST,
            "invalid_input",
            "The query string could not be read.".into(),
            Some(ExtraInfo::Message(self.parse_problem)),
        )
    }
}
