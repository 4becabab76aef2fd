// SPDX-FileCopyrightText: OpenTalk GmbH <mail@opentalk.eu>
//
// SPDX-License-Identifier: EUPL-1.2

//! The default REST API error.

use core::fmt;
use std::borrow::Cow;

use http0::StatusCode;
use serde::{Deserialize, Serialize};
use validator::ValidationErrors;

/// Machine readable code for an invalid field value.
pub const ERROR_CODE_INVALID_VALUE: &str = "invalid_value";
/// Machine readable code for a value that is out of range.
pub const ERROR_CODE_OUT_OF_RANGE: &str = "out_of_range";
/// Machine readable code for a value with an invalid length.
pub const ERROR_CODE_INVALID_LENGTH: &str = "invalid_length";
/// Machine readable code for a missing required value.
pub const ERROR_CODE_VALUE_REQUIRED: &str = "value_required";
/// Machine readable code for an invalid URL value.
pub const ERROR_CODE_INVALID_URL: &str = "invalid_url";

/// Authentication failure communicated via the `WWW-Authenticate` header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthenticationError {
    /// The bearer access token could not be parsed or verified.
    InvalidAccessToken,
    /// The access token expired.
    AccessTokenExpired,
    /// The room member token could not be parsed or verified.
    InvalidMemberToken,
}

impl AuthenticationError {
    /// Render the `WWW-Authenticate` header value.
    pub fn header_value(self) -> String {
        let description = match self {
            Self::InvalidAccessToken => "invalid access token",
            Self::AccessTokenExpired => "access token expired",
            Self::InvalidMemberToken => "invalid room member token",
        };

        format!("Bearer error=\"invalid_token\", error_description=\"{description}\"")
    }
}

/// Standard JSON error body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StandardErrorBody {
    /// Machine readable error code.
    pub code: Cow<'static, str>,
    /// Human readable error message.
    pub message: Cow<'static, str>,
}

/// A single field error inside a [`ValidationErrorBody`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationErrorEntry {
    /// The invalid field, absent for whole-body errors.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub field: Option<Cow<'static, str>>,
    /// Machine readable error code.
    pub code: Cow<'static, str>,
    /// Optional human readable message.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<Cow<'static, str>>,
}

/// JSON error body carrying per-field validation errors.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationErrorBody {
    /// Machine readable error code.
    pub code: Cow<'static, str>,
    /// Human readable error message.
    pub message: Cow<'static, str>,
    /// Per-field errors.
    pub errors: Vec<ValidationErrorEntry>,
}

/// Body of an [`ApiError`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ErrorBody {
    /// Validation error with per-field details.
    Validation(ValidationErrorBody),
    /// Plain code + message error.
    Standard(StandardErrorBody),
}

/// The default REST API error.
///
/// Can be built via the associated functions to represent various HTTP
/// errors. Each HTTP error has a default error code and message that get
/// sent in a JSON body; both can be overwritten when creating an error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiError {
    /// The HTTP status code of the error.
    pub status: StatusCode,
    /// An optional authentication header value.
    pub www_authenticate: Option<AuthenticationError>,
    /// The body of the error.
    pub body: ErrorBody,
}

impl ApiError {
    fn new_standard<T>(status: StatusCode, code: T, message: T) -> Self
    where
        T: Into<Cow<'static, str>>,
    {
        Self {
            status,
            www_authenticate: None,
            body: ErrorBody::Standard(StandardErrorBody {
                code: code.into(),
                message: message.into(),
            }),
        }
    }

    /// Override the default code for an error.
    pub fn with_code<T>(mut self, code: T) -> Self
    where
        T: Into<Cow<'static, str>>,
    {
        match &mut self.body {
            ErrorBody::Standard(std) => std.code = code.into(),
            ErrorBody::Validation(val) => val.code = code.into(),
        }

        self
    }

    /// Override the default message for an error.
    pub fn with_message<T>(mut self, message: T) -> Self
    where
        T: Into<Cow<'static, str>>,
    {
        match &mut self.body {
            ErrorBody::Standard(std) => std.message = message.into(),
            ErrorBody::Validation(val) => val.message = message.into(),
        }

        self
    }

    /// Add the `WWW-Authenticate` header to this error.
    pub fn with_www_authenticate(mut self, authentication_error: AuthenticationError) -> Self {
        self.www_authenticate = Some(authentication_error);

        self
    }

    /// The machine readable code of the error body.
    pub fn code(&self) -> &str {
        match &self.body {
            ErrorBody::Standard(std) => &std.code,
            ErrorBody::Validation(val) => &val.code,
        }
    }

    /// Create a new 400 Bad Request error.
    pub fn bad_request() -> Self {
        Self::new_standard(
            StatusCode::BAD_REQUEST,
            "bad_request",
            "Invalid request due to malformed syntax",
        )
    }

    /// Create a new 401 Unauthorized error.
    pub fn unauthorized() -> Self {
        Self::new_standard(
            StatusCode::UNAUTHORIZED,
            "unauthorized",
            "Authentication failed",
        )
    }

    /// Create a new 403 Forbidden error.
    pub fn forbidden() -> Self {
        Self::new_standard(
            StatusCode::FORBIDDEN,
            "forbidden",
            "Access to the requested resource is forbidden",
        )
    }

    /// Create a new 404 Not Found error.
    pub fn not_found() -> Self {
        Self::new_standard(
            StatusCode::NOT_FOUND,
            "not_found",
            "A requested resource could not be found",
        )
    }

    /// Create a new 409 Conflict error.
    pub fn conflict() -> Self {
        Self::new_standard(
            StatusCode::CONFLICT,
            "conflict",
            "The request conflicts with the state of the resource",
        )
    }

    /// Create a new 416 Range Not Satisfiable error.
    pub fn range_not_satisfiable() -> Self {
        Self::new_standard(
            StatusCode::RANGE_NOT_SATISFIABLE,
            "range_not_satisfiable",
            "The requested range lies outside the resource",
        )
    }

    /// Create a new 422 Unprocessable Entity error.
    ///
    /// See [`Self::unprocessable_entities()`].
    pub fn unprocessable_entity() -> Self {
        Self::unprocessable_entities::<ValidationErrorEntry, _>([])
    }

    /// Create a new 422 Unprocessable Entity error.
    ///
    /// This error is normally created from [`ValidationErrors`] of the
    /// validator crate. The JSON body additionally contains a list of
    /// errors for each invalid field.
    pub fn unprocessable_entities<T, I>(errors: I) -> Self
    where
        T: Into<ValidationErrorEntry>,
        I: IntoIterator<Item = T>,
    {
        let errors = errors.into_iter().map(|entry| entry.into()).collect();

        Self {
            status: StatusCode::UNPROCESSABLE_ENTITY,
            www_authenticate: None,
            body: ErrorBody::Validation(ValidationErrorBody {
                code: "validation_failed".into(),
                message: "Some provided values are invalid".into(),
                errors,
            }),
        }
    }

    /// Create a new 500 Internal Server Error.
    pub fn internal() -> Self {
        Self::new_standard(
            StatusCode::INTERNAL_SERVER_ERROR,
            "internal_server_error",
            "An internal server error occurred",
        )
    }

    /// Create a new 503 Service Unavailable error.
    ///
    /// Used for every transport-level unavailability of a dependency
    /// (media server, cache, object store).
    pub fn service_unavailable() -> Self {
        Self::new_standard(
            StatusCode::SERVICE_UNAVAILABLE,
            "service_unavailable",
            "A required backend service is currently unavailable",
        )
    }
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.body {
            ErrorBody::Standard(StandardErrorBody { code, message }) => {
                write!(
                    f,
                    "status={}, code={}, message={}",
                    self.status, code, message
                )
            }
            ErrorBody::Validation(ValidationErrorBody {
                code,
                message,
                errors,
            }) => {
                write!(
                    f,
                    "status={}, code={}, message={}, errors={}",
                    self.status,
                    code,
                    message,
                    serde_json::to_string(errors)
                        .unwrap_or_else(|_| "unserializable errors".to_string())
                )
            }
        }
    }
}

impl std::error::Error for ApiError {}

#[cfg(feature = "actix")]
impl actix_web::ResponseError for ApiError {
    fn status_code(&self) -> StatusCode {
        self.status
    }

    fn error_response(&self) -> actix_web::HttpResponse<actix_http::body::BoxBody> {
        let mut response = actix_web::HttpResponse::new(self.status_code());

        let _ = response.headers_mut().insert(
            http0::header::CONTENT_TYPE,
            actix_http::header::HeaderValue::from_static("application/json; charset=utf-8"),
        );

        if let Some(www_authenticate) = self.www_authenticate {
            if let Ok(value) = www_authenticate.header_value().try_into() {
                let _ = response
                    .headers_mut()
                    .insert(http0::header::WWW_AUTHENTICATE, value);
            }
        }

        let body = serde_json::to_string(&self.body).expect("Unable to serialize API error body");

        response.set_body(actix_http::body::BoxBody::new(body))
    }
}

#[cfg(feature = "actix")]
impl From<actix_web::Error> for ApiError {
    fn from(value: actix_web::Error) -> Self {
        log::error!("REST API threw internal error from actix web error: {value}");
        Self::internal()
    }
}

impl From<ValidationErrors> for ApiError {
    /// Creates a 422 Unprocessable Entity response from [`ValidationErrors`].
    ///
    /// Nested struct errors are flattened; the field name of a nested error
    /// is the leaf field name.
    fn from(validation_errors: ValidationErrors) -> Self {
        let mut entries = Vec::with_capacity(validation_errors.errors().len());

        collect_validation_errors(validation_errors, &mut entries);

        Self::unprocessable_entities(entries)
    }
}

fn collect_validation_errors(
    validation_errors: ValidationErrors,
    entries: &mut Vec<ValidationErrorEntry>,
) {
    for (field, error_kind) in validation_errors.into_errors() {
        let field = field.to_string();
        let field = (field != "__all__").then(|| Cow::Owned(field));

        match error_kind {
            validator::ValidationErrorsKind::Field(errors) => {
                for error in errors {
                    entries.push(ValidationErrorEntry {
                        field: field.clone(),
                        code: Cow::Borrowed(convert_validation_code(&error.code)),
                        message: error.message,
                    });
                }
            }
            validator::ValidationErrorsKind::Struct(inner_errors) => {
                collect_validation_errors(*inner_errors, entries);
            }
            validator::ValidationErrorsKind::List(list) => {
                for (_, inner_errors) in list {
                    collect_validation_errors(*inner_errors, entries);
                }
            }
        }
    }
}

fn convert_validation_code(code: &str) -> &'static str {
    match code {
        "url" => ERROR_CODE_INVALID_URL,
        "length" => ERROR_CODE_INVALID_LENGTH,
        "range" => ERROR_CODE_OUT_OF_RANGE,
        "required" => ERROR_CODE_VALUE_REQUIRED,
        _ => ERROR_CODE_INVALID_VALUE,
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use serde_json::json;
    use validator::Validate;

    use super::*;

    #[derive(Debug, Validate)]
    struct ValidationTester {
        #[validate(length(max = 5))]
        name: String,
        #[validate(range(min = 1, max = 100))]
        max_items: usize,
    }

    #[test]
    fn api_validation_error() {
        let tester = ValidationTester {
            name: "looooong".into(),
            max_items: 101,
        };

        let mut api_error = match tester.validate() {
            Ok(_) => panic!("Validation should fail"),
            Err(err) => ApiError::from(err),
        };

        match &mut api_error.body {
            ErrorBody::Standard(_) => panic!("Expected validation error body"),
            ErrorBody::Validation(val) => val.errors.sort_by(|a, b| a.field.cmp(&b.field)),
        }

        assert_eq!(api_error.status, StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(
            serde_json::to_value(api_error.body).unwrap(),
            json!({
                "code": "validation_failed",
                "message": "Some provided values are invalid",
                "errors": [
                    {
                        "field": "max_items",
                        "code": "out_of_range"
                    },
                    {
                        "field": "name",
                        "code": "invalid_length"
                    }
                ]
            })
        );
    }

    #[test]
    fn api_error_with_code() {
        let error = ApiError::conflict().with_code("RECORDING_ALREADY_STARTED");

        assert_eq!(
            serde_json::to_value(error.body).unwrap(),
            json!({
                "code": "RECORDING_ALREADY_STARTED",
                "message": "The request conflicts with the state of the resource"
            })
        );
    }

    #[test]
    fn api_error_with_message() {
        let error = ApiError::not_found().with_message("A custom message");

        assert_eq!(
            serde_json::to_value(error.body).unwrap(),
            json!({
                "code": "not_found",
                "message": "A custom message"
            })
        );
    }
}
