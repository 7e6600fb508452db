//! Unified application error model and mapping helpers.
//! This module provides a common error enum used by the HTTP handlers and the
//! operation layer, together with the stable wire error codes and their
//! human-readable descriptions.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};

/// Stable error code tokens as they appear on the wire.
pub mod codes {
    pub const METHOD_NOT_ALLOWED: &str = "method-not-allowed";
    pub const NO_TOKEN_FOUND: &str = "no-token-found";
    pub const INVALID_TOKEN: &str = "invalid-token";
    pub const WEAK_PASSWORD: &str = "weak-password";
    pub const OA_ALREADY_EXISTS: &str = "oa-already-exists";
    pub const INVALID_CREDENTIALS: &str = "invalid-credentials";
    pub const INVALID_DATA: &str = "invalid-data";
    pub const SERVER_ERROR: &str = "server-error";
    pub const ACCOUNT_HAS_WORKSPACE: &str = "account-has-workspace";
    pub const INVALID_LOCATION: &str = "invalid-location";
    pub const PERMISSION_DENIED: &str = "permission-denied";
    pub const DIR_ALREADY_EXISTS: &str = "dir-already-exists";
    pub const FILE_ALREADY_EXISTS: &str = "file-already-exists";
    pub const DIR_NOT_EMPTY: &str = "dir-not-empty";
    pub const INVALID_UPLOAD_ID: &str = "invalid-upload-id";
    pub const INVALID_WORKSPACE: &str = "invalid-workspace";
    pub const WORKSPACE_EXISTS: &str = "workspace-exists";
    pub const SA_ALREADY_EXISTS: &str = "sa-already-exists";
    pub const SA_NOT_FOUND: &str = "sa-not-found";
    pub const ROLE_NOT_FOUND: &str = "role-not-found";
    pub const ROLE_ALREADY_ASSIGNED: &str = "role-already-assigned";
    pub const ROLE_NOT_ASSIGNED: &str = "role-not-assigned";
    pub const RESOURCE_NOT_FOUND: &str = "resource-not-found";
}

/// Human description for a stable error code. Unknown codes yield an empty string.
pub fn describe(code: &str) -> &'static str {
    match code {
        codes::METHOD_NOT_ALLOWED => "Method not allowed.",
        codes::NO_TOKEN_FOUND => "No token found in request header.",
        codes::INVALID_TOKEN => "Token provided is invalid. Login again.",
        codes::WEAK_PASSWORD => {
            "Password is weak. Needs at least 8 characters with upper and lower case letters, a number and a symbol."
        }
        codes::OA_ALREADY_EXISTS => "Account with the email already exists. Use a different email address.",
        codes::INVALID_CREDENTIALS => "Given username or password is wrong.",
        codes::INVALID_DATA => "Request has invalid data.",
        codes::SERVER_ERROR => "Internal server error.",
        codes::ACCOUNT_HAS_WORKSPACE => "Account is associated with one or more workspaces.",
        codes::INVALID_LOCATION => "The specified location is not found.",
        codes::PERMISSION_DENIED => "The requested action is not allowed for this account.",
        codes::DIR_ALREADY_EXISTS => "The requested directory already exists.",
        codes::FILE_ALREADY_EXISTS => "A file with the same name already exists.",
        codes::DIR_NOT_EMPTY => "The directory is not empty. Delete the contained items first.",
        codes::INVALID_UPLOAD_ID => "The provided upload ID is not valid.",
        codes::INVALID_WORKSPACE => "The provided workspace name is invalid.",
        codes::WORKSPACE_EXISTS => "A workspace already exists with the given name.",
        codes::SA_ALREADY_EXISTS => "Service account already exists.",
        codes::SA_NOT_FOUND => "Requested service account not found.",
        codes::ROLE_NOT_FOUND => "Requested role not found.",
        codes::ROLE_ALREADY_ASSIGNED => "Role already assigned.",
        codes::ROLE_NOT_ASSIGNED => "Role is not assigned.",
        codes::RESOURCE_NOT_FOUND => "The requested resource is not found.",
        _ => "",
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum AppError {
    UserInput { code: String },
    Unauthorized { code: String },
    Forbidden { code: String },
    NotFound { code: String },
    Conflict { code: String },
    MethodNotAllowed { code: String },
    Internal { code: String },
}

impl AppError {
    pub fn code_str(&self) -> &str {
        match self {
            AppError::UserInput { code }
            | AppError::Unauthorized { code }
            | AppError::Forbidden { code }
            | AppError::NotFound { code }
            | AppError::Conflict { code }
            | AppError::MethodNotAllowed { code }
            | AppError::Internal { code } => code.as_str(),
        }
    }

    pub fn description(&self) -> &'static str {
        describe(self.code_str())
    }

    pub fn user<S: Into<String>>(code: S) -> Self {
        AppError::UserInput { code: code.into() }
    }
    pub fn unauthorized<S: Into<String>>(code: S) -> Self {
        AppError::Unauthorized { code: code.into() }
    }
    pub fn forbidden<S: Into<String>>(code: S) -> Self {
        AppError::Forbidden { code: code.into() }
    }
    pub fn not_found<S: Into<String>>(code: S) -> Self {
        AppError::NotFound { code: code.into() }
    }
    pub fn conflict<S: Into<String>>(code: S) -> Self {
        AppError::Conflict { code: code.into() }
    }
    pub fn method_not_allowed() -> Self {
        AppError::MethodNotAllowed { code: codes::METHOD_NOT_ALLOWED.into() }
    }
    pub fn server() -> Self {
        AppError::Internal { code: codes::SERVER_ERROR.into() }
    }

    /// Map to HTTP status code. Conflicts surface as 400 with their specific
    /// code rather than 409, matching the wire contract.
    pub fn http_status(&self) -> u16 {
        match self {
            AppError::UserInput { .. } => 400,
            AppError::Unauthorized { .. } => 401,
            AppError::Forbidden { .. } => 403,
            AppError::NotFound { .. } => 404,
            AppError::Conflict { .. } => 400,
            AppError::MethodNotAllowed { .. } => 405,
            AppError::Internal { .. } => 500,
        }
    }
}

impl Display for AppError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.code_str(), self.description())
    }
}

impl std::error::Error for AppError {}

pub type AppResult<T> = Result<T, AppError>;

impl From<anyhow::Error> for AppError {
    fn from(err: anyhow::Error) -> Self {
        tracing::error!("internal error: {err:#}");
        AppError::server()
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status =
            StatusCode::from_u16(self.http_status()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        let body = serde_json::json!({
            "error": {
                "code": self.code_str(),
                "description": self.description(),
            }
        });
        (status, Json(body)).into_response()
    }
}
