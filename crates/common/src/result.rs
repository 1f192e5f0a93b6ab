//! Structured outcome returned by every request handler.

use serde::{Deserialize, Serialize};

/// Status carried by a successful [`OperationResult`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SuccessStatus {
    Ok,
    Created,
    Accepted,
}

impl SuccessStatus {
    /// HTTP-like status code for this outcome.
    pub fn code(&self) -> u16 {
        match self {
            SuccessStatus::Ok => 200,
            SuccessStatus::Created => 201,
            SuccessStatus::Accepted => 202,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            SuccessStatus::Ok => "ok",
            SuccessStatus::Created => "created",
            SuccessStatus::Accepted => "accepted",
        }
    }
}

/// Status carried by a failed [`OperationResult`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureStatus {
    BadRequest,
    NotFound,
    Conflict,
    Forbidden,
    InternalError,
}

impl FailureStatus {
    /// HTTP-like status code for this outcome.
    pub fn code(&self) -> u16 {
        match self {
            FailureStatus::BadRequest => 400,
            FailureStatus::Forbidden => 403,
            FailureStatus::NotFound => 404,
            FailureStatus::Conflict => 409,
            FailureStatus::InternalError => 500,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            FailureStatus::BadRequest => "bad_request",
            FailureStatus::NotFound => "not_found",
            FailureStatus::Conflict => "conflict",
            FailureStatus::Forbidden => "forbidden",
            FailureStatus::InternalError => "internal_error",
        }
    }
}

impl std::fmt::Display for SuccessStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::fmt::Display for FailureStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outcome of a command or query.
///
/// Expected failure paths (not found, validation, conflict) are reported
/// through [`OperationResult::Failure`]. Infrastructure faults are not: they
/// travel as errors so callers can tell "show a message" apart from
/// "retry or alert".
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum OperationResult<T> {
    Success {
        status: SuccessStatus,
        payload: Option<T>,
    },
    Failure {
        status: FailureStatus,
        message: String,
    },
}

impl<T> OperationResult<T> {
    /// Success with `ok` status and a payload.
    pub fn ok(payload: T) -> Self {
        Self::Success {
            status: SuccessStatus::Ok,
            payload: Some(payload),
        }
    }

    /// Success with `created` status and a payload.
    pub fn created(payload: T) -> Self {
        Self::Success {
            status: SuccessStatus::Created,
            payload: Some(payload),
        }
    }

    /// Success with `accepted` status and no payload.
    pub fn accepted() -> Self {
        Self::Success {
            status: SuccessStatus::Accepted,
            payload: None,
        }
    }

    /// Success with `ok` status and no payload.
    pub fn ok_empty() -> Self {
        Self::Success {
            status: SuccessStatus::Ok,
            payload: None,
        }
    }

    pub fn failure(status: FailureStatus, message: impl Into<String>) -> Self {
        Self::Failure {
            status,
            message: message.into(),
        }
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::failure(FailureStatus::BadRequest, message)
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::failure(FailureStatus::NotFound, message)
    }

    pub fn conflict(message: impl Into<String>) -> Self {
        Self::failure(FailureStatus::Conflict, message)
    }

    pub fn forbidden(message: impl Into<String>) -> Self {
        Self::failure(FailureStatus::Forbidden, message)
    }

    pub fn internal_error(message: impl Into<String>) -> Self {
        Self::failure(FailureStatus::InternalError, message)
    }

    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success { .. })
    }

    pub fn is_failure(&self) -> bool {
        !self.is_success()
    }

    /// HTTP-like status code of this result.
    pub fn status_code(&self) -> u16 {
        match self {
            Self::Success { status, .. } => status.code(),
            Self::Failure { status, .. } => status.code(),
        }
    }

    /// Status name, e.g. `"created"` or `"conflict"`.
    pub fn status_name(&self) -> &'static str {
        match self {
            Self::Success { status, .. } => status.as_str(),
            Self::Failure { status, .. } => status.as_str(),
        }
    }

    /// Returns the failure status, if this is a failure.
    pub fn failure_status(&self) -> Option<FailureStatus> {
        match self {
            Self::Success { .. } => None,
            Self::Failure { status, .. } => Some(*status),
        }
    }

    /// Returns the failure message, if this is a failure.
    pub fn message(&self) -> Option<&str> {
        match self {
            Self::Success { .. } => None,
            Self::Failure { message, .. } => Some(message),
        }
    }

    pub fn payload(&self) -> Option<&T> {
        match self {
            Self::Success { payload, .. } => payload.as_ref(),
            Self::Failure { .. } => None,
        }
    }

    pub fn into_payload(self) -> Option<T> {
        match self {
            Self::Success { payload, .. } => payload,
            Self::Failure { .. } => None,
        }
    }

    /// Transforms the payload, leaving failures untouched.
    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> OperationResult<U> {
        match self {
            Self::Success { status, payload } => OperationResult::Success {
                status,
                payload: payload.map(f),
            },
            Self::Failure { status, message } => OperationResult::Failure { status, message },
        }
    }

    /// Transforms the payload with a fallible function.
    ///
    /// The whole result becomes `Err` if the function fails.
    pub fn try_map<U, E>(
        self,
        f: impl FnOnce(T) -> Result<U, E>,
    ) -> Result<OperationResult<U>, E> {
        match self {
            Self::Success { status, payload } => Ok(OperationResult::Success {
                status,
                payload: payload.map(f).transpose()?,
            }),
            Self::Failure { status, message } => Ok(OperationResult::Failure { status, message }),
        }
    }
}
