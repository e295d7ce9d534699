//! HTTP API handlers and their error type.

pub mod orders;

use axum::{
	http::StatusCode,
	response::{IntoResponse, Json, Response},
};
use orderdesk_core::{DeskError, OrderStateError};
use orderdesk_core::checklist::ChecklistError;
use orderdesk_types::UnknownStatus;
use serde::{Deserialize, Serialize};
use std::fmt;

/// API error response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
	/// Error type/code
	pub error: String,
	/// Human-readable description
	pub message: String,
	/// Additional error context
	pub details: Option<serde_json::Value>,
	/// Suggested retry delay in seconds
	#[serde(rename = "retryAfter")]
	pub retry_after: Option<u64>,
}

/// Structured API error type with HTTP status mapping.
#[derive(Debug)]
pub enum APIError {
	/// Malformed or rejected request (400)
	BadRequest {
		error_type: String,
		message: String,
		details: Option<serde_json::Value>,
	},
	/// Unknown order (404)
	NotFound { error_type: String, message: String },
	/// Internal server error (500)
	InternalServerError { error_type: String, message: String },
}

impl APIError {
	pub fn status_code(&self) -> StatusCode {
		match self {
			APIError::BadRequest { .. } => StatusCode::BAD_REQUEST,
			APIError::NotFound { .. } => StatusCode::NOT_FOUND,
			APIError::InternalServerError { .. } => StatusCode::INTERNAL_SERVER_ERROR,
		}
	}

	pub fn to_error_response(&self) -> ErrorResponse {
		match self {
			APIError::BadRequest {
				error_type,
				message,
				details,
			} => ErrorResponse {
				error: error_type.clone(),
				message: message.clone(),
				details: details.clone(),
				retry_after: None,
			},
			APIError::NotFound {
				error_type,
				message,
			}
			| APIError::InternalServerError {
				error_type,
				message,
			} => ErrorResponse {
				error: error_type.clone(),
				message: message.clone(),
				details: None,
				retry_after: None,
			},
		}
	}

	fn bad_request(error_type: &str, message: String) -> Self {
		APIError::BadRequest {
			error_type: error_type.to_string(),
			message,
			details: None,
		}
	}
}

impl fmt::Display for APIError {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			APIError::BadRequest { message, .. } => write!(f, "Bad Request: {}", message),
			APIError::NotFound { message, .. } => write!(f, "Not Found: {}", message),
			APIError::InternalServerError { message, .. } => {
				write!(f, "Internal Server Error: {}", message)
			},
		}
	}
}

impl std::error::Error for APIError {}

impl IntoResponse for APIError {
	fn into_response(self) -> Response {
		(self.status_code(), Json(self.to_error_response())).into_response()
	}
}

impl From<UnknownStatus> for APIError {
	fn from(err: UnknownStatus) -> Self {
		APIError::bad_request("UNKNOWN_STATUS", err.to_string())
	}
}

impl From<DeskError> for APIError {
	fn from(err: DeskError) -> Self {
		if err.is_not_found() {
			return APIError::NotFound {
				error_type: "ORDER_NOT_FOUND".to_string(),
				message: err.to_string(),
			};
		}
		match &err {
			DeskError::State(OrderStateError::MissingReason) => {
				APIError::bad_request("MISSING_REASON", err.to_string())
			},
			DeskError::State(OrderStateError::InvalidContext(_)) => {
				APIError::bad_request("INVALID_TRANSITION_REQUEST", err.to_string())
			},
			DeskError::Checklist(ChecklistError::InvalidItemIndex { len, .. }) => APIError::BadRequest {
				error_type: "INVALID_ITEM_INDEX".to_string(),
				message: err.to_string(),
				details: Some(serde_json::json!({ "itemCount": len })),
			},
			_ => APIError::InternalServerError {
				error_type: "UPDATE_FAILED".to_string(),
				message: err.to_string(),
			},
		}
	}
}
