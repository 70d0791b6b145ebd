//! API Response types
//!
//! Every endpoint answers with the same envelope:
//! ```json
//! {
//!     "code": "E0000",
//!     "message": "Success",
//!     "data": { ... }
//! }
//! ```

use serde::{Deserialize, Serialize};

/// Response code carried by successful responses
pub const API_CODE_SUCCESS: &str = "E0000";

/// Unified API response structure
#[derive(Debug, Serialize, Deserialize)]
pub struct ApiResponse<T> {
    /// Response code (E0000 = success, others = error codes)
    pub code: String,
    /// Human-readable message
    pub message: String,
    /// Response data (optional)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
}

impl<T> ApiResponse<T> {
    /// Create a successful response
    pub fn ok(data: T) -> Self {
        Self {
            code: API_CODE_SUCCESS.to_string(),
            message: "Success".to_string(),
            data: Some(data),
        }
    }

    /// Create a successful response with custom message
    pub fn ok_with_message(data: T, message: impl Into<String>) -> Self {
        Self {
            code: API_CODE_SUCCESS.to_string(),
            message: message.into(),
            data: Some(data),
        }
    }

    /// Create an error response
    pub fn error(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
            data: None,
        }
    }

    /// Create an error response that still carries data
    ///
    /// Used by the pending-payment conflict, which must surface the
    /// existing checkout handle so the client can resume it.
    pub fn error_with_data(code: impl Into<String>, message: impl Into<String>, data: T) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
            data: Some(data),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ok_uses_success_code() {
        let resp = ApiResponse::ok(42);
        assert_eq!(resp.code, API_CODE_SUCCESS);
        assert_eq!(resp.data, Some(42));
    }

    #[test]
    fn error_omits_data_field_in_json() {
        let resp = ApiResponse::<()>::error("E0004", "Conflict");
        let json = serde_json::to_string(&resp).unwrap();
        assert!(!json.contains("data"));
    }
}
