//! Rejection payloads for denied requests.

use http::StatusCode;
use serde::Serialize;

use crate::error::RateLimited;

/// Machine-readable error code carried by every rejection.
pub const ERROR_CODE: &str = "rate_limited";

/// Wait advertised by [`fallback`] when no gate context is available.
pub const FALLBACK_REMAINING_SECS: u64 = 60;

/// Body of a "too many requests" response.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RejectionPayload {
    pub error: &'static str,
    pub message: String,
    pub remaining_seconds: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub limit_seconds: Option<f64>,
}

/// A rendered rejection: status plus payload.
#[derive(Debug, Clone, PartialEq)]
pub struct Rejection {
    pub status: StatusCode,
    pub payload: RejectionPayload,
}

impl Rejection {
    /// Value for a `Retry-After` header. Never zero, since a floor of zero
    /// still means a fraction of a second remains.
    pub fn retry_after(&self) -> u64 {
        self.payload.remaining_seconds.max(1)
    }

    /// Serialized payload.
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(&self.payload)
    }
}

/// Render a gate denial.
pub fn render(limited: &RateLimited) -> Rejection {
    Rejection {
        status: StatusCode::TOO_MANY_REQUESTS,
        payload: RejectionPayload {
            error: ERROR_CODE,
            message: format!(
                "Too many requests, please wait {} seconds before retrying",
                limited.remaining_secs
            ),
            remaining_seconds: limited.remaining_secs,
            limit_seconds: Some(limited.window_secs),
        },
    }
}

/// Generic rejection for a catch-all 429 handler without gate context.
pub fn fallback() -> Rejection {
    Rejection {
        status: StatusCode::TOO_MANY_REQUESTS,
        payload: RejectionPayload {
            error: ERROR_CODE,
            message: "Too many requests, please wait 1 minute before retrying".to_string(),
            remaining_seconds: FALLBACK_REMAINING_SECS,
            limit_seconds: None,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_denial() {
        let rejection = render(&RateLimited {
            remaining_secs: 4,
            window_secs: 6.0,
        });

        assert_eq!(rejection.status, StatusCode::TOO_MANY_REQUESTS);
        assert_eq!(rejection.payload.remaining_seconds, 4);
        assert_eq!(rejection.payload.limit_seconds, Some(6.0));
        assert!(rejection.payload.message.contains("4 seconds"));

        let json: serde_json::Value = serde_json::from_str(&rejection.to_json().unwrap()).unwrap();
        assert_eq!(json["error"], "rate_limited");
        assert_eq!(json["remaining_seconds"], 4);
        assert_eq!(json["limit_seconds"], 6.0);
    }

    #[test]
    fn test_fractional_limit_serializes_as_number() {
        let rejection = render(&RateLimited {
            remaining_secs: 0,
            window_secs: 0.5,
        });

        let json: serde_json::Value = serde_json::from_str(&rejection.to_json().unwrap()).unwrap();
        assert_eq!(json["limit_seconds"], 0.5);
        assert_eq!(rejection.retry_after(), 1);
    }

    #[test]
    fn test_fallback() {
        let rejection = fallback();

        assert_eq!(rejection.status.as_u16(), 429);
        assert_eq!(rejection.payload.remaining_seconds, 60);
        assert_eq!(rejection.retry_after(), 60);

        let json: serde_json::Value = serde_json::from_str(&rejection.to_json().unwrap()).unwrap();
        assert!(json.get("limit_seconds").is_none());
    }
}
