use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use validator::Validate;

// Resume request body
#[derive(Debug, Deserialize, Validate)]
pub struct SendResumeRequest {
    #[validate(email(message = "Invalid email format"))]
    pub email: Option<String>,
}

impl SendResumeRequest {
    // Trimmed address, None when absent or blank
    pub fn email(&self) -> Option<&str> {
        self.email.as_deref().map(str::trim).filter(|e| !e.is_empty())
    }
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RateLimitInfo {
    pub remaining: u32,
    pub reset_time: String,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SendResumeResponse {
    pub message: String,
    pub rate_limit: RateLimitInfo,
}

// Body of a 429
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RateLimitedBody {
    pub error: String,
    pub details: String,
    pub reset_time: String,
    pub retry_after: i64,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorBody {
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

// ISO-8601 with milliseconds and a Z suffix, e.g. 2025-03-01T09:05:00.000Z
pub fn iso(ts: DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Millis, true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn iso_has_millis_and_zulu() {
        let ts = Utc.with_ymd_and_hms(2025, 3, 1, 9, 5, 0).unwrap();
        assert_eq!(iso(ts), "2025-03-01T09:05:00.000Z");
    }

    #[test]
    fn blank_email_counts_as_missing() {
        let req: SendResumeRequest = serde_json::from_str(r#"{"email": "   "}"#).unwrap();
        assert_eq!(req.email(), None);

        let req: SendResumeRequest = serde_json::from_str("{}").unwrap();
        assert_eq!(req.email(), None);
    }

    #[test]
    fn email_format_is_validated() {
        let good: SendResumeRequest = serde_json::from_str(r#"{"email": "a@b.io"}"#).unwrap();
        assert!(good.validate().is_ok());

        let bad: SendResumeRequest = serde_json::from_str(r#"{"email": "not-an-email"}"#).unwrap();
        assert!(bad.validate().is_err());
    }

    #[test]
    fn response_uses_camel_case() {
        let body = SendResumeResponse {
            message: "ok".to_string(),
            rate_limit: RateLimitInfo {
                remaining: 1,
                reset_time: "t".to_string(),
            },
        };
        let json = serde_json::to_value(&body).unwrap();
        assert_eq!(json["rateLimit"]["resetTime"], "t");
    }
}
