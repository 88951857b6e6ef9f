//! JSON request body extraction.
//!
//! axum's `Json` extractor answers malformed bodies with 415/422 and plain
//! text. Both services instead reply 400 with a machine-readable code, and
//! treat an empty body as `{}`.

use crate::error::ApiError;
use axum::async_trait;
use axum::body::Bytes;
use axum::extract::{FromRequest, Request};
use axum::http::StatusCode;
use serde::de::DeserializeOwned;
use serde_json::Value;

/// Extracts and deserializes a JSON body, mapping every failure to [`ApiError`].
#[derive(Debug, Clone)]
pub struct JsonBody<T>(pub T);

#[async_trait]
impl<S, T> FromRequest<S> for JsonBody<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let bytes = Bytes::from_request(req, state).await.map_err(|rejection| {
            if rejection.status() == StatusCode::PAYLOAD_TOO_LARGE {
                ApiError::PayloadTooLarge
            } else {
                tracing::debug!("Failed to read request body: {}", rejection.body_text());
                ApiError::InvalidJson
            }
        })?;

        parse_body(&bytes).map(JsonBody)
    }
}

/// Parse a request body, treating an empty or blank body as `{}`.
pub fn parse_body<T: DeserializeOwned>(bytes: &[u8]) -> Result<T, ApiError> {
    let bytes: &[u8] = if bytes.iter().all(u8::is_ascii_whitespace) {
        b"{}"
    } else {
        bytes
    };

    serde_json::from_slice(bytes).map_err(|e| {
        tracing::debug!("Rejected request body: {}", e);
        ApiError::InvalidJson
    })
}

/// Read a JSON number or numeric string as `f64`.
///
/// A blank string reads as zero. Non-finite values and other JSON types are
/// `None`.
pub fn json_number(value: &Value) -> Option<f64> {
    let n = match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) if s.trim().is_empty() => Some(0.0),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    }?;
    n.is_finite().then_some(n)
}

#[cfg(test)]
mod tests {
    use super::*;
    use hub_types::registry::HostRoomsRequest;

    #[test]
    fn json_numbers_and_numeric_strings() {
        use serde_json::json;
        assert_eq!(json_number(&json!(42)), Some(42.0));
        assert_eq!(json_number(&json!(1.5)), Some(1.5));
        assert_eq!(json_number(&json!(" 7 ")), Some(7.0));
        assert_eq!(json_number(&json!("")), Some(0.0));
        assert_eq!(json_number(&json!("inf")), None);
        assert_eq!(json_number(&json!("x")), None);
        assert_eq!(json_number(&json!(null)), None);
        assert_eq!(json_number(&json!({"n": 1})), None);
    }

    #[test]
    fn empty_body_is_empty_object() {
        let req: HostRoomsRequest = parse_body(b"").unwrap();
        assert_eq!(req, HostRoomsRequest::default());

        let req: HostRoomsRequest = parse_body(b" \n").unwrap();
        assert_eq!(req.host_id, None);
    }

    #[test]
    fn malformed_body_is_invalid_json() {
        let err = parse_body::<HostRoomsRequest>(b"{\"hostId\":").unwrap_err();
        assert_eq!(err, ApiError::InvalidJson);
    }

    #[test]
    fn wrong_shape_is_invalid_json() {
        assert_eq!(
            parse_body::<HostRoomsRequest>(b"[1,2,3]").unwrap_err(),
            ApiError::InvalidJson
        );
        assert_eq!(
            parse_body::<HostRoomsRequest>(b"{\"hostId\":42}").unwrap_err(),
            ApiError::InvalidJson
        );
    }
}
