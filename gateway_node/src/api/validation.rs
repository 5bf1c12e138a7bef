//! Request validation utilities

use serde::de::DeserializeOwned;
use serde_json::{Map, Value};

use super::errors::{ApiError, ApiResult};
use crate::types::{Address, RawJobId};

/// Parse a dataset address path parameter.
pub fn validate_address(address: &str) -> ApiResult<Address> {
    if address.is_empty() {
        return Err(ApiError::missing("address"));
    }
    address
        .parse()
        .map_err(|e| ApiError::bad_request(format!("invalid address: {}", e)))
}

/// Parse a hex job id path parameter.
pub fn validate_job_id(job_id: &str) -> ApiResult<RawJobId> {
    if job_id.is_empty() {
        return Err(ApiError::missing("jobId"));
    }
    RawJobId::decode_hex(job_id)
        .map_err(|e| ApiError::bad_request(format!("invalid jobId: {}", e)))
}

/// A string field counts as present only when it is non-empty.
pub fn require_text(value: Option<String>, field: &str) -> ApiResult<String> {
    match value {
        Some(text) if !text.is_empty() => Ok(text),
        _ => Err(ApiError::missing(field)),
    }
}

/// Take `field` out of a JSON object body. Absent, `null` and `""` all
/// count as missing; the value's type is not looked at yet.
pub fn take_field(body: &mut Map<String, Value>, field: &str) -> ApiResult<Value> {
    match body.remove(field) {
        None | Some(Value::Null) => Err(ApiError::missing(field)),
        Some(Value::String(text)) if text.is_empty() => Err(ApiError::missing(field)),
        Some(value) => Ok(value),
    }
}

/// Convert a field taken with [`take_field`] to its expected type.
pub fn parse_field<T: DeserializeOwned>(value: Value, field: &str) -> ApiResult<T> {
    serde_json::from_value(value)
        .map_err(|e| ApiError::bad_request(format!("{} is invalid: {}", field, e)))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn message(err: ApiError) -> String {
        match err {
            ApiError::Validation(message) => message,
            other => panic!("expected validation error, got {:?}", other),
        }
    }

    #[test]
    fn test_validate_address() {
        assert!(validate_address("0x00000000000000000000000000000000000000ff").is_ok());
        assert_eq!(message(validate_address("").unwrap_err()), "address is missing");
        assert!(message(validate_address("0x12").unwrap_err()).starts_with("invalid address"));
    }

    #[test]
    fn test_validate_job_id() {
        assert_eq!(validate_job_id("01").unwrap().as_bytes(), &[1]);
        assert_eq!(message(validate_job_id("").unwrap_err()), "jobId is missing");
        assert!(message(validate_job_id("nothex").unwrap_err()).starts_with("invalid jobId"));
    }

    #[test]
    fn test_require_text_treats_empty_as_missing() {
        assert_eq!(require_text(Some("x".into()), "name").unwrap(), "x");
        assert_eq!(message(require_text(Some(String::new()), "name").unwrap_err()), "name is missing");
        assert_eq!(message(require_text(None, "cmd").unwrap_err()), "cmd is missing");
    }

    #[test]
    fn test_take_field_ignores_type() {
        let mut body = serde_json::json!({ "name": "", "cmd": null, "dockerImage": 5 })
            .as_object()
            .cloned()
            .unwrap();
        assert_eq!(message(take_field(&mut body, "name").unwrap_err()), "name is missing");
        assert_eq!(message(take_field(&mut body, "cmd").unwrap_err()), "cmd is missing");
        assert_eq!(message(take_field(&mut body, "absent").unwrap_err()), "absent is missing");
        let image = take_field(&mut body, "dockerImage").unwrap();

        let err = parse_field::<String>(image, "dockerImage").unwrap_err();
        assert!(message(err).starts_with("dockerImage is invalid"));
        assert_eq!(
            parse_field::<Vec<String>>(serde_json::json!(["run"]), "cmd").unwrap(),
            vec!["run"]
        );
    }
}
