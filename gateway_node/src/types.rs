//! Platform identifier and status types shared by the store, the platform
//! client and the HTTP layer.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Length of a dataset address in bytes.
pub const ADDRESS_LEN: usize = 20;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum IdError {
    #[error("Address must start with '0x'")]
    MissingPrefix,

    #[error("Address must be {expected} characters long (including '0x'), got {actual}")]
    BadLength { expected: usize, actual: usize },

    #[error("invalid hex: {0}")]
    InvalidHex(String),
}

impl From<hex::FromHexError> for IdError {
    fn from(err: hex::FromHexError) -> Self {
        IdError::InvalidHex(err.to_string())
    }
}

/// Platform-issued dataset address. Rendered as `0x` + 40 lower-case hex digits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Address([u8; ADDRESS_LEN]);

impl Address {
    pub const fn from_bytes(bytes: [u8; ADDRESS_LEN]) -> Self {
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; ADDRESS_LEN] {
        &self.0
    }

    /// Hexadecimal string form, `0x`-prefixed.
    pub fn to_hex(&self) -> String {
        format!("0x{}", hex::encode(self.0))
    }
}

impl FromStr for Address {
    type Err = IdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let digits = s
            .strip_prefix("0x")
            .or_else(|| s.strip_prefix("0X"))
            .ok_or(IdError::MissingPrefix)?;

        let expected = 2 + ADDRESS_LEN * 2;
        if s.len() != expected {
            return Err(IdError::BadLength {
                expected,
                actual: s.len(),
            });
        }

        let mut bytes = [0u8; ADDRESS_LEN];
        hex::decode_to_slice(digits, &mut bytes)?;
        Ok(Self(bytes))
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl Serialize for Address {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for Address {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

/// Raw job identifier as produced by the dispatcher. The external form is
/// un-prefixed lower-case hex.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RawJobId(Vec<u8>);

impl RawJobId {
    pub fn new(bytes: Vec<u8>) -> Self {
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    pub fn encode_hex(&self) -> String {
        hex::encode(&self.0)
    }

    pub fn decode_hex(s: &str) -> Result<Self, IdError> {
        let digits = s.strip_prefix("0x").unwrap_or(s);
        Ok(Self(hex::decode(digits)?))
    }
}

impl fmt::Display for RawJobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.encode_hex())
    }
}

/// Completion status reported by the dispatcher.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum JobCompletionStatus {
    Success,
    JobSetupError,
    RuntimeError,
    Pending,
    Cancelled,
    /// Any variant this gateway does not know about yet
    #[serde(other)]
    Unknown,
}

impl JobCompletionStatus {
    /// Name stored in the local mirror and returned to clients.
    pub fn as_status_str(&self) -> &'static str {
        match self {
            JobCompletionStatus::Success => "Success",
            JobCompletionStatus::JobSetupError => "JobSetupError",
            JobCompletionStatus::RuntimeError => "RuntimeError",
            JobCompletionStatus::Pending => "Pending",
            JobCompletionStatus::Cancelled => "Cancelled",
            JobCompletionStatus::Unknown => "",
        }
    }

    pub fn is_terminal(&self) -> bool {
        !matches!(
            self,
            JobCompletionStatus::Pending | JobCompletionStatus::Unknown
        )
    }
}
