#![forbid(unsafe_code)]

use serde::{Deserialize, Deserializer, Serialize};

/// Nanoseconds since the unix epoch as reported by the backend clock.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
pub struct MonotonicTimeNs(pub u64);

impl MonotonicTimeNs {
    pub const NS_PER_DAY: u64 = 86_400 * 1_000_000_000;

    /// Day of week with Monday = 0. 1970-01-01 was a Thursday.
    pub fn weekday_index(self) -> usize {
        let days = self.0 / Self::NS_PER_DAY;
        ((days + 3) % 7) as usize
    }
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ContractViolation {
    #[error("invalid value for {field}: {reason}")]
    InvalidValue {
        field: &'static str,
        reason: &'static str,
    },
    #[error("{field} out of range [{min}, {max}]: got {got}")]
    InvalidRange {
        field: &'static str,
        min: f64,
        max: f64,
        got: f64,
    },
}

pub trait Validate {
    fn validate(&self) -> Result<(), ContractViolation>;
}

/// Server-assigned primary key of a backend row.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RecordId(String);

impl RecordId {
    pub fn new(id: impl Into<String>) -> Result<Self, ContractViolation> {
        let v = Self(id.into());
        v.validate()?;
        Ok(v)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Validate for RecordId {
    fn validate(&self) -> Result<(), ContractViolation> {
        validate_id("record_id", &self.0, 64)
    }
}

impl std::fmt::Display for RecordId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

pub(crate) fn validate_id(
    field: &'static str,
    s: &str,
    max_len: usize,
) -> Result<(), ContractViolation> {
    if s.trim().is_empty() {
        return Err(ContractViolation::InvalidValue {
            field,
            reason: "must not be empty",
        });
    }
    if s.len() > max_len {
        return Err(ContractViolation::InvalidValue {
            field,
            reason: "too long",
        });
    }
    if !s.is_ascii() {
        return Err(ContractViolation::InvalidValue {
            field,
            reason: "must be ASCII",
        });
    }
    Ok(())
}

pub(crate) fn validate_text(
    field: &'static str,
    s: &str,
    max_len: usize,
) -> Result<(), ContractViolation> {
    if s.trim().is_empty() {
        return Err(ContractViolation::InvalidValue {
            field,
            reason: "must not be empty",
        });
    }
    if s.len() > max_len {
        return Err(ContractViolation::InvalidValue {
            field,
            reason: "too long",
        });
    }
    Ok(())
}

pub(crate) fn validate_optional_text(
    field: &'static str,
    s: Option<&str>,
    max_len: usize,
) -> Result<(), ContractViolation> {
    match s {
        Some(v) if v.len() > max_len => Err(ContractViolation::InvalidValue {
            field,
            reason: "too long",
        }),
        _ => Ok(()),
    }
}

pub(crate) fn validate_text_list(
    field: &'static str,
    items: &[String],
    max_items: usize,
    max_len: usize,
) -> Result<(), ContractViolation> {
    if items.len() > max_items {
        return Err(ContractViolation::InvalidValue {
            field,
            reason: "too many entries",
        });
    }
    for item in items {
        validate_text(field, item, max_len)?;
    }
    Ok(())
}

/// Field deserializer for `Option<Option<T>>` patches: a present `null`
/// becomes `Some(None)`. Pair with `#[serde(default)]` so absence stays `None`.
pub(crate) fn double_option<'de, D, T>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}
