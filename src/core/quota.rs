//! Premium interaction quota model.
//!
//! The usage service has shipped several payload shapes over time. The
//! interactions value may be a bare count, a numeric string, or an object
//! with optional `used`/`total`/`remaining` fields (each of which may itself
//! be a number or a numeric string). Everything is folded into one
//! [`QuotaSnapshot`].

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::{Result, UsageError};

const PREMIUM_INTERACTIONS: &str = "premium_interactions";
const QUOTA_SNAPSHOTS: &str = "quota_snapshots";

// =============================================================================
// Quota Snapshot
// =============================================================================

/// Decoded premium interaction usage.
///
/// `remaining` and `progress` are derived on read. When the service reports
/// both `total` and `remaining`, the reported `remaining` wins even if it
/// disagrees with `total - used`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuotaSnapshot {
    pub used: u64,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub total: Option<u64>,

    #[serde(rename = "remaining", skip_serializing_if = "Option::is_none")]
    pub remaining_provided: Option<u64>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub percent_remaining: Option<f64>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub unlimited: Option<bool>,
}

impl QuotaSnapshot {
    /// Snapshot with only a usage count.
    #[must_use]
    pub const fn from_used(used: u64) -> Self {
        Self {
            used,
            total: None,
            remaining_provided: None,
            percent_remaining: None,
            unlimited: None,
        }
    }

    /// Snapshot with usage and entitlement.
    #[must_use]
    pub const fn with_total(used: u64, total: u64) -> Self {
        Self {
            used,
            total: Some(total),
            remaining_provided: None,
            percent_remaining: None,
            unlimited: None,
        }
    }

    /// Interactions left: reported value, else `total - used` floored at zero.
    #[must_use]
    pub fn remaining(&self) -> Option<u64> {
        self.remaining_provided
            .or_else(|| self.total.map(|total| total.saturating_sub(self.used)))
    }

    /// Fraction of the entitlement consumed. Not clamped.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn progress(&self) -> Option<f64> {
        match self.total {
            Some(total) if total > 0 => Some(self.used as f64 / total as f64),
            _ => None,
        }
    }

    /// Whether the service flagged this quota as unlimited.
    #[must_use]
    pub fn is_unlimited(&self) -> bool {
        self.unlimited.unwrap_or(false)
    }

    /// Decode a single `premium_interactions` value.
    ///
    /// # Errors
    ///
    /// Returns [`UsageError::InvalidResponse`] when the value is neither a
    /// count nor an object, or when an object field has the wrong JSON type.
    pub fn from_value(value: &Value) -> Result<Self> {
        if let Some(count) = as_count(value) {
            return Ok(Self::from_used(count));
        }

        let Value::Object(fields) = value else {
            return Err(UsageError::InvalidResponse(format!(
                "{PREMIUM_INTERACTIONS} must be a count or an object, got {}",
                type_name(value)
            )));
        };

        let total = int_field(fields, "total", Some("entitlement"))?;
        let remaining = int_field(fields, "remaining", Some("quota_remaining"))?;
        let used = int_field(fields, "used", None)?
            .or_else(|| derive_used(total, remaining))
            .unwrap_or(0);
        let percent_remaining = float_field(fields, "percent_remaining")?;
        let unlimited = bool_field(fields, "unlimited")?;

        Ok(Self {
            used,
            total,
            remaining_provided: remaining,
            percent_remaining,
            unlimited,
        })
    }
}

/// Decode a full service response body.
///
/// `premium_interactions` at the top level takes precedence over
/// `quota_snapshots.premium_interactions`.
///
/// # Errors
///
/// - [`UsageError::InvalidResponse`] for malformed JSON or a malformed value
/// - [`UsageError::MissingPremiumInteractions`] when neither path is present
pub fn decode_response(body: &[u8]) -> Result<QuotaSnapshot> {
    let payload: Value =
        serde_json::from_slice(body).map_err(|e| UsageError::InvalidResponse(e.to_string()))?;

    let interactions = present(payload.get(PREMIUM_INTERACTIONS))
        .or_else(|| {
            present(
                payload
                    .get(QUOTA_SNAPSHOTS)
                    .and_then(|snapshots| snapshots.get(PREMIUM_INTERACTIONS)),
            )
        })
        .ok_or(UsageError::MissingPremiumInteractions)?;

    QuotaSnapshot::from_value(interactions)
}

// =============================================================================
// Field helpers
// =============================================================================

fn present(value: Option<&Value>) -> Option<&Value> {
    value.filter(|v| !v.is_null())
}

/// Negative counts are clamped to zero.
fn clamp(n: i64) -> u64 {
    u64::try_from(n).unwrap_or(0)
}

/// A native integer or an integer-valued string.
fn as_count(value: &Value) -> Option<u64> {
    match value {
        Value::Number(n) => n.as_i64().map(clamp).or_else(|| n.as_u64()),
        Value::String(s) => s.trim().parse::<i64>().ok().map(clamp),
        _ => None,
    }
}

/// The alias is consulted only when `key` is absent or null; a present but
/// unparseable primary value stays unset.
fn int_field(fields: &Map<String, Value>, key: &str, alias: Option<&str>) -> Result<Option<u64>> {
    match alias {
        Some(alias) if present(fields.get(key)).is_none() => lookup_int(fields, alias),
        _ => lookup_int(fields, key),
    }
}

fn lookup_int(fields: &Map<String, Value>, key: &str) -> Result<Option<u64>> {
    match present(fields.get(key)) {
        None => Ok(None),
        Some(number @ Value::Number(n)) => n
            .as_i64()
            .map(clamp)
            .or_else(|| n.as_u64())
            .map(Some)
            .ok_or_else(|| mismatch(key, "an integer", number)),
        // Unparseable strings are treated as absent.
        Some(Value::String(s)) => Ok(s.trim().parse::<i64>().ok().map(clamp)),
        Some(other) => Err(mismatch(key, "an integer", other)),
    }
}

fn float_field(fields: &Map<String, Value>, key: &str) -> Result<Option<f64>> {
    match present(fields.get(key)) {
        None => Ok(None),
        Some(Value::Number(n)) => Ok(n.as_f64()),
        // "NaN" and "inf" parse but have no JSON form.
        Some(Value::String(s)) => Ok(s.trim().parse::<f64>().ok().filter(|f| f.is_finite())),
        Some(other) => Err(mismatch(key, "a number", other)),
    }
}

fn bool_field(fields: &Map<String, Value>, key: &str) -> Result<Option<bool>> {
    match present(fields.get(key)) {
        None => Ok(None),
        Some(Value::Bool(b)) => Ok(Some(*b)),
        Some(other) => Err(mismatch(key, "a boolean", other)),
    }
}

fn derive_used(total: Option<u64>, remaining: Option<u64>) -> Option<u64> {
    Some(total?.saturating_sub(remaining?))
}

fn mismatch(key: &str, expected: &str, found: &Value) -> UsageError {
    UsageError::InvalidResponse(format!(
        "field '{key}' must be {expected}, got {}",
        type_name(found)
    ))
}

const fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
