//! Common GraphQL types

use async_graphql::{Scalar, ScalarType, Value};
use chrono::{DateTime as ChronoDateTime, TimeZone, Utc};

/// DateTime scalar
///
/// Serialized as RFC 3339 on the wire and stored as epoch milliseconds, so
/// every value is kept at millisecond precision.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct DateTime(pub ChronoDateTime<Utc>);

impl DateTime {
    /// Current time truncated to whole milliseconds
    pub fn now() -> Self {
        let now = Utc::now();
        Self::from_millis(now.timestamp_millis()).unwrap_or(DateTime(now))
    }

    /// Build from epoch milliseconds; `None` when out of range
    pub fn from_millis(millis: i64) -> Option<Self> {
        Utc.timestamp_millis_opt(millis).single().map(DateTime)
    }

    /// Epoch milliseconds
    pub fn millis(&self) -> i64 {
        self.0.timestamp_millis()
    }
}

impl From<ChronoDateTime<Utc>> for DateTime {
    fn from(value: ChronoDateTime<Utc>) -> Self {
        DateTime(value)
    }
}

#[Scalar]
impl ScalarType for DateTime {
    fn parse(value: Value) -> async_graphql::InputValueResult<Self> {
        if let Value::String(s) = value {
            let parsed = ChronoDateTime::parse_from_rfc3339(&s)
                .map_err(|e| format!("Invalid DateTime: {}", e))?
                .with_timezone(&Utc);
            // Normalize to storage precision
            Ok(DateTime::from_millis(parsed.timestamp_millis()).unwrap_or(DateTime(parsed)))
        } else {
            Err("Expected string for DateTime".into())
        }
    }

    fn to_value(&self) -> Value {
        Value::String(self.0.to_rfc3339())
    }
}
