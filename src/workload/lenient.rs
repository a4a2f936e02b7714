//! Tolerant field decoders for execution logs.
//!
//! Engines write counts as `10000` or `10000.0` and report unknown values as
//! `null`. These decoders accept both so one sloppy field does not cost the
//! whole record.

use std::fmt;

use serde::de::{self, Deserialize, Deserializer, Unexpected, Visitor};

use super::record::{DEFAULT_OPERATOR, UNKNOWN_CATEGORY};

/// Accepts any finite non-negative JSON number, truncating fractions. `null` is absent.
struct CountVisitor;

impl<'de> Visitor<'de> for CountVisitor {
    type Value = Option<u64>;

    fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
        formatter.write_str("a non-negative number or null")
    }

    fn visit_u64<E>(self, v: u64) -> Result<Self::Value, E>
    where
        E: de::Error,
    {
        Ok(Some(v))
    }

    fn visit_i64<E>(self, v: i64) -> Result<Self::Value, E>
    where
        E: de::Error,
    {
        u64::try_from(v)
            .map(Some)
            .map_err(|_| E::invalid_value(Unexpected::Signed(v), &self))
    }

    fn visit_f64<E>(self, v: f64) -> Result<Self::Value, E>
    where
        E: de::Error,
    {
        if v.is_finite() && v >= 0.0 {
            Ok(Some(v.trunc() as u64))
        } else {
            Err(E::invalid_value(Unexpected::Float(v), &self))
        }
    }

    fn visit_unit<E>(self) -> Result<Self::Value, E>
    where
        E: de::Error,
    {
        Ok(None)
    }

    fn visit_none<E>(self) -> Result<Self::Value, E>
    where
        E: de::Error,
    {
        Ok(None)
    }

    fn visit_some<D>(self, deserializer: D) -> Result<Self::Value, D::Error>
    where
        D: Deserializer<'de>,
    {
        deserializer.deserialize_any(self)
    }
}

fn optional_count<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: TryFrom<u64>,
{
    match deserializer.deserialize_any(CountVisitor)? {
        Some(v) => T::try_from(v).map(Some).map_err(|_| {
            de::Error::invalid_value(Unexpected::Unsigned(v), &"a count within range")
        }),
        None => Ok(None),
    }
}

/// A count; `null` decodes as zero.
pub(crate) fn count<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: TryFrom<u64> + Default,
{
    Ok(optional_count(deserializer)?.unwrap_or_default())
}

/// Clause count of a filter tree; `null` decodes as a single clause.
pub(crate) fn complexity<'de, D>(deserializer: D) -> Result<u32, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(optional_count(deserializer)?.unwrap_or(1))
}

/// A real-valued statistic; `null` decodes as zero.
pub(crate) fn number<'de, D>(deserializer: D) -> Result<f64, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<f64>::deserialize(deserializer)?.unwrap_or(0.0))
}

/// A categorical value; `null` decodes as [`UNKNOWN_CATEGORY`].
pub(crate) fn category<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<String>::deserialize(deserializer)?
        .unwrap_or_else(|| UNKNOWN_CATEGORY.to_string()))
}

/// A filter operator; `null` decodes as [`DEFAULT_OPERATOR`].
pub(crate) fn operator<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<String>::deserialize(deserializer)?
        .unwrap_or_else(|| DEFAULT_OPERATOR.to_string()))
}
