//! Consensus primitives and unit conversion
//!
//! Everything here is pure. Absent and non-finite inputs are skipped so a
//! provider that omits a value never drags the consensus toward zero.

use crate::models::Units;

const KM_PER_MILE: f64 = 1.609_34;

/// Convert a provider temperature to Celsius
#[must_use]
pub fn to_celsius(value: f64, units: Units) -> f64 {
    match units {
        Units::Metric => value,
        Units::Imperial => (value - 32.0) * 5.0 / 9.0,
    }
}

/// Convert a provider wind speed to km/h
#[must_use]
pub fn to_kph(value: f64, units: Units) -> f64 {
    match units {
        Units::Metric => value,
        Units::Imperial => value * KM_PER_MILE,
    }
}

/// Convert metres per second to km/h
#[must_use]
pub fn ms_to_kph(value: f64) -> f64 {
    value * 3.6
}

/// Median of all finite values, `None` when there are none.
///
/// Even-length input yields the mean of the two middle values.
pub fn median<I>(values: I) -> Option<f64>
where
    I: IntoIterator<Item = Option<f64>>,
{
    let mut finite: Vec<f64> = values
        .into_iter()
        .flatten()
        .filter(|v| v.is_finite())
        .collect();

    if finite.is_empty() {
        return None;
    }

    finite.sort_by(f64::total_cmp);
    let mid = finite.len() / 2;
    if finite.len() % 2 == 0 {
        Some((finite[mid - 1] + finite[mid]) / 2.0)
    } else {
        Some(finite[mid])
    }
}

/// First non-empty string, in input order
pub fn coalesce_str<'a, I>(values: I) -> Option<String>
where
    I: IntoIterator<Item = Option<&'a str>>,
{
    values
        .into_iter()
        .flatten()
        .find(|v| !v.is_empty())
        .map(str::to_owned)
}

/// First finite number, in input order
pub fn coalesce_number<I>(values: I) -> Option<f64>
where
    I: IntoIterator<Item = Option<f64>>,
{
    values.into_iter().flatten().find(|v| v.is_finite())
}
