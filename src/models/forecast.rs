//! Daily forecast models, per provider and merged

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// One provider's forecast for one calendar day
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProviderForecastDaily {
    pub source: String,
    /// ISO calendar day (serialized as `YYYY-MM-DD`)
    pub date: NaiveDate,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_c: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_c: Option<f64>,
    /// Probability of precipitation in percent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pop: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub raw: Option<serde_json::Value>,
}

/// Consensus forecast for one day
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NormalizedForecastDay {
    pub date: NaiveDate,
    pub min_c: Option<f64>,
    pub max_c: Option<f64>,
    pub pop: Option<f64>,
    pub summary: Option<String>,
}

/// Consensus forecast, ascending by date
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct NormalizedForecast {
    pub days: Vec<NormalizedForecastDay>,
}

impl NormalizedForecast {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.days.is_empty()
    }

    /// Forecast for a specific day, if present
    #[must_use]
    pub fn day(&self, date: NaiveDate) -> Option<&NormalizedForecastDay> {
        self.days.iter().find(|d| d.date == date)
    }
}
