//! Consensus merging of provider results

use std::collections::{BTreeMap, HashSet};

use chrono::{NaiveDate, Utc};

use crate::models::{
    NormalizedCurrentWeather, NormalizedForecast, NormalizedForecastDay,
    ProviderCurrentObservation, ProviderForecastDaily,
};
use crate::normalize::{coalesce_number, coalesce_str, median};

/// Merge current observations: numeric medians, first-wins condition,
/// de-duplicated warnings. Observations are kept verbatim as provenance.
#[must_use]
pub fn merge_current_observations(
    observations: &[ProviderCurrentObservation],
) -> NormalizedCurrentWeather {
    let temp_c = median(observations.iter().map(|o| o.temp_c));
    let humidity = median(observations.iter().map(|o| o.humidity));
    let wind_kph = median(observations.iter().map(|o| o.wind_kph));
    let condition = coalesce_str(observations.iter().map(|o| o.condition.as_deref()));

    let mut seen = HashSet::new();
    let warnings = observations
        .iter()
        .flat_map(|o| o.warnings.iter())
        .filter(|w| seen.insert(w.as_str()))
        .cloned()
        .collect();

    NormalizedCurrentWeather {
        temp_c,
        humidity,
        wind_kph,
        condition,
        source_breakdown: observations.to_vec(),
        fetched_at: Utc::now(),
        warnings,
    }
}

/// Merge per-provider daily forecasts into one forecast of at most `days` days
#[must_use]
pub fn merge_forecasts(forecasts: &[Vec<ProviderForecastDaily>], days: usize) -> NormalizedForecast {
    let mut grouped: BTreeMap<NaiveDate, Vec<&ProviderForecastDaily>> = BTreeMap::new();
    for entry in forecasts.iter().flatten() {
        grouped.entry(entry.date).or_default().push(entry);
    }

    let days = grouped
        .into_iter()
        .take(days)
        .map(|(date, entries)| NormalizedForecastDay {
            date,
            min_c: median(entries.iter().map(|e| e.min_c)),
            max_c: median(entries.iter().map(|e| e.max_c)),
            pop: coalesce_number(entries.iter().map(|e| e.pop)),
            summary: coalesce_str(entries.iter().map(|e| e.summary.as_deref())),
        })
        .collect();

    NormalizedForecast { days }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn observation(
        source: &str,
        temp_c: f64,
        humidity: f64,
        wind_kph: f64,
        condition: Option<&str>,
    ) -> ProviderCurrentObservation {
        ProviderCurrentObservation {
            temp_c: Some(temp_c),
            humidity: Some(humidity),
            wind_kph: Some(wind_kph),
            condition: condition.map(str::to_owned),
            ..ProviderCurrentObservation::empty(source)
        }
    }

    fn day(
        source: &str,
        date: &str,
        min_c: f64,
        max_c: f64,
        pop: Option<f64>,
        summary: &str,
    ) -> ProviderForecastDaily {
        ProviderForecastDaily {
            source: source.to_string(),
            date: date.parse().unwrap(),
            min_c: Some(min_c),
            max_c: Some(max_c),
            pop,
            summary: Some(summary.to_string()),
            raw: None,
        }
    }

    #[test]
    fn test_merge_current_produces_medians_and_breakdown() {
        let mut fallback = observation("met-no-fallback", 12.0, 60.0, 20.0, None);
        fallback.warnings = vec!["fallback used".into()];
        let observations = vec![
            observation("open-meteo", 10.0, 40.0, 15.0, Some("Clear")),
            observation("met-no", 14.0, 50.0, 17.0, Some("Partly cloudy")),
            fallback,
        ];

        let merged = merge_current_observations(&observations);

        assert_eq!(merged.temp_c, Some(12.0));
        assert_eq!(merged.humidity, Some(50.0));
        assert_eq!(merged.wind_kph, Some(17.0));
        assert_eq!(merged.condition.as_deref(), Some("Clear"));
        assert_eq!(merged.source_breakdown.len(), 3);
        assert_eq!(merged.warnings, vec!["fallback used".to_string()]);
    }

    #[test]
    fn test_merge_current_missing_field_is_none_not_zero() {
        let observations = vec![
            ProviderCurrentObservation {
                temp_c: Some(3.0),
                ..ProviderCurrentObservation::empty("a")
            },
            ProviderCurrentObservation {
                temp_c: Some(f64::NAN),
                condition: Some(String::new()),
                ..ProviderCurrentObservation::empty("b")
            },
        ];

        let merged = merge_current_observations(&observations);

        assert_eq!(merged.temp_c, Some(3.0));
        assert_eq!(merged.humidity, None);
        assert_eq!(merged.wind_kph, None);
        assert_eq!(merged.condition, None);
    }

    #[test]
    fn test_merge_current_deduplicates_warnings() {
        let observations = vec![
            ProviderCurrentObservation {
                warnings: vec!["stale station".into(), "gusty".into()],
                ..ProviderCurrentObservation::empty("a")
            },
            ProviderCurrentObservation {
                warnings: vec!["gusty".into()],
                ..ProviderCurrentObservation::empty("b")
            },
        ];

        let merged = merge_current_observations(&observations);

        assert_eq!(merged.warnings.len(), 2);
        assert!(merged.warnings.contains(&"stale station".to_string()));
        assert!(merged.warnings.contains(&"gusty".to_string()));
    }

    #[test]
    fn test_merge_forecasts_groups_by_date_and_sorts() {
        let provider_a = vec![
            day("open-meteo", "2024-01-02", 6.0, 14.0, Some(30.0), "Cloudy"),
            day("open-meteo", "2024-01-01", 5.0, 12.0, Some(40.0), "Clear"),
        ];
        let provider_b = vec![
            day("met-no", "2024-01-01", 4.0, 11.0, Some(50.0), "Clear"),
            day("met-no", "2024-01-02", 7.0, 15.0, Some(20.0), "Sunny"),
        ];

        let merged = merge_forecasts(&[provider_a, provider_b], 7);

        assert_eq!(
            merged.days,
            vec![
                NormalizedForecastDay {
                    date: "2024-01-01".parse().unwrap(),
                    min_c: Some(4.5),
                    max_c: Some(11.5),
                    pop: Some(40.0),
                    summary: Some("Clear".into()),
                },
                NormalizedForecastDay {
                    date: "2024-01-02".parse().unwrap(),
                    min_c: Some(6.5),
                    max_c: Some(14.5),
                    pop: Some(30.0),
                    summary: Some("Cloudy".into()),
                },
            ]
        );
    }

    #[test]
    fn test_merge_forecasts_truncates_and_keeps_single_provider_dates() {
        let provider_a = vec![
            day("a", "2024-03-01", 1.0, 5.0, None, "Fog"),
            day("a", "2024-03-02", 2.0, 6.0, None, "Fog"),
        ];
        let provider_b = vec![
            day("b", "2024-03-03", 3.0, 7.0, Some(10.0), "Rain"),
            day("b", "2024-02-29", 0.0, 4.0, Some(80.0), "Snow"),
        ];

        let merged = merge_forecasts(&[provider_a, provider_b], 3);

        let dates: Vec<String> = merged.days.iter().map(|d| d.date.to_string()).collect();
        assert_eq!(dates, vec!["2024-02-29", "2024-03-01", "2024-03-02"]);
        assert_eq!(merged.days[1].pop, None);
        assert_eq!(merged.days[0].summary.as_deref(), Some("Snow"));
    }

    #[test]
    fn test_merge_forecasts_empty_input() {
        assert!(merge_forecasts(&[], 7).is_empty());
        assert!(merge_forecasts(&[Vec::new(), Vec::new()], 7).is_empty());
    }
}
