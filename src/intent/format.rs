//! Renders a [`WeatherQuery`] into the text sent back to clients.

use crate::intent::extractor::WeatherQuery;

/// Placeholder shown when no location was recognised.
pub const UNKNOWN_LOCATION: &str = "nicht erkannt";

/// Format a query as the fixed multi-line result layout:
///
/// ```text
/// <original query>
///
/// Wetterabfrage: True
/// Ort: berlin
/// Zeitraum: tomorrow
/// ```
pub fn format_query(query: &WeatherQuery) -> String {
    format!(
        "{}\n\nWetterabfrage: {}\nOrt: {}\nZeitraum: {}",
        query.original_query,
        if query.is_weather_query { "True" } else { "False" },
        query.location.as_deref().unwrap_or(UNKNOWN_LOCATION),
        query.time_period,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::intent::extractor::{TimePeriod, WeatherExtractor};

    #[test]
    fn test_format_with_location() {
        let query = WeatherExtractor::new().extract("Wetter in Berlin morgen");
        assert_eq!(
            format_query(&query),
            "Wetter in Berlin morgen\n\nWetterabfrage: True\nOrt: berlin\nZeitraum: tomorrow"
        );
    }

    #[test]
    fn test_format_without_location() {
        let query = WeatherQuery {
            is_weather_query: false,
            location: None,
            time_period: TimePeriod::Today,
            original_query: "Hallo".to_string(),
        };
        assert_eq!(
            format_query(&query),
            "Hallo\n\nWetterabfrage: False\nOrt: nicht erkannt\nZeitraum: today"
        );
    }
}
