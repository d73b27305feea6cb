//! # Weather Query Extraction
//!
//! Maps a transcript to a [`WeatherQuery`]. The extractor is pure: the same input
//! always yields the same output and nothing is remembered between calls.
//!
//! ## Extraction Steps:
//! 1. **Keyword match**: Any weather keyword as a substring marks a weather query
//! 2. **Gazetteer**: First known city found as a substring becomes the location
//! 3. **Trigger pattern**: Without a city, the word after "wetter" is taken as the
//!    location unless it is itself a keyword or a time marker
//! 4. **Override**: A location always makes the text a weather query
//! 5. **Time period**: today, then tomorrow-markers, then week-markers (week wins)

use crate::intent::vocabulary::{
    contains_any, is_reserved, CITIES, TOMORROW_WORDS, TRIGGER_WORD, WEATHER_WORDS, WEEK_WORDS,
};
use regex::Regex;
use serde::Serialize;
use std::fmt;

/// Time period a weather query refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TimePeriod {
    #[default]
    Today,
    Tomorrow,
    Week,
}

impl TimePeriod {
    pub fn as_str(&self) -> &'static str {
        match self {
            TimePeriod::Today => "today",
            TimePeriod::Tomorrow => "tomorrow",
            TimePeriod::Week => "week",
        }
    }
}

impl fmt::Display for TimePeriod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Structured result of analysing one transcript.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WeatherQuery {
    pub is_weather_query: bool,
    /// Lowercased location, if one was recognised
    pub location: Option<String>,
    pub time_period: TimePeriod,
    /// The text as received, before lowercasing
    pub original_query: String,
}

/// Keyword, gazetteer and pattern based weather intent extractor.
///
/// Holds the compiled trigger pattern so it is built once per process rather
/// than once per message.
#[derive(Debug, Clone)]
pub struct WeatherExtractor {
    trigger_pattern: Regex,
}

impl Default for WeatherExtractor {
    fn default() -> Self {
        Self::new()
    }
}

impl WeatherExtractor {
    pub fn new() -> Self {
        let pattern = format!(r"{}\s+([a-zäöüß]+)", regex::escape(TRIGGER_WORD));
        Self {
            trigger_pattern: Regex::new(&pattern).expect("Invalid trigger regex"),
        }
    }

    /// Extract weather query information from `text`.
    ///
    /// Matching is case-insensitive. Empty text is never a weather query.
    pub fn extract(&self, text: &str) -> WeatherQuery {
        if text.is_empty() {
            return WeatherQuery {
                is_weather_query: false,
                location: None,
                time_period: TimePeriod::Today,
                original_query: String::new(),
            };
        }

        let lowered = text.to_lowercase();

        let mut is_weather_query = contains_any(&lowered, WEATHER_WORDS);
        let location = self.extract_location(&lowered, is_weather_query);

        // A recognised location is treated as a weather query even without a keyword
        if location.is_some() {
            is_weather_query = true;
        }

        WeatherQuery {
            is_weather_query,
            location,
            time_period: Self::extract_time_period(&lowered),
            original_query: text.to_string(),
        }
    }

    fn extract_location(&self, text: &str, is_weather_query: bool) -> Option<String> {
        if let Some(city) = CITIES.iter().find(|city| text.contains(*city)) {
            return Some((*city).to_string());
        }

        if !is_weather_query {
            return None;
        }

        self.trigger_pattern
            .captures(text)
            .and_then(|captures| captures.get(1))
            .map(|word| word.as_str())
            .filter(|word| !is_reserved(word))
            .map(str::to_string)
    }

    fn extract_time_period(text: &str) -> TimePeriod {
        let mut period = TimePeriod::Today;

        if contains_any(text, TOMORROW_WORDS) {
            period = TimePeriod::Tomorrow;
        }

        // Checked last so that week markers override tomorrow markers
        if contains_any(text, WEEK_WORDS) {
            period = TimePeriod::Week;
        }

        period
    }
}
