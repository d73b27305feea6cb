//! Fixed word lists used by the extractor.
//!
//! All entries are lowercase. Order matters for [`CITIES`]: the first city found
//! in a transcript wins.

/// Terms that mark a transcript as a weather query.
pub const WEATHER_WORDS: &[&str] = &[
    "wetter",
    "temperatur",
    "regen",
    "schnee",
    "sonne",
    "wind",
    "kalt",
    "warm",
    "gewitter",
    "niederschlag",
    "bewölkt",
    "wolken",
    "grad",
    "celsius",
    "vorhersage",
];

/// Known locations, in match priority order.
pub const CITIES: &[&str] = &[
    "berlin",
    "hamburg",
    "münchen",
    "köln",
    "frankfurt",
    "stuttgart",
    "düsseldorf",
    "dresden",
    "leipzig",
    "hannover",
    "nürnberg",
    "dortmund",
    "essen",
    "bremen",
    "bonn",
    "mannheim",
    "heilbronn",
];

pub const TODAY_WORDS: &[&str] = &["heute", "jetzt", "aktuell"];

pub const TOMORROW_WORDS: &[&str] = &["morgen"];

pub const WEEK_WORDS: &[&str] = &["woche", "tage", "übermorgen"];

/// The word whose successor is taken as a location when no city matches.
pub const TRIGGER_WORD: &str = "wetter";

/// True if `word` is a weather keyword or any time marker.
///
/// Used to reject words captured after the trigger word.
pub fn is_reserved(word: &str) -> bool {
    [WEATHER_WORDS, TODAY_WORDS, TOMORROW_WORDS, WEEK_WORDS]
        .iter()
        .any(|list| list.contains(&word))
}

/// True if any entry of `words` occurs as a substring of `text`.
pub fn contains_any(text: &str, words: &[&str]) -> bool {
    words.iter().any(|word| text.contains(word))
}
