//! # Weather Intent Extraction
//!
//! Deterministic, lexical analysis of transcripts. No language model is involved:
//! a transcript is lowercased and matched against fixed word lists, a gazetteer of
//! German cities and one trigger-word pattern.
//!
//! ## Key Components:
//! - **Vocabulary**: Weather keywords, city gazetteer and time markers
//! - **Extractor**: Turns text into a [`WeatherQuery`]
//! - **Formatter**: Renders a [`WeatherQuery`] into the outbound text layout

pub mod extractor;   // Text -> WeatherQuery
pub mod format;      // WeatherQuery -> outbound text
pub mod vocabulary;  // Fixed word lists

pub use extractor::WeatherExtractor;
pub use format::format_query;
