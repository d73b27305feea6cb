//! # Audio Handling
//!
//! Everything the service does with raw utterance bytes before they reach the
//! recognizer.
//!
//! ## Key Components:
//! - **WAV decoding**: Parses the RIFF/WAVE container and normalises samples to
//!   16-bit mono PCM, the format the acoustic model expects
//! - **Staging**: Scoped tracking of utterances that are waiting for or undergoing
//!   decoding, released automatically when the utterance is dropped

pub mod staging;   // Scoped utterance staging
pub mod wav;       // WAV container parsing

pub use staging::StagingArea;
pub use wav::WavAudio;
