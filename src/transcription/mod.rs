//! # Transcription Module
//!
//! Speech-to-text behind a narrow contract: the session layer hands over the bytes
//! of one utterance and gets back a [`TranscriptResult`]. It never sees the
//! acoustic model or the decoding algorithm.
//!
//! ## Key Components:
//! - **Recognizer**: The `is_available()` / `decode()` contract used by sessions
//! - **SpeechRecognizer**: Working adapter that feeds WAV audio to a shared model
//! - **UnavailableRecognizer**: Null adapter used when no model could be loaded
//! - **AcousticModel**: Shared, read-only model that creates call-scoped
//!   streaming recognizers (Vosk when built with the `vosk` feature)

pub mod engine;   // Recognizer contract and adapters
pub mod model;    // Acoustic model abstraction and loading

pub use engine::Recognizer;
pub use model::load_recognizer;
