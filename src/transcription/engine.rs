//! # Recognizer Adapters
//!
//! The session layer only knows the [`Recognizer`] contract: ask
//! `is_available()` once per audio frame, and if so call `decode()` with the raw
//! utterance bytes. Two implementations exist and one is chosen at startup:
//!
//! - [`SpeechRecognizer`]: parses the WAV container and streams the samples through
//!   a call-scoped recognizer created from the shared [`AcousticModel`]
//! - [`UnavailableRecognizer`]: reports itself unavailable and never decodes
//!
//! ## Decode Process:
//! 1. Zero-length payloads short-circuit to an empty, successful transcript
//! 2. Parse the container; the sample rate comes from its header
//! 3. Create a fresh recognizer for this call only
//! 4. Feed fixed-size frames; every finalized segment is appended to the transcript
//! 5. Flush the recognizer and append the final text
//! 6. Any error becomes a failed [`TranscriptResult`] instead of propagating

use crate::audio::WavAudio;
use crate::transcription::model::AcousticModel;
use anyhow::Result;
use serde::Serialize;
use std::sync::Arc;
use std::time::Instant;

/// Message reported whenever speech recognition is not initialised.
pub const UNAVAILABLE_MESSAGE: &str = "Speech recognition not available";

/// Outcome of one decode call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TranscriptResult {
    pub success: bool,
    /// Recognised text, trimmed; empty on failure
    pub text: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl TranscriptResult {
    pub fn recognized(text: impl Into<String>) -> Self {
        Self {
            success: true,
            text: text.into(),
            error: None,
        }
    }

    pub fn failed(error: impl Into<String>) -> Self {
        Self {
            success: false,
            text: String::new(),
            error: Some(error.into()),
        }
    }
}

/// Speech-to-text capability consumed by sessions.
///
/// Implementations must be callable from many threads at once. `decode` blocks
/// and is expected to run on a worker pool, never on the event loop.
pub trait Recognizer: Send + Sync {
    /// Whether `decode` may be called at all.
    fn is_available(&self) -> bool;

    /// Human-readable name of the backing engine, for health reporting.
    fn engine_name(&self) -> &str;

    /// Decode one complete utterance. Never panics on bad input and never
    /// returns an error other than through [`TranscriptResult::failed`].
    fn decode(&self, audio: &[u8]) -> TranscriptResult;
}

/// Working adapter over a loaded acoustic model.
pub struct SpeechRecognizer {
    /// Shared, read-only after load
    model: Arc<dyn AcousticModel>,
    /// Samples per feed call
    frame_samples: usize,
}

impl SpeechRecognizer {
    pub fn new(model: Arc<dyn AcousticModel>, frame_samples: usize) -> Self {
        Self {
            model,
            frame_samples: frame_samples.max(1),
        }
    }

    fn transcribe(&self, audio: &[u8]) -> Result<String> {
        if audio.is_empty() {
            return Ok(String::new());
        }

        let start_time = Instant::now();
        let wav = WavAudio::parse(audio)?;

        // Fresh recognizer per call; only the model is shared between sessions
        let mut recognizer = self.model.recognizer(wav.sample_rate as f32)?;

        let mut transcript = String::new();
        for frame in wav.samples.chunks(self.frame_samples) {
            if let Some(segment) = recognizer.accept(frame)? {
                transcript.push_str(&segment);
                transcript.push(' ');
            }
        }
        transcript.push_str(&recognizer.finish()?);

        let text = transcript.trim().to_string();

        tracing::info!(
            "Transcription completed: {:.2}s audio ({} ch @ {} Hz) -> {} chars in {}ms",
            wav.duration_seconds(),
            wav.source_channels,
            wav.sample_rate,
            text.len(),
            start_time.elapsed().as_millis()
        );

        Ok(text)
    }
}

impl Recognizer for SpeechRecognizer {
    fn is_available(&self) -> bool {
        true
    }

    fn engine_name(&self) -> &str {
        self.model.name()
    }

    fn decode(&self, audio: &[u8]) -> TranscriptResult {
        match self.transcribe(audio) {
            Ok(text) => TranscriptResult::recognized(text),
            Err(err) => {
                tracing::warn!("Decode failed: {:#}", err);
                TranscriptResult::failed(format!("{:#}", err))
            }
        }
    }
}

/// Null adapter selected when no acoustic model could be loaded.
pub struct UnavailableRecognizer {
    reason: String,
}

impl UnavailableRecognizer {
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }

    /// Why speech recognition is disabled.
    pub fn reason(&self) -> &str {
        &self.reason
    }
}

impl Recognizer for UnavailableRecognizer {
    fn is_available(&self) -> bool {
        false
    }

    fn engine_name(&self) -> &str {
        "unavailable"
    }

    fn decode(&self, _audio: &[u8]) -> TranscriptResult {
        TranscriptResult::failed(UNAVAILABLE_MESSAGE)
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::audio::wav::encode_pcm16;
    use crate::transcription::model::StreamRecognizer;
    use anyhow::anyhow;
    use std::sync::Mutex;

    /// Model whose recognizers finalize a segment every `segment_every` frames.
    pub(crate) struct ScriptedModel {
        pub segment_every: usize,
        pub final_text: String,
        pub fail_on_create: bool,
        pub frames: Arc<Mutex<Vec<usize>>>,
        pub sample_rates: Arc<Mutex<Vec<f32>>>,
    }

    impl ScriptedModel {
        pub(crate) fn new(segment_every: usize, final_text: &str) -> Self {
            Self {
                segment_every,
                final_text: final_text.to_string(),
                fail_on_create: false,
                frames: Arc::new(Mutex::new(Vec::new())),
                sample_rates: Arc::new(Mutex::new(Vec::new())),
            }
        }
    }

    struct ScriptedStream {
        segment_every: usize,
        final_text: String,
        fed: usize,
        frames: Arc<Mutex<Vec<usize>>>,
    }

    impl StreamRecognizer for ScriptedStream {
        fn accept(&mut self, samples: &[i16]) -> Result<Option<String>> {
            self.fed += 1;
            self.frames.lock().unwrap().push(samples.len());
            if self.segment_every > 0 && self.fed % self.segment_every == 0 {
                Ok(Some(format!("teil{}", self.fed)))
            } else {
                Ok(None)
            }
        }

        fn finish(&mut self) -> Result<String> {
            Ok(self.final_text.clone())
        }
    }

    impl AcousticModel for ScriptedModel {
        fn name(&self) -> &str {
            "scripted"
        }

        fn recognizer(&self, sample_rate: f32) -> Result<Box<dyn StreamRecognizer>> {
            if self.fail_on_create {
                return Err(anyhow!("recognizer rejected sample rate {}", sample_rate));
            }
            self.sample_rates.lock().unwrap().push(sample_rate);
            Ok(Box::new(ScriptedStream {
                segment_every: self.segment_every,
                final_text: self.final_text.clone(),
                fed: 0,
                frames: Arc::clone(&self.frames),
            }))
        }
    }

    #[test]
    fn test_empty_payload_is_empty_transcript() {
        let model = Arc::new(ScriptedModel::new(1, "never"));
        let recognizer = SpeechRecognizer::new(model.clone(), 4000);

        let result = recognizer.decode(&[]);
        assert_eq!(result, TranscriptResult::recognized(""));
        assert!(model.sample_rates.lock().unwrap().is_empty());
    }

    #[test]
    fn test_frames_are_fed_in_fixed_sizes() {
        let model = Arc::new(ScriptedModel::new(2, "ende"));
        let recognizer = SpeechRecognizer::new(model.clone(), 4000);
        let audio = encode_pcm16(16000, 1, &vec![0i16; 10000]);

        let result = recognizer.decode(&audio);
        assert!(result.success);
        assert_eq!(result.text, "teil2 ende");
        assert_eq!(*model.frames.lock().unwrap(), vec![4000, 4000, 2000]);
        assert_eq!(*model.sample_rates.lock().unwrap(), vec![16000.0]);
    }

    #[test]
    fn test_transcript_is_trimmed() {
        let model = Arc::new(ScriptedModel::new(1, ""));
        let recognizer = SpeechRecognizer::new(model, 4000);
        let audio = encode_pcm16(8000, 1, &vec![0i16; 4000]);

        assert_eq!(recognizer.decode(&audio).text, "teil1");
    }

    #[test]
    fn test_invalid_container_is_reported_not_raised() {
        let recognizer = SpeechRecognizer::new(Arc::new(ScriptedModel::new(1, "")), 4000);

        let result = recognizer.decode(b"RIFF garbage");
        assert!(!result.success);
        assert!(result.text.is_empty());
        assert!(result.error.unwrap().contains("Invalid WAV container"));
    }

    #[test]
    fn test_recognizer_creation_failure_is_reported() {
        let mut model = ScriptedModel::new(1, "");
        model.fail_on_create = true;
        let recognizer = SpeechRecognizer::new(Arc::new(model), 4000);
        let audio = encode_pcm16(16000, 1, &[1, 2, 3]);

        let result = recognizer.decode(&audio);
        assert!(!result.success);
        assert!(result.error.unwrap().contains("rejected sample rate"));
    }

    #[test]
    fn test_each_call_gets_a_fresh_recognizer() {
        let model = Arc::new(ScriptedModel::new(0, "hallo"));
        let recognizer = SpeechRecognizer::new(model.clone(), 4000);
        let audio = encode_pcm16(16000, 1, &vec![0i16; 100]);

        assert_eq!(recognizer.decode(&audio).text, "hallo");
        assert_eq!(recognizer.decode(&audio).text, "hallo");
        assert_eq!(model.sample_rates.lock().unwrap().len(), 2);
    }

    #[test]
    fn test_concurrent_decodes_share_the_model() {
        let recognizer = SpeechRecognizer::new(Arc::new(ScriptedModel::new(0, "wetter")), 4000);
        let audio = encode_pcm16(16000, 1, &vec![0i16; 9000]);
        let (recognizer, audio) = (&recognizer, &audio);

        std::thread::scope(|scope| {
            let handles: Vec<_> = (0..4)
                .map(|_| scope.spawn(move || recognizer.decode(audio)))
                .collect();
            for handle in handles {
                assert_eq!(handle.join().unwrap(), TranscriptResult::recognized("wetter"));
            }
        });
    }

    #[test]
    fn test_unavailable_recognizer() {
        let recognizer = UnavailableRecognizer::new("model missing");
        assert!(!recognizer.is_available());
        assert_eq!(recognizer.reason(), "model missing");
        assert_eq!(
            recognizer.decode(&[1, 2, 3]),
            TranscriptResult::failed(UNAVAILABLE_MESSAGE)
        );
    }
}
