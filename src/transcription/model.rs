//! # Acoustic Model Management
//!
//! The acoustic model is loaded once at startup and shared read-only by every
//! decode call. Each call asks the model for its own [`StreamRecognizer`], which
//! holds all per-utterance decoding state and is dropped when the call ends.
//!
//! ## Model Loading Process:
//! 1. Check that the configured model directory exists
//! 2. Load it with the Vosk engine (only when built with the `vosk` feature)
//! 3. Wrap it in a [`SpeechRecognizer`]; on any failure fall back to the
//!    [`UnavailableRecognizer`] so the service still starts and serves text queries

use crate::config::SpeechConfig;
use crate::transcription::engine::{Recognizer, SpeechRecognizer, UnavailableRecognizer};
use anyhow::Result;
use std::sync::Arc;

/// Per-call streaming decoder created from an [`AcousticModel`].
pub trait StreamRecognizer: Send {
    /// Feed one frame of mono 16-bit samples. Returns the text of a segment when
    /// the recognizer finalizes one (e.g. after detecting a pause).
    fn accept(&mut self, samples: &[i16]) -> Result<Option<String>>;

    /// Flush any pending audio and return the remaining text.
    fn finish(&mut self) -> Result<String>;
}

/// Shared, immutable speech model.
pub trait AcousticModel: Send + Sync {
    fn name(&self) -> &str;

    /// Create a recognizer bound to this model and `sample_rate` (Hz).
    fn recognizer(&self, sample_rate: f32) -> Result<Box<dyn StreamRecognizer>>;
}

/// Select the recognizer implementation for this process.
///
/// Never fails: problems loading the model are logged and turn speech
/// recognition off instead of aborting startup.
pub fn load_recognizer(config: &SpeechConfig) -> Arc<dyn Recognizer> {
    match load_model(config) {
        Ok(model) => {
            tracing::info!("Speech recognition ready using {}", model.name());
            Arc::new(SpeechRecognizer::new(model, config.frame_samples))
        }
        Err(err) => {
            let fallback = UnavailableRecognizer::new(format!("{:#}", err));
            tracing::warn!("Speech recognition disabled: {}", fallback.reason());
            Arc::new(fallback)
        }
    }
}

#[cfg(feature = "vosk")]
fn load_model(config: &SpeechConfig) -> Result<Arc<dyn AcousticModel>> {
    let path = std::path::Path::new(&config.model_path);
    if !path.exists() {
        anyhow::bail!("Model path not found: {}", path.display());
    }

    let start_time = std::time::Instant::now();
    let model = vosk_model::VoskModel::load(path)?;
    tracing::info!(
        "Loaded acoustic model from {} in {:.2}s",
        path.display(),
        start_time.elapsed().as_secs_f64()
    );

    Ok(Arc::new(model))
}

#[cfg(not(feature = "vosk"))]
fn load_model(config: &SpeechConfig) -> Result<Arc<dyn AcousticModel>> {
    anyhow::bail!(
        "built without the `vosk` feature, ignoring model at {}",
        config.model_path
    )
}

#[cfg(feature = "vosk")]
mod vosk_model {
    use super::{AcousticModel, StreamRecognizer};
    use anyhow::{anyhow, Result};
    use std::path::Path;
    use vosk::{CompleteResult, DecodingState, Model, Recognizer};

    pub struct VoskModel {
        model: Model,
        name: String,
    }

    impl VoskModel {
        pub fn load(path: &Path) -> Result<Self> {
            let model = Model::new(path.to_string_lossy())
                .ok_or_else(|| anyhow!("Failed to load Vosk model from {}", path.display()))?;

            let name = path
                .file_name()
                .map(|n| format!("vosk ({})", n.to_string_lossy()))
                .unwrap_or_else(|| "vosk".to_string());

            Ok(Self { model, name })
        }
    }

    impl AcousticModel for VoskModel {
        fn name(&self) -> &str {
            &self.name
        }

        fn recognizer(&self, sample_rate: f32) -> Result<Box<dyn StreamRecognizer>> {
            let recognizer = Recognizer::new(&self.model, sample_rate).ok_or_else(|| {
                anyhow!("Failed to create Vosk recognizer at {} Hz", sample_rate)
            })?;
            Ok(Box::new(VoskStream { recognizer }))
        }
    }

    struct VoskStream {
        recognizer: Recognizer,
    }

    fn result_text(result: CompleteResult<'_>) -> String {
        result
            .single()
            .map(|single| single.text.to_string())
            .unwrap_or_default()
    }

    impl StreamRecognizer for VoskStream {
        fn accept(&mut self, samples: &[i16]) -> Result<Option<String>> {
            match self.recognizer.accept_waveform(samples) {
                Ok(DecodingState::Finalized) => Ok(Some(result_text(self.recognizer.result()))),
                Ok(_) => Ok(None),
                Err(err) => Err(anyhow!("Vosk rejected audio frame: {:?}", err)),
            }
        }

        fn finish(&mut self) -> Result<String> {
            Ok(result_text(self.recognizer.final_result()))
        }
    }
}
