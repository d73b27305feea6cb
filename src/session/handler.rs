//! # Frame Dispatch
//!
//! [`SessionHandler::respond`] turns one inbound frame into the ordered list of
//! messages to send back. The WebSocket actor awaits it before it accepts the
//! next frame, so all messages for frame N are sent before anything for frame N+1.
//!
//! ## Audio Frame Flow:
//! 1. Refuse immediately when no recognizer is available
//! 2. Reject payloads above the configured size
//! 3. Stage the bytes; the guard is released on every exit path
//! 4. Decode on the blocking pool, bounded by the decode timeout
//! 5. Drop the result if the session closed in the meantime
//! 6. Send the transcript, then either the no-speech notice or the analysis
//!
//! Every failure is a [`SessionError`]; the conversion into a client message
//! happens once, at the end of `respond`.

use crate::error::SessionError;
use crate::intent::format_query;
use crate::session::protocol::{parse_text_frame, InboundFrame, OutboundMessage, NO_SPEECH_NOTICE};
use crate::state::AppState;
use std::any::Any;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;
use std::time::{Duration, Instant};
use uuid::Uuid;

/// Per-session frame processor.
#[derive(Clone)]
pub struct SessionHandler {
    session_id: Uuid,
    state: AppState,
    decode_timeout: Duration,
    max_audio_bytes: usize,
}

impl SessionHandler {
    pub fn new(session_id: Uuid, state: AppState) -> Self {
        let config = state.get_config();

        Self {
            session_id,
            state,
            decode_timeout: Duration::from_secs(config.speech.decode_timeout_secs),
            max_audio_bytes: config.speech.max_audio_bytes,
        }
    }

    pub fn session_id(&self) -> Uuid {
        self.session_id
    }

    /// Process one frame and return the messages to send, in order.
    ///
    /// Recoverable failures are appended as an error message. A transport
    /// failure (the session is gone) yields no messages at all.
    pub async fn respond(&self, frame: InboundFrame) -> Vec<OutboundMessage> {
        self.state.record_frame(frame.kind());
        tracing::debug!(session = %self.session_id, kind = frame.kind(), "Processing frame");

        let mut outbox = Vec::new();
        let result = match frame {
            InboundFrame::Audio(bytes) => self.handle_audio(bytes, &mut outbox).await,
            InboundFrame::Text(raw) => self.handle_text(&raw, &mut outbox),
        };

        match result {
            Ok(()) => outbox,
            Err(err) if !err.is_recoverable() => {
                tracing::debug!(session = %self.session_id, "Discarding result: {}", err);
                Vec::new()
            }
            Err(err) => {
                outbox.push(self.reject(err));
                outbox
            }
        }
    }

    /// Report a recoverable failure that happened before a frame could be
    /// dispatched (e.g. a fragmented message that grew too large).
    pub fn reject(&self, err: SessionError) -> OutboundMessage {
        tracing::warn!(session = %self.session_id, "Frame failed: {}", err);
        self.state.record_frame_error();
        OutboundMessage::from(err)
    }

    async fn handle_audio(
        &self,
        bytes: Vec<u8>,
        outbox: &mut Vec<OutboundMessage>,
    ) -> Result<(), SessionError> {
        let recognizer = Arc::clone(&self.state.recognizer);
        if !recognizer.is_available() {
            return Err(SessionError::EngineUnavailable);
        }

        if bytes.len() > self.max_audio_bytes {
            return Err(SessionError::DecodeFailure(format!(
                "Audio payload of {} bytes exceeds the limit of {} bytes",
                bytes.len(),
                self.max_audio_bytes
            )));
        }

        let staged = self.state.staging.stage(bytes);
        let audio = staged.bytes();
        tracing::debug!(
            session = %self.session_id,
            "Staged {} bytes ({} utterances in flight)",
            staged.len(),
            self.state.staging.in_flight()
        );

        let start_time = Instant::now();
        let decode = tokio::task::spawn_blocking(move || recognizer.decode(&audio));

        let outcome = tokio::time::timeout(self.decode_timeout, decode).await;
        self.state.record_decode(start_time.elapsed().as_millis() as u64);
        drop(staged);

        let result = match outcome {
            Ok(Ok(result)) => result,
            Ok(Err(join_err)) => {
                return Err(SessionError::DecodeFailure(format!(
                    "Decoder task failed: {}",
                    join_err
                )))
            }
            Err(_) => {
                return Err(SessionError::DecodeFailure(format!(
                    "Decoding timed out after {}s",
                    self.decode_timeout.as_secs()
                )))
            }
        };

        self.ensure_open()?;

        if !result.success {
            let message = result
                .error
                .unwrap_or_else(|| "Speech recognition failed".to_string());
            return Err(SessionError::DecodeFailure(message));
        }

        let transcript = result.text;
        outbox.push(OutboundMessage::transcription(transcript.clone()));

        if transcript.is_empty() {
            outbox.push(OutboundMessage::transcription(NO_SPEECH_NOTICE));
            return Ok(());
        }

        outbox.push(OutboundMessage::transcription(self.analyze(&transcript)?));
        Ok(())
    }

    fn handle_text(&self, raw: &str, outbox: &mut Vec<OutboundMessage>) -> Result<(), SessionError> {
        let text = parse_text_frame(raw)?;
        let analysis = self.analyze(&text)?;
        self.ensure_open()?;
        outbox.push(OutboundMessage::transcription(analysis));
        Ok(())
    }

    /// Extract and format; a panic is reported as an `ExtractionFailure`.
    fn analyze(&self, text: &str) -> Result<String, SessionError> {
        let extractor = &self.state.extractor;
        catch_unwind(AssertUnwindSafe(|| format_query(&extractor.extract(text))))
            .map_err(|payload| SessionError::ExtractionFailure(panic_message(payload.as_ref())))
    }

    fn ensure_open(&self) -> Result<(), SessionError> {
        if self.state.registry.is_open(&self.session_id) {
            Ok(())
        } else {
            Err(SessionError::TransportFailure(format!(
                "session {} is closed",
                self.session_id
            )))
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        message.to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unexpected failure".to_string()
    }
}
