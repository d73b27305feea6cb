//! # Application State Management
//!
//! Shared state handed to every HTTP handler and every WebSocket session.
//!
//! ## What lives here:
//! - Configuration, behind `Arc<RwLock>` so handlers can read a consistent copy
//! - Request and frame metrics, updated by the middleware and by sessions
//! - The session registry
//! - The staging area for in-flight utterances
//! - The recognizer and the extractor, both read-only after startup
//!
//! Cloning an `AppState` is cheap: every field is a shared handle.

use crate::audio::StagingArea;
use crate::config::AppConfig;
use crate::intent::WeatherExtractor;
use crate::session::SessionRegistry;
use crate::transcription::Recognizer;
use serde::Serialize;
use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};
use std::time::Instant;

/// The main application state shared across handlers and sessions.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<RwLock<AppConfig>>,

    /// Performance metrics, updated on every request and frame
    pub metrics: Arc<RwLock<AppMetrics>>,

    /// When the server started
    pub start_time: Instant,

    pub registry: SessionRegistry,

    /// Utterances currently queued for or undergoing decoding
    pub staging: StagingArea,

    /// Selected once at startup; either a working or the unavailable adapter
    pub recognizer: Arc<dyn Recognizer>,

    pub extractor: Arc<WeatherExtractor>,
}

/// Metrics collected across all HTTP requests and WebSocket frames.
#[derive(Debug, Default, Clone, Serialize)]
pub struct AppMetrics {
    /// Total number of HTTP requests processed since server start
    pub request_count: u64,

    /// Total number of HTTP errors since server start
    pub error_count: u64,

    /// Per-endpoint statistics, keyed by `"METHOD /path"`
    pub endpoint_metrics: HashMap<String, EndpointMetric>,

    pub frames: FrameMetrics,
}

/// Detailed metrics for one HTTP endpoint.
#[derive(Debug, Default, Clone, Serialize)]
pub struct EndpointMetric {
    pub request_count: u64,
    /// Cumulative processing time in milliseconds
    pub total_duration_ms: u64,
    pub error_count: u64,
}

/// Counters for WebSocket frame processing.
#[derive(Debug, Default, Clone, Serialize)]
pub struct FrameMetrics {
    pub audio_frames: u64,
    pub text_frames: u64,
    /// Frames that produced an error message
    pub frame_errors: u64,
    /// Decode calls that reached the recognizer
    pub decodes: u64,
    pub total_decode_ms: u64,
}

impl FrameMetrics {
    pub fn average_decode_ms(&self) -> f64 {
        if self.decodes > 0 {
            self.total_decode_ms as f64 / self.decodes as f64
        } else {
            0.0
        }
    }
}

impl AppState {
    pub fn new(config: AppConfig, recognizer: Arc<dyn Recognizer>) -> Self {
        let registry = SessionRegistry::new(config.performance.max_concurrent_sessions);

        Self {
            config: Arc::new(RwLock::new(config)),
            metrics: Arc::new(RwLock::new(AppMetrics::default())),
            start_time: Instant::now(),
            registry,
            staging: StagingArea::new(),
            recognizer,
            extractor: Arc::new(WeatherExtractor::new()),
        }
    }

    /// Get a copy of the current configuration.
    ///
    /// Cloning releases the lock immediately, so other threads aren't blocked.
    pub fn get_config(&self) -> AppConfig {
        self.config
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn with_metrics(&self, update: impl FnOnce(&mut AppMetrics)) {
        let mut metrics = self.metrics.write().unwrap_or_else(PoisonError::into_inner);
        update(&mut metrics);
    }

    /// Increment the total request counter (called by middleware for every request).
    pub fn increment_request_count(&self) {
        self.with_metrics(|metrics| metrics.request_count += 1);
    }

    /// Increment the total error counter (4xx/5xx responses and handler errors).
    pub fn increment_error_count(&self) {
        self.with_metrics(|metrics| metrics.error_count += 1);
    }

    /// Record detailed metrics for a specific endpoint.
    ///
    /// ## Parameters:
    /// - **endpoint**: e.g. `"GET /health"`
    /// - **duration_ms**: How long the request took
    /// - **is_error**: Whether the request resulted in an error
    pub fn record_endpoint_request(&self, endpoint: &str, duration_ms: u64, is_error: bool) {
        self.with_metrics(|metrics| {
            let endpoint_metric = metrics
                .endpoint_metrics
                .entry(endpoint.to_string())
                .or_default();

            endpoint_metric.request_count += 1;
            endpoint_metric.total_duration_ms += duration_ms;

            if is_error {
                endpoint_metric.error_count += 1;
            }
        });
    }

    pub fn record_frame(&self, kind: &str) {
        self.with_metrics(|metrics| match kind {
            "audio" => metrics.frames.audio_frames += 1,
            _ => metrics.frames.text_frames += 1,
        });
    }

    pub fn record_frame_error(&self) {
        self.with_metrics(|metrics| metrics.frames.frame_errors += 1);
    }

    pub fn record_decode(&self, duration_ms: u64) {
        self.with_metrics(|metrics| {
            metrics.frames.decodes += 1;
            metrics.frames.total_decode_ms += duration_ms;
        });
    }

    /// Get a snapshot of current metrics (used by the metrics endpoint).
    pub fn get_metrics_snapshot(&self) -> AppMetrics {
        self.metrics
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn get_uptime_seconds(&self) -> u64 {
        self.start_time.elapsed().as_secs()
    }
}

impl EndpointMetric {
    /// Average = Total Duration / Number of Requests
    pub fn average_duration_ms(&self) -> f64 {
        if self.request_count > 0 {
            self.total_duration_ms as f64 / self.request_count as f64
        } else {
            0.0
        }
    }

    /// Error rate between 0.0 and 1.0.
    pub fn error_rate(&self) -> f64 {
        if self.request_count > 0 {
            self.error_count as f64 / self.request_count as f64
        } else {
            0.0
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::transcription::engine::UnavailableRecognizer;

    pub(crate) fn test_state() -> AppState {
        AppState::new(
            AppConfig::default(),
            Arc::new(UnavailableRecognizer::new("no model in tests")),
        )
    }

    #[test]
    fn test_endpoint_metrics() {
        let state = test_state();
        state.record_endpoint_request("GET /health", 10, false);
        state.record_endpoint_request("GET /health", 30, true);

        let snapshot = state.get_metrics_snapshot();
        let metric = &snapshot.endpoint_metrics["GET /health"];
        assert_eq!(metric.request_count, 2);
        assert_eq!(metric.average_duration_ms(), 20.0);
        assert_eq!(metric.error_rate(), 0.5);
    }

    #[test]
    fn test_frame_metrics() {
        let state = test_state();
        state.record_frame("audio");
        state.record_frame("text");
        state.record_frame("text");
        state.record_frame_error();
        state.record_decode(40);
        state.record_decode(60);

        let frames = state.get_metrics_snapshot().frames;
        assert_eq!(frames.audio_frames, 1);
        assert_eq!(frames.text_frames, 2);
        assert_eq!(frames.frame_errors, 1);
        assert_eq!(frames.average_decode_ms(), 50.0);
    }

    #[test]
    fn test_registry_uses_configured_limit() {
        let mut config = AppConfig::default();
        config.performance.max_concurrent_sessions = 3;
        let state = AppState::new(config, Arc::new(UnavailableRecognizer::new("")));
        assert_eq!(state.registry.max_sessions(), 3);
    }
}
