//! # Configuration Management
//!
//! Loads the service configuration from several layered sources:
//! - Built-in defaults (the `Default` impl below)
//! - An optional `config.toml` in the working directory
//! - Environment variables with the `APP_` prefix
//! - The bare `HOST` / `PORT` variables set by most deployment platforms
//!
//! ## Configuration Priority (highest to lowest):
//! 1. `HOST` and `PORT`
//! 2. `APP_` variables, nested keys separated by a double underscore
//!    (`APP_SPEECH__MODEL_PATH`, `APP_SERVER__PORT`)
//! 3. `config.toml`
//! 4. Defaults

use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::env;

/// Main application configuration.
///
/// Split into groups so each subsystem only needs to look at its own section.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub speech: SpeechConfig,
    pub performance: PerformanceConfig,
    pub websocket: WebSocketConfig,
}

/// Where the HTTP/WebSocket server listens.
///
/// ## Common values:
/// - `host = "127.0.0.1"`: Local development only
/// - `host = "0.0.0.0"`: Reachable from other machines (containers, production)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

/// Speech recognition settings.
///
/// ## Fields:
/// - `model_path`: Directory of the Vosk acoustic model, loaded once at startup
/// - `frame_samples`: Samples handed to the recognizer per feed call
/// - `decode_timeout_secs`: Upper bound for decoding one utterance
/// - `max_audio_bytes`: Largest accepted utterance; bigger frames are rejected
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SpeechConfig {
    pub model_path: String,
    pub frame_samples: usize,
    pub decode_timeout_secs: u64,
    pub max_audio_bytes: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PerformanceConfig {
    /// Connections beyond this limit are refused with 503
    pub max_concurrent_sessions: usize,
}

/// Keep-alive settings for WebSocket sessions.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WebSocketConfig {
    /// How often the server pings the client
    pub heartbeat_interval_secs: u64,
    /// Silence after which a client is considered gone
    pub client_timeout_secs: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8000,
        }
    }
}

impl Default for SpeechConfig {
    fn default() -> Self {
        Self {
            model_path: "model/vosk-model-small-de-0.15".to_string(),
            frame_samples: 4000,
            decode_timeout_secs: 30,
            max_audio_bytes: 10 * 1024 * 1024,
        }
    }
}

impl Default for PerformanceConfig {
    fn default() -> Self {
        Self {
            max_concurrent_sessions: 100,
        }
    }
}

impl Default for WebSocketConfig {
    fn default() -> Self {
        Self {
            heartbeat_interval_secs: 30,
            client_timeout_secs: 60,
        }
    }
}

impl AppConfig {
    /// Load configuration from all sources in priority order.
    ///
    /// ## Environment Variable Examples:
    /// - `APP_SERVER__HOST=0.0.0.0`
    /// - `APP_SPEECH__MODEL_PATH=/models/vosk-model-de-0.21`
    /// - `APP_PERFORMANCE__MAX_CONCURRENT_SESSIONS=20`
    /// - `PORT=3000`
    pub fn load() -> Result<Self> {
        let mut settings = config::Config::builder()
            .add_source(config::Config::try_from(&AppConfig::default())?)
            .add_source(config::File::with_name("config").required(false))
            .add_source(
                config::Environment::with_prefix("APP")
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            );

        if let Ok(host) = env::var("HOST") {
            settings = settings.set_override("server.host", host)?;
        }

        if let Ok(port) = env::var("PORT") {
            settings = settings.set_override("server.port", port)?;
        }

        let config = settings.build()?.try_deserialize()?;
        Ok(config)
    }

    /// Check that the configuration values make sense together.
    ///
    /// ## What this checks:
    /// - Port, session limit, frame size, decode timeout and audio size are non-zero
    /// - The heartbeat fires more often than the client timeout expires
    /// - A decode finishes before the client timeout expires (heartbeats are
    ///   not processed while a frame is being decoded)
    pub fn validate(&self) -> Result<()> {
        if self.server.port == 0 {
            return Err(anyhow::anyhow!("Server port cannot be 0"));
        }

        if self.performance.max_concurrent_sessions == 0 {
            return Err(anyhow::anyhow!("Max concurrent sessions must be greater than 0"));
        }

        if self.speech.frame_samples == 0 {
            return Err(anyhow::anyhow!("Speech frame size must be greater than 0"));
        }

        if self.speech.decode_timeout_secs == 0 {
            return Err(anyhow::anyhow!("Decode timeout must be greater than 0"));
        }

        if self.speech.max_audio_bytes == 0 {
            return Err(anyhow::anyhow!("Max audio size must be greater than 0"));
        }

        if self.websocket.heartbeat_interval_secs >= self.websocket.client_timeout_secs {
            return Err(anyhow::anyhow!(
                "Heartbeat interval ({}s) must be shorter than the client timeout ({}s)",
                self.websocket.heartbeat_interval_secs,
                self.websocket.client_timeout_secs
            ));
        }

        if self.speech.decode_timeout_secs >= self.websocket.client_timeout_secs {
            return Err(anyhow::anyhow!(
                "Decode timeout ({}s) must be shorter than the client timeout ({}s)",
                self.speech.decode_timeout_secs,
                self.websocket.client_timeout_secs
            ));
        }

        Ok(())
    }
}
