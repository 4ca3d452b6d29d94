//! Application Configuration Module
//!
//! This module centralizes the configuration for the viva service.
//! It loads settings from environment variables and provides a single,
//! shareable struct that can be passed throughout the application.

use std::env;
use tracing::Level;

// --- Application Constants ---

/// The size of each audio chunk sent from the microphone input stream.
pub const INPUT_CHUNK_SIZE: usize = 1024;
/// The size of each audio chunk for the audio output stream.
pub const OUTPUT_CHUNK_SIZE: usize = 1024;

/// Holds all configuration loaded from the environment.
#[derive(Debug, Clone)]
pub struct Config {
    /// Credential for every OpenAI call (chat, speech, transcription).
    /// Optional at startup: its absence disables those calls per-operation
    /// instead of preventing the application from running.
    pub openai_api_key: Option<String>,
    pub chat_model: String,
    pub tts_model: String,
    pub tts_voice: String,
    pub transcribe_model: String,
    pub log_level: Level,
}

/// A custom error type for configuration loading failures.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid log level provided for RUST_LOG: {0}")]
    InvalidLogLevel(String),
}

impl Config {
    /// Loads configuration from environment variables.
    ///
    // *   `OPENAI_API_KEY`: Your secret key for the OpenAI API. Optional; without
    //     it the UI still runs but assessments cannot start.
    // *   `CHAT_MODEL`: (Optional) The model used to generate questions and grade
    //     answers. Defaults to "gpt-4".
    // *   `TTS_MODEL` / `TTS_VOICE`: (Optional) Speech synthesis model and voice.
    //     Default to "tts-1" and "alloy".
    // *   `TRANSCRIBE_MODEL`: (Optional) Speech-to-text model. Defaults to "whisper-1".
    // *   `RUST_LOG`: (Optional) The logging level. Defaults to "INFO".
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file. This is useful for local development and is ignored if not present.
        dotenvy::dotenv().ok();

        let openai_api_key = env::var("OPENAI_API_KEY").ok();
        let chat_model = env::var("CHAT_MODEL").unwrap_or_else(|_| "gpt-4".to_string());
        let tts_model = env::var("TTS_MODEL").unwrap_or_else(|_| "tts-1".to_string());
        let tts_voice = env::var("TTS_VOICE").unwrap_or_else(|_| "alloy".to_string());
        let transcribe_model =
            env::var("TRANSCRIBE_MODEL").unwrap_or_else(|_| "whisper-1".to_string());

        let log_level_str = env::var("RUST_LOG").unwrap_or_else(|_| "INFO".to_string());
        let log_level = log_level_str
            .parse::<Level>()
            .map_err(|_| ConfigError::InvalidLogLevel(log_level_str))?;

        Ok(Self {
            openai_api_key,
            chat_model,
            tts_model,
            tts_voice,
            transcribe_model,
            log_level,
        })
    }
}
