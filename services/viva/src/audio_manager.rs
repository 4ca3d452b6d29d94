//! Voice I/O adapter: question voice-out (speech synthesis + playback) and
//! answer voice-in (microphone capture + transcription).
//!
//! Capture and playback are synchronous, exclusive acquisitions of the audio
//! device; the cpal stream never lives across an await point. The network
//! halves (synthesis, transcription) are async reqwest calls.

use crate::config::{Config, INPUT_CHUNK_SIZE, OUTPUT_CHUNK_SIZE};
use anyhow::{Context, Result, anyhow};
use cpal::traits::{DeviceTrait, StreamTrait};
use cpal::{FrameCount, StreamConfig};
use reqwest::Client;
use ringbuf::traits::{Consumer, Producer, Split};
use serde::Deserialize;
use std::io::Write;
use std::path::Path;
use std::time::{Duration, Instant};
use tempfile::NamedTempFile;
use viva_native_utils::{audio, device};

const SPEECH_URL: &str = "https://api.openai.com/v1/audio/speech";
const TRANSCRIPTIONS_URL: &str = "https://api.openai.com/v1/audio/transcriptions";

/// How long to wait for the student to start speaking.
const SPEECH_ONSET_TIMEOUT: Duration = Duration::from_secs(10);
/// Hard cap on a single utterance.
const MAX_UTTERANCE: Duration = Duration::from_secs(30);
/// Trailing silence that ends an utterance.
const TRAILING_SILENCE: Duration = Duration::from_millis(1200);
/// RMS level above which a chunk counts as voice rather than room noise.
const VOICE_RMS_THRESHOLD: f32 = 0.015;

#[derive(Debug, Deserialize)]
struct Transcription {
    text: String,
}

pub struct AudioManager {
    client: Client,
    api_key: Option<String>,
    tts_model: String,
    tts_voice: String,
    transcribe_model: String,
}

impl AudioManager {
    pub fn new(config: &Config) -> Self {
        Self {
            client: Client::new(),
            api_key: config.openai_api_key.clone(),
            tts_model: config.tts_model.clone(),
            tts_voice: config.tts_voice.clone(),
            transcribe_model: config.transcribe_model.clone(),
        }
    }

    fn api_key(&self) -> Result<&str> {
        self.api_key
            .as_deref()
            .ok_or_else(|| anyhow!("OpenAI API key not found; speech calls are disabled"))
    }

    /// Synthesizes `text` and plays it on the default output device,
    /// blocking until playback finishes. The synthesized clip lives in a
    /// temp file that is removed on every exit path, success or failure.
    pub async fn speak(&self, text: &str) -> Result<()> {
        let clip = self.synthesize(text).await?;
        play_clip(clip.path())
    }

    /// Captures one spoken answer from the default microphone and
    /// transcribes it. Returns `None`, with a logged diagnostic, on
    /// silence, capture failure, or transcription failure.
    pub async fn listen(&self) -> Option<String> {
        let recording = match capture_utterance() {
            Ok(Some(recording)) => recording,
            Ok(None) => {
                tracing::warn!("No speech detected before the listening window closed");
                return None;
            }
            Err(e) => {
                tracing::error!("Error recording audio: {e:#}");
                return None;
            }
        };

        match self.transcribe(&recording.samples, recording.sample_rate).await {
            Ok(text) if text.trim().is_empty() => {
                tracing::warn!("Could not understand audio. Please try speaking again.");
                None
            }
            Ok(text) => Some(text.trim().to_string()),
            Err(e) => {
                tracing::error!("Could not request results from the transcription service: {e:#}");
                None
            }
        }
    }

    /// POSTs the text to the speech endpoint and writes the returned WAV
    /// bytes into a temp file.
    async fn synthesize(&self, text: &str) -> Result<NamedTempFile> {
        let api_key = self.api_key()?;
        let body = serde_json::json!({
            "model": self.tts_model,
            "voice": self.tts_voice,
            "input": text,
            "response_format": "wav"
        });

        let resp = self
            .client
            .post(SPEECH_URL)
            .bearer_auth(api_key)
            .json(&body)
            .send()
            .await?
            .error_for_status()?;
        let bytes = resp.bytes().await?;

        let mut clip = tempfile::Builder::new()
            .suffix(".wav")
            .tempfile()
            .context("Failed to create temp file for synthesized speech")?;
        clip.write_all(&bytes)
            .context("Failed to write synthesized speech to temp file")?;
        Ok(clip)
    }

    /// Sends a recorded utterance to the transcription endpoint as a
    /// multipart WAV upload.
    async fn transcribe(&self, samples: &[f32], sample_rate: u32) -> Result<String> {
        let api_key = self.api_key()?;

        let wav = tempfile::Builder::new()
            .suffix(".wav")
            .tempfile()
            .context("Failed to create temp file for the recorded answer")?;
        audio::write_wav(wav.path(), samples, sample_rate)?;
        let bytes = tokio::fs::read(wav.path())
            .await
            .context("Failed to read back the recorded answer")?;

        let part = reqwest::multipart::Part::bytes(bytes)
            .file_name("answer.wav")
            .mime_str("audio/wav")?;
        let form = reqwest::multipart::Form::new()
            .text("model", self.transcribe_model.clone())
            .part("file", part);

        let resp = self
            .client
            .post(TRANSCRIPTIONS_URL)
            .bearer_auth(api_key)
            .multipart(form)
            .send()
            .await?
            .error_for_status()?;
        let transcription: Transcription = resp.json().await?;
        Ok(transcription.text)
    }
}

struct Recording {
    samples: Vec<f32>,
    sample_rate: u32,
}

/// Records one utterance from the default input device: waits up to 10s for
/// speech onset, then records until 1.2s of trailing silence or the 30s cap.
/// `Ok(None)` means the window closed without any speech.
fn capture_utterance() -> Result<Option<Recording>> {
    let input = device::get_or_default_input(None)?;
    tracing::debug!("Using input device: {:?}", input.name()?);

    let default_config = input
        .default_input_config()
        .context("Failed to get default input config")?;
    let input_config = StreamConfig {
        channels: default_config.channels(),
        sample_rate: default_config.sample_rate(),
        buffer_size: cpal::BufferSize::Fixed(FrameCount::from(INPUT_CHUNK_SIZE as u32)),
    };
    let channel_count = input_config.channels as usize;
    let sample_rate = input_config.sample_rate.0;

    let (chunk_tx, chunk_rx) = std::sync::mpsc::channel::<Vec<f32>>();
    let input_data_fn = move |data: &[f32], _: &cpal::InputCallbackInfo| {
        let mono = audio::downmix_to_mono(data, channel_count);
        // A send failure means capture is over; the chunk can be dropped.
        let _ = chunk_tx.send(mono);
    };

    let stream = input.build_input_stream(
        &input_config,
        input_data_fn,
        move |err| tracing::error!("An error occurred on input stream: {}", err),
        None,
    )?;
    stream.play()?;

    let max_samples = sample_rate as usize * MAX_UTTERANCE.as_secs() as usize;
    let mut captured: Vec<f32> = Vec::new();
    let mut speech_started = false;
    let started_at = Instant::now();
    let mut last_voice = Instant::now();

    loop {
        match chunk_rx.recv_timeout(Duration::from_millis(250)) {
            Ok(chunk) => {
                if audio::rms(&chunk) > VOICE_RMS_THRESHOLD {
                    speech_started = true;
                    last_voice = Instant::now();
                }
                if speech_started {
                    captured.extend_from_slice(&chunk);
                }
            }
            Err(std::sync::mpsc::RecvTimeoutError::Timeout) => {}
            Err(std::sync::mpsc::RecvTimeoutError::Disconnected) => {
                return Err(anyhow!("Input stream closed unexpectedly"));
            }
        }

        if !speech_started {
            if started_at.elapsed() >= SPEECH_ONSET_TIMEOUT {
                return Ok(None);
            }
            continue;
        }
        if last_voice.elapsed() >= TRAILING_SILENCE || captured.len() >= max_samples {
            break;
        }
    }
    drop(stream);

    captured.truncate(max_samples);
    Ok(Some(Recording {
        samples: captured,
        sample_rate,
    }))
}

/// Plays a WAV clip on the default output device, blocking until it drains.
fn play_clip(path: &Path) -> Result<()> {
    let (samples, clip_rate) = audio::read_wav(path)?;
    if samples.is_empty() {
        return Ok(());
    }

    let output = device::get_or_default_output(None)?;
    tracing::debug!("Using output device: {:?}", output.name()?);

    let default_config = output
        .default_output_config()
        .context("Failed to get default output config")?;
    let output_config = StreamConfig {
        channels: default_config.channels(),
        sample_rate: default_config.sample_rate(),
        buffer_size: cpal::BufferSize::Fixed(FrameCount::from(OUTPUT_CHUNK_SIZE as u32)),
    };
    let channel_count = output_config.channels as usize;
    let output_rate = output_config.sample_rate.0;

    let samples = audio::resample_clip(&samples, clip_rate as f64, output_rate as f64)?;
    let total = samples.len();

    // The whole clip is staged in the ring buffer up front; the output
    // callback drains it and signals once the last sample has been written.
    let buffer = audio::shared_buffer(total + OUTPUT_CHUNK_SIZE);
    let (mut producer, mut consumer) = buffer.split();
    for sample in &samples {
        if producer.try_push(*sample).is_err() {
            return Err(anyhow!("Playback buffer overflow"));
        }
    }

    let (done_tx, done_rx) = std::sync::mpsc::channel::<()>();
    let mut remaining = total;
    let output_data_fn = move |data: &mut [f32], _: &cpal::OutputCallbackInfo| {
        for frame in data.chunks_mut(channel_count) {
            let sample = consumer.try_pop().unwrap_or(0.0);
            // Duplicate the mono sample across every output channel.
            for slot in frame.iter_mut() {
                *slot = sample;
            }
            if remaining > 0 {
                remaining -= 1;
                if remaining == 0 {
                    let _ = done_tx.send(());
                }
            }
        }
    };

    let stream = output.build_output_stream(
        &output_config,
        output_data_fn,
        move |err| tracing::error!("An error occurred on output stream: {}", err),
        None,
    )?;
    stream.play()?;

    let clip_length = Duration::from_secs_f64(total as f64 / output_rate as f64);
    if done_rx.recv_timeout(clip_length + Duration::from_secs(2)).is_err() {
        tracing::warn!("Playback did not signal completion within the expected window");
    }
    Ok(())
}
