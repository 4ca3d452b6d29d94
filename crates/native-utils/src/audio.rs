use anyhow::{Context, Result};
use ringbuf::HeapRb;
use rubato::{FastFixedIn, PolynomialDegree, Resampler};
use std::path::Path;

/// Sample rate of the WAV clips returned by the speech-synthesis endpoint.
pub const TTS_WAV_SAMPLE_RATE: u32 = 24000;

/// Creates a resampler to convert between audio sample rates.
pub fn create_resampler(
    in_sampling_rate: f64,
    out_sampling_rate: f64,
    chunk_size: usize,
) -> Result<FastFixedIn<f32>> {
    let resampler = FastFixedIn::<f32>::new(
        out_sampling_rate / in_sampling_rate,
        1.0,
        PolynomialDegree::Cubic,
        chunk_size,
        1,
    )?;
    Ok(resampler)
}

/// Splits a slice of audio samples into fixed-size chunks, padding the last
/// chunk with zeros so every chunk satisfies a resampler's input size.
pub fn split_for_chunks(samples: &[f32], chunk_size: usize) -> Vec<Vec<f32>> {
    samples
        .chunks(chunk_size)
        .map(|chunk| {
            let mut chunk = chunk.to_vec();
            chunk.resize(chunk_size, 0.0);
            chunk
        })
        .collect()
}

/// Runs a whole mono clip through a resampler in one pass. Used for
/// converting a synthesized clip to the playback device's rate.
pub fn resample_clip(samples: &[f32], in_rate: f64, out_rate: f64) -> Result<Vec<f32>> {
    if (in_rate - out_rate).abs() < f64::EPSILON {
        return Ok(samples.to_vec());
    }
    let mut resampler = create_resampler(in_rate, out_rate, 1024)?;
    let mut out = Vec::with_capacity((samples.len() as f64 * out_rate / in_rate) as usize);
    let chunk_size = resampler.input_frames_next();
    for chunk in split_for_chunks(samples, chunk_size) {
        let resampled = resampler
            .process(&[chunk.as_slice()], None)
            .context("Resampling failed")?;
        if let Some(channel) = resampled.first() {
            out.extend_from_slice(channel);
        }
    }
    Ok(out)
}

/// Creates a new ring buffer on the heap for shared audio data.
pub fn shared_buffer(size: usize) -> HeapRb<f32> {
    HeapRb::new(size)
}

/// Averages interleaved multi-channel samples down to mono.
pub fn downmix_to_mono(data: &[f32], channels: usize) -> Vec<f32> {
    if channels <= 1 {
        return data.to_vec();
    }
    data.chunks(channels)
        .map(|frame| frame.iter().sum::<f32>() / channels as f32)
        .collect()
}

/// Root-mean-square level of a sample window. Used to detect speech onset.
pub fn rms(samples: &[f32]) -> f32 {
    if samples.is_empty() {
        return 0.0;
    }
    let sum_of_squares: f32 = samples.iter().map(|s| s * s).sum();
    (sum_of_squares / samples.len() as f32).sqrt()
}

/// Converts a slice of f32 samples to i16 samples.
pub fn convert_f32_to_i16(pcm32: &[f32]) -> Vec<i16> {
    pcm32
        .iter()
        .map(|&sample| (sample * 32768.0).clamp(i16::MIN as f32, i16::MAX as f32) as i16)
        .collect()
}

/// Reads a WAV file into mono f32 samples plus its sample rate. Multi-channel
/// files are downmixed; both integer and float sample formats are accepted.
pub fn read_wav(path: &Path) -> Result<(Vec<f32>, u32)> {
    let mut reader = hound::WavReader::open(path)
        .with_context(|| format!("Failed to open WAV file: {}", path.display()))?;
    let spec = reader.spec();

    let interleaved: Vec<f32> = match spec.sample_format {
        hound::SampleFormat::Int => {
            let max = (1i64 << (spec.bits_per_sample - 1)) as f32;
            reader
                .samples::<i32>()
                .map(|s| s.map(|v| v as f32 / max))
                .collect::<std::result::Result<_, _>>()
                .context("Failed to decode integer WAV samples")?
        }
        hound::SampleFormat::Float => reader
            .samples::<f32>()
            .collect::<std::result::Result<_, _>>()
            .context("Failed to decode float WAV samples")?,
    };

    Ok((
        downmix_to_mono(&interleaved, spec.channels as usize),
        spec.sample_rate,
    ))
}

/// Writes mono f32 samples out as a 16-bit PCM WAV file.
pub fn write_wav(path: &Path, samples: &[f32], sample_rate: u32) -> Result<()> {
    let spec = hound::WavSpec {
        channels: 1,
        sample_rate,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };
    let mut writer = hound::WavWriter::create(path, spec)
        .with_context(|| format!("Failed to create WAV file: {}", path.display()))?;
    for sample in convert_f32_to_i16(samples) {
        writer.write_sample(sample)?;
    }
    writer.finalize().context("Failed to finalize WAV file")?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn downmix_averages_stereo_frames() {
        let stereo = [0.5, -0.5, 1.0, 0.0];
        assert_eq!(downmix_to_mono(&stereo, 2), vec![0.0, 0.5]);
    }

    #[test]
    fn downmix_of_mono_is_identity() {
        let mono = [0.1, 0.2, 0.3];
        assert_eq!(downmix_to_mono(&mono, 1), mono.to_vec());
    }

    #[test]
    fn split_pads_the_last_chunk() {
        let chunks = split_for_chunks(&[1.0, 2.0, 3.0], 2);
        assert_eq!(chunks, vec![vec![1.0, 2.0], vec![3.0, 0.0]]);
    }

    #[test]
    fn rms_of_silence_is_zero() {
        assert_eq!(rms(&[0.0; 256]), 0.0);
        assert_eq!(rms(&[]), 0.0);
    }

    #[test]
    fn rms_of_full_scale_square_wave_is_one() {
        let wave: Vec<f32> = (0..128).map(|i| if i % 2 == 0 { 1.0 } else { -1.0 }).collect();
        assert!((rms(&wave) - 1.0).abs() < 1e-6);
    }

    #[test]
    fn resample_doubles_sample_count_for_doubled_rate() {
        let clip = vec![0.0f32; 24000];
        let out = resample_clip(&clip, 24000.0, 48000.0).unwrap();
        // Chunk padding allows slight overshoot, never a shortfall.
        assert!(out.len() >= 48000, "got {}", out.len());
        assert!(out.len() < 48000 + 4096, "got {}", out.len());
    }

    #[test]
    fn wav_round_trip_preserves_rate_and_length() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("clip.wav");
        let samples: Vec<f32> = (0..2400)
            .map(|i| (i as f32 / 2400.0 * std::f32::consts::TAU).sin() * 0.25)
            .collect();

        write_wav(&path, &samples, TTS_WAV_SAMPLE_RATE)?;
        let (read_back, rate) = read_wav(&path)?;

        assert_eq!(rate, TTS_WAV_SAMPLE_RATE);
        assert_eq!(read_back.len(), samples.len());
        // 16-bit quantization error stays well under one LSB of headroom.
        for (a, b) in samples.iter().zip(&read_back) {
            assert!((a - b).abs() < 1.0 / 16384.0);
        }
        Ok(())
    }
}
