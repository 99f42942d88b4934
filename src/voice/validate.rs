//! Speech validity pre-check
//!
//! Cheap local check run before spending a transcription call: an utterance
//! must be long enough and loud enough to plausibly contain speech. Anything
//! that fails to decode is treated as invalid, not as an error.

use std::io::Cursor;

use crate::config::SpeechCheckConfig;

/// Decoded audio ready for loudness/duration measurement
struct DecodedAudio {
    samples: Vec<f32>,
    sample_rate: u32,
    channels: u16,
}

/// Validates that audio plausibly contains speech
#[derive(Debug, Clone, Copy)]
pub struct SpeechCheck {
    config: SpeechCheckConfig,
}

impl SpeechCheck {
    /// Create a check with the given thresholds
    #[must_use]
    pub const fn new(config: SpeechCheckConfig) -> Self {
        Self { config }
    }

    /// Whether the audio is long and loud enough to be speech
    ///
    /// Accepts WAV or MP3 bytes. Undecodable input is invalid.
    #[must_use]
    pub fn is_valid_speech(&self, audio: &[u8]) -> bool {
        let Some(decoded) = decode_wav(audio).or_else(|| decode_mp3(audio)) else {
            tracing::debug!("audio failed to decode, treating as invalid speech");
            return false;
        };

        if decoded.samples.is_empty() || decoded.sample_rate == 0 {
            return false;
        }

        #[allow(clippy::cast_precision_loss)]
        let frames = decoded.samples.len() as f64 / f64::from(decoded.channels.max(1));
        let duration_ms = frames * 1000.0 / f64::from(decoded.sample_rate);

        let dbfs = loudness_dbfs(&decoded.samples);

        let long_enough = duration_ms >= f64::from(self.config.min_duration_ms);
        let loud_enough = dbfs >= f64::from(self.config.min_dbfs);

        tracing::debug!(
            duration_ms = duration_ms as u64,
            dbfs,
            long_enough,
            loud_enough,
            "speech validity check"
        );

        long_enough && loud_enough
    }
}

/// RMS loudness in dBFS; silence returns negative infinity
fn loudness_dbfs(samples: &[f32]) -> f64 {
    if samples.is_empty() {
        return f64::NEG_INFINITY;
    }

    #[allow(clippy::cast_precision_loss)]
    let mean_square: f64 =
        samples.iter().map(|s| f64::from(*s) * f64::from(*s)).sum::<f64>() / samples.len() as f64;

    let rms = mean_square.sqrt();
    if rms <= 0.0 {
        return f64::NEG_INFINITY;
    }

    20.0 * rms.log10()
}

fn decode_wav(audio: &[u8]) -> Option<DecodedAudio> {
    let mut reader = hound::WavReader::new(Cursor::new(audio)).ok()?;
    let spec = reader.spec();

    let samples: Vec<f32> = match spec.sample_format {
        hound::SampleFormat::Float => reader.samples::<f32>().map_while(Result::ok).collect(),
        hound::SampleFormat::Int => {
            let max = f32::from(i16::MAX);
            match spec.bits_per_sample {
                16 => reader
                    .samples::<i16>()
                    .map_while(Result::ok)
                    .map(|s| f32::from(s) / max)
                    .collect(),
                // Other bit depths scaled through i32
                bits => {
                    let scale = (1_i64 << (i64::from(bits) - 1)) as f64;
                    reader
                        .samples::<i32>()
                        .map_while(Result::ok)
                        .map(|s| (f64::from(s) / scale) as f32)
                        .collect()
                }
            }
        }
    };

    Some(DecodedAudio {
        samples,
        sample_rate: spec.sample_rate,
        channels: spec.channels,
    })
}

fn decode_mp3(audio: &[u8]) -> Option<DecodedAudio> {
    let mut decoder = minimp3::Decoder::new(Cursor::new(audio));
    let mut samples = Vec::new();
    let mut sample_rate = 0_u32;
    let mut channels = 1_u16;

    loop {
        match decoder.next_frame() {
            Ok(frame) => {
                sample_rate = u32::try_from(frame.sample_rate).unwrap_or(0);
                channels = u16::try_from(frame.channels).unwrap_or(1);
                let max = f32::from(i16::MAX);
                samples.extend(frame.data.iter().map(|s| f32::from(*s) / max));
            }
            Err(minimp3::Error::Eof) => break,
            Err(_) => return None,
        }
    }

    if samples.is_empty() {
        return None;
    }

    Some(DecodedAudio {
        samples,
        sample_rate,
        channels,
    })
}
