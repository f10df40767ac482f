use std::io::Cursor;

use hound::{SampleFormat, WavReader};

use super::placeholder::samples_to_wav;

/// Silence inserted between joined clips, in seconds.
pub const CLIP_PAUSE_SECS: f32 = 0.5;

#[derive(Debug, thiserror::Error)]
pub enum MergeError {
    #[error("unreadable WAV: {0}")]
    Decode(#[from] hound::Error),

    #[error("clip at {found} Hz cannot join a {expected} Hz recording")]
    SampleRate { expected: u32, found: u32 },

    #[error("nothing to merge")]
    Empty,
}

/// A decoded clip, downmixed to mono.
#[derive(Debug, Clone)]
pub struct Clip {
    pub sample_rate: u32,
    pub samples: Vec<f32>,
}

impl Clip {
    pub fn decode(bytes: &[u8]) -> Result<Self, MergeError> {
        let mut reader = WavReader::new(Cursor::new(bytes))?;
        let spec = reader.spec();

        let interleaved: Vec<f32> = match spec.sample_format {
            SampleFormat::Float => reader.samples::<f32>().collect::<Result<_, _>>()?,
            SampleFormat::Int => {
                let scale = (1u64 << (spec.bits_per_sample.max(1) - 1)) as f32;
                reader
                    .samples::<i32>()
                    .map(|s| s.map(|v| v as f32 / scale))
                    .collect::<Result<_, _>>()?
            }
        };

        let channels = usize::from(spec.channels.max(1));
        let samples = interleaved
            .chunks(channels)
            .map(|frame| frame.iter().sum::<f32>() / frame.len() as f32)
            .collect();

        Ok(Self {
            sample_rate: spec.sample_rate,
            samples,
        })
    }

    pub fn duration_secs(&self) -> f64 {
        self.samples.len() as f64 / f64::from(self.sample_rate.max(1))
    }
}

/// Join clips end to end with `pause_secs` of silence between them. All clips
/// must share one sample rate.
pub fn join_clips(clips: &[Clip], pause_secs: f32) -> Result<Clip, MergeError> {
    let first = clips.first().ok_or(MergeError::Empty)?;
    let sample_rate = first.sample_rate;
    let pause = vec![0.0f32; (sample_rate as f32 * pause_secs).round() as usize];

    let mut samples = Vec::new();
    for (i, clip) in clips.iter().enumerate() {
        if clip.sample_rate != sample_rate {
            return Err(MergeError::SampleRate {
                expected: sample_rate,
                found: clip.sample_rate,
            });
        }
        if i > 0 {
            samples.extend_from_slice(&pause);
        }
        samples.extend_from_slice(&clip.samples);
    }

    Ok(Clip {
        sample_rate,
        samples,
    })
}

/// Encode a clip as 16-bit mono WAV.
pub fn encode_clip(clip: &Clip) -> Result<Vec<u8>, MergeError> {
    Ok(samples_to_wav(&clip.samples, clip.sample_rate)?)
}
