use std::io::Cursor;

use async_trait::async_trait;
use hound::{SampleFormat, WavSpec, WavWriter};

use super::{SpeechAudio, SpeechProvider, SpeechRequest};
use crate::provider::ProviderError;

pub const SAMPLE_RATE: u32 = 22050;
const DURATION_SECS: u32 = 2;

/// Last-resort provider producing a short silent WAV so the pipeline still completes.
#[derive(Debug, Default)]
pub struct PlaceholderSpeech;

#[async_trait]
impl SpeechProvider for PlaceholderSpeech {
    fn name(&self) -> &'static str {
        "placeholder"
    }

    async fn synthesize(&self, _request: &SpeechRequest<'_>) -> Result<SpeechAudio, ProviderError> {
        let silence = vec![0.0f32; (SAMPLE_RATE * DURATION_SECS) as usize];
        Ok(SpeechAudio {
            bytes: samples_to_wav(&silence, SAMPLE_RATE)?,
            mime_type: "audio/wav".to_string(),
            provider: self.name(),
        })
    }
}

/// Encode mono f32 samples in [-1.0, 1.0] as 16-bit PCM WAV.
pub fn samples_to_wav(samples: &[f32], sample_rate: u32) -> Result<Vec<u8>, hound::Error> {
    let spec = WavSpec {
        channels: 1,
        sample_rate,
        bits_per_sample: 16,
        sample_format: SampleFormat::Int,
    };

    let mut buffer = Vec::new();
    {
        let mut writer = WavWriter::new(Cursor::new(&mut buffer), spec)?;
        for sample in samples {
            let scaled = (sample * 32767.0).clamp(-32768.0, 32767.0) as i16;
            writer.write_sample(scaled)?;
        }
        writer.finalize()?;
    }

    Ok(buffer)
}
