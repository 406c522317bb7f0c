use std::path::Path;

use crate::audio::domain::audio_segment::AudioSegment;
use crate::shared::collaborator_error::CollaboratorError;

/// Write mono samples as 16-bit PCM WAV.
pub fn write_pcm16(path: &Path, audio: &AudioSegment) -> Result<(), CollaboratorError> {
    let spec = hound::WavSpec {
        channels: 1,
        sample_rate: audio.sample_rate(),
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };
    let mut writer = hound::WavWriter::create(path, spec).map_err(CollaboratorError::other)?;
    for &s in audio.samples() {
        let value = (s.clamp(-1.0, 1.0) * i16::MAX as f32).round() as i16;
        writer.write_sample(value).map_err(CollaboratorError::other)?;
    }
    writer.finalize().map_err(CollaboratorError::other)
}

/// Read a WAV file into mono f32 samples, averaging channels.
pub fn read_mono(path: &Path) -> Result<AudioSegment, CollaboratorError> {
    let mut reader = hound::WavReader::open(path).map_err(|e| {
        CollaboratorError::other(format!("failed to open WAV {}: {e}", path.display()))
    })?;
    let spec = reader.spec();

    let interleaved: Vec<f32> = match spec.sample_format {
        hound::SampleFormat::Float => reader
            .samples::<f32>()
            .collect::<Result<Vec<_>, _>>()
            .map_err(CollaboratorError::other)?,
        hound::SampleFormat::Int => {
            let scale = (1i64 << (spec.bits_per_sample.saturating_sub(1))) as f32;
            reader
                .samples::<i32>()
                .map(|s| s.map(|v| v as f32 / scale))
                .collect::<Result<Vec<_>, _>>()
                .map_err(CollaboratorError::other)?
        }
    };

    let channels = spec.channels.max(1) as usize;
    let samples = if channels == 1 {
        interleaved
    } else {
        interleaved
            .chunks_exact(channels)
            .map(|frame| frame.iter().sum::<f32>() / channels as f32)
            .collect()
    };
    Ok(AudioSegment::new(samples, spec.sample_rate))
}
