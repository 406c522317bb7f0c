use std::path::Path;

use ffmpeg_next::format::sample::Type as SampleType;
use ffmpeg_next::format::Sample;
use ffmpeg_next::util::frame::audio::Audio;

use crate::audio::domain::audio_segment::AudioSegment;
use crate::audio::domain::loudness;
use crate::audio::domain::preprocessor::{AudioPreprocessor, NormalizedAudio};
use crate::shared::collaborator_error::CollaboratorError;
use crate::shared::constants::{CLIP_CEILING, TARGET_RMS_DBFS, TARGET_SAMPLE_RATE};
use crate::shared::stage_control::StageControl;

use super::wav_file;

const OUTPUT_FILE: &str = "normalized.wav";

/// Decodes any container ffmpeg understands, resamples to 16 kHz mono,
/// normalizes loudness and writes 16-bit PCM WAV.
pub struct FfmpegPreprocessor {
    sample_rate: u32,
    target_dbfs: f64,
}

impl FfmpegPreprocessor {
    pub fn new() -> Self {
        Self {
            sample_rate: TARGET_SAMPLE_RATE,
            target_dbfs: TARGET_RMS_DBFS,
        }
    }

    fn decode(&self, path: &Path, control: &dyn StageControl) -> Result<AudioSegment, CollaboratorError> {
        ffmpeg_next::init().map_err(CollaboratorError::other)?;

        let mut ictx = ffmpeg_next::format::input(path).map_err(|e| {
            CollaboratorError::other(format!("cannot open {}: {e}", path.display()))
        })?;
        let stream = ictx
            .streams()
            .best(ffmpeg_next::media::Type::Audio)
            .ok_or_else(|| CollaboratorError::InvalidSource(format!("{} has no audio track", path.display())))?;
        let stream_index = stream.index();
        let total_secs = {
            let tb = stream.time_base();
            let duration = stream.duration();
            if duration > 0 && tb.denominator() != 0 {
                duration as f64 * tb.numerator() as f64 / tb.denominator() as f64
            } else {
                0.0
            }
        };

        let codec_ctx = ffmpeg_next::codec::context::Context::from_parameters(stream.parameters())
            .map_err(CollaboratorError::other)?;
        let mut decoder = codec_ctx.decoder().audio().map_err(CollaboratorError::other)?;

        let mut resampler = ffmpeg_next::software::resampling::Context::get(
            decoder.format(),
            decoder.channel_layout(),
            decoder.rate(),
            Sample::F32(SampleType::Planar),
            ffmpeg_next::ChannelLayout::MONO,
            self.sample_rate,
        )
        .map_err(CollaboratorError::other)?;

        let mut samples: Vec<f32> = Vec::new();
        let mut decoded = Audio::empty();
        let mut resampled = Audio::empty();

        for (stream, packet) in ictx.packets() {
            if stream.index() != stream_index {
                continue;
            }
            control.check_cancelled()?;

            decoder.send_packet(&packet).map_err(CollaboratorError::other)?;
            while decoder.receive_frame(&mut decoded).is_ok() {
                resampler
                    .run(&decoded, &mut resampled)
                    .map_err(CollaboratorError::other)?;
                extract_f32_samples(&resampled, &mut samples);
            }

            if total_secs > 0.0 {
                let done = samples.len() as f64 / self.sample_rate as f64 / total_secs;
                control.report(0.7 * done.min(1.0), "decoding");
            }
        }

        decoder.send_eof().map_err(CollaboratorError::other)?;
        while decoder.receive_frame(&mut decoded).is_ok() {
            resampler
                .run(&decoded, &mut resampled)
                .map_err(CollaboratorError::other)?;
            extract_f32_samples(&resampled, &mut samples);
        }
        if let Ok(Some(delay)) = resampler.flush(&mut resampled) {
            if delay.output > 0 {
                extract_f32_samples(&resampled, &mut samples);
            }
        }

        Ok(AudioSegment::new(samples, self.sample_rate))
    }
}

impl Default for FfmpegPreprocessor {
    fn default() -> Self {
        Self::new()
    }
}

impl AudioPreprocessor for FfmpegPreprocessor {
    fn normalize(
        &self,
        input: &Path,
        work_dir: &Path,
        control: &dyn StageControl,
    ) -> Result<NormalizedAudio, CollaboratorError> {
        if !input.exists() {
            return Err(CollaboratorError::InvalidSource(format!(
                "input file does not exist: {}",
                input.display()
            )));
        }

        control.report(0.0, "decoding");
        let mut audio = self.decode(input, control)?;
        if audio.is_empty() {
            return Err(CollaboratorError::InvalidSource(format!(
                "{} decoded to no audio",
                input.display()
            )));
        }
        control.check_cancelled()?;

        control.report(0.75, "normalizing loudness");
        prepare_levels(&mut audio, self.target_dbfs);
        control.check_cancelled()?;

        control.report(0.9, "writing WAV");
        let output = work_dir.join(OUTPUT_FILE);
        wav_file::write_pcm16(&output, &audio)?;

        let duration_secs = audio.duration();
        log::info!(
            "Preprocessed {} -> {} ({duration_secs:.1}s)",
            input.display(),
            output.display()
        );
        Ok(NormalizedAudio {
            path: output,
            sample_rate: audio.sample_rate(),
            duration_secs,
        })
    }
}

/// Loudness normalization followed by peak limiting.
fn prepare_levels(audio: &mut AudioSegment, target_dbfs: f64) {
    match loudness::normalize_rms(audio.samples_mut(), target_dbfs) {
        Some(gain_db) => log::info!("Loudness normalized to {target_dbfs:.1} dBFS (gain {gain_db:+.1} dB)"),
        None => log::warn!("Audio is nearly silent; skipping loudness normalization"),
    }
    if let Some(peak) = loudness::limit_peak(audio.samples_mut(), CLIP_CEILING) {
        log::info!("Limited peak {peak:.4} to {CLIP_CEILING}");
    }
}

/// Extract f32 samples from a planar mono resampled frame.
fn extract_f32_samples(frame: &Audio, out: &mut Vec<f32>) {
    let num_samples = frame.samples();
    if num_samples == 0 {
        return;
    }
    let data = frame.data(0);
    // SAFETY: the resampler emits planar f32, so plane 0 holds `num_samples` f32 values.
    let floats = unsafe { std::slice::from_raw_parts(data.as_ptr() as *const f32, num_samples) };
    out.extend_from_slice(floats);
}
