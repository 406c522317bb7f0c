/// RMS below this is treated as silence and left untouched.
const SILENCE_RMS: f64 = 1e-10;

pub fn rms(samples: &[f32]) -> f64 {
    if samples.is_empty() {
        return 0.0;
    }
    let sum: f64 = samples.iter().map(|&s| (s as f64) * (s as f64)).sum();
    (sum / samples.len() as f64).sqrt()
}

/// RMS level in dBFS, or `None` for silence.
pub fn rms_dbfs(samples: &[f32]) -> Option<f64> {
    let level = rms(samples);
    (level >= SILENCE_RMS).then(|| 20.0 * level.log10())
}

/// Scale `samples` so their RMS level equals `target_dbfs`.
///
/// Returns the applied gain in dB, or `None` when the input is silent and
/// was left unchanged.
pub fn normalize_rms(samples: &mut [f32], target_dbfs: f64) -> Option<f64> {
    let current = rms_dbfs(samples)?;
    let gain_db = target_dbfs - current;
    let gain = 10f64.powf(gain_db / 20.0) as f32;
    for s in samples.iter_mut() {
        *s *= gain;
    }
    Some(gain_db)
}

/// Scale `samples` down so no peak exceeds `ceiling`.
///
/// Returns the original peak when limiting was applied.
pub fn limit_peak(samples: &mut [f32], ceiling: f32) -> Option<f32> {
    let peak = samples.iter().fold(0.0f32, |m, s| m.max(s.abs()));
    if peak <= ceiling {
        return None;
    }
    let scale = ceiling / peak;
    for s in samples.iter_mut() {
        *s *= scale;
    }
    Some(peak)
}
