/// Upper bound on download attempts, including the first.
pub const MAX_FETCH_ATTEMPTS: usize = 3;

/// Base delay between download attempts; attempt `n` waits `n * base`.
pub const FETCH_RETRY_DELAY_SECS: u64 = 2;

/// Sample rate of normalized audio handed to diarization and transcription.
pub const TARGET_SAMPLE_RATE: u32 = 16000;

/// RMS loudness target for normalized audio.
pub const TARGET_RMS_DBFS: f64 = -20.0;

/// Peak ceiling applied after loudness normalization.
pub const CLIP_CEILING: f32 = 0.99;

/// Label carried by every segment in single-speaker mode.
pub const SINGLE_SPEAKER_LABEL: &str = "SPEAKER_0";

pub const AUTO_LANGUAGE: &str = "auto";

/// Environment variable carrying the diarization model credential.
pub const CREDENTIAL_ENV: &str = "HF_TOKEN";

pub const WHISPER_MODEL_NAME: &str = "ggml-large-v3-turbo.bin";
pub const WHISPER_MODEL_URL: &str =
    "https://huggingface.co/ggerganov/whisper.cpp/resolve/main/ggml-large-v3-turbo.bin";

/// Directory name used under the platform cache/config roots.
pub const APP_DIR_NAME: &str = "diarscribe";
