pub mod audio_segment;
pub mod loudness;
pub mod preprocessor;
