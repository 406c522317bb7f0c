pub mod acquisition;
pub mod audio;
pub mod config;
pub mod diarization;
pub mod output;
pub mod pipeline;
pub mod shared;
pub mod speech;
pub mod transcript;
