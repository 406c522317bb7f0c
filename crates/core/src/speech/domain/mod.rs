pub mod transcriber;
pub mod voice_activity;
