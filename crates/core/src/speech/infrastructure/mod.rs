pub mod whisper_transcriber;
