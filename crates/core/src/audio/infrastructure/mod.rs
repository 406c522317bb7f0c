pub mod ffmpeg_preprocessor;
pub mod wav_file;
