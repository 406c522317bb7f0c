pub mod timecode;
pub mod transcript_formatter;
