pub mod formatter_factory;
pub mod json_formatter;
pub mod srt_formatter;
pub mod text_formatter;
