pub mod downloader;
pub mod source_url;
