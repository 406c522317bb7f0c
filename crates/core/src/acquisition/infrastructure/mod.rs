pub mod retrying_downloader;
pub mod yt_dlp_downloader;
