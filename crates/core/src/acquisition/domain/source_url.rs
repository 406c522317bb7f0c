use std::sync::OnceLock;

use regex::Regex;

use crate::shared::collaborator_error::CollaboratorError;

/// Supported shapes: `youtube.com/watch?v=<id>`, `youtu.be/<id>` and
/// `youtube.com/shorts/<id>`, each with optional scheme and `www.`.
const SOURCE_URL_PATTERN: &str =
    r"^(https?://)?(www\.)?(youtube\.com/watch\?v=|youtu\.be/|youtube\.com/shorts/)[\w\-]{11}";

fn source_url_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(SOURCE_URL_PATTERN).expect("Invalid regex"))
}

pub fn is_supported(url: &str) -> bool {
    source_url_regex().is_match(url.trim())
}

/// Structural check of a source URL. No network access.
pub fn validate(url: &str) -> Result<(), CollaboratorError> {
    if is_supported(url) {
        Ok(())
    } else {
        Err(CollaboratorError::InvalidSource(format!(
            "unsupported video URL: {:?}",
            url.trim()
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case::watch("https://www.youtube.com/watch?v=dQw4w9WgXcQ")]
    #[case::watch_no_www("https://youtube.com/watch?v=dQw4w9WgXcQ")]
    #[case::no_scheme("youtube.com/watch?v=dQw4w9WgXcQ")]
    #[case::http("http://youtu.be/dQw4w9WgXcQ")]
    #[case::short_link("https://youtu.be/dQw4w9WgXcQ?t=42")]
    #[case::shorts("https://www.youtube.com/shorts/abc_DEF-123")]
    #[case::padded("  https://youtu.be/dQw4w9WgXcQ\n")]
    #[case::extra_params("https://www.youtube.com/watch?v=dQw4w9WgXcQ&list=PL123")]
    fn test_accepts_supported_urls(#[case] url: &str) {
        assert!(is_supported(url));
        assert!(validate(url).is_ok());
    }

    #[rstest]
    #[case::empty("")]
    #[case::other_host("https://vimeo.com/123456789")]
    #[case::short_id("https://youtu.be/abc")]
    #[case::missing_id("https://www.youtube.com/watch?v=")]
    #[case::channel("https://www.youtube.com/@someone")]
    #[case::embedded("see https://youtu.be/dQw4w9WgXcQ")]
    fn test_rejects_other_input(#[case] url: &str) {
        assert!(!is_supported(url));
        assert!(matches!(validate(url), Err(CollaboratorError::InvalidSource(_))));
    }
}
