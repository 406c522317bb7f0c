/// Whole milliseconds in `secs`, negatives and NaN clamped to zero.
fn millis(secs: f64) -> u64 {
    if secs.is_finite() && secs > 0.0 {
        (secs * 1000.0).round() as u64
    } else {
        0
    }
}

/// `HH:MM:SS`, truncating sub-second precision.
pub fn clock(secs: f64) -> String {
    let total = millis(secs) / 1000;
    format!("{:02}:{:02}:{:02}", total / 3600, (total % 3600) / 60, total % 60)
}

/// SubRip timecode `HH:MM:SS,mmm`.
pub fn subrip(secs: f64) -> String {
    let ms = millis(secs);
    let total = ms / 1000;
    format!(
        "{:02}:{:02}:{:02},{:03}",
        total / 3600,
        (total % 3600) / 60,
        total % 60,
        ms % 1000
    )
}
