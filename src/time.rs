//! Human-readable labels for elapsed seconds.

/// Format a second count as `HH:MM:SS`.
///
/// Every field is padded to two digits; hours keep growing past 99.
///
/// ```
/// assert_eq!(medialistener::translate_seconds(61), "00:01:01");
/// assert_eq!(medialistener::translate_seconds(360000), "100:00:00");
/// ```
pub fn translate_seconds(total: u64) -> String {
    let hours = total / 3600;
    let minutes = (total % 3600) / 60;
    let seconds = total % 60;
    format!("{:02}:{:02}:{:02}", hours, minutes, seconds)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pads_each_field() {
        assert_eq!(translate_seconds(0), "00:00:00");
        assert_eq!(translate_seconds(1), "00:00:01");
        assert_eq!(translate_seconds(61), "00:01:01");
        assert_eq!(translate_seconds(3661), "01:01:01");
    }

    #[test]
    fn hours_are_not_truncated() {
        assert_eq!(translate_seconds(360000), "100:00:00");
        assert_eq!(translate_seconds(359999), "99:59:59");
    }
}
