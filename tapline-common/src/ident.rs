//! Identifier normalization helpers
//!
//! Card readers disagree about digit widths: some drop leading zeros, some
//! emit fixed-width frames. These pure transforms compensate so the same
//! physical card resolves to the same person regardless of reader quirks.

/// Keep only ASCII digits from a raw keystroke buffer
pub fn clean_digits(raw: &str) -> String {
    raw.chars().filter(|c| c.is_ascii_digit()).collect()
}

/// Strip leading zeros, keeping at least one digit
pub fn strip_leading_zeros(identifier: &str) -> &str {
    let stripped = identifier.trim_start_matches('0');
    if stripped.is_empty() && !identifier.is_empty() {
        // All zeros: collapse to a single zero rather than empty
        &identifier[identifier.len() - 1..]
    } else {
        stripped
    }
}

/// Left-pad with zeros to `width`; identifiers already at or past `width`
/// are returned unchanged
pub fn pad_to_width(identifier: &str, width: usize) -> String {
    if identifier.len() >= width {
        identifier.to_string()
    } else {
        format!("{:0>width$}", identifier, width = width)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clean_digits_strips_non_digits() {
        assert_eq!(clean_digits("0003680715012"), "0003680715012");
        assert_eq!(clean_digits("36-80 71\n5012"), "3680715012");
        assert_eq!(clean_digits("Shift;card#42"), "42");
        assert_eq!(clean_digits("no digits"), "");
    }

    #[test]
    fn test_strip_leading_zeros() {
        assert_eq!(strip_leading_zeros("0003680715012"), "3680715012");
        assert_eq!(strip_leading_zeros("3680715012"), "3680715012");
        assert_eq!(strip_leading_zeros("0000"), "0");
        assert_eq!(strip_leading_zeros(""), "");
    }

    #[test]
    fn test_pad_to_width() {
        assert_eq!(pad_to_width("680715012", 10), "0680715012");
        assert_eq!(pad_to_width("3680715012", 10), "3680715012");
        assert_eq!(pad_to_width("12345678901", 10), "12345678901");
        assert_eq!(pad_to_width("7", 4), "0007");
    }
}
