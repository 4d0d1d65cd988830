//! Payload normalization and decode candidates.

/// Longest payload kept after normalization.
pub const MAX_PAYLOAD_LEN: usize = 13;

/// Strips everything except digits and `X`/`x`, uppercases, and keeps at
/// most the first 13 characters.
pub fn normalize(raw: &str) -> String {
    raw.chars()
        .filter(|c| c.is_ascii_digit() || *c == 'X' || *c == 'x')
        .map(|c| c.to_ascii_uppercase())
        .take(MAX_PAYLOAD_LEN)
        .collect()
}

/// Returns true if a normalized payload has ISBN shape: 10 or 13
/// characters, all digits except for at most one `X` at either end.
pub fn is_valid_normalized(value: &str) -> bool {
    let len = value.len();
    if len != 10 && len != 13 {
        return false;
    }
    let x_count = value.bytes().filter(|&b| b == b'X').count();
    match x_count {
        0 => true,
        1 => value.starts_with('X') || value.ends_with('X'),
        _ => false,
    }
}

/// Returns true if `raw` normalizes to a valid payload.
pub fn is_valid(raw: &str) -> bool {
    is_valid_normalized(&normalize(raw))
}

/// A normalized decoder result.
///
/// Immutable once built; `valid` is computed from the normalized value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodeCandidate {
    value: String,
    valid: bool,
}

impl DecodeCandidate {
    /// Normalizes a raw decoder payload.
    pub fn from_raw(raw: &str) -> Self {
        let value = normalize(raw);
        let valid = is_valid_normalized(&value);
        Self { value, valid }
    }

    /// The normalized payload.
    pub fn value(&self) -> &str {
        &self.value
    }

    /// Whether the payload has ISBN shape.
    pub fn is_valid(&self) -> bool {
        self.valid
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_normalize_strips_and_uppercases() {
        assert_eq!(normalize("ISBN 978-0-13-110362-7"), "9780131103627");
        assert_eq!(normalize("0-8044-2957-x"), "080442957X");
        assert_eq!(normalize("  "), "");
    }

    #[test]
    fn test_normalize_truncates() {
        assert_eq!(normalize("97801311036271234"), "9780131103627");
    }

    #[test]
    fn test_validity_by_length() {
        assert!(is_valid("9780131103627"));
        assert!(is_valid("0131103628"));
        assert!(is_valid("080442957X"));
        assert!(!is_valid(""));
        assert!(!is_valid("12345"));
        assert!(!is_valid("97801311036"));
    }

    #[test]
    fn test_x_only_at_ends() {
        assert!(is_valid_normalized("X123456789"));
        assert!(!is_valid_normalized("12X4567890"));
        assert!(!is_valid_normalized("X12345678X"));
    }

    #[test]
    fn test_candidate_from_raw() {
        let candidate = DecodeCandidate::from_raw("978-0131103627");
        assert_eq!(candidate.value(), "9780131103627");
        assert!(candidate.is_valid());

        let partial = DecodeCandidate::from_raw("12345");
        assert_eq!(partial.value(), "12345");
        assert!(!partial.is_valid());
    }

    proptest! {
        #[test]
        fn prop_normalize_idempotent(s in "\\PC*") {
            let once = normalize(&s);
            prop_assert_eq!(normalize(&once), once);
        }

        #[test]
        fn prop_normalized_alphabet(s in "\\PC*") {
            let n = normalize(&s);
            prop_assert!(n.len() <= MAX_PAYLOAD_LEN);
            prop_assert!(n.bytes().all(|b| b.is_ascii_digit() || b == b'X'));
        }

        #[test]
        fn prop_valid_iff_shape(s in "[0-9Xx -]{0,20}") {
            let n = normalize(&s);
            let x_ok = match n.matches('X').count() {
                0 => true,
                1 => n.starts_with('X') || n.ends_with('X'),
                _ => false,
            };
            let expected = (n.len() == 10 || n.len() == 13) && x_ok;
            prop_assert_eq!(is_valid(&s), expected);
        }

        #[test]
        fn prop_digit_strings_of_isbn_length_valid(s in "[0-9]{10}|[0-9]{13}") {
            prop_assert!(is_valid(&s));
        }
    }
}
