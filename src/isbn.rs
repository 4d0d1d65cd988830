//! Validated ISBN values.

use crate::decode::{ean13, is_valid_normalized, normalize};
use serde::{Deserialize, Serialize};
use std::fmt;

/// A normalized ISBN with a valid shape (10 or 13 characters).
///
/// Only the shape is enforced; [`Isbn::checksum_ok`] reports whether the
/// check digit also matches.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Isbn(String);

/// Rejected ISBN input.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("not an ISBN: {0:?}")]
pub struct InvalidIsbn(pub String);

impl Isbn {
    /// Normalizes and validates raw text.
    pub fn parse(raw: &str) -> Result<Self, InvalidIsbn> {
        let value = normalize(raw);
        if is_valid_normalized(&value) {
            Ok(Self(value))
        } else {
            Err(InvalidIsbn(raw.to_owned()))
        }
    }

    /// The normalized string.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Returns true for the 13-character form.
    pub fn is_isbn13(&self) -> bool {
        self.0.len() == 13
    }

    /// Returns true if the check digit matches.
    pub fn checksum_ok(&self) -> bool {
        if self.is_isbn13() {
            return ean13::is_valid_code(&self.0);
        }
        let mut sum = 0u32;
        for (i, c) in self.0.chars().enumerate() {
            let value = match c {
                'X' if i == 9 => 10,
                c => match c.to_digit(10) {
                    Some(d) => d,
                    None => return false,
                },
            };
            sum += value * (10 - i as u32);
        }
        sum % 11 == 0
    }

    /// The 13-digit form. Ten-character ISBNs get the 978 prefix and a
    /// recomputed check digit; thirteen-character ones are returned as is.
    pub fn to_isbn13(&self) -> Isbn {
        if self.is_isbn13() {
            return self.clone();
        }
        let mut digits = [0u8; 12];
        digits[..3].copy_from_slice(&[9, 7, 8]);
        for (d, c) in digits[3..].iter_mut().zip(self.0.bytes()) {
            // A leading X has no numeric meaning; treat it as zero.
            *d = c.checked_sub(b'0').filter(|v| *v < 10).unwrap_or(0);
        }
        let check = ean13::check_digit(&digits);
        let text: String = digits
            .iter()
            .chain(std::iter::once(&check))
            .map(|d| char::from(b'0' + d))
            .collect();
        Isbn(text)
    }
}

impl fmt::Display for Isbn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for Isbn {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for Isbn {
    type Error = InvalidIsbn;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<Isbn> for String {
    fn from(isbn: Isbn) -> Self {
        isbn.0
    }
}

impl std::str::FromStr for Isbn {
    type Err = InvalidIsbn;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_normalizes() {
        let isbn = Isbn::parse("ISBN 0-8044-2957-x").unwrap();
        assert_eq!(isbn.as_str(), "080442957X");
        assert!(!isbn.is_isbn13());
        assert!(Isbn::parse("12345").is_err());
    }

    #[test]
    fn test_checksum() {
        assert!(Isbn::parse("080442957X").unwrap().checksum_ok());
        assert!(Isbn::parse("0131103628").unwrap().checksum_ok());
        assert!(!Isbn::parse("0131103627").unwrap().checksum_ok());
        assert!(Isbn::parse("9780131103627").unwrap().checksum_ok());
        assert!(!Isbn::parse("9780000000000").unwrap().checksum_ok());
    }

    #[test]
    fn test_to_isbn13() {
        let isbn = Isbn::parse("0131103628").unwrap();
        assert_eq!(isbn.to_isbn13().as_str(), "9780131103627");

        let isbn = Isbn::parse("080442957X").unwrap();
        assert_eq!(isbn.to_isbn13().as_str(), "9780804429573");

        let isbn = Isbn::parse("9780306406157").unwrap();
        assert_eq!(isbn.to_isbn13(), isbn);
    }

    #[test]
    fn test_serde_roundtrip_rejects_invalid() {
        let isbn: Isbn = serde_json::from_str("\"978-0-306-40615-7\"").unwrap();
        assert_eq!(isbn.as_str(), "9780306406157");
        assert!(serde_json::from_str::<Isbn>("\"42\"").is_err());
    }
}
