//! Three-letter currency codes.

use std::fmt;
use std::str::FromStr;

use crate::error::Error;

/// An ISO-style currency code, stored inline as three upper-case ASCII letters.
///
/// `Copy` and hashable so it can key rate tables without allocation.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct CurrencyCode([u8; 3]);

impl CurrencyCode {
    pub const SEK: CurrencyCode = CurrencyCode(*b"SEK");
    pub const USD: CurrencyCode = CurrencyCode(*b"USD");
    pub const EUR: CurrencyCode = CurrencyCode(*b"EUR");
    pub const CAD: CurrencyCode = CurrencyCode(*b"CAD");
    pub const NOK: CurrencyCode = CurrencyCode(*b"NOK");

    /// Parse a code, normalizing case and surrounding whitespace.
    ///
    /// Returns `None` unless the trimmed input is exactly three ASCII letters.
    pub fn new(code: &str) -> Option<Self> {
        let bytes = code.trim().as_bytes();
        if bytes.len() != 3 || !bytes.iter().all(u8::is_ascii_alphabetic) {
            return None;
        }
        let mut buf = [0u8; 3];
        for (dst, src) in buf.iter_mut().zip(bytes) {
            *dst = src.to_ascii_uppercase();
        }
        Some(Self(buf))
    }

    /// The code as a string slice.
    pub fn as_str(&self) -> &str {
        // Only ASCII letters are ever stored.
        std::str::from_utf8(&self.0).unwrap_or("???")
    }
}

impl fmt::Display for CurrencyCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

impl FromStr for CurrencyCode {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        CurrencyCode::new(s).ok_or_else(|| Error::InvalidCurrency(s.to_string()))
    }
}

#[cfg(feature = "serde")]
impl serde::Serialize for CurrencyCode {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

#[cfg(feature = "serde")]
impl<'de> serde::Deserialize<'de> for CurrencyCode {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = <String as serde::Deserialize>::deserialize(deserializer)?;
        CurrencyCode::new(&raw)
            .ok_or_else(|| serde::de::Error::custom(format!("invalid currency code: {raw:?}")))
    }
}
