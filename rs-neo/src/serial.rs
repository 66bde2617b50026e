use std::fmt::{Debug, Display, Formatter};
use std::str::FromStr;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use crate::constants::{MAX_DECIMAL_SERIAL, MAX_SERIAL, MIN_BASE36_SERIAL, SERIAL_LENGTH};
use crate::error::NeoError;
use crate::EventType;

const BASE36_DIGITS: &[u8; 36] = b"0123456789ABCDEFGHIJKLMNOPQRSTUVWXYZ";

/// A device serial number such as `CY2285` or `138635`.
///
/// Stored inline, it is always 1 to 6 upper-case alphanumeric characters.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Serial {
    bytes: [u8; SERIAL_LENGTH],
    len: u8,
}

impl Serial {
    /// Build a serial from its numeric representation.
    ///
    /// Old devices use the decimal form (`138635`), newer ones the base-36 form (`RS2259`).
    /// Returns `None` when `num` has no string form that decodes back to it.
    pub fn from_num(num: u32) -> Option<Self> {
        if num == 0 || num > MAX_SERIAL {
            return None;
        }

        if num < MIN_BASE36_SERIAL {
            if num > MAX_DECIMAL_SERIAL {
                return None;
            }
            return Self::parse(num.to_string().as_bytes());
        }

        let mut bytes = [b'0'; SERIAL_LENGTH];
        let mut value = num;
        for b in bytes.iter_mut().rev() {
            *b = BASE36_DIGITS[(value % 36) as usize];
            value /= 36;
        }
        // an all-digit base-36 rendering would be read back as decimal
        if bytes.iter().all(u8::is_ascii_digit) {
            return None;
        }

        Some(Self { bytes, len: SERIAL_LENGTH as u8 })
    }

    /// Numeric representation, `0` if the serial can not be converted.
    pub fn to_num(&self) -> u32 {
        let s = self.as_bytes();
        if s.iter().all(u8::is_ascii_digit) {
            return self.as_str().parse::<u32>().unwrap_or_default();
        }

        if s.len() != SERIAL_LENGTH {
            return 0;
        }

        s.iter().try_fold(0u32, |acc, &c| {
            let digit = match c {
                b'0'..=b'9' => c - b'0',
                b'A'..=b'Z' => c - b'A' + 10,
                _ => return None,
            };
            acc.checked_mul(36)?.checked_add(digit as u32)
        })
        .unwrap_or_default()
    }

    #[inline]
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes[..self.len as usize]
    }

    #[inline]
    pub fn as_str(&self) -> &str {
        // only ascii alphanumerics are ever stored
        std::str::from_utf8(self.as_bytes()).unwrap_or_default()
    }

    fn parse(s: &[u8]) -> Option<Self> {
        if s.is_empty() || s.len() > SERIAL_LENGTH || !s.iter().all(u8::is_ascii_alphanumeric) {
            return None;
        }

        let mut bytes = [0u8; SERIAL_LENGTH];
        for (dst, src) in bytes.iter_mut().zip(s) {
            *dst = src.to_ascii_uppercase();
        }

        Some(Self { bytes, len: s.len() as u8 })
    }
}

impl FromStr for Serial {
    type Err = NeoError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s.trim().as_bytes())
            .ok_or(NeoError::Api(EventType::IncorrectSerialNumber))
    }
}

impl TryFrom<u32> for Serial {
    type Error = NeoError;

    fn try_from(value: u32) -> Result<Self, Self::Error> {
        Self::from_num(value)
            .ok_or(NeoError::Api(EventType::ParameterOutOfRange))
    }
}

impl Display for Serial {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Debug for Serial {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "Serial({})", self.as_str())
    }
}

impl Serialize for Serial {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for Serial {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Self::parse(s.trim().as_bytes())
            .ok_or_else(|| serde::de::Error::custom(format!("invalid serial number: {}", s)))
    }
}

/// Convert a numeric serial into its string representation.
#[inline]
pub fn serial_num_to_string(num: u32) -> Option<String> {
    Serial::from_num(num).map(|s| s.to_string())
}

/// Convert a serial in string form into its numeric representation, `0` when invalid.
#[inline]
pub fn serial_string_to_num(serial: &str) -> u32 {
    serial.parse::<Serial>()
        .map(|s| s.to_num())
        .unwrap_or_default()
}
