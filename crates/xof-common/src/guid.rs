//! Windows GUID key - the canonical identity of a `.x` template.
//!
//! A GUID is stored in its in-memory Windows layout: `data1` (u32),
//! `data2` (u16) and `data3` (u16) little-endian, followed by the eight
//! `data4` bytes. Ordering compares those 16 raw bytes, so two keys sort
//! the same way a `memcmp` over the structures would.

use std::fmt;
use std::str::FromStr;

use byteorder::{ByteOrder, LittleEndian};
use zerocopy::{FromBytes, Immutable, IntoBytes, KnownLayout};

use crate::FormatError;

/// Length of the canonical text form: `xxxxxxxx-xxxx-xxxx-xxxx-xxxxxxxxxxxx`.
const TEXT_LEN: usize = 36;

/// Positions of the hyphens in the canonical text form.
const HYPHENS: [usize; 4] = [8, 13, 18, 23];

/// A 128-bit identifier shaped like a Windows `GUID`.
///
/// Format: `%08x-%04x-%04x-%02x%02x-%02x%02x%02x%02x%02x%02x`
///
/// # Byte Layout
///
/// - bytes 0..4: `data1`, little-endian
/// - bytes 4..6: `data2`, little-endian
/// - bytes 6..8: `data3`, little-endian
/// - bytes 8..16: `data4[0..8]`, in text order
#[derive(
    Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, FromBytes, IntoBytes, Immutable,
    KnownLayout,
)]
#[repr(C)]
pub struct GuidKey {
    bytes: [u8; 16],
}

impl GuidKey {
    /// Null GUID (all zeros).
    pub const NULL: Self = Self { bytes: [0; 16] };

    /// Build a GUID from its four Windows fields.
    pub fn new(data1: u32, data2: u16, data3: u16, data4: [u8; 8]) -> Self {
        let mut bytes = [0u8; 16];
        LittleEndian::write_u32(&mut bytes[0..4], data1);
        LittleEndian::write_u16(&mut bytes[4..6], data2);
        LittleEndian::write_u16(&mut bytes[6..8], data3);
        bytes[8..16].copy_from_slice(&data4);
        Self { bytes }
    }

    /// Create a GUID from raw bytes in Windows memory layout.
    #[inline]
    pub const fn from_bytes(bytes: [u8; 16]) -> Self {
        Self { bytes }
    }

    /// Get the raw bytes in Windows memory layout.
    #[inline]
    pub const fn as_bytes(&self) -> &[u8; 16] {
        &self.bytes
    }

    #[inline]
    pub fn data1(&self) -> u32 {
        LittleEndian::read_u32(&self.bytes[0..4])
    }

    #[inline]
    pub fn data2(&self) -> u16 {
        LittleEndian::read_u16(&self.bytes[4..6])
    }

    #[inline]
    pub fn data3(&self) -> u16 {
        LittleEndian::read_u16(&self.bytes[6..8])
    }

    #[inline]
    pub fn data4(&self) -> [u8; 8] {
        let mut data4 = [0u8; 8];
        data4.copy_from_slice(&self.bytes[8..16]);
        data4
    }

    /// Check if the GUID is null (all zeros).
    #[inline]
    pub fn is_null(&self) -> bool {
        self.bytes == [0; 16]
    }

    /// Parse the canonical text form.
    ///
    /// The input must be exactly 36 characters with hyphens at positions
    /// 8, 13, 18 and 23 and hex digits everywhere else. Either letter case
    /// is accepted.
    pub fn parse(s: &str) -> Result<Self, FormatError> {
        let raw = s.as_bytes();
        if raw.len() != TEXT_LEN {
            return Err(FormatError::malformed(
                s,
                format!("expected {} characters, got {}", TEXT_LEN, raw.len()),
            ));
        }

        for (i, &b) in raw.iter().enumerate() {
            if HYPHENS.contains(&i) {
                if b != b'-' {
                    return Err(FormatError::malformed(s, format!("expected '-' at position {}", i)));
                }
            } else if !b.is_ascii_hexdigit() {
                return Err(FormatError::malformed(s, format!("invalid hex digit at position {}", i)));
            }
        }

        // Every non-hyphen byte is an ASCII hex digit, so slicing is on char
        // boundaries and radix parsing cannot fail.
        let hex = |start: usize, end: usize| -> Result<u32, FormatError> {
            u32::from_str_radix(&s[start..end], 16)
                .map_err(|_| FormatError::malformed(s, format!("invalid hex at position {}", start)))
        };

        let data1 = hex(0, 8)?;
        let data2 = hex(9, 13)? as u16;
        let data3 = hex(14, 18)? as u16;

        let mut data4 = [0u8; 8];
        data4[0] = hex(19, 21)? as u8;
        data4[1] = hex(21, 23)? as u8;
        for (i, byte) in data4[2..].iter_mut().enumerate() {
            let start = 24 + i * 2;
            *byte = hex(start, start + 2)? as u8;
        }

        Ok(Self::new(data1, data2, data3, data4))
    }

    /// Format as lower-case canonical text.
    pub fn format(&self) -> String {
        self.to_string()
    }
}

impl fmt::Debug for GuidKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "GuidKey({})", self)
    }
}

impl fmt::Display for GuidKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let d = self.data4();
        write!(
            f,
            "{:08x}-{:04x}-{:04x}-{:02x}{:02x}-{:02x}{:02x}{:02x}{:02x}{:02x}{:02x}",
            self.data1(),
            self.data2(),
            self.data3(),
            d[0], d[1],
            d[2], d[3], d[4], d[5], d[6], d[7]
        )
    }
}

impl FromStr for GuidKey {
    type Err = FormatError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

#[cfg(feature = "serde")]
impl serde::Serialize for GuidKey {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.to_string())
    }
}

#[cfg(feature = "serde")]
impl<'de> serde::Deserialize<'de> for GuidKey {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}
