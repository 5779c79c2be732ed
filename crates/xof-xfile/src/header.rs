//! `.x` file header.
//!
//! The header is fixed width and position sensitive:
//!
//! ```text
//! 0..4    "xof "
//! 4..8    major and minor version, two decimal digits each
//! 8..12   "txt " | "bin " | "cmp "
//! 12..16  compression tag, only after "cmp "
//! N..N+4  "0032" | "0064"
//! N+4     '\n' in text mode
//! ```

use std::fmt;

use crate::error::FileError;

/// Encoding of the file body.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub enum FormatType {
    Text,
    Binary,
    Compressed,
}

impl FormatType {
    /// The four byte tag written in the header.
    pub const fn tag(&self) -> &'static [u8; 4] {
        match self {
            Self::Text => b"txt ",
            Self::Binary => b"bin ",
            Self::Compressed => b"cmp ",
        }
    }

    fn from_tag(tag: &[u8]) -> Option<Self> {
        match tag {
            b"txt " => Some(Self::Text),
            b"bin " => Some(Self::Binary),
            b"cmp " => Some(Self::Compressed),
            _ => None,
        }
    }
}

impl fmt::Display for FormatType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Text => "text",
            Self::Binary => "binary",
            Self::Compressed => "compressed",
        };
        f.write_str(name)
    }
}

/// Width of floating point values in the body.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub enum FloatSize {
    #[default]
    Bits32,
    Bits64,
}

impl FloatSize {
    pub const fn tag(&self) -> &'static [u8; 4] {
        match self {
            Self::Bits32 => b"0032",
            Self::Bits64 => b"0064",
        }
    }

    pub const fn bits(&self) -> u32 {
        match self {
            Self::Bits32 => 32,
            Self::Bits64 => 64,
        }
    }
}

/// Parsed `.x` header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct XFileHeader {
    pub major: u8,
    pub minor: u8,
    pub format: FormatType,
    /// Compression tag, present exactly when `format` is compressed.
    pub compression: Option<[u8; 4]>,
    pub float_size: FloatSize,
}

impl Default for XFileHeader {
    fn default() -> Self {
        Self {
            major: 3,
            minor: 2,
            format: FormatType::Text,
            compression: None,
            float_size: FloatSize::Bits32,
        }
    }
}

impl XFileHeader {
    /// The magic bytes at the start of every `.x` file.
    pub const MAGIC: &'static [u8; 4] = b"xof ";

    /// Size of the header without the compression tag or line break.
    pub const MIN_LEN: usize = 16;

    /// Parse a header from the start of `data`.
    ///
    /// Returns the header and the offset of the first body byte.
    pub fn parse(data: &[u8]) -> Result<(Self, usize), FileError> {
        if data.len() < 4 || &data[..4] != Self::MAGIC {
            return Err(FileError::BadHeader("missing \"xof \" magic".into()));
        }
        if data.len() < Self::MIN_LEN {
            return Err(FileError::BadHeader(format!(
                "header is {} bytes, expected at least {}",
                data.len(),
                Self::MIN_LEN
            )));
        }

        let major = two_digits(&data[4..6])?;
        let minor = two_digits(&data[6..8])?;

        let format = FormatType::from_tag(&data[8..12]).ok_or_else(|| {
            FileError::BadHeader(format!("unknown format tag {:?}", lossy(&data[8..12])))
        })?;

        let mut offset = 12;
        let compression = if format == FormatType::Compressed {
            let tag = data
                .get(offset..offset + 4)
                .ok_or_else(|| FileError::BadHeader("missing compression tag".into()))?;
            offset += 4;
            let mut out = [0u8; 4];
            out.copy_from_slice(tag);
            Some(out)
        } else {
            None
        };

        let float_size = match data.get(offset..offset + 4) {
            Some(b"0032") => FloatSize::Bits32,
            Some(b"0064") => FloatSize::Bits64,
            Some(tag) => {
                return Err(FileError::BadHeader(format!(
                    "unknown float size {:?}",
                    lossy(tag)
                )));
            }
            None => return Err(FileError::BadHeader("missing float size".into())),
        };
        offset += 4;

        if format == FormatType::Text {
            match &data[offset..] {
                [] => {}
                [b'\n', ..] => offset += 1,
                [b'\r', b'\n', ..] => offset += 2,
                _ => {
                    return Err(FileError::BadHeader(
                        "text header must end with a line break".into(),
                    ));
                }
            }
        }

        let header = Self {
            major,
            minor,
            format,
            compression,
            float_size,
        };
        Ok((header, offset))
    }

    /// Append the header bytes to `out`.
    pub fn write(&self, out: &mut Vec<u8>) {
        out.extend_from_slice(Self::MAGIC);
        out.extend_from_slice(format!("{:02}{:02}", self.major % 100, self.minor % 100).as_bytes());
        out.extend_from_slice(self.format.tag());
        if self.format == FormatType::Compressed {
            out.extend_from_slice(&self.compression.unwrap_or(*b"    "));
        }
        out.extend_from_slice(self.float_size.tag());
        if self.format == FormatType::Text {
            out.push(b'\n');
        }
    }

    /// Header as a byte vector.
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(Self::MIN_LEN + 5);
        self.write(&mut out);
        out
    }
}

fn two_digits(bytes: &[u8]) -> Result<u8, FileError> {
    match bytes {
        [a @ b'0'..=b'9', b @ b'0'..=b'9'] => Ok((a - b'0') * 10 + (b - b'0')),
        _ => Err(FileError::BadHeader(format!(
            "version {:?} is not two decimal digits",
            lossy(bytes)
        ))),
    }
}

fn lossy(bytes: &[u8]) -> String {
    String::from_utf8_lossy(bytes).into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_text_header() {
        let (header, offset) = XFileHeader::parse(b"xof 0302txt 0064\nFrame {}").unwrap();
        assert_eq!(header.major, 3);
        assert_eq!(header.minor, 2);
        assert_eq!(header.format, FormatType::Text);
        assert_eq!(header.float_size, FloatSize::Bits64);
        assert_eq!(offset, 17);
    }

    #[test]
    fn test_crlf_and_empty_body() {
        let (_, offset) = XFileHeader::parse(b"xof 0303txt 0032\r\n").unwrap();
        assert_eq!(offset, 18);
        let (_, offset) = XFileHeader::parse(b"xof 0303txt 0032").unwrap();
        assert_eq!(offset, 16);
    }

    #[test]
    fn test_binary_and_compressed() {
        let (header, offset) = XFileHeader::parse(b"xof 0101bin 0032").unwrap();
        assert_eq!(header.format, FormatType::Binary);
        assert_eq!(offset, 16);

        let (header, offset) = XFileHeader::parse(b"xof 0303cmp tzip0032....").unwrap();
        assert_eq!(header.format, FormatType::Compressed);
        assert_eq!(header.compression, Some(*b"tzip"));
        assert_eq!(offset, 20);
    }

    #[test]
    fn test_rejections() {
        for bad in [
            &b"XOF 0302txt 0032\n"[..],
            b"xof",
            b"xof 0302txt",
            b"xof 03a2txt 0032\n",
            b"xof 0302xml 0032\n",
            b"xof 0302txt 0016\n",
            b"xof  0302txt 0032\n",
            b"xof 0302txt 0032 \n",
            b"xof 0302cmp 0032",
        ] {
            assert!(
                matches!(XFileHeader::parse(bad), Err(FileError::BadHeader(_))),
                "accepted {:?}",
                String::from_utf8_lossy(bad)
            );
        }
    }

    #[test]
    fn test_write_is_inverse() {
        for input in [
            &b"xof 0302txt 0032\n"[..],
            b"xof 0101bin 0064",
            b"xof 0303cmp bzip0032",
        ] {
            let (header, _) = XFileHeader::parse(input).unwrap();
            assert_eq!(header.to_bytes(), input);
        }
    }
}
