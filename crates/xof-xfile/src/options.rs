//! Read and write settings.

/// Settings for [`XFile::read_with`](crate::XFile::read_with).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ReadOptions {
    /// Drop records that fail to repack instead of aborting the read.
    ///
    /// Each dropped record is recorded as an error diagnostic.
    pub skip_bad_records: bool,
    /// Treat data left over after the last field as an error.
    ///
    /// By default leftover data is a warning and the record is kept.
    pub strict_trailing_data: bool,
}

impl ReadOptions {
    pub fn skip_bad_records(mut self, skip: bool) -> Self {
        self.skip_bad_records = skip;
        self
    }

    pub fn strict_trailing_data(mut self, strict: bool) -> Self {
        self.strict_trailing_data = strict;
        self
    }
}

/// Settings for [`XFile::write_with`](crate::XFile::write_with).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct WriteOptions {
    /// Spaces per nesting level.
    pub indent: usize,
}

impl Default for WriteOptions {
    fn default() -> Self {
        Self { indent: 2 }
    }
}
