use crate::{error::Error, Result};

/// Largest supported entry width in bytes.
pub const MAX_OFFSET_WIDTH: u8 = 32;

/// Parameters used when an index gets (re)built.
///
/// They only take effect on a build. An index that is already valid for its source keeps the
/// parameters it was built with, whatever is passed on open.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Config {
    /// Every `sampling_ratio`-th line gets an index entry. Larger values shrink the index but
    /// lengthen the forward scan of each access.
    pub sampling_ratio: u8,
    /// Amount of bytes used to encode each stored offset. Must be large enough to hold the size
    /// of the source file, which is not checked.
    pub offset_width: u8,
}

impl Config {
    #[inline]
    pub fn with_sampling_ratio(mut self, sampling_ratio: u8) -> Self {
        self.sampling_ratio = sampling_ratio;
        self
    }

    #[inline]
    pub fn with_offset_width(mut self, offset_width: u8) -> Self {
        self.offset_width = offset_width;
        self
    }

    /// Returns an error if the parameters can't be used to build an index
    pub fn validate(&self) -> Result<()> {
        if self.sampling_ratio == 0 {
            return Err(Error::InvalidConfig("sampling_ratio must be at least 1"));
        }
        if self.offset_width == 0 || self.offset_width > MAX_OFFSET_WIDTH {
            return Err(Error::InvalidConfig("offset_width must be within 1..=32"));
        }
        Ok(())
    }

    /// Highest byte offset representable with `offset_width` bytes. Offsets are held in a `u64`
    /// so widths of 8 and above saturate.
    pub fn max_offset(&self) -> u64 {
        match self.offset_width {
            0 => 0,
            w if w >= 8 => u64::MAX,
            w => (1u64 << (8 * w as u32)) - 1,
        }
    }
}

impl Default for Config {
    #[inline]
    fn default() -> Self {
        Self {
            sampling_ratio: 1,
            offset_width: 5,
        }
    }
}
