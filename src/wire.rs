// ABOUTME: Shared byte-level helpers used by both wire protocols
// ABOUTME: typed slice-and-offset reads/writes instead of raw pointer arithmetic

use std::fmt;

/// Reads a big-endian `u16` from `buf` at byte offset `off`.
///
/// Panics if `buf` is shorter than `off + 2`; callers are expected to have
/// already checked length via a completeness predicate.
pub fn read_u16_be(buf: &[u8], off: usize) -> u16 {
    u16::from_be_bytes(buf[off..off + 2].try_into().unwrap())
}

/// Reads a big-endian `u32` from `buf` at byte offset `off`.
pub fn read_u32_be(buf: &[u8], off: usize) -> u32 {
    u32::from_be_bytes(buf[off..off + 4].try_into().unwrap())
}

/// Writes `value` as big-endian bytes into `buf` at offset `off`.
pub fn write_u16_be(buf: &mut [u8], off: usize, value: u16) {
    buf[off..off + 2].copy_from_slice(&value.to_be_bytes());
}

/// Writes `value` as big-endian bytes into `buf` at offset `off`.
pub fn write_u32_be(buf: &mut [u8], off: usize, value: u32) {
    buf[off..off + 4].copy_from_slice(&value.to_be_bytes());
}

/// A fixed-width, zero-padded byte field used for short name-like values.
///
/// Unlike a C string, `FixedBytes` does not require a NUL terminator: a
/// value that fills all `N` bytes is valid. When a NUL byte is present the
/// content is truncated there (first occurrence), matching the field
/// convention of zero-padding values shorter than the field width.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FixedBytes<const N: usize> {
    data: [u8; N],
}

impl<const N: usize> FixedBytes<N> {
    pub fn new(bytes: &[u8]) -> Result<Self, FixedBytesError> {
        if bytes.len() > N {
            return Err(FixedBytesError::TooLong {
                max_len: N,
                actual_len: bytes.len(),
            });
        }
        let mut data = [0u8; N];
        data[..bytes.len()].copy_from_slice(bytes);
        Ok(Self { data })
    }

    pub fn from_array(data: [u8; N]) -> Self {
        Self { data }
    }

    pub const fn as_array(&self) -> &[u8; N] {
        &self.data
    }

    /// Content up to (not including) the first NUL byte, or all `N` bytes
    /// if none is present.
    pub fn as_str_bytes(&self) -> &[u8] {
        let len = self.data.iter().position(|&b| b == 0).unwrap_or(N);
        &self.data[..len]
    }

    pub fn as_str(&self) -> Result<&str, std::str::Utf8Error> {
        std::str::from_utf8(self.as_str_bytes())
    }

    pub fn len(&self) -> usize {
        self.as_str_bytes().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl<const N: usize> Default for FixedBytes<N> {
    fn default() -> Self {
        Self { data: [0u8; N] }
    }
}

impl<const N: usize> fmt::Display for FixedBytes<N> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.as_str() {
            Ok(s) => write!(f, "{s}"),
            Err(_) => write!(f, "<invalid utf-8>"),
        }
    }
}

impl<const N: usize> fmt::Debug for FixedBytes<N> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.as_str() {
            Ok(s) => write!(f, "FixedBytes<{N}>({s:?})"),
            Err(_) => write!(f, "FixedBytes<{N}>({:?})", self.as_str_bytes()),
        }
    }
}

impl<const N: usize> TryFrom<&str> for FixedBytes<N> {
    type Error = FixedBytesError;

    fn try_from(s: &str) -> Result<Self, Self::Error> {
        Self::new(s.as_bytes())
    }
}

impl<const N: usize> PartialEq<str> for FixedBytes<N> {
    fn eq(&self, other: &str) -> bool {
        self.as_str_bytes() == other.as_bytes()
    }
}

impl<const N: usize> PartialEq<&str> for FixedBytes<N> {
    fn eq(&self, other: &&str) -> bool {
        self.as_str_bytes() == other.as_bytes()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum FixedBytesError {
    #[error("value too long: {actual_len} bytes (field holds at most {max_len})")]
    TooLong { max_len: usize, actual_len: usize },
}
