//! Error types for the driver
//!
//! All validation happens before the first peripheral operation of a scan:
//! a failed scan would leave the panel in an indeterminate, partially
//! exposed state, and the only recovery is a fresh
//! [`clear`](crate::Waveform::clear) followed by a redraw.

use crate::config::Rect;
use crate::interface::ScanInterface;

/// A buffer whose length does not match the panel geometry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BufferSizeError {
    /// Required buffer size in bytes
    pub required: usize,
    /// Provided buffer size in bytes
    pub provided: usize,
}

impl core::fmt::Display for BufferSizeError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(
            f,
            "buffer size mismatch: required {} bytes, provided {}",
            self.required, self.provided
        )
    }
}

impl core::error::Error for BufferSizeError {}

/// Errors that can occur when driving a scan.
///
/// Generic over the interface type to preserve the specific hardware error
/// type, so error handling code can match on the underlying failure.
#[derive(Debug)]
pub enum Error<I: ScanInterface> {
    /// Peripheral error, preserved from the interface implementation.
    Interface(I::Error),
    /// The rect does not fit the panel. Rejected before any peripheral I/O.
    RectOutOfBounds(Rect),
    /// A pixel or plane buffer of the wrong length. Rejected before any
    /// peripheral I/O.
    BufferSize(BufferSizeError),
}

impl<I: ScanInterface> From<BufferSizeError> for Error<I> {
    fn from(value: BufferSizeError) -> Self {
        Self::BufferSize(value)
    }
}

impl<I: ScanInterface> core::fmt::Display for Error<I> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Error::Interface(e) => write!(f, "peripheral error: {e:?}"),
            Error::RectOutOfBounds(rect) => write!(f, "rect out of panel bounds: {rect:?}"),
            Error::BufferSize(e) => write!(f, "{e}"),
        }
    }
}

impl<I: ScanInterface + core::fmt::Debug> core::error::Error for Error<I> {}

/// Errors that can occur when building a [`Config`](crate::config::Config).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BuilderError {
    /// A contrast cycle of zero units would turn that frame into a no-op
    /// and shift the grey balance of every level above it.
    ZeroCycle {
        /// Bit depth of the offending table
        bits: u8,
        /// Frame index of the zero entry
        index: usize,
    },
}

impl core::fmt::Display for BuilderError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            BuilderError::ZeroCycle { bits, index } => write!(
                f,
                "contrast cycle {index} of the {bits} bpp table must be non-zero"
            ),
        }
    }
}

impl core::error::Error for BuilderError {}
