//! Greyscale waveform driver for the ED097OC4 electrophoretic display.
//!
//! The ED097OC4 is a 1200x825 e-paper panel with no native greyscale support:
//! a pixel can only be pushed towards darker or lighter by a timed drive
//! pulse. This crate synthesises grey levels in software by running a
//! sequence of binary exposure frames per image (15 frames at 4 bits per
//! pixel, 3 at 2 bits per pixel), where a pixel of intensity `v` receives a
//! darkening pulse in exactly the first `v` frames of the sequence.
//!
//! Per-pixel threshold comparison at scan-line speed is made affordable by a
//! conversion table recompiled once per frame ([`FrameLut`]), and regions
//! outside the area of interest are passed over with a row-skip protocol
//! that avoids visibly tainting untouched parts of the screen.
//!
//! The physical row bus (frame bracketing, double-buffered row transfer,
//! fast skip, power rails) is not implemented here. It is consumed through
//! the [`ScanInterface`] trait, so the engine works with any peripheral
//! implementation that satisfies its contract.
//!
//! ## Example
//!
//! ```rust,ignore
//! use ed097oc4::{BitDepth, Config, Rect, Waveform};
//!
//! // `bus` implements `ScanInterface` for the board's row-output peripheral.
//! let mut epd = Waveform::new(bus, Config::default());
//!
//! epd.power_on()?;
//! epd.clear()?;
//! epd.draw_image(Rect::full_screen(), &image, BitDepth::Four)?;
//! epd.power_off()?;
//! ```

#![no_std]

#[cfg(test)]
extern crate alloc;

/// Packed-row transforms between framebuffer pixels and peripheral rows
pub mod codec;
/// Waveform configuration: contrast cycle tables and scan timing
pub mod config;
/// Error types for the driver
pub mod error;
/// Packed greyscale access to a caller-owned pixel buffer
pub mod framebuffer;
/// Row-scan peripheral abstraction
pub mod interface;
/// Runtime-compiled pixel conversion tables
pub mod lut;
/// The frame-sequencing engine and row pipeline
pub mod waveform;

/// Graphics support via embedded-graphics (requires `graphics` feature)
#[cfg(feature = "graphics")]
pub mod graphics;

/// The horizontal size of the panel in pixels.
pub const WIDTH: usize = 1200;
/// The vertical size of the panel in pixels.
pub const HEIGHT: usize = 825;
/// Bytes in one output row handed to the peripheral (two bits per pixel).
pub const LINE_BYTES: usize = WIDTH / 4;

pub use codec::{CLEAR_PATTERN, DARK_PATTERN, PLANE_BYTES, PLANE_COUNT, UNARY_BYTES};
pub use config::{BitDepth, Builder, Config, Rect, CONTRAST_CYCLES_2, CONTRAST_CYCLES_4};
pub use error::{BufferSizeError, BuilderError, Error};
pub use framebuffer::Framebuffer;
pub use interface::ScanInterface;
pub use lut::FrameLut;
pub use waveform::Waveform;
