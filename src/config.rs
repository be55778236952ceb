//! Waveform configuration: contrast cycle tables and scan timing
//!
//! The defaults are the empirically tuned values for the ED097OC4 panel.
//! They determine the achieved contrast curve and are not interchangeable
//! between panel batches; the [`Builder`] setters exist for re-tuning
//! against known hardware, not for per-draw adjustment.

use crate::error::BuilderError;
use crate::{HEIGHT, WIDTH};

/// 4 bpp contrast cycles in order of contrast (darkest first).
pub const CONTRAST_CYCLES_4: [u16; 15] = [3, 3, 2, 2, 3, 3, 3, 4, 4, 5, 5, 5, 10, 20, 30];

/// 2 bpp contrast cycles in order of contrast (darkest first).
pub const CONTRAST_CYCLES_2: [u16; 3] = [8, 10, 100];

/// Bits of intensity per pixel.
///
/// Intensity is darkness: 0 is the lightest level and
/// [`max_intensity`](BitDepth::max_intensity) the darkest. The depth fixes
/// the number of exposure frames per draw to `2^bits - 1`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BitDepth {
    /// Four grey levels, four pixels per byte, 3 frames per draw.
    Two,
    /// Sixteen grey levels, two pixels per byte, 15 frames per draw.
    Four,
}

impl BitDepth {
    /// Look up a depth from a raw bit count. Only 2 and 4 are supported.
    pub const fn from_bits(bits: u8) -> Option<Self> {
        match bits {
            2 => Some(BitDepth::Two),
            4 => Some(BitDepth::Four),
            _ => None,
        }
    }

    /// Intensity bits per pixel.
    pub const fn bits(self) -> u8 {
        match self {
            BitDepth::Two => 2,
            BitDepth::Four => 4,
        }
    }

    /// Number of binary exposure frames, `2^bits - 1`.
    pub const fn frame_count(self) -> u8 {
        (1 << self.bits()) - 1
    }

    /// The darkest representable intensity.
    pub const fn max_intensity(self) -> u8 {
        self.frame_count()
    }

    /// Packed pixels per framebuffer byte.
    pub const fn pixels_per_byte(self) -> usize {
        8 / self.bits() as usize
    }

    /// Bytes in one packed source row.
    pub const fn row_bytes(self) -> usize {
        WIDTH / self.pixels_per_byte()
    }

    /// Bytes in a full-panel packed framebuffer.
    pub const fn buffer_len(self) -> usize {
        self.row_bytes() * HEIGHT
    }
}

/// A rectangular region of the panel, in pixel coordinates.
///
/// Must satisfy `x + width <= WIDTH` and `y + height <= HEIGHT`; operations
/// validate this before touching the peripheral.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Rect {
    pub x: u16,
    pub y: u16,
    pub width: u16,
    pub height: u16,
}

impl Rect {
    pub const fn new(x: u16, y: u16, width: u16, height: u16) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// The whole panel. Full-screen draws take a faster path with no
    /// per-row masking.
    pub const fn full_screen() -> Self {
        Self {
            x: 0,
            y: 0,
            width: WIDTH as u16,
            height: HEIGHT as u16,
        }
    }

    pub(crate) fn in_bounds(&self) -> bool {
        usize::from(self.x) + usize::from(self.width) <= WIDTH
            && usize::from(self.y) + usize::from(self.height) <= HEIGHT
    }

    pub(crate) fn contains_row(&self, row: usize) -> bool {
        row >= usize::from(self.y) && row < usize::from(self.y) + usize::from(self.height)
    }

    pub(crate) fn is_full_width(&self) -> bool {
        self.x == 0 && usize::from(self.width) == WIDTH
    }
}

/// Waveform timing configuration.
///
/// [`Config::default`] is the tuned ED097OC4 profile; use
/// [`Config::builder`] to override individual values.
#[derive(Clone, Debug)]
pub struct Config {
    /// Per-frame pulse durations at 4 bpp, darkest first
    pub cycles_4: [u16; 15],
    /// Per-frame pulse durations at 2 bpp, darkest first
    pub cycles_2: [u16; 3],
    /// Pulse for the neutral row committed on the first two skips
    pub skip_pulse: u16,
    /// Charge-dissipation spin after a neutral skip row, in microseconds
    pub dissipation_us: u32,
    /// Pulse for the first group of clear passes
    pub dark_time: u16,
    /// Pulse for the remaining clear passes
    pub clear_time: u16,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            cycles_4: CONTRAST_CYCLES_4,
            cycles_2: CONTRAST_CYCLES_2,
            skip_pulse: 10,
            dissipation_us: 50,
            dark_time: 50,
            clear_time: 50,
        }
    }
}

impl Config {
    /// Create a [`Builder`] seeded with the tuned defaults.
    pub fn builder() -> Builder {
        Builder::default()
    }

    pub(crate) fn cycles(&self, depth: BitDepth) -> &[u16] {
        match depth {
            BitDepth::Two => &self.cycles_2,
            BitDepth::Four => &self.cycles_4,
        }
    }
}

/// Builder for constructing a waveform configuration.
///
/// # Example
///
/// ```
/// use ed097oc4::Config;
///
/// let config = Config::builder()
///     .dark_time(60)
///     .build()
///     .expect("valid configuration");
/// assert_eq!(config.clear_time, 50);
/// ```
pub struct Builder {
    cycles_4: [u16; 15],
    cycles_2: [u16; 3],
    skip_pulse: u16,
    dissipation_us: u32,
    dark_time: u16,
    clear_time: u16,
}

impl Default for Builder {
    fn default() -> Self {
        let config = Config::default();
        Self {
            cycles_4: config.cycles_4,
            cycles_2: config.cycles_2,
            skip_pulse: config.skip_pulse,
            dissipation_us: config.dissipation_us,
            dark_time: config.dark_time,
            clear_time: config.clear_time,
        }
    }
}

impl Builder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the 4 bpp contrast cycle table.
    pub fn cycles_4(mut self, cycles: [u16; 15]) -> Self {
        self.cycles_4 = cycles;
        self
    }

    /// Replace the 2 bpp contrast cycle table.
    pub fn cycles_2(mut self, cycles: [u16; 3]) -> Self {
        self.cycles_2 = cycles;
        self
    }

    /// Set the pulse used when committing a neutral skip row.
    pub fn skip_pulse(mut self, duration: u16) -> Self {
        self.skip_pulse = duration;
        self
    }

    /// Set the charge-dissipation wait after a neutral skip row.
    pub fn dissipation_us(mut self, us: u32) -> Self {
        self.dissipation_us = us;
        self
    }

    /// Set the pulse for the first group of clear passes.
    pub fn dark_time(mut self, duration: u16) -> Self {
        self.dark_time = duration;
        self
    }

    /// Set the pulse for the remaining clear passes.
    pub fn clear_time(mut self, duration: u16) -> Self {
        self.clear_time = duration;
        self
    }

    /// Build the configuration.
    ///
    /// # Errors
    ///
    /// Returns [`BuilderError::ZeroCycle`] if any contrast table entry is
    /// zero.
    pub fn build(self) -> Result<Config, BuilderError> {
        if let Some(index) = self.cycles_4.iter().position(|&c| c == 0) {
            return Err(BuilderError::ZeroCycle { bits: 4, index });
        }
        if let Some(index) = self.cycles_2.iter().position(|&c| c == 0) {
            return Err(BuilderError::ZeroCycle { bits: 2, index });
        }
        Ok(Config {
            cycles_4: self.cycles_4,
            cycles_2: self.cycles_2,
            skip_pulse: self.skip_pulse,
            dissipation_us: self.dissipation_us,
            dark_time: self.dark_time,
            clear_time: self.clear_time,
        })
    }
}
