//! Packed-row transforms between framebuffer pixels and peripheral rows
//!
//! Two operating modes feed the row pipeline:
//!
//! - **streaming**: [`apply_lut_to_row`] converts one packed source row per
//!   output row through the compiled [`FrameLut`], used for arbitrary
//!   images and regions;
//! - **precomputed**: [`encode_unary`] expands a full-panel 4 bpp image
//!   into one bit plane per frame up front, so a static image can be
//!   redrawn with [`expand_plane_word`] alone.
//!
//! Every output row is emitted in the word order the row bus consumes:
//! within each 32-bit word the 16-bit halves are swapped. The streaming
//! path bakes the swap into its byte placement, the fill path applies
//! [`reorder_row`] afterwards, and unary planes are stored pre-swapped so
//! replay is a pure bit interleave.

use crate::config::BitDepth;
use crate::lut::FrameLut;
use crate::{HEIGHT, LINE_BYTES, WIDTH};

/// Activation pattern giving four pixels a darkening pulse.
pub const DARK_PATTERN: u8 = 0b0101_0101;
/// Activation pattern giving four pixels a lightening pulse.
pub const CLEAR_PATTERN: u8 = 0b1010_1010;

/// Bytes in one unary-coded bit plane (one bit per pixel).
pub const PLANE_BYTES: usize = WIDTH / 8 * HEIGHT;
/// Planes in a unary-coded image, one per 4 bpp frame.
pub const PLANE_COUNT: usize = 15;
/// Bytes in a complete unary-coded image.
pub const UNARY_BYTES: usize = PLANE_COUNT * PLANE_BYTES;

/// Convert one packed source row into an output row through the compiled
/// table.
///
/// `src` must be [`BitDepth::row_bytes`] long and `out`
/// [`LINE_BYTES`] long. Pixels are consumed in groups of four and the
/// group's activation byte is placed at its swapped position within the
/// 32-bit word.
pub fn apply_lut_to_row(lut: &FrameLut, depth: BitDepth, src: &[u8], out: &mut [u8]) {
    debug_assert_eq!(src.len(), depth.row_bytes());
    debug_assert_eq!(out.len(), LINE_BYTES);
    match depth {
        BitDepth::Four => {
            for (word, src) in out.chunks_exact_mut(4).zip(src.chunks_exact(8)) {
                for group in 0..4 {
                    let pixels = u16::from_le_bytes([src[2 * group], src[2 * group + 1]]);
                    word[group ^ 2] = lut.group4(pixels);
                }
            }
        }
        BitDepth::Two => {
            for (word, src) in out.chunks_exact_mut(4).zip(src.chunks_exact(4)) {
                for group in 0..4 {
                    word[group ^ 2] = lut.group2(src[group]);
                }
            }
        }
    }
}

/// Copy the `x .. x + width` span of a packed source row into `out`,
/// padding everything outside the span with intensity 0 (no activation).
///
/// `out` must be [`BitDepth::row_bytes`] long. Pixels keep their panel
/// positions, so only the partial byte at each edge needs masking and the
/// fully covered bytes are copied verbatim.
pub fn mask_row(depth: BitDepth, src: &[u8], x: usize, width: usize, out: &mut [u8]) {
    debug_assert_eq!(src.len(), depth.row_bytes());
    debug_assert_eq!(out.len(), depth.row_bytes());
    out.fill(0);
    if width == 0 {
        return;
    }
    let per_byte = depth.pixels_per_byte();
    let bits = usize::from(depth.bits());
    let end = x + width;
    let first = x / per_byte;
    let last = (end - 1) / per_byte;
    out[first..=last].copy_from_slice(&src[first..=last]);
    let head = x % per_byte;
    if head != 0 {
        out[first] &= 0xFF << (head * bits);
    }
    let tail = end % per_byte;
    if tail != 0 {
        out[last] &= (1 << (tail * bits)) - 1;
    }
}

/// Build one output row filling `x .. x + width` with a four-pixel
/// activation pattern and no activation elsewhere.
///
/// The row is in natural pixel order; apply [`reorder_row`] before handing
/// it to the peripheral.
pub fn fill_row(pattern: u8, x: usize, width: usize, out: &mut [u8]) {
    debug_assert_eq!(out.len(), LINE_BYTES);
    let end = x + width;
    for (i, byte) in out.iter_mut().enumerate() {
        let pixel = i * 4;
        *byte = if pixel + 3 < x || pixel >= end {
            0
        } else {
            let mut b = pattern;
            if x > pixel {
                b &= 0xFF << (2 * (x - pixel));
            }
            if pixel + 4 > end {
                b &= (1 << (2 * (end - pixel))) - 1;
            }
            b
        };
    }
}

/// Swap the 16-bit halves of every 32-bit word of an output row, the fixed
/// permutation the row bus expects.
pub fn reorder_row(row: &mut [u8]) {
    for word in row.chunks_exact_mut(4) {
        word.swap(0, 2);
        word.swap(1, 3);
    }
}

/// Expand a full-panel 4 bpp image into [`PLANE_COUNT`] bit planes,
/// darkest frame first.
///
/// Planes hold one bit per pixel in the pre-swapped word order, so a
/// replay only needs [`expand_plane_word`] per 16 pixels. `planes` must be
/// [`UNARY_BYTES`] long; the table is reused as scratch and left compiled
/// for the last frame.
pub fn encode_unary(lut: &mut FrameLut, pixels: &[u8], planes: &mut [u8]) {
    debug_assert_eq!(pixels.len(), BitDepth::Four.buffer_len());
    debug_assert_eq!(planes.len(), UNARY_BYTES);
    for (frame, plane) in planes.chunks_exact_mut(PLANE_BYTES).enumerate() {
        lut.compile(BitDepth::Four, frame as u8);
        for (word, src) in plane.chunks_exact_mut(2).zip(pixels.chunks_exact(8)) {
            let flags = |group: usize| {
                let pixels = u16::from_le_bytes([src[2 * group], src[2 * group + 1]]);
                gather_even_bits(lut.group4(pixels))
            };
            word[0] = flags(2) | (flags(3) << 4);
            word[1] = flags(0) | (flags(1) << 4);
        }
    }
}

/// Expand 16 plane bits to the 32-bit, two-bit-per-pixel row word, every
/// plane bit landing in its darken position.
// https://graphics.stanford.edu/~seander/bithacks.html#InterleaveBMN
#[inline]
pub fn expand_plane_word(word: u16) -> u32 {
    let mut x = u32::from(word);
    x = (x | (x << 8)) & 0x00FF_00FF;
    x = (x | (x << 4)) & 0x0F0F_0F0F;
    x = (x | (x << 2)) & 0x3333_3333;
    x = (x | (x << 1)) & 0x5555_5555;
    x
}

/// Compress the four activation flags of a conversion byte (bits 0/2/4/6)
/// into four plane bits.
#[inline]
fn gather_even_bits(byte: u8) -> u8 {
    let x = byte & 0x55;
    let x = (x | (x >> 1)) & 0x33;
    (x | (x >> 2)) & 0x0F
}
