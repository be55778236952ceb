//! Graphics support via embedded-graphics
//!
//! Implements [`DrawTarget`] for [`Framebuffer`], so frames can be composed
//! with `embedded-graphics` primitives before the packed buffer is handed
//! to [`draw_image`](crate::Waveform::draw_image).
//!
//! [`Gray4`] luma follows the embedded-graphics convention (0 = black);
//! stored intensity is darkness, so the luma is inverted on the way in. At
//! 2 bpp the two low luma bits are discarded.

use core::convert::Infallible;

use embedded_graphics_core::{
    Pixel,
    draw_target::DrawTarget,
    geometry::{OriginDimensions, Size},
    pixelcolor::{Gray4, GrayColor},
};

use crate::config::BitDepth;
use crate::framebuffer::Framebuffer;
use crate::{HEIGHT, WIDTH};

impl OriginDimensions for Framebuffer<'_> {
    fn size(&self) -> Size {
        Size::new(WIDTH as u32, HEIGHT as u32)
    }
}

impl DrawTarget for Framebuffer<'_> {
    type Color = Gray4;
    type Error = Infallible;

    fn draw_iter<I>(&mut self, pixels: I) -> Result<(), Self::Error>
    where
        I: IntoIterator<Item = Pixel<Self::Color>>,
    {
        for Pixel(point, color) in pixels {
            if point.x < 0 || point.y < 0 {
                continue;
            }
            let darkness = Gray4::WHITE.luma() - color.luma();
            let value = match self.bit_depth() {
                BitDepth::Four => darkness,
                BitDepth::Two => darkness >> 2,
            };
            self.set_pixel(point.x as usize, point.y as usize, value);
        }
        Ok(())
    }
}
