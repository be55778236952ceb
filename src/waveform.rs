//! The frame-sequencing engine and row pipeline
//!
//! [`Waveform`] owns the peripheral interface plus all scratch state (the
//! conversion table, the masked-row and fill-row buffers, the skip
//! counter), so there is exactly one instance of each and at most one scan
//! in flight: every operation takes `&mut self` and runs to completion
//! before returning.

use log::{debug, trace};

use crate::codec::{self, PLANE_BYTES, PLANE_COUNT, UNARY_BYTES};
use crate::config::{BitDepth, Config, Rect};
use crate::error::{BufferSizeError, Error};
use crate::interface::ScanInterface;
use crate::lut::FrameLut;
use crate::{HEIGHT, LINE_BYTES, WIDTH};

/// Bytes in one 4 bpp source row, the larger of the two row scratch sizes.
const LINE_SRC_BYTES: usize = WIDTH / 2;

/// The waveform engine for one panel.
///
/// Frames execute strictly in order, darkest first: each frame's physical
/// exposure depends on the panel state the previous frame left behind, so
/// there is no reordering and no parallelism across frames.
pub struct Waveform<I: ScanInterface> {
    interface: I,
    config: Config,
    lut: FrameLut,
    line: [u8; LINE_SRC_BYTES],
    fill: [u8; LINE_BYTES],
    skipping: u32,
}

impl<I: ScanInterface> Waveform<I> {
    pub fn new(interface: I, config: Config) -> Self {
        Self {
            interface,
            config,
            lut: FrameLut::new(),
            line: [0; LINE_SRC_BYTES],
            fill: [0; LINE_BYTES],
            skipping: 0,
        }
    }

    /// Release the peripheral interface.
    pub fn free(self) -> I {
        self.interface
    }

    /// Switch on the panel drive power rails.
    pub fn power_on(&mut self) -> Result<(), Error<I>> {
        self.interface.power_on().map_err(Error::Interface)
    }

    /// Switch off the panel drive power rails.
    pub fn power_off(&mut self) -> Result<(), Error<I>> {
        self.interface.power_off().map_err(Error::Interface)
    }

    /// Draw a region of a full-panel packed greyscale image.
    ///
    /// Runs the complete exposure sequence for `depth`: one binary frame
    /// per contrast cycle, darkest first, recompiling the conversion table
    /// before each frame. Rows outside `rect` are skipped; pixels outside
    /// `rect`'s horizontal span are padded to no-activation, masking
    /// partial bytes at the edges.
    ///
    /// # Errors
    ///
    /// Rejects an out-of-bounds rect or a buffer whose length is not
    /// [`BitDepth::buffer_len`] before any peripheral I/O. A peripheral
    /// error mid-scan leaves the panel partially exposed; recover with
    /// [`clear`](Self::clear) and a fresh draw.
    pub fn draw_image(
        &mut self,
        rect: Rect,
        pixels: &[u8],
        depth: BitDepth,
    ) -> Result<(), Error<I>> {
        self.check_rect(rect)?;
        check_len(pixels.len(), depth.buffer_len())?;
        debug!(
            "draw {}x{} at ({}, {}), {} bpp",
            rect.width,
            rect.height,
            rect.x,
            rect.y,
            depth.bits()
        );

        let row_bytes = depth.row_bytes();
        for frame in 0..depth.frame_count() {
            self.lut.compile(depth, frame);
            let duration = self.config.cycles(depth)[usize::from(frame)];
            trace!("frame {}/{}: {} units", frame + 1, depth.frame_count(), duration);
            self.interface.frame_start().map_err(Error::Interface)?;
            for row in 0..HEIGHT {
                if !rect.contains_row(row) {
                    self.skip_row()?;
                    continue;
                }
                let src = &pixels[row * row_bytes..(row + 1) * row_bytes];
                if rect.is_full_width() {
                    codec::apply_lut_to_row(&self.lut, depth, src, self.interface.row_buffer());
                } else {
                    codec::mask_row(
                        depth,
                        src,
                        usize::from(rect.x),
                        usize::from(rect.width),
                        &mut self.line[..row_bytes],
                    );
                    codec::apply_lut_to_row(
                        &self.lut,
                        depth,
                        &self.line[..row_bytes],
                        self.interface.row_buffer(),
                    );
                }
                self.write_row(duration)?;
            }
            // the peripheral is one row behind; latch out the last one
            self.write_row(duration)?;
            self.interface.frame_end().map_err(Error::Interface)?;
        }
        Ok(())
    }

    /// Expand a full-panel 4 bpp image into unary-coded bit planes for
    /// later replay with [`draw_image_unary`](Self::draw_image_unary).
    ///
    /// `planes` must be [`UNARY_BYTES`] long and is caller-owned; on
    /// target hardware it is far too large for anything but external RAM.
    pub fn encode_unary(&mut self, pixels: &[u8], planes: &mut [u8]) -> Result<(), Error<I>> {
        check_len(pixels.len(), BitDepth::Four.buffer_len())?;
        check_len(planes.len(), UNARY_BYTES)?;
        debug!("encode {} unary planes", PLANE_COUNT);
        codec::encode_unary(&mut self.lut, pixels, planes);
        Ok(())
    }

    /// Replay a unary-coded image over the whole panel.
    ///
    /// Frame for frame equivalent to a full-screen
    /// [`draw_image`](Self::draw_image) of the encoded image, but with no
    /// per-pixel recomputation at scan time.
    pub fn draw_image_unary(&mut self, planes: &[u8]) -> Result<(), Error<I>> {
        check_len(planes.len(), UNARY_BYTES)?;
        debug!("draw unary-coded image");

        let plane_row = WIDTH / 8;
        for (frame, plane) in planes.chunks_exact(PLANE_BYTES).enumerate() {
            let duration = self.config.cycles_4[frame];
            trace!("frame {}/{}: {} units", frame + 1, PLANE_COUNT, duration);
            self.interface.frame_start().map_err(Error::Interface)?;
            for words in plane.chunks_exact(plane_row) {
                let out = self.interface.row_buffer();
                for (out, word) in out.chunks_exact_mut(4).zip(words.chunks_exact(2)) {
                    let expanded =
                        codec::expand_plane_word(u16::from_le_bytes([word[0], word[1]]));
                    out.copy_from_slice(&expanded.to_le_bytes());
                }
                self.write_row(duration)?;
            }
            self.write_row(duration)?;
            self.interface.frame_end().map_err(Error::Interface)?;
        }
        Ok(())
    }

    /// Drive one frame filling `rect` with a four-pixel activation pattern.
    ///
    /// The primitive behind [`clear_area`](Self::clear_area); `pattern` is
    /// usually [`DARK_PATTERN`](crate::DARK_PATTERN) or
    /// [`CLEAR_PATTERN`](crate::CLEAR_PATTERN).
    pub fn draw_solid_byte(
        &mut self,
        rect: Rect,
        duration: u16,
        pattern: u8,
    ) -> Result<(), Error<I>> {
        self.check_rect(rect)?;
        trace!("solid pass {pattern:#04x} for {duration} units");

        codec::fill_row(
            pattern,
            usize::from(rect.x),
            usize::from(rect.width),
            &mut self.fill,
        );
        codec::reorder_row(&mut self.fill);

        let top = usize::from(rect.y);
        let bottom = top + usize::from(rect.height);
        self.interface.frame_start().map_err(Error::Interface)?;
        for row in 0..HEIGHT {
            if row < top || row >= bottom {
                self.skip_row()?;
            } else if row == top {
                // prime both buffer halves; later rows commit without rewriting
                self.interface.row_buffer().copy_from_slice(&self.fill);
                self.interface.switch_buffer();
                self.interface.row_buffer().copy_from_slice(&self.fill);
                self.write_row(duration)?;
            } else {
                self.write_row(duration)?;
            }
        }
        // the peripheral is one row behind; latch out the last one
        self.write_row(duration)?;
        self.interface.frame_end().map_err(Error::Interface)
    }

    /// Reset a region to a known white state.
    ///
    /// A fixed recipe of alternating dark and clear passes, three of each,
    /// repeated three times. The pass counts and the use of the clear
    /// timing from the second group onwards are part of the tuned
    /// contrast behaviour; changing them changes the achieved contrast.
    pub fn clear_area(&mut self, rect: Rect) -> Result<(), Error<I>> {
        debug!(
            "clear {}x{} at ({}, {})",
            rect.width, rect.height, rect.x, rect.y
        );
        let dark_time = self.config.dark_time;
        let clear_time = self.config.clear_time;
        for _ in 0..3 {
            self.draw_solid_byte(rect, dark_time, codec::DARK_PATTERN)?;
        }
        for _ in 0..3 {
            self.draw_solid_byte(rect, clear_time, codec::CLEAR_PATTERN)?;
        }
        for _ in 0..3 {
            self.draw_solid_byte(rect, clear_time, codec::DARK_PATTERN)?;
        }
        for _ in 0..3 {
            self.draw_solid_byte(rect, clear_time, codec::CLEAR_PATTERN)?;
        }
        for _ in 0..3 {
            self.draw_solid_byte(rect, clear_time, codec::DARK_PATTERN)?;
        }
        for _ in 0..3 {
            self.draw_solid_byte(rect, clear_time, codec::CLEAR_PATTERN)?;
        }
        Ok(())
    }

    /// Reset the whole panel to a known white state.
    pub fn clear(&mut self) -> Result<(), Error<I>> {
        self.clear_area(Rect::full_screen())
    }

    /// Commit the prepared row and advance, ending any skip run.
    fn write_row(&mut self, duration: u16) -> Result<(), Error<I>> {
        self.skipping = 0;
        self.interface.commit_row(duration).map_err(Error::Interface)
    }

    /// Pass over the current row without new pixel data.
    ///
    /// The first two skips after active output commit an all-zero row with
    /// a minimal pulse and wait for residual charge from the last real row
    /// to dissipate; once two neutral rows have gone out, the bleed is
    /// negligible and the remaining skips use the peripheral fast path.
    fn skip_row(&mut self) -> Result<(), Error<I>> {
        if self.skipping < 2 {
            self.interface.row_buffer().fill(0);
            self.interface.switch_buffer();
            self.interface.row_buffer().fill(0);
            self.interface
                .commit_row(self.config.skip_pulse)
                .map_err(Error::Interface)?;
            self.interface.spin_wait_us(self.config.dissipation_us);
        } else {
            self.interface.fast_skip().map_err(Error::Interface)?;
        }
        self.skipping += 1;
        Ok(())
    }

    fn check_rect(&self, rect: Rect) -> Result<(), Error<I>> {
        if !rect.in_bounds() {
            return Err(Error::RectOutOfBounds(rect));
        }
        Ok(())
    }
}

fn check_len<I: ScanInterface>(provided: usize, required: usize) -> Result<(), Error<I>> {
    if provided != required {
        return Err(Error::BufferSize(BufferSizeError { required, provided }));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::{CLEAR_PATTERN, DARK_PATTERN};
    use crate::config::CONTRAST_CYCLES_2;
    use alloc::vec;
    use alloc::vec::Vec;
    use core::convert::Infallible;

    #[derive(Debug, Clone, PartialEq, Eq)]
    enum Event {
        FrameStart,
        FrameEnd,
        Commit { duration: u16, data: Vec<u8> },
        FastSkip,
        Spin { us: u32 },
    }

    /// Records the scan-out stream; commits snapshot the buffer half being
    /// handed off, then swap halves like the real peripheral.
    #[derive(Debug)]
    struct Bus {
        bufs: [[u8; LINE_BYTES]; 2],
        current: usize,
        events: Vec<Event>,
    }

    impl Bus {
        fn new() -> Self {
            Self {
                bufs: [[0; LINE_BYTES]; 2],
                current: 0,
                events: Vec::new(),
            }
        }
    }

    impl ScanInterface for Bus {
        type Error = Infallible;

        fn power_on(&mut self) -> Result<(), Self::Error> {
            Ok(())
        }

        fn power_off(&mut self) -> Result<(), Self::Error> {
            Ok(())
        }

        fn frame_start(&mut self) -> Result<(), Self::Error> {
            self.events.push(Event::FrameStart);
            Ok(())
        }

        fn frame_end(&mut self) -> Result<(), Self::Error> {
            self.events.push(Event::FrameEnd);
            Ok(())
        }

        fn row_buffer(&mut self) -> &mut [u8] {
            &mut self.bufs[self.current]
        }

        fn switch_buffer(&mut self) {
            self.current ^= 1;
        }

        fn commit_row(&mut self, duration: u16) -> Result<(), Self::Error> {
            self.events.push(Event::Commit {
                duration,
                data: self.bufs[self.current].to_vec(),
            });
            self.current ^= 1;
            Ok(())
        }

        fn fast_skip(&mut self) -> Result<(), Self::Error> {
            self.events.push(Event::FastSkip);
            Ok(())
        }

        fn spin_wait_us(&mut self, us: u32) {
            self.events.push(Event::Spin { us });
        }
    }

    fn engine() -> Waveform<Bus> {
        Waveform::new(Bus::new(), Config::default())
    }

    fn frames(events: &[Event]) -> Vec<&[Event]> {
        let mut frames = Vec::new();
        let mut start = None;
        for (i, event) in events.iter().enumerate() {
            match event {
                Event::FrameStart => start = Some(i + 1),
                Event::FrameEnd => frames.push(&events[start.take().unwrap()..i]),
                _ => {}
            }
        }
        assert!(start.is_none(), "unterminated frame");
        frames
    }

    #[test]
    fn rejects_out_of_bounds_rect_before_any_io() {
        let mut epd = engine();
        let pixels = vec![0u8; BitDepth::Four.buffer_len()];
        let err = epd
            .draw_image(Rect::new(1100, 0, 200, 10), &pixels, BitDepth::Four)
            .unwrap_err();
        assert!(matches!(err, Error::RectOutOfBounds(_)));
        let err = epd
            .draw_solid_byte(Rect::new(0, 800, 10, 30), 50, DARK_PATTERN)
            .unwrap_err();
        assert!(matches!(err, Error::RectOutOfBounds(_)));
        assert!(epd.free().events.is_empty());
    }

    #[test]
    fn rejects_wrong_buffer_length_before_any_io() {
        let mut epd = engine();
        let pixels = vec![0u8; BitDepth::Two.buffer_len()];
        let err = epd
            .draw_image(Rect::full_screen(), &pixels, BitDepth::Four)
            .unwrap_err();
        assert!(matches!(
            err,
            Error::BufferSize(BufferSizeError { required, .. })
                if required == BitDepth::Four.buffer_len()
        ));
        let err = epd.draw_image_unary(&pixels).unwrap_err();
        assert!(matches!(err, Error::BufferSize(_)));
        assert!(epd.free().events.is_empty());
    }

    #[test]
    fn full_screen_solid_commits_every_row_plus_flush() {
        let mut epd = engine();
        epd.draw_solid_byte(Rect::full_screen(), 50, DARK_PATTERN)
            .unwrap();
        let events = epd.free().events;
        let frames = frames(&events);
        assert_eq!(frames.len(), 1);
        let rows: Vec<_> = frames[0]
            .iter()
            .map(|e| match e {
                Event::Commit { duration, data } => (*duration, data),
                other => panic!("unexpected event {other:?}"),
            })
            .collect();
        assert_eq!(rows.len(), HEIGHT + 1);
        for (duration, data) in rows {
            assert_eq!(duration, 50);
            assert!(data.iter().all(|&b| b == DARK_PATTERN));
        }
    }

    #[test]
    fn partial_rect_solid_masks_row_edges() {
        let mut epd = engine();
        // x = 3, width = 6: partial groups at both edges
        epd.draw_solid_byte(Rect::new(3, 0, 6, HEIGHT as u16), 50, DARK_PATTERN)
            .unwrap();
        let events = epd.free().events;
        let mut expected = [0u8; LINE_BYTES];
        codec::fill_row(DARK_PATTERN, 3, 6, &mut expected);
        codec::reorder_row(&mut expected);
        for event in frames(&events)[0] {
            match event {
                Event::Commit { data, .. } => assert_eq!(data[..], expected[..]),
                other => panic!("unexpected event {other:?}"),
            }
        }
    }

    #[test]
    fn skip_discipline_two_neutral_rows_then_fast() {
        let mut epd = engine();
        let rect = Rect::new(0, 100, WIDTH as u16, 50);
        let pixels = vec![0u8; BitDepth::Two.buffer_len()];
        epd.draw_image(rect, &pixels, BitDepth::Two).unwrap();
        let events = epd.free().events;
        let frames = frames(&events);
        assert_eq!(frames.len(), 3);

        for frame in frames {
            let mut expected = Vec::new();
            // rows 0..100: two neutral commits, then fast skips
            expected.push("commit");
            expected.push("spin");
            expected.push("commit");
            expected.push("spin");
            expected.extend(core::iter::repeat_n("fast", 98));
            // rows 100..150: data commits
            expected.extend(core::iter::repeat_n("commit", 50));
            // rows 150..825: the skip run starts over
            expected.push("commit");
            expected.push("spin");
            expected.push("commit");
            expected.push("spin");
            expected.extend(core::iter::repeat_n("fast", 673));
            // pipeline flush
            expected.push("commit");

            let kinds: Vec<&str> = frame
                .iter()
                .map(|e| match e {
                    Event::Commit { .. } => "commit",
                    Event::FastSkip => "fast",
                    Event::Spin { .. } => "spin",
                    other => panic!("unexpected event {other:?}"),
                })
                .collect();
            assert_eq!(kinds, expected);

            // neutral skip rows go out zeroed, with the skip pulse, and the
            // dissipation wait follows each of them
            for window in [&frame[..2], &frame[102 + 50..102 + 52]] {
                match &window[0] {
                    Event::Commit { duration, data } => {
                        assert_eq!(*duration, 10);
                        assert!(data.iter().all(|&b| b == 0));
                    }
                    other => panic!("unexpected event {other:?}"),
                }
                assert_eq!(window[1], Event::Spin { us: 50 });
            }
        }
    }

    #[test]
    fn empty_height_rect_skips_every_row() {
        let mut epd = engine();
        epd.draw_solid_byte(Rect::new(0, 100, WIDTH as u16, 0), 50, CLEAR_PATTERN)
            .unwrap();
        let events = epd.free().events;
        let frames = frames(&events);
        let frame = frames[0];
        let commits = frame
            .iter()
            .filter(|e| matches!(e, Event::Commit { .. }))
            .count();
        let fasts = frame.iter().filter(|e| matches!(e, Event::FastSkip)).count();
        // two neutral rows, then fast skips, then the flush commit
        assert_eq!(commits, 3);
        assert_eq!(fasts, HEIGHT - 2);
    }

    #[test]
    fn clear_emits_the_fixed_pass_sequence() {
        let config = Config::builder().dark_time(60).clear_time(50).build().unwrap();
        let mut epd = Waveform::new(Bus::new(), config);
        epd.clear().unwrap();
        let events = epd.free().events;
        let frames = frames(&events);
        assert_eq!(frames.len(), 18);

        for (pass, frame) in frames.iter().enumerate() {
            let dark_group = (pass / 3) % 2 == 0;
            let expected_pattern = if dark_group { DARK_PATTERN } else { CLEAR_PATTERN };
            // only the first group runs on the dark timing
            let expected_duration = if pass < 3 { 60 } else { 50 };
            assert_eq!(frame.len(), HEIGHT + 1);
            for event in *frame {
                match event {
                    Event::Commit { duration, data } => {
                        assert_eq!(*duration, expected_duration, "pass {pass}");
                        assert!(data.iter().all(|&b| b == expected_pattern), "pass {pass}");
                    }
                    other => panic!("unexpected event {other:?}"),
                }
            }
        }
    }

    #[test]
    fn two_bpp_draw_uses_its_own_contrast_table() {
        let mut epd = engine();
        let mut pixels = vec![0u8; BitDepth::Two.buffer_len()];
        pixels[0] = 0b11; // pixel 0 at the darkest 2 bpp level
        epd.draw_image(Rect::full_screen(), &pixels, BitDepth::Two)
            .unwrap();
        let events = epd.free().events;
        let frames = frames(&events);
        assert_eq!(frames.len(), 3);
        for (frame, events) in frames.iter().enumerate() {
            let durations: Vec<u16> = events
                .iter()
                .map(|e| match e {
                    Event::Commit { duration, .. } => *duration,
                    other => panic!("unexpected event {other:?}"),
                })
                .collect();
            assert_eq!(durations.len(), HEIGHT + 1);
            assert!(durations.iter().all(|&d| d == CONTRAST_CYCLES_2[frame]));
            // pixel 0 activates in every frame, landing in byte 2 of row 0
            match &events[0] {
                Event::Commit { data, .. } => {
                    assert_eq!(data[2], 0b0000_0001);
                    assert!(data.iter().enumerate().all(|(i, &b)| i == 2 || b == 0));
                }
                other => panic!("unexpected event {other:?}"),
            }
        }
    }
}
