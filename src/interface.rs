//! Row-scan peripheral abstraction
//!
//! This module provides the [`ScanInterface`] trait, the boundary between
//! the waveform engine and the hardware that owns the panel's row-output
//! bus (on the reference board, an I2S peripheral feeding the panel's
//! source drivers, plus the gate-driver clocking and the drive power rails).
//!
//! ## Pipelining
//!
//! The peripheral is double buffered and runs one row behind the software:
//! the row handed over by [`commit_row`](ScanInterface::commit_row) is still
//! being latched to the panel while the next row's data is written into the
//! other buffer half. The engine accounts for this by always issuing one
//! more commit per frame than there are panel rows; an implementation must
//! not try to compensate for the lag itself.

/// Trait for the hardware interface driving the panel row bus.
///
/// Implementations own the physical peripheral. The engine calls these
/// methods in a strict order per frame: [`frame_start`], then exactly
/// [`HEIGHT`](crate::HEIGHT)` + 1` calls that are each either a commit or a
/// skip, then [`frame_end`].
///
/// [`frame_start`]: ScanInterface::frame_start
/// [`frame_end`]: ScanInterface::frame_end
pub trait ScanInterface {
    /// Error type for peripheral operations.
    ///
    /// Must implement [`Debug`](core::fmt::Debug) for error reporting.
    type Error: core::fmt::Debug;

    /// Switch on the panel drive power rails.
    ///
    /// Callers bracket groups of operations with [`power_on`]/[`power_off`]
    /// to minimise the time the panel is energised.
    ///
    /// [`power_on`]: ScanInterface::power_on
    /// [`power_off`]: ScanInterface::power_off
    fn power_on(&mut self) -> Result<(), Self::Error>;

    /// Switch off the panel drive power rails.
    fn power_off(&mut self) -> Result<(), Self::Error>;

    /// Begin one binary exposure frame, resetting the scan position to row 0.
    fn frame_start(&mut self) -> Result<(), Self::Error>;

    /// Finish the current frame after the last row has been committed.
    fn frame_end(&mut self) -> Result<(), Self::Error>;

    /// The half of the double buffer that the next row's data is written to.
    ///
    /// The returned slice must be exactly [`LINE_BYTES`](crate::LINE_BYTES)
    /// long. Its contents are in scan order (the engine applies the bus word
    /// permutation before writing) and encode two bits per pixel: `01` to
    /// darken, `10` to lighten, `00` to hold.
    fn row_buffer(&mut self) -> &mut [u8];

    /// Swap the double-buffer halves without committing a row.
    ///
    /// The engine uses this to prime both halves with the same data ahead
    /// of a run of commits that do not rewrite the buffer.
    fn switch_buffer(&mut self);

    /// Shift out the prepared buffer half at the current scan position,
    /// driving the row for `duration` time units, then advance one row and
    /// swap the buffer halves.
    fn commit_row(&mut self, duration: u16) -> Result<(), Self::Error>;

    /// Advance the scan position one row without transferring any data.
    ///
    /// Cheaper than committing a row, but leaves whatever charge the bus
    /// lines carry; the engine only uses it once the last committed rows
    /// were neutral.
    fn fast_skip(&mut self) -> Result<(), Self::Error>;

    /// Busy-wait for `us` microseconds.
    ///
    /// The implementation must spin on a monotonic cycle counter; it must
    /// not yield to a scheduler or sleep. The engine calls this for
    /// sub-millisecond charge-dissipation waits where timer wakeup jitter
    /// would defeat the purpose.
    fn spin_wait_us(&mut self, us: u32);
}
