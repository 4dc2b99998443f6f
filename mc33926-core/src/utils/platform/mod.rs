//! Platform pin I/O abstraction.
//!
//! The driver never touches hardware directly; every pin effect goes through a
//! `PinIo` implementation supplied by the board (or by a fake in tests).

pub use embedded_hal::digital::PinState;

use crate::utils::controllers::EdgeNotifier;

/// Platform pin identifier.
pub type PinId = u8;

/// Electrical configuration requested for a pin.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PinMode {
    /// Push-pull output, driven with PWM duty writes.
    Output,
    /// Floating input, also used for analog sampling.
    Input,
    /// Input with the internal pull-up enabled.
    InputPullUp,
}

/// Capability set of the host platform's pin runtime.
///
/// Implementations must not fail: a platform that cannot honour a request
/// should ignore it and return a neutral value.
pub trait PinIo {
    /// Configure the electrical mode of `pin`.
    fn configure_pin_mode(
        &mut self,
        pin: PinId,
        mode: PinMode,
    );

    /// Write a PWM duty count to `pin`. The count is in the platform's current
    /// write range (0..=255 unless a wider resolution was granted).
    fn write_analog(
        &mut self,
        pin: PinId,
        duty: u32,
    );

    /// Sample the ADC on `pin`.
    fn read_analog(
        &mut self,
        pin: PinId,
    ) -> u16;

    /// Read the logic level of `pin`.
    fn read_digital(
        &mut self,
        pin: PinId,
    ) -> PinState;

    /// Arrange for `notifier` to fire on every high-to-low transition of `pin`.
    ///
    /// The notifier may be invoked from interrupt context.
    fn attach_falling_edge(
        &mut self,
        pin: PinId,
        notifier: EdgeNotifier,
    );

    /// Request a PWM write resolution of `bits`. Returns `false` when the
    /// platform has a fixed resolution.
    fn set_write_resolution(
        &mut self,
        _bits: u8,
    ) -> bool {
        false
    }
}

impl<T: PinIo + ?Sized> PinIo for &mut T {
    fn configure_pin_mode(
        &mut self,
        pin: PinId,
        mode: PinMode,
    ) {
        (**self).configure_pin_mode(pin, mode)
    }

    fn write_analog(
        &mut self,
        pin: PinId,
        duty: u32,
    ) {
        (**self).write_analog(pin, duty)
    }

    fn read_analog(
        &mut self,
        pin: PinId,
    ) -> u16 {
        (**self).read_analog(pin)
    }

    fn read_digital(
        &mut self,
        pin: PinId,
    ) -> PinState {
        (**self).read_digital(pin)
    }

    fn attach_falling_edge(
        &mut self,
        pin: PinId,
        notifier: EdgeNotifier,
    ) {
        (**self).attach_falling_edge(pin, notifier)
    }

    fn set_write_resolution(
        &mut self,
        bits: u8,
    ) -> bool {
        (**self).set_write_resolution(bits)
    }
}
