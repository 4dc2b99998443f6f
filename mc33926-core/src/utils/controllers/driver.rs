//! Speed and polarity control for one MC33926 motor channel.
//!
//! Expected logic connections:
//!
//! | MC33926 | Connection                                 |
//! |---------|--------------------------------------------|
//! | IN1     | forward pin (PWM when driving forward)     |
//! | IN2     | reverse pin (PWM when driving in reverse)  |
//! | SF      | optional status pin, active low, pulled up |
//! | FB      | optional current-sense pin (analog)        |
//! | EN, D2  | tied high; D1, INV tied low                |
//!
//! Exactly one of IN1/IN2 carries a nonzero duty at any time, chosen by the
//! sign of the commanded speed.

use crate::utils::{
    controllers::{EdgeNotifier, StatusSender},
    platform::{PinId, PinIo, PinMode, PinState},
};

/// Default speed bound, matching an 8-bit PWM write range.
pub const DEFAULT_MAX_OUTPUT: i32 = 255;
/// Speed bound matching a 12-bit PWM write range.
pub const MAX_OUTPUT_12_BIT: i32 = 4095;
/// Full-scale raw reading of a 10-bit ADC.
pub const DEFAULT_ANALOG_MAX: u16 = 1023;
/// Widest write resolution a platform may be asked for.
pub const MAX_WRITE_RESOLUTION: u8 = 12;

/// Driver for one motor channel of a dual-input H-bridge.
pub struct MotorDriver<IO> {
    io: IO,
    forward_pin: PinId,
    reverse_pin: PinId,
    status_pin: Option<PinId>,
    current_sense_pin: Option<PinId>,
    reference_voltage: f32,
    max_output: i32,
    min_output: i32,
    write_resolution: Option<u8>,
    analog_max: u16,
}

impl<IO: PinIo> MotorDriver<IO> {
    /// Bind a driver to its forward/reverse pins and configure them as outputs.
    pub fn new(
        io: IO,
        forward_pin: PinId,
        reverse_pin: PinId,
    ) -> Self {
        let mut driver = MotorDriver {
            io,
            forward_pin,
            reverse_pin,
            status_pin: None,
            current_sense_pin: None,
            reference_voltage: 0.0,
            max_output: DEFAULT_MAX_OUTPUT,
            min_output: -DEFAULT_MAX_OUTPUT,
            write_resolution: None,
            analog_max: DEFAULT_ANALOG_MAX,
        };
        driver.io.configure_pin_mode(forward_pin, PinMode::Output);
        driver.io.configure_pin_mode(reverse_pin, PinMode::Output);
        tracing::debug!(forward_pin, reverse_pin, "motor driver initialised");
        driver
    }

    /// Like [`MotorDriver::new`], additionally asking the platform for a PWM
    /// write resolution of `bits` (clamped to 1..=12).
    ///
    /// The speed bounds stay at ±255; call [`MotorDriver::set_max_pwm_output`]
    /// (e.g. with [`MAX_OUTPUT_12_BIT`]) once the wider range is wanted.
    pub fn with_write_resolution(
        io: IO,
        forward_pin: PinId,
        reverse_pin: PinId,
        bits: u8,
    ) -> Self {
        let mut driver = Self::new(io, forward_pin, reverse_pin);
        let bits = bits.clamp(1, MAX_WRITE_RESOLUTION);
        if driver.io.set_write_resolution(bits) {
            driver.write_resolution = Some(bits);
            tracing::debug!(bits, "write resolution applied");
        } else {
            tracing::debug!(bits, "write resolution not supported by platform");
        }
        driver
    }

    /// Use `pin` as the active-low status flag input.
    pub fn set_status_flag_pin(
        &mut self,
        pin: PinId,
    ) {
        self.status_pin = Some(pin);
        self.io.configure_pin_mode(pin, PinMode::InputPullUp);
    }

    /// Use `pin` as the current-sense input. `reference_voltage` is the voltage
    /// of a full-scale ADC reading (e.g. 3.3 or 5.0).
    pub fn set_current_sense_pin(
        &mut self,
        pin: PinId,
        reference_voltage: f32,
    ) {
        self.current_sense_pin = Some(pin);
        self.io.configure_pin_mode(pin, PinMode::Input);
        self.reference_voltage = reference_voltage;
    }

    /// Command a signed speed. Positive (or zero) drives IN1, negative drives IN2.
    ///
    /// The value is clamped to `[min_output, max_output]` and both pins are
    /// written on every call.
    pub fn set_speed(
        &mut self,
        speed: i32,
    ) {
        let clamped = speed.clamp(self.min_output, self.max_output);
        let duty = clamped.unsigned_abs();

        if clamped >= 0 {
            self.io.write_analog(self.forward_pin, duty);
            self.io.write_analog(self.reverse_pin, 0);
        } else {
            self.io.write_analog(self.forward_pin, 0);
            self.io.write_analog(self.reverse_pin, duty);
        }
        tracing::trace!(speed, clamped, "speed applied");
    }

    /// Current-sense reading scaled to volts, or `0.0` if no current-sense pin
    /// is configured.
    pub fn get_current(&mut self) -> f32 {
        let Some(pin) = self.current_sense_pin else {
            return 0.0;
        };
        let raw = self.io.read_analog(pin);
        (raw as f32 / self.analog_max as f32) * self.reference_voltage
    }

    /// `true` while the status flag is asserted (pin reads low). Always
    /// `false` if no status pin is configured.
    pub fn get_status(&mut self) -> bool {
        match self.status_pin {
            Some(pin) => self.io.read_digital(pin) == PinState::Low,
            None => false,
        }
    }

    /// Set the symmetric speed bounds to `±max_output`. Negative values are ignored.
    pub fn set_max_pwm_output(
        &mut self,
        max_output: i32,
    ) {
        if max_output < 0 {
            tracing::warn!(max_output, "ignoring negative max output");
            return;
        }
        self.max_output = max_output;
        self.min_output = -max_output;
    }

    /// Full-scale raw ADC value used by [`MotorDriver::get_current`].
    /// Zero is ignored.
    pub fn set_analog_max(
        &mut self,
        analog_max: u16,
    ) {
        if analog_max == 0 {
            tracing::warn!("ignoring zero analog max");
            return;
        }
        self.analog_max = analog_max;
    }

    /// Configure `pin` as the status flag and report each of its falling edges
    /// as a `StatusEvent` on `sender`.
    ///
    /// Events arrive asynchronously; there is no way to unregister.
    pub fn register_status_change_handler(
        &mut self,
        sender: StatusSender,
        pin: PinId,
    ) {
        self.set_status_flag_pin(pin);

        let Some(pin) = self.status_pin else {
            return;
        };
        self.io
            .attach_falling_edge(pin, EdgeNotifier::new(pin, sender));
        tracing::debug!(pin, "status change handler registered");
    }

    pub fn forward_pin(&self) -> PinId {
        self.forward_pin
    }

    pub fn reverse_pin(&self) -> PinId {
        self.reverse_pin
    }

    pub fn status_pin(&self) -> Option<PinId> {
        self.status_pin
    }

    pub fn current_sense_pin(&self) -> Option<PinId> {
        self.current_sense_pin
    }

    pub fn reference_voltage(&self) -> f32 {
        self.reference_voltage
    }

    pub fn max_output(&self) -> i32 {
        self.max_output
    }

    pub fn min_output(&self) -> i32 {
        self.min_output
    }

    /// Resolution granted by the platform, if one was requested and supported.
    pub fn write_resolution(&self) -> Option<u8> {
        self.write_resolution
    }

    pub fn analog_max(&self) -> u16 {
        self.analog_max
    }

    pub fn io(&self) -> &IO {
        &self.io
    }

    pub fn io_mut(&mut self) -> &mut IO {
        &mut self.io
    }

    /// Give the platform I/O back, consuming the driver.
    pub fn release(self) -> IO {
        self.io
    }
}

#[cfg(test)]
mod tests {
    extern crate std;

    use std::vec::Vec;

    use super::*;

    /// Records every pin effect in call order.
    #[derive(Default)]
    struct Recorder {
        modes: Vec<(PinId, PinMode)>,
        writes: Vec<(PinId, u32)>,
        analog: u16,
        level: Option<PinState>,
        resolution: Option<u8>,
        supports_resolution: bool,
    }

    impl PinIo for Recorder {
        fn configure_pin_mode(
            &mut self,
            pin: PinId,
            mode: PinMode,
        ) {
            self.modes.push((pin, mode));
        }

        fn write_analog(
            &mut self,
            pin: PinId,
            duty: u32,
        ) {
            self.writes.push((pin, duty));
        }

        fn read_analog(
            &mut self,
            _pin: PinId,
        ) -> u16 {
            self.analog
        }

        fn read_digital(
            &mut self,
            _pin: PinId,
        ) -> PinState {
            self.level.unwrap_or(PinState::High)
        }

        fn attach_falling_edge(
            &mut self,
            _pin: PinId,
            _notifier: EdgeNotifier,
        ) {
        }

        fn set_write_resolution(
            &mut self,
            bits: u8,
        ) -> bool {
            if self.supports_resolution {
                self.resolution = Some(bits);
            }
            self.supports_resolution
        }
    }

    fn last_pair(driver: &MotorDriver<Recorder>) -> (u32, u32) {
        let writes = &driver.io().writes;
        let n = writes.len();
        assert!(n >= 2);
        assert_eq!(writes[n - 2].0, driver.forward_pin());
        assert_eq!(writes[n - 1].0, driver.reverse_pin());
        (writes[n - 2].1, writes[n - 1].1)
    }

    #[test]
    fn new_configures_outputs_and_defaults() {
        let driver = MotorDriver::new(Recorder::default(), 3, 5);
        assert_eq!(
            driver.io().modes,
            [(3, PinMode::Output), (5, PinMode::Output)]
        );
        assert_eq!(driver.max_output(), 255);
        assert_eq!(driver.min_output(), -255);
        assert_eq!(driver.status_pin(), None);
        assert_eq!(driver.current_sense_pin(), None);
        assert!(driver.io().writes.is_empty());
    }

    #[test]
    fn clamps_forward_speed() {
        let mut driver = MotorDriver::new(Recorder::default(), 3, 5);
        driver.set_speed(300);
        assert_eq!(last_pair(&driver), (255, 0));
    }

    #[test]
    fn negative_speed_drives_reverse_pin() {
        let mut driver = MotorDriver::new(Recorder::default(), 3, 5);
        driver.set_speed(-100);
        assert_eq!(last_pair(&driver), (0, 100));
        driver.set_speed(-1000);
        assert_eq!(last_pair(&driver), (0, 255));
    }

    #[test]
    fn zero_speed_writes_both_low() {
        let mut driver = MotorDriver::new(Recorder::default(), 3, 5);
        driver.set_speed(0);
        driver.set_speed(0);
        assert_eq!(driver.io().writes, [(3, 0), (5, 0), (3, 0), (5, 0)]);
    }

    #[test]
    fn extreme_speeds_do_not_overflow() {
        let mut driver = MotorDriver::new(Recorder::default(), 3, 5);
        driver.set_max_pwm_output(i32::MAX);
        driver.set_speed(i32::MIN);
        assert_eq!(last_pair(&driver), (0, i32::MAX as u32));
    }

    #[test]
    fn max_output_keeps_bounds_symmetric() {
        let mut driver = MotorDriver::new(Recorder::default(), 3, 5);
        driver.set_max_pwm_output(100);
        assert_eq!((driver.max_output(), driver.min_output()), (100, -100));
        driver.set_speed(150);
        assert_eq!(last_pair(&driver), (100, 0));

        driver.set_max_pwm_output(-5);
        assert_eq!((driver.max_output(), driver.min_output()), (100, -100));

        driver.set_max_pwm_output(0);
        driver.set_speed(-40);
        assert_eq!(last_pair(&driver), (0, 0));
    }

    #[test]
    fn current_is_zero_without_sense_pin() {
        let mut driver = MotorDriver::new(
            Recorder {
                analog: 1023,
                ..Default::default()
            },
            3,
            5,
        );
        assert_eq!(driver.get_current(), 0.0);
    }

    #[test]
    fn current_scales_by_reference_voltage() {
        let mut driver = MotorDriver::new(
            Recorder {
                analog: 1023,
                ..Default::default()
            },
            3,
            5,
        );
        driver.set_current_sense_pin(14, 3.3);
        assert_eq!(driver.io().modes.last(), Some(&(14, PinMode::Input)));
        assert!((driver.get_current() - 3.3).abs() < 1e-6);

        driver.io_mut().analog = 4095;
        driver.set_analog_max(4095);
        driver.set_analog_max(0);
        assert_eq!(driver.analog_max(), 4095);
        assert!((driver.get_current() - 3.3).abs() < 1e-6);
    }

    #[test]
    fn status_is_active_low() {
        let mut driver = MotorDriver::new(
            Recorder {
                level: Some(PinState::Low),
                ..Default::default()
            },
            3,
            5,
        );
        assert!(!driver.get_status());

        driver.set_status_flag_pin(7);
        assert_eq!(driver.io().modes.last(), Some(&(7, PinMode::InputPullUp)));
        assert!(driver.get_status());

        driver.io_mut().level = Some(PinState::High);
        assert!(!driver.get_status());
    }

    #[test]
    fn resolution_request_leaves_bounds_alone() {
        let io = Recorder {
            supports_resolution: true,
            ..Default::default()
        };
        let driver = MotorDriver::with_write_resolution(io, 3, 5, 16);
        assert_eq!(driver.write_resolution(), Some(12));
        assert_eq!(driver.io().resolution, Some(12));
        assert_eq!(driver.max_output(), DEFAULT_MAX_OUTPUT);

        let driver = MotorDriver::with_write_resolution(Recorder::default(), 3, 5, 0);
        assert_eq!(driver.write_resolution(), None);
    }
}
