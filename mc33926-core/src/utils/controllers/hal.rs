//! `PinIo` adapter over typed embedded-hal parts.
//!
//! Boards that expose their PWM channels and GPIOs through embedded-hal 1.0
//! traits can bind each part to the `PinId` the driver is configured with.
//! HAL errors are logged and absorbed so the driver keeps its never-fail
//! contract.
//!
//! embedded-hal has no interrupt API, so falling edges are detected in
//! software: call [`HalBridge::poll_status`] from a timer tick or a GPIO
//! interrupt handler.

use core::convert::Infallible;

use embedded_hal::{
    digital::{self, ErrorType, InputPin},
    pwm::{self, SetDutyCycle},
};

use crate::utils::{
    controllers::EdgeNotifier,
    platform::{PinId, PinIo, PinMode, PinState},
};

/// Source of raw current-sense ADC samples.
pub trait CurrentSample {
    fn sample(&mut self) -> u16;
}

impl<F: FnMut() -> u16> CurrentSample for F {
    fn sample(&mut self) -> u16 {
        self()
    }
}

/// Placeholder status input for bridges without a status flag. Reads idle high.
pub struct NoStatus;

impl ErrorType for NoStatus {
    type Error = Infallible;
}

impl InputPin for NoStatus {
    fn is_high(&mut self) -> Result<bool, Self::Error> {
        Ok(true)
    }

    fn is_low(&mut self) -> Result<bool, Self::Error> {
        Ok(false)
    }
}

/// Maps driver pin ids onto embedded-hal PWM channels and inputs.
pub struct HalBridge<FWD, REV, SF = NoStatus, CS = fn() -> u16> {
    forward: (PinId, FWD),
    reverse: (PinId, REV),
    status: Option<(PinId, SF)>,
    current_sense: Option<(PinId, CS)>,
    /// Full-scale duty count of the driver's write range.
    write_max: u16,
    notifier: Option<EdgeNotifier>,
    last_status: PinState,
}

impl<FWD, REV> HalBridge<FWD, REV> {
    /// Bind the forward and reverse PWM channels. The write range starts at 8 bits.
    pub fn new(
        forward_pin: PinId,
        forward: FWD,
        reverse_pin: PinId,
        reverse: REV,
    ) -> Self {
        HalBridge {
            forward: (forward_pin, forward),
            reverse: (reverse_pin, reverse),
            status: None,
            current_sense: None,
            write_max: u8::MAX as u16,
            notifier: None,
            last_status: PinState::High,
        }
    }
}

impl<FWD, REV, SF, CS> HalBridge<FWD, REV, SF, CS> {
    /// Bind the status flag input.
    pub fn with_status<S>(
        self,
        pin: PinId,
        input: S,
    ) -> HalBridge<FWD, REV, S, CS> {
        HalBridge {
            forward: self.forward,
            reverse: self.reverse,
            status: Some((pin, input)),
            current_sense: self.current_sense,
            write_max: self.write_max,
            notifier: self.notifier,
            last_status: self.last_status,
        }
    }

    /// Bind the current-sense sample source.
    pub fn with_current_sense<C>(
        self,
        pin: PinId,
        source: C,
    ) -> HalBridge<FWD, REV, SF, C> {
        HalBridge {
            forward: self.forward,
            reverse: self.reverse,
            status: self.status,
            current_sense: Some((pin, source)),
            write_max: self.write_max,
            notifier: self.notifier,
            last_status: self.last_status,
        }
    }

    pub fn write_max(&self) -> u16 {
        self.write_max
    }

    /// Hand back the forward and reverse channels.
    pub fn release(self) -> (FWD, REV) {
        (self.forward.1, self.reverse.1)
    }
}

impl<FWD, REV, SF, CS> HalBridge<FWD, REV, SF, CS>
where
    FWD: SetDutyCycle,
    REV: SetDutyCycle,
    SF: InputPin,
    CS: CurrentSample,
{
    /// Sample the status input and fire the attached notifier on a high-to-low
    /// transition. Returns `true` when a falling edge was seen.
    pub fn poll_status(&mut self) -> bool {
        let Some(pin) = self.notifier.map(|n| n.pin()) else {
            return false;
        };
        let level = self.read_digital(pin);
        let fell = self.last_status == PinState::High && level == PinState::Low;
        self.last_status = level;

        if fell {
            if let Some(notifier) = &self.notifier {
                if !notifier.notify() {
                    tracing::warn!(pin, "status queue full, event dropped");
                }
            }
        }
        fell
    }
}

impl<FWD, REV, SF, CS> PinIo for HalBridge<FWD, REV, SF, CS>
where
    FWD: SetDutyCycle,
    REV: SetDutyCycle,
    SF: InputPin,
    CS: CurrentSample,
{
    fn configure_pin_mode(
        &mut self,
        pin: PinId,
        mode: PinMode,
    ) {
        // Modes are fixed by the HAL pin types.
        tracing::trace!(pin, ?mode, "pin mode request");
    }

    fn write_analog(
        &mut self,
        pin: PinId,
        duty: u32,
    ) {
        let duty = duty.min(self.write_max as u32) as u16;
        let result = if pin == self.forward.0 {
            self.forward
                .1
                .set_duty_cycle_fraction(duty, self.write_max)
                .map_err(|e| pwm::Error::kind(&e))
        } else if pin == self.reverse.0 {
            self.reverse
                .1
                .set_duty_cycle_fraction(duty, self.write_max)
                .map_err(|e| pwm::Error::kind(&e))
        } else {
            tracing::warn!(pin, "write to unbound pin ignored");
            return;
        };

        if let Err(kind) = result {
            tracing::warn!(pin, ?kind, "PWM write failed");
        }
    }

    fn read_analog(
        &mut self,
        pin: PinId,
    ) -> u16 {
        match self.current_sense.as_mut() {
            Some((bound, source)) if *bound == pin => source.sample(),
            _ => {
                tracing::warn!(pin, "analog read from unbound pin");
                0
            }
        }
    }

    fn read_digital(
        &mut self,
        pin: PinId,
    ) -> PinState {
        match self.status.as_mut() {
            Some((bound, input)) if *bound == pin => match input.is_low() {
                Ok(low) => PinState::from(!low),
                Err(e) => {
                    tracing::warn!(pin, kind = ?digital::Error::kind(&e), "status read failed");
                    PinState::High
                }
            },
            _ => {
                tracing::warn!(pin, "digital read from unbound pin");
                PinState::High
            }
        }
    }

    fn attach_falling_edge(
        &mut self,
        pin: PinId,
        notifier: EdgeNotifier,
    ) {
        if !matches!(&self.status, Some((bound, _)) if *bound == pin) {
            tracing::warn!(pin, "edge notification requested on unbound pin");
            return;
        }
        self.last_status = self.read_digital(pin);
        self.notifier = Some(notifier);
    }

    fn set_write_resolution(
        &mut self,
        bits: u8,
    ) -> bool {
        if !(1..=16).contains(&bits) {
            return false;
        }
        self.write_max = ((1u32 << bits) - 1) as u16;
        true
    }
}
