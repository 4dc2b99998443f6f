//! Module Exports
//!
//! - `driver`: the `MotorDriver` speed/polarity policy for one motor channel.
//! - `hal`: `PinIo` adapter over typed embedded-hal parts.
//!
//! Status flag transitions are delivered as `StatusEvent` messages on an
//! embassy-sync channel instead of a raw interrupt callback.

pub mod driver;
pub mod hal;

use core::fmt;

use embassy_sync::{
    blocking_mutex::raw::CriticalSectionRawMutex,
    channel::{Channel, Sender},
};
use serde::{Deserialize, Serialize};

use crate::utils::platform::PinId;

pub use driver::MotorDriver;
pub use hal::{CurrentSample, HalBridge};

/// Number of undelivered status events a channel holds before new ones are dropped.
pub const STATUS_QUEUE_DEPTH: usize = 8;

/// Channel used to deliver status flag falling edges (`StatusEvent` messages).
pub static STATUS_CHANNEL: Channel<CriticalSectionRawMutex, StatusEvent, STATUS_QUEUE_DEPTH> =
    Channel::new();

/// Sending half accepted by `MotorDriver::register_status_change_handler`.
pub type StatusSender =
    Sender<'static, CriticalSectionRawMutex, StatusEvent, STATUS_QUEUE_DEPTH>;

/// A high-to-low transition observed on a status flag pin.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusEvent {
    /// Status flag pin that asserted.
    pub pin: PinId,
}

/// Handle given to the platform so it can report falling edges on one pin.
///
/// `notify` never blocks and is safe to call from interrupt context.
#[derive(Clone, Copy)]
pub struct EdgeNotifier {
    pin: PinId,
    sender: StatusSender,
}

impl EdgeNotifier {
    pub fn new(
        pin: PinId,
        sender: StatusSender,
    ) -> Self {
        Self { pin, sender }
    }

    pub fn pin(&self) -> PinId {
        self.pin
    }

    /// Queue a `StatusEvent` for this pin.
    ///
    /// Returns `false` if the queue was full and the event was dropped.
    pub fn notify(&self) -> bool {
        self.sender
            .try_send(StatusEvent { pin: self.pin })
            .is_ok()
    }
}

impl fmt::Debug for EdgeNotifier {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        f.debug_struct("EdgeNotifier")
            .field("pin", &self.pin)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    static TEST_CHANNEL: Channel<CriticalSectionRawMutex, StatusEvent, STATUS_QUEUE_DEPTH> =
        Channel::new();

    #[test]
    fn notify_queues_event_for_pin() {
        let notifier = EdgeNotifier::new(7, TEST_CHANNEL.sender());
        assert!(notifier.notify());
        assert_eq!(TEST_CHANNEL.try_receive().ok(), Some(StatusEvent { pin: 7 }));
        assert!(TEST_CHANNEL.try_receive().is_err());
    }

    #[test]
    fn notify_drops_when_full() {
        static FULL: Channel<CriticalSectionRawMutex, StatusEvent, STATUS_QUEUE_DEPTH> =
            Channel::new();
        let notifier = EdgeNotifier::new(2, FULL.sender());
        for _ in 0..STATUS_QUEUE_DEPTH {
            assert!(notifier.notify());
        }
        assert!(!notifier.notify());
        assert_eq!(FULL.len(), STATUS_QUEUE_DEPTH);
    }
}
