//! Utility re-exports for the MC33926 driver.
//!
//! - `config`: serde-described channel configuration
//! - `controllers`: the motor driver, status notification channel and the
//!   embedded-hal adapter
//! - `platform`: the pin I/O capability set the driver is written against

pub mod config;
pub mod controllers;
pub mod platform;

pub use config::{CurrentSenseConfig, DriverConfig};
pub use controllers::{MotorDriver, STATUS_CHANNEL};
pub use platform::{PinId, PinIo, PinMode};
