//! Serializable description of one motor channel.
//!
//! ```rust
//! use mc33926_core::utils::DriverConfig;
//! let cfg = DriverConfig::new(3, 5);
//! assert_eq!(cfg.max_output, None);
//! ```

use serde::{Deserialize, Serialize};

use crate::utils::{
    controllers::MotorDriver,
    platform::{PinId, PinIo},
};

/// Current-sense wiring: ADC pin and the voltage of a full-scale reading.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CurrentSenseConfig {
    pub pin: PinId,
    pub reference_voltage: f32,
}

/// Pin mapping and limits for one motor channel. Absent fields keep the
/// driver defaults.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DriverConfig {
    pub forward_pin: PinId,
    pub reverse_pin: PinId,
    #[serde(default)]
    pub status_pin: Option<PinId>,
    #[serde(default)]
    pub current_sense: Option<CurrentSenseConfig>,
    #[serde(default)]
    pub max_output: Option<i32>,
    #[serde(default)]
    pub write_resolution: Option<u8>,
    #[serde(default)]
    pub analog_max: Option<u16>,
}

impl DriverConfig {
    pub fn new(
        forward_pin: PinId,
        reverse_pin: PinId,
    ) -> Self {
        DriverConfig {
            forward_pin,
            reverse_pin,
            status_pin: None,
            current_sense: None,
            max_output: None,
            write_resolution: None,
            analog_max: None,
        }
    }
}

impl<IO: PinIo> MotorDriver<IO> {
    /// Build and configure a driver from `cfg`.
    pub fn from_config(
        io: IO,
        cfg: &DriverConfig,
    ) -> Self {
        let mut driver = match cfg.write_resolution {
            Some(bits) => Self::with_write_resolution(io, cfg.forward_pin, cfg.reverse_pin, bits),
            None => Self::new(io, cfg.forward_pin, cfg.reverse_pin),
        };
        if let Some(pin) = cfg.status_pin {
            driver.set_status_flag_pin(pin);
        }
        if let Some(cs) = cfg.current_sense {
            driver.set_current_sense_pin(cs.pin, cs.reference_voltage);
        }
        if let Some(analog_max) = cfg.analog_max {
            driver.set_analog_max(analog_max);
        }
        if let Some(max_output) = cfg.max_output {
            driver.set_max_pwm_output(max_output);
        }
        driver
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deserializes_minimal_config() {
        let cfg: DriverConfig =
            serde_json::from_str(r#"{"forward_pin":3,"reverse_pin":5}"#).unwrap();
        assert_eq!(cfg, DriverConfig::new(3, 5));
    }

    #[test]
    fn deserializes_full_config() {
        let cfg: DriverConfig = serde_json::from_str(
            r#"{
                "forward_pin": 9,
                "reverse_pin": 10,
                "status_pin": 2,
                "current_sense": { "pin": 14, "reference_voltage": 3.3 },
                "max_output": 4095,
                "write_resolution": 12,
                "analog_max": 4095
            }"#,
        )
        .unwrap();
        assert_eq!(cfg.status_pin, Some(2));
        assert_eq!(
            cfg.current_sense,
            Some(CurrentSenseConfig {
                pin: 14,
                reference_voltage: 3.3
            })
        );
        assert_eq!(cfg.max_output, Some(4095));
        assert_eq!(cfg.write_resolution, Some(12));
        assert_eq!(cfg.analog_max, Some(4095));
    }
}
