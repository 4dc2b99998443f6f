//! Driver for dual-input H-bridge motor drivers (MC33926 and compatible parts)
//! on no-std embedded platforms.
//!
//! For a runnable host simulation, see the `mc33926-app/mock-mcu` binary.
#![no_std]

pub mod utils;
