//! Control core for the BenchFox dual-rail bench supply.
//!
//! Everything timing-, bit- and numerically-precise lives here: front-panel
//! input capture (quadrature decode, button debounce), the SPI command
//! protocols for the MCP4922 DAC and MCP3204 ADC, the millivolt↔code
//! calibration mappings, the output-enable state machine and the shared
//! state handed from the input tick context to the control loop.
//!
//! This crate is `no_std` and free of HAL types (converter drivers are
//! written against `embedded-hal` traits) so the whole of it is testable on
//! the host via `cargo test`.

#![no_std]

#[cfg(test)]
extern crate std;

pub mod calibration;
pub mod input;
pub mod mcp3204;
pub mod mcp4922;
pub mod output;
pub mod shared;
