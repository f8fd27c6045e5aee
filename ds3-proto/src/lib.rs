//! DualShock 3 HID report types, decoding, encoding and edge diffing.
//!
//! This crate provides everything needed to talk to a DualShock 3 at the
//! report level, independent of any Bluetooth stack:
//!
//! - **Types**: controller data model
//!   - [`InputSnapshot`] - decoded input report
//!   - [`OutputSnapshot`] - rumble and LED state to transmit
//!   - [`Event`] - edges and deltas between two input snapshots
//!
//! - **Decoding**: [`parse_input()`] turns a `DATA | INPUT` packet into an
//!   [`InputSnapshot`]
//!
//! - **Encoding**: the [`Serialize`] trait for [`EnableReport`] and
//!   [`OutputReport`]
//!
//! - **Diffing**: [`diff()`] computes an [`Event`] from two snapshots
//!
//! # Example
//!
//! ```
//! use ds3_proto::{diff, parse_input, Buttons, InputSnapshot};
//!
//! let mut packet = [0u8; 50];
//! packet[0] = 0xA1;
//! packet[1] = 0x01;
//! packet[3] = 0x08; // start
//! packet[7..11].copy_from_slice(&[0x80; 4]);
//!
//! let cur = parse_input(&packet).unwrap();
//! let event = diff(&InputSnapshot::zeroed(), &cur);
//! assert_eq!(event.button_down, Buttons::START);
//! ```
//!
//! # Features
//!
//! - **`std`**: Enable standard library support (for host testing)
//! - **`defmt`**: Enable defmt formatting (for embedded logging)
//! - **`heapless`**: Enable `serialize_to_vec()` methods
//! - **`skip-sensor`**: Do not decode the motion sensors
//! - **`skip-analog`**: Do not decode the pressure-sensitive buttons
//! - **`skip-analog-changed`**: Do not compute pressure deltas in events
//!
//! # No-std Support
//!
//! This crate is `#![no_std]` by default and uses no heap allocations.

#![cfg_attr(not(feature = "std"), no_std)]

#[cfg(feature = "std")]
extern crate std;

pub mod diff;
pub mod hid;
pub mod parser;
pub mod serialize;
pub mod types;

// Re-export types at crate root for convenience
pub use diff::diff;
pub use hid::Header;
pub use parser::{parse_input, parse_report, ParseError, INPUT_REPORT_SIZE, MIN_REPORT_LEN};
pub use serialize::{
    encode_output_payload, EnableReport, OutputReport, Serialize, SerializeError,
    ENABLE_REPORT_SIZE, OUTPUT_PAYLOAD_SIZE, OUTPUT_REPORT_SIZE,
};
pub use types::{
    AnalogButtons, Battery, Buttons, Cable, Connection, Event, InputSnapshot, Leds,
    OutputSnapshot, Rumble, RumbleStatus, Sensor, Sticks, Status,
};
