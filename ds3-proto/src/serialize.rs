//! Outbound command encoding.
//!
//! This module provides the [`Serialize`] trait for the two commands the host
//! sends on the HID control channel:
//!
//! - [`EnableReport`] - `SET_REPORT | FEATURE`, asks the controller to start
//!   streaming input reports
//! - [`OutputReport`] - `SET_REPORT | OUTPUT`, carries rumble and LED state
//!
//! # Output payload
//!
//! ```text
//! offset  size  contents
//!   0      1    0x00
//!   1      4    right duration, right intensity, left duration, left intensity
//!   5      4    0x00
//!   9      1    LED mask (bits 1..=4)
//!  10     20    FF 27 10 00 32, once per lamp
//!  30     18    0x00
//! ```
//!
//! # Example
//!
//! ```
//! use ds3_proto::{Leds, OutputReport, OutputSnapshot, Serialize};
//!
//! let output = OutputSnapshot { leds: Leds::LED2, ..Default::default() };
//! let mut buf = [0u8; 64];
//! let len = OutputReport(output).serialize(&mut buf).unwrap();
//!
//! assert_eq!(len, 50);
//! assert_eq!(&buf[..2], &[0x52, 0x01]);
//! assert_eq!(buf[2 + 9], 0x04);
//! ```

use crate::hid::{Header, HEADER_SIZE};
use crate::types::{Leds, OutputSnapshot, Rumble};

/// Size of the output report payload.
pub const OUTPUT_PAYLOAD_SIZE: usize = 48;

/// Size of a serialized output report, header included.
pub const OUTPUT_REPORT_SIZE: usize = HEADER_SIZE + OUTPUT_PAYLOAD_SIZE;

/// Payload of the enable-reporting feature report.
pub const ENABLE_PAYLOAD: [u8; 4] = [0x42, 0x03, 0x00, 0x00];

/// Size of a serialized enable-reporting command, header included.
pub const ENABLE_REPORT_SIZE: usize = HEADER_SIZE + ENABLE_PAYLOAD.len();

/// Per-lamp timing block repeated for each of the four lamps.
pub const LED_TIMING: [u8; 5] = [0xFF, 0x27, 0x10, 0x00, 0x32];

const RUMBLE: usize = 1;
const LED_MASK: usize = 9;
const LED_TIMING_START: usize = 10;
const LED_TIMING_END: usize = LED_TIMING_START + 4 * LED_TIMING.len();

/// Error type for serialization operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum SerializeError {
    /// The output buffer is too small to hold the serialized command.
    BufferTooSmall,
}

impl core::fmt::Display for SerializeError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::BufferTooSmall => write!(f, "buffer too small"),
        }
    }
}

/// Encode rumble and LED state into the 48-byte output payload.
#[must_use]
pub fn encode_output_payload(output: &OutputSnapshot) -> [u8; OUTPUT_PAYLOAD_SIZE] {
    let mut payload = [0u8; OUTPUT_PAYLOAD_SIZE];
    let r = output.rumble;
    payload[RUMBLE..RUMBLE + 4].copy_from_slice(&[
        r.right_duration,
        r.right_intensity,
        r.left_duration,
        r.left_intensity,
    ]);
    payload[LED_MASK] = output.leds.raw();
    for block in payload[LED_TIMING_START..LED_TIMING_END].chunks_exact_mut(LED_TIMING.len()) {
        block.copy_from_slice(&LED_TIMING);
    }
    payload
}

impl OutputSnapshot {
    /// Recover rumble and LED state from an output payload.
    ///
    /// Reserved and timing bytes are ignored.
    #[must_use]
    pub fn decode(payload: &[u8; OUTPUT_PAYLOAD_SIZE]) -> Self {
        Self {
            rumble: Rumble::new(
                payload[RUMBLE],
                payload[RUMBLE + 1],
                payload[RUMBLE + 2],
                payload[RUMBLE + 3],
            ),
            leds: Leds::from_raw(payload[LED_MASK]),
        }
    }
}

/// `SET_REPORT | FEATURE` command that starts input streaming.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct EnableReport;

/// `SET_REPORT | OUTPUT` command carrying an output snapshot.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct OutputReport(pub OutputSnapshot);

/// Extension trait for serializing HID commands.
pub trait Serialize {
    /// Bytes written by [`serialize`](Self::serialize).
    const SIZE: usize;

    /// Serialize to the provided buffer.
    ///
    /// Returns the number of bytes written on success.
    ///
    /// # Errors
    ///
    /// Returns [`SerializeError::BufferTooSmall`] if the buffer is not large enough.
    fn serialize(&self, buf: &mut [u8]) -> Result<usize, SerializeError>;

    /// Serialize to a `heapless::Vec`.
    ///
    /// # Errors
    ///
    /// Returns [`SerializeError::BufferTooSmall`] if `N` is not large enough.
    #[cfg(feature = "heapless")]
    fn serialize_to_vec<const N: usize>(&self) -> Result<heapless::Vec<u8, N>, SerializeError> {
        let mut vec = heapless::Vec::new();
        vec.resize(N, 0)
            .map_err(|_| SerializeError::BufferTooSmall)?;
        let len = self.serialize(&mut vec)?;
        vec.truncate(len);
        Ok(vec)
    }
}

impl Serialize for EnableReport {
    const SIZE: usize = ENABLE_REPORT_SIZE;

    fn serialize(&self, buf: &mut [u8]) -> Result<usize, SerializeError> {
        let out = buf
            .get_mut(..Self::SIZE)
            .ok_or(SerializeError::BufferTooSmall)?;
        out[..HEADER_SIZE].copy_from_slice(&Header::ENABLE_REPORT.to_bytes());
        out[HEADER_SIZE..].copy_from_slice(&ENABLE_PAYLOAD);
        Ok(Self::SIZE)
    }
}

impl Serialize for OutputReport {
    const SIZE: usize = OUTPUT_REPORT_SIZE;

    fn serialize(&self, buf: &mut [u8]) -> Result<usize, SerializeError> {
        let out = buf
            .get_mut(..Self::SIZE)
            .ok_or(SerializeError::BufferTooSmall)?;
        out[..HEADER_SIZE].copy_from_slice(&Header::OUTPUT_REPORT.to_bytes());
        out[HEADER_SIZE..].copy_from_slice(&encode_output_payload(&self.0));
        Ok(Self::SIZE)
    }
}
