//! Input report decoding.
//!
//! Inbound reports arrive on the HID interrupt channel as a `DATA | INPUT`
//! transaction. The report that follows the two-byte header has this layout
//! (offsets relative to the first byte after the header):
//!
//! | Offset | Size | Contents |
//! |---|---|---|
//! | 0  | 1  | unused |
//! | 1  | 3  | buttons, 24-bit little endian, 17 bits used |
//! | 4  | 1  | unused |
//! | 5  | 4  | sticks `lx ly rx ry`, unsigned, centred at 128 |
//! | 9  | 4  | unused |
//! | 13 | 12 | pressure-sensitive buttons |
//! | 25 | 3  | unused |
//! | 28 | 3  | status: cable, battery, connection/rumble bits |
//! | 31 | 9  | unused |
//! | 40 | 8  | sensors `ax ay az gz`, 16-bit big endian, centred at 32768 |

use crate::hid::{Header, HEADER_SIZE};
use crate::types::{Buttons, InputSnapshot, Status, Sticks};
#[cfg(not(feature = "skip-analog"))]
use crate::types::AnalogButtons;
#[cfg(not(feature = "skip-sensor"))]
use crate::types::Sensor;

const BUTTONS: usize = 1;
const STICKS: usize = 5;
#[cfg(not(feature = "skip-analog"))]
const ANALOG: usize = 13;
const STATUS: usize = 28;
#[cfg(not(feature = "skip-sensor"))]
const SENSOR: usize = 40;

/// Size of a complete input report, header excluded.
pub const INPUT_REPORT_SIZE: usize = 48;

/// Report bytes that must be present for the enabled fields to decode.
#[cfg(not(feature = "skip-sensor"))]
pub const MIN_REPORT_LEN: usize = SENSOR + 8;
/// Report bytes that must be present for the enabled fields to decode.
#[cfg(feature = "skip-sensor")]
pub const MIN_REPORT_LEN: usize = STATUS + 3;

/// Stick zero point on the wire.
const STICK_BIAS: u8 = 0x80;
/// Sensor zero point on the wire.
#[cfg(not(feature = "skip-sensor"))]
const SENSOR_BIAS: u16 = 0x8000;

/// Error type for input decoding.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ParseError {
    /// The transaction byte is not `DATA | INPUT`.
    NotInputReport,
    /// The packet ends before the last decoded field.
    Truncated,
}

impl core::fmt::Display for ParseError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::NotInputReport => write!(f, "not an input report"),
            Self::Truncated => write!(f, "input report truncated"),
        }
    }
}

/// Decode a full HID packet (header included) into an input snapshot.
///
/// Only `DATA | INPUT` transactions are accepted; the identifier byte is not
/// checked.
///
/// # Example
///
/// ```
/// use ds3_proto::{parse_input, Buttons};
///
/// let mut packet = [0u8; 50];
/// packet[0] = 0xA1;
/// packet[1] = 0x01;
/// packet[4] = 0x40; // cross
/// packet[7..11].copy_from_slice(&[0x80, 0x80, 0x80, 0x80]);
///
/// let input = parse_input(&packet).unwrap();
/// assert!(input.buttons.is_pressed(Buttons::CROSS));
/// assert_eq!(input.sticks.lx, 0);
/// ```
pub fn parse_input(packet: &[u8]) -> Result<InputSnapshot, ParseError> {
    let header = Header::read(packet).ok_or(ParseError::Truncated)?;
    if !header.is_input_report() {
        return Err(ParseError::NotInputReport);
    }
    parse_report(&packet[HEADER_SIZE..])
}

/// Decode the report bytes that follow the transaction header.
pub fn parse_report(report: &[u8]) -> Result<InputSnapshot, ParseError> {
    if report.len() < MIN_REPORT_LEN {
        return Err(ParseError::Truncated);
    }

    Ok(InputSnapshot {
        buttons: parse_buttons(report),
        sticks: parse_sticks(report),
        #[cfg(not(feature = "skip-analog"))]
        analog: parse_analog(report),
        status: Status::from_bytes(report[STATUS], report[STATUS + 1], report[STATUS + 2]),
        #[cfg(not(feature = "skip-sensor"))]
        sensor: parse_sensor(report),
    })
}

#[inline]
fn parse_buttons(report: &[u8]) -> Buttons {
    let raw = u32::from_le_bytes([
        report[BUTTONS],
        report[BUTTONS + 1],
        report[BUTTONS + 2],
        0,
    ]);
    Buttons::from_raw(raw)
}

#[inline]
fn parse_sticks(report: &[u8]) -> Sticks {
    let axis = |i: usize| report[STICKS + i].wrapping_sub(STICK_BIAS) as i8;
    Sticks::new(axis(0), axis(1), axis(2), axis(3))
}

#[cfg(not(feature = "skip-analog"))]
#[inline]
fn parse_analog(report: &[u8]) -> AnalogButtons {
    let mut values = [0u8; 12];
    values.copy_from_slice(&report[ANALOG..ANALOG + 12]);
    AnalogButtons::from_array(values)
}

#[cfg(not(feature = "skip-sensor"))]
#[inline]
fn parse_sensor(report: &[u8]) -> Sensor {
    let axis = |i: usize| {
        let at = SENSOR + i * 2;
        u16::from_be_bytes([report[at], report[at + 1]]).wrapping_sub(SENSOR_BIAS) as i16
    };
    Sensor {
        ax: axis(0),
        ay: axis(1),
        az: axis(2),
        gz: axis(3),
    }
}
