//! HID-over-L2CAP transaction header.
//!
//! Every HID message starts with a transaction byte (class in the high
//! nibble, report type in the low bits) followed by a report identifier:
//!
//! ```text
//! +------+------------+-----------------+
//! | code | identifier | report bytes... |
//! +------+------------+-----------------+
//! ```

/// GET_REPORT transaction.
pub const GET_REPORT: u8 = 0x40;
/// SET_REPORT transaction.
pub const SET_REPORT: u8 = 0x50;
/// GET_PROTOCOL transaction.
pub const GET_PROTOCOL: u8 = 0x60;
/// SET_PROTOCOL transaction.
pub const SET_PROTOCOL: u8 = 0x70;
/// GET_IDLE transaction.
pub const GET_IDLE: u8 = 0x80;
/// SET_IDLE transaction.
pub const SET_IDLE: u8 = 0x90;
/// DATA transaction.
pub const DATA: u8 = 0xA0;
/// DATC transaction.
pub const DATC: u8 = 0xB0;

/// Report type: input.
pub const TYPE_INPUT: u8 = 0x01;
/// Report type: output.
pub const TYPE_OUTPUT: u8 = 0x02;
/// Report type: feature.
pub const TYPE_FEATURE: u8 = 0x03;

/// Identifier of the feature report that enables continuous reporting.
pub const ID_ENABLE: u8 = 0xF4;
/// Identifier of the control (rumble/LED) output report and the input report.
pub const ID_CONTROL: u8 = 0x01;

/// Size of the transaction header.
pub const HEADER_SIZE: usize = 2;

/// Transaction byte of inbound input reports (`DATA | INPUT`).
pub const INPUT_REPORT_CODE: u8 = DATA | TYPE_INPUT;

/// Transaction header: code plus report identifier.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Header {
    pub code: u8,
    pub identifier: u8,
}

impl Header {
    #[must_use]
    pub const fn new(code: u8, identifier: u8) -> Self {
        Self { code, identifier }
    }

    /// `SET_REPORT | FEATURE` with the enable-reporting identifier.
    pub const ENABLE_REPORT: Self = Self::new(SET_REPORT | TYPE_FEATURE, ID_ENABLE);

    /// `SET_REPORT | OUTPUT` with the control identifier.
    pub const OUTPUT_REPORT: Self = Self::new(SET_REPORT | TYPE_OUTPUT, ID_CONTROL);

    /// Read the header at the start of a packet, if there is one.
    #[must_use]
    pub fn read(packet: &[u8]) -> Option<Self> {
        match packet {
            [code, identifier, ..] => Some(Self::new(*code, *identifier)),
            _ => None,
        }
    }

    #[must_use]
    pub const fn to_bytes(self) -> [u8; HEADER_SIZE] {
        [self.code, self.identifier]
    }

    /// Whether this is an inbound `DATA | INPUT` transaction.
    #[must_use]
    pub const fn is_input_report(self) -> bool {
        self.code == INPUT_REPORT_CODE
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_command_headers() {
        assert_eq!(Header::ENABLE_REPORT.to_bytes(), [0x53, 0xF4]);
        assert_eq!(Header::OUTPUT_REPORT.to_bytes(), [0x52, 0x01]);
    }

    #[test]
    fn test_read_header() {
        let header = Header::read(&[0xA1, 0x01, 0x00]).unwrap();
        assert!(header.is_input_report());
        assert_eq!(header.identifier, ID_CONTROL);

        assert_eq!(Header::read(&[0xA1]), None);
        assert!(!Header::read(&[0xA2, 0x01]).unwrap().is_input_report());
    }
}
