//! Error types for service registration and the public API.

use crate::radio::RadioError;
use crate::transport::Psm;

/// Which half of a service registration the stack rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum RegisterError {
    /// The PSM could not be registered with L2CAP.
    Psm,
    /// The security manager refused the service.
    Security,
}

impl core::fmt::Display for RegisterError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::Psm => write!(f, "PSM registration rejected"),
            Self::Security => write!(f, "security service registration rejected"),
        }
    }
}

/// Error type for [`Ds3Host`](crate::Ds3Host) operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Ds3Error {
    /// A HID service could not be registered.
    Register { psm: Psm, cause: RegisterError },
    /// A radio bring-up, tear-down or MAC step failed.
    Radio(RadioError),
}

impl From<RadioError> for Ds3Error {
    fn from(err: RadioError) -> Self {
        Ds3Error::Radio(err)
    }
}

impl core::fmt::Display for Ds3Error {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::Register { psm, cause } => write!(f, "PSM 0x{:02x}: {}", psm.0, cause),
            Self::Radio(e) => write!(f, "radio: {}", e),
        }
    }
}
