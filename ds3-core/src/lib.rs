//! Platform-agnostic DualShock 3 host.
//!
//! This crate turns the callbacks of an L2CAP stack into a controller
//! session, without any platform-specific dependencies. It can be used both
//! in embedded `no_std` environments and on host for testing.
//!
//! # Overview
//!
//! - [`transport`]: what the core needs from the L2CAP stack ([`Transport`])
//! - [`l2cap`]: HID control/interrupt channel tracking ([`ChannelManager`])
//! - [`session`]: enable-report handshake and callback dispatch ([`Session`])
//! - [`radio`]: radio bring-up and tear-down ([`Radio`], [`bring_up`])
//! - [`host`]: the public entry point ([`Ds3Host`])
//!
//! Report decoding, encoding and diffing live in [`ds3_proto`], re-exported
//! here.
//!
//! # Connection sequence
//!
//! ```text
//! controller                      host
//!     │ connect HIDC, HIDI          │
//!     │────────────────────────────▶│ pending, ok, config request
//!     │ config both channels        │
//!     │────────────────────────────▶│ link up: send 53 F4 42 03 00 00
//!     │ first input report          │
//!     │────────────────────────────▶│ connection callback (true)
//!     │ input reports               │
//!     │────────────────────────────▶│ event callback (input, event)
//! ```
//!
//! # Features
//!
//! - **`std`**: Enable standard library support (for host testing)
//! - **`defmt`**: Log through defmt and derive `defmt::Format`
//! - **`log`**: Log through the `log` facade
//! - **`bt-classic-only`** (default) / **`bt-dual-mode`**: controller mode
//! - **`skip-sensor`**, **`skip-analog`**, **`skip-analog-changed`**:
//!   forwarded to [`ds3_proto`]

#![cfg_attr(not(feature = "std"), no_std)]

#[cfg(feature = "std")]
extern crate std;

// This mod MUST go first, so that the others see its macros.
pub(crate) mod fmt;

pub mod error;
pub mod host;
pub mod l2cap;
pub mod radio;
pub mod session;
pub mod transport;

pub use ds3_proto;

// Re-export main types at crate root
pub use error::{Ds3Error, RegisterError};
pub use host::Ds3Host;
pub use l2cap::{ChannelManager, ChannelState, L2capEvent, LinkSignal};
pub use radio::{
    bring_up, tear_down, BtMode, HostConfig, NvsError, Radio, RadioError, RadioFault, RadioStep,
    ScanMode,
};
pub use session::{Callbacks, ConnectionCallback, EventCallback, Session, SessionState};
pub use transport::{
    ChannelConfig, Cid, ConfigResult, ConnectResult, ControlLink, PeerAddr, Psm, SecurityLevel,
    SendResult, ServiceRegistration, Transport, TxBuffer, L2CAP_MIN_OFFSET,
};

pub use ds3_proto::{Buttons, Event, InputSnapshot, Leds, OutputSnapshot, Rumble, Sticks};
