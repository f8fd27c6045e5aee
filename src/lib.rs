//! Bluetooth host for DualShock 3 controllers.
//!
//! The radio raises L2CAP callbacks in its own context. This crate queues
//! them as owned [`RadioEvent`]s and drains the queue on one task with
//! [`Ds3Bridge`], which feeds them into a [`ds3_core::Ds3Host`].
//!
//! ```ignore
//! static EVENTS: EventChannel<CriticalSectionRawMutex, 16> = Channel::new();
//!
//! // radio callback context
//! post(&EVENTS.sender(), RadioEvent::data(cid, bytes)?);
//!
//! // host task
//! let mut host = Ds3Host::new(transport, radio, HostConfig::default());
//! host.init()?;
//! Ds3Bridge::new(ChannelEventSource::new(EVENTS.receiver()), host).run().await
//! ```

#![cfg_attr(not(feature = "std"), no_std)]

#[cfg(feature = "std")]
extern crate std;

// This mod MUST go first, so that the others see its macros.
pub(crate) mod fmt;

pub mod bridge;
pub mod input;

pub use bridge::{BridgeError, Ds3Bridge};
pub use ds3_core;
pub use input::{post, ChannelEventSource, EventChannel, EventSource, InputError, RadioEvent};
