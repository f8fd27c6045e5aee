use core::future::Future;

use ds3_core::{
    ChannelConfig, Cid, ConnectResult, L2capEvent, PeerAddr, Psm,
};
use heapless::Vec;

/// Largest inbound packet kept by [`RadioEvent::Data`].
pub const MAX_PACKET: usize = 64;

/// Error type for event sources.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum InputError {
    /// The radio glue stopped delivering events.
    Disconnected,
    /// Inbound packet larger than [`MAX_PACKET`].
    PacketTooLarge,
}

impl core::fmt::Display for InputError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::Disconnected => write!(f, "event source disconnected"),
            Self::PacketTooLarge => write!(f, "packet too large"),
        }
    }
}

/// Owned copy of an L2CAP callback, so it can cross from the radio's
/// callback context to the task that runs the host.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum RadioEvent {
    ConnectIndication {
        peer: PeerAddr,
        cid: Cid,
        psm: Psm,
        id: u8,
    },
    ConnectConfirmation {
        cid: Cid,
        result: ConnectResult,
    },
    ConfigIndication {
        cid: Cid,
        config: ChannelConfig,
    },
    ConfigConfirmation {
        cid: Cid,
        config: ChannelConfig,
    },
    DisconnectIndication {
        cid: Cid,
        ack_needed: bool,
    },
    DisconnectConfirmation {
        cid: Cid,
        result: ConnectResult,
    },
    Data {
        cid: Cid,
        packet: Vec<u8, MAX_PACKET>,
    },
    Congestion {
        cid: Cid,
        congested: bool,
    },
}

impl RadioEvent {
    /// Copy an inbound packet out of the stack's buffer.
    pub fn data(cid: Cid, data: &[u8]) -> Result<Self, InputError> {
        let packet = Vec::from_slice(data).map_err(|_| InputError::PacketTooLarge)?;
        Ok(Self::Data { cid, packet })
    }

    /// Borrowed view for [`Ds3Host::handle_event`](ds3_core::Ds3Host::handle_event).
    #[must_use]
    pub fn as_l2cap(&self) -> L2capEvent<'_> {
        match self {
            Self::ConnectIndication { peer, cid, psm, id } => L2capEvent::ConnectIndication {
                peer: *peer,
                cid: *cid,
                psm: *psm,
                id: *id,
            },
            Self::ConnectConfirmation { cid, result } => L2capEvent::ConnectConfirmation {
                cid: *cid,
                result: *result,
            },
            Self::ConfigIndication { cid, config } => L2capEvent::ConfigIndication {
                cid: *cid,
                config: *config,
            },
            Self::ConfigConfirmation { cid, config } => L2capEvent::ConfigConfirmation {
                cid: *cid,
                config: *config,
            },
            Self::DisconnectIndication { cid, ack_needed } => L2capEvent::DisconnectIndication {
                cid: *cid,
                ack_needed: *ack_needed,
            },
            Self::DisconnectConfirmation { cid, result } => L2capEvent::DisconnectConfirmation {
                cid: *cid,
                result: *result,
            },
            Self::Data { cid, packet } => L2capEvent::DataIndication {
                cid: *cid,
                data: packet,
            },
            Self::Congestion { cid, congested } => L2capEvent::Congestion {
                cid: *cid,
                congested: *congested,
            },
        }
    }
}

/// Async trait for sources of L2CAP events.
///
/// This trait abstracts how the radio's callbacks reach the task that owns
/// the [`Ds3Host`](ds3_core::Ds3Host), allowing a queue, a mock or a direct
/// stack binding to be used interchangeably.
///
/// # `no_std` Compatibility
///
/// All implementations must be `#![no_std]` compatible with no heap allocation.
pub trait EventSource {
    /// Wait for and receive the next event.
    fn receive(&mut self) -> impl Future<Output = Result<RadioEvent, InputError>>;

    /// Check if the source is still delivering events.
    fn is_connected(&self) -> bool;
}
