//! Tracking of the two HID L2CAP channels.
//!
//! The controller opens HID control (PSM 0x11) and HID interrupt (PSM 0x13)
//! towards us. [`ChannelManager`] answers the stack's callbacks and folds the
//! state of both channels into a single [`LinkSignal`]: up once both are
//! configured, down as soon as either goes away.

use crate::error::Ds3Error;
use crate::transport::{
    ChannelConfig, Cid, ConfigResult, ConnectResult, ControlLink, PeerAddr, Psm,
    ServiceRegistration, Transport,
};

/// State of one channel.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ChannelState {
    #[default]
    Idle,
    /// Connect accepted, configuration not yet confirmed.
    Connecting,
    Configured,
    /// Disconnect indicated, response not yet issued.
    Disconnecting,
}

/// Aggregate link transition raised to the session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum LinkSignal {
    /// Both channels configured.
    Up,
    /// A channel left.
    Down,
}

/// Callback from the L2CAP stack, borrowed from the stack's buffers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum L2capEvent<'p> {
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
    DataIndication {
        cid: Cid,
        data: &'p [u8],
    },
    Congestion {
        cid: Cid,
        congested: bool,
    },
}

#[derive(Debug, Clone, Copy, Default)]
struct Channel {
    cid: Option<Cid>,
    state: ChannelState,
}

impl Channel {
    fn owns(&self, cid: Cid) -> bool {
        self.cid == Some(cid)
    }

    fn reset(&mut self) {
        *self = Self::default();
    }
}

/// State of the HIDC and HIDI channels.
#[derive(Debug, Default)]
pub struct ChannelManager {
    hidc: Channel,
    hidi: Channel,
    /// Configuration we request on every channel.
    config: ChannelConfig,
}

impl ChannelManager {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register both HID PSMs.
    ///
    /// HIDI is attempted even if HIDC fails. On any failure the registrations
    /// that did succeed are withdrawn and the first error is returned.
    pub fn open_services<T: Transport>(&mut self, transport: &mut T) -> Result<(), Ds3Error> {
        let mut first_error = None;
        let mut registered = [false; 2];

        for (i, service) in [ServiceRegistration::HIDC, ServiceRegistration::HIDI]
            .iter()
            .enumerate()
        {
            match transport.register(service) {
                Ok(()) => {
                    info!("l2cap: service {} registered", service.name);
                    registered[i] = true;
                }
                Err(cause) => {
                    error!("l2cap: registering service {} failed: {:?}", service.name, cause);
                    first_error.get_or_insert(Ds3Error::Register {
                        psm: service.psm,
                        cause,
                    });
                }
            }
        }

        match first_error {
            None => Ok(()),
            Some(err) => {
                if registered[0] {
                    transport.deregister(Psm::HIDC);
                }
                if registered[1] {
                    transport.deregister(Psm::HIDI);
                }
                Err(err)
            }
        }
    }

    /// Deregister both PSMs and forget both channels.
    pub fn close_services<T: Transport>(&mut self, transport: &mut T) {
        transport.deregister(Psm::HIDC);
        transport.deregister(Psm::HIDI);
        self.reset();
        info!("l2cap: services deregistered");
    }

    /// Forget both channels without touching the transport.
    pub fn reset(&mut self) {
        self.hidc.reset();
        self.hidi.reset();
    }

    fn channel_for_psm(&mut self, psm: Psm) -> Option<&mut Channel> {
        match psm {
            Psm::HIDC => Some(&mut self.hidc),
            Psm::HIDI => Some(&mut self.hidi),
            _ => None,
        }
    }

    fn channel_for_cid(&mut self, cid: Cid) -> Option<&mut Channel> {
        if self.hidc.owns(cid) {
            Some(&mut self.hidc)
        } else if self.hidi.owns(cid) {
            Some(&mut self.hidi)
        } else {
            None
        }
    }

    pub fn connect_indication<T: Transport>(
        &mut self,
        transport: &mut T,
        peer: &PeerAddr,
        psm: Psm,
        cid: Cid,
        id: u8,
    ) -> Option<LinkSignal> {
        info!("l2cap: connect_ind psm 0x{:x} cid 0x{:x} id {}", psm.0, cid, id);
        let config = self.config;
        let Some(channel) = self.channel_for_psm(psm) else {
            warn!("l2cap: connect_ind on unknown psm 0x{:x}", psm.0);
            return None;
        };
        // A reconnect replaces the old channel, which counts as leaving.
        let replaced = channel.state != ChannelState::Idle;
        if replaced {
            warn!("l2cap: psm 0x{:x} reopened without disconnect", psm.0);
        }
        channel.cid = Some(cid);
        channel.state = ChannelState::Connecting;

        transport.respond_connect(peer, id, cid, ConnectResult::Pending, ConnectResult::Pending);
        transport.respond_connect(peer, id, cid, ConnectResult::Ok, ConnectResult::Ok);
        transport.config_request(cid, &config);

        replaced.then_some(LinkSignal::Down)
    }

    pub fn connect_confirmation(&mut self, cid: Cid, result: ConnectResult) {
        info!("l2cap: connect_cfm cid 0x{:x} result {:?}", cid, result);
    }

    /// Accept whatever the peer asks for.
    pub fn config_indication<T: Transport>(
        &mut self,
        transport: &mut T,
        cid: Cid,
        config: &ChannelConfig,
    ) {
        info!("l2cap: config_ind cid 0x{:x} mtu {:?}", cid, config.mtu);
        let reply = ChannelConfig {
            result: ConfigResult::Ok,
            ..*config
        };
        transport.config_response(cid, &reply);
    }

    pub fn config_confirmation(&mut self, cid: Cid, config: &ChannelConfig) -> Option<LinkSignal> {
        info!("l2cap: config_cfm cid 0x{:x} result {:?}", cid, config.result);
        if config.result != ConfigResult::Ok {
            warn!("l2cap: cid 0x{:x} configuration refused", cid);
            return None;
        }

        let was_up = self.both_configured();
        let Some(channel) = self.channel_for_cid(cid) else {
            warn!("l2cap: config_cfm on unknown cid 0x{:x}", cid);
            return None;
        };
        channel.state = ChannelState::Configured;

        (!was_up && self.both_configured()).then_some(LinkSignal::Up)
    }

    pub fn disconnect_indication<T: Transport>(
        &mut self,
        transport: &mut T,
        cid: Cid,
        ack_needed: bool,
    ) -> Option<LinkSignal> {
        info!("l2cap: disconnect_ind cid 0x{:x} ack_needed {}", cid, ack_needed);
        let Some(channel) = self.channel_for_cid(cid) else {
            warn!("l2cap: disconnect_ind on unknown cid 0x{:x}", cid);
            return None;
        };

        if ack_needed {
            channel.state = ChannelState::Disconnecting;
            transport.disconnect_response(cid);
        }
        channel.reset();
        Some(LinkSignal::Down)
    }

    pub fn disconnect_confirmation(&mut self, cid: Cid, result: ConnectResult) -> Option<LinkSignal> {
        info!("l2cap: disconnect_cfm cid 0x{:x} result {:?}", cid, result);
        if result != ConnectResult::Ok {
            return None;
        }
        let Some(channel) = self.channel_for_cid(cid) else {
            warn!("l2cap: disconnect_cfm on unknown cid 0x{:x}", cid);
            return None;
        };
        channel.reset();
        Some(LinkSignal::Down)
    }

    /// Input payload if `data` arrived on the interrupt channel and carries
    /// more than a bare header.
    pub fn data_indication<'p>(&self, cid: Cid, data: &'p [u8]) -> Option<&'p [u8]> {
        if !self.hidi.owns(cid) {
            trace!("l2cap: data on cid 0x{:x} ignored", cid);
            return None;
        }
        if data.len() <= ds3_proto::hid::HEADER_SIZE {
            debug!("l2cap: short packet ({} bytes) dropped", data.len());
            return None;
        }
        Some(data)
    }

    pub fn congestion(&self, cid: Cid, congested: bool) {
        info!("l2cap: cid 0x{:x} congested {}", cid, congested);
    }

    /// Whether both channels are configured.
    #[must_use]
    pub fn both_configured(&self) -> bool {
        self.hidc.state == ChannelState::Configured && self.hidi.state == ChannelState::Configured
    }

    #[must_use]
    pub fn state(&self, psm: Psm) -> ChannelState {
        match psm {
            Psm::HIDC => self.hidc.state,
            Psm::HIDI => self.hidi.state,
            _ => ChannelState::Idle,
        }
    }

    /// CID of the control channel, once the controller has opened it.
    #[must_use]
    pub fn control_cid(&self) -> Option<Cid> {
        self.hidc.cid
    }

    /// Outbound path over the control channel.
    pub fn control_link<'t, T: Transport>(&self, transport: &'t mut T) -> ControlLink<'t, T> {
        ControlLink::new(transport, self.control_cid())
    }
}
