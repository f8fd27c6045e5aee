//! Contract with the external L2CAP stack.
//!
//! The core never touches the radio directly. Everything it needs from the
//! Bluetooth host stack goes through [`Transport`]; everything the stack
//! reports back arrives as an [`L2capEvent`](crate::l2cap::L2capEvent).

use ds3_proto::{Serialize, OUTPUT_REPORT_SIZE};

use crate::error::RegisterError;

/// L2CAP channel identifier.
pub type Cid = u16;

/// Headroom the lower layers need in front of every outbound payload.
pub const L2CAP_MIN_OFFSET: usize = 13;

/// Largest payload the core ever sends.
pub const MAX_TX_PAYLOAD: usize = OUTPUT_REPORT_SIZE;

/// Protocol/Service Multiplexer.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Psm(pub u16);

impl Psm {
    /// HID control channel.
    pub const HIDC: Self = Self(0x11);
    /// HID interrupt channel.
    pub const HIDI: Self = Self(0x13);
}

/// Bluetooth device address of the remote side.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct PeerAddr(pub [u8; 6]);

/// Security level requested from the security manager.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum SecurityLevel {
    #[default]
    None,
    Authenticate,
    Encrypt,
}

/// Base of the security-manager service ids free for applications.
pub const SEC_SERVICE_FIRST_EMPTY: u8 = 51;

/// One PSM registration: the PSM itself plus its security service.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct ServiceRegistration {
    pub name: &'static str,
    pub psm: Psm,
    pub service_id: u8,
    pub security: SecurityLevel,
}

impl ServiceRegistration {
    pub const HIDC: Self = Self {
        name: "PS3-HIDC",
        psm: Psm::HIDC,
        service_id: SEC_SERVICE_FIRST_EMPTY,
        security: SecurityLevel::None,
    };

    pub const HIDI: Self = Self {
        name: "PS3-HIDI",
        psm: Psm::HIDI,
        service_id: SEC_SERVICE_FIRST_EMPTY + 1,
        security: SecurityLevel::None,
    };
}

/// Result codes of a connect response or a disconnect confirmation.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ConnectResult {
    Ok,
    Pending,
    /// Any other result code reported by the stack.
    Refused(u16),
}

/// Result carried by a channel configuration.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ConfigResult {
    #[default]
    Ok,
    UnacceptableParams,
    Rejected,
    UnknownOptions,
}

/// Channel configuration exchanged during setup.
///
/// Only the fields the core looks at are modelled; `None` means the option
/// is absent.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct ChannelConfig {
    pub result: ConfigResult,
    pub mtu: Option<u16>,
    pub flush_timeout: Option<u16>,
}

/// Outcome of handing a buffer to the stack.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum SendResult {
    Success,
    Congested,
    Failed,
}

/// Outbound buffer with headroom reserved for lower-layer headers.
///
/// Ownership passes to the transport on [`Transport::send`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TxBuffer {
    data: [u8; L2CAP_MIN_OFFSET + MAX_TX_PAYLOAD],
    len: usize,
}

impl Default for TxBuffer {
    fn default() -> Self {
        Self::new()
    }
}

impl TxBuffer {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            data: [0; L2CAP_MIN_OFFSET + MAX_TX_PAYLOAD],
            len: 0,
        }
    }

    /// Offset of the payload inside the buffer.
    #[must_use]
    pub const fn offset(&self) -> usize {
        L2CAP_MIN_OFFSET
    }

    /// Serialize a command into the payload area.
    pub fn fill<S: Serialize>(&mut self, command: &S) -> Result<usize, ds3_proto::SerializeError> {
        let len = command.serialize(&mut self.data[L2CAP_MIN_OFFSET..])?;
        self.len = len;
        Ok(len)
    }

    /// Payload bytes, headroom excluded.
    #[must_use]
    pub fn payload(&self) -> &[u8] {
        &self.data[L2CAP_MIN_OFFSET..L2CAP_MIN_OFFSET + self.len]
    }

    /// Whole buffer including the headroom in front of the payload.
    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        &self.data[..L2CAP_MIN_OFFSET + self.len]
    }

    /// Mutable access to the headroom, for the stack to write its headers.
    pub fn headroom_mut(&mut self) -> &mut [u8] {
        &mut self.data[..L2CAP_MIN_OFFSET]
    }
}

/// Operations the core needs from the L2CAP stack.
///
/// Implementations forward to the concrete Bluetooth host stack. Every call is
/// made from the single dispatch context.
pub trait Transport {
    /// Register a PSM for incoming connections together with its security
    /// service.
    fn register(&mut self, service: &ServiceRegistration) -> Result<(), RegisterError>;

    /// Stop accepting connections on a PSM.
    fn deregister(&mut self, psm: Psm);

    /// Answer a connect indication.
    fn respond_connect(
        &mut self,
        peer: &PeerAddr,
        id: u8,
        cid: Cid,
        result: ConnectResult,
        status: ConnectResult,
    );

    /// Send our configuration request for a channel.
    fn config_request(&mut self, cid: Cid, config: &ChannelConfig);

    /// Answer the peer's configuration request.
    fn config_response(&mut self, cid: Cid, config: &ChannelConfig);

    /// Acknowledge a disconnect indication.
    fn disconnect_response(&mut self, cid: Cid);

    /// Allocate an outbound buffer, `None` if the pool is exhausted.
    fn alloc_buffer(&mut self) -> Option<TxBuffer>;

    /// Hand a filled buffer to the stack.
    fn send(&mut self, cid: Cid, buffer: TxBuffer) -> SendResult;
}

/// Outbound path to the controller over the HID control channel.
pub struct ControlLink<'t, T: Transport> {
    transport: &'t mut T,
    cid: Option<Cid>,
}

impl<'t, T: Transport> ControlLink<'t, T> {
    pub fn new(transport: &'t mut T, cid: Option<Cid>) -> Self {
        Self { transport, cid }
    }

    /// Encode a command into a fresh buffer and send it.
    ///
    /// Every outcome is logged. Nothing is retried.
    pub fn send<S: Serialize>(&mut self, command: &S) -> SendResult {
        let Some(cid) = self.cid else {
            error!("send: control channel not connected");
            return SendResult::Failed;
        };

        let Some(mut buffer) = self.transport.alloc_buffer() else {
            error!("send: buffer allocation failed");
            return SendResult::Failed;
        };

        if let Err(e) = buffer.fill(command) {
            error!("send: encode failed: {:?}", e);
            return SendResult::Failed;
        }

        let result = self.transport.send(cid, buffer);
        match result {
            SendResult::Success => info!("send: cid 0x{:x} success", cid),
            SendResult::Congested => warn!("send: cid 0x{:x} congested", cid),
            SendResult::Failed => error!("send: cid 0x{:x} failed", cid),
        }
        result
    }
}

#[cfg(test)]
pub(crate) mod mock {
    //! Recording transport shared by the tests of this crate.

    extern crate std;

    use super::*;
    use std::cell::RefCell;
    use std::rc::Rc;
    use std::vec::Vec;

    #[derive(Clone, Debug, PartialEq, Eq)]
    pub enum Call {
        Register(Psm),
        Deregister(Psm),
        RespondConnect(Cid, ConnectResult, ConnectResult),
        ConfigRequest(Cid),
        ConfigResponse(Cid, ChannelConfig),
        DisconnectResponse(Cid),
        Send(Cid, Vec<u8>),
    }

    #[derive(Clone, Default)]
    pub struct MockTransport {
        pub calls: Rc<RefCell<Vec<Call>>>,
        pub reject: Option<(Psm, RegisterError)>,
        pub out_of_buffers: bool,
        pub send_result: Option<SendResult>,
    }

    impl MockTransport {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn calls(&self) -> Vec<Call> {
            self.calls.borrow().clone()
        }

        pub fn sent(&self) -> Vec<Vec<u8>> {
            self.calls
                .borrow()
                .iter()
                .filter_map(|c| match c {
                    Call::Send(_, bytes) => Some(bytes.clone()),
                    _ => None,
                })
                .collect()
        }

        pub fn clear(&self) {
            self.calls.borrow_mut().clear();
        }
    }

    impl Transport for MockTransport {
        fn register(&mut self, service: &ServiceRegistration) -> Result<(), RegisterError> {
            self.calls.borrow_mut().push(Call::Register(service.psm));
            match self.reject {
                Some((psm, e)) if psm == service.psm => Err(e),
                _ => Ok(()),
            }
        }

        fn deregister(&mut self, psm: Psm) {
            self.calls.borrow_mut().push(Call::Deregister(psm));
        }

        fn respond_connect(
            &mut self,
            _peer: &PeerAddr,
            _id: u8,
            cid: Cid,
            result: ConnectResult,
            status: ConnectResult,
        ) {
            self.calls
                .borrow_mut()
                .push(Call::RespondConnect(cid, result, status));
        }

        fn config_request(&mut self, cid: Cid, _config: &ChannelConfig) {
            self.calls.borrow_mut().push(Call::ConfigRequest(cid));
        }

        fn config_response(&mut self, cid: Cid, config: &ChannelConfig) {
            self.calls
                .borrow_mut()
                .push(Call::ConfigResponse(cid, *config));
        }

        fn disconnect_response(&mut self, cid: Cid) {
            self.calls.borrow_mut().push(Call::DisconnectResponse(cid));
        }

        fn alloc_buffer(&mut self) -> Option<TxBuffer> {
            if self.out_of_buffers {
                None
            } else {
                Some(TxBuffer::new())
            }
        }

        fn send(&mut self, cid: Cid, buffer: TxBuffer) -> SendResult {
            self.calls
                .borrow_mut()
                .push(Call::Send(cid, buffer.payload().to_vec()));
            self.send_result.unwrap_or(SendResult::Success)
        }
    }
}
