use ds3_core::{Ds3Host, Radio, Transport};

use crate::input::{EventSource, InputError};

/// A bridge that feeds L2CAP events from an event source into a [`Ds3Host`].
///
/// All host callbacks run on the task that drives the bridge, so the host
/// sees a single dispatch context no matter where the radio raised the
/// events.
///
/// # Error Handling
///
/// If the source reports [`InputError::Disconnected`] the bridge forces the
/// link down so the user is told the controller is gone.
pub struct Ds3Bridge<'a, S, T, R> {
    source: S,
    host: Ds3Host<'a, T, R>,
}

impl<'a, S: EventSource, T: Transport, R: Radio> Ds3Bridge<'a, S, T, R> {
    /// Create a new bridge from an event source and a host.
    pub fn new(source: S, host: Ds3Host<'a, T, R>) -> Self {
        Self { source, host }
    }

    /// Run the bridge, dispatching events indefinitely.
    ///
    /// This method never returns under normal operation.
    pub async fn run(&mut self) -> ! {
        loop {
            let _ = self.process_one().await;
        }
    }

    /// Receive one event and dispatch it into the host.
    ///
    /// Returns the result of the operation for testing purposes.
    pub async fn process_one(&mut self) -> Result<(), BridgeError> {
        match self.source.receive().await {
            Ok(event) => {
                trace!("event: {:?}", event);
                self.host.handle_event(event.as_l2cap());
                Ok(())
            }
            Err(e) => {
                error!("event source error: {:?}", e);
                if e == InputError::Disconnected {
                    self.host.force_link_down();
                }
                Err(BridgeError::Input(e))
            }
        }
    }

    /// Get a reference to the event source.
    pub fn source(&self) -> &S {
        &self.source
    }

    /// Get a mutable reference to the event source.
    pub fn source_mut(&mut self) -> &mut S {
        &mut self.source
    }

    /// Get a reference to the host.
    pub fn host(&self) -> &Ds3Host<'a, T, R> {
        &self.host
    }

    /// Get a mutable reference to the host, e.g. to set LEDs.
    pub fn host_mut(&mut self) -> &mut Ds3Host<'a, T, R> {
        &mut self.host
    }

    /// Decompose the bridge into its source and host.
    pub fn into_parts(self) -> (S, Ds3Host<'a, T, R>) {
        (self.source, self.host)
    }
}

/// Error type for bridge operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum BridgeError {
    /// Error from the event source.
    Input(InputError),
}

#[cfg(test)]
mod tests {
    extern crate std;

    use super::*;
    use crate::input::RadioEvent;
    use ds3_core::{
        BtMode, ChannelConfig, Cid, HostConfig, NvsError, PeerAddr, Psm, RadioFault,
        RegisterError, ScanMode, SendResult, ServiceRegistration, TxBuffer,
    };
    use embassy_futures::block_on;
    use std::cell::RefCell;
    use std::collections::VecDeque;
    use std::rc::Rc;
    use std::vec;
    use std::vec::Vec;

    const HIDC_CID: Cid = 0x40;
    const HIDI_CID: Cid = 0x41;

    // Scripted event source
    struct MockSource {
        events: VecDeque<Result<RadioEvent, InputError>>,
    }

    impl MockSource {
        fn new(events: Vec<Result<RadioEvent, InputError>>) -> Self {
            Self {
                events: events.into(),
            }
        }
    }

    impl EventSource for MockSource {
        fn receive(&mut self) -> impl core::future::Future<Output = Result<RadioEvent, InputError>> {
            let result = self
                .events
                .pop_front()
                .unwrap_or(Err(InputError::Disconnected));
            core::future::ready(result)
        }

        fn is_connected(&self) -> bool {
            !self.events.is_empty()
        }
    }

    // Transport recording outbound payloads
    #[derive(Default)]
    struct MockTransport {
        sent: Rc<RefCell<Vec<Vec<u8>>>>,
    }

    impl Transport for MockTransport {
        fn register(&mut self, _: &ServiceRegistration) -> Result<(), RegisterError> {
            Ok(())
        }
        fn deregister(&mut self, _: Psm) {}
        fn respond_connect(
            &mut self,
            _: &PeerAddr,
            _: u8,
            _: Cid,
            _: ds3_core::ConnectResult,
            _: ds3_core::ConnectResult,
        ) {
        }
        fn config_request(&mut self, _: Cid, _: &ChannelConfig) {}
        fn config_response(&mut self, _: Cid, _: &ChannelConfig) {}
        fn disconnect_response(&mut self, _: Cid) {}
        fn alloc_buffer(&mut self) -> Option<TxBuffer> {
            Some(TxBuffer::new())
        }
        fn send(&mut self, _: Cid, buffer: TxBuffer) -> SendResult {
            self.sent.borrow_mut().push(buffer.payload().to_vec());
            SendResult::Success
        }
    }

    // Radio where every step succeeds
    struct NullRadio;

    impl Radio for NullRadio {
        fn nvs_init(&mut self) -> Result<(), NvsError> {
            Ok(())
        }
        fn nvs_erase(&mut self) -> Result<(), RadioFault> {
            Ok(())
        }
        fn release_ble_memory(&mut self) -> Result<(), RadioFault> {
            Ok(())
        }
        fn controller_init(&mut self) -> Result<(), RadioFault> {
            Ok(())
        }
        fn controller_enable(&mut self, _: BtMode) -> Result<(), RadioFault> {
            Ok(())
        }
        fn controller_disable(&mut self) -> Result<(), RadioFault> {
            Ok(())
        }
        fn controller_deinit(&mut self) -> Result<(), RadioFault> {
            Ok(())
        }
        fn host_init(&mut self) -> Result<(), RadioFault> {
            Ok(())
        }
        fn host_enable(&mut self) -> Result<(), RadioFault> {
            Ok(())
        }
        fn host_disable(&mut self) -> Result<(), RadioFault> {
            Ok(())
        }
        fn host_deinit(&mut self) -> Result<(), RadioFault> {
            Ok(())
        }
        fn set_device_name(&mut self, _: &str) -> Result<(), RadioFault> {
            Ok(())
        }
        fn set_scan_mode(&mut self, _: ScanMode) -> Result<(), RadioFault> {
            Ok(())
        }
        fn set_base_mac(&mut self, _: &[u8; 6]) -> Result<(), RadioFault> {
            Ok(())
        }
    }

    fn link_up_events() -> Vec<Result<RadioEvent, InputError>> {
        let ok = ChannelConfig::default();
        vec![
            Ok(RadioEvent::ConnectIndication {
                peer: PeerAddr::default(),
                cid: HIDC_CID,
                psm: Psm::HIDC,
                id: 1,
            }),
            Ok(RadioEvent::ConnectIndication {
                peer: PeerAddr::default(),
                cid: HIDI_CID,
                psm: Psm::HIDI,
                id: 2,
            }),
            Ok(RadioEvent::ConfigConfirmation { cid: HIDC_CID, config: ok }),
            Ok(RadioEvent::ConfigConfirmation { cid: HIDI_CID, config: ok }),
        ]
    }

    fn report() -> RadioEvent {
        let mut packet = [0u8; 50];
        packet[0] = 0xA1;
        packet[1] = 0x01;
        packet[7..11].copy_from_slice(&[0x80; 4]);
        RadioEvent::data(HIDI_CID, &packet).unwrap()
    }

    fn host<'a>(transport: MockTransport) -> Ds3Host<'a, MockTransport, NullRadio> {
        let mut host = Ds3Host::new(transport, NullRadio, HostConfig::default());
        host.init().unwrap();
        host
    }

    #[test]
    fn test_bridge_dispatches_into_host() {
        let mut events = link_up_events();
        events.push(Ok(report()));

        let transport = MockTransport::default();
        let sent = transport.sent.clone();
        let mut bridge = Ds3Bridge::new(MockSource::new(events), host(transport));

        for _ in 0..4 {
            assert!(block_on(bridge.process_one()).is_ok());
        }
        assert_eq!(
            *sent.borrow(),
            vec![vec![0x53, 0xF4, 0x42, 0x03, 0x00, 0x00]]
        );
        assert!(!bridge.host().is_connected());

        assert!(block_on(bridge.process_one()).is_ok());
        assert!(bridge.host().is_connected());
    }

    #[test]
    fn test_bridge_forces_link_down_on_disconnect() {
        let connections = RefCell::new(Vec::new());
        let mut on_connection = |c: bool| connections.borrow_mut().push(c);

        let mut events = link_up_events();
        events.push(Ok(report()));
        events.push(Err(InputError::Disconnected));

        let mut host = host(MockTransport::default());
        host.set_connection_handler(&mut on_connection);
        let mut bridge = Ds3Bridge::new(MockSource::new(events), host);

        for _ in 0..5 {
            assert!(block_on(bridge.process_one()).is_ok());
        }
        let result = block_on(bridge.process_one());
        assert!(matches!(
            result,
            Err(BridgeError::Input(InputError::Disconnected))
        ));
        assert!(!bridge.host().is_connected());

        drop(bridge);
        assert_eq!(connections.into_inner(), vec![true, false]);
    }

    #[test]
    fn test_bridge_keeps_link_on_other_errors() {
        let mut events = link_up_events();
        events.push(Ok(report()));
        events.push(Err(InputError::PacketTooLarge));

        let mut bridge = Ds3Bridge::new(MockSource::new(events), host(MockTransport::default()));
        for _ in 0..5 {
            assert!(block_on(bridge.process_one()).is_ok());
        }
        assert!(block_on(bridge.process_one()).is_err());
        assert!(bridge.host().is_connected());
    }

    #[test]
    fn test_bridge_host_mut_sends() {
        let transport = MockTransport::default();
        let sent = transport.sent.clone();
        let mut bridge = Ds3Bridge::new(MockSource::new(link_up_events()), host(transport));
        for _ in 0..4 {
            block_on(bridge.process_one()).unwrap();
        }

        assert_eq!(bridge.host_mut().set_led(1, true), SendResult::Success);
        let sent = sent.borrow();
        assert_eq!(sent.len(), 2);
        assert_eq!(sent[1][2 + 9], 0x02);
    }
}
