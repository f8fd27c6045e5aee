//! Public entry point: one controller session over an L2CAP transport.

use ds3_proto::{Event, InputSnapshot, Leds, OutputSnapshot, Rumble};

use crate::error::Ds3Error;
use crate::l2cap::{ChannelManager, L2capEvent, LinkSignal};
use crate::radio::{self, HostConfig, Radio, RadioError, RadioStep};
use crate::session::{ConnectionCallback, EventCallback, Session};
use crate::transport::{ChannelConfig, Cid, ConnectResult, PeerAddr, Psm, SendResult, Transport};

/// DualShock 3 host.
///
/// Owns the transport, the radio, the channel manager and the session. All
/// methods must be called from the context that dispatches the transport's
/// callbacks.
///
/// # Example
///
/// ```ignore
/// let mut host = Ds3Host::new(transport, radio, HostConfig::default());
/// host.set_connection_callback(|connected| { /* ... */ });
/// host.init()?;
///
/// // from the stack's callbacks
/// host.handle_event(event);
///
/// host.set_led(1, true);
/// ```
pub struct Ds3Host<'a, T, R> {
    transport: T,
    radio: R,
    config: HostConfig,
    channels: ChannelManager,
    session: Session<'a>,
    initialized: bool,
}

impl<'a, T: Transport, R: Radio> Ds3Host<'a, T, R> {
    pub fn new(transport: T, radio: R, config: HostConfig) -> Self {
        Self {
            transport,
            radio,
            config,
            channels: ChannelManager::new(),
            session: Session::new(),
            initialized: false,
        }
    }

    /// Bring the radio up and register both HID services.
    ///
    /// On failure everything that was set up is torn down again.
    pub fn init(&mut self) -> Result<(), Ds3Error> {
        if self.initialized {
            return Ok(());
        }

        radio::bring_up(&mut self.radio, &self.config)?;

        if let Err(e) = self.channels.open_services(&mut self.transport) {
            error!("host: init failed: {:?}", e);
            if let Err(down) = radio::tear_down(&mut self.radio) {
                error!("host: rollback failed: {:?}", down);
            }
            return Err(e);
        }

        self.session.reset();
        self.initialized = true;
        info!("host: initialized");
        Ok(())
    }

    /// Deregister the services and shut the radio down. No callback fires.
    pub fn deinit(&mut self) -> Result<(), Ds3Error> {
        if !self.initialized {
            return Ok(());
        }
        self.channels.close_services(&mut self.transport);
        self.session.reset();
        self.initialized = false;
        radio::tear_down(&mut self.radio)?;
        info!("host: deinitialized");
        Ok(())
    }

    #[must_use]
    pub fn is_initialized(&self) -> bool {
        self.initialized
    }

    /// Whether a controller is connected and streaming.
    #[must_use]
    pub fn is_connected(&self) -> bool {
        self.session.is_active()
    }

    /// Ask the controller to start streaming input reports.
    pub fn enable_report(&mut self) -> SendResult {
        let mut link = self.channels.control_link(&mut self.transport);
        self.session.enable_report(&mut link)
    }

    /// Send the current output snapshot.
    pub fn send_command(&mut self) -> SendResult {
        let mut link = self.channels.control_link(&mut self.transport);
        self.session.send_command(&mut link)
    }

    /// Feed an inbound HID packet, header included.
    pub fn receive_data(&mut self, packet: &[u8]) {
        self.session.receive_data(packet);
    }

    /// Switch one lamp (`1..=4`) or all of them (`0`), then send.
    ///
    /// Other indices leave the lamps alone but still send.
    pub fn set_led(&mut self, index: u8, on: bool) -> SendResult {
        let leds = &mut self.session.output_mut().leds;
        match index {
            0 => leds.set(Leds::ALL, on),
            n => match Leds::for_index(n) {
                Some(led) => leds.set(led, on),
                None => debug!("host: led index {} ignored", n),
            },
        }
        self.send_command()
    }

    pub fn set_leds(&mut self, led1: bool, led2: bool, led3: bool, led4: bool) -> SendResult {
        self.session.output_mut().leds = Leds::from_flags(led1, led2, led3, led4);
        self.send_command()
    }

    pub fn set_rumble(
        &mut self,
        right_duration: u8,
        right_intensity: u8,
        left_duration: u8,
        left_intensity: u8,
    ) -> SendResult {
        self.session.output_mut().rumble = Rumble::new(
            right_duration,
            right_intensity,
            left_duration,
            left_intensity,
        );
        self.send_command()
    }

    #[must_use]
    pub fn input(&self) -> &InputSnapshot {
        self.session.input()
    }

    #[must_use]
    pub fn output(&self) -> &OutputSnapshot {
        self.session.output()
    }

    /// Edit the output snapshot without sending; follow with
    /// [`send_command`](Self::send_command).
    pub fn output_mut(&mut self) -> &mut OutputSnapshot {
        self.session.output_mut()
    }

    pub fn set_connection_callback(&mut self, callback: ConnectionCallback) {
        self.session.callbacks_mut().connection = Some(callback);
    }

    pub fn set_connection_handler(&mut self, handler: &'a mut dyn FnMut(bool)) {
        self.session.callbacks_mut().connection_handler = Some(handler);
    }

    pub fn set_event_callback(&mut self, callback: EventCallback) {
        self.session.callbacks_mut().event = Some(callback);
    }

    pub fn set_event_handler(&mut self, handler: &'a mut dyn FnMut(&InputSnapshot, &Event)) {
        self.session.callbacks_mut().event_handler = Some(handler);
    }

    /// Make the radio answer as `mac`, e.g. the console a controller was
    /// paired with.
    pub fn set_bluetooth_mac(&mut self, mac: [u8; 6]) -> Result<(), Ds3Error> {
        let base = radio::base_mac_for(&mac);
        self.radio.set_base_mac(&base).map_err(|fault| {
            error!("host: setting base MAC failed: {}", fault.0);
            Ds3Error::Radio(RadioError::new(RadioStep::SetBaseMac, fault))
        })
    }

    fn apply(&mut self, signal: Option<LinkSignal>) {
        match signal {
            Some(LinkSignal::Up) => {
                let mut link = self.channels.control_link(&mut self.transport);
                self.session.link_up(&mut link);
            }
            Some(LinkSignal::Down) => self.session.link_down(),
            None => {}
        }
    }

    pub fn on_connect_indication(&mut self, peer: &PeerAddr, psm: Psm, cid: Cid, id: u8) {
        let signal = self
            .channels
            .connect_indication(&mut self.transport, peer, psm, cid, id);
        self.apply(signal);
    }

    pub fn on_connect_confirmation(&mut self, cid: Cid, result: ConnectResult) {
        self.channels.connect_confirmation(cid, result);
    }

    pub fn on_config_indication(&mut self, cid: Cid, config: &ChannelConfig) {
        self.channels
            .config_indication(&mut self.transport, cid, config);
    }

    pub fn on_config_confirmation(&mut self, cid: Cid, config: &ChannelConfig) {
        let signal = self.channels.config_confirmation(cid, config);
        self.apply(signal);
    }

    pub fn on_disconnect_indication(&mut self, cid: Cid, ack_needed: bool) {
        let signal = self
            .channels
            .disconnect_indication(&mut self.transport, cid, ack_needed);
        self.apply(signal);
    }

    pub fn on_disconnect_confirmation(&mut self, cid: Cid, result: ConnectResult) {
        let signal = self.channels.disconnect_confirmation(cid, result);
        self.apply(signal);
    }

    pub fn on_data_indication(&mut self, cid: Cid, data: &[u8]) {
        if let Some(packet) = self.channels.data_indication(cid, data) {
            self.session.receive_data(packet);
        }
    }

    pub fn on_congestion(&mut self, cid: Cid, congested: bool) {
        self.channels.congestion(cid, congested);
    }

    /// Dispatch one callback from the L2CAP stack.
    pub fn handle_event(&mut self, event: L2capEvent<'_>) {
        match event {
            L2capEvent::ConnectIndication { peer, cid, psm, id } => {
                self.on_connect_indication(&peer, psm, cid, id)
            }
            L2capEvent::ConnectConfirmation { cid, result } => {
                self.on_connect_confirmation(cid, result)
            }
            L2capEvent::ConfigIndication { cid, config } => self.on_config_indication(cid, &config),
            L2capEvent::ConfigConfirmation { cid, config } => {
                self.on_config_confirmation(cid, &config)
            }
            L2capEvent::DisconnectIndication { cid, ack_needed } => {
                self.on_disconnect_indication(cid, ack_needed)
            }
            L2capEvent::DisconnectConfirmation { cid, result } => {
                self.on_disconnect_confirmation(cid, result)
            }
            L2capEvent::DataIndication { cid, data } => self.on_data_indication(cid, data),
            L2capEvent::Congestion { cid, congested } => self.on_congestion(cid, congested),
        }
    }

    /// Drop both channels as if the controller had left.
    ///
    /// Used when the event feed itself is lost.
    pub fn force_link_down(&mut self) {
        self.channels.reset();
        self.session.link_down();
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn transport_mut(&mut self) -> &mut T {
        &mut self.transport
    }

    pub fn radio(&self) -> &R {
        &self.radio
    }

    /// Decompose the host into its transport and radio.
    pub fn into_parts(self) -> (T, R) {
        (self.transport, self.radio)
    }
}

#[cfg(test)]
mod tests {
    extern crate std;

    use super::*;
    use crate::error::RegisterError;
    use crate::radio::mock::{MockRadio, Op};
    use crate::transport::mock::{Call, MockTransport};
    use ds3_proto::Buttons;
    use std::cell::RefCell;
    use std::vec;
    use std::vec::Vec;

    const HIDC_CID: Cid = 0x40;
    const HIDI_CID: Cid = 0x41;
    const PEER: PeerAddr = PeerAddr([0x00, 0x1B, 0xFB, 0x01, 0x02, 0x03]);

    const TIMING_BLOCKS: [u8; 20] = [
        0xFF, 0x27, 0x10, 0x00, 0x32, 0xFF, 0x27, 0x10, 0x00, 0x32, 0xFF, 0x27, 0x10, 0x00, 0x32,
        0xFF, 0x27, 0x10, 0x00, 0x32,
    ];

    fn host<'a>() -> Ds3Host<'a, MockTransport, MockRadio> {
        Ds3Host::new(MockTransport::new(), MockRadio::new(), HostConfig::default())
    }

    fn report(buttons: Buttons) -> [u8; 50] {
        let mut packet = [0u8; 50];
        packet[0] = 0xA1;
        packet[1] = 0x01;
        packet[3..6].copy_from_slice(&buttons.raw().to_le_bytes()[..3]);
        packet[7..11].copy_from_slice(&[0x80; 4]);
        packet
    }

    fn link_up(host: &mut Ds3Host<'_, MockTransport, MockRadio>) {
        let ok = ChannelConfig::default();
        host.handle_event(L2capEvent::ConnectIndication {
            peer: PEER,
            cid: HIDC_CID,
            psm: Psm::HIDC,
            id: 1,
        });
        host.handle_event(L2capEvent::ConnectIndication {
            peer: PEER,
            cid: HIDI_CID,
            psm: Psm::HIDI,
            id: 2,
        });
        host.handle_event(L2capEvent::ConfigIndication { cid: HIDC_CID, config: ok });
        host.handle_event(L2capEvent::ConfigIndication { cid: HIDI_CID, config: ok });
        host.handle_event(L2capEvent::ConfigConfirmation { cid: HIDC_CID, config: ok });
        host.handle_event(L2capEvent::ConfigConfirmation { cid: HIDI_CID, config: ok });
    }

    fn data(host: &mut Ds3Host<'_, MockTransport, MockRadio>, packet: &[u8]) {
        host.handle_event(L2capEvent::DataIndication {
            cid: HIDI_CID,
            data: packet,
        });
    }

    #[test]
    fn test_init_brings_radio_up_and_registers() {
        let mut host = host();
        host.init().unwrap();
        assert!(host.is_initialized());
        assert!(!host.is_connected());
        assert_eq!(
            host.transport().calls(),
            vec![Call::Register(Psm::HIDC), Call::Register(Psm::HIDI)]
        );
        assert!(host.radio().ops().contains(&Op::HostEnable));
    }

    #[test]
    fn test_init_failure_rolls_back() {
        let transport = MockTransport {
            reject: Some((Psm::HIDI, RegisterError::Psm)),
            ..MockTransport::new()
        };
        let mut host = Ds3Host::new(transport, MockRadio::new(), HostConfig::default());
        let err = host.init().unwrap_err();
        assert_eq!(
            err,
            Ds3Error::Register {
                psm: Psm::HIDI,
                cause: RegisterError::Psm
            }
        );
        assert!(!host.is_initialized());
        assert_eq!(
            host.transport().calls(),
            vec![
                Call::Register(Psm::HIDC),
                Call::Register(Psm::HIDI),
                Call::Deregister(Psm::HIDC),
            ]
        );
        let ops = host.radio().ops();
        assert_eq!(&ops[ops.len() - 4..], &[
            Op::HostDisable,
            Op::HostDeinit,
            Op::ControllerDisable,
            Op::ControllerDeinit,
        ]);
    }

    #[test]
    fn test_init_radio_failure_skips_registration() {
        let radio = MockRadio {
            fail_at: Some(RadioStep::ControllerEnable),
            ..MockRadio::new()
        };
        let mut host = Ds3Host::new(MockTransport::new(), radio, HostConfig::default());
        let err = host.init().unwrap_err();
        assert!(matches!(err, Ds3Error::Radio(e) if e.step == RadioStep::ControllerEnable));
        assert!(host.transport().calls().is_empty());
        assert!(!host.is_initialized());
        assert_eq!(host.radio().ops().last(), Some(&Op::ControllerDeinit));
    }

    #[test]
    fn test_enable_report_sent_once_configured() {
        let mut host = host();
        host.init().unwrap();
        host.transport().clear();
        link_up(&mut host);

        let sent = host.transport().sent();
        assert_eq!(sent, vec![vec![0x53, 0xF4, 0x42, 0x03, 0x00, 0x00]]);
        assert!(host
            .transport()
            .calls()
            .contains(&Call::Send(HIDC_CID, sent[0].clone())));
    }

    #[test]
    fn test_first_report_connects_second_reports_event() {
        let connections = RefCell::new(Vec::new());
        let events = RefCell::new(Vec::new());
        let mut on_connection = |c: bool| connections.borrow_mut().push(c);
        let mut on_event = |_: &InputSnapshot, e: &Event| events.borrow_mut().push(*e);

        let mut host = host();
        host.set_connection_handler(&mut on_connection);
        host.set_event_handler(&mut on_event);
        host.init().unwrap();
        link_up(&mut host);
        assert!(!host.is_connected());

        data(&mut host, &report(Buttons::NONE));
        assert!(host.is_connected());
        assert_eq!(connections.borrow().len(), 1);
        assert!(events.borrow().is_empty());

        data(&mut host, &report(Buttons::CROSS));
        assert_eq!(connections.borrow().len(), 1);
        assert_eq!(events.borrow().len(), 1);

        drop(host);
        assert_eq!(connections.into_inner(), vec![true]);
        let event = events.into_inner()[0];
        assert_eq!(event.button_down, Buttons::CROSS);
        assert!(event.button_up.is_empty());
    }

    #[test]
    fn test_disconnect_fires_false_once() {
        let connections = RefCell::new(Vec::new());
        let mut on_connection = |c: bool| connections.borrow_mut().push(c);

        let mut host = host();
        host.set_connection_handler(&mut on_connection);
        host.init().unwrap();
        link_up(&mut host);
        data(&mut host, &report(Buttons::NONE));

        host.handle_event(L2capEvent::DisconnectIndication {
            cid: HIDI_CID,
            ack_needed: true,
        });
        assert!(!host.is_connected());
        host.handle_event(L2capEvent::DisconnectIndication {
            cid: HIDC_CID,
            ack_needed: true,
        });

        // no longer routed once the interrupt channel is gone
        data(&mut host, &report(Buttons::CROSS));

        drop(host);
        assert_eq!(connections.into_inner(), vec![true, false]);
    }

    #[test]
    fn test_reconnect_after_disconnect() {
        let mut host = host();
        host.init().unwrap();
        link_up(&mut host);
        data(&mut host, &report(Buttons::NONE));
        host.handle_event(L2capEvent::DisconnectConfirmation {
            cid: HIDC_CID,
            result: ConnectResult::Ok,
        });
        host.handle_event(L2capEvent::DisconnectConfirmation {
            cid: HIDI_CID,
            result: ConnectResult::Ok,
        });
        assert!(!host.is_connected());

        host.transport().clear();
        link_up(&mut host);
        assert_eq!(host.transport().sent().len(), 1);
        data(&mut host, &report(Buttons::NONE));
        assert!(host.is_connected());
    }

    #[test]
    fn test_reconnect_without_disconnect() {
        let connections = RefCell::new(Vec::new());
        let mut on_connection = |c: bool| connections.borrow_mut().push(c);

        let mut host = host();
        host.set_connection_handler(&mut on_connection);
        host.init().unwrap();
        link_up(&mut host);
        data(&mut host, &report(Buttons::NONE));
        assert!(host.is_connected());

        // controller reopens HIDC while the old channels are still configured
        host.transport().clear();
        host.handle_event(L2capEvent::ConnectIndication {
            peer: PEER,
            cid: 0x50,
            psm: Psm::HIDC,
            id: 3,
        });
        assert!(!host.is_connected());

        host.handle_event(L2capEvent::ConfigConfirmation {
            cid: 0x50,
            config: ChannelConfig::default(),
        });
        let sent = host.transport().sent();
        assert_eq!(sent, vec![vec![0x53, 0xF4, 0x42, 0x03, 0x00, 0x00]]);
        assert!(host
            .transport()
            .calls()
            .contains(&Call::Send(0x50, sent[0].clone())));

        data(&mut host, &report(Buttons::NONE));
        assert!(host.is_connected());

        drop(host);
        assert_eq!(connections.into_inner(), vec![true, false, true]);
    }

    #[test]
    fn test_set_leds_led2_only() {
        let mut host = host();
        host.init().unwrap();
        link_up(&mut host);
        host.transport().clear();

        assert_eq!(host.set_leds(false, true, false, false), SendResult::Success);
        let sent = host.transport().sent();
        let payload = &sent[0][2..];
        assert_eq!(payload[9], 0x04);
        assert_eq!(&payload[10..30], &TIMING_BLOCKS);
        assert_eq!(&payload[1..5], &[0, 0, 0, 0]);
    }

    #[test]
    fn test_set_rumble() {
        let mut host = host();
        host.init().unwrap();
        link_up(&mut host);
        host.transport().clear();

        host.set_rumble(0xFE, 0x80, 0x10, 0x40);
        let sent = host.transport().sent();
        assert_eq!(&sent[0][2 + 1..2 + 5], &[0xFE, 0x80, 0x10, 0x40]);
    }

    #[test]
    fn test_set_led_indices() {
        let mut host = host();
        host.init().unwrap();
        link_up(&mut host);
        host.transport().clear();

        host.set_led(0, true);
        assert_eq!(host.output().leds, Leds::ALL);
        host.set_led(3, false);
        assert_eq!(host.output().leds, Leds::LED1 | Leds::LED2 | Leds::LED4);
        host.set_led(9, false);
        assert_eq!(host.output().leds, Leds::LED1 | Leds::LED2 | Leds::LED4);

        // every call sends, even the ignored index
        assert_eq!(host.transport().sent().len(), 3);
    }

    #[test]
    fn test_setter_without_control_channel() {
        let mut host = host();
        host.init().unwrap();
        host.transport().clear();
        assert_eq!(host.set_led(1, true), SendResult::Failed);
        assert!(host.transport().calls().is_empty());
        assert_eq!(host.output().leds, Leds::LED1);
    }

    #[test]
    fn test_output_mut_then_send_command() {
        let mut host = host();
        host.init().unwrap();
        link_up(&mut host);
        host.transport().clear();

        host.output_mut().leds = Leds::LED1 | Leds::LED4;
        host.output_mut().rumble = Rumble::new(1, 2, 3, 4);
        host.send_command();
        let sent = host.transport().sent();
        assert_eq!(sent.len(), 1);
        assert_eq!(
            OutputSnapshot::decode(sent[0][2..].try_into().unwrap()),
            *host.output()
        );
    }

    #[test]
    fn test_set_bluetooth_mac() {
        let mut host = host();
        host.set_bluetooth_mac([0xAA, 0xBB, 0xCC, 0xDD, 0xEE, 0x10])
            .unwrap();
        assert_eq!(
            host.radio().ops(),
            vec![Op::BaseMac([0xAA, 0xBB, 0xCC, 0xDD, 0xEE, 0x0E])]
        );
    }

    #[test]
    fn test_deinit() {
        let connections = RefCell::new(Vec::new());
        let mut on_connection = |c: bool| connections.borrow_mut().push(c);

        let mut host = host();
        host.set_connection_handler(&mut on_connection);
        host.init().unwrap();
        link_up(&mut host);
        data(&mut host, &report(Buttons::NONE));
        host.transport().clear();

        host.deinit().unwrap();
        assert!(!host.is_connected());
        assert!(!host.is_initialized());
        assert_eq!(
            host.transport().calls(),
            vec![Call::Deregister(Psm::HIDC), Call::Deregister(Psm::HIDI)]
        );
        assert_eq!(host.radio().ops().last(), Some(&Op::ControllerDeinit));

        drop(host);
        assert_eq!(connections.into_inner(), vec![true]);
    }

    #[test]
    fn test_force_link_down() {
        let mut host = host();
        host.init().unwrap();
        link_up(&mut host);
        data(&mut host, &report(Buttons::NONE));
        host.force_link_down();
        assert!(!host.is_connected());
        assert_eq!(host.set_led(1, true), SendResult::Failed);
    }
}
