//! Session controller: enable-report handshake, first-report-as-connect and
//! callback dispatch.
//!
//! ```text
//!            link up               first report
//!   Idle ─────────────▶ LinkUp ─────────────────▶ Streaming
//!    ▲                    │                           │
//!    └──── link down ─────┴──────── link down ────────┘
//! ```

use ds3_proto::{diff, parse_input, EnableReport, Event, InputSnapshot, OutputReport, OutputSnapshot};

use crate::transport::{ControlLink, SendResult, Transport};

/// Session state.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum SessionState {
    #[default]
    Idle,
    /// Both channels configured, waiting for the first input report.
    LinkUp,
    Streaming,
}

/// Plain connection callback.
pub type ConnectionCallback = fn(bool);
/// Plain input event callback.
pub type EventCallback = fn(&InputSnapshot, &Event);

/// Registered user callbacks.
///
/// Each signal has a plain `fn` slot and a closure slot. When both are set
/// the plain one runs first.
#[derive(Default)]
pub struct Callbacks<'a> {
    pub connection: Option<ConnectionCallback>,
    pub connection_handler: Option<&'a mut dyn FnMut(bool)>,
    pub event: Option<EventCallback>,
    pub event_handler: Option<&'a mut dyn FnMut(&InputSnapshot, &Event)>,
}

impl Callbacks<'_> {
    fn connection(&mut self, connected: bool) {
        if let Some(cb) = self.connection {
            cb(connected);
        }
        if let Some(handler) = self.connection_handler.as_mut() {
            handler(connected);
        }
    }

    fn event(&mut self, input: &InputSnapshot, event: &Event) {
        if let Some(cb) = self.event {
            cb(input, event);
        }
        if let Some(handler) = self.event_handler.as_mut() {
            handler(input, event);
        }
    }
}

/// Owns the input and output snapshots and drives the session state.
#[derive(Default)]
pub struct Session<'a> {
    state: SessionState,
    input: InputSnapshot,
    output: OutputSnapshot,
    callbacks: Callbacks<'a>,
}

impl<'a> Session<'a> {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn state(&self) -> SessionState {
        self.state
    }

    /// True from the first input report after link-up until link-down.
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.state == SessionState::Streaming
    }

    #[must_use]
    pub fn input(&self) -> &InputSnapshot {
        &self.input
    }

    #[must_use]
    pub fn output(&self) -> &OutputSnapshot {
        &self.output
    }

    /// Output snapshot, for callers that coalesce changes before
    /// [`send_command`](Self::send_command).
    pub fn output_mut(&mut self) -> &mut OutputSnapshot {
        &mut self.output
    }

    pub fn callbacks_mut(&mut self) -> &mut Callbacks<'a> {
        &mut self.callbacks
    }

    /// Back to `Idle` with a zeroed input snapshot. No callback fires.
    pub fn reset(&mut self) {
        self.state = SessionState::Idle;
        self.input = InputSnapshot::zeroed();
    }

    /// Both channels configured: ask the controller to start streaming.
    pub fn link_up<T: Transport>(&mut self, link: &mut ControlLink<'_, T>) {
        if self.state != SessionState::Idle {
            debug!("session: link up ignored in {:?}", self.state);
            return;
        }
        info!("session: link up, enabling reports");
        self.state = SessionState::LinkUp;
        self.input = InputSnapshot::zeroed();
        self.enable_report(link);
    }

    /// A channel left.
    pub fn link_down(&mut self) {
        let was = core::mem::take(&mut self.state);
        if was == SessionState::Streaming {
            info!("session: controller disconnected");
            self.callbacks.connection(false);
        }
    }

    /// Handle one packet from the interrupt channel.
    pub fn receive_data(&mut self, packet: &[u8]) {
        match self.state {
            SessionState::Idle => {
                trace!("session: data while idle dropped");
            }
            SessionState::LinkUp => match parse_input(packet) {
                Ok(input) => {
                    self.input = input;
                    self.state = SessionState::Streaming;
                    info!("session: controller connected");
                    self.callbacks.connection(true);
                }
                Err(e) => debug!("session: packet dropped: {:?}", e),
            },
            SessionState::Streaming => match parse_input(packet) {
                Ok(input) => {
                    let event = diff(&self.input, &input);
                    self.input = input;
                    self.callbacks.event(&self.input, &event);
                }
                Err(e) => debug!("session: packet dropped: {:?}", e),
            },
        }
    }

    pub fn enable_report<T: Transport>(&mut self, link: &mut ControlLink<'_, T>) -> SendResult {
        link.send(&EnableReport)
    }

    /// Send the current output snapshot.
    pub fn send_command<T: Transport>(&mut self, link: &mut ControlLink<'_, T>) -> SendResult {
        link.send(&OutputReport(self.output))
    }
}
