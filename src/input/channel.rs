use embassy_sync::blocking_mutex::raw::RawMutex;
use embassy_sync::channel::{Channel, Receiver, Sender};

use super::traits::{EventSource, InputError, RadioEvent};

/// Queue between the radio's callback context and the host task.
pub type EventChannel<M, const N: usize> = Channel<M, RadioEvent, N>;

/// Event source draining an [`EventChannel`].
///
/// The radio glue holds the matching [`Sender`] and pushes one
/// [`RadioEvent`] per stack callback, in arrival order.
///
/// A channel cannot close, so [`receive`](EventSource::receive) never fails
/// and [`is_connected`](EventSource::is_connected) is always `true`. The
/// bridge's forced link down on [`InputError::Disconnected`] is only reached
/// through sources that can actually lose their feed.
pub struct ChannelEventSource<'ch, M: RawMutex, const N: usize> {
    receiver: Receiver<'ch, M, RadioEvent, N>,
}

impl<'ch, M: RawMutex, const N: usize> ChannelEventSource<'ch, M, N> {
    pub fn new(receiver: Receiver<'ch, M, RadioEvent, N>) -> Self {
        Self { receiver }
    }

    /// Number of events waiting.
    pub fn pending(&self) -> usize {
        self.receiver.len()
    }
}

impl<M: RawMutex, const N: usize> EventSource for ChannelEventSource<'_, M, N> {
    async fn receive(&mut self) -> Result<RadioEvent, InputError> {
        Ok(self.receiver.receive().await)
    }

    fn is_connected(&self) -> bool {
        true
    }
}

/// Push an event from the radio's callback context without waiting.
///
/// A full queue drops the event and logs it; the stack must not be blocked.
pub fn post<M: RawMutex, const N: usize>(sender: &Sender<'_, M, RadioEvent, N>, event: RadioEvent) -> bool {
    match sender.try_send(event) {
        Ok(()) => true,
        Err(_) => {
            error!("event queue full, event dropped");
            false
        }
    }
}
