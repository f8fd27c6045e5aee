mod channel;
mod traits;

pub use channel::{post, ChannelEventSource, EventChannel};
pub use traits::{EventSource, InputError, RadioEvent, MAX_PACKET};
